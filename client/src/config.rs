//! Backend settings loaded via OrthoConfig.
//!
//! Values mirror the identifiers a hosted project issues to its web clients.
//! Nothing is validated here; the connector decides which values it needs.

use std::path::PathBuf;

use ortho_config::OrthoConfig;
use serde::Deserialize;

const DEFAULT_STORAGE_DIR: &str = ".carelink";

/// Project identifiers and endpoint overrides for the hosted backend.
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "CARELINK")]
pub struct BackendSettings {
    /// Public web API key.
    pub api_key: Option<String>,
    /// Auth domain registered for the project.
    pub auth_domain: Option<String>,
    /// Project identifier.
    pub project_id: Option<String>,
    /// Default storage bucket.
    pub storage_bucket: Option<String>,
    /// Messaging sender identifier.
    pub messaging_sender_id: Option<String>,
    /// Registered application identifier.
    pub app_id: Option<String>,
    /// Document store base URL override, e.g. a local emulator.
    pub firestore_endpoint: Option<String>,
    /// Identity service base URL override, e.g. a local emulator.
    pub identity_endpoint: Option<String>,
    /// Secure token service base URL override, used to refresh ID tokens.
    pub secure_token_endpoint: Option<String>,
    /// Directory holding durable client storage.
    pub storage_dir: Option<PathBuf>,
}

impl BackendSettings {
    /// Settings with every value unset.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            api_key: None,
            auth_domain: None,
            project_id: None,
            storage_bucket: None,
            messaging_sender_id: None,
            app_id: None,
            firestore_endpoint: None,
            identity_endpoint: None,
            secure_token_endpoint: None,
            storage_dir: None,
        }
    }

    /// Return the durable storage directory, falling back to `.carelink`.
    #[must_use]
    pub fn storage_dir(&self) -> PathBuf {
        self.storage_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_STORAGE_DIR))
    }
}
