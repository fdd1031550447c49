//! Port for building backend client handles from settings.
//!
//! A connector plays the role of the vendor SDK bootstrap: it either yields
//! both handles or reports why it could not.

use std::sync::Arc;

use crate::config::BackendSettings;

use super::{DocumentStore, IdentityProvider, define_port_error};

define_port_error! {
    /// Errors raised while connecting to the backend.
    pub enum BackendConnectError {
        /// A setting the connector depends on is absent.
        MissingSetting { name: String } => "backend setting '{name}' is missing",
        /// A setting is present but unusable.
        InvalidSetting { name: String, message: String } =>
            "backend setting '{name}' is invalid: {message}",
        /// Client construction failed.
        Client { message: String } => "backend client could not be created: {message}",
    }
}

/// The two long-lived handles produced by a connector.
#[derive(Clone)]
pub struct BackendClients {
    /// Identity provider handle.
    pub identity: Arc<dyn IdentityProvider>,
    /// Document store handle.
    pub documents: Arc<dyn DocumentStore>,
}

/// Port for configuring the backend SDK.
#[cfg_attr(test, mockall::automock)]
pub trait BackendConnector: Send + Sync {
    /// Build client handles from `settings`.
    fn connect(&self, settings: &BackendSettings) -> Result<BackendClients, BackendConnectError>;
}

/// Connector standing in for an SDK that was never loaded.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnavailableConnector;

impl BackendConnector for UnavailableConnector {
    fn connect(&self, _settings: &BackendSettings) -> Result<BackendClients, BackendConnectError> {
        Err(BackendConnectError::client("backend SDK is not available"))
    }
}
