//! Builds Firebase REST clients from backend settings.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use reqwest::Client;
use url::Url;

use super::firestore::{DEFAULT_FIRESTORE_ENDPOINT, FirestoreDocumentStore};
use super::identity_toolkit::{
    DEFAULT_IDENTITY_ENDPOINT, DEFAULT_SECURE_TOKEN_ENDPOINT, IdentityToolkitProvider,
};
use crate::config::BackendSettings;
use crate::domain::ports::{BackendClients, BackendConnectError, BackendConnector};

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Connector for a hosted Firebase project.
///
/// `api_key` and `project_id` are required. Endpoint overrides let the same
/// code talk to the local emulators. Every `connect` builds a fresh pair of
/// clients; the connector remembers the identity provider from the latest one.
pub struct FirebaseConnector {
    timeout: Duration,
    identity: Mutex<Option<Arc<IdentityToolkitProvider>>>,
}

impl Default for FirebaseConnector {
    fn default() -> Self {
        Self::new(DEFAULT_REQUEST_TIMEOUT)
    }
}

impl FirebaseConnector {
    /// Connector whose HTTP requests time out after `timeout`.
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            identity: Mutex::new(None),
        }
    }

    /// Identity provider built by the latest successful `connect`.
    ///
    /// Callers use it for password sign-in, which the domain does not model.
    #[must_use]
    pub fn identity_provider(&self) -> Option<Arc<IdentityToolkitProvider>> {
        match self.identity.lock() {
            Ok(identity) => identity.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn remember(&self, provider: Arc<IdentityToolkitProvider>) {
        match self.identity.lock() {
            Ok(mut identity) => *identity = Some(provider),
            Err(poisoned) => *poisoned.into_inner() = Some(provider),
        }
    }
}

impl BackendConnector for FirebaseConnector {
    fn connect(&self, settings: &BackendSettings) -> Result<BackendClients, BackendConnectError> {
        let api_key = required(settings.api_key.as_deref(), "api_key")?;
        let project_id = required(settings.project_id.as_deref(), "project_id")?;
        let firestore_endpoint = endpoint(
            settings.firestore_endpoint.as_deref(),
            DEFAULT_FIRESTORE_ENDPOINT,
            "firestore_endpoint",
        )?;
        let identity_endpoint = endpoint(
            settings.identity_endpoint.as_deref(),
            DEFAULT_IDENTITY_ENDPOINT,
            "identity_endpoint",
        )?;
        let secure_token_endpoint = endpoint(
            settings.secure_token_endpoint.as_deref(),
            DEFAULT_SECURE_TOKEN_ENDPOINT,
            "secure_token_endpoint",
        )?;

        let client = Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|error| BackendConnectError::client(error.to_string()))?;

        let identity = Arc::new(IdentityToolkitProvider::new(
            client.clone(),
            identity_endpoint,
            secure_token_endpoint,
            api_key,
        ));
        let documents =
            FirestoreDocumentStore::new(client, firestore_endpoint, project_id, api_key)
                .with_token_source(identity.clone());
        self.remember(Arc::clone(&identity));

        Ok(BackendClients {
            identity,
            documents: Arc::new(documents),
        })
    }
}

fn required<'a>(value: Option<&'a str>, name: &str) -> Result<&'a str, BackendConnectError> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| BackendConnectError::missing_setting(name))
}

fn endpoint(
    value: Option<&str>,
    default: &str,
    name: &str,
) -> Result<Url, BackendConnectError> {
    let raw = value.map(str::trim).filter(|value| !value.is_empty()).unwrap_or(default);
    let url = Url::parse(raw)
        .map_err(|error| BackendConnectError::invalid_setting(name, error.to_string()))?;
    if url.cannot_be_a_base() || !matches!(url.scheme(), "http" | "https") {
        return Err(BackendConnectError::invalid_setting(
            name,
            format!("'{raw}' is not an http(s) base URL"),
        ));
    }
    Ok(url)
}
