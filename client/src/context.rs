//! Explicit backend context holding the two long-lived service handles.
//!
//! The context is built once at startup and injected into services. When the
//! connector cannot produce handles the failure is logged and the context is
//! left unconfigured; every operation using it then fails with
//! [`ErrorCode::NotConfigured`](crate::domain::ErrorCode::NotConfigured).

use std::sync::Arc;

use tracing::{error, info};

use crate::config::BackendSettings;
use crate::domain::Error;
use crate::domain::ports::{BackendClients, BackendConnector, DocumentStore, IdentityProvider};

/// Identity provider and document store handles, or neither.
#[derive(Clone, Default)]
pub struct BackendContext {
    clients: Option<BackendClients>,
}

impl BackendContext {
    /// Configure the backend through `connector`.
    ///
    /// Call once per process. Connector failures are logged, not returned.
    ///
    /// # Examples
    /// ```
    /// use carelink::config::BackendSettings;
    /// use carelink::context::BackendContext;
    /// use carelink::domain::ports::UnavailableConnector;
    ///
    /// let context = BackendContext::initialize(&BackendSettings::empty(), &UnavailableConnector);
    /// assert!(!context.is_configured());
    /// ```
    pub fn initialize(settings: &BackendSettings, connector: &dyn BackendConnector) -> Self {
        match connector.connect(settings) {
            Ok(clients) => {
                info!(
                    project_id = settings.project_id.as_deref().unwrap_or("<unset>"),
                    "backend configured"
                );
                Self::from_clients(clients)
            }
            Err(err) => {
                error!(error = %err, "backend SDK unavailable; service handles left unset");
                Self::unconfigured()
            }
        }
    }

    /// Context wrapping handles that were built elsewhere.
    #[must_use]
    pub fn from_clients(clients: BackendClients) -> Self {
        Self {
            clients: Some(clients),
        }
    }

    /// Context with no handles.
    #[must_use]
    pub fn unconfigured() -> Self {
        Self { clients: None }
    }

    /// Whether both handles are set.
    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.clients.is_some()
    }

    /// Identity provider handle.
    pub fn identity(&self) -> Result<&Arc<dyn IdentityProvider>, Error> {
        self.clients
            .as_ref()
            .map(|clients| &clients.identity)
            .ok_or_else(Error::not_configured)
    }

    /// Document store handle.
    pub fn documents(&self) -> Result<&Arc<dyn DocumentStore>, Error> {
        self.clients
            .as_ref()
            .map(|clients| &clients.documents)
            .ok_or_else(Error::not_configured)
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use crate::domain::ErrorCode;
    use crate::domain::ports::{
        BackendConnectError, FixtureDocumentStore, FixtureIdentityProvider, MockBackendConnector,
    };
    use rstest::rstest;

    fn fixture_clients() -> BackendClients {
        BackendClients {
            identity: Arc::new(FixtureIdentityProvider),
            documents: Arc::new(FixtureDocumentStore),
        }
    }

    #[rstest]
    fn initialize_keeps_handles_from_connector() {
        let mut connector = MockBackendConnector::new();
        connector
            .expect_connect()
            .times(1)
            .returning(|_| Ok(fixture_clients()));

        let context = BackendContext::initialize(&BackendSettings::empty(), &connector);
        assert!(context.is_configured());
        assert!(context.identity().is_ok());
        assert!(context.documents().is_ok());
    }

    #[rstest]
    fn initialize_leaves_handles_unset_when_connector_fails() {
        let mut connector = MockBackendConnector::new();
        connector
            .expect_connect()
            .times(1)
            .returning(|_| Err(BackendConnectError::missing_setting("api_key")));

        let context = BackendContext::initialize(&BackendSettings::empty(), &connector);
        assert!(!context.is_configured());
        let err = context.documents().err().expect("handle must be unset");
        assert_eq!(err.code(), ErrorCode::NotConfigured);
    }

    #[rstest]
    fn default_context_is_unconfigured() {
        let context = BackendContext::default();
        let err = context.identity().err().expect("handle must be unset");
        assert_eq!(err.code(), ErrorCode::NotConfigured);
    }
}
