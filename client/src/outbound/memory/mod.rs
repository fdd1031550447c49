//! In-process backend adapters.
//!
//! These stand in for the hosted backend in tests and offline demos. The
//! connector hands out shared handles, so callers keep direct access to the
//! concrete adapters for seeding data or injecting failures.

mod document_store;
mod identity_provider;

use std::sync::Arc;

use mockable::{Clock, DefaultClock};

pub use document_store::InMemoryDocumentStore;
pub use identity_provider::InMemoryIdentityProvider;

use crate::config::BackendSettings;
use crate::domain::ports::{BackendClients, BackendConnectError, BackendConnector};

/// Connector producing in-memory handles; every `connect` shares them.
#[derive(Clone)]
pub struct InMemoryConnector {
    identity: Arc<InMemoryIdentityProvider>,
    documents: Arc<InMemoryDocumentStore>,
}

impl Default for InMemoryConnector {
    fn default() -> Self {
        Self::new(Arc::new(DefaultClock))
    }
}

impl InMemoryConnector {
    /// Create a connector whose store stamps timestamps from `clock`.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            identity: Arc::new(InMemoryIdentityProvider::new()),
            documents: Arc::new(InMemoryDocumentStore::new(clock)),
        }
    }

    /// Shared identity provider.
    #[must_use]
    pub fn identity(&self) -> Arc<InMemoryIdentityProvider> {
        Arc::clone(&self.identity)
    }

    /// Shared document store.
    #[must_use]
    pub fn documents(&self) -> Arc<InMemoryDocumentStore> {
        Arc::clone(&self.documents)
    }
}

impl BackendConnector for InMemoryConnector {
    fn connect(&self, _settings: &BackendSettings) -> Result<BackendClients, BackendConnectError> {
        Ok(BackendClients {
            identity: self.identity(),
            documents: self.documents(),
        })
    }
}
