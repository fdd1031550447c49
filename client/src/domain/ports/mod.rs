//! Domain ports and supporting types for the hexagonal boundary.

mod macros;
pub(crate) use macros::define_port_error;

mod backend_connector;
mod client_storage;
mod document_store;
mod identity_provider;

#[cfg(test)]
pub use backend_connector::MockBackendConnector;
pub use backend_connector::{
    BackendClients, BackendConnectError, BackendConnector, UnavailableConnector,
};
#[cfg(test)]
pub use client_storage::MockClientStorage;
pub use client_storage::{ClientStorage, ClientStorageError, REMEMBER_ME_KEY};
#[cfg(test)]
pub use document_store::MockDocumentStore;
pub use document_store::{
    Document, DocumentPath, DocumentStore, DocumentStoreError, DocumentWrite,
    FixtureDocumentStore,
};
#[cfg(test)]
pub use identity_provider::MockIdentityProvider;
pub use identity_provider::{
    AuthStateStream, FixtureIdentityProvider, IdentityProvider, IdentityProviderError,
};
