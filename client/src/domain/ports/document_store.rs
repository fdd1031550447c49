//! Port for the hosted document store.
//!
//! Documents are JSON objects addressed by collection and user id. Writes
//! are committed in batches that the backend applies atomically, and may
//! ask the backend to stamp fields with its own clock.

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::domain::{Collection, UserId};

use super::define_port_error;

define_port_error! {
    /// Errors raised by document store adapters.
    pub enum DocumentStoreError {
        /// The store could not be reached.
        Connection { message: String } => "document store connection failed: {message}",
        /// The caller is not allowed to read or write the document.
        PermissionDenied { message: String } => "document store permission denied: {message}",
        /// The store rejected or failed the request.
        Query { message: String } => "document store request failed: {message}",
        /// The store returned a payload the adapter could not decode.
        Decode { message: String } => "document store returned an invalid payload: {message}",
    }
}

/// Address of a document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocumentPath {
    /// Collection holding the document.
    pub collection: Collection,
    /// Document key.
    pub id: UserId,
}

impl DocumentPath {
    /// Address `id` inside `collection`.
    #[must_use]
    pub fn new(collection: Collection, id: UserId) -> Self {
        Self { collection, id }
    }
}

impl std::fmt::Display for DocumentPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.collection, self.id)
    }
}

/// A stored document.
///
/// Server timestamps are surfaced as RFC 3339 strings.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    /// Where the document lives.
    pub path: DocumentPath,
    /// Stored fields.
    pub fields: Map<String, Value>,
}

/// Full replacement of one document, applied as part of a batch.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentWrite {
    /// Target document.
    pub path: DocumentPath,
    /// Fields written verbatim.
    pub fields: Map<String, Value>,
    /// Fields the backend sets to its own commit time.
    pub server_timestamps: Vec<String>,
}

impl DocumentWrite {
    /// Replace the document at `path` with `fields`.
    #[must_use]
    pub fn set(path: DocumentPath, fields: Map<String, Value>) -> Self {
        Self {
            path,
            fields,
            server_timestamps: Vec::new(),
        }
    }

    /// Ask the backend to stamp `field` with the commit time.
    #[must_use]
    pub fn with_server_timestamp(mut self, field: impl Into<String>) -> Self {
        self.server_timestamps.push(field.into());
        self
    }
}

/// Port for reading and writing documents.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fetch one document; `None` when it does not exist.
    async fn get(&self, path: &DocumentPath) -> Result<Option<Document>, DocumentStoreError>;

    /// Apply every write or none of them.
    async fn commit(&self, writes: Vec<DocumentWrite>) -> Result<(), DocumentStoreError>;
}

/// Fixture store that holds nothing and accepts every commit.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureDocumentStore;

#[async_trait]
impl DocumentStore for FixtureDocumentStore {
    async fn get(&self, _path: &DocumentPath) -> Result<Option<Document>, DocumentStoreError> {
        Ok(None)
    }

    async fn commit(&self, _writes: Vec<DocumentWrite>) -> Result<(), DocumentStoreError> {
        Ok(())
    }
}
