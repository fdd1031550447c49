//! Firebase REST adapters.
//!
//! These adapters own transport details only: URL construction, typed-value
//! encoding, HTTP status mapping, and JSON decoding.

use async_trait::async_trait;

mod connector;
mod dto;
mod firestore;
mod identity_toolkit;

pub use connector::FirebaseConnector;
pub use firestore::{DEFAULT_FIRESTORE_ENDPOINT, FirestoreDocumentStore};
pub use identity_toolkit::{
    DEFAULT_IDENTITY_ENDPOINT, DEFAULT_SECURE_TOKEN_ENDPOINT, IdentityToolkitProvider,
};

/// Supplies the ID token sent with document store requests.
#[async_trait]
pub trait TokenSource: Send + Sync {
    /// Current ID token, or `None` when nobody is signed in.
    fn id_token(&self) -> Option<String>;

    /// Exchange the session's refresh token for a new ID token.
    ///
    /// Called after the backend rejects the current token. Returns `None`
    /// when there is no session to refresh or the exchange failed.
    async fn refresh_id_token(&self) -> Option<String>;
}

fn body_preview(body: &[u8]) -> String {
    const PREVIEW_CHAR_LIMIT: usize = 160;

    let compact = String::from_utf8_lossy(body)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    let preview = compact.chars().take(PREVIEW_CHAR_LIMIT).collect::<String>();
    if compact.chars().count() > PREVIEW_CHAR_LIMIT {
        format!("{preview}...")
    } else {
        preview
    }
}
