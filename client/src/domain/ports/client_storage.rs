//! Port for client-side key/value storage.
//!
//! Two instances are wired into the service: a session-scoped store that is
//! wiped on sign-out, and a durable store holding preferences such as the
//! remember-me flag.

use super::define_port_error;

/// Durable key recording that the user asked to stay signed in.
pub const REMEMBER_ME_KEY: &str = "rememberMe";

define_port_error! {
    /// Errors raised by client storage adapters.
    pub enum ClientStorageError {
        /// Reading or writing the underlying medium failed.
        Io { message: String } => "client storage I/O failed: {message}",
        /// Stored contents could not be decoded.
        Corrupt { message: String } => "client storage is corrupt: {message}",
    }
}

/// String key/value store.
#[cfg_attr(test, mockall::automock)]
pub trait ClientStorage: Send + Sync {
    /// Read one key.
    fn get(&self, key: &str) -> Result<Option<String>, ClientStorageError>;

    /// Write one key.
    fn set(&self, key: &str, value: &str) -> Result<(), ClientStorageError>;

    /// Remove one key; removing a missing key succeeds.
    fn remove(&self, key: &str) -> Result<(), ClientStorageError>;

    /// Remove every key.
    fn clear(&self) -> Result<(), ClientStorageError>;
}
