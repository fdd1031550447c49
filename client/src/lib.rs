//! Profile and session glue over a hosted identity provider and document store.
//!
//! The domain layer defines the profile model, the backend ports, and
//! `ProfileService`. Outbound adapters implement the ports for the Firebase
//! REST APIs, for an in-process backend, and for client-side storage.

pub mod config;
pub mod context;
pub mod domain;
pub mod outbound;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
