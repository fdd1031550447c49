//! Outbound adapters implementing the domain ports.

pub(crate) mod auth_watch;
pub mod firebase;
pub mod memory;
pub mod storage;
