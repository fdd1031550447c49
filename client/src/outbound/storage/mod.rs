//! Client storage adapters.
//!
//! - `MemoryStorage` backs the session-scoped store.
//! - `FileStorage` backs the durable store (remember-me and friends).

mod file;
mod memory;

pub use file::FileStorage;
pub use memory::MemoryStorage;
