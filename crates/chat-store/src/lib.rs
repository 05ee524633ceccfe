//! Message store
//!
//! A single `messages` collection in SQLite. The chat server and the payload
//! importer open the same database file from separate processes, so the pool
//! runs in WAL mode with a busy timeout instead of relying on in-process locks.

pub mod error;
pub mod store;

pub use error::{Result, StoreError};
pub use store::{MessageStore, NewMessage};
