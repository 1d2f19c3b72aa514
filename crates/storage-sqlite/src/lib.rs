//! SQLite-backed local persistence for resume documents.

mod local_store;

pub use local_store::{SqliteStore, StoredEntry};
