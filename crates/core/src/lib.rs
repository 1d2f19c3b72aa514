//! Resume document model and local-first sync domain.
//!
//! - [`document`]: schema, invariants, textual paths
//! - [`mutation`]: pure path-based edits
//! - [`persistence`]: synchronous write-through cache contract
//! - [`sync`]: flush state, cadence and remote collaborator traits

pub mod completeness;
pub mod document;
pub mod errors;
pub mod improve;
pub mod mutation;
pub mod persistence;
pub mod sync;

pub use document::ResumeDocument;
pub use errors::{Error, ParseError, Result, SchemaError, StorageError};
pub use mutation::{Applied, Mutation};
pub use persistence::{DocumentCache, IdentityKey, LocalStore, MemoryStore};
