//! Local-first sync engine for resume documents.
//!
//! - [`SyncScheduler`]: debounced background flushes to the remote store
//! - [`ReconciliationLoader`]: picks the initial document on editor start
//! - [`EditorSession`]: mutation entry point tying cache and scheduler together

mod error;
mod loader;
mod scheduler;
mod session;

#[cfg(test)]
mod test_support;

pub use error::{EngineError, Result};
pub use loader::{DocumentSource, Reconciled, ReconciliationLoader};
pub use scheduler::{FlushOutcome, SyncScheduler};
pub use session::{EditorSession, MutationOutcome, SyncContext};
