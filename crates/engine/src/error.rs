use resumesync_core::sync::SyncError;
use resumesync_core::SchemaError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, EngineError>;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error("Remote store error: {0}")]
    Remote(#[from] SyncError),

    #[error(transparent)]
    Core(#[from] resumesync_core::Error),
}

impl EngineError {
    /// True when the user has to sign in again.
    pub fn is_auth(&self) -> bool {
        matches!(self, EngineError::Remote(err) if err.is_auth())
    }
}
