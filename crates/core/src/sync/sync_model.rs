//! Sync domain model and collaborator contracts.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::RwLock;
use thiserror::Error;

use crate::document::ResumeDocument;
use crate::persistence::IdentityKey;

/// Flush state machine phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncPhase {
    /// Remote matches the last known document.
    Idle,
    /// Mutations not yet reflected remotely, no timer armed.
    Dirty,
    /// Debounce or retry timer armed.
    Scheduled,
    /// A request is in flight.
    Flushing,
    /// The remote answered 401; flushing stops until the user signs in again.
    ReauthRequired,
    /// The scheduler task has stopped.
    Stopped,
}

/// Retry policy classification for remote failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncRetryClass {
    Retryable,
    Permanent,
    ReauthRequired,
}

/// Classify HTTP status into retry behavior.
pub fn classify_http_status(status: u16) -> SyncRetryClass {
    match status {
        401 | 403 => SyncRetryClass::ReauthRequired,
        408 | 409 | 423 | 425 | 429 => SyncRetryClass::Retryable,
        500..=599 => SyncRetryClass::Retryable,
        _ => SyncRetryClass::Permanent,
    }
}

/// Failure reported by a [`RemoteStore`]. "Not found" is `Ok(None)`, not an error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncError {
    #[error("network error: {0}")]
    Network(String),

    #[error("authentication required: {0}")]
    Auth(String),

    #[error("remote rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("invalid remote payload: {0}")]
    Parse(String),
}

impl SyncError {
    pub fn retry_class(&self) -> SyncRetryClass {
        match self {
            SyncError::Network(_) => SyncRetryClass::Retryable,
            SyncError::Auth(_) => SyncRetryClass::ReauthRequired,
            SyncError::Rejected { status, .. } => classify_http_status(*status),
            SyncError::Parse(_) => SyncRetryClass::Permanent,
        }
    }

    pub fn is_auth(&self) -> bool {
        self.retry_class() == SyncRetryClass::ReauthRequired
    }
}

/// Whole-document remote storage, one resource per identity.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// `Ok(None)` means no document exists yet.
    async fn fetch(
        &self,
        identity: &IdentityKey,
        token: &str,
    ) -> Result<Option<ResumeDocument>, SyncError>;

    /// Replace the remote document. Returns the canonically stored value.
    async fn store(
        &self,
        identity: &IdentityKey,
        token: &str,
        document: &ResumeDocument,
    ) -> Result<ResumeDocument, SyncError>;
}

/// Supplies the current bearer token. Owned by the authentication collaborator.
pub trait TokenProvider: Send + Sync {
    fn access_token(&self) -> Option<String>;
}

/// Reacts to session expiry (logout and redirect to sign-in).
pub trait SessionObserver: Send + Sync {
    fn session_expired(&self, identity: &IdentityKey, reason: &str);
}

/// Token provider holding a token set by the host application.
#[derive(Debug, Default)]
pub struct StaticTokenProvider {
    token: RwLock<Option<String>>,
}

impl StaticTokenProvider {
    pub fn new(token: Option<String>) -> Self {
        Self {
            token: RwLock::new(token.filter(|t| !t.trim().is_empty())),
        }
    }

    pub fn set(&self, token: Option<String>) {
        if let Ok(mut guard) = self.token.write() {
            *guard = token;
        }
    }
}

impl TokenProvider for StaticTokenProvider {
    fn access_token(&self) -> Option<String> {
        self.token.read().ok().and_then(|guard| guard.clone())
    }
}

/// Observer that only logs; for hosts without a sign-in flow.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSessionObserver;

impl SessionObserver for LogSessionObserver {
    fn session_expired(&self, identity: &IdentityKey, reason: &str) {
        log::warn!("[ResumeSync] Session expired for {}: {}", identity, reason);
    }
}

/// What the editor shows next to the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncIndicator {
    Saved,
    Unsaved,
    Syncing,
    SyncFailed,
    SignedOut,
}

/// Snapshot of the scheduler for status displays.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncStatus {
    pub phase: SyncPhase,
    /// Local edits not yet confirmed remotely.
    pub pending: bool,
    pub last_synced_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub consecutive_failures: u32,
    pub next_retry_at: Option<DateTime<Utc>>,
    pub flush_count: u64,
}

impl Default for SyncStatus {
    fn default() -> Self {
        Self {
            phase: SyncPhase::Idle,
            pending: false,
            last_synced_at: None,
            last_error: None,
            consecutive_failures: 0,
            next_retry_at: None,
            flush_count: 0,
        }
    }
}

impl SyncStatus {
    pub fn indicator(&self) -> SyncIndicator {
        match self.phase {
            SyncPhase::ReauthRequired => SyncIndicator::SignedOut,
            SyncPhase::Flushing => SyncIndicator::Syncing,
            _ if self.consecutive_failures > 0 => SyncIndicator::SyncFailed,
            _ if self.pending => SyncIndicator::Unsaved,
            _ => SyncIndicator::Saved,
        }
    }
}
