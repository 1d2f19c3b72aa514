//! Scripted collaborators for engine tests.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

use resumesync_core::sync::{RemoteStore, SessionObserver, SyncError};
use resumesync_core::{IdentityKey, ResumeDocument};

pub(crate) fn ms(millis: u64) -> Duration {
    Duration::from_millis(millis)
}

pub(crate) fn named(name: &str) -> ResumeDocument {
    let mut document = ResumeDocument::template();
    document.personal_info.name = name.to_string();
    document
}

#[derive(Debug, Clone)]
pub(crate) struct StoreCall {
    pub identity: String,
    pub token: String,
    pub document: ResumeDocument,
    pub at: Instant,
}

struct ScriptedStore {
    delay: Duration,
    result: Result<(), SyncError>,
}

/// In-memory remote store keyed by identity. `store` answers from a script,
/// then echoes the document back as the canonical value.
#[derive(Default)]
pub(crate) struct MockRemote {
    documents: Mutex<HashMap<String, ResumeDocument>>,
    fallback: Option<ResumeDocument>,
    fetch_error: Mutex<Option<SyncError>>,
    script: Mutex<VecDeque<ScriptedStore>>,
    calls: Mutex<Vec<StoreCall>>,
    fetches: AtomicUsize,
}

impl MockRemote {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_document(document: ResumeDocument) -> Arc<Self> {
        Arc::new(Self {
            fallback: Some(document),
            ..Self::default()
        })
    }

    pub fn fail_fetch(&self, err: SyncError) {
        *self.fetch_error.lock().unwrap() = Some(err);
    }

    pub fn script_store(&self, delay: Duration, result: Result<(), SyncError>) {
        self.script
            .lock()
            .unwrap()
            .push_back(ScriptedStore { delay, result });
    }

    pub fn store_calls(&self) -> Vec<StoreCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub fn stored_for(&self, identity: &str) -> Option<ResumeDocument> {
        self.documents.lock().unwrap().get(identity).cloned()
    }
}

#[async_trait]
impl RemoteStore for MockRemote {
    async fn fetch(
        &self,
        identity: &IdentityKey,
        _token: &str,
    ) -> Result<Option<ResumeDocument>, SyncError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.fetch_error.lock().unwrap().clone() {
            return Err(err);
        }
        let stored = self.documents.lock().unwrap().get(identity.as_str()).cloned();
        Ok(stored.or_else(|| self.fallback.clone()))
    }

    async fn store(
        &self,
        identity: &IdentityKey,
        token: &str,
        document: &ResumeDocument,
    ) -> Result<ResumeDocument, SyncError> {
        self.calls.lock().unwrap().push(StoreCall {
            identity: identity.to_string(),
            token: token.to_string(),
            document: document.clone(),
            at: Instant::now(),
        });
        let scripted = self.script.lock().unwrap().pop_front();
        let (delay, result) = match scripted {
            Some(step) => (step.delay, step.result),
            None => (Duration::ZERO, Ok(())),
        };
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        result?;
        self.documents
            .lock()
            .unwrap()
            .insert(identity.to_string(), document.clone());
        Ok(document.clone())
    }
}

#[derive(Default)]
pub(crate) struct RecordingObserver {
    expired: Mutex<Vec<(String, String)>>,
}

impl RecordingObserver {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn expired(&self) -> Vec<(String, String)> {
        self.expired.lock().unwrap().clone()
    }
}

impl SessionObserver for RecordingObserver {
    fn session_expired(&self, identity: &IdentityKey, reason: &str) {
        self.expired
            .lock()
            .unwrap()
            .push((identity.to_string(), reason.to_string()));
    }
}
