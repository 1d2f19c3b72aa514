//! Editor session: the single owner of one identity's in-memory document.
//!
//! Every mutation is applied purely, written through to the local cache
//! before the call returns, and then handed to the scheduler.

use log::{debug, error, info};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use resumesync_core::completeness::{self, Completeness};
use resumesync_core::document::FieldPath;
use resumesync_core::improve::{ContentImprover, ContentType, ImprovedContent};
use resumesync_core::mutation::read_field;
use resumesync_core::sync::{
    RemoteStore, SchedulerConfig, SessionObserver, SyncStatus, TokenProvider,
};
use resumesync_core::{Applied, DocumentCache, IdentityKey, Mutation, ResumeDocument, SchemaError};

use crate::error::Result;
use crate::loader::{DocumentSource, Reconciled, ReconciliationLoader};
use crate::scheduler::{FlushOutcome, SyncScheduler};

/// Collaborators shared by every session of the application.
#[derive(Clone)]
pub struct SyncContext {
    pub cache: DocumentCache,
    pub remote: Arc<dyn RemoteStore>,
    pub tokens: Arc<dyn TokenProvider>,
    pub observer: Arc<dyn SessionObserver>,
    pub config: SchedulerConfig,
}

impl SyncContext {
    pub fn loader(&self) -> ReconciliationLoader {
        ReconciliationLoader::new(
            self.cache.clone(),
            Arc::clone(&self.remote),
            Arc::clone(&self.tokens),
            Arc::clone(&self.observer),
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MutationOutcome {
    /// False when the mutation left the document unchanged.
    pub dirty: bool,
    /// False when the local cache write failed. The edit is kept in memory.
    pub persisted: bool,
}

pub struct EditorSession {
    identity: IdentityKey,
    cache: DocumentCache,
    document: Arc<ResumeDocument>,
    source: DocumentSource,
    scheduler: Arc<SyncScheduler>,
    background_fetch: Option<JoinHandle<()>>,
}

impl EditorSession {
    /// Reconcile the initial document and start syncing.
    ///
    /// With a cached document the editor starts immediately and the remote
    /// copy is fetched in the background; it only seeds the synced baseline.
    pub async fn open(context: &SyncContext, identity: IdentityKey) -> Result<Self> {
        let loader = context.loader();
        let Reconciled {
            document,
            source,
            remote_baseline,
        } = loader.load(&identity).await?;

        let document = Arc::new(document);
        let scheduler = Arc::new(SyncScheduler::start(
            identity.clone(),
            Some(Arc::clone(&document)),
            context.config.clone(),
            Arc::clone(&context.remote),
            Arc::clone(&context.tokens),
            Arc::clone(&context.observer),
        ));

        let background_fetch = match source {
            DocumentSource::Remote => {
                scheduler.seed_baseline(remote_baseline);
                None
            }
            DocumentSource::LocalCache => Some(Self::spawn_background_fetch(
                loader,
                identity.clone(),
                Arc::clone(&scheduler),
            )),
            DocumentSource::DefaultTemplate => None,
        };

        info!("[ResumeSync] Session opened for {} ({:?})", identity, source);
        Ok(Self {
            identity,
            cache: context.cache.clone(),
            document,
            source,
            scheduler,
            background_fetch,
        })
    }

    fn spawn_background_fetch(
        loader: ReconciliationLoader,
        identity: IdentityKey,
        scheduler: Arc<SyncScheduler>,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            match loader.fetch_remote(&identity).await {
                Ok(remote) => {
                    if scheduler.seed_baseline(remote) {
                        debug!(
                            "[Reconcile] Cached document for {} differs from remote, pushing it",
                            identity
                        );
                    }
                }
                Err(err) if err.is_auth() => scheduler.pause_for_reauth(&err),
                Err(err) => {
                    debug!(
                        "[Reconcile] Background fetch for {} failed, keeping cached document: {}",
                        identity, err
                    );
                }
            }
        })
    }

    pub fn identity(&self) -> &IdentityKey {
        &self.identity
    }

    pub fn source(&self) -> DocumentSource {
        self.source
    }

    pub fn document(&self) -> Arc<ResumeDocument> {
        Arc::clone(&self.document)
    }

    /// Apply `mutation`, write the result to the local cache and mark it dirty.
    ///
    /// Invalid paths fail with [`SchemaError`] and leave the document as is.
    pub fn apply(
        &mut self,
        mutation: &Mutation,
    ) -> std::result::Result<MutationOutcome, SchemaError> {
        let Applied { document, dirty } = mutation.apply(&self.document)?;
        if !dirty {
            return Ok(MutationOutcome {
                dirty: false,
                persisted: true,
            });
        }

        let persisted = match self.cache.save(&self.identity, &document) {
            Ok(()) => true,
            Err(err) => {
                error!(
                    "[ResumeSync] Local save failed for {}, edit kept in memory: {}",
                    self.identity, err
                );
                false
            }
        };

        self.document = Arc::new(document);
        self.scheduler.notify_dirty(Arc::clone(&self.document));
        Ok(MutationOutcome {
            dirty: true,
            persisted,
        })
    }

    /// Replace the document with the default template.
    pub fn reset(&mut self) -> std::result::Result<MutationOutcome, SchemaError> {
        self.apply(&Mutation::ResetToTemplate)
    }

    /// Send the text at `path` to `improver` and apply the result.
    pub async fn improve_field(
        &mut self,
        improver: &dyn ContentImprover,
        path: FieldPath,
    ) -> Result<ImprovedContent> {
        let original = read_field(&self.document, &path)?.to_string();
        let improved = improver
            .improve(&original, ContentType::for_path(&path))
            .await?;
        self.apply(&Mutation::set(path, improved.text.clone()))?;
        Ok(improved)
    }

    pub fn completeness(&self) -> Completeness {
        completeness::score(&self.document)
    }

    pub fn status(&self) -> SyncStatus {
        self.scheduler.status()
    }

    pub fn subscribe(&self) -> watch::Receiver<SyncStatus> {
        self.scheduler.subscribe()
    }

    pub fn synced_baseline(&self) -> Option<Arc<ResumeDocument>> {
        self.scheduler.synced_baseline()
    }

    pub async fn flush_now(&self) -> FlushOutcome {
        self.scheduler.flush_now().await
    }

    pub fn resume_after_reauth(&self) {
        self.scheduler.resume_after_reauth();
    }

    /// Flush pending edits immediately, then stop the scheduler.
    pub async fn close(mut self) -> SyncStatus {
        if let Some(handle) = self.background_fetch.take() {
            handle.abort();
        }
        if self.scheduler.status().pending {
            let outcome = self.scheduler.flush_now().await;
            debug!(
                "[ResumeSync] Final flush for {}: {:?}",
                self.identity, outcome
            );
        }
        self.scheduler.shutdown().await;
        info!("[ResumeSync] Session closed for {}", self.identity);
        self.scheduler.status()
    }
}

impl Drop for EditorSession {
    fn drop(&mut self) {
        if let Some(handle) = self.background_fetch.take() {
            handle.abort();
        }
    }
}
