//! Chooses the initial document on editor start.
//!
//! Order: local cache, then remote store, then the default template. The
//! chosen document replaces the others whole; nothing is merged.

use log::{debug, error, info, warn};
use std::sync::Arc;

use resumesync_core::sync::{RemoteStore, SessionObserver, SyncError, TokenProvider};
use resumesync_core::{DocumentCache, IdentityKey, ResumeDocument};

use crate::error::{EngineError, Result};

/// Where the initial document came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentSource {
    LocalCache,
    Remote,
    DefaultTemplate,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Reconciled {
    pub document: ResumeDocument,
    pub source: DocumentSource,
    /// The remote document when it was fetched during loading.
    pub remote_baseline: Option<ResumeDocument>,
}

#[derive(Clone)]
pub struct ReconciliationLoader {
    cache: DocumentCache,
    remote: Arc<dyn RemoteStore>,
    tokens: Arc<dyn TokenProvider>,
    observer: Arc<dyn SessionObserver>,
}

impl ReconciliationLoader {
    pub fn new(
        cache: DocumentCache,
        remote: Arc<dyn RemoteStore>,
        tokens: Arc<dyn TokenProvider>,
        observer: Arc<dyn SessionObserver>,
    ) -> Self {
        Self {
            cache,
            remote,
            tokens,
            observer,
        }
    }

    /// Pick the initial document for `identity`.
    ///
    /// A remote failure other than "not found" is returned rather than
    /// replaced with the template, so an unreachable server never leads to
    /// the stored document being overwritten. Auth failures also reach the
    /// session observer. When the cached entry was unreadable, non-auth
    /// remote failures start the editor from an uncached template instead.
    pub async fn load(&self, identity: &IdentityKey) -> Result<Reconciled> {
        let cache_unreadable = match self.cache.load(identity) {
            Ok(Some(document)) => {
                info!("[Reconcile] Using cached document for {}", identity);
                return Ok(Reconciled {
                    document,
                    source: DocumentSource::LocalCache,
                    remote_baseline: None,
                });
            }
            Ok(None) => false,
            Err(err) => {
                error!(
                    "[Reconcile] Ignoring unreadable cached document for {}: {}",
                    identity, err
                );
                true
            }
        };

        let reconciled = match self.fetch_remote(identity).await {
            Ok(Some(remote)) => {
                info!("[Reconcile] Using remote document for {}", identity);
                Reconciled {
                    document: remote.clone(),
                    source: DocumentSource::Remote,
                    remote_baseline: Some(remote),
                }
            }
            Ok(None) => {
                info!(
                    "[Reconcile] No document stored for {}, starting from template",
                    identity
                );
                Self::template()
            }
            Err(SyncError::Parse(message)) => {
                error!(
                    "[Reconcile] Remote document for {} is unreadable, starting from template: {}",
                    identity, message
                );
                Self::template()
            }
            Err(err) if cache_unreadable && !err.is_auth() => {
                warn!(
                    "[Reconcile] Remote unavailable and cache unreadable for {}, editing a template: {}",
                    identity, err
                );
                return Ok(Self::template());
            }
            Err(err) => return Err(EngineError::Remote(err)),
        };

        self.write_through(identity, &reconciled.document);
        Ok(reconciled)
    }

    /// Fetch the remote document with the current token.
    pub async fn fetch_remote(
        &self,
        identity: &IdentityKey,
    ) -> std::result::Result<Option<ResumeDocument>, SyncError> {
        let Some(token) = self.tokens.access_token() else {
            let err = SyncError::Auth("Not authenticated. Please login.".to_string());
            self.observer.session_expired(identity, &err.to_string());
            return Err(err);
        };

        match self.remote.fetch(identity, &token).await {
            Ok(document) => Ok(document),
            Err(err) if err.is_auth() => {
                warn!("[Reconcile] Session expired while loading {}: {}", identity, err);
                self.observer.session_expired(identity, &err.to_string());
                Err(err)
            }
            Err(err) => {
                warn!("[Reconcile] Remote fetch failed for {}: {}", identity, err);
                Err(err)
            }
        }
    }

    fn write_through(&self, identity: &IdentityKey, document: &ResumeDocument) {
        match self.cache.save(identity, document) {
            Ok(()) => debug!("[Reconcile] Cached initial document for {}", identity),
            Err(err) => error!(
                "[Reconcile] Failed to cache initial document for {}: {}",
                identity, err
            ),
        }
    }

    fn template() -> Reconciled {
        Reconciled {
            document: ResumeDocument::template(),
            source: DocumentSource::DefaultTemplate,
            remote_baseline: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{named, MockRemote, RecordingObserver};
    use resumesync_core::document::DEFAULT_SKILL_CATEGORIES;
    use resumesync_core::sync::StaticTokenProvider;
    use resumesync_core::{LocalStore, MemoryStore};

    fn loader(
        store: Arc<MemoryStore>,
        remote: Arc<MockRemote>,
        token: Option<&str>,
    ) -> (ReconciliationLoader, Arc<RecordingObserver>) {
        let observer = RecordingObserver::new();
        let loader = ReconciliationLoader::new(
            DocumentCache::new(store),
            remote,
            Arc::new(StaticTokenProvider::new(token.map(str::to_string))),
            observer.clone(),
        );
        (loader, observer)
    }

    #[tokio::test]
    async fn local_cache_wins_without_waiting_for_remote() {
        let store = Arc::new(MemoryStore::new());
        let identity = IdentityKey::new("ada");
        DocumentCache::new(store.clone())
            .save(&identity, &named("local"))
            .unwrap();
        let remote = MockRemote::with_document(named("remote"));

        let (loader, _) = loader(store, remote.clone(), Some("tok"));
        let reconciled = loader.load(&identity).await.unwrap();

        assert_eq!(reconciled.source, DocumentSource::LocalCache);
        assert_eq!(reconciled.document.personal_info.name, "local");
        assert_eq!(remote.fetch_count(), 0);
    }

    #[tokio::test]
    async fn remote_not_found_yields_default_template() {
        let store = Arc::new(MemoryStore::new());
        let (loader, observer) = loader(store.clone(), MockRemote::new(), Some("tok"));
        let identity = IdentityKey::new("new-user");

        let reconciled = loader.load(&identity).await.unwrap();
        let document = &reconciled.document;

        assert_eq!(reconciled.source, DocumentSource::DefaultTemplate);
        assert_eq!(document.experience.len(), 1);
        assert_eq!(document.projects.len(), 1);
        assert_eq!(document.academics.len(), 1);
        assert_eq!(document.contact.len(), 1);
        assert_eq!(document.certifications.len(), 1);
        assert_eq!(document.interests, vec![String::new()]);
        assert_eq!(
            document.skills.keys().map(String::as_str).collect::<Vec<_>>(),
            DEFAULT_SKILL_CATEGORIES.to_vec()
        );
        assert!(document.skills.values().all(|slots| slots == &vec![String::new()]));
        assert!(observer.expired().is_empty());

        // Cached so the next start does not go to the network.
        assert!(store.get(&identity.cache_key()).unwrap().is_some());
    }

    #[tokio::test]
    async fn remote_document_used_when_cache_is_empty() {
        let remote = MockRemote::with_document(named("remote"));
        let (loader, _) = loader(Arc::new(MemoryStore::new()), remote, Some("tok"));

        let reconciled = loader.load(&IdentityKey::new("ada")).await.unwrap();
        assert_eq!(reconciled.source, DocumentSource::Remote);
        assert_eq!(reconciled.remote_baseline, Some(named("remote")));
    }

    #[tokio::test]
    async fn corrupt_cache_falls_through_to_remote() {
        let store = Arc::new(MemoryStore::new());
        let identity = IdentityKey::new("ada");
        store.put(&identity.cache_key(), "{\"experience\":").unwrap();
        let remote = MockRemote::with_document(named("remote"));

        let (loader, _) = loader(store, remote, Some("tok"));
        let reconciled = loader.load(&identity).await.unwrap();
        assert_eq!(reconciled.source, DocumentSource::Remote);
    }

    #[tokio::test]
    async fn corrupt_cache_with_remote_down_starts_from_template() {
        let store = Arc::new(MemoryStore::new());
        let identity = IdentityKey::new("ada");
        store.put(&identity.cache_key(), "{\"experience\":").unwrap();
        let remote = MockRemote::new();
        remote.fail_fetch(SyncError::Network("connection refused".into()));

        let (loader, observer) = loader(store.clone(), remote, Some("tok"));
        let reconciled = loader.load(&identity).await.unwrap();

        assert_eq!(reconciled.source, DocumentSource::DefaultTemplate);
        assert_eq!(reconciled.document, ResumeDocument::template());
        assert!(observer.expired().is_empty());
        // Not written through; the next edit replaces the entry.
        assert_eq!(
            store.get(&identity.cache_key()).unwrap().as_deref(),
            Some("{\"experience\":")
        );
    }

    #[tokio::test]
    async fn corrupt_cache_with_expired_session_is_still_an_error() {
        let store = Arc::new(MemoryStore::new());
        let identity = IdentityKey::new("ada");
        store.put(&identity.cache_key(), "not json").unwrap();
        let remote = MockRemote::new();
        remote.fail_fetch(SyncError::Auth("Token expired".into()));

        let (loader, observer) = loader(store, remote, Some("tok"));
        let err = loader.load(&identity).await.unwrap_err();
        assert!(err.is_auth());
        assert_eq!(observer.expired().len(), 1);
    }

    #[tokio::test]
    async fn expired_session_is_surfaced_not_defaulted() {
        let remote = MockRemote::new();
        remote.fail_fetch(SyncError::Auth("Token expired".into()));
        let (loader, observer) = loader(Arc::new(MemoryStore::new()), remote, Some("tok"));

        let err = loader.load(&IdentityKey::new("ada")).await.unwrap_err();
        assert!(err.is_auth());
        assert_eq!(observer.expired().len(), 1);
    }

    #[tokio::test]
    async fn network_failure_without_cache_is_an_error() {
        let remote = MockRemote::new();
        remote.fail_fetch(SyncError::Network("connection refused".into()));
        let (loader, observer) = loader(Arc::new(MemoryStore::new()), remote, Some("tok"));

        let err = loader.load(&IdentityKey::new("ada")).await.unwrap_err();
        assert!(matches!(err, EngineError::Remote(SyncError::Network(_))));
        assert!(observer.expired().is_empty());
    }

    #[tokio::test]
    async fn unreadable_remote_document_falls_back_to_template() {
        let remote = MockRemote::new();
        remote.fail_fetch(SyncError::Parse("expected value".into()));
        let (loader, _) = loader(Arc::new(MemoryStore::new()), remote, Some("tok"));

        let reconciled = loader.load(&IdentityKey::new("ada")).await.unwrap();
        assert_eq!(reconciled.source, DocumentSource::DefaultTemplate);
    }

    #[tokio::test]
    async fn missing_token_reaches_observer() {
        let (loader, observer) = loader(Arc::new(MemoryStore::new()), MockRemote::new(), None);
        let err = loader.load(&IdentityKey::new("ada")).await.unwrap_err();
        assert!(err.is_auth());
        assert_eq!(observer.expired()[0].0, "ada");
    }
}
