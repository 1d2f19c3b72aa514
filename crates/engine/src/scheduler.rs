//! Debounced background flushes of the current document.
//!
//! `Idle -> Dirty -> Scheduled -> Flushing -> Idle | Dirty`, plus
//! `ReauthRequired` after a 401 and `Stopped` after shutdown. Flushes are
//! never cancelled; a late result is ordered against newer flushes by the
//! synced baseline's tickets.

use chrono::Utc;
use log::{debug, error, info, warn};
use rand::Rng;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use resumesync_core::sync::{
    FlushTicket, RemoteStore, SchedulerConfig, SessionObserver, SyncError, SyncPhase,
    SyncRetryClass, SyncStatus, SyncedBaseline, TokenProvider,
};
use resumesync_core::{IdentityKey, ResumeDocument};

/// Result of one flush attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlushOutcome {
    /// The remote accepted the document. `applied` is false when a newer
    /// flush had already completed and this result was discarded.
    Stored { applied: bool },
    /// The document equals the synced baseline; no request was sent.
    Unchanged,
    /// Nothing to send, or flushing is paused.
    Skipped,
    Failed(SyncError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Trigger {
    Timer,
    Manual,
}

enum Plan {
    Stop,
    Wait,
    FlushAt(Instant),
}

struct SchedulerState {
    phase: SyncPhase,
    current: Option<Arc<ResumeDocument>>,
    /// Bumped on every dirtying change.
    revision: u64,
    /// Highest revision known to match the remote.
    synced_revision: u64,
    needs_flush: bool,
    /// Revision sent by each request still in flight.
    in_flight: Vec<u64>,
    last_mutation_at: Option<Instant>,
    last_flush_started_at: Option<Instant>,
    retry_at: Option<Instant>,
    baseline: SyncedBaseline,
    status: SyncStatus,
}

impl SchedulerState {
    fn new(document: Option<Arc<ResumeDocument>>) -> Self {
        Self {
            phase: SyncPhase::Idle,
            current: document,
            revision: 0,
            synced_revision: 0,
            needs_flush: false,
            in_flight: Vec::new(),
            last_mutation_at: None,
            last_flush_started_at: None,
            retry_at: None,
            baseline: SyncedBaseline::new(),
            status: SyncStatus::default(),
        }
    }

    fn settle(&mut self) {
        self.phase = match self.phase {
            SyncPhase::ReauthRequired | SyncPhase::Stopped => self.phase,
            _ if !self.in_flight.is_empty() => SyncPhase::Flushing,
            _ if self.needs_flush || self.revision > self.synced_revision => SyncPhase::Dirty,
            _ => SyncPhase::Idle,
        };
    }

    fn clear_retry(&mut self) {
        self.retry_at = None;
        self.status.next_retry_at = None;
    }

    fn snapshot(&self) -> SyncStatus {
        SyncStatus {
            phase: self.phase,
            pending: self.needs_flush || self.revision > self.synced_revision,
            ..self.status.clone()
        }
    }
}

struct Shared {
    identity: IdentityKey,
    config: SchedulerConfig,
    remote: Arc<dyn RemoteStore>,
    tokens: Arc<dyn TokenProvider>,
    observer: Arc<dyn SessionObserver>,
    state: Mutex<SchedulerState>,
    wake: Notify,
    status: watch::Sender<SyncStatus>,
}

impl Shared {
    fn state(&self) -> MutexGuard<'_, SchedulerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, state: &SchedulerState) {
        self.status.send_replace(state.snapshot());
    }

    fn retry_delay(&self, consecutive_failures: u32) -> Duration {
        let delay = self.config.retry_delay(consecutive_failures);
        let jitter_ms = u64::try_from(self.config.retry_jitter.as_millis()).unwrap_or(u64::MAX);
        if jitter_ms == 0 {
            return delay;
        }
        delay + Duration::from_millis(rand::thread_rng().gen_range(0..=jitter_ms))
    }

    fn plan(&self) -> Plan {
        let mut state = self.state();
        if state.phase == SyncPhase::Stopped {
            return Plan::Stop;
        }
        if !state.needs_flush
            || !state.in_flight.is_empty()
            || state.phase == SyncPhase::ReauthRequired
        {
            return Plan::Wait;
        }

        let now = Instant::now();
        let mut due = state
            .last_mutation_at
            .map(|at| at + self.config.debounce)
            .unwrap_or(now);
        if let Some(started) = state.last_flush_started_at {
            due = due.max(started + self.config.min_flush_interval);
        }
        if let Some(retry_at) = state.retry_at {
            due = due.max(retry_at);
        }

        if state.phase == SyncPhase::Dirty {
            state.phase = SyncPhase::Scheduled;
            self.publish(&state);
        }
        Plan::FlushAt(due)
    }

    async fn run(self: Arc<Self>) {
        debug!("[ResumeSync] Scheduler started for {}", self.identity);
        loop {
            match self.plan() {
                Plan::Stop => break,
                Plan::Wait => self.wake.notified().await,
                Plan::FlushAt(due) => {
                    tokio::select! {
                        _ = tokio::time::sleep_until(due) => {
                            self.flush(Trigger::Timer).await;
                        }
                        _ = self.wake.notified() => {}
                    }
                }
            }
        }
        debug!("[ResumeSync] Scheduler stopped for {}", self.identity);
    }

    /// Wait until no request for the current revision is in flight.
    async fn await_in_flight_revision(&self) {
        let mut status = self.status.subscribe();
        loop {
            {
                let state = self.state();
                if !state.in_flight.contains(&state.revision) {
                    return;
                }
                debug!(
                    "[ResumeSync] Revision {} for {} already in flight, waiting for it",
                    state.revision, self.identity
                );
            }
            if status.changed().await.is_err() {
                return;
            }
        }
    }

    async fn flush(&self, trigger: Trigger) -> FlushOutcome {
        if trigger == Trigger::Manual {
            self.await_in_flight_revision().await;
        }
        let token = self.tokens.access_token();

        let (ticket, revision, document, token) = {
            let mut state = self.state();
            if matches!(state.phase, SyncPhase::Stopped | SyncPhase::ReauthRequired) {
                return FlushOutcome::Skipped;
            }
            if trigger == Trigger::Timer && !state.needs_flush {
                return FlushOutcome::Skipped;
            }
            let Some(document) = state.current.clone() else {
                state.needs_flush = false;
                return FlushOutcome::Skipped;
            };

            let revision = state.revision;
            if state.baseline.matches(&document) {
                debug!(
                    "[ResumeSync] Document for {} unchanged since last sync, skipping flush",
                    self.identity
                );
                state.needs_flush = false;
                state.synced_revision = state.synced_revision.max(revision);
                state.clear_retry();
                state.settle();
                self.publish(&state);
                return FlushOutcome::Unchanged;
            }

            let Some(token) = token else {
                let err = SyncError::Auth("Not authenticated. Please login.".to_string());
                drop(state);
                self.enter_reauth(&err);
                return FlushOutcome::Failed(err);
            };

            let ticket = state.baseline.begin_flush();
            state.needs_flush = false;
            state.in_flight.push(revision);
            state.phase = SyncPhase::Flushing;
            state.last_flush_started_at = Some(Instant::now());
            state.status.flush_count += 1;
            self.publish(&state);
            (ticket, revision, document, token)
        };

        debug!(
            "[ResumeSync] Flush #{} started for {} (revision {})",
            ticket.sequence(),
            self.identity,
            revision
        );
        let result = self.remote.store(&self.identity, &token, &document).await;
        let outcome = self.finish_flush(ticket, revision, result);
        self.wake.notify_one();
        outcome
    }

    fn finish_flush(
        &self,
        ticket: FlushTicket,
        revision: u64,
        result: Result<ResumeDocument, SyncError>,
    ) -> FlushOutcome {
        let mut state = self.state();
        if let Some(slot) = state.in_flight.iter().position(|sent| *sent == revision) {
            state.in_flight.swap_remove(slot);
        }

        let outcome = match result {
            Ok(stored) => {
                let applied = state.baseline.complete(ticket, Arc::new(stored));
                if applied {
                    state.synced_revision = state.synced_revision.max(revision);
                    debug!("[ResumeSync] Flush #{} stored", ticket.sequence());
                } else {
                    debug!(
                        "[ResumeSync] Flush #{} completed after a newer flush, result discarded",
                        ticket.sequence()
                    );
                }
                state.status.consecutive_failures = 0;
                state.status.last_error = None;
                state.status.last_synced_at = Some(Utc::now());
                state.clear_retry();
                FlushOutcome::Stored { applied }
            }
            Err(err) if state.baseline.has_newer_than(ticket) => {
                debug!(
                    "[ResumeSync] Flush #{} failed after a newer flush completed: {}",
                    ticket.sequence(),
                    err
                );
                FlushOutcome::Failed(err)
            }
            Err(err) if err.retry_class() == SyncRetryClass::ReauthRequired => {
                drop(state);
                self.enter_reauth(&err);
                return FlushOutcome::Failed(err);
            }
            Err(err) => {
                state.status.consecutive_failures += 1;
                state.status.last_error = Some(err.to_string());
                if err.retry_class() == SyncRetryClass::Retryable {
                    let delay = self.retry_delay(state.status.consecutive_failures);
                    state.needs_flush = true;
                    state.retry_at = Some(Instant::now() + delay);
                    state.status.next_retry_at = chrono::Duration::from_std(delay)
                        .ok()
                        .map(|delay| Utc::now() + delay);
                    warn!(
                        "[ResumeSync] Flush #{} failed ({} in a row), retrying in {:?}: {}",
                        ticket.sequence(),
                        state.status.consecutive_failures,
                        delay,
                        err
                    );
                } else {
                    state.clear_retry();
                    error!(
                        "[ResumeSync] Flush #{} rejected, waiting for the next edit: {}",
                        ticket.sequence(),
                        err
                    );
                }
                FlushOutcome::Failed(err)
            }
        };

        state.settle();
        self.publish(&state);
        outcome
    }

    fn pause_for_reauth(&self, err: &SyncError, keep_pending: bool) {
        let mut state = self.state();
        if keep_pending {
            state.needs_flush = true;
        }
        state.status.last_error = Some(err.to_string());
        state.clear_retry();
        if state.phase != SyncPhase::Stopped {
            state.phase = SyncPhase::ReauthRequired;
        }
        self.publish(&state);
    }

    fn enter_reauth(&self, err: &SyncError) {
        self.pause_for_reauth(err, true);
        warn!(
            "[ResumeSync] Session expired for {}, flushing paused: {}",
            self.identity, err
        );
        self.observer.session_expired(&self.identity, &err.to_string());
    }
}

/// Owns the background flush task for one identity.
pub struct SyncScheduler {
    shared: Arc<Shared>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl SyncScheduler {
    /// Spawn the flush task. Must be called from within a tokio runtime.
    pub fn start(
        identity: IdentityKey,
        document: Option<Arc<ResumeDocument>>,
        config: SchedulerConfig,
        remote: Arc<dyn RemoteStore>,
        tokens: Arc<dyn TokenProvider>,
        observer: Arc<dyn SessionObserver>,
    ) -> Self {
        let state = SchedulerState::new(document);
        let (status, _) = watch::channel(state.snapshot());
        let shared = Arc::new(Shared {
            identity,
            config,
            remote,
            tokens,
            observer,
            state: Mutex::new(state),
            wake: Notify::new(),
            status,
        });
        let handle = tokio::spawn(Arc::clone(&shared).run());
        Self {
            shared,
            worker: Mutex::new(Some(handle)),
        }
    }

    pub fn identity(&self) -> &IdentityKey {
        &self.shared.identity
    }

    /// Record a new document version and (re)arm the debounce timer.
    pub fn notify_dirty(&self, document: Arc<ResumeDocument>) {
        {
            let mut state = self.shared.state();
            state.current = Some(document);
            state.revision += 1;
            state.needs_flush = true;
            state.last_mutation_at = Some(Instant::now());
            if state.phase == SyncPhase::Idle {
                state.phase = SyncPhase::Dirty;
            }
            self.shared.publish(&state);
        }
        self.shared.wake.notify_one();
    }

    /// Seed the synced baseline from a fetched remote document (`None`: the
    /// remote has no document). Queues a flush when the current document
    /// differs. Returns true when a flush was queued.
    pub fn seed_baseline(&self, remote: Option<ResumeDocument>) -> bool {
        let queued = {
            let mut state = self.shared.state();
            if let Some(remote) = remote {
                if !state.baseline.seed(Arc::new(remote)) {
                    debug!("[ResumeSync] Remote baseline ignored, a flush already completed");
                    return false;
                }
            }
            let differs = state
                .current
                .as_deref()
                .is_some_and(|document| !state.baseline.matches(document));
            if differs {
                state.revision += 1;
                state.needs_flush = true;
                state.last_mutation_at = Some(Instant::now());
            } else if !state.needs_flush && state.in_flight.is_empty() {
                state.synced_revision = state.revision;
            }
            state.settle();
            self.shared.publish(&state);
            differs
        };
        if queued {
            self.shared.wake.notify_one();
        }
        queued
    }

    /// Flush immediately, bypassing debounce and the minimum interval.
    pub async fn flush_now(&self) -> FlushOutcome {
        self.shared.flush(Trigger::Manual).await
    }

    /// Enter `ReauthRequired` after an auth failure seen outside a flush.
    /// The session observer is not notified again.
    pub fn pause_for_reauth(&self, err: &SyncError) {
        self.shared.pause_for_reauth(err, false);
        info!(
            "[ResumeSync] Flushing paused for {} until reauthentication",
            self.shared.identity
        );
    }

    /// Leave `ReauthRequired` once the token provider has a fresh token.
    pub fn resume_after_reauth(&self) {
        {
            let mut state = self.shared.state();
            if state.phase != SyncPhase::ReauthRequired {
                return;
            }
            state.status.consecutive_failures = 0;
            state.status.last_error = None;
            state.clear_retry();
            state.phase = SyncPhase::Idle;
            state.settle();
            self.shared.publish(&state);
        }
        info!(
            "[ResumeSync] Flushing resumed for {}",
            self.shared.identity
        );
        self.shared.wake.notify_one();
    }

    pub fn status(&self) -> SyncStatus {
        self.shared.status.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SyncStatus> {
        self.shared.status.subscribe()
    }

    /// Last document confirmed stored remotely.
    pub fn synced_baseline(&self) -> Option<Arc<ResumeDocument>> {
        self.shared.state().baseline.snapshot().cloned()
    }

    /// Stop the flush task. An in-flight flush is allowed to finish.
    pub async fn shutdown(&self) {
        {
            let mut state = self.shared.state();
            state.phase = SyncPhase::Stopped;
            state.clear_retry();
            self.shared.publish(&state);
        }
        self.shared.wake.notify_one();

        let handle = self
            .worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            if let Err(err) = handle.await {
                if !err.is_cancelled() {
                    warn!("[ResumeSync] Scheduler task ended abnormally: {}", err);
                }
            }
        }
    }
}

impl Drop for SyncScheduler {
    fn drop(&mut self) {
        if let Some(handle) = self
            .worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests;
