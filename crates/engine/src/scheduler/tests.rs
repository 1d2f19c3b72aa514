use super::*;
use crate::test_support::{ms, named, MockRemote, RecordingObserver};
use resumesync_core::sync::{StaticTokenProvider, SyncIndicator};

struct Harness {
    scheduler: SyncScheduler,
    remote: Arc<MockRemote>,
    tokens: Arc<StaticTokenProvider>,
    observer: Arc<RecordingObserver>,
    started: Instant,
}

fn harness_with(remote: Arc<MockRemote>, document: Option<ResumeDocument>) -> Harness {
    let tokens = Arc::new(StaticTokenProvider::new(Some("token-1".into())));
    let observer = RecordingObserver::new();
    let scheduler = SyncScheduler::start(
        IdentityKey::new("ada"),
        document.map(Arc::new),
        SchedulerConfig::default().without_jitter(),
        remote.clone(),
        tokens.clone(),
        observer.clone(),
    );
    Harness {
        scheduler,
        remote,
        tokens,
        observer,
        started: Instant::now(),
    }
}

fn harness() -> Harness {
    harness_with(MockRemote::new(), None)
}

#[tokio::test(start_paused = true)]
async fn rapid_mutations_coalesce_into_one_flush_with_final_state() {
    let h = harness();
    for i in 0..5 {
        h.scheduler.notify_dirty(Arc::new(named(&format!("draft {}", i))));
        tokio::time::sleep(ms(100)).await;
    }
    tokio::time::sleep(ms(2_000)).await;

    let calls = h.remote.store_calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].document.personal_info.name, "draft 4");
    assert_eq!(calls[0].token, "token-1");
    assert_eq!(calls[0].identity, "ada");
    // Last mutation at 400 ms plus the 500 ms window.
    assert_eq!(calls[0].at.duration_since(h.started), ms(900));

    let status = h.scheduler.status();
    assert_eq!(status.phase, SyncPhase::Idle);
    assert!(!status.pending);
    assert_eq!(status.flush_count, 1);
    assert!(status.last_synced_at.is_some());
}

#[tokio::test(start_paused = true)]
async fn unchanged_document_is_not_sent_twice() {
    let h = harness();
    let document = named("Ada");
    h.scheduler.notify_dirty(Arc::new(document.clone()));
    tokio::time::sleep(ms(1_000)).await;
    assert_eq!(h.remote.store_calls().len(), 1);

    h.scheduler.notify_dirty(Arc::new(document.clone()));
    tokio::time::sleep(ms(5_000)).await;
    assert_eq!(h.remote.store_calls().len(), 1);
    assert_eq!(h.scheduler.flush_now().await, FlushOutcome::Unchanged);
    assert_eq!(h.remote.store_calls().len(), 1);
    assert_eq!(h.scheduler.status().phase, SyncPhase::Idle);
}

#[tokio::test(start_paused = true)]
async fn flushes_respect_minimum_interval() {
    let h = harness();
    h.scheduler.notify_dirty(Arc::new(named("first")));
    tokio::time::sleep(ms(600)).await;
    assert_eq!(h.remote.store_calls().len(), 1);

    h.scheduler.notify_dirty(Arc::new(named("second")));
    tokio::time::sleep(ms(3_000)).await;

    let calls = h.remote.store_calls();
    assert_eq!(calls.len(), 2);
    // First flush started at 500 ms; the debounce alone would allow 1100 ms.
    assert_eq!(calls[1].at.duration_since(h.started), ms(1_500));
    assert_eq!(calls[1].document.personal_info.name, "second");
}

#[tokio::test(start_paused = true)]
async fn network_failure_retries_after_backoff() {
    let h = harness();
    h.remote
        .script_store(Duration::ZERO, Err(SyncError::Network("connection refused".into())));

    h.scheduler.notify_dirty(Arc::new(named("Ada")));
    tokio::time::sleep(ms(1_000)).await;

    let status = h.scheduler.status();
    assert_eq!(h.remote.store_calls().len(), 1);
    assert_eq!(status.consecutive_failures, 1);
    assert!(status.pending);
    assert!(status.next_retry_at.is_some());
    assert_eq!(status.indicator(), SyncIndicator::SyncFailed);

    tokio::time::sleep(ms(10_000)).await;
    let calls = h.remote.store_calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[1].at.duration_since(h.started), ms(5_500));

    let status = h.scheduler.status();
    assert_eq!(status.phase, SyncPhase::Idle);
    assert_eq!(status.consecutive_failures, 0);
    assert_eq!(status.last_error, None);
    assert_eq!(status.indicator(), SyncIndicator::Saved);
}

#[tokio::test(start_paused = true)]
async fn edits_during_backoff_do_not_hot_loop() {
    let h = harness();
    h.remote
        .script_store(Duration::ZERO, Err(SyncError::Network("down".into())));
    h.scheduler.notify_dirty(Arc::new(named("one")));
    tokio::time::sleep(ms(1_000)).await;

    h.scheduler.notify_dirty(Arc::new(named("two")));
    tokio::time::sleep(ms(1_000)).await;
    assert_eq!(h.remote.store_calls().len(), 1);

    tokio::time::sleep(ms(5_000)).await;
    let calls = h.remote.store_calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[1].document.personal_info.name, "two");
}

#[tokio::test(start_paused = true)]
async fn unauthorized_pauses_flushing_until_reauth() {
    let h = harness();
    h.remote
        .script_store(Duration::ZERO, Err(SyncError::Auth("Token expired".into())));

    h.scheduler.notify_dirty(Arc::new(named("one")));
    tokio::time::sleep(ms(1_000)).await;

    assert_eq!(h.scheduler.status().phase, SyncPhase::ReauthRequired);
    assert_eq!(h.scheduler.status().indicator(), SyncIndicator::SignedOut);
    assert_eq!(
        h.observer.expired(),
        vec![(
            "ada".to_string(),
            "authentication required: Token expired".to_string()
        )]
    );

    h.scheduler.notify_dirty(Arc::new(named("two")));
    tokio::time::sleep(ms(600_000)).await;
    assert_eq!(h.remote.store_calls().len(), 1);
    assert_eq!(h.scheduler.flush_now().await, FlushOutcome::Skipped);

    h.tokens.set(Some("token-2".into()));
    h.scheduler.resume_after_reauth();
    tokio::time::sleep(ms(1_000)).await;

    let calls = h.remote.store_calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[1].token, "token-2");
    assert_eq!(calls[1].document.personal_info.name, "two");
    assert_eq!(h.scheduler.status().phase, SyncPhase::Idle);
}

#[tokio::test(start_paused = true)]
async fn missing_token_is_treated_as_expired_session() {
    let h = harness();
    h.tokens.set(None);
    h.scheduler.notify_dirty(Arc::new(named("Ada")));
    tokio::time::sleep(ms(1_000)).await;

    assert!(h.remote.store_calls().is_empty());
    assert_eq!(h.scheduler.status().phase, SyncPhase::ReauthRequired);
    assert_eq!(h.observer.expired().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn rejected_flush_waits_for_next_edit() {
    let h = harness();
    h.remote.script_store(
        Duration::ZERO,
        Err(SyncError::Rejected {
            status: 422,
            message: "invalid profile".into(),
        }),
    );

    h.scheduler.notify_dirty(Arc::new(named("one")));
    tokio::time::sleep(ms(60_000)).await;
    assert_eq!(h.remote.store_calls().len(), 1);

    let status = h.scheduler.status();
    assert_eq!(status.phase, SyncPhase::Dirty);
    assert!(status.pending);
    assert_eq!(status.next_retry_at, None);
    assert_eq!(status.indicator(), SyncIndicator::SyncFailed);

    h.scheduler.notify_dirty(Arc::new(named("two")));
    tokio::time::sleep(ms(1_000)).await;
    assert_eq!(h.remote.store_calls().len(), 2);
    assert_eq!(h.scheduler.status().phase, SyncPhase::Idle);
}

#[tokio::test(start_paused = true)]
async fn newer_flush_wins_when_it_completes_first() {
    let h = harness();
    h.remote.script_store(ms(5_000), Ok(()));
    h.remote.script_store(Duration::ZERO, Ok(()));

    h.scheduler.notify_dirty(Arc::new(named("older")));
    tokio::time::sleep(ms(600)).await;
    assert_eq!(h.scheduler.status().phase, SyncPhase::Flushing);

    h.scheduler.notify_dirty(Arc::new(named("newer")));
    assert_eq!(
        h.scheduler.flush_now().await,
        FlushOutcome::Stored { applied: true }
    );
    assert_eq!(
        h.scheduler.synced_baseline().unwrap().personal_info.name,
        "newer"
    );

    tokio::time::sleep(ms(10_000)).await;
    assert_eq!(h.remote.store_calls().len(), 2);
    assert_eq!(
        h.scheduler.synced_baseline().unwrap().personal_info.name,
        "newer"
    );
    let status = h.scheduler.status();
    assert_eq!(status.phase, SyncPhase::Idle);
    assert!(!status.pending);
}

#[tokio::test(start_paused = true)]
async fn mutation_during_flight_schedules_follow_up_flush() {
    let h = harness();
    h.remote.script_store(ms(2_000), Ok(()));

    h.scheduler.notify_dirty(Arc::new(named("first")));
    tokio::time::sleep(ms(600)).await;
    h.scheduler.notify_dirty(Arc::new(named("second")));
    assert_eq!(h.scheduler.status().phase, SyncPhase::Flushing);

    tokio::time::sleep(ms(5_000)).await;
    let calls = h.remote.store_calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].document.personal_info.name, "first");
    assert_eq!(calls[1].document.personal_info.name, "second");
    // Second flush waits for the first to settle at 2500 ms.
    assert_eq!(calls[1].at.duration_since(h.started), ms(2_500));
}

#[tokio::test(start_paused = true)]
async fn manual_flush_waits_for_in_flight_request_of_same_revision() {
    let h = harness();
    h.remote.script_store(ms(2_000), Ok(()));

    h.scheduler.notify_dirty(Arc::new(named("Ada")));
    tokio::time::sleep(ms(600)).await;
    assert_eq!(h.scheduler.status().phase, SyncPhase::Flushing);

    assert_eq!(h.scheduler.flush_now().await, FlushOutcome::Unchanged);
    assert_eq!(h.started.elapsed(), ms(2_500));
    assert_eq!(h.remote.store_calls().len(), 1);
    let status = h.scheduler.status();
    assert_eq!(status.phase, SyncPhase::Idle);
    assert!(!status.pending);
}

#[tokio::test(start_paused = true)]
async fn manual_flush_after_failed_in_flight_request_sends_again() {
    let h = harness();
    h.remote.script_store(ms(2_000), Err(SyncError::Network("reset".into())));

    h.scheduler.notify_dirty(Arc::new(named("Ada")));
    tokio::time::sleep(ms(600)).await;

    assert_eq!(
        h.scheduler.flush_now().await,
        FlushOutcome::Stored { applied: true }
    );
    let calls = h.remote.store_calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[1].at.duration_since(h.started), ms(2_500));
    assert!(!h.scheduler.status().pending);
}

#[tokio::test(start_paused = true)]
async fn background_auth_failure_pauses_without_notifying_again() {
    let h = harness_with(MockRemote::new(), Some(named("cached")));
    h.scheduler.pause_for_reauth(&SyncError::Auth("Token expired".into()));
    h.scheduler.notify_dirty(Arc::new(named("edited")));
    tokio::time::sleep(ms(5_000)).await;

    assert!(h.remote.store_calls().is_empty());
    assert!(h.observer.expired().is_empty());
    let status = h.scheduler.status();
    assert_eq!(status.phase, SyncPhase::ReauthRequired);
    assert!(status.pending);

    h.scheduler.resume_after_reauth();
    tokio::time::sleep(ms(1_000)).await;
    let calls = h.remote.store_calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].document.personal_info.name, "edited");
}

#[tokio::test(start_paused = true)]
async fn matching_remote_baseline_needs_no_flush() {
    let local = named("Ada");
    let h = harness_with(MockRemote::new(), Some(local.clone()));
    assert!(!h.scheduler.seed_baseline(Some(local)));
    tokio::time::sleep(ms(5_000)).await;
    assert!(h.remote.store_calls().is_empty());
    assert!(!h.scheduler.status().pending);
}

#[tokio::test(start_paused = true)]
async fn differing_remote_baseline_pushes_local_document() {
    let h = harness_with(MockRemote::new(), Some(named("local")));
    assert!(h.scheduler.seed_baseline(Some(named("remote"))));
    tokio::time::sleep(ms(1_000)).await;

    let calls = h.remote.store_calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].document.personal_info.name, "local");
}

#[tokio::test(start_paused = true)]
async fn shutdown_stops_timer_flushes() {
    let h = harness();
    h.scheduler.notify_dirty(Arc::new(named("Ada")));
    h.scheduler.shutdown().await;
    tokio::time::sleep(ms(5_000)).await;

    assert!(h.remote.store_calls().is_empty());
    assert_eq!(h.scheduler.status().phase, SyncPhase::Stopped);
    assert_eq!(h.scheduler.flush_now().await, FlushOutcome::Skipped);
}

#[tokio::test(start_paused = true)]
async fn subscribers_see_pending_changes() {
    let h = harness();
    let mut rx = h.scheduler.subscribe();
    assert!(!rx.borrow().pending);

    h.scheduler.notify_dirty(Arc::new(named("Ada")));
    rx.changed().await.unwrap();
    assert!(rx.borrow_and_update().pending);
}
