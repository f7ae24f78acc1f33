// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::time::Duration;

use super::*;
use crate::error::LoginError;
use crate::outcome::RawResponse;
use crate::session::SessionStore;
use crate::test_support::{acquired, contended, session, signed_out, FakeReauth, ScriptedAcquirer};

struct Harness {
    acquirer: Arc<ScriptedAcquirer>,
    reauth: Arc<FakeReauth>,
    collector: Arc<ResultCollector>,
    coordinator: Arc<RefreshCoordinator>,
    cancel: CancellationToken,
}

impl Harness {
    fn new(acquirer: ScriptedAcquirer, reauth: FakeReauth) -> Self {
        let cancel = CancellationToken::new();
        let reauth = Arc::new(reauth);
        let store = Arc::new(SessionStore::new(session("initial")));
        let coordinator = Arc::new(RefreshCoordinator::new(
            store,
            Arc::clone(&reauth) as _,
            cancel.clone(),
        ));
        Self {
            acquirer: Arc::new(acquirer),
            reauth,
            collector: Arc::new(ResultCollector::new()),
            coordinator,
            cancel,
        }
    }

    fn worker(&self, id: &str) -> AcquisitionWorker {
        AcquisitionWorker::new(
            ResourceTarget::new(id, format!("course {id}")),
            Arc::clone(&self.coordinator),
            Arc::clone(&self.acquirer) as _,
            Arc::clone(&self.collector),
            EngineConfig::new(Duration::from_secs(1), Duration::from_secs(3)),
            self.cancel.clone(),
        )
    }

    fn cancel_after(&self, delay: Duration) {
        let cancel = self.cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            cancel.cancel();
        });
    }
}

#[tokio::test(start_paused = true)]
async fn acquires_after_contention_and_stops_polling() -> anyhow::Result<()> {
    let h = Harness::new(
        ScriptedAcquirer::new(contended())
            .script("A", vec![contended(), contended(), acquired()]),
        FakeReauth::succeeding(),
    );

    let exit = h.worker("A").run().await;
    assert_eq!(exit, WorkerExit::Acquired);

    let calls = h.acquirer.calls_for("A");
    assert_eq!(calls.len(), 3);
    for pair in calls.windows(2) {
        assert!(pair[1].at - pair[0].at >= Duration::from_secs(1));
    }

    let summary = h.collector.finish(false);
    assert_eq!(summary.acquired_ids(), vec!["A"]);
    assert_eq!(h.reauth.calls(), 0);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn not_found_abandons_target() -> anyhow::Result<()> {
    let h = Harness::new(
        ScriptedAcquirer::new(contended()).script(
            "gone",
            vec![RawResponse::Body { status: 404, body: String::new() }],
        ),
        FakeReauth::succeeding(),
    );

    assert_eq!(h.worker("gone").run().await, WorkerExit::Abandoned);
    assert_eq!(h.acquirer.calls_for("gone").len(), 1);

    let summary = h.collector.finish(false);
    assert!(summary.acquired.is_empty());
    assert_eq!(summary.abandoned.len(), 1);
    assert_eq!(summary.abandoned[0].target.id, "gone");
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn transient_errors_are_retried() -> anyhow::Result<()> {
    let h = Harness::new(
        ScriptedAcquirer::new(contended()).script(
            "A",
            vec![
                RawResponse::Transport("connection reset".to_owned()),
                RawResponse::Body { status: 502, body: "bad gateway".to_owned() },
                acquired(),
            ],
        ),
        FakeReauth::succeeding(),
    );

    assert_eq!(h.worker("A").run().await, WorkerExit::Acquired);
    assert_eq!(h.acquirer.calls_for("A").len(), 3);
    assert_eq!(h.reauth.calls(), 0);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn rejected_session_is_refreshed_before_next_attempt() -> anyhow::Result<()> {
    let h = Harness::new(
        ScriptedAcquirer::new(contended()).script("A", vec![signed_out(), acquired()]),
        FakeReauth::succeeding(),
    );

    assert_eq!(h.worker("A").run().await, WorkerExit::Acquired);

    let calls = h.acquirer.calls_for("A");
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].session.as_deref(), Some("initial"));
    assert_eq!(calls[1].session.as_deref(), Some("fresh-1"));
    assert_eq!(h.reauth.calls(), 1);
    assert_eq!(h.coordinator.store().epoch(), Epoch(1));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn failed_refresh_backs_off() -> anyhow::Result<()> {
    let h = Harness::new(
        ScriptedAcquirer::new(signed_out()),
        FakeReauth::failing(AuthError::Login(LoginError::IncorrectPassword)),
    );
    h.cancel_after(Duration::from_secs(10));

    assert_eq!(h.worker("A").run().await, WorkerExit::Cancelled);

    let calls = h.acquirer.calls_for("A");
    assert!(calls.len() >= 2, "expected retries, got {}", calls.len());
    for pair in calls.windows(2) {
        assert!(pair[1].at - pair[0].at >= Duration::from_secs(3));
    }
    assert_eq!(h.reauth.calls() as usize, calls.len());
    assert_eq!(h.coordinator.store().epoch(), Epoch(0));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn cancellation_interrupts_retry_pause() -> anyhow::Result<()> {
    let h = Harness::new(ScriptedAcquirer::new(contended()), FakeReauth::succeeding());
    let start = tokio::time::Instant::now();
    h.cancel_after(Duration::from_millis(2500));

    assert_eq!(h.worker("A").run().await, WorkerExit::Cancelled);

    assert!(start.elapsed() < Duration::from_millis(3500));
    assert_eq!(h.acquirer.calls_for("A").len(), 3);
    assert!(h.collector.finish(true).acquired.is_empty());
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn request_in_flight_at_cancellation_still_reports_acquisition() -> anyhow::Result<()> {
    let h = Harness::new(
        ScriptedAcquirer::new(acquired()).with_latency(Duration::from_secs(2)),
        FakeReauth::succeeding(),
    );
    h.cancel_after(Duration::from_millis(500));

    assert_eq!(h.worker("A").run().await, WorkerExit::Acquired);

    assert_eq!(h.acquirer.calls_for("A").len(), 1);
    assert_eq!(h.collector.finish(true).acquired_ids(), vec!["A"]);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn contended_reply_after_cancellation_stops_worker() -> anyhow::Result<()> {
    let h = Harness::new(
        ScriptedAcquirer::new(contended()).with_latency(Duration::from_secs(2)),
        FakeReauth::succeeding(),
    );
    let start = tokio::time::Instant::now();
    h.cancel_after(Duration::from_millis(500));

    assert_eq!(h.worker("A").run().await, WorkerExit::Cancelled);

    assert!(start.elapsed() < Duration::from_millis(2500));
    assert_eq!(h.acquirer.calls_for("A").len(), 1);
    Ok(())
}

#[tokio::test]
async fn cancelled_before_start_makes_no_calls() -> anyhow::Result<()> {
    let h = Harness::new(ScriptedAcquirer::new(acquired()), FakeReauth::succeeding());
    h.cancel.cancel();

    assert_eq!(h.worker("A").run().await, WorkerExit::Cancelled);
    assert!(h.acquirer.calls().is_empty());
    Ok(())
}
