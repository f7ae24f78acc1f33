// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-target acquisition loop.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::collector::ResultCollector;
use crate::coordinator::RefreshCoordinator;
use crate::credential::{Epoch, ResourceTarget};
use crate::engine::EngineConfig;
use crate::error::AuthError;
use crate::outcome::{classify, AttemptOutcome};
use crate::reauth::Acquirer;

/// Where a worker is in its loop. `Acquired`, `Abandoned` and `Cancelled`
/// are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WorkerState {
    Polling,
    /// Waiting for a session newer than the one that was rejected.
    AwaitingRefresh(Epoch),
    Acquired,
    Abandoned,
    Cancelled,
}

/// How a worker finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerExit {
    Acquired,
    Abandoned,
    Cancelled,
}

pub struct AcquisitionWorker {
    target: ResourceTarget,
    coordinator: Arc<RefreshCoordinator>,
    acquirer: Arc<dyn Acquirer>,
    collector: Arc<ResultCollector>,
    config: EngineConfig,
    cancel: CancellationToken,
    attempts: u64,
}

impl AcquisitionWorker {
    pub fn new(
        target: ResourceTarget,
        coordinator: Arc<RefreshCoordinator>,
        acquirer: Arc<dyn Acquirer>,
        collector: Arc<ResultCollector>,
        config: EngineConfig,
        cancel: CancellationToken,
    ) -> Self {
        Self { target, coordinator, acquirer, collector, config, cancel, attempts: 0 }
    }

    /// Poll until the seat is acquired, the target is rejected outright, or
    /// the run is cancelled.
    pub async fn run(mut self) -> WorkerExit {
        let mut state = WorkerState::Polling;
        loop {
            state = match state {
                WorkerState::Polling => self.poll().await,
                WorkerState::AwaitingRefresh(observed) => self.await_refresh(observed).await,
                WorkerState::Acquired => return WorkerExit::Acquired,
                WorkerState::Abandoned => return WorkerExit::Abandoned,
                WorkerState::Cancelled => {
                    debug!(seat = %self.target.id, attempts = self.attempts, "worker cancelled");
                    return WorkerExit::Cancelled;
                }
            };
        }
    }

    async fn poll(&mut self) -> WorkerState {
        if self.cancel.is_cancelled() {
            return WorkerState::Cancelled;
        }

        let snapshot = self.coordinator.store().current();
        self.attempts += 1;
        let attempt = self.attempts;

        // Not raced against cancellation: a sent request may already hold the
        // seat. The client's request timeout bounds the wait.
        let raw = self.acquirer.acquire(&snapshot.credential, &self.target).await;

        match classify(&raw) {
            AttemptOutcome::Acquired { message } => {
                info!(
                    seat = %self.target.id,
                    label = %self.target.label,
                    attempt,
                    reply = %message,
                    "seat acquired"
                );
                self.collector.report_acquired(self.target.clone());
                WorkerState::Acquired
            }
            AttemptOutcome::Contended { message } => {
                debug!(seat = %self.target.id, attempt, reply = %message, "seat not available");
                self.pause(self.config.retry_delay).await
            }
            AttemptOutcome::SessionInvalid { reason } => {
                warn!(
                    seat = %self.target.id,
                    epoch = %snapshot.epoch,
                    reason = %reason,
                    "session rejected"
                );
                WorkerState::AwaitingRefresh(snapshot.epoch)
            }
            AttemptOutcome::TransientError { reason } => {
                debug!(
                    seat = %self.target.id,
                    attempt,
                    reason = %reason,
                    "attempt failed, retrying"
                );
                self.pause(self.config.retry_delay).await
            }
            AttemptOutcome::FatalError { reason } => {
                warn!(seat = %self.target.id, reason = %reason, "target rejected, giving up");
                self.collector.report_abandoned(self.target.clone(), reason);
                WorkerState::Abandoned
            }
        }
    }

    async fn await_refresh(&self, observed: Epoch) -> WorkerState {
        match self.coordinator.request_refresh(observed).await {
            Ok(snapshot) => {
                debug!(
                    seat = %self.target.id,
                    epoch = %snapshot.epoch,
                    "resuming with refreshed session"
                );
                WorkerState::Polling
            }
            Err(AuthError::Cancelled) => WorkerState::Cancelled,
            Err(e) => {
                warn!(seat = %self.target.id, err = %e, "refresh failed, backing off");
                self.pause(self.config.refresh_failure_delay).await
            }
        }
    }

    async fn pause(&self, delay: Duration) -> WorkerState {
        tokio::select! {
            _ = self.cancel.cancelled() => WorkerState::Cancelled,
            _ = tokio::time::sleep(delay) => WorkerState::Polling,
        }
    }
}

#[cfg(test)]
#[path = "worker_tests.rs"]
mod tests;
