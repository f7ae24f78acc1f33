// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Driver: one worker per target, joined into a single summary.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::collector::{Progress, ResultCollector, Summary};
use crate::coordinator::RefreshCoordinator;
use crate::credential::{Credential, ResourceTarget};
use crate::reauth::{Acquirer, Reauthenticator};
use crate::session::SessionStore;
use crate::worker::{AcquisitionWorker, WorkerExit};

/// Minimum ratio between the refresh-failure delay and the retry delay.
pub const REFRESH_BACKOFF_FACTOR: u32 = 3;

/// Timing for the worker loops.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    /// Pause after a contended or failed attempt.
    pub retry_delay: Duration,
    /// Pause after a failed session refresh.
    pub refresh_failure_delay: Duration,
}

impl EngineConfig {
    /// Build a config, raising `refresh_failure_delay` to at least
    /// [`REFRESH_BACKOFF_FACTOR`] times `retry_delay`.
    pub fn new(retry_delay: Duration, refresh_failure_delay: Duration) -> Self {
        let floor = retry_delay * REFRESH_BACKOFF_FACTOR;
        Self { retry_delay, refresh_failure_delay: refresh_failure_delay.max(floor) }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new(Duration::from_secs(1), Duration::from_secs(3))
    }
}

pub struct Engine {
    config: EngineConfig,
    coordinator: Arc<RefreshCoordinator>,
    acquirer: Arc<dyn Acquirer>,
    cancel: CancellationToken,
    progress: Option<mpsc::UnboundedSender<Progress>>,
}

impl Engine {
    /// Seed the session store with the credential from initial setup.
    pub fn new(
        config: EngineConfig,
        initial: Credential,
        reauth: Arc<dyn Reauthenticator>,
        acquirer: Arc<dyn Acquirer>,
        cancel: CancellationToken,
    ) -> Self {
        let store = Arc::new(SessionStore::new(initial));
        let coordinator = Arc::new(RefreshCoordinator::new(store, reauth, cancel.clone()));
        Self { config, coordinator, acquirer, cancel, progress: None }
    }

    /// Announce each acquisition and abandonment on `progress` as it happens.
    pub fn with_progress(mut self, progress: mpsc::UnboundedSender<Progress>) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn coordinator(&self) -> &Arc<RefreshCoordinator> {
        &self.coordinator
    }

    /// Run one worker per distinct target until every worker has stopped,
    /// then build the summary.
    pub async fn run(&self, targets: Vec<ResourceTarget>) -> Summary {
        let collector = Arc::new(match self.progress {
            Some(ref tx) => ResultCollector::with_progress(tx.clone()),
            None => ResultCollector::new(),
        });
        let mut seen = HashSet::new();
        let mut workers = JoinSet::new();

        for target in targets {
            if !seen.insert(target.id.clone()) {
                warn!(seat = %target.id, "duplicate target ignored");
                continue;
            }
            let worker = AcquisitionWorker::new(
                target,
                Arc::clone(&self.coordinator),
                Arc::clone(&self.acquirer),
                Arc::clone(&collector),
                self.config,
                self.cancel.clone(),
            );
            workers.spawn(worker.run());
        }

        info!(workers = workers.len(), "acquisition started");

        let (mut acquired, mut abandoned, mut cancelled) = (0u32, 0u32, 0u32);
        while let Some(joined) = workers.join_next().await {
            match joined {
                Ok(WorkerExit::Acquired) => acquired += 1,
                Ok(WorkerExit::Abandoned) => abandoned += 1,
                Ok(WorkerExit::Cancelled) => cancelled += 1,
                Err(e) => warn!(err = %e, "worker task failed"),
            }
            debug!(remaining = workers.len(), "worker finished");
        }

        let summary = collector.finish(self.cancel.is_cancelled());
        info!(
            acquired,
            abandoned,
            cancelled,
            refreshes = self.coordinator.runs(),
            "acquisition finished"
        );
        summary
    }
}
