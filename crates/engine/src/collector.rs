// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Aggregates worker results into the final [`Summary`].

use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::warn;

use crate::credential::ResourceTarget;

/// A target whose worker stopped without acquiring it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Abandoned {
    pub target: ResourceTarget,
    pub reason: String,
}

/// Outcome of a whole run. Targets absent from both lists were never
/// acquired (still contended when the run stopped).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    /// In order of arrival.
    pub acquired: Vec<ResourceTarget>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub abandoned: Vec<Abandoned>,
    pub cancelled: bool,
}

impl Summary {
    pub fn acquired_ids(&self) -> Vec<&str> {
        self.acquired.iter().map(|t| t.id.as_str()).collect()
    }
}

/// Sent as each worker reaches a reportable result, ahead of the summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Progress {
    Acquired(ResourceTarget),
    Abandoned(Abandoned),
}

#[derive(Default)]
struct Inner {
    acquired: Vec<ResourceTarget>,
    abandoned: Vec<Abandoned>,
    finished: bool,
}

#[derive(Default)]
pub struct ResultCollector {
    inner: Mutex<Inner>,
    progress: Option<mpsc::UnboundedSender<Progress>>,
}

impl ResultCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Also announce every accepted report on `progress`.
    pub fn with_progress(progress: mpsc::UnboundedSender<Progress>) -> Self {
        Self { inner: Mutex::default(), progress: Some(progress) }
    }

    pub fn report_acquired(&self, target: ResourceTarget) {
        let mut inner = self.inner.lock();
        if inner.finished {
            warn!(seat = %target.id, "acquisition reported after summary was built");
            return;
        }
        inner.acquired.push(target.clone());
        self.announce(Progress::Acquired(target));
    }

    pub fn report_abandoned(&self, target: ResourceTarget, reason: impl Into<String>) {
        let mut inner = self.inner.lock();
        if inner.finished {
            warn!(seat = %target.id, "abandonment reported after summary was built");
            return;
        }
        let abandoned = Abandoned { target, reason: reason.into() };
        inner.abandoned.push(abandoned.clone());
        self.announce(Progress::Abandoned(abandoned));
    }

    // A closed receiver only means nobody is listening.
    fn announce(&self, progress: Progress) {
        if let Some(ref tx) = self.progress {
            let _ = tx.send(progress);
        }
    }

    pub fn acquired_count(&self) -> usize {
        self.inner.lock().acquired.len()
    }

    /// Build the summary. Called once, after every worker has stopped.
    pub fn finish(&self, cancelled: bool) -> Summary {
        let mut inner = self.inner.lock();
        inner.finished = true;
        Summary {
            acquired: std::mem::take(&mut inner.acquired),
            abandoned: std::mem::take(&mut inner.abandoned),
            cancelled,
        }
    }
}

#[cfg(test)]
#[path = "collector_tests.rs"]
mod tests;
