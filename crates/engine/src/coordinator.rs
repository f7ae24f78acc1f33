// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Single-flight session refresh.
//!
//! Any number of workers may report an expired session at once. The first to
//! claim the in-flight flag re-authenticates; everyone else parks on a watch
//! channel that is published once per refresh cycle, then reads the new
//! session from the store (or receives the shared error).

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::credential::Epoch;
use crate::error::AuthError;
use crate::reauth::Reauthenticator;
use crate::session::{SessionSnapshot, SessionStore};

/// Published once per completed refresh cycle.
#[derive(Debug, Clone, Default)]
struct Cycle {
    seq: u64,
    /// `None` when a claim was released without running a refresh.
    result: Option<Result<Epoch, AuthError>>,
}

impl Cycle {
    /// The answer this cycle gives a caller that rejected `observed`, or
    /// `None` if the caller must ask again.
    fn answer_for(&self, observed: Epoch) -> Option<Result<(), AuthError>> {
        match &self.result {
            Some(Ok(epoch)) if *epoch > observed => Some(Ok(())),
            Some(Err(e)) => Some(Err(e.clone())),
            Some(Ok(_)) | None => None,
        }
    }
}

pub struct RefreshCoordinator {
    store: Arc<SessionStore>,
    reauth: Arc<dyn Reauthenticator>,
    in_flight: AtomicBool,
    cycles: watch::Sender<Cycle>,
    runs: AtomicU64,
    cancel: CancellationToken,
}

impl RefreshCoordinator {
    pub fn new(
        store: Arc<SessionStore>,
        reauth: Arc<dyn Reauthenticator>,
        cancel: CancellationToken,
    ) -> Self {
        let (cycles, _) = watch::channel(Cycle::default());
        Self {
            store,
            reauth,
            in_flight: AtomicBool::new(false),
            cycles,
            runs: AtomicU64::new(0),
            cancel,
        }
    }

    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    /// Number of times the reauthenticator has been invoked.
    pub fn runs(&self) -> u64 {
        self.runs.load(Ordering::Relaxed)
    }

    pub fn is_refreshing(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Callers currently inside [`Self::request_refresh`].
    pub fn pending_requests(&self) -> usize {
        self.cycles.receiver_count()
    }

    /// Obtain a session newer than `observed`, re-authenticating at most once
    /// for all overlapping callers.
    pub async fn request_refresh(&self, observed: Epoch) -> Result<SessionSnapshot, AuthError> {
        loop {
            if let Some(answer) = self.attempt(observed).await {
                return answer;
            }
            debug!(observed = %observed, "refresh cycle did not answer, asking again");
        }
    }

    async fn attempt(&self, observed: Epoch) -> Option<Result<SessionSnapshot, AuthError>> {
        // Subscribe before looking at anything so no publication is missed.
        let mut rx = self.cycles.subscribe();
        let entered = rx.borrow_and_update().seq;

        let current = self.store.current();
        if current.epoch > observed {
            debug!(observed = %observed, epoch = %current.epoch, "session already refreshed");
            return Some(Ok(current));
        }

        if self.in_flight.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire).is_ok()
        {
            return Some(self.lead(entered, observed).await);
        }

        debug!(observed = %observed, "refresh in flight, waiting");
        self.follow(rx, entered, observed).await
    }

    async fn lead(&self, entered: u64, observed: Epoch) -> Result<SessionSnapshot, AuthError> {
        let claim = Claim { coordinator: self, published: false };

        // A cycle may have completed between entry and the claim. If it
        // answers this call, take that answer and release the claim unanswered
        // so anyone who queued behind it asks again.
        let finished = self.cycles.borrow().clone();
        if finished.seq > entered {
            if let Some(answer) = finished.answer_for(observed) {
                claim.publish(None);
                return answer.map(|()| self.store.current());
            }
        }

        let run = self.runs.fetch_add(1, Ordering::Relaxed) + 1;
        info!(observed = %observed, run, "session expired, re-authenticating");

        let result = tokio::select! {
            _ = self.cancel.cancelled() => Err(AuthError::Cancelled),
            r = self.reauth.run() => r,
        };

        match result {
            Ok(credential) => {
                let epoch = self.store.replace(credential);
                claim.publish(Some(Ok(epoch)));
                info!(epoch = %epoch, "session refreshed");
                Ok(self.store.current())
            }
            Err(e) => {
                if e != AuthError::Cancelled {
                    warn!(err = %e, code = e.as_str(), "session refresh failed");
                }
                claim.publish(Some(Err(e.clone())));
                Err(e)
            }
        }
    }

    async fn follow(
        &self,
        mut rx: watch::Receiver<Cycle>,
        entered: u64,
        observed: Epoch,
    ) -> Option<Result<SessionSnapshot, AuthError>> {
        loop {
            let cycle = rx.borrow_and_update().clone();
            if cycle.seq > entered {
                return cycle.answer_for(observed).map(|a| a.map(|()| self.store.current()));
            }

            tokio::select! {
                _ = self.cancel.cancelled() => return Some(Err(AuthError::Cancelled)),
                changed = rx.changed() => {
                    if changed.is_err() {
                        return Some(Err(AuthError::Cancelled));
                    }
                }
            }
        }
    }

    fn publish(&self, result: Option<Result<Epoch, AuthError>>) {
        self.cycles.send_modify(|cycle| {
            cycle.seq += 1;
            cycle.result = result;
            // Cleared under the channel lock: a caller that still sees the
            // flag set is guaranteed to be woken by this cycle.
            self.in_flight.store(false, Ordering::Release);
        });
    }
}

/// Ownership of the in-flight flag. Publishing releases it; dropping an
/// unpublished claim (leader future dropped mid-refresh) wakes waiters with
/// [`AuthError::Cancelled`].
struct Claim<'a> {
    coordinator: &'a RefreshCoordinator,
    published: bool,
}

impl Claim<'_> {
    fn publish(mut self, result: Option<Result<Epoch, AuthError>>) {
        self.coordinator.publish(result);
        self.published = true;
    }
}

impl Drop for Claim<'_> {
    fn drop(&mut self) {
        if !self.published {
            self.coordinator.publish(Some(Err(AuthError::Cancelled)));
        }
    }
}

#[cfg(test)]
#[path = "coordinator_tests.rs"]
mod tests;
