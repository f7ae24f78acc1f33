// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Versioned holder for the shared session credential.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::credential::{Credential, Epoch};

/// Point-in-time view of the session: the credential and the epoch it was
/// installed at.
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    pub credential: Arc<Credential>,
    pub epoch: Epoch,
}

struct Slot {
    credential: Arc<Credential>,
    epoch: Epoch,
}

/// The only mutable state shared between workers.
///
/// The lock covers a pointer swap and a counter bump; it is never held
/// across an await.
pub struct SessionStore {
    slot: Mutex<Slot>,
}

impl SessionStore {
    /// Seed the store with the credential from initial setup at epoch 0.
    pub fn new(initial: Credential) -> Self {
        Self { slot: Mutex::new(Slot { credential: Arc::new(initial), epoch: Epoch::default() }) }
    }

    pub fn current(&self) -> SessionSnapshot {
        let slot = self.slot.lock();
        SessionSnapshot { credential: Arc::clone(&slot.credential), epoch: slot.epoch }
    }

    pub fn epoch(&self) -> Epoch {
        self.slot.lock().epoch
    }

    /// Install a new credential, returning its epoch (strictly greater than
    /// every epoch handed out before).
    pub fn replace(&self, credential: Credential) -> Epoch {
        let mut slot = self.slot.lock();
        slot.epoch = slot.epoch.next();
        slot.credential = Arc::new(credential);
        slot.epoch
    }
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
