// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test infrastructure: scripted registrar fakes and canned replies.

use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::Semaphore;
use tokio::time::Instant;

use crate::credential::{Credential, ResourceTarget};
use crate::error::AuthError;
use crate::outcome::{RawResponse, ACQUIRED_MESSAGE};
use crate::reauth::{Acquirer, Reauthenticator};

/// Cookie name used by the fakes.
pub const SESSION_COOKIE: &str = "JSESSIONID";

pub fn session(value: &str) -> Credential {
    Credential::new(vec![(SESSION_COOKIE.to_owned(), value.to_owned())])
}

pub fn acquired() -> RawResponse {
    RawResponse::ok(format!(r#"{{"success":[true,"ok"],"message":"{ACQUIRED_MESSAGE}"}}"#))
}

pub fn contended() -> RawResponse {
    RawResponse::ok(r#"{"success":false,"message":"当前教学班已满"}"#)
}

pub fn signed_out() -> RawResponse {
    RawResponse::ok("<html><head><title>登录</title></head></html>")
}

/// Reauthenticator that counts runs. Each run optionally sleeps, optionally
/// waits for a gate permit, then yields `fresh-<n>` or a fixed error.
pub struct FakeReauth {
    calls: AtomicU32,
    gate: Option<Semaphore>,
    delay: Duration,
    fail: Option<AuthError>,
}

impl FakeReauth {
    pub fn succeeding() -> Self {
        Self { calls: AtomicU32::new(0), gate: None, delay: Duration::ZERO, fail: None }
    }

    pub fn failing(err: AuthError) -> Self {
        Self { fail: Some(err), ..Self::succeeding() }
    }

    /// Block every run until [`Self::open_gate`] releases it.
    pub fn gated(mut self) -> Self {
        self.gate = Some(Semaphore::new(0));
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn open_gate(&self, runs: usize) {
        if let Some(ref gate) = self.gate {
            gate.add_permits(runs);
        }
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Reauthenticator for FakeReauth {
    fn run(&self) -> Pin<Box<dyn Future<Output = Result<Credential, AuthError>> + Send + '_>> {
        Box::pin(async move {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            if let Some(ref gate) = self.gate {
                if let Ok(permit) = gate.acquire().await {
                    permit.forget();
                }
            }
            match &self.fail {
                Some(e) => Err(e.clone()),
                None => Ok(session(&format!("fresh-{n}"))),
            }
        })
    }
}

/// One recorded acquisition call.
#[derive(Debug, Clone)]
pub struct Call {
    pub target: String,
    pub session: Option<String>,
    pub at: Instant,
}

/// Acquirer replaying a per-target script. The last reply of a script
/// repeats forever; unscripted targets get `fallback`.
pub struct ScriptedAcquirer {
    scripts: Mutex<HashMap<String, VecDeque<RawResponse>>>,
    fallback: RawResponse,
    calls: Mutex<Vec<Call>>,
    latency: Duration,
}

impl ScriptedAcquirer {
    pub fn new(fallback: RawResponse) -> Self {
        Self {
            scripts: Mutex::new(HashMap::new()),
            fallback,
            calls: Mutex::new(Vec::new()),
            latency: Duration::ZERO,
        }
    }

    /// Delay every reply. The call is recorded when it arrives, before the
    /// delay.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn script(self, target: &str, replies: Vec<RawResponse>) -> Self {
        self.scripts.lock().insert(target.to_owned(), replies.into());
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    pub fn calls_for(&self, target: &str) -> Vec<Call> {
        self.calls.lock().iter().filter(|c| c.target == target).cloned().collect()
    }

    fn next_reply(&self, target: &str) -> RawResponse {
        let mut scripts = self.scripts.lock();
        match scripts.get_mut(target) {
            Some(queue) if queue.len() > 1 => queue.pop_front(),
            Some(queue) => queue.front().cloned(),
            None => None,
        }
        .unwrap_or_else(|| self.fallback.clone())
    }
}

impl Acquirer for ScriptedAcquirer {
    fn acquire<'a>(
        &'a self,
        credential: &'a Credential,
        target: &'a ResourceTarget,
    ) -> Pin<Box<dyn Future<Output = RawResponse> + Send + 'a>> {
        Box::pin(async move {
            self.calls.lock().push(Call {
                target: target.id.clone(),
                session: credential.get(SESSION_COOKIE).map(str::to_owned),
                at: Instant::now(),
            });
            let reply = self.next_reply(&target.id);
            if !self.latency.is_zero() {
                tokio::time::sleep(self.latency).await;
            }
            reply
        })
    }
}
