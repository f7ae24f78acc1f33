// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Seatgrab engine: concurrent seat acquisition with a shared, coordinated
//! registrar session.
//!
//! One [`worker::AcquisitionWorker`] runs per target. All workers read the
//! credential from a single [`session::SessionStore`] and funnel expired-session
//! recovery through one [`coordinator::RefreshCoordinator`], so a burst of
//! session failures costs exactly one re-login.

pub mod collector;
pub mod coordinator;
pub mod credential;
pub mod engine;
pub mod error;
pub mod outcome;
pub mod reauth;
pub mod session;
pub mod test_support;
pub mod worker;

pub use collector::{Abandoned, Progress, ResultCollector, Summary};
pub use coordinator::RefreshCoordinator;
pub use credential::{Credential, Epoch, ResourceTarget};
pub use engine::{Engine, EngineConfig};
pub use error::{AuthError, ContextError, LoginError};
pub use outcome::{classify, AttemptOutcome, RawResponse};
pub use reauth::{Acquirer, Reauthenticator};
pub use session::{SessionSnapshot, SessionStore};
pub use worker::{AcquisitionWorker, WorkerExit};
