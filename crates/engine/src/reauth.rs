// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Seams to the registrar: re-login and the per-seat acquisition call.
//!
//! Both are object-safe so the engine can be driven by the real HTTP client
//! or by scripted fakes in tests.

use std::future::Future;
use std::pin::Pin;

use crate::credential::{Credential, ResourceTarget};
use crate::error::AuthError;
use crate::outcome::RawResponse;

/// Produces a fresh credential: login, then re-enter the selection context.
///
/// Each call makes exactly one login attempt. Retry policy belongs to the
/// caller.
pub trait Reauthenticator: Send + Sync {
    fn run(&self) -> Pin<Box<dyn Future<Output = Result<Credential, AuthError>> + Send + '_>>;
}

/// Issues one acquisition request for a target.
///
/// Transport failures are reported inside [`RawResponse`], never as an
/// error, so the classifier sees every outcome.
pub trait Acquirer: Send + Sync {
    fn acquire<'a>(
        &'a self,
        credential: &'a Credential,
        target: &'a ResourceTarget,
    ) -> Pin<Box<dyn Future<Output = RawResponse> + Send + 'a>>;
}
