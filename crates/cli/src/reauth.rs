// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use seatgrab_engine::{AuthError, Credential, Reauthenticator};
use tracing::info;

use crate::registrar::RegistrarClient;
use crate::windows::SessionWindow;

/// Full re-login: sign in again with the stored encoded account, then
/// re-enter the chosen window with the new session.
pub struct RegistrarReauthenticator {
    client: Arc<RegistrarClient>,
    encoded: String,
    window: SessionWindow,
}

impl RegistrarReauthenticator {
    pub fn new(client: Arc<RegistrarClient>, encoded: String, window: SessionWindow) -> Self {
        Self { client, encoded, window }
    }
}

impl std::fmt::Debug for RegistrarReauthenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistrarReauthenticator")
            .field("window", &self.window.url)
            .finish_non_exhaustive()
    }
}

impl Reauthenticator for RegistrarReauthenticator {
    fn run(&self) -> Pin<Box<dyn Future<Output = Result<Credential, AuthError>> + Send + '_>> {
        Box::pin(async move {
            let credential = self.client.login(&self.encoded).await?;
            self.client.establish_context(&credential, &self.window).await?;
            info!(window = %self.window.name, "session re-established");
            Ok(credential)
        })
    }
}

#[cfg(test)]
#[path = "reauth_tests.rs"]
mod tests;
