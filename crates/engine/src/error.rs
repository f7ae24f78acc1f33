// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::fmt;

/// Failure of the login exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginError {
    IncorrectPassword,
    AccountNotFound,
    Captcha,
    /// Login did not redirect; carries the response status.
    Rejected(u16),
    /// Redirected as if successful, but no session cookies were issued.
    NoCookies,
    Transport(String),
}

impl LoginError {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::IncorrectPassword => "INCORRECT_PASSWORD",
            Self::AccountNotFound => "ACCOUNT_NOT_FOUND",
            Self::Captcha => "CAPTCHA",
            Self::Rejected(_) => "LOGIN_REJECTED",
            Self::NoCookies => "NO_COOKIES",
            Self::Transport(_) => "TRANSPORT",
        }
    }
}

impl fmt::Display for LoginError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::IncorrectPassword => f.write_str("incorrect password"),
            Self::AccountNotFound => f.write_str("account not found"),
            Self::Captcha => f.write_str("captcha challenge failed"),
            Self::Rejected(status) => write!(f, "login rejected with status {status}"),
            Self::NoCookies => f.write_str("login succeeded but no session cookies were issued"),
            Self::Transport(e) => write!(f, "login request failed: {e}"),
        }
    }
}

impl std::error::Error for LoginError {}

/// Failure to re-establish the selection context for a session window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContextError {
    /// No session window has been chosen.
    NoWindow,
    /// Server reported insufficient permission or an expired context.
    Forbidden,
    Status(u16),
    Transport(String),
}

impl ContextError {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NoWindow => "NO_WINDOW",
            Self::Forbidden => "FORBIDDEN",
            Self::Status(_) => "BAD_STATUS",
            Self::Transport(_) => "TRANSPORT",
        }
    }
}

impl fmt::Display for ContextError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoWindow => f.write_str("no session window selected"),
            Self::Forbidden => f.write_str("permission denied or session expired, log in again"),
            Self::Status(status) => write!(f, "context request failed with status {status}"),
            Self::Transport(e) => write!(f, "context request failed: {e}"),
        }
    }
}

impl std::error::Error for ContextError {}

/// Result of a failed refresh cycle, delivered to every waiting worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    Login(LoginError),
    Context(ContextError),
    /// The run was cancelled before the refresh completed.
    Cancelled,
}

impl AuthError {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Login(e) => e.as_str(),
            Self::Context(e) => e.as_str(),
            Self::Cancelled => "CANCELLED",
        }
    }
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Login(e) => write!(f, "login failed: {e}"),
            Self::Context(e) => write!(f, "context failed: {e}"),
            Self::Cancelled => f.write_str("refresh cancelled"),
        }
    }
}

impl std::error::Error for AuthError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Login(e) => Some(e),
            Self::Context(e) => Some(e),
            Self::Cancelled => None,
        }
    }
}

impl From<LoginError> for AuthError {
    fn from(e: LoginError) -> Self {
        Self::Login(e)
    }
}

impl From<ContextError> for AuthError {
    fn from(e: ContextError) -> Self {
        Self::Context(e)
    }
}
