// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Classification of raw acquisition responses.
//!
//! The registrar's reply is loosely shaped: `success` arrives either as a
//! boolean or as an array led by a boolean, and an expired session shows up
//! as an HTML page or a plain-text notice instead of JSON. Everything is
//! normalized here, once per response, into an [`AttemptOutcome`].

use serde::Deserialize;
use serde_json::Value;

/// Message the registrar sends alongside a successful enrolment.
pub const ACQUIRED_MESSAGE: &str = "选课成功";

/// Body fragments meaning the session is no longer valid.
const SESSION_INVALID_MARKERS: &[(&str, &str)] = &[
    ("当前账号已在别处登录", "signed in elsewhere"),
    ("请重新登录", "re-login required"),
    ("权限不足", "permission denied"),
];

/// What came back from one acquisition call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawResponse {
    Body { status: u16, body: String },
    /// The request never produced a readable response.
    Transport(String),
}

impl RawResponse {
    pub fn ok(body: impl Into<String>) -> Self {
        Self::Body { status: 200, body: body.into() }
    }
}

/// Result of one acquisition attempt, as seen by the worker loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    Acquired { message: String },
    /// Seat full or request rejected for a business reason; try again later.
    Contended { message: String },
    SessionInvalid { reason: &'static str },
    TransientError { reason: String },
    /// The registrar will never accept this target.
    FatalError { reason: String },
}

#[derive(Debug, Deserialize)]
struct AcquireReply {
    #[serde(default)]
    success: Value,
    #[serde(default)]
    message: Option<String>,
}

/// Normalize the `success` field: `true`, or an array whose first element is
/// `true`. Anything else is a failure.
pub fn success_flag(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Array(items) => matches!(items.first(), Some(Value::Bool(true))),
        _ => false,
    }
}

pub fn classify(raw: &RawResponse) -> AttemptOutcome {
    let (status, body) = match raw {
        RawResponse::Transport(e) => {
            return AttemptOutcome::TransientError { reason: e.clone() };
        }
        RawResponse::Body { status, body } => (*status, body.as_str()),
    };

    match status {
        401 | 403 => return AttemptOutcome::SessionInvalid { reason: "unauthorized status" },
        404 | 410 => {
            return AttemptOutcome::FatalError { reason: format!("target rejected ({status})") };
        }
        _ => {}
    }

    if body.to_ascii_lowercase().contains("<html") {
        return AttemptOutcome::SessionInvalid { reason: "markup response" };
    }
    if let Some((_, reason)) = SESSION_INVALID_MARKERS.iter().find(|(m, _)| body.contains(m)) {
        return AttemptOutcome::SessionInvalid { reason };
    }

    if !(200..300).contains(&status) {
        return AttemptOutcome::TransientError { reason: format!("status {status}") };
    }

    let reply: AcquireReply = match serde_json::from_str(body) {
        Ok(r) => r,
        Err(e) => {
            return AttemptOutcome::TransientError { reason: format!("unparseable payload: {e}") };
        }
    };

    let message = reply.message.unwrap_or_default();
    if success_flag(&reply.success) && message.trim() == ACQUIRED_MESSAGE {
        AttemptOutcome::Acquired { message }
    } else {
        AttemptOutcome::Contended { message }
    }
}

#[cfg(test)]
#[path = "outcome_tests.rs"]
mod tests;
