// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Login form encoding.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

/// Separator between the encoded account and secret: `%%%`, pre-escaped.
const SEPARATOR: &str = "%25%25%25";
/// Trailer the registrar expects after the secret: `=`, pre-escaped.
const TRAILER: &str = "%3D";

/// Encode credentials into the value of the `encoded` form field.
///
/// The result is already form-escaped and must be sent verbatim.
pub fn encode_login(account: &str, secret: &str) -> String {
    format!("{}{SEPARATOR}{}{TRAILER}", STANDARD.encode(account), STANDARD.encode(secret))
}

#[cfg(test)]
#[path = "encode_tests.rs"]
mod tests;
