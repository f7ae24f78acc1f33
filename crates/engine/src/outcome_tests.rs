// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use serde_json::json;

use super::*;

fn kind(outcome: &AttemptOutcome) -> &'static str {
    match outcome {
        AttemptOutcome::Acquired { .. } => "acquired",
        AttemptOutcome::Contended { .. } => "contended",
        AttemptOutcome::SessionInvalid { .. } => "session_invalid",
        AttemptOutcome::TransientError { .. } => "transient",
        AttemptOutcome::FatalError { .. } => "fatal",
    }
}

#[yare::parameterized(
    bool_true = { 200, r#"{"success":true,"message":"选课成功"}"#, "acquired" },
    array_true = { 200, r#"{"success":[true,"ok"],"message":"选课成功"}"#, "acquired" },
    padded_message = { 200, r#"{"success":true,"message":" 选课成功 "}"#, "acquired" },
    bool_false = { 200, r#"{"success":false,"message":"选课成功"}"#, "contended" },
    array_false = { 200, r#"{"success":[false],"message":"课程已满"}"#, "contended" },
    empty_array = { 200, r#"{"success":[],"message":"选课成功"}"#, "contended" },
    string_flag = { 200, r#"{"success":"true","message":"选课成功"}"#, "contended" },
    true_but_other_message = { 200, r#"{"success":true,"message":"当前选课人数已满"}"#, "contended" },
    missing_message = { 200, r#"{"success":true}"#, "contended" },
    html_page = { 200, "<html><body>login</body></html>", "session_invalid" },
    html_upper = { 200, "<!DOCTYPE html><HTML>", "session_invalid" },
    signed_in_elsewhere = { 200, r#"{"success":false,"message":"当前账号已在别处登录"}"#, "session_invalid" },
    relogin = { 200, "请重新登录", "session_invalid" },
    permission = { 200, r#"{"success":false,"message":"权限不足"}"#, "session_invalid" },
    unauthorized = { 401, "", "session_invalid" },
    forbidden = { 403, "{}", "session_invalid" },
    not_found = { 404, "", "fatal" },
    gone = { 410, "", "fatal" },
    server_error = { 502, "Bad Gateway", "transient" },
    garbage = { 200, "not json", "transient" },
    empty_body = { 200, "", "transient" },
)]
fn classify_body(status: u16, body: &str, expected: &str) {
    let outcome = classify(&RawResponse::Body { status, body: body.to_owned() });
    assert_eq!(kind(&outcome), expected, "{outcome:?}");
}

#[test]
fn transport_failure_is_transient() {
    let outcome = classify(&RawResponse::Transport("connection reset".to_owned()));
    assert_eq!(
        outcome,
        AttemptOutcome::TransientError { reason: "connection reset".to_owned() }
    );
}

#[test]
fn contended_keeps_server_message() {
    let outcome = classify(&RawResponse::ok(r#"{"success":false,"message":"课程已满"}"#));
    assert_eq!(outcome, AttemptOutcome::Contended { message: "课程已满".to_owned() });
}

#[test]
fn bool_and_array_flags_are_equivalent() {
    assert!(success_flag(&json!(true)));
    assert!(success_flag(&json!([true, "ok"])));
    assert!(!success_flag(&json!(false)));
    assert!(!success_flag(&json!([false, true])));
    assert!(!success_flag(&json!(null)));
    assert!(!success_flag(&json!(1)));
}
