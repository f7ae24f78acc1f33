// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Smoke tests that spawn the real `seatgrab` binary against a fake
//! registrar and drive it over stdin.

use std::process::Stdio;
use std::time::Duration;

use seatgrab::test_support::{enroll_ok, listing, FakeRegistrar, LoginReply};
use tokio::io::AsyncWriteExt;
use tokio::process::{Child, Command};

const TIMEOUT: Duration = Duration::from_secs(15);

async fn registrar() -> anyhow::Result<FakeRegistrar> {
    let fake = FakeRegistrar::start().await?;
    fake.state.set_listing(2, 200, listing(&[("K1", "s1", "音乐鉴赏"), ("K2", "s2", "书法")]));
    Ok(fake)
}

fn spawn(fake: &FakeRegistrar, extra: &[&str]) -> anyhow::Result<Child> {
    let child = Command::new(env!("CARGO_BIN_EXE_seatgrab"))
        .args(["--base-url", &fake.base_url()])
        .args(["--retry-delay-ms", "20", "--refresh-failure-delay-ms", "60"])
        .args(["--log-level", "warn"])
        .args(extra)
        .env_remove("SEATGRAB_JSON")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .spawn()?;
    Ok(child)
}

async fn answer(child: &mut Child, lines: &str) -> anyhow::Result<()> {
    let mut stdin = child.stdin.take().ok_or_else(|| anyhow::anyhow!("stdin not piped"))?;
    stdin.write_all(lines.as_bytes()).await?;
    stdin.shutdown().await?;
    Ok(())
}

fn summary_json(stdout: &[u8]) -> anyhow::Result<serde_json::Value> {
    let text = String::from_utf8_lossy(stdout);
    let start = text
        .find("{\n  \"acquired\"")
        .ok_or_else(|| anyhow::anyhow!("no summary in output: {text}"))?;
    Ok(serde_json::from_str(&text[start..])?)
}

#[tokio::test]
async fn invalid_config_exits_with_two() -> anyhow::Result<()> {
    let status = Command::new(env!("CARGO_BIN_EXE_seatgrab"))
        .args(["--catalog-days", "9"])
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await?;
    assert_eq!(status.code(), Some(2));
    Ok(())
}

#[tokio::test]
async fn acquires_and_prints_json_summary() -> anyhow::Result<()> {
    let fake = registrar().await?;
    fake.state.script_enroll("s1", vec![enroll_ok()]);
    fake.state.script_enroll("s2", vec![enroll_ok()]);

    let mut child = spawn(&fake, &["--json"])?;
    answer(&mut child, "2021001\nsecret\n1\ns1\ns2\ndone\n").await?;
    let output = tokio::time::timeout(TIMEOUT, child.wait_with_output()).await??;

    assert_eq!(output.status.code(), Some(0));
    let summary = summary_json(&output.stdout)?;
    let mut ids: Vec<&str> = summary["acquired"]
        .as_array()
        .into_iter()
        .flatten()
        .filter_map(|t| t["id"].as_str())
        .collect();
    ids.sort_unstable();
    assert_eq!(ids, vec!["s1", "s2"]);
    assert_eq!(summary["cancelled"], false);
    Ok(())
}

#[tokio::test]
async fn rejected_login_exits_with_one() -> anyhow::Result<()> {
    let fake = registrar().await?;
    *fake.state.login.lock() = LoginReply::Reject("<p>密码错误</p>".into());

    let mut child = spawn(&fake, &[])?;
    answer(&mut child, "2021001\nwrong\n").await?;
    let output = tokio::time::timeout(TIMEOUT, child.wait_with_output()).await??;

    assert_eq!(output.status.code(), Some(1));
    assert!(fake.state.enroll_calls.lock().is_empty());
    Ok(())
}

#[tokio::test]
async fn sigterm_stops_acquisition() -> anyhow::Result<()> {
    let fake = registrar().await?;

    let mut child = spawn(&fake, &["--json"])?;
    answer(&mut child, "2021001\nsecret\n1\ns1\ndone\n").await?;

    let deadline = tokio::time::Instant::now() + TIMEOUT;
    while fake.state.enroll_calls_for("s1").len() < 3 {
        anyhow::ensure!(tokio::time::Instant::now() < deadline, "no enrollment attempts");
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    let pid = child.id().ok_or_else(|| anyhow::anyhow!("process already exited"))?;
    let killed = Command::new("kill").args(["-TERM", &pid.to_string()]).status().await?;
    assert!(killed.success());

    let output = tokio::time::timeout(TIMEOUT, child.wait_with_output()).await??;
    assert_eq!(output.status.code(), Some(0));
    let summary = summary_json(&output.stdout)?;
    assert_eq!(summary["cancelled"], true);
    assert_eq!(summary["acquired"].as_array().map(Vec::len), Some(0));
    Ok(())
}
