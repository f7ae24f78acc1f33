// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Top-level runner, shared by `main` and integration tests.

use std::io::{BufRead, Write};
use std::sync::Arc;

use anyhow::Context;
use seatgrab_engine::{Credential, Engine, ResourceTarget, Summary};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::encode::encode_login;
use crate::prompt::{choose_sections, choose_window, read_account};
use crate::reauth::RegistrarReauthenticator;
use crate::registrar::RegistrarClient;
use crate::table::{write_catalog, write_progress, write_summary, write_windows};
use crate::windows::SessionWindow;

/// Everything interactive setup produced: a signed-in session scoped to a
/// window, and the sections to go after.
pub struct Prepared {
    pub client: Arc<RegistrarClient>,
    pub credential: Credential,
    pub window: SessionWindow,
    pub targets: Vec<ResourceTarget>,
    encoded: String,
}

impl Prepared {
    /// Wire the engine to the registrar. Refreshes replay the same login
    /// and window.
    pub fn engine(&self, config: &Config, cancel: CancellationToken) -> Engine {
        let reauth = RegistrarReauthenticator::new(
            Arc::clone(&self.client),
            self.encoded.clone(),
            self.window.clone(),
        );
        Engine::new(
            config.engine(),
            self.credential.clone(),
            Arc::new(reauth),
            Arc::clone(&self.client) as _,
            cancel,
        )
    }
}

/// Initialize tracing on stderr; stdout carries prompts and results.
///
/// Uses `try_init` so it's safe to call multiple times (e.g. from tests).
pub fn init_tracing(config: &Config) {
    use tracing_subscriber::fmt;

    let filter = EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info"));

    let result = match config.log_format.as_str() {
        "json" => fmt::fmt().with_env_filter(filter).with_writer(std::io::stderr).json().try_init(),
        _ => fmt::fmt().with_env_filter(filter).with_writer(std::io::stderr).try_init(),
    };
    drop(result);
}

/// Sign in, pick a window, load the catalog, pick sections. Any failure
/// here aborts the run before acquisition starts.
pub async fn prepare<R: BufRead, W: Write>(
    config: &Config,
    input: &mut R,
    output: &mut W,
) -> anyhow::Result<Prepared> {
    let client = Arc::new(RegistrarClient::new(config)?);

    let (account, secret) = read_account(input, output)?;
    let encoded = encode_login(&account, &secret);
    let credential = client.login(&encoded).await.context("login failed")?;
    info!(cookies = credential.cookies().len(), "signed in");

    let windows = client.list_windows(&credential).await.context("listing windows failed")?;
    write_windows(output, &windows)?;
    let window = choose_window(input, output, &windows)?;
    client
        .establish_context(&credential, &window)
        .await
        .context("entering the enrollment window failed")?;

    let catalog = client.list_courses(&credential).await.context("loading courses failed")?;
    write_catalog(output, &catalog)?;
    let targets = choose_sections(input, output, &catalog)?;

    Ok(Prepared { client, credential, window, targets, encoded })
}

/// Run the engine to completion, printing each result line as it lands.
pub async fn acquire<W: Write>(
    engine: Engine,
    targets: Vec<ResourceTarget>,
    output: &mut W,
) -> anyhow::Result<Summary> {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let engine = engine.with_progress(tx);
    let run = engine.run(targets);
    tokio::pin!(run);

    let summary = loop {
        tokio::select! {
            summary = &mut run => break summary,
            Some(progress) = rx.recv() => {
                write_progress(output, &progress)?;
                output.flush()?;
            }
        }
    };
    while let Ok(progress) = rx.try_recv() {
        write_progress(output, &progress)?;
    }
    Ok(summary)
}

/// Cancel `shutdown` on SIGINT or SIGTERM.
pub fn spawn_signal_handler(shutdown: CancellationToken) {
    tokio::spawn(async move {
        let mut sigterm =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()).ok();
        let mut sigint =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::interrupt()).ok();

        tokio::select! {
            _ = async {
                if let Some(ref mut s) = sigterm { s.recv().await } else { std::future::pending().await }
            } => {
                info!("received SIGTERM");
                shutdown.cancel();
            }
            _ = async {
                if let Some(ref mut s) = sigint { s.recv().await } else { std::future::pending().await }
            } => {
                info!("received SIGINT");
                shutdown.cancel();
            }
        }
    });
}

/// Interactive run on the process's stdin and stdout.
pub async fn run(config: Config, shutdown: CancellationToken) -> anyhow::Result<Summary> {
    let stdin = std::io::stdin();
    let mut input = stdin.lock();
    let mut output = std::io::stdout();

    let prepared = prepare(&config, &mut input, &mut output).await?;
    if prepared.targets.is_empty() {
        writeln!(output, "没有选择任何课程")?;
        return Ok(Summary::default());
    }

    // Signals stop acquisition from here on; during setup they end the process.
    spawn_signal_handler(shutdown.clone());
    writeln!(output, "\n开始选课，按 Ctrl-C 停止...")?;

    let engine = prepared.engine(&config, shutdown);
    let summary = acquire(engine, prepared.targets.clone(), &mut output).await?;

    if config.json {
        writeln!(output, "{}", serde_json::to_string_pretty(&summary)?)?;
    } else {
        write_summary(&mut output, &summary)?;
    }
    Ok(summary)
}

#[cfg(test)]
#[path = "run_tests.rs"]
mod tests;
