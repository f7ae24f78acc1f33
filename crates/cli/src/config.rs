// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::time::Duration;

use clap::Parser;
use seatgrab_engine::EngineConfig;

/// Concurrent course-seat acquisition against a registrar.
#[derive(Debug, Clone, Parser)]
#[command(name = "seatgrab", version, about)]
pub struct Config {
    /// Registrar origin (scheme and host).
    #[arg(long, env = "SEATGRAB_BASE_URL", default_value = "https://jw.educationgroup.cn")]
    pub base_url: String,

    /// Application path prefix on the registrar.
    #[arg(long, env = "SEATGRAB_APP_PATH", default_value = "/ytkjxy_jsxsd")]
    pub app_path: String,

    /// Pause after a contended or failed attempt, in ms.
    #[arg(long, env = "SEATGRAB_RETRY_DELAY_MS", default_value = "1000")]
    pub retry_delay_ms: u64,

    /// Pause after a failed session refresh, in ms. Raised to at least three
    /// times the retry delay.
    #[arg(long, env = "SEATGRAB_REFRESH_FAILURE_DELAY_MS", default_value = "3000")]
    pub refresh_failure_delay_ms: u64,

    /// Per-request timeout, in ms.
    #[arg(long, env = "SEATGRAB_REQUEST_TIMEOUT_MS", default_value = "10000")]
    pub request_timeout_ms: u64,

    /// Number of weekdays (1..=7) to query when listing courses.
    #[arg(long, env = "SEATGRAB_CATALOG_DAYS", default_value = "7")]
    pub catalog_days: u8,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, env = "SEATGRAB_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Log format (json or text).
    #[arg(long, env = "SEATGRAB_LOG_FORMAT", default_value = "text")]
    pub log_format: String,

    /// Print the final summary as JSON instead of a table.
    #[arg(long, env = "SEATGRAB_JSON")]
    pub json: bool,
}

impl Config {
    /// Validate the configuration after parsing.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.retry_delay_ms == 0 {
            anyhow::bail!("--retry-delay-ms must be greater than zero");
        }
        if self.refresh_failure_delay_ms == 0 {
            anyhow::bail!("--refresh-failure-delay-ms must be greater than zero");
        }
        if self.request_timeout_ms == 0 {
            anyhow::bail!("--request-timeout-ms must be greater than zero");
        }
        if !(1..=7).contains(&self.catalog_days) {
            anyhow::bail!("--catalog-days must be between 1 and 7, got {}", self.catalog_days);
        }

        let url = reqwest::Url::parse(&self.base_url)
            .map_err(|e| anyhow::anyhow!("invalid --base-url {:?}: {e}", self.base_url))?;
        if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
            anyhow::bail!("--base-url must be an http(s) origin, got {:?}", self.base_url);
        }
        if !self.app_path.is_empty() && !self.app_path.starts_with('/') {
            anyhow::bail!("--app-path must start with '/', got {:?}", self.app_path);
        }

        match self.log_format.as_str() {
            "json" | "text" => Ok(()),
            other => anyhow::bail!("invalid log format: {other}"),
        }
    }

    /// Registrar root: origin plus application path, no trailing slash.
    pub fn app_root(&self) -> String {
        format!(
            "{}{}",
            self.base_url.trim_end_matches('/'),
            self.app_path.trim_end_matches('/')
        )
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn engine(&self) -> EngineConfig {
        EngineConfig::new(
            Duration::from_millis(self.retry_delay_ms),
            Duration::from_millis(self.refresh_failure_delay_ms),
        )
    }

    /// Build a `Config` pointed at a local registrar, with short delays.
    #[doc(hidden)]
    pub fn test(base_url: &str) -> Self {
        Self {
            base_url: base_url.to_owned(),
            app_path: "/ytkjxy_jsxsd".into(),
            retry_delay_ms: 10,
            refresh_failure_delay_ms: 30,
            request_timeout_ms: 2_000,
            catalog_days: 7,
            log_level: "debug".into(),
            log_format: "text".into(),
            json: false,
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
