// Copyright (c) 2024 Botho Foundation

//! Logging setup and the fatal halt path.
//!
//! Logging is configured via the config file:
//!
//! ```toml
//! [telemetry]
//! log_filter = "info,meridian::admission=debug"
//! ansi = true
//! ```
//!
//! `RUST_LOG`, when set, takes precedence over `log_filter`.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{fmt::Display, io::Write};
use tracing::error;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Telemetry configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// `EnvFilter` directives used when `RUST_LOG` is unset
    #[serde(default = "default_log_filter")]
    pub log_filter: String,

    /// Colored output
    #[serde(default)]
    pub ansi: bool,
}

fn default_log_filter() -> String {
    "info".to_string()
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_filter: default_log_filter(),
            ansi: false,
        }
    }
}

impl TelemetryConfig {
    /// The filter to install. `verbose` lowers the default to `debug`.
    fn env_filter(&self, verbose: bool) -> Result<EnvFilter> {
        if let Ok(filter) = EnvFilter::try_from_default_env() {
            return Ok(filter);
        }
        let directives = if verbose { "debug" } else { &self.log_filter };
        EnvFilter::try_new(directives)
            .with_context(|| format!("Invalid log filter {directives:?}"))
    }
}

/// Initialize the global tracing subscriber.
///
/// Returns a guard that must be held for the duration of the program. When
/// dropped, it flushes buffered output.
pub fn init_tracing(config: &TelemetryConfig, verbose: bool) -> Result<TelemetryGuard> {
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_ansi(config.ansi)
        .with_writer(std::io::stderr)
        .with_filter(config.env_filter(verbose)?);

    tracing_subscriber::registry()
        .with(fmt_layer)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    Ok(TelemetryGuard)
}

/// Flushes log output on drop.
pub struct TelemetryGuard;

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        let _ = std::io::stderr().flush();
        let _ = std::io::stdout().flush();
    }
}

/// Log `err` and terminate the process.
///
/// Used for failures that must stop the node, such as a monetary policy
/// error during block start.
pub fn halt<E: Display>(err: E, guard: Option<TelemetryGuard>) -> ! {
    error!(error = %err, "fatal error, halting node");
    drop(guard);
    let _ = std::io::stderr().flush();
    std::process::exit(1)
}
