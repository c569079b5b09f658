//! Logging and timing for the buildplan tools
//!
//! - Structured logging with tracing, written to stderr so that resolved
//!   plans on stdout stay machine readable
//! - A per-process session id for correlating log lines
//! - Phase timers for `--verbose` summaries

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use uuid::Uuid;

/// Global session ID for correlating logs
static SESSION_ID: Lazy<String> = Lazy::new(|| Uuid::new_v4().to_string());

/// Durations of completed phases, in completion order
static TIMINGS: Lazy<Mutex<Vec<(String, Duration)>>> = Lazy::new(|| Mutex::new(Vec::new()));

/// Initialize with custom configuration
///
/// `RUST_LOG` takes precedence over `config.log_level`.
pub fn init_with_config(config: TelemetryConfig) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .map_err(|e| anyhow::anyhow!("Invalid log filter '{}': {}", config.log_level, e))?;

    let registry = tracing_subscriber::registry().with(filter);
    let result = if config.json {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_target(config.show_target),
            )
            .try_init()
    } else {
        registry
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(config.show_target)
                    .with_ansi(config.ansi)
                    .without_time()
                    .compact(),
            )
            .try_init()
    };
    result.map_err(|e| anyhow::anyhow!("Failed to set tracing subscriber: {}", e))?;

    tracing::debug!(
        session_id = %session_id(),
        version = env!("CARGO_PKG_VERSION"),
        "Telemetry initialized"
    );

    Ok(())
}

/// Get the current session ID
pub fn session_id() -> &'static str {
    &SESSION_ID
}

/// Telemetry configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    pub log_level: String,
    pub show_target: bool,
    /// Emit JSON log lines instead of the compact format
    pub json: bool,
    /// Colorize the compact format
    pub ansi: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: "warn".to_string(),
            show_target: false,
            json: false,
            ansi: true,
        }
    }
}

/// Timer for measuring one phase
pub struct Timer {
    name: String,
    start: Instant,
}

impl Timer {
    /// Start a new timer
    pub fn start(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            start: Instant::now(),
        }
    }

    /// Stop the timer and record the duration
    pub fn stop(self) -> Duration {
        let duration = self.start.elapsed();
        tracing::debug!(
            phase = %self.name,
            duration_us = duration.as_micros() as u64,
            "Phase completed"
        );
        if let Ok(mut timings) = TIMINGS.lock() {
            timings.push((self.name, duration));
        }
        duration
    }
}

/// Run `f` as a named phase
pub fn timed<T>(name: &str, f: impl FnOnce() -> T) -> T {
    let timer = Timer::start(name);
    let value = f();
    timer.stop();
    value
}

/// Phases recorded so far
pub fn timings() -> Vec<(String, Duration)> {
    TIMINGS.lock().map(|t| t.clone()).unwrap_or_default()
}
