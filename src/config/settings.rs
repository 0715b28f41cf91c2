//! Setting groups that make up [`AppConfig`](super::AppConfig)
//!
//! # Main Types
//!
//! - [`ExecutorSettings`] - Where the executor lives and how long to wait for it
//! - [`PollingSettings`] - Continuous-run status polling cadence
//! - [`ContinuousSettings`] - Parameters sent with a continuous start
//! - [`LoggingSettings`] - Log filter and optional log directory
//!
//! Every field has a serde default, so partial TOML files load.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Default executor address
pub const DEFAULT_EXECUTOR_URL: &str = "http://localhost:8000";

/// Default delay between successful status polls in milliseconds
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;

/// Default delay after a failed status poll in milliseconds
pub const DEFAULT_RETRY_INTERVAL_MS: u64 = 3000;

/// Default log filter
pub const DEFAULT_LOG_FILTER: &str = "info,botflow=debug";

// ==================== Executor ====================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorSettings {
    /// Base URL of the executor REST API
    pub base_url: String,

    /// Whole-request timeout in milliseconds
    pub request_timeout_ms: u64,

    /// Connection timeout in milliseconds
    pub connect_timeout_ms: u64,
}

impl Default for ExecutorSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_EXECUTOR_URL.to_string(),
            request_timeout_ms: 30_000,
            connect_timeout_ms: 5_000,
        }
    }
}

// ==================== Polling ====================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollingSettings {
    /// Delay between status polls while the run is healthy
    pub interval_ms: u64,

    /// Delay before retrying after a failed poll
    pub retry_interval_ms: u64,
}

impl Default for PollingSettings {
    fn default() -> Self {
        Self {
            interval_ms: DEFAULT_POLL_INTERVAL_MS,
            retry_interval_ms: DEFAULT_RETRY_INTERVAL_MS,
        }
    }
}

impl PollingSettings {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn retry_interval(&self) -> Duration {
        Duration::from_millis(self.retry_interval_ms)
    }
}

// ==================== Continuous ====================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContinuousSettings {
    /// Pause between executor loop iterations, in seconds
    pub sleep_time_secs: f64,
}

impl Default for ContinuousSettings {
    fn default() -> Self {
        Self {
            sleep_time_secs: 1.0,
        }
    }
}

// ==================== Logging ====================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// `tracing_subscriber::EnvFilter` directive, overridden by `RUST_LOG`
    pub filter: String,

    /// Directory for daily rolling log files; console only when unset
    pub log_dir: Option<PathBuf>,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            filter: DEFAULT_LOG_FILTER.to_string(),
            log_dir: None,
        }
    }
}
