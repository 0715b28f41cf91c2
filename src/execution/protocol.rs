//! Executor REST response bodies.
//!
//! Every field the executor may omit carries a serde default so older or
//! newer executors still decode.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One executor log line.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LogEntry {
    #[serde(default)]
    pub timestamp: Option<f64>,
    #[serde(default)]
    pub level: String,
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub traceback: Option<String>,
}

/// Response to `POST /run`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RunResponse {
    pub success: bool,
    #[serde(default)]
    pub results: Option<Value>,
    #[serde(default)]
    pub logs: Vec<LogEntry>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Response to `POST /continuous/start` and `POST /continuous/stop`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AckResponse {
    pub success: bool,
    #[serde(default)]
    pub message: String,
}

/// Response to `GET /continuous/status`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ContinuousStatus {
    #[serde(default)]
    pub is_running: bool,
    #[serde(default)]
    pub has_workflow: bool,
    #[serde(default)]
    pub count_of_iterations: u64,
    /// Duration of the last iteration, in seconds.
    #[serde(default)]
    pub last_execution_time: Option<f64>,
    #[serde(default)]
    pub loop_interval: Option<f64>,
    #[serde(default)]
    pub results: Value,
    #[serde(default)]
    pub logs: Vec<LogEntry>,
    #[serde(default)]
    pub is_setup: bool,
}

impl ContinuousStatus {
    pub fn running(iterations: u64) -> Self {
        Self {
            is_running: true,
            has_workflow: true,
            count_of_iterations: iterations,
            is_setup: true,
            ..Default::default()
        }
    }

    pub fn stopped() -> Self {
        Self::default()
    }
}

/// FastAPI error body (`{"detail": ...}`).
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorBody {
    pub detail: Value,
}

impl ErrorBody {
    pub fn message(&self) -> String {
        match &self.detail {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}
