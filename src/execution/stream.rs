//! Real-time stream messages exchanged with the executor.
//!
//! Frames arrive as `{"type": ..., "timestamp": ..., "data": {...}}` and are
//! resolved once into a [`StreamEvent`]. The transport carrying the frames is
//! owned by the caller.

use crate::execution::error::{ExecutionError, ExecutionResult};
use crate::execution::protocol::ContinuousStatus;
use crate::graph::{NodeId, NodeStatus, NodeUpdate};
use serde::Deserialize;
use serde_json::{json, Value};

#[derive(Debug, Deserialize)]
struct RawFrame {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    timestamp: Option<f64>,
    #[serde(default)]
    data: Value,
    #[serde(default)]
    message: Option<String>,
}

/// Workflow-level lifecycle notifications.
#[derive(Debug, Clone, PartialEq)]
pub enum WorkflowEvent {
    Started,
    Completed { execution_time: Option<f64> },
    Failed { error: String },
    ContinuousStarted,
    ContinuousStopped,
    Other(String),
}

/// A decoded inbound stream frame.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// Status and/or telemetry for one node.
    NodeState(NodeUpdate),
    Workflow(WorkflowEvent),
    ContinuousUpdate { execution_count: u64, status: String },
    ParameterUpdated {
        node_id: NodeId,
        parameter_name: String,
        success: bool,
    },
    /// Answer to [`ClientMessage::GetStatus`]: the executor's loop status.
    StatusResponse(ContinuousStatus),
    Pong,
    Error(String),
    Unknown(String),
}

impl StreamEvent {
    pub fn parse(text: &str) -> ExecutionResult<Self> {
        let value: Value =
            serde_json::from_str(text).map_err(|e| ExecutionError::Decode(e.to_string()))?;
        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> ExecutionResult<Self> {
        let frame: RawFrame =
            serde_json::from_value(value).map_err(|e| ExecutionError::Decode(e.to_string()))?;
        let data = &frame.data;
        let text = |v: &Value, key: &str| v.get(key).and_then(Value::as_str).map(str::to_string);

        let event = match frame.kind.as_str() {
            "node_state" => {
                let node_id = text(data, "node_id")
                    .ok_or_else(|| ExecutionError::Decode("node_state without node_id".into()))?;
                let state = text(data, "state").unwrap_or_default();
                let status = NodeStatus::parse(&state);
                if status.is_none() {
                    tracing::debug!("Unrecognised node state '{}' for {}", state, node_id);
                }
                let inner = data.get("data").unwrap_or(&Value::Null);
                StreamEvent::NodeState(NodeUpdate {
                    node_id: NodeId::new(node_id),
                    status,
                    telemetry: inner.get("rt_update").cloned(),
                    error: text(inner, "error"),
                    timestamp: frame.timestamp,
                })
            }
            "workflow_event" => {
                let inner = data.get("data").unwrap_or(&Value::Null);
                let event = match text(data, "event").unwrap_or_default().as_str() {
                    "workflow_started" => WorkflowEvent::Started,
                    "workflow_completed" => WorkflowEvent::Completed {
                        execution_time: inner.get("execution_time").and_then(Value::as_f64),
                    },
                    "workflow_error" => WorkflowEvent::Failed {
                        error: text(inner, "error").unwrap_or_else(|| "unknown error".into()),
                    },
                    "continuous_started" => WorkflowEvent::ContinuousStarted,
                    "continuous_stopped" => WorkflowEvent::ContinuousStopped,
                    other => WorkflowEvent::Other(other.to_string()),
                };
                StreamEvent::Workflow(event)
            }
            "continuous_update" => StreamEvent::ContinuousUpdate {
                execution_count: data
                    .get("execution_count")
                    .and_then(Value::as_u64)
                    .unwrap_or(0),
                status: text(data, "status").unwrap_or_default(),
            },
            "parameter_updated" => StreamEvent::ParameterUpdated {
                node_id: NodeId::new(text(data, "node_id").unwrap_or_default()),
                parameter_name: text(data, "parameter_name").unwrap_or_default(),
                success: data.get("success").and_then(Value::as_bool).unwrap_or(false),
            },
            "status_response" => {
                let execution = data.get("execution").unwrap_or(data).clone();
                let status = serde_json::from_value(execution)
                    .map_err(|e| ExecutionError::Decode(format!("status_response: {}", e)))?;
                StreamEvent::StatusResponse(status)
            }
            "pong" => StreamEvent::Pong,
            "error" => StreamEvent::Error(
                frame
                    .message
                    .clone()
                    .or_else(|| text(data, "message"))
                    .unwrap_or_else(|| "unknown error".into()),
            ),
            other => StreamEvent::Unknown(other.to_string()),
        };
        Ok(event)
    }
}

/// Outbound stream messages.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientMessage {
    /// Live parameter change; the executor only honours it while a
    /// continuous run is active.
    InputUpdate {
        node_id: NodeId,
        input_name: String,
        input_value: Value,
    },
    Ping,
    GetStatus,
}

impl ClientMessage {
    pub fn to_value(&self) -> Value {
        let timestamp = chrono::Utc::now().timestamp_millis() as f64 / 1000.0;
        match self {
            ClientMessage::InputUpdate {
                node_id,
                input_name,
                input_value,
            } => json!({
                "type": "input_update",
                "timestamp": timestamp,
                "data": {
                    "node_id": node_id,
                    "input_name": input_name,
                    "input_value": input_value,
                }
            }),
            ClientMessage::Ping => json!({"type": "ping", "timestamp": timestamp}),
            ClientMessage::GetStatus => json!({"type": "get_status", "timestamp": timestamp}),
        }
    }

    pub fn to_json(&self) -> String {
        self.to_value().to_string()
    }
}
