//! Node instances placed on the canvas.

use crate::graph::catalog::NodeKind;
use crate::graph::id::NodeId;
use crate::graph::port::InputMode;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Canvas position of a node.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn offset(self, dx: f64, dy: f64) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }
}

/// Live execution status reported by the executor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeStatus {
    #[default]
    Idle,
    Executing,
    Completed,
    Error,
}

impl NodeStatus {
    /// Parse the executor's state string; unknown states are `None`.
    pub fn parse(state: &str) -> Option<Self> {
        match state {
            "idle" => Some(NodeStatus::Idle),
            "executing" | "running" => Some(NodeStatus::Executing),
            "completed" | "success" => Some(NodeStatus::Completed),
            "error" | "failed" => Some(NodeStatus::Error),
            _ => None,
        }
    }
}

/// The most recent telemetry payload received for a node.
#[derive(Debug, Clone, PartialEq)]
pub struct Telemetry {
    pub payload: Value,
    /// Executor timestamp (seconds since the epoch), when supplied.
    pub timestamp: Option<f64>,
}

/// A status/telemetry update addressed to one node.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NodeUpdate {
    pub node_id: NodeId,
    pub status: Option<NodeStatus>,
    pub telemetry: Option<Value>,
    pub error: Option<String>,
    pub timestamp: Option<f64>,
}

impl NodeUpdate {
    pub fn status(node_id: impl Into<NodeId>, status: NodeStatus) -> Self {
        Self {
            node_id: node_id.into(),
            status: Some(status),
            ..Default::default()
        }
    }

    pub fn failed(node_id: impl Into<NodeId>, message: impl Into<String>) -> Self {
        Self {
            node_id: node_id.into(),
            status: Some(NodeStatus::Error),
            error: Some(message.into()),
            ..Default::default()
        }
    }
}

/// A node on the graph.
///
/// Modes and literals are keyed by input name. Every input of the kind has a
/// mode; literals exist for inputs that were seeded or explicitly written and
/// are kept when the input is switched to `connection` mode.
#[derive(Debug, Clone)]
pub struct Node {
    pub id: NodeId,
    pub kind: Arc<NodeKind>,
    pub position: Position,
    pub(crate) modes: BTreeMap<String, InputMode>,
    pub(crate) literals: BTreeMap<String, Value>,
    pub bypassed: bool,
    pub status: NodeStatus,
    pub telemetry: Option<Telemetry>,
    pub last_error: Option<String>,
}

impl Node {
    pub(crate) fn new(id: NodeId, kind: Arc<NodeKind>, position: Position) -> Self {
        let mut modes = BTreeMap::new();
        let mut literals = BTreeMap::new();
        for input in &kind.inputs {
            let mode = input.default_mode();
            if mode == InputMode::Manual {
                if let Some(default) = &input.default {
                    literals.insert(input.name.clone(), default.clone());
                }
            }
            modes.insert(input.name.clone(), mode);
        }

        Self {
            id,
            kind,
            position,
            modes,
            literals,
            bypassed: false,
            status: NodeStatus::Idle,
            telemetry: None,
            last_error: None,
        }
    }

    pub fn kind_name(&self) -> &str {
        &self.kind.name
    }

    pub fn mode(&self, input: &str) -> Option<InputMode> {
        self.modes.get(input).copied()
    }

    pub fn modes(&self) -> impl Iterator<Item = (&str, InputMode)> {
        self.modes.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// The stored literal, whatever the input's current mode.
    pub fn literal(&self, input: &str) -> Option<&Value> {
        self.literals.get(input)
    }

    pub fn literals(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.literals.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Values of the inputs read from literals: every `manual` input, using
    /// the descriptor default when nothing was stored.
    pub fn parameters(&self) -> Map<String, Value> {
        let mut params = Map::new();
        for input in &self.kind.inputs {
            if self.mode(&input.name) != Some(InputMode::Manual) {
                continue;
            }
            let value = self
                .literals
                .get(&input.name)
                .or(input.default.as_ref());
            if let Some(value) = value {
                params.insert(input.name.clone(), value.clone());
            }
        }
        params
    }

    /// Copy of this node under a new id with execution state reset.
    pub(crate) fn duplicate(&self, id: NodeId, position: Position) -> Self {
        Self {
            id,
            kind: Arc::clone(&self.kind),
            position,
            modes: self.modes.clone(),
            literals: self.literals.clone(),
            bypassed: self.bypassed,
            status: NodeStatus::Idle,
            telemetry: None,
            last_error: None,
        }
    }

    pub(crate) fn apply_update(&mut self, update: &NodeUpdate) {
        if let Some(status) = update.status {
            self.status = status;
            if status != NodeStatus::Error {
                self.last_error = None;
            }
        }
        if let Some(payload) = &update.telemetry {
            self.telemetry = Some(Telemetry {
                payload: payload.clone(),
                timestamp: update.timestamp,
            });
        }
        if let Some(error) = &update.error {
            self.last_error = Some(error.clone());
        }
    }

    pub(crate) fn reset_status(&mut self) {
        self.status = NodeStatus::Idle;
        self.last_error = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::catalog::NodeCatalog;
    use serde_json::json;

    fn reader() -> Node {
        let kind = NodeCatalog::builtin().get("RobotStatusReader").unwrap();
        Node::new(NodeId::from("reader"), kind, Position::default())
    }

    #[test]
    fn test_new_node_defaults_modes_and_literals() {
        let node = reader();
        assert_eq!(node.mode("sdk"), Some(InputMode::Connection));
        assert_eq!(node.mode("servo_ids"), Some(InputMode::Manual));
        assert_eq!(node.literal("servo_ids"), Some(&json!("1,2,3,4,5")));
        assert_eq!(node.literal("sdk"), None);
        assert_eq!(node.status, NodeStatus::Idle);
    }

    #[test]
    fn test_parameters_only_include_manual_inputs() {
        let mut node = reader();
        node.modes.insert("servo_ids".into(), InputMode::Connection);
        let params = node.parameters();
        assert!(!params.contains_key("servo_ids"));
        assert!(!params.contains_key("sdk"));
        assert_eq!(params.get("update_interval"), Some(&json!(0.1)));
    }

    #[test]
    fn test_apply_update_keeps_unmentioned_fields() {
        let mut node = reader();
        node.apply_update(&NodeUpdate::failed("reader", "bus timeout"));
        assert_eq!(node.status, NodeStatus::Error);
        assert_eq!(node.last_error.as_deref(), Some("bus timeout"));

        node.apply_update(&NodeUpdate {
            node_id: NodeId::from("reader"),
            telemetry: Some(json!({"positions": {"1": 2048}})),
            ..Default::default()
        });
        assert_eq!(node.status, NodeStatus::Error);
        assert!(node.telemetry.is_some());

        node.apply_update(&NodeUpdate::status("reader", NodeStatus::Completed));
        assert_eq!(node.last_error, None);
    }

    #[test]
    fn test_status_parse() {
        assert_eq!(NodeStatus::parse("executing"), Some(NodeStatus::Executing));
        assert_eq!(NodeStatus::parse("completed"), Some(NodeStatus::Completed));
        assert_eq!(NodeStatus::parse("bogus"), None);
    }
}
