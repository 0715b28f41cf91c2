//! Saved graph snapshots.
//!
//! The snapshot uses the same node/edge layout as the execution request, plus
//! what is needed to rebuild the editor state: canvas positions, per-input
//! modes, every stored literal and the bypass flag.
//!
//! Loading re-validates everything. Unknown node kinds fail the load; edges
//! that no longer fit the current kinds are dropped and listed in the
//! [`LoadReport`].

use crate::graph::catalog::NodeCatalog;
use crate::graph::error::{GraphError, GraphResult};
use crate::graph::id::{NodeId, PortRef};
use crate::graph::model::Graph;
use crate::graph::node::{Node, Position};
use crate::graph::port::InputMode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// An edge as exchanged with the executor and stored in snapshots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireEdge {
    #[serde(default)]
    pub id: String,
    pub source: String,
    #[serde(rename = "sourceHandle", default = "default_source_handle")]
    pub source_handle: String,
    pub target: String,
    #[serde(rename = "targetHandle", default = "default_target_handle")]
    pub target_handle: String,
}

fn default_source_handle() -> String {
    "output".to_string()
}

fn default_target_handle() -> String {
    "input".to_string()
}

/// Editor-only node state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SnapshotNodeData {
    #[serde(default)]
    pub parameters: BTreeMap<String, Value>,
    #[serde(rename = "inputModes", default)]
    pub input_modes: BTreeMap<String, InputMode>,
    #[serde(default)]
    pub bypassed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotNode {
    pub id: NodeId,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub position: Position,
    #[serde(default)]
    pub data: SnapshotNodeData,
}

/// Complete, reloadable picture of a graph.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphSnapshot {
    #[serde(default)]
    pub nodes: Vec<SnapshotNode>,
    #[serde(default)]
    pub edges: Vec<WireEdge>,
}

/// An edge discarded while loading a snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct DroppedEdge {
    pub edge: WireEdge,
    pub reason: String,
}

/// What loading had to discard to keep the graph valid.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadReport {
    pub dropped_edges: Vec<DroppedEdge>,
    /// `(node, input)` pairs whose stored literal or mode named an input the
    /// kind no longer has.
    pub ignored_inputs: Vec<(NodeId, String)>,
}

impl LoadReport {
    pub fn is_clean(&self) -> bool {
        self.dropped_edges.is_empty() && self.ignored_inputs.is_empty()
    }
}

impl Graph {
    pub fn to_snapshot(&self) -> GraphSnapshot {
        let nodes = self
            .nodes()
            .iter()
            .map(|node| SnapshotNode {
                id: node.id.clone(),
                kind: node.kind.name.clone(),
                position: node.position,
                data: SnapshotNodeData {
                    parameters: node.literals.clone(),
                    input_modes: node.modes.clone(),
                    bypassed: node.bypassed,
                },
            })
            .collect();

        let edges = self
            .edges()
            .iter()
            .map(|edge| WireEdge {
                id: edge.id.to_string(),
                source: edge.source.node.to_string(),
                source_handle: edge.source.port.clone(),
                target: edge.target.node.to_string(),
                target_handle: edge.target.port.clone(),
            })
            .collect();

        GraphSnapshot { nodes, edges }
    }

    /// Rebuild a graph from a snapshot, resolving kinds through `catalog`.
    pub fn from_snapshot(
        snapshot: &GraphSnapshot,
        catalog: &NodeCatalog,
    ) -> GraphResult<(Graph, LoadReport)> {
        let mut graph = Graph::new();
        let mut report = LoadReport::default();

        for saved in &snapshot.nodes {
            let kind = catalog.require(&saved.kind)?;
            let mut node = Node::new(saved.id.clone(), kind, saved.position);

            for (input, mode) in &saved.data.input_modes {
                if node.kind.input_port(input).is_some() {
                    node.modes.insert(input.clone(), *mode);
                } else {
                    report.ignored_inputs.push((saved.id.clone(), input.clone()));
                }
            }
            for (input, value) in &saved.data.parameters {
                if node.kind.input_port(input).is_some() {
                    node.literals.insert(input.clone(), value.clone());
                } else if !saved.data.input_modes.contains_key(input) {
                    report.ignored_inputs.push((saved.id.clone(), input.clone()));
                }
            }
            node.bypassed = saved.data.bypassed;

            graph.insert_node(node)?;
        }

        for edge in &snapshot.edges {
            let source = PortRef::new(edge.source.as_str(), edge.source_handle.as_str());
            let target = PortRef::new(edge.target.as_str(), edge.target_handle.as_str());
            if let Err(e) = graph.insert_edge(source, target) {
                tracing::warn!("Dropping edge {} -> {}: {}", edge.source, edge.target, e);
                report.dropped_edges.push(DroppedEdge {
                    edge: edge.clone(),
                    reason: e.to_string(),
                });
            }
        }

        if !report.is_clean() {
            tracing::info!(
                "Snapshot loaded with {} dropped edge(s) and {} ignored input(s)",
                report.dropped_edges.len(),
                report.ignored_inputs.len()
            );
        }
        Ok((graph, report))
    }

    /// Parse and load a snapshot from JSON text.
    pub fn from_json(json: &str, catalog: &NodeCatalog) -> GraphResult<(Graph, LoadReport)> {
        let snapshot: GraphSnapshot = serde_json::from_str(json)
            .map_err(|e| GraphError::InvalidSnapshot(e.to_string()))?;
        Self::from_snapshot(&snapshot, catalog)
    }
}
