//! Projection of a graph into the executor's request format.
//!
//! Building a request only reads the graph. Each build mints a fresh id,
//! name and creation time; everything else depends on the graph alone.

use crate::graph::{Graph, NodeId, WireEdge};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;
use uuid::Uuid;

/// Version of the request layout understood by the executor.
pub const SCHEMA_VERSION: &str = "1.0.0";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestNodeData {
    pub parameters: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestNode {
    pub id: NodeId,
    #[serde(rename = "type")]
    pub kind: String,
    pub data: RequestNodeData,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestMetadata {
    pub id: Uuid,
    pub name: String,
    pub created: DateTime<Utc>,
    pub version: String,
}

/// Self-contained description of one execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionRequest {
    pub nodes: Vec<RequestNode>,
    pub edges: Vec<WireEdge>,
    pub metadata: RequestMetadata,
    /// Pause between iterations of a continuous run, in seconds.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub sleep_time: Option<f64>,
}

/// Builds [`ExecutionRequest`]s from a graph.
#[derive(Debug, Clone)]
pub struct RequestBuilder {
    name_prefix: String,
    sleep_time: Option<f64>,
}

impl Default for RequestBuilder {
    fn default() -> Self {
        Self {
            name_prefix: "workflow".to_string(),
            sleep_time: None,
        }
    }
}

impl RequestBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.name_prefix = prefix.into();
        self
    }

    pub fn sleep_time(mut self, seconds: f64) -> Self {
        self.sleep_time = Some(seconds);
        self
    }

    /// Bypassed nodes, and edges touching them, are left out.
    pub fn build(&self, graph: &Graph) -> ExecutionRequest {
        let mut included = HashSet::new();
        let nodes = graph
            .nodes()
            .iter()
            .filter(|node| !node.bypassed)
            .map(|node| {
                included.insert(&node.id);
                RequestNode {
                    id: node.id.clone(),
                    kind: node.kind.name.clone(),
                    data: RequestNodeData {
                        parameters: node.parameters(),
                    },
                }
            })
            .collect();

        let edges = graph
            .edges()
            .iter()
            .filter(|e| included.contains(&e.source.node) && included.contains(&e.target.node))
            .map(|e| WireEdge {
                id: e.id.to_string(),
                source: e.source.node.to_string(),
                source_handle: e.source.port.clone(),
                target: e.target.node.to_string(),
                target_handle: e.target.port.clone(),
            })
            .collect();

        let created = Utc::now();
        ExecutionRequest {
            nodes,
            edges,
            metadata: RequestMetadata {
                id: Uuid::new_v4(),
                name: format!("{}-{}", self.name_prefix, created.format("%Y%m%d-%H%M%S")),
                created,
                version: SCHEMA_VERSION.to_string(),
            },
            sleep_time: self.sleep_time,
        }
    }
}

/// Build a request with the default builder settings.
pub fn build_request(graph: &Graph) -> ExecutionRequest {
    RequestBuilder::default().build(graph)
}
