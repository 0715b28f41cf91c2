//! Graph-specific error types.

use crate::graph::id::{EdgeId, NodeId};
use crate::graph::port::{PortDirection, PortType};
use thiserror::Error;

/// Errors raised when editing or loading a graph.
///
/// Every variant is returned before the graph is touched.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GraphError {
    #[error("Unknown node '{0}'")]
    UnknownNode(NodeId),

    #[error("Unknown node kind '{0}'")]
    UnknownNodeKind(String),

    #[error("Node '{node}' has no {direction} port '{port}'")]
    UnknownPort {
        node: NodeId,
        port: String,
        direction: PortDirection,
    },

    #[error("Cannot connect {output} output to {input} input")]
    IncompatibleTypes { output: PortType, input: PortType },

    #[error("Unknown edge '{0}'")]
    UnknownEdge(EdgeId),

    #[error("Cycle detected in graph ({scheduled} of {total} nodes ordered)")]
    CycleDetected { scheduled: usize, total: usize },

    #[error("Invalid snapshot: {0}")]
    InvalidSnapshot(String),

    #[error("Invalid node listing: {0}")]
    InvalidListing(String),
}

pub type GraphResult<T> = std::result::Result<T, GraphError>;
