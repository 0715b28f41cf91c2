//! Test data builders for creating test graphs

use botflow::graph::{Graph, NodeCatalog, NodeId, PortRef, Position};
use serde_json::Value;

/// Builder that places built-in node kinds left to right
pub struct GraphBuilder {
    catalog: NodeCatalog,
    graph: Graph,
    next_x: f64,
}

impl Default for GraphBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self {
            catalog: NodeCatalog::builtin(),
            graph: Graph::new(),
            next_x: 0.0,
        }
    }

    /// Add a node of `kind` and return its id
    pub fn node(&mut self, kind: &str) -> NodeId {
        let kind = self.catalog.get(kind).unwrap_or_else(|| panic!("unknown kind {kind}"));
        let id = self.graph.add_node(kind, Position::new(self.next_x, 0.0));
        self.next_x += 240.0;
        id
    }

    pub fn connect(
        &mut self,
        source: &NodeId,
        output: &str,
        target: &NodeId,
        input: &str,
    ) -> &mut Self {
        self.graph
            .add_edge(
                PortRef::new(source.clone(), output),
                PortRef::new(target.clone(), input),
            )
            .unwrap();
        self
    }

    pub fn literal(&mut self, node: &NodeId, input: &str, value: Value) -> &mut Self {
        self.graph.set_literal(node, input, value).unwrap();
        self
    }

    pub fn catalog(&self) -> &NodeCatalog {
        &self.catalog
    }

    pub fn build(self) -> Graph {
        self.graph
    }
}

/// ConnectRobotNode -> RobotStatusReader, the smallest telemetry-producing graph
pub fn status_reader_graph() -> (Graph, NodeId, NodeId) {
    let mut builder = GraphBuilder::new();
    let connect = builder.node("ConnectRobotNode");
    let reader = builder.node("RobotStatusReader");
    builder.connect(&connect, "sdk", &reader, "sdk");
    (builder.build(), connect, reader)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_reader_graph() {
        let (graph, connect, reader) = status_reader_graph();
        assert_eq!(graph.len(), 2);
        assert_eq!(graph.edges().len(), 1);
        assert_eq!(graph.edges()[0].source.node, connect);
        assert_eq!(graph.edges()[0].target.node, reader);
    }
}
