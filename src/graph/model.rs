//! The editable graph.
//!
//! All edits go through `Graph`. Each operation validates first and only
//! then mutates, so a failed call leaves nodes and edges exactly as they were.

use crate::graph::catalog::NodeKind;
use crate::graph::compat::check_connection;
use crate::graph::error::{GraphError, GraphResult};
use crate::graph::id::{EdgeId, NodeId, PortRef};
use crate::graph::node::{Node, NodeUpdate, Position};
use crate::graph::port::{InputMode, PortDirection, PortType};
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

/// Canvas offset applied to duplicated nodes.
pub const DUPLICATE_OFFSET: f64 = 40.0;

/// A binding from one node's output to another node's input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edge {
    pub id: EdgeId,
    pub source: PortRef,
    pub target: PortRef,
}

/// Nodes and edges currently on the canvas.
#[derive(Debug, Clone, Default)]
pub struct Graph {
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    next_id: u64,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Queries ──

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn node(&self, id: &NodeId) -> Option<&Node> {
        self.nodes.iter().find(|n| &n.id == id)
    }

    pub fn edge(&self, id: &EdgeId) -> Option<&Edge> {
        self.edges.iter().find(|e| &e.id == id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// The edge feeding `target`, if any.
    pub fn incoming_edge(&self, target: &PortRef) -> Option<&Edge> {
        self.edges.iter().find(|e| &e.target == target)
    }

    fn node_mut(&mut self, id: &NodeId) -> GraphResult<&mut Node> {
        self.nodes
            .iter_mut()
            .find(|n| &n.id == id)
            .ok_or_else(|| GraphError::UnknownNode(id.clone()))
    }

    fn require_node(&self, id: &NodeId) -> GraphResult<&Node> {
        self.node(id).ok_or_else(|| GraphError::UnknownNode(id.clone()))
    }

    // ── Node editing ──

    /// Place a new node of `kind`. Inputs start in their type's default mode
    /// and manual inputs are seeded with their default literal.
    pub fn add_node(&mut self, kind: Arc<NodeKind>, position: Position) -> NodeId {
        let id = self.mint_id(&kind.name);
        tracing::debug!("Adding node {} ({})", id, kind.name);
        self.nodes.push(Node::new(id.clone(), kind, position));
        id
    }

    /// Remove a node and every edge touching it.
    pub fn remove_node(&mut self, id: &NodeId) -> GraphResult<Node> {
        let index = self
            .nodes
            .iter()
            .position(|n| &n.id == id)
            .ok_or_else(|| GraphError::UnknownNode(id.clone()))?;

        let before = self.edges.len();
        self.edges
            .retain(|e| &e.source.node != id && &e.target.node != id);
        tracing::debug!(
            "Removed node {} and {} attached edge(s)",
            id,
            before - self.edges.len()
        );
        Ok(self.nodes.remove(index))
    }

    /// Clone a node's kind, modes, literals and bypass flag under a new id.
    /// Edges are not cloned.
    pub fn duplicate_node(&mut self, id: &NodeId) -> GraphResult<NodeId> {
        let original = self.require_node(id)?;
        let kind_name = original.kind.name.clone();
        let position = original
            .position
            .offset(DUPLICATE_OFFSET, DUPLICATE_OFFSET);
        let new_id = self.mint_id(&kind_name);
        let copy = self.require_node(id)?.duplicate(new_id.clone(), position);
        self.nodes.push(copy);
        Ok(new_id)
    }

    /// Flip an input between `connection` and `manual`.
    ///
    /// Entering `connection` mode drops the edge currently targeting the
    /// input. The stored literal is left alone in both directions.
    pub fn set_input_mode(&mut self, id: &NodeId, input: &str, mode: InputMode) -> GraphResult<()> {
        self.input_port_type(id, input)?;

        if mode == InputMode::Connection {
            let target = PortRef::new(id.clone(), input);
            self.edges.retain(|e| e.target != target);
        }
        self.node_mut(id)?.modes.insert(input.to_string(), mode);
        Ok(())
    }

    /// Overwrite an input's literal. Allowed in either mode.
    pub fn set_literal(&mut self, id: &NodeId, input: &str, value: Value) -> GraphResult<()> {
        self.input_port_type(id, input)?;
        self.node_mut(id)?.literals.insert(input.to_string(), value);
        Ok(())
    }

    /// Flip the bypass flag, returning the new value.
    pub fn toggle_bypass(&mut self, id: &NodeId) -> GraphResult<bool> {
        let node = self.node_mut(id)?;
        node.bypassed = !node.bypassed;
        Ok(node.bypassed)
    }

    pub fn set_position(&mut self, id: &NodeId, position: Position) -> GraphResult<()> {
        self.node_mut(id)?.position = position;
        Ok(())
    }

    /// Apply an executor-reported update to the named node only.
    pub fn apply_node_update(&mut self, update: &NodeUpdate) -> GraphResult<()> {
        self.node_mut(&update.node_id)?.apply_update(update);
        Ok(())
    }

    /// Put every node back to `idle` and clear its last error.
    pub fn reset_statuses(&mut self) {
        for node in &mut self.nodes {
            node.reset_status();
        }
    }

    // ── Edge editing ──

    /// Connect `source` (an output) to `target` (an input).
    ///
    /// Rejected without mutation when a port is unknown or the types are
    /// incompatible. An edge already feeding `target` is replaced.
    pub fn add_edge(&mut self, source: PortRef, target: PortRef) -> GraphResult<EdgeId> {
        self.check_edge(&source, &target)?;

        if let Some(old) = self.incoming_edge(&target) {
            tracing::debug!("Replacing edge {} into {}", old.id, target);
        }
        self.edges.retain(|e| e.target != target);

        let id = EdgeId::between(&source, &target);
        self.edges.push(Edge {
            id: id.clone(),
            source,
            target,
        });
        Ok(id)
    }

    pub fn remove_edge(&mut self, id: &EdgeId) -> GraphResult<Edge> {
        let index = self
            .edges
            .iter()
            .position(|e| &e.id == id)
            .ok_or_else(|| GraphError::UnknownEdge(id.clone()))?;
        Ok(self.edges.remove(index))
    }

    /// Validate a prospective edge without touching the graph.
    pub fn check_edge(&self, source: &PortRef, target: &PortRef) -> GraphResult<()> {
        let output = self.output_port_type(&source.node, &source.port)?;
        let input = self.input_port_type(&target.node, &target.port)?;
        check_connection(output, input)
    }

    /// Re-check every edge against the current node kinds.
    pub fn revalidate(&self) -> Vec<(EdgeId, GraphError)> {
        self.edges
            .iter()
            .filter_map(|e| {
                self.check_edge(&e.source, &e.target)
                    .err()
                    .map(|err| (e.id.clone(), err))
            })
            .collect()
    }

    fn output_port_type(&self, id: &NodeId, port: &str) -> GraphResult<&PortType> {
        self.port_type(id, port, PortDirection::Output)
    }

    fn input_port_type(&self, id: &NodeId, port: &str) -> GraphResult<&PortType> {
        self.port_type(id, port, PortDirection::Input)
    }

    fn port_type(
        &self,
        id: &NodeId,
        port: &str,
        direction: PortDirection,
    ) -> GraphResult<&PortType> {
        let node = self.require_node(id)?;
        let descriptor = match direction {
            PortDirection::Input => node.kind.input_port(port),
            PortDirection::Output => node.kind.output_port(port),
        };
        descriptor
            .map(|d| &d.port_type)
            .ok_or_else(|| GraphError::UnknownPort {
                node: id.clone(),
                port: port.to_string(),
                direction,
            })
    }

    // ── Scheduling ──

    /// Topological order of the non-bypassed nodes (Kahn's algorithm).
    pub fn execution_order(&self) -> GraphResult<Vec<NodeId>> {
        let active: Vec<&Node> = self.nodes.iter().filter(|n| !n.bypassed).collect();
        let index: HashMap<&NodeId, usize> =
            active.iter().enumerate().map(|(i, n)| (&n.id, i)).collect();

        let n = active.len();
        let mut in_degree = vec![0u32; n];
        let mut adj: Vec<Vec<usize>> = vec![Vec::new(); n];
        for edge in &self.edges {
            if let (Some(&from), Some(&to)) =
                (index.get(&edge.source.node), index.get(&edge.target.node))
            {
                adj[from].push(to);
                in_degree[to] += 1;
            }
        }

        let mut queue: VecDeque<usize> = (0..n).filter(|&i| in_degree[i] == 0).collect();
        let mut order = Vec::with_capacity(n);
        while let Some(node) = queue.pop_front() {
            order.push(active[node].id.clone());
            for &next in &adj[node] {
                in_degree[next] -= 1;
                if in_degree[next] == 0 {
                    queue.push_back(next);
                }
            }
        }

        if order.len() != n {
            tracing::warn!(
                "Graph has a cycle! Only {} of {} nodes ordered.",
                order.len(),
                n
            );
            return Err(GraphError::CycleDetected {
                scheduled: order.len(),
                total: n,
            });
        }
        Ok(order)
    }

    // ── Loading support ──

    /// Insert a fully built node. Used by snapshot loading.
    pub(crate) fn insert_node(&mut self, node: Node) -> GraphResult<()> {
        if self.node(&node.id).is_some() {
            return Err(GraphError::InvalidSnapshot(format!(
                "duplicate node id '{}'",
                node.id
            )));
        }
        self.nodes.push(node);
        Ok(())
    }

    /// Insert an edge that passed `check_edge`, refusing a second producer.
    pub(crate) fn insert_edge(&mut self, source: PortRef, target: PortRef) -> GraphResult<EdgeId> {
        self.check_edge(&source, &target)?;
        if let Some(existing) = self.incoming_edge(&target) {
            return Err(GraphError::InvalidSnapshot(format!(
                "input {} already fed by {}",
                target, existing.source
            )));
        }
        let id = EdgeId::between(&source, &target);
        self.edges.push(Edge {
            id: id.clone(),
            source,
            target,
        });
        Ok(id)
    }

    fn mint_id(&mut self, kind_name: &str) -> NodeId {
        loop {
            self.next_id += 1;
            let candidate = NodeId(format!("{}-{}", kind_name, self.next_id));
            if self.node(&candidate).is_none() {
                return candidate;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::catalog::NodeCatalog;
    use crate::graph::node::NodeStatus;
    use serde_json::json;

    fn graph_with(kinds: &[&str]) -> (Graph, Vec<NodeId>) {
        let catalog = NodeCatalog::builtin();
        let mut graph = Graph::new();
        let ids = kinds
            .iter()
            .enumerate()
            .map(|(i, k)| {
                graph.add_node(
                    catalog.get(k).unwrap(),
                    Position::new(i as f64 * 200.0, 0.0),
                )
            })
            .collect();
        (graph, ids)
    }

    #[test]
    fn test_add_node_mints_unique_ids() {
        let (graph, ids) = graph_with(&["InputNode", "InputNode"]);
        assert_eq!(graph.len(), 2);
        assert_ne!(ids[0], ids[1]);
    }

    #[test]
    fn test_compatible_edge_accepted() {
        let (mut graph, ids) = graph_with(&["ConnectRobotNode", "So101WritePositionNode"]);
        let edge = graph
            .add_edge(PortRef::new(ids[0].clone(), "sdk"), PortRef::new(ids[1].clone(), "sdk"))
            .unwrap();
        assert_eq!(graph.edges().len(), 1);
        assert_eq!(graph.edge(&edge).unwrap().target.port, "sdk");
    }

    #[test]
    fn test_incompatible_edge_rejected_without_mutation() {
        let (mut graph, ids) = graph_with(&["ConnectRobotNode", "OutputNode"]);
        let err = graph
            .add_edge(PortRef::new(ids[0].clone(), "sdk"), PortRef::new(ids[1].clone(), "input"))
            .unwrap_err();
        assert_eq!(
            err,
            GraphError::IncompatibleTypes {
                output: PortType::Device,
                input: PortType::Text
            }
        );
        assert!(graph.edges().is_empty());
    }

    #[test]
    fn test_unknown_port_rejected() {
        let (mut graph, ids) = graph_with(&["InputNode", "OutputNode"]);
        let err = graph
            .add_edge(PortRef::new(ids[0].clone(), "nope"), PortRef::new(ids[1].clone(), "input"))
            .unwrap_err();
        assert!(matches!(
            err,
            GraphError::UnknownPort { direction: PortDirection::Output, .. }
        ));
    }

    #[test]
    fn test_second_edge_into_input_replaces_first() {
        let (mut graph, ids) = graph_with(&["InputNode", "InputNode", "OutputNode"]);
        let target = PortRef::new(ids[2].clone(), "input");
        graph
            .add_edge(PortRef::new(ids[0].clone(), "output"), target.clone())
            .unwrap();
        graph
            .add_edge(PortRef::new(ids[1].clone(), "output"), target.clone())
            .unwrap();

        assert_eq!(graph.edges().len(), 1);
        assert_eq!(graph.incoming_edge(&target).unwrap().source.node, ids[1]);
    }

    #[test]
    fn test_remove_node_cascades_edges() {
        let (mut graph, ids) = graph_with(&["InputNode", "DelayNode", "OutputNode"]);
        graph
            .add_edge(PortRef::new(ids[0].clone(), "output"), PortRef::new(ids[1].clone(), "input"))
            .unwrap();
        graph
            .add_edge(PortRef::new(ids[1].clone(), "output"), PortRef::new(ids[2].clone(), "input"))
            .unwrap();

        graph.remove_node(&ids[1]).unwrap();
        assert_eq!(graph.len(), 2);
        assert!(graph.edges().is_empty());
        assert!(graph.remove_node(&ids[1]).is_err());
    }

    #[test]
    fn test_duplicate_node_copies_state_but_not_edges() {
        let (mut graph, ids) = graph_with(&["InputNode", "OutputNode"]);
        graph.set_literal(&ids[0], "value", json!("hello")).unwrap();
        graph.toggle_bypass(&ids[0]).unwrap();
        graph
            .add_edge(PortRef::new(ids[0].clone(), "output"), PortRef::new(ids[1].clone(), "input"))
            .unwrap();
        graph
            .apply_node_update(&NodeUpdate::status(ids[0].clone(), NodeStatus::Completed))
            .unwrap();

        let copy_id = graph.duplicate_node(&ids[0]).unwrap();
        let copy = graph.node(&copy_id).unwrap();
        let original = graph.node(&ids[0]).unwrap();
        assert_ne!(copy_id, ids[0]);
        assert_eq!(copy.literal("value"), Some(&json!("hello")));
        assert!(copy.bypassed);
        assert_eq!(copy.status, NodeStatus::Idle);
        assert_eq!(copy.position.x, original.position.x + DUPLICATE_OFFSET);
        assert_eq!(graph.edges().len(), 1);
    }

    #[test]
    fn test_entering_connection_mode_drops_incoming_edge() {
        let (mut graph, ids) = graph_with(&["InputNode", "OutputNode"]);
        let target = PortRef::new(ids[1].clone(), "input");
        graph
            .add_edge(PortRef::new(ids[0].clone(), "output"), target.clone())
            .unwrap();

        graph
            .set_input_mode(&ids[1], "input", InputMode::Manual)
            .unwrap();
        assert!(graph.incoming_edge(&target).is_some());

        graph
            .set_input_mode(&ids[1], "input", InputMode::Connection)
            .unwrap();
        assert!(graph.incoming_edge(&target).is_none());
    }

    #[test]
    fn test_literal_survives_mode_switch() {
        let (mut graph, ids) = graph_with(&["InputNode"]);
        graph.set_literal(&ids[0], "value", json!("stale")).unwrap();
        graph
            .set_input_mode(&ids[0], "value", InputMode::Connection)
            .unwrap();
        let node = graph.node(&ids[0]).unwrap();
        assert_eq!(node.literal("value"), Some(&json!("stale")));
        assert!(!node.parameters().contains_key("value"));
    }

    #[test]
    fn test_set_literal_on_unknown_input_fails() {
        let (mut graph, ids) = graph_with(&["InputNode"]);
        assert!(graph.set_literal(&ids[0], "missing", json!(1)).is_err());
    }

    #[test]
    fn test_toggle_bypass_keeps_edges() {
        let (mut graph, ids) = graph_with(&["InputNode", "OutputNode"]);
        graph
            .add_edge(PortRef::new(ids[0].clone(), "output"), PortRef::new(ids[1].clone(), "input"))
            .unwrap();
        assert!(graph.toggle_bypass(&ids[0]).unwrap());
        assert!(!graph.toggle_bypass(&ids[0]).unwrap());
        assert_eq!(graph.edges().len(), 1);
    }

    #[test]
    fn test_node_update_touches_only_named_node() {
        let (mut graph, ids) = graph_with(&["InputNode", "OutputNode"]);
        graph
            .apply_node_update(&NodeUpdate::status(ids[1].clone(), NodeStatus::Executing))
            .unwrap();
        assert_eq!(graph.node(&ids[0]).unwrap().status, NodeStatus::Idle);
        assert_eq!(graph.node(&ids[1]).unwrap().status, NodeStatus::Executing);
        assert!(graph
            .apply_node_update(&NodeUpdate::status("ghost", NodeStatus::Error))
            .is_err());
    }

    #[test]
    fn test_execution_order_skips_bypassed_nodes() {
        let (mut graph, ids) = graph_with(&["InputNode", "DelayNode", "OutputNode"]);
        graph
            .add_edge(PortRef::new(ids[1].clone(), "output"), PortRef::new(ids[2].clone(), "input"))
            .unwrap();
        graph
            .add_edge(PortRef::new(ids[0].clone(), "output"), PortRef::new(ids[1].clone(), "input"))
            .unwrap();
        assert_eq!(graph.execution_order().unwrap(), ids);

        graph.toggle_bypass(&ids[1]).unwrap();
        assert_eq!(graph.execution_order().unwrap(), vec![ids[0].clone(), ids[2].clone()]);
    }

    #[test]
    fn test_execution_order_reports_cycle() {
        let (mut graph, ids) = graph_with(&["DelayNode", "DelayNode"]);
        graph
            .add_edge(PortRef::new(ids[0].clone(), "output"), PortRef::new(ids[1].clone(), "input"))
            .unwrap();
        graph
            .add_edge(PortRef::new(ids[1].clone(), "output"), PortRef::new(ids[0].clone(), "input"))
            .unwrap();
        assert_eq!(
            graph.execution_order().unwrap_err(),
            GraphError::CycleDetected { scheduled: 0, total: 2 }
        );
    }
}
