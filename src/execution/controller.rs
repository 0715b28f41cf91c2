//! UI-side execution controller.
//!
//! Owns the [`ExecutionBridge`], applies the guards that need the graph,
//! mirrors the worker's phase and folds executor feedback back into the graph.

use crate::config::AppConfig;
use crate::execution::bridge::{ExecutionBridge, ExecutionCommand};
use crate::execution::error::{ExecutionError, ExecutionResult};
use crate::execution::lifecycle::{ExecutionMessage, Phase, RunOutcome};
use crate::execution::protocol::ContinuousStatus;
use crate::execution::request::{ExecutionRequest, RequestBuilder};
use crate::execution::stream::{ClientMessage, StreamEvent, WorkflowEvent};
use crate::graph::{Graph, GraphError, GraphResult, InputMode, NodeId, NodeUpdate};
use serde_json::Value;
use uuid::Uuid;

pub struct ExecutionController {
    bridge: ExecutionBridge,
    builder: RequestBuilder,
    sleep_time: f64,

    /// Last phase reported by the worker, or the one we just asked for.
    phase: Phase,
    last_outcome: Option<RunOutcome>,
    continuous_status: Option<ContinuousStatus>,
    last_error: Option<String>,
    poll_failures: u32,
}

impl ExecutionController {
    pub fn new(bridge: ExecutionBridge, config: &AppConfig) -> Self {
        Self {
            bridge,
            builder: RequestBuilder::new(),
            sleep_time: config.continuous.sleep_time_secs,
            phase: Phase::Idle,
            last_outcome: None,
            continuous_status: None,
            last_error: None,
            poll_failures: 0,
        }
    }

    // ==================== Accessors ====================

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_busy(&self) -> bool {
        self.phase != Phase::Idle
    }

    pub fn last_outcome(&self) -> Option<&RunOutcome> {
        self.last_outcome.as_ref()
    }

    pub fn continuous_status(&self) -> Option<&ContinuousStatus> {
        self.continuous_status.as_ref()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn poll_failures(&self) -> u32 {
        self.poll_failures
    }

    // ==================== Operations ====================

    /// Submit the graph for a single execution and return the request id.
    ///
    /// Node statuses are left alone; the executor's `workflow_started`
    /// event clears them.
    pub fn run_once(&mut self, graph: &Graph) -> ExecutionResult<Uuid> {
        let request = self.builder.build(graph);
        self.admit(&request)?;
        let id = request.metadata.id;
        let node_count = request.nodes.len();

        self.send(ExecutionCommand::RunOnce(request))?;
        self.last_error = None;
        self.phase = Phase::ExecutingOnce;
        tracing::info!("Submitted run {} ({} nodes)", id, node_count);
        Ok(id)
    }

    /// Start a continuous run of the graph.
    pub fn start_continuous(&mut self, graph: &Graph) -> ExecutionResult<Uuid> {
        let request = self
            .builder
            .clone()
            .sleep_time(self.sleep_time)
            .build(graph);
        self.admit(&request)?;
        let id = request.metadata.id;

        self.send(ExecutionCommand::StartContinuous(request))?;
        self.last_error = None;
        self.continuous_status = None;
        self.phase = Phase::StartingContinuous;
        tracing::info!("Requested continuous run {}", id);
        Ok(id)
    }

    pub fn stop_continuous(&mut self) -> ExecutionResult<()> {
        match self.phase {
            Phase::Idle | Phase::ContinuousRunning => {}
            _ => return Err(ExecutionError::Busy),
        }
        self.send(ExecutionCommand::StopContinuous)?;
        self.phase = Phase::StoppingContinuous;
        Ok(())
    }

    pub fn shutdown(&self) {
        self.bridge.shutdown();
    }

    /// Bypassed nodes are dropped from the request, so emptiness is judged
    /// on what would actually be sent.
    fn admit(&self, request: &ExecutionRequest) -> ExecutionResult<()> {
        if request.nodes.is_empty() {
            Err(ExecutionError::EmptyGraph)
        } else if self.phase.is_continuous() {
            Err(ExecutionError::ContinuousActive)
        } else if self.phase == Phase::ExecutingOnce {
            Err(ExecutionError::Busy)
        } else {
            Ok(())
        }
    }

    fn send(&self, cmd: ExecutionCommand) -> ExecutionResult<()> {
        if self.bridge.send_command(cmd) {
            Ok(())
        } else {
            Err(ExecutionError::ChannelClosed)
        }
    }

    // ==================== Feedback ====================

    /// Drain worker messages, update the mirrored state and return them.
    pub fn process_messages(&mut self, graph: &mut Graph) -> Vec<ExecutionMessage> {
        let messages = self.bridge.drain();
        for message in &messages {
            self.apply_message(graph, message);
        }
        messages
    }

    fn apply_message(&mut self, graph: &mut Graph, message: &ExecutionMessage) {
        match message {
            ExecutionMessage::PhaseChanged(phase) => self.phase = *phase,
            ExecutionMessage::Rejected { operation, error } => {
                tracing::warn!("{:?} rejected: {}", operation, error);
                self.last_error = Some(error.to_string());
            }
            ExecutionMessage::RunCompleted(outcome) => {
                if !outcome.success {
                    self.last_error = outcome.error.clone();
                }
                if let Some(results) = outcome.results.as_ref().and_then(Value::as_object) {
                    for (node_id, result) in results {
                        let update = NodeUpdate {
                            node_id: NodeId::from(node_id.as_str()),
                            telemetry: Some(result.clone()),
                            ..Default::default()
                        };
                        if graph.apply_node_update(&update).is_err() {
                            tracing::debug!("Run result for unknown node {}", node_id);
                        }
                    }
                }
                self.last_outcome = Some(outcome.clone());
            }
            ExecutionMessage::StatusUpdated(status) => {
                self.poll_failures = 0;
                self.continuous_status = Some(status.clone());
            }
            ExecutionMessage::StatusCleared => {
                self.continuous_status = None;
                self.poll_failures = 0;
            }
            ExecutionMessage::PollFailed {
                consecutive_failures,
                ..
            } => self.poll_failures = *consecutive_failures,
        }
    }

    /// Fold one decoded stream event into the graph.
    ///
    /// Node updates touch only the addressed node; updates for nodes that are
    /// no longer on the graph are dropped.
    pub fn apply_stream_event(&mut self, graph: &mut Graph, event: &StreamEvent) {
        match event {
            StreamEvent::NodeState(update) => {
                if let Err(GraphError::UnknownNode(id)) = graph.apply_node_update(update) {
                    tracing::debug!("Dropping update for unknown node {}", id);
                }
            }
            StreamEvent::Workflow(WorkflowEvent::Started) => graph.reset_statuses(),
            StreamEvent::Workflow(WorkflowEvent::Failed { error }) => {
                tracing::warn!("Workflow failed: {}", error);
                self.last_error = Some(error.clone());
            }
            StreamEvent::Workflow(WorkflowEvent::Completed { execution_time }) => {
                tracing::debug!("Workflow completed in {:?}s", execution_time);
            }
            StreamEvent::ParameterUpdated {
                node_id,
                parameter_name,
                success: false,
            } => {
                tracing::warn!("Executor refused update of {}.{}", node_id, parameter_name);
            }
            StreamEvent::ContinuousUpdate {
                execution_count,
                status,
            } => {
                if self.phase.is_continuous() {
                    tracing::trace!("Continuous iteration {} ({})", execution_count, status);
                    self.continuous_status
                        .get_or_insert_with(|| ContinuousStatus::running(0))
                        .count_of_iterations = *execution_count;
                }
            }
            StreamEvent::StatusResponse(status) => {
                self.continuous_status = Some(status.clone());
            }
            StreamEvent::Error(message) => {
                tracing::warn!("Executor stream error: {}", message);
                self.last_error = Some(message.clone());
            }
            StreamEvent::Workflow(_)
            | StreamEvent::ParameterUpdated { .. }
            | StreamEvent::Pong
            | StreamEvent::Unknown(_) => {}
        }
    }

    /// Write a literal and, while a continuous run is live, produce the
    /// `input_update` message that carries it to the executor.
    pub fn set_literal(
        &mut self,
        graph: &mut Graph,
        node: &NodeId,
        input: &str,
        value: Value,
    ) -> GraphResult<Option<ClientMessage>> {
        graph.set_literal(node, input, value.clone())?;

        let manual = graph
            .node(node)
            .and_then(|n| n.mode(input))
            .is_some_and(|mode| mode == InputMode::Manual);
        if self.phase != Phase::ContinuousRunning || !manual {
            return Ok(None);
        }
        Ok(Some(ClientMessage::InputUpdate {
            node_id: node.clone(),
            input_name: input.to_string(),
            input_value: value,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution::lifecycle::Operation;
    use crate::graph::{NodeCatalog, NodeStatus, Position};
    use crossbeam_channel::Sender;
    use serde_json::json;
    use tokio::sync::mpsc::UnboundedReceiver;

    fn controller() -> (
        ExecutionController,
        UnboundedReceiver<ExecutionCommand>,
        Sender<ExecutionMessage>,
    ) {
        let (bridge, cmd_rx, msg_tx) = ExecutionBridge::new();
        (
            ExecutionController::new(bridge, &AppConfig::default()),
            cmd_rx,
            msg_tx,
        )
    }

    fn graph_with_input() -> (Graph, NodeId) {
        let mut graph = Graph::new();
        let id = graph.add_node(
            NodeCatalog::builtin().get("InputNode").unwrap(),
            Position::default(),
        );
        (graph, id)
    }

    #[test]
    fn test_run_once_empty_graph_sends_nothing() {
        let (mut ctrl, mut cmd_rx, _) = controller();
        let err = ctrl.run_once(&mut Graph::new()).unwrap_err();
        assert_eq!(err, ExecutionError::EmptyGraph);
        assert_eq!(ctrl.phase(), Phase::Idle);
        assert!(cmd_rx.try_recv().is_err());
    }

    #[test]
    fn test_run_once_fully_bypassed_graph_sends_nothing() {
        let (mut ctrl, mut cmd_rx, _) = controller();
        let (mut graph, id) = graph_with_input();
        graph.toggle_bypass(&id).unwrap();

        assert_eq!(ctrl.run_once(&graph).unwrap_err(), ExecutionError::EmptyGraph);
        assert_eq!(
            ctrl.start_continuous(&graph).unwrap_err(),
            ExecutionError::EmptyGraph
        );
        assert_eq!(ctrl.phase(), Phase::Idle);
        assert!(cmd_rx.try_recv().is_err());

        graph.toggle_bypass(&id).unwrap();
        ctrl.run_once(&graph).unwrap();
        assert_eq!(ctrl.phase(), Phase::ExecutingOnce);
    }

    #[test]
    fn test_run_once_submits_without_touching_statuses() {
        let (mut ctrl, mut cmd_rx, _) = controller();
        let (mut graph, id) = graph_with_input();
        graph
            .apply_node_update(&NodeUpdate::failed(id.clone(), "boom"))
            .unwrap();

        let request_id = ctrl.run_once(&graph).unwrap();
        assert_eq!(graph.node(&id).unwrap().status, NodeStatus::Error);
        assert_eq!(ctrl.phase(), Phase::ExecutingOnce);
        match cmd_rx.try_recv().unwrap() {
            ExecutionCommand::RunOnce(request) => assert_eq!(request.metadata.id, request_id),
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_start_carries_sleep_time() {
        let (mut ctrl, mut cmd_rx, _) = controller();
        let (mut graph, _) = graph_with_input();
        ctrl.start_continuous(&mut graph).unwrap();
        match cmd_rx.try_recv().unwrap() {
            ExecutionCommand::StartContinuous(request) => {
                assert_eq!(request.sleep_time, Some(1.0))
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_second_start_rejected_locally() {
        let (mut ctrl, mut cmd_rx, _) = controller();
        let (mut graph, _) = graph_with_input();
        ctrl.start_continuous(&mut graph).unwrap();
        let _ = cmd_rx.try_recv();

        assert_eq!(
            ctrl.start_continuous(&mut graph).unwrap_err(),
            ExecutionError::ContinuousActive
        );
        assert_eq!(
            ctrl.run_once(&mut graph).unwrap_err(),
            ExecutionError::ContinuousActive
        );
        assert!(cmd_rx.try_recv().is_err());
    }

    #[test]
    fn test_stop_while_starting_is_busy() {
        let (mut ctrl, _cmd_rx, _) = controller();
        let (mut graph, _) = graph_with_input();
        ctrl.start_continuous(&mut graph).unwrap();
        assert_eq!(ctrl.stop_continuous().unwrap_err(), ExecutionError::Busy);
    }

    #[test]
    fn test_messages_update_mirror() {
        let (mut ctrl, _cmd_rx, msg_tx) = controller();
        let (mut graph, _) = graph_with_input();

        msg_tx
            .send(ExecutionMessage::PhaseChanged(Phase::ContinuousRunning))
            .unwrap();
        msg_tx
            .send(ExecutionMessage::StatusUpdated(ContinuousStatus::running(4)))
            .unwrap();
        msg_tx
            .send(ExecutionMessage::PollFailed {
                error: ExecutionError::Transport("refused".into()),
                consecutive_failures: 2,
            })
            .unwrap();
        ctrl.process_messages(&mut graph);

        assert_eq!(ctrl.phase(), Phase::ContinuousRunning);
        assert_eq!(ctrl.continuous_status().unwrap().count_of_iterations, 4);
        assert_eq!(ctrl.poll_failures(), 2);

        msg_tx.send(ExecutionMessage::StatusCleared).unwrap();
        msg_tx.send(ExecutionMessage::PhaseChanged(Phase::Idle)).unwrap();
        ctrl.process_messages(&mut graph);
        assert!(ctrl.continuous_status().is_none());
        assert!(!ctrl.is_busy());
    }

    #[test]
    fn test_refusal_restores_worker_phase() {
        let (mut ctrl, _cmd_rx, msg_tx) = controller();
        let (mut graph, _) = graph_with_input();
        ctrl.run_once(&graph).unwrap();
        assert!(ctrl.is_busy());

        msg_tx
            .send(ExecutionMessage::Rejected {
                operation: Operation::RunOnce,
                error: ExecutionError::EmptyGraph,
            })
            .unwrap();
        msg_tx.send(ExecutionMessage::PhaseChanged(Phase::Idle)).unwrap();
        ctrl.process_messages(&mut graph);

        assert!(!ctrl.is_busy());
        assert!(ctrl.run_once(&graph).is_ok());
    }

    #[test]
    fn test_stream_status_feeds_continuous_cache() {
        let (mut ctrl, _cmd_rx, msg_tx) = controller();
        let (mut graph, _) = graph_with_input();
        let tick = StreamEvent::ContinuousUpdate {
            execution_count: 3,
            status: "running".into(),
        };

        ctrl.apply_stream_event(&mut graph, &tick);
        assert!(ctrl.continuous_status().is_none());

        msg_tx
            .send(ExecutionMessage::PhaseChanged(Phase::ContinuousRunning))
            .unwrap();
        ctrl.process_messages(&mut graph);
        ctrl.apply_stream_event(&mut graph, &tick);
        assert_eq!(ctrl.continuous_status().unwrap().count_of_iterations, 3);

        let polled = ContinuousStatus {
            loop_interval: Some(0.5),
            ..ContinuousStatus::running(7)
        };
        ctrl.apply_stream_event(&mut graph, &StreamEvent::StatusResponse(polled.clone()));
        assert_eq!(ctrl.continuous_status(), Some(&polled));
    }

    #[test]
    fn test_rejection_surfaces_error() {
        let (mut ctrl, _cmd_rx, msg_tx) = controller();
        let (mut graph, _) = graph_with_input();
        msg_tx
            .send(ExecutionMessage::Rejected {
                operation: Operation::StartContinuous,
                error: ExecutionError::remote("already running"),
            })
            .unwrap();
        ctrl.process_messages(&mut graph);
        assert!(ctrl.last_error().unwrap().contains("already running"));
    }

    #[test]
    fn test_node_state_touches_only_addressed_node() {
        let (mut ctrl, _cmd_rx, _) = controller();
        let (mut graph, first) = graph_with_input();
        let second = graph.add_node(
            NodeCatalog::builtin().get("OutputNode").unwrap(),
            Position::new(200.0, 0.0),
        );

        ctrl.apply_stream_event(
            &mut graph,
            &StreamEvent::NodeState(NodeUpdate::status(first.clone(), NodeStatus::Executing)),
        );
        ctrl.apply_stream_event(
            &mut graph,
            &StreamEvent::NodeState(NodeUpdate::status("ghost", NodeStatus::Completed)),
        );

        assert_eq!(graph.node(&first).unwrap().status, NodeStatus::Executing);
        assert_eq!(graph.node(&second).unwrap().status, NodeStatus::Idle);
    }

    #[test]
    fn test_set_literal_emits_update_only_while_running() {
        let (mut ctrl, _cmd_rx, msg_tx) = controller();
        let (mut graph, id) = graph_with_input();
        let input = graph.node(&id).unwrap().kind.inputs[0].name.clone();

        assert_eq!(
            ctrl.set_literal(&mut graph, &id, &input, json!("hello")).unwrap(),
            None
        );

        msg_tx
            .send(ExecutionMessage::PhaseChanged(Phase::ContinuousRunning))
            .unwrap();
        ctrl.process_messages(&mut graph);

        let update = ctrl
            .set_literal(&mut graph, &id, &input, json!("world"))
            .unwrap();
        assert_eq!(
            update,
            Some(ClientMessage::InputUpdate {
                node_id: id.clone(),
                input_name: input.clone(),
                input_value: json!("world"),
            })
        );
        assert_eq!(graph.node(&id).unwrap().literal(&input), Some(&json!("world")));
    }
}
