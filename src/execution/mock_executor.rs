//! In-memory executor for tests and offline runs.
//!
//! Statuses are scripted: each `continuous_status` call pops the next
//! scripted result, repeating the last one once the script runs out.
//! Every submitted request is recorded.

use crate::execution::client::ExecutorClient;
use crate::execution::error::{ExecutionError, ExecutionResult};
use crate::execution::protocol::{AckResponse, ContinuousStatus, RunResponse};
use crate::execution::request::ExecutionRequest;
use crate::graph::NodeCatalog;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug)]
struct MockState {
    run_result: ExecutionResult<RunResponse>,
    start_result: ExecutionResult<AckResponse>,
    stop_result: ExecutionResult<AckResponse>,
    statuses: VecDeque<ExecutionResult<ContinuousStatus>>,
    last_status: ExecutionResult<ContinuousStatus>,
    submitted: Vec<ExecutionRequest>,
    status_calls: usize,
    stop_calls: usize,
}

/// Scriptable stand-in for the remote executor. Clones share state.
#[derive(Debug, Clone)]
pub struct MockExecutor {
    state: Arc<Mutex<MockState>>,
}

impl Default for MockExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl MockExecutor {
    /// An executor that accepts everything and reports a running loop.
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState {
                run_result: Ok(RunResponse {
                    success: true,
                    ..Default::default()
                }),
                start_result: Ok(AckResponse {
                    success: true,
                    message: "Continuous execution started".into(),
                }),
                stop_result: Ok(AckResponse {
                    success: true,
                    message: "Continuous execution stopped".into(),
                }),
                statuses: VecDeque::new(),
                last_status: Ok(ContinuousStatus::running(0)),
                submitted: Vec::new(),
                status_calls: 0,
                stop_calls: 0,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        // A panic while holding the lock only happens in a failing test.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn with_run_result(self, result: ExecutionResult<RunResponse>) -> Self {
        self.lock().run_result = result;
        self
    }

    pub fn with_start_result(self, result: ExecutionResult<AckResponse>) -> Self {
        self.lock().start_result = result;
        self
    }

    pub fn with_stop_result(self, result: ExecutionResult<AckResponse>) -> Self {
        self.lock().stop_result = result;
        self
    }

    /// Queue status results returned by successive polls.
    pub fn with_statuses<I>(self, statuses: I) -> Self
    where
        I: IntoIterator<Item = ExecutionResult<ContinuousStatus>>,
    {
        self.lock().statuses.extend(statuses);
        self
    }

    pub fn push_status(&self, status: ExecutionResult<ContinuousStatus>) {
        self.lock().statuses.push_back(status);
    }

    pub fn submitted(&self) -> Vec<ExecutionRequest> {
        self.lock().submitted.clone()
    }

    pub fn status_calls(&self) -> usize {
        self.lock().status_calls
    }

    pub fn stop_calls(&self) -> usize {
        self.lock().stop_calls
    }
}

#[async_trait]
impl ExecutorClient for MockExecutor {
    async fn run_once(&self, request: &ExecutionRequest) -> ExecutionResult<RunResponse> {
        let mut state = self.lock();
        state.submitted.push(request.clone());
        state.run_result.clone()
    }

    async fn start_continuous(&self, request: &ExecutionRequest) -> ExecutionResult<AckResponse> {
        let mut state = self.lock();
        state.submitted.push(request.clone());
        state.start_result.clone()
    }

    async fn stop_continuous(&self) -> ExecutionResult<AckResponse> {
        let mut state = self.lock();
        state.stop_calls += 1;
        let result = state.stop_result.clone();
        if matches!(result, Ok(AckResponse { success: true, .. })) {
            state.statuses.clear();
            state.last_status = Ok(ContinuousStatus::stopped());
        }
        result
    }

    async fn continuous_status(&self) -> ExecutionResult<ContinuousStatus> {
        let mut state = self.lock();
        state.status_calls += 1;
        if let Some(next) = state.statuses.pop_front() {
            state.last_status = next;
        }
        state.last_status.clone()
    }

    async fn list_node_kinds(&self) -> ExecutionResult<Value> {
        let nodes: Vec<Value> = NodeCatalog::builtin()
            .iter()
            .map(|kind| {
                let mut required = serde_json::Map::new();
                let mut optional = serde_json::Map::new();
                for port in &kind.inputs {
                    let mut meta = serde_json::Map::new();
                    if let Some(default) = &port.default {
                        meta.insert("default".into(), default.clone());
                    }
                    if let Some(min) = port.min {
                        meta.insert("min".into(), json!(min));
                    }
                    if let Some(max) = port.max {
                        meta.insert("max".into(), json!(max));
                    }
                    let section = if port.required { &mut required } else { &mut optional };
                    section.insert(port.name.clone(), json!([port.port_type.wire_name(), meta]));
                }
                let outputs: serde_json::Map<String, Value> = kind
                    .outputs
                    .iter()
                    .map(|p| (p.name.clone(), json!([p.port_type.wire_name(), {}])))
                    .collect();
                json!({
                    "name": kind.name,
                    "display_name": kind.display_name,
                    "description": kind.description,
                    "category": kind.category,
                    "input_types": {"required": required, "optional": optional},
                    "return_types": {"required": outputs},
                })
            })
            .collect();
        if nodes.is_empty() {
            return Err(ExecutionError::remote("no node kinds registered"));
        }
        Ok(json!({"count": nodes.len(), "nodes": nodes}))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_statuses_repeat_last_entry() {
        let mock = MockExecutor::new().with_statuses([
            Ok(ContinuousStatus::running(1)),
            Ok(ContinuousStatus::stopped()),
        ]);
        assert!(mock.continuous_status().await.unwrap().is_running);
        assert!(!mock.continuous_status().await.unwrap().is_running);
        assert!(!mock.continuous_status().await.unwrap().is_running);
        assert_eq!(mock.status_calls(), 3);
    }

    #[tokio::test]
    async fn test_listing_round_trips_through_catalog() {
        let listing = MockExecutor::new().list_node_kinds().await.unwrap();
        let catalog = NodeCatalog::from_listing(&listing).unwrap();
        assert_eq!(catalog.len(), NodeCatalog::builtin().len());
        let reader = catalog.get("RobotStatusReader").unwrap();
        assert!(reader.output_port("positions").is_some());
        assert!(reader.input_port("sdk").unwrap().required);
        assert!(!reader.input_port("read_modes").unwrap().required);

        let interval = reader.input_port("update_interval").unwrap();
        assert!(!interval.required);
        assert_eq!(interval.max, Some(5.0));

        let connect = catalog.get("ConnectRobotNode").unwrap();
        assert!(connect.input_port("port").unwrap().required);
        assert!(!connect.input_port("baudrate").unwrap().required);
    }
}
