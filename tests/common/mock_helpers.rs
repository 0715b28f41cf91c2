//! Mock construction helpers

use super::test_tick;
use botflow::config::AppConfig;
use botflow::execution::{
    AckResponse, ExecutionController, ExecutionMessage, ExecutionWorker, MockExecutor, Phase,
};
use botflow::graph::Graph;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Spawn a worker around `mock` and wrap it in a controller.
///
/// The mock is cloned, so the caller keeps a handle for inspection.
pub fn spawn_controller(mock: &MockExecutor) -> (ExecutionController, JoinHandle<()>) {
    let config = AppConfig::default();
    let (bridge, handle) = ExecutionWorker::spawn(mock.clone(), &config.polling);
    (ExecutionController::new(bridge, &config), handle)
}

pub fn refused(message: &str) -> AckResponse {
    AckResponse {
        success: false,
        message: message.to_string(),
    }
}

/// Drain messages until `done` holds, advancing (paused) time between drains.
///
/// Returns every message seen. Panics after `limit` of virtual time.
pub async fn pump_until(
    controller: &mut ExecutionController,
    graph: &mut Graph,
    limit: Duration,
    mut done: impl FnMut(&ExecutionController) -> bool,
) -> Vec<ExecutionMessage> {
    let mut seen = Vec::new();
    let mut waited = Duration::ZERO;
    loop {
        seen.extend(controller.process_messages(graph));
        if done(controller) {
            return seen;
        }
        assert!(waited < limit, "condition not met within {:?}", limit);
        tokio::time::sleep(test_tick()).await;
        waited += test_tick();
    }
}

/// Pump until the controller reports `phase`.
pub async fn pump_until_phase(
    controller: &mut ExecutionController,
    graph: &mut Graph,
    phase: Phase,
) -> Vec<ExecutionMessage> {
    pump_until(controller, graph, Duration::from_secs(60), |c| c.phase() == phase).await
}
