//! Execution lifecycle state machine.
//!
//! `Lifecycle::handle` is a pure reducer: it takes an event, updates the
//! owned state and returns the effects to perform (requests to submit, timers
//! to arm, messages for the UI). The worker performs the effects and feeds
//! their results back in as new events.
//!
//! ```text
//! Idle ──run──▶ ExecutingOnce ──done──▶ Idle
//! Idle ──start──▶ StartingContinuous ──ack──▶ ContinuousRunning ⇄ poll
//! ContinuousRunning ──stop──▶ StoppingContinuous ──ack──▶ Idle
//! ContinuousRunning ──status: not running──▶ Idle
//! ```

use crate::config::PollingSettings;
use crate::execution::error::{ExecutionError, ExecutionResult};
use crate::execution::protocol::{AckResponse, ContinuousStatus, LogEntry, RunResponse};
use crate::execution::request::ExecutionRequest;
use serde_json::Value;
use std::time::Duration;
use uuid::Uuid;

/// Where the controller is in its life.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    ExecutingOnce,
    StartingContinuous,
    ContinuousRunning,
    StoppingContinuous,
}

impl Phase {
    /// Starting, running or stopping a continuous run.
    pub fn is_continuous(self) -> bool {
        matches!(
            self,
            Phase::StartingContinuous | Phase::ContinuousRunning | Phase::StoppingContinuous
        )
    }

    fn polls(self) -> bool {
        matches!(self, Phase::ContinuousRunning | Phase::StoppingContinuous)
    }
}

/// User-facing operations, used to label rejections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    RunOnce,
    StartContinuous,
    StopContinuous,
}

/// Result of a one-shot run, kept for display.
#[derive(Debug, Clone, PartialEq)]
pub struct RunOutcome {
    pub request_id: Uuid,
    pub success: bool,
    pub error: Option<String>,
    pub results: Option<Value>,
    pub logs: Vec<LogEntry>,
    pub elapsed: Duration,
}

impl RunOutcome {
    fn from_result(
        request_id: Uuid,
        result: ExecutionResult<RunResponse>,
        elapsed: Duration,
    ) -> Self {
        match result {
            Ok(response) => Self {
                request_id,
                error: match (response.success, response.error) {
                    (false, None) => Some("Execution failed".to_string()),
                    (_, error) => error,
                },
                success: response.success,
                results: response.results,
                logs: response.logs,
                elapsed,
            },
            Err(e) => Self {
                request_id,
                success: false,
                error: Some(e.to_string()),
                results: None,
                logs: Vec::new(),
                elapsed,
            },
        }
    }
}

/// Inputs to the reducer.
#[derive(Debug, Clone)]
pub enum LifecycleEvent {
    RunOnceRequested(ExecutionRequest),
    StartRequested(ExecutionRequest),
    StopRequested,
    RunFinished {
        request_id: Uuid,
        result: ExecutionResult<RunResponse>,
        elapsed: Duration,
    },
    StartFinished(ExecutionResult<AckResponse>),
    StopFinished(ExecutionResult<AckResponse>),
    PollDue { epoch: u64 },
    StatusReceived {
        epoch: u64,
        result: ExecutionResult<ContinuousStatus>,
    },
}

/// Messages for the UI thread.
#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionMessage {
    PhaseChanged(Phase),
    /// An operation was refused or failed.
    Rejected {
        operation: Operation,
        error: ExecutionError,
    },
    RunCompleted(RunOutcome),
    StatusUpdated(ContinuousStatus),
    /// Cached continuous status should be forgotten (stop accepted).
    StatusCleared,
    /// A status poll failed; polling continues.
    PollFailed {
        error: ExecutionError,
        consecutive_failures: u32,
    },
}

/// Work for the effect driver.
#[derive(Debug, Clone)]
pub enum Effect {
    SubmitOnce(ExecutionRequest),
    SubmitStart(ExecutionRequest),
    SubmitStop,
    FetchStatus { epoch: u64 },
    /// Arm the single poll timer, replacing any armed one.
    SchedulePoll { after: Duration, epoch: u64 },
    CancelPoll,
    Notify(ExecutionMessage),
}

/// Owned lifecycle state.
#[derive(Debug, Clone)]
pub struct Lifecycle {
    phase: Phase,
    poll_interval: Duration,
    retry_interval: Duration,
    /// Identifies the current continuous run's poll timer.
    epoch: u64,
    /// Phase to return to if a stop is refused.
    stop_origin: Phase,
    status: Option<ContinuousStatus>,
    consecutive_failures: u32,
}

impl Lifecycle {
    pub fn new(polling: &PollingSettings) -> Self {
        Self {
            phase: Phase::Idle,
            poll_interval: polling.interval(),
            retry_interval: polling.retry_interval(),
            epoch: 0,
            stop_origin: Phase::Idle,
            status: None,
            consecutive_failures: 0,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn status(&self) -> Option<&ContinuousStatus> {
        self.status.as_ref()
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    pub fn handle(&mut self, event: LifecycleEvent) -> Vec<Effect> {
        match event {
            LifecycleEvent::RunOnceRequested(request) => self.on_run_requested(request),
            LifecycleEvent::StartRequested(request) => self.on_start_requested(request),
            LifecycleEvent::StopRequested => self.on_stop_requested(),
            LifecycleEvent::RunFinished {
                request_id,
                result,
                elapsed,
            } => self.on_run_finished(request_id, result, elapsed),
            LifecycleEvent::StartFinished(result) => self.on_start_finished(result),
            LifecycleEvent::StopFinished(result) => self.on_stop_finished(result),
            LifecycleEvent::PollDue { epoch } => self.on_poll_due(epoch),
            LifecycleEvent::StatusReceived { epoch, result } => self.on_status(epoch, result),
        }
    }

    // ── Guards ──

    fn admit(&self, operation: Operation, request: &ExecutionRequest) -> Result<(), Vec<Effect>> {
        let error = if request.nodes.is_empty() {
            ExecutionError::EmptyGraph
        } else if self.phase.is_continuous() {
            ExecutionError::ContinuousActive
        } else if self.phase == Phase::ExecutingOnce {
            ExecutionError::Busy
        } else {
            return Ok(());
        };
        tracing::info!("Rejecting {:?}: {}", operation, error);
        Err(self.refuse(operation, error))
    }

    /// A refusal restates the current phase so the UI mirror can resync.
    fn refuse(&self, operation: Operation, error: ExecutionError) -> Vec<Effect> {
        vec![
            reject(operation, error),
            Effect::Notify(ExecutionMessage::PhaseChanged(self.phase)),
        ]
    }

    fn enter(&mut self, phase: Phase) -> Effect {
        tracing::debug!("Execution phase {:?} -> {:?}", self.phase, phase);
        self.phase = phase;
        Effect::Notify(ExecutionMessage::PhaseChanged(phase))
    }

    // ── One-shot ──

    fn on_run_requested(&mut self, request: ExecutionRequest) -> Vec<Effect> {
        if let Err(rejection) = self.admit(Operation::RunOnce, &request) {
            return rejection;
        }
        vec![self.enter(Phase::ExecutingOnce), Effect::SubmitOnce(request)]
    }

    fn on_run_finished(
        &mut self,
        request_id: Uuid,
        result: ExecutionResult<RunResponse>,
        elapsed: Duration,
    ) -> Vec<Effect> {
        if self.phase != Phase::ExecutingOnce {
            tracing::warn!("Ignoring run result while {:?}", self.phase);
            return Vec::new();
        }
        let outcome = RunOutcome::from_result(request_id, result, elapsed);
        if outcome.success {
            tracing::info!("Run {} completed in {:?}", request_id, elapsed);
        } else {
            tracing::warn!(
                "Run {} failed: {}",
                request_id,
                outcome.error.as_deref().unwrap_or("unknown error")
            );
        }
        vec![
            self.enter(Phase::Idle),
            Effect::Notify(ExecutionMessage::RunCompleted(outcome)),
        ]
    }

    // ── Continuous ──

    fn on_start_requested(&mut self, request: ExecutionRequest) -> Vec<Effect> {
        if let Err(rejection) = self.admit(Operation::StartContinuous, &request) {
            return rejection;
        }
        vec![self.enter(Phase::StartingContinuous), Effect::SubmitStart(request)]
    }

    fn on_start_finished(&mut self, result: ExecutionResult<AckResponse>) -> Vec<Effect> {
        if self.phase != Phase::StartingContinuous {
            tracing::warn!("Ignoring start acknowledgement while {:?}", self.phase);
            return Vec::new();
        }
        match accepted(result) {
            Ok(message) => {
                tracing::info!("Continuous execution started: {}", message);
                self.epoch += 1;
                self.consecutive_failures = 0;
                self.status = None;
                vec![
                    self.enter(Phase::ContinuousRunning),
                    Effect::SchedulePoll {
                        after: self.poll_interval,
                        epoch: self.epoch,
                    },
                ]
            }
            Err(error) => {
                tracing::warn!("Continuous start refused: {}", error);
                vec![
                    self.enter(Phase::Idle),
                    reject(Operation::StartContinuous, error),
                ]
            }
        }
    }

    fn on_stop_requested(&mut self) -> Vec<Effect> {
        match self.phase {
            Phase::Idle | Phase::ContinuousRunning => {
                self.stop_origin = self.phase;
                vec![self.enter(Phase::StoppingContinuous), Effect::SubmitStop]
            }
            Phase::ExecutingOnce | Phase::StartingContinuous | Phase::StoppingContinuous => {
                self.refuse(Operation::StopContinuous, ExecutionError::Busy)
            }
        }
    }

    fn on_stop_finished(&mut self, result: ExecutionResult<AckResponse>) -> Vec<Effect> {
        if self.phase != Phase::StoppingContinuous {
            tracing::debug!("Stop acknowledged after the run already ended");
            return Vec::new();
        }
        match accepted(result) {
            Ok(message) => {
                tracing::info!("Continuous execution stopped: {}", message);
                self.finish_continuous();
                vec![
                    Effect::CancelPoll,
                    self.enter(Phase::Idle),
                    Effect::Notify(ExecutionMessage::StatusCleared),
                ]
            }
            Err(error) => {
                tracing::warn!("Continuous stop refused: {}", error);
                // Polling was never cancelled, so a running loop keeps being observed.
                let origin = self.stop_origin;
                vec![self.enter(origin), reject(Operation::StopContinuous, error)]
            }
        }
    }

    fn finish_continuous(&mut self) {
        self.epoch += 1;
        self.status = None;
        self.consecutive_failures = 0;
    }

    // ── Polling ──

    fn on_poll_due(&mut self, epoch: u64) -> Vec<Effect> {
        if epoch != self.epoch || !self.phase.polls() {
            tracing::trace!("Dropping stale poll timer (epoch {})", epoch);
            return Vec::new();
        }
        vec![Effect::FetchStatus { epoch }]
    }

    fn on_status(&mut self, epoch: u64, result: ExecutionResult<ContinuousStatus>) -> Vec<Effect> {
        if epoch != self.epoch || !self.phase.polls() {
            tracing::trace!("Dropping stale status (epoch {})", epoch);
            return Vec::new();
        }

        match result {
            Ok(status) if !status.is_running => {
                tracing::info!(
                    "Executor reports continuous run ended after {} iteration(s)",
                    status.count_of_iterations
                );
                self.epoch += 1;
                self.consecutive_failures = 0;
                self.status = Some(status.clone());
                vec![
                    Effect::CancelPoll,
                    Effect::Notify(ExecutionMessage::StatusUpdated(status)),
                    self.enter(Phase::Idle),
                ]
            }
            Ok(status) => {
                self.consecutive_failures = 0;
                self.status = Some(status.clone());
                vec![
                    Effect::Notify(ExecutionMessage::StatusUpdated(status)),
                    Effect::SchedulePoll {
                        after: self.poll_interval,
                        epoch,
                    },
                ]
            }
            Err(error) => {
                self.consecutive_failures = self.consecutive_failures.saturating_add(1);
                tracing::warn!(
                    "Status poll failed ({} in a row), retrying in {:?}: {}",
                    self.consecutive_failures,
                    self.retry_interval,
                    error
                );
                vec![
                    Effect::Notify(ExecutionMessage::PollFailed {
                        error,
                        consecutive_failures: self.consecutive_failures,
                    }),
                    Effect::SchedulePoll {
                        after: self.retry_interval,
                        epoch,
                    },
                ]
            }
        }
    }
}

fn reject(operation: Operation, error: ExecutionError) -> Effect {
    Effect::Notify(ExecutionMessage::Rejected { operation, error })
}

/// An acknowledgement counts only when the executor says `success`.
fn accepted(result: ExecutionResult<AckResponse>) -> ExecutionResult<String> {
    match result {
        Ok(AckResponse {
            success: true,
            message,
        }) => Ok(message),
        Ok(AckResponse { message, .. }) => Err(ExecutionError::remote(message)),
        Err(e) => Err(e),
    }
}
