//! Execution worker.
//!
//! Runs on a tokio task, owns the [`Lifecycle`] reducer and an
//! [`ExecutorClient`], and performs the reducer's effects one at a time.
//! Requests are awaited inline, so two requests never overlap and a poll is
//! only scheduled after the previous one resolved.

use crate::config::PollingSettings;
use crate::execution::bridge::{ExecutionBridge, ExecutionCommand};
use crate::execution::client::ExecutorClient;
use crate::execution::lifecycle::{Effect, ExecutionMessage, Lifecycle, LifecycleEvent, Phase};
use crossbeam_channel::Sender;
use std::collections::VecDeque;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinHandle;
use tokio::time::Instant;

pub struct ExecutionWorker<C> {
    client: C,
    lifecycle: Lifecycle,
    cmd_rx: UnboundedReceiver<ExecutionCommand>,
    msg_tx: Sender<ExecutionMessage>,
    /// The single armed poll timer: deadline and the epoch it belongs to.
    timer: Option<(Instant, u64)>,
}

impl<C: ExecutorClient + 'static> ExecutionWorker<C> {
    pub fn new(
        client: C,
        polling: &PollingSettings,
        cmd_rx: UnboundedReceiver<ExecutionCommand>,
        msg_tx: Sender<ExecutionMessage>,
    ) -> Self {
        Self {
            client,
            lifecycle: Lifecycle::new(polling),
            cmd_rx,
            msg_tx,
            timer: None,
        }
    }

    /// Create a bridge and spawn a worker on the current tokio runtime.
    pub fn spawn(client: C, polling: &PollingSettings) -> (ExecutionBridge, JoinHandle<()>) {
        let (bridge, cmd_rx, msg_tx) = ExecutionBridge::new();
        let worker = Self::new(client, polling, cmd_rx, msg_tx);
        (bridge, tokio::spawn(worker.run()))
    }

    pub fn phase(&self) -> Phase {
        self.lifecycle.phase()
    }

    /// Run until `Shutdown` is received or the bridge is dropped.
    pub async fn run(mut self) {
        tracing::info!("Execution worker started");
        loop {
            let timer = self.timer;
            let event = tokio::select! {
                cmd = self.cmd_rx.recv() => match cmd {
                    Some(ExecutionCommand::RunOnce(request)) => {
                        LifecycleEvent::RunOnceRequested(request)
                    }
                    Some(ExecutionCommand::StartContinuous(request)) => {
                        LifecycleEvent::StartRequested(request)
                    }
                    Some(ExecutionCommand::StopContinuous) => LifecycleEvent::StopRequested,
                    Some(ExecutionCommand::Shutdown) | None => break,
                },
                epoch = wait_for(timer) => {
                    self.timer = None;
                    LifecycleEvent::PollDue { epoch }
                }
            };
            self.dispatch(event).await;
        }
        tracing::info!("Execution worker stopped");
    }

    /// Feed one event through the reducer and drive the resulting effects,
    /// including the events produced by performing them.
    pub async fn dispatch(&mut self, event: LifecycleEvent) {
        let mut queue: VecDeque<Effect> = self.lifecycle.handle(event).into();

        while let Some(effect) = queue.pop_front() {
            if let Some(follow_up) = self.perform(effect).await {
                queue.extend(self.lifecycle.handle(follow_up));
            }
        }
    }

    async fn perform(&mut self, effect: Effect) -> Option<LifecycleEvent> {
        match effect {
            Effect::SubmitOnce(request) => {
                let started = Instant::now();
                let result = self.client.run_once(&request).await;
                Some(LifecycleEvent::RunFinished {
                    request_id: request.metadata.id,
                    result,
                    elapsed: started.elapsed(),
                })
            }
            Effect::SubmitStart(request) => Some(LifecycleEvent::StartFinished(
                self.client.start_continuous(&request).await,
            )),
            Effect::SubmitStop => Some(LifecycleEvent::StopFinished(
                self.client.stop_continuous().await,
            )),
            Effect::FetchStatus { epoch } => Some(LifecycleEvent::StatusReceived {
                epoch,
                result: self.client.continuous_status().await,
            }),
            Effect::SchedulePoll { after, epoch } => {
                self.timer = Some((Instant::now() + after, epoch));
                None
            }
            Effect::CancelPoll => {
                self.timer = None;
                None
            }
            Effect::Notify(message) => {
                if self.msg_tx.send(message).is_err() {
                    tracing::trace!("UI side gone; dropping execution message");
                }
                None
            }
        }
    }
}

async fn wait_for(timer: Option<(Instant, u64)>) -> u64 {
    match timer {
        Some((deadline, epoch)) => {
            tokio::time::sleep_until(deadline).await;
            epoch
        }
        None => std::future::pending().await,
    }
}
