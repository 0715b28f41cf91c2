//! Thread boundary between the execution worker and the UI.
//!
//! Commands travel over a tokio channel so the worker can `select!` on them
//! alongside its poll timer; messages come back over a crossbeam channel the
//! UI drains once per frame without blocking.

use crate::execution::lifecycle::ExecutionMessage;
use crate::execution::request::ExecutionRequest;
use crossbeam_channel::{unbounded, Receiver, Sender};
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};

/// Commands sent from the UI thread to the execution worker.
#[derive(Debug, Clone)]
pub enum ExecutionCommand {
    RunOnce(ExecutionRequest),
    StartContinuous(ExecutionRequest),
    StopContinuous,
    /// Stop the worker task.
    Shutdown,
}

/// UI-side handle for communicating with the execution worker.
pub struct ExecutionBridge {
    cmd_tx: UnboundedSender<ExecutionCommand>,
    msg_rx: Receiver<ExecutionMessage>,
}

impl ExecutionBridge {
    /// Create a new bridge: `(bridge_for_ui, cmd_rx, msg_tx)`.
    ///
    /// The worker owns `cmd_rx` and `msg_tx`.
    pub fn new() -> (
        Self,
        UnboundedReceiver<ExecutionCommand>,
        Sender<ExecutionMessage>,
    ) {
        let (cmd_tx, cmd_rx) = unbounded_channel();
        let (msg_tx, msg_rx) = unbounded();
        (Self { cmd_tx, msg_rx }, cmd_rx, msg_tx)
    }

    /// Drain all pending messages.
    pub fn drain(&self) -> Vec<ExecutionMessage> {
        self.msg_rx.try_iter().collect()
    }

    /// Try to receive a single message without blocking.
    pub fn try_recv(&self) -> Option<ExecutionMessage> {
        self.msg_rx.try_recv().ok()
    }

    /// Returns `false` once the worker has gone away.
    pub fn send_command(&self, cmd: ExecutionCommand) -> bool {
        self.cmd_tx.send(cmd).is_ok()
    }

    pub fn is_connected(&self) -> bool {
        !self.cmd_tx.is_closed()
    }

    pub fn shutdown(&self) {
        let _ = self.cmd_tx.send(ExecutionCommand::Shutdown);
    }
}
