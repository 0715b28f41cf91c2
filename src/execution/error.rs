//! Execution-specific error types.

use thiserror::Error;

/// Errors surfaced by the execution lifecycle and the executor client.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExecutionError {
    #[error("Graph has no nodes to execute")]
    EmptyGraph,

    #[error("Continuous execution is active; stop it first")]
    ContinuousActive,

    #[error("Another execution request is in flight")]
    Busy,

    /// Network-level failure: connect, timeout, broken connection.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The executor answered but reported failure.
    #[error("Executor error: {message}")]
    Remote {
        status: Option<u16>,
        message: String,
    },

    #[error("Failed to decode executor response: {0}")]
    Decode(String),

    #[error("Execution worker channel closed")]
    ChannelClosed,
}

impl ExecutionError {
    pub fn remote(message: impl Into<String>) -> Self {
        ExecutionError::Remote {
            status: None,
            message: message.into(),
        }
    }
}

pub type ExecutionResult<T> = std::result::Result<T, ExecutionError>;
