//! Graph execution against a remote executor.
//!
//! ## Module Structure
//!
//! - `request` - Graph to `ExecutionRequest` conversion
//! - `protocol` - Executor REST response bodies
//! - `stream` - Real-time stream frames (inbound events, outbound messages)
//! - `client` - `ExecutorClient` trait and its reqwest implementation
//! - `mock_executor` - Scripted in-memory executor
//! - `lifecycle` - Pure lifecycle reducer (phases, guards, polling)
//! - `worker` - Tokio task performing the reducer's effects
//! - `bridge` - Channels between the worker and the UI thread
//! - `controller` - UI-side handle that mirrors the worker's state

pub mod bridge;
pub mod client;
pub mod controller;
pub mod error;
pub mod lifecycle;
pub mod mock_executor;
pub mod protocol;
pub mod request;
pub mod stream;
pub mod worker;

pub use bridge::{ExecutionBridge, ExecutionCommand};
pub use client::{ExecutorClient, HttpExecutorClient};
pub use controller::ExecutionController;
pub use error::{ExecutionError, ExecutionResult};
pub use lifecycle::{
    Effect, ExecutionMessage, Lifecycle, LifecycleEvent, Operation, Phase, RunOutcome,
};
pub use mock_executor::MockExecutor;
pub use protocol::{AckResponse, ContinuousStatus, LogEntry, RunResponse};
pub use request::{build_request, ExecutionRequest, RequestBuilder, RequestMetadata, RequestNode};
pub use stream::{ClientMessage, StreamEvent, WorkflowEvent};
pub use worker::ExecutionWorker;
