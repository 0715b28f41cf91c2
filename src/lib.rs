//! # botflow: dataflow graphs for robot control
//!
//! The editor-side core of a node-graph robot controller. Users build a typed
//! dataflow graph, submit it to a remote executor once or as a continuous
//! loop, and watch per-node status and robot telemetry come back.
//!
//! ## Architecture
//!
//! - **Graph**: typed ports, compatibility rules, the editable graph and its
//!   saved snapshot
//! - **Execution**: request building, a pure lifecycle reducer driven by a
//!   tokio worker, and the UI-side controller that mirrors it
//! - **Telemetry**: folds executor telemetry into named joint angles
//! - **Communication**: a tokio channel carries commands to the worker; a
//!   crossbeam channel carries messages back to the UI thread
//!
//! ## Configuration
//!
//! Settings live in `config.toml` under the platform config directory for
//! `dev.botflow.botflow`; see [`config`].
//!
//! ## Example
//!
//! ```ignore
//! use botflow::{
//!     config::AppConfig,
//!     execution::{ExecutionController, ExecutionWorker, HttpExecutorClient},
//!     graph::{Graph, NodeCatalog, PortRef, Position},
//! };
//!
//! let config = AppConfig::load_or_default();
//! let catalog = NodeCatalog::builtin();
//!
//! let mut graph = Graph::new();
//! let connect = graph.add_node(catalog.require("ConnectRobotNode")?, Position::default());
//! let reader = graph.add_node(catalog.require("RobotStatusReader")?, Position::new(240.0, 0.0));
//! graph.add_edge(PortRef::new(connect, "sdk"), PortRef::new(reader, "sdk"))?;
//!
//! let client = HttpExecutorClient::new(&config.executor)?;
//! let (bridge, _worker) = ExecutionWorker::spawn(client, &config.polling);
//! let mut controller = ExecutionController::new(bridge, &config);
//! controller.start_continuous(&mut graph)?;
//! ```

pub mod config;
pub mod error;
pub mod execution;
pub mod graph;
pub mod telemetry;

// Re-export commonly used types
pub use config::{AppConfig, WorkflowFile};
pub use error::{BotflowError, Result};
pub use execution::{ExecutionController, ExecutionWorker, Phase};
pub use graph::{Graph, NodeCatalog};
pub use telemetry::JointStateTracker;
