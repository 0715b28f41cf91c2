//! Typed dataflow graph.
//!
//! ## Module Structure
//!
//! - `port` - Port types, directions, input modes and descriptors
//! - `compat` - Output/input type compatibility rules
//! - `catalog` - Node kinds (built-in and executor-listed)
//! - `node` - Node instances and their live status
//! - `model` - The editable `Graph`
//! - `snapshot` - Save/load with re-validation
//! - `id` - Node and edge identifiers

pub mod catalog;
pub mod compat;
pub mod error;
pub mod id;
pub mod model;
pub mod node;
pub mod port;
pub mod snapshot;

pub use catalog::{NodeCatalog, NodeKind};
pub use compat::{can_connect, check_connection, rejection_reason};
pub use error::{GraphError, GraphResult};
pub use id::{EdgeId, NodeId, PortRef};
pub use model::{Edge, Graph};
pub use node::{Node, NodeStatus, NodeUpdate, Position, Telemetry};
pub use port::{InputMode, PortDescriptor, PortDirection, PortType};
pub use snapshot::{GraphSnapshot, LoadReport, WireEdge};
