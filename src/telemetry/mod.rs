//! Robot joint state from executor telemetry.
//!
//! - `payload` - Resolves raw telemetry JSON into known shapes
//! - `kinematics` - Joint names, default pose and servo mapping
//! - `reconciler` - Folds payloads into joint angles

pub mod kinematics;
pub mod payload;
pub mod reconciler;

pub use kinematics::{raw_to_degrees, JointSpec, KinematicModel};
pub use payload::{PayloadShape, TelemetryPayload};
pub use reconciler::{initial_state, reconcile, JointState, JointStateTracker};
