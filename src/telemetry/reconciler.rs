//! Fold telemetry into joint angles.
//!
//! Every shape in a payload is applied, in precedence order:
//!
//! 1. joint pairs overwrite the joint with the same name
//! 2. servo positions are scaled from encoder counts to degrees and
//!    overwrite the joint on that servo
//! 3. named angles overwrite joints present in the model's name to servo map
//!
//! Entries that match nothing are ignored. Joints are never added or
//! removed, and angles are not checked against joint limits.

use crate::telemetry::kinematics::{raw_to_degrees, KinematicModel};
use crate::telemetry::payload::{PayloadShape, TelemetryPayload};
use serde::Serialize;
use serde_json::Value;

/// Current angle of one joint, in degrees.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JointState {
    pub name: String,
    pub angle: f64,
    #[serde(rename = "servoId", skip_serializing_if = "Option::is_none")]
    pub servo_id: Option<u16>,
}

/// Default pose of `model`.
pub fn initial_state(model: &KinematicModel) -> Vec<JointState> {
    model
        .joints()
        .iter()
        .map(|joint| JointState {
            name: joint.name.clone(),
            angle: joint.default_angle,
            servo_id: joint.servo_id,
        })
        .collect()
}

/// Apply `payload` to `joints` and return the updated state.
pub fn reconcile(
    joints: &[JointState],
    payload: &TelemetryPayload,
    model: &KinematicModel,
) -> Vec<JointState> {
    let mut next = joints.to_vec();

    for shape in payload.shapes() {
        match shape {
            PayloadShape::JointPairs(pairs) => {
                for (name, angle) in pairs {
                    set_where(&mut next, |j| &j.name == name, *angle);
                }
            }
            PayloadShape::ServoPositions(positions) => {
                for (&servo, &raw) in positions {
                    set_where(&mut next, |j| j.servo_id == Some(servo), raw_to_degrees(raw));
                }
            }
            PayloadShape::NamedAngles(angles) => {
                for (name, &angle) in angles.iter().filter(|(name, _)| model.is_mapped(name)) {
                    set_where(&mut next, |j| &j.name == name, angle);
                }
            }
        }
    }

    next
}

fn set_where(joints: &mut [JointState], matches: impl Fn(&JointState) -> bool, angle: f64) {
    match joints.iter_mut().find(|j| matches(j)) {
        Some(joint) => joint.angle = angle,
        None => tracing::trace!("Telemetry entry matches no joint"),
    }
}

// ==================== Tracker ====================

/// Joint state for a visualisation that loads its model asynchronously.
///
/// Telemetry applied before [`load_model`](Self::load_model) is dropped.
#[derive(Debug, Clone, Default)]
pub struct JointStateTracker {
    model: Option<KinematicModel>,
    joints: Vec<JointState>,
}

impl JointStateTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_model(model: KinematicModel) -> Self {
        let mut tracker = Self::new();
        tracker.load_model(model);
        tracker
    }

    /// Install the model and reset every joint to its default angle.
    pub fn load_model(&mut self, model: KinematicModel) {
        tracing::debug!("Kinematic model loaded with {} joint(s)", model.joints().len());
        self.joints = initial_state(&model);
        self.model = Some(model);
    }

    pub fn is_ready(&self) -> bool {
        self.model.is_some()
    }

    pub fn model(&self) -> Option<&KinematicModel> {
        self.model.as_ref()
    }

    pub fn joints(&self) -> &[JointState] {
        &self.joints
    }

    pub fn angle(&self, name: &str) -> Option<f64> {
        self.joints.iter().find(|j| j.name == name).map(|j| j.angle)
    }

    /// Returns whether any angle changed.
    pub fn apply(&mut self, payload: &TelemetryPayload) -> bool {
        let Some(model) = &self.model else {
            tracing::trace!("Ignoring telemetry until the kinematic model is loaded");
            return false;
        };
        let next = reconcile(&self.joints, payload, model);
        let changed = next != self.joints;
        self.joints = next;
        changed
    }

    pub fn apply_value(&mut self, value: &Value) -> bool {
        self.apply(&TelemetryPayload::from_value(value))
    }
}
