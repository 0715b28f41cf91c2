//! Kinematic model: the robot's joints, their default pose and servo ids.

use crate::error::{BotflowError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;

/// Full-scale value of the servo encoders.
pub const ENCODER_MAX: f64 = 4095.0;

/// Degrees covered by the encoder range.
pub const ENCODER_DEGREES: f64 = 360.0;

/// Convert a raw encoder reading to degrees.
pub fn raw_to_degrees(raw: f64) -> f64 {
    raw / ENCODER_MAX * ENCODER_DEGREES
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JointSpec {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub servo_id: Option<u16>,
    /// Angle in degrees before any telemetry arrives.
    #[serde(default)]
    pub default_angle: f64,
}

impl JointSpec {
    pub fn new(name: impl Into<String>, servo_id: Option<u16>) -> Self {
        Self {
            name: name.into(),
            servo_id,
            default_angle: 0.0,
        }
    }

    pub fn with_default_angle(mut self, degrees: f64) -> Self {
        self.default_angle = degrees;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct KinematicModel {
    joints: Vec<JointSpec>,
    servo_by_name: BTreeMap<String, u16>,
}

impl KinematicModel {
    /// Build a model; joint names and servo ids must be unique.
    pub fn new(joints: Vec<JointSpec>) -> Result<Self> {
        let mut names = HashSet::new();
        let mut servos = HashSet::new();
        for joint in &joints {
            if !names.insert(joint.name.as_str()) {
                return Err(BotflowError::Telemetry(format!(
                    "Duplicate joint name '{}'",
                    joint.name
                )));
            }
            if let Some(id) = joint.servo_id {
                if !servos.insert(id) {
                    return Err(BotflowError::Telemetry(format!(
                        "Servo {} is mapped to more than one joint",
                        id
                    )));
                }
            }
        }

        Ok(Self::indexed(joints))
    }

    /// The SO-101 arm: six joints on servos 1 to 6, base to gripper.
    pub fn so101() -> Self {
        let joints = ["Rotation", "Pitch", "Elbow", "Wrist_Pitch", "Wrist_Roll", "Jaw"]
            .into_iter()
            .zip(1u16..)
            .map(|(name, id)| JointSpec::new(name, Some(id)))
            .collect();
        Self::indexed(joints)
    }

    fn indexed(joints: Vec<JointSpec>) -> Self {
        let servo_by_name = joints
            .iter()
            .filter_map(|j| j.servo_id.map(|id| (j.name.clone(), id)))
            .collect();
        Self {
            joints,
            servo_by_name,
        }
    }

    /// Parse `{ "joints": [{ "name", "servo_id"?, "default_angle"? }] }`.
    pub fn from_json(json: &str) -> Result<Self> {
        #[derive(Deserialize)]
        struct Raw {
            joints: Vec<JointSpec>,
        }
        let raw: Raw = serde_json::from_str(json)
            .map_err(|e| BotflowError::Telemetry(format!("Invalid kinematic model: {}", e)))?;
        Self::new(raw.joints)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            BotflowError::Telemetry(format!("Failed to read model {}: {}", path.display(), e))
        })?;
        Self::from_json(&content)
    }

    pub fn joints(&self) -> &[JointSpec] {
        &self.joints
    }

    pub fn servo_for(&self, name: &str) -> Option<u16> {
        self.servo_by_name.get(name).copied()
    }

    /// Whether `name` appears in the name to servo map.
    pub fn is_mapped(&self, name: &str) -> bool {
        self.servo_by_name.contains_key(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_so101_servo_order() {
        let model = KinematicModel::so101();
        assert_eq!(model.joints().len(), 6);
        assert_eq!(model.servo_for("Rotation"), Some(1));
        assert_eq!(model.servo_for("Jaw"), Some(6));
        assert_eq!(model.servo_for("Base"), None);
    }

    #[test]
    fn test_from_json_with_unmapped_joint() {
        let model = KinematicModel::from_json(
            r#"{"joints": [
                {"name": "Elbow", "servo_id": 3, "default_angle": 90},
                {"name": "Camera_Mount"}
            ]}"#,
        )
        .unwrap();
        assert_eq!(model.joints()[0].default_angle, 90.0);
        assert!(model.is_mapped("Elbow"));
        assert!(!model.is_mapped("Camera_Mount"));
    }

    #[test]
    fn test_duplicate_servo_rejected() {
        let err = KinematicModel::new(vec![
            JointSpec::new("A", Some(1)),
            JointSpec::new("B", Some(1)),
        ])
        .unwrap_err();
        assert!(matches!(err, BotflowError::Telemetry(_)));
    }

    #[test]
    fn test_raw_to_degrees_range() {
        assert_eq!(raw_to_degrees(0.0), 0.0);
        assert_eq!(raw_to_degrees(ENCODER_MAX), 360.0);
        assert!((raw_to_degrees(2048.0) - 180.04).abs() < 0.01);
    }
}
