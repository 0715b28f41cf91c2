//! Telemetry payload shapes.
//!
//! Executor telemetry arrives as loosely shaped JSON. It is resolved here,
//! once, into the shapes the reconciler understands; everything else in the
//! payload is ignored.

use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// One recognised shape within a payload.
#[derive(Debug, Clone, PartialEq)]
pub enum PayloadShape {
    /// `[{"name": "Elbow", "angle": 45.0}, ...]`, angles in degrees.
    JointPairs(Vec<(String, f64)>),
    /// `{"3": 3010, ...}`: raw encoder values keyed by servo id.
    ServoPositions(BTreeMap<u16, f64>),
    /// `{"Elbow": 45.0, ...}`, angles in degrees.
    NamedAngles(BTreeMap<String, f64>),
}

/// A payload resolved into its shapes, in the order they are applied.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TelemetryPayload {
    shapes: Vec<PayloadShape>,
}

impl TelemetryPayload {
    pub fn new(shapes: Vec<PayloadShape>) -> Self {
        let mut payload = Self { shapes };
        payload.shapes.sort_by_key(PayloadShape::precedence);
        payload
    }

    pub fn joint_pairs<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        Self::new(vec![PayloadShape::JointPairs(
            pairs.into_iter().map(|(n, a)| (n.into(), a)).collect(),
        )])
    }

    pub fn servo_positions(positions: impl IntoIterator<Item = (u16, f64)>) -> Self {
        Self::new(vec![PayloadShape::ServoPositions(
            positions.into_iter().collect(),
        )])
    }

    pub fn shapes(&self) -> &[PayloadShape] {
        &self.shapes
    }

    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }

    /// Resolve a raw telemetry value.
    ///
    /// - an array yields `JointPairs` from its `{name, angle}` elements
    /// - an object yields `ServoPositions` from its integer keys (and from a
    ///   nested `positions` object, as sent by the status reader) and
    ///   `NamedAngles` from its remaining numeric entries
    pub fn from_value(value: &Value) -> Self {
        let mut shapes = Vec::new();
        match value {
            Value::Array(items) => {
                let pairs: Vec<(String, f64)> = items.iter().filter_map(joint_pair).collect();
                if !pairs.is_empty() {
                    shapes.push(PayloadShape::JointPairs(pairs));
                }
            }
            Value::Object(map) => {
                let mut servos = servo_entries(map);
                if let Some(Value::Object(nested)) = map.get("positions") {
                    servos.extend(servo_entries(nested));
                }
                if !servos.is_empty() {
                    shapes.push(PayloadShape::ServoPositions(servos));
                }

                let named: BTreeMap<String, f64> = map
                    .iter()
                    .filter(|(key, _)| key.parse::<u16>().is_err())
                    .filter_map(|(key, v)| v.as_f64().map(|angle| (key.clone(), angle)))
                    .collect();
                if !named.is_empty() {
                    shapes.push(PayloadShape::NamedAngles(named));
                }
            }
            _ => {}
        }

        if shapes.is_empty() {
            tracing::trace!("Telemetry payload has no joint data");
        }
        Self::new(shapes)
    }
}

impl PayloadShape {
    fn precedence(&self) -> u8 {
        match self {
            PayloadShape::JointPairs(_) => 0,
            PayloadShape::ServoPositions(_) => 1,
            PayloadShape::NamedAngles(_) => 2,
        }
    }
}

impl From<&Value> for TelemetryPayload {
    fn from(value: &Value) -> Self {
        Self::from_value(value)
    }
}

fn joint_pair(item: &Value) -> Option<(String, f64)> {
    let name = item.get("name")?.as_str()?;
    let angle = item.get("angle")?.as_f64()?;
    Some((name.to_string(), angle))
}

fn servo_entries(map: &Map<String, Value>) -> BTreeMap<u16, f64> {
    map.iter()
        .filter_map(|(key, v)| Some((key.parse::<u16>().ok()?, v.as_f64()?)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_array_of_pairs() {
        let payload = TelemetryPayload::from_value(&json!([
            {"name": "Elbow", "angle": 45.0},
            {"name": "Jaw"},
            "noise",
        ]));
        assert_eq!(
            payload.shapes(),
            &[PayloadShape::JointPairs(vec![("Elbow".into(), 45.0)])]
        );
    }

    #[test]
    fn test_status_reader_payload() {
        let payload = TelemetryPayload::from_value(&json!({
            "positions": {"1": 1510, "2": 1029},
            "servo_ids": [1, 2],
            "connected": true,
            "timestamp": 1717000000.5,
        }));

        let servos = BTreeMap::from([(1, 1510.0), (2, 1029.0)]);
        assert_eq!(payload.shapes()[0], PayloadShape::ServoPositions(servos));
        // `timestamp` is numeric but matches no joint; the reconciler ignores it.
        assert!(matches!(
            &payload.shapes()[1],
            PayloadShape::NamedAngles(m) if m.contains_key("timestamp")
        ));
    }

    #[test]
    fn test_mixed_object_orders_shapes() {
        let payload = TelemetryPayload::from_value(&json!({"Elbow": 30.0, "3": 2048}));
        assert!(matches!(payload.shapes()[0], PayloadShape::ServoPositions(_)));
        assert!(matches!(payload.shapes()[1], PayloadShape::NamedAngles(_)));
    }

    #[test]
    fn test_scalar_payload_is_empty() {
        assert!(TelemetryPayload::from_value(&json!("hello")).is_empty());
        assert!(TelemetryPayload::from_value(&json!({"connected": true})).is_empty());
    }
}
