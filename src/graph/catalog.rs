//! Node kinds and the catalog they are looked up in.
//!
//! A `NodeKind` is the template a node is created from: a name understood by
//! the executor plus its input/output port descriptors. Kinds come either
//! from the built-in SO-101 set or from the executor's `GET /nodes` listing.

use crate::graph::error::{GraphError, GraphResult};
use crate::graph::port::{PortDescriptor, PortType};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Output handle used by kinds that declare a single positional output.
pub const SINGLE_OUTPUT: &str = "output";

/// Template for nodes placed on the canvas.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeKind {
    /// Identifier sent to the executor as the node `type`.
    pub name: String,
    pub display_name: String,
    pub description: String,
    pub category: String,
    pub inputs: Vec<PortDescriptor>,
    pub outputs: Vec<PortDescriptor>,
}

impl NodeKind {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            display_name: name.clone(),
            name,
            description: String::new(),
            category: String::new(),
            inputs: Vec::new(),
            outputs: Vec::new(),
        }
    }

    pub fn display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = display_name.into();
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn input(mut self, port: PortDescriptor) -> Self {
        self.inputs.push(port);
        self
    }

    pub fn output(mut self, port: PortDescriptor) -> Self {
        self.outputs.push(port);
        self
    }

    pub fn input_port(&self, name: &str) -> Option<&PortDescriptor> {
        self.inputs.iter().find(|p| p.name == name)
    }

    pub fn output_port(&self, name: &str) -> Option<&PortDescriptor> {
        self.outputs.iter().find(|p| p.name == name)
    }
}

/// Registry of the node kinds available to the editor.
#[derive(Debug, Clone, Default)]
pub struct NodeCatalog {
    kinds: BTreeMap<String, Arc<NodeKind>>,
}

impl NodeCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a kind, replacing any kind with the same name.
    pub fn register(&mut self, kind: NodeKind) -> Arc<NodeKind> {
        let kind = Arc::new(kind);
        self.kinds.insert(kind.name.clone(), Arc::clone(&kind));
        kind
    }

    pub fn get(&self, name: &str) -> Option<Arc<NodeKind>> {
        self.kinds.get(name).cloned()
    }

    pub fn require(&self, name: &str) -> GraphResult<Arc<NodeKind>> {
        self.get(name)
            .ok_or_else(|| GraphError::UnknownNodeKind(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.kinds.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<NodeKind>> {
        self.kinds.values()
    }

    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }

    /// Merge another catalog into this one; kinds in `other` win.
    pub fn extend(&mut self, other: NodeCatalog) {
        self.kinds.extend(other.kinds);
    }

    // ── Built-in kinds ──

    /// The SO-101 arm kinds plus a few general-purpose ones.
    pub fn builtin() -> Self {
        let mut catalog = Self::new();

        catalog.register(
            NodeKind::new("ConnectRobotNode")
                .display_name("Connect Robot")
                .description("Open the servo bus of an SO-101 arm")
                .category("robot")
                .input(PortDescriptor::input("port", PortType::Text).with_default("/dev/ttyACM0"))
                .input(
                    PortDescriptor::input("baudrate", PortType::Integer)
                        .optional()
                        .with_default(1_000_000),
                )
                .output(PortDescriptor::output("sdk", PortType::Device)),
        );

        catalog.register(
            NodeKind::new("RobotStatusReader")
                .display_name("Robot Status Reader")
                .description("Read positions and modes from the connected servos")
                .category("robot")
                .input(PortDescriptor::input("sdk", PortType::Device))
                .input(PortDescriptor::input("servo_ids", PortType::Text).with_default("1,2,3,4,5"))
                .input(
                    PortDescriptor::input("read_positions", PortType::Boolean)
                        .optional()
                        .with_default(true),
                )
                .input(
                    PortDescriptor::input("read_modes", PortType::Boolean)
                        .optional()
                        .with_default(false),
                )
                .input(
                    PortDescriptor::input("stream_results", PortType::Boolean)
                        .optional()
                        .with_default(true),
                )
                .input(
                    PortDescriptor::input("update_interval", PortType::Float)
                        .optional()
                        .with_default(0.1)
                        .with_range(0.01, 5.0),
                )
                .output(PortDescriptor::output("status_data", PortType::Map))
                .output(PortDescriptor::output("positions", PortType::Map)),
        );

        let joints: [(&str, f64, f64); 6] = [
            ("rotation", -180.0, 180.0),
            ("pitch", -90.0, 90.0),
            ("elbow", -120.0, 120.0),
            ("wrist_pitch", -90.0, 90.0),
            ("wrist_roll", -180.0, 180.0),
            ("jaw", 0.0, 90.0),
        ];
        let mut angles_to_positions = NodeKind::new("SO101JointAnglesToPositions")
            .display_name("Joint Angles To Positions")
            .description("Convert SO-101 joint angles in degrees to raw servo positions")
            .category("robot");
        for (name, min, max) in joints {
            angles_to_positions = angles_to_positions.input(
                PortDescriptor::input(name, PortType::Float)
                    .with_default(0.0)
                    .with_range(min, max),
            );
        }
        catalog.register(
            angles_to_positions.output(PortDescriptor::output("positions", PortType::Map)),
        );

        catalog.register(
            NodeKind::new("So101WritePositionNode")
                .display_name("Write Positions")
                .description("Write raw target positions to the servos")
                .category("robot")
                .input(PortDescriptor::input("sdk", PortType::Device))
                .input(PortDescriptor::input("positions", PortType::Map))
                .output(PortDescriptor::output("write_result", PortType::Map)),
        );

        catalog.register(
            NodeKind::new("DisconnectRobotNode")
                .display_name("Disconnect Robot")
                .category("robot")
                .input(PortDescriptor::input("sdk", PortType::Device))
                .output(PortDescriptor::output("result", PortType::Map)),
        );

        catalog.register(
            NodeKind::new("InputNode")
                .display_name("Input")
                .category("input")
                .input(PortDescriptor::input("value", PortType::Text).with_default(""))
                .output(PortDescriptor::output(SINGLE_OUTPUT, PortType::Text)),
        );

        catalog.register(
            NodeKind::new("OutputNode")
                .display_name("Output")
                .category("output")
                .input(PortDescriptor::input("input", PortType::Text)),
        );

        catalog.register(
            NodeKind::new("MathNode")
                .display_name("Math")
                .category("processing")
                .input(PortDescriptor::input("a", PortType::Float).with_default(0.0))
                .input(PortDescriptor::input("b", PortType::Float).with_default(0.0))
                .input(
                    PortDescriptor::input("operation", PortType::Text)
                        .with_choices(["add", "subtract", "multiply", "divide"])
                        .with_default("add"),
                )
                .output(PortDescriptor::output(SINGLE_OUTPUT, PortType::Float)),
        );

        catalog.register(
            NodeKind::new("DelayNode")
                .display_name("Delay")
                .category("control")
                .input(PortDescriptor::input("input", PortType::Text))
                .input(
                    PortDescriptor::input("delay_seconds", PortType::Float)
                        .with_default(1.0)
                        .with_range(0.1, 10.0),
                )
                .output(PortDescriptor::output(SINGLE_OUTPUT, PortType::Text)),
        );

        catalog
    }

    // ── Executor listing ──

    /// Build a catalog from the executor's `GET /nodes` response.
    ///
    /// Accepts either the full response (`{"nodes": [...], "count": n}`) or
    /// the bare node array.
    pub fn from_listing(listing: &Value) -> GraphResult<Self> {
        let nodes = listing
            .get("nodes")
            .unwrap_or(listing)
            .as_array()
            .ok_or_else(|| GraphError::InvalidListing("expected an array of nodes".into()))?;

        let mut catalog = Self::new();
        for entry in nodes {
            let kind = parse_listed_kind(entry)?;
            tracing::trace!(
                "Listed node kind {} ({} inputs, {} outputs)",
                kind.name,
                kind.inputs.len(),
                kind.outputs.len()
            );
            catalog.register(kind);
        }
        Ok(catalog)
    }
}

fn parse_listed_kind(entry: &Value) -> GraphResult<NodeKind> {
    let name = entry
        .get("name")
        .and_then(Value::as_str)
        .ok_or_else(|| GraphError::InvalidListing("node entry without a name".into()))?;
    let text = |key: &str| {
        entry
            .get(key)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    };

    let mut kind = NodeKind::new(name)
        .description(text("description"))
        .category(text("category"));
    let display_name = text("display_name");
    if !display_name.is_empty() {
        kind = kind.display_name(display_name);
    }

    if let Some(inputs) = entry.get("input_types") {
        for (section, required) in [("required", true), ("optional", false)] {
            if let Some(ports) = inputs.get(section).and_then(Value::as_object) {
                for (port_name, spec) in ports {
                    let mut port = parse_input_spec(port_name, spec);
                    port.required = required;
                    kind.inputs.push(port);
                }
            }
        }
    }

    match entry.get("return_types") {
        Some(Value::Array(types)) => {
            let single = types.len() == 1;
            for (index, ty) in types.iter().enumerate() {
                let port_name = if single {
                    SINGLE_OUTPUT.to_string()
                } else {
                    format!("{}-{}", SINGLE_OUTPUT, index)
                };
                kind.outputs
                    .push(PortDescriptor::output(port_name, type_of_spec(ty)));
            }
        }
        Some(Value::Object(sections)) => {
            let named = sections
                .get("required")
                .and_then(Value::as_object)
                .unwrap_or(sections);
            for (port_name, spec) in named {
                kind.outputs
                    .push(PortDescriptor::output(port_name.clone(), type_of_spec(spec)));
            }
        }
        _ => {}
    }

    Ok(kind)
}

/// `[TYPE, {default, min, max}]`, where `TYPE` is a type name or a list of
/// choices.
fn parse_input_spec(name: &str, spec: &Value) -> PortDescriptor {
    let mut port = PortDescriptor::input(name, type_of_spec(spec));

    let head = spec.as_array().and_then(|a| a.first()).unwrap_or(spec);
    if let Value::Array(choices) = head {
        port.choices = choices
            .iter()
            .filter_map(|c| c.as_str().map(str::to_string))
            .collect();
    }

    if let Some(meta) = spec.as_array().and_then(|a| a.get(1)).and_then(Value::as_object) {
        apply_input_meta(&mut port, meta);
    }
    port
}

fn apply_input_meta(port: &mut PortDescriptor, meta: &Map<String, Value>) {
    port.default = meta.get("default").cloned();
    port.min = meta.get("min").and_then(Value::as_f64);
    port.max = meta.get("max").and_then(Value::as_f64);
}

fn type_of_spec(spec: &Value) -> PortType {
    let head = match spec {
        Value::Array(items) => items.first().unwrap_or(&Value::Null),
        other => other,
    };
    match head {
        Value::String(name) => PortType::parse(name),
        // A list of choices is a text input.
        Value::Array(_) => PortType::Text,
        _ => PortType::Any,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_builtin_catalog_has_robot_kinds() {
        let catalog = NodeCatalog::builtin();
        let reader = catalog.get("RobotStatusReader").unwrap();
        assert_eq!(reader.input_port("sdk").unwrap().port_type, PortType::Device);
        assert_eq!(reader.output_port("positions").unwrap().port_type, PortType::Map);
        assert!(catalog.contains("So101WritePositionNode"));
        assert!(catalog.require("NoSuchNode").is_err());
    }

    #[test]
    fn test_listing_with_tuple_and_named_returns() {
        let listing = json!({
            "nodes": [
                {
                    "name": "MathNode",
                    "display_name": "Math",
                    "category": "processing",
                    "input_types": {
                        "required": {
                            "a": ["FLOAT", {"default": 0.0}],
                            "operation": [["add", "subtract"], {"default": "add"}]
                        }
                    },
                    "return_types": ["FLOAT"]
                },
                {
                    "name": "RobotStatusReader",
                    "input_types": {
                        "required": {"sdk": ["ScsServoSDK", {}]},
                        "optional": {
                            "update_interval": ["FLOAT", {"default": 0.1, "min": 0.01, "max": 5.0}]
                        }
                    },
                    "return_types": {
                        "required": {"status_data": ["DICT", {}], "positions": ["DICT", {}]}
                    }
                },
                {
                    "name": "Splitter",
                    "return_types": ["STRING", "INT"]
                }
            ],
            "count": 3
        });

        let catalog = NodeCatalog::from_listing(&listing).unwrap();
        assert_eq!(catalog.len(), 3);

        let math = catalog.get("MathNode").unwrap();
        assert_eq!(math.display_name, "Math");
        assert_eq!(math.outputs[0].name, "output");
        let op = math.input_port("operation").unwrap();
        assert_eq!(op.port_type, PortType::Text);
        assert_eq!(op.choices, vec!["add", "subtract"]);
        assert_eq!(op.default, Some(json!("add")));

        let reader = catalog.get("RobotStatusReader").unwrap();
        assert_eq!(reader.input_port("sdk").unwrap().port_type, PortType::Device);
        let interval = reader.input_port("update_interval").unwrap();
        assert!(!interval.required);
        assert_eq!(interval.max, Some(5.0));
        assert!(reader.output_port("status_data").is_some());

        let splitter = catalog.get("Splitter").unwrap();
        let names: Vec<_> = splitter.outputs.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["output-0", "output-1"]);
    }

    #[test]
    fn test_listing_rejects_non_array() {
        assert!(NodeCatalog::from_listing(&json!({"nodes": 3})).is_err());
    }
}
