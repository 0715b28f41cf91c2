//! Port types and descriptors for the node system.
//!
//! Each node kind declares its ports (inputs/outputs) as `PortDescriptor`s.
//! The graph uses these to validate edge connections and to decide how an
//! input is fed (from an edge or from a stored literal).

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// The type of data flowing through a port.
///
/// Serialized as the executor's type string (`"STRING"`, `"DICT"`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PortType {
    Text,
    Integer,
    Float,
    Boolean,
    /// Structured key/value data.
    Map,
    /// Handle to a connected robot / servo bus.
    Device,
    Image,
    Camera,
    /// Any other executor-declared handle type, compared by name.
    Opaque(String),
    /// Matches anything in either direction.
    Any,
}

impl PortType {
    /// Parse an executor type string. Unknown names become `Opaque`.
    pub fn parse(name: &str) -> Self {
        match name.trim().to_ascii_uppercase().as_str() {
            "STRING" | "TEXT" => PortType::Text,
            "INT" | "INTEGER" => PortType::Integer,
            "FLOAT" | "NUMBER" => PortType::Float,
            "BOOLEAN" | "BOOL" => PortType::Boolean,
            "DICT" | "MAP" | "JSON" => PortType::Map,
            "DEVICE" | "ROBOT" | "SCSSERVOSDK" => PortType::Device,
            "IMAGE" => PortType::Image,
            "CAMERA" => PortType::Camera,
            "*" | "ANY" => PortType::Any,
            _ => PortType::Opaque(name.trim().to_string()),
        }
    }

    /// The canonical type string sent to the executor.
    pub fn wire_name(&self) -> &str {
        match self {
            PortType::Text => "STRING",
            PortType::Integer => "INT",
            PortType::Float => "FLOAT",
            PortType::Boolean => "BOOLEAN",
            PortType::Map => "DICT",
            PortType::Device => "DEVICE",
            PortType::Image => "IMAGE",
            PortType::Camera => "CAMERA",
            PortType::Opaque(name) => name,
            PortType::Any => "*",
        }
    }

    pub fn is_wildcard(&self) -> bool {
        matches!(self, PortType::Any)
    }

    /// Scalar and camera-like inputs are typed in by hand by default;
    /// structured and handle inputs expect an edge.
    pub fn default_mode(&self) -> InputMode {
        match self {
            PortType::Text
            | PortType::Integer
            | PortType::Float
            | PortType::Boolean
            | PortType::Camera => InputMode::Manual,
            PortType::Map
            | PortType::Device
            | PortType::Image
            | PortType::Opaque(_)
            | PortType::Any => InputMode::Connection,
        }
    }
}

impl fmt::Display for PortType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

impl From<String> for PortType {
    fn from(s: String) -> Self {
        PortType::parse(&s)
    }
}

impl From<PortType> for String {
    fn from(t: PortType) -> Self {
        t.wire_name().to_string()
    }
}

/// Whether a port is an input or output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PortDirection {
    Input,
    Output,
}

impl fmt::Display for PortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PortDirection::Input => f.write_str("input"),
            PortDirection::Output => f.write_str("output"),
        }
    }
}

/// Where an input takes its value from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputMode {
    /// From the edge targeting the input.
    Connection,
    /// From the literal stored on the node.
    Manual,
}

/// Descriptor for a node kind's port.
#[derive(Debug, Clone, PartialEq)]
pub struct PortDescriptor {
    pub name: String,
    pub direction: PortDirection,
    pub port_type: PortType,
    pub required: bool,
    /// Default literal (inputs only).
    pub default: Option<Value>,
    /// Allowed values for a choice input.
    pub choices: Vec<String>,
    /// Numeric hints; displayed, never enforced.
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl PortDescriptor {
    pub fn input(name: impl Into<String>, port_type: PortType) -> Self {
        Self::new(name.into(), PortDirection::Input, port_type)
    }

    pub fn output(name: impl Into<String>, port_type: PortType) -> Self {
        Self::new(name.into(), PortDirection::Output, port_type)
    }

    fn new(name: String, direction: PortDirection, port_type: PortType) -> Self {
        Self {
            name,
            direction,
            port_type,
            required: true,
            default: None,
            choices: Vec::new(),
            min: None,
            max: None,
        }
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn with_choices<I, S>(mut self, choices: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.choices = choices.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_range(mut self, min: f64, max: f64) -> Self {
        self.min = Some(min);
        self.max = Some(max);
        self
    }

    pub fn default_mode(&self) -> InputMode {
        self.port_type.default_mode()
    }
}
