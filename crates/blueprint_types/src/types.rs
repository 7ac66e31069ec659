// Blueprint Types - Pin and connection primitives shared by every graph
//
// Pins are typed endpoints on nodes. Connections link an output pin to an
// input pin and are stored on the owning graph as "node_id.pin_name" pairs.

use serde::{Deserialize, Serialize};

// ─────────────────────────────────────────────────────────────────────────────
// Pin Types
// ─────────────────────────────────────────────────────────────────────────────

/// Direction of a pin on a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PinDirection {
    Input,
    Output,
}

/// Data types that can flow through pins, variables and function parameters
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "PascalCase")]
pub enum PinType {
    /// Execution flow (no data, just control flow)
    Exec,
    /// Boolean value
    Boolean,
    /// 8-bit unsigned integer
    Byte,
    /// 32-bit signed integer
    Integer,
    /// 64-bit floating point
    Real,
    /// String value
    String,
    /// Interned name
    Name,
    /// Array of a specific type
    Array { element: Box<PinType> },
    /// Struct type, native or user-defined
    Struct { struct_name: String },
    /// Reference to an object of the named class
    Object { class_name: String },
    /// Type not yet determined; accepts anything
    Wildcard,
}

impl PinType {
    /// Check if this type is compatible with another (for connection validation)
    pub fn is_compatible_with(&self, other: &PinType) -> bool {
        match (self, other) {
            // Exact match
            (a, b) if a == b => true,
            // Wildcards accept everything except exec
            (PinType::Wildcard, b) => !b.is_exec(),
            (a, PinType::Wildcard) => !a.is_exec(),
            // Numeric promotion
            (PinType::Real, PinType::Integer)
            | (PinType::Integer, PinType::Real)
            | (PinType::Integer, PinType::Byte)
            | (PinType::Byte, PinType::Integer) => true,
            // Array compatibility
            (PinType::Array { element: a }, PinType::Array { element: b }) => {
                a.is_compatible_with(b)
            }
            _ => false,
        }
    }

    /// Check if this is an execution pin type
    pub fn is_exec(&self) -> bool {
        matches!(self, PinType::Exec)
    }

    /// Check if this is a data pin type
    pub fn is_data(&self) -> bool {
        !self.is_exec()
    }

    /// Struct name referenced by this type, looking through arrays
    pub fn struct_name(&self) -> Option<&str> {
        match self {
            PinType::Struct { struct_name } => Some(struct_name),
            PinType::Array { element } => element.struct_name(),
            _ => None,
        }
    }

    /// Class name referenced by this type, looking through arrays
    pub fn class_name(&self) -> Option<&str> {
        match self {
            PinType::Object { class_name } => Some(class_name),
            PinType::Array { element } => element.class_name(),
            _ => None,
        }
    }

    /// Create an array type
    pub fn array_of(element: PinType) -> Self {
        PinType::Array {
            element: Box::new(element),
        }
    }

    /// Create a struct type
    pub fn structure(struct_name: impl Into<String>) -> Self {
        PinType::Struct {
            struct_name: struct_name.into(),
        }
    }

    /// Create an object reference type
    pub fn object(class_name: impl Into<String>) -> Self {
        PinType::Object {
            class_name: class_name.into(),
        }
    }
}

impl std::fmt::Display for PinType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PinType::Exec => write!(f, "exec"),
            PinType::Boolean => write!(f, "bool"),
            PinType::Byte => write!(f, "byte"),
            PinType::Integer => write!(f, "int"),
            PinType::Real => write!(f, "real"),
            PinType::String => write!(f, "string"),
            PinType::Name => write!(f, "name"),
            PinType::Array { element } => write!(f, "array<{}>", element),
            PinType::Struct { struct_name } => write!(f, "struct {}", struct_name),
            PinType::Object { class_name } => write!(f, "{} ref", class_name),
            PinType::Wildcard => write!(f, "wildcard"),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Pins
// ─────────────────────────────────────────────────────────────────────────────

/// Name of the execution input pin on impure nodes
pub const PN_EXECUTE: &str = "execute";
/// Name of the primary execution output pin
pub const PN_THEN: &str = "then";
/// Name of the data pin on variable get/set nodes
pub const PN_VALUE: &str = "value";

/// A pin instance on a node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pin {
    pub name: String,
    pub direction: PinDirection,
    #[serde(rename = "type")]
    pub pin_type: PinType,
}

impl Pin {
    fn build(name: &str, direction: PinDirection, pin_type: PinType) -> Self {
        Self {
            name: name.to_string(),
            direction,
            pin_type,
        }
    }

    /// The `execute` input every impure node has
    pub fn exec_in() -> Self {
        Self::build(PN_EXECUTE, PinDirection::Input, PinType::Exec)
    }

    pub fn exec_out(name: &str) -> Self {
        Self::build(name, PinDirection::Output, PinType::Exec)
    }

    pub fn data_in(name: &str, pin_type: PinType) -> Self {
        Self::build(name, PinDirection::Input, pin_type)
    }

    pub fn data_out(name: &str, pin_type: PinType) -> Self {
        Self::build(name, PinDirection::Output, pin_type)
    }

    pub fn is_exec(&self) -> bool {
        self.pin_type.is_exec()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Connections
// ─────────────────────────────────────────────────────────────────────────────

/// Output-to-input link, both ends written as `node_id.pin_name`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Connection {
    pub from: String,
    pub to: String,
}

impl Connection {
    pub fn new(from_node: &str, from_pin: &str, to_node: &str, to_pin: &str) -> Self {
        Self {
            from: format!("{}.{}", from_node, from_pin),
            to: format!("{}.{}", to_node, to_pin),
        }
    }

    /// `(node_id, pin_name)` of the output end
    pub fn from_parts(&self) -> Option<(&str, &str)> {
        self.from.split_once('.')
    }

    /// `(node_id, pin_name)` of the input end
    pub fn to_parts(&self) -> Option<(&str, &str)> {
        self.to.split_once('.')
    }

    pub fn touches_node(&self, node_id: &str) -> bool {
        self.from_parts().is_some_and(|(n, _)| n == node_id)
            || self.to_parts().is_some_and(|(n, _)| n == node_id)
    }

    pub fn touches_pin(&self, node_id: &str, pin_name: &str) -> bool {
        self.from_parts() == Some((node_id, pin_name)) || self.to_parts() == Some((node_id, pin_name))
    }
}

/// Position in the visual editor (for UI purposes)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

// ─────────────────────────────────────────────────────────────────────────────
// Function Parameters
// ─────────────────────────────────────────────────────────────────────────────

/// One input or output of a function signature
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionParam {
    pub name: String,
    #[serde(rename = "type")]
    pub param_type: PinType,
}

impl FunctionParam {
    pub fn new(name: impl Into<String>, param_type: PinType) -> Self {
        Self {
            name: name.into(),
            param_type,
        }
    }
}

/// Check that two parameter lists line up name-for-name with compatible types
pub fn params_compatible(expected: &[FunctionParam], found: &[FunctionParam]) -> bool {
    expected.len() == found.len()
        && expected
            .iter()
            .zip(found)
            .all(|(e, f)| e.name == f.name && e.param_type.is_compatible_with(&f.param_type))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pin_type_compatibility() {
        assert!(PinType::Real.is_compatible_with(&PinType::Real));
        assert!(PinType::Real.is_compatible_with(&PinType::Integer));
        assert!(PinType::Wildcard.is_compatible_with(&PinType::String));
        assert!(!PinType::Wildcard.is_compatible_with(&PinType::Exec));
        assert!(!PinType::Boolean.is_compatible_with(&PinType::String));
        assert!(!PinType::object("Actor").is_compatible_with(&PinType::object("Pawn")));
    }

    #[test]
    fn test_connection_ends() {
        let conn = Connection::new("get_hp", "value", "print", "text");
        assert_eq!(conn.from_parts(), Some(("get_hp", "value")));
        assert_eq!(conn.to_parts(), Some(("print", "text")));
        assert!(conn.touches_node("print"));
        assert!(conn.touches_pin("get_hp", "value"));
        assert!(!conn.touches_pin("get_hp", "text"));
    }

    #[test]
    fn test_nested_type_names() {
        let ty = PinType::array_of(PinType::structure("FScore"));
        assert_eq!(ty.struct_name(), Some("FScore"));
        assert_eq!(ty.class_name(), None);
        assert_eq!(ty.to_string(), "array<struct FScore>");
    }

    #[test]
    fn test_pin_type_json() {
        let json = r#"{"type":"Array","element":{"type":"Object","class_name":"Actor"}}"#;
        let ty: PinType = serde_json::from_str(json).unwrap();
        assert_eq!(ty, PinType::array_of(PinType::object("Actor")));
    }
}
