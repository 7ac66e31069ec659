//! Default values stored on variables, class default objects and subobjects
//!
//! Values are plain data with one exception: `Class` holds a versioned class
//! handle, which is what the skeleton-reference purge rewrites.

use serde::{Deserialize, Serialize};

use crate::{ClassHandle, PinType};

// ─────────────────────────────────────────────────────────────────────────────
// Default Value Type
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value")]
pub enum DefaultValue {
    /// Null / unset
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Array(Vec<DefaultValue>),
    /// Reference to a class object
    Class(ClassHandle),
}

impl DefaultValue {
    /// The zero value for a pin type
    pub fn zero_for(pin_type: &PinType) -> Self {
        match pin_type {
            PinType::Boolean => DefaultValue::Bool(false),
            PinType::Byte | PinType::Integer => DefaultValue::Int(0),
            PinType::Real => DefaultValue::Float(0.0),
            PinType::String | PinType::Name => DefaultValue::String(String::new()),
            PinType::Array { .. } => DefaultValue::Array(Vec::new()),
            _ => DefaultValue::Null,
        }
    }

    /// Whether this value can be stored in a slot of the given type
    pub fn fits(&self, pin_type: &PinType) -> bool {
        match (self, pin_type) {
            (DefaultValue::Null, _) => true,
            (_, PinType::Wildcard) => true,
            (DefaultValue::Bool(_), PinType::Boolean) => true,
            (DefaultValue::Int(v), PinType::Byte) => (0..=255).contains(v),
            (DefaultValue::Int(_), PinType::Integer | PinType::Real) => true,
            (DefaultValue::Float(_), PinType::Real) => true,
            (DefaultValue::String(_), PinType::String | PinType::Name) => true,
            (DefaultValue::Array(items), PinType::Array { element }) => {
                items.iter().all(|item| item.fits(element))
            }
            (DefaultValue::Class(_), PinType::Object { .. }) => true,
            _ => false,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, DefaultValue::Null)
    }

    pub fn as_class(&self) -> Option<ClassHandle> {
        match self {
            DefaultValue::Class(h) => Some(*h),
            _ => None,
        }
    }

    /// Visit every class handle in this value, recursing into arrays
    pub fn visit_classes_mut(&mut self, f: &mut dyn FnMut(&mut ClassHandle)) {
        match self {
            DefaultValue::Class(h) => f(h),
            DefaultValue::Array(items) => {
                for item in items {
                    item.visit_classes_mut(f);
                }
            }
            _ => {}
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// From Implementations
// ─────────────────────────────────────────────────────────────────────────────

impl From<bool> for DefaultValue {
    fn from(v: bool) -> Self {
        DefaultValue::Bool(v)
    }
}

impl From<i32> for DefaultValue {
    fn from(v: i32) -> Self {
        DefaultValue::Int(v as i64)
    }
}

impl From<i64> for DefaultValue {
    fn from(v: i64) -> Self {
        DefaultValue::Int(v)
    }
}

impl From<f64> for DefaultValue {
    fn from(v: f64) -> Self {
        DefaultValue::Float(v)
    }
}

impl From<&str> for DefaultValue {
    fn from(v: &str) -> Self {
        DefaultValue::String(v.to_string())
    }
}

impl From<String> for DefaultValue {
    fn from(v: String) -> Self {
        DefaultValue::String(v)
    }
}

impl From<ClassHandle> for DefaultValue {
    fn from(v: ClassHandle) -> Self {
        DefaultValue::Class(v)
    }
}

impl From<serde_json::Value> for DefaultValue {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null | serde_json::Value::Object(_) => DefaultValue::Null,
            serde_json::Value::Bool(b) => DefaultValue::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => DefaultValue::Int(i),
                None => DefaultValue::Float(n.as_f64().unwrap_or_default()),
            },
            serde_json::Value::String(s) => DefaultValue::String(s),
            serde_json::Value::Array(items) => {
                DefaultValue::Array(items.into_iter().map(DefaultValue::from).collect())
            }
        }
    }
}
