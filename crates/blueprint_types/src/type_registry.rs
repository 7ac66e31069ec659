//! Registry of struct types visible to Blueprints
//!
//! Native structs come with the reflection data; user-defined structs are
//! assets of their own and count as dependencies of every Blueprint that uses
//! them, so the dependency walk needs to tell the two apart.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{DefaultValue, PinType};

// ─────────────────────────────────────────────────────────────────────────────
// Struct Source
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum StructSource {
    #[default]
    Native,
    /// Defined by a user struct asset
    UserDefined { path: String },
}

// ─────────────────────────────────────────────────────────────────────────────
// Field Definition
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDef {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: PinType,
    #[serde(default)]
    pub default: DefaultValue,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl FieldDef {
    pub fn new(name: impl Into<String>, field_type: PinType) -> Self {
        Self {
            name: name.into(),
            default: DefaultValue::zero_for(&field_type),
            field_type,
            description: None,
        }
    }

    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }

    pub fn with_default(mut self, default: impl Into<DefaultValue>) -> Self {
        self.default = default.into();
        self
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Struct Definition
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructDef {
    pub name: String,
    #[serde(default = "Uuid::new_v4")]
    pub guid: Uuid,
    #[serde(default)]
    pub fields: Vec<FieldDef>,
    #[serde(default)]
    pub source: StructSource,
}

impl StructDef {
    pub fn native(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            guid: Uuid::new_v4(),
            fields: Vec::new(),
            source: StructSource::Native,
        }
    }

    pub fn user_defined(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            source: StructSource::UserDefined { path: path.into() },
            ..Self::native(name)
        }
    }

    pub fn add_field(mut self, field: FieldDef) -> Self {
        self.fields.push(field);
        self
    }

    pub fn get_field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn is_user_defined(&self) -> bool {
        matches!(self.source, StructSource::UserDefined { .. })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Struct Registry Error
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, thiserror::Error)]
pub enum StructRegistryError {
    #[error("Struct already exists: {0}")]
    StructAlreadyExists(String),
    #[error("Struct not found: {0}")]
    StructNotFound(String),
}

// ─────────────────────────────────────────────────────────────────────────────
// Struct Registry
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct StructRegistry {
    structs: BTreeMap<String, StructDef>,
}

impl StructRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new struct. Fails if the name is taken.
    pub fn register(&mut self, def: StructDef) -> Result<(), StructRegistryError> {
        if self.structs.contains_key(&def.name) {
            return Err(StructRegistryError::StructAlreadyExists(def.name));
        }
        self.structs.insert(def.name.clone(), def);
        Ok(())
    }

    /// Register or replace a struct. Returns true if it replaced one.
    pub fn register_or_update(&mut self, def: StructDef) -> bool {
        self.structs.insert(def.name.clone(), def).is_some()
    }

    pub fn remove(&mut self, name: &str) -> Result<StructDef, StructRegistryError> {
        self.structs
            .remove(name)
            .ok_or_else(|| StructRegistryError::StructNotFound(name.to_string()))
    }

    pub fn get(&self, name: &str) -> Option<&StructDef> {
        self.structs.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.structs.contains_key(name)
    }

    /// Whether the name denotes a struct asset (as opposed to a native struct)
    pub fn is_user_defined(&self, name: &str) -> bool {
        self.get(name).is_some_and(StructDef::is_user_defined)
    }

    pub fn all(&self) -> impl Iterator<Item = &StructDef> {
        self.structs.values()
    }

    pub fn len(&self) -> usize {
        self.structs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.structs.is_empty()
    }
}
