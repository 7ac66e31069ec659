//! Project Configuration Types
//!
//! Defines the structure of project files on disk.

use serde::{Deserialize, Serialize};

use blueprint_editor::EditorSettings;
use blueprint_editor::blueprint_types::{Class, ClassHandle, Function, Property};
use visual_logger::FilterSettings;

/// Project manifest (project.toml)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectManifest {
    #[serde(default)]
    pub project: ProjectInfo,
    #[serde(default)]
    pub editor: EditorSettings,
    #[serde(default)]
    pub visual_logger: FilterSettings,
}

/// Project information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectInfo {
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default = "default_version")]
    pub version: String,
    pub description: Option<String>,
}

impl Default for ProjectInfo {
    fn default() -> Self {
        Self {
            name: default_name(),
            version: default_version(),
            description: None,
        }
    }
}

fn default_name() -> String {
    "Untitled".to_string()
}

fn default_version() -> String {
    "1.0.0".to_string()
}

/// Native class definition (classes/*.class.json)
///
/// Classes refer to each other by name; handles are assigned at registration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassDefinition {
    pub name: String,
    #[serde(default)]
    pub super_class: Option<String>,
    #[serde(default)]
    pub interface: bool,
    #[serde(default)]
    pub interfaces: Vec<String>,
    #[serde(default)]
    pub functions: Vec<Function>,
    #[serde(default)]
    pub properties: Vec<Property>,
}

impl ClassDefinition {
    /// Build the class once its super class and interfaces have handles
    pub fn to_class(&self, super_class: Option<ClassHandle>, interfaces: Vec<ClassHandle>) -> Class {
        let mut class = if self.interface {
            Class::interface(&self.name)
        } else {
            Class::native(&self.name, super_class)
        };
        class.interfaces = interfaces;
        class.functions = self.functions.clone();
        class.properties = self.properties.clone();
        class
    }
}
