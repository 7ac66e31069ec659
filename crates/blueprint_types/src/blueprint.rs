//! Blueprint assets
//!
//! A [`Blueprint`] is the editable source of truth. The skeleton and generated
//! classes it produces live in the class registry and are only tracked here by
//! handle.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{ClassHandle, DefaultValue, Graph, MemberParent, PinType};

// ─────────────────────────────────────────────────────────────────────────────
// Identity & State
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BlueprintId(pub u32);

impl std::fmt::Display for BlueprintId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "bp#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlueprintType {
    #[default]
    Normal,
    MacroLibrary,
    Interface,
    FunctionLibrary,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlueprintStatus {
    /// Transient state while the asset is first assembled
    BeingCreated,
    UpToDate,
    #[default]
    Dirty,
    Error,
}

/// Re-entrancy state of the compile and regeneration paths
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CompileState {
    #[default]
    Idle,
    Compiling,
    RegeneratingOnLoad,
}

// ─────────────────────────────────────────────────────────────────────────────
// Owned Entities
// ─────────────────────────────────────────────────────────────────────────────

pub const DEFAULT_CATEGORY: &str = "Default";

/// A member or local variable declared by a Blueprint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableDescription {
    pub name: String,
    pub guid: Uuid,
    #[serde(rename = "type")]
    pub var_type: PinType,
    #[serde(default)]
    pub default_value: DefaultValue,
    #[serde(default = "default_category")]
    pub category: String,
    #[serde(default)]
    pub replicated: bool,
}

fn default_category() -> String {
    DEFAULT_CATEGORY.to_string()
}

impl VariableDescription {
    pub fn new(name: impl Into<String>, var_type: PinType) -> Self {
        Self {
            name: name.into(),
            guid: Uuid::new_v4(),
            default_value: DefaultValue::zero_for(&var_type),
            var_type,
            category: default_category(),
            replicated: false,
        }
    }

    pub fn with_default(mut self, value: impl Into<DefaultValue>) -> Self {
        self.default_value = value.into();
        self
    }
}

/// An interface implemented directly by a Blueprint, with the function
/// graphs implementing its function-style members
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterfaceDescription {
    pub interface: ClassHandle,
    #[serde(default)]
    pub graphs: Vec<Graph>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineTemplate {
    pub name: String,
    pub guid: Uuid,
    #[serde(default = "default_timeline_length")]
    pub length: f32,
    #[serde(default)]
    pub tracks: Vec<String>,
}

fn default_timeline_length() -> f32 {
    5.0
}

impl TimelineTemplate {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            guid: Uuid::new_v4(),
            length: default_timeline_length(),
            tracks: Vec::new(),
        }
    }
}

/// A component added by the construction script
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentTemplate {
    pub variable_name: String,
    pub component_class: String,
    pub guid: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    #[serde(default)]
    pub properties: BTreeMap<String, DefaultValue>,
}

impl ComponentTemplate {
    pub fn new(variable_name: impl Into<String>, component_class: impl Into<String>) -> Self {
        Self {
            variable_name: variable_name.into(),
            component_class: component_class.into(),
            guid: Uuid::new_v4(),
            parent: None,
            properties: BTreeMap::new(),
        }
    }
}

/// Other Blueprints and user structs this Blueprint structurally depends on
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyCache {
    pub up_to_date: bool,
    pub blueprints: BTreeSet<BlueprintId>,
    pub structs: BTreeSet<String>,
}

impl DependencyCache {
    pub fn invalidate(&mut self) {
        self.up_to_date = false;
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Blueprint
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Blueprint {
    pub id: BlueprintId,
    pub name: String,
    #[serde(default)]
    pub blueprint_type: BlueprintType,
    pub parent_class: ClassHandle,
    #[serde(default)]
    pub status: BlueprintStatus,

    #[serde(default)]
    pub new_variables: Vec<VariableDescription>,
    #[serde(default)]
    pub function_graphs: Vec<Graph>,
    #[serde(default)]
    pub macro_graphs: Vec<Graph>,
    #[serde(default)]
    pub ubergraph_pages: Vec<Graph>,
    #[serde(default)]
    pub implemented_interfaces: Vec<InterfaceDescription>,
    #[serde(default)]
    pub timelines: Vec<TimelineTemplate>,
    #[serde(default)]
    pub components: Vec<ComponentTemplate>,
    /// Default values this Blueprint sets on inherited properties
    #[serde(default)]
    pub default_overrides: BTreeMap<String, DefaultValue>,

    #[serde(default)]
    pub skeleton_class: Option<ClassHandle>,
    #[serde(default)]
    pub generated_class: Option<ClassHandle>,

    #[serde(skip)]
    pub compile_state: CompileState,
    #[serde(skip)]
    pub has_been_regenerated: bool,
    /// Saved data may still point at the skeleton class
    #[serde(default)]
    pub legacy_need_to_purge_skel_refs: bool,
    #[serde(skip)]
    pub cached_dependencies: DependencyCache,
}

impl Blueprint {
    pub fn new(id: BlueprintId, name: impl Into<String>, parent_class: ClassHandle) -> Self {
        Self {
            id,
            name: name.into(),
            blueprint_type: BlueprintType::Normal,
            parent_class,
            status: BlueprintStatus::BeingCreated,
            new_variables: Vec::new(),
            function_graphs: Vec::new(),
            macro_graphs: Vec::new(),
            ubergraph_pages: vec![Graph::new_ubergraph("EventGraph")],
            implemented_interfaces: Vec::new(),
            timelines: Vec::new(),
            components: Vec::new(),
            default_overrides: BTreeMap::new(),
            skeleton_class: None,
            generated_class: None,
            compile_state: CompileState::Idle,
            has_been_regenerated: false,
            legacy_need_to_purge_skel_refs: false,
            cached_dependencies: DependencyCache::default(),
        }
    }

    pub fn with_type(mut self, blueprint_type: BlueprintType) -> Self {
        self.blueprint_type = blueprint_type;
        if blueprint_type != BlueprintType::Normal {
            self.ubergraph_pages.clear();
        }
        self
    }

    pub fn is_interface(&self) -> bool {
        self.blueprint_type == BlueprintType::Interface
    }

    pub fn is_macro_library(&self) -> bool {
        self.blueprint_type == BlueprintType::MacroLibrary
    }

    /// Name of the fully compiled class
    pub fn generated_class_name(&self) -> String {
        format!("{}_C", self.name)
    }

    pub fn skeleton_class_name(&self) -> String {
        format!("SKEL_{}_C", self.name)
    }

    /// A Blueprint that only overrides defaults and adds no code or members
    pub fn is_data_only(&self) -> bool {
        self.blueprint_type == BlueprintType::Normal
            && self.new_variables.is_empty()
            && self.function_graphs.is_empty()
            && self.macro_graphs.is_empty()
            && self.implemented_interfaces.is_empty()
            && self.timelines.is_empty()
            && self.components.is_empty()
            && self.ubergraph_pages.iter().all(|g| g.nodes.is_empty())
    }

    pub fn find_variable(&self, name: &str) -> Option<&VariableDescription> {
        self.new_variables.iter().find(|v| v.name == name)
    }

    pub fn find_variable_mut(&mut self, name: &str) -> Option<&mut VariableDescription> {
        self.new_variables.iter_mut().find(|v| v.name == name)
    }

    pub fn find_variable_by_guid(&self, guid: Uuid) -> Option<&VariableDescription> {
        self.new_variables.iter().find(|v| v.guid == guid)
    }

    pub fn find_timeline(&self, name: &str) -> Option<&TimelineTemplate> {
        self.timelines.iter().find(|t| t.name == name)
    }

    pub fn find_component(&self, name: &str) -> Option<&ComponentTemplate> {
        self.components.iter().find(|c| c.variable_name == name)
    }

    pub fn find_interface(&self, interface: ClassHandle) -> Option<&InterfaceDescription> {
        self.implemented_interfaces
            .iter()
            .find(|d| d.interface.same_class(&interface))
    }

    /// Every graph the Blueprint owns, interface implementations included
    pub fn all_graphs(&self) -> impl Iterator<Item = &Graph> {
        self.function_graphs
            .iter()
            .chain(&self.macro_graphs)
            .chain(&self.ubergraph_pages)
            .chain(self.implemented_interfaces.iter().flat_map(|d| d.graphs.iter()))
    }

    pub fn all_graphs_mut(&mut self) -> impl Iterator<Item = &mut Graph> {
        self.function_graphs
            .iter_mut()
            .chain(self.macro_graphs.iter_mut())
            .chain(self.ubergraph_pages.iter_mut())
            .chain(
                self.implemented_interfaces
                    .iter_mut()
                    .flat_map(|d| d.graphs.iter_mut()),
            )
    }

    pub fn find_graph(&self, name: &str) -> Option<&Graph> {
        self.all_graphs().find(|g| g.name == name)
    }

    pub fn find_graph_mut(&mut self, name: &str) -> Option<&mut Graph> {
        self.all_graphs_mut().find(|g| g.name == name)
    }

    /// Visit every class handle the Blueprint stores: parent, interfaces,
    /// generated classes, explicit node references and class-valued defaults
    pub fn visit_classes_mut(&mut self, f: &mut dyn FnMut(&mut ClassHandle)) {
        f(&mut self.parent_class);
        for class in [&mut self.skeleton_class, &mut self.generated_class].into_iter().flatten() {
            f(class);
        }
        for desc in &mut self.implemented_interfaces {
            f(&mut desc.interface);
        }
        for var in &mut self.new_variables {
            var.default_value.visit_classes_mut(f);
        }
        for value in self.default_overrides.values_mut() {
            value.visit_classes_mut(f);
        }
        for component in &mut self.components {
            for value in component.properties.values_mut() {
                value.visit_classes_mut(f);
            }
        }
        for graph in self.all_graphs_mut() {
            for var in &mut graph.local_variables {
                var.default_value.visit_classes_mut(f);
            }
            for node in &mut graph.nodes {
                if let Some(reference) = node.function_reference_mut() {
                    if let MemberParent::Class { class } = &mut reference.parent {
                        f(class);
                    }
                }
                if let Some(reference) = node.variable_reference_mut() {
                    if let MemberParent::Class { class } = &mut reference.parent {
                        f(class);
                    }
                }
            }
        }
    }

    /// Remove a graph by name from whichever list holds it
    pub fn take_graph(&mut self, name: &str) -> Option<Graph> {
        let lists = [
            &mut self.function_graphs,
            &mut self.macro_graphs,
            &mut self.ubergraph_pages,
        ];
        for list in lists {
            if let Some(index) = list.iter().position(|g| g.name == name) {
                return Some(list.remove(index));
            }
        }
        for desc in &mut self.implemented_interfaces {
            if let Some(index) = desc.graphs.iter().position(|g| g.name == name) {
                return Some(desc.graphs.remove(index));
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Node;

    fn blueprint() -> Blueprint {
        Blueprint::new(BlueprintId(1), "BP_Door", ClassHandle::new(0, 0))
    }

    #[test]
    fn test_new_blueprint_is_data_only() {
        let mut bp = blueprint();
        assert_eq!(bp.status, BlueprintStatus::BeingCreated);
        assert!(bp.is_data_only());

        bp.ubergraph_pages[0].add_node(Node::custom_event("e", "Open"));
        assert!(!bp.is_data_only());
    }

    #[test]
    fn test_class_names() {
        let bp = blueprint();
        assert_eq!(bp.generated_class_name(), "BP_Door_C");
        assert_eq!(bp.skeleton_class_name(), "SKEL_BP_Door_C");
    }

    #[test]
    fn test_graph_lookup_spans_interfaces() {
        let mut bp = blueprint();
        bp.function_graphs.push(Graph::new_function("Open"));
        bp.implemented_interfaces.push(InterfaceDescription {
            interface: ClassHandle::new(5, 0),
            graphs: vec![Graph::new_function("CanUse")],
        });
        assert!(bp.find_graph("CanUse").is_some());
        assert_eq!(bp.all_graphs().count(), 3);

        let taken = bp.take_graph("CanUse").unwrap();
        assert_eq!(taken.name, "CanUse");
        assert!(bp.implemented_interfaces[0].graphs.is_empty());
        assert!(bp.take_graph("Missing").is_none());
    }

    #[test]
    fn test_visit_classes_covers_references() {
        let mut bp = blueprint();
        bp.implemented_interfaces.push(InterfaceDescription {
            interface: ClassHandle::new(5, 0),
            graphs: Vec::new(),
        });
        bp.default_overrides.insert("Spawn".into(), ClassHandle::new(6, 0).into());
        bp.ubergraph_pages[0].add_node(Node::variable_get(
            "get",
            crate::MemberReference::external(ClassHandle::new(7, 0), "Health"),
            PinType::Integer,
        ));

        let mut seen = Vec::new();
        bp.visit_classes_mut(&mut |h| {
            seen.push(h.slot);
            h.generation = 1;
        });
        assert_eq!(seen, vec![0, 5, 6, 7]);
        assert_eq!(bp.parent_class, ClassHandle::new(0, 1));
        assert_eq!(bp.default_overrides["Spawn"], ClassHandle::new(6, 1).into());
    }

    #[test]
    fn test_variable_defaults() {
        let var = VariableDescription::new("Score", PinType::Integer);
        assert_eq!(var.default_value, DefaultValue::Int(0));
        assert_eq!(var.category, DEFAULT_CATEGORY);
        let var = var.with_default(10);
        assert_eq!(var.default_value, DefaultValue::Int(10));
    }
}
