//! Reflection model: classes, properties, functions and the class registry
//!
//! Classes are never mutated in place by a recompile. Every compile installs a
//! new generation of the class in its registry slot and retires the old one.
//! A [`ClassHandle`] names one exact generation; [`ClassRegistry::most_up_to_date`]
//! is the single redirect from any handle to the authoritative version.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{BlueprintId, DefaultValue, FunctionParam, PinType, params_compatible};

// ─────────────────────────────────────────────────────────────────────────────
// Class Handles
// ─────────────────────────────────────────────────────────────────────────────

/// Versioned handle to one generation of a class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ClassHandle {
    /// Stable slot shared by every generation of the class
    pub slot: u32,
    /// Generation within the slot; bumped on every reinstancing
    pub generation: u32,
}

impl ClassHandle {
    pub const fn new(slot: u32, generation: u32) -> Self {
        Self { slot, generation }
    }

    /// Whether both handles name generations of the same class
    pub fn same_class(&self, other: &ClassHandle) -> bool {
        self.slot == other.slot
    }
}

impl std::fmt::Display for ClassHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "class#{}.{}", self.slot, self.generation)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Fields
// ─────────────────────────────────────────────────────────────────────────────

/// A reflected property
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    pub name: String,
    /// Stable id for Blueprint-declared variables
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guid: Option<Uuid>,
    #[serde(rename = "type")]
    pub pin_type: PinType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default)]
    pub replicated: bool,
    #[serde(default)]
    pub read_only: bool,
}

impl Property {
    pub fn new(name: impl Into<String>, pin_type: PinType) -> Self {
        Self {
            name: name.into(),
            guid: None,
            pin_type,
            category: None,
            replicated: false,
            read_only: false,
        }
    }

    pub fn with_guid(mut self, guid: Uuid) -> Self {
        self.guid = Some(guid);
        self
    }
}

/// Function flags relevant to graph conformance
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionFlags {
    /// Can be overridden by a Blueprint (implementable / native event)
    #[serde(default)]
    pub blueprint_event: bool,
    #[serde(default)]
    pub blueprint_callable: bool,
    #[serde(default)]
    pub is_const: bool,
    #[serde(default)]
    pub pure: bool,
    /// Must be implemented as a function graph even without outputs
    #[serde(default)]
    pub force_as_function: bool,
    /// Declared by a custom event node
    #[serde(default)]
    pub custom_event: bool,
}

/// A reflected function
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Function {
    pub name: String,
    /// Stable id; for Blueprint functions this is the defining graph's guid
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guid: Option<Uuid>,
    #[serde(default)]
    pub inputs: Vec<FunctionParam>,
    #[serde(default)]
    pub outputs: Vec<FunctionParam>,
    #[serde(default)]
    pub flags: FunctionFlags,
}

impl Function {
    /// A callable, non-overridable function
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            guid: None,
            inputs: Vec::new(),
            outputs: Vec::new(),
            flags: FunctionFlags {
                blueprint_callable: true,
                ..Default::default()
            },
        }
    }

    /// A function a Blueprint may override
    pub fn overridable(name: impl Into<String>) -> Self {
        let mut func = Self::new(name);
        func.flags.blueprint_event = true;
        func
    }

    pub fn with_input(mut self, name: &str, ty: PinType) -> Self {
        self.inputs.push(FunctionParam::new(name, ty));
        self
    }

    pub fn with_output(mut self, name: &str, ty: PinType) -> Self {
        self.outputs.push(FunctionParam::new(name, ty));
        self
    }

    pub fn with_guid(mut self, guid: Uuid) -> Self {
        self.guid = Some(guid);
        self
    }

    pub fn as_const(mut self) -> Self {
        self.flags.is_const = true;
        self
    }

    /// Whether an override of this function may be placed as an event node.
    ///
    /// Events cannot return values, and const or force-as-function members
    /// always need a function graph.
    pub fn can_be_placed_as_event(&self) -> bool {
        self.flags.blueprint_event
            && self.outputs.is_empty()
            && !self.flags.is_const
            && !self.flags.force_as_function
    }

    /// Whether an override of this function must be a function graph
    pub fn must_be_implemented_as_function(&self) -> bool {
        self.flags.blueprint_event && !self.can_be_placed_as_event()
    }

    /// Whether the parameter lists of both functions line up
    pub fn signature_matches(&self, other: &Function) -> bool {
        params_compatible(&self.inputs, &other.inputs) && params_compatible(&self.outputs, &other.outputs)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Default Objects
// ─────────────────────────────────────────────────────────────────────────────

/// A named subobject owned by a default object (component templates)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Subobject {
    pub name: String,
    pub class_name: String,
    #[serde(default)]
    pub properties: BTreeMap<String, DefaultValue>,
}

/// The class default object
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DefaultObject {
    #[serde(default)]
    pub properties: BTreeMap<String, DefaultValue>,
    /// Properties whose value was set on this class rather than inherited
    #[serde(default)]
    pub overridden: BTreeSet<String>,
    #[serde(default)]
    pub subobjects: Vec<Subobject>,
}

impl DefaultObject {
    pub fn find_subobject(&self, name: &str) -> Option<&Subobject> {
        self.subobjects.iter().find(|s| s.name == name)
    }

    pub fn find_subobject_mut(&mut self, name: &str) -> Option<&mut Subobject> {
        self.subobjects.iter_mut().find(|s| s.name == name)
    }

    /// Visit every class handle held by this object or its subobjects
    pub fn visit_classes_mut(&mut self, f: &mut dyn FnMut(&mut ClassHandle)) {
        for value in self.properties.values_mut() {
            value.visit_classes_mut(f);
        }
        for sub in &mut self.subobjects {
            for value in sub.properties.values_mut() {
                value.visit_classes_mut(f);
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Classes
// ─────────────────────────────────────────────────────────────────────────────

/// Where a class came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClassKind {
    /// Reflected from native code
    Native,
    /// Structure-only projection of a Blueprint
    Skeleton,
    /// Fully compiled Blueprint class
    Generated,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassFlags {
    #[serde(default)]
    pub interface: bool,
    #[serde(default)]
    pub abstract_class: bool,
    /// Set on retired generations
    #[serde(default)]
    pub newer_version_exists: bool,
}

/// Editor-facing class metadata inherited by Blueprint subclasses
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClassMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default)]
    pub hide_categories: Vec<String>,
    #[serde(default)]
    pub replicates: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Class {
    pub name: String,
    pub kind: ClassKind,
    #[serde(default)]
    pub super_class: Option<ClassHandle>,
    #[serde(default)]
    pub interfaces: Vec<ClassHandle>,
    #[serde(default)]
    pub flags: ClassFlags,
    #[serde(default)]
    pub metadata: ClassMetadata,
    #[serde(default)]
    pub properties: Vec<Property>,
    #[serde(default)]
    pub functions: Vec<Function>,
    /// Blueprint this class was compiled from
    #[serde(default)]
    pub generated_by: Option<BlueprintId>,
    #[serde(default)]
    pub default_object: Option<DefaultObject>,
    /// Persistent frame of the compiled event graph
    #[serde(default)]
    pub uber_graph_frame: Option<String>,
}

impl Class {
    pub fn native(name: impl Into<String>, super_class: Option<ClassHandle>) -> Self {
        Self {
            name: name.into(),
            kind: ClassKind::Native,
            super_class,
            interfaces: Vec::new(),
            flags: ClassFlags::default(),
            metadata: ClassMetadata::default(),
            properties: Vec::new(),
            functions: Vec::new(),
            generated_by: None,
            default_object: Some(DefaultObject::default()),
            uber_graph_frame: None,
        }
    }

    pub fn interface(name: impl Into<String>) -> Self {
        let mut class = Self::native(name, None);
        class.flags.interface = true;
        class.default_object = None;
        class
    }

    pub fn with_function(mut self, function: Function) -> Self {
        self.functions.push(function);
        self
    }

    pub fn with_property(mut self, property: Property) -> Self {
        self.properties.push(property);
        self
    }

    pub fn with_interface(mut self, interface: ClassHandle) -> Self {
        self.interfaces.push(interface);
        self
    }

    pub fn is_interface(&self) -> bool {
        self.flags.interface
    }

    pub fn find_own_function(&self, name: &str) -> Option<&Function> {
        self.functions.iter().find(|f| f.name == name)
    }

    pub fn find_own_property(&self, name: &str) -> Option<&Property> {
        self.properties.iter().find(|p| p.name == name)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Class Registry Error
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, thiserror::Error)]
pub enum ClassRegistryError {
    #[error("Class already exists: {0}")]
    ClassAlreadyExists(String),
    #[error("Class not found: {0}")]
    ClassNotFound(String),
}

// ─────────────────────────────────────────────────────────────────────────────
// Class Registry
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug)]
struct ClassSlot {
    name: String,
    generation: u32,
    current: Option<Class>,
    /// Superseded generations kept alive until defaults are copied forward
    retired: Vec<(u32, Class)>,
}

/// Every loaded class, native and Blueprint-generated, with version history
#[derive(Debug, Default)]
pub struct ClassRegistry {
    slots: Vec<ClassSlot>,
    by_name: HashMap<String, u32>,
    /// (class name, old field name) -> new field name
    field_redirects: HashMap<(String, String), String>,
}

impl ClassRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a brand new class. Fails if the name is taken.
    pub fn register(&mut self, class: Class) -> Result<ClassHandle, ClassRegistryError> {
        if self.by_name.contains_key(&class.name) {
            return Err(ClassRegistryError::ClassAlreadyExists(class.name));
        }
        Ok(self.push_slot(class))
    }

    /// Install a class, superseding any live class of the same name.
    ///
    /// The previous generation is retired (flagged `newer_version_exists`) and
    /// stays readable through its old handle until [`Self::release_retired`].
    pub fn install(&mut self, class: Class) -> ClassHandle {
        let Some(&slot_index) = self.by_name.get(&class.name) else {
            return self.push_slot(class);
        };
        let slot = &mut self.slots[slot_index as usize];
        if let Some(mut previous) = slot.current.take() {
            previous.flags.newer_version_exists = true;
            slot.retired.push((slot.generation, previous));
        }
        slot.generation += 1;
        slot.current = Some(class);
        ClassHandle::new(slot_index, slot.generation)
    }

    fn push_slot(&mut self, class: Class) -> ClassHandle {
        let slot_index = self.slots.len() as u32;
        self.by_name.insert(class.name.clone(), slot_index);
        self.slots.push(ClassSlot {
            name: class.name.clone(),
            generation: 0,
            current: Some(class),
            retired: Vec::new(),
        });
        ClassHandle::new(slot_index, 0)
    }

    /// Exact generation named by the handle, if still alive
    pub fn get(&self, handle: ClassHandle) -> Option<&Class> {
        let slot = self.slots.get(handle.slot as usize)?;
        if handle.generation == slot.generation {
            slot.current.as_ref()
        } else {
            slot.retired
                .iter()
                .find(|(generation, _)| *generation == handle.generation)
                .map(|(_, class)| class)
        }
    }

    pub fn get_mut(&mut self, handle: ClassHandle) -> Option<&mut Class> {
        let slot = self.slots.get_mut(handle.slot as usize)?;
        if handle.generation == slot.generation {
            slot.current.as_mut()
        } else {
            slot.retired
                .iter_mut()
                .find(|(generation, _)| *generation == handle.generation)
                .map(|(_, class)| class)
        }
    }

    /// Current generation of the handle's class
    pub fn current(&self, handle: ClassHandle) -> Option<&Class> {
        self.slots.get(handle.slot as usize)?.current.as_ref()
    }

    /// Exact generation if alive, otherwise the current one
    pub fn resolve(&self, handle: ClassHandle) -> Option<&Class> {
        self.get(handle).or_else(|| self.current(handle))
    }

    /// Redirect any handle to the authoritative generation of its class
    pub fn most_up_to_date(&self, handle: ClassHandle) -> ClassHandle {
        match self.slots.get(handle.slot as usize) {
            Some(slot) => ClassHandle::new(handle.slot, slot.generation),
            None => handle,
        }
    }

    /// Whether a newer generation of this class exists
    pub fn is_stale(&self, handle: ClassHandle) -> bool {
        self.most_up_to_date(handle) != handle
    }

    /// Whether the class still exists (in any generation)
    pub fn contains(&self, handle: ClassHandle) -> bool {
        self.current(handle).is_some()
    }

    pub fn find_by_name(&self, name: &str) -> Option<ClassHandle> {
        let slot = *self.by_name.get(name)?;
        let handle = ClassHandle::new(slot, self.slots[slot as usize].generation);
        self.contains(handle).then_some(handle)
    }

    pub fn name_of(&self, handle: ClassHandle) -> Option<&str> {
        self.slots.get(handle.slot as usize).map(|s| s.name.as_str())
    }

    /// Drop every retired generation of the class. Returns how many were freed.
    pub fn release_retired(&mut self, handle: ClassHandle) -> usize {
        match self.slots.get_mut(handle.slot as usize) {
            Some(slot) => std::mem::take(&mut slot.retired).len(),
            None => 0,
        }
    }

    pub fn retired_count(&self, handle: ClassHandle) -> usize {
        self.slots
            .get(handle.slot as usize)
            .map_or(0, |s| s.retired.len())
    }

    /// Remove the class entirely; its name becomes free again
    pub fn remove(&mut self, handle: ClassHandle) -> Option<Class> {
        let slot = self.slots.get_mut(handle.slot as usize)?;
        slot.retired.clear();
        let removed = slot.current.take()?;
        self.by_name.remove(&removed.name);
        Some(removed)
    }

    /// Every live class at its current generation
    pub fn iter(&self) -> impl Iterator<Item = (ClassHandle, &Class)> {
        self.slots.iter().enumerate().filter_map(|(i, slot)| {
            slot.current
                .as_ref()
                .map(|class| (ClassHandle::new(i as u32, slot.generation), class))
        })
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Hierarchy Queries
    // ─────────────────────────────────────────────────────────────────────────

    /// The class followed by its ancestors, using stored super handles
    pub fn super_chain(&self, handle: ClassHandle) -> Vec<ClassHandle> {
        let mut chain = Vec::new();
        let mut cursor = Some(handle);
        while let Some(h) = cursor {
            if chain.iter().any(|c: &ClassHandle| c.same_class(&h)) || chain.len() > self.slots.len() {
                break;
            }
            chain.push(h);
            cursor = self.resolve(h).and_then(|c| c.super_class);
        }
        chain
    }

    /// Number of ancestors above the class
    pub fn depth(&self, handle: ClassHandle) -> usize {
        self.super_chain(handle).len().saturating_sub(1)
    }

    /// Whether `child` is `parent` or derives from it (any generation)
    pub fn is_child_of(&self, child: ClassHandle, parent: ClassHandle) -> bool {
        self.super_chain(child).iter().any(|h| h.same_class(&parent))
    }

    pub fn implements_interface(&self, handle: ClassHandle, interface: ClassHandle) -> bool {
        self.super_chain(handle).into_iter().any(|h| {
            self.resolve(h).is_some_and(|class| {
                class
                    .interfaces
                    .iter()
                    .any(|i| self.is_child_of(*i, interface))
            })
        })
    }

    /// Live classes whose super class is (any generation of) `handle`
    pub fn direct_subclasses(&self, handle: ClassHandle) -> Vec<ClassHandle> {
        self.iter()
            .filter(|(_, class)| class.super_class.is_some_and(|s| s.same_class(&handle)))
            .map(|(h, _)| h)
            .collect()
    }

    pub fn find_function(&self, handle: ClassHandle, name: &str) -> Option<(ClassHandle, &Function)> {
        self.super_chain(handle).into_iter().find_map(|h| {
            self.resolve(h)
                .and_then(|class| class.find_own_function(name))
                .map(|f| (h, f))
        })
    }

    pub fn find_function_by_guid(&self, handle: ClassHandle, guid: Uuid) -> Option<(ClassHandle, &Function)> {
        self.super_chain(handle).into_iter().find_map(|h| {
            self.resolve(h)
                .and_then(|class| class.functions.iter().find(|f| f.guid == Some(guid)))
                .map(|f| (h, f))
        })
    }

    pub fn find_property(&self, handle: ClassHandle, name: &str) -> Option<(ClassHandle, &Property)> {
        self.super_chain(handle).into_iter().find_map(|h| {
            self.resolve(h)
                .and_then(|class| class.find_own_property(name))
                .map(|p| (h, p))
        })
    }

    pub fn find_property_by_guid(&self, handle: ClassHandle, guid: Uuid) -> Option<(ClassHandle, &Property)> {
        self.super_chain(handle).into_iter().find_map(|h| {
            self.resolve(h)
                .and_then(|class| class.properties.iter().find(|p| p.guid == Some(guid)))
                .map(|p| (h, p))
        })
    }

    /// Functions visible on the class, nearest declaration first, one per name
    pub fn all_functions(&self, handle: ClassHandle) -> Vec<(ClassHandle, &Function)> {
        let mut seen = BTreeSet::new();
        let mut out = Vec::new();
        for h in self.super_chain(handle) {
            let Some(class) = self.resolve(h) else { continue };
            for func in &class.functions {
                if seen.insert(func.name.as_str()) {
                    out.push((h, func));
                }
            }
        }
        out
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Field Redirects
    // ─────────────────────────────────────────────────────────────────────────

    /// Record that `old_name` on `class_name` is now called `new_name`
    pub fn add_field_redirect(&mut self, class_name: &str, old_name: &str, new_name: &str) {
        self.field_redirects.insert(
            (class_name.to_string(), old_name.to_string()),
            new_name.to_string(),
        );
    }

    /// Follow the redirect table for a field renamed on a class
    pub fn find_remapped_field(&self, class_name: &str, field_name: &str) -> Option<String> {
        let mut current = field_name.to_string();
        let mut hops = 0;
        while let Some(next) = self
            .field_redirects
            .get(&(class_name.to_string(), current.clone()))
        {
            current = next.clone();
            hops += 1;
            if hops > self.field_redirects.len() {
                break;
            }
        }
        (hops > 0).then_some(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn actor_registry() -> (ClassRegistry, ClassHandle, ClassHandle) {
        let mut registry = ClassRegistry::new();
        let object = registry.register(Class::native("Object", None)).unwrap();
        let actor = registry
            .register(
                Class::native("Actor", Some(object))
                    .with_function(Function::overridable("ReceiveBeginPlay"))
                    .with_property(Property::new("Tags", PinType::array_of(PinType::Name))),
            )
            .unwrap();
        (registry, object, actor)
    }

    #[test]
    fn test_register_duplicate_fails() {
        let (mut registry, _, _) = actor_registry();
        let result = registry.register(Class::native("Actor", None));
        assert!(matches!(result, Err(ClassRegistryError::ClassAlreadyExists(_))));
    }

    #[test]
    fn test_install_supersedes_previous_generation() {
        let (mut registry, _, actor) = actor_registry();
        let first = registry.install(Class::native("BP_C", Some(actor)));
        let second = registry.install(Class::native("BP_C", Some(actor)));

        assert!(first.same_class(&second));
        assert_eq!(second.generation, first.generation + 1);
        assert!(registry.is_stale(first));
        assert_eq!(registry.most_up_to_date(first), second);
        assert!(registry.get(first).unwrap().flags.newer_version_exists);
        assert!(!registry.get(second).unwrap().flags.newer_version_exists);

        assert_eq!(registry.release_retired(second), 1);
        assert!(registry.get(first).is_none());
        // Stale handles still resolve through the redirect
        assert_eq!(registry.resolve(first).unwrap().name, "BP_C");
    }

    #[test]
    fn test_lookup_walks_super_chain() {
        let (mut registry, object, actor) = actor_registry();
        let pawn = registry.register(Class::native("Pawn", Some(actor))).unwrap();

        let (owner, func) = registry.find_function(pawn, "ReceiveBeginPlay").unwrap();
        assert_eq!(owner, actor);
        assert!(func.can_be_placed_as_event());
        assert!(registry.find_property(pawn, "Tags").is_some());
        assert!(registry.is_child_of(pawn, object));
        assert!(!registry.is_child_of(object, pawn));
        assert_eq!(registry.depth(pawn), 2);
        assert_eq!(registry.direct_subclasses(actor), vec![pawn]);
    }

    #[test]
    fn test_interface_queries() {
        let (mut registry, _, actor) = actor_registry();
        let iface = registry.register(Class::interface("Interactable")).unwrap();
        let door = registry
            .register(Class::native("Door", Some(actor)).with_interface(iface))
            .unwrap();
        let big_door = registry.register(Class::native("BigDoor", Some(door))).unwrap();

        assert!(registry.implements_interface(big_door, iface));
        assert!(!registry.implements_interface(actor, iface));
    }

    #[test]
    fn test_event_placement_rules() {
        let event = Function::overridable("OnUse").with_input("Who", PinType::Name);
        assert!(event.can_be_placed_as_event());
        assert!(!event.must_be_implemented_as_function());

        let with_output = Function::overridable("CanUse").with_output("ReturnValue", PinType::Boolean);
        assert!(with_output.must_be_implemented_as_function());

        let constant = Function::overridable("Describe").as_const();
        assert!(constant.must_be_implemented_as_function());

        assert!(!Function::new("Plain").can_be_placed_as_event());
        assert!(!Function::new("Plain").must_be_implemented_as_function());
    }

    #[test]
    fn test_field_redirect_chain() {
        let mut registry = ClassRegistry::new();
        registry.add_field_redirect("BP_C", "Health", "HitPoints");
        registry.add_field_redirect("BP_C", "HitPoints", "Vitality");
        assert_eq!(registry.find_remapped_field("BP_C", "Health").as_deref(), Some("Vitality"));
        assert_eq!(registry.find_remapped_field("BP_C", "Armor"), None);
        assert_eq!(registry.find_remapped_field("Other_C", "Health"), None);
    }

    #[test]
    fn test_remove_frees_name() {
        let (mut registry, _, actor) = actor_registry();
        let bp = registry.install(Class::native("BP_C", Some(actor)));
        assert!(registry.remove(bp).is_some());
        assert!(registry.find_by_name("BP_C").is_none());
        assert!(!registry.contains(bp));
        assert!(registry.register(Class::native("BP_C", Some(actor))).is_ok());
    }
}
