//! Compiler seam
//!
//! [`KismetCompiler`] is what the editor drives when a Blueprint needs new
//! classes. The editor decides when to compile and hands over conformed graphs;
//! the compiler only turns them into class generations.
//!
//! [`LayoutCompiler`] is the built-in implementation. It projects a Blueprint
//! into a class layout (properties, functions, default object) without
//! lowering any graph to bytecode.

use std::collections::BTreeSet;

use blueprint_types::{
    Blueprint, Class, ClassHandle, ClassKind, ClassRegistry, DefaultObject, DefaultValue, Function,
    FunctionParam, NodeKind, PinDirection, PinType, Property, StructRegistry, Subobject,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::member_resolution::layout_class;
use crate::naming::make_unique_name;
use crate::results_log::CompilerResultsLog;
use crate::{EditorError, Result};

/// Class type every timeline variable holds
pub const TIMELINE_COMPONENT_CLASS: &str = "TimelineComponent";
/// Root component given to actor classes that declare none
pub const DEFAULT_SCENE_ROOT: &str = "DefaultSceneRoot";
pub const SCENE_COMPONENT_CLASS: &str = "SceneComponent";
/// Native class whose subclasses carry a component hierarchy
pub const ACTOR_CLASS: &str = "Actor";

// ─────────────────────────────────────────────────────────────────────────────
// Options
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompileType {
    /// Rebuild the member layout only
    SkeletonOnly,
    /// Skeleton plus the generated class
    Full,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompileOptions {
    pub compile_type: CompileType,
    /// Compile requested by the load pipeline rather than by an edit
    pub is_regenerating_on_load: bool,
}

impl CompileOptions {
    pub fn new(compile_type: CompileType) -> Self {
        Self {
            compile_type,
            is_regenerating_on_load: false,
        }
    }

    pub fn regenerating_on_load(mut self) -> Self {
        self.is_regenerating_on_load = true;
        self
    }
}

/// Shared state a compile reads and writes
pub struct CompileContext<'a> {
    pub classes: &'a mut ClassRegistry,
    pub structs: &'a StructRegistry,
    pub log: &'a mut CompilerResultsLog,
}

// ─────────────────────────────────────────────────────────────────────────────
// Compiler Trait
// ─────────────────────────────────────────────────────────────────────────────

pub trait KismetCompiler {
    /// Install new class generations for the Blueprint
    fn compile_blueprint(
        &mut self,
        blueprint: &mut Blueprint,
        options: &CompileOptions,
        cx: &mut CompileContext<'_>,
    ) -> Result<()>;

    /// Bring variable defaults and existing class properties in line with the
    /// declared variables without a recompile
    fn refresh_variables(&mut self, blueprint: &mut Blueprint, cx: &mut CompileContext<'_>);

    fn remove_blueprint_generated_classes(&mut self, blueprint: &mut Blueprint, classes: &mut ClassRegistry);

    /// Repair structural damage in freshly loaded data
    fn recover_corrupted_blueprint(&mut self, blueprint: &mut Blueprint, log: &mut CompilerResultsLog);
}

// ─────────────────────────────────────────────────────────────────────────────
// Layout Compiler
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct LayoutCompiler;

impl LayoutCompiler {
    pub fn new() -> Self {
        Self
    }

    fn build_class(
        &self,
        blueprint: &Blueprint,
        kind: ClassKind,
        classes: &ClassRegistry,
        structs: &StructRegistry,
        log: &mut CompilerResultsLog,
    ) -> Class {
        let parent = classes.most_up_to_date(blueprint.parent_class);
        let super_class = match kind {
            ClassKind::Skeleton => layout_class(classes, parent),
            _ => parent,
        };
        let name = match kind {
            ClassKind::Skeleton => blueprint.skeleton_class_name(),
            _ => blueprint.generated_class_name(),
        };

        let mut class = Class::native(name, Some(super_class));
        class.kind = kind;
        class.generated_by = Some(blueprint.id);
        class.flags.interface = blueprint.is_interface();
        class.interfaces = blueprint
            .implemented_interfaces
            .iter()
            .map(|d| classes.most_up_to_date(d.interface))
            .collect();
        if let Some(parent_class) = classes.resolve(parent) {
            class.metadata = parent_class.metadata.clone();
        }
        class.metadata.replicates |= blueprint.new_variables.iter().any(|v| v.replicated);

        class.properties = build_properties(blueprint, structs, log);
        class.functions = build_functions(blueprint, classes, parent);

        class.default_object = if blueprint.is_interface() {
            None
        } else {
            Some(build_default_object(blueprint, classes, parent))
        };

        if kind == ClassKind::Generated && blueprint.ubergraph_pages.iter().any(|g| !g.nodes.is_empty()) {
            class.uber_graph_frame = Some(format!("{}_UberGraphFrame", class.name));
        }
        class
    }
}

fn build_properties(blueprint: &Blueprint, structs: &StructRegistry, log: &mut CompilerResultsLog) -> Vec<Property> {
    let mut properties = Vec::new();
    for var in &blueprint.new_variables {
        if let Some(name) = var.var_type.struct_name() {
            if !structs.contains(name) {
                log.warning(
                    blueprint.id,
                    format!("Variable '{}' uses unknown struct {}", var.name, name),
                );
            }
        }
        let mut property = Property::new(var.name.clone(), var.var_type.clone()).with_guid(var.guid);
        property.category = Some(var.category.clone());
        property.replicated = var.replicated;
        properties.push(property);
    }
    for timeline in &blueprint.timelines {
        properties.push(
            Property::new(timeline.name.clone(), PinType::object(TIMELINE_COMPONENT_CLASS)).with_guid(timeline.guid),
        );
    }
    for component in &blueprint.components {
        let mut property = Property::new(
            component.variable_name.clone(),
            PinType::object(component.component_class.clone()),
        )
        .with_guid(component.guid);
        property.read_only = true;
        properties.push(property);
    }
    properties
}

fn build_functions(blueprint: &Blueprint, classes: &ClassRegistry, parent: ClassHandle) -> Vec<Function> {
    let mut functions = Vec::new();

    for graph in &blueprint.function_graphs {
        let mut function = graph.to_function();
        if blueprint.is_interface() {
            function.flags.blueprint_event = true;
        } else if let Some((_, inherited)) = classes.find_function(layout_class(classes, parent), &graph.name) {
            // An override keeps the overridden function's flags
            function.flags = inherited.flags;
            function.flags.is_const = graph.is_const;
        }
        functions.push(function);
    }

    for desc in &blueprint.implemented_interfaces {
        for graph in &desc.graphs {
            let mut function = graph.to_function();
            function.flags.blueprint_event = true;
            functions.push(function);
        }
    }

    for node in blueprint.ubergraph_pages.iter().flat_map(|g| &g.nodes) {
        let NodeKind::CustomEvent { name } = &node.kind else {
            continue;
        };
        let mut function = Function::new(name.clone());
        function.flags.custom_event = true;
        function.inputs = node
            .pins
            .iter()
            .filter(|p| !p.is_exec() && p.direction == PinDirection::Output)
            .map(|p| FunctionParam::new(p.name.clone(), p.pin_type.clone()))
            .collect();
        functions.push(function);
    }

    functions
}

fn build_default_object(blueprint: &Blueprint, classes: &ClassRegistry, parent: ClassHandle) -> DefaultObject {
    let inherited = classes
        .resolve(parent)
        .and_then(|c| c.default_object.clone())
        .unwrap_or_default();

    let mut cdo = DefaultObject {
        properties: inherited.properties,
        overridden: BTreeSet::new(),
        subobjects: inherited.subobjects,
    };
    for var in &blueprint.new_variables {
        cdo.properties.insert(var.name.clone(), var.default_value.clone());
        cdo.overridden.insert(var.name.clone());
    }
    for (name, value) in &blueprint.default_overrides {
        cdo.properties.insert(name.clone(), value.clone());
        cdo.overridden.insert(name.clone());
    }
    for component in &blueprint.components {
        cdo.subobjects.push(Subobject {
            name: component.variable_name.clone(),
            class_name: component.component_class.clone(),
            properties: component.properties.clone(),
        });
    }
    if cdo.subobjects.is_empty() && is_actor_class(classes, parent) {
        cdo.subobjects.push(Subobject {
            name: DEFAULT_SCENE_ROOT.to_string(),
            class_name: SCENE_COMPONENT_CLASS.to_string(),
            ..Default::default()
        });
    }
    cdo
}

/// Whether the class is, or derives from, the native actor class
pub fn is_actor_class(classes: &ClassRegistry, class: ClassHandle) -> bool {
    classes
        .super_chain(class)
        .into_iter()
        .any(|h| classes.name_of(h) == Some(ACTOR_CLASS))
}

impl KismetCompiler for LayoutCompiler {
    fn compile_blueprint(
        &mut self,
        blueprint: &mut Blueprint,
        options: &CompileOptions,
        cx: &mut CompileContext<'_>,
    ) -> Result<()> {
        blueprint.parent_class = cx.classes.most_up_to_date(blueprint.parent_class);
        if !cx.classes.contains(blueprint.parent_class) {
            return Err(EditorError::ClassNotFound(blueprint.parent_class.to_string()));
        }

        let skeleton = self.build_class(blueprint, ClassKind::Skeleton, cx.classes, cx.structs, cx.log);
        let skeleton = cx.classes.install(skeleton);
        blueprint.skeleton_class = Some(skeleton);

        if options.compile_type == CompileType::Full {
            let generated = self.build_class(blueprint, ClassKind::Generated, cx.classes, cx.structs, cx.log);
            let generated = cx.classes.install(generated);
            blueprint.generated_class = Some(generated);
            info!(
                blueprint = %blueprint.name,
                on_load = options.is_regenerating_on_load,
                "compiled {}",
                generated
            );
        } else {
            debug!(blueprint = %blueprint.name, "compiled skeleton {}", skeleton);
        }
        Ok(())
    }

    fn refresh_variables(&mut self, blueprint: &mut Blueprint, cx: &mut CompileContext<'_>) {
        for var in &mut blueprint.new_variables {
            if !var.default_value.fits(&var.var_type) {
                cx.log.warning(
                    blueprint.id,
                    format!(
                        "Default value of '{}' does not fit type {}; reset",
                        var.name, var.var_type
                    ),
                );
                var.default_value = DefaultValue::zero_for(&var.var_type);
            }
        }

        let handles = [blueprint.skeleton_class, blueprint.generated_class];
        for handle in handles.into_iter().flatten() {
            let current = cx.classes.most_up_to_date(handle);
            let Some(class) = cx.classes.get_mut(current) else {
                continue;
            };
            for property in &mut class.properties {
                let declared = property
                    .guid
                    .and_then(|guid| blueprint.new_variables.iter().find(|v| v.guid == guid));
                if let Some(var) = declared {
                    property.name = var.name.clone();
                    property.pin_type = var.var_type.clone();
                }
            }
        }
    }

    fn remove_blueprint_generated_classes(&mut self, blueprint: &mut Blueprint, classes: &mut ClassRegistry) {
        for handle in [blueprint.skeleton_class.take(), blueprint.generated_class.take()]
            .into_iter()
            .flatten()
        {
            if let Some(class) = classes.remove(handle) {
                debug!(blueprint = %blueprint.name, "removed class {}", class.name);
            }
        }
    }

    fn recover_corrupted_blueprint(&mut self, blueprint: &mut Blueprint, log: &mut CompilerResultsLog) {
        let id = blueprint.id;

        let mut seen_graphs: Vec<String> = Vec::new();
        for graph in blueprint.all_graphs_mut() {
            if seen_graphs.iter().any(|n| n.eq_ignore_ascii_case(&graph.name)) {
                let new_name = make_unique_name(&graph.name, |c| {
                    seen_graphs.iter().any(|n| n.eq_ignore_ascii_case(c))
                });
                log.warning(
                    id,
                    format!("Renamed duplicate graph '{}' to '{}'", graph.name, new_name),
                );
                graph.rename(new_name);
            }
            seen_graphs.push(graph.name.clone());

            let mut seen_nodes = BTreeSet::new();
            let before = graph.nodes.len();
            graph.nodes.retain(|n| seen_nodes.insert(n.id.clone()));
            if graph.nodes.len() != before {
                log.warning(
                    id,
                    format!("Dropped {} duplicate nodes from '{}'", before - graph.nodes.len(), graph.name),
                );
            }

            let dropped = graph.drop_dangling_connections();
            if dropped > 0 {
                log.note(id, format!("Dropped {} dangling links in '{}'", dropped, graph.name));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blueprint_types::{
        BlueprintId, ComponentTemplate, Graph, Node, TimelineTemplate, VariableDescription,
    };

    fn registry() -> (ClassRegistry, ClassHandle) {
        let mut classes = ClassRegistry::new();
        let object = classes.register(Class::native("Object", None)).unwrap();
        let mut actor = Class::native(ACTOR_CLASS, Some(object))
            .with_function(Function::overridable("ReceiveBeginPlay"));
        actor.metadata.category = Some("Gameplay".into());
        let actor = classes.register(actor).unwrap();
        (classes, actor)
    }

    fn compile(
        classes: &mut ClassRegistry,
        blueprint: &mut Blueprint,
        compile_type: CompileType,
    ) -> CompilerResultsLog {
        let structs = StructRegistry::new();
        let mut log = CompilerResultsLog::new();
        let mut cx = CompileContext {
            classes,
            structs: &structs,
            log: &mut log,
        };
        LayoutCompiler::new()
            .compile_blueprint(blueprint, &CompileOptions::new(compile_type), &mut cx)
            .unwrap();
        log
    }

    #[test]
    fn test_skeleton_only_leaves_generated_class_alone() {
        let (mut classes, actor) = registry();
        let mut bp = Blueprint::new(BlueprintId(1), "BP_Door", actor);
        bp.new_variables.push(VariableDescription::new("IsOpen", PinType::Boolean));

        compile(&mut classes, &mut bp, CompileType::SkeletonOnly);
        let skeleton = classes.get(bp.skeleton_class.unwrap()).unwrap();
        assert_eq!(skeleton.name, "SKEL_BP_Door_C");
        assert_eq!(skeleton.kind, ClassKind::Skeleton);
        assert!(skeleton.find_own_property("IsOpen").is_some());
        assert!(bp.generated_class.is_none());
    }

    #[test]
    fn test_full_compile_layout() {
        let (mut classes, actor) = registry();
        let mut bp = Blueprint::new(BlueprintId(1), "BP_Door", actor);
        bp.new_variables.push(VariableDescription::new("Speed", PinType::Real).with_default(2.5));
        bp.timelines.push(TimelineTemplate::new("Swing"));
        bp.components.push(ComponentTemplate::new("Frame", "StaticMeshComponent"));
        bp.function_graphs.push(Graph::new_function("ReceiveBeginPlay"));
        bp.function_graphs.push(Graph::new_function("Open"));
        bp.ubergraph_pages[0].add_node(Node::custom_event("knock", "Knock"));

        compile(&mut classes, &mut bp, CompileType::Full);
        let class = classes.get(bp.generated_class.unwrap()).unwrap();

        let names: Vec<&str> = class.properties.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Speed", "Swing", "Frame"]);
        assert_eq!(
            class.find_own_property("Swing").unwrap().pin_type,
            PinType::object(TIMELINE_COMPONENT_CLASS)
        );
        assert!(class.find_own_function("ReceiveBeginPlay").unwrap().flags.blueprint_event);
        assert!(!class.find_own_function("Open").unwrap().flags.blueprint_event);
        assert!(class.find_own_function("Knock").unwrap().flags.custom_event);
        assert_eq!(class.metadata.category.as_deref(), Some("Gameplay"));
        assert_eq!(class.uber_graph_frame.as_deref(), Some("BP_Door_C_UberGraphFrame"));

        let cdo = class.default_object.as_ref().unwrap();
        assert_eq!(cdo.properties.get("Speed"), Some(&DefaultValue::Float(2.5)));
        assert!(cdo.overridden.contains("Speed"));
        assert!(cdo.find_subobject("Frame").is_some());
        assert!(cdo.find_subobject(DEFAULT_SCENE_ROOT).is_none());
    }

    #[test]
    fn test_actor_without_components_gets_scene_root() {
        let (mut classes, actor) = registry();
        let mut bp = Blueprint::new(BlueprintId(1), "BP_Marker", actor);
        compile(&mut classes, &mut bp, CompileType::Full);
        let class = classes.get(bp.generated_class.unwrap()).unwrap();
        assert!(class.default_object.as_ref().unwrap().find_subobject(DEFAULT_SCENE_ROOT).is_some());
        assert!(class.uber_graph_frame.is_none());
    }

    #[test]
    fn test_child_skeleton_derives_from_parent_skeleton() {
        let (mut classes, actor) = registry();
        let mut base = Blueprint::new(BlueprintId(1), "Base", actor);
        compile(&mut classes, &mut base, CompileType::Full);

        let mut child = Blueprint::new(BlueprintId(2), "Child", base.generated_class.unwrap());
        compile(&mut classes, &mut child, CompileType::Full);

        let skeleton = classes.get(child.skeleton_class.unwrap()).unwrap();
        assert_eq!(skeleton.super_class, base.skeleton_class);
        let generated = classes.get(child.generated_class.unwrap()).unwrap();
        assert_eq!(generated.super_class, base.generated_class);
    }

    #[test]
    fn test_recompile_installs_new_generation() {
        let (mut classes, actor) = registry();
        let mut bp = Blueprint::new(BlueprintId(1), "BP_Door", actor);
        compile(&mut classes, &mut bp, CompileType::Full);
        let first = bp.generated_class.unwrap();
        compile(&mut classes, &mut bp, CompileType::Full);
        let second = bp.generated_class.unwrap();
        assert!(first.same_class(&second));
        assert!(classes.is_stale(first));
    }

    #[test]
    fn test_refresh_variables_resets_bad_defaults() {
        let (mut classes, actor) = registry();
        let mut bp = Blueprint::new(BlueprintId(1), "BP_Door", actor);
        bp.new_variables.push(VariableDescription::new("Label", PinType::String));
        compile(&mut classes, &mut bp, CompileType::Full);

        bp.new_variables[0].var_type = PinType::Integer;
        let structs = StructRegistry::new();
        let mut log = CompilerResultsLog::new();
        let mut cx = CompileContext {
            classes: &mut classes,
            structs: &structs,
            log: &mut log,
        };
        LayoutCompiler::new().refresh_variables(&mut bp, &mut cx);

        assert_eq!(bp.new_variables[0].default_value, DefaultValue::Int(0));
        assert_eq!(log.warning_count(), 1);
        let class = classes.get(bp.generated_class.unwrap()).unwrap();
        assert_eq!(class.find_own_property("Label").unwrap().pin_type, PinType::Integer);
    }

    #[test]
    fn test_recover_corrupted_blueprint() {
        let (mut classes, actor) = registry();
        let mut bp = Blueprint::new(BlueprintId(1), "BP_Door", actor);
        bp.function_graphs.push(Graph::new_function("Open"));
        bp.function_graphs.push(Graph::new_function("Open"));
        bp.ubergraph_pages[0].add_node(Node::custom_event("a", "A"));
        bp.ubergraph_pages[0].add_node(Node::custom_event("a", "B"));
        bp.ubergraph_pages[0].connect("a", "then", "gone", "execute");

        let mut log = CompilerResultsLog::new();
        LayoutCompiler::new().recover_corrupted_blueprint(&mut bp, &mut log);

        assert_eq!(bp.function_graphs[1].name, "Open_0");
        assert_eq!(bp.ubergraph_pages[0].nodes.len(), 1);
        assert!(bp.ubergraph_pages[0].connections.is_empty());
        assert_eq!(log.warning_count(), 2);

        compile(&mut classes, &mut bp, CompileType::Full);
        let mut compiler = LayoutCompiler::new();
        compiler.remove_blueprint_generated_classes(&mut bp, &mut classes);
        assert!(bp.generated_class.is_none());
        assert!(classes.find_by_name("BP_Door_C").is_none());
        assert!(classes.find_by_name("SKEL_BP_Door_C").is_none());
    }
}
