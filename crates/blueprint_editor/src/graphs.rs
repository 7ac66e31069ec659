//! Graph and timeline lifecycle

use blueprint_types::{
    Blueprint, BlueprintId, BlueprintType, ClassHandle, Graph, GraphKind, MemberReference, NodeKind,
    TimelineTemplate,
};
use tracing::{debug, info};

use crate::compiler::is_actor_class;
use crate::editor::EditorContext;
use crate::naming::{is_graph_name_unique, is_name_used, validate_kismet_name};
use crate::variables::rename_variable_references;
use crate::{EditorError, Result};

impl EditorContext {
    // ─────────────────────────────────────────────────────────────────────────
    // Graphs
    // ─────────────────────────────────────────────────────────────────────────

    pub fn add_function_graph(&mut self, id: BlueprintId, name: &str) -> Result<()> {
        self.validate_new_graph_name(id, name)?;
        let blueprint = self.blueprint_mut(id)?;
        if blueprint.is_macro_library() {
            return Err(EditorError::NotAllowed(format!(
                "{} is a macro library and cannot hold functions",
                blueprint.name
            )));
        }
        blueprint.function_graphs.push(Graph::new_function(name));
        info!(blueprint = %id, graph = %name, "added function graph");

        self.validate_blueprint_child_variables(id, name)?;
        self.mark_blueprint_as_structurally_modified(id)
    }

    pub fn add_macro_graph(&mut self, id: BlueprintId, name: &str) -> Result<()> {
        self.validate_new_graph_name(id, name)?;
        let blueprint = self.blueprint_mut(id)?;
        if blueprint.is_interface() {
            return Err(EditorError::NotAllowed(format!(
                "{} is an interface and cannot hold macros",
                blueprint.name
            )));
        }
        blueprint.macro_graphs.push(Graph::new_macro(name));
        info!(blueprint = %id, graph = %name, "added macro graph");

        self.validate_blueprint_child_variables(id, name)?;
        self.mark_blueprint_as_structurally_modified(id)
    }

    /// Remove a function, macro or event graph. Interface implementation
    /// graphs go away with their interface only.
    pub fn remove_graph(&mut self, id: BlueprintId, name: &str) -> Result<()> {
        let blueprint = self.blueprint_mut(id)?;
        if implements_interface_function(blueprint, name) {
            return Err(EditorError::NotAllowed(format!(
                "'{}' implements an interface function; remove the interface instead",
                name
            )));
        }
        let graph = blueprint
            .take_graph(name)
            .ok_or_else(|| EditorError::GraphNotFound(name.to_string()))?;
        info!(blueprint = %id, graph = %name, kind = ?graph.kind, "removed graph");
        self.mark_blueprint_as_structurally_modified(id)
    }

    /// Rename a graph and the calls to it, here, in loaded children and in
    /// every loaded user of a renamed macro
    pub fn rename_graph(&mut self, id: BlueprintId, old_name: &str, new_name: &str) -> Result<()> {
        if old_name == new_name {
            return Ok(());
        }
        validate_kismet_name(new_name, self.settings.max_name_length)?;

        let blueprint = self.blueprint(id)?;
        let kind = blueprint
            .find_graph(old_name)
            .ok_or_else(|| EditorError::GraphNotFound(old_name.to_string()))?
            .kind;
        if implements_interface_function(blueprint, old_name) {
            return Err(EditorError::NotAllowed(format!(
                "'{}' implements an interface function and follows the interface's name",
                old_name
            )));
        }
        let case_only = old_name.eq_ignore_ascii_case(new_name);
        if !case_only
            && (!is_graph_name_unique(blueprint, &self.classes, new_name)
                || is_name_used(blueprint, &self.classes, new_name))
        {
            return Err(EditorError::NameInUse(new_name.to_string()));
        }
        let own_classes = own_classes(blueprint);
        let generated_name = blueprint.generated_class_name();
        let descendants = self.descendants(id);

        rename_graph_in(self.blueprint_mut(id)?, old_name, new_name);

        if kind == GraphKind::Macro {
            for other in self.blueprints.values_mut().filter(|bp| bp.id != id) {
                let count = rename_macro_instances(other, id, old_name, new_name);
                if count > 0 {
                    debug!(blueprint = %other.id, count, "patched macro instances");
                }
            }
        }

        if kind == GraphKind::Function {
            for child in descendants {
                let Some(child_bp) = self.blueprints.get_mut(&child) else {
                    continue;
                };
                // An override follows the function it overrides
                let overrides = child_bp.function_graphs.iter().any(|g| g.name == old_name);
                if overrides {
                    rename_graph_in(child_bp, old_name, new_name);
                }
                let count = rename_function_references(child_bp, old_name, new_name, |r| {
                    r.parent_class()
                        .is_some_and(|c| own_classes.iter().any(|own| own.same_class(&c)))
                        || r.is_self_context()
                });
                if overrides || count > 0 {
                    self.mark_blueprint_as_modified(child)?;
                }
            }
            self.classes.add_field_redirect(&generated_name, old_name, new_name);
        }
        info!(blueprint = %id, from = %old_name, to = %new_name, "renamed graph");

        self.validate_blueprint_child_variables(id, new_name)?;
        self.mark_blueprint_as_structurally_modified(id)
    }

    fn validate_new_graph_name(&self, id: BlueprintId, name: &str) -> Result<()> {
        validate_kismet_name(name, self.settings.max_name_length)?;
        let blueprint = self.blueprint(id)?;
        if !is_graph_name_unique(blueprint, &self.classes, name) || is_name_used(blueprint, &self.classes, name) {
            return Err(EditorError::NameInUse(name.to_string()));
        }
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Timelines
    // ─────────────────────────────────────────────────────────────────────────

    pub fn add_new_timeline(&mut self, id: BlueprintId, name: &str) -> Result<()> {
        let blueprint = self.blueprint(id)?;
        let parent = self.classes.most_up_to_date(blueprint.parent_class);
        if blueprint.blueprint_type != BlueprintType::Normal || !is_actor_class(&self.classes, parent) {
            return Err(EditorError::NotAllowed(format!(
                "{} does not support timelines",
                blueprint.name
            )));
        }
        self.validate_new_member_name(id, name)?;

        self.blueprint_mut(id)?.timelines.push(TimelineTemplate::new(name));
        info!(blueprint = %id, timeline = %name, "added timeline");

        self.validate_blueprint_child_variables(id, name)?;
        self.mark_blueprint_as_structurally_modified(id)
    }

    pub fn remove_timeline(&mut self, id: BlueprintId, name: &str) -> Result<()> {
        let blueprint = self.blueprint_mut(id)?;
        let index = blueprint
            .timelines
            .iter()
            .position(|t| t.name == name)
            .ok_or_else(|| EditorError::TimelineNotFound(name.to_string()))?;
        blueprint.timelines.remove(index);

        for graph in blueprint.all_graphs_mut() {
            let doomed: Vec<String> = graph
                .nodes
                .iter()
                .filter(|n| {
                    matches!(&n.kind, NodeKind::Timeline { timeline_name } if timeline_name == name)
                        || n.references_variable(name, None)
                })
                .map(|n| n.id.clone())
                .collect();
            for node_id in doomed {
                graph.splice_exec_through(&node_id);
            }
        }
        info!(blueprint = %id, timeline = %name, "removed timeline");
        self.mark_blueprint_as_structurally_modified(id)
    }

    pub fn rename_timeline(&mut self, id: BlueprintId, old_name: &str, new_name: &str) -> Result<()> {
        if old_name == new_name {
            return Ok(());
        }
        validate_kismet_name(new_name, self.settings.max_name_length)?;
        let blueprint = self.blueprint(id)?;
        if blueprint.find_timeline(old_name).is_none() {
            return Err(EditorError::TimelineNotFound(old_name.to_string()));
        }
        if !old_name.eq_ignore_ascii_case(new_name) && is_name_used(blueprint, &self.classes, new_name) {
            return Err(EditorError::NameInUse(new_name.to_string()));
        }
        let generated_name = blueprint.generated_class_name();

        rename_timeline_in(self.blueprint_mut(id)?, old_name, new_name);
        self.classes.add_field_redirect(&generated_name, old_name, new_name);
        info!(blueprint = %id, from = %old_name, to = %new_name, "renamed timeline");

        self.validate_blueprint_child_variables(id, new_name)?;
        self.mark_blueprint_as_structurally_modified(id)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────────────

fn own_classes(blueprint: &Blueprint) -> Vec<ClassHandle> {
    [blueprint.skeleton_class, blueprint.generated_class]
        .into_iter()
        .flatten()
        .collect()
}

fn implements_interface_function(blueprint: &Blueprint, graph_name: &str) -> bool {
    blueprint
        .implemented_interfaces
        .iter()
        .any(|d| d.graphs.iter().any(|g| g.name == graph_name))
}

/// Rename one of the Blueprint's own graphs together with the calls and macro
/// instances inside the Blueprint that target it
pub(crate) fn rename_graph_in(blueprint: &mut Blueprint, old_name: &str, new_name: &str) -> bool {
    let id = blueprint.id;
    let Some(graph) = blueprint
        .function_graphs
        .iter_mut()
        .chain(blueprint.macro_graphs.iter_mut())
        .chain(blueprint.ubergraph_pages.iter_mut())
        .find(|g| g.name == old_name)
    else {
        return false;
    };
    let kind = graph.kind;
    graph.rename(new_name);

    match kind {
        GraphKind::Function => {
            rename_function_references(blueprint, old_name, new_name, MemberReference::is_self_context);
        }
        GraphKind::Macro => {
            rename_macro_instances(blueprint, id, old_name, new_name);
        }
        GraphKind::Ubergraph => {}
    }
    true
}

/// Rename a timeline with its nodes and the variable references to it
pub(crate) fn rename_timeline_in(blueprint: &mut Blueprint, old_name: &str, new_name: &str) {
    if let Some(timeline) = blueprint.timelines.iter_mut().find(|t| t.name == old_name) {
        timeline.name = new_name.to_string();
    }
    for graph in blueprint.all_graphs_mut() {
        for node in &mut graph.nodes {
            if let NodeKind::Timeline { timeline_name } = &mut node.kind {
                if timeline_name == old_name {
                    *timeline_name = new_name.to_string();
                }
            }
        }
    }
    rename_variable_references(blueprint, old_name, new_name, MemberReference::is_self_context);
}

/// Rename call, parent-call and event references to `old_name` that satisfy
/// `matches`
fn rename_function_references(
    blueprint: &mut Blueprint,
    old_name: &str,
    new_name: &str,
    matches: impl Fn(&MemberReference) -> bool,
) -> usize {
    let mut count = 0;
    for graph in blueprint.all_graphs_mut() {
        for node in &mut graph.nodes {
            let reference = match &mut node.kind {
                NodeKind::CallFunction { function } | NodeKind::CallParentFunction { function } => function,
                NodeKind::Event { event_reference } => event_reference,
                _ => continue,
            };
            if reference.member_name == old_name && matches(reference) {
                reference.member_name = new_name.to_string();
                count += 1;
            }
        }
    }
    count
}

fn rename_macro_instances(blueprint: &mut Blueprint, owner: BlueprintId, old_name: &str, new_name: &str) -> usize {
    let mut count = 0;
    for graph in blueprint.all_graphs_mut() {
        for node in &mut graph.nodes {
            if let NodeKind::MacroInstance { macro_blueprint, macro_graph } = &mut node.kind {
                if *macro_blueprint == owner && macro_graph == old_name {
                    *macro_graph = new_name.to_string();
                    count += 1;
                }
            }
        }
    }
    count
}
