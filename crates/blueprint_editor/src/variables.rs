//! Member and local variable lifecycle
//!
//! Every mutator validates first, then edits the Blueprint, patches or
//! reconstructs the nodes that reference the variable, and finally reports the
//! edit through the structural-change cascade. Renames reach into loaded
//! child Blueprints; type changes ask before breaking anything.

use blueprint_types::{
    Blueprint, BlueprintId, ClassHandle, DefaultValue, GraphKind, MemberReference, PinType,
    VariableDescription,
};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::confirm::ConfirmRequest;
use crate::editor::EditorContext;
use crate::naming::{find_unique_kismet_name, is_name_used, validate_kismet_name};
use crate::reconstruct::refresh_all_nodes;
use crate::results_log::NodeRef;
use crate::{EditorError, Result};

impl EditorContext {
    // ─────────────────────────────────────────────────────────────────────────
    // Member Variables
    // ─────────────────────────────────────────────────────────────────────────

    pub fn add_member_variable(&mut self, id: BlueprintId, name: &str, var_type: PinType) -> Result<()> {
        self.validate_new_member_name(id, name)?;
        self.blueprint_mut(id)?
            .new_variables
            .push(VariableDescription::new(name, var_type));
        info!(blueprint = %id, variable = %name, "added member variable");

        self.validate_blueprint_child_variables(id, name)?;
        self.mark_blueprint_as_structurally_modified(id)
    }

    pub fn remove_member_variable(&mut self, id: BlueprintId, name: &str) -> Result<()> {
        let blueprint = self.blueprint_mut(id)?;
        let index = blueprint
            .new_variables
            .iter()
            .position(|v| v.name == name)
            .ok_or_else(|| EditorError::VariableNotFound(name.to_string()))?;
        blueprint.new_variables.remove(index);
        let removed = remove_variable_nodes(blueprint, name, None);
        info!(blueprint = %id, variable = %name, removed_nodes = removed, "removed member variable");

        self.mark_blueprint_as_structurally_modified(id)
    }

    /// Rename a member variable and every reference to it, here and in loaded
    /// child Blueprints. A redirect is left behind for anything not loaded.
    pub fn rename_member_variable(&mut self, id: BlueprintId, old_name: &str, new_name: &str) -> Result<()> {
        if old_name == new_name {
            return Ok(());
        }
        validate_kismet_name(new_name, self.settings.max_name_length)?;

        let blueprint = self.blueprint(id)?;
        let guid = blueprint
            .find_variable(old_name)
            .ok_or_else(|| EditorError::VariableNotFound(old_name.to_string()))?
            .guid;
        let case_only = old_name.eq_ignore_ascii_case(new_name);
        if !case_only && is_name_used(blueprint, &self.classes, new_name) {
            return Err(EditorError::NameInUse(new_name.to_string()));
        }
        let own_classes: Vec<ClassHandle> = [blueprint.skeleton_class, blueprint.generated_class]
            .into_iter()
            .flatten()
            .collect();
        let class_names = [blueprint.generated_class_name(), blueprint.skeleton_class_name()];
        let descendants = self.descendants(id);

        // Children give up the new name before inherited references move onto it
        self.validate_blueprint_child_variables(id, new_name)?;

        let blueprint = self.blueprint_mut(id)?;
        if let Some(var) = blueprint.find_variable_mut(old_name) {
            var.name = new_name.to_string();
        }
        let mut patched = rename_variable_references(blueprint, old_name, new_name, |r| {
            r.is_self_context() && r.member_guid.is_none_or(|g| g == guid)
        });

        for child in descendants {
            let Some(child_bp) = self.blueprints.get_mut(&child) else {
                continue;
            };
            let shadowed = child_bp.find_variable(old_name).is_some();
            let count = rename_variable_references(child_bp, old_name, new_name, |r| {
                let inherited_self = r.is_self_context() && !shadowed && r.member_guid.is_none_or(|g| g == guid);
                let explicit = r
                    .parent_class()
                    .is_some_and(|c| own_classes.iter().any(|own| own.same_class(&c)));
                inherited_self || explicit
            });
            if count > 0 {
                debug!(blueprint = %child, count, "patched inherited variable references");
                self.mark_blueprint_as_modified(child)?;
            }
            patched += count;
        }

        for class_name in &class_names {
            self.classes.add_field_redirect(class_name, old_name, new_name);
        }
        info!(blueprint = %id, from = %old_name, to = %new_name, patched, "renamed member variable");

        self.mark_blueprint_as_structurally_modified(id)
    }

    /// Change a member variable's type. Nodes that use the variable are
    /// reconstructed, which can break links, so the user is asked first.
    pub fn change_member_variable_type(&mut self, id: BlueprintId, name: &str, new_type: PinType) -> Result<()> {
        let var = self
            .blueprint(id)?
            .find_variable(name)
            .ok_or_else(|| EditorError::VariableNotFound(name.to_string()))?;
        if var.var_type == new_type {
            return Ok(());
        }

        let affected = self.get_nodes_for_variable(id, name)?;
        self.confirm_type_change(name, &new_type, affected.len())?;

        let blueprint = self.blueprint_mut(id)?;
        if let Some(var) = blueprint.find_variable_mut(name) {
            var.var_type = new_type.clone();
            if !var.default_value.fits(&new_type) {
                var.default_value = DefaultValue::zero_for(&new_type);
            }
        }
        info!(blueprint = %id, variable = %name, new_type = %new_type, "changed member variable type");

        self.mark_blueprint_as_structurally_modified(id)?;
        let mut targets = vec![id];
        targets.extend(self.descendants(id));
        self.reconstruct_blueprints(&targets);
        Ok(())
    }

    /// Purely cosmetic: no recompile
    pub fn set_member_variable_category(&mut self, id: BlueprintId, name: &str, category: &str) -> Result<()> {
        let var = self
            .blueprint_mut(id)?
            .find_variable_mut(name)
            .ok_or_else(|| EditorError::VariableNotFound(name.to_string()))?;
        var.category = category.to_string();
        self.mark_blueprint_as_modified(id)
    }

    /// Every get/set node of a member variable, in the Blueprint itself and in
    /// loaded Blueprints that inherit it
    pub fn get_nodes_for_variable(&self, id: BlueprintId, name: &str) -> Result<Vec<NodeRef>> {
        let blueprint = self.blueprint(id)?;
        let own_classes: Vec<ClassHandle> = [blueprint.skeleton_class, blueprint.generated_class]
            .into_iter()
            .flatten()
            .collect();

        let mut out = Vec::new();
        for graph in blueprint.all_graphs() {
            for node in graph.nodes.iter().filter(|n| n.references_variable(name, None)) {
                out.push(NodeRef::new(id, graph.name.clone(), node.id.clone()));
            }
        }

        for child in self.descendants(id) {
            let Some(child_bp) = self.blueprints.get(&child) else {
                continue;
            };
            let shadowed = child_bp.find_variable(name).is_some();
            for graph in child_bp.all_graphs() {
                for node in &graph.nodes {
                    let Some(reference) = node.variable_reference() else {
                        continue;
                    };
                    if reference.member_name != name {
                        continue;
                    }
                    let explicit = reference
                        .parent_class()
                        .is_some_and(|c| own_classes.iter().any(|own| own.same_class(&c)));
                    if explicit || (reference.is_self_context() && !shadowed) {
                        out.push(NodeRef::new(child, graph.name.clone(), node.id.clone()));
                    }
                }
            }
        }
        Ok(out)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Local Variables
    // ─────────────────────────────────────────────────────────────────────────

    pub fn add_local_variable(
        &mut self,
        id: BlueprintId,
        graph_name: &str,
        name: &str,
        var_type: PinType,
    ) -> Result<()> {
        validate_kismet_name(name, self.settings.max_name_length)?;
        let blueprint = self.blueprint(id)?;
        let graph = blueprint
            .find_graph(graph_name)
            .ok_or_else(|| EditorError::GraphNotFound(graph_name.to_string()))?;
        if graph.kind != GraphKind::Function {
            return Err(EditorError::NotAllowed(format!(
                "local variables can only live in function graphs, '{}' is not one",
                graph_name
            )));
        }
        if local_name_taken(blueprint, &self.classes, graph_name, name) {
            return Err(EditorError::NameInUse(name.to_string()));
        }

        if let Some(graph) = self.blueprint_mut(id)?.find_graph_mut(graph_name) {
            graph.local_variables.push(VariableDescription::new(name, var_type));
        }
        debug!(blueprint = %id, graph = %graph_name, variable = %name, "added local variable");
        self.mark_blueprint_as_structurally_modified(id)
    }

    pub fn rename_local_variable(
        &mut self,
        id: BlueprintId,
        graph_name: &str,
        old_name: &str,
        new_name: &str,
    ) -> Result<()> {
        if old_name == new_name {
            return Ok(());
        }
        validate_kismet_name(new_name, self.settings.max_name_length)?;
        let blueprint = self.blueprint(id)?;
        find_local(blueprint, graph_name, old_name)?;
        if !old_name.eq_ignore_ascii_case(new_name) && local_name_taken(blueprint, &self.classes, graph_name, new_name) {
            return Err(EditorError::NameInUse(new_name.to_string()));
        }

        let blueprint = self.blueprint_mut(id)?;
        let Some(graph) = blueprint.find_graph_mut(graph_name) else {
            return Err(EditorError::GraphNotFound(graph_name.to_string()));
        };
        if let Some(var) = graph.local_variables.iter_mut().find(|v| v.name == old_name) {
            var.name = new_name.to_string();
        }
        for node in &mut graph.nodes {
            if node.references_variable(old_name, Some(graph_name)) {
                if let Some(reference) = node.variable_reference_mut() {
                    reference.member_name = new_name.to_string();
                }
            }
        }
        debug!(blueprint = %id, graph = %graph_name, from = %old_name, to = %new_name, "renamed local variable");
        self.mark_blueprint_as_structurally_modified(id)
    }

    pub fn change_local_variable_type(
        &mut self,
        id: BlueprintId,
        graph_name: &str,
        name: &str,
        new_type: PinType,
    ) -> Result<()> {
        let blueprint = self.blueprint(id)?;
        let var = find_local(blueprint, graph_name, name)?;
        if var.var_type == new_type {
            return Ok(());
        }
        let affected = blueprint
            .find_graph(graph_name)
            .map_or(0, |g| g.nodes.iter().filter(|n| n.references_variable(name, Some(graph_name))).count());
        self.confirm_type_change(name, &new_type, affected)?;

        let blueprint = self.blueprint_mut(id)?;
        if let Some(var) = blueprint
            .find_graph_mut(graph_name)
            .and_then(|g| g.local_variables.iter_mut().find(|v| v.name == name))
        {
            var.var_type = new_type.clone();
            if !var.default_value.fits(&new_type) {
                var.default_value = DefaultValue::zero_for(&new_type);
            }
        }

        self.mark_blueprint_as_structurally_modified(id)?;
        self.reconstruct_blueprints(&[id]);
        Ok(())
    }

    pub fn remove_local_variable(&mut self, id: BlueprintId, graph_name: &str, name: &str) -> Result<()> {
        find_local(self.blueprint(id)?, graph_name, name)?;
        let blueprint = self.blueprint_mut(id)?;
        if let Some(graph) = blueprint.find_graph_mut(graph_name) {
            graph.local_variables.retain(|v| v.name != name);
        }
        let removed = remove_variable_nodes(blueprint, name, Some(graph_name));
        debug!(blueprint = %id, graph = %graph_name, variable = %name, removed_nodes = removed, "removed local variable");
        self.mark_blueprint_as_structurally_modified(id)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Shared Checks
    // ─────────────────────────────────────────────────────────────────────────

    pub(crate) fn validate_new_member_name(&self, id: BlueprintId, name: &str) -> Result<()> {
        validate_kismet_name(name, self.settings.max_name_length)?;
        if is_name_used(self.blueprint(id)?, &self.classes, name) {
            return Err(EditorError::NameInUse(name.to_string()));
        }
        Ok(())
    }

    fn confirm_type_change(&mut self, name: &str, new_type: &PinType, affected_nodes: usize) -> Result<()> {
        if affected_nodes == 0 || self.settings.suppress_type_change_confirmation {
            return Ok(());
        }
        let request = ConfirmRequest {
            title: "Change variable type".to_string(),
            message: format!(
                "Changing '{}' to {} reconstructs {} node(s) and may break pin connections. This cannot be undone.",
                name, new_type, affected_nodes
            ),
            affected_nodes,
        };
        if self.prompt.confirm(&request) {
            Ok(())
        } else {
            info!(variable = %name, "type change declined");
            Err(EditorError::Cancelled)
        }
    }

    /// Rebuild the nodes of each Blueprint from the current class layout
    pub(crate) fn reconstruct_blueprints(&mut self, ids: &[BlueprintId]) {
        for id in ids {
            let Some(blueprint) = self.blueprints.get_mut(id) else {
                continue;
            };
            let broken = refresh_all_nodes(blueprint, &self.classes, &mut self.log);
            if broken > 0 {
                self.log.warning(*id, format!("Reconstruction broke {} connection(s)", broken));
            }
        }
    }

    /// Give way to a name just introduced on `id`: any loaded descendant
    /// owning a member, graph, timeline or component of that name has it
    /// renamed. The parent always keeps the name.
    pub fn validate_blueprint_child_variables(&mut self, id: BlueprintId, name: &str) -> Result<()> {
        for child in self.descendants(id) {
            let Some(child_bp) = self.blueprints.get(&child) else {
                continue;
            };
            let Some(kind) = owned_name_kind(child_bp, name) else {
                continue;
            };
            let new_name = find_unique_kismet_name(child_bp, &self.classes, name);
            let parent_name = self.blueprint(id)?.name.clone();

            let Some(child_bp) = self.blueprints.get_mut(&child) else {
                continue;
            };
            let old_name = rename_owned_entity(child_bp, kind, name, &new_name);
            warn!(blueprint = %child, from = %old_name, to = %new_name, "renamed to avoid collision with parent");
            self.log.warning(
                child,
                format!(
                    "'{}' collides with a member of parent {}; renamed to '{}'",
                    old_name, parent_name, new_name
                ),
            );
            self.mark_blueprint_as_modified(child)?;
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────────────

/// Which of a Blueprint's own named entities carries a name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum OwnedName {
    Variable,
    Graph,
    Timeline,
    Component,
}

pub(crate) fn owned_name_kind(blueprint: &Blueprint, name: &str) -> Option<OwnedName> {
    let eq = |other: &str| other.eq_ignore_ascii_case(name);
    if blueprint.new_variables.iter().any(|v| eq(&v.name)) {
        Some(OwnedName::Variable)
    } else if blueprint.function_graphs.iter().chain(&blueprint.macro_graphs).any(|g| eq(&g.name)) {
        Some(OwnedName::Graph)
    } else if blueprint.timelines.iter().any(|t| eq(&t.name)) {
        Some(OwnedName::Timeline)
    } else if blueprint.components.iter().any(|c| eq(&c.variable_name)) {
        Some(OwnedName::Component)
    } else {
        None
    }
}

/// Rename the entity matching `name` case-insensitively, with its self
/// references. Returns the name it had.
fn rename_owned_entity(blueprint: &mut Blueprint, kind: OwnedName, name: &str, new_name: &str) -> String {
    let eq = |other: &str| other.eq_ignore_ascii_case(name);
    let mut old_name = name.to_string();
    match kind {
        OwnedName::Variable => {
            let mut guid = None;
            if let Some(var) = blueprint.new_variables.iter_mut().find(|v| eq(&v.name)) {
                old_name = std::mem::replace(&mut var.name, new_name.to_string());
                guid = Some(var.guid);
            }
            let old = old_name.clone();
            rename_variable_references(blueprint, &old, new_name, |r| owned_self_reference(r, guid));
        }
        OwnedName::Timeline => {
            if let Some(timeline) = blueprint.timelines.iter().find(|t| eq(&t.name)) {
                old_name = timeline.name.clone();
            }
            crate::graphs::rename_timeline_in(blueprint, &old_name.clone(), new_name);
        }
        OwnedName::Component => {
            let mut guid = None;
            if let Some(component) = blueprint.components.iter_mut().find(|c| eq(&c.variable_name)) {
                old_name = std::mem::replace(&mut component.variable_name, new_name.to_string());
                guid = Some(component.guid);
            }
            let old = old_name.clone();
            rename_variable_references(blueprint, &old, new_name, |r| owned_self_reference(r, guid));
        }
        OwnedName::Graph => {
            if let Some(graph) = blueprint
                .function_graphs
                .iter()
                .chain(&blueprint.macro_graphs)
                .find(|g| eq(&g.name))
            {
                old_name = graph.name.clone();
            }
            crate::graphs::rename_graph_in(blueprint, &old_name.clone(), new_name);
        }
    }
    old_name
}

/// A self reference that binds to the entity with `guid`. References without
/// a guid are taken by name.
fn owned_self_reference(reference: &MemberReference, guid: Option<Uuid>) -> bool {
    reference.is_self_context() && (reference.member_guid.is_none() || reference.member_guid == guid)
}

/// Rename get/set references to `old_name` that satisfy `matches`.
/// Returns how many were patched.
pub(crate) fn rename_variable_references(
    blueprint: &mut Blueprint,
    old_name: &str,
    new_name: &str,
    matches: impl Fn(&MemberReference) -> bool,
) -> usize {
    let mut count = 0;
    for graph in blueprint.all_graphs_mut() {
        for node in &mut graph.nodes {
            let Some(reference) = node.variable_reference_mut() else {
                continue;
            };
            if reference.member_name == old_name && matches(reference) {
                reference.member_name = new_name.to_string();
                count += 1;
            }
        }
    }
    count
}

/// Drop every get/set of a variable, keeping exec flow through the gap
fn remove_variable_nodes(blueprint: &mut Blueprint, name: &str, scope: Option<&str>) -> usize {
    let mut removed = 0;
    for graph in blueprint.all_graphs_mut() {
        let ids: Vec<String> = graph
            .nodes
            .iter()
            .filter(|n| n.references_variable(name, scope))
            .map(|n| n.id.clone())
            .collect();
        for node_id in ids {
            if graph.splice_exec_through(&node_id).is_some() {
                removed += 1;
            }
        }
    }
    removed
}

fn find_local<'a>(blueprint: &'a Blueprint, graph_name: &str, name: &str) -> Result<&'a VariableDescription> {
    blueprint
        .find_graph(graph_name)
        .ok_or_else(|| EditorError::GraphNotFound(graph_name.to_string()))?
        .find_local_variable(name)
        .ok_or_else(|| EditorError::VariableNotFound(format!("{}.{}", graph_name, name)))
}

/// Locals share a namespace with everything visible from the Blueprint
fn local_name_taken(
    blueprint: &Blueprint,
    classes: &blueprint_types::ClassRegistry,
    graph_name: &str,
    name: &str,
) -> bool {
    let in_graph = blueprint
        .find_graph(graph_name)
        .is_some_and(|g| g.local_variables.iter().any(|v| v.name.eq_ignore_ascii_case(name)));
    in_graph || is_name_used(blueprint, classes, name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::confirm::{AutoConfirm, ConfirmationPrompt};
    use crate::editor::tests::editor;
    use blueprint_types::{BlueprintType, Graph, Node, PN_EXECUTE, PN_THEN, PN_VALUE, Pin};
    use std::cell::Cell;
    use std::rc::Rc;

    fn door_with_reader() -> (EditorContext, BlueprintId, blueprint_types::ClassHandle) {
        let (mut editor, actor) = editor();
        let id = editor.create_blueprint("BP_Door", actor, BlueprintType::Normal).unwrap();
        editor.add_member_variable(id, "Health", PinType::Real).unwrap();
        let guid = editor.blueprint(id).unwrap().find_variable("Health").unwrap().guid;
        let page = &mut editor.blueprint_mut(id).unwrap().ubergraph_pages[0];
        page.add_node(Node::variable_get("get_health", MemberReference::self_member("Health", Some(guid)), PinType::Real));
        (editor, id, actor)
    }

    #[test]
    fn test_add_rejects_taken_names() {
        let (mut editor, id, _) = door_with_reader();
        assert!(matches!(
            editor.add_member_variable(id, "health", PinType::Integer),
            Err(EditorError::NameInUse(_))
        ));
        assert!(matches!(
            editor.add_member_variable(id, "ReceiveBeginPlay", PinType::Integer),
            Err(EditorError::NameInUse(_))
        ));
        assert!(matches!(
            editor.add_member_variable(id, "Bad Name!", PinType::Integer),
            Err(EditorError::InvalidName { .. })
        ));
    }

    #[test]
    fn test_add_recompiles_skeleton() {
        let (editor, id, _) = door_with_reader();
        let bp = editor.blueprint(id).unwrap();
        let skeleton = bp.skeleton_class.unwrap();
        assert!(editor.classes().find_property(skeleton, "Health").is_some());
        assert_eq!(bp.status, blueprint_types::BlueprintStatus::Dirty);
    }

    #[test]
    fn test_rename_patches_references_and_redirects() {
        let (mut editor, id, _) = door_with_reader();
        editor.rename_member_variable(id, "Health", "Vitality").unwrap();

        let bp = editor.blueprint(id).unwrap();
        assert!(bp.find_variable("Vitality").is_some());
        let node = bp.ubergraph_pages[0].get_node("get_health").unwrap();
        assert_eq!(node.variable_reference().unwrap().member_name, "Vitality");
        assert_eq!(
            editor.classes().find_remapped_field("BP_Door_C", "Health"),
            Some("Vitality".to_string())
        );
    }

    #[test]
    fn test_rename_case_only_is_allowed() {
        let (mut editor, id, _) = door_with_reader();
        editor.rename_member_variable(id, "Health", "health").unwrap();
        assert!(editor.blueprint(id).unwrap().find_variable("health").is_some());
    }

    #[test]
    fn test_rename_reaches_children() {
        let (mut editor, id, _) = door_with_reader();
        let parent_class = editor.blueprint(id).unwrap().generated_class.unwrap();
        let child = editor.create_blueprint("BP_SlidingDoor", parent_class, BlueprintType::Normal).unwrap();
        let page = &mut editor.blueprint_mut(child).unwrap().ubergraph_pages[0];
        page.add_node(Node::variable_get("inherited", MemberReference::self_member("Health", None), PinType::Real));
        page.add_node(Node::variable_get("explicit", MemberReference::external(parent_class, "Health"), PinType::Real));

        assert_eq!(editor.get_nodes_for_variable(id, "Health").unwrap().len(), 3);
        editor.rename_member_variable(id, "Health", "Vitality").unwrap();

        let page = &editor.blueprint(child).unwrap().ubergraph_pages[0];
        for node_id in ["inherited", "explicit"] {
            let reference = page.get_node(node_id).unwrap().variable_reference().unwrap();
            assert_eq!(reference.member_name, "Vitality");
        }
    }

    #[test]
    fn test_rename_onto_child_name_keeps_references_apart() {
        let (mut editor, id, _) = door_with_reader();
        let parent_class = editor.blueprint(id).unwrap().generated_class.unwrap();
        let parent_guid = editor.blueprint(id).unwrap().find_variable("Health").unwrap().guid;
        let child = editor.create_blueprint("BP_SlidingDoor", parent_class, BlueprintType::Normal).unwrap();
        editor.add_member_variable(child, "Vitality", PinType::Integer).unwrap();
        let child_guid = editor.blueprint(child).unwrap().find_variable("Vitality").unwrap().guid;
        let page = &mut editor.blueprint_mut(child).unwrap().ubergraph_pages[0];
        page.add_node(Node::variable_get(
            "inherited",
            MemberReference::self_member("Health", Some(parent_guid)),
            PinType::Real,
        ));
        page.add_node(Node::variable_get("own", MemberReference::self_member("Vitality", Some(child_guid)), PinType::Integer));

        editor.rename_member_variable(id, "Health", "Vitality").unwrap();

        let child_bp = editor.blueprint(child).unwrap();
        assert!(child_bp.find_variable("Vitality_0").is_some());
        let page = &child_bp.ubergraph_pages[0];
        let inherited = page.get_node("inherited").unwrap().variable_reference().unwrap();
        assert_eq!(inherited.member_name, "Vitality");
        assert_eq!(inherited.member_guid, Some(parent_guid));
        let own = page.get_node("own").unwrap().variable_reference().unwrap();
        assert_eq!(own.member_name, "Vitality_0");
    }

    #[derive(Clone, Default)]
    struct CountingPrompt {
        asked: Rc<Cell<usize>>,
        answer: bool,
    }

    impl ConfirmationPrompt for CountingPrompt {
        fn confirm(&mut self, _request: &ConfirmRequest) -> bool {
            self.asked.set(self.asked.get() + 1);
            self.answer
        }
    }

    #[test]
    fn test_declined_type_change_is_a_no_op() {
        let (editor, id, _) = door_with_reader();
        let prompt = CountingPrompt::default();
        let asked = prompt.asked.clone();
        let mut editor = editor.with_prompt(prompt);
        let before = editor.blueprint(id).unwrap().clone();

        let result = editor.change_member_variable_type(id, "Health", PinType::String);
        assert!(matches!(result, Err(EditorError::Cancelled)));
        assert_eq!(asked.get(), 1);
        assert_eq!(editor.blueprint(id).unwrap(), &before);
    }

    #[test]
    fn test_accepted_type_change_reconstructs_nodes() {
        let (editor, id, _) = door_with_reader();
        let mut editor = editor.with_prompt(AutoConfirm(true));
        editor.change_member_variable_type(id, "Health", PinType::Integer).unwrap();

        let bp = editor.blueprint(id).unwrap();
        assert_eq!(bp.find_variable("Health").unwrap().var_type, PinType::Integer);
        let node = bp.ubergraph_pages[0].get_node("get_health").unwrap();
        assert_eq!(node.find_pin(PN_VALUE).map(|p| &p.pin_type), Some(&PinType::Integer));
    }

    #[test]
    fn test_unreferenced_type_change_does_not_ask() {
        let (editor, id, _) = door_with_reader();
        let prompt = CountingPrompt::default();
        let asked = prompt.asked.clone();
        let mut editor = editor.with_prompt(prompt);
        editor.add_member_variable(id, "Label", PinType::String).unwrap();
        editor.change_member_variable_type(id, "Label", PinType::Name).unwrap();
        assert_eq!(asked.get(), 0);
    }

    #[test]
    fn test_remove_splices_exec_flow() {
        let (mut editor, id, _) = door_with_reader();
        let guid = editor.blueprint(id).unwrap().find_variable("Health").unwrap().guid;
        let page = &mut editor.blueprint_mut(id).unwrap().ubergraph_pages[0];
        page.add_node(Node::custom_event("start", "Start"));
        page.add_node(Node::variable_set("set_health", MemberReference::self_member("Health", Some(guid)), PinType::Real));
        page.add_node(Node::generic("print", "PrintString", vec![Pin::exec_in(), Pin::exec_out(PN_THEN)]));
        page.connect("start", PN_THEN, "set_health", PN_EXECUTE);
        page.connect("set_health", PN_THEN, "print", PN_EXECUTE);

        editor.remove_member_variable(id, "Health").unwrap();
        let page = &editor.blueprint(id).unwrap().ubergraph_pages[0];
        assert!(page.get_node("set_health").is_none());
        assert!(page.get_node("get_health").is_none());
        assert_eq!(page.links_from("start", PN_THEN), vec![("print".to_string(), PN_EXECUTE.to_string())]);
        assert!(matches!(
            editor.remove_member_variable(id, "Health"),
            Err(EditorError::VariableNotFound(_))
        ));
    }

    #[test]
    fn test_category_change_is_cosmetic() {
        let (mut editor, id, _) = door_with_reader();
        let mut rx = editor.subscribe();
        editor.set_member_variable_category(id, "Health", "Stats").unwrap();
        assert_eq!(rx.try_recv().unwrap(), crate::BlueprintEvent::Changed(id));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_local_variable_lifecycle() {
        let (mut editor, id, _) = door_with_reader();
        editor.blueprint_mut(id).unwrap().function_graphs.push(Graph::new_function("Open"));

        assert!(matches!(
            editor.add_local_variable(id, "EventGraph", "Tmp", PinType::Integer),
            Err(EditorError::NotAllowed(_))
        ));
        assert!(matches!(
            editor.add_local_variable(id, "Open", "Health", PinType::Integer),
            Err(EditorError::NameInUse(_))
        ));
        editor.add_local_variable(id, "Open", "Tmp", PinType::Integer).unwrap();
        let guid = editor.blueprint(id).unwrap().find_graph("Open").unwrap().local_variables[0].guid;
        let graph = editor.blueprint_mut(id).unwrap().find_graph_mut("Open").unwrap();
        graph.add_node(Node::variable_get("get_tmp", MemberReference::local("Open", "Tmp", guid), PinType::Integer));

        editor.rename_local_variable(id, "Open", "Tmp", "Counter").unwrap();
        let graph = editor.blueprint(id).unwrap().find_graph("Open").unwrap();
        assert!(graph.find_local_variable("Counter").is_some());
        assert_eq!(graph.get_node("get_tmp").unwrap().variable_reference().unwrap().member_name, "Counter");

        editor.remove_local_variable(id, "Open", "Counter").unwrap();
        let graph = editor.blueprint(id).unwrap().find_graph("Open").unwrap();
        assert!(graph.local_variables.is_empty());
        assert!(graph.get_node("get_tmp").is_none());
    }

    #[test]
    fn test_child_member_gives_way_to_parent() {
        let (mut editor, id, _) = door_with_reader();
        let parent_class = editor.blueprint(id).unwrap().generated_class.unwrap();
        let child = editor.create_blueprint("BP_SlidingDoor", parent_class, BlueprintType::Normal).unwrap();
        editor.add_member_variable(child, "Speed", PinType::Real).unwrap();

        editor.add_member_variable(id, "Speed", PinType::Real).unwrap();
        let child_bp = editor.blueprint(child).unwrap();
        assert!(child_bp.find_variable("Speed").is_none());
        assert!(child_bp.find_variable("Speed_0").is_some());
        assert!(editor.results_log().messages_for(child).any(|m| m.text.contains("Speed_0")));
    }
}
