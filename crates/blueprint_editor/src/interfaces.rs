//! Interface implementation and reparenting
//!
//! Both edits change what the Blueprint must override, so both end in the
//! conformance passes before the structural cascade runs.

use blueprint_types::{Blueprint, BlueprintId, ClassHandle, ClassRegistry, InterfaceDescription, NodeKind};
use tracing::{debug, info};

use crate::conformance::{
    conform_implemented_events, conform_implemented_interfaces, convert_event_to_custom_event,
};
use crate::editor::EditorContext;
use crate::member_resolution::layout_class;
use crate::naming::make_unique_name;
use crate::parent_calls::conform_calls_to_parent_functions;
use crate::{EditorError, Result};

impl EditorContext {
    pub fn implement_new_interface(&mut self, id: BlueprintId, interface_name: &str) -> Result<()> {
        let interface = self
            .classes
            .find_by_name(interface_name)
            .ok_or_else(|| EditorError::ClassNotFound(interface_name.to_string()))?;
        if !self.classes.resolve(interface).is_some_and(|c| c.is_interface()) {
            return Err(EditorError::NotAllowed(format!("{} is not an interface", interface_name)));
        }

        let blueprint = self.blueprint(id)?;
        if blueprint.is_interface() || blueprint.is_macro_library() {
            return Err(EditorError::NotAllowed(format!(
                "{} cannot implement interfaces",
                blueprint.name
            )));
        }
        let parent = layout_class(&self.classes, blueprint.parent_class);
        if blueprint.find_interface(interface).is_some() || self.classes.implements_interface(parent, interface) {
            return Err(EditorError::InterfaceAlreadyImplemented(interface_name.to_string()));
        }
        let clash = self
            .classes
            .all_functions(layout_class(&self.classes, interface))
            .into_iter()
            .filter(|(_, f)| f.must_be_implemented_as_function())
            .find(|(_, f)| {
                blueprint
                    .function_graphs
                    .iter()
                    .chain(&blueprint.macro_graphs)
                    .any(|g| g.name.eq_ignore_ascii_case(&f.name))
            });
        if let Some((_, function)) = clash {
            return Err(EditorError::NameInUse(function.name.clone()));
        }

        let blueprint = self
            .blueprints
            .get_mut(&id)
            .ok_or_else(|| EditorError::BlueprintNotFound(id.to_string()))?;
        blueprint.implemented_interfaces.push(InterfaceDescription {
            interface,
            graphs: Vec::new(),
        });
        conform_implemented_interfaces(blueprint, &self.classes, &mut self.log);
        info!(blueprint = %id, interface = %interface_name, "implemented interface");

        self.mark_blueprint_as_structurally_modified(id)
    }

    /// Stop implementing an interface. With `preserve_functions` its graphs
    /// become ordinary functions and its events custom events; otherwise both
    /// are deleted.
    pub fn remove_interface(&mut self, id: BlueprintId, interface_name: &str, preserve_functions: bool) -> Result<()> {
        let blueprint = self
            .blueprints
            .get_mut(&id)
            .ok_or_else(|| EditorError::BlueprintNotFound(id.to_string()))?;
        let index = blueprint
            .implemented_interfaces
            .iter()
            .position(|d| self.classes.name_of(d.interface) == Some(interface_name))
            .ok_or_else(|| EditorError::InterfaceNotImplemented(interface_name.to_string()))?;
        let desc = blueprint.implemented_interfaces.remove(index);
        let events = interface_events(blueprint, desc.interface);

        if preserve_functions {
            for mut graph in desc.graphs {
                graph.interface_guid = None;
                blueprint.function_graphs.push(graph);
            }
            for (page_index, node_id, name) in events {
                let new_name = custom_event_name(blueprint, &self.classes, &name);
                convert_event_to_custom_event(&mut blueprint.ubergraph_pages[page_index], &node_id, &new_name);
                debug!(event = %name, to = %new_name, "kept interface event as custom event");
            }
        } else {
            for (page_index, node_id, _) in events {
                blueprint.ubergraph_pages[page_index].splice_exec_through(&node_id);
            }
        }
        info!(blueprint = %id, interface = %interface_name, preserve_functions, "removed interface");

        self.mark_blueprint_as_structurally_modified(id)
    }

    /// Give the Blueprint a new parent class and conform everything that
    /// depended on the old one
    pub fn reparent_blueprint(&mut self, id: BlueprintId, parent_name: &str) -> Result<()> {
        let new_parent = self
            .classes
            .find_by_name(parent_name)
            .ok_or_else(|| EditorError::ClassNotFound(parent_name.to_string()))?;
        let blueprint = self.blueprint(id)?;
        if blueprint.is_interface() {
            return Err(EditorError::NotAllowed(format!("interface {} cannot be reparented", blueprint.name)));
        }
        if self.classes.resolve(new_parent).is_some_and(|c| c.is_interface()) {
            return Err(EditorError::NotAllowed(format!("{} is an interface", parent_name)));
        }
        let creates_cycle = self
            .classes
            .super_chain(new_parent)
            .into_iter()
            .any(|h| self.classes.resolve(h).and_then(|c| c.generated_by) == Some(id));
        if creates_cycle {
            return Err(EditorError::NotAllowed(format!(
                "{} would become its own ancestor",
                blueprint.name
            )));
        }

        let blueprint = self
            .blueprints
            .get_mut(&id)
            .ok_or_else(|| EditorError::BlueprintNotFound(id.to_string()))?;
        blueprint.parent_class = new_parent;
        conform_implemented_interfaces(blueprint, &self.classes, &mut self.log);
        conform_implemented_events(blueprint, &self.classes, &mut self.log);
        conform_calls_to_parent_functions(blueprint, &self.classes, &mut self.log);
        info!(blueprint = %id, parent = %parent_name, "reparented");

        self.mark_blueprint_as_structurally_modified(id)
    }
}

/// Event nodes overriding a member of `interface`: (page, node id, name)
fn interface_events(blueprint: &Blueprint, interface: ClassHandle) -> Vec<(usize, String, String)> {
    let mut out = Vec::new();
    for (page_index, page) in blueprint.ubergraph_pages.iter().enumerate() {
        for node in &page.nodes {
            if let NodeKind::Event { event_reference } = &node.kind {
                if event_reference.parent_class().is_some_and(|c| c.same_class(&interface)) {
                    out.push((page_index, node.id.clone(), event_reference.member_name.clone()));
                }
            }
        }
    }
    out
}

/// Keep the event's own name unless something else already uses it
fn custom_event_name(blueprint: &Blueprint, classes: &ClassRegistry, base: &str) -> String {
    let parent = layout_class(classes, blueprint.parent_class);
    make_unique_name(base, |candidate| {
        let eq = |other: &str| other.eq_ignore_ascii_case(candidate);
        blueprint.new_variables.iter().any(|v| eq(&v.name))
            || blueprint.all_graphs().any(|g| eq(&g.name))
            || blueprint.timelines.iter().any(|t| eq(&t.name))
            || blueprint.components.iter().any(|c| eq(&c.variable_name))
            || blueprint
                .ubergraph_pages
                .iter()
                .flat_map(|g| &g.nodes)
                .any(|n| matches!(&n.kind, NodeKind::CustomEvent { name } if eq(name)))
            || classes.all_functions(parent).iter().any(|(_, f)| eq(&f.name))
    })
}
