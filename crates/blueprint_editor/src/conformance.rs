//! Interface and event conformance
//!
//! Reconciles the graphs of a Blueprint with what its parent class and
//! implemented interfaces currently require. Each implemented interface ends
//! either removed (promoted to the parent's implementation) or conformed: one
//! implementation graph per function-style interface member, tagged with the
//! member's guid. Event nodes whose target can no longer be an event are
//! turned into custom events that keep every pin connection.

use blueprint_types::{
    Blueprint, BlueprintStatus, ClassHandle, ClassRegistry, Function, FunctionParam, Graph, Node,
    NodeKind, PinDirection, params_compatible,
};
use tracing::debug;

use crate::member_resolution::{authoritative_class, layout_class};
use crate::naming::{is_name_used, make_unique_name};
use crate::results_log::{CompilerResultsLog, NodeRef};

// ─────────────────────────────────────────────────────────────────────────────
// Interfaces
// ─────────────────────────────────────────────────────────────────────────────

/// Conform every implemented interface of the Blueprint
pub fn conform_implemented_interfaces(
    blueprint: &mut Blueprint,
    classes: &ClassRegistry,
    log: &mut CompilerResultsLog,
) {
    let id = blueprint.id;
    let parent = classes.most_up_to_date(blueprint.parent_class);

    let mut index = 0;
    while index < blueprint.implemented_interfaces.len() {
        let interface = classes.most_up_to_date(blueprint.implemented_interfaces[index].interface);
        let Some(interface_class) = classes.resolve(interface) else {
            let removed = blueprint.implemented_interfaces.remove(index);
            log.warning(
                id,
                format!("Removed implementation of missing interface {}", removed.interface),
            );
            continue;
        };
        let interface_name = interface_class.name.clone();
        blueprint.implemented_interfaces[index].interface = interface;

        let functions: Vec<Function> = classes
            .all_functions(layout_class(classes, interface))
            .into_iter()
            .filter(|(_, f)| f.flags.blueprint_event)
            .map(|(_, f)| f.clone())
            .collect();

        follow_renamed_functions(blueprint, &functions);

        if classes.implements_interface(layout_class(classes, parent), interface) {
            promote_interface_implementation_to_override(blueprint, index, &interface_name, log);
            continue;
        }

        convert_ineligible_interface_events(blueprint, classes, interface, &functions, log);

        let function_style: Vec<&Function> = functions
            .iter()
            .filter(|f| f.must_be_implemented_as_function())
            .collect();

        let collisions: Vec<&str> = function_style
            .iter()
            .filter(|f| {
                blueprint
                    .new_variables
                    .iter()
                    .any(|v| v.name.eq_ignore_ascii_case(&f.name))
            })
            .map(|f| f.name.as_str())
            .collect();
        if !collisions.is_empty() {
            blueprint.status = BlueprintStatus::Error;
            for name in collisions {
                log.error(
                    id,
                    format!(
                        "Interface {} function '{}' conflicts with a variable of the same name; rename the variable or remove the interface",
                        interface_name, name
                    ),
                );
            }
            index += 1;
            continue;
        }

        sync_implementation_graphs(blueprint, index, &function_style, log);
        index += 1;
    }
}

/// Rename implementation graphs whose interface function was renamed
fn follow_renamed_functions(blueprint: &mut Blueprint, functions: &[Function]) {
    for graph in blueprint.all_graphs_mut() {
        let Some(guid) = graph.interface_guid else {
            continue;
        };
        if let Some(function) = functions.iter().find(|f| f.guid == Some(guid)) {
            if function.name != graph.name {
                debug!(from = %graph.name, to = %function.name, "following renamed interface function");
                graph.rename(function.name.clone());
            }
        }
    }
}

fn convert_ineligible_interface_events(
    blueprint: &mut Blueprint,
    classes: &ClassRegistry,
    interface: ClassHandle,
    functions: &[Function],
    log: &mut CompilerResultsLog,
) {
    let mut conversions = Vec::new();
    for (page_index, page) in blueprint.ubergraph_pages.iter().enumerate() {
        for node in &page.nodes {
            let NodeKind::Event { event_reference } = &node.kind else {
                continue;
            };
            if !event_reference
                .parent_class()
                .is_some_and(|c| c.same_class(&interface))
            {
                continue;
            }
            let ineligible = functions
                .iter()
                .find(|f| f.name == event_reference.member_name)
                .is_some_and(|f| !f.can_be_placed_as_event());
            if ineligible {
                conversions.push((page_index, node.id.clone(), event_reference.member_name.clone()));
            }
        }
    }

    for (page_index, node_id, function_name) in conversions {
        // The function graph created for this member must keep the plain name
        let new_name = make_unique_name(&function_name, |candidate| {
            is_name_used(blueprint, classes, candidate)
                || functions.iter().any(|f| f.name.eq_ignore_ascii_case(candidate))
        });
        let page = &mut blueprint.ubergraph_pages[page_index];
        convert_event_to_custom_event(page, &node_id, &new_name);
        log.warning_at(
            NodeRef::new(blueprint.id, page.name.clone(), node_id),
            format!(
                "'{}' can no longer be implemented as an event; converted to custom event '{}', which only fires when called",
                function_name, new_name
            ),
        );
    }
}

fn sync_implementation_graphs(
    blueprint: &mut Blueprint,
    index: usize,
    function_style: &[&Function],
    log: &mut CompilerResultsLog,
) {
    let id = blueprint.id;
    for function in function_style {
        let desc = &mut blueprint.implemented_interfaces[index];
        if let Some(graph) = desc.graphs.iter_mut().find(|g| g.name == function.name) {
            if function.guid.is_some() {
                graph.interface_guid = function.guid;
            }
            graph.is_const = function.flags.is_const;
            continue;
        }

        if let Some(stub) = blueprint
            .ubergraph_pages
            .iter()
            .position(|g| g.name == function.name)
        {
            blueprint.ubergraph_pages.remove(stub);
            log.note(id, format!("Removed leftover event graph '{}'", function.name));
        }

        let mut graph = Graph::new_function_matching(function);
        graph.interface_guid = function.guid;
        blueprint.implemented_interfaces[index].graphs.push(graph);
        log.note(id, format!("Added interface function graph '{}'", function.name));
    }

    let desc = &mut blueprint.implemented_interfaces[index];
    let mut removed = Vec::new();
    desc.graphs.retain(|g| {
        let keep = function_style.iter().any(|f| f.name == g.name);
        if !keep {
            removed.push(g.name.clone());
        }
        keep
    });
    for name in removed {
        log.note(id, format!("Removed graph '{}': no longer an interface function", name));
    }
}

/// Hand the graphs of an interface the parent now implements over to the
/// function graph list, where they override the parent's implementation
pub fn promote_interface_implementation_to_override(
    blueprint: &mut Blueprint,
    index: usize,
    interface_name: &str,
    log: &mut CompilerResultsLog,
) {
    let id = blueprint.id;
    let desc = blueprint.implemented_interfaces.remove(index);
    for mut graph in desc.graphs {
        graph.interface_guid = None;
        if blueprint
            .function_graphs
            .iter()
            .any(|g| g.name.eq_ignore_ascii_case(&graph.name))
        {
            log.warning(
                id,
                format!("Dropped duplicate implementation of '{}'", graph.name),
            );
            continue;
        }
        blueprint.function_graphs.push(graph);
    }
    log.note(
        id,
        format!(
            "Interface {} is implemented by the parent class; its graphs now override the parent",
            interface_name
        ),
    );
}

// ─────────────────────────────────────────────────────────────────────────────
// Overridden Events
// ─────────────────────────────────────────────────────────────────────────────

/// Check every event node against the functions it overrides
pub fn conform_implemented_events(
    blueprint: &mut Blueprint,
    classes: &ClassRegistry,
    log: &mut CompilerResultsLog,
) {
    let events: Vec<(usize, String)> = blueprint
        .ubergraph_pages
        .iter()
        .enumerate()
        .flat_map(|(i, page)| {
            page.nodes
                .iter()
                .filter(|n| matches!(n.kind, NodeKind::Event { .. }))
                .map(move |n| (i, n.id.clone()))
        })
        .collect();

    for (page_index, node_id) in events {
        fix_overridden_event_signature(blueprint, classes, page_index, &node_id, log);
    }
}

enum EventFix {
    Keep,
    Repoint(ClassHandle),
    Convert,
}

/// Repoint an event node at the function it overrides, or convert it to a
/// custom event when nothing overridable remains
pub fn fix_overridden_event_signature(
    blueprint: &mut Blueprint,
    classes: &ClassRegistry,
    page_index: usize,
    node_id: &str,
    log: &mut CompilerResultsLog,
) {
    let Some(node) = blueprint.ubergraph_pages[page_index].get_node(node_id) else {
        return;
    };
    let NodeKind::Event { event_reference } = &node.kind else {
        return;
    };
    let name = event_reference.member_name.clone();
    let stored = event_reference.parent_class();
    let parent = classes.most_up_to_date(blueprint.parent_class);

    let fix = match stored.filter(|c| classes.resolve(*c).is_some_and(|class| class.is_interface())) {
        Some(interface) => {
            let interface = classes.most_up_to_date(interface);
            let implemented = blueprint.find_interface(interface).is_some()
                || classes.implements_interface(layout_class(classes, parent), interface);
            let found = classes
                .find_function(layout_class(classes, interface), &name)
                .map(|(owner, f)| (authoritative_class(classes, owner), f));
            match found {
                Some((owner, f)) if implemented && f.can_be_placed_as_event() => {
                    if stored == Some(owner) { EventFix::Keep } else { EventFix::Repoint(owner) }
                }
                // Function-style members are handled by the interface pass
                Some(_) if implemented => EventFix::Keep,
                _ => EventFix::Convert,
            }
        }
        None => {
            let lookup = |class: ClassHandle| {
                classes
                    .find_function(layout_class(classes, class), &name)
                    .map(|(owner, f)| (authoritative_class(classes, owner), f))
            };
            let still_valid = stored
                .and_then(lookup)
                .filter(|(owner, f)| classes.is_child_of(parent, *owner) && f.can_be_placed_as_event());
            match still_valid {
                Some((owner, _)) if stored == Some(owner) => EventFix::Keep,
                Some((owner, _)) => EventFix::Repoint(owner),
                None => match lookup(parent) {
                    Some((owner, f)) if f.can_be_placed_as_event() && node_matches_signature(node, f) => {
                        EventFix::Repoint(owner)
                    }
                    _ => EventFix::Convert,
                },
            }
        }
    };

    let page_name = blueprint.ubergraph_pages[page_index].name.clone();
    match fix {
        EventFix::Keep => {}
        EventFix::Repoint(owner) => {
            if let Some(node) = blueprint.ubergraph_pages[page_index].get_node_mut(node_id) {
                if let NodeKind::Event { event_reference } = &mut node.kind {
                    event_reference.set_parent_class(owner);
                }
            }
            debug!(event = %name, "repointed event at {}", owner);
        }
        EventFix::Convert => {
            let new_name = make_unique_name(&name, |c| is_name_used(blueprint, classes, c));
            convert_event_to_custom_event(&mut blueprint.ubergraph_pages[page_index], node_id, &new_name);
            log.warning_at(
                NodeRef::new(blueprint.id, page_name, node_id),
                format!(
                    "Event '{}' no longer overrides anything; converted to custom event '{}'",
                    name, new_name
                ),
            );
        }
    }
}

/// Data outputs of an event node line up with the function's inputs
fn node_matches_signature(node: &Node, function: &Function) -> bool {
    let params: Vec<FunctionParam> = node
        .pins
        .iter()
        .filter(|p| !p.is_exec() && p.direction == PinDirection::Output)
        .map(|p| FunctionParam::new(p.name.clone(), p.pin_type.clone()))
        .collect();
    params_compatible(&function.inputs, &params)
}

/// Replace an event node in place with a custom event of the given name.
/// Pins and therefore every connection are kept.
pub fn convert_event_to_custom_event(graph: &mut Graph, node_id: &str, name: &str) -> bool {
    match graph.get_node_mut(node_id) {
        Some(node) if matches!(node.kind, NodeKind::Event { .. }) => {
            node.kind = NodeKind::CustomEvent {
                name: name.to_string(),
            };
            true
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blueprint_types::{
        BlueprintId, Class, InterfaceDescription, MemberReference, PN_THEN, Pin, PinType,
        VariableDescription,
    };
    use uuid::Uuid;

    struct Fixture {
        classes: ClassRegistry,
        actor: ClassHandle,
        interface: ClassHandle,
        bp: Blueprint,
        log: CompilerResultsLog,
    }

    fn fixture(interface_functions: Vec<Function>) -> Fixture {
        let mut classes = ClassRegistry::new();
        let actor = classes
            .register(Class::native("Actor", None).with_function(Function::overridable("ReceiveBeginPlay")))
            .unwrap();
        let mut iface = Class::interface("Usable");
        iface.functions = interface_functions;
        let interface = classes.register(iface).unwrap();
        let mut bp = Blueprint::new(BlueprintId(1), "BP_Door", actor);
        bp.implemented_interfaces.push(InterfaceDescription {
            interface,
            graphs: Vec::new(),
        });
        Fixture {
            classes,
            actor,
            interface,
            bp,
            log: CompilerResultsLog::new(),
        }
    }

    fn can_use(guid: Uuid) -> Function {
        Function::overridable("CanUse")
            .with_output("ReturnValue", PinType::Boolean)
            .with_guid(guid)
    }

    #[test]
    fn test_creates_missing_graphs_and_skips_events() {
        let guid = Uuid::new_v4();
        let mut f = fixture(vec![can_use(guid), Function::overridable("OnUse")]);
        conform_implemented_interfaces(&mut f.bp, &f.classes, &mut f.log);

        let graphs = &f.bp.implemented_interfaces[0].graphs;
        assert_eq!(graphs.len(), 1);
        assert_eq!(graphs[0].name, "CanUse");
        assert_eq!(graphs[0].interface_guid, Some(guid));
    }

    #[test]
    fn test_removes_graphs_for_vanished_functions_and_syncs_const() {
        let guid = Uuid::new_v4();
        let mut f = fixture(vec![can_use(guid).as_const()]);
        f.bp.implemented_interfaces[0].graphs.push(Graph::new_function("CanUse"));
        f.bp.implemented_interfaces[0].graphs.push(Graph::new_function("Obsolete"));
        f.bp.ubergraph_pages.push(Graph::new_ubergraph("Stub"));

        conform_implemented_interfaces(&mut f.bp, &f.classes, &mut f.log);

        let graphs = &f.bp.implemented_interfaces[0].graphs;
        assert_eq!(graphs.len(), 1);
        assert!(graphs[0].is_const);
        assert_eq!(graphs[0].interface_guid, Some(guid));
    }

    #[test]
    fn test_follows_renamed_function_by_guid() {
        let guid = Uuid::new_v4();
        let mut f = fixture(vec![can_use(guid)]);
        let mut graph = Graph::new_function("OldName");
        graph.interface_guid = Some(guid);
        f.bp.implemented_interfaces[0].graphs.push(graph);

        conform_implemented_interfaces(&mut f.bp, &f.classes, &mut f.log);

        let graphs = &f.bp.implemented_interfaces[0].graphs;
        assert_eq!(graphs.len(), 1);
        assert_eq!(graphs[0].name, "CanUse");
    }

    #[test]
    fn test_name_collision_is_an_error() {
        let mut f = fixture(vec![can_use(Uuid::new_v4())]);
        f.bp.new_variables.push(VariableDescription::new("CanUse", PinType::Boolean));

        conform_implemented_interfaces(&mut f.bp, &f.classes, &mut f.log);

        assert_eq!(f.bp.status, BlueprintStatus::Error);
        assert_eq!(f.log.error_count(), 1);
        assert!(f.bp.implemented_interfaces[0].graphs.is_empty());
        assert!(f.bp.find_variable("CanUse").is_some());
    }

    #[test]
    fn test_event_converted_when_member_becomes_function_style() {
        let guid = Uuid::new_v4();
        let mut f = fixture(vec![can_use(guid)]);
        let node = Node::event(
            "ev",
            MemberReference::external(f.interface, "CanUse"),
            &Function::overridable("CanUse"),
        );
        let page = &mut f.bp.ubergraph_pages[0];
        page.add_node(node);
        page.add_node(Node::generic("print", "PrintString", vec![Pin::exec_in()]));
        page.connect("ev", PN_THEN, "print", "execute");

        conform_implemented_interfaces(&mut f.bp, &f.classes, &mut f.log);

        let page = &f.bp.ubergraph_pages[0];
        match &page.get_node("ev").unwrap().kind {
            NodeKind::CustomEvent { name } => assert_eq!(name, "CanUse_0"),
            other => panic!("expected custom event, got {other:?}"),
        }
        assert_eq!(page.connections.len(), 1);
        assert_eq!(f.log.warning_count(), 1);
        assert_eq!(f.bp.implemented_interfaces[0].graphs[0].name, "CanUse");
    }

    #[test]
    fn test_promotes_when_parent_implements() {
        let guid = Uuid::new_v4();
        let mut f = fixture(vec![can_use(guid)]);
        let parent = f
            .classes
            .register(Class::native("UsableActor", Some(f.actor)).with_interface(f.interface))
            .unwrap();
        f.bp.parent_class = parent;
        f.bp.implemented_interfaces[0].graphs.push(Graph::new_function("CanUse"));

        conform_implemented_interfaces(&mut f.bp, &f.classes, &mut f.log);

        assert!(f.bp.implemented_interfaces.is_empty());
        assert_eq!(f.bp.function_graphs.len(), 1);
        assert_eq!(f.bp.function_graphs[0].interface_guid, None);
    }

    #[test]
    fn test_overridden_event_falls_back_to_custom_event() {
        let mut f = fixture(Vec::new());
        let begin_play = Function::overridable("ReceiveBeginPlay");
        let page = &mut f.bp.ubergraph_pages[0];
        page.add_node(Node::event("ok", MemberReference::external(f.actor, "ReceiveBeginPlay"), &begin_play));
        page.add_node(Node::event(
            "gone",
            MemberReference::external(f.actor, "ReceiveDestroyed"),
            &Function::overridable("ReceiveDestroyed"),
        ));

        conform_implemented_events(&mut f.bp, &f.classes, &mut f.log);

        let page = &f.bp.ubergraph_pages[0];
        assert!(matches!(page.get_node("ok").unwrap().kind, NodeKind::Event { .. }));
        assert!(matches!(
            &page.get_node("gone").unwrap().kind,
            NodeKind::CustomEvent { name } if name.starts_with("ReceiveDestroyed")
        ));
    }

    #[test]
    fn test_overridden_event_repointed_to_superclass() {
        let mut f = fixture(Vec::new());
        let pawn = f
            .classes
            .register(Class::native("Pawn", Some(f.actor)).with_function(Function::overridable("ReceivePossessed")))
            .unwrap();
        let other = f
            .classes
            .register(Class::native("Unrelated", None).with_function(Function::overridable("ReceivePossessed")))
            .unwrap();
        f.bp.parent_class = pawn;
        f.bp.ubergraph_pages[0].add_node(Node::event(
            "ev",
            MemberReference::external(other, "ReceivePossessed"),
            &Function::overridable("ReceivePossessed"),
        ));

        conform_implemented_events(&mut f.bp, &f.classes, &mut f.log);

        let node = f.bp.ubergraph_pages[0].get_node("ev").unwrap();
        assert_eq!(node.function_reference().unwrap().parent_class(), Some(pawn));
    }
}
