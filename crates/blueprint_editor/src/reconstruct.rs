//! Node reconstruction
//!
//! Rebuilds node pins from what their references currently resolve to,
//! repairs stale references and breaks links the new pins can no longer carry.
//! Nodes of the whole Blueprint are visited in declared refresh order:
//! structure-changing kinds first, then by each kind's refresh priority. Each
//! node is rebuilt before the next is planned, so macro instances see the
//! tunnels of their macro as just refreshed.

use std::cmp::Reverse;

use blueprint_types::{
    Blueprint, ClassHandle, ClassRegistry, Graph, Node, NodeKind, Pin, call_pins, event_pins,
    macro_instance_pins, result_pins, timeline_pins, tunnel_pins, variable_get_pins, variable_set_pins,
};

use crate::member_resolution::{ResolveContext, repair_reference, resolve_function, resolve_variable};
use crate::results_log::{CompilerResultsLog, NodeRef};

struct NodeUpdate {
    pins: Option<Vec<Pin>>,
    repair: Option<(ClassHandle, String)>,
}

/// Every node of the Blueprint as (graph index, node id) in refresh order.
/// Nodes of equal rank keep graph order.
pub fn refresh_order(blueprint: &Blueprint) -> Vec<(usize, String)> {
    let mut nodes: Vec<(usize, &Node)> = blueprint
        .all_graphs()
        .enumerate()
        .flat_map(|(index, graph)| graph.nodes.iter().map(move |node| (index, node)))
        .collect();
    nodes.sort_by_key(|(_, n)| {
        let caps = n.capabilities();
        Reverse((caps.causes_structural_change, caps.refresh_priority))
    });
    nodes.into_iter().map(|(index, n)| (index, n.id.clone())).collect()
}

/// Reconstruct every node of every graph. Returns the number of links broken.
pub fn refresh_all_nodes(blueprint: &mut Blueprint, classes: &ClassRegistry, log: &mut CompilerResultsLog) -> usize {
    for (graph_index, node_id) in refresh_order(blueprint) {
        let update = {
            let cx = ResolveContext::for_blueprint(classes, blueprint);
            let Some(graph) = blueprint.all_graphs().nth(graph_index) else {
                continue;
            };
            let Some(node) = graph.get_node(&node_id) else {
                continue;
            };
            plan_node(&cx, graph, node, log)
        };
        let Some(update) = update else {
            continue;
        };
        let node = blueprint
            .all_graphs_mut()
            .nth(graph_index)
            .and_then(|graph| graph.get_node_mut(&node_id));
        if let Some(node) = node {
            apply_update(classes, node, update);
        }
    }

    let mut broken = 0;
    for graph in blueprint.all_graphs_mut() {
        broken += graph.drop_dangling_connections();
        broken += graph.drop_incompatible_connections();
    }
    broken
}

fn apply_update(classes: &ClassRegistry, node: &mut Node, update: NodeUpdate) {
    if let Some(pins) = update.pins {
        node.pins = pins;
    }
    let Some((owner, name)) = update.repair else {
        return;
    };
    let reference = match &mut node.kind {
        NodeKind::VariableGet { variable } | NodeKind::VariableSet { variable } => Some(variable),
        NodeKind::CallFunction { function } | NodeKind::CallParentFunction { function } => Some(function),
        NodeKind::Event { event_reference } => Some(event_reference),
        _ => None,
    };
    if let Some(reference) = reference {
        repair_reference(classes, reference, owner, &name);
    }
}

fn plan_node(
    cx: &ResolveContext<'_>,
    graph: &Graph,
    node: &Node,
    log: &mut CompilerResultsLog,
) -> Option<NodeUpdate> {
    let update = |pins: Vec<Pin>, repair: Option<(ClassHandle, String)>| NodeUpdate {
        pins: (pins != node.pins).then_some(pins),
        repair,
    };
    let unresolved = |log: &mut CompilerResultsLog, err: crate::EditorError| -> Option<NodeUpdate> {
        log.warning_at(
            NodeRef::new(cx.blueprint.id, graph.name.clone(), node.id.clone()),
            err.to_string(),
        );
        None
    };

    match &node.kind {
        NodeKind::VariableGet { variable } | NodeKind::VariableSet { variable } => {
            match resolve_variable(cx, variable) {
                Ok(r) => {
                    let pins = if matches!(node.kind, NodeKind::VariableGet { .. }) {
                        variable_get_pins(r.pin_type)
                    } else {
                        variable_set_pins(r.pin_type)
                    };
                    Some(update(pins, r.stale.then_some((r.owner, r.name))))
                }
                Err(err) => unresolved(log, err),
            }
        }
        NodeKind::CallFunction { function } | NodeKind::CallParentFunction { function } => {
            match resolve_function(cx, function) {
                Ok(r) => Some(update(
                    call_pins(&r.function),
                    r.stale.then(|| (r.owner, r.function.name.clone())),
                )),
                Err(err) => unresolved(log, err),
            }
        }
        NodeKind::Event { event_reference } => match resolve_function(cx, event_reference) {
            Ok(r) => Some(update(
                event_pins(&r.function.inputs),
                r.stale.then(|| (r.owner, r.function.name.clone())),
            )),
            Err(err) => unresolved(log, err),
        },
        NodeKind::FunctionEntry { .. } => Some(update(event_pins(&graph.inputs), None)),
        NodeKind::FunctionResult => Some(update(result_pins(&graph.outputs), None)),
        NodeKind::Timeline { .. } => Some(update(timeline_pins(), None)),
        NodeKind::Tunnel { is_entry } => {
            let params = if *is_entry { &graph.inputs } else { &graph.outputs };
            Some(update(tunnel_pins(*is_entry, params), None))
        }
        // Macros of other Blueprints are refreshed with their library
        NodeKind::MacroInstance { macro_blueprint, macro_graph } if *macro_blueprint == cx.blueprint.id => {
            let Some(definition) = cx.blueprint.macro_graphs.iter().find(|g| &g.name == macro_graph) else {
                return unresolved(log, crate::EditorError::GraphNotFound(macro_graph.clone()));
            };
            let tunnel = |entry: bool| {
                definition
                    .nodes
                    .iter()
                    .find(|n| matches!(n.kind, NodeKind::Tunnel { is_entry } if is_entry == entry))
                    .map_or(&[][..], |n| n.pins.as_slice())
            };
            Some(update(macro_instance_pins(tunnel(true), tunnel(false)), None))
        }
        _ => None,
    }
}
