// Parent Calls - Keep calls to the parent implementation valid
//
// A parent call whose function moved to a different ancestor is repointed.
// One whose function is gone is removed, with its exec flow spliced through.

use blueprint_types::{Blueprint, ClassRegistry, NodeKind};
use tracing::debug;

use crate::member_resolution::{authoritative_class, layout_class};
use crate::results_log::{CompilerResultsLog, NodeRef};

pub fn conform_calls_to_parent_functions(
    blueprint: &mut Blueprint,
    classes: &ClassRegistry,
    log: &mut CompilerResultsLog,
) {
    let id = blueprint.id;
    let parent = layout_class(classes, blueprint.parent_class);

    for graph in blueprint.all_graphs_mut() {
        let calls: Vec<(String, String)> = graph
            .nodes
            .iter()
            .filter_map(|n| match &n.kind {
                NodeKind::CallParentFunction { function } => {
                    Some((n.id.clone(), function.member_name.clone()))
                }
                _ => None,
            })
            .collect();

        for (node_id, function_name) in calls {
            match classes.find_function(parent, &function_name) {
                Some((owner, _)) => {
                    let owner = authoritative_class(classes, owner);
                    let Some(node) = graph.get_node_mut(&node_id) else {
                        continue;
                    };
                    if let NodeKind::CallParentFunction { function } = &mut node.kind {
                        if function.parent_class() != Some(owner) {
                            debug!(function = %function_name, "repointing parent call at {}", owner);
                            function.set_parent_class(owner);
                        }
                    }
                }
                None => {
                    graph.splice_exec_through(&node_id);
                    log.warning_at(
                        NodeRef::new(id, graph.name.clone(), node_id),
                        format!(
                            "Removed call to parent function '{}', which no longer exists",
                            function_name
                        ),
                    );
                }
            }
        }
    }
}
