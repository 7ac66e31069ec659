//! Name validation and uniqueness checks
//!
//! Names are compared case-insensitively, as they are when the generated class
//! is looked up at runtime.

use blueprint_types::{Blueprint, ClassRegistry};

use crate::member_resolution::layout_class;
use crate::{EditorError, Result};

/// Characters that cannot appear in a member or graph name
pub const INVALID_NAME_CHARACTERS: &str = "\"',/.:|&!~\n\r\t@#(){}[]=;^%$`";

pub fn validate_kismet_name(name: &str, max_length: usize) -> Result<()> {
    let invalid = |reason: String| EditorError::InvalidName {
        name: name.to_string(),
        reason,
    };
    if name.trim().is_empty() {
        return Err(invalid("name is empty".to_string()));
    }
    if name.chars().count() > max_length {
        return Err(invalid(format!("longer than {} characters", max_length)));
    }
    if let Some(c) = name.chars().find(|c| INVALID_NAME_CHARACTERS.contains(*c)) {
        return Err(invalid(format!("contains invalid character {:?}", c)));
    }
    Ok(())
}

/// Whether `name` is taken by anything visible from the Blueprint's own scope:
/// its members, graphs, events, timelines and components, plus every property
/// and function inherited from the parent class chain.
pub fn is_name_used(blueprint: &Blueprint, classes: &ClassRegistry, name: &str) -> bool {
    let eq = |other: &str| other.eq_ignore_ascii_case(name);

    let own = blueprint.new_variables.iter().any(|v| eq(&v.name))
        || blueprint.all_graphs().any(|g| eq(&g.name))
        || blueprint.timelines.iter().any(|t| eq(&t.name))
        || blueprint.components.iter().any(|c| eq(&c.variable_name))
        || blueprint
            .ubergraph_pages
            .iter()
            .flat_map(|g| &g.nodes)
            .filter_map(|n| n.declared_event_name())
            .any(eq);
    if own {
        return true;
    }

    let parent = layout_class(classes, blueprint.parent_class);
    classes.super_chain(parent).into_iter().any(|h| {
        classes.resolve(h).is_some_and(|class| {
            class.properties.iter().any(|p| eq(&p.name)) || class.functions.iter().any(|f| eq(&f.name))
        })
    })
}

/// Whether a graph may be called `name` without clashing with another graph
/// or an inherited function
pub fn is_graph_name_unique(blueprint: &Blueprint, classes: &ClassRegistry, name: &str) -> bool {
    if blueprint.all_graphs().any(|g| g.name.eq_ignore_ascii_case(name)) {
        return false;
    }
    let parent = layout_class(classes, blueprint.parent_class);
    classes
        .all_functions(parent)
        .iter()
        .all(|(_, f)| !f.name.eq_ignore_ascii_case(name))
}

/// `base` if free, otherwise `base_0`, `base_1`, ... whichever is free first
pub fn make_unique_name(base: &str, is_used: impl Fn(&str) -> bool) -> String {
    if !is_used(base) {
        return base.to_string();
    }
    (0u32..)
        .map(|n| format!("{}_{}", base, n))
        .find(|candidate| !is_used(candidate))
        .unwrap_or_else(|| base.to_string())
}

pub fn find_unique_kismet_name(blueprint: &Blueprint, classes: &ClassRegistry, base: &str) -> String {
    make_unique_name(base, |candidate| is_name_used(blueprint, classes, candidate))
}
