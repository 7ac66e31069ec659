// Dependencies - Which Blueprints and user structs a Blueprint depends on
//
// Both caches here are invalidated cheaply on every structural edit and
// rebuilt in full on the next read; neither is ever patched incrementally.

use std::collections::{BTreeMap, BTreeSet};

use blueprint_types::{
    Blueprint, BlueprintId, ClassHandle, ClassRegistry, DependencyCache, NodeKind, StructRegistry,
};

/// Walk the parent chain, implemented interfaces, variables and every node of
/// the Blueprint for external classes, macro libraries and user structs
pub fn gather_dependencies(
    blueprint: &Blueprint,
    classes: &ClassRegistry,
    structs: &StructRegistry,
) -> DependencyCache {
    let mut cache = DependencyCache {
        up_to_date: true,
        ..Default::default()
    };

    let mut add_class = |cache: &mut DependencyCache, handle: ClassHandle| {
        if let Some(owner) = classes.resolve(handle).and_then(|c| c.generated_by) {
            if owner != blueprint.id {
                cache.blueprints.insert(owner);
            }
        }
    };
    let add_class_name = |cache: &mut DependencyCache, name: &str, add: &mut dyn FnMut(&mut DependencyCache, ClassHandle)| {
        if let Some(handle) = classes.find_by_name(name) {
            add(cache, handle);
        }
    };
    let add_struct = |cache: &mut DependencyCache, name: &str| {
        if structs.is_user_defined(name) {
            cache.structs.insert(name.to_string());
        }
    };

    for handle in classes.super_chain(classes.most_up_to_date(blueprint.parent_class)) {
        add_class(&mut cache, handle);
    }
    for desc in &blueprint.implemented_interfaces {
        add_class(&mut cache, desc.interface);
    }

    let variable_types = blueprint
        .new_variables
        .iter()
        .chain(blueprint.all_graphs().flat_map(|g| &g.local_variables))
        .map(|v| &v.var_type);
    for ty in variable_types {
        if let Some(name) = ty.struct_name() {
            add_struct(&mut cache, name);
        }
        if let Some(name) = ty.class_name() {
            add_class_name(&mut cache, name, &mut add_class);
        }
    }

    for node in blueprint.all_graphs().flat_map(|g| &g.nodes) {
        if !node.capabilities().has_external_dependencies {
            continue;
        }
        for handle in node.referenced_classes() {
            add_class(&mut cache, handle);
        }
        for name in node.referenced_structs() {
            add_struct(&mut cache, &name);
        }
        for pin in &node.pins {
            if let Some(name) = pin.pin_type.class_name() {
                add_class_name(&mut cache, name, &mut add_class);
            }
        }
        if let NodeKind::MacroInstance { macro_blueprint, .. } = &node.kind {
            if *macro_blueprint != blueprint.id {
                cache.blueprints.insert(*macro_blueprint);
            }
        }
    }

    cache
}

/// Recompute the Blueprint's cached dependencies if they were invalidated
pub fn ensure_cached_dependencies<'a>(
    blueprint: &'a mut Blueprint,
    classes: &ClassRegistry,
    structs: &StructRegistry,
) -> &'a DependencyCache {
    if !blueprint.cached_dependencies.up_to_date {
        blueprint.cached_dependencies = gather_dependencies(blueprint, classes, structs);
    }
    &blueprint.cached_dependencies
}

/// Reverse dependency index: which loaded Blueprints depend on a given one
#[derive(Debug, Default)]
pub struct DependentsIndex {
    up_to_date: bool,
    dependents: BTreeMap<BlueprintId, BTreeSet<BlueprintId>>,
}

impl DependentsIndex {
    pub fn invalidate(&mut self) {
        self.up_to_date = false;
    }

    pub fn is_up_to_date(&self) -> bool {
        self.up_to_date
    }

    /// Rebuild from scratch over every loaded Blueprint
    pub fn rebuild(
        &mut self,
        blueprints: &mut BTreeMap<BlueprintId, Blueprint>,
        classes: &ClassRegistry,
        structs: &StructRegistry,
    ) {
        self.dependents.clear();
        for (id, blueprint) in blueprints.iter_mut() {
            for dependency in &ensure_cached_dependencies(blueprint, classes, structs).blueprints {
                self.dependents.entry(*dependency).or_default().insert(*id);
            }
        }
        self.up_to_date = true;
    }

    pub fn dependents_of(&self, id: BlueprintId) -> Vec<BlueprintId> {
        self.dependents
            .get(&id)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }
}
