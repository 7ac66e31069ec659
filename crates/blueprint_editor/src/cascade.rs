//! Structural change notification
//!
//! A structural edit recompiles the edited Blueprint's skeleton and then the
//! skeleton of every loaded Blueprint that derives from it or implements it,
//! parents before children. Observers are told only after the whole cascade.

use std::collections::BTreeSet;

use blueprint_types::{BlueprintId, BlueprintStatus, ClassHandle, ClassKind, CompileState};
use tracing::debug;

use crate::compiler::CompileType;
use crate::editor::EditorContext;
use crate::events::BlueprintEvent;
use crate::Result;

impl EditorContext {
    /// Record a structural edit and recompile everything that depends on it
    pub fn mark_blueprint_as_structurally_modified(&mut self, id: BlueprintId) -> Result<()> {
        let blueprint = self.blueprint_mut(id)?;
        blueprint.cached_dependencies.invalidate();
        let being_created = blueprint.status == BlueprintStatus::BeingCreated;
        if !being_created && blueprint.status != BlueprintStatus::Error {
            blueprint.status = BlueprintStatus::Dirty;
        }
        let idle = blueprint.compile_state == CompileState::Idle;
        self.dependents.invalidate();

        if idle && !being_created {
            self.compile(id, CompileType::SkeletonOnly)?;
            for dependent in self.skeleton_cascade(id) {
                self.compile(dependent, CompileType::SkeletonOnly)?;
            }
        }

        self.emit(BlueprintEvent::Changed(id));
        Ok(())
    }

    /// Record a cosmetic edit: dirty the Blueprint and notify, no recompile
    pub fn mark_blueprint_as_modified(&mut self, id: BlueprintId) -> Result<()> {
        let blueprint = self.blueprint_mut(id)?;
        blueprint.cached_dependencies.invalidate();
        if blueprint.status == BlueprintStatus::UpToDate {
            blueprint.status = BlueprintStatus::Dirty;
        }
        self.emit(BlueprintEvent::Changed(id));
        Ok(())
    }

    /// Every loaded Blueprint whose skeleton must be rebuilt after `root`
    /// changed, in compile order
    pub fn skeleton_cascade(&mut self, root: BlueprintId) -> Vec<BlueprintId> {
        let mut visited = BTreeSet::from([root]);
        let mut order = Vec::new();
        let mut stack = vec![root];
        while let Some(current) = stack.pop() {
            for dependent in self.structural_dependents(current) {
                if !visited.insert(dependent) {
                    continue;
                }
                let busy = self
                    .blueprints
                    .get(&dependent)
                    .is_none_or(|bp| bp.compile_state != CompileState::Idle);
                if busy {
                    debug!(blueprint = %dependent, "skipped in cascade, already compiling");
                    continue;
                }
                order.push(dependent);
                stack.push(dependent);
            }
        }

        // Parents strictly before children
        order.sort_by_key(|id| {
            self.blueprints
                .get(id)
                .and_then(|bp| bp.skeleton_class.or(bp.generated_class))
                .map_or(0, |h| self.classes.depth(self.classes.most_up_to_date(h)))
        });
        order
    }

    /// Every other loaded Blueprint that inherits from `id`, directly or
    /// further down, or implements it when `id` is an interface
    pub fn descendants(&self, id: BlueprintId) -> Vec<BlueprintId> {
        let Some(root) = self.blueprints.get(&id) else {
            return Vec::new();
        };
        let owned_by_root = |h: ClassHandle| self.classes.resolve(h).and_then(|c| c.generated_by) == Some(id);

        self.blueprints
            .values()
            .filter(|bp| bp.id != id)
            .filter(|bp| {
                let inherits = self
                    .classes
                    .super_chain(self.classes.most_up_to_date(bp.parent_class))
                    .into_iter()
                    .any(owned_by_root);
                let implements = root.is_interface()
                    && bp.implemented_interfaces.iter().any(|d| owned_by_root(d.interface));
                inherits || implements
            })
            .map(|bp| bp.id)
            .collect()
    }

    /// Blueprints directly affected by a structural change to `id`: the
    /// implementers of an interface, or the direct subclasses otherwise
    fn structural_dependents(&mut self, id: BlueprintId) -> Vec<BlueprintId> {
        let Some(blueprint) = self.blueprints.get(&id) else {
            return Vec::new();
        };

        if blueprint.is_interface() {
            let Some(interface) = blueprint.generated_class.or(blueprint.skeleton_class) else {
                return Vec::new();
            };
            if !self.dependents.is_up_to_date() {
                self.dependents
                    .rebuild(&mut self.blueprints, &self.classes, &self.structs);
            }
            return self
                .dependents
                .dependents_of(id)
                .into_iter()
                .filter(|other| {
                    self.blueprints
                        .get(other)
                        .is_some_and(|bp| bp.find_interface(interface).is_some())
                })
                .collect();
        }

        let mut out = BTreeSet::new();
        for class in [blueprint.skeleton_class, blueprint.generated_class].into_iter().flatten() {
            for subclass in self.classes.direct_subclasses(class) {
                let owner = self.classes.get(subclass).and_then(|c| match c.kind {
                    ClassKind::Native => None,
                    _ => c.generated_by,
                });
                if let Some(owner) = owner {
                    if owner != id && self.blueprints.contains_key(&owner) {
                        out.insert(owner);
                    }
                }
            }
        }
        out.into_iter().collect()
    }
}
