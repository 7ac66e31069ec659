//! Regeneration on load
//!
//! Produces up-to-date classes for a Blueprint that was just loaded. The
//! operation may be re-entered for the same Blueprint while one of its
//! dependencies is being regenerated; the re-entrant call only preloads.

use std::collections::HashMap;

use blueprint_types::{
    BlueprintId, BlueprintStatus, ClassHandle, ClassKind, CompileState, DefaultObject,
};
use tracing::{debug, info, warn};

use crate::compiler::{CompileOptions, CompileType, is_actor_class};
use crate::conformance::{conform_implemented_events, conform_implemented_interfaces};
use crate::dependencies::ensure_cached_dependencies;
use crate::editor::EditorContext;
use crate::linker::{CONSTRUCTION_SCRIPT_EXPORT, ExportObject, Linker, default_object_name};
use crate::parent_calls::conform_calls_to_parent_functions;
use crate::reconstruct::refresh_all_nodes;
use crate::{EditorError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegenerateOutcome {
    /// Nothing to do
    AlreadyRegenerated,
    /// Re-entrant call; only the idempotent preload ran
    PreloadOnly,
    Compiled,
    /// Macro library nodes were refreshed; macro libraries never compile
    MacroLibraryRefreshed,
    /// Data-only Blueprint; metadata and defaults were carried forward
    DataOnly,
}

impl EditorContext {
    pub fn regenerate_blueprint_class(&mut self, id: BlueprintId) -> Result<RegenerateOutcome> {
        let blueprint = self.blueprint(id)?;
        if blueprint.has_been_regenerated {
            return Ok(RegenerateOutcome::AlreadyRegenerated);
        }
        if blueprint.compile_state != CompileState::Idle {
            debug!(blueprint = %blueprint.name, "re-entrant regeneration, preloading only");
            self.preload_blueprint(id);
            return Ok(RegenerateOutcome::PreloadOnly);
        }

        self.blueprint_mut(id)?.compile_state = CompileState::RegeneratingOnLoad;
        let result = self.regenerate_guarded(id);
        if let Some(blueprint) = self.blueprints.get_mut(&id) {
            blueprint.compile_state = CompileState::Idle;
            if result.is_ok() {
                blueprint.has_been_regenerated = true;
            }
        }
        result
    }

    /// Load whatever exports of the Blueprint still need it. Returns how many
    /// were loaded by this call.
    pub fn preload_blueprint(&mut self, id: BlueprintId) -> usize {
        let Some(blueprint) = self.blueprints.get(&id) else {
            return 0;
        };
        let names = [
            blueprint.name.clone(),
            default_object_name(&blueprint.generated_class_name()),
            CONSTRUCTION_SCRIPT_EXPORT.to_string(),
        ];
        let linker = self
            .linkers
            .entry(id)
            .or_insert_with(|| Linker::new_for_blueprint(blueprint));
        names.iter().filter(|name| linker.preload_by_name(name)).count()
    }

    fn regenerate_guarded(&mut self, id: BlueprintId) -> Result<RegenerateOutcome> {
        self.preload_blueprint(id);

        let dependencies: Vec<BlueprintId> = {
            let blueprint = self
                .blueprints
                .get_mut(&id)
                .ok_or_else(|| EditorError::BlueprintNotFound(id.to_string()))?;
            ensure_cached_dependencies(blueprint, &self.classes, &self.structs)
                .blueprints
                .iter()
                .copied()
                .collect()
        };
        for dependency in dependencies {
            if dependency != id && self.blueprints.contains_key(&dependency) {
                self.regenerate_blueprint_class(dependency)?;
            }
        }

        let blueprint = self.blueprint(id)?;
        let previous_class = blueprint.generated_class;
        let previous_cdo: Option<DefaultObject> = previous_class
            .and_then(|h| self.classes.get(h))
            .and_then(|c| c.default_object.clone());

        let outcome = if blueprint.is_macro_library() {
            self.refresh_macro_library(id)?;
            RegenerateOutcome::MacroLibraryRefreshed
        } else if self.needs_recompile(id)? {
            self.compile_with_options(id, CompileOptions::new(CompileType::Full).regenerating_on_load())?;
            RegenerateOutcome::Compiled
        } else {
            self.conform_data_only(id)?;
            RegenerateOutcome::DataOnly
        };

        if outcome != RegenerateOutcome::MacroLibraryRefreshed {
            self.patch_exports(id);
            self.patch_cdo_subobjects(id, previous_class, previous_cdo);
            self.purge_skeleton_references(id)?;
        }

        self.release_retired_classes(id);
        info!(blueprint = %self.blueprint(id)?.name, ?outcome, "regenerated");
        Ok(outcome)
    }

    /// Whether loading the Blueprint requires a full compile
    fn needs_recompile(&self, id: BlueprintId) -> Result<bool> {
        let blueprint = self.blueprint(id)?;
        let Some(class) = blueprint.generated_class.and_then(|h| self.classes.current(h)) else {
            return Ok(true);
        };
        if !blueprint.is_data_only() {
            return Ok(true);
        }

        let parent = self.classes.most_up_to_date(blueprint.parent_class);
        let parent_changed = self.classes.is_stale(blueprint.parent_class)
            || class.super_class.map(|s| self.classes.most_up_to_date(s)) != Some(parent);
        let stale_frame = class.uber_graph_frame.is_some();
        let missing_scene_root = is_actor_class(&self.classes, parent)
            && class
                .default_object
                .as_ref()
                .is_none_or(|cdo| cdo.subobjects.is_empty());

        debug!(
            blueprint = %blueprint.name,
            parent_changed,
            stale_frame,
            missing_scene_root,
            "data-only recompile check"
        );
        Ok(parent_changed || stale_frame || missing_scene_root)
    }

    fn refresh_macro_library(&mut self, id: BlueprintId) -> Result<()> {
        let blueprint = self
            .blueprints
            .get_mut(&id)
            .ok_or_else(|| EditorError::BlueprintNotFound(id.to_string()))?;
        let parent = self.classes.most_up_to_date(blueprint.parent_class);
        if parent != blueprint.parent_class {
            debug!(blueprint = %blueprint.name, "parent of macro library was reinstanced");
            blueprint.parent_class = parent;
        }
        refresh_all_nodes(blueprint, &self.classes, &mut self.log);
        if blueprint.status != BlueprintStatus::Error {
            blueprint.status = BlueprintStatus::UpToDate;
        }
        Ok(())
    }

    /// Carry parent metadata and inherited defaults into a data-only class
    /// without recompiling it
    fn conform_data_only(&mut self, id: BlueprintId) -> Result<()> {
        let blueprint = self
            .blueprints
            .get_mut(&id)
            .ok_or_else(|| EditorError::BlueprintNotFound(id.to_string()))?;
        let parent = self.classes.most_up_to_date(blueprint.parent_class);
        blueprint.parent_class = parent;
        conform_implemented_events(blueprint, &self.classes, &mut self.log);

        let (metadata, parent_cdo) = match self.classes.current(parent) {
            Some(class) => (class.metadata.clone(), class.default_object.clone()),
            None => return Err(EditorError::ClassNotFound(parent.to_string())),
        };
        let Some(class) = blueprint
            .generated_class
            .map(|h| self.classes.most_up_to_date(h))
            .and_then(|h| self.classes.get_mut(h))
        else {
            return Ok(());
        };
        class.metadata = metadata;
        class.super_class = Some(parent);
        if let (Some(cdo), Some(parent_cdo)) = (class.default_object.as_mut(), parent_cdo) {
            for (name, value) in parent_cdo.properties {
                if !cdo.overridden.contains(&name) {
                    cdo.properties.insert(name, value);
                }
            }
        }
        if blueprint.status != BlueprintStatus::Error {
            blueprint.status = BlueprintStatus::UpToDate;
        }
        Ok(())
    }

    /// Point the linker's class and default object exports at the new versions
    fn patch_exports(&mut self, id: BlueprintId) {
        let Some(blueprint) = self.blueprints.get(&id) else {
            return;
        };
        let Some(class) = blueprint.generated_class.map(|h| self.classes.most_up_to_date(h)) else {
            return;
        };
        let class_name = blueprint.generated_class_name();
        let linker = self
            .linkers
            .entry(id)
            .or_insert_with(|| Linker::new_for_blueprint(blueprint));
        linker.patch_new_object_into_export(&class_name, ExportObject::Class(class));
        linker.patch_new_object_into_export(&default_object_name(&class_name), ExportObject::DefaultObject(class));
    }

    /// Copy subobject state from the previous default object into the new
    /// one, matching subobjects by name. Only keys the new subobject lacks are
    /// carried over: a key its component template defines keeps the template
    /// value, since component edits land on the template.
    fn patch_cdo_subobjects(
        &mut self,
        id: BlueprintId,
        previous_class: Option<ClassHandle>,
        previous_cdo: Option<DefaultObject>,
    ) {
        let Some(current) = self
            .blueprints
            .get(&id)
            .and_then(|bp| bp.generated_class)
            .map(|h| self.classes.most_up_to_date(h))
        else {
            return;
        };
        let Some(previous_cdo) = previous_cdo else {
            let was_compiled = previous_class
                .and_then(|h| self.classes.get(h))
                .is_some_and(|c| c.kind == ClassKind::Generated && c.super_class.is_some());
            if was_compiled {
                warn!(blueprint = %id, "previous class has no default object; subobjects start from defaults");
                self.log.warning(id, "Previous default object missing; subobjects were reinitialized");
            }
            return;
        };
        if previous_class == Some(current) {
            return;
        }
        let Some(cdo) = self.classes.get_mut(current).and_then(|c| c.default_object.as_mut()) else {
            return;
        };
        for subobject in &mut cdo.subobjects {
            let Some(old) = previous_cdo.find_subobject(&subobject.name) else {
                continue;
            };
            if old.class_name != subobject.class_name {
                continue;
            }
            for (key, value) in &old.properties {
                subobject
                    .properties
                    .entry(key.clone())
                    .or_insert_with(|| value.clone());
            }
        }
    }

    /// Replace references to Blueprint skeleton or superseded generated
    /// classes with the authoritative generated class
    fn purge_skeleton_references(&mut self, id: BlueprintId) -> Result<()> {
        let blueprint = self.blueprint(id)?;
        if !blueprint.legacy_need_to_purge_skel_refs || !self.settings.purge_skeleton_references {
            return Ok(());
        }
        let own_class = blueprint.generated_class.map(|h| self.classes.most_up_to_date(h));

        let mut authoritative: HashMap<u32, ClassHandle> = HashMap::new();
        for bp in self.blueprints.values() {
            let Some(generated) = bp.generated_class.map(|h| self.classes.most_up_to_date(h)) else {
                continue;
            };
            authoritative.insert(generated.slot, generated);
            if let Some(skeleton) = bp.skeleton_class {
                authoritative.insert(skeleton.slot, generated);
            }
        }
        let mut replaced = 0;
        let mut redirect = |h: &mut ClassHandle| {
            if let Some(target) = authoritative.get(&h.slot) {
                if *h != *target {
                    *h = *target;
                    replaced += 1;
                }
            }
        };

        if let Some(cdo) = own_class
            .and_then(|h| self.classes.get_mut(h))
            .and_then(|c| c.default_object.as_mut())
        {
            cdo.visit_classes_mut(&mut redirect);
        }
        let blueprint = self.blueprint_mut(id)?;
        for var in &mut blueprint.new_variables {
            var.default_value.visit_classes_mut(&mut redirect);
        }
        for value in blueprint.default_overrides.values_mut() {
            value.visit_classes_mut(&mut redirect);
        }
        blueprint.legacy_need_to_purge_skel_refs = false;
        if replaced > 0 {
            info!(blueprint = %blueprint.name, replaced, "purged skeleton class references");
        }
        Ok(())
    }
}
