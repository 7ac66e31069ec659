//! Editor Context
//!
//! Owns every loaded Blueprint together with the class registry, the struct
//! registry, the compiler and the shared caches. All editing entry points are
//! methods on [`EditorContext`]; they run to completion on the calling thread.

use std::collections::{BTreeMap, HashMap};

use blueprint_types::{
    Blueprint, BlueprintId, BlueprintStatus, BlueprintType, Class, ClassHandle, ClassKind,
    ClassRegistry, CompileState, StructRegistry,
};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::compiler::{CompileContext, CompileOptions, CompileType, KismetCompiler, LayoutCompiler};
use crate::confirm::{AutoConfirm, ConfirmationPrompt};
use crate::conformance::{conform_implemented_events, conform_implemented_interfaces};
use crate::dependencies::DependentsIndex;
use crate::events::BlueprintEvent;
use crate::linker::Linker;
use crate::naming::validate_kismet_name;
use crate::parent_calls::conform_calls_to_parent_functions;
use crate::reconstruct::refresh_all_nodes;
use crate::results_log::CompilerResultsLog;
use crate::settings::EditorSettings;
use crate::{EditorError, Result};

// ─────────────────────────────────────────────────────────────────────────────
// Editor Context
// ─────────────────────────────────────────────────────────────────────────────

pub struct EditorContext {
    pub(crate) classes: ClassRegistry,
    pub(crate) structs: StructRegistry,
    pub(crate) blueprints: BTreeMap<BlueprintId, Blueprint>,
    pub(crate) linkers: HashMap<BlueprintId, Linker>,
    pub(crate) compiler: Box<dyn KismetCompiler>,
    pub(crate) prompt: Box<dyn ConfirmationPrompt>,
    pub(crate) settings: EditorSettings,
    /// Which loaded Blueprints depend on which; rebuilt on demand
    pub(crate) dependents: DependentsIndex,
    pub(crate) log: CompilerResultsLog,

    /// Broadcast channel for change notifications
    events: broadcast::Sender<BlueprintEvent>,
    next_blueprint_id: u32,
}

impl EditorContext {
    pub fn new(classes: ClassRegistry, settings: EditorSettings) -> Self {
        let (events, _) = broadcast::channel(1024);
        Self {
            classes,
            structs: StructRegistry::new(),
            blueprints: BTreeMap::new(),
            linkers: HashMap::new(),
            compiler: Box::new(LayoutCompiler::new()),
            prompt: Box::new(AutoConfirm(false)),
            settings,
            dependents: DependentsIndex::default(),
            log: CompilerResultsLog::new(),
            events,
            next_blueprint_id: 1,
        }
    }

    pub fn with_compiler(mut self, compiler: impl KismetCompiler + 'static) -> Self {
        self.compiler = Box::new(compiler);
        self
    }

    pub fn with_prompt(mut self, prompt: impl ConfirmationPrompt + 'static) -> Self {
        self.prompt = Box::new(prompt);
        self
    }

    pub fn with_structs(mut self, structs: StructRegistry) -> Self {
        self.structs = structs;
        self
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Accessors
    // ─────────────────────────────────────────────────────────────────────────

    pub fn classes(&self) -> &ClassRegistry {
        &self.classes
    }

    pub fn classes_mut(&mut self) -> &mut ClassRegistry {
        &mut self.classes
    }

    pub fn structs(&self) -> &StructRegistry {
        &self.structs
    }

    pub fn structs_mut(&mut self) -> &mut StructRegistry {
        &mut self.structs
    }

    pub fn settings(&self) -> &EditorSettings {
        &self.settings
    }

    pub fn blueprint(&self, id: BlueprintId) -> Result<&Blueprint> {
        self.blueprints
            .get(&id)
            .ok_or_else(|| EditorError::BlueprintNotFound(id.to_string()))
    }

    pub fn blueprint_mut(&mut self, id: BlueprintId) -> Result<&mut Blueprint> {
        self.blueprints
            .get_mut(&id)
            .ok_or_else(|| EditorError::BlueprintNotFound(id.to_string()))
    }

    pub fn blueprints(&self) -> impl Iterator<Item = &Blueprint> {
        self.blueprints.values()
    }

    pub fn find_blueprint_by_name(&self, name: &str) -> Option<BlueprintId> {
        self.blueprints.values().find(|bp| bp.name == name).map(|bp| bp.id)
    }

    pub fn linker(&self, id: BlueprintId) -> Option<&Linker> {
        self.linkers.get(&id)
    }

    /// Subscribe to change notifications
    pub fn subscribe(&self) -> broadcast::Receiver<BlueprintEvent> {
        self.events.subscribe()
    }

    pub fn results_log(&self) -> &CompilerResultsLog {
        &self.log
    }

    pub fn results_log_mut(&mut self) -> &mut CompilerResultsLog {
        &mut self.log
    }

    pub(crate) fn emit(&self, event: BlueprintEvent) {
        // No receivers is fine
        let _ = self.events.send(event);
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Blueprint Lifecycle
    // ─────────────────────────────────────────────────────────────────────────

    /// Create a Blueprint deriving from `parent` and compile it
    pub fn create_blueprint(
        &mut self,
        name: &str,
        parent: ClassHandle,
        blueprint_type: BlueprintType,
    ) -> Result<BlueprintId> {
        validate_kismet_name(name, self.settings.max_name_length)?;
        if self.find_blueprint_by_name(name).is_some() {
            return Err(EditorError::NameInUse(name.to_string()));
        }
        let parent = self.classes.most_up_to_date(parent);
        let parent_class = self
            .classes
            .current(parent)
            .ok_or_else(|| EditorError::ClassNotFound(parent.to_string()))?;
        if parent_class.is_interface() && blueprint_type != BlueprintType::Interface {
            return Err(EditorError::NotAllowed(format!(
                "cannot derive a Blueprint from interface {}",
                parent_class.name
            )));
        }

        let id = self.allocate_id();
        let blueprint = Blueprint::new(id, name, parent).with_type(blueprint_type);
        if self.classes.find_by_name(&blueprint.generated_class_name()).is_some() {
            return Err(EditorError::NameInUse(blueprint.generated_class_name()));
        }
        self.blueprints.insert(id, blueprint);
        self.dependents.invalidate();

        self.compile(id, CompileType::Full)?;
        let blueprint = self.blueprint_mut(id)?;
        blueprint.has_been_regenerated = true;
        let linker = Linker::new_for_blueprint(blueprint);
        self.linkers.insert(id, linker);
        info!(blueprint = %name, "created {}", id);
        Ok(id)
    }

    /// Register a deserialized Blueprint. Its classes are produced later by
    /// [`Self::regenerate_blueprint_class`].
    pub fn load_blueprint(&mut self, mut blueprint: Blueprint) -> Result<BlueprintId> {
        let id = blueprint.id;
        if self.blueprints.contains_key(&id) {
            return Err(EditorError::NotAllowed(format!("{} is already loaded", id)));
        }
        blueprint.compile_state = CompileState::Idle;
        blueprint.has_been_regenerated = false;
        blueprint.cached_dependencies.invalidate();
        if blueprint.status == BlueprintStatus::BeingCreated {
            blueprint.status = BlueprintStatus::Dirty;
        }

        self.compiler.recover_corrupted_blueprint(&mut blueprint, &mut self.log);
        let mut cx = CompileContext {
            classes: &mut self.classes,
            structs: &self.structs,
            log: &mut self.log,
        };
        self.compiler.refresh_variables(&mut blueprint, &mut cx);

        self.linkers.insert(id, Linker::new_for_blueprint(&blueprint));
        self.next_blueprint_id = self.next_blueprint_id.max(id.0 + 1);
        debug!(blueprint = %blueprint.name, "loaded {}", id);
        self.blueprints.insert(id, blueprint);
        self.dependents.invalidate();
        Ok(id)
    }

    /// Claim the generated class name of a Blueprint that is about to be
    /// loaded, so other assets can refer to it before it is regenerated
    pub fn reserve_generated_class(&mut self, owner: BlueprintId, class_name: &str) -> ClassHandle {
        if let Some(existing) = self.classes.find_by_name(class_name) {
            return existing;
        }
        let mut placeholder = Class::native(class_name, None);
        placeholder.kind = ClassKind::Generated;
        placeholder.generated_by = Some(owner);
        placeholder.default_object = None;
        self.classes.install(placeholder)
    }

    /// Remove a Blueprint and its classes
    pub fn remove_blueprint(&mut self, id: BlueprintId) -> Result<()> {
        let mut blueprint = self
            .blueprints
            .remove(&id)
            .ok_or_else(|| EditorError::BlueprintNotFound(id.to_string()))?;
        self.compiler
            .remove_blueprint_generated_classes(&mut blueprint, &mut self.classes);
        self.linkers.remove(&id);
        self.dependents.invalidate();
        info!(blueprint = %blueprint.name, "removed {}", id);
        self.emit(BlueprintEvent::Removed(id));
        Ok(())
    }

    fn allocate_id(&mut self) -> BlueprintId {
        while self.blueprints.contains_key(&BlueprintId(self.next_blueprint_id)) {
            self.next_blueprint_id += 1;
        }
        let id = BlueprintId(self.next_blueprint_id);
        self.next_blueprint_id += 1;
        id
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Compilation
    // ─────────────────────────────────────────────────────────────────────────

    /// Compile a Blueprint and release its superseded class generations. A
    /// Blueprint already being compiled or regenerated is left alone.
    pub fn compile(&mut self, id: BlueprintId, compile_type: CompileType) -> Result<()> {
        let blueprint = self.blueprint_mut(id)?;
        if blueprint.compile_state != CompileState::Idle {
            debug!(blueprint = %blueprint.name, state = ?blueprint.compile_state, "compile skipped, busy");
            return Ok(());
        }
        blueprint.compile_state = CompileState::Compiling;
        let result = self.compile_with_options(id, CompileOptions::new(compile_type));
        if let Some(blueprint) = self.blueprints.get_mut(&id) {
            blueprint.compile_state = CompileState::Idle;
        }
        self.release_retired_classes(id);
        result
    }

    /// Conform, reconstruct and hand the Blueprint to the compiler. Does not
    /// touch the compile state; callers own the re-entrancy guard.
    pub(crate) fn compile_with_options(&mut self, id: BlueprintId, options: CompileOptions) -> Result<()> {
        let errors_before = self.log.error_count();
        let blueprint = self
            .blueprints
            .get_mut(&id)
            .ok_or_else(|| EditorError::BlueprintNotFound(id.to_string()))?;

        if blueprint.is_macro_library() {
            // Macros are expanded at their call sites and never compiled
            blueprint.parent_class = self.classes.most_up_to_date(blueprint.parent_class);
            refresh_all_nodes(blueprint, &self.classes, &mut self.log);
            blueprint.status = if self.log.error_count() > errors_before {
                BlueprintStatus::Error
            } else {
                BlueprintStatus::UpToDate
            };
            return Ok(());
        }

        if options.compile_type == CompileType::Full {
            if blueprint.status == BlueprintStatus::Error {
                blueprint.status = BlueprintStatus::Dirty;
            }
            conform_implemented_interfaces(blueprint, &self.classes, &mut self.log);
            conform_implemented_events(blueprint, &self.classes, &mut self.log);
            conform_calls_to_parent_functions(blueprint, &self.classes, &mut self.log);
            let broken = refresh_all_nodes(blueprint, &self.classes, &mut self.log);
            if broken > 0 {
                self.log
                    .note(id, format!("Broke {} links that no longer fit their pins", broken));
            }
        }

        let mut cx = CompileContext {
            classes: &mut self.classes,
            structs: &self.structs,
            log: &mut self.log,
        };
        if let Err(err) = self.compiler.compile_blueprint(blueprint, &options, &mut cx) {
            warn!(blueprint = %blueprint.name, "compile failed: {}", err);
            self.log.error(id, err.to_string());
            blueprint.status = BlueprintStatus::Error;
            return Err(err);
        }

        let failed = self.log.error_count() > errors_before || blueprint.status == BlueprintStatus::Error;
        blueprint.status = match (failed, options.compile_type, blueprint.status) {
            (true, _, _) => BlueprintStatus::Error,
            (false, CompileType::Full, _) => BlueprintStatus::UpToDate,
            (false, CompileType::SkeletonOnly, status) => status,
        };
        blueprint.cached_dependencies.invalidate();
        self.dependents.invalidate();

        self.emit(BlueprintEvent::Compiled {
            blueprint: id,
            compile_type: options.compile_type,
        });
        Ok(())
    }

    /// Free the superseded generations of a Blueprint's classes. Stale
    /// handles keep resolving to the current generation afterwards.
    pub(crate) fn release_retired_classes(&mut self, id: BlueprintId) {
        let Some(blueprint) = self.blueprints.get(&id) else {
            return;
        };
        for handle in [blueprint.skeleton_class, blueprint.generated_class].into_iter().flatten() {
            let freed = self.classes.release_retired(handle);
            if freed > 0 {
                debug!("released {} retired generations of {}", freed, handle);
            }
        }
    }
}
