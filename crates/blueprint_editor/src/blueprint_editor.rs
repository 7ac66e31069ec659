//! Blueprint Editor - Structural reconciliation and incremental recompilation
//!
//! [`EditorContext`] owns the loaded Blueprints and the class registry. Every
//! edit goes through it: the edit is validated and applied, the affected nodes
//! are patched or reconstructed, and the structural cascade recompiles the
//! skeleton classes of everything that depends on the edited Blueprint.
//!
//! Loading goes through [`EditorContext::regenerate_blueprint_class`], which
//! tolerates circular dependencies between Blueprints.

pub use blueprint_types;

mod cascade;
mod compiler;
mod confirm;
mod conformance;
mod dependencies;
mod editor;
mod error;
mod events;
mod graphs;
mod interfaces;
mod linker;
mod member_resolution;
mod naming;
mod parent_calls;
mod reconstruct;
mod regenerate;
mod results_log;
mod settings;
mod variables;

pub use compiler::{
    ACTOR_CLASS, CompileContext, CompileOptions, CompileType, DEFAULT_SCENE_ROOT, KismetCompiler,
    LayoutCompiler, SCENE_COMPONENT_CLASS, TIMELINE_COMPONENT_CLASS, is_actor_class,
};
pub use confirm::{AutoConfirm, ConfirmRequest, ConfirmationPrompt};
pub use conformance::{
    conform_implemented_events, conform_implemented_interfaces, convert_event_to_custom_event,
};
pub use dependencies::{DependentsIndex, ensure_cached_dependencies, gather_dependencies};
pub use editor::EditorContext;
pub use error::{EditorError, Result};
pub use events::BlueprintEvent;
pub use linker::{CONSTRUCTION_SCRIPT_EXPORT, ExportObject, Linker, ObjectExport, default_object_name};
pub use member_resolution::{
    FunctionResolution, PropertyResolution, ResolveContext, authoritative_class, layout_class,
    resolve_function, resolve_variable,
};
pub use naming::{find_unique_kismet_name, is_graph_name_unique, is_name_used, validate_kismet_name};
pub use parent_calls::conform_calls_to_parent_functions;
pub use reconstruct::refresh_all_nodes;
pub use regenerate::RegenerateOutcome;
pub use results_log::{CompilerResultsLog, LogMessage, NodeRef, Severity};
pub use settings::{EditorSettings, SettingsError};
