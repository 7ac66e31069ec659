//! Editor Session
//!
//! Binds a loaded [`Project`] to an [`EditorContext`]: registers the native
//! classes, loads and regenerates every Blueprint asset, and remembers which
//! file each Blueprint came from so edits can be written back.

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use tokio::sync::broadcast::{self, error::TryRecvError};
use tracing::{debug, error, info, warn};

use blueprint_editor::blueprint_types::{BlueprintId, ClassRegistry};
use blueprint_editor::{
    BlueprintEvent, ConfirmationPrompt, EditorContext, EditorError, LogMessage, RegenerateOutcome,
    Severity,
};
use visual_logger::{FilterError, LogVerbosity, VisualLoggerFilters};

use crate::project::{AssetError, BlueprintAsset, ClassDefinition, LoadError, Project, ProjectLoader};

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Editor(#[from] EditorError),

    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Asset(#[from] AssetError),

    #[error(transparent)]
    Filter(#[from] FilterError),
}

pub struct Session {
    project: Project,
    editor: EditorContext,
    filters: VisualLoggerFilters,
    asset_paths: BTreeMap<BlueprintId, PathBuf>,
    outcomes: BTreeMap<BlueprintId, RegenerateOutcome>,
    changes: broadcast::Receiver<BlueprintEvent>,
}

impl Session {
    /// Register classes, load every asset and run the load pipeline
    pub fn open(project: Project, prompt: impl ConfirmationPrompt + 'static) -> Self {
        let classes = register_classes(&project.classes);
        let mut editor =
            EditorContext::new(classes, project.manifest.editor.clone()).with_prompt(prompt);

        // Claim every generated class name first so assets can import each other
        for file in &project.assets {
            let blueprint = &file.asset.blueprint;
            editor.reserve_generated_class(blueprint.id, &file.asset.generated_class_name());
        }

        let mut asset_paths = BTreeMap::new();
        for file in &project.assets {
            let name = file.asset.blueprint.name.clone();
            let loaded = file
                .asset
                .clone()
                .resolve(editor.classes())
                .map_err(SessionError::from)
                .and_then(|bp| editor.load_blueprint(bp).map_err(SessionError::from));
            match loaded {
                Ok(id) => {
                    asset_paths.insert(id, file.path.clone());
                }
                Err(e) => warn!("Failed to load blueprint {} from {}: {}", name, file.path.display(), e),
            }
        }

        let mut outcomes = BTreeMap::new();
        for &id in asset_paths.keys() {
            match editor.regenerate_blueprint_class(id) {
                Ok(outcome) => {
                    outcomes.insert(id, outcome);
                }
                Err(e) => {
                    error!(blueprint = %id, "Regeneration failed: {}", e);
                    editor.results_log_mut().error(id, format!("regeneration failed: {}", e));
                }
            }
        }

        let mut filters = VisualLoggerFilters::new(project.manifest.visual_logger.clone());
        let filters_path = project.filters_path();
        if filters_path.exists() {
            if let Err(e) = filters.load(&filters_path) {
                warn!("Failed to load filters from {}: {}", filters_path.display(), e);
            }
        }
        for blueprint in editor.blueprints() {
            filters.add_category(&blueprint.name, LogVerbosity::ALL);
        }

        info!(
            project = %project.name(),
            blueprints = asset_paths.len(),
            errors = editor.results_log().error_count(),
            warnings = editor.results_log().warning_count(),
            "Session ready"
        );

        let changes = editor.subscribe();
        Self {
            project,
            editor,
            filters,
            asset_paths,
            outcomes,
            changes,
        }
    }

    pub fn project(&self) -> &Project {
        &self.project
    }

    pub fn editor(&self) -> &EditorContext {
        &self.editor
    }

    pub fn editor_mut(&mut self) -> &mut EditorContext {
        &mut self.editor
    }

    pub fn filters(&self) -> &VisualLoggerFilters {
        &self.filters
    }

    pub fn filters_mut(&mut self) -> &mut VisualLoggerFilters {
        &mut self.filters
    }

    /// How loading went for a Blueprint, if its regeneration succeeded
    pub fn outcome(&self, id: BlueprintId) -> Option<RegenerateOutcome> {
        self.outcomes.get(&id).copied()
    }

    pub fn find(&self, name: &str) -> Result<BlueprintId, SessionError> {
        self.editor
            .find_blueprint_by_name(name)
            .ok_or_else(|| EditorError::BlueprintNotFound(name.to_string()).into())
    }

    /// Results-log messages that pass the visual logger filters. Each
    /// Blueprint is a category; messages without one are always shown.
    pub fn visible_messages(&self) -> Vec<&LogMessage> {
        self.editor
            .results_log()
            .messages()
            .iter()
            .filter(|message| {
                let category = message
                    .blueprint
                    .and_then(|id| self.editor.blueprint(id).ok())
                    .map(|bp| bp.name.as_str())
                    .unwrap_or_default();
                self.filters
                    .should_display_category(category, verbosity_of(message.severity))
            })
            .collect()
    }

    /// Write every Blueprint changed since the session opened back to its
    /// asset file. Returns how many files were written.
    pub async fn save_modified(&mut self) -> Result<usize, SessionError> {
        let mut modified = BTreeSet::new();
        loop {
            match self.changes.try_recv() {
                Ok(event) => {
                    modified.insert(event.blueprint());
                }
                Err(TryRecvError::Lagged(skipped)) => {
                    debug!(skipped, "change notifications lagged, saving every asset");
                    modified.extend(self.asset_paths.keys().copied());
                }
                Err(_) => break,
            }
        }

        let mut written = 0;
        for id in modified {
            let (Some(path), Ok(blueprint)) = (self.asset_paths.get(&id), self.editor.blueprint(id)) else {
                continue;
            };
            let asset = BlueprintAsset::from_blueprint(blueprint, self.editor.classes())?;
            ProjectLoader::save_asset(path, &asset).await?;
            info!(blueprint = %blueprint.name, path = %path.display(), "Saved");
            written += 1;
        }
        Ok(written)
    }

    /// Persist the visual logger filter state next to the project
    pub fn save_filters(&self) -> Result<(), SessionError> {
        self.filters.save(&self.project.filters_path())?;
        Ok(())
    }
}

/// Severity of a results-log message as a log verbosity
pub fn verbosity_of(severity: Severity) -> LogVerbosity {
    match severity {
        Severity::Error => LogVerbosity::Error,
        Severity::Warning => LogVerbosity::Warning,
        Severity::Note => LogVerbosity::Log,
    }
}

/// Register class definitions, supers and interfaces before the classes that
/// use them. Definitions whose dependencies never resolve are skipped.
fn register_classes(definitions: &[ClassDefinition]) -> ClassRegistry {
    let mut classes = ClassRegistry::new();
    let mut pending: Vec<&ClassDefinition> = definitions.iter().collect();

    while !pending.is_empty() {
        let before = pending.len();
        pending.retain(|def| {
            let super_class = match &def.super_class {
                Some(name) => match classes.find_by_name(name) {
                    Some(handle) => Some(handle),
                    None => return true,
                },
                None => None,
            };
            let Some(interfaces) = def
                .interfaces
                .iter()
                .map(|name| classes.find_by_name(name))
                .collect::<Option<Vec<_>>>()
            else {
                return true;
            };

            if let Err(e) = classes.register(def.to_class(super_class, interfaces)) {
                warn!("Skipping class {}: {}", def.name, e);
            }
            false
        });

        if pending.len() == before {
            for def in &pending {
                warn!("Skipping class {}: super class or interface not found", def.name);
            }
            break;
        }
    }
    classes
}

#[cfg(test)]
mod tests {
    use super::*;
    use blueprint_editor::AutoConfirm;

    fn definition(json: &str) -> ClassDefinition {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_classes_register_in_dependency_order() {
        let classes = register_classes(&[
            definition(r#"{ "name": "Door", "super_class": "Actor", "interfaces": ["Usable"] }"#),
            definition(r#"{ "name": "Usable", "interface": true }"#),
            definition(r#"{ "name": "Actor" }"#),
            definition(r#"{ "name": "Orphan", "super_class": "Missing" }"#),
        ]);

        let door = classes.find_by_name("Door").unwrap();
        let actor = classes.find_by_name("Actor").unwrap();
        let usable = classes.find_by_name("Usable").unwrap();
        assert!(classes.is_child_of(door, actor));
        assert!(classes.implements_interface(door, usable));
        assert!(classes.find_by_name("Orphan").is_none());
    }

    #[test]
    fn test_open_empty_project() {
        let project = Project {
            path: PathBuf::from("/tmp/bped-empty"),
            manifest: Default::default(),
            classes: Vec::new(),
            assets: Vec::new(),
        };
        let session = Session::open(project, AutoConfirm(true));
        assert_eq!(session.editor().blueprints().count(), 0);
        assert!(session.visible_messages().is_empty());
    }

    #[tokio::test]
    async fn test_rename_writes_back_changed_assets() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path();
        std::fs::create_dir(path.join("classes")).unwrap();
        std::fs::write(path.join("classes").join("actor.class.json"), r#"{ "name": "Actor" }"#).unwrap();
        std::fs::create_dir(path.join("blueprints")).unwrap();
        std::fs::write(
            path.join("blueprints").join("base.bp.json"),
            r#"{
                "imports": ["Actor"],
                "blueprint": {
                    "id": 1,
                    "name": "BP_Base",
                    "parent_class": { "slot": 0, "generation": 0 },
                    "new_variables": [{
                        "name": "Health",
                        "guid": "6f1c1a52-3c1e-4d7a-9a43-5b2f0c9e8d11",
                        "type": { "type": "Integer" }
                    }]
                }
            }"#,
        )
        .unwrap();
        std::fs::write(
            path.join("blueprints").join("child.bp.json"),
            r#"{
                "imports": ["BP_Base_C"],
                "blueprint": { "id": 2, "name": "BP_Child", "parent_class": { "slot": 0, "generation": 0 } }
            }"#,
        )
        .unwrap();

        let project = ProjectLoader::load(path).await.unwrap();
        let mut session = Session::open(project, AutoConfirm(true));
        let base = session.find("BP_Base").unwrap();
        let child = session.find("BP_Child").unwrap();
        assert_eq!(session.outcome(base), Some(RegenerateOutcome::Compiled));

        let classes = session.editor().classes();
        let parent = session.editor().blueprint(child).unwrap().parent_class;
        assert_eq!(classes.name_of(classes.most_up_to_date(parent)), Some("BP_Base_C"));

        session.editor_mut().rename_member_variable(base, "Health", "Hp").unwrap();
        assert!(session.save_modified().await.unwrap() >= 1);
        assert_eq!(session.save_modified().await.unwrap(), 0);

        let reloaded = ProjectLoader::load(path).await.unwrap();
        let saved = reloaded
            .assets
            .iter()
            .find(|file| file.asset.blueprint.name == "BP_Base")
            .unwrap();
        assert_eq!(saved.asset.blueprint.new_variables[0].name, "Hp");
        assert_eq!(saved.asset.imports, vec!["Actor".to_string()]);
    }

    #[test]
    fn test_messages_follow_category_filters() {
        let project = Project {
            path: PathBuf::from("/tmp/bped-filters"),
            manifest: Default::default(),
            classes: vec![definition(r#"{ "name": "Actor" }"#)],
            assets: Vec::new(),
        };
        let mut session = Session::open(project, AutoConfirm(true));
        let actor = session.editor().classes().find_by_name("Actor").unwrap();
        let door = session
            .editor_mut()
            .create_blueprint("BP_Door", actor, blueprint_editor::blueprint_types::BlueprintType::Normal)
            .unwrap();
        session.filters_mut().add_category("BP_Door", LogVerbosity::Warning);
        session.editor_mut().results_log_mut().warning(door, "slow construction script");
        session.editor_mut().results_log_mut().note(door, "compiled");

        let visible: Vec<&str> = session.visible_messages().iter().map(|m| m.text.as_str()).collect();
        assert!(visible.contains(&"slow construction script"));
        assert!(!visible.contains(&"compiled"));

        session.filters_mut().set_search_string("Gate");
        assert!(session.visible_messages().iter().all(|m| m.blueprint.is_none()));
    }

    #[test]
    fn test_severity_maps_to_verbosity() {
        assert_eq!(verbosity_of(Severity::Error), LogVerbosity::Error);
        assert!(verbosity_of(Severity::Note) > verbosity_of(Severity::Warning));
    }
}
