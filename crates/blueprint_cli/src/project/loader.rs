//! Project Loader
//!
//! Loads project configuration, class definitions and Blueprint assets from
//! disk. Files that fail to parse are skipped with a warning.

use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::{debug, info, warn};

use super::asset::BlueprintAsset;
use super::config::*;

/// Error type for project loading
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("Project path does not exist: {0}")]
    PathNotFound(PathBuf),

    #[error("Failed to read file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    TomlParseError(#[from] toml::de::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonParseError(#[from] serde_json::Error),
}

/// A Blueprint asset and the file it came from
#[derive(Debug, Clone)]
pub struct AssetFile {
    pub path: PathBuf,
    pub asset: BlueprintAsset,
}

/// A project as found on disk
#[derive(Debug, Clone)]
pub struct Project {
    pub path: PathBuf,
    pub manifest: ProjectManifest,
    pub classes: Vec<ClassDefinition>,
    pub assets: Vec<AssetFile>,
}

impl Project {
    pub fn name(&self) -> &str {
        &self.manifest.project.name
    }

    /// Where the visual logger filter state is kept
    pub fn filters_path(&self) -> PathBuf {
        self.path.join(".bped").join("filters.toml")
    }
}

/// Project loader
pub struct ProjectLoader;

impl ProjectLoader {
    /// Load a project from the given path
    pub async fn load(path: impl AsRef<Path>) -> Result<Project, LoadError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(LoadError::PathNotFound(path.to_path_buf()));
        }

        info!("Loading project from: {}", path.display());

        // Manifest is optional
        let manifest_path = path.join("project.toml");
        let manifest = if manifest_path.exists() {
            let content = fs::read_to_string(&manifest_path).await?;
            toml::from_str(&content)?
        } else {
            debug!("No project.toml found, using defaults");
            ProjectManifest::default()
        };
        info!("Loaded project manifest: {}", manifest.project.name);

        let classes = Self::load_classes(path).await?;
        info!("Loaded {} class definitions", classes.len());

        let assets = Self::load_assets(path).await?;
        info!("Loaded {} blueprint assets", assets.len());

        Ok(Project {
            path: path.to_path_buf(),
            manifest,
            classes,
            assets,
        })
    }

    /// Load all class definitions from the classes/ directory
    async fn load_classes(project_path: &Path) -> Result<Vec<ClassDefinition>, LoadError> {
        let mut classes = Vec::new();
        for path in Self::files_with_suffix(&project_path.join("classes"), ".class.json").await? {
            match Self::load_class(&path).await {
                Ok(class) => {
                    debug!("Loaded class: {}", class.name);
                    classes.push(class);
                }
                Err(e) => {
                    warn!("Failed to load class from {}: {}", path.display(), e);
                }
            }
        }
        Ok(classes)
    }

    async fn load_class(path: &Path) -> Result<ClassDefinition, LoadError> {
        let content = fs::read_to_string(path).await?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Load all Blueprint assets from the blueprints/ directory
    async fn load_assets(project_path: &Path) -> Result<Vec<AssetFile>, LoadError> {
        let mut assets = Vec::new();
        for path in Self::files_with_suffix(&project_path.join("blueprints"), ".bp.json").await? {
            match Self::load_asset(&path).await {
                Ok(asset) => {
                    debug!("Loaded blueprint: {}", asset.blueprint.name);
                    assets.push(AssetFile { path, asset });
                }
                Err(e) => {
                    warn!("Failed to load blueprint from {}: {}", path.display(), e);
                }
            }
        }
        Ok(assets)
    }

    async fn load_asset(path: &Path) -> Result<BlueprintAsset, LoadError> {
        let content = fs::read_to_string(path).await?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Save a Blueprint asset to disk
    pub async fn save_asset(path: &Path, asset: &BlueprintAsset) -> Result<(), LoadError> {
        if let Some(dir) = path.parent() {
            if !dir.exists() {
                fs::create_dir_all(dir).await?;
            }
        }
        let content = serde_json::to_string_pretty(asset)?;
        fs::write(path, content).await?;
        debug!("Saved blueprint: {}", asset.blueprint.name);
        Ok(())
    }

    /// Files in `dir` ending with `suffix`, sorted by path so load order is
    /// stable across platforms
    async fn files_with_suffix(dir: &Path, suffix: &str) -> Result<Vec<PathBuf>, LoadError> {
        let mut files = Vec::new();
        if !dir.exists() {
            debug!("No {} directory found", dir.display());
            return Ok(files);
        }

        let mut entries = fs::read_dir(dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                if name.ends_with(suffix) {
                    files.push(path);
                }
            }
        }
        files.sort();
        Ok(files)
    }
}
