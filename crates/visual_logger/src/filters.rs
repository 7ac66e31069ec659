//! Filter index
//!
//! `categories` owns the filter entries and `fast_lookup` maps a name to its
//! position. Growing the list always rebuilds the whole index; removal uses
//! `swap_remove`, which moves at most one entry, so only that entry's slot is
//! patched.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, info};
use wildmatch::WildMatch;

use crate::category::{CategoryFilter, LogVerbosity, NO_CATEGORY};
use crate::settings::FilterSettings;
use crate::{FilterError, Result};

/// Events broadcast when the filter set changes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterEvent {
    CategoryAdded(String),
    CategoryRemoved(String),
    Reset,
}

/// On-disk form of the filter state
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct SavedFilters {
    search_string: String,
    object_filters: Vec<String>,
    categories: Vec<CategoryFilter>,
}

pub struct VisualLoggerFilters {
    categories: Vec<CategoryFilter>,
    fast_lookup: HashMap<String, usize>,
    search_string: String,
    object_filters: Vec<String>,
    settings: FilterSettings,
    events: broadcast::Sender<FilterEvent>,
}

impl VisualLoggerFilters {
    pub fn new(settings: FilterSettings) -> Self {
        let (events, _) = broadcast::channel(1024);
        Self {
            categories: Vec::new(),
            fast_lookup: HashMap::new(),
            search_string: String::new(),
            object_filters: Vec::new(),
            settings,
            events,
        }
    }

    /// Subscribe to filter changes
    pub fn subscribe(&self) -> broadcast::Receiver<FilterEvent> {
        self.events.subscribe()
    }

    pub fn settings(&self) -> &FilterSettings {
        &self.settings
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Categories
    // ─────────────────────────────────────────────────────────────────────────

    /// Add a category, or mark an existing one as in use again
    pub fn add_category(&mut self, name: &str, verbosity: LogVerbosity) {
        let added = match self.fast_lookup.get(name) {
            Some(&index) => {
                self.categories[index].in_use = true;
                false
            }
            None => {
                self.categories.push(CategoryFilter::new(name, verbosity));
                true
            }
        };

        self.rebuild_fast_lookup();

        if added {
            debug!(category = %name, ?verbosity, "Added log category");
            let _ = self.events.send(FilterEvent::CategoryAdded(name.to_string()));
        }
    }

    /// Remove a category. Returns false if it was not present.
    pub fn remove_category(&mut self, name: &str) -> bool {
        let Some(index) = self.fast_lookup.remove(name) else {
            return false;
        };
        self.categories.swap_remove(index);
        if let Some(moved) = self.categories.get(index) {
            self.fast_lookup.insert(moved.name.clone(), index);
        }

        debug!(category = %name, "Removed log category");
        let _ = self.events.send(FilterEvent::CategoryRemoved(name.to_string()));
        true
    }

    /// Look up a category, returning an empty disabled filter when unknown
    pub fn get_category_by_name(&self, name: &str) -> &CategoryFilter {
        self.fast_lookup
            .get(name)
            .and_then(|&index| self.categories.get(index))
            .unwrap_or(&NO_CATEGORY)
    }

    pub fn get_category_by_name_mut(&mut self, name: &str) -> Option<&mut CategoryFilter> {
        let index = *self.fast_lookup.get(name)?;
        self.categories.get_mut(index)
    }

    pub fn contains_category(&self, name: &str) -> bool {
        self.fast_lookup.contains_key(name)
    }

    pub fn categories(&self) -> &[CategoryFilter] {
        &self.categories
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    pub fn set_category_enabled(&mut self, name: &str, enabled: bool) -> Result<()> {
        let category = self
            .get_category_by_name_mut(name)
            .ok_or_else(|| FilterError::CategoryNotFound(name.to_string()))?;
        category.enabled = enabled;
        Ok(())
    }

    pub fn set_category_verbosity(&mut self, name: &str, verbosity: LogVerbosity) -> Result<()> {
        let category = self
            .get_category_by_name_mut(name)
            .ok_or_else(|| FilterError::CategoryNotFound(name.to_string()))?;
        category.verbosity = verbosity;
        Ok(())
    }

    pub fn enable_all_categories(&mut self) {
        for category in &mut self.categories {
            category.enabled = true;
        }
    }

    pub fn disable_all_categories(&mut self) {
        for category in &mut self.categories {
            category.enabled = false;
        }
    }

    /// Whether a line of `name` at `verbosity` should be shown. Lines with no
    /// category are always shown; unknown categories never are.
    pub fn should_display_category(&self, name: &str, verbosity: LogVerbosity) -> bool {
        if name.is_empty() {
            return true;
        }
        let Some(category) = self.fast_lookup.get(name).and_then(|&i| self.categories.get(i)) else {
            return false;
        };
        category.accepts(verbosity) && self.matches_search(&category.name)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Search and object filters
    // ─────────────────────────────────────────────────────────────────────────

    pub fn search_string(&self) -> &str {
        &self.search_string
    }

    /// Set the category search. Plain text matches anywhere in the name;
    /// `*` and `?` are honored as wildcards.
    pub fn set_search_string(&mut self, search: impl Into<String>) {
        self.search_string = search.into();
    }

    fn matches_search(&self, name: &str) -> bool {
        if self.search_string.is_empty() {
            return true;
        }
        let search = self.search_string.to_lowercase();
        let pattern = if search.contains(['*', '?']) {
            search
        } else {
            format!("*{}*", search)
        };
        WildMatch::new(&pattern).matches(&name.to_lowercase())
    }

    pub fn object_filters(&self) -> &[String] {
        &self.object_filters
    }

    pub fn add_object_filter(&mut self, pattern: impl Into<String>) {
        let pattern = pattern.into();
        if !self.object_filters.contains(&pattern) {
            self.object_filters.push(pattern);
        }
    }

    pub fn remove_object_filter(&mut self, pattern: &str) -> bool {
        let before = self.object_filters.len();
        self.object_filters.retain(|p| p != pattern);
        self.object_filters.len() != before
    }

    /// Whether entries logged by `object_name` pass the object filters.
    /// With no filters every object passes.
    pub fn should_display_object(&self, object_name: &str) -> bool {
        self.object_filters.is_empty()
            || self
                .object_filters
                .iter()
                .any(|pattern| WildMatch::new(pattern).matches(object_name))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Reset and persistence
    // ─────────────────────────────────────────────────────────────────────────

    /// Forget the current log. With persistent filters the categories stay
    /// configured and are only marked unused; otherwise they are dropped.
    pub fn reset(&mut self) {
        self.search_string.clear();
        self.object_filters.clear();
        if self.settings.persistent_filters {
            for category in &mut self.categories {
                category.in_use = false;
            }
        } else {
            self.categories.clear();
        }
        self.rebuild_fast_lookup();

        debug!(persistent = self.settings.persistent_filters, "Reset visual logger filters");
        let _ = self.events.send(FilterEvent::Reset);
    }

    /// Write the filter state to a TOML file
    pub fn save(&self, path: &Path) -> Result<()> {
        let saved = SavedFilters {
            search_string: self.search_string.clone(),
            object_filters: self.object_filters.clone(),
            categories: self.categories.clone(),
        };
        let content = toml::to_string_pretty(&saved)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        info!(path = %path.display(), categories = self.categories.len(), "Saved visual logger filters");
        Ok(())
    }

    /// Merge filter state from a TOML file. Known categories take the saved
    /// configuration; unknown ones are added as not in use.
    pub fn load(&mut self, path: &Path) -> Result<()> {
        let content = std::fs::read_to_string(path)?;
        let saved: SavedFilters = toml::from_str(&content)?;

        self.search_string = saved.search_string;
        self.object_filters = saved.object_filters;
        for category in saved.categories {
            match self.get_category_by_name_mut(&category.name) {
                Some(existing) => {
                    existing.verbosity = category.verbosity;
                    existing.enabled = category.enabled;
                }
                None => self.categories.push(CategoryFilter { in_use: false, ..category }),
            }
        }
        self.rebuild_fast_lookup();

        info!(path = %path.display(), categories = self.categories.len(), "Loaded visual logger filters");
        Ok(())
    }

    fn rebuild_fast_lookup(&mut self) {
        self.fast_lookup = self
            .categories
            .iter()
            .enumerate()
            .map(|(index, category)| (category.name.clone(), index))
            .collect();
    }
}

impl Default for VisualLoggerFilters {
    fn default() -> Self {
        Self::new(FilterSettings::default())
    }
}
