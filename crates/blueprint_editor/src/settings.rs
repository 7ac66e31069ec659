//! Editor settings
//!
//! Loaded from the `[editor]` table of `project.toml`.

use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Failed to parse settings: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid setting {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorSettings {
    /// Skip the confirmation before type changes that may break connections
    pub suppress_type_change_confirmation: bool,
    /// Longest accepted member or graph name
    pub max_name_length: usize,
    /// Rewrite leaked skeleton class references after regeneration
    pub purge_skeleton_references: bool,
}

impl Default for EditorSettings {
    fn default() -> Self {
        Self {
            suppress_type_change_confirmation: false,
            max_name_length: 100,
            purge_skeleton_references: true,
        }
    }
}

impl EditorSettings {
    pub fn from_toml(content: &str) -> Result<Self, SettingsError> {
        let settings: Self = toml::from_str(content)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.max_name_length == 0 {
            return Err(SettingsError::Invalid {
                key: "max_name_length",
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_table_uses_defaults() {
        let settings = EditorSettings::from_toml("suppress_type_change_confirmation = true").unwrap();
        assert!(settings.suppress_type_change_confirmation);
        assert_eq!(settings.max_name_length, 100);
        assert!(settings.purge_skeleton_references);
    }

    #[test]
    fn test_zero_name_length_rejected() {
        let result = EditorSettings::from_toml("max_name_length = 0");
        assert!(matches!(result, Err(SettingsError::Invalid { key: "max_name_length", .. })));
    }
}
