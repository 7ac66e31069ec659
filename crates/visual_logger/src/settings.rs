//! Filter settings, read from the `[visual_logger]` table of `project.toml`

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterSettings {
    /// Keep user-configured categories across resets, only clearing their
    /// in-use marks
    pub persistent_filters: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_key_defaults_off() {
        let settings: FilterSettings = toml::from_str("").unwrap();
        assert!(!settings.persistent_filters);

        let settings: FilterSettings = toml::from_str("persistent_filters = true").unwrap();
        assert!(settings.persistent_filters);
    }
}
