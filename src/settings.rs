//! Run settings for the command line
//!
//! Defaults for the clone operation the CLI performs, loadable from a
//! TOML file.

use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

/// Errors that can occur when loading or parsing settings
#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("failed to read settings file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse settings TOML: {0}")]
    Parse(#[from] toml::de::Error),
}

/// CLI defaults for the clone operation.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RunSettings {
    /// Inject text rules as markup instead of escaped text
    pub html: bool,
    /// Insert new instances before existing siblings
    pub top: bool,
    /// Replicate each model this many times
    pub clones: usize,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            html: false,
            top: false,
            clones: 1,
        }
    }
}

impl RunSettings {
    /// Load settings from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, SettingsError> {
        let content = std::fs::read_to_string(path)?;
        Ok(Self::from_toml(&content)?)
    }

    /// Load settings from a TOML string
    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = RunSettings::default();
        assert!(!settings.html);
        assert!(!settings.top);
        assert_eq!(settings.clones, 1);
    }

    #[test]
    fn test_parse_partial_toml() {
        let settings = RunSettings::from_toml("clones = 3").expect("Should parse");
        assert_eq!(settings.clones, 3);
        assert!(!settings.html);
    }

    #[test]
    fn test_parse_full_toml() {
        let settings = RunSettings::from_toml(
            r#"
html = true
top = true
clones = 2
"#,
        )
        .expect("Should parse");
        assert!(settings.html);
        assert!(settings.top);
        assert_eq!(settings.clones, 2);
    }

    #[test]
    fn test_invalid_toml_error() {
        let result = RunSettings::from_toml("this is not valid toml {{{{");
        assert!(result.is_err());
    }
}
