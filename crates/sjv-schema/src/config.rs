//! Validator configuration, loadable from a JSON file.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::SchemaError;
use crate::suggest::SuggestionConfig;

/// Settings shared by the registry, the façade, and suggestion generation.
///
/// Every field is optional in the file form; omitted fields take defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidatorConfig {
    /// Schema root (the directory holding `versions/`).
    pub schema_dir: Option<PathBuf>,
    /// Enforce `format` keywords instead of treating them as annotations.
    pub validate_formats: bool,
    pub suggestions: SuggestionConfig,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            schema_dir: None,
            validate_formats: true,
            suggestions: SuggestionConfig::default(),
        }
    }
}

impl ValidatorConfig {
    /// Load a configuration file.
    ///
    /// # Errors
    ///
    /// [`SchemaError::NotFound`], [`SchemaError::Io`], or
    /// [`SchemaError::InvalidJson`] when the file is absent, unreadable,
    /// unparsable, or has fields of the wrong shape.
    pub fn from_file(path: &Path) -> Result<Self, SchemaError> {
        let value = SchemaError::read_json(path)?;
        serde_json::from_value(value).map_err(|e| SchemaError::InvalidJson {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sjv.json");
        std::fs::write(&path, r#"{"suggestions": {"fuzzy_threshold": 90}}"#).unwrap();

        let config = ValidatorConfig::from_file(&path).unwrap();
        assert!(config.validate_formats);
        assert_eq!(config.schema_dir, None);
        assert_eq!(config.suggestions.fuzzy_threshold, 90.0);
        assert_eq!(config.suggestions.unmeasurable_length, "N/A");
    }

    #[test]
    fn wrong_shape_is_invalid_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sjv.json");
        std::fs::write(&path, r#"{"validate_formats": "yes"}"#).unwrap();
        assert!(matches!(
            ValidatorConfig::from_file(&path).unwrap_err(),
            SchemaError::InvalidJson { .. }
        ));
    }
}
