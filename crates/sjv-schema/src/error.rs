//! # Error Types
//!
//! Every failure the registry, inliner, and validator façade can surface as
//! an `Err`. Recoverable findings (unsupported declared version, missing
//! version field, constraint violations, BIDS findings) are not errors: they
//! are collected as [`ValidationErrorDetail`](crate::ValidationErrorDetail)
//! records and only become [`SchemaError::ValidationFailed`] when the caller
//! asks validation to raise.

use std::path::PathBuf;

use thiserror::Error;

use crate::detail::ValidationErrors;

/// Errors raised by schema loading, version selection, and validation.
#[derive(Error, Debug)]
pub enum SchemaError {
    /// An input document or schema file does not exist.
    #[error("file not found: {}", path.display())]
    NotFound {
        /// The missing path.
        path: PathBuf,
    },

    /// A file on disk could not be parsed as JSON.
    #[error("invalid JSON in {}: {reason}", path.display())]
    InvalidJson {
        /// The file that failed to parse.
        path: PathBuf,
        /// Parser diagnostic.
        reason: String,
    },

    /// An in-memory JSON string could not be parsed.
    #[error("malformed JSON input: {0}")]
    MalformedInput(String),

    /// A read failed for a reason other than the file being absent.
    #[error("error reading {}: {source}", path.display())]
    Io {
        /// The file being read.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The requested schema version is not present in the registry.
    #[error("schema version '{version}' is not supported. Available versions: {supported:?}")]
    UnsupportedVersion {
        /// The version that was asked for.
        version: String,
        /// Every version the registry discovered.
        supported: Vec<String>,
    },

    /// No schema versions were discovered under the versions root.
    #[error("no schema versions available under {}", versions_dir.display())]
    RegistryEmpty {
        /// The directory that was scanned.
        versions_dir: PathBuf,
    },

    /// The (inlined) schema is not a structurally valid JSON Schema.
    #[error("invalid schema provided: {0}")]
    InvalidSchema(String),

    /// Mutually exclusive construction options were combined.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The document did not conform; carries every finding.
    #[error("validation failed:\n{errors}")]
    ValidationFailed {
        /// All schema and BIDS findings for the document.
        errors: ValidationErrors,
    },
}

impl SchemaError {
    /// Read a file and parse it as JSON, mapping each failure to its own kind.
    pub(crate) fn read_json(path: &std::path::Path) -> Result<serde_json::Value, Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                SchemaError::NotFound {
                    path: path.to_path_buf(),
                }
            } else {
                SchemaError::Io {
                    path: path.to_path_buf(),
                    source: e,
                }
            }
        })?;
        serde_json::from_str(&content).map_err(|e| SchemaError::InvalidJson {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// True for the kinds that abort an operation before any validation runs.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            SchemaError::NotFound { .. }
                | SchemaError::InvalidJson { .. }
                | SchemaError::MalformedInput(_)
                | SchemaError::Io { .. }
        )
    }
}
