//! # Schema Version Registry
//!
//! Discovers versioned schema files under `<schema_dir>/versions/<version>/`
//! and resolves a document's declared version to the schema that governs it.
//!
//! ## Layout
//!
//! ```text
//! schema/
//! ├── signalJourney.schema.json        (optional single-file default)
//! ├── definitions/                      (fragments reached through $ref)
//! └── versions/
//!     ├── 0.1.0/signalJourney.schema.json
//!     └── 0.2.0/signalJourney.schema.json
//! ```
//!
//! A subdirectory of `versions/` counts as a version only when it contains
//! the canonical schema file. Versions are ordered by numeric dotted-tuple
//! comparison; if any name is not purely numeric the whole list falls back
//! to lexical order.
//!
//! The registry is an ordinary value owned by the caller. Versions are
//! scanned once at construction.

use std::cmp::Ordering;
use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::document::Document;
use crate::error::SchemaError;

/// Filename every version directory must contain.
pub const CANONICAL_SCHEMA_FILENAME: &str = "signalJourney.schema.json";

/// Top-level field naming a document's schema version.
pub const VERSION_FIELD: &str = "schema_version";

/// Legacy spelling of [`VERSION_FIELD`].
pub const LEGACY_VERSION_FIELD: &str = "sj_version";

/// Catalog of schema versions rooted at a schema directory.
#[derive(Debug, Clone)]
pub struct SchemaVersionRegistry {
    schema_dir: PathBuf,
    versions_dir: PathBuf,
    versions: Vec<String>,
}

impl SchemaVersionRegistry {
    /// Build a registry over `schema_dir`, scanning `schema_dir/versions`.
    ///
    /// A missing versions directory yields an empty registry, not an error.
    pub fn new(schema_dir: impl AsRef<Path>) -> Self {
        let schema_dir = schema_dir.as_ref().to_path_buf();
        let versions_dir = schema_dir.join("versions");
        let versions = discover_versions(&versions_dir);
        tracing::debug!(
            versions_dir = %versions_dir.display(),
            count = versions.len(),
            "discovered schema versions"
        );
        Self {
            schema_dir,
            versions_dir,
            versions,
        }
    }

    /// The schema root this registry was built from.
    pub fn schema_dir(&self) -> &Path {
        &self.schema_dir
    }

    /// The `versions/` directory under the schema root.
    pub fn versions_dir(&self) -> &Path {
        &self.versions_dir
    }

    /// Discovered versions in ascending order.
    pub fn versions(&self) -> &[String] {
        &self.versions
    }

    /// An owned copy of the discovered versions.
    pub fn supported_versions(&self) -> Vec<String> {
        self.versions.clone()
    }

    pub fn is_supported(&self, version: &str) -> bool {
        self.versions.iter().any(|v| v == version)
    }

    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }

    /// The greatest discovered version, if any.
    pub fn latest_version(&self) -> Option<&str> {
        self.versions.last().map(String::as_str)
    }

    /// The version used when a document declares none.
    ///
    /// # Errors
    ///
    /// [`SchemaError::RegistryEmpty`] when no versions were discovered.
    pub fn default_version(&self) -> Result<&str, SchemaError> {
        self.latest_version()
            .ok_or_else(|| SchemaError::RegistryEmpty {
                versions_dir: self.versions_dir.clone(),
            })
    }

    /// Location of the schema file for `version`.
    ///
    /// # Errors
    ///
    /// [`SchemaError::UnsupportedVersion`] if `version` was not discovered.
    pub fn schema_path(&self, version: &str) -> Result<PathBuf, SchemaError> {
        if !self.is_supported(version) {
            return Err(self.unsupported(version));
        }
        Ok(self
            .versions_dir
            .join(version)
            .join(CANONICAL_SCHEMA_FILENAME))
    }

    /// Read and parse the schema file for `version`.
    ///
    /// # Errors
    ///
    /// - [`SchemaError::UnsupportedVersion`] if `version` was not discovered.
    /// - [`SchemaError::NotFound`] if the file vanished since discovery.
    /// - [`SchemaError::InvalidJson`] if it does not parse.
    /// - [`SchemaError::Io`] for any other read failure.
    pub fn load_schema(&self, version: &str) -> Result<Value, SchemaError> {
        let path = self.schema_path(version)?;
        tracing::debug!(version, path = %path.display(), "loading schema");
        SchemaError::read_json(&path)
    }

    /// Extract the declared schema version from a document.
    ///
    /// Reads `schema_version`, falling back to the legacy `sj_version`.
    /// Returns `Ok(None)` when neither is present or the document is not an
    /// object.
    ///
    /// # Errors
    ///
    /// Path inputs fail with [`SchemaError::NotFound`] or
    /// [`SchemaError::InvalidJson`]; string inputs with
    /// [`SchemaError::MalformedInput`].
    pub fn detect_version(&self, document: Document<'_>) -> Result<Option<String>, SchemaError> {
        let instance = document.load()?;
        Ok(declared_version(&instance))
    }

    pub(crate) fn unsupported(&self, version: &str) -> SchemaError {
        SchemaError::UnsupportedVersion {
            version: version.to_string(),
            supported: self.versions.clone(),
        }
    }
}

/// The version a parsed document declares, if any.
///
/// Non-string values are rendered as JSON text so they still reach the
/// unsupported-version path instead of being silently ignored.
pub fn declared_version(instance: &Value) -> Option<String> {
    let field = instance
        .get(VERSION_FIELD)
        .or_else(|| instance.get(LEGACY_VERSION_FIELD))?;
    match field {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn discover_versions(versions_dir: &Path) -> Vec<String> {
    let entries = match std::fs::read_dir(versions_dir) {
        Ok(entries) => entries,
        Err(e) => {
            if versions_dir.exists() {
                tracing::warn!(
                    dir = %versions_dir.display(),
                    error = %e,
                    "failed to read schema versions directory"
                );
            }
            return Vec::new();
        }
    };

    let mut versions: Vec<String> = entries
        .filter_map(|entry| match entry {
            Ok(e) => Some(e.path()),
            Err(e) => {
                tracing::warn!(error = %e, "failed to read directory entry");
                None
            }
        })
        .filter(|path| path.is_dir() && path.join(CANONICAL_SCHEMA_FILENAME).is_file())
        .filter_map(|path| path.file_name().and_then(|n| n.to_str()).map(str::to_string))
        .collect();

    sort_versions(&mut versions);
    versions
}

/// Sort version strings by numeric dotted tuple, or lexically if any
/// component anywhere is not a non-negative integer.
pub fn sort_versions(versions: &mut [String]) {
    let parsed: Option<Vec<Vec<u64>>> = versions.iter().map(|v| parse_dotted(v)).collect();
    match parsed {
        Some(_) => versions.sort_by(|a, b| compare_dotted(a, b)),
        None => versions.sort(),
    }
}

fn parse_dotted(version: &str) -> Option<Vec<u64>> {
    version.split('.').map(|part| part.parse::<u64>().ok()).collect()
}

fn compare_dotted(a: &str, b: &str) -> Ordering {
    match (parse_dotted(a), parse_dotted(b)) {
        (Some(x), Some(y)) => x.cmp(&y),
        _ => a.cmp(b),
    }
}
