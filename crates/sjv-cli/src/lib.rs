//! # sjv-cli: signalJourney Validator CLI
//!
//! Provides the `signaljourney-validate` command-line interface on top of
//! `sjv-schema`.
//!
//! ## Subcommands
//!
//! - `signaljourney-validate validate`: validate a file or a directory of files.
//! - `signaljourney-validate check-examples`: pre-commit hook over example files.
//! - `signaljourney-validate versions`: list the schema versions on disk.
//!
//! ```bash
//! signaljourney-validate validate sub-01_task-rest_signalJourney.json
//! signaljourney-validate validate -r -o json path/to/bids_dataset/
//! signaljourney-validate --schema-dir schema versions
//! ```

pub mod check_examples;
pub mod validate;
pub mod versions;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use sjv_schema::{SchemaVersionRegistry, ValidatorConfig, CANONICAL_SCHEMA_FILENAME};

/// Conventional schema root directory name.
pub const SCHEMA_DIR_NAME: &str = "schema";

/// Settings shared by every subcommand, resolved once in `main`.
#[derive(Debug, Clone)]
pub struct CliContext {
    /// Schema root (holds `versions/`).
    pub schema_dir: PathBuf,
    pub config: ValidatorConfig,
    /// Global `-v` count.
    pub verbose: u8,
}

impl CliContext {
    /// Resolve the configuration file and schema root.
    ///
    /// Precedence for the schema root: `--schema-dir`, then the config
    /// file's `schema_dir`, then discovery from the current directory.
    pub fn resolve(config_path: Option<&Path>, schema_dir: Option<&Path>, verbose: u8) -> Result<Self> {
        let config = match config_path {
            Some(path) => ValidatorConfig::from_file(path)
                .with_context(|| format!("failed to load configuration from {}", path.display()))?,
            None => ValidatorConfig::default(),
        };

        let schema_dir = match (schema_dir, &config.schema_dir) {
            (Some(dir), _) => dir.to_path_buf(),
            (None, Some(dir)) => dir.clone(),
            (None, None) => {
                let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
                discover_schema_root(&cwd).unwrap_or_else(|| {
                    tracing::warn!("could not locate a schema directory; using ./{SCHEMA_DIR_NAME}");
                    PathBuf::from(SCHEMA_DIR_NAME)
                })
            }
        };

        Ok(Self {
            schema_dir,
            config,
            verbose,
        })
    }
}

/// Walk up from `start` to the first directory holding a schema root.
///
/// A schema root is a `schema/` directory with either a `versions/`
/// subdirectory or the canonical schema file.
pub fn discover_schema_root(start: &Path) -> Option<PathBuf> {
    let mut dir = start;
    loop {
        let candidate = dir.join(SCHEMA_DIR_NAME);
        if candidate.join("versions").is_dir() || candidate.join(CANONICAL_SCHEMA_FILENAME).is_file() {
            return Some(candidate);
        }
        dir = dir.parent()?;
    }
}

/// The single-file schema at the schema root, for roots without `versions/`.
pub fn fallback_schema_file(registry: &SchemaVersionRegistry) -> Option<PathBuf> {
    if !registry.is_empty() {
        return None;
    }
    let path = registry.schema_dir().join(CANONICAL_SCHEMA_FILENAME);
    path.is_file().then_some(path)
}
