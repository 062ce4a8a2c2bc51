//! # Check-Examples Subcommand
//!
//! Pre-commit hook entry point. Receives the staged file list and validates
//! only JSON files that live under an `examples` path, printing at most the
//! first few findings per file.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;

use sjv_schema::{Document, SchemaValidator, SchemaVersionRegistry};

use crate::{fallback_schema_file, CliContext};

/// Findings printed per failing file before the remainder is summarized.
pub const MAX_ERRORS_SHOWN: usize = 5;

/// Arguments for the `check-examples` subcommand.
#[derive(Args, Debug)]
pub struct CheckExamplesArgs {
    /// Files passed by the hook runner; non-example files are ignored.
    #[arg(value_name = "FILES")]
    pub files: Vec<PathBuf>,
}

/// True for `.json` files whose path mentions `examples`.
pub fn is_example_file(path: &Path) -> bool {
    let is_json = path
        .file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.ends_with(".json"));
    is_json && path.to_string_lossy().contains("examples")
}

/// Execute the check-examples subcommand.
///
/// Returns exit code: 0 if every example file is valid, 1 otherwise.
pub fn run_check_examples(args: &CheckExamplesArgs, ctx: &CliContext) -> Result<u8> {
    if args.files.is_empty() {
        println!("No files to validate");
        return Ok(0);
    }

    let examples: Vec<&PathBuf> = args.files.iter().filter(|p| is_example_file(p)).collect();
    tracing::debug!(
        given = args.files.len(),
        examples = examples.len(),
        "filtered example files"
    );
    if examples.is_empty() {
        return Ok(0);
    }

    let registry = SchemaVersionRegistry::new(&ctx.schema_dir);
    let mut builder = SchemaValidator::builder(&registry).config(ctx.config.clone());
    if let Some(file) = fallback_schema_file(&registry) {
        builder = builder.schema_file(file);
    }
    let mut validator = builder.build().context("failed to load schema")?;

    let mut all_valid = true;
    for path in examples {
        println!("Validating {}...", path.display());
        match validator.validate(Document::Path(path), false, None, true) {
            Ok(errors) if errors.is_empty() => println!("✓ {} is valid", path.display()),
            Ok(errors) => {
                all_valid = false;
                println!("✗ {} failed validation:", path.display());
                for error in errors.iter().take(MAX_ERRORS_SHOWN) {
                    let location = if error.path.is_empty() {
                        "root".to_string()
                    } else {
                        error
                            .path
                            .iter()
                            .map(ToString::to_string)
                            .collect::<Vec<_>>()
                            .join(" → ")
                    };
                    println!("  • {location}: {}", error.message);
                    if let Some(suggestion) = &error.suggestion {
                        println!("    Suggestion: {suggestion}");
                    }
                }
                if errors.len() > MAX_ERRORS_SHOWN {
                    println!("    ... and {} more errors", errors.len() - MAX_ERRORS_SHOWN);
                }
            }
            Err(e) => {
                all_valid = false;
                println!("✗ {} validation failed with error: {e}", path.display());
            }
        }
    }

    if all_valid {
        Ok(0)
    } else {
        println!("\nSome example files failed validation. Please fix the errors above.");
        Ok(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sjv_schema::{ValidatorConfig, CANONICAL_SCHEMA_FILENAME};

    fn setup() -> (tempfile::TempDir, CliContext) {
        let tmp = tempfile::tempdir().unwrap();
        let version_dir = tmp.path().join("schema/versions/0.1.0");
        std::fs::create_dir_all(&version_dir).unwrap();
        std::fs::write(
            version_dir.join(CANONICAL_SCHEMA_FILENAME),
            r#"{"type": "object", "required": ["schema_version", "description"]}"#,
        )
        .unwrap();
        std::fs::create_dir_all(tmp.path().join("examples")).unwrap();
        let ctx = CliContext {
            schema_dir: tmp.path().join("schema"),
            config: ValidatorConfig::default(),
            verbose: 0,
        };
        (tmp, ctx)
    }

    #[test]
    fn example_filter() {
        assert!(is_example_file(Path::new("schema/examples/basic_signalJourney.json")));
        assert!(!is_example_file(Path::new("schema/examples/README.md")));
        assert!(!is_example_file(Path::new("tests/data/basic.json")));
        assert!(!is_example_file(Path::new("examples/BASIC.JSON")));
    }

    #[test]
    fn no_files_is_success() {
        let (_tmp, ctx) = setup();
        assert_eq!(run_check_examples(&CheckExamplesArgs { files: vec![] }, &ctx).unwrap(), 0);
    }

    #[test]
    fn non_example_files_are_ignored() {
        let (tmp, ctx) = setup();
        let other = tmp.path().join("notes.json");
        std::fs::write(&other, "{ invalid").unwrap();
        let args = CheckExamplesArgs { files: vec![other] };
        assert_eq!(run_check_examples(&args, &ctx).unwrap(), 0);
    }

    #[test]
    fn valid_and_invalid_examples() {
        let (tmp, ctx) = setup();
        let good = tmp.path().join("examples/good.json");
        let bad = tmp.path().join("examples/bad.json");
        std::fs::write(&good, r#"{"schema_version": "0.1.0", "description": "d"}"#).unwrap();
        std::fs::write(&bad, r#"{"schema_version": "0.1.0"}"#).unwrap();

        let only_good = CheckExamplesArgs { files: vec![good.clone()] };
        assert_eq!(run_check_examples(&only_good, &ctx).unwrap(), 0);

        let both = CheckExamplesArgs { files: vec![good, bad] };
        assert_eq!(run_check_examples(&both, &ctx).unwrap(), 1);
    }

    #[test]
    fn unreadable_example_fails() {
        let (tmp, ctx) = setup();
        let broken = tmp.path().join("examples/broken.json");
        std::fs::write(&broken, "{ nope").unwrap();
        let args = CheckExamplesArgs { files: vec![broken] };
        assert_eq!(run_check_examples(&args, &ctx).unwrap(), 1);
    }
}
