//! # Validate Subcommand
//!
//! Validates one signalJourney file, or every matching file in a directory,
//! and reports per-file results as text or JSON.
//!
//! File selection:
//!
//! - a single file is validated if its name ends in `.json` (any case);
//! - a directory contributes every `*.json` file directly inside it;
//! - with `--recursive`, every `*_signalJourney.json` file below it.
//!
//! Files are processed in sorted order so reports are reproducible.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, ValueEnum};
use serde::Serialize;
use walkdir::WalkDir;

use sjv_schema::{Document, SchemaError, SchemaValidator, SchemaVersionRegistry, ValidationErrorDetail};

use crate::{fallback_schema_file, CliContext};

/// File name suffix picked up by recursive scans.
pub const SIGNALJOURNEY_SUFFIX: &str = "_signalJourney.json";

/// Arguments for the `validate` subcommand.
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// File or directory to validate.
    #[arg(value_name = "PATH")]
    pub path: PathBuf,

    /// Validate against this schema file instead of the versioned schemas.
    #[arg(short, long, value_name = "FILE")]
    pub schema: Option<PathBuf>,

    /// Default schema version for documents that declare none.
    #[arg(long, value_name = "VERSION")]
    pub schema_version: Option<String>,

    /// Recursively search for *_signalJourney.json files in subdirectories.
    #[arg(short, long)]
    pub recursive: bool,

    /// Output format.
    #[arg(short, long, value_enum, ignore_case = true, default_value_t = OutputFormat::Text)]
    pub output_format: OutputFormat,

    /// Enable BIDS context validation checks (experimental).
    #[arg(long)]
    pub bids: bool,

    /// BIDS dataset root directory (required with --bids).
    #[arg(long, value_name = "DIR")]
    pub bids_root: Option<PathBuf>,
}

#[derive(ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// A single machine-readable JSON report on stdout.
    Json,
}

/// Outcome for one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FileStatus {
    Passed,
    Failed,
    /// The file could not be read or parsed.
    Error,
    /// The schema for the file could not be built.
    CriticalError,
}

#[derive(Debug, Serialize)]
pub struct FileReport {
    pub filepath: String,
    pub status: FileStatus,
    pub errors: Vec<ValidationErrorDetail>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ValidationReport {
    pub overall_success: bool,
    pub overall_status: &'static str,
    pub bids_mode_enabled: bool,
    pub files: Vec<FileReport>,
}

/// Execute the validate subcommand.
///
/// Returns exit code: 0 when every file passes (or none were found), 1 otherwise.
pub fn run_validate(args: &ValidateArgs, ctx: &CliContext) -> Result<u8> {
    if args.bids && args.bids_root.is_none() {
        eprintln!("Error: --bids-root is required when using the --bids flag.");
        return Ok(1);
    }
    if args.schema.is_some() && args.schema_version.is_some() {
        eprintln!("Error: --schema and --schema-version cannot be used together.");
        return Ok(1);
    }
    if !args.path.exists() {
        bail!("input path does not exist: {}", args.path.display());
    }

    let text = args.output_format == OutputFormat::Text;
    let recursive_note = if args.recursive { " recursively" } else { "" };
    if text && args.path.is_dir() {
        let bids_note = if args.bids { " (BIDS mode)" } else { "" };
        println!("Scanning directory: {}{recursive_note}{bids_note}", args.path.display());
    }

    let files = collect_files(&args.path, args.recursive)?;
    if files.is_empty() {
        if text {
            if args.path.is_dir() {
                eprintln!(
                    "No *{SIGNALJOURNEY_SUFFIX} files found to validate in {}{recursive_note}",
                    args.path.display()
                );
            } else {
                eprintln!("Skipping non-JSON file: {}", args.path.display());
            }
        }
        return Ok(0);
    }

    let registry = SchemaVersionRegistry::new(&ctx.schema_dir);
    tracing::info!(
        schema_dir = %ctx.schema_dir.display(),
        versions = ?registry.versions(),
        "loaded schema registry"
    );
    let mut validator = build_validator(args, ctx, &registry).context("failed to load schema")?;

    let bids_root = if args.bids { args.bids_root.as_deref() } else { None };
    let report = validate_files(&mut validator, &files, bids_root);

    match args.output_format {
        OutputFormat::Text => print_text(&report, ctx.verbose),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
    }

    Ok(if report.overall_success { 0 } else { 1 })
}

fn build_validator<'r>(
    args: &ValidateArgs,
    ctx: &CliContext,
    registry: &'r SchemaVersionRegistry,
) -> Result<SchemaValidator<'r>, SchemaError> {
    let mut builder = SchemaValidator::builder(registry).config(ctx.config.clone());
    if let Some(schema) = &args.schema {
        builder = builder.schema_file(schema);
    }
    if let Some(version) = &args.schema_version {
        builder = builder.version(version);
    }
    if args.schema.is_none() && args.schema_version.is_none() {
        if let Some(file) = fallback_schema_file(registry) {
            tracing::debug!(schema = %file.display(), "no versioned schemas; using single schema file");
            builder = builder.schema_file(file);
        }
    }
    builder.build()
}

/// Files to validate under `path`, sorted.
pub fn collect_files(path: &Path, recursive: bool) -> Result<Vec<PathBuf>> {
    if path.is_file() {
        let is_json = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.to_lowercase().ends_with(".json"));
        return Ok(if is_json { vec![path.to_path_buf()] } else { Vec::new() });
    }
    if !path.is_dir() {
        bail!("input path is neither a file nor a directory: {}", path.display());
    }

    let walker = if recursive {
        WalkDir::new(path).min_depth(1)
    } else {
        WalkDir::new(path).min_depth(1).max_depth(1)
    };

    let mut files: Vec<PathBuf> = walker
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(e) => Some(e),
            Err(e) => {
                tracing::warn!(error = %e, "skipping unreadable directory entry");
                None
            }
        })
        .filter(|e| e.file_type().is_file())
        .filter(|e| {
            let name = e.file_name().to_string_lossy();
            if recursive {
                name.ends_with(SIGNALJOURNEY_SUFFIX)
            } else {
                name.to_lowercase().ends_with(".json")
            }
        })
        .map(walkdir::DirEntry::into_path)
        .collect();
    files.sort();
    Ok(files)
}

/// Validate each file, never stopping at a failure.
pub fn validate_files(
    validator: &mut SchemaValidator<'_>,
    files: &[PathBuf],
    bids_root: Option<&Path>,
) -> ValidationReport {
    let mut reports = Vec::with_capacity(files.len());
    for file in files {
        let report = match validator.validate(Document::Path(file), false, bids_root, true) {
            Ok(errors) if errors.is_empty() => file_report(file, FileStatus::Passed, errors, None),
            Ok(errors) => file_report(file, FileStatus::Failed, errors, None),
            Err(e) => {
                tracing::debug!(file = %file.display(), error = %e, "file could not be validated");
                let status = if e.is_input_error() {
                    FileStatus::Error
                } else {
                    FileStatus::CriticalError
                };
                file_report(file, status, Vec::new(), Some(e.to_string()))
            }
        };
        reports.push(report);
    }

    let overall_success = reports.iter().all(|r| r.status == FileStatus::Passed);
    ValidationReport {
        overall_success,
        overall_status: if overall_success { "passed" } else { "failed" },
        bids_mode_enabled: bids_root.is_some(),
        files: reports,
    }
}

fn file_report(
    file: &Path,
    status: FileStatus,
    errors: Vec<ValidationErrorDetail>,
    error_message: Option<String>,
) -> FileReport {
    FileReport {
        filepath: file.display().to_string(),
        status,
        errors,
        error_message,
    }
}

fn print_text(report: &ValidationReport, verbose: u8) {
    for file in &report.files {
        match file.status {
            FileStatus::Passed => println!("Validating: {} ... OK", file.filepath),
            FileStatus::Failed => {
                println!("Validating: {} ... FAILED", file.filepath);
                for error in &file.errors {
                    eprintln!("  - {}", error_line(error, verbose));
                }
            }
            FileStatus::Error | FileStatus::CriticalError => {
                println!("Validating: {} ... ERROR", file.filepath);
                if let Some(message) = &file.error_message {
                    eprintln!("  {message}");
                }
            }
        }
    }
    if verbose > 0 {
        let status = if report.overall_success { "PASSED" } else { "FAILED" };
        println!("\nOverall validation result: {status}");
    }
}

/// `Error at '<path>': <message>`, plus the constraint in verbose mode and
/// the suggestion when there is one.
pub fn error_line(error: &ValidationErrorDetail, verbose: u8) -> String {
    let mut line = format!("Error at '{}': {}", error.path_string(), error.message);
    if verbose > 0 && !error.constraint.is_empty() {
        line.push_str(&format!(" (constraint: '{}')", error.constraint));
    }
    if let Some(suggestion) = &error.suggestion {
        line.push_str(&format!(" -- Suggestion: {suggestion}"));
    }
    line
}
