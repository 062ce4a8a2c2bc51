//! # Versions Subcommand
//!
//! Lists the schema versions discovered under the schema root, marking the
//! one used for documents that declare no version.

use anyhow::Result;
use clap::Args;
use serde::Serialize;

use sjv_schema::SchemaVersionRegistry;

use crate::CliContext;

/// Arguments for the `versions` subcommand.
#[derive(Args, Debug, Default)]
pub struct VersionsArgs {
    /// Print the listing as JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct VersionListing {
    pub schema_dir: String,
    pub versions: Vec<String>,
    pub default_version: Option<String>,
}

impl VersionListing {
    pub fn from_registry(registry: &SchemaVersionRegistry) -> Self {
        Self {
            schema_dir: registry.schema_dir().display().to_string(),
            versions: registry.supported_versions(),
            default_version: registry.latest_version().map(str::to_string),
        }
    }
}

/// Execute the versions subcommand.
///
/// Returns exit code: 0 if at least one version exists, 1 otherwise.
pub fn run_versions(args: &VersionsArgs, ctx: &CliContext) -> Result<u8> {
    let registry = SchemaVersionRegistry::new(&ctx.schema_dir);
    let listing = VersionListing::from_registry(&registry);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&listing)?);
    } else if listing.versions.is_empty() {
        eprintln!(
            "No schema versions found under {}",
            registry.versions_dir().display()
        );
    } else {
        println!("Schema directory: {}", listing.schema_dir);
        for version in &listing.versions {
            if listing.default_version.as_ref() == Some(version) {
                println!("  {version} (default)");
            } else {
                println!("  {version}");
            }
        }
    }

    Ok(if listing.versions.is_empty() { 1 } else { 0 })
}
