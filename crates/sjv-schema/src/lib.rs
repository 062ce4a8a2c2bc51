//! # sjv-schema: signalJourney Schema Validation
//!
//! Validates signalJourney provenance documents (JSON records of a
//! biosignal processing pipeline) against versioned JSON Schemas.
//!
//! ## Pieces
//!
//! - [`registry`]: discovers `versions/<X.Y.Z>/signalJourney.schema.json`
//!   under a schema root and detects the version a document declares.
//! - [`inline`]: replaces external `$ref`s with the referenced file content.
//!   Cycles are kept as `file://` references to files already loaded.
//! - [`validate`]: the [`SchemaValidator`] façade. It picks a schema per
//!   document, compiles it, and turns engine errors into findings.
//! - [`detail`] and [`suggest`]: the structured finding type and its
//!   remediation hints.
//! - [`bids`]: the pluggable BIDS context pass.
//!
//! ## Crate Policy
//!
//! - No network access. Unresolved external references fail schema
//!   construction instead of being fetched.
//! - Validation collects every error; it never stops at the first.
//! - Findings are ordered by instance path.

pub mod bids;
pub mod config;
pub mod detail;
pub mod document;
pub mod error;
pub mod inline;
pub mod registry;
pub mod suggest;
pub mod validate;

pub use bids::{BidsContextCheck, PendingBidsCheck};
pub use config::ValidatorConfig;
pub use detail::{pointer_path, PathSegment, ValidationErrorDetail, ValidationErrors};
pub use document::Document;
pub use error::SchemaError;
pub use inline::{file_uri, inline_refs, inline_schema, RefCache};
pub use registry::{declared_version, SchemaVersionRegistry, CANONICAL_SCHEMA_FILENAME};
pub use suggest::SuggestionConfig;
pub use validate::{SchemaValidator, ValidatorBuilder};
