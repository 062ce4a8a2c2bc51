//! # Validator Façade
//!
//! Selects the schema for a document, inlines its external references,
//! compiles it with the `jsonschema` engine (Draft 2020-12), and converts
//! every engine error into an enriched [`ValidationErrorDetail`].
//!
//! ## Schema selection
//!
//! A [`SchemaValidator`] is built from exactly one of:
//!
//! - an explicit schema (in-memory value or file), which is authoritative
//!   for every document;
//! - an explicit registry version, which becomes the default;
//! - nothing, in which case the registry's latest version is the default.
//!
//! For registry-backed validators, a document's declared `schema_version`
//! (or legacy `sj_version`) picks the schema. An unsupported declaration or
//! a missing declaration with no default yields a single synthetic finding
//! and no structural validation. Schemas built for other versions are cached
//! for the life of the validator.
//!
//! ## Reference policy
//!
//! External references are inlined from disk before compilation. The root
//! gets a `file://` base URI, and references the inliner kept to break a
//! cycle are served from the files it loaded. Anything else reaches the
//! engine's retriever, which refuses it; the schema then fails to compile
//! with an error naming the reference. No network access ever happens.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use jsonschema::error::ValidationErrorKind;
use jsonschema::{Retrieve, Uri, ValidationError};
use serde_json::Value;

use crate::bids::{BidsContextCheck, PendingBidsCheck};
use crate::config::ValidatorConfig;
use crate::detail::{parse_pointer, pointer_path, PathSegment, ValidationErrorDetail};
use crate::document::Document;
use crate::error::SchemaError;
use crate::inline::{file_uri, inline_refs, RefCache};
use crate::registry::{declared_version, SchemaVersionRegistry};

/// Meta-schema hosts the engine may ask about; answered with a permissive schema.
const META_SCHEMA_PREFIXES: [&str; 2] = ["https://json-schema.org/", "http://json-schema.org/"];

/// Stand-in file name giving in-memory schemas a base URI in the schema root.
const IN_MEMORY_SCHEMA_NAME: &str = "in-memory.schema.json";

/// Retriever that never leaves the process.
///
/// Serves the schema files the inliner loaded, keyed by `file://` URI, so
/// references kept to break a cycle still resolve. Any other URI is refused.
#[derive(Debug, Clone, Default)]
struct LocalSchemaRetriever {
    schemas_by_uri: HashMap<String, Value>,
}

impl LocalSchemaRetriever {
    fn from_cache(cache: &RefCache) -> Self {
        let schemas_by_uri = cache
            .iter()
            .filter_map(|(path, schema)| Some((file_uri(path)?, schema.clone())))
            .collect();
        Self { schemas_by_uri }
    }
}

/// Resolve `reference` found inside `document` to its target document and node.
fn follow_ref<'a>(
    reference: &str,
    document: &'a Value,
    retriever: &'a LocalSchemaRetriever,
) -> Option<(&'a Value, &'a Value)> {
    let (target, fragment) = reference.split_once('#').unwrap_or((reference, ""));
    let document = if target.is_empty() {
        document
    } else {
        retriever.schemas_by_uri.get(target)?
    };
    Some((document, document.pointer(fragment)?))
}

impl Retrieve for LocalSchemaRetriever {
    fn retrieve(
        &self,
        uri: &Uri<&str>,
    ) -> Result<Value, Box<dyn std::error::Error + Send + Sync>> {
        let uri = uri.as_str();
        let document = uri.split_once('#').map_or(uri, |(document, _)| document);
        if let Some(schema) = self.schemas_by_uri.get(document) {
            return Ok(schema.clone());
        }
        if META_SCHEMA_PREFIXES.iter().any(|p| uri.starts_with(p)) {
            return Ok(serde_json::json!({}));
        }
        Err(format!("external reference '{uri}' could not be inlined from disk").into())
    }
}

fn build_engine(
    schema: &Value,
    retriever: &LocalSchemaRetriever,
    validate_formats: bool,
) -> Result<jsonschema::Validator, String> {
    let mut opts = jsonschema::options();
    opts.with_draft(jsonschema::Draft::Draft202012);
    opts.should_validate_formats(validate_formats);
    opts.with_retriever(retriever.clone());
    opts.build(schema).map_err(|e| e.to_string())
}

/// An inlined schema and its compiled engine.
struct CompiledSchema {
    version: Option<String>,
    schema: Value,
    retriever: LocalSchemaRetriever,
    engine: jsonschema::Validator,
}

impl CompiledSchema {
    /// Inline and compile `raw`, which lives at (or stands in for) `location`.
    ///
    /// Relative references resolve against the directory of `location`. A
    /// root without `$id` gets the `file://` URI of `location`.
    fn compile(
        raw: &Value,
        location: &Path,
        version: Option<String>,
        validate_formats: bool,
    ) -> Result<Self, SchemaError> {
        let base_dir = location.parent().unwrap_or_else(|| Path::new("."));
        let mut cache = RefCache::new();
        let mut schema = inline_refs(raw, base_dir, &mut cache);
        tracing::debug!(
            base_dir = %base_dir.display(),
            files = cache.len(),
            "inlined external schema references"
        );
        if let (Value::Object(map), Some(uri)) = (&mut schema, file_uri(location)) {
            map.entry("$id").or_insert(Value::String(uri));
        }

        let retriever = LocalSchemaRetriever::from_cache(&cache);
        let engine =
            build_engine(&schema, &retriever, validate_formats).map_err(SchemaError::InvalidSchema)?;
        Ok(Self {
            version,
            schema,
            retriever,
            engine,
        })
    }

    fn from_registry(
        registry: &SchemaVersionRegistry,
        version: &str,
        validate_formats: bool,
    ) -> Result<Self, SchemaError> {
        let path = registry.schema_path(version)?;
        let raw = registry.load_schema(version)?;
        Self::compile(&raw, &path, Some(version.to_string()), validate_formats)
    }
}

impl fmt::Debug for CompiledSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledSchema")
            .field("version", &self.version)
            .finish_non_exhaustive()
    }
}

#[derive(Debug)]
enum Selection {
    /// A caller-supplied schema governs every document.
    Explicit(CompiledSchema),
    /// Registry versions; `default` applies to documents that declare none.
    Registry { default: Option<String> },
}

#[derive(Debug)]
enum ExplicitSchema {
    Value(Value),
    File(PathBuf),
}

/// Builder for [`SchemaValidator`].
#[derive(Debug)]
pub struct ValidatorBuilder<'r> {
    registry: &'r SchemaVersionRegistry,
    schema: Option<ExplicitSchema>,
    version: Option<String>,
    config: ValidatorConfig,
    bids_check: Option<Box<dyn BidsContextCheck>>,
}

impl<'r> ValidatorBuilder<'r> {
    /// Validate against this in-memory schema. Relative `$ref`s resolve
    /// against the registry's schema directory.
    pub fn schema(mut self, schema: Value) -> Self {
        self.schema = Some(ExplicitSchema::Value(schema));
        self
    }

    /// Validate against the schema in this file. Relative `$ref`s resolve
    /// against the file's directory.
    pub fn schema_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.schema = Some(ExplicitSchema::File(path.into()));
        self
    }

    /// Use this registry version as the default.
    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn config(mut self, config: ValidatorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn bids_check(mut self, check: Box<dyn BidsContextCheck>) -> Self {
        self.bids_check = Some(check);
        self
    }

    /// Load, inline, and compile the selected schema.
    ///
    /// # Errors
    ///
    /// - [`SchemaError::Configuration`] if both a schema and a version were given.
    /// - [`SchemaError::UnsupportedVersion`] for an unknown version.
    /// - [`SchemaError::NotFound`] / [`SchemaError::InvalidJson`] /
    ///   [`SchemaError::Io`] if the schema file cannot be loaded.
    /// - [`SchemaError::InvalidSchema`] if the inlined schema does not compile.
    pub fn build(self) -> Result<SchemaValidator<'r>, SchemaError> {
        let validate_formats = self.config.validate_formats;
        let mut compiled = HashMap::new();

        let selection = match (self.schema, self.version) {
            (Some(_), Some(_)) => {
                return Err(SchemaError::Configuration(
                    "an explicit schema and a schema version are mutually exclusive".to_string(),
                ));
            }
            (Some(ExplicitSchema::Value(raw)), None) => Selection::Explicit(CompiledSchema::compile(
                &raw,
                &self.registry.schema_dir().join(IN_MEMORY_SCHEMA_NAME),
                None,
                validate_formats,
            )?),
            (Some(ExplicitSchema::File(path)), None) => {
                let raw = SchemaError::read_json(&path)?;
                tracing::debug!(schema = %path.display(), "using explicit schema file");
                Selection::Explicit(CompiledSchema::compile(&raw, &path, None, validate_formats)?)
            }
            (None, Some(version)) => {
                let schema = CompiledSchema::from_registry(self.registry, &version, validate_formats)?;
                compiled.insert(version.clone(), schema);
                Selection::Registry {
                    default: Some(version),
                }
            }
            (None, None) => match self.registry.default_version() {
                Ok(version) => {
                    let schema = CompiledSchema::from_registry(self.registry, version, validate_formats)?;
                    compiled.insert(version.to_string(), schema);
                    Selection::Registry {
                        default: Some(version.to_string()),
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, "no default schema version; documents must declare one");
                    Selection::Registry { default: None }
                }
            },
        };

        Ok(SchemaValidator {
            registry: self.registry,
            config: self.config,
            bids_check: self.bids_check.unwrap_or_else(|| Box::new(PendingBidsCheck)),
            selection,
            compiled,
        })
    }
}

/// Validates signalJourney documents against versioned schemas.
#[derive(Debug)]
pub struct SchemaValidator<'r> {
    registry: &'r SchemaVersionRegistry,
    config: ValidatorConfig,
    bids_check: Box<dyn BidsContextCheck>,
    selection: Selection,
    /// Registry-backed schemas by version.
    compiled: HashMap<String, CompiledSchema>,
}

impl<'r> SchemaValidator<'r> {
    pub fn builder(registry: &'r SchemaVersionRegistry) -> ValidatorBuilder<'r> {
        ValidatorBuilder {
            registry,
            schema: None,
            version: None,
            config: ValidatorConfig::default(),
            bids_check: None,
        }
    }

    /// A validator defaulting to the registry's latest version.
    pub fn new(registry: &'r SchemaVersionRegistry) -> Result<Self, SchemaError> {
        Self::builder(registry).build()
    }

    /// The default version, or `None` for explicit schemas and empty registries.
    pub fn current_version(&self) -> Option<&str> {
        match &self.selection {
            Selection::Explicit(_) => None,
            Selection::Registry { default } => default.as_deref(),
        }
    }

    /// Drop the default version so undeclared documents are reported.
    pub fn clear_default_version(&mut self) {
        if let Selection::Registry { default } = &mut self.selection {
            *default = None;
        }
    }

    pub fn supported_versions(&self) -> Vec<String> {
        self.registry.supported_versions()
    }

    pub fn registry(&self) -> &SchemaVersionRegistry {
        self.registry
    }

    pub fn config(&self) -> &ValidatorConfig {
        &self.config
    }

    /// The inlined schema applied to documents that declare no version.
    pub fn schema(&self) -> Option<&Value> {
        match &self.selection {
            Selection::Explicit(compiled) => Some(&compiled.schema),
            Selection::Registry { default } => default
                .as_ref()
                .and_then(|v| self.compiled.get(v))
                .map(|c| &c.schema),
        }
    }

    /// Validate one document, collecting every finding.
    ///
    /// Findings are sorted by instance path. With `raise_on_failure`, a
    /// non-empty result becomes [`SchemaError::ValidationFailed`].
    ///
    /// # Errors
    ///
    /// - Input errors from [`Document::load`].
    /// - [`SchemaError::InvalidSchema`] (or a load error) if a declared
    ///   version's schema cannot be built.
    /// - [`SchemaError::ValidationFailed`] as described above.
    pub fn validate(
        &mut self,
        document: Document<'_>,
        raise_on_failure: bool,
        bids_root: Option<&Path>,
        auto_detect_version: bool,
    ) -> Result<Vec<ValidationErrorDetail>, SchemaError> {
        let instance = document.load()?;

        let mut errors = match self.select_version(&instance, auto_detect_version) {
            Ok(Some(version)) => {
                self.ensure_compiled(&version)?;
                let compiled = &self.compiled[&version];
                schema_errors(compiled, &instance, &self.config)
            }
            Ok(None) => match &self.selection {
                Selection::Explicit(compiled) => schema_errors(compiled, &instance, &self.config),
                Selection::Registry { .. } => Vec::new(),
            },
            Err(synthetic) => return finish(vec![synthetic], raise_on_failure),
        };

        if let Some(root) = bids_root {
            errors.extend(self.bids_check.check(&instance, document.file_path(), root));
        }

        finish(errors, raise_on_failure)
    }

    /// The registry version governing `instance`, `None` for explicit
    /// schemas, or the single synthetic finding that ends validation.
    fn select_version(
        &self,
        instance: &Value,
        auto_detect_version: bool,
    ) -> Result<Option<String>, ValidationErrorDetail> {
        let Selection::Registry { default } = &self.selection else {
            return Ok(None);
        };

        let declared = if auto_detect_version {
            declared_version(instance)
        } else {
            None
        };

        match (declared, default) {
            (Some(version), _) if !self.registry.is_supported(&version) => {
                Err(ValidationErrorDetail::new(format!(
                    "Schema version '{version}' is not supported. Supported versions: [{}]",
                    self.registry.versions().join(", ")
                )))
            }
            (Some(version), default) => {
                if default.as_deref() != Some(version.as_str()) {
                    tracing::info!(
                        declared = %version,
                        default = default.as_deref().unwrap_or("<none>"),
                        "document declares a different schema version"
                    );
                }
                Ok(Some(version))
            }
            (None, Some(default)) => Ok(Some(default.clone())),
            (None, None) => Err(ValidationErrorDetail::new(
                "No schema_version field found in document, and no default schema version is configured.",
            )),
        }
    }

    fn ensure_compiled(&mut self, version: &str) -> Result<(), SchemaError> {
        if !self.compiled.contains_key(version) {
            tracing::debug!(version, "building validator for schema version");
            let schema =
                CompiledSchema::from_registry(self.registry, version, self.config.validate_formats)?;
            self.compiled.insert(version.to_string(), schema);
        }
        Ok(())
    }
}

fn finish(
    errors: Vec<ValidationErrorDetail>,
    raise_on_failure: bool,
) -> Result<Vec<ValidationErrorDetail>, SchemaError> {
    if raise_on_failure && !errors.is_empty() {
        return Err(SchemaError::ValidationFailed {
            errors: errors.into(),
        });
    }
    Ok(errors)
}

fn schema_errors(
    compiled: &CompiledSchema,
    instance: &Value,
    config: &ValidatorConfig,
) -> Vec<ValidationErrorDetail> {
    let mut errors: Vec<ValidationErrorDetail> = compiled
        .engine
        .iter_errors(instance)
        .map(|e| convert(e, &compiled.schema, &compiled.retriever, instance, config))
        .collect();
    errors.sort_by(|a, b| a.path.cmp(&b.path));
    errors
}

/// Turn an engine error raised on `instance` into a finding, resolving the
/// schema's value for the failed keyword against the (inlined) `root` schema.
fn convert(
    error: ValidationError<'_>,
    root: &Value,
    retriever: &LocalSchemaRetriever,
    instance: &Value,
    config: &ValidatorConfig,
) -> ValidationErrorDetail {
    let message = error.to_string();
    let path = pointer_path(&error.instance_path.to_string(), instance);
    let schema_path = schema_pointer_path(&error.schema_path.to_string(), root, retriever);
    let constraint = constraint_name(&error.kind, &schema_path);
    let actual = error.instance.clone().into_owned();

    let resolved = resolve_keyword(root, retriever, &schema_path);
    let expected = match (&error.kind, resolved) {
        (ValidationErrorKind::Required { .. }, Some(Value::Array(names))) => {
            Some(Value::Array(names.clone()))
        }
        (ValidationErrorKind::Required { property }, _) => Some(Value::Array(vec![property.clone()])),
        (_, resolved) => resolved.cloned(),
    };

    let context = match (constraint.as_str(), resolved) {
        ("anyOf" | "oneOf", Some(Value::Array(branches))) => {
            branch_errors(branches, root, retriever, &actual, &path, &schema_path, config)
        }
        _ => Vec::new(),
    };

    ValidationErrorDetail::for_constraint(message, constraint, expected, Some(actual), &config.suggestions)
        .with_path(path)
        .with_schema_path(schema_path)
        .with_context(context)
}

fn constraint_name(kind: &ValidationErrorKind, schema_path: &[PathSegment]) -> String {
    let name = match kind {
        ValidationErrorKind::Required { .. } => "required",
        ValidationErrorKind::Type { .. } => "type",
        ValidationErrorKind::Pattern { .. } => "pattern",
        ValidationErrorKind::Enum { .. } => "enum",
        ValidationErrorKind::Format { .. } => "format",
        ValidationErrorKind::MinLength { .. } => "minLength",
        ValidationErrorKind::MaxLength { .. } => "maxLength",
        ValidationErrorKind::MinItems { .. } => "minItems",
        ValidationErrorKind::MaxItems { .. } => "maxItems",
        ValidationErrorKind::Minimum { .. } => "minimum",
        ValidationErrorKind::Maximum { .. } => "maximum",
        ValidationErrorKind::ExclusiveMinimum { .. } => "exclusiveMinimum",
        ValidationErrorKind::ExclusiveMaximum { .. } => "exclusiveMaximum",
        _ => {
            return schema_path
                .iter()
                .rev()
                .find_map(|seg| match seg {
                    PathSegment::Key(k) => Some(k.clone()),
                    PathSegment::Index(_) => None,
                })
                .unwrap_or_default()
        }
    };
    name.to_string()
}

/// Split a keyword location into segments by walking `root`.
///
/// `$ref`s are followed, so a numeric `properties` key stays a key even
/// behind a reference. Where the walk leaves the known schemas the rest of
/// the pointer is split without them.
fn schema_pointer_path(
    pointer: &str,
    root: &Value,
    retriever: &LocalSchemaRetriever,
) -> Vec<PathSegment> {
    let mut path = Vec::new();
    let mut document = root;
    let mut node = Some(root);
    let mut rest = pointer;
    while let Some(body) = rest.strip_prefix('/') {
        let (token, tail) = match body.find('/') {
            Some(i) => (&rest[..=i], &body[i..]),
            None => (rest, ""),
        };
        let Some(current) = node else {
            path.extend(parse_pointer(rest));
            break;
        };
        if token == "/$ref" {
            let target = current
                .get("$ref")
                .and_then(Value::as_str)
                .and_then(|r| follow_ref(r, document, retriever));
            node = target.map(|(target_document, target_node)| {
                document = target_document;
                target_node
            });
            path.push(PathSegment::from("$ref"));
        } else {
            let mut segments = pointer_path(token, current);
            node = match segments.first() {
                Some(PathSegment::Index(i)) => current.get(*i),
                Some(PathSegment::Key(k)) => current.get(k.as_str()),
                None => None,
            };
            path.append(&mut segments);
        }
        rest = tail;
    }
    path
}

/// Follow a keyword location through `root`, stepping through `$ref`s, and
/// return the schema value found there.
fn resolve_keyword<'a>(
    root: &'a Value,
    retriever: &'a LocalSchemaRetriever,
    schema_path: &[PathSegment],
) -> Option<&'a Value> {
    let mut document = root;
    let mut node = root;
    for segment in schema_path {
        if matches!(segment, PathSegment::Key(k) if k == "$ref") {
            (document, node) = follow_ref(node.get("$ref")?.as_str()?, document, retriever)?;
            continue;
        }
        node = match (node, segment) {
            (Value::Array(items), PathSegment::Index(i)) => items.get(*i)?,
            (Value::Object(map), seg) => map.get(&seg.to_string())?,
            _ => return None,
        };
    }
    Some(node)
}

/// Per-branch findings for a failed `anyOf`/`oneOf`.
///
/// Each branch is compiled on its own, carrying the root's `$defs` and
/// `definitions` so local references keep resolving. Branches that still do
/// not compile contribute nothing.
fn branch_errors(
    branches: &[Value],
    root: &Value,
    retriever: &LocalSchemaRetriever,
    instance: &Value,
    parent_path: &[PathSegment],
    parent_schema_path: &[PathSegment],
    config: &ValidatorConfig,
) -> Vec<ValidationErrorDetail> {
    let mut context = Vec::new();
    for (index, branch) in branches.iter().enumerate() {
        let mut standalone = branch.clone();
        if let Value::Object(map) = &mut standalone {
            for key in ["$defs", "definitions"] {
                if let Some(defs) = root.get(key) {
                    map.entry(key.to_string()).or_insert_with(|| defs.clone());
                }
            }
        }
        let engine = match build_engine(&standalone, retriever, config.validate_formats) {
            Ok(engine) => engine,
            Err(e) => {
                tracing::debug!(branch = index, error = %e, "skipping uncompilable union branch");
                continue;
            }
        };
        for sub in engine.iter_errors(instance) {
            let mut detail = convert(sub, &standalone, retriever, instance, config);
            detail.path = parent_path.iter().cloned().chain(detail.path).collect();
            detail.schema_path = parent_schema_path
                .iter()
                .cloned()
                .chain(std::iter::once(PathSegment::Index(index)))
                .chain(detail.schema_path)
                .collect();
            context.push(detail);
        }
    }
    context
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::CANONICAL_SCHEMA_FILENAME;
    use serde_json::json;

    fn versioned_schema(version: &str, required: &[&str]) -> Value {
        json!({
            "$schema": "https://json-schema.org/draft/2020-12/schema",
            "title": format!("Schema v{version}"),
            "type": "object",
            "required": required,
            "properties": {
                "schema_version": {"type": "string", "const": version},
                "description": {"type": "string"},
                "new_field": {"type": "string"}
            }
        })
    }

    fn write_version(root: &Path, version: &str, schema: &Value) {
        let dir = root.join("versions").join(version);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join(CANONICAL_SCHEMA_FILENAME), schema.to_string()).unwrap();
    }

    fn single_version_root() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        write_version(
            dir.path(),
            "0.1.0",
            &versioned_schema("0.1.0", &["schema_version", "description"]),
        );
        dir
    }

    #[test]
    fn builds_with_specific_version() {
        let dir = single_version_root();
        let registry = SchemaVersionRegistry::new(dir.path());
        let validator = SchemaValidator::builder(&registry).version("0.1.0").build().unwrap();
        assert_eq!(validator.current_version(), Some("0.1.0"));
        assert!(validator.supported_versions().contains(&"0.1.0".to_string()));
        assert!(validator.schema().is_some());
    }

    #[test]
    fn unsupported_construction_version_fails() {
        let dir = single_version_root();
        let registry = SchemaVersionRegistry::new(dir.path());
        let err = SchemaValidator::builder(&registry).version("0.2.0").build().unwrap_err();
        assert!(err.to_string().contains("schema version '0.2.0' is not supported"));
    }

    #[test]
    fn schema_and_version_together_is_configuration_error() {
        let dir = single_version_root();
        let registry = SchemaVersionRegistry::new(dir.path());
        let err = SchemaValidator::builder(&registry)
            .schema(json!({"type": "object"}))
            .version("0.1.0")
            .build()
            .unwrap_err();
        assert!(matches!(err, SchemaError::Configuration(_)));
    }

    #[test]
    fn invalid_schema_is_fatal_at_construction() {
        let dir = tempfile::tempdir().unwrap();
        let registry = SchemaVersionRegistry::new(dir.path());
        let err = SchemaValidator::builder(&registry)
            .schema(json!({"properties": {"x": {"pattern": "(["}}}))
            .build()
            .unwrap_err();
        assert!(matches!(err, SchemaError::InvalidSchema(_)), "got: {err}");
    }

    #[test]
    fn unresolvable_external_ref_fails_construction() {
        let dir = tempfile::tempdir().unwrap();
        let registry = SchemaVersionRegistry::new(dir.path());
        let err = SchemaValidator::builder(&registry)
            .schema(json!({"properties": {"x": {"$ref": "definitions/missing.schema.json"}}}))
            .build()
            .unwrap_err();
        assert!(matches!(err, SchemaError::InvalidSchema(_)), "got: {err}");
    }

    #[test]
    fn conforming_document_has_no_errors_either_way() {
        let dir = single_version_root();
        let registry = SchemaVersionRegistry::new(dir.path());
        let mut validator = SchemaValidator::new(&registry).unwrap();
        let doc = json!({"schema_version": "0.1.0", "description": "ok"});
        assert!(validator.validate(Document::Value(&doc), false, None, true).unwrap().is_empty());
        assert!(validator.validate(Document::Value(&doc), true, None, true).unwrap().is_empty());
    }

    #[test]
    fn unsupported_declared_version_is_single_synthetic_error() {
        let dir = single_version_root();
        let registry = SchemaVersionRegistry::new(dir.path());
        let mut validator = SchemaValidator::new(&registry).unwrap();
        // Also missing "description" and wrong-typed; none of it is reported.
        let doc = json!({"schema_version": "0.2.0", "description": 5});
        let errors = validator.validate(Document::Value(&doc), false, None, true).unwrap();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("not supported"));
        assert!(errors[0].message.contains("0.2.0"));
        assert!(errors[0].message.contains("0.1.0"));
    }

    #[test]
    fn missing_version_without_default_is_single_synthetic_error() {
        let dir = single_version_root();
        let registry = SchemaVersionRegistry::new(dir.path());
        let mut validator = SchemaValidator::new(&registry).unwrap();
        validator.clear_default_version();
        let doc = json!({"description": "Test description"});
        let errors = validator.validate(Document::Value(&doc), false, None, true).unwrap();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("No schema_version field found"));
    }

    #[test]
    fn empty_registry_reports_missing_default() {
        let dir = tempfile::tempdir().unwrap();
        let registry = SchemaVersionRegistry::new(dir.path());
        let mut validator = SchemaValidator::new(&registry).unwrap();
        assert_eq!(validator.current_version(), None);
        let errors = validator
            .validate(Document::Json(r#"{"description": "x"}"#), false, None, true)
            .unwrap();
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn undeclared_document_uses_default_version() {
        let dir = single_version_root();
        let registry = SchemaVersionRegistry::new(dir.path());
        let mut validator = SchemaValidator::new(&registry).unwrap();
        let doc = json!({"description": "no version"});
        let errors = validator.validate(Document::Value(&doc), false, None, true).unwrap();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].constraint, "required");
        assert!(errors[0].suggestion.as_deref().unwrap().contains("schema_version"));
    }

    #[test]
    fn disabled_auto_detect_uses_configured_version() {
        let dir = single_version_root();
        let registry = SchemaVersionRegistry::new(dir.path());
        let mut validator = SchemaValidator::builder(&registry).version("0.1.0").build().unwrap();
        let doc = json!({"schema_version": "0.2.0", "description": "Test description"});
        let errors = validator.validate(Document::Value(&doc), false, None, false).unwrap();
        assert!(!errors.is_empty());
        assert_eq!(errors[0].constraint, "const");
    }

    #[test]
    fn raise_on_failure_carries_every_error() {
        let dir = single_version_root();
        let registry = SchemaVersionRegistry::new(dir.path());
        let mut validator = SchemaValidator::new(&registry).unwrap();
        let doc = json!({"schema_version": "0.1.0", "description": 7});
        let err = validator.validate(Document::Value(&doc), true, None, true).unwrap_err();
        match err {
            SchemaError::ValidationFailed { errors } => {
                assert_eq!(errors.len(), 1);
                assert_eq!(errors.errors()[0].constraint, "type");
                assert_eq!(
                    errors.errors()[0].suggestion.as_deref(),
                    Some("Change value type from 'integer' to 'string'.")
                );
            }
            other => panic!("expected ValidationFailed, got: {other}"),
        }
    }

    #[test]
    fn explicit_schema_skips_version_detection() {
        let dir = tempfile::tempdir().unwrap();
        let registry = SchemaVersionRegistry::new(dir.path());
        let mut validator = SchemaValidator::builder(&registry)
            .schema(json!({
                "type": "object",
                "required": ["sj_version"],
                "properties": {"sj_version": {"type": "string", "pattern": "^\\d+\\.\\d+\\.\\d+$"}}
            }))
            .build()
            .unwrap();
        assert_eq!(validator.current_version(), None);

        let ok = json!({"sj_version": "0.1.0"});
        assert!(validator.validate(Document::Value(&ok), false, None, true).unwrap().is_empty());

        let bad = json!({"sj_version": "0.1"});
        let errors = validator.validate(Document::Value(&bad), false, None, true).unwrap();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].constraint, "pattern");
        assert_eq!(errors[0].path, vec![PathSegment::from("sj_version")]);
        assert!(errors[0].suggestion.as_deref().unwrap().contains("regex pattern"));
    }

    #[test]
    fn errors_sorted_by_instance_path() {
        let dir = tempfile::tempdir().unwrap();
        let registry = SchemaVersionRegistry::new(dir.path());
        let mut validator = SchemaValidator::builder(&registry)
            .schema(json!({
                "type": "object",
                "properties": {
                    "z": {"type": "string"},
                    "a": {"type": "array", "items": {"type": "integer"}}
                }
            }))
            .build()
            .unwrap();
        let doc = json!({"z": 1, "a": [1, "x", 2, "y"]});
        let errors = validator.validate(Document::Value(&doc), false, None, true).unwrap();
        let paths: Vec<String> = errors.iter().map(|e| e.path_string()).collect();
        assert_eq!(paths, ["a/1", "a/3", "z"]);
    }

    #[test]
    fn numeric_object_keys_stay_keys_in_paths() {
        let dir = tempfile::tempdir().unwrap();
        let registry = SchemaVersionRegistry::new(dir.path());
        let mut validator = SchemaValidator::builder(&registry)
            .schema(json!({
                "type": "object",
                "properties": {"7": {"type": "string"}},
                "additionalProperties": {"type": "string"}
            }))
            .build()
            .unwrap();
        let doc = json!({"10": 1, "9": 2, "a": 3, "7": [0]});
        let errors = validator.validate(Document::Value(&doc), false, None, true).unwrap();
        let paths: Vec<Vec<PathSegment>> = errors.iter().map(|e| e.path.clone()).collect();
        assert_eq!(
            paths,
            [
                vec![PathSegment::from("10")],
                vec![PathSegment::from("7")],
                vec![PathSegment::from("9")],
                vec![PathSegment::from("a")],
            ]
        );
        assert_eq!(
            errors[1].schema_path,
            vec![PathSegment::from("properties"), PathSegment::from("7"), PathSegment::from("type")]
        );
        assert_eq!(errors[1].expected, Some(json!("string")));
        let value = serde_json::to_value(&errors[0]).unwrap();
        assert_eq!(value["path"], json!(["10"]));
    }

    #[test]
    fn required_suggestion_uses_full_required_list_through_local_ref() {
        let dir = tempfile::tempdir().unwrap();
        let registry = SchemaVersionRegistry::new(dir.path());
        let mut validator = SchemaValidator::builder(&registry)
            .schema(json!({
                "$defs": {
                    "step": {
                        "type": "object",
                        "required": ["stepId", "name", "description", "software"]
                    }
                },
                "type": "object",
                "properties": {"processingSteps": {"type": "array", "items": {"$ref": "#/$defs/step"}}}
            }))
            .build()
            .unwrap();
        let doc = json!({"processingSteps": [{"parameters": {}}]});
        let errors = validator.validate(Document::Value(&doc), false, None, true).unwrap();
        assert_eq!(errors.len(), 4);
        for e in &errors {
            assert_eq!(e.constraint, "required");
            assert_eq!(
                e.suggestion.as_deref(),
                Some("Ensure required property or properties ('stepId', 'name', 'description', 'software') are present.")
            );
        }
    }

    #[test]
    fn union_failures_carry_branch_context() {
        let dir = tempfile::tempdir().unwrap();
        let registry = SchemaVersionRegistry::new(dir.path());
        let mut validator = SchemaValidator::builder(&registry)
            .schema(json!({
                "type": "object",
                "properties": {"x": {"anyOf": [{"type": "string"}, {"type": "integer"}]}}
            }))
            .build()
            .unwrap();
        let doc = json!({"x": [1]});
        let errors = validator.validate(Document::Value(&doc), false, None, true).unwrap();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].constraint, "anyOf");
        assert_eq!(errors[0].suggestion, None);
        assert_eq!(errors[0].context.len(), 2);
        assert!(errors[0].context.iter().all(|c| c.constraint == "type"));
        assert_eq!(errors[0].context[0].path, vec![PathSegment::from("x")]);
        assert_eq!(
            errors[0].context[1].suggestion.as_deref(),
            Some("Change value type from 'array' to 'integer'.")
        );
    }

    #[test]
    fn enum_typo_gets_did_you_mean() {
        let dir = tempfile::tempdir().unwrap();
        let registry = SchemaVersionRegistry::new(dir.path());
        let mut validator = SchemaValidator::builder(&registry)
            .schema(json!({"properties": {"method": {"enum": ["linear", "cubic"]}}}))
            .build()
            .unwrap();
        let doc = json!({"method": "lnear"});
        let errors = validator.validate(Document::Value(&doc), false, None, true).unwrap();
        assert_eq!(errors[0].constraint, "enum");
        assert!(errors[0].suggestion.as_deref().unwrap().ends_with("Did you mean 'linear'?"));
    }

    #[test]
    fn format_assertions_are_enforced() {
        let dir = tempfile::tempdir().unwrap();
        let registry = SchemaVersionRegistry::new(dir.path());
        let mut validator = SchemaValidator::builder(&registry)
            .schema(json!({"properties": {"when": {"type": "string", "format": "date-time"}}}))
            .build()
            .unwrap();
        let doc = json!({"when": "yesterday"});
        let errors = validator.validate(Document::Value(&doc), false, None, true).unwrap();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].constraint, "format");
        assert!(errors[0].suggestion.as_deref().unwrap().contains("Example:"));
    }

    #[test]
    fn malformed_string_input_is_fatal() {
        let dir = single_version_root();
        let registry = SchemaVersionRegistry::new(dir.path());
        let mut validator = SchemaValidator::new(&registry).unwrap();
        let err = validator.validate(Document::Json("{"), false, None, true).unwrap_err();
        assert!(matches!(err, SchemaError::MalformedInput(_)));
    }

    #[test]
    fn missing_document_path_is_fatal() {
        let dir = single_version_root();
        let registry = SchemaVersionRegistry::new(dir.path());
        let mut validator = SchemaValidator::new(&registry).unwrap();
        let missing = dir.path().join("nope.json");
        let err = validator.validate(Document::Path(&missing), false, None, true).unwrap_err();
        assert!(matches!(err, SchemaError::NotFound { .. }));
    }

    #[derive(Debug)]
    struct AlwaysFlags;

    impl BidsContextCheck for AlwaysFlags {
        fn check(&self, _: &Value, _: Option<&Path>, root: &Path) -> Vec<ValidationErrorDetail> {
            vec![ValidationErrorDetail::new(format!("not inside {}", root.display()))]
        }
    }

    #[test]
    fn bids_check_runs_only_when_root_given() {
        let dir = single_version_root();
        let registry = SchemaVersionRegistry::new(dir.path());
        let mut validator = SchemaValidator::builder(&registry)
            .bids_check(Box::new(AlwaysFlags))
            .build()
            .unwrap();
        let doc = json!({"schema_version": "0.1.0", "description": "ok"});
        assert!(validator.validate(Document::Value(&doc), false, None, true).unwrap().is_empty());
        let errors = validator
            .validate(Document::Value(&doc), false, Some(Path::new("/bids")), true)
            .unwrap();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("/bids"));
    }

    #[test]
    fn default_bids_check_adds_nothing() {
        let dir = single_version_root();
        let registry = SchemaVersionRegistry::new(dir.path());
        let mut validator = SchemaValidator::new(&registry).unwrap();
        let doc = json!({"schema_version": "0.1.0", "description": "ok"});
        let errors = validator
            .validate(Document::Value(&doc), false, Some(dir.path()), true)
            .unwrap();
        assert!(errors.is_empty());
    }

    #[test]
    fn resolve_keyword_follows_local_refs() {
        let root = json!({
            "$defs": {"s": {"minLength": 3}},
            "properties": {"a": {"$ref": "#/$defs/s"}}
        });
        let retriever = LocalSchemaRetriever::default();
        let path = parse_pointer("/properties/a/$ref/minLength");
        assert_eq!(resolve_keyword(&root, &retriever, &path), Some(&json!(3)));
        assert!(resolve_keyword(&root, &retriever, &parse_pointer("/properties/b/type")).is_none());
    }

    #[test]
    fn resolve_keyword_follows_file_refs_into_served_documents() {
        let step_uri = "file:///schemas/definitions/step.schema.json";
        let step = json!({
            "$defs": {"label": {"maxLength": 8}},
            "properties": {"name": {"$ref": "#/$defs/label"}}
        });
        let retriever = LocalSchemaRetriever {
            schemas_by_uri: HashMap::from([(step_uri.to_string(), step)]),
        };
        let root = json!({"items": {"$ref": step_uri}});

        let path = schema_pointer_path("/items/$ref/properties/name/$ref/maxLength", &root, &retriever);
        assert_eq!(path[0], PathSegment::from("items"));
        assert_eq!(resolve_keyword(&root, &retriever, &path), Some(&json!(8)));
    }
}
