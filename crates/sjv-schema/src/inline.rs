//! # Reference Inliner
//!
//! Replaces external `$ref` pointers (any `$ref` string not starting with
//! `#`) with the content of the file they name, recursively, so the
//! validation engine never touches the filesystem or network. Only cycle
//! references (below) survive, and those name files the cache already holds.
//!
//! Relative references resolve against the directory of the file that
//! contains them. A mapping holding an external `$ref` is replaced wholesale
//! by the referenced content. A `file.json#/json/pointer` reference inlines
//! the addressed subtree of the fully inlined file.
//!
//! ## Cycles
//!
//! A file is marked pending while its own references are being inlined. A
//! reference that reaches a pending file (`a.json → b.json → a.json`, or a
//! definition that contains itself) becomes a `$ref` to that file's absolute
//! `file://` URI instead of being expanded again. The cache keeps every
//! resolved file, so the engine can serve those URIs from memory; see
//! [`RefCache::iter`] and [`file_uri`].
//!
//! ## Failure policy
//!
//! A missing or unparsable target never aborts inlining. The reference is
//! left in place and a warning is logged; the engine then reports it when the
//! schema is compiled.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use serde_json::Value;
use url::Url;

use crate::error::SchemaError;

/// Resolved external references keyed by absolute file path.
#[derive(Debug, Default, Clone)]
pub struct RefCache {
    entries: HashMap<PathBuf, Value>,
    /// Files whose references are still being inlined.
    pending: HashSet<PathBuf>,
}

impl RefCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The resolved content for a file.
    pub fn get(&self, path: &Path) -> Option<&Value> {
        self.entries.get(path)
    }

    /// Every resolved file with its canonical path.
    pub fn iter(&self) -> impl Iterator<Item = (&Path, &Value)> {
        self.entries.iter().map(|(path, value)| (path.as_path(), value))
    }

    fn insert(&mut self, path: PathBuf, value: Value) {
        self.entries.insert(path, value);
    }
}

/// The `file://` URI for `path`, canonicalized when the file exists and made
/// absolute against the working directory otherwise.
pub fn file_uri(path: &Path) -> Option<String> {
    let absolute = match std::fs::canonicalize(path) {
        Ok(canonical) => canonical,
        Err(_) if path.is_absolute() => path.to_path_buf(),
        Err(_) => std::env::current_dir().ok()?.join(path),
    };
    Url::from_file_path(absolute).ok().map(String::from)
}

/// Inline every external `$ref` in `schema`, resolving relative to `base_dir`.
///
/// Mappings are walked key by key, sequences element-wise; scalars are
/// returned unchanged. The cache is shared across the whole walk.
pub fn inline_refs(schema: &Value, base_dir: &Path, cache: &mut RefCache) -> Value {
    match schema {
        Value::Object(map) => {
            if let Some(Value::String(reference)) = map.get("$ref") {
                if !reference.starts_with('#') {
                    return resolve_external(schema, reference, base_dir, cache);
                }
            }
            Value::Object(
                map.iter()
                    .map(|(key, value)| (key.clone(), inline_refs(value, base_dir, cache)))
                    .collect(),
            )
        }
        Value::Array(items) => Value::Array(
            items
                .iter()
                .map(|item| inline_refs(item, base_dir, cache))
                .collect(),
        ),
        scalar => scalar.clone(),
    }
}

/// Inline with a fresh cache.
pub fn inline_schema(schema: &Value, base_dir: &Path) -> Value {
    let mut cache = RefCache::new();
    let inlined = inline_refs(schema, base_dir, &mut cache);
    tracing::debug!(
        base_dir = %base_dir.display(),
        files = cache.len(),
        "inlined external schema references"
    );
    inlined
}

fn resolve_external(original: &Value, reference: &str, base_dir: &Path, cache: &mut RefCache) -> Value {
    let (file_part, fragment) = match reference.split_once('#') {
        Some((file, fragment)) => (file, Some(fragment)),
        None => (reference, None),
    };

    let target = base_dir.join(file_part);
    let key = std::fs::canonicalize(&target).unwrap_or_else(|_| target.clone());

    if cache.pending.contains(&key) {
        let Some(uri) = file_uri(&key) else {
            return original.clone();
        };
        tracing::trace!(reference, %uri, "$ref cycle; referencing file by URI");
        let target = match fragment {
            None | Some("") => uri,
            Some(pointer) => format!("{uri}#{pointer}"),
        };
        return serde_json::json!({ "$ref": target });
    }

    let content = match cache.get(&key) {
        Some(cached) => {
            tracing::trace!(reference, path = %key.display(), "$ref cache hit");
            cached.clone()
        }
        None => {
            if !key.is_file() {
                tracing::warn!(
                    reference,
                    path = %key.display(),
                    "$ref target does not exist or is not a file; leaving reference unresolved"
                );
                return original.clone();
            }
            let raw = match SchemaError::read_json(&key) {
                Ok(raw) => raw,
                Err(e) => {
                    tracing::warn!(
                        reference,
                        error = %e,
                        "failed to load $ref target; leaving reference unresolved"
                    );
                    return original.clone();
                }
            };
            cache.pending.insert(key.clone());
            let ref_dir = key.parent().unwrap_or(base_dir).to_path_buf();
            let resolved = inline_refs(&raw, &ref_dir, cache);
            cache.pending.remove(&key);
            cache.insert(key.clone(), resolved.clone());
            resolved
        }
    };

    match fragment {
        None | Some("") => content,
        Some(pointer) => match content.pointer(pointer) {
            Some(sub) => sub.clone(),
            None => {
                tracing::warn!(
                    reference,
                    pointer,
                    "$ref fragment does not exist in target; leaving reference unresolved"
                );
                original.clone()
            }
        },
    }
}
