//! # Validation Findings
//!
//! [`ValidationErrorDetail`] is one finding: a failed constraint located in
//! both the instance and the schema, with the values involved and a
//! generated remediation hint. Synthetic findings (unsupported version,
//! missing version field, BIDS checks) carry only a message and a path.

use std::fmt;

use serde::Serialize;
use serde_json::Value;

use crate::suggest::{suggest, SuggestionConfig};

/// One step in a path through a JSON document or schema.
///
/// Indices order before keys, indices numerically and keys lexically.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(untagged)]
pub enum PathSegment {
    Index(usize),
    Key(String),
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::Index(i) => write!(f, "{i}"),
            PathSegment::Key(k) => f.write_str(k),
        }
    }
}

impl From<&str> for PathSegment {
    fn from(key: &str) -> Self {
        PathSegment::Key(key.to_string())
    }
}

impl From<usize> for PathSegment {
    fn from(index: usize) -> Self {
        PathSegment::Index(index)
    }
}

fn pointer_tokens(pointer: &str) -> impl Iterator<Item = String> + '_ {
    pointer
        .split('/')
        .skip(1)
        .map(|raw| raw.replace("~1", "/").replace("~0", "~"))
}

fn digit_segment(token: String) -> PathSegment {
    match token.parse::<usize>() {
        Ok(i) if token.bytes().all(|b| b.is_ascii_digit()) => PathSegment::Index(i),
        _ => PathSegment::Key(token),
    }
}

/// Split a JSON Pointer (`/a/0/b~1c`) into segments without a document to
/// consult. All-digit segments become indices.
pub fn parse_pointer(pointer: &str) -> Vec<PathSegment> {
    pointer_tokens(pointer).map(digit_segment).collect()
}

/// Split a JSON Pointer into segments by walking `document` alongside it.
///
/// A token is an index only where the node it selects from is an array, so
/// an object key such as `"10"` stays a key. Tokens past the end of the
/// document fall back to [`parse_pointer`] rules.
pub fn pointer_path(pointer: &str, document: &Value) -> Vec<PathSegment> {
    let mut node = Some(document);
    let mut path = Vec::new();
    for token in pointer_tokens(pointer) {
        let current = node;
        let segment = match current {
            Some(Value::Array(items)) => {
                let segment = digit_segment(token);
                node = match &segment {
                    PathSegment::Index(i) => items.get(*i),
                    PathSegment::Key(_) => None,
                };
                segment
            }
            Some(Value::Object(map)) => {
                node = map.get(&token);
                PathSegment::Key(token)
            }
            _ => {
                node = None;
                digit_segment(token)
            }
        };
        path.push(segment);
    }
    path
}

/// A structured validation finding.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationErrorDetail {
    /// Human-readable description.
    pub message: String,
    /// Location of the offending value in the instance.
    pub path: Vec<PathSegment>,
    /// Location of the failing keyword in the schema.
    pub schema_path: Vec<PathSegment>,
    /// Keyword that failed (`required`, `type`, ...); empty for synthetic findings.
    pub constraint: String,
    /// The schema's value for `constraint`.
    pub expected: Option<Value>,
    /// The instance value that failed.
    pub actual: Option<Value>,
    /// Per-branch findings for `anyOf`/`oneOf` failures.
    pub context: Vec<ValidationErrorDetail>,
    /// Generated remediation hint.
    pub suggestion: Option<String>,
}

impl ValidationErrorDetail {
    /// A finding with no constraint, such as a version problem.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            path: Vec::new(),
            schema_path: Vec::new(),
            constraint: String::new(),
            expected: None,
            actual: None,
            context: Vec::new(),
            suggestion: None,
        }
    }

    /// A failed constraint; the suggestion is derived here, once.
    pub fn for_constraint(
        message: impl Into<String>,
        constraint: impl Into<String>,
        expected: Option<Value>,
        actual: Option<Value>,
        config: &SuggestionConfig,
    ) -> Self {
        let constraint = constraint.into();
        let suggestion = suggest(&constraint, expected.as_ref(), actual.as_ref(), config);
        Self {
            message: message.into(),
            path: Vec::new(),
            schema_path: Vec::new(),
            constraint,
            expected,
            actual,
            context: Vec::new(),
            suggestion,
        }
    }

    pub fn with_path(mut self, path: Vec<PathSegment>) -> Self {
        self.path = path;
        self
    }

    pub fn with_schema_path(mut self, schema_path: Vec<PathSegment>) -> Self {
        self.schema_path = schema_path;
        self
    }

    pub fn with_context(mut self, context: Vec<ValidationErrorDetail>) -> Self {
        self.context = context;
        self
    }

    /// `a/0/b`, or `root` for the document itself.
    pub fn path_string(&self) -> String {
        join_path(&self.path)
    }

    pub fn schema_path_string(&self) -> String {
        join_path(&self.schema_path)
    }
}

fn join_path(path: &[PathSegment]) -> String {
    if path.is_empty() {
        return "root".to_string();
    }
    path.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("/")
}

impl fmt::Display for ValidationErrorDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Error at '{}': {}", self.path_string(), self.message)?;
        if let Some(suggestion) = &self.suggestion {
            write!(f, " -- Suggestion: {suggestion}")?;
        }
        Ok(())
    }
}

/// Every finding for one document, in path order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors {
    errors: Vec<ValidationErrorDetail>,
}

impl ValidationErrors {
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn errors(&self) -> &[ValidationErrorDetail] {
        &self.errors
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ValidationErrorDetail> {
        self.errors.iter()
    }

    pub fn into_inner(self) -> Vec<ValidationErrorDetail> {
        self.errors
    }
}

impl From<Vec<ValidationErrorDetail>> for ValidationErrors {
    fn from(errors: Vec<ValidationErrorDetail>) -> Self {
        Self { errors }
    }
}

impl IntoIterator for ValidationErrors {
    type Item = ValidationErrorDetail;
    type IntoIter = std::vec::IntoIter<ValidationErrorDetail>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.into_iter()
    }
}

impl<'a> IntoIterator for &'a ValidationErrors {
    type Item = &'a ValidationErrorDetail;
    type IntoIter = std::slice::Iter<'a, ValidationErrorDetail>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.iter()
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, e) in self.errors.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "  {e}")?;
        }
        Ok(())
    }
}
