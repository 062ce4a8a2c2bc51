//! Document inputs accepted by the registry and the validator façade.

use std::borrow::Cow;
use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::error::SchemaError;

/// A signalJourney document to inspect or validate.
#[derive(Debug, Clone, Copy)]
pub enum Document<'a> {
    /// A JSON file on disk, read as UTF-8.
    Path(&'a Path),
    /// A raw JSON-encoded string.
    Json(&'a str),
    /// An already parsed value.
    Value(&'a Value),
}

impl<'a> Document<'a> {
    /// Parse the document, borrowing when it is already a value.
    ///
    /// # Errors
    ///
    /// - [`SchemaError::NotFound`] for a path that does not exist.
    /// - [`SchemaError::InvalidJson`] for a file that does not parse.
    /// - [`SchemaError::MalformedInput`] for a string that does not parse.
    pub fn load(self) -> Result<Cow<'a, Value>, SchemaError> {
        match self {
            Document::Path(path) => {
                if !path.exists() {
                    return Err(SchemaError::NotFound {
                        path: path.to_path_buf(),
                    });
                }
                SchemaError::read_json(path).map(Cow::Owned)
            }
            Document::Json(text) => serde_json::from_str(text)
                .map(Cow::Owned)
                .map_err(|e| SchemaError::MalformedInput(e.to_string())),
            Document::Value(value) => Ok(Cow::Borrowed(value)),
        }
    }

    /// The on-disk location, when the document came from a file.
    pub fn file_path(&self) -> Option<&'a Path> {
        match *self {
            Document::Path(path) => Some(path),
            _ => None,
        }
    }
}

impl<'a> From<&'a Path> for Document<'a> {
    fn from(path: &'a Path) -> Self {
        Document::Path(path)
    }
}

impl<'a> From<&'a PathBuf> for Document<'a> {
    fn from(path: &'a PathBuf) -> Self {
        Document::Path(path.as_path())
    }
}

impl<'a> From<&'a Value> for Document<'a> {
    fn from(value: &'a Value) -> Self {
        Document::Value(value)
    }
}
