//! BIDS context checks.
//!
//! The placement and naming rules a signalJourney file must follow inside a
//! BIDS dataset are not yet specified, so the default check reports nothing.
//! Callers with real rules plug in their own [`BidsContextCheck`].

use std::path::Path;

use serde_json::Value;

use crate::detail::ValidationErrorDetail;

/// A validation pass over a document's position within a BIDS dataset.
pub trait BidsContextCheck: std::fmt::Debug {
    /// Findings for `instance`, optionally loaded from `file`, under `bids_root`.
    fn check(&self, instance: &Value, file: Option<&Path>, bids_root: &Path) -> Vec<ValidationErrorDetail>;
}

/// The default check: records the request and reports no findings.
#[derive(Debug, Default, Clone, Copy)]
pub struct PendingBidsCheck;

impl BidsContextCheck for PendingBidsCheck {
    fn check(&self, _instance: &Value, file: Option<&Path>, bids_root: &Path) -> Vec<ValidationErrorDetail> {
        tracing::info!(
            file = %file.map(|p| p.display().to_string()).unwrap_or_else(|| "<in-memory>".to_string()),
            bids_root = %bids_root.display(),
            "BIDS context validation requested (no rules defined)"
        );
        Vec::new()
    }
}
