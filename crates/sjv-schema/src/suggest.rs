//! # Remediation Suggestions
//!
//! Turns one failed constraint (its keyword, the schema's value for that
//! keyword, and the offending instance value) into a one-line hint.
//! Pure and infallible: an unrecognized keyword simply yields `None`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Tunables for suggestion generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SuggestionConfig {
    /// Offer "Did you mean" hints for near-miss enum strings.
    pub fuzzy_matching: bool,
    /// Similarity (0–100) a candidate must exceed to be offered.
    pub fuzzy_threshold: f64,
    /// Shown in place of a length for values that have none.
    pub unmeasurable_length: String,
}

impl Default for SuggestionConfig {
    fn default() -> Self {
        Self {
            fuzzy_matching: true,
            fuzzy_threshold: 80.0,
            unmeasurable_length: "N/A".to_string(),
        }
    }
}

/// Build the suggestion for a failed `constraint`.
///
/// `expected` is the schema's value for the keyword; `actual` is the
/// instance value that failed it.
pub fn suggest(
    constraint: &str,
    expected: Option<&Value>,
    actual: Option<&Value>,
    config: &SuggestionConfig,
) -> Option<String> {
    let suggestion = match constraint {
        "required" => required(expected, actual),
        "type" => type_mismatch(expected, actual),
        "pattern" => format!(
            "Ensure value matches the required regex pattern: '{}'.",
            expected.map(display_scalar).unwrap_or_default()
        ),
        "enum" => enumeration(expected, actual, config),
        "format" => format_hint(expected),
        "minLength" => format!(
            "Ensure value has at least {} characters/items (currently {}).",
            bound(expected),
            measured_length(actual, true, config)
        ),
        "maxLength" => format!(
            "Ensure value has at most {} characters/items (currently {}).",
            bound(expected),
            measured_length(actual, true, config)
        ),
        "minItems" => format!(
            "Ensure array has at least {} items (currently {}).",
            bound(expected),
            measured_length(actual, false, config)
        ),
        "maxItems" => format!(
            "Ensure array has at most {} items (currently {}).",
            bound(expected),
            measured_length(actual, false, config)
        ),
        "minimum" => format!("Ensure value is at least {}.", bound(expected)),
        "maximum" => format!("Ensure value is at most {}.", bound(expected)),
        "exclusiveMinimum" => format!("Ensure value is strictly greater than {}.", bound(expected)),
        "exclusiveMaximum" => format!("Ensure value is strictly less than {}.", bound(expected)),
        _ => return None,
    };
    Some(suggestion)
}

fn required(expected: Option<&Value>, actual: Option<&Value>) -> String {
    let Some(Value::Array(names)) = expected else {
        return "Ensure required property is present (check schema for details).".to_string();
    };
    let names: Vec<&str> = names.iter().filter_map(Value::as_str).collect();
    // Name only what is actually absent when the instance is an object.
    let missing: Vec<&str> = match actual {
        Some(Value::Object(present)) => names
            .iter()
            .copied()
            .filter(|name| !present.contains_key(*name))
            .collect(),
        _ => names.clone(),
    };
    let listed = if missing.is_empty() { names } else { missing };
    format!(
        "Ensure required property or properties ('{}') are present.",
        listed.join("', '")
    )
}

fn type_mismatch(expected: Option<&Value>, actual: Option<&Value>) -> String {
    let actual_type = actual.map(json_type_name).unwrap_or("unknown");
    match expected {
        Some(Value::String(t)) => format!("Change value type from '{actual_type}' to '{t}'."),
        Some(Value::Array(types)) => {
            let types: Vec<String> = types.iter().map(|t| format!("'{}'", display_scalar(t))).collect();
            format!("Change value type from '{actual_type}' to {}.", types.join(" or "))
        }
        _ => format!("Check schema for expected type(s) instead of '{actual_type}'."),
    }
}

fn enumeration(expected: Option<&Value>, actual: Option<&Value>, config: &SuggestionConfig) -> String {
    let Some(Value::Array(allowed)) = expected else {
        return "Ensure value is one of the allowed options (check schema).".to_string();
    };
    let listed: Vec<String> = allowed.iter().map(quoted).collect();
    let mut text = format!("Value must be one of: {}.", listed.join(", "));

    if config.fuzzy_matching {
        if let Some(Value::String(given)) = actual {
            let candidates: Vec<&str> = allowed.iter().filter_map(Value::as_str).collect();
            if !given.is_empty() && !candidates.is_empty() {
                if let Some((best, score)) = best_match(given, &candidates) {
                    if score > config.fuzzy_threshold {
                        text.push_str(&format!(" Did you mean '{best}'?"));
                    }
                }
            }
        }
    }
    text
}

fn format_hint(expected: Option<&Value>) -> String {
    let format = expected.map(display_scalar).unwrap_or_default();
    let example = match format.as_str() {
        "date-time" => " Example: '2024-01-31T14:30:00Z'.",
        "uri" => " Example: 'https://example.org/derivatives/pipeline'.",
        _ => "",
    };
    format!("Ensure value is a valid '{format}' string.{example}")
}

fn bound(expected: Option<&Value>) -> String {
    expected.map(display_scalar).unwrap_or_else(|| "?".to_string())
}

fn measured_length(actual: Option<&Value>, count_strings: bool, config: &SuggestionConfig) -> String {
    match actual {
        Some(Value::String(s)) if count_strings => s.chars().count().to_string(),
        Some(Value::Array(items)) => items.len().to_string(),
        _ => config.unmeasurable_length.clone(),
    }
}

/// JSON Schema type name of a value; whole numbers report as `integer`.
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_i64() || n.is_u64() => "integer",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Strings unquoted, everything else as JSON text.
fn display_scalar(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn quoted(value: &Value) -> String {
    match value {
        Value::String(s) => format!("'{s}'"),
        other => other.to_string(),
    }
}

/// The candidate most similar to `query`, with its 0–100 score.
pub fn best_match<'c>(query: &str, candidates: &[&'c str]) -> Option<(&'c str, f64)> {
    let query = normalize(query);
    if query.is_empty() {
        return None;
    }
    let mut best: Option<(&'c str, f64)> = None;
    for &candidate in candidates {
        let score = similarity(&query, &normalize(candidate));
        if best.map_or(true, |(_, top)| score > top) {
            best = Some((candidate, score));
        }
    }
    best
}

/// Lowercase, replace anything non-alphanumeric with a space, trim.
fn normalize(s: &str) -> String {
    let cleaned: String = s
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();
    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Indel similarity: `200 * LCS / (len(a) + len(b))`.
fn similarity(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 100.0;
    }
    let mut prev = vec![0usize; b.len() + 1];
    let mut row = vec![0usize; b.len() + 1];
    for ca in &a {
        for (j, cb) in b.iter().enumerate() {
            row[j + 1] = if ca == cb {
                prev[j] + 1
            } else {
                row[j].max(prev[j + 1])
            };
        }
        std::mem::swap(&mut prev, &mut row);
    }
    let lcs = prev[b.len()];
    200.0 * lcs as f64 / total as f64
}
