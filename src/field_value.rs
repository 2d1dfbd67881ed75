//! Decoded field values and their canonical string forms
//!
//! A raw HL7 field is a scalar, a list of components, or a list of
//! repetitions. Components can nest (subcomponents), so the shape is a
//! recursive variant. Every consumer matches it exhaustively.

use serde::{Deserialize, Serialize};

/// Separator used when joining flattened leaves into one canonical string
pub const JOIN_SEPARATOR: char = '^';

/// A decoded field in one of its three shapes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum FieldValue {
    /// Single text value
    Scalar(String),
    /// Ordered components of a composite value (may nest for subcomponents)
    Components(Vec<FieldValue>),
    /// Ordered repetitions sharing one field position
    Repetitions(Vec<FieldValue>),
}

impl FieldValue {
    /// Convenience constructor for scalars
    pub fn scalar(text: impl Into<String>) -> Self {
        FieldValue::Scalar(text.into())
    }

    /// Convenience constructor for a flat list of scalar components
    pub fn components<I, S>(parts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        FieldValue::Components(parts.into_iter().map(FieldValue::scalar).collect())
    }

    /// True when the value carries a list structure (components or repetitions)
    pub fn is_list(&self) -> bool {
        !matches!(self, FieldValue::Scalar(_))
    }

    /// True when the value holds no text at all
    ///
    /// A scalar is empty when its text is empty; a list is empty when it has
    /// no elements. Whitespace-only scalars count as present here and are
    /// dropped later by normalization.
    pub fn is_empty(&self) -> bool {
        match self {
            FieldValue::Scalar(text) => text.is_empty(),
            FieldValue::Components(items) | FieldValue::Repetitions(items) => items.is_empty(),
        }
    }

    /// Collect every leaf depth-first, each one trimmed
    fn collect_leaves<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            FieldValue::Scalar(text) => out.push(text.trim()),
            FieldValue::Components(items) | FieldValue::Repetitions(items) => {
                for item in items {
                    item.collect_leaves(out);
                }
            }
        }
    }
}

/// Canonical string for a field value
///
/// Scalars are trimmed. Lists are flattened depth-first, leaves trimmed and
/// joined with `^`, and leading/trailing separators left by empty leaves are
/// stripped. An empty result means "no value".
pub fn normalize(value: &FieldValue) -> String {
    match value {
        FieldValue::Scalar(text) => text.trim().to_string(),
        FieldValue::Components(_) | FieldValue::Repetitions(_) => {
            let mut leaves = Vec::new();
            value.collect_leaves(&mut leaves);
            strip_separators(&leaves.join("^"))
        }
    }
}

/// Opaque single-string rendering for person/practitioner identifier types
///
/// Unlike [`normalize`], separators are stripped at every nesting level,
/// so an empty trailing subcomponent group never leaves a dangling `^`.
pub fn collapse(value: &FieldValue) -> String {
    match value {
        FieldValue::Scalar(text) => text.trim().to_string(),
        FieldValue::Components(items) | FieldValue::Repetitions(items) => {
            let parts: Vec<String> = items.iter().map(collapse).collect();
            strip_separators(&parts.join("^"))
        }
    }
}

fn strip_separators(joined: &str) -> String {
    joined.trim_matches(JOIN_SEPARATOR).to_string()
}
