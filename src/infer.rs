//! Single-sample semantic type inference for field values
//!
//! The first non-sentinel value in iteration order decides the type. This is
//! deliberately not a vote: a field mixing formats is typed by whichever value
//! was encountered first.

use crate::aggregator::OVERFLOW_SENTINEL;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Serialize, Serializer};
use std::fmt;
use uuid::Uuid;

static DATE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{8}$").expect("static regex"));
static DATETIME_SECONDS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{14}$").expect("static regex"));
static DATETIME_MINUTES_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{12}$").expect("static regex"));
static INT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[-+]?\d+$").expect("static regex"));
static FLOAT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[-+]?\d*\.\d+$").expect("static regex"));

/// Semantic type tag of a field's value population
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InferredType {
    /// `yyyyMMdd`
    Date,
    /// `yyyyMMddHHmmss`
    DateTimeSeconds,
    /// `yyyyMMddHHmm`
    DateTimeMinutes,
    Uuid,
    Int,
    Float,
    Boolean,
    String,
    /// No usable sample
    Unknown,
}

impl InferredType {
    pub fn as_str(&self) -> &'static str {
        match self {
            InferredType::Date => "yyyyMMdd",
            InferredType::DateTimeSeconds => "yyyyMMddHHmmss",
            InferredType::DateTimeMinutes => "yyyyMMddHHmm",
            InferredType::Uuid => "uuid",
            InferredType::Int => "int",
            InferredType::Float => "float",
            InferredType::Boolean => "boolean",
            InferredType::String => "string",
            InferredType::Unknown => "unknown",
        }
    }
}

impl fmt::Display for InferredType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for InferredType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Infer a type from distinct values in iteration order
///
/// # Example
/// ```
/// use hl7_profile::infer::{infer_type, InferredType};
///
/// assert_eq!(infer_type(["abc", "20230101"]), InferredType::String);
/// assert_eq!(infer_type(["20230101", "abc"]), InferredType::Date);
/// ```
pub fn infer_type<'a, I>(values: I) -> InferredType
where
    I: IntoIterator<Item = &'a str>,
{
    match values.into_iter().find(|v| *v != OVERFLOW_SENTINEL) {
        Some(sample) if !sample.is_empty() => classify(sample),
        _ => InferredType::Unknown,
    }
}

/// Classify one sample value
pub fn classify(sample: &str) -> InferredType {
    if DATE_RE.is_match(sample) {
        return InferredType::Date;
    }
    if DATETIME_SECONDS_RE.is_match(sample) {
        return InferredType::DateTimeSeconds;
    }
    if DATETIME_MINUTES_RE.is_match(sample) {
        return InferredType::DateTimeMinutes;
    }
    if Uuid::parse_str(sample).is_ok() {
        return InferredType::Uuid;
    }
    if INT_RE.is_match(sample) {
        return InferredType::Int;
    }
    if FLOAT_RE.is_match(sample) {
        return InferredType::Float;
    }
    if matches!(
        sample.to_ascii_lowercase().as_str(),
        "true" | "false" | "y" | "n"
    ) {
        return InferredType::Boolean;
    }
    InferredType::String
}
