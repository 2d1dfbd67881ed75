//! HL7 v2 (ER7 pipe-delimited) message decoding
//!
//! Turns raw message text into the message/segment/field tree the profiler
//! consumes. Delimiters are read from the MSH header. No escape processing
//! and no conformance validation are performed.

use crate::field_value::FieldValue;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Category used when MSH-9 is missing or blank
pub const UNKNOWN_CATEGORY: &str = "UNKNOWN";

/// Errors raised while decoding a message
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("Empty message")]
    EmptyMessage,

    #[error("Message does not contain an MSH segment")]
    MissingHeader,

    #[error("Invalid segment name '{name}' on line {line}")]
    InvalidSegmentName { line: usize, name: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for decoding operations
pub type Result<T> = std::result::Result<T, DecodeError>;

/// One decoded segment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecodedSegment {
    /// Segment name (e.g., "PID")
    pub name: String,
    /// Fields in positional order; `fields[0]` is field 1
    pub fields: Vec<FieldValue>,
    /// 1-based positions (as strings) of fields that carried repetitions
    pub repeating_field_paths: BTreeSet<String>,
}

impl DecodedSegment {
    /// Segment without repeating fields
    pub fn new(name: impl Into<String>, fields: Vec<FieldValue>) -> Self {
        Self {
            name: name.into(),
            fields,
            repeating_field_paths: BTreeSet::new(),
        }
    }

    /// Mark a 1-based field position as repeating
    pub fn with_repeating(mut self, position: usize) -> Self {
        self.repeating_field_paths.insert(position.to_string());
        self
    }

    /// True when the 1-based field position is repeating
    pub fn is_repeating(&self, path: &str) -> bool {
        self.repeating_field_paths.contains(path)
    }
}

/// One decoded message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecodedMessage {
    /// Message category (MSH-9 joined with `^`, e.g. "ADT^A01")
    pub category: String,
    pub segments: Vec<DecodedSegment>,
}

impl DecodedMessage {
    pub fn new(category: impl Into<String>, segments: Vec<DecodedSegment>) -> Self {
        Self {
            category: category.into(),
            segments,
        }
    }

    /// Segment names in message order
    pub fn segment_names(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().map(|s| s.name.as_str())
    }
}

/// Delimiters declared by MSH-1 and MSH-2
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Delimiters {
    pub field: char,
    pub component: char,
    pub repetition: char,
    pub escape: char,
    pub subcomponent: char,
}

impl Default for Delimiters {
    fn default() -> Self {
        Self {
            field: '|',
            component: '^',
            repetition: '~',
            escape: '\\',
            subcomponent: '&',
        }
    }
}

impl Delimiters {
    /// Read delimiters from an MSH segment line
    fn from_header(line: &str) -> Self {
        let mut delimiters = Self::default();
        let mut chars = line.chars().skip(3);
        let Some(field) = chars.next() else {
            return delimiters;
        };
        delimiters.field = field;

        let encoding: Vec<char> = chars.take_while(|&c| c != field).collect();
        if let Some(&c) = encoding.first() {
            delimiters.component = c;
        }
        if let Some(&c) = encoding.get(1) {
            delimiters.repetition = c;
        }
        if let Some(&c) = encoding.get(2) {
            delimiters.escape = c;
        }
        if let Some(&c) = encoding.get(3) {
            delimiters.subcomponent = c;
        }
        delimiters
    }
}

/// Decode a single message from text
///
/// # Example
/// ```
/// use hl7_profile::decoder::decode_message;
///
/// let msg = decode_message("MSH|^~\\&|APP|FAC|||20240101||ADT^A01|1|P|2.5\rPID|1||123").unwrap();
/// assert_eq!(msg.category, "ADT^A01");
/// assert_eq!(msg.segments.len(), 2);
/// ```
pub fn decode_message(text: &str) -> Result<DecodedMessage> {
    let normalized = text.replace("\r\n", "\r").replace('\n', "\r");
    let normalized = normalized.trim();
    if normalized.is_empty() {
        return Err(DecodeError::EmptyMessage);
    }

    let lines: Vec<&str> = normalized
        .split('\r')
        .filter(|l| !l.trim().is_empty())
        .collect();

    let header = lines
        .iter()
        .find(|l| l.starts_with("MSH"))
        .ok_or(DecodeError::MissingHeader)?;
    let delimiters = Delimiters::from_header(header);

    let mut segments = Vec::with_capacity(lines.len());
    for (idx, line) in lines.iter().enumerate() {
        segments.push(decode_segment(line, idx + 1, &delimiters)?);
    }

    let category = segments
        .iter()
        .find(|s| s.name == "MSH")
        .and_then(|msh| msh.fields.get(8))
        .map(category_of)
        .filter(|c| !c.is_empty())
        .unwrap_or_else(|| UNKNOWN_CATEGORY.to_string());

    Ok(DecodedMessage { category, segments })
}

/// Read and decode one message file (invalid UTF-8 is replaced, not fatal)
pub fn decode_file<P: AsRef<Path>>(path: P) -> Result<DecodedMessage> {
    let bytes = fs::read(path)?;
    decode_message(&String::from_utf8_lossy(&bytes))
}

fn decode_segment(line: &str, line_no: usize, delimiters: &Delimiters) -> Result<DecodedSegment> {
    let mut parts = line.split(delimiters.field);
    let name = parts.next().unwrap_or_default().trim().to_string();
    if !is_valid_segment_name(&name) {
        return Err(DecodeError::InvalidSegmentName {
            line: line_no,
            name,
        });
    }

    let mut segment = DecodedSegment::new(name, Vec::new());

    if segment.name == "MSH" {
        // MSH-1 is the separator itself and MSH-2 the raw encoding characters
        segment.fields.push(FieldValue::Scalar(delimiters.field.to_string()));
        if let Some(encoding) = parts.next() {
            segment.fields.push(FieldValue::Scalar(encoding.to_string()));
        }
    }

    for raw in parts {
        let position = segment.fields.len() + 1;
        let (value, repeating) = decode_field(raw, delimiters);
        if repeating {
            segment.repeating_field_paths.insert(position.to_string());
        }
        segment.fields.push(value);
    }

    Ok(segment)
}

/// Split a field into repetitions/components/subcomponents, collapsing single-element levels
fn decode_field(raw: &str, delimiters: &Delimiters) -> (FieldValue, bool) {
    let mut repetitions: Vec<FieldValue> = raw
        .split(delimiters.repetition)
        .map(|rep| {
            let mut components: Vec<FieldValue> = rep
                .split(delimiters.component)
                .map(|comp| {
                    let subs: Vec<&str> = comp.split(delimiters.subcomponent).collect();
                    if subs.len() > 1 {
                        FieldValue::components(subs)
                    } else {
                        FieldValue::scalar(comp)
                    }
                })
                .collect();
            if components.len() > 1 {
                FieldValue::Components(components)
            } else {
                components.pop().unwrap_or_else(|| FieldValue::scalar(""))
            }
        })
        .collect();

    if repetitions.len() > 1 {
        (FieldValue::Repetitions(repetitions), true)
    } else {
        let value = repetitions.pop().unwrap_or_else(|| FieldValue::scalar(""));
        (value, false)
    }
}

fn is_valid_segment_name(name: &str) -> bool {
    name.len() == 3
        && name
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
}

/// Render MSH-9 as a category string
fn category_of(value: &FieldValue) -> String {
    match value {
        FieldValue::Scalar(text) => text.trim().to_string(),
        FieldValue::Components(items) | FieldValue::Repetitions(items) => items
            .iter()
            .map(category_of)
            .collect::<Vec<_>>()
            .join("^"),
    }
}
