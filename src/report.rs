//! Combined profile report
//!
//! Folds per-category field statistics into one specification per segment,
//! attaches the sequence profiles and per-category totals, and writes the
//! result as a single JSON document.

use crate::aggregator::{AggregationResult, FieldStats, OVERFLOW_SENTINEL};
use crate::infer::{infer_type, InferredType};
use crate::sequence::{percent_of, SequenceProfile};
use crate::vocabulary::Vocabulary;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::Serialize;
use std::cmp::Ordering;
use std::path::Path;
use tracing::info;

/// Datatypes whose values are never enumerated (timestamps, set ids)
pub const UNLISTED_TYPES: &[&str] = &["TS", "SI"];

/// One enumerated value of a field
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UniqueValue {
    pub value: String,
    pub count: u64,
    /// Share of the field's total count
    pub percent: f64,
}

/// Merged statistics for one field path across all categories
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldEntry {
    pub description: String,
    pub hl7_type: String,
    /// Sum of value counts
    pub count: u64,
    /// Messages in which the field was present
    pub present_in: u64,
    /// All messages in the corpus
    pub total: u64,
    #[serde(rename = "type")]
    pub inferred_type: InferredType,
    pub min_length: usize,
    pub max_length: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unique_values: Option<Vec<UniqueValue>>,
}

/// Per-segment specification
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SegmentSpec {
    pub description: String,
    #[serde(flatten)]
    pub fields: IndexMap<String, FieldEntry>,
    #[serde(rename = "_repeating_fields", skip_serializing_if = "Vec::is_empty")]
    pub repeating_fields: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportMetadata {
    pub total_messages: u64,
    pub message_types: Vec<String>,
    pub generated_at: DateTime<Utc>,
    pub report_type: String,
}

/// The full output document
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    #[serde(flatten)]
    pub segments: IndexMap<String, SegmentSpec>,
    #[serde(rename = "_sequence_profiles_by_type")]
    pub sequence_profiles: IndexMap<String, SequenceProfile>,
    #[serde(rename = "_totals_by_type")]
    pub totals_by_type: IndexMap<String, u64>,
    #[serde(rename = "_metadata")]
    pub metadata: ReportMetadata,
}

impl Report {
    pub fn segment(&self, name: &str) -> Option<&SegmentSpec> {
        self.segments.get(name)
    }

    pub fn field(&self, segment: &str, path: &str) -> Option<&FieldEntry> {
        self.segments.get(segment)?.fields.get(path)
    }
}

/// Assemble the combined report
///
/// `max_unique` is the same cap used during aggregation; a merged field with
/// more distinct values than that is not enumerated.
pub fn build_report(
    aggregation: &AggregationResult,
    sequence_profiles: IndexMap<String, SequenceProfile>,
    vocabulary: &Vocabulary,
    max_unique: usize,
) -> Report {
    let total = aggregation.total_messages;

    // segment → path → per-category stats, in first-seen order
    let mut merged: IndexMap<&str, IndexMap<&str, Vec<&FieldStats>>> = IndexMap::new();
    for segments in aggregation.fields.values() {
        for (segment, paths) in segments {
            let entry = merged.entry(segment.as_str()).or_default();
            for (path, stats) in paths {
                entry.entry(path.as_str()).or_default().push(stats);
            }
        }
    }

    let mut segments = IndexMap::new();
    for (segment, paths) in merged {
        let mut ordered: Vec<(&str, Vec<&FieldStats>)> = paths.into_iter().collect();
        ordered.sort_by(|a, b| natural_cmp(a.0, b.0));

        let fields = ordered
            .into_iter()
            .filter_map(|(path, stats)| {
                field_entry(segment, path, &stats, vocabulary, total, max_unique)
                    .map(|entry| (path.to_string(), entry))
            })
            .collect();

        segments.insert(
            segment.to_string(),
            SegmentSpec {
                description: vocabulary.segment_description(segment).to_string(),
                fields,
                repeating_fields: repeating_fields(aggregation, segment),
            },
        );
    }

    info!(
        segments = segments.len(),
        categories = aggregation.totals_by_category.len(),
        "built combined specification"
    );

    Report {
        segments,
        sequence_profiles,
        totals_by_type: aggregation.totals_by_category.clone(),
        metadata: ReportMetadata {
            total_messages: total,
            message_types: aggregation.totals_by_category.keys().cloned().collect(),
            generated_at: Utc::now(),
            report_type: "combined".to_string(),
        },
    }
}

fn field_entry(
    segment: &str,
    path: &str,
    stats: &[&FieldStats],
    vocabulary: &Vocabulary,
    total: u64,
    max_unique: usize,
) -> Option<FieldEntry> {
    let mut values: IndexMap<&str, u64> = IndexMap::new();
    let mut present_in = 0;
    for field in stats {
        present_in += field.presence_count();
        for (value, count) in field.values() {
            *values.entry(value).or_insert(0) += count;
        }
    }
    if values.is_empty() {
        return None;
    }

    let count: u64 = values.values().sum();
    let lengths = values.keys().map(|v| v.chars().count());
    let min_length = lengths.clone().min().unwrap_or(0);
    let max_length = lengths.max().unwrap_or(0);
    let hl7_type = vocabulary.datatype_of(segment, path);

    let listable = !vocabulary.is_phi(segment, path)
        && !values.contains_key(OVERFLOW_SENTINEL)
        && values.len() <= max_unique
        && !UNLISTED_TYPES.contains(&hl7_type);

    let unique_values = listable.then(|| {
        let mut listed: Vec<UniqueValue> = values
            .iter()
            .map(|(value, n)| UniqueValue {
                value: value.to_string(),
                count: *n,
                percent: percent_of(*n, count),
            })
            .collect();
        listed.sort_by(|a, b| b.count.cmp(&a.count));
        listed
    });

    Some(FieldEntry {
        description: vocabulary.description_of(segment, path),
        hl7_type: hl7_type.to_string(),
        count,
        present_in,
        total,
        inferred_type: infer_type(values.keys().copied()),
        min_length,
        max_length,
        unique_values,
    })
}

/// Union of repeating positions for a segment over all categories, numerically sorted
fn repeating_fields(aggregation: &AggregationResult, segment: &str) -> Vec<String> {
    let mut positions: Vec<String> = Vec::new();
    for by_segment in aggregation.repeats.values() {
        if let Some(found) = by_segment.get(segment) {
            for position in found {
                if !positions.contains(position) {
                    positions.push(position.clone());
                }
            }
        }
    }
    positions.sort_by(|a, b| natural_cmp(a, b));
    positions
}

/// Compare dotted field paths part by part, numerically where possible
///
/// # Example
/// ```
/// use hl7_profile::report::natural_cmp;
/// use std::cmp::Ordering;
///
/// assert_eq!(natural_cmp("2", "10"), Ordering::Less);
/// assert_eq!(natural_cmp("3.2", "3.10"), Ordering::Less);
/// ```
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let mut left = a.split('.');
    let mut right = b.split('.');
    loop {
        match (left.next(), right.next()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) => {
                let ordering = match (x.parse::<u64>(), y.parse::<u64>()) {
                    (Ok(m), Ok(n)) => m.cmp(&n),
                    (Ok(_), Err(_)) => Ordering::Less,
                    (Err(_), Ok(_)) => Ordering::Greater,
                    (Err(_), Err(_)) => x.cmp(y),
                };
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
        }
    }
}

/// Serialize the report to `path`, creating parent directories as needed
pub fn write_report<P: AsRef<Path>>(path: P, report: &Report, pretty: bool) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create output directory: {}", parent.display()))?;
    }

    let json = if pretty {
        serde_json::to_string_pretty(report)
    } else {
        serde_json::to_string(report)
    }
    .context("Failed to serialize report")?;

    std::fs::write(path, json)
        .with_context(|| format!("Failed to write report: {}", path.display()))?;

    info!(path = %path.display(), "report written");
    Ok(())
}
