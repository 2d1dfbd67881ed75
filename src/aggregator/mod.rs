// Field-level statistics aggregation
//
// Streams decoded messages into a bounded-cardinality statistics tree keyed by
// (category, segment, field-path). Composite datatypes are decomposed into
// per-component paths ("5.1", "5.2"), person/practitioner identifiers are kept
// as one opaque string, and a post-pass folds degenerate single-component
// fields back into their base path.
//
// Memory is bounded per field: after MAX_UNIQUE distinct values the field
// switches to an overflow sentinel and stops collecting.

mod consolidate;
mod field_stats;

pub use consolidate::{consolidate_single_components, CONSOLIDATION_EXCLUDED_TYPES};
pub use field_stats::{FieldStats, RecordOutcome, ValueCounts, MAX_UNIQUE, OVERFLOW_SENTINEL};

use crate::decoder::{DecodedMessage, DecodedSegment};
use crate::field_value::{collapse, normalize, FieldValue};
use crate::vocabulary::Vocabulary;
use indexmap::IndexMap;
use std::collections::{BTreeSet, HashSet};
use tracing::{debug, info};

/// Identifier types rendered as a single opaque string when not repeating
pub const COLLAPSED_TYPES: &[&str] = &["XCN", "PPN"];

/// field-path → stats
pub type SegmentFields = IndexMap<String, FieldStats>;
/// segment → field-path → stats
pub type CategoryFields = IndexMap<String, SegmentFields>;

/// Completed statistics for one corpus
#[derive(Debug, Clone, Default)]
pub struct AggregationResult {
    /// category → segment → field-path → stats (only fields with real content)
    pub fields: IndexMap<String, CategoryFields>,
    /// category → segment → field positions seen repeating
    pub repeats: IndexMap<String, IndexMap<String, BTreeSet<String>>>,
    /// category → message count
    pub totals_by_category: IndexMap<String, u64>,
    /// All messages aggregated
    pub total_messages: u64,
}

impl AggregationResult {
    pub fn field(&self, category: &str, segment: &str, path: &str) -> Option<&FieldStats> {
        self.fields.get(category)?.get(segment)?.get(path)
    }

    /// Messages in which the field was present (0 when absent from the tree)
    pub fn presence(&self, category: &str, segment: &str, path: &str) -> u64 {
        self.field(category, segment, path)
            .map(FieldStats::presence_count)
            .unwrap_or(0)
    }

    /// Message count for a category (0 when unknown)
    pub fn category_total(&self, category: &str) -> u64 {
        self.totals_by_category.get(category).copied().unwrap_or(0)
    }

    /// Repeating field positions for a segment in a category
    pub fn repeating_fields(&self, category: &str, segment: &str) -> Option<&BTreeSet<String>> {
        self.repeats.get(category)?.get(segment)
    }

    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.totals_by_category.keys().map(String::as_str)
    }
}

/// Per-message scratch state: which (segment, path) pairs already counted presence
struct MessageScope<'m> {
    category: &'m str,
    seen: HashSet<(String, String)>,
}

impl<'m> MessageScope<'m> {
    fn new(category: &'m str) -> Self {
        Self {
            category,
            seen: HashSet::new(),
        }
    }

    /// True the first time a (segment, path) is touched in this message
    fn first_touch(&mut self, segment: &str, path: &str) -> bool {
        self.seen.insert((segment.to_string(), path.to_string()))
    }
}

/// Streaming field statistics aggregator
///
/// # Example
/// ```
/// use hl7_profile::aggregator::FieldAggregator;
/// use hl7_profile::decoder::decode_message;
/// use hl7_profile::vocabulary::Vocabulary;
///
/// let vocab = Vocabulary::default_hl7()?;
/// let msg = decode_message("MSH|^~\\&|A|B|||||ADT^A01|1\rPID|1||||Doe^Jane")?;
///
/// let mut aggregator = FieldAggregator::new(&vocab);
/// aggregator.add_message(&msg);
/// let result = aggregator.finish();
///
/// assert_eq!(result.presence("ADT^A01", "PID", "5.1"), 1);
/// # Ok::<(), anyhow::Error>(())
/// ```
#[derive(Debug)]
pub struct FieldAggregator<'v> {
    vocabulary: &'v Vocabulary,
    max_unique: usize,
    fields: IndexMap<String, CategoryFields>,
    repeats: IndexMap<String, IndexMap<String, BTreeSet<String>>>,
    totals: IndexMap<String, u64>,
    messages: u64,
}

impl<'v> FieldAggregator<'v> {
    pub fn new(vocabulary: &'v Vocabulary) -> Self {
        Self::with_max_unique(vocabulary, MAX_UNIQUE)
    }

    /// Aggregator with a custom distinct-value cap per field
    pub fn with_max_unique(vocabulary: &'v Vocabulary, max_unique: usize) -> Self {
        Self {
            vocabulary,
            max_unique,
            fields: IndexMap::new(),
            repeats: IndexMap::new(),
            totals: IndexMap::new(),
            messages: 0,
        }
    }

    /// Messages added so far
    pub fn message_count(&self) -> u64 {
        self.messages
    }

    /// Fold one decoded message into the statistics
    pub fn add_message(&mut self, message: &DecodedMessage) {
        let mut scope = MessageScope::new(&message.category);
        *self.totals.entry(message.category.clone()).or_insert(0) += 1;
        self.messages += 1;

        for segment in &message.segments {
            for (index, value) in segment.fields.iter().enumerate() {
                self.process_field(&mut scope, segment, index + 1, value);
            }
        }
    }

    fn process_field(
        &mut self,
        scope: &mut MessageScope<'_>,
        segment: &DecodedSegment,
        position: usize,
        value: &FieldValue,
    ) {
        let base = position.to_string();
        let listed = segment.is_repeating(&base);
        if listed {
            self.repeats
                .entry(scope.category.to_string())
                .or_default()
                .entry(segment.name.clone())
                .or_default()
                .insert(base.clone());
        }
        let repeating = listed || matches!(value, FieldValue::Repetitions(_));

        let vocabulary = self.vocabulary;
        let datatype = vocabulary.datatype_of(&segment.name, &base);

        if COLLAPSED_TYPES.contains(&datatype) && !repeating {
            self.record_value(scope, &segment.name, &base, collapse(value));
            return;
        }

        let composite = vocabulary.is_composite(datatype);
        let repetitions: Vec<&FieldValue> = match value {
            FieldValue::Repetitions(items) => items.iter().collect(),
            other => vec![other],
        };

        for repetition in repetitions {
            match repetition {
                FieldValue::Components(items) | FieldValue::Repetitions(items) if composite => {
                    for (i, component) in items.iter().enumerate() {
                        if component.is_empty() {
                            continue;
                        }
                        let path = format!("{base}.{}", i + 1);
                        self.record_value(scope, &segment.name, &path, normalize(component));
                    }
                }
                FieldValue::Scalar(_) if composite => {
                    if !repetition.is_empty() {
                        let path = format!("{base}.1");
                        self.record_value(scope, &segment.name, &path, normalize(repetition));
                    }
                }
                _ => self.record_value(scope, &segment.name, &base, normalize(repetition)),
            }
        }
    }

    /// Record one canonical value for a field path
    ///
    /// No-op for overflowed fields and for empty values. Presence is counted
    /// at most once per message for each (segment, path).
    fn record_value(
        &mut self,
        scope: &mut MessageScope<'_>,
        segment: &str,
        path: &str,
        canonical: String,
    ) {
        let max_unique = self.max_unique;
        let stats = self
            .fields
            .entry(scope.category.to_string())
            .or_default()
            .entry(segment.to_string())
            .or_default()
            .entry(path.to_string())
            .or_insert_with(|| FieldStats::with_cap(max_unique));

        if stats.is_overflowed() || canonical.is_empty() {
            return;
        }

        if scope.first_touch(segment, path) {
            stats.mark_present();
        }

        if stats.record(&canonical) == RecordOutcome::Overflowed {
            debug!(
                category = scope.category,
                segment,
                path,
                max_unique,
                "field exceeded distinct value cap"
            );
        }
    }

    /// Drop empty fields, consolidate single-component paths, and freeze the result
    pub fn finish(self) -> AggregationResult {
        let mut fields: IndexMap<String, CategoryFields> = IndexMap::new();

        for (category, segments) in self.fields {
            let mut kept_segments = CategoryFields::new();
            for (segment, paths) in segments {
                let kept: SegmentFields = paths
                    .into_iter()
                    .filter(|(_, stats)| {
                        stats.distinct_count() > 0
                            && stats.presence_count() > 0
                            && stats.has_content()
                    })
                    .collect();
                if !kept.is_empty() {
                    kept_segments.insert(segment, kept);
                }
            }
            if !kept_segments.is_empty() {
                fields.insert(category, kept_segments);
            }
        }

        info!("Consolidating single-component fields...");
        let renamed = consolidate_single_components(&mut fields, self.vocabulary);
        debug!(renamed, "consolidation complete");

        AggregationResult {
            fields,
            repeats: self.repeats,
            totals_by_category: self.totals,
            total_messages: self.messages,
        }
    }
}

/// Aggregate a whole message collection, logging progress every 10%
pub fn aggregate(
    messages: &[DecodedMessage],
    vocabulary: &Vocabulary,
    max_unique: usize,
) -> AggregationResult {
    info!("Starting aggregation of {} messages...", messages.len());

    let mut aggregator = FieldAggregator::with_max_unique(vocabulary, max_unique);
    let log_interval = (messages.len() / 10).max(1);

    for (i, message) in messages.iter().enumerate() {
        aggregator.add_message(message);
        let processed = i + 1;
        if processed % log_interval == 0 || processed == messages.len() {
            let progress = processed as f64 / messages.len() as f64 * 100.0;
            info!(
                "Processed {}/{} messages ({:.1}%)",
                processed,
                messages.len(),
                progress
            );
        }
    }

    aggregator.finish()
}
