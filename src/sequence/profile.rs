use super::canonical::{CanonicalCorpus, SegmentPresence};
use super::merge::merge_patterns;
use super::pattern::{Pattern, PatternToken, SequencePattern};
use crate::decoder::DecodedMessage;
use indexmap::IndexMap;
use serde::Serialize;
use tracing::debug;

/// Structural profile of one message category
#[derive(Debug, Clone, Default, Serialize)]
pub struct SequenceProfile {
    /// Merged patterns, most frequent first
    pub common_sequences: Vec<SequencePattern>,
    /// Per-segment presence and repeat flags
    pub segments: IndexMap<String, SegmentPresence>,
    pub total_messages: u64,
}

impl SequenceProfile {
    /// Sum of all pattern counts (equals `total_messages`)
    pub fn pattern_total(&self) -> u64 {
        self.common_sequences.iter().map(|p| p.count).sum()
    }

    /// Most frequent `k` patterns
    pub fn top(&self, k: usize) -> &[SequencePattern] {
        &self.common_sequences[..k.min(self.common_sequences.len())]
    }
}

/// Profile the segment ordering of one category's messages
pub fn profile_category<'a, I>(messages: I) -> SequenceProfile
where
    I: IntoIterator<Item = &'a DecodedMessage>,
{
    let mut corpus = CanonicalCorpus::default();
    for message in messages {
        corpus.add_message(message);
    }

    let annotated: Vec<(Pattern, u64)> = corpus
        .counts()
        .into_iter()
        .map(|(sequence, count)| {
            let pattern = sequence
                .into_iter()
                .map(|name| {
                    let repeats = corpus.repeats(&name);
                    PatternToken::new(name).repeating(repeats)
                })
                .collect();
            (pattern, count)
        })
        .collect();
    let distinct = annotated.len();

    let merged = merge_patterns(annotated, &corpus);
    debug!(distinct, merged = merged.len(), "merged sequence patterns");

    let total = corpus.total_messages;
    let mut common_sequences: Vec<SequencePattern> = merged
        .into_iter()
        .map(|(pattern, count)| {
            let pattern = pattern
                .into_iter()
                .map(|token| {
                    if corpus.is_optional(&token.name) {
                        token.bracketed()
                    } else {
                        token
                    }
                })
                .collect();
            SequencePattern::new(pattern, count, total)
        })
        .collect();
    common_sequences.sort_by(|a, b| b.count.cmp(&a.count));

    SequenceProfile {
        common_sequences,
        segments: corpus.segments,
        total_messages: total,
    }
}

/// Group messages by category (first-seen order) and profile each group
pub fn profile_by_category(messages: &[DecodedMessage]) -> IndexMap<String, SequenceProfile> {
    let mut grouped: IndexMap<&str, Vec<&DecodedMessage>> = IndexMap::new();
    for message in messages {
        grouped.entry(message.category.as_str()).or_default().push(message);
    }

    grouped
        .into_iter()
        .map(|(category, group)| (category.to_string(), profile_category(group)))
        .collect()
}
