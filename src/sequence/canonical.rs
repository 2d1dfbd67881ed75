use crate::decoder::DecodedMessage;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Segment order of one message with consecutive same-name repeats collapsed
pub type CanonicalSequence = Vec<String>;

/// Distinct canonical sequence → occurrence count, in discovery order
pub type SequenceCounts = IndexMap<CanonicalSequence, u64>;

/// Corpus-wide facts about one segment name within a category
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentPresence {
    /// Messages containing the segment at least once
    pub present_in: u64,
    /// True if any message contained the segment more than once
    pub repeats: bool,
}

/// Canonical sequences of one category plus per-segment presence/repeat flags
#[derive(Debug, Clone, Default)]
pub struct CanonicalCorpus {
    pub sequences: Vec<CanonicalSequence>,
    pub segments: IndexMap<String, SegmentPresence>,
    pub total_messages: u64,
}

impl CanonicalCorpus {
    /// Canonicalize one message and fold its segment facts into the corpus
    pub fn add_message(&mut self, message: &DecodedMessage) {
        let mut occurrences: HashMap<&str, u32> = HashMap::new();

        for name in message.segment_names() {
            let seen = occurrences.entry(name).or_insert(0);
            *seen += 1;

            let presence = self.segments.entry(name.to_string()).or_default();
            if *seen == 1 {
                presence.present_in += 1;
            } else {
                presence.repeats = true;
            }
        }

        self.sequences.push(canonicalize(message.segment_names()));
        self.total_messages += 1;
    }

    /// True when the segment is absent from at least one message
    pub fn is_optional(&self, name: &str) -> bool {
        let present_in = self.segments.get(name).map_or(0, |p| p.present_in);
        present_in < self.total_messages
    }

    /// True when the segment repeated in at least one message
    pub fn repeats(&self, name: &str) -> bool {
        self.segments.get(name).is_some_and(|p| p.repeats)
    }

    /// Occurrences of each distinct canonical sequence
    pub fn counts(&self) -> SequenceCounts {
        count_sequences(&self.sequences)
    }
}

/// Collapse immediately repeated segment names into a single token
///
/// # Example
/// ```
/// use hl7_profile::sequence::canonicalize;
///
/// let seq = canonicalize(["MSH", "PID", "OBX", "OBX", "NTE", "OBX"]);
/// assert_eq!(seq, vec!["MSH", "PID", "OBX", "NTE", "OBX"]);
/// ```
pub fn canonicalize<'a, I>(names: I) -> CanonicalSequence
where
    I: IntoIterator<Item = &'a str>,
{
    let mut sequence: CanonicalSequence = Vec::new();
    for name in names {
        if sequence.last().map(String::as_str) != Some(name) {
            sequence.push(name.to_string());
        }
    }
    sequence
}

/// Count identical canonical sequences, keeping first-discovery order
pub fn count_sequences(sequences: &[CanonicalSequence]) -> SequenceCounts {
    let mut counts = SequenceCounts::new();
    for sequence in sequences {
        *counts.entry(sequence.clone()).or_insert(0) += 1;
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::DecodedSegment;

    fn msg(names: &[&str]) -> DecodedMessage {
        DecodedMessage::new(
            "ORU^R01",
            names.iter().map(|n| DecodedSegment::new(*n, vec![])).collect(),
        )
    }

    #[test]
    fn test_canonicalize_collapses_consecutive_only() {
        let seq = canonicalize(["MSH", "OBX", "OBX", "OBX", "NTE", "OBX"]);
        assert_eq!(seq, vec!["MSH", "OBX", "NTE", "OBX"]);
    }

    #[test]
    fn test_canonicalize_empty() {
        assert!(canonicalize(Vec::<&str>::new()).is_empty());
    }

    #[test]
    fn test_presence_counted_once_per_message() {
        let mut corpus = CanonicalCorpus::default();
        corpus.add_message(&msg(&["MSH", "OBX", "OBX"]));
        corpus.add_message(&msg(&["MSH", "PID"]));

        assert_eq!(corpus.segments["OBX"].present_in, 1);
        assert!(corpus.segments["OBX"].repeats);
        assert_eq!(corpus.segments["MSH"].present_in, 2);
        assert!(!corpus.segments["MSH"].repeats);
        assert_eq!(corpus.total_messages, 2);
    }

    #[test]
    fn test_non_consecutive_repeat_sets_flag() {
        let mut corpus = CanonicalCorpus::default();
        corpus.add_message(&msg(&["MSH", "NTE", "PID", "NTE"]));
        assert!(corpus.repeats("NTE"));
        assert!(!corpus.repeats("PID"));
        assert_eq!(corpus.sequences[0], vec!["MSH", "NTE", "PID", "NTE"]);
    }

    #[test]
    fn test_optional_by_presence() {
        let mut corpus = CanonicalCorpus::default();
        corpus.add_message(&msg(&["MSH", "PID", "OBX"]));
        corpus.add_message(&msg(&["MSH", "PID"]));
        assert!(!corpus.is_optional("MSH"));
        assert!(corpus.is_optional("OBX"));
        assert!(corpus.is_optional("ZZZ"));
    }

    #[test]
    fn test_counts_keep_discovery_order() {
        let mut corpus = CanonicalCorpus::default();
        corpus.add_message(&msg(&["MSH", "PID"]));
        corpus.add_message(&msg(&["MSH", "EVN"]));
        corpus.add_message(&msg(&["MSH", "PID"]));

        let counts: Vec<_> = corpus.counts().into_iter().collect();
        assert_eq!(counts[0], (vec!["MSH".to_string(), "PID".to_string()], 2));
        assert_eq!(counts[1], (vec!["MSH".to_string(), "EVN".to_string()], 1));
    }
}
