// Segment Sequence Profiling
//
// Describes the structural shape of each message category. Every message is
// reduced to its canonical segment order (consecutive repeats collapsed),
// identical orders are counted, and similar orders are greedily merged into a
// small set of annotated patterns:
//
//   NAME     mandatory, never repeats
//   NAME+    repeats within at least one message of the category
//   [NAME]   absent from at least one message of the category
//   [NAME+]  both
//
// Merging is a single pass in discovery order. A pattern is folded into an
// earlier one when either is an order-preserving subsequence of the other, or
// when their union differs from both. Counts of folded patterns are summed,
// so per category the pattern counts always add up to the message total.

mod canonical;
mod merge;
mod pattern;
mod profile;

pub use canonical::{
    canonicalize, count_sequences, CanonicalCorpus, CanonicalSequence, SegmentPresence,
    SequenceCounts,
};
pub use merge::{is_subsequence, merge_patterns, merge_with_optional, try_merge, union_merge};
pub use pattern::{names, percent_of, render, Pattern, PatternToken, SequencePattern};
pub use profile::{profile_by_category, profile_category, SequenceProfile};

#[cfg(test)]
mod tests;
