// Sequence profiler tests
//
// Scenario-style checks on small hand-built categories, plus properties that
// must hold for any corpus: count conservation and consistent annotations.

use super::*;
use crate::decoder::{DecodedMessage, DecodedSegment};
use proptest::prelude::*;

fn msg(category: &str, names: &[&str]) -> DecodedMessage {
    DecodedMessage::new(
        category,
        names.iter().map(|n| DecodedSegment::new(*n, vec![])).collect(),
    )
}

fn adt(names: &[&str]) -> DecodedMessage {
    msg("ADT^A01", names)
}

fn rendered_patterns(profile: &SequenceProfile) -> Vec<Vec<String>> {
    profile
        .common_sequences
        .iter()
        .map(|p| p.sequence.iter().map(ToString::to_string).collect())
        .collect()
}

/// Identical orderings collapse to one mandatory pattern
#[test]
fn test_identical_orders_single_pattern() {
    let messages = vec![
        adt(&["MSH", "PID", "OBR"]),
        adt(&["MSH", "PID", "OBR"]),
        adt(&["MSH", "PID", "OBR"]),
    ];
    let profile = profile_category(&messages);

    assert_eq!(rendered_patterns(&profile), vec![vec!["MSH", "PID", "OBR"]]);
    assert_eq!(profile.common_sequences[0].count, 3);
    assert_eq!(profile.common_sequences[0].percent, 100.0);
    assert_eq!(profile.total_messages, 3);
}

/// A missing trailing segment becomes optional after merge
#[test]
fn test_missing_segment_marked_optional() {
    let messages = vec![adt(&["MSH", "PID", "OBX"]), adt(&["MSH", "PID"])];
    let profile = profile_category(&messages);

    assert_eq!(rendered_patterns(&profile), vec![vec!["MSH", "PID", "[OBX]"]]);
    assert_eq!(profile.common_sequences[0].count, 2);
    assert_eq!(profile.common_sequences[0].percent, 100.0);
    assert_eq!(profile.segments["OBX"].present_in, 1);
    assert_eq!(profile.segments["MSH"].present_in, 2);
}

/// A repeat anywhere in the category marks every occurrence of the segment
#[test]
fn test_repeat_flag_applies_category_wide() {
    let messages = vec![
        adt(&["MSH", "PID", "OBX", "OBX"]),
        adt(&["MSH", "PID", "OBX"]),
        adt(&["MSH", "PID"]),
    ];
    let profile = profile_category(&messages);

    assert!(profile.segments["OBX"].repeats);
    for pattern in rendered_patterns(&profile) {
        for token in pattern.iter().filter(|t| t.contains("OBX")) {
            assert_eq!(token, "[OBX+]");
        }
    }
}

#[test]
fn test_repeat_without_absence_unbracketed() {
    let messages = vec![adt(&["MSH", "OBX", "OBX"]), adt(&["MSH", "OBX"])];
    let profile = profile_category(&messages);
    assert_eq!(rendered_patterns(&profile), vec![vec!["MSH", "OBX+"]]);
}

#[test]
fn test_non_consecutive_repeat_keeps_both_positions() {
    let messages = vec![adt(&["MSH", "NTE", "PID", "NTE"])];
    let profile = profile_category(&messages);
    assert_eq!(
        rendered_patterns(&profile),
        vec![vec!["MSH", "NTE+", "PID", "NTE+"]]
    );
}

#[test]
fn test_unrelated_orders_union_merge() {
    let messages = vec![
        adt(&["MSH", "PID", "PV1"]),
        adt(&["MSH", "PID", "PV1"]),
        adt(&["MSH", "NK1", "PID"]),
    ];
    let profile = profile_category(&messages);

    assert_eq!(profile.common_sequences.len(), 1);
    assert_eq!(
        rendered_patterns(&profile)[0],
        vec!["MSH", "PID", "[PV1]", "[NK1]"]
    );
    assert_eq!(profile.common_sequences[0].count, 3);
}

#[test]
fn test_same_names_different_order_not_merged() {
    let messages = vec![
        adt(&["MSH", "PID", "EVN"]),
        adt(&["MSH", "EVN", "PID"]),
        adt(&["MSH", "EVN", "PID"]),
    ];
    let profile = profile_category(&messages);

    assert_eq!(profile.common_sequences.len(), 2);
    // Most common first
    assert_eq!(profile.common_sequences[0].count, 2);
    assert_eq!(profile.common_sequences[0].percent, 66.7);
    assert_eq!(profile.common_sequences[1].percent, 33.3);
}

#[test]
fn test_empty_category() {
    let profile = profile_category(std::iter::empty());
    assert!(profile.common_sequences.is_empty());
    assert!(profile.segments.is_empty());
    assert_eq!(profile.total_messages, 0);
    assert_eq!(profile.pattern_total(), 0);
}

#[test]
fn test_message_without_segments() {
    let messages = vec![adt(&[]), adt(&["MSH"])];
    let profile = profile_category(&messages);
    assert_eq!(profile.pattern_total(), 2);
    assert_eq!(profile.total_messages, 2);
}

#[test]
fn test_categories_profiled_independently() {
    let messages = vec![
        msg("ADT^A01", &["MSH", "PID"]),
        msg("ORU^R01", &["MSH", "OBX", "OBX"]),
        msg("ADT^A01", &["MSH", "PID"]),
    ];
    let profiles = profile_by_category(&messages);

    let keys: Vec<_> = profiles.keys().cloned().collect();
    assert_eq!(keys, vec!["ADT^A01", "ORU^R01"]);
    assert_eq!(profiles["ADT^A01"].total_messages, 2);
    assert!(!profiles["ADT^A01"].segments.contains_key("OBX"));
    assert_eq!(
        rendered_patterns(&profiles["ORU^R01"]),
        vec![vec!["MSH", "OBX+"]]
    );
}

#[test]
fn test_profile_serializes_report_shape() {
    let messages = vec![adt(&["MSH", "PID", "OBX"]), adt(&["MSH", "PID"])];
    let json = serde_json::to_value(profile_category(&messages)).unwrap();

    assert_eq!(
        json["common_sequences"][0]["sequence"],
        serde_json::json!(["MSH", "PID", "[OBX]"])
    );
    assert_eq!(json["segments"]["OBX"]["present_in"], 1);
    assert_eq!(json["segments"]["OBX"]["repeats"], false);
    assert_eq!(json["total_messages"], 2);
}

#[test]
fn test_top_clamps() {
    let messages = vec![adt(&["MSH"])];
    let profile = profile_category(&messages);
    assert_eq!(profile.top(5).len(), 1);
    assert_eq!(profile.top(0).len(), 0);
}

fn segment_name() -> impl Strategy<Value = &'static str> {
    prop::sample::select(vec!["MSH", "EVN", "PID", "PV1", "OBR", "OBX", "NTE"])
}

fn corpus_strategy() -> impl Strategy<Value = Vec<Vec<&'static str>>> {
    prop::collection::vec(prop::collection::vec(segment_name(), 0..8), 0..30)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn prop_pattern_counts_sum_to_total(corpus in corpus_strategy()) {
        let messages: Vec<_> = corpus.iter().map(|names| adt(names)).collect();
        let profile = profile_category(&messages);
        prop_assert_eq!(profile.pattern_total(), messages.len() as u64);
        prop_assert_eq!(profile.total_messages, messages.len() as u64);
    }

    #[test]
    fn prop_annotations_match_presence(corpus in corpus_strategy()) {
        let messages: Vec<_> = corpus.iter().map(|names| adt(names)).collect();
        let profile = profile_category(&messages);

        for pattern in &profile.common_sequences {
            for token in &pattern.sequence {
                let facts = profile.segments[&token.name];
                prop_assert_eq!(token.optional, facts.present_in < profile.total_messages);
                prop_assert_eq!(token.repeats, facts.repeats);
            }
        }
    }

    #[test]
    fn prop_sorted_by_count_desc(corpus in corpus_strategy()) {
        let messages: Vec<_> = corpus.iter().map(|names| adt(names)).collect();
        let profile = profile_category(&messages);
        for pair in profile.common_sequences.windows(2) {
            prop_assert!(pair[0].count >= pair[1].count);
        }
    }

    #[test]
    fn prop_presence_bounded_by_total(corpus in corpus_strategy()) {
        let messages: Vec<_> = corpus.iter().map(|names| adt(names)).collect();
        let profile = profile_category(&messages);
        for facts in profile.segments.values() {
            prop_assert!(facts.present_in >= 1);
            prop_assert!(facts.present_in <= profile.total_messages);
        }
    }
}
