use super::canonical::CanonicalCorpus;
use super::pattern::{names, Pattern, PatternToken};
use indexmap::IndexMap;
use std::collections::HashSet;

/// True if `shorter` is strictly shorter than `longer` and its segment names
/// occur in `longer` in the same relative order
pub fn is_subsequence(shorter: &[PatternToken], longer: &[PatternToken]) -> bool {
    if shorter.len() >= longer.len() {
        return false;
    }

    let mut matched = 0;
    for token in longer {
        if matched < shorter.len() && shorter[matched].name == token.name {
            matched += 1;
        }
    }
    matched == shorter.len()
}

/// Bracket a token if the segment is absent from some messages of the category
fn mark_if_optional(token: &PatternToken, corpus: &CanonicalCorpus) -> PatternToken {
    if corpus.is_optional(&token.name) {
        token.bracketed()
    } else {
        token.clone()
    }
}

/// Take `longer` as the base and bracket segments the shorter pattern lacks
pub fn merge_with_optional(
    longer: &[PatternToken],
    shorter: &[PatternToken],
    corpus: &CanonicalCorpus,
) -> Pattern {
    let shared: HashSet<&str> = names(shorter).into_iter().collect();

    longer
        .iter()
        .map(|token| {
            if shared.contains(token.name.as_str()) {
                token.clone()
            } else {
                mark_if_optional(token, corpus)
            }
        })
        .collect()
}

/// Union of two patterns: `first`'s distinct names in order, then names only
/// `second` has appended at the tail. Names found in just one input are
/// bracketed when the corpus says they are optional.
pub fn union_merge(first: &[PatternToken], second: &[PatternToken], corpus: &CanonicalCorpus) -> Pattern {
    let in_first: HashSet<&str> = names(first).into_iter().collect();
    let in_second: HashSet<&str> = names(second).into_iter().collect();

    let mut seen: HashSet<&str> = HashSet::new();
    let mut merged = Pattern::new();
    for token in first.iter().chain(second) {
        if !seen.insert(token.name.as_str()) {
            continue;
        }
        let name = token.name.as_str();
        if in_first.contains(name) && in_second.contains(name) {
            merged.push(token.clone());
        } else {
            merged.push(mark_if_optional(token, corpus));
        }
    }
    merged
}

/// Merge two patterns, or `None` when they are identical or the union adds nothing
pub fn try_merge(
    first: &[PatternToken],
    second: &[PatternToken],
    corpus: &CanonicalCorpus,
) -> Option<Pattern> {
    if first == second {
        return None;
    }
    if is_subsequence(first, second) {
        return Some(merge_with_optional(second, first, corpus));
    }
    if is_subsequence(second, first) {
        return Some(merge_with_optional(first, second, corpus));
    }

    let merged = union_merge(first, second, corpus);
    (merged != first && merged != second).then_some(merged)
}

/// Fold an accepted candidate into the running merge target
///
/// Acceptance is always decided against the base pattern; this only decides
/// the shape, so a segment contributed by an earlier candidate is not lost
/// when a later one is absorbed.
fn absorb(accumulated: Pattern, candidate: &[PatternToken], corpus: &CanonicalCorpus) -> Pattern {
    if names(&accumulated) == names(candidate) {
        return accumulated;
    }
    try_merge(&accumulated, candidate, corpus).unwrap_or(accumulated)
}

/// Single greedy pass over `(pattern, count)` pairs in discovery order
///
/// Each pattern is either a merge base or consumed by one earlier base;
/// merge results are never merged again. Results that render identically
/// have their counts summed so the total count is conserved.
pub fn merge_patterns(patterns: Vec<(Pattern, u64)>, corpus: &CanonicalCorpus) -> Vec<(Pattern, u64)> {
    let mut consumed = vec![false; patterns.len()];
    let mut merged: IndexMap<Pattern, u64> = IndexMap::new();

    for i in 0..patterns.len() {
        if consumed[i] {
            continue;
        }
        consumed[i] = true;

        let (base, base_count) = &patterns[i];
        let mut shape = base.clone();
        let mut count = *base_count;

        for j in (i + 1)..patterns.len() {
            if consumed[j] {
                continue;
            }
            let (candidate, candidate_count) = &patterns[j];
            if try_merge(base, candidate, corpus).is_some() {
                shape = absorb(shape, candidate, corpus);
                count += candidate_count;
                consumed[j] = true;
            }
        }

        *merged.entry(shape).or_insert(0) += count;
    }

    merged.into_iter().collect()
}
