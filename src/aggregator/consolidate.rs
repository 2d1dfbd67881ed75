use super::{CategoryFields, FieldStats};
use crate::vocabulary::{base_field, Vocabulary};
use indexmap::IndexMap;
use tracing::debug;

/// Identifier-style composites that always keep their component paths
pub const CONSOLIDATION_EXCLUDED_TYPES: &[&str] = &["XCN", "PPN", "CX", "XAD", "XTN", "XPN"];

/// Fold `N.1`-only fields back into the bare path `N`
///
/// The decoder wraps many simple values in a single synthetic component.
/// When a field was only ever observed at component 1 across the whole
/// corpus, the `.1` suffix is an artifact and is removed. A field seen at
/// `.2` (or at the bare path) anywhere is left untouched.
///
/// Returns the number of renamed fields.
pub fn consolidate_single_components(
    fields: &mut IndexMap<String, CategoryFields>,
    vocabulary: &Vocabulary,
) -> usize {
    let mut renamed = 0;

    for (category, segments) in fields.iter_mut() {
        for (segment, paths) in segments.iter_mut() {
            let mut by_base: IndexMap<String, Vec<String>> = IndexMap::new();
            for path in paths.keys() {
                by_base
                    .entry(base_field(path).to_string())
                    .or_default()
                    .push(path.clone());
            }

            for (base, group) in by_base {
                let datatype = vocabulary.datatype_of(segment, &base);
                if CONSOLIDATION_EXCLUDED_TYPES.contains(&datatype) {
                    continue;
                }

                let [only] = group.as_slice() else {
                    continue;
                };
                if *only != format!("{base}.1") {
                    continue;
                }
                if !paths.get(only).is_some_and(has_data) {
                    continue;
                }

                if let Some((index, _, stats)) = paths.shift_remove_full(only) {
                    debug!(category = %category, segment = %segment, from = %only, to = %base, "consolidating single-component field");
                    paths.shift_insert(index, base, stats);
                    renamed += 1;
                }
            }
        }
    }

    renamed
}

fn has_data(stats: &FieldStats) -> bool {
    stats.presence_count() > 0 && stats.has_content()
}
