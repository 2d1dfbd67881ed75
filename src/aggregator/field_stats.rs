use indexmap::IndexMap;

/// Default ceiling on distinct values tracked per field
pub const MAX_UNIQUE: usize = 100;

/// Single key reported once a field has overflowed its cap
pub const OVERFLOW_SENTINEL: &str = "__TOO_MANY__";

/// Bounded multiset of canonical values
///
/// `Collecting` keeps first-seen order, which later drives type inference.
/// `Overflowed` is terminal: prior counts are discarded and never restored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueCounts {
    Collecting(IndexMap<String, u64>),
    Overflowed,
}

impl Default for ValueCounts {
    fn default() -> Self {
        ValueCounts::Collecting(IndexMap::new())
    }
}

/// Outcome of offering a value to a [`FieldStats`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOutcome {
    /// Count incremented (new or existing key)
    Counted,
    /// This value would have been the first distinct key past the cap
    Overflowed,
    /// Field was already overflowed; nothing changed
    Ignored,
}

/// Statistics for one (category, segment, field-path)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldStats {
    counts: ValueCounts,
    /// Messages in which the field had at least one non-empty value
    presence: u64,
    cap: usize,
}

impl Default for FieldStats {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldStats {
    pub fn new() -> Self {
        Self::with_cap(MAX_UNIQUE)
    }

    /// Stats with a custom distinct-value ceiling (at least 1)
    pub fn with_cap(cap: usize) -> Self {
        Self {
            counts: ValueCounts::default(),
            presence: 0,
            cap: cap.max(1),
        }
    }

    pub fn is_overflowed(&self) -> bool {
        matches!(self.counts, ValueCounts::Overflowed)
    }

    /// Count one occurrence of a canonical value
    pub fn record(&mut self, value: &str) -> RecordOutcome {
        let ValueCounts::Collecting(counts) = &mut self.counts else {
            return RecordOutcome::Ignored;
        };

        if let Some(count) = counts.get_mut(value) {
            *count += 1;
            return RecordOutcome::Counted;
        }

        if counts.len() < self.cap {
            counts.insert(value.to_string(), 1);
            RecordOutcome::Counted
        } else {
            self.counts = ValueCounts::Overflowed;
            RecordOutcome::Overflowed
        }
    }

    /// Count this field as present in one more message
    pub fn mark_present(&mut self) {
        self.presence += 1;
    }

    pub fn presence_count(&self) -> u64 {
        self.presence
    }

    /// Value/count pairs in first-seen order; the sentinel with count 1 once overflowed
    pub fn values(&self) -> Box<dyn Iterator<Item = (&str, u64)> + '_> {
        match &self.counts {
            ValueCounts::Collecting(counts) => {
                Box::new(counts.iter().map(|(value, count)| (value.as_str(), *count)))
            }
            ValueCounts::Overflowed => Box::new(std::iter::once((OVERFLOW_SENTINEL, 1))),
        }
    }

    /// Value keys in first-seen order
    pub fn keys(&self) -> impl Iterator<Item = &str> + '_ {
        self.values().map(|(value, _)| value)
    }

    /// Count recorded for one value
    pub fn count_of(&self, value: &str) -> u64 {
        match &self.counts {
            ValueCounts::Collecting(counts) => counts.get(value).copied().unwrap_or(0),
            ValueCounts::Overflowed => u64::from(value == OVERFLOW_SENTINEL),
        }
    }

    /// Number of distinct keys currently stored (1 once overflowed)
    pub fn distinct_count(&self) -> usize {
        match &self.counts {
            ValueCounts::Collecting(counts) => counts.len(),
            ValueCounts::Overflowed => 1,
        }
    }

    /// Sum of all stored counts
    pub fn total_count(&self) -> u64 {
        self.values().map(|(_, count)| count).sum()
    }

    /// True when at least one retained, non-sentinel value is non-blank
    pub fn has_content(&self) -> bool {
        self.keys()
            .any(|value| value != OVERFLOW_SENTINEL && !value.trim().is_empty())
    }

    /// Raw state access
    pub fn counts(&self) -> &ValueCounts {
        &self.counts
    }
}
