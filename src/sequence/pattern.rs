use serde::{Serialize, Serializer};
use std::fmt;

/// One position in a structural pattern
///
/// Renders as `NAME`, `NAME+` (segment repeats somewhere in the category),
/// `[NAME]` (segment missing from some messages) or `[NAME+]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PatternToken {
    pub name: String,
    pub repeats: bool,
    pub optional: bool,
}

impl PatternToken {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            repeats: false,
            optional: false,
        }
    }

    pub fn repeating(mut self, repeats: bool) -> Self {
        self.repeats = repeats;
        self
    }

    /// Copy of this token with the optional bracket applied
    pub fn bracketed(&self) -> Self {
        Self {
            optional: true,
            ..self.clone()
        }
    }

    /// Parse a rendered token (`"[OBX+]"`, `"PID"`, ...)
    pub fn parse(text: &str) -> Self {
        let (inner, optional) = match text.strip_prefix('[').and_then(|t| t.strip_suffix(']')) {
            Some(inner) => (inner, true),
            None => (text, false),
        };
        let (name, repeats) = match inner.strip_suffix('+') {
            Some(name) => (name, true),
            None => (inner, false),
        };
        Self {
            name: name.to_string(),
            repeats,
            optional,
        }
    }
}

impl fmt::Display for PatternToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let plus = if self.repeats { "+" } else { "" };
        if self.optional {
            write!(f, "[{}{}]", self.name, plus)
        } else {
            write!(f, "{}{}", self.name, plus)
        }
    }
}

impl Serialize for PatternToken {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Ordered token list describing a message shape
pub type Pattern = Vec<PatternToken>;

/// Segment names of a pattern, ignoring annotations
pub fn names(pattern: &[PatternToken]) -> Vec<&str> {
    pattern.iter().map(|t| t.name.as_str()).collect()
}

/// Render a pattern as `"MSH PID [OBX+]"`
pub fn render(pattern: &[PatternToken]) -> String {
    pattern
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" ")
}

/// A finished pattern with its message count and share of the category
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SequencePattern {
    pub sequence: Pattern,
    pub count: u64,
    pub percent: f64,
}

impl SequencePattern {
    pub fn new(sequence: Pattern, count: u64, total: u64) -> Self {
        Self {
            sequence,
            count,
            percent: percent_of(count, total),
        }
    }

    pub fn rendered(&self) -> String {
        render(&self.sequence)
    }
}

/// `count / total * 100` rounded to one decimal place (0.0 for an empty total)
pub fn percent_of(count: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (count as f64 / total as f64 * 1000.0).round() / 10.0
}
