// Cell comparison for reconciliation.
// Two stages: numeric when both sides parse as numbers, text otherwise.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CompareMode {
    /// Parse both sides as floats; fall back to exact text on failure.
    NumericThenText,
    /// Exact text equality only.
    TextOnly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldComparator {
    pub mode: CompareMode,
    /// Treat a pair as equal when either side is empty or "not found".
    pub skip_placeholders: bool,
}

impl FieldComparator {
    /// Used against the downstream system of record.
    pub const LENIENT: Self = Self {
        mode: CompareMode::NumericThenText,
        skip_placeholders: true,
    };

    /// Used between sales-area rows.
    pub const STRICT: Self = Self {
        mode: CompareMode::TextOnly,
        skip_placeholders: false,
    };

    /// True when the two values count as a mismatch.
    pub fn differs(&self, left: &str, right: &str) -> bool {
        let left = left.trim();
        let right = right.trim();

        if self.skip_placeholders && (is_placeholder(left) || is_placeholder(right)) {
            return false;
        }

        match self.mode {
            CompareMode::TextOnly => left != right,
            CompareMode::NumericThenText => match (parse_number(left), parse_number(right)) {
                (Some(l), Some(r)) => l != r,
                _ => left != right,
            },
        }
    }
}

/// Empty, or the literal "not found" in any case.
pub fn is_placeholder(value: &str) -> bool {
    let value = value.trim();
    value.is_empty() || value.eq_ignore_ascii_case("not found")
}

/// Plain float parse. No currency or thousands handling: codes like
/// "0010" must compare equal to "10", but "1,000" stays text.
pub fn parse_number(value: &str) -> Option<f64> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    value.parse::<f64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_equivalence() {
        let c = FieldComparator::LENIENT;
        assert!(!c.differs("10", "10.0"));
        assert!(!c.differs("0010", "10"));
        assert!(c.differs("10", "11"));
    }

    #[test]
    fn falls_back_to_text() {
        let c = FieldComparator::LENIENT;
        assert!(!c.differs("DE", "DE"));
        assert!(c.differs("DE", "de"));
        assert!(c.differs("10", "10 EUR"));
    }

    #[test]
    fn placeholders_never_mismatch() {
        let c = FieldComparator::LENIENT;
        assert!(!c.differs("", "Berlin"));
        assert!(!c.differs("Berlin", "  "));
        assert!(!c.differs("NOT FOUND", "Berlin"));
        assert!(!c.differs("x", "Not Found"));
    }

    #[test]
    fn strict_is_text_only() {
        let c = FieldComparator::STRICT;
        assert!(c.differs("10", "10.0"));
        assert!(c.differs("", "10"));
        assert!(!c.differs(" 10", "10 "));
    }

    #[test]
    fn parse_number_cases() {
        assert_eq!(parse_number("1e3"), Some(1000.0));
        assert_eq!(parse_number("-2.5"), Some(-2.5));
        assert_eq!(parse_number("1,000"), None);
        assert_eq!(parse_number(""), None);
    }
}
