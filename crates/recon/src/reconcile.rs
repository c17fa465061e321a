use std::fmt;

use serde::Serialize;

use crate::compare::FieldComparator;
use crate::mapping::FieldMapping;
use crate::matcher::{key_set, rows_missing_from, KeyIndex};
use crate::resolve::resolve_index;
use crate::table::Table;

// ---------------------------------------------------------------------------
// Mismatch records
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "fields", rename_all = "snake_case")]
pub enum MismatchReason {
    /// No counterpart row shares the key.
    KeyNotFound,
    /// No counterpart group exists for the key.
    KeyNotFoundInGroup,
    /// Fields that differed on the first candidate scanned, in mapping order.
    Fields(Vec<String>),
    /// Candidates existed but none produced a field list.
    Unspecified,
}

impl MismatchReason {
    pub fn is_missing_key(&self) -> bool {
        matches!(self, Self::KeyNotFound | Self::KeyNotFoundInGroup)
    }
}

impl fmt::Display for MismatchReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::KeyNotFound => write!(f, "key not found in counterpart"),
            Self::KeyNotFoundInGroup => write!(f, "key not found in counterpart group"),
            Self::Fields(fields) => write!(f, "{}", fields.join(", ")),
            Self::Unspecified => write!(f, "Mismatch"),
        }
    }
}

/// A primary row that failed reconciliation. `row` indexes the primary
/// table the record was produced from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MismatchRecord {
    pub row: usize,
    pub key: String,
    pub reason: MismatchReason,
}

// ---------------------------------------------------------------------------
// Field-mapping reconciliation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct MappingOutcome {
    pub mismatches: Vec<MismatchRecord>,
    /// Secondary rows whose key never appears in the primary table.
    pub secondary_only: Table,
}

/// A mapped field resolved to column positions on both sides.
#[derive(Debug)]
pub(crate) struct ResolvedField<'m> {
    pub name: &'m str,
    pub primary: usize,
    pub secondary: usize,
}

/// Reconcile every primary row against the secondary rows sharing its key.
///
/// A row passes when at least one candidate has no differing mapped field.
/// Otherwise it is reported with the differing fields of the first
/// candidate scanned, even if a later candidate differed in fewer fields.
/// Primary rows with an empty key are ignored.
pub fn reconcile(
    primary: &Table,
    secondary: &Table,
    primary_key: usize,
    secondary_key: usize,
    mapping: &FieldMapping,
) -> MappingOutcome {
    let fields = resolve_mapping(primary, secondary, mapping);
    let index = KeyIndex::build(secondary, secondary_key);

    let mut mismatches = Vec::new();
    for row in 0..primary.len() {
        let key = primary.key(row, primary_key);
        if key.is_empty() {
            continue;
        }
        let reason = if index.contains(key) {
            scan_candidates(primary, row, secondary, index.rows(key), &fields, FieldComparator::LENIENT)
        } else {
            Some(MismatchReason::KeyNotFound)
        };
        if let Some(reason) = reason {
            mismatches.push(MismatchRecord {
                row,
                key: key.to_string(),
                reason,
            });
        }
    }

    let primary_keys = key_set(primary, primary_key);
    let secondary_only = rows_missing_from(secondary, secondary_key, &primary_keys);

    tracing::debug!(
        primary_rows = primary.len(),
        secondary_rows = secondary.len(),
        mismatches = mismatches.len(),
        secondary_only = secondary_only.len(),
        "field-mapping reconciliation done"
    );

    MappingOutcome {
        mismatches,
        secondary_only,
    }
}

/// Resolve mapping pairs once. Pairs missing on either side are dropped.
pub(crate) fn resolve_mapping<'m>(
    primary: &Table,
    secondary: &Table,
    mapping: &'m FieldMapping,
) -> Vec<ResolvedField<'m>> {
    mapping
        .pairs()
        .iter()
        .filter_map(|pair| {
            match (resolve_index(primary, &pair.from), resolve_index(secondary, &pair.to)) {
                (Some(p), Some(s)) => Some(ResolvedField {
                    name: pair.from.as_str(),
                    primary: p,
                    secondary: s,
                }),
                _ => {
                    tracing::debug!(from = %pair.from, to = %pair.to, "mapped field not present on both sides, skipped");
                    None
                }
            }
        })
        .collect()
}

/// Scan candidate rows in order. `None` means an exact match was found.
pub(crate) fn scan_candidates(
    primary: &Table,
    row: usize,
    secondary: &Table,
    candidates: &[usize],
    fields: &[ResolvedField<'_>],
    comparator: FieldComparator,
) -> Option<MismatchReason> {
    let mut first: Option<Vec<String>> = None;

    for &candidate in candidates {
        let differing: Vec<String> = fields
            .iter()
            .filter(|f| {
                comparator.differs(primary.cell(row, f.primary), secondary.cell(candidate, f.secondary))
            })
            .map(|f| f.name.to_string())
            .collect();

        if differing.is_empty() {
            return None;
        }
        if first.is_none() {
            first = Some(differing);
        }
    }

    Some(match first {
        Some(fields) if !fields.is_empty() => MismatchReason::Fields(fields),
        _ => MismatchReason::Unspecified,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::FieldPair;

    fn table(cols: &[&str], rows: &[&[&str]]) -> Table {
        Table::new(
            cols.iter().map(|c| c.to_string()).collect(),
            rows.iter()
                .map(|r| r.iter().map(|c| c.to_string()).collect())
                .collect(),
        )
        .unwrap()
    }

    fn mapping(pairs: &[(&str, &str)]) -> FieldMapping {
        FieldMapping::new(
            pairs
                .iter()
                .map(|(f, t)| FieldPair {
                    from: f.to_string(),
                    to: t.to_string(),
                })
                .collect(),
        )
    }

    fn city_mapping() -> FieldMapping {
        mapping(&[("Customer", "CUSTOMER_NATURAL_ID"), ("City", "CUSTOMER_CITY_NAME")])
    }

    #[test]
    fn exact_match_reports_nothing() {
        let p = table(&["Customer", "City"], &[&["A1", "X"]]);
        let s = table(&["CUSTOMER_NATURAL_ID", "CUSTOMER_CITY_NAME"], &[&["A1", "X"]]);
        let out = reconcile(&p, &s, 0, 0, &city_mapping());
        assert!(out.mismatches.is_empty());
        assert!(out.secondary_only.is_empty());
    }

    #[test]
    fn differing_field_named() {
        let p = table(&["Customer", "City"], &[&["A1", "X"]]);
        let s = table(&["CUSTOMER_NATURAL_ID", "CUSTOMER_CITY_NAME"], &[&["A1", "Y"]]);
        let out = reconcile(&p, &s, 0, 0, &city_mapping());
        assert_eq!(out.mismatches.len(), 1);
        assert_eq!(out.mismatches[0].key, "A1");
        assert_eq!(out.mismatches[0].reason.to_string(), "City");
    }

    #[test]
    fn missing_key_reported() {
        let p = table(&["Customer", "City"], &[&["A2", "X"]]);
        let s = table(&["CUSTOMER_NATURAL_ID", "CUSTOMER_CITY_NAME"], &[&["A1", "X"]]);
        let out = reconcile(&p, &s, 0, 0, &city_mapping());
        assert_eq!(out.mismatches[0].reason, MismatchReason::KeyNotFound);
        assert_eq!(out.mismatches[0].reason.to_string(), "key not found in counterpart");
        assert_eq!(out.secondary_only.len(), 1);
        assert_eq!(out.secondary_only.key(0, 0), "A1");
    }

    #[test]
    fn any_exact_candidate_wins() {
        let p = table(&["Customer", "City"], &[&["A1", "X"]]);
        let s = table(
            &["CUSTOMER_NATURAL_ID", "CUSTOMER_CITY_NAME"],
            &[&["A1", "Y"], &["A1", "X"]],
        );
        assert!(reconcile(&p, &s, 0, 0, &city_mapping()).mismatches.is_empty());
    }

    #[test]
    fn first_candidate_reason_kept_even_if_later_is_closer() {
        let p = table(&["Customer", "City", "Name"], &[&["A1", "X", "N"]]);
        let s = table(
            &["CUSTOMER_NATURAL_ID", "CUSTOMER_CITY_NAME", "CUSTOMER_NAME"],
            &[&["A1", "Y", "M"], &["A1", "X", "M"]],
        );
        let m = mapping(&[
            ("Customer", "CUSTOMER_NATURAL_ID"),
            ("City", "CUSTOMER_CITY_NAME"),
            ("Name", "CUSTOMER_NAME"),
        ]);
        let out = reconcile(&p, &s, 0, 0, &m);
        assert_eq!(out.mismatches[0].reason.to_string(), "City, Name");
    }

    #[test]
    fn reason_follows_mapping_order() {
        let p = table(&["Name", "Customer", "City"], &[&["N", "A1", "X"]]);
        let s = table(
            &["CUSTOMER_CITY_NAME", "CUSTOMER_NAME", "CUSTOMER_NATURAL_ID"],
            &[&["Y", "M", "A1"]],
        );
        let m = mapping(&[
            ("Customer", "CUSTOMER_NATURAL_ID"),
            ("City", "CUSTOMER_CITY_NAME"),
            ("Name", "CUSTOMER_NAME"),
        ]);
        let out = reconcile(&p, &s, 1, 2, &m);
        assert_eq!(out.mismatches[0].reason, MismatchReason::Fields(vec!["City".into(), "Name".into()]));
    }

    #[test]
    fn numeric_and_placeholder_rules() {
        let p = table(&["Customer", "Division", "City"], &[&["A1", "10", "not found"]]);
        let s = table(
            &["CUSTOMER_NATURAL_ID", "CUSTOMER_DIVISION_CODE", "CUSTOMER_CITY_NAME"],
            &[&["A1", "10.0", "Paris"]],
        );
        let m = mapping(&[
            ("Division", "CUSTOMER_DIVISION_CODE"),
            ("City", "CUSTOMER_CITY_NAME"),
        ]);
        assert!(reconcile(&p, &s, 0, 0, &m).mismatches.is_empty());
    }

    #[test]
    fn unmapped_columns_are_skipped() {
        let p = table(&["Customer"], &[&["A1"]]);
        let s = table(&["CUSTOMER_NATURAL_ID", "CUSTOMER_CITY_NAME"], &[&["A1", "Y"]]);
        assert!(reconcile(&p, &s, 0, 0, &city_mapping()).mismatches.is_empty());
    }

    #[test]
    fn empty_primary_keys_ignored() {
        let p = table(&["Customer", "City"], &[&["", "X"], &["A1", "X"]]);
        let s = table(&["CUSTOMER_NATURAL_ID", "CUSTOMER_CITY_NAME"], &[&["A1", "X"], &["", "Q"]]);
        let out = reconcile(&p, &s, 0, 0, &city_mapping());
        assert!(out.mismatches.is_empty());
        assert!(out.secondary_only.is_empty());
    }

    #[test]
    fn record_points_at_primary_row() {
        let p = table(&["Customer", "City"], &[&["A1", "X"], &["A9", "X"]]);
        let s = table(&["CUSTOMER_NATURAL_ID", "CUSTOMER_CITY_NAME"], &[&["A1", "X"]]);
        let out = reconcile(&p, &s, 0, 0, &city_mapping());
        assert_eq!(out.mismatches[0].row, 1);
    }

    #[test]
    fn no_fields_resolved_yields_unspecified_only_without_candidates() {
        let p = table(&["Customer"], &[&["A1"]]);
        let s = table(&["CUSTOMER_NATURAL_ID"], &[&["A1"]]);
        let reason = scan_candidates(&p, 0, &s, &[], &[], FieldComparator::LENIENT);
        assert_eq!(reason, Some(MismatchReason::Unspecified));
        assert_eq!(MismatchReason::Unspecified.to_string(), "Mismatch");
    }
}
