use crate::compare::FieldComparator;
use crate::matcher::KeyIndex;
use crate::reconcile::{scan_candidates, MismatchReason, MismatchRecord, ResolvedField};
use crate::resolve::resolve_index;
use crate::table::Table;

/// Reconcile primary rows against key groups of the secondary table over a
/// short list of identically named fields, using exact text equality.
///
/// Same pass/fail rule as [`crate::reconcile::reconcile`]: any exact
/// candidate passes the row, otherwise the first candidate's differing
/// fields are reported. Rows with an empty key on either side are ignored.
pub fn reconcile_grouped(
    primary: &Table,
    primary_key: usize,
    secondary: &Table,
    secondary_key: usize,
    fields: &[String],
) -> Vec<MismatchRecord> {
    let resolved: Vec<ResolvedField<'_>> = fields
        .iter()
        .filter_map(|name| {
            let p = resolve_index(primary, name)?;
            let s = resolve_index(secondary, name)?;
            Some(ResolvedField {
                name: name.as_str(),
                primary: p,
                secondary: s,
            })
        })
        .collect();
    if resolved.len() < fields.len() {
        tracing::debug!(
            requested = fields.len(),
            resolved = resolved.len(),
            "some comparison fields are missing on one side"
        );
    }

    let groups = KeyIndex::build(secondary, secondary_key);

    let mut records = Vec::new();
    for row in 0..primary.len() {
        let key = primary.key(row, primary_key);
        if key.is_empty() {
            continue;
        }
        let reason = if groups.contains(key) {
            scan_candidates(primary, row, secondary, groups.rows(key), &resolved, FieldComparator::STRICT)
        } else {
            Some(MismatchReason::KeyNotFoundInGroup)
        };
        if let Some(reason) = reason {
            records.push(MismatchRecord {
                row,
                key: key.to_string(),
                reason,
            });
        }
    }

    tracing::debug!(
        primary_rows = primary.len(),
        groups = groups.len(),
        mismatches = records.len(),
        "grouped reconciliation done"
    );

    records
}
