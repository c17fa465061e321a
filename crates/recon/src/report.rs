use std::collections::HashSet;

use serde::Serialize;

use crate::matcher::DiffResult;
use crate::reconcile::{MappingOutcome, MismatchRecord};
use crate::table::Table;

pub const MISMATCH_REASON_COLUMN: &str = "Mismatch Reason";
pub const MISMATCHES_SHEET: &str = "Mismatches";
pub const MERGED_SHEET: &str = "Merged";

/// Spreadsheet limits on sheet names.
const MAX_SHEET_NAME: usize = 31;
const FORBIDDEN_SHEET_CHARS: &[char] = &['[', ']', ':', '*', '?', '/', '\\'];

// ---------------------------------------------------------------------------
// Sheets
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct Sheet {
    pub name: String,
    pub table: Table,
}

/// Named sheets in export order. Names are sanitized and unique.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Report {
    pub sheets: Vec<Sheet>,
}

impl Report {
    pub fn push(&mut self, name: &str, table: Table) {
        let taken: HashSet<&str> = self.sheets.iter().map(|s| s.name.as_str()).collect();
        let name = unique_sheet_name(&sanitize_sheet_name(name), &taken);
        self.sheets.push(Sheet { name, table });
    }

    pub fn sheet(&self, name: &str) -> Option<&Sheet> {
        self.sheets.iter().find(|s| s.name == name)
    }

    pub fn is_empty(&self) -> bool {
        self.sheets.is_empty()
    }
}

/// `"<a>_Not_in_<b>"`, before sanitizing.
pub fn not_in_sheet_name(a: &str, b: &str) -> String {
    format!("{a}_Not_in_{b}")
}

/// Replace characters spreadsheets reject in sheet names and cut to 31
/// characters. An empty result becomes `Sheet`.
pub fn sanitize_sheet_name(name: &str) -> String {
    let cleaned: String = name
        .trim()
        .chars()
        .map(|c| if FORBIDDEN_SHEET_CHARS.contains(&c) { '_' } else { c })
        .take(MAX_SHEET_NAME)
        .collect();
    let cleaned = cleaned.trim_matches('\'').to_string();
    if cleaned.is_empty() {
        "Sheet".to_string()
    } else {
        cleaned
    }
}

fn unique_sheet_name(name: &str, taken: &HashSet<&str>) -> String {
    let lower: HashSet<String> = taken.iter().map(|t| t.to_lowercase()).collect();
    if !lower.contains(&name.to_lowercase()) {
        return name.to_string();
    }
    (2..)
        .map(|n| {
            let suffix = format!(" ({n})");
            let room = MAX_SHEET_NAME.saturating_sub(suffix.chars().count());
            let base: String = name.chars().take(room).collect();
            format!("{base}{suffix}")
        })
        .find(|candidate| !lower.contains(&candidate.to_lowercase()))
        .unwrap_or_else(|| name.to_string())
}

// ---------------------------------------------------------------------------
// Mismatch tables
// ---------------------------------------------------------------------------

/// Copy the primary rows named by `records`, in record order, with a
/// trailing "Mismatch Reason" column.
pub fn mismatch_table(primary: &Table, records: &[MismatchRecord]) -> Table {
    let rows = primary.select_rows(records.iter().map(|r| r.row));
    let reasons = records.iter().map(|r| r.reason.to_string()).collect();
    rows.with_column(MISMATCH_REASON_COLUMN, reasons)
}

// ---------------------------------------------------------------------------
// Assembly per check kind
// ---------------------------------------------------------------------------

pub fn assemble_key_diff(left_label: &str, right_label: &str, diff: &DiffResult) -> Report {
    let mut report = Report::default();
    report.push(&not_in_sheet_name(left_label, right_label), diff.left_only.clone());
    report.push(&not_in_sheet_name(right_label, left_label), diff.right_only.clone());
    report
}

pub fn assemble_mapping(
    primary_label: &str,
    secondary_label: &str,
    primary: &Table,
    outcome: &MappingOutcome,
) -> Report {
    let mut report = Report::default();
    report.push(
        &not_in_sheet_name(primary_label, secondary_label),
        mismatch_table(primary, &outcome.mismatches),
    );
    report.push(
        &not_in_sheet_name(secondary_label, primary_label),
        outcome.secondary_only.clone(),
    );
    report
}

pub fn assemble_grouped(primary: &Table, records: &[MismatchRecord]) -> Report {
    let mut report = Report::default();
    report.push(MISMATCHES_SHEET, mismatch_table(primary, records));
    report
}

pub fn assemble_merge(merged: Table) -> Report {
    let mut report = Report::default();
    report.push(MERGED_SHEET, merged);
    report
}
