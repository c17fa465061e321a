use std::collections::HashSet;

use serde::Serialize;

use crate::error::ReconError;
use crate::table::{RawTable, Table};

/// Where the header sits in a raw export and which raw rows to discard.
///
/// Row offsets are absolute, 0-based positions in the raw table. Rows above
/// the header are always discarded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HeaderLayout {
    pub header_row: usize,
    pub skip_rows: Vec<usize>,
}

impl HeaderLayout {
    /// Header on the first row, nothing skipped.
    pub fn plain() -> Self {
        Self {
            header_row: 0,
            skip_rows: Vec::new(),
        }
    }

    /// Report-style export: four title rows, header on row 4, a blank
    /// spacer on row 5.
    pub fn offset() -> Self {
        Self {
            header_row: 4,
            skip_rows: vec![5],
        }
    }
}

impl Default for HeaderLayout {
    fn default() -> Self {
        Self::plain()
    }
}

/// Turn a raw export into a clean rectangular [`Table`].
pub fn normalize(raw: &RawTable, layout: &HeaderLayout, source_name: &str) -> Result<Table, ReconError> {
    let header = raw.rows.get(layout.header_row).ok_or_else(|| {
        ReconError::malformed(
            source_name,
            format!(
                "header expected on row {} but input has only {} row(s)",
                layout.header_row + 1,
                raw.len()
            ),
        )
    })?;

    // (raw position, final name) of every column that survives
    let mut kept: Vec<(usize, String)> = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();
    for (pos, cell) in header.iter().enumerate() {
        let name = cell.as_deref().unwrap_or("").trim();
        if name.is_empty() || is_placeholder_name(name) {
            continue;
        }
        let unique = unique_name(name, &seen);
        if unique != name {
            tracing::warn!(source = source_name, column = name, renamed = %unique, "duplicate header renamed");
        }
        seen.insert(unique.clone());
        kept.push((pos, unique));
    }

    let skip: HashSet<usize> = layout.skip_rows.iter().copied().collect();
    let rows: Vec<Vec<String>> = raw
        .rows
        .iter()
        .enumerate()
        .skip(layout.header_row + 1)
        .filter(|(i, _)| !skip.contains(i))
        .map(|(_, row)| {
            kept.iter()
                .map(|(pos, _)| {
                    row.get(*pos)
                        .and_then(|c| c.as_deref())
                        .map(clean_cell)
                        .unwrap_or_default()
                })
                .collect::<Vec<String>>()
        })
        .filter(|row| row.iter().any(|cell| !cell.is_empty()))
        .collect();

    tracing::debug!(
        source = source_name,
        columns = kept.len(),
        rows = rows.len(),
        "normalized table"
    );

    let columns = kept.into_iter().map(|(_, name)| name).collect();
    Ok(Table::from_unique_columns(columns, rows))
}

/// Collapse every whitespace run (including U+00A0) to one ASCII space and
/// trim both ends.
pub fn clean_cell(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for word in value.split_whitespace() {
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(word);
    }
    out
}

/// Auto-generated name for a blank header cell in an earlier export pass,
/// e.g. `Unnamed: 3`.
pub fn is_placeholder_name(name: &str) -> bool {
    name.get(..7)
        .map(|prefix| prefix.eq_ignore_ascii_case("unnamed"))
        .unwrap_or(false)
}

fn unique_name(name: &str, seen: &HashSet<String>) -> String {
    if !seen.contains(name) {
        return name.to_string();
    }
    (1..)
        .map(|n| format!("{name}.{n}"))
        .find(|candidate| !seen.contains(candidate))
        .unwrap_or_else(|| name.to_string())
}
