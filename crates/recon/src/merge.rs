use std::collections::HashSet;

use crate::matcher::KeyIndex;
use crate::table::Table;

/// Left-join `secondary` onto `primary` by key.
///
/// Output columns are the primary columns followed by every secondary
/// column whose name is not already taken. Each primary row yields one row
/// per matching secondary row, or a single row with blank secondary cells
/// when nothing matches. Rows with empty keys are dropped from both sides.
pub fn merge_left(primary: &Table, primary_key: usize, secondary: &Table, secondary_key: usize) -> Table {
    let taken: HashSet<&str> = primary.columns().iter().map(String::as_str).collect();
    let extra: Vec<usize> = secondary
        .columns()
        .iter()
        .enumerate()
        .filter(|(_, name)| !taken.contains(name.as_str()))
        .map(|(i, _)| i)
        .collect();

    let mut columns: Vec<String> = primary.columns().to_vec();
    columns.extend(extra.iter().map(|&i| secondary.columns()[i].clone()));

    let index = KeyIndex::build(secondary, secondary_key);
    let mut rows = Vec::with_capacity(primary.len());

    for row in 0..primary.len() {
        let key = primary.key(row, primary_key);
        if key.is_empty() {
            continue;
        }
        let base = &primary.rows()[row];
        let matches = index.rows(key);
        if matches.is_empty() {
            let mut out = base.clone();
            out.resize(columns.len(), String::new());
            rows.push(out);
            continue;
        }
        for &m in matches {
            let mut out = base.clone();
            out.extend(extra.iter().map(|&i| secondary.cell(m, i).to_string()));
            rows.push(out);
        }
    }

    tracing::debug!(rows = rows.len(), columns = columns.len(), "merged view built");
    Table::from_unique_columns(columns, rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(cols: &[&str], rows: &[&[&str]]) -> Table {
        Table::new(
            cols.iter().map(|c| c.to_string()).collect(),
            rows.iter()
                .map(|r| r.iter().map(|c| c.to_string()).collect())
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn colliding_secondary_columns_dropped() {
        let core = table(&["Customer", "Name"], &[&["A1", "Acme"]]);
        let sales = table(&["Customer", "Name", "Sales Org."], &[&["A1", "ACME SALES", "10"]]);
        let merged = merge_left(&core, 0, &sales, 0);
        assert_eq!(merged.columns(), ["Customer", "Name", "Sales Org."]);
        assert_eq!(merged.rows(), [vec!["A1".to_string(), "Acme".into(), "10".into()]]);
    }

    #[test]
    fn one_row_per_match_and_blank_when_unmatched() {
        let core = table(&["Customer"], &[&["A1"], &["B2"], &[""]]);
        let sales = table(&["Customer", "Sales Org."], &[&["A1", "10"], &["A1", "20"]]);
        let merged = merge_left(&core, 0, &sales, 0);
        assert_eq!(merged.len(), 3);
        assert_eq!(merged.cell(0, 1), "10");
        assert_eq!(merged.cell(1, 1), "20");
        assert_eq!(merged.key(2, 0), "B2");
        assert_eq!(merged.cell(2, 1), "");
    }

    #[test]
    fn differently_named_secondary_key_is_kept() {
        let core = table(&["Customer"], &[&["A1"]]);
        let other = table(&["KUNNR"], &[&["A1"]]);
        let merged = merge_left(&core, 0, &other, 0);
        assert_eq!(merged.columns(), ["Customer", "KUNNR"]);
        assert_eq!(merged.cell(0, 1), "A1");
    }
}
