use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::table::Table;

// ---------------------------------------------------------------------------
// Key index
// ---------------------------------------------------------------------------

/// Row positions grouped by trimmed key. Rows with an empty key are left
/// out. Positions within a group keep table order.
#[derive(Debug)]
pub struct KeyIndex<'t> {
    groups: HashMap<&'t str, Vec<usize>>,
}

impl<'t> KeyIndex<'t> {
    pub fn build(table: &'t Table, key_col: usize) -> Self {
        let mut groups: HashMap<&'t str, Vec<usize>> = HashMap::new();
        for row in 0..table.len() {
            let key = table.key(row, key_col);
            if key.is_empty() {
                continue;
            }
            groups.entry(key).or_default().push(row);
        }
        Self { groups }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.groups.contains_key(key)
    }

    /// Rows sharing `key`, empty when the key is absent.
    pub fn rows(&self, key: &str) -> &[usize] {
        self.groups.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn keys(&self) -> HashSet<&'t str> {
        self.groups.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

/// Distinct non-empty keys of a table.
pub fn key_set(table: &Table, key_col: usize) -> HashSet<&str> {
    (0..table.len())
        .map(|row| table.key(row, key_col))
        .filter(|k| !k.is_empty())
        .collect()
}

// ---------------------------------------------------------------------------
// Set difference
// ---------------------------------------------------------------------------

/// Rows whose key is present on one side only.
#[derive(Debug, Clone, Serialize)]
pub struct DiffResult {
    pub left_only: Table,
    pub right_only: Table,
}

impl DiffResult {
    pub fn left_count(&self) -> usize {
        self.left_only.len()
    }

    pub fn right_count(&self) -> usize {
        self.right_only.len()
    }

    pub fn is_clean(&self) -> bool {
        self.left_only.is_empty() && self.right_only.is_empty()
    }
}

/// Symmetric key difference between two tables. Empty keys never take part;
/// output rows keep their original order.
pub fn diff_by_key(left: &Table, left_key: usize, right: &Table, right_key: usize) -> DiffResult {
    let left_keys = key_set(left, left_key);
    let right_keys = key_set(right, right_key);

    DiffResult {
        left_only: rows_missing_from(left, left_key, &right_keys),
        right_only: rows_missing_from(right, right_key, &left_keys),
    }
}

/// Non-empty-key rows of `table` whose key is not in `other`.
pub(crate) fn rows_missing_from(table: &Table, key_col: usize, other: &HashSet<&str>) -> Table {
    let rows = (0..table.len()).filter(|&row| {
        let key = table.key(row, key_col);
        !key.is_empty() && !other.contains(key)
    });
    table.select_rows(rows)
}
