use std::collections::HashMap;

use serde::Serialize;

use crate::error::ReconError;

// ---------------------------------------------------------------------------
// Raw input
// ---------------------------------------------------------------------------

/// Spreadsheet-shaped input as delivered by a reader: ragged rows of
/// optional cells, header not yet located.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    pub rows: Vec<Vec<Option<String>>>,
}

impl RawTable {
    pub fn new(rows: Vec<Vec<Option<String>>>) -> Self {
        Self { rows }
    }

    /// Build from fully populated string rows. Mostly used by tests and the
    /// CSV reader, where every cell is present.
    pub fn from_rows<R, S>(rows: impl IntoIterator<Item = R>) -> Self
    where
        R: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            rows: rows
                .into_iter()
                .map(|r| r.into_iter().map(|c| Some(c.into())).collect())
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Normalized table
// ---------------------------------------------------------------------------

/// Rectangular table of string cells with a fixed, ordered column schema.
///
/// Column names are unique and non-empty. Every row has exactly one cell
/// per column. Lookups by name go through a name → index map built once at
/// construction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Table {
    columns: Vec<String>,
    #[serde(skip)]
    index: HashMap<String, usize>,
    rows: Vec<Vec<String>>,
}

impl Table {
    /// Build a table, rejecting empty or duplicate column names. Rows are
    /// padded with empty cells or truncated to the column count.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<String>>) -> Result<Self, ReconError> {
        let mut index = HashMap::with_capacity(columns.len());
        for (i, name) in columns.iter().enumerate() {
            if name.trim().is_empty() {
                return Err(ReconError::malformed("table", format!("column {} has an empty name", i + 1)));
            }
            if index.insert(name.clone(), i).is_some() {
                return Err(ReconError::malformed("table", format!("duplicate column '{name}'")));
            }
        }
        Ok(Self::assemble(columns, index, rows))
    }

    /// Build from columns already known to satisfy the schema invariant.
    pub(crate) fn from_unique_columns(columns: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        let index = columns
            .iter()
            .enumerate()
            .map(|(i, name)| (name.clone(), i))
            .collect();
        Self::assemble(columns, index, rows)
    }

    fn assemble(columns: Vec<String>, index: HashMap<String, usize>, rows: Vec<Vec<String>>) -> Self {
        let width = columns.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, String::new());
                row
            })
            .collect();
        Self { columns, index, rows }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn cell(&self, row: usize, col: usize) -> &str {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .map(String::as_str)
            .unwrap_or("")
    }

    /// Trimmed key value of `row` in column `key_col`.
    pub fn key(&self, row: usize, key_col: usize) -> &str {
        self.cell(row, key_col).trim()
    }

    /// Copy the given rows, in the given order, into a new table with the
    /// same schema.
    pub fn select_rows(&self, rows: impl IntoIterator<Item = usize>) -> Table {
        let selected = rows
            .into_iter()
            .filter_map(|i| self.rows.get(i).cloned())
            .collect();
        Self {
            columns: self.columns.clone(),
            index: self.index.clone(),
            rows: selected,
        }
    }

    /// Copy of this table with one more column appended. If the column
    /// already exists its values are replaced.
    pub fn with_column(&self, name: &str, values: Vec<String>) -> Table {
        let mut table = self.clone();
        match table.index.get(name).copied() {
            Some(col) => {
                for (row, value) in table.rows.iter_mut().zip(values) {
                    row[col] = value;
                }
            }
            None => {
                table.index.insert(name.to_string(), table.columns.len());
                table.columns.push(name.to_string());
                let mut values = values.into_iter();
                for row in table.rows.iter_mut() {
                    row.push(values.next().unwrap_or_default());
                }
            }
        }
        table
    }

    /// Rows paired with a 1-based display index.
    pub fn numbered_rows(&self) -> impl Iterator<Item = (usize, &[String])> {
        self.rows.iter().enumerate().map(|(i, r)| (i + 1, r.as_slice()))
    }

    /// Header row followed by data rows, every cell present.
    pub fn to_raw(&self) -> RawTable {
        let mut rows = Vec::with_capacity(self.rows.len() + 1);
        rows.push(self.columns.iter().cloned().map(Some).collect());
        rows.extend(
            self.rows
                .iter()
                .map(|r| r.iter().cloned().map(Some).collect()),
        );
        RawTable { rows }
    }
}
