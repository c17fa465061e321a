use crate::error::ReconError;
use crate::table::Table;

/// Find the column for a logical field name: case-insensitive exact match
/// on the trimmed name, first match wins.
pub fn resolve_index(table: &Table, logical: &str) -> Option<usize> {
    let wanted = logical.trim().to_lowercase();
    table
        .columns()
        .iter()
        .position(|c| c.trim().to_lowercase() == wanted)
}

/// Same as [`resolve_index`], returning the actual column name.
pub fn resolve_column<'t>(table: &'t Table, logical: &str) -> Option<&'t str> {
    resolve_index(table, logical).map(|i| table.columns()[i].as_str())
}

/// Resolve a column the caller cannot do without.
pub fn require_column(table: &Table, logical: &str, table_name: &str) -> Result<usize, ReconError> {
    resolve_index(table, logical).ok_or_else(|| ReconError::missing_column(table_name, logical))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(cols: &[&str]) -> Table {
        Table::new(cols.iter().map(|c| c.to_string()).collect(), vec![]).unwrap()
    }

    #[test]
    fn case_insensitive_match() {
        let t = table(&["CUSTOMER", "City"]);
        assert_eq!(resolve_column(&t, "customer"), Some("CUSTOMER"));
        assert_eq!(resolve_index(&t, " city "), Some(1));
    }

    #[test]
    fn first_match_wins() {
        let t = table(&["customer", "Customer"]);
        assert_eq!(resolve_index(&t, "Customer"), Some(0));
    }

    #[test]
    fn no_partial_matches() {
        let t = table(&["Customer Name"]);
        assert_eq!(resolve_column(&t, "Customer"), None);
    }

    #[test]
    fn require_names_table_and_field() {
        let t = table(&["Name"]);
        let err = require_column(&t, "CUSTOMER_NATURAL_ID", "mace").unwrap_err();
        assert_eq!(err.to_string(), "table 'mace': missing column 'CUSTOMER_NATURAL_ID'");
    }
}
