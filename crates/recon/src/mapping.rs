use serde::{Deserialize, Serialize};

/// Logical key of every customer-side export.
pub const CUSTOMER_KEY: &str = "Customer";

/// Natural key column of the downstream system of record.
pub const DOWNSTREAM_KEY: &str = "CUSTOMER_NATURAL_ID";

/// Core customer field → downstream field, in reporting order.
pub const CORE_TO_DOWNSTREAM: &[(&str, &str)] = &[
    ("Customer", "CUSTOMER_NATURAL_ID"),
    ("City", "CUSTOMER_CITY_NAME"),
    ("Ctry/Reg.", "CUSTOMER_COUNTRY_ISO2_CODE"),
    ("Postal Code", "CUSTOMER_POSTAL_CODE"),
    ("Street", "CUSTOMER_STREET_NAME"),
    ("Region", "CUSTOMER_REGION_CODE"),
    ("Name", "CUSTOMER_NAME"),
    ("Name2", "CUSTOMER_NAME2"),
    ("Sales Org.", "CUSTOMER_SALES_ORGANIZATION_CODE"),
    ("Distr. Channel", "CUSTOMER_SALES_DISTRIBUTION_CHANNEL_CODE"),
    ("Division", "CUSTOMER_DIVISION_CODE"),
    ("Currency", "CUSTOMER_CURRENCY"),
    ("Account group", "CUSTOMER_ACCOUNT_GROUP_CODE"),
    ("Language", "CUSTOMER_LANGUAGE_KEY"),
    ("Group", "CUSTOMER_GROUP_KEY"),
];

/// Sales-area fields compared between sales-view and partner-function rows.
pub const SALES_AREA_FIELDS: &[&str] = &["Sales Org.", "Distr. Channel", "Division"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldPair {
    pub from: String,
    pub to: String,
}

/// Ordered mapping from primary-table field names to secondary-table field
/// names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FieldMapping {
    pairs: Vec<FieldPair>,
}

impl FieldMapping {
    pub fn new(pairs: Vec<FieldPair>) -> Self {
        Self { pairs }
    }

    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = &'a (&'a str, &'a str)>) -> Self {
        Self {
            pairs: pairs
                .into_iter()
                .map(|(from, to)| FieldPair {
                    from: from.to_string(),
                    to: to.to_string(),
                })
                .collect(),
        }
    }

    pub fn core_to_downstream() -> Self {
        Self::from_pairs(CORE_TO_DOWNSTREAM)
    }

    pub fn pairs(&self) -> &[FieldPair] {
        &self.pairs
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Target field for a source field (case-insensitive).
    pub fn target_of(&self, from: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|p| p.from.eq_ignore_ascii_case(from))
            .map(|p| p.to.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preset_order_is_stable() {
        let m = FieldMapping::core_to_downstream();
        assert_eq!(m.len(), 15);
        assert_eq!(m.pairs()[0].from, "Customer");
        assert_eq!(m.pairs()[14].to, "CUSTOMER_GROUP_KEY");
    }

    #[test]
    fn target_lookup() {
        let m = FieldMapping::core_to_downstream();
        assert_eq!(m.target_of("customer"), Some(DOWNSTREAM_KEY));
        assert_eq!(m.target_of("Nope"), None);
    }
}
