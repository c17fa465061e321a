use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::ReconError;
use crate::mapping::{FieldMapping, FieldPair, CUSTOMER_KEY, SALES_AREA_FIELDS};
use crate::normalize::HeaderLayout;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct ReconConfig {
    pub name: String,
    pub sources: BTreeMap<String, SourceConfig>,
    pub checks: Vec<CheckConfig>,
    #[serde(default)]
    pub output: OutputConfig,
}

// ---------------------------------------------------------------------------
// Sources
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    pub file: String,
    /// Worksheet to read; the first one when absent.
    #[serde(default)]
    pub sheet: Option<String>,
    /// Display name used in sheet names and summaries.
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub layout: LayoutKind,
    #[serde(default)]
    pub header_row: Option<usize>,
    #[serde(default)]
    pub skip_rows: Option<Vec<usize>>,
}

impl SourceConfig {
    pub fn from_file(file: impl Into<String>, layout: LayoutKind) -> Self {
        Self {
            file: file.into(),
            sheet: None,
            label: None,
            layout,
            header_row: None,
            skip_rows: None,
        }
    }

    /// Layout preset with any explicit overrides applied.
    pub fn header_layout(&self) -> HeaderLayout {
        let mut layout = match self.layout {
            LayoutKind::OffsetHeader => HeaderLayout::offset(),
            LayoutKind::PlainHeader => HeaderLayout::plain(),
        };
        if let Some(row) = self.header_row {
            layout.header_row = row;
        }
        if let Some(ref skip) = self.skip_rows {
            layout.skip_rows = skip.clone();
        }
        layout
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LayoutKind {
    /// Header on row 4, spacer row 5 skipped.
    OffsetHeader,
    /// Header on the first row.
    #[default]
    PlainHeader,
}

// ---------------------------------------------------------------------------
// Checks
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct CheckConfig {
    pub name: String,
    pub kind: CheckKind,
    pub left: String,
    pub right: String,
    #[serde(default)]
    pub left_key: Option<String>,
    #[serde(default)]
    pub right_key: Option<String>,
    /// Explicit field mapping for `field_mapping` checks.
    #[serde(default)]
    pub mapping: Vec<FieldPair>,
    #[serde(default)]
    pub preset: Option<MappingPreset>,
    /// Comparison fields for `grouped` checks.
    #[serde(default)]
    pub fields: Vec<String>,
    /// Extra columns the right-hand source must carry.
    #[serde(default)]
    pub required_columns: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckKind {
    /// Key presence in both directions.
    KeyDiff,
    /// Mapped-field comparison against a system of record.
    FieldMapping,
    /// Fixed-field comparison against key groups.
    Grouped,
    /// Left join producing an intermediate table.
    Merge,
}

impl std::fmt::Display for CheckKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::KeyDiff => write!(f, "key_diff"),
            Self::FieldMapping => write!(f, "field_mapping"),
            Self::Grouped => write!(f, "grouped"),
            Self::Merge => write!(f, "merge"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MappingPreset {
    CoreToDownstream,
}

impl CheckConfig {
    pub fn new(name: impl Into<String>, kind: CheckKind, left: impl Into<String>, right: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            left: left.into(),
            right: right.into(),
            left_key: None,
            right_key: None,
            mapping: Vec::new(),
            preset: None,
            fields: Vec::new(),
            required_columns: Vec::new(),
        }
    }

    /// Explicit mapping if given, else the preset, else empty.
    pub fn field_mapping(&self) -> FieldMapping {
        if !self.mapping.is_empty() {
            return FieldMapping::new(self.mapping.clone());
        }
        match self.preset {
            Some(MappingPreset::CoreToDownstream) => FieldMapping::core_to_downstream(),
            None => FieldMapping::default(),
        }
    }

    pub fn left_key(&self) -> &str {
        self.left_key.as_deref().unwrap_or(CUSTOMER_KEY)
    }

    /// Explicit right key; for mapping checks the mapped target of the left
    /// key; otherwise the same logical name as the left key.
    pub fn right_key(&self) -> String {
        if let Some(ref key) = self.right_key {
            return key.clone();
        }
        if self.kind == CheckKind::FieldMapping {
            if let Some(target) = self.field_mapping().target_of(self.left_key()) {
                return target.to_string();
            }
        }
        self.left_key().to_string()
    }

    /// Comparison fields for grouped checks; the sales-area fields when
    /// none are configured.
    pub fn comparison_fields(&self) -> Vec<String> {
        if self.fields.is_empty() {
            SALES_AREA_FIELDS.iter().map(|f| f.to_string()).collect()
        } else {
            self.fields.clone()
        }
    }
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub json: Option<String>,
    #[serde(default)]
    pub xlsx_dir: Option<String>,
}

// ---------------------------------------------------------------------------
// Built-in config
// ---------------------------------------------------------------------------

/// The three standard customer comparisons, plus the merge that feeds the
/// downstream comparison.
pub const DEFAULT_CONFIG_TOML: &str = r#"
name = "Customer master validation"

[sources.kna1]
file = "kna1.xlsx"
label = "KNA1"
layout = "offset_header"

[sources.knvv]
file = "knvv.xlsx"
label = "KNVV"
layout = "offset_header"

[sources.knvp]
file = "knvp.xlsx"
label = "KNVP"
layout = "offset_header"

[sources.mace]
file = "mace.xlsx"
label = "MACE"
layout = "plain_header"

[[checks]]
name = "kna1_vs_knvv"
kind = "key_diff"
left = "kna1"
right = "knvv"

[[checks]]
name = "kna1_knvv"
kind = "merge"
left = "kna1"
right = "knvv"

[[checks]]
name = "merged_vs_mace"
kind = "field_mapping"
left = "kna1_knvv"
right = "mace"
preset = "core_to_downstream"
required_columns = ["CUSTOMER_NATURAL_ID"]

[[checks]]
name = "knvv_vs_knvp"
kind = "grouped"
left = "knvv"
right = "knvp"
fields = ["Sales Org.", "Distr. Channel", "Division"]
"#;

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl ReconConfig {
    pub fn from_toml(input: &str) -> Result<Self, ReconError> {
        let config: ReconConfig =
            toml::from_str(input).map_err(|e| ReconError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn builtin() -> Result<Self, ReconError> {
        Self::from_toml(DEFAULT_CONFIG_TOML)
    }

    /// Display label of a source or merge check.
    pub fn label<'a>(&'a self, id: &'a str) -> &'a str {
        self.sources
            .get(id)
            .and_then(|s| s.label.as_deref())
            .unwrap_or(id)
    }

    pub fn validate(&self) -> Result<(), ReconError> {
        if self.sources.is_empty() {
            return Err(ReconError::ConfigValidation("at least one source is required".into()));
        }
        if self.checks.is_empty() {
            return Err(ReconError::ConfigValidation("at least one check is required".into()));
        }

        // Merge outputs become referable by later checks under the check name
        let mut known: HashSet<&str> = self.sources.keys().map(String::as_str).collect();
        let mut names: HashSet<&str> = HashSet::new();

        for check in &self.checks {
            if !names.insert(check.name.as_str()) {
                return Err(ReconError::ConfigValidation(format!(
                    "duplicate check name '{}'",
                    check.name
                )));
            }
            for side in [&check.left, &check.right] {
                if !known.contains(side.as_str()) {
                    return Err(ReconError::UnknownSource(format!(
                        "check '{}': source '{side}' not found",
                        check.name
                    )));
                }
            }
            if check.kind == CheckKind::FieldMapping && check.field_mapping().is_empty() {
                return Err(ReconError::ConfigValidation(format!(
                    "check '{}': field_mapping requires `mapping` or `preset`",
                    check.name
                )));
            }
            if check.kind == CheckKind::Merge {
                if self.sources.contains_key(&check.name) {
                    return Err(ReconError::ConfigValidation(format!(
                        "merge check '{}' shadows a source of the same name",
                        check.name
                    )));
                }
                known.insert(check.name.as_str());
            }
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_SOURCES: &str = r#"
name = "Test"

[sources.core]
file = "core.xlsx"
layout = "offset_header"

[sources.downstream]
file = "downstream.csv"
"#;

    #[test]
    fn builtin_config_is_valid() {
        let config = ReconConfig::builtin().unwrap();
        assert_eq!(config.checks.len(), 4);
        assert_eq!(config.label("mace"), "MACE");
        assert_eq!(config.label("kna1_knvv"), "kna1_knvv");
        assert_eq!(config.checks[2].right_key(), "CUSTOMER_NATURAL_ID");
        assert_eq!(config.sources["kna1"].header_layout(), HeaderLayout::offset());
        assert_eq!(config.sources["mace"].header_layout(), HeaderLayout::plain());
    }

    #[test]
    fn parse_explicit_mapping_keeps_order() {
        let input = format!(
            r#"{TWO_SOURCES}
[[checks]]
name = "core_vs_downstream"
kind = "field_mapping"
left = "core"
right = "downstream"
left_key = "Customer"
right_key = "ID"
mapping = [
  {{ from = "Street", to = "STREET" }},
  {{ from = "City", to = "CITY" }},
]
"#
        );
        let config = ReconConfig::from_toml(&input).unwrap();
        let mapping = config.checks[0].field_mapping();
        assert_eq!(mapping.pairs()[0].from, "Street");
        assert_eq!(mapping.pairs()[1].to, "CITY");
        assert_eq!(config.checks[0].right_key(), "ID");
    }

    #[test]
    fn layout_overrides_apply() {
        let input = r#"
name = "Overrides"

[sources.a]
file = "a.xlsx"
layout = "offset_header"
header_row = 2
skip_rows = []

[[checks]]
name = "self"
kind = "key_diff"
left = "a"
right = "a"
"#;
        let config = ReconConfig::from_toml(input).unwrap();
        let layout = config.sources["a"].header_layout();
        assert_eq!(layout.header_row, 2);
        assert!(layout.skip_rows.is_empty());
    }

    #[test]
    fn grouped_fields_default_to_sales_area() {
        let check = CheckConfig::new("g", CheckKind::Grouped, "a", "b");
        assert_eq!(check.comparison_fields(), vec!["Sales Org.", "Distr. Channel", "Division"]);
        assert_eq!(check.right_key(), "Customer");
    }

    #[test]
    fn reject_mapping_without_fields() {
        let input = format!(
            r#"{TWO_SOURCES}
[[checks]]
name = "m"
kind = "field_mapping"
left = "core"
right = "downstream"
"#
        );
        let err = ReconConfig::from_toml(&input).unwrap_err();
        assert!(err.to_string().contains("requires `mapping` or `preset`"));
    }

    #[test]
    fn reject_unknown_source() {
        let input = format!(
            r#"{TWO_SOURCES}
[[checks]]
name = "k"
kind = "key_diff"
left = "core"
right = "sales"
"#
        );
        let err = ReconConfig::from_toml(&input).unwrap_err();
        assert!(err.to_string().contains("'sales'"));
    }

    #[test]
    fn merge_output_only_visible_to_later_checks() {
        let input = format!(
            r#"{TWO_SOURCES}
[[checks]]
name = "uses_merge"
kind = "key_diff"
left = "joined"
right = "downstream"

[[checks]]
name = "joined"
kind = "merge"
left = "core"
right = "downstream"
"#
        );
        assert!(matches!(
            ReconConfig::from_toml(&input),
            Err(ReconError::UnknownSource(_))
        ));
    }

    #[test]
    fn reject_duplicate_check_names() {
        let input = format!(
            r#"{TWO_SOURCES}
[[checks]]
name = "k"
kind = "key_diff"
left = "core"
right = "downstream"

[[checks]]
name = "k"
kind = "key_diff"
left = "downstream"
right = "core"
"#
        );
        let err = ReconConfig::from_toml(&input).unwrap_err();
        assert!(err.to_string().contains("duplicate check name 'k'"));
    }

    #[test]
    fn reject_invalid_layout() {
        let input = r#"
name = "Bad"
[sources.a]
file = "a.xlsx"
layout = "sideways"
[[checks]]
name = "k"
kind = "key_diff"
left = "a"
right = "a"
"#;
        assert!(matches!(ReconConfig::from_toml(input), Err(ReconError::ConfigParse(_))));
    }
}
