use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReconError {
    /// Input cannot be turned into a table (too few rows, unreadable file).
    #[error("malformed input '{source_name}': {reason}")]
    MalformedInput { source_name: String, reason: String },
    /// A required logical column could not be resolved.
    #[error("table '{table}': missing column '{field}'")]
    MissingColumn { table: String, field: String },
    /// TOML parse / deserialization error.
    #[error("config parse error: {0}")]
    ConfigParse(String),
    /// Config validation error (empty mapping, duplicate check name, etc.).
    #[error("config validation error: {0}")]
    ConfigValidation(String),
    /// A check references a source that has no config or no data.
    #[error("unknown source: {0}")]
    UnknownSource(String),
}

impl ReconError {
    /// Stable machine-readable code for JSON output.
    pub fn code(&self) -> &'static str {
        match self {
            Self::MalformedInput { .. } => "malformed_input",
            Self::MissingColumn { .. } => "missing_column",
            Self::ConfigParse(_) => "config_parse",
            Self::ConfigValidation(_) => "config_validation",
            Self::UnknownSource(_) => "unknown_source",
        }
    }

    pub fn malformed(source_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedInput {
            source_name: source_name.into(),
            reason: reason.into(),
        }
    }

    pub fn missing_column(table: impl Into<String>, field: impl Into<String>) -> Self {
        Self::MissingColumn {
            table: table.into(),
            field: field.into(),
        }
    }
}
