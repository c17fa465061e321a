//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Exit codes are part of the shell contract; scripts rely on them.
//!
//! | Code | Meaning                                              |
//! |------|------------------------------------------------------|
//! | 0    | Every check ran and found nothing                    |
//! | 1    | At least one check found differences                 |
//! | 2    | CLI usage error (bad args, unsupported file type)    |
//! | 3    | Invalid config (parse, validation, unknown source)   |
//! | 4    | Malformed input (header offset past the data, etc.)  |
//! | 5    | A required column is missing                         |
//! | 6    | IO or runtime failure (missing file, write error)    |
//!
//! When a run has both failed checks and differences, the failure code wins.
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant
//! 2. Document what triggers it
//! 3. Update the table above
//! 4. Wire it into `for_engine_code`

/// Success - all checks clean.
pub const EXIT_SUCCESS: u8 = 0;

/// Differences found. Like `diff(1)`, exit 1 means "inputs differ."
pub const EXIT_DIFFS: u8 = 1;

/// Usage error - bad arguments, missing required options.
pub const EXIT_USAGE: u8 = 2;

/// Config cannot be parsed or fails validation.
pub const EXIT_INVALID_CONFIG: u8 = 3;

/// An input has no header at the expected offset or is not tabular.
pub const EXIT_MALFORMED_INPUT: u8 = 4;

/// A key or required column could not be resolved.
pub const EXIT_MISSING_COLUMN: u8 = 5;

/// File read/write failure, or a check whose input never materialized.
pub const EXIT_RUNTIME: u8 = 6;

/// Map an engine error code (see `ReconError::code`) to an exit code.
pub fn for_engine_code(code: &str) -> u8 {
    match code {
        "malformed_input" => EXIT_MALFORMED_INPUT,
        "missing_column" => EXIT_MISSING_COLUMN,
        "config_parse" | "config_validation" => EXIT_INVALID_CONFIG,
        _ => EXIT_RUNTIME,
    }
}
