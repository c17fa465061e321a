use std::collections::HashMap;

use crate::config::{CheckConfig, CheckKind, ReconConfig};
use crate::error::ReconError;
use crate::grouped::reconcile_grouped;
use crate::matcher::diff_by_key;
use crate::merge::merge_left;
use crate::model::{CheckOutcome, CheckResult, CheckSummary, ReconInput, ReconMeta, ReconResult, RunSummary};
use crate::normalize::normalize;
use crate::reconcile::{reconcile, MismatchRecord};
use crate::report::{assemble_grouped, assemble_key_diff, assemble_mapping, assemble_merge, Report};
use crate::resolve::require_column;
use crate::table::Table;

/// Run every check in config order. A failing check is recorded and the run
/// moves on; only an invalid config fails the whole run.
pub fn run(config: &ReconConfig, input: &ReconInput) -> Result<ReconResult, ReconError> {
    config.validate()?;

    let mut tables = TableCache::new(config, input);
    let mut checks = Vec::with_capacity(config.checks.len());
    let mut summary = RunSummary::default();

    for check in &config.checks {
        tracing::info!(check = %check.name, kind = %check.kind, "check started");

        let outcome = match run_check(config, check, &mut tables) {
            Ok(completed) => {
                if let Some(merged) = completed.merged {
                    tables.insert(&check.name, merged);
                }
                if completed.summary.is_clean() {
                    summary.clean += 1;
                } else {
                    summary.with_differences += 1;
                }
                tracing::info!(
                    check = %check.name,
                    clean = completed.summary.is_clean(),
                    mismatched = completed.summary.mismatched,
                    "check finished"
                );
                CheckOutcome::Completed {
                    summary: completed.summary,
                    mismatches: completed.mismatches,
                    report: completed.report,
                }
            }
            Err(e) => {
                summary.failed += 1;
                tracing::warn!(check = %check.name, error = %e, "check failed");
                CheckOutcome::Failed {
                    code: e.code().to_string(),
                    message: e.to_string(),
                }
            }
        };
        summary.checks += 1;

        checks.push(CheckResult {
            name: check.name.clone(),
            kind: check.kind,
            left: check.left.clone(),
            right: check.right.clone(),
            outcome,
        });
    }

    Ok(ReconResult {
        meta: ReconMeta {
            config_name: config.name.clone(),
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            run_at: chrono::Utc::now().to_rfc3339(),
        },
        summary,
        checks,
    })
}

// ---------------------------------------------------------------------------
// Single check
// ---------------------------------------------------------------------------

struct Completed {
    summary: CheckSummary,
    mismatches: Vec<MismatchRecord>,
    report: Report,
    merged: Option<Table>,
}

fn run_check(config: &ReconConfig, check: &CheckConfig, tables: &mut TableCache<'_>) -> Result<Completed, ReconError> {
    tables.load(&check.left)?;
    tables.load(&check.right)?;
    let left = tables.get(&check.left)?;
    let right = tables.get(&check.right)?;

    let left_label = config.label(&check.left);
    let right_label = config.label(&check.right);

    let left_key = require_column(left, check.left_key(), left_label)?;
    let right_key = require_column(right, &check.right_key(), right_label)?;
    for column in &check.required_columns {
        require_column(right, column, right_label)?;
    }

    let mut summary = CheckSummary {
        left_rows: left.len(),
        right_rows: right.len(),
        ..CheckSummary::default()
    };

    let completed = match check.kind {
        CheckKind::KeyDiff => {
            let diff = diff_by_key(left, left_key, right, right_key);
            summary.left_only = diff.left_count();
            summary.right_only = diff.right_count();
            Completed {
                summary,
                mismatches: Vec::new(),
                report: assemble_key_diff(left_label, right_label, &diff),
                merged: None,
            }
        }
        CheckKind::FieldMapping => {
            let mapping = check.field_mapping();
            let outcome = reconcile(left, right, left_key, right_key, &mapping);
            summary.mismatched = outcome.mismatches.len();
            summary.not_found = count_not_found(&outcome.mismatches);
            summary.right_only = outcome.secondary_only.len();
            let report = assemble_mapping(left_label, right_label, left, &outcome);
            Completed {
                summary,
                mismatches: outcome.mismatches,
                report,
                merged: None,
            }
        }
        CheckKind::Grouped => {
            let records = reconcile_grouped(left, left_key, right, right_key, &check.comparison_fields());
            summary.mismatched = records.len();
            summary.not_found = count_not_found(&records);
            Completed {
                summary,
                report: assemble_grouped(left, &records),
                mismatches: records,
                merged: None,
            }
        }
        CheckKind::Merge => {
            let merged = merge_left(left, left_key, right, right_key);
            summary.merged_rows = Some(merged.len());
            Completed {
                summary,
                mismatches: Vec::new(),
                report: assemble_merge(merged.clone()),
                merged: Some(merged),
            }
        }
    };

    Ok(completed)
}

fn count_not_found(records: &[MismatchRecord]) -> usize {
    records.iter().filter(|r| r.reason.is_missing_key()).count()
}

// ---------------------------------------------------------------------------
// Normalized tables
// ---------------------------------------------------------------------------

/// Normalizes each source on first use. Merge outputs are added under the
/// merge check's name.
struct TableCache<'a> {
    config: &'a ReconConfig,
    input: &'a ReconInput,
    tables: HashMap<String, Table>,
}

impl<'a> TableCache<'a> {
    fn new(config: &'a ReconConfig, input: &'a ReconInput) -> Self {
        Self {
            config,
            input,
            tables: HashMap::new(),
        }
    }

    fn insert(&mut self, id: &str, table: Table) {
        self.tables.insert(id.to_string(), table);
    }

    fn load(&mut self, id: &str) -> Result<(), ReconError> {
        if self.tables.contains_key(id) {
            return Ok(());
        }
        if let Some(reason) = self.input.unreadable.get(id) {
            return Err(ReconError::malformed(self.config.label(id), reason.clone()));
        }
        let Some(source) = self.config.sources.get(id) else {
            return Err(ReconError::UnknownSource(format!("'{id}' has no table (did its merge check fail?)")));
        };
        let raw = self
            .input
            .raw
            .get(id)
            .ok_or_else(|| ReconError::UnknownSource(format!("'{id}' was not loaded")))?;

        let table = normalize(raw, &source.header_layout(), self.config.label(id))?;
        tracing::debug!(source = id, rows = table.len(), columns = table.width(), "source normalized");
        self.tables.insert(id.to_string(), table);
        Ok(())
    }

    fn get(&self, id: &str) -> Result<&Table, ReconError> {
        self.tables
            .get(id)
            .ok_or_else(|| ReconError::UnknownSource(format!("'{id}' was not loaded")))
    }
}
