use std::collections::HashMap;

use serde::Serialize;

use crate::config::CheckKind;
use crate::reconcile::MismatchRecord;
use crate::report::Report;
use crate::table::RawTable;

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// Raw tables keyed by source id, as delivered by the loader.
#[derive(Debug, Default)]
pub struct ReconInput {
    pub raw: HashMap<String, RawTable>,
    /// Sources the loader could not read, with the reason. Checks touching
    /// them fail; other checks still run.
    pub unreadable: HashMap<String, String>,
}

impl ReconInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: impl Into<String>, raw: RawTable) {
        self.raw.insert(id.into(), raw);
    }

    pub fn mark_unreadable(&mut self, id: impl Into<String>, reason: impl Into<String>) {
        self.unreadable.insert(id.into(), reason.into());
    }
}

// ---------------------------------------------------------------------------
// Per-check results
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CheckSummary {
    pub left_rows: usize,
    pub right_rows: usize,
    /// Left rows whose key is absent on the right (key_diff).
    pub left_only: usize,
    /// Right rows whose key is absent on the left (key_diff, field_mapping).
    pub right_only: usize,
    /// Primary rows reported with a mismatch reason, missing keys included.
    pub mismatched: usize,
    /// Of `mismatched`, rows whose key had no counterpart.
    pub not_found: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merged_rows: Option<usize>,
}

impl CheckSummary {
    pub fn is_clean(&self) -> bool {
        self.left_only == 0 && self.right_only == 0 && self.mismatched == 0
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CheckOutcome {
    Completed {
        summary: CheckSummary,
        mismatches: Vec<MismatchRecord>,
        #[serde(skip_serializing)]
        report: Report,
    },
    /// The check aborted; nothing partial is kept.
    Failed { code: String, message: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct CheckResult {
    pub name: String,
    pub kind: CheckKind,
    pub left: String,
    pub right: String,
    #[serde(flatten)]
    pub outcome: CheckOutcome,
}

impl CheckResult {
    pub fn summary(&self) -> Option<&CheckSummary> {
        match &self.outcome {
            CheckOutcome::Completed { summary, .. } => Some(summary),
            CheckOutcome::Failed { .. } => None,
        }
    }

    pub fn report(&self) -> Option<&Report> {
        match &self.outcome {
            CheckOutcome::Completed { report, .. } => Some(report),
            CheckOutcome::Failed { .. } => None,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.outcome, CheckOutcome::Failed { .. })
    }
}

// ---------------------------------------------------------------------------
// Summary + Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub checks: usize,
    pub clean: usize,
    pub with_differences: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReconResult {
    pub meta: ReconMeta,
    pub summary: RunSummary,
    pub checks: Vec<CheckResult>,
}

impl ReconResult {
    pub fn check(&self, name: &str) -> Option<&CheckResult> {
        self.checks.iter().find(|c| c.name == name)
    }

    pub fn has_differences(&self) -> bool {
        self.summary.with_differences > 0
    }

    pub fn has_failures(&self) -> bool {
        self.summary.failed > 0
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ReconMeta {
    pub config_name: String,
    pub engine_version: String,
    pub run_at: String,
}
