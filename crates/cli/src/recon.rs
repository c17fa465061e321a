//! `custrecon run` / `validate` and the two-file shortcuts built on the same
//! engine run.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use custrecon_engine::config::{CheckConfig, CheckKind, MappingPreset, OutputConfig, SourceConfig};
use custrecon_engine::model::{CheckOutcome, ReconInput, ReconResult};
use custrecon_engine::report::Report;
use custrecon_engine::{LayoutKind, ReconConfig};
use custrecon_io::FileKind;

use crate::exit_codes::{for_engine_code, EXIT_DIFFS};
use crate::render::{check_line, numbered_table, run_line};
use crate::CliError;

pub struct RunOutput {
    pub json: bool,
    pub output: Option<PathBuf>,
    pub xlsx_dir: Option<PathBuf>,
    pub show: bool,
}

pub struct AdHocOutput {
    pub xlsx: Option<PathBuf>,
    pub json: bool,
    pub show: bool,
}

/// Two input files and how their headers are laid out.
pub struct Pair {
    left: PathBuf,
    right: PathBuf,
    left_layout: LayoutKind,
    right_layout: LayoutKind,
}

impl Pair {
    pub fn new(left: PathBuf, right: PathBuf, left_layout: LayoutKind, right_layout: LayoutKind) -> Self {
        Self { left, right, left_layout, right_layout }
    }

    fn sources(&self) -> BTreeMap<String, SourceConfig> {
        let mut sources = BTreeMap::new();
        sources.insert(LEFT.to_string(), source_for(&self.left, self.left_layout));
        sources.insert(RIGHT.to_string(), source_for(&self.right, self.right_layout));
        sources
    }
}

const LEFT: &str = "left";
const RIGHT: &str = "right";

fn source_for(path: &Path, layout: LayoutKind) -> SourceConfig {
    let mut source = SourceConfig::from_file(path.to_string_lossy(), layout);
    source.label = path.file_stem().map(|s| s.to_string_lossy().into_owned());
    source
}

fn ad_hoc_config(name: &str, pair: &Pair, checks: Vec<CheckConfig>) -> Result<ReconConfig, CliError> {
    let config = ReconConfig {
        name: name.to_string(),
        sources: pair.sources(),
        checks,
        output: OutputConfig::default(),
    };
    config.validate()?;
    Ok(config)
}

// ---------------------------------------------------------------------------
// run / validate
// ---------------------------------------------------------------------------

pub fn cmd_run(config_path: Option<PathBuf>, dir: Option<PathBuf>, out: RunOutput) -> Result<(), CliError> {
    let (config, base_dir) = match config_path {
        Some(path) => {
            let config = load_config(&path)?;
            // Resolve file paths relative to config file's directory
            let base = path.parent().map(Path::to_path_buf).unwrap_or_default();
            (config, base)
        }
        None => (ReconConfig::builtin()?, dir.unwrap_or_default()),
    };

    let result = execute(&config, &base_dir)?;

    let json_path = out
        .output
        .or_else(|| config.output.json.as_ref().map(|p| base_dir.join(p)));
    let xlsx_dir = out
        .xlsx_dir
        .or_else(|| config.output.xlsx_dir.as_ref().map(|p| base_dir.join(p)));

    emit_json(&result, out.json, json_path.as_deref())?;

    if let Some(dir) = xlsx_dir {
        std::fs::create_dir_all(&dir)
            .map_err(|e| CliError::runtime(format!("cannot create {}: {e}", dir.display())))?;
        for check in &result.checks {
            if let Some(report) = check.report() {
                write_report(report, &dir.join(format!("{}.xlsx", check.name)))?;
            }
        }
    }

    if out.show {
        show_reports(&result);
    }
    print_summary(&config, &result);
    exit_status(&result)
}

pub fn cmd_validate(config_path: PathBuf) -> Result<(), CliError> {
    let config = load_config(&config_path)?;
    eprintln!(
        "valid: '{}' with {} source(s), {} check(s)",
        config.name,
        config.sources.len(),
        config.checks.len(),
    );
    Ok(())
}

fn load_config(path: &Path) -> Result<ReconConfig, CliError> {
    let config_str = std::fs::read_to_string(path)
        .map_err(|e| CliError::runtime(format!("cannot read config {}: {e}", path.display())))?;
    ReconConfig::from_toml(&config_str).map_err(|e| CliError::config(e.to_string()))
}

// ---------------------------------------------------------------------------
// Two-file shortcuts
// ---------------------------------------------------------------------------

pub fn cmd_diff(pair: Pair, key: String, merged: Option<PathBuf>, out: AdHocOutput) -> Result<(), CliError> {
    let mut diff = CheckConfig::new("diff", CheckKind::KeyDiff, LEFT, RIGHT);
    diff.left_key = Some(key.clone());
    let mut checks = vec![diff];
    if merged.is_some() {
        let mut merge = CheckConfig::new("merged", CheckKind::Merge, LEFT, RIGHT);
        merge.left_key = Some(key);
        checks.push(merge);
    }

    let config = ad_hoc_config("diff", &pair, checks)?;
    let result = execute(&config, Path::new(""))?;

    if let Some(path) = merged {
        if let Some(sheet) = result
            .check("merged")
            .and_then(|c| c.report())
            .and_then(|r| r.sheets.first())
        {
            custrecon_io::export_table(&sheet.table, &path)
                .map_err(|e| CliError::runtime(format!("cannot write {}: {e}", path.display())))?;
            eprintln!("wrote {}", path.display());
        }
    }

    finish_ad_hoc(&config, &result, "diff", out)
}

pub fn cmd_mapping(pair: Pair, primary_key: String, secondary_key: String, out: AdHocOutput) -> Result<(), CliError> {
    let mut check = CheckConfig::new("mapping", CheckKind::FieldMapping, LEFT, RIGHT);
    check.preset = Some(MappingPreset::CoreToDownstream);
    check.required_columns = vec![secondary_key.clone()];
    check.left_key = Some(primary_key);
    check.right_key = Some(secondary_key);

    let config = ad_hoc_config("mapping", &pair, vec![check])?;
    let result = execute(&config, Path::new(""))?;
    finish_ad_hoc(&config, &result, "mapping", out)
}

pub fn cmd_grouped(pair: Pair, key: String, fields: Vec<String>, out: AdHocOutput) -> Result<(), CliError> {
    let mut check = CheckConfig::new("grouped", CheckKind::Grouped, LEFT, RIGHT);
    check.left_key = Some(key);
    check.fields = fields;

    let config = ad_hoc_config("grouped", &pair, vec![check])?;
    let result = execute(&config, Path::new(""))?;
    finish_ad_hoc(&config, &result, "grouped", out)
}

pub fn cmd_merge(pair: Pair, key: String, output: PathBuf) -> Result<(), CliError> {
    let mut check = CheckConfig::new("merge", CheckKind::Merge, LEFT, RIGHT);
    check.left_key = Some(key);

    let config = ad_hoc_config("merge", &pair, vec![check])?;
    let result = execute(&config, Path::new(""))?;

    let out = AdHocOutput { xlsx: None, json: false, show: false };
    if let Some(sheet) = result
        .check("merge")
        .and_then(|c| c.report())
        .and_then(|r| r.sheets.first())
    {
        custrecon_io::export_table(&sheet.table, &output)
            .map_err(|e| CliError::runtime(format!("cannot write {}: {e}", output.display())))?;
        eprintln!("wrote {}", output.display());
    }
    finish_ad_hoc(&config, &result, "merge", out)
}

fn finish_ad_hoc(config: &ReconConfig, result: &ReconResult, check: &str, out: AdHocOutput) -> Result<(), CliError> {
    emit_json(result, out.json, None)?;
    if let Some(path) = out.xlsx {
        if let Some(report) = result.check(check).and_then(|c| c.report()) {
            write_report(report, &path)?;
        }
    }
    if out.show {
        show_reports(result);
    }
    for check in &result.checks {
        eprintln!("{}", check_line(config, check));
    }
    exit_status(result)
}

// ---------------------------------------------------------------------------
// Shared
// ---------------------------------------------------------------------------

/// Load every source and run the engine.
fn execute(config: &ReconConfig, base_dir: &Path) -> Result<ReconResult, CliError> {
    let mut input = ReconInput::new();

    for (id, source) in &config.sources {
        let path = base_dir.join(&source.file);
        FileKind::from_path(&path).map_err(CliError::usage)?;
        if !path.is_file() {
            return Err(CliError::runtime(format!("cannot read {}: file not found", path.display()))
                .with_hint("source paths in a config are relative to the config file"));
        }
        match custrecon_io::load_raw(&path, source.sheet.as_deref()) {
            Ok(raw) => input.insert(id.clone(), raw),
            Err(e) => {
                tracing::warn!(source = %id, error = %e, "source unreadable");
                input.mark_unreadable(id.clone(), e);
            }
        }
    }

    Ok(custrecon_engine::run(config, &input)?)
}

fn emit_json(result: &ReconResult, to_stdout: bool, path: Option<&Path>) -> Result<(), CliError> {
    if !to_stdout && path.is_none() {
        return Ok(());
    }
    let json_str = serde_json::to_string_pretty(result)
        .map_err(|e| CliError::runtime(format!("JSON serialization error: {e}")))?;

    if let Some(path) = path {
        std::fs::write(path, &json_str)
            .map_err(|e| CliError::runtime(format!("cannot write output: {e}")))?;
        eprintln!("wrote {}", path.display());
    }
    if to_stdout {
        println!("{json_str}");
    }
    Ok(())
}

fn write_report(report: &Report, path: &Path) -> Result<(), CliError> {
    let written = custrecon_io::export_report(report, path)
        .map_err(|e| CliError::runtime(format!("cannot write {}: {e}", path.display())))?;
    eprintln!(
        "wrote {} ({} sheet(s), {} row(s))",
        path.display(),
        written.sheets_exported,
        written.rows_exported
    );
    Ok(())
}

fn show_reports(result: &ReconResult) {
    for check in &result.checks {
        let Some(report) = check.report() else { continue };
        for sheet in &report.sheets {
            println!("== {} / {} ({} row(s))", check.name, sheet.name, sheet.table.len());
            println!("{}", numbered_table(&sheet.table));
            println!();
        }
    }
}

fn print_summary(config: &ReconConfig, result: &ReconResult) {
    for check in &result.checks {
        eprintln!("{}", check_line(config, check));
    }
    eprintln!("{}", run_line(result));
}

/// Failed checks win over differences.
fn exit_status(result: &ReconResult) -> Result<(), CliError> {
    for check in &result.checks {
        if let CheckOutcome::Failed { code, message } = &check.outcome {
            return Err(CliError::new(
                for_engine_code(code),
                format!("check '{}' failed: {message}", check.name),
            ));
        }
    }
    if result.has_differences() {
        return Err(CliError::new(EXIT_DIFFS, "differences found"));
    }
    Ok(())
}
