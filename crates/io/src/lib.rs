// File I/O operations

pub mod csv;
pub mod xlsx;

use std::path::Path;

use custrecon_engine::report::{Report, MERGED_SHEET};
use custrecon_engine::{RawTable, Table};

/// Input file families, by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Csv,
    Tsv,
    Workbook,
}

impl FileKind {
    pub fn from_path(path: &Path) -> Result<Self, String> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "csv" | "txt" => Ok(Self::Csv),
            "tsv" | "tab" => Ok(Self::Tsv),
            "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => Ok(Self::Workbook),
            "" => Err(format!("{}: no file extension, cannot tell the format", path.display())),
            other => Err(format!("{}: unsupported file type '.{}'", path.display(), other)),
        }
    }
}

/// Load a raw table from a CSV/TSV file or one worksheet of a workbook.
/// `sheet` is ignored for delimited files.
pub fn load_raw(path: &Path, sheet: Option<&str>) -> Result<RawTable, String> {
    let raw = match FileKind::from_path(path)? {
        FileKind::Csv => csv::read_raw(path)?,
        FileKind::Tsv => csv::read_raw_tsv(path)?,
        FileKind::Workbook => xlsx::read_raw(path, sheet)?,
    };
    tracing::debug!(path = %path.display(), rows = raw.len(), "raw table loaded");
    Ok(raw)
}

/// Write a report workbook. Always xlsx, whatever the extension says.
pub fn export_report(report: &Report, path: &Path) -> Result<xlsx::ExportResult, String> {
    xlsx::export_report(report, path)
}

/// Write a single table: delimited text for `.csv`/`.tsv`, else a one-sheet
/// workbook.
pub fn export_table(table: &Table, path: &Path) -> Result<(), String> {
    match FileKind::from_path(path) {
        Ok(FileKind::Csv) => csv::export_table(table, path),
        Ok(FileKind::Tsv) => csv::export_table_tsv(table, path),
        _ => {
            let mut report = Report::default();
            report.push(MERGED_SHEET, table.clone());
            xlsx::export_report(&report, path).map(|_| ())
        }
    }
}
