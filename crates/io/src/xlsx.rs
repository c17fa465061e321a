// Excel file import (xlsx, xls, xlsb, ods) and report export (xlsx only)
//
// Import: cell values only, rendered as text the way the sheet shows them.
// Export: one worksheet per report sheet, header row bold and frozen.

use std::io::{Cursor, Read, Seek};
use std::path::Path;

use calamine::{open_workbook_auto, open_workbook_auto_from_rs, Data, Reader, Sheets};
use chrono::{Duration, NaiveDate};
use custrecon_engine::report::Report;
use custrecon_engine::{RawTable, Table};
use rust_xlsxwriter::{Format, Workbook as XlsxWorkbook, Worksheet};

/// Maximum dimensions read from a sheet
const MAX_ROWS: usize = 1_048_576;
const MAX_COLS: usize = 16_384;

/// Read one worksheet (the first when `sheet` is `None`) from a workbook file.
pub fn read_raw(path: &Path, sheet: Option<&str>) -> Result<RawTable, String> {
    let mut workbook: Sheets<_> = open_workbook_auto(path)
        .map_err(|e| format!("Failed to open Excel file: {}", e))?;
    read_sheet(&mut workbook, sheet)
}

/// Read one worksheet from in-memory workbook bytes.
pub fn read_raw_from_bytes(bytes: Vec<u8>, sheet: Option<&str>) -> Result<RawTable, String> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))
        .map_err(|e| format!("Failed to open Excel data: {}", e))?;
    read_sheet(&mut workbook, sheet)
}

fn read_sheet<RS: Read + Seek>(workbook: &mut Sheets<RS>, sheet: Option<&str>) -> Result<RawTable, String> {
    let sheet_names: Vec<String> = workbook.sheet_names().to_vec();
    if sheet_names.is_empty() {
        return Err("Excel file contains no sheets".to_string());
    }

    let sheet_name = match sheet {
        Some(wanted) => sheet_names
            .iter()
            .find(|n| n.as_str() == wanted)
            .ok_or_else(|| format!("Sheet '{}' not found (available: {})", wanted, sheet_names.join(", ")))?
            .clone(),
        None => sheet_names[0].clone(),
    };

    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|e| format!("Failed to read sheet '{}': {}", sheet_name, e))?;

    let (height, width) = range.get_size();
    if height == 0 || width == 0 {
        return Ok(RawTable::default());
    }

    // Range start offset (data may not begin at A1). Header offsets count
    // from the top of the sheet, so leading blank rows are kept.
    let (data_start_row, data_start_col) = range.start().unwrap_or((0, 0));
    let (start_row, start_col) = (data_start_row as usize, data_start_col as usize);

    let mut rows: Vec<Vec<Option<String>>> = vec![Vec::new(); start_row.min(MAX_ROWS)];
    for row in range.rows() {
        if rows.len() >= MAX_ROWS {
            tracing::warn!(sheet = %sheet_name, limit = MAX_ROWS, "sheet truncated");
            break;
        }
        let mut cells: Vec<Option<String>> = vec![None; start_col.min(MAX_COLS)];
        cells.extend(row.iter().take(MAX_COLS.saturating_sub(start_col)).map(cell_text));
        rows.push(cells);
    }

    tracing::debug!(sheet = %sheet_name, rows = rows.len(), "worksheet read");
    Ok(RawTable::new(rows))
}

/// Cell value as displayed text. `None` for empty cells.
fn cell_text(cell: &Data) -> Option<String> {
    match cell {
        Data::Empty => None,
        Data::String(s) => {
            if s.is_empty() {
                None
            } else {
                Some(s.clone())
            }
        }
        Data::Float(n) => {
            // Format nicely: integers without decimals
            if n.fract() == 0.0 && n.abs() < 1e15 {
                Some(format!("{}", *n as i64))
            } else {
                Some(format!("{}", n))
            }
        }
        Data::Int(n) => Some(format!("{}", n)),
        Data::Bool(b) => Some(if *b { "TRUE" } else { "FALSE" }.to_string()),
        Data::Error(e) => Some(format!("#{:?}", e)),
        Data::DateTime(dt) => Some(format_serial(dt.as_f64())),
        Data::DateTimeIso(s) => Some(s.clone()),
        Data::DurationIso(s) => Some(s.clone()),
    }
}

/// Excel serial (1900 system) as `YYYY-MM-DD`, with the time when present.
fn format_serial(serial: f64) -> String {
    let Some(epoch) = NaiveDate::from_ymd_opt(1899, 12, 30) else {
        return format!("{}", serial);
    };
    let days = serial.floor() as i64;
    let seconds = ((serial - serial.floor()) * 86_400.0).round() as i64;
    let Some(stamp) = epoch
        .and_hms_opt(0, 0, 0)
        .and_then(|midnight| midnight.checked_add_signed(Duration::days(days) + Duration::seconds(seconds)))
    else {
        return format!("{}", serial);
    };

    if seconds == 0 {
        stamp.format("%Y-%m-%d").to_string()
    } else {
        stamp.format("%Y-%m-%d %H:%M:%S").to_string()
    }
}

// ---------------------------------------------------------------------------
// Export
// ---------------------------------------------------------------------------

/// Export statistics
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ExportResult {
    pub sheets_exported: usize,
    pub rows_exported: usize,
}

/// Write every report sheet to an xlsx file.
pub fn export_report(report: &Report, path: &Path) -> Result<ExportResult, String> {
    let (mut workbook, result) = build_workbook(report)?;
    workbook
        .save(path)
        .map_err(|e| format!("Failed to save XLSX file: {}", e))?;
    tracing::debug!(path = %path.display(), sheets = result.sheets_exported, "report exported");
    Ok(result)
}

/// Write every report sheet to an in-memory xlsx file.
pub fn export_report_to_buffer(report: &Report) -> Result<Vec<u8>, String> {
    let (mut workbook, _) = build_workbook(report)?;
    workbook
        .save_to_buffer()
        .map_err(|e| format!("Failed to build XLSX data: {}", e))
}

fn build_workbook(report: &Report) -> Result<(XlsxWorkbook, ExportResult), String> {
    let mut workbook = XlsxWorkbook::new();
    let mut result = ExportResult::default();
    let header_format = Format::new().set_bold();

    for sheet in &report.sheets {
        let worksheet = workbook
            .add_worksheet()
            .set_name(&sheet.name)
            .map_err(|e| format!("Failed to create sheet '{}': {}", sheet.name, e))?;
        write_table(worksheet, &sheet.table, &header_format)?;
        result.sheets_exported += 1;
        result.rows_exported += sheet.table.len();
    }

    // A workbook needs at least one sheet
    if report.is_empty() {
        workbook.add_worksheet();
    }

    Ok((workbook, result))
}

fn write_table(worksheet: &mut Worksheet, table: &Table, header_format: &Format) -> Result<(), String> {
    for (col, name) in table.columns().iter().enumerate() {
        worksheet
            .write_string_with_format(0, col as u16, name, header_format)
            .map_err(|e| format!("Failed to write header '{}': {}", name, e))?;
    }

    for (row_idx, row) in table.rows().iter().enumerate() {
        let target_row = (row_idx + 1) as u32;
        for (col, value) in row.iter().enumerate() {
            if value.is_empty() {
                continue;
            }
            worksheet
                .write_string(target_row, col as u16, value)
                .map_err(|e| format!("Failed to write cell: {}", e))?;
        }
    }

    worksheet
        .set_freeze_panes(1, 0)
        .map_err(|e| format!("Failed to freeze header: {}", e))?;
    worksheet.autofit();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn table(cols: &[&str], rows: &[&[&str]]) -> Table {
        Table::new(
            cols.iter().map(|c| c.to_string()).collect(),
            rows.iter()
                .map(|r| r.iter().map(|c| c.to_string()).collect())
                .collect(),
        )
        .unwrap()
    }

    fn two_sheet_report() -> Report {
        let mut report = Report::default();
        report.push("KNA1_Not_in_KNVV", table(&["Customer", "Name"], &[&["0010", "Acme"], &["2", ""]]));
        report.push("KNVV_Not_in_KNA1", table(&["Customer"], &[]));
        report
    }

    #[test]
    fn test_export_report_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("report.xlsx");

        let result = export_report(&two_sheet_report(), &path).unwrap();
        assert_eq!(result.sheets_exported, 2);
        assert_eq!(result.rows_exported, 2);

        let raw = read_raw(&path, Some("KNA1_Not_in_KNVV")).unwrap();
        assert_eq!(raw.rows[0], vec![Some("Customer".to_string()), Some("Name".to_string())]);
        // Leading zeros survive as text
        assert_eq!(raw.rows[1][0].as_deref(), Some("0010"));
        assert_eq!(raw.rows[2].get(1).cloned().flatten(), None);

        let empty = read_raw(&path, Some("KNVV_Not_in_KNA1")).unwrap();
        assert_eq!(empty.len(), 1);
    }

    #[test]
    fn test_read_first_sheet_by_default() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("report.xlsx");
        export_report(&two_sheet_report(), &path).unwrap();

        let raw = read_raw(&path, None).unwrap();
        assert_eq!(raw.len(), 3);
    }

    #[test]
    fn test_missing_sheet_names_available() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("report.xlsx");
        export_report(&two_sheet_report(), &path).unwrap();

        let err = read_raw(&path, Some("Nope")).unwrap_err();
        assert!(err.contains("Sheet 'Nope' not found"));
        assert!(err.contains("KNA1_Not_in_KNVV"));
    }

    #[test]
    fn test_buffer_roundtrip() {
        let bytes = export_report_to_buffer(&two_sheet_report()).unwrap();
        let raw = read_raw_from_bytes(bytes, Some("KNA1_Not_in_KNVV")).unwrap();
        assert_eq!(raw.rows[1][1].as_deref(), Some("Acme"));
    }

    #[test]
    fn test_leading_blank_rows_kept() {
        let mut workbook = XlsxWorkbook::new();
        let worksheet = workbook.add_worksheet();
        worksheet.write_string(4, 0, "Customer").unwrap();
        worksheet.write_number(6, 0, 42.0).unwrap();
        worksheet.write_number(7, 0, 2.5).unwrap();
        let bytes = workbook.save_to_buffer().unwrap();

        let raw = read_raw_from_bytes(bytes, None).unwrap();
        assert_eq!(raw.rows[4][0].as_deref(), Some("Customer"));
        assert_eq!(raw.rows[6][0].as_deref(), Some("42"));
        assert_eq!(raw.rows[7][0].as_deref(), Some("2.5"));
    }

    #[test]
    fn test_not_a_workbook() {
        let err = read_raw_from_bytes(b"Customer,Name\n1,A\n".to_vec(), None).unwrap_err();
        assert!(err.starts_with("Failed to open Excel data"));
    }

    #[test]
    fn test_format_serial() {
        assert_eq!(format_serial(45292.0), "2024-01-01");
        assert_eq!(format_serial(45292.5), "2024-01-01 12:00:00");
    }
}
