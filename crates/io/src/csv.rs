// CSV/TSV import/export

use std::io::Read;
use std::path::Path;

use custrecon_engine::{RawTable, Table};

pub fn read_raw(path: &Path) -> Result<RawTable, String> {
    let content = read_file_as_utf8(path)?;
    let delimiter = sniff_delimiter(&content);
    read_raw_from_str(&content, delimiter)
}

pub fn read_raw_tsv(path: &Path) -> Result<RawTable, String> {
    let content = read_file_as_utf8(path)?;
    read_raw_from_str(&content, b'\t')
}

/// Detect the most likely field delimiter by checking consistency across the first few lines.
///
/// For each candidate (tab, semicolon, comma, pipe), count fields per line. The delimiter
/// that produces the most consistent field count (>1 field) wins.
pub fn sniff_delimiter(content: &str) -> u8 {
    let candidates: &[u8] = &[b'\t', b';', b',', b'|'];
    let sample_lines: Vec<&str> = content
        .lines()
        .filter(|l| !l.trim().is_empty())
        .take(10)
        .collect();

    if sample_lines.is_empty() {
        return b',';
    }

    let mut best = b',';
    let mut best_score = 0u64;

    for &delim in candidates {
        let counts: Vec<usize> = sample_lines
            .iter()
            .map(|line| {
                csv::ReaderBuilder::new()
                    .delimiter(delim)
                    .has_headers(false)
                    .flexible(true)
                    .from_reader(line.as_bytes())
                    .records()
                    .next()
                    .and_then(|r| r.ok())
                    .map(|r| r.len())
                    .unwrap_or(1)
            })
            .collect();

        // Title rows above a header are often a single field, so score on
        // the widest line rather than the first
        let target = counts.iter().copied().max().unwrap_or(0);
        if target <= 1 {
            continue;
        }

        let consistent = counts.iter().filter(|&&c| c == target).count() as u64;
        let score = consistent * target as u64;

        if score > best_score {
            best_score = score;
            best = delim;
        }
    }

    best
}

/// Read file and convert to UTF-8 if needed (handles Windows-1252, Latin-1, etc.)
pub fn read_file_as_utf8(path: &Path) -> Result<String, String> {
    let mut file = std::fs::File::open(path).map_err(|e| format!("{}: {}", path.display(), e))?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes).map_err(|e| e.to_string())?;

    // Try UTF-8 first; on failure, recover the buffer from the error
    match String::from_utf8(bytes) {
        Ok(s) => Ok(s),
        Err(e) => {
            let bytes = e.into_bytes();
            // Fall back to Windows-1252 (common for Excel-exported CSVs)
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(&bytes);
            Ok(decoded.into_owned())
        }
    }
}

/// Parse delimited text into raw rows. Blank lines stay in place so header
/// offsets line up with spreadsheet row numbers.
pub fn read_raw_from_str(content: &str, delimiter: u8) -> Result<RawTable, String> {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);
    let bytes = content.as_bytes();
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(bytes);

    let mut rows: Vec<Vec<Option<String>>> = Vec::new();
    let mut record = csv::StringRecord::new();
    // Byte just past the previous record, as far as the reader consumed it
    let mut consumed: Option<usize> = None;

    while reader.read_record(&mut record).map_err(|e| e.to_string())? {
        // The reader skips blank lines; put them back by scanning the bytes
        // between the previous record and this one
        let mut pos = match consumed {
            Some(end) => past_terminator(bytes, end),
            None => 0,
        };
        while let Some(len) = terminator_len(bytes, pos) {
            rows.push(Vec::new());
            pos += len;
        }

        rows.push(
            record
                .iter()
                .map(|field| if field.is_empty() { None } else { Some(field.to_string()) })
                .collect(),
        );
        consumed = Some(reader.position().byte() as usize);
    }

    Ok(RawTable::new(rows))
}

/// Length of the line terminator starting at `pos`, if any.
fn terminator_len(bytes: &[u8], pos: usize) -> Option<usize> {
    match (bytes.get(pos), bytes.get(pos + 1)) {
        (Some(b'\r'), Some(b'\n')) => Some(2),
        (Some(b'\n'), _) | (Some(b'\r'), _) => Some(1),
        _ => None,
    }
}

/// First byte after the terminator that ends a record at `end`. The reader
/// may stop before the terminator, after it, or between `\r` and `\n`.
fn past_terminator(bytes: &[u8], end: usize) -> usize {
    match end.checked_sub(1).and_then(|i| bytes.get(i)) {
        Some(b'\r') if bytes.get(end) == Some(&b'\n') => end + 1,
        Some(b'\r') | Some(b'\n') => end,
        _ => end + terminator_len(bytes, end).unwrap_or(0),
    }
}

pub fn export_table(table: &Table, path: &Path) -> Result<(), String> {
    export_with_delimiter(table, path, b',')
}

pub fn export_table_tsv(table: &Table, path: &Path) -> Result<(), String> {
    export_with_delimiter(table, path, b'\t')
}

fn export_with_delimiter(table: &Table, path: &Path, delimiter: u8) -> Result<(), String> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .from_path(path)
        .map_err(|e| e.to_string())?;

    writer.write_record(table.columns()).map_err(|e| e.to_string())?;
    for row in table.rows() {
        writer.write_record(row).map_err(|e| e.to_string())?;
    }

    writer.flush().map_err(|e| e.to_string())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use custrecon_engine::{normalize, HeaderLayout};
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_sniff_semicolon_delimiter() {
        let content = "Customer;Name;City\n1;Acme;Paris\n2;Bolt;London\n";
        assert_eq!(sniff_delimiter(content), b';');
    }

    #[test]
    fn test_sniff_comma_delimiter() {
        let content = "Customer,Name,City\n1,Acme,Paris\n2,Bolt,London\n";
        assert_eq!(sniff_delimiter(content), b',');
    }

    #[test]
    fn test_sniff_tab_delimiter() {
        let content = "Customer\tName\tCity\n1\tAcme\tParis\n2\tBolt\tLondon\n";
        assert_eq!(sniff_delimiter(content), b'\t');
    }

    #[test]
    fn test_sniff_semicolon_with_commas_in_values() {
        let content = "Customer;Street;City\n1;\"12 Main St, Apt 4\";Paris\n2;\"456 Elm\";London\n";
        assert_eq!(sniff_delimiter(content), b';');
    }

    #[test]
    fn test_sniff_past_title_rows() {
        let content = "Customer master export\n\nSelection: all\n\nCustomer;Name\n\n1;Acme\n2;Bolt\n";
        assert_eq!(sniff_delimiter(content), b';');
    }

    #[test]
    fn test_blank_lines_keep_offsets() {
        let raw = read_raw_from_str("Title\n\n\n\nCustomer,Name\n\n1,Acme\n", b',').unwrap();
        assert_eq!(raw.len(), 7);
        assert_eq!(raw.rows[4], vec![Some("Customer".to_string()), Some("Name".to_string())]);
        assert!(raw.rows[5].is_empty());
        assert_eq!(raw.rows[6][1].as_deref(), Some("Acme"));
    }

    #[test]
    fn test_report_export_shape() {
        // title, blank, title, blank, header, blank spacer, data
        let raw = read_raw_from_str("T\n\nS\n\nCustomer,Street\n\n1,Main\n2,Elm\n", b',').unwrap();
        assert_eq!(raw.len(), 8);
        assert_eq!(raw.rows[0], vec![Some("T".to_string())]);
        assert!(raw.rows[1].is_empty());
        assert_eq!(raw.rows[2], vec![Some("S".to_string())]);
        assert!(raw.rows[3].is_empty());
        assert_eq!(raw.rows[4][0].as_deref(), Some("Customer"));
        assert!(raw.rows[5].is_empty());
        assert_eq!(raw.rows[6][1].as_deref(), Some("Main"));
        assert_eq!(raw.rows[7][1].as_deref(), Some("Elm"));

        let table = normalize(&raw, &HeaderLayout::offset(), "kna1").unwrap();
        assert_eq!(table.columns(), ["Customer", "Street"]);
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_crlf_blank_lines() {
        let raw = read_raw_from_str("T\r\n\r\nCustomer\r\n\r\n1\r\n", b',').unwrap();
        assert_eq!(raw.len(), 5);
        assert!(raw.rows[1].is_empty());
        assert_eq!(raw.rows[2][0].as_deref(), Some("Customer"));
        assert!(raw.rows[3].is_empty());
        assert_eq!(raw.rows[4][0].as_deref(), Some("1"));
    }

    #[test]
    fn test_quoted_newline_is_one_row() {
        let raw = read_raw_from_str("Customer,Street\n1,\"Main\nSt\"\n\n2,Elm\n", b',').unwrap();
        assert_eq!(raw.len(), 4);
        assert_eq!(raw.rows[1][1].as_deref(), Some("Main\nSt"));
        assert!(raw.rows[2].is_empty());
        assert_eq!(raw.rows[3][0].as_deref(), Some("2"));
    }

    #[test]
    fn test_fixture_header_lands_on_offset_row() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../cli/tests/fixtures/kna1.csv");
        let raw = read_raw(&path).unwrap();
        assert_eq!(raw.rows[4][0].as_deref(), Some("Customer"));
        assert!(raw.rows[5].is_empty());
        assert_eq!(raw.rows[6][0].as_deref(), Some("1001"));
    }

    #[test]
    fn test_empty_fields_are_none_and_bom_stripped() {
        let raw = read_raw_from_str("\u{feff}Customer,Name\n1,\n", b',').unwrap();
        assert_eq!(raw.rows[0][0].as_deref(), Some("Customer"));
        assert_eq!(raw.rows[1], vec![Some("1".to_string()), None]);
    }

    #[test]
    fn test_windows_1252_fallback() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("latin.csv");
        // "Müller" in Windows-1252
        fs::write(&path, b"Customer,Name\n1,M\xfcller\n").unwrap();

        let raw = read_raw(&path).unwrap();
        assert_eq!(raw.rows[1][1].as_deref(), Some("Müller"));
    }

    #[test]
    fn test_tsv_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.tsv");

        let table = Table::new(
            vec!["Customer".into(), "Street".into()],
            vec![vec!["1".into(), "12 Main St, Apt 4".into()], vec!["2".into(), String::new()]],
        )
        .unwrap();
        export_table_tsv(&table, &path).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains('\t'), "TSV should contain tab characters");

        let raw = read_raw_tsv(&path).unwrap();
        assert_eq!(raw.rows[0][1].as_deref(), Some("Street"));
        assert_eq!(raw.rows[1][1].as_deref(), Some("12 Main St, Apt 4"));
        assert_eq!(raw.rows[2][1], None);
    }

    #[test]
    fn test_missing_file_names_path() {
        let err = read_raw(Path::new("/nonexistent/customers.csv")).unwrap_err();
        assert!(err.contains("customers.csv"));
    }
}
