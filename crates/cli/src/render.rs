use custrecon_engine::config::CheckKind;
use custrecon_engine::model::{CheckOutcome, CheckResult, ReconResult};
use custrecon_engine::{ReconConfig, Table};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// Widest a single column is allowed to render.
const MAX_COLUMN_WIDTH: usize = 32;

// ---------------------------------------------------------------------------
// Text fitting
// ---------------------------------------------------------------------------

/// Truncate to `width` display columns, ending in ".." when cut.
fn truncate_display(s: &str, width: usize) -> String {
    if UnicodeWidthStr::width(s) <= width {
        return s.to_string();
    }
    if width < 3 {
        return s
            .chars()
            .find(|&ch| UnicodeWidthChar::width(ch).unwrap_or(0) <= width)
            .map(|ch| ch.to_string())
            .unwrap_or_default();
    }

    let budget = width - 2;
    let mut used = 0;
    let mut out = String::new();
    for ch in s.chars() {
        let cw = UnicodeWidthChar::width(ch).unwrap_or(0);
        if used + cw > budget {
            break;
        }
        used += cw;
        out.push(ch);
    }
    out.push_str("..");
    out
}

/// Pad or truncate to exactly `width` display columns.
fn fit(s: &str, width: usize) -> String {
    let s = truncate_display(s, width);
    let pad = width.saturating_sub(UnicodeWidthStr::width(s.as_str()));
    format!("{}{}", s, " ".repeat(pad))
}

// ---------------------------------------------------------------------------
// Tables
// ---------------------------------------------------------------------------

/// Render a table with a leading 1-based `#` column, aligned by display width.
pub fn numbered_table(table: &Table) -> String {
    let index_width = table.len().to_string().len().max(1);
    let widths: Vec<usize> = table
        .columns()
        .iter()
        .enumerate()
        .map(|(col, name)| {
            table
                .rows()
                .iter()
                .map(|r| UnicodeWidthStr::width(r[col].as_str()))
                .chain(std::iter::once(UnicodeWidthStr::width(name.as_str())))
                .max()
                .unwrap_or(0)
                .min(MAX_COLUMN_WIDTH)
        })
        .collect();

    let mut lines = Vec::with_capacity(table.len() + 2);

    let header: Vec<String> = std::iter::once(fit("#", index_width))
        .chain(table.columns().iter().zip(&widths).map(|(c, &w)| fit(c, w)))
        .collect();
    lines.push(header.join("  ").trim_end().to_string());

    let rule: Vec<String> = std::iter::once(index_width)
        .chain(widths.iter().copied())
        .map(|w| "-".repeat(w))
        .collect();
    lines.push(rule.join("  "));

    for (n, row) in table.numbered_rows() {
        let cells: Vec<String> = std::iter::once(fit(&n.to_string(), index_width))
            .chain(row.iter().zip(&widths).map(|(v, &w)| fit(v, w)))
            .collect();
        lines.push(cells.join("  ").trim_end().to_string());
    }

    lines.join("\n")
}

// ---------------------------------------------------------------------------
// Summaries
// ---------------------------------------------------------------------------

/// One human line per check.
pub fn check_line(config: &ReconConfig, check: &CheckResult) -> String {
    let left = config.label(&check.left);
    let right = config.label(&check.right);

    let summary = match &check.outcome {
        CheckOutcome::Failed { message, .. } => return format!("{}: error: {}", check.name, message),
        CheckOutcome::Completed { summary, .. } => summary,
    };

    let detail = match check.kind {
        CheckKind::KeyDiff => format!(
            "{left} not in {right}: {}, {right} not in {left}: {}",
            summary.left_only, summary.right_only
        ),
        CheckKind::FieldMapping => format!(
            "{} of {} {left} rows mismatched ({} key not found), {right} not in {left}: {}",
            summary.mismatched, summary.left_rows, summary.not_found, summary.right_only
        ),
        CheckKind::Grouped => format!(
            "{} of {} {left} rows mismatched ({} key not found in {right})",
            summary.mismatched, summary.left_rows, summary.not_found
        ),
        CheckKind::Merge => format!(
            "{} merged rows from {left} + {right}",
            summary.merged_rows.unwrap_or(0)
        ),
    };

    let status = if summary.is_clean() { "ok" } else { "DIFF" };
    format!("{}: {status}: {detail}", check.name)
}

pub fn run_line(result: &ReconResult) -> String {
    let s = &result.summary;
    format!(
        "{}: {} check(s), {} clean, {} with differences, {} failed",
        result.meta.config_name, s.checks, s.clean, s.with_differences, s.failed
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_fits_and_cuts() {
        assert_eq!(truncate_display("abc", 3), "abc");
        assert_eq!(truncate_display("abcdef", 5), "abc..");
        assert_eq!(truncate_display("abc", 2), "a");
        assert_eq!(truncate_display("", 0), "");
    }

    #[test]
    fn truncate_cjk_boundary() {
        // "世界你好" is 8 display cols
        let t = truncate_display("\u{4e16}\u{754c}\u{4f60}\u{597d}", 6);
        assert_eq!(t, "\u{4e16}\u{754c}..");
    }

    #[test]
    fn fit_pads_wide_chars() {
        assert_eq!(fit("\u{4e16}", 4), "\u{4e16}  ");
        assert_eq!(fit("ab", 4), "ab  ");
    }

    #[test]
    fn numbered_table_layout() {
        let table = Table::new(
            vec!["Customer".into(), "City".into()],
            vec![vec!["1".into(), "Paris".into()], vec!["22".into(), "Zürich".into()]],
        )
        .unwrap();
        let out = numbered_table(&table);
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0], "#  Customer  City");
        assert_eq!(lines[1], "-  --------  ------");
        assert_eq!(lines[2], "1  1         Paris");
        assert_eq!(lines[3], "2  22        Zürich");
    }

    #[test]
    fn numbered_table_without_rows() {
        let table = Table::new(vec!["Customer".into()], Vec::new()).unwrap();
        assert_eq!(numbered_table(&table), "#  Customer\n-  --------");
    }
}
