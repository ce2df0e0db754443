//! Shared helpers for reading vendor csv exports
//!
//! Vendor exports carry free-form preamble lines before the table, so files are
//! read as text, the preamble is skipped by raw line count, and the rest is fed
//! to a header-less, flexible csv reader.

use std::fs;
use std::path::Path;

use chrono::{NaiveDate, NaiveDateTime};
use csv::{ReaderBuilder, StringRecord};

use crate::core::error::{GtError, Result};

/// Read a file as text, tolerating non-UTF-8 bytes
pub fn read_text(path: &Path) -> Result<String> {
    let bytes = fs::read(path)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Parse csv rows from `text`, skipping `skip_lines` raw lines first
pub fn csv_rows(text: &str, skip_lines: usize) -> Result<Vec<StringRecord>> {
    let body = text.lines().skip(skip_lines).collect::<Vec<_>>().join("\n");

    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(body.as_bytes());

    let mut rows = Vec::new();
    for record in reader.records() {
        rows.push(record?);
    }
    Ok(rows)
}

/// Parse csv rows where line `header_line` holds the column names
///
/// Returns the trimmed header and the data rows below it.
pub fn csv_table(text: &str, header_line: usize) -> Result<(Vec<String>, Vec<StringRecord>)> {
    let mut rows = csv_rows(text, header_line)?.into_iter();
    let header = rows
        .next()
        .map(|h| h.iter().map(|c| c.trim().to_string()).collect())
        .unwrap_or_default();
    Ok((header, rows.collect()))
}

/// Index of a named column
pub fn column_index(header: &[String], name: &str) -> Option<usize> {
    header.iter().position(|h| h == name)
}

/// Trimmed field, None when missing or empty
pub fn field<'a>(row: &'a StringRecord, idx: usize) -> Option<&'a str> {
    row.get(idx).map(str::trim).filter(|s| !s.is_empty())
}

/// Row with no non-empty fields
pub fn is_blank(row: &StringRecord) -> bool {
    row.iter().all(|c| c.trim().is_empty())
}

/// Lowercase snake case for header keys, e.g. `Machine Serial No.` -> `machine_serial_no`
pub fn to_snake(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.trim().chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c.to_ascii_lowercase());
        } else if c == '#' {
            out.push_str("no");
        } else if matches!(c, ' ' | '-' | '_' | '\n') && !out.ends_with('_') {
            out.push('_');
        }
    }
    out.trim_matches('_').to_string()
}

/// `H:M:S` duration string to seconds
pub fn hms_to_seconds(s: &str) -> Option<i64> {
    let mut parts = s.trim().split(':');
    let h: i64 = parts.next()?.trim().parse().ok()?;
    let m: i64 = parts.next()?.trim().parse().ok()?;
    let sec: f64 = parts.next()?.trim().parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some(h * 3600 + m * 60 + sec as i64)
}

/// Numeric field with embedded spaces removed, e.g. `1 234.5`
pub fn parse_f64(s: Option<&str>) -> Option<f64> {
    s.map(|v| v.replace([' ', ','], ""))
        .and_then(|v| v.parse().ok())
}

pub fn parse_i64(s: Option<&str>) -> Option<i64> {
    parse_f64(s).map(|v| v as i64)
}

/// Try a list of datetime formats, falling back to date-only formats at midnight
pub fn parse_datetime_any(s: &str, formats: &[&str]) -> Option<NaiveDateTime> {
    let s = s.trim();
    formats
        .iter()
        .find_map(|f| NaiveDateTime::parse_from_str(s, f).ok())
        .or_else(|| {
            formats
                .iter()
                .find_map(|f| NaiveDate::parse_from_str(s, f).ok())
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

/// Build a parse error naming the row
pub fn row_error(path: &Path, row: usize, message: impl std::fmt::Display) -> GtError {
    GtError::parse(path, format!("row {}: {}", row, message))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_csv_rows_skips_raw_lines() {
        let text = "preamble\n\nmore,stuff\na,b\nc,d,e\n";
        let rows = csv_rows(text, 3).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(&rows[1][2], "e");
    }

    #[test]
    fn test_csv_table_header() {
        let text = "x\n Date , Time \n01/02/21,10:00:00\n";
        let (header, rows) = csv_table(text, 1).unwrap();
        assert_eq!(header, vec!["Date", "Time"]);
        assert_eq!(column_index(&header, "Time"), Some(1));
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn test_to_snake() {
        assert_eq!(to_snake("Machine Serial No."), "machine_serial_no");
        assert_eq!(to_snake("  Cust Unit "), "cust_unit");
        assert_eq!(to_snake("Frame SN"), "frame_sn");
        assert_eq!(to_snake("Truck #"), "truck_no");
    }

    #[test]
    fn test_hms_to_seconds() {
        assert_eq!(hms_to_seconds("00:01:05"), Some(65));
        assert_eq!(hms_to_seconds("1:00:00"), Some(3600));
        assert_eq!(hms_to_seconds("bad"), None);
    }

    #[test]
    fn test_parse_numbers() {
        assert_eq!(parse_f64(Some(" 1 234.5")), Some(1234.5));
        assert_eq!(parse_f64(Some("")), None);
        assert_eq!(parse_i64(Some("12")), Some(12));
        assert_eq!(parse_f64(None), None);
    }

    #[test]
    fn test_parse_datetime_any() {
        let fmts = ["%m/%d/%y %H:%M:%S", "%Y-%m-%d"];
        assert!(parse_datetime_any("01/31/21 10:11:12", &fmts).is_some());
        assert_eq!(
            parse_datetime_any("2021-01-31", &fmts),
            NaiveDate::from_ymd_opt(2021, 1, 31).unwrap().and_hms_opt(0, 0, 0)
        );
        assert!(parse_datetime_any("nope", &fmts).is_none());
    }
}
