//! Fault code exports (`fault0*.csv`)
//!
//! Layout: line 0 is a title, lines 1-4 are `key,value` header pairs naming the
//! machine model and serial, and the fault table starts at line 28 without a
//! header row.

use std::collections::HashMap;
use std::path::Path;

use chrono::{DateTime, Duration, NaiveDateTime};
use rusqlite::types::Value;

use crate::core::error::{GtError, Result};
use crate::core::record::{fmt_datetime, opt, ImportRecord, RecordKey};
use crate::core::store::Table;
use crate::core::units::UnitRegistry;
use crate::import::records::{csv_rows, field, is_blank, parse_i64, read_text, row_error, to_snake};

const HEADER_START: usize = 1;
const HEADER_LINES: usize = 4;
const DATA_START: usize = 28;

/// One fault occurrence
#[derive(Debug, Clone, PartialEq)]
pub struct FaultRecord {
    pub unit: String,
    pub code: String,
    pub time_from: NaiveDateTime,
    pub time_to: Option<NaiveDateTime>,
    pub fault_count: Option<i64>,
    pub message: Option<String>,
}

impl ImportRecord for FaultRecord {
    const TABLE: Table = Table::Faults;

    fn key(&self) -> RecordKey {
        vec![
            self.unit.clone(),
            self.code.clone(),
            fmt_datetime(&self.time_from),
        ]
    }

    fn unit(&self) -> &str {
        &self.unit
    }

    fn values(&self) -> Vec<Value> {
        vec![
            self.unit.clone().into(),
            self.code.clone().into(),
            fmt_datetime(&self.time_from).into(),
            opt(self.time_to.as_ref().map(fmt_datetime)),
            opt(self.fault_count),
            opt(self.message.clone()),
        ]
    }
}

/// Parse `epoch|tzoffset` into naive UTC shifted by the offset
pub fn parse_fault_time(s: &str) -> Option<NaiveDateTime> {
    let (t, tz) = s.trim().split_once('|')?;
    let t: i64 = t.trim().parse().ok()?;
    let tz: i64 = tz.trim().parse().ok()?;
    let base = DateTime::from_timestamp(t, 0)?.naive_utc();
    base.checked_add_signed(Duration::seconds(tz))
}

/// Snake-cased `key -> value` pairs from the header lines
fn read_header(text: &str) -> Result<HashMap<String, String>> {
    let rows = csv_rows(text, HEADER_START)?;
    Ok(rows
        .iter()
        .take(HEADER_LINES)
        .filter_map(|row| {
            let key = field(row, 0)?;
            Some((to_snake(key), field(row, 1).unwrap_or_default().to_string()))
        })
        .collect())
}

/// Unit named by a fault file's serial number header
///
/// Returns `Ok(None)` when the header is readable but no single unit matches.
pub fn unit_from_fault(path: &Path, registry: &UnitRegistry) -> Result<Option<String>> {
    let text = read_text(path)?;
    unit_from_header(path, &text, registry)
}

fn unit_from_header(path: &Path, text: &str, registry: &UnitRegistry) -> Result<Option<String>> {
    let header = read_header(text)?;
    let get = |k: &str| {
        header
            .get(k)
            .ok_or_else(|| GtError::parse(path, format!("missing header '{}'", k)))
    };

    let model = format!(
        "{}{}",
        get("machine_model")?,
        get("machine_type_minor_variation_code")?
    );
    let serial = get("machine_serial_no")?;

    Ok(registry.unit_from_serial(serial, Some(&model), None))
}

/// Read all fault rows from a file
pub fn read_fault(path: &Path, registry: &UnitRegistry) -> Result<Vec<FaultRecord>> {
    let text = read_text(path)?;
    let unit = unit_from_header(path, &text, registry)?
        .ok_or_else(|| GtError::parse(path, "couldn't get unit from fault header"))?;

    let mut out = Vec::new();
    for (i, row) in csv_rows(&text, DATA_START)?.iter().enumerate() {
        if is_blank(row) {
            continue;
        }
        let line = DATA_START + i;

        let code = field(row, 1)
            .ok_or_else(|| row_error(path, line, "missing fault code"))?
            .replace('#', "");

        let time_from = field(row, 3)
            .and_then(parse_fault_time)
            .ok_or_else(|| row_error(path, line, "bad time_from"))?;

        out.push(FaultRecord {
            unit: unit.clone(),
            code,
            time_from,
            time_to: field(row, 5).and_then(parse_fault_time),
            fault_count: parse_i64(field(row, 7)),
            message: field(row, 8).map(str::to_string),
        });
    }

    tracing::debug!("{} fault rows: {}", out.len(), path.display());
    Ok(out)
}
