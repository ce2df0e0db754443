//! PLM haul cycle exports
//!
//! Two layouts are handled:
//! - haulcycle: six `Key: Value` header lines naming the unit and frame serial,
//!   column header on line 8, and two trailing checksum rows
//! - PLM3: column header on line 7 with a `Truck #` column, followed by an
//!   unrelated alarm table after the first blank row

use std::collections::HashMap;
use std::path::Path;

use chrono::{Local, NaiveDateTime};
use csv::StringRecord;
use rusqlite::types::Value;

use crate::core::error::{GtError, Result};
use crate::core::record::{fmt_datetime, opt, ImportRecord, RecordKey};
use crate::core::store::Table;
use crate::core::units::{fix_suncor_unit, minesite_from_path};
use crate::import::records::{
    csv_rows, csv_table, field, hms_to_seconds, is_blank, parse_datetime_any, parse_f64, parse_i64,
    read_text, row_error, to_snake,
};
use crate::import::ImportContext;

const HEADER_LINES: usize = 6;
const HAULCYCLE_HEADER: usize = 8;
const PLM3_HEADER: usize = 7;
const CHECKSUM_ROWS: usize = 2;

const HAULCYCLE_FMT: &str = "%m/%d/%y %H:%M:%S";
const PLM3_FMTS: &[&str] = &[
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%y %H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%d-%b-%y %H:%M:%S",
];

/// Haulcycle column names
const COLUMNS: &[(&str, &str)] = &[
    ("Date", "date"),
    ("Time", "time"),
    ("Payload(Net)", "payload"),
    ("Swingloads", "swingloads"),
    ("Status Flag", "statusflag"),
    ("Carry Back", "carryback"),
    ("TotalCycle Time", "cycletime"),
    ("L-Haul Distance", "l_hauldistance"),
    ("L-Max Speed", "l_maxspeed"),
    ("E MaxSpeed", "e_maxspeed"),
    ("Max Sprung", "maxsprung"),
    ("Truck Type", "trucktype"),
    ("Tare Sprung Weight", "sprungweight"),
    ("Payload Est.@Shovel(Net)", "payload_est"),
    ("Quick Payload Estimate(Net)", "payload_quick"),
    ("Gross Payload", "payload_gross"),
];

/// PLM3 column names
const COLUMNS_PLM3: &[(&str, &str)] = &[
    ("Truck #", "unit"),
    ("Date", "date"),
    ("Time", "time"),
    ("Payload (Net)", "payload"),
    ("Swingloads", "swingloads"),
    ("Status Flags", "statusflag"),
    ("Carry Back", "carryback"),
    ("Total Cycle Time", "cycletime"),
    ("L-Haul Distance", "l_hauldistance"),
    ("L-Max Speed", "l_maxspeed"),
    ("E-Max Speed", "e_maxspeed"),
    ("Max Sprung", "maxsprung"),
    ("Truck Type", "trucktype"),
    ("Tare Sprung Weight", "sprungweight"),
    ("Payload Est. @ Shovel (Net)", "payload_est"),
    ("Quick Payload Estimate (Net)", "payload_quick"),
    ("Gross Payload", "payload_gross"),
];

/// One haul cycle
#[derive(Debug, Clone, PartialEq)]
pub struct PlmRecord {
    pub unit: String,
    pub datetime: NaiveDateTime,
    pub payload: Option<f64>,
    pub swingloads: Option<i64>,
    pub statusflag: Option<String>,
    pub carryback: Option<f64>,
    pub cycletime: Option<i64>,
    pub l_hauldistance: Option<f64>,
    pub l_maxspeed: Option<f64>,
    pub e_maxspeed: Option<f64>,
    pub maxsprung: Option<f64>,
    pub trucktype: Option<String>,
    pub sprungweight: Option<f64>,
    pub payload_est: Option<f64>,
    pub payload_quick: Option<f64>,
    pub payload_gross: Option<f64>,
}

impl ImportRecord for PlmRecord {
    const TABLE: Table = Table::Plm;

    fn key(&self) -> RecordKey {
        vec![self.unit.clone(), fmt_datetime(&self.datetime)]
    }

    fn unit(&self) -> &str {
        &self.unit
    }

    fn timestamp(&self) -> Option<NaiveDateTime> {
        Some(self.datetime)
    }

    fn values(&self) -> Vec<Value> {
        vec![
            self.unit.clone().into(),
            fmt_datetime(&self.datetime).into(),
            opt(self.payload),
            opt(self.swingloads),
            opt(self.statusflag.clone()),
            opt(self.carryback),
            opt(self.cycletime),
            opt(self.l_hauldistance),
            opt(self.l_maxspeed),
            opt(self.e_maxspeed),
            opt(self.maxsprung),
            opt(self.trucktype.clone()),
            opt(self.sprungweight),
            opt(self.payload_est),
            opt(self.payload_quick),
            opt(self.payload_gross),
        ]
    }
}

/// Field name -> column index for the columns present in a header
struct ColumnIndex(HashMap<&'static str, usize>);

impl ColumnIndex {
    fn new(header: &[String], names: &[(&str, &'static str)]) -> Self {
        Self(
            names
                .iter()
                .filter_map(|(src, dst)| header.iter().position(|h| h == src).map(|i| (*dst, i)))
                .collect(),
        )
    }

    fn require(&self, path: &Path, name: &str) -> Result<()> {
        if self.0.contains_key(name) {
            Ok(())
        } else {
            Err(GtError::parse(path, format!("missing column '{}'", name)))
        }
    }

    fn get<'r>(&self, row: &'r StringRecord, name: &str) -> Option<&'r str> {
        self.0.get(name).and_then(|&i| field(row, i))
    }

    /// True when every mapped column except date/time is empty
    fn values_blank(&self, row: &StringRecord) -> bool {
        self.0
            .iter()
            .filter(|(name, _)| !matches!(**name, "date" | "time"))
            .all(|(_, &i)| field(row, i).is_none())
    }

    fn record(&self, row: &StringRecord, unit: String, datetime: NaiveDateTime) -> PlmRecord {
        let text = |name| self.get(row, name).map(str::to_string);
        let num = |name| parse_f64(self.get(row, name));

        PlmRecord {
            unit,
            datetime,
            payload: num("payload"),
            swingloads: parse_i64(self.get(row, "swingloads")),
            statusflag: text("statusflag"),
            carryback: num("carryback"),
            cycletime: self.get(row, "cycletime").and_then(hms_to_seconds),
            l_hauldistance: num("l_hauldistance"),
            l_maxspeed: num("l_maxspeed"),
            e_maxspeed: num("e_maxspeed"),
            maxsprung: num("maxsprung"),
            trucktype: text("trucktype"),
            sprungweight: num("sprungweight"),
            payload_est: num("payload_est"),
            payload_quick: num("payload_quick"),
            payload_gross: num("payload_gross"),
        }
    }

    fn datetime(&self, row: &StringRecord) -> Option<String> {
        let date = self.get(row, "date")?;
        let time = self.get(row, "time")?;
        Some(format!("{} {}", date, time))
    }
}

/// Snake-cased `Key: Value` pairs from the first lines of a haulcycle file
fn read_header(text: &str) -> Result<HashMap<String, String>> {
    Ok(csv_rows(text, 0)?
        .iter()
        .take(HEADER_LINES)
        .filter_map(|row| {
            let (k, v) = field(row, 0)?.split_once(':')?;
            Some((to_snake(k), v.trim().to_string()))
        })
        .collect())
}

/// Unit named by a haulcycle file
///
/// Tries the customer unit, then the frame serial within the path's minesite,
/// then any unit appearing in the path. Errors when the header itself is
/// unreadable; `Ok(None)` when it is readable but names no known unit.
pub fn unit_from_haulcycle(path: &Path, ctx: ImportContext<'_>) -> Result<Option<String>> {
    let text = read_text(path)?;
    unit_from_header(path, &text, ctx)
}

fn unit_from_header(path: &Path, text: &str, ctx: ImportContext<'_>) -> Result<Option<String>> {
    tracing::debug!("Checking haulcycle file: {}", path.display());
    let header = read_header(text)?;

    let cust_unit = header
        .get("cust_unit")
        .ok_or_else(|| GtError::parse(path, "no 'Cust Unit' in haulcycle header"))?;
    let unit = fix_suncor_unit(&cust_unit.replace(' ', "").to_uppercase());

    if !unit.is_empty() && ctx.registry.exists(&unit) {
        return Ok(Some(unit));
    }

    let from_serial = match (minesite_from_path(path, ctx.config), header.get("frame_sn")) {
        (Some(minesite), Some(serial)) => ctx.registry.unit_from_serial(serial, None, Some(&minesite)),
        _ => None,
    };
    if from_serial.is_some() {
        return Ok(from_serial);
    }

    let from_path = ctx.registry.unit_from_path(path);
    if let Some(unit) = &from_path {
        tracing::warn!("Falling back to unit from path: {}, {}", unit, path.display());
    }
    Ok(from_path)
}

/// Read a PLM file, falling back to the PLM3 layout when the header is unreadable
///
/// `unit_hint` is used when no unit can be read from the file, and decides
/// whether the PLM3 fallback is attempted (never for 980 trucks).
pub fn read_plm(path: &Path, ctx: ImportContext<'_>, unit_hint: Option<&str>) -> Result<Vec<PlmRecord>> {
    let text = read_text(path)?;

    let unit = match unit_from_header(path, &text, ctx) {
        Ok(unit) => unit,
        Err(e) => {
            let model_base = unit_hint
                .and_then(|u| ctx.registry.get(u))
                .map(|u| u.model_base.as_str())
                .unwrap_or_default();

            if model_base.contains("980") {
                return Err(e);
            }
            return read_plm3_text(path, &text);
        }
    };

    let unit = unit
        .or_else(|| unit_hint.map(str::to_string))
        .ok_or_else(|| GtError::NoUnit {
            path: path.to_path_buf(),
        })?;

    let (header, rows) = csv_table(&text, HAULCYCLE_HEADER)?;
    let cols = ColumnIndex::new(&header, COLUMNS);
    cols.require(path, "date")?;
    cols.require(path, "time")?;

    let n = rows.len().saturating_sub(CHECKSUM_ROWS);
    let mut out = Vec::with_capacity(n);

    for (i, row) in rows.iter().take(n).enumerate() {
        let Some(dt_str) = cols.datetime(row) else {
            continue;
        };
        let datetime = NaiveDateTime::parse_from_str(&dt_str, HAULCYCLE_FMT)
            .map_err(|e| row_error(path, HAULCYCLE_HEADER + 1 + i, format!("'{}': {}", dt_str, e)))?;

        out.push(cols.record(row, unit.clone(), datetime));
    }

    tracing::debug!("{} plm rows: {}", out.len(), path.display());
    Ok(out)
}

/// PLM3 export: unit per row from `Truck #`, rows end at the first blank line
fn read_plm3_text(path: &Path, text: &str) -> Result<Vec<PlmRecord>> {
    // alarm table follows the first blank line
    let body = text
        .lines()
        .skip(PLM3_HEADER)
        .take_while(|l| !l.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n");

    let (header, rows) = csv_table(&body, 0)?;
    let cols = ColumnIndex::new(&header, COLUMNS_PLM3);
    for name in ["unit", "date", "time"] {
        cols.require(path, name)?;
    }

    let now = Local::now().naive_local();
    let mut out = Vec::new();

    for (i, row) in rows.iter().enumerate() {
        if is_blank(row) || cols.values_blank(row) {
            break;
        }
        let Some(dt_str) = cols.datetime(row) else {
            continue;
        };
        let datetime = parse_datetime_any(&dt_str, PLM3_FMTS)
            .ok_or_else(|| row_error(path, PLM3_HEADER + 1 + i, format!("bad datetime '{}'", dt_str)))?;

        if datetime > now {
            continue;
        }

        let unit = cols
            .get(row, "unit")
            .map(str::to_string)
            .ok_or_else(|| row_error(path, PLM3_HEADER + 1 + i, "missing Truck #"))?;

        out.push(cols.record(row, unit, datetime));
    }

    tracing::debug!("{} plm3 rows: {}", out.len(), path.display());
    Ok(out)
}
