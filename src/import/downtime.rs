//! Customer availability exports - equipment downtime and downtime exclusions

use std::path::Path;

use chrono::{Duration, NaiveDate, NaiveDateTime};
use csv::StringRecord;
use rusqlite::types::Value;

use crate::core::error::{GtError, Result};
use crate::core::record::{fmt_date, fmt_datetime, opt, ImportRecord, RecordKey};
use crate::core::store::{DateSelection, Store, Table};
use crate::core::units::fix_customer_unit;
use crate::import::records::{
    column_index, csv_table, field, is_blank, parse_datetime_any, parse_f64, read_text, row_error,
};

/// Preamble lines above the header in availability exports
pub const DEFAULT_SKIP_ROWS: usize = 2;

/// Shifts run 06:00-06:00, so earlier moments belong to the next calendar day
const SHIFT_START_HOURS: i64 = 6;

const SHIFT_DATE_FMT: &str = "%d-%b-%Y";

const EXCLUSION_DATE_FMTS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%m/%d/%Y",
    "%d-%b-%Y",
];

/// One downtime event
#[derive(Debug, Clone, PartialEq)]
pub struct DowntimeRecord {
    pub unit: String,
    pub start_date: NaiveDateTime,
    pub end_date: NaiveDateTime,
    /// Hours
    pub duration: f64,
    pub down_reason: Option<String>,
    pub comment: Option<String>,
    pub shift_date: NaiveDate,
    pub origin: Option<String>,
}

impl ImportRecord for DowntimeRecord {
    const TABLE: Table = Table::Downtime;

    fn key(&self) -> RecordKey {
        vec![
            self.unit.clone(),
            fmt_datetime(&self.start_date),
            fmt_datetime(&self.end_date),
        ]
    }

    fn unit(&self) -> &str {
        &self.unit
    }

    fn timestamp(&self) -> Option<NaiveDateTime> {
        Some(self.start_date)
    }

    fn values(&self) -> Vec<Value> {
        vec![
            self.unit.clone().into(),
            fmt_datetime(&self.start_date).into(),
            fmt_datetime(&self.end_date).into(),
            self.duration.into(),
            opt(self.down_reason.clone()),
            opt(self.comment.clone()),
            fmt_date(&self.shift_date).into(),
            opt(self.origin.clone()),
        ]
    }
}

/// Hours a unit is excluded from availability on one day
#[derive(Debug, Clone, PartialEq)]
pub struct ExclusionRecord {
    pub unit: String,
    pub date: NaiveDate,
    pub hours: f64,
    /// Exclusion also applies to mechanical availability
    pub ma: bool,
}

impl ImportRecord for ExclusionRecord {
    const TABLE: Table = Table::DowntimeExclusions;

    fn key(&self) -> RecordKey {
        vec![self.unit.clone(), fmt_date(&self.date)]
    }

    fn unit(&self) -> &str {
        &self.unit
    }

    fn timestamp(&self) -> Option<NaiveDateTime> {
        self.date.and_hms_opt(0, 0, 0)
    }

    fn values(&self) -> Vec<Value> {
        vec![
            self.unit.clone().into(),
            fmt_date(&self.date).into(),
            self.hours.into(),
            i64::from(self.ma).into(),
        ]
    }
}

/// Parse a timedelta like `05:30:00`, `5:30` or `1 days 02:00:00`
pub fn parse_timedelta(s: &str) -> Option<Duration> {
    let s = s.trim();
    let (days, hms) = match s.split_once("day") {
        Some((d, rest)) => (
            d.trim().parse::<i64>().ok()?,
            rest.trim_start_matches('s').trim(),
        ),
        None => (0, s),
    };

    let mut parts = hms.split(':');
    let h: i64 = parts.next()?.trim().parse().ok()?;
    let m: i64 = parts.next()?.trim().parse().ok()?;
    let sec: f64 = match parts.next() {
        Some(p) => p.trim().parse().ok()?,
        None => 0.0,
    };

    Some(
        Duration::days(days)
            + Duration::hours(h)
            + Duration::minutes(m)
            + Duration::milliseconds((sec * 1000.0).round() as i64),
    )
}

/// Shift date plus the time-of-day moment, rolling early moments to the next day
pub fn shift_start(shift_date: NaiveDate, moment: Duration) -> Option<NaiveDateTime> {
    let mut start = shift_date.and_hms_opt(0, 0, 0)?;
    if moment < Duration::hours(SHIFT_START_HOURS) {
        start += Duration::days(1);
    }
    Some(start + moment)
}

/// Read a downtime export, keeping only rows for `model`
///
/// Rows are de-duplicated on (unit, start, end), first occurrence wins.
pub fn read_downtime(path: &Path, skip_rows: usize, model: &str) -> Result<Vec<DowntimeRecord>> {
    let text = read_text(path)?;
    let (header, rows) = csv_table(&text, skip_rows)?;

    let col = |name: &str| {
        column_index(&header, name)
            .ok_or_else(|| GtError::parse(path, format!("missing column '{}'", name)))
    };
    let i_model = col("EqmtModel")?;
    let i_unit = col("FieldId")?;
    let i_shift = col("FullShiftName")?;
    let i_moment = col("Moment")?;
    let i_duration = col("Duration")?;
    let i_reason = column_index(&header, "Reason");
    let i_comment = column_index(&header, "FieldComment");
    let i_origin = column_index(&header, "Origin");

    let opt_field = |row: &StringRecord, idx: Option<usize>| {
        idx.and_then(|i| field(row, i)).map(str::to_string)
    };

    let mut out: Vec<DowntimeRecord> = Vec::new();
    let mut seen = std::collections::HashSet::new();

    for (i, row) in rows.iter().enumerate() {
        if is_blank(row) || field(row, i_model) != Some(model) {
            continue;
        }
        let line = skip_rows + 1 + i;
        let err = |msg: &str| row_error(path, line, msg);

        let unit = field(row, i_unit)
            .ok_or_else(|| err("missing FieldId"))?
            .replace("F0", "F");

        let shift_date = field(row, i_shift)
            .and_then(|s| s.split(' ').next())
            .and_then(|s| NaiveDate::parse_from_str(s, SHIFT_DATE_FMT).ok())
            .ok_or_else(|| err("bad FullShiftName"))?;

        let (Some(moment), Some(duration)) = (field(row, i_moment), field(row, i_duration)) else {
            tracing::warn!("{}: row {} has no Moment or Duration, skipping", path.display(), line);
            continue;
        };
        let moment = parse_timedelta(moment).ok_or_else(|| err("bad Moment"))?;
        let duration = parse_timedelta(duration).ok_or_else(|| err("bad Duration"))?;

        let start_date = shift_start(shift_date, moment).ok_or_else(|| err("bad start date"))?;
        let end_date = start_date + duration;

        let rec = DowntimeRecord {
            unit,
            start_date,
            end_date,
            duration: duration.num_seconds() as f64 / 3600.0,
            down_reason: opt_field(row, i_reason),
            comment: opt_field(row, i_comment),
            shift_date,
            origin: opt_field(row, i_origin),
        };

        if seen.insert(rec.key()) {
            out.push(rec);
        }
    }

    tracing::debug!("{} downtime rows: {}", out.len(), path.display());
    Ok(out)
}

/// Read a downtime exclusions export
///
/// `Hours` is the time the unit was *in* the system, capped to one day:
/// `24 - (Duration - TC08)`. Rows with no hours left, or missing either
/// number, are dropped.
pub fn read_exclusions(path: &Path) -> Result<Vec<ExclusionRecord>> {
    let text = read_text(path)?;
    let (header, rows) = csv_table(&text, 0)?;

    let col = |name: &str| {
        column_index(&header, name)
            .ok_or_else(|| GtError::parse(path, format!("missing column '{}'", name)))
    };
    let i_unit = col("EqmtUnit")?;
    let i_oos = col("TC08")?;
    let i_total = col("Duration")?;
    let i_date = col("DateEmail")?;

    let mut out = Vec::new();
    for (i, row) in rows.iter().enumerate() {
        if is_blank(row) {
            continue;
        }
        let line = 1 + i;

        let unit = field(row, i_unit)
            .map(fix_customer_unit)
            .ok_or_else(|| row_error(path, line, "missing EqmtUnit"))?;

        let date = field(row, i_date)
            .and_then(|s| parse_datetime_any(s, EXCLUSION_DATE_FMTS))
            .map(|d| d.date())
            .ok_or_else(|| row_error(path, line, "bad DateEmail"))?;

        let (Some(total), Some(out_of_system)) =
            (parse_f64(field(row, i_total)), parse_f64(field(row, i_oos)))
        else {
            tracing::debug!("{}: row {} has no Duration or TC08, skipping", path.display(), line);
            continue;
        };
        let hours = 24.0 - (total - out_of_system);

        if hours > 0.0 {
            out.push(ExclusionRecord {
                unit,
                date,
                hours,
                ma: true,
            });
        }
    }

    tracing::debug!("{} exclusion rows: {}", out.len(), path.display());
    Ok(out)
}

/// Build exclusions for every unit on every date, used when the customer export is missing
pub fn create_exclusions(dates: &[NaiveDate], units: &[String], hours: f64) -> Vec<ExclusionRecord> {
    dates
        .iter()
        .flat_map(|date| {
            units.iter().map(move |unit| ExclusionRecord {
                unit: unit.clone(),
                date: *date,
                hours,
                ma: true,
            })
        })
        .collect()
}

/// Set whether existing exclusions apply to MA
pub fn set_ma(store: &Store, units: &[String], dates: &DateSelection, ma: bool) -> Result<usize> {
    store.set_exclusion_ma(units, dates, ma)
}
