//! GE drive system stats (`stats/SERIAL*.csv` inside dsc exports)
//!
//! A stats csv is a long `index,name,value` table. It is read into a single
//! record of short snake case names, e.g. `Truck Serial Number` becomes
//! `truck_sn`, and the truck serial and model resolve the unit.

use std::collections::{BTreeMap, HashSet};
use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use chrono::NaiveDate;
use regex::Regex;
use serde::Serialize;
use zip::ZipArchive;

use crate::core::error::{GtError, Result};
use crate::core::units::UnitRegistry;
use crate::import::records::{csv_rows, field, parse_datetime_any, parse_f64, read_text, to_snake};

/// Substring replacements applied in order to every column name
const SHORT_NAMES: &[(&str, &str)] = &[
    ("serial_number", "sn"),
    ("number", "no"),
    ("code_version", "ver"),
    ("version", "ver"),
    ("hours", "hrs"),
    ("inverter", "inv"),
];

/// Whole-name renames, checked before shortening
const RENAMED: &[(&str, &str)] = &[
    ("todays_datetime", "date"),
    ("total_hours", "engine_hrs"),
    ("model++", "wm_model"),
];

const DROPPED: &[&str] = &[
    "unit",
    "truck_identification",
    "end",
    "model",
    "model+",
    "model+++",
    "mine_dos_filename",
    "oe_mdos_filename",
    "ge_dos_filename",
];

const DATE_FMTS: &[&str] = &[
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%a %b %d %H:%M:%S %Y",
    "%m/%d/%Y",
    "%Y-%m-%d",
];

/// Where a dsc export keeps its stats csv
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatsSource {
    /// Plain csv file
    Csv(PathBuf),
    /// Zipped dsc export, the csv is read from inside the archive
    Zip(PathBuf),
}

impl StatsSource {
    pub fn path(&self) -> &Path {
        match self {
            StatsSource::Csv(p) | StatsSource::Zip(p) => p,
        }
    }
}

/// One stats snapshot for a truck
#[derive(Debug, Clone, Serialize)]
pub struct DscStats {
    pub unit: Option<String>,
    pub date: Option<NaiveDate>,
    /// Truck serial number (`truck_sn`)
    pub serial: Option<String>,
    pub model: Option<String>,
    pub engine_hrs: Option<f64>,
    pub source: PathBuf,
    /// All columns in file order
    #[serde(serialize_with = "ordered_map")]
    pub values: Vec<(String, String)>,
}

fn ordered_map<S: serde::Serializer>(
    values: &[(String, String)],
    s: S,
) -> std::result::Result<S::Ok, S::Error> {
    s.collect_map(values.iter().map(|(k, v)| (k, v)))
}

impl DscStats {
    /// Value of a (shortened) column
    pub fn get(&self, column: &str) -> Option<&str> {
        self.values
            .iter()
            .find(|(k, _)| k == column)
            .map(|(_, v)| v.as_str())
            .filter(|v| !v.is_empty())
    }
}

fn serial_csv_expr() -> Option<&'static Regex> {
    static EXPR: OnceLock<Option<Regex>> = OnceLock::new();
    EXPR.get_or_init(|| Regex::new(r"(?i)serial.*csv$").ok()).as_ref()
}

/// Locate the stats csv of a dsc export
///
/// Folders are searched for `stats/SERIAL*.csv`, zip archives are read in
/// place. Anything else (including tar archives) has no readable stats.
pub fn stats_from_dsc(p: &Path) -> Option<StatsSource> {
    if p.is_dir() {
        let expr = serial_csv_expr()?;
        let mut found: Vec<PathBuf> = fs::read_dir(p.join("stats"))
            .ok()?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| {
                p.file_name()
                    .map(|n| n.to_string_lossy().starts_with("SERIAL") && expr.is_match(&n.to_string_lossy()))
                    .unwrap_or(false)
            })
            .collect();
        found.sort();

        if found.is_empty() {
            tracing::debug!("No stats csv in: {}", p.display());
        }
        return found.into_iter().next().map(StatsSource::Csv);
    }

    let ext = p
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "zip" => Some(StatsSource::Zip(p.to_path_buf())),
        _ => {
            tracing::debug!("Can't read stats from: {}", p.display());
            None
        }
    }
}

/// Text of the first `serial*.csv` entry in a zip archive
fn read_zipped_csv(p: &Path) -> Result<String> {
    let mut archive = ZipArchive::new(File::open(p)?)?;
    let expr = serial_csv_expr().ok_or_else(|| GtError::parse(p, "bad stats pattern"))?;

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        if entry.is_file() && expr.is_match(entry.name()) {
            let mut bytes = Vec::new();
            entry.read_to_end(&mut bytes)?;
            return Ok(String::from_utf8_lossy(&bytes).into_owned());
        }
    }
    Err(GtError::parse(p, "no SERIAL csv in archive"))
}

/// Snake case stats key that keeps trailing `+` markers, e.g. `Model++` -> `model++`
fn stat_key(raw: &str) -> String {
    let raw = raw.trim();
    let base = raw.trim_end_matches('+');
    format!("{}{}", to_snake(base), &raw[base.len()..])
}

/// Short column name, or None for dropped columns
fn stat_column(raw: &str) -> Option<String> {
    let key = stat_key(raw);
    if let Some((_, new)) = RENAMED.iter().find(|(old, _)| *old == key) {
        return Some(new.to_string());
    }
    if DROPPED.contains(&key.as_str()) {
        return None;
    }

    let col = SHORT_NAMES
        .iter()
        .fold(key, |col, (old, new)| col.replace(old, new));

    Some(if col == "truck_model" { "model".to_string() } else { col })
}

/// Parse stats csv text into a snapshot
///
/// Duplicate names keep their first value and names containing `-` are
/// skipped. The unit comes from the truck serial and model, then from `source`.
pub fn parse_stats(text: &str, source: &Path, registry: &UnitRegistry) -> Result<DscStats> {
    let rows = csv_rows(text, 1)?;

    let mut seen = HashSet::new();
    let mut values = Vec::new();
    for row in &rows {
        let Some(name) = field(row, 1) else {
            continue;
        };
        if !seen.insert(name.to_string()) || name.contains('-') {
            continue;
        }
        if let Some(col) = stat_column(name) {
            let value = row.get(2).map(str::trim).unwrap_or_default().to_string();
            values.push((col, value));
        }
    }

    if values.is_empty() {
        return Err(GtError::parse(source, "empty stats file"));
    }

    let mut stats = DscStats {
        unit: None,
        date: None,
        serial: None,
        model: None,
        engine_hrs: None,
        source: source.to_path_buf(),
        values,
    };
    stats.serial = stats.get("truck_sn").map(str::to_string);
    stats.model = stats.get("model").map(str::to_string);
    stats.engine_hrs = parse_f64(stats.get("engine_hrs"));
    stats.date = stats
        .get("date")
        .and_then(|d| parse_datetime_any(d, DATE_FMTS))
        .map(|d| d.date());

    stats.unit = stats
        .serial
        .as_deref()
        .and_then(|sn| registry.unit_from_serial(sn, stats.model.as_deref(), None))
        .or_else(|| registry.unit_from_path(source));

    Ok(stats)
}

/// Read a stats snapshot from a csv file or zipped dsc export
pub fn get_stats(src: &StatsSource, registry: &UnitRegistry) -> Result<DscStats> {
    let text = match src {
        StatsSource::Csv(p) => read_text(p)?,
        StatsSource::Zip(p) => read_zipped_csv(p)?,
    };
    parse_stats(&text, src.path(), registry)
}

/// Unit named by a stats file, if it resolves to a registered unit
pub fn unit_from_stat(src: &StatsSource, registry: &UnitRegistry) -> Result<Option<String>> {
    Ok(get_stats(src, registry)?.unit)
}

/// Stats for each unit from its dsc exports, newest first
///
/// The first export with a readable stats file wins; units with none are
/// logged and left out.
pub fn import_stats(recent: &BTreeMap<String, Vec<PathBuf>>, registry: &UnitRegistry) -> Vec<DscStats> {
    let mut out = Vec::new();
    for (unit, exports) in recent {
        let found = exports.iter().find_map(|p| {
            let src = stats_from_dsc(p)?;
            match get_stats(&src, registry) {
                Ok(stats) => Some(stats),
                Err(e) => {
                    tracing::warn!("Failed to load stats: {}\n\t{}", p.display(), e);
                    None
                }
            }
        });

        match found {
            Some(mut stats) => {
                stats.unit.get_or_insert_with(|| unit.clone());
                out.push(stats);
            }
            None => tracing::warn!("No readable stats for: {}", unit),
        }
    }
    out
}

/// Stats snapshots from explicit `SERIAL*.csv` files, e.g. to track SMR over time
pub fn smr_from_stats(files: &[PathBuf], registry: &UnitRegistry) -> Result<Vec<DscStats>> {
    files
        .iter()
        .map(|p| get_stats(&StatsSource::Csv(p.clone()), registry))
        .collect()
}
