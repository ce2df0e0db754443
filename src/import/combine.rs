//! Combine per-file exports into one de-duplicated record set and import it

use std::collections::{BTreeSet, HashSet};
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use rayon::prelude::*;

use crate::core::error::{GtError, Result};
use crate::core::record::ImportRecord;
use crate::core::store::{ImportMode, Store, Table};
use crate::import::faults::{read_fault, FaultRecord};
use crate::import::plm::{read_plm, PlmRecord};
use crate::import::search::FileType;
use crate::import::ImportContext;

/// Records merged from several files, plus the files that failed to parse
#[derive(Debug, Clone)]
pub struct Combined<R> {
    pub records: Vec<R>,
    pub failed: Vec<(PathBuf, String)>,
}

impl<R> Default for Combined<R> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            failed: Vec::new(),
        }
    }
}

/// Parse files in parallel and merge the results
///
/// Results keep the input file order. Duplicate keys keep their first
/// occurrence, and rows older than `d_lower` are dropped when it is given.
pub fn combine_with<R, F>(files: &[PathBuf], d_lower: Option<NaiveDateTime>, parse: F) -> Combined<R>
where
    R: ImportRecord,
    F: Fn(&Path) -> Result<Vec<R>> + Sync,
{
    let results: Vec<Result<Vec<R>>> = files.par_iter().map(|p| parse(p.as_path())).collect();

    let mut out = Combined::default();
    let mut seen = HashSet::new();

    for (p, result) in files.iter().zip(results) {
        match result {
            Ok(records) => {
                for r in records {
                    if let (Some(d_lower), Some(ts)) = (d_lower, r.timestamp()) {
                        if ts < d_lower {
                            continue;
                        }
                    }
                    if seen.insert(r.key()) {
                        out.records.push(r);
                    }
                }
            }
            Err(e) => {
                tracing::warn!("Failed {} import, {}: {}", R::TABLE, e, p.display());
                out.failed.push((p.clone(), e.to_string()));
            }
        }
    }

    tracing::info!(
        "Combined {} rows from {} files ({} failed)",
        out.records.len(),
        files.len(),
        out.failed.len()
    );
    out
}

/// Combined records of one csv file type
#[derive(Debug, Clone)]
pub enum CombinedRecords {
    Fault(Combined<FaultRecord>),
    Plm(Combined<PlmRecord>),
}

impl CombinedRecords {
    pub fn table(&self) -> Table {
        match self {
            CombinedRecords::Fault(_) => Table::Faults,
            CombinedRecords::Plm(_) => Table::Plm,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            CombinedRecords::Fault(c) => c.records.len(),
            CombinedRecords::Plm(c) => c.records.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn failed(&self) -> &[(PathBuf, String)] {
        match self {
            CombinedRecords::Fault(c) => &c.failed,
            CombinedRecords::Plm(c) => &c.failed,
        }
    }

    /// Import into the store, returning rows added
    pub fn import(self, store: &mut Store, mode: ImportMode) -> Result<usize> {
        match self {
            CombinedRecords::Fault(c) => import_records(c.records, store, mode),
            CombinedRecords::Plm(c) => import_records(c.records, store, mode),
        }
    }
}

/// Parse and merge fault or plm files
///
/// `d_lower` filters plm cycles by date; fault rows are never date filtered.
/// `unit_hint` is passed to plm parsing for files that don't name their unit.
pub fn combine_csv(
    files: &[PathBuf],
    ftype: FileType,
    ctx: ImportContext<'_>,
    d_lower: Option<NaiveDateTime>,
    unit_hint: Option<&str>,
) -> Result<CombinedRecords> {
    match ftype {
        FileType::Fault => Ok(CombinedRecords::Fault(combine_with(files, None, |p| {
            read_fault(p, ctx.registry)
        }))),
        FileType::Plm => Ok(CombinedRecords::Plm(combine_with(files, d_lower, |p| {
            read_plm(p, ctx, unit_hint)
        }))),
        other => Err(GtError::NoCsvImport(other.to_string())),
    }
}

/// Drop records whose key already exists in the store
pub fn filter_existing<R: ImportRecord>(records: Vec<R>, store: &Store) -> Result<Vec<R>> {
    if records.is_empty() {
        return Ok(records);
    }

    let units: Vec<String> = records
        .iter()
        .map(|r| r.unit().to_string())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let existing = store.existing_keys(R::TABLE, &units)?;
    let before = records.len();

    let records: Vec<R> = records
        .into_iter()
        .filter(|r| !existing.contains(&r.key()))
        .collect();

    tracing::info!("{}: before {}, after {}", R::TABLE, before, records.len());
    Ok(records)
}

/// Import records, returning the number of rows added or changed
///
/// In [`ImportMode::InsertNew`] records already in the store are filtered
/// out first; upserts pass everything through.
pub fn import_records<R: ImportRecord>(records: Vec<R>, store: &mut Store, mode: ImportMode) -> Result<usize> {
    let records = match mode {
        ImportMode::InsertNew => filter_existing(records, store)?,
        ImportMode::Upsert => records,
    };

    if records.is_empty() {
        tracing::info!("{}: no new rows to import", R::TABLE);
        return Ok(0);
    }

    store.insert_update(&records, mode)
}

/// Combine files then import them, logging the run
pub fn combine_import_csvs(
    files: &[PathBuf],
    ftype: FileType,
    ctx: ImportContext<'_>,
    store: &mut Store,
    unit_hint: Option<&str>,
) -> Result<usize> {
    let combined = combine_csv(files, ftype, ctx, None, unit_hint)?;
    let table = combined.table();
    let rows = combined.import(store, ImportMode::InsertNew)?;
    store.record_import(table, files.len(), rows)?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::Config;
    use crate::import::faults::tests::{fault_csv, registry};
    use crate::import::plm::tests::{cycle_row, haulcycle_csv};
    use chrono::NaiveDate;
    use tempfile::tempdir;

    fn write_faults(dir: &Path, name: &str, rows: &[&str]) -> PathBuf {
        let p = dir.join(name);
        std::fs::write(&p, fault_csv("A40017", rows)).unwrap();
        p
    }

    #[test]
    fn test_combine_dedups_and_collects_failures() {
        let dir = tempdir().unwrap();
        let a = write_faults(
            dir.path(),
            "fault0_a.csv",
            &["1,A1,x,1609459200|0,x,,x,1,first", "2,A2,x,1609459300|0,x,,x,1,m"],
        );
        let b = write_faults(dir.path(), "fault0_b.csv", &["1,A1,x,1609459200|0,x,,x,1,second"]);
        let bad = dir.path().join("fault0_bad.csv");
        std::fs::write(&bad, "nothing here").unwrap();

        let config = Config::default();
        let reg = registry();
        let ctx = ImportContext::new(&config, &reg);

        let combined = combine_csv(&[a, bad.clone(), b], FileType::Fault, ctx, None, None).unwrap();
        assert_eq!(combined.len(), 2);
        assert_eq!(combined.failed().len(), 1);
        assert_eq!(combined.failed()[0].0, bad);

        let CombinedRecords::Fault(c) = combined else {
            panic!("expected faults");
        };
        assert_eq!(c.records[0].message.as_deref(), Some("first"));
    }

    #[test]
    fn test_combine_filters_plm_by_date() {
        let dir = tempdir().unwrap();
        let p = dir.path().join("haulcycle.csv");
        let rows = [
            cycle_row("01/01/21", "10:00:00", 100.0),
            cycle_row("01/10/21", "10:00:00", 200.0),
        ];
        let rows: Vec<&str> = rows.iter().map(String::as_str).collect();
        std::fs::write(&p, haulcycle_csv("F0301", "A40017", &rows)).unwrap();

        let config = Config::default();
        let reg = registry();
        let ctx = ImportContext::new(&config, &reg);
        let d_lower = NaiveDate::from_ymd_opt(2021, 1, 5).unwrap().and_hms_opt(0, 0, 0);

        let combined = combine_csv(&[p], FileType::Plm, ctx, d_lower, None).unwrap();
        assert_eq!(combined.len(), 1);
        assert_eq!(combined.table(), Table::Plm);
    }

    #[test]
    fn test_combine_rejects_folder_types() {
        let config = Config::default();
        let reg = registry();
        let ctx = ImportContext::new(&config, &reg);
        assert!(matches!(
            combine_csv(&[], FileType::Dsc, ctx, None, None),
            Err(GtError::NoCsvImport(_))
        ));
    }

    #[test]
    fn test_import_twice_adds_nothing() {
        let dir = tempdir().unwrap();
        let a = write_faults(
            dir.path(),
            "fault0_a.csv",
            &["1,A1,x,1609459200|0,x,,x,1,m", "2,A2,x,1609459300|0,x,,x,1,m"],
        );

        let config = Config::default();
        let reg = registry();
        let ctx = ImportContext::new(&config, &reg);
        let mut store = Store::open_in_memory().unwrap();

        let files = vec![a];
        assert_eq!(combine_import_csvs(&files, FileType::Fault, ctx, &mut store, None).unwrap(), 2);
        assert_eq!(combine_import_csvs(&files, FileType::Fault, ctx, &mut store, None).unwrap(), 0);
        assert_eq!(store.count(Table::Faults).unwrap(), 2);

        let log = store.recent_imports(10, Some(Table::Faults)).unwrap();
        assert_eq!(log.len(), 2);
        assert_eq!(log[0].rows_added, 0);
        assert_eq!(log[1].rows_added, 2);
    }

    #[test]
    fn test_empty_file_list() {
        let config = Config::default();
        let reg = registry();
        let ctx = ImportContext::new(&config, &reg);
        let mut store = Store::open_in_memory().unwrap();

        let combined = combine_csv(&[], FileType::Plm, ctx, None, None).unwrap();
        assert!(combined.is_empty());
        assert_eq!(combined.import(&mut store, ImportMode::InsertNew).unwrap(), 0);
    }
}
