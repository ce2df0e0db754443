//! Collect export files across equipment units and process them by type

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{Duration, Local, NaiveDate, NaiveDateTime};
use rayon::prelude::*;
use serde::Serialize;

use crate::core::error::Result;
use crate::core::fileops::get_parent;
use crate::core::store::{ImportMode, Store};
use crate::core::units::UnitFolder;
use crate::import::combine::{combine_csv, CombinedRecords};
use crate::import::dls::{fix_dsc, move_tr3};
use crate::import::search::{FileType, FolderSearch};
use crate::import::ImportContext;

/// Lookback for units with no PLM history yet
pub const PLM_HISTORY_DAYS: i64 = 731;

/// Outcome of a processing run
#[derive(Debug, Clone, Serialize)]
pub struct ProcessSummary {
    pub ftype: FileType,
    pub units: usize,
    pub files_found: usize,
    pub processed: usize,
    pub failed: usize,
    pub rows_added: usize,
    /// Combined fault/plm records, kept when importing was skipped
    #[serde(skip)]
    pub records: Option<CombinedRecords>,
}

impl ProcessSummary {
    fn new(ftype: FileType, units: usize, files_found: usize) -> Self {
        Self {
            ftype,
            units,
            files_found,
            processed: 0,
            failed: 0,
            rows_added: 0,
            records: None,
        }
    }
}

/// Collects files of one type from each unit's folders and processes them
///
/// - fault/plm: combined and imported into the store
/// - dsc: moved into the standard download folder layout
/// - tr3: copied to the tr3 export folder
/// - ahs: collected only
pub struct FileProcessor<'a> {
    pub ftype: FileType,
    pub d_lower: NaiveDateTime,
    pub max_depth: usize,
    pub search_folders: Vec<String>,
    unit_d_lower: HashMap<String, NaiveDateTime>,
    collected: BTreeMap<String, Vec<PathBuf>>,
    ctx: ImportContext<'a>,
}

impl<'a> FileProcessor<'a> {
    pub const DEFAULT_MAX_DEPTH: usize = 4;

    /// Default start date for collection, 2020-01-01
    pub fn default_d_lower() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2020, 1, 1)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .unwrap_or_default()
    }

    pub fn new(ftype: FileType, ctx: ImportContext<'a>) -> Self {
        let search_folders = ctx.config.search_folders.clone();
        Self {
            ftype,
            d_lower: Self::default_d_lower(),
            max_depth: Self::DEFAULT_MAX_DEPTH,
            search_folders: Vec::new(),
            unit_d_lower: HashMap::new(),
            collected: BTreeMap::new(),
            ctx,
        }
        .with_search_folders(search_folders)
    }

    pub fn with_d_lower(mut self, d_lower: NaiveDateTime) -> Self {
        self.d_lower = d_lower;
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Top-level unit folders to search, matched case-insensitively
    ///
    /// tr3 exports also live in `vibe tests`.
    pub fn with_search_folders(mut self, folders: Vec<String>) -> Self {
        let mut folders: Vec<String> = folders.iter().map(|f| f.to_lowercase()).collect();
        if self.ftype == FileType::Tr3 && !folders.iter().any(|f| f == "vibe tests") {
            folders.push("vibe tests".to_string());
        }
        self.search_folders = folders;
        self
    }

    /// Start each unit's search at its latest stored PLM cycle
    ///
    /// Units with no cycles start [`PLM_HISTORY_DAYS`] ago.
    pub fn since_last(mut self, store: &Store, units: &[String]) -> Result<Self> {
        let fallback = Local::now().naive_local() - Duration::days(PLM_HISTORY_DAYS);
        for unit in units {
            let d = store.max_plm_date(unit)?.unwrap_or(fallback);
            tracing::debug!("{}: since {}", unit, d);
            self.unit_d_lower.insert(unit.clone(), d);
        }
        if let Some(min) = self.unit_d_lower.values().min() {
            self.d_lower = *min;
        }
        Ok(self)
    }

    fn d_lower_unit(&self, unit: &str) -> NaiveDateTime {
        self.unit_d_lower.get(unit).copied().unwrap_or(self.d_lower)
    }

    /// Files collected per unit by the last [`collect_files`](Self::collect_files)
    pub fn collected(&self) -> &BTreeMap<String, Vec<PathBuf>> {
        &self.collected
    }

    /// Search a single unit's top-level folders
    pub fn collect_files_unit(&self, unit: &str) -> Result<Vec<PathBuf>> {
        let uf = UnitFolder::from_name(unit, self.ctx.registry, self.ctx.config)?;
        if !uf.p_unit.is_dir() {
            tracing::warn!("Unit folder doesn't exist: {}", uf.p_unit.display());
            return Ok(Vec::new());
        }

        let search = FolderSearch::new(self.ftype, Some(self.max_depth), Some(self.d_lower_unit(unit)))?;

        let mut found = Vec::new();
        for entry in fs::read_dir(&uf.p_unit)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().to_lowercase();
            if entry.file_type()?.is_dir() && self.search_folders.contains(&name) {
                found.extend(search.search(&entry.path()));
            }
        }
        Ok(found)
    }

    /// Collect files for all units in parallel
    ///
    /// Fails with `DriveNotFound` if the equipment drive isn't available.
    /// Units that can't be searched are logged and skipped.
    pub fn collect_files(&mut self, units: &[String]) -> Result<Vec<PathBuf>> {
        self.ctx.config.drive_exists()?;

        let n_threads = rayon::current_num_threads().min(units.len()).max(1);
        let pool = rayon::ThreadPoolBuilder::new().num_threads(n_threads).build()?;

        let results: Vec<(String, Vec<PathBuf>)> = pool.install(|| {
            units
                .par_iter()
                .map(|unit| {
                    let files = self.collect_files_unit(unit).unwrap_or_else(|e| {
                        tracing::warn!("Failed collecting files for {}: {}", unit, e);
                        Vec::new()
                    });
                    (unit.clone(), files)
                })
                .collect()
        });

        self.collected = results.into_iter().collect();

        let files: Vec<PathBuf> = self.collected.values().flatten().cloned().collect();
        let per_unit = self
            .collected
            .iter()
            .map(|(unit, files)| format!("  {}: {}", unit, files.len()))
            .collect::<Vec<_>>()
            .join("\n");
        tracing::info!("Collected [{}] files:\n{}", files.len(), per_unit);

        Ok(files)
    }

    /// Collect (unless `files` is given) and process files for `units`
    ///
    /// With `import` unset, fault/plm records are combined and returned in
    /// the summary instead of being written.
    pub fn process(
        &mut self,
        units: &[String],
        files: Option<Vec<PathBuf>>,
        store: &mut Store,
        import: bool,
    ) -> Result<ProcessSummary> {
        let files = match files {
            Some(files) => files,
            None => self.collect_files(units)?,
        };

        tracing::info!(
            "process_{} - units: [{}], startdate: {}",
            self.ftype,
            units.len(),
            self.d_lower
        );

        let mut summary = ProcessSummary::new(self.ftype, units.len(), files.len());

        match self.ftype {
            FileType::Fault | FileType::Plm => {
                let d_lower = (self.ftype == FileType::Plm).then_some(self.d_lower);
                let combined = combine_csv(&files, self.ftype, self.ctx, d_lower, None)?;
                summary.failed = combined.failed().len();
                summary.processed = files.len() - summary.failed;

                if import {
                    let table = combined.table();
                    summary.rows_added = combined.import(store, ImportMode::InsertNew)?;
                    store.record_import(table, files.len(), summary.rows_added)?;
                } else {
                    summary.records = Some(combined);
                }
            }
            FileType::Dsc => {
                summary.processed = self.process_dsc(&files);
                summary.failed = files.len() - summary.processed;
            }
            FileType::Tr3 => {
                for p in &files {
                    match move_tr3(p, self.ctx) {
                        Ok(true) => summary.processed += 1,
                        Ok(false) => {}
                        Err(e) => {
                            tracing::warn!("Failed to copy tr3 file {}: {}", p.display(), e);
                            summary.failed += 1;
                        }
                    }
                }
            }
            FileType::Ahs => {
                for p in &files {
                    tracing::info!("ahs folder: {}", p.display());
                }
                summary.processed = files.len();
            }
        }

        Ok(summary)
    }

    /// Fix dsc folders, returning the number fixed
    ///
    /// Exports sharing a download folder are fixed one after another since
    /// fixing one may move its siblings; separate folders run in parallel.
    fn process_dsc(&self, files: &[PathBuf]) -> usize {
        let ctx = self.ctx;
        let processed: usize = dsc_groups(files)
            .into_par_iter()
            .map(|(_, group)| {
                group
                    .into_iter()
                    .filter(|p| match fix_dsc(p, ctx) {
                        Ok(_) => true,
                        Err(e) => {
                            tracing::error!("Failed to fix dsc file {}:\n\t{}", p.display(), e);
                            false
                        }
                    })
                    .count()
            })
            .sum();

        tracing::info!("Processed [{}/{}] dsc files", processed, files.len());
        processed
    }
}

/// dsc exports grouped by the download folder they live in
///
/// The key is the full path of the folder two levels below `Downloads`, or
/// the export's own parent when it isn't under one.
fn dsc_groups(files: &[PathBuf]) -> BTreeMap<PathBuf, Vec<&PathBuf>> {
    let mut groups: BTreeMap<PathBuf, Vec<&PathBuf>> = BTreeMap::new();
    for p in files {
        let key = get_parent(p, "downloads", 2)
            .or_else(|| p.parent().map(Path::to_path_buf))
            .unwrap_or_default();
        groups.entry(key).or_default().push(p);
    }
    groups
}
