//! Download (DLS) folder maintenance
//!
//! Downloads are filed on the equipment drive as
//! `{unit folder}/Downloads/{year}/{unit} - {YYYY-MM-DD} - {DLS|FRDLS}`.
//! The functions here move stray dsc exports into that layout, upload local
//! download folders into it, and find or zip the most recent one.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::{Duration, Instant};

use chrono::{Datelike, Local, NaiveDate, NaiveDateTime};
use rayon::prelude::*;
use regex::Regex;
use serde::Serialize;

use crate::core::error::{GtError, Result};
use crate::core::fileops::{
    check_parents, copy_file, date_created, date_from_str, move_folder, zip_folder,
};
use crate::core::store::Store;
use crate::core::units::{UnitFolder, UnitRegistry};
use crate::import::combine::combine_import_csvs;
use crate::import::faults::unit_from_fault;
use crate::import::plm::unit_from_haulcycle;
use crate::import::search::{FileType, FolderSearch};
use crate::import::stats::{stats_from_dsc, unit_from_stat};
use crate::import::ImportContext;

/// How far back dsc and csv exports are collected when uploading a folder
pub const UPLOAD_LOOKBACK_DAYS: i64 = 365 * 2;

/// Folder receiving copies of the newest AHS data files
pub const PREVIEW_DIR: &str = "DATA_PREVIEW";
const PREVIEW_MIN_BYTES: u64 = 3_000_000;
const PREVIEW_COUNT: usize = 6;

/// Folder levels searched below `Downloads` for recent dsc exports
const RECENT_DSC_DEPTH: usize = 3;

/// True for four digit year folder names starting with 2, e.g. `2021`
pub fn is_year(name: &str) -> bool {
    name.len() == 4 && name.starts_with('2') && name.chars().all(|c| c.is_ascii_digit())
}

/// Date from a dsc export name like `328_dsc_20180526-072028`, else the
/// path's creation date
pub fn date_from_dsc(p: &Path) -> Result<NaiveDateTime> {
    let name = p
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();

    let sdate = name
        .rsplit("_dsc_")
        .next()
        .and_then(|s| s.split('-').next())
        .unwrap_or_default();

    match NaiveDate::parse_from_str(sdate, "%Y%m%d") {
        Ok(d) => Ok(d.and_hms_opt(0, 0, 0).unwrap_or_default()),
        Err(_) => Ok(date_created(p)?),
    }
}

/// Standard download folder title
fn dls_title(unit: &str, d: NaiveDate, suffix: &str) -> String {
    format!("{} - {} - {}", unit, d.format("%Y-%m-%d"), suffix)
}

/// Move a dsc export into its unit's `Downloads/{year}/{unit} - {date} - DLS`
/// folder, zipping it on the way
///
/// The whole parent folder moves along unless it holds other dsc exports or
/// sits directly under `Downloads`. Returns the destination folder.
pub fn fix_dsc(p: &Path, ctx: ImportContext<'_>) -> Result<PathBuf> {
    let start = Instant::now();

    let unit = ctx
        .registry
        .unit_from_path(p)
        .ok_or_else(|| GtError::NoUnit { path: p.to_path_buf() })?;
    let uf = UnitFolder::from_name(&unit, ctx.registry, ctx.config)?;

    let d = date_from_dsc(p)?.date();
    let p_new = uf.p_dls_year(d.year()).join(dls_title(&unit, d, "DLS"));

    let name = p
        .file_name()
        .ok_or_else(|| GtError::parse(p, "no file name"))?;
    let parent = p
        .parent()
        .ok_or_else(|| GtError::parse(p, "no parent folder"))?;

    let dsc_count = fs::read_dir(parent)?
        .filter_map(|e| e.ok())
        .filter(|e| e.file_name().to_string_lossy().to_lowercase().contains("dsc"))
        .count();

    let (src, dst) = if dsc_count > 1 || check_parents(p, 2, &["downloads"]) {
        (p.to_path_buf(), p_new.join(name))
    } else {
        (parent.to_path_buf(), p_new.clone())
    };

    let is_zip = p
        .extension()
        .map(|e| matches!(e.to_string_lossy().to_lowercase().as_str(), "zip" | "tar"))
        .unwrap_or(false);

    if src != dst || !is_zip {
        tracing::info!(
            "fix_dsc:\n\torig: {}\n\tsrc:  {}\n\tdst:  {}",
            p.display(),
            src.display(),
            dst.display()
        );
    }

    let result = (|| -> Result<()> {
        if !is_zip {
            zip_folder(p, Some(&p_new.join(name)), true)?;
        }
        if src != dst {
            move_folder(&src, &dst)?;
        }
        Ok(())
    })();

    if let Err(e) = result {
        tracing::warn!("Error fixing dsc folder: {}", src.display());
        return Err(e);
    }

    tracing::debug!("Elapsed time: {:.2}s", start.elapsed().as_secs_f64());
    Ok(p_new)
}

/// Copy a tr3 vibration export to `{tr3_export}/{unit}/{name}`
///
/// Returns false if the file was already exported.
pub fn move_tr3(p: &Path, ctx: ImportContext<'_>) -> Result<bool> {
    let unit = ctx
        .registry
        .unit_from_path(p)
        .ok_or_else(|| GtError::NoUnit { path: p.to_path_buf() })?;

    let name = p
        .file_name()
        .ok_or_else(|| GtError::parse(p, "no file name"))?;

    copy_file(p, &ctx.config.tr3_export.join(&unit).join(name), false)
}

/// Most recent download folder for a unit
///
/// Picks the newest year folder under `Downloads`, then the folder in it with
/// the newest `YYYY-MM-DD` in its name.
pub fn get_recent_dls_unit(unit: &str, ctx: ImportContext<'_>) -> Result<Option<PathBuf>> {
    let uf = UnitFolder::from_name(unit, ctx.registry, ctx.config)?;

    if !uf.p_dls.exists() {
        tracing::warn!("Download folder doesn't exist: {}", uf.p_dls.display());
        return Ok(None);
    }

    let p_year = subdirs(&uf.p_dls)?
        .into_iter()
        .filter(|p| is_year(&file_name(p)))
        .max_by_key(|p| file_name(p));

    let Some(p_year) = p_year else {
        tracing::warn!("No download year folders found: {}", uf.p_dls.display());
        return Ok(None);
    };

    Ok(subdirs(&p_year)?
        .into_iter()
        .filter_map(|p| date_from_str(&file_name(&p)).map(|d| (d, p)))
        .max_by_key(|(d, _)| *d)
        .map(|(_, p)| p))
}

/// Zip a unit's most recent download folder next to itself, keeping the original
pub fn zip_recent_dls(unit: &str, ctx: ImportContext<'_>) -> Result<Option<PathBuf>> {
    match get_recent_dls_unit(unit, ctx)? {
        Some(p) => zip_folder(&p, None, false),
        None => {
            tracing::warn!("Couldn't find recent DLS folder for {}", unit);
            Ok(None)
        }
    }
}

/// A unit's dsc exports modified after `d_lower`, newest first by export date
///
/// With `year`, only that year folder is searched when it exists.
pub fn get_recent_dsc_unit(
    unit: &str,
    ctx: ImportContext<'_>,
    d_lower: NaiveDateTime,
    year: Option<i32>,
) -> Result<Vec<PathBuf>> {
    let uf = UnitFolder::from_name(unit, ctx.registry, ctx.config)?;

    let p_dls = match year.map(|y| uf.p_dls_year(y)) {
        Some(p_year) if p_year.is_dir() => p_year,
        _ => uf.p_dls.clone(),
    };

    let search = FolderSearch::new(FileType::Dsc, Some(RECENT_DSC_DEPTH), Some(d_lower))?;
    let mut found: Vec<(NaiveDateTime, PathBuf)> = search
        .search(&p_dls)
        .into_iter()
        .map(|p| (date_from_dsc(&p).unwrap_or_default(), p))
        .collect();
    found.sort_by(|a, b| b.0.cmp(&a.0));

    Ok(found.into_iter().map(|(_, p)| p).collect())
}

/// Recent dsc exports for each unit, searched in parallel
///
/// Units without any are logged and map to an empty list.
pub fn get_recent_dsc_all(
    units: &[String],
    ctx: ImportContext<'_>,
    d_lower: NaiveDateTime,
    year: Option<i32>,
) -> Result<BTreeMap<String, Vec<PathBuf>>> {
    ctx.config.drive_exists()?;

    let results: Vec<(String, Vec<PathBuf>)> = units
        .par_iter()
        .map(|unit| -> Result<(String, Vec<PathBuf>)> {
            let found = get_recent_dsc_unit(unit, ctx, d_lower, year)?;
            if found.is_empty() {
                tracing::warn!("No recent dsc for: {}", unit);
            }
            Ok((unit.clone(), found))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(results.into_iter().collect())
}

/// Zip the download folder holding each unit's newest dsc export, keeping
/// the originals
///
/// Returns the archives created.
pub fn zip_recent_dsc(units: &[String], ctx: ImportContext<'_>, d_lower: NaiveDateTime) -> Result<Vec<PathBuf>> {
    let recent = get_recent_dsc_all(units, ctx, d_lower, None)?;

    let mut zipped = Vec::new();
    for p in recent.values().filter_map(|found| found.first()) {
        let Some(parent) = p.parent() else {
            continue;
        };
        zipped.extend(zip_folder(parent, None, false)?);
    }
    Ok(zipped)
}

fn subdirs(p: &Path) -> Result<Vec<PathBuf>> {
    let mut out = Vec::new();
    for entry in fs::read_dir(p)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            out.push(entry.path());
        }
    }
    Ok(out)
}

fn file_name(p: &Path) -> String {
    p.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default()
}

/// Copy the newest `*.gz*` files over 3 MB from the AHS `data` folder into
/// `{p_dst}/DATA_PREVIEW` (default: next to `data`)
///
/// Returns the number of files copied.
pub fn make_ahs_data_preview(ahs_folders: &[PathBuf], p_dst: Option<&Path>) -> Result<usize> {
    let Some(p_data) = ahs_folders
        .iter()
        .find(|p| file_name(p).to_lowercase() == "data")
    else {
        return Ok(0);
    };

    let p_dst = match p_dst {
        Some(p) => p.to_path_buf(),
        None => p_data.parent().map(Path::to_path_buf).unwrap_or_default(),
    }
    .join(PREVIEW_DIR);

    let mut files: Vec<PathBuf> = fs::read_dir(p_data)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file() && file_name(p).contains(".gz"))
        .collect();
    files.sort_by(|a, b| b.cmp(a));

    let mut n = 0;
    for p in files
        .iter()
        .filter(|p| fs::metadata(p).map(|m| m.len() > PREVIEW_MIN_BYTES).unwrap_or(false))
        .take(PREVIEW_COUNT)
    {
        if copy_file(p, &p_dst.join(file_name(p)), false)? {
            n += 1;
        }
    }
    Ok(n)
}

/// First `.gz`/`.txt` file name in each AHS folder, newest name first
fn ahs_first_files(ahs_folders: &[PathBuf]) -> impl Iterator<Item = String> + '_ {
    ahs_folders.iter().filter_map(|folder| {
        let mut names: Vec<String> = fs::read_dir(folder)
            .ok()?
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().to_string())
            .collect();
        names.sort_by(|a, b| b.cmp(a));
        names.into_iter().find(|n| {
            let n = n.to_lowercase();
            n.ends_with("gz") || n.ends_with("txt")
        })
    })
}

/// Unit from AHS file names like `F301_210201_120000.gz`
pub fn unit_from_ahs_files(ahs_folders: &[PathBuf], registry: &UnitRegistry) -> Option<String> {
    ahs_first_files(ahs_folders)
        .filter_map(|n| n.split('_').next().map(str::to_string))
        .find(|u| registry.exists(u))
}

/// Date from the first 6 digit `YYMMDD` group in AHS file names
pub fn date_from_ahs_files(ahs_folders: &[PathBuf]) -> Option<NaiveDate> {
    static EXPR: OnceLock<Option<Regex>> = OnceLock::new();
    let expr = EXPR.get_or_init(|| Regex::new(r"\d{6}").ok()).as_ref()?;

    ahs_first_files(ahs_folders).find_map(|n| {
        expr.find(&n)
            .and_then(|m| NaiveDate::parse_from_str(m.as_str(), "%y%m%d").ok())
    })
}

/// Count and elapsed time for one upload step
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct StepResult {
    pub num: usize,
    #[serde(serialize_with = "secs")]
    pub time: Duration,
}

fn secs<S: serde::Serializer>(d: &Duration, s: S) -> std::result::Result<S::Ok, S::Error> {
    s.serialize_f64(d.as_secs_f64())
}

impl StepResult {
    fn since(num: usize, start: Instant) -> Self {
        Self {
            num,
            time: start.elapsed(),
        }
    }
}

/// Outcome of uploading a download folder
#[derive(Debug, Clone, Serialize)]
pub struct DlsImportResult {
    /// `{unit} - {date}`
    pub name: String,
    pub dst: PathBuf,
    pub fault: StepResult,
    pub plm: StepResult,
    pub ge_zip: StepResult,
    pub ahs_zip: StepResult,
    #[serde(serialize_with = "secs")]
    pub time_total: Duration,
}

/// Upload a local download folder to the equipment drive
///
/// Unit and date come from the folder name when present, otherwise from the
/// dsc stats, fault, plm or AHS files inside it. Fault and plm csvs are imported,
/// dsc and AHS folders are zipped, and the folder is moved to
/// `Downloads/{year}/{unit} - {date} - {DLS|FRDLS}`.
pub fn import_dls(p: &Path, ctx: ImportContext<'_>, store: &mut Store) -> Result<DlsImportResult> {
    let start = Instant::now();
    ctx.config.drive_exists()?;

    let folder_name = file_name(p);
    let mut unit = ctx.registry.unit_from_str(&folder_name);
    let d = date_from_str(&folder_name);
    let d_lower = Local::now().naive_local() - chrono::Duration::days(UPLOAD_LOOKBACK_DAYS);

    // creation dates are a fallback when there are no dsc exports
    let mut dates: Vec<NaiveDate> = fs::read_dir(p)?
        .filter_map(|e| e.ok())
        .filter_map(|e| date_created(&e.path()).ok())
        .map(|d| d.date())
        .collect();

    let lst_dsc = FolderSearch::new(FileType::Dsc, None, Some(d_lower))?.search(p);
    if let Some(first) = lst_dsc.first() {
        dates.clear();

        if unit.is_none() {
            match stats_from_dsc(first).map(|src| unit_from_stat(&src, ctx.registry)) {
                Some(Ok(u)) => unit = u,
                Some(Err(e)) => tracing::warn!("Failed to get unit from stats file: {}", e),
                None => {}
            }
        }
    }

    let mut csv_files: Vec<(FileType, Vec<PathBuf>)> = Vec::new();
    for ftype in [FileType::Fault, FileType::Plm] {
        let files = FolderSearch::new(ftype, None, Some(d_lower))?.search(p);
        let Some(first) = files.first() else {
            continue;
        };

        if unit.is_none() {
            let found = match ftype {
                FileType::Fault => unit_from_fault(first, ctx.registry),
                _ => unit_from_haulcycle(first, ctx),
            };
            match found {
                Ok(u) => unit = u,
                Err(e) => tracing::warn!("Failed to read {} file: {}", ftype, e),
            }
        }
        csv_files.push((ftype, files));
    }

    for p_dsc in &lst_dsc {
        match date_from_dsc(p_dsc) {
            Ok(d) => dates.push(d.date()),
            Err(e) => tracing::warn!("No date for {}: {}", p_dsc.display(), e),
        }
    }

    let ahs_folders = FolderSearch::new(FileType::Ahs, Some(0), None)?.search(p);
    let suffix = if ahs_folders.is_empty() {
        "DLS"
    } else {
        if unit.is_none() {
            unit = unit_from_ahs_files(&ahs_folders, ctx.registry);
        }
        if d.is_none() {
            dates.extend(date_from_ahs_files(&ahs_folders));
        }
        "FRDLS"
    };

    let unit = unit.ok_or_else(|| GtError::NoUnit { path: p.to_path_buf() })?;
    let d = d
        .or_else(|| dates.iter().min().copied())
        .ok_or_else(|| GtError::NoDate { path: p.to_path_buf() })?;

    let uf = UnitFolder::from_name(&unit, ctx.registry, ctx.config)?;
    let p_dst = uf.p_dls_year(d.year()).join(dls_title(&unit, d, suffix));

    tracing::info!("p_dst: {}", p_dst.display());
    if p_dst.exists() {
        return Err(GtError::FolderExists { path: p_dst });
    }

    let mut fault = StepResult::default();
    let mut plm = StepResult::default();

    for (ftype, files) in &csv_files {
        let step = Instant::now();
        match combine_import_csvs(files, *ftype, ctx, store, Some(&unit)) {
            Ok(rows) => {
                let result = StepResult::since(rows, step);
                match ftype {
                    FileType::Fault => fault = result,
                    _ => plm = result,
                }
            }
            Err(e) => tracing::warn!("Failed to import {} files: {}", ftype, e),
        }
    }

    let mut ge_zip = StepResult::default();
    if !lst_dsc.is_empty() {
        let step = Instant::now();
        for p_dsc in &lst_dsc {
            zip_folder(p_dsc, Some(&p_dst.join(file_name(p_dsc))), true)?;
        }
        ge_zip = StepResult::since(lst_dsc.len(), step);
    }

    let mut ahs_zip = StepResult::default();
    if !ahs_folders.is_empty() {
        let step = Instant::now();
        make_ahs_data_preview(&ahs_folders, None)?;

        for p_ahs in &ahs_folders {
            zip_folder(p_ahs, Some(&p_dst.join(file_name(p_ahs))), true)?;
        }
        ahs_zip = StepResult::since(ahs_folders.len(), step);
    }

    tracing::info!("Uploading files to: {}", p_dst.display());
    move_folder(p, &p_dst)?;

    Ok(DlsImportResult {
        name: format!("{} - {}", unit, d.format("%Y-%m-%d")),
        dst: p_dst,
        fault,
        plm,
        ge_zip,
        ahs_zip,
        time_total: start.elapsed(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::Config;
    use crate::import::faults::tests::{fault_csv, registry};
    use crate::import::stats::tests::{write_stats, STATS_CSV};
    use tempfile::{tempdir, TempDir};

    struct Drive {
        _dir: TempDir,
        config: Config,
        p_dls: PathBuf,
    }

    fn drive() -> Drive {
        let dir = tempdir().unwrap();
        let mut config = Config::default();
        config.drive = dir.path().join("drive");
        config.tr3_export = dir.path().join("tr3 export");

        let reg = registry();
        let uf = UnitFolder::from_name("F301", &reg, &config).unwrap();
        fs::create_dir_all(&uf.p_dls).unwrap();

        Drive {
            _dir: dir,
            config,
            p_dls: uf.p_dls,
        }
    }

    fn touch(p: &Path) {
        fs::create_dir_all(p.parent().unwrap()).unwrap();
        fs::write(p, "x").unwrap();
    }

    #[test]
    fn test_is_year() {
        assert!(is_year("2021"));
        assert!(!is_year("1999"));
        assert!(!is_year("20210"));
        assert!(!is_year("2o21"));
    }

    #[test]
    fn test_date_from_dsc() {
        let d = date_from_dsc(Path::new("/x/328_dsc_20180526-072028")).unwrap();
        assert_eq!(d.date(), NaiveDate::from_ymd_opt(2018, 5, 26).unwrap());
    }

    #[test]
    fn test_date_from_dsc_falls_back_to_created() {
        let dir = tempdir().unwrap();
        let p = dir.path().join("no_date_here");
        fs::create_dir(&p).unwrap();
        let d = date_from_dsc(&p).unwrap();
        assert_eq!(d.date(), Local::now().date_naive());
    }

    #[test]
    fn test_fix_dsc_moves_parent_folder() {
        let drive = drive();
        let reg = registry();
        let ctx = ImportContext::new(&drive.config, &reg);

        let stray = drive.p_dls.join("2021").join("misc upload");
        let p_dsc = stray.join("328_dsc_20210115-072028");
        touch(&p_dsc.join("stats.csv"));
        touch(&stray.join("notes.txt"));

        let p_new = fix_dsc(&p_dsc, ctx).unwrap();
        assert_eq!(p_new, drive.p_dls.join("2021").join("F301 - 2021-01-15 - DLS"));
        assert!(p_new.join("328_dsc_20210115-072028.zip").is_file());
        assert!(p_new.join("notes.txt").is_file());
        assert!(!stray.exists());
    }

    #[test]
    fn test_fix_dsc_under_downloads_moves_only_export() {
        let drive = drive();
        let reg = registry();
        let ctx = ImportContext::new(&drive.config, &reg);

        let p_dsc = drive.p_dls.join("2021").join("328_dsc_20210115-072028");
        touch(&p_dsc.join("stats.csv"));

        let p_new = fix_dsc(&p_dsc, ctx).unwrap();
        assert!(p_new.join("328_dsc_20210115-072028.zip").is_file());
        assert!(!p_dsc.exists());
        assert!(drive.p_dls.join("2021").is_dir());
    }

    #[test]
    fn test_move_tr3() {
        let drive = drive();
        let reg = registry();
        let ctx = ImportContext::new(&drive.config, &reg);

        let p = drive.p_dls.join("vibe").join("check.tr3");
        touch(&p);

        assert!(move_tr3(&p, ctx).unwrap());
        assert!(drive.config.tr3_export.join("F301").join("check.tr3").is_file());
        assert!(!move_tr3(&p, ctx).unwrap());
    }

    #[test]
    fn test_recent_dls_and_zip() {
        let drive = drive();
        let reg = registry();
        let ctx = ImportContext::new(&drive.config, &reg);

        touch(&drive.p_dls.join("2020").join("F301 - 2020-12-30 - DLS").join("a.txt"));
        touch(&drive.p_dls.join("2021").join("F301 - 2021-01-02 - DLS").join("a.txt"));
        touch(&drive.p_dls.join("2021").join("F301 - 2021-03-04 - DLS").join("a.txt"));
        touch(&drive.p_dls.join("2021").join("misc").join("a.txt"));

        let recent = get_recent_dls_unit("F301", ctx).unwrap().unwrap();
        assert_eq!(file_name(&recent), "F301 - 2021-03-04 - DLS");

        let p_zip = zip_recent_dls("F301", ctx).unwrap().unwrap();
        assert!(p_zip.is_file());
        assert!(recent.is_dir());
    }

    fn since_2019() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2019, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap()
    }

    #[test]
    fn test_recent_dsc_newest_first() {
        let drive = drive();
        let reg = registry();
        let ctx = ImportContext::new(&drive.config, &reg);

        let dsc = |year: &str, folder: &str, name: &str| {
            drive.p_dls.join(year).join(folder).join(name).join("a.csv")
        };
        touch(&dsc("2021", "F301 - 2021-01-15 - DLS", "328_dsc_20210115-072028"));
        touch(&dsc("2021", "F301 - 2021-03-04 - DLS", "328_dsc_20210304-072028"));
        touch(&dsc("2020", "F301 - 2020-06-01 - DLS", "328_dsc_20200601-072028"));

        let names = |found: Vec<PathBuf>| found.iter().map(|p| file_name(p)).collect::<Vec<_>>();

        let found = get_recent_dsc_unit("F301", ctx, since_2019(), None).unwrap();
        assert_eq!(
            names(found),
            vec![
                "328_dsc_20210304-072028",
                "328_dsc_20210115-072028",
                "328_dsc_20200601-072028"
            ]
        );

        let found = get_recent_dsc_unit("F301", ctx, since_2019(), Some(2020)).unwrap();
        assert_eq!(names(found), vec!["328_dsc_20200601-072028"]);

        // missing year folder searches all of Downloads
        let found = get_recent_dsc_unit("F301", ctx, since_2019(), Some(2018)).unwrap();
        assert_eq!(found.len(), 3);

        let all = get_recent_dsc_all(&["F301".to_string()], ctx, since_2019(), None).unwrap();
        assert_eq!(all["F301"].len(), 3);
    }

    #[test]
    fn test_zip_recent_dsc() {
        let drive = drive();
        let reg = registry();
        let ctx = ImportContext::new(&drive.config, &reg);

        let y21 = drive.p_dls.join("2021");
        touch(&y21.join("F301 - 2021-01-15 - DLS").join("328_dsc_20210115-072028").join("a.csv"));
        touch(&y21.join("F301 - 2021-03-04 - DLS").join("328_dsc_20210304-072028").join("a.csv"));

        let zipped = zip_recent_dsc(&["F301".to_string()], ctx, since_2019()).unwrap();
        assert_eq!(zipped, vec![y21.join("F301 - 2021-03-04 - DLS.zip")]);
        assert!(zipped[0].is_file());
        assert!(y21.join("F301 - 2021-03-04 - DLS").is_dir());
    }

    #[test]
    fn test_ahs_values_and_preview() {
        let dir = tempdir().unwrap();
        let p_data = dir.path().join("data");
        let p_event = dir.path().join("dnevent");
        fs::create_dir_all(&p_data).unwrap();
        fs::create_dir_all(&p_event).unwrap();

        let big = fs::File::create(p_data.join("F301_210201_120000.gz")).unwrap();
        big.set_len(PREVIEW_MIN_BYTES + 1).unwrap();
        fs::write(p_data.join("F301_210131_120000.gz"), "small").unwrap();
        fs::write(p_event.join("F301_210202_000000.txt"), "x").unwrap();

        let folders = vec![p_data.clone(), p_event];
        assert_eq!(unit_from_ahs_files(&folders, &registry()), Some("F301".to_string()));
        assert_eq!(date_from_ahs_files(&folders), NaiveDate::from_ymd_opt(2021, 2, 1));

        assert_eq!(make_ahs_data_preview(&folders, None).unwrap(), 1);
        assert!(dir.path().join(PREVIEW_DIR).join("F301_210201_120000.gz").is_file());
    }

    #[test]
    fn test_import_dls() {
        crate::logging::init_test();
        let drive = drive();
        let reg = registry();
        let ctx = ImportContext::new(&drive.config, &reg);
        let mut store = Store::open_in_memory().unwrap();

        let local = tempdir().unwrap();
        let p = local.path().join("F301 - 2021-02-01");
        fs::create_dir_all(&p).unwrap();
        fs::write(
            p.join("fault0_301.csv"),
            fault_csv("A40017", &["1,A1,x,1609459200|0,x,,x,1,m"]),
        )
        .unwrap();
        touch(&p.join("328_dsc_20210201-072028").join("stats.csv"));

        let result = import_dls(&p, ctx, &mut store).unwrap();
        let p_dst = drive.p_dls.join("2021").join("F301 - 2021-02-01 - DLS");

        assert_eq!(result.name, "F301 - 2021-02-01");
        assert_eq!(result.dst, p_dst);
        assert_eq!(result.fault.num, 1);
        assert_eq!(result.ge_zip.num, 1);
        assert!(p_dst.join("328_dsc_20210201-072028.zip").is_file());
        assert!(p_dst.join("fault0_301.csv").is_file());
        assert!(!p.exists());

        // same folder again is refused
        fs::create_dir_all(&p).unwrap();
        assert!(matches!(
            import_dls(&p, ctx, &mut store),
            Err(GtError::FolderExists { .. })
        ));
    }

    #[test]
    fn test_import_dls_unit_from_stats() {
        let drive = drive();
        let reg = registry();
        let ctx = ImportContext::new(&drive.config, &reg);
        let mut store = Store::open_in_memory().unwrap();

        let local = tempdir().unwrap();
        let p = local.path().join("upload");
        write_stats(&p.join("328_dsc_20210201-072028"), STATS_CSV);

        let result = import_dls(&p, ctx, &mut store).unwrap();
        assert_eq!(result.name, "F301 - 2021-02-01");
        assert_eq!(result.ge_zip.num, 1);
        assert!(drive
            .p_dls
            .join("2021")
            .join("F301 - 2021-02-01 - DLS")
            .join("328_dsc_20210201-072028.zip")
            .is_file());
    }

    #[test]
    fn test_import_dls_without_unit() {
        let drive = drive();
        let reg = registry();
        let ctx = ImportContext::new(&drive.config, &reg);
        let mut store = Store::open_in_memory().unwrap();

        let local = tempdir().unwrap();
        let p = local.path().join("upload");
        touch(&p.join("readme.txt"));

        assert!(matches!(
            import_dls(&p, ctx, &mut store),
            Err(GtError::NoUnit { .. })
        ));
    }
}
