//! Filesystem helpers for moving, copying and zipping download folders

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime};
use regex::Regex;
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::core::error::Result;

/// Last modification time as local naive datetime
pub fn date_modified(p: &Path) -> io::Result<NaiveDateTime> {
    let modified = fs::metadata(p)?.modified()?;
    Ok(DateTime::<Local>::from(modified).naive_local())
}

/// Creation time, falling back to modification time where the platform
/// doesn't record birth time
pub fn date_created(p: &Path) -> io::Result<NaiveDateTime> {
    let meta = fs::metadata(p)?;
    let ts = meta.created().or_else(|_| meta.modified())?;
    Ok(DateTime::<Local>::from(ts).naive_local())
}

/// Find an ancestor of `p` by (case-insensitive) name, then step `offset`
/// levels back down towards `p`
///
/// When the name appears more than once the ancestor farthest from `p` wins.
/// The returned index is clamped to the available ancestors.
pub fn get_parent(p: &Path, name: &str, offset: usize) -> Option<PathBuf> {
    let parents: Vec<&Path> = p.ancestors().skip(1).collect();
    let name = name.to_lowercase();

    let idx = parents
        .iter()
        .enumerate()
        .filter(|(_, a)| {
            a.file_name()
                .map(|n| n.to_string_lossy().to_lowercase() == name)
                .unwrap_or(false)
        })
        .map(|(i, _)| i)
        .last()?;

    let i = idx.saturating_sub(offset).min(parents.len() - 1);
    Some(parents[i].to_path_buf())
}

/// Check whether any of the first `depth` parents of `p` has one of `names`
pub fn check_parents(p: &Path, depth: usize, names: &[&str]) -> bool {
    let names: Vec<String> = names.iter().map(|n| n.to_lowercase()).collect();

    p.ancestors().skip(1).take(depth).any(|parent| {
        parent
            .file_name()
            .map(|n| names.contains(&n.to_string_lossy().to_lowercase()))
            .unwrap_or(false)
    })
}

/// Copy each item in `src` into `dst`
///
/// Sub-folders that already exist in `dst` are skipped with a warning.
pub fn copy_folder_contents(src: &Path, dst: &Path) -> Result<()> {
    fs::create_dir_all(dst)?;

    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let target = dst.join(entry.file_name());

        if entry.file_type()?.is_dir() {
            if target.exists() {
                tracing::warn!("Dest folder exists, can't copy: {}", target.display());
                continue;
            }
            copy_tree(&entry.path(), &target)?;
        } else {
            fs::copy(entry.path(), &target)?;
        }
    }

    Ok(())
}

fn copy_tree(src: &Path, dst: &Path) -> Result<()> {
    for entry in WalkDir::new(src) {
        let entry = entry?;
        let rel = entry.path().strip_prefix(src).unwrap_or(entry.path());
        let target = dst.join(rel);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)?;
        } else {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}

/// Move a file or folder from `src` to `dst`
///
/// If `dst` is an existing folder the contents of `src` are merged into it and
/// `src` is removed. Cross-device moves fall back to copy + delete.
pub fn move_folder(src: &Path, dst: &Path) -> Result<()> {
    if !src.exists() || src == dst {
        return Ok(());
    }

    let result = (|| -> Result<()> {
        if dst.exists() && src.is_dir() {
            copy_folder_contents(src, dst)?;
            fs::remove_dir_all(src)?;
            return Ok(());
        }

        if let Some(parent) = dst.parent() {
            fs::create_dir_all(parent)?;
        }

        if fs::rename(src, dst).is_err() {
            if src.is_dir() {
                copy_tree(src, dst)?;
                fs::remove_dir_all(src)?;
            } else {
                fs::copy(src, dst)?;
                fs::remove_file(src)?;
            }
        }
        Ok(())
    })();

    if let Err(e) = &result {
        tracing::error!("Failed moving folder: {} ({})", src.display(), e);
    }
    result
}

/// Copy a single file, creating parent folders
///
/// Returns `false` if `dst` exists and `overwrite` is not set.
pub fn copy_file(src: &Path, dst: &Path, overwrite: bool) -> Result<bool> {
    if let Some(parent) = dst.parent() {
        fs::create_dir_all(parent)?;
    }

    if dst.exists() && !overwrite {
        tracing::info!("File already exists: {}", dst.display());
        return Ok(false);
    }

    fs::copy(src, dst)?;
    Ok(true)
}

/// Zip a file or folder to `{dst}.zip` (or `{src}.zip` when `dst` is None)
///
/// Archive entry names are relative to `src`. Returns `None` if `src` does
/// not exist.
pub fn zip_folder(src: &Path, dst: Option<&Path>, delete: bool) -> Result<Option<PathBuf>> {
    tracing::info!("zip_folder: {}", src.display());

    if !src.exists() {
        tracing::warn!("Can't zip file, doesn't exist: {}", src.display());
        return Ok(None);
    }

    let base = dst.unwrap_or(src);
    if let Some(parent) = base.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut p_zip = base.as_os_str().to_os_string();
    p_zip.push(".zip");
    let p_zip = PathBuf::from(p_zip);

    let mut zip = ZipWriter::new(File::create(&p_zip)?);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    if src.is_file() {
        let name = src
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        zip.start_file(name, options)?;
        io::copy(&mut File::open(src)?, &mut zip)?;
    } else {
        for entry in WalkDir::new(src).min_depth(1).sort_by_file_name() {
            let entry = entry?;
            let rel = entry
                .path()
                .strip_prefix(src)
                .unwrap_or(entry.path())
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");

            if entry.file_type().is_dir() {
                zip.add_directory(rel, options)?;
            } else {
                zip.start_file(rel, options)?;
                io::copy(&mut File::open(entry.path())?, &mut zip)?;
            }
        }
    }

    zip.finish()?;

    if delete {
        if src.is_dir() {
            fs::remove_dir_all(src)?;
        } else {
            fs::remove_file(src)?;
        }
    }

    Ok(Some(p_zip))
}

/// Parse the first `YYYY-MM-DD` date in a string
pub fn date_from_str(s: &str) -> Option<NaiveDate> {
    static EXPR: OnceLock<Option<Regex>> = OnceLock::new();
    let expr = EXPR
        .get_or_init(|| Regex::new(r"\d{4}-\d{2}-\d{2}").ok())
        .as_ref()?;

    expr.find(s)
        .and_then(|m| NaiveDate::parse_from_str(m.as_str(), "%Y-%m-%d").ok())
}

/// Human readable byte size, e.g. `1.5 KB`
pub fn size_readable(nbytes: u64) -> String {
    const SUFFIXES: [&str; 6] = ["B", "KB", "MB", "GB", "TB", "PB"];
    let mut size = nbytes as f64;
    let mut i = 0;
    while size >= 1024.0 && i < SUFFIXES.len() - 1 {
        size /= 1024.0;
        i += 1;
    }

    let s = format!("{:.2}", size);
    let s = s.trim_end_matches('0').trim_end_matches('.');
    format!("{} {}", s, SUFFIXES[i])
}

/// Total size of all files under `p`
pub fn calc_size(p: &Path) -> u64 {
    WalkDir::new(p)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter_map(|e| e.metadata().ok())
        .map(|m| m.len())
        .sum()
}
