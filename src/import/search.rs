//! Recursive folder search that classifies equipment export files by type
//!
//! Each [`FileType`] has an include ("find") regex and an exclude regex, both
//! matched against the lowercased file or folder name:
//!
//! - excluded names, and entries not modified after the cutoff, are skipped
//!   along with everything below them
//! - matching names are collected and not descended into
//! - other folders are searched one level deeper, up to `max_depth`

use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::{Duration, Local, NaiveDateTime};
use clap::ValueEnum;
use regex::Regex;
use serde::Serialize;
use walkdir::WalkDir;

use crate::core::error::{GtError, Result};
use crate::core::fileops;

/// Types of equipment export collected from download folders
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, ValueEnum, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    /// VHMS fault log csv (`fault0*.csv`)
    Fault,
    /// PLM haul cycle csv (`haul*.csv`)
    Plm,
    /// GE drive system download folder (`*dsc*`)
    Dsc,
    /// Vibration test export (`*.tr3`)
    Tr3,
    /// Autonomous haulage data folders (`data`, `dnevent`, `sfevent`)
    Ahs,
}

impl FileType {
    pub const ALL: [FileType; 5] = [
        FileType::Fault,
        FileType::Plm,
        FileType::Dsc,
        FileType::Tr3,
        FileType::Ahs,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FileType::Fault => "fault",
            FileType::Plm => "plm",
            FileType::Dsc => "dsc",
            FileType::Tr3 => "tr3",
            FileType::Ahs => "ahs",
        }
    }

    /// Include pattern
    pub fn find_expr(&self) -> &'static str {
        match self {
            FileType::Fault => r"fault0.*csv$",
            FileType::Plm => r"haul.*csv$",
            FileType::Dsc => r"dsc|\d{5}_\d{6}_\d{4}",
            FileType::Tr3 => r".*tr3$",
            FileType::Ahs => r"^data\d*$|^dnevent|^sfevent",
        }
    }

    /// Exclude patterns, joined with `|` into a single regex
    pub fn exclude_exprs(&self) -> Vec<&'static str> {
        const FR: &[&str] = &["frdls", "event", "data"];
        const BASE: &[&str] = &["stats", "system", "pic"];
        const VHMS: &[&str] = &["vhms", "chk"];
        const PLM: &[&str] = &["plm"];
        const GE: &[&str] = &["ge", "dsc"];

        let base = || BASE.iter().chain(FR).copied();
        let non_ge = || base().chain(GE.iter().copied());

        match self {
            FileType::Fault => non_ge().chain(PLM.iter().copied()).collect(),
            FileType::Plm => std::iter::once(r"\d{8}")
                .chain(non_ge())
                .chain(VHMS.iter().copied())
                .collect(),
            FileType::Dsc => std::iter::once(r"^a\d{5}$")
                .chain(base())
                .chain(PLM.iter().copied())
                .chain(VHMS.iter().copied())
                .collect(),
            FileType::Tr3 => non_ge()
                .chain(PLM.iter().copied())
                .chain(VHMS.iter().copied())
                .collect(),
            FileType::Ahs => Vec::new(),
        }
    }
}

impl std::fmt::Display for FileType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for FileType {
    type Err = GtError;

    fn from_str(s: &str) -> Result<Self> {
        FileType::ALL
            .iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s.trim()))
            .copied()
            .ok_or_else(|| GtError::UnknownFileType(s.to_string()))
    }
}

/// Recursive search for one file type
#[derive(Debug, Clone)]
pub struct FolderSearch {
    pub ftype: FileType,
    pub max_depth: usize,
    pub d_lower: NaiveDateTime,
    expr_find: Regex,
    expr_exclude: Option<Regex>,
}

impl FolderSearch {
    pub const DEFAULT_MAX_DEPTH: usize = 6;
    pub const DEFAULT_LOOKBACK_DAYS: i64 = 180;

    /// Build a search
    ///
    /// `max_depth` defaults to 6, `d_lower` to 180 days ago.
    pub fn new(ftype: FileType, max_depth: Option<usize>, d_lower: Option<NaiveDateTime>) -> Result<Self> {
        let d_lower = d_lower.unwrap_or_else(|| {
            Local::now().naive_local() - Duration::days(Self::DEFAULT_LOOKBACK_DAYS)
        });

        let exclude = ftype.exclude_exprs();
        let expr_exclude = if exclude.is_empty() {
            None
        } else {
            Some(Regex::new(&exclude.join("|"))?)
        };

        Ok(Self {
            ftype,
            max_depth: max_depth.unwrap_or(Self::DEFAULT_MAX_DEPTH),
            d_lower,
            expr_find: Regex::new(ftype.find_expr())?,
            expr_exclude,
        })
    }

    /// Check if a (lowercase) name matches the exclude pattern
    pub fn should_exclude(&self, name: &str) -> bool {
        self.expr_exclude
            .as_ref()
            .map(|e| e.is_match(name))
            .unwrap_or(false)
    }

    /// Check if a (lowercase) name matches the include pattern
    pub fn is_match(&self, name: &str) -> bool {
        self.expr_find.is_match(name)
    }

    /// Entry was modified strictly after the cutoff
    fn is_recent(&self, p: &Path) -> bool {
        match fileops::date_modified(p) {
            Ok(d) => d > self.d_lower,
            Err(e) => {
                tracing::warn!("Can't read modified date: {} ({})", p.display(), e);
                false
            }
        }
    }

    /// Collect all matching files/folders below `root`
    ///
    /// Children of `root` are at depth 0; folders are recursed while
    /// `depth < max_depth`. Results are sorted by path.
    pub fn search(&self, root: &Path) -> Vec<PathBuf> {
        let mut found = Vec::new();

        let mut it = WalkDir::new(root)
            .min_depth(1)
            .max_depth(self.max_depth + 1)
            .sort_by_file_name()
            .into_iter();

        while let Some(entry) = it.next() {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    tracing::warn!("Skipping unreadable entry: {}", e);
                    continue;
                }
            };

            let name = entry.file_name().to_string_lossy().to_lowercase();
            let is_dir = entry.path().is_dir();

            if self.should_exclude(&name) || !self.is_recent(entry.path()) {
                if is_dir {
                    it.skip_current_dir();
                }
                continue;
            }

            if self.is_match(&name) {
                found.push(entry.into_path());
                if is_dir {
                    it.skip_current_dir();
                }
            }
        }

        found.sort();
        tracing::debug!(
            "{}: found {} in {}",
            self.ftype,
            found.len(),
            root.display()
        );
        found
    }
}
