//! `gtrack scan` command - list export files in unit folders
//!
//! Runs the same collection as `gtrack process` but only reports what it
//! found.

use chrono::NaiveDate;
use console::style;
use miette::Result;
use serde::Serialize;
use tabled::Tabled;

use crate::cli::helpers::{parse_date, resolve_units, since_or_default, Session};
use crate::cli::output::{effective_format, print_rows};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::UnitRegistry;
use crate::core::fileops::date_modified;
use crate::core::record::fmt_datetime;
use crate::import::{FileProcessor, FileType, ImportContext};

/// Unit and file selection shared by `scan` and `process`
#[derive(clap::Args, Debug)]
pub struct SelectArgs {
    /// File type to collect
    #[arg(long, short = 't', value_enum)]
    pub ftype: FileType,

    /// Units to search (comma separated)
    #[arg(long, short = 'u', value_delimiter = ',')]
    pub units: Vec<String>,

    /// Inclusive unit range, e.g. F301-F310
    #[arg(long, conflicts_with = "units")]
    pub range: Option<String>,

    #[arg(long)]
    pub minesite: Option<String>,

    /// Filter units by model (substring)
    #[arg(long)]
    pub model: Option<String>,

    /// Only files modified after this date (default: today minus `lookback_days`)
    #[arg(long, value_parser = parse_date)]
    pub since: Option<NaiveDate>,

    /// Folder levels to search below each search folder
    #[arg(long)]
    pub max_depth: Option<usize>,

    /// Top-level unit folder to search (repeatable, default from config)
    #[arg(long = "search-folder")]
    pub search_folders: Vec<String>,
}

impl SelectArgs {
    /// Registered units selected by `--units`, `--range`, `--minesite` and `--model`
    pub fn units(&self, registry: &UnitRegistry) -> Result<Vec<String>> {
        resolve_units(
            registry,
            &self.units,
            self.range.as_deref(),
            self.minesite.as_deref(),
            self.model.as_deref(),
        )
    }

    /// A processor configured from these arguments
    pub fn build<'a>(&self, ctx: ImportContext<'a>) -> FileProcessor<'a> {
        let mut processor = FileProcessor::new(self.ftype, ctx)
            .with_d_lower(since_or_default(self.since, ctx.config));
        if let Some(depth) = self.max_depth {
            processor = processor.with_max_depth(depth);
        }
        if !self.search_folders.is_empty() {
            processor = processor.with_search_folders(self.search_folders.clone());
        }
        processor
    }
}

#[derive(clap::Args, Debug)]
pub struct ScanArgs {
    #[command(flatten)]
    pub select: SelectArgs,

    /// Only print the number of files found
    #[arg(long)]
    pub count: bool,
}

#[derive(Debug, Serialize, Tabled)]
struct FileRow {
    #[tabled(rename = "UNIT")]
    unit: String,
    #[tabled(rename = "MODIFIED")]
    modified: String,
    #[tabled(rename = "PATH")]
    path: String,
}

pub fn run(args: ScanArgs, global: &GlobalOpts) -> Result<()> {
    let session = Session::open(global)?;
    let ctx = ImportContext::new(&session.config, &session.registry);
    let units = args.select.units(&session.registry)?;
    let mut processor = args.select.build(ctx);

    let files = processor.collect_files(&units)?;

    if args.count {
        println!("{}", files.len());
        return Ok(());
    }

    let rows: Vec<FileRow> = processor
        .collected()
        .iter()
        .flat_map(|(unit, files)| {
            files.iter().map(move |p| FileRow {
                unit: unit.clone(),
                modified: date_modified(p)
                    .map(|d| fmt_datetime(&d))
                    .unwrap_or_default(),
                path: p.display().to_string(),
            })
        })
        .collect();

    if rows.is_empty() {
        println!("No {} files found.", args.select.ftype);
        return Ok(());
    }

    print_rows(&rows, global.format)?;

    if effective_format(global.format) == OutputFormat::Table {
        println!(
            "\n{} {} files for {} units since {}",
            style(rows.len()).cyan(),
            args.select.ftype,
            units.len(),
            processor.d_lower.date()
        );
    }
    Ok(())
}
