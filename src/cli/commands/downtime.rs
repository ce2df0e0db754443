//! `gtrack downtime` command - customer downtime and availability exclusions

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use console::style;
use miette::{bail, Result};
use serde::Serialize;

use crate::cli::helpers::{load_config, parse_date, resolve_units, Session};
use crate::cli::output::print_record;
use crate::cli::GlobalOpts;
use crate::core::{DateSelection, ImportMode, ImportRecord, Store};
use crate::import::downtime::{
    create_exclusions, read_downtime, read_exclusions, set_ma, DEFAULT_SKIP_ROWS,
};
use crate::import::import_records;

#[derive(clap::Subcommand, Debug)]
pub enum DowntimeCommands {
    /// Import downtime event exports
    Import(ImportArgs),

    /// Availability exclusions
    #[command(subcommand)]
    Exclusions(ExclusionCommands),
}

#[derive(clap::Subcommand, Debug)]
pub enum ExclusionCommands {
    /// Import downtime exclusion exports
    Import(ExclusionImportArgs),

    /// Create exclusions for units on given dates
    Create(CreateArgs),

    /// Set whether existing exclusions count against MA
    SetMa(SetMaArgs),
}

#[derive(clap::Args, Debug)]
pub struct ImportArgs {
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Preamble lines above the header
    #[arg(long, default_value_t = DEFAULT_SKIP_ROWS)]
    pub skip_rows: usize,

    /// Equipment model to keep (default from config)
    #[arg(long)]
    pub model: Option<String>,

    /// Overwrite existing rows instead of skipping them
    #[arg(long)]
    pub upsert: bool,
}

#[derive(clap::Args, Debug)]
pub struct ExclusionImportArgs {
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    #[arg(long)]
    pub upsert: bool,
}

/// Units given by name or range
#[derive(clap::Args, Debug)]
pub struct UnitArgs {
    #[arg(long, short = 'u', value_delimiter = ',', required_unless_present = "range")]
    pub units: Vec<String>,

    /// Inclusive unit range, e.g. F317-F330
    #[arg(long, conflicts_with = "units")]
    pub range: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct CreateArgs {
    /// Dates to exclude (comma separated YYYY-MM-DD)
    #[arg(long, value_delimiter = ',', value_parser = parse_date, required = true)]
    pub dates: Vec<NaiveDate>,

    #[command(flatten)]
    pub units: UnitArgs,

    /// Hours excluded per day
    #[arg(long, default_value_t = 24.0)]
    pub hours: f64,
}

#[derive(clap::Args, Debug)]
pub struct SetMaArgs {
    #[command(flatten)]
    pub units: UnitArgs,

    /// Specific dates (comma separated YYYY-MM-DD)
    #[arg(long, value_delimiter = ',', value_parser = parse_date, conflicts_with_all = ["from", "to"])]
    pub dates: Vec<NaiveDate>,

    /// Start of an inclusive date range
    #[arg(long, value_parser = parse_date, requires = "to")]
    pub from: Option<NaiveDate>,

    /// End of an inclusive date range
    #[arg(long, value_parser = parse_date, requires = "from")]
    pub to: Option<NaiveDate>,

    /// 1 if the exclusion applies to MA, 0 if not
    #[arg(long, default_value_t = 0, value_parser = clap::value_parser!(u8).range(0..=1))]
    pub ma: u8,
}

#[derive(Debug, Serialize)]
struct ImportReport {
    table: &'static str,
    files: usize,
    failed: Vec<PathBuf>,
    rows: usize,
    rows_added: usize,
}

pub fn run(cmd: DowntimeCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        DowntimeCommands::Import(args) => run_import(args, global),
        DowntimeCommands::Exclusions(ExclusionCommands::Import(args)) => {
            run_exclusion_import(args, global)
        }
        DowntimeCommands::Exclusions(ExclusionCommands::Create(args)) => run_create(args, global),
        DowntimeCommands::Exclusions(ExclusionCommands::SetMa(args)) => run_set_ma(args, global),
    }
}

fn mode(upsert: bool) -> ImportMode {
    if upsert {
        ImportMode::Upsert
    } else {
        ImportMode::InsertNew
    }
}

fn run_import(args: ImportArgs, global: &GlobalOpts) -> Result<()> {
    let config = load_config(global)?;
    let mut store = Store::open(&config.database)?;
    let model = args.model.unwrap_or_else(|| config.downtime_model.clone());

    let report = import_files(
        &args.files,
        |p| read_downtime(p, args.skip_rows, &model),
        &mut store,
        mode(args.upsert),
    )?;
    print_report(&report, global)
}

fn run_exclusion_import(args: ExclusionImportArgs, global: &GlobalOpts) -> Result<()> {
    let config = load_config(global)?;
    let mut store = Store::open(&config.database)?;

    let report = import_files(&args.files, read_exclusions, &mut store, mode(args.upsert))?;
    print_report(&report, global)
}

fn run_create(args: CreateArgs, global: &GlobalOpts) -> Result<()> {
    if args.hours <= 0.0 || args.hours > 24.0 {
        bail!("--hours must be between 0 and 24, got {}", args.hours);
    }

    let mut session = Session::open(global)?;
    let units = resolve_units(
        &session.registry,
        &args.units.units,
        args.units.range.as_deref(),
        None,
        None,
    )?;

    let records = create_exclusions(&args.dates, &units, args.hours);
    let rows = records.len();
    let added = import_records(records, &mut session.store, ImportMode::InsertNew)?;

    println!(
        "{} Created {} exclusions ({} already existed) for {} units on {} dates",
        style("✓").green(),
        style(added).cyan(),
        rows - added,
        units.len(),
        args.dates.len()
    );
    Ok(())
}

fn run_set_ma(args: SetMaArgs, global: &GlobalOpts) -> Result<()> {
    let dates = match (args.from, args.to) {
        (Some(from), Some(to)) if from <= to => DateSelection::Between(from, to),
        (Some(from), Some(to)) => bail!("--from {} is after --to {}", from, to),
        _ if !args.dates.is_empty() => DateSelection::Dates(args.dates),
        _ => bail!("Give either --dates or --from and --to"),
    };

    let session = Session::open(global)?;
    let units = resolve_units(
        &session.registry,
        &args.units.units,
        args.units.range.as_deref(),
        None,
        None,
    )?;

    let updated = set_ma(&session.store, &units, &dates, args.ma == 1)?;
    println!(
        "{} Set MA={} on {} exclusions",
        style("✓").green(),
        args.ma,
        style(updated).cyan()
    );
    Ok(())
}

/// Parse each file, skipping failures, and import all rows together
fn import_files<R, F>(files: &[PathBuf], parse: F, store: &mut Store, mode: ImportMode) -> Result<ImportReport>
where
    R: ImportRecord,
    F: Fn(&Path) -> crate::core::Result<Vec<R>>,
{
    let mut records = Vec::new();
    let mut failed = Vec::new();

    for p in files {
        match parse(p) {
            Ok(rows) => records.extend(rows),
            Err(e) => {
                tracing::warn!("Failed to read {}: {}", p.display(), e);
                failed.push(p.clone());
            }
        }
    }

    let rows = records.len();
    let rows_added = import_records(records, store, mode)?;
    store.record_import(R::TABLE, files.len() - failed.len(), rows_added)?;

    Ok(ImportReport {
        table: R::TABLE.name(),
        files: files.len(),
        failed,
        rows,
        rows_added,
    })
}

fn print_report(report: &ImportReport, global: &GlobalOpts) -> Result<()> {
    print_record(report, global.format, || {
        println!(
            "{} Imported {} of {} rows into {} from {} files",
            style("✓").green(),
            style(report.rows_added).cyan(),
            report.rows,
            report.table,
            report.files - report.failed.len()
        );
        for p in &report.failed {
            println!("  {} {}", style("failed").red(), p.display());
        }
    })
}
