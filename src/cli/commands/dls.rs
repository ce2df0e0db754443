//! `gtrack dls` command - upload download folders and find recent ones

use std::path::PathBuf;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use console::style;
use miette::Result;
use serde::Serialize;
use tabled::Tabled;

use crate::cli::helpers::{parse_date, resolve_units, Session};
use crate::cli::output::{effective_format, print_json, print_record, print_rows, print_yaml};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::fileops::{calc_size, size_readable};
use crate::core::record::fmt_date;
use crate::core::UnitRegistry;
use crate::import::dls::{
    date_from_dsc, get_recent_dls_unit, get_recent_dsc_all, import_dls, zip_recent_dls, zip_recent_dsc,
    DlsImportResult, StepResult,
};
use crate::import::processor::FileProcessor;
use crate::import::stats::{import_stats, smr_from_stats, DscStats};
use crate::import::ImportContext;

#[derive(clap::Subcommand, Debug)]
pub enum DlsCommands {
    /// Import a local download folder and move it onto the equipment drive
    Import(ImportArgs),

    /// Show (or zip) a unit's most recent download folder
    Recent(RecentArgs),

    /// List the most recent dsc export per unit
    Dsc(DscArgs),

    /// Read truck stats from dsc exports or SERIAL csv files
    Stats(StatsArgs),
}

#[derive(clap::Args, Debug)]
pub struct ImportArgs {
    /// Download folder, named e.g. "F301 - 2021-03-04" or anything containing exports
    pub path: PathBuf,
}

#[derive(clap::Args, Debug)]
pub struct RecentArgs {
    pub unit: String,

    /// Zip the folder in place
    #[arg(long)]
    pub zip: bool,
}

/// Units to search, for `dsc` and `stats`
#[derive(clap::Args, Debug)]
pub struct DlsUnitArgs {
    /// Units (comma separated, default: all registered)
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

    /// Only exports modified after this date (default: 2020-01-01)
    #[arg(long, value_parser = parse_date)]
    pub since: Option<NaiveDate>,
}

impl DlsUnitArgs {
    fn units(&self, registry: &UnitRegistry) -> Result<Vec<String>> {
        resolve_units(
            registry,
            &self.units,
            self.range.as_deref(),
            self.minesite.as_deref(),
            self.model.as_deref(),
        )
    }

    fn d_lower(&self) -> NaiveDateTime {
        self.since
            .map(|d| d.and_time(NaiveTime::MIN))
            .unwrap_or_else(FileProcessor::default_d_lower)
    }
}

#[derive(clap::Args, Debug)]
pub struct DscArgs {
    #[command(flatten)]
    pub select: DlsUnitArgs,

    /// Only search this year's folder, when it exists
    #[arg(long)]
    pub year: Option<i32>,

    /// List every dsc export, newest first
    #[arg(long, conflicts_with = "zip")]
    pub all: bool,

    /// Zip the download folder holding each newest export
    #[arg(long)]
    pub zip: bool,
}

#[derive(clap::Args, Debug)]
pub struct StatsArgs {
    /// SERIAL csv files to read instead of searching unit folders
    pub files: Vec<PathBuf>,

    #[command(flatten)]
    pub select: DlsUnitArgs,
}

#[derive(Debug, Serialize, Tabled)]
struct DscRow {
    #[tabled(rename = "UNIT")]
    unit: String,
    #[tabled(rename = "DATE")]
    date: String,
    #[tabled(rename = "PATH")]
    path: String,
}

#[derive(Debug, Serialize, Tabled)]
struct StatsRow {
    #[tabled(rename = "UNIT")]
    unit: String,
    #[tabled(rename = "DATE")]
    date: String,
    #[tabled(rename = "SERIAL")]
    serial: String,
    #[tabled(rename = "MODEL")]
    model: String,
    #[tabled(rename = "ENGINE HRS")]
    engine_hrs: String,
    #[tabled(rename = "SOURCE")]
    source: String,
}

impl From<&DscStats> for StatsRow {
    fn from(s: &DscStats) -> Self {
        Self {
            unit: s.unit.clone().unwrap_or_default(),
            date: s.date.as_ref().map(fmt_date).unwrap_or_default(),
            serial: s.serial.clone().unwrap_or_default(),
            model: s.model.clone().unwrap_or_default(),
            engine_hrs: s.engine_hrs.map(|h| format!("{:.1}", h)).unwrap_or_default(),
            source: s.source.display().to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
struct RecentReport {
    unit: String,
    path: Option<PathBuf>,
    zipped: bool,
}

pub fn run(cmd: DlsCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        DlsCommands::Import(args) => run_import(args, global),
        DlsCommands::Recent(args) => run_recent(args, global),
        DlsCommands::Dsc(args) => run_dsc(args, global),
        DlsCommands::Stats(args) => run_stats(args, global),
    }
}

fn run_import(args: ImportArgs, global: &GlobalOpts) -> Result<()> {
    let Session {
        config,
        mut store,
        registry,
    } = Session::open(global)?;
    let ctx = ImportContext::new(&config, &registry);

    let result = import_dls(&args.path, ctx, &mut store)?;
    print_record(&result, global.format, || print_import(&result))
}

fn print_import(result: &DlsImportResult) {
    println!(
        "{} Uploaded {} in {:.1}s",
        style("✓").green(),
        style(&result.name).cyan(),
        result.time_total.as_secs_f64()
    );
    println!(
        "  {} ({})",
        style(result.dst.display()).dim(),
        size_readable(calc_size(&result.dst))
    );

    let step = |name: &str, s: &StepResult| {
        println!("  {:<8} {:>6}  {:>6.1}s", name, s.num, s.time.as_secs_f64());
    };
    step("fault", &result.fault);
    step("plm", &result.plm);
    step("ge zip", &result.ge_zip);
    step("ahs zip", &result.ahs_zip);
}

fn run_recent(args: RecentArgs, global: &GlobalOpts) -> Result<()> {
    let session = Session::open(global)?;
    let ctx = ImportContext::new(&session.config, &session.registry);
    session.registry.require(&args.unit)?;

    let path = if args.zip {
        zip_recent_dls(&args.unit, ctx)?
    } else {
        get_recent_dls_unit(&args.unit, ctx)?
    };

    let report = RecentReport {
        unit: args.unit,
        path,
        zipped: args.zip,
    };

    print_record(&report, global.format, || match &report.path {
        Some(p) if report.zipped => {
            println!("{} Zipped {}", style("✓").green(), style(p.display()).cyan())
        }
        Some(p) => println!("{}", p.display()),
        None => println!("No download folders found for {}.", report.unit),
    })
}

fn run_dsc(args: DscArgs, global: &GlobalOpts) -> Result<()> {
    let session = Session::open(global)?;
    let ctx = ImportContext::new(&session.config, &session.registry);
    let units = args.select.units(&session.registry)?;
    let d_lower = args.select.d_lower();

    if args.zip {
        let zipped = zip_recent_dsc(&units, ctx, d_lower)?;
        return print_record(&zipped, global.format, || {
            for p in &zipped {
                println!("{} Zipped {}", style("✓").green(), style(p.display()).cyan());
            }
            if zipped.is_empty() {
                println!("No dsc exports found.");
            }
        });
    }

    let recent = get_recent_dsc_all(&units, ctx, d_lower, args.year)?;
    let rows: Vec<DscRow> = recent
        .iter()
        .flat_map(|(unit, found)| {
            let n = if args.all { found.len() } else { 1 };
            found.iter().take(n).map(move |p| DscRow {
                unit: unit.clone(),
                date: date_from_dsc(p)
                    .map(|d| fmt_date(&d.date()))
                    .unwrap_or_default(),
                path: p.display().to_string(),
            })
        })
        .collect();

    if rows.is_empty() {
        println!("No dsc exports found.");
        return Ok(());
    }
    print_rows(&rows, global.format)
}

fn run_stats(args: StatsArgs, global: &GlobalOpts) -> Result<()> {
    let session = Session::open(global)?;
    let ctx = ImportContext::new(&session.config, &session.registry);

    let stats = if args.files.is_empty() {
        let units = args.select.units(&session.registry)?;
        let recent = get_recent_dsc_all(&units, ctx, args.select.d_lower(), None)?;
        import_stats(&recent, &session.registry)
    } else {
        smr_from_stats(&args.files, &session.registry)?
    };

    match effective_format(global.format) {
        OutputFormat::Json => return print_json(&stats),
        OutputFormat::Yaml => return print_yaml(&stats),
        _ => {}
    }

    if stats.is_empty() {
        println!("No stats found.");
        return Ok(());
    }
    let rows: Vec<StatsRow> = stats.iter().map(StatsRow::from).collect();
    print_rows(&rows, global.format)
}
