//! `gtrack combine` command - combine and import explicit fault or plm csvs

use std::path::PathBuf;

use chrono::{NaiveDate, NaiveTime};
use console::style;
use miette::Result;
use serde::Serialize;

use crate::cli::helpers::{parse_date, Session};
use crate::cli::output::print_record;
use crate::cli::GlobalOpts;
use crate::core::ImportMode;
use crate::import::{combine_csv, FileType, ImportContext};

#[derive(clap::Args, Debug)]
pub struct CombineArgs {
    /// File type of the inputs (fault or plm)
    #[arg(long, short = 't', value_enum)]
    pub ftype: FileType,

    /// Files to combine
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Unit for plm files whose header doesn't identify one
    #[arg(long)]
    pub unit: Option<String>,

    /// Drop plm cycles before this date
    #[arg(long, value_parser = parse_date)]
    pub since: Option<NaiveDate>,

    /// Combine only, don't write to the database
    #[arg(long)]
    pub no_import: bool,

    /// Overwrite rows that already exist instead of skipping them
    #[arg(long, conflicts_with = "no_import")]
    pub upsert: bool,
}

#[derive(Debug, Serialize)]
struct CombineReport {
    table: &'static str,
    files: usize,
    failed: Vec<PathBuf>,
    rows: usize,
    rows_added: Option<usize>,
}

pub fn run(args: CombineArgs, global: &GlobalOpts) -> Result<()> {
    let Session {
        config,
        mut store,
        registry,
    } = Session::open(global)?;
    let ctx = ImportContext::new(&config, &registry);

    if let Some(unit) = &args.unit {
        registry.require(unit)?;
    }

    let d_lower = args.since.map(|d| d.and_time(NaiveTime::MIN));
    let combined = combine_csv(&args.files, args.ftype, ctx, d_lower, args.unit.as_deref())?;
    let table = combined.table();

    let mut report = CombineReport {
        table: table.name(),
        files: args.files.len(),
        failed: combined.failed().iter().map(|(p, _)| p.clone()).collect(),
        rows: combined.len(),
        rows_added: None,
    };

    if !args.no_import {
        let mode = if args.upsert {
            ImportMode::Upsert
        } else {
            ImportMode::InsertNew
        };
        let added = combined.import(&mut store, mode)?;
        store.record_import(table, args.files.len(), added)?;
        report.rows_added = Some(added);
    }

    print_record(&report, global.format, || {
        println!(
            "{} Combined {} rows from {} {} files",
            style("✓").green(),
            style(report.rows).cyan(),
            report.files - report.failed.len(),
            args.ftype
        );
        for p in &report.failed {
            println!("  {} {}", style("failed").red(), p.display());
        }
        match report.rows_added {
            Some(n) => println!("  {} rows added to {}", style(n).cyan(), report.table),
            None => println!("  {}", style("not imported (--no-import)").dim()),
        }
    })
}
