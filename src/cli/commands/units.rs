//! `gtrack units` command - manage the equipment unit registry

use std::path::PathBuf;

use console::style;
use miette::{IntoDiagnostic, Result};
use serde::Serialize;
use tabled::Tabled;

use crate::cli::helpers::{load_config, Session};
use crate::cli::output::print_rows;
use crate::cli::GlobalOpts;
use crate::core::units::UnitFolder;
use crate::core::{Store, Unit};

#[derive(clap::Subcommand, Debug)]
pub enum UnitsCommands {
    /// Add or update a single unit
    Add(AddArgs),

    /// List registered units
    List(ListArgs),

    /// Import units from a csv with Unit, Serial, Model, ModelBase, MineSite columns
    Import(ImportArgs),
}

#[derive(clap::Args, Debug)]
pub struct AddArgs {
    /// Unit name, e.g. F301
    pub unit: String,

    #[arg(long, short = 's')]
    pub serial: String,

    /// Full model, e.g. 980E-4
    #[arg(long, short = 'm')]
    pub model: String,

    /// Model base used for the folder mapping (default: model up to the first '-')
    #[arg(long)]
    pub model_base: Option<String>,

    #[arg(long)]
    pub minesite: String,
}

#[derive(clap::Args, Debug)]
pub struct ListArgs {
    #[arg(long)]
    pub minesite: Option<String>,

    /// Filter by model (substring)
    #[arg(long)]
    pub model: Option<String>,

    /// Include each unit's folder on the equipment drive
    #[arg(long)]
    pub paths: bool,
}

#[derive(clap::Args, Debug)]
pub struct ImportArgs {
    pub file: PathBuf,
}

#[derive(Debug, Serialize, Tabled)]
struct UnitRow {
    #[tabled(rename = "UNIT")]
    unit: String,
    #[tabled(rename = "SERIAL")]
    serial: String,
    #[tabled(rename = "MODEL")]
    model: String,
    #[tabled(rename = "MINESITE")]
    minesite: String,
    #[tabled(rename = "FOLDER")]
    folder: String,
}

pub fn run(cmd: UnitsCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        UnitsCommands::Add(args) => run_add(args, global),
        UnitsCommands::List(args) => run_list(args, global),
        UnitsCommands::Import(args) => run_import(args, global),
    }
}

fn run_add(args: AddArgs, global: &GlobalOpts) -> Result<()> {
    let config = load_config(global)?;
    let store = Store::open(&config.database)?;

    let model_base = args.model_base.unwrap_or_else(|| {
        args.model
            .split('-')
            .next()
            .unwrap_or(&args.model)
            .to_string()
    });

    let unit = Unit {
        unit: args.unit.trim().to_string(),
        serial: args.serial.trim().to_string(),
        model: args.model.trim().to_string(),
        model_base,
        minesite: args.minesite.trim().to_string(),
    };
    store.upsert_unit(&unit)?;

    println!(
        "{} Saved unit {} ({} {})",
        style("✓").green(),
        style(&unit.unit).cyan(),
        unit.model,
        unit.minesite
    );
    Ok(())
}

fn run_list(args: ListArgs, global: &GlobalOpts) -> Result<()> {
    let session = Session::open(global)?;

    let rows: Vec<UnitRow> = session
        .registry
        .all(args.minesite.as_deref(), args.model.as_deref())
        .into_iter()
        .map(|u| UnitRow {
            unit: u.unit.clone(),
            serial: u.serial.clone(),
            model: u.model.clone(),
            minesite: u.minesite.clone(),
            folder: if args.paths {
                UnitFolder::new(u, &session.config)
                    .map(|f| f.p_unit.display().to_string())
                    .unwrap_or_else(|e| e.to_string())
            } else {
                String::new()
            },
        })
        .collect();

    if rows.is_empty() {
        println!("No units found.");
        return Ok(());
    }

    print_rows(&rows, global.format)
}

fn run_import(args: ImportArgs, global: &GlobalOpts) -> Result<()> {
    let config = load_config(global)?;
    let mut store = Store::open(&config.database)?;

    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(&args.file)
        .into_diagnostic()?;

    let mut units = Vec::new();
    for (i, row) in reader.deserialize::<Unit>().enumerate() {
        match row {
            Ok(unit) => units.push(unit),
            // +2 for the header and 1-based rows
            Err(e) => tracing::warn!("{}: skipping row {}: {}", args.file.display(), i + 2, e),
        }
    }

    let added = store.upsert_units(&units)?;
    println!(
        "{} Imported {} units from {}",
        style("✓").green(),
        style(added).cyan(),
        args.file.display()
    );
    Ok(())
}
