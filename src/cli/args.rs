//! Command line arguments

use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};

use crate::cli::commands::combine::CombineArgs;
use crate::cli::commands::completions::CompletionsArgs;
use crate::cli::commands::dls::DlsCommands;
use crate::cli::commands::downtime::DowntimeCommands;
use crate::cli::commands::init::InitArgs;
use crate::cli::commands::log::LogArgs;
use crate::cli::commands::process::ProcessArgs;
use crate::cli::commands::scan::ScanArgs;
use crate::cli::commands::units::UnitsCommands;

/// Guest Tracker - import equipment exports and maintain download folders
#[derive(Parser, Debug)]
#[command(name = "gtrack", version, about, propagate_version = true)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Commands,
}

/// Options shared by every command
#[derive(Args, Debug, Clone)]
pub struct GlobalOpts {
    /// Config file (default: ./guesttracker.yaml, then the user config dir)
    #[arg(long, global = true, env = "GTRACK_CONFIG")]
    pub config: Option<PathBuf>,

    /// Database file, overrides `database:` in the config
    #[arg(long, global = true, env = "GTRACK_DB")]
    pub db: Option<PathBuf>,

    /// Output format
    #[arg(long, short = 'f', global = true, value_enum, default_value_t = OutputFormat::Auto)]
    pub format: OutputFormat,

    /// More logging (-v info, -vv debug)
    #[arg(long, short = 'v', global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Only log errors
    #[arg(long, short = 'q', global = true, conflicts_with = "verbose")]
    pub quiet: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Table for lists, plain text otherwise
    #[default]
    Auto,
    Table,
    Tsv,
    Json,
    Yaml,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write a default config and create the database
    Init(InitArgs),

    /// Manage the equipment unit registry
    #[command(subcommand)]
    Units(UnitsCommands),

    /// List export files found in unit folders, without changing anything
    Scan(ScanArgs),

    /// Collect and process export files for units
    Process(ProcessArgs),

    /// Combine and import explicit fault or plm csv files
    Combine(CombineArgs),

    /// Download folder operations
    #[command(subcommand)]
    Dls(DlsCommands),

    /// Import customer downtime and availability exclusions
    #[command(subcommand)]
    Downtime(DowntimeCommands),

    /// Show recent import runs
    Log(LogArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}
