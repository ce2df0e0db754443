//! `gtrack log` command - show recent import runs

use console::style;
use miette::Result;
use serde::Serialize;
use tabled::Tabled;

use crate::cli::helpers::load_config;
use crate::cli::output::{effective_format, print_json, print_rows, print_yaml};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::{ImportLogEntry, Store, Table};

#[derive(clap::Args, Debug)]
pub struct LogArgs {
    /// Number of runs to show
    #[arg(long, short = 'n', default_value_t = 20)]
    pub limit: usize,

    /// Only runs for this table (Faults, PLM, Downtime, DowntimeExclusions)
    #[arg(long, short = 't')]
    pub table: Option<Table>,
}

#[derive(Debug, Serialize, Tabled)]
struct LogRow {
    #[tabled(rename = "IMPORTED")]
    imported_at: String,
    #[tabled(rename = "TABLE")]
    table: String,
    #[tabled(rename = "FILES")]
    files: usize,
    #[tabled(rename = "ROWS ADDED")]
    rows_added: usize,
}

impl From<ImportLogEntry> for LogRow {
    fn from(e: ImportLogEntry) -> Self {
        Self {
            imported_at: e.imported_at,
            table: e.table,
            files: e.files,
            rows_added: e.rows_added,
        }
    }
}

pub fn run(args: LogArgs, global: &GlobalOpts) -> Result<()> {
    let config = load_config(global)?;
    let store = Store::open(&config.database)?;
    let entries = store.recent_imports(args.limit, args.table)?;

    match effective_format(global.format) {
        OutputFormat::Json => return print_json(&entries),
        OutputFormat::Yaml => return print_yaml(&entries),
        _ => {}
    }

    if entries.is_empty() {
        println!("No imports recorded.");
        return Ok(());
    }

    let n = entries.len();
    let rows: Vec<LogRow> = entries.into_iter().map(LogRow::from).collect();

    if effective_format(global.format) == OutputFormat::Table {
        println!("\n{}\n", style("Import Log").bold().underlined());
        print_rows(&rows, OutputFormat::Table)?;
        println!("\n{} import runs.", n);
        Ok(())
    } else {
        print_rows(&rows, OutputFormat::Tsv)
    }
}
