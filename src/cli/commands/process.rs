//! `gtrack process` command - collect and process export files for units

use console::style;
use miette::Result;

use crate::cli::commands::scan::SelectArgs;
use crate::cli::helpers::Session;
use crate::cli::output::print_record;
use crate::cli::GlobalOpts;
use crate::import::{FileType, ImportContext, ProcessSummary};

#[derive(clap::Args, Debug)]
pub struct ProcessArgs {
    #[command(flatten)]
    pub select: SelectArgs,

    /// Combine fault/plm files without writing to the database
    #[arg(long)]
    pub no_import: bool,

    /// Start each unit at its latest imported PLM cycle
    #[arg(long, conflicts_with = "since")]
    pub since_last: bool,
}

pub fn run(args: ProcessArgs, global: &GlobalOpts) -> Result<()> {
    let Session {
        config,
        mut store,
        registry,
    } = Session::open(global)?;
    let ctx = ImportContext::new(&config, &registry);

    let units = args.select.units(&registry)?;
    let mut processor = args.select.build(ctx);
    if args.since_last {
        processor = processor.since_last(&store, &units)?;
    }

    let summary = processor.process(&units, None, &mut store, !args.no_import)?;

    print_record(&summary, global.format, || print_summary(&summary, args.no_import))
}

fn print_summary(summary: &ProcessSummary, no_import: bool) {
    println!(
        "{} Processed {} {} files for {} units",
        style("✓").green(),
        style(format!("{}/{}", summary.processed, summary.files_found)).cyan(),
        summary.ftype,
        summary.units
    );

    if summary.failed > 0 {
        println!(
            "{} {} files failed, rerun with -v for details",
            style("!").yellow(),
            summary.failed
        );
    }

    if matches!(summary.ftype, FileType::Fault | FileType::Plm) {
        match (&summary.records, no_import) {
            (Some(records), true) => println!(
                "  {} rows combined for {} (not imported)",
                style(records.len()).cyan(),
                records.table()
            ),
            _ => println!("  {} rows added", style(summary.rows_added).cyan()),
        }
    }
}
