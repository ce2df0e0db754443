//! CLI module - argument parsing and command dispatch

pub mod args;
pub mod commands;
pub mod helpers;
pub mod output;

pub use args::{Cli, Commands, GlobalOpts, OutputFormat};

/// Run a parsed command line
pub fn run(cli: Cli) -> miette::Result<()> {
    let global = &cli.global;

    match cli.command {
        Commands::Init(args) => commands::init::run(args, global),
        Commands::Units(cmd) => commands::units::run(cmd, global),
        Commands::Scan(args) => commands::scan::run(args, global),
        Commands::Process(args) => commands::process::run(args, global),
        Commands::Combine(args) => commands::combine::run(args, global),
        Commands::Dls(cmd) => commands::dls::run(cmd, global),
        Commands::Downtime(cmd) => commands::downtime::run(cmd, global),
        Commands::Log(args) => commands::log::run(args, global),
        Commands::Completions(args) => commands::completions::run(args),
    }
}
