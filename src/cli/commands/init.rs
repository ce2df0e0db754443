//! `gtrack init` command - write a default config and create the database

use std::path::PathBuf;

use console::style;
use miette::Result;

use crate::cli::helpers::load_config;
use crate::cli::GlobalOpts;
use crate::core::config::CONFIG_FILE;
use crate::core::{Config, Store};

#[derive(clap::Args, Debug)]
pub struct InitArgs {
    /// Overwrite an existing config file
    #[arg(long)]
    pub force: bool,

    /// Equipment drive root to write into the config
    #[arg(long)]
    pub drive: Option<PathBuf>,
}

pub fn run(args: InitArgs, global: &GlobalOpts) -> Result<()> {
    let path = global
        .config
        .clone()
        .unwrap_or_else(|| PathBuf::from(CONFIG_FILE));

    let config = if path.exists() && !args.force {
        println!(
            "{} Config already exists at {} (use --force to overwrite)",
            style("!").yellow(),
            style(path.display()).cyan()
        );
        load_config(global)?
    } else {
        let mut config = Config::default();
        if let Some(db) = &global.db {
            config.database = db.clone();
        }
        if let Some(drive) = args.drive {
            config.drive = drive;
        }
        config.write(&path)?;
        println!(
            "{} Wrote config {}",
            style("✓").green(),
            style(path.display()).cyan()
        );
        config
    };

    Store::open(&config.database)?;
    println!(
        "{} Initialized database {}",
        style("✓").green(),
        style(config.database.display()).cyan()
    );

    if config.drive_exists().is_err() {
        println!(
            "{} Equipment drive {} not found, set `drive:` before scanning",
            style("!").yellow(),
            config.drive.display()
        );
    }

    Ok(())
}
