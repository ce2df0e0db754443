//! Output formatting utilities

use std::io::IsTerminal;

use miette::{IntoDiagnostic, Result};
use serde::Serialize;
use tabled::settings::Style;
use tabled::{Table, Tabled};

use crate::cli::OutputFormat;

/// Determine the effective output format based on context
///
/// `Auto` renders tables on a terminal and tab-separated rows when piped.
pub fn effective_format(format: OutputFormat) -> OutputFormat {
    match format {
        OutputFormat::Auto => {
            if std::io::stdout().is_terminal() {
                OutputFormat::Table
            } else {
                OutputFormat::Tsv
            }
        }
        other => other,
    }
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).into_diagnostic()?;
    println!("{}", json);
    Ok(())
}

pub fn print_yaml<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let yaml = serde_yml::to_string(value).into_diagnostic()?;
    print!("{}", yaml);
    Ok(())
}

/// Print a list of rows in the requested format
pub fn print_rows<T: Tabled + Serialize>(rows: &[T], format: OutputFormat) -> Result<()> {
    match effective_format(format) {
        OutputFormat::Json => print_json(rows),
        OutputFormat::Yaml => print_yaml(rows),
        OutputFormat::Tsv => {
            println!("{}", T::headers().join("\t"));
            for row in rows {
                println!("{}", row.fields().join("\t"));
            }
            Ok(())
        }
        _ => {
            let mut table = Table::new(rows);
            table.with(Style::rounded());
            println!("{}", table);
            Ok(())
        }
    }
}

/// Print a single result, serialized for json/yaml and via `human` otherwise
pub fn print_record<T: Serialize>(value: &T, format: OutputFormat, human: impl FnOnce()) -> Result<()> {
    match format {
        OutputFormat::Json => print_json(value),
        OutputFormat::Yaml => print_yaml(value),
        _ => {
            human();
            Ok(())
        }
    }
}
