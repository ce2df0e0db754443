//! Error types shared by the import pipeline

use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

/// Result alias used throughout the library
pub type Result<T, E = GtError> = std::result::Result<T, E>;

/// Errors raised while locating, classifying and importing equipment files
#[derive(Debug, Error, Diagnostic)]
pub enum GtError {
    #[error("Equipment drive not found: {}", path.display())]
    #[diagnostic(
        code(gtrack::drive_not_found),
        help("Connect the shared drive or set `drive:` in guesttracker.yaml")
    )]
    DriveNotFound { path: PathBuf },

    #[error("Unit not found: {0}")]
    #[diagnostic(
        code(gtrack::unit_not_found),
        help("Add it with `gtrack units add` or `gtrack units import`")
    )]
    UnitNotFound(String),

    #[error("Couldn't determine unit for: {}", path.display())]
    #[diagnostic(code(gtrack::no_unit))]
    NoUnit { path: PathBuf },

    #[error("Couldn't determine date for: {}", path.display())]
    #[diagnostic(code(gtrack::no_date))]
    NoDate { path: PathBuf },

    #[error("No folder mapping for minesite '{minesite}', model '{model_base}'")]
    #[diagnostic(
        code(gtrack::no_unit_path),
        help("Add the mapping under `unit_paths:` in guesttracker.yaml")
    )]
    NoUnitPath {
        minesite: String,
        model_base: String,
    },

    #[error("Folder already exists: {}", path.display())]
    #[diagnostic(code(gtrack::folder_exists))]
    FolderExists { path: PathBuf },

    #[error("Incorrect file type '{0}', must be one of: fault, plm, dsc, tr3, ahs")]
    #[diagnostic(code(gtrack::unknown_file_type))]
    UnknownFileType(String),

    #[error("File type '{0}' has no csv import, expected fault or plm")]
    #[diagnostic(code(gtrack::no_csv_import))]
    NoCsvImport(String),

    #[error("Failed to parse {}: {message}", path.display())]
    #[diagnostic(code(gtrack::parse))]
    Parse { path: PathBuf, message: String },

    #[error("Configuration error: {0}")]
    #[diagnostic(code(gtrack::config))]
    Config(String),

    #[error("Invalid pattern: {0}")]
    Regex(#[from] regex::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("Thread pool error: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("Walk error: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl GtError {
    /// Build a parse error for a specific file
    pub fn parse(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        GtError::Parse {
            path: path.into(),
            message: message.into(),
        }
    }
}
