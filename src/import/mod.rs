//! Import pipeline - locating equipment exports and loading them into the store

pub mod combine;
pub mod dls;
pub mod downtime;
pub mod faults;
pub mod plm;
pub mod processor;
pub mod records;
pub mod search;
pub mod stats;

pub use combine::{combine_csv, combine_import_csvs, filter_existing, import_records, CombinedRecords};
pub use processor::{FileProcessor, ProcessSummary};
pub use search::{FileType, FolderSearch};

use crate::core::config::Config;
use crate::core::units::UnitRegistry;

/// Read-only state shared by parsers and folder operations
///
/// `Copy` and `Sync`, so rayon workers take it by value. The store stays
/// outside: a connection is not `Sync`.
#[derive(Debug, Clone, Copy)]
pub struct ImportContext<'a> {
    pub config: &'a Config,
    pub registry: &'a UnitRegistry,
}

impl<'a> ImportContext<'a> {
    pub fn new(config: &'a Config, registry: &'a UnitRegistry) -> Self {
        Self { config, registry }
    }
}
