//! Core module - configuration, units, storage and filesystem helpers

pub mod config;
pub mod error;
pub mod fileops;
pub mod record;
pub mod store;
pub mod units;

pub use config::Config;
pub use error::{GtError, Result};
pub use record::{ImportRecord, RecordKey};
pub use store::{DateSelection, ImportLogEntry, ImportMode, Store, Table};
pub use units::{Unit, UnitFolder, UnitRegistry};
