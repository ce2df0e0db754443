//! CLI command implementations

pub mod combine;
pub mod completions;
pub mod dls;
pub mod downtime;
pub mod init;
pub mod log;
pub mod process;
pub mod scan;
pub mod units;
