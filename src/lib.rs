//! Guest Tracker: equipment telemetry import toolkit
//!
//! Finds fault, payload (PLM), GE drive (dsc), vibration (tr3) and AHS exports
//! in each unit's folders on the shared equipment drive, imports the csv data
//! into a SQLite database, and files download folders into a standard
//! `Downloads/{year}/{unit} - {date} - DLS` layout.

pub mod cli;
pub mod core;
pub mod import;
pub mod logging;
