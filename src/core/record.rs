//! Record trait - common interface for rows imported into the store

use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::types::Value;

use crate::core::store::Table;

/// Canonical datetime text stored in SQLite and used in record keys
pub const DATETIME_FMT: &str = "%Y-%m-%d %H:%M:%S";

/// Canonical date text
pub const DATE_FMT: &str = "%Y-%m-%d";

/// Business key of a record, as canonical text in key-column order
pub type RecordKey = Vec<String>;

/// A row destined for one of the store's tables
pub trait ImportRecord: Send + Sync {
    /// Destination table
    const TABLE: Table;

    /// Key values in `TABLE.key_columns()` order
    fn key(&self) -> RecordKey;

    /// Equipment unit the record belongs to
    fn unit(&self) -> &str;

    /// Timestamp used for date filtering (None disables the filter)
    fn timestamp(&self) -> Option<NaiveDateTime> {
        None
    }

    /// Column values in `TABLE.columns()` order
    fn values(&self) -> Vec<Value>;
}

pub fn fmt_datetime(d: &NaiveDateTime) -> String {
    d.format(DATETIME_FMT).to_string()
}

pub fn fmt_date(d: &NaiveDate) -> String {
    d.format(DATE_FMT).to_string()
}

/// Convert an optional value into a SQL value, mapping None to NULL
pub fn opt<T: Into<Value>>(v: Option<T>) -> Value {
    v.map(Into::into).unwrap_or(Value::Null)
}
