//! SQLite store for units and imported equipment data
//!
//! Every import table carries a primary key on its business key columns, so
//! "insert only new rows" maps onto `INSERT OR IGNORE` and upserts map onto
//! `ON CONFLICT ... DO UPDATE`.

mod schema;
mod serialize;


pub use schema::Table;

use std::collections::HashSet;
use std::path::Path;

use chrono::{NaiveDate, NaiveDateTime, Utc};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};

use crate::core::error::Result;
use crate::core::record::{fmt_date, ImportRecord, RecordKey, DATETIME_FMT};
use crate::core::units::Unit;

macro_rules! unit_params {
    ($unit:expr) => {
        params![$unit.unit, $unit.serial, $unit.model, $unit.model_base, $unit.minesite]
    };
}

/// How rows whose key already exists are handled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImportMode {
    /// Skip rows whose key exists
    #[default]
    InsertNew,
    /// Overwrite non-key columns of existing rows
    Upsert,
}

/// Dates selecting downtime exclusions to update
#[derive(Debug, Clone)]
pub enum DateSelection {
    Between(NaiveDate, NaiveDate),
    Dates(Vec<NaiveDate>),
}

/// One row of import history
#[derive(Debug, Clone, serde::Serialize)]
pub struct ImportLogEntry {
    pub table: String,
    pub imported_at: String,
    pub files: usize,
    pub rows_added: usize,
}

/// Connection wrapper owning the schema
pub struct Store {
    conn: Connection,
}

impl Store {
    /// Open (and create if needed) the database file
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    /// In-memory database, used by tests and dry runs
    pub fn open_in_memory() -> Result<Self> {
        let store = Self {
            conn: Connection::open_in_memory()?,
        };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<()> {
        let mut sql = String::from("PRAGMA foreign_keys = ON;\n");
        for table in Table::ALL {
            sql.push_str(&table.create_sql());
            sql.push('\n');
        }
        sql.push_str(schema::IMPORT_LOG_SQL);
        self.conn.execute_batch(&sql)?;
        Ok(())
    }

    /// Raw connection access
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Number of rows in a table
    pub fn count(&self, table: Table) -> Result<usize> {
        let n: i64 = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", table.name()),
            [],
            |row| row.get(0),
        )?;
        Ok(n as usize)
    }

    /// Key values already present in `table`, optionally limited to `units`
    pub fn existing_keys(&self, table: Table, units: &[String]) -> Result<HashSet<RecordKey>> {
        let keys = table.key_columns();
        let mut sql = format!("SELECT {} FROM {}", keys.join(", "), table.name());

        if !units.is_empty() {
            let placeholders = vec!["?"; units.len()].join(", ");
            sql.push_str(&format!(" WHERE Unit IN ({})", placeholders));
        }

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(units.iter()), |row| {
            (0..keys.len())
                .map(|i| row.get::<_, String>(i))
                .collect::<rusqlite::Result<RecordKey>>()
        })?;

        let mut out = HashSet::new();
        for key in rows {
            out.insert(key?);
        }
        Ok(out)
    }

    /// Insert records in one transaction, returning rows inserted or changed
    ///
    /// Records are de-duplicated on their key first (first occurrence wins).
    pub fn insert_update<R: ImportRecord>(&mut self, records: &[R], mode: ImportMode) -> Result<usize> {
        let table = R::TABLE;
        let columns = table.columns();
        let placeholders = vec!["?"; columns.len()].join(", ");

        let mut sql = match mode {
            ImportMode::InsertNew => format!(
                "INSERT OR IGNORE INTO {} ({}) VALUES ({})",
                table.name(),
                columns.join(", "),
                placeholders
            ),
            ImportMode::Upsert => format!(
                "INSERT INTO {} ({}) VALUES ({}) ON CONFLICT ({}) ",
                table.name(),
                columns.join(", "),
                placeholders,
                table.key_columns().join(", ")
            ),
        };

        if mode == ImportMode::Upsert {
            let updates = table
                .value_columns()
                .iter()
                .map(|c| format!("{c} = excluded.{c}"))
                .collect::<Vec<_>>();
            if updates.is_empty() {
                sql.push_str("DO NOTHING");
            } else {
                sql.push_str(&format!("DO UPDATE SET {}", updates.join(", ")));
            }
        }

        let mut seen = HashSet::new();
        let mut changed = 0;

        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(&sql)?;
            for record in records {
                if !seen.insert(record.key()) {
                    continue;
                }
                changed += stmt.execute(params_from_iter(record.values()))?;
            }
        }
        tx.commit()?;

        tracing::info!("{}: {}", table.name(), changed);
        Ok(changed)
    }

    /// Latest PLM cycle stored for a unit
    pub fn max_plm_date(&self, unit: &str) -> Result<Option<NaiveDateTime>> {
        let max: Option<String> = self
            .conn
            .query_row(
                "SELECT MAX(DateTime) FROM PLM WHERE Unit = ?1",
                params![unit],
                |row| row.get(0),
            )
            .optional()?
            .flatten();

        Ok(max.and_then(|s| NaiveDateTime::parse_from_str(&s, DATETIME_FMT).ok()))
    }

    /// Set the MA flag on downtime exclusions for units on selected dates
    pub fn set_exclusion_ma(&self, units: &[String], dates: &DateSelection, ma: bool) -> Result<usize> {
        if units.is_empty() {
            return Ok(0);
        }

        let mut args: Vec<String> = units.to_vec();
        let mut sql = format!(
            "UPDATE DowntimeExclusions SET MA = {} WHERE Unit IN ({})",
            i32::from(ma),
            vec!["?"; units.len()].join(", ")
        );

        match dates {
            DateSelection::Between(from, to) => {
                sql.push_str(" AND Date BETWEEN ? AND ?");
                args.push(fmt_date(from));
                args.push(fmt_date(to));
            }
            DateSelection::Dates(dates) => {
                if dates.is_empty() {
                    return Ok(0);
                }
                sql.push_str(&format!(" AND Date IN ({})", vec!["?"; dates.len()].join(", ")));
                args.extend(dates.iter().map(fmt_date));
            }
        }

        let rows = self.conn.execute(&sql, params_from_iter(args.iter()))?;
        tracing::info!("Rows updated: {}", rows);
        Ok(rows)
    }

    /// Record an import run
    pub fn record_import(&self, table: Table, files: usize, rows_added: usize) -> Result<()> {
        self.conn.execute(
            "INSERT INTO ImportLog (TableName, ImportedAt, Files, RowsAdded) VALUES (?1, ?2, ?3, ?4)",
            params![
                table,
                Utc::now().naive_utc().format(DATETIME_FMT).to_string(),
                files as i64,
                rows_added as i64
            ],
        )?;
        Ok(())
    }

    /// Most recent import runs, newest first
    pub fn recent_imports(&self, limit: usize, table: Option<Table>) -> Result<Vec<ImportLogEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT TableName, ImportedAt, Files, RowsAdded FROM ImportLog
             WHERE ?1 IS NULL OR TableName = ?1
             ORDER BY id DESC LIMIT ?2",
        )?;

        let rows = stmt.query_map(params![table, limit as i64], |row| {
            let table: Table = row.get(0)?;
            Ok(ImportLogEntry {
                table: table.name().to_string(),
                imported_at: row.get(1)?,
                files: row.get::<_, i64>(2)? as usize,
                rows_added: row.get::<_, i64>(3)? as usize,
            })
        })?;

        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Insert or replace a unit in the registry
    pub fn upsert_unit(&self, unit: &Unit) -> Result<()> {
        self.conn.execute(UPSERT_UNIT_SQL, unit_params!(unit))?;
        Ok(())
    }

    /// Insert or replace several units in one transaction
    pub fn upsert_units(&mut self, units: &[Unit]) -> Result<usize> {
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(UPSERT_UNIT_SQL)?;
            for unit in units {
                stmt.execute(unit_params!(unit))?;
            }
        }
        tx.commit()?;
        tracing::info!("Upserted [{}] units", units.len());
        Ok(units.len())
    }

    /// All registered units, sorted by unit
    pub fn units(&self) -> Result<Vec<Unit>> {
        let mut stmt = self
            .conn
            .prepare("SELECT Unit, Serial, Model, ModelBase, MineSite FROM Units ORDER BY Unit")?;

        let rows = stmt.query_map([], |row| {
            Ok(Unit {
                unit: row.get(0)?,
                serial: row.get(1)?,
                model: row.get(2)?,
                model_base: row.get(3)?,
                minesite: row.get(4)?,
            })
        })?;

        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }
}

const UPSERT_UNIT_SQL: &str = "INSERT INTO Units (Unit, Serial, Model, ModelBase, MineSite) VALUES (?1, ?2, ?3, ?4, ?5)
     ON CONFLICT (Unit) DO UPDATE SET
        Serial = excluded.Serial,
        Model = excluded.Model,
        ModelBase = excluded.ModelBase,
        MineSite = excluded.MineSite";
