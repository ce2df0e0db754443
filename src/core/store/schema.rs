//! Table definitions for the SQLite store

/// Destination tables for imported records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    Units,
    Faults,
    Plm,
    Downtime,
    DowntimeExclusions,
}

impl Table {
    pub const ALL: [Table; 5] = [
        Table::Units,
        Table::Faults,
        Table::Plm,
        Table::Downtime,
        Table::DowntimeExclusions,
    ];

    /// SQL table name
    pub fn name(&self) -> &'static str {
        match self {
            Table::Units => "Units",
            Table::Faults => "Faults",
            Table::Plm => "PLM",
            Table::Downtime => "Downtime",
            Table::DowntimeExclusions => "DowntimeExclusions",
        }
    }

    /// (column, SQL type) pairs in insert order
    pub fn column_defs(&self) -> &'static [(&'static str, &'static str)] {
        match self {
            Table::Units => &[
                ("Unit", "TEXT NOT NULL"),
                ("Serial", "TEXT NOT NULL"),
                ("Model", "TEXT NOT NULL"),
                ("ModelBase", "TEXT NOT NULL"),
                ("MineSite", "TEXT NOT NULL"),
            ],
            Table::Faults => &[
                ("Unit", "TEXT NOT NULL"),
                ("Code", "TEXT NOT NULL"),
                ("Time_From", "TEXT NOT NULL"),
                ("Time_To", "TEXT"),
                ("FaultCount", "INTEGER"),
                ("Message", "TEXT"),
            ],
            Table::Plm => &[
                ("Unit", "TEXT NOT NULL"),
                ("DateTime", "TEXT NOT NULL"),
                ("Payload", "REAL"),
                ("Swingloads", "INTEGER"),
                ("StatusFlag", "TEXT"),
                ("CarryBack", "REAL"),
                ("CycleTime", "INTEGER"),
                ("L_HaulDistance", "REAL"),
                ("L_MaxSpeed", "REAL"),
                ("E_MaxSpeed", "REAL"),
                ("MaxSprung", "REAL"),
                ("TruckType", "TEXT"),
                ("SprungWeight", "REAL"),
                ("Payload_Est", "REAL"),
                ("Payload_Quick", "REAL"),
                ("Payload_Gross", "REAL"),
            ],
            Table::Downtime => &[
                ("Unit", "TEXT NOT NULL"),
                ("StartDate", "TEXT NOT NULL"),
                ("EndDate", "TEXT NOT NULL"),
                ("Duration", "REAL"),
                ("DownReason", "TEXT"),
                ("Comment", "TEXT"),
                ("ShiftDate", "TEXT"),
                ("Origin", "TEXT"),
            ],
            Table::DowntimeExclusions => &[
                ("Unit", "TEXT NOT NULL"),
                ("Date", "TEXT NOT NULL"),
                ("Hours", "REAL NOT NULL"),
                ("MA", "INTEGER NOT NULL DEFAULT 1"),
            ],
        }
    }

    /// Column names in insert order
    pub fn columns(&self) -> Vec<&'static str> {
        self.column_defs().iter().map(|(name, _)| *name).collect()
    }

    /// Primary key columns
    pub fn key_columns(&self) -> &'static [&'static str] {
        match self {
            Table::Units => &["Unit"],
            Table::Faults => &["Unit", "Code", "Time_From"],
            Table::Plm => &["Unit", "DateTime"],
            Table::Downtime => &["Unit", "StartDate", "EndDate"],
            Table::DowntimeExclusions => &["Unit", "Date"],
        }
    }

    /// Non-key columns, updated on conflict when upserting
    pub fn value_columns(&self) -> Vec<&'static str> {
        let keys = self.key_columns();
        self.columns()
            .into_iter()
            .filter(|c| !keys.contains(c))
            .collect()
    }

    /// CREATE TABLE statement
    pub fn create_sql(&self) -> String {
        let cols = self
            .column_defs()
            .iter()
            .map(|(name, ty)| format!("    {} {}", name, ty))
            .collect::<Vec<_>>()
            .join(",\n");

        format!(
            "CREATE TABLE IF NOT EXISTS {} (\n{},\n    PRIMARY KEY ({})\n);",
            self.name(),
            cols,
            self.key_columns().join(", ")
        )
    }
}

impl std::fmt::Display for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Import history, one row per import run
pub const IMPORT_LOG_SQL: &str = "
CREATE TABLE IF NOT EXISTS ImportLog (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    TableName TEXT NOT NULL,
    ImportedAt TEXT NOT NULL,
    Files INTEGER NOT NULL,
    RowsAdded INTEGER NOT NULL
);
";
