use crate::app_dirs::AppDirs;
use crate::error::{GincanaError, Result};
use crate::record::{timestamp_format, ResultRecord};
use chrono::{Local, NaiveDateTime, TimeZone};
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::fs::OpenOptions;
use std::io;
use std::path::{Path, PathBuf};

/// Append-only destination for finished sessions. Rows are never updated
/// or deleted, so concurrent sessions only ever add independent rows.
pub trait ResultStore {
    fn append(&mut self, record: &ResultRecord) -> Result<()>;
    fn read_all(&self) -> Result<Vec<ResultRecord>>;
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Default,
    Serialize,
    Deserialize,
    clap::ValueEnum,
    strum_macros::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum StoreKind {
    #[default]
    Csv,
    Sqlite,
    Memory,
}

/// Open the configured store, at `path` or at its default location
pub fn open_store(kind: StoreKind, path: Option<&Path>) -> Result<Box<dyn ResultStore>> {
    let store: Box<dyn ResultStore> = match kind {
        StoreKind::Csv => Box::new(CsvResultStore::new(
            path.map(Path::to_path_buf)
                .unwrap_or_else(AppDirs::results_csv_path),
        )),
        StoreKind::Sqlite => Box::new(SqliteResultStore::open(
            path.map(Path::to_path_buf)
                .unwrap_or_else(AppDirs::results_db_path),
        )?),
        StoreKind::Memory => Box::new(MemoryResultStore::default()),
    };
    tracing::debug!(%kind, "result store opened");
    Ok(store)
}

fn persistence<E: Display>(e: E) -> GincanaError {
    GincanaError::Persistence(e.to_string())
}

/// Spreadsheet-compatible CSV file, one row per saved session
#[derive(Debug, Clone)]
pub struct CsvResultStore {
    path: PathBuf,
}

impl CsvResultStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ResultStore for CsvResultStore {
    fn append(&mut self, record: &ResultRecord) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(persistence)?;
            }
        }

        // Only the session that creates the file writes the header
        let (file, needs_header) = match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&self.path)
        {
            Ok(file) => (file, true),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                let file = OpenOptions::new()
                    .append(true)
                    .open(&self.path)
                    .map_err(persistence)?;
                let empty = file.metadata().map_err(persistence)?.len() == 0;
                (file, empty)
            }
            Err(e) => return Err(persistence(e)),
        };

        let mut writer = csv::WriterBuilder::new()
            .has_headers(needs_header)
            .from_writer(file);
        writer.serialize(record)?;
        writer.flush().map_err(persistence)?;

        Ok(())
    }

    fn read_all(&self) -> Result<Vec<ResultRecord>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let mut reader = csv::Reader::from_path(&self.path)?;
        let headers = reader.headers()?.clone();
        let mut records = Vec::new();
        for row in reader.records() {
            let row = row?;
            // Two sessions racing on an empty file can both emit a header
            if row == headers {
                continue;
            }
            records.push(row.deserialize(Some(&headers))?);
        }
        Ok(records)
    }
}

/// SQLite-backed store with a single `results` table
#[derive(Debug)]
pub struct SqliteResultStore {
    conn: Connection,
}

impl SqliteResultStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(persistence)?;
            }
        }
        Self::with_connection(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS results (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp TEXT NOT NULL,
                agent_id TEXT NOT NULL,
                wpm REAL NOT NULL,
                accuracy REAL NOT NULL,
                errors INTEGER NOT NULL,
                typing_secs REAL NOT NULL,
                reading_secs REAL,
                reading_wpm REAL,
                comprehension_correct INTEGER,
                comprehension_total INTEGER,
                submitted TEXT NOT NULL
            )
            "#,
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_results_agent ON results(agent_id)",
            [],
        )?;

        Ok(Self { conn })
    }
}

impl ResultStore for SqliteResultStore {
    fn append(&mut self, record: &ResultRecord) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT INTO results
            (timestamp, agent_id, wpm, accuracy, errors, typing_secs, reading_secs,
             reading_wpm, comprehension_correct, comprehension_total, submitted)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
            params![
                record.timestamp.format(timestamp_format::FORMAT).to_string(),
                record.agent_id,
                record.wpm,
                record.accuracy,
                record.errors as i64,
                record.typing_secs,
                record.reading_secs,
                record.reading_wpm,
                record.comprehension_correct.map(|c| c as i64),
                record.comprehension_total.map(|c| c as i64),
                record.submitted,
            ],
        )?;

        Ok(())
    }

    fn read_all(&self) -> Result<Vec<ResultRecord>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT timestamp, agent_id, wpm, accuracy, errors, typing_secs, reading_secs,
                   reading_wpm, comprehension_correct, comprehension_total, submitted
            FROM results
            ORDER BY id
            "#,
        )?;

        let rows = stmt.query_map([], |row| {
            let raw_ts: String = row.get(0)?;
            let timestamp = NaiveDateTime::parse_from_str(&raw_ts, timestamp_format::FORMAT)
                .ok()
                .and_then(|naive| Local.from_local_datetime(&naive).earliest())
                .ok_or_else(|| {
                    rusqlite::Error::InvalidColumnType(
                        0,
                        "timestamp".to_string(),
                        rusqlite::types::Type::Text,
                    )
                })?;

            Ok(ResultRecord {
                timestamp,
                agent_id: row.get(1)?,
                wpm: row.get(2)?,
                accuracy: row.get(3)?,
                errors: row.get::<_, i64>(4)?.max(0) as usize,
                typing_secs: row.get(5)?,
                reading_secs: row.get(6)?,
                reading_wpm: row.get(7)?,
                comprehension_correct: row.get::<_, Option<i64>>(8)?.map(|c| c.max(0) as usize),
                comprehension_total: row.get::<_, Option<i64>>(9)?.map(|c| c.max(0) as usize),
                submitted: row.get(10)?,
            })
        })?;

        let mut records = Vec::new();
        for record in rows {
            records.push(record?);
        }
        Ok(records)
    }
}

/// In-process store for dry runs
#[derive(Debug, Default, Clone)]
pub struct MemoryResultStore {
    records: Vec<ResultRecord>,
}

impl MemoryResultStore {
    pub fn records(&self) -> &[ResultRecord] {
        &self.records
    }
}

impl ResultStore for MemoryResultStore {
    fn append(&mut self, record: &ResultRecord) -> Result<()> {
        self.records.push(record.clone());
        Ok(())
    }

    fn read_all(&self) -> Result<Vec<ResultRecord>> {
        Ok(self.records.clone())
    }
}
