//! Report history persistence
//!
//! Finished reports are kept in a local SQLite database alongside the
//! transcript they were generated from, so past visits can be listed,
//! re-read, searched, and deleted from the CLI.

use chrono::{DateTime, TimeZone, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid record: {0}")]
    Invalid(String),

    #[error("Report not found: {0}")]
    NotFound(String),
}

/// One saved report.
#[derive(Debug, Clone)]
pub struct StoredReport {
    pub id: String,
    pub transcription: String,
    pub report_content: String,
    pub report_type: String,
    pub created_at: DateTime<Utc>,
    pub duration_secs: Option<f64>,
    pub word_count: usize,
    pub patient_id: Option<String>,
    pub doctor_name: Option<String>,
    pub audio_url: Option<String>,
}

/// Generate a unique report ID.
pub fn generate_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// SQLite-backed report history.
pub struct ReportStore {
    conn: Connection,
}

impl ReportStore {
    /// Open (or create) the history database in the given directory.
    pub fn open(dir: &Path) -> Result<Self, StorageError> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join("reports.db");
        tracing::debug!("Opening report history at {:?}", path);
        let conn = Connection::open(&path)?;
        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    /// Open an in-memory database. Used by tests.
    pub fn open_in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()?;
        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<(), StorageError> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS reports (
                id TEXT PRIMARY KEY,
                transcription TEXT NOT NULL,
                report_content TEXT NOT NULL,
                report_type TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                duration_secs REAL,
                word_count INTEGER NOT NULL,
                patient_id TEXT,
                doctor_name TEXT,
                audio_url TEXT
            );
            CREATE INDEX IF NOT EXISTS idx_reports_created
                ON reports(created_at DESC);

            CREATE TABLE IF NOT EXISTS settings (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );",
        )?;
        Ok(())
    }

    /// Insert or replace a report.
    pub fn save(&self, report: &StoredReport) -> Result<(), StorageError> {
        if report.id.trim().is_empty() {
            return Err(StorageError::Invalid("report ID must not be empty".into()));
        }
        self.conn.execute(
            "INSERT OR REPLACE INTO reports
                (id, transcription, report_content, report_type, created_at,
                 duration_secs, word_count, patient_id, doctor_name, audio_url)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                report.id,
                report.transcription,
                report.report_content,
                report.report_type,
                report.created_at.timestamp(),
                report.duration_secs,
                report.word_count as i64,
                report.patient_id,
                report.doctor_name,
                report.audio_url,
            ],
        )?;
        tracing::debug!("Saved report {}", report.id);
        Ok(())
    }

    /// Fetch one report by ID.
    pub fn get(&self, id: &str) -> Result<StoredReport, StorageError> {
        self.conn
            .query_row(
                "SELECT id, transcription, report_content, report_type, created_at,
                        duration_secs, word_count, patient_id, doctor_name, audio_url
                 FROM reports WHERE id = ?1",
                params![id],
                row_to_report,
            )
            .optional()?
            .ok_or_else(|| StorageError::NotFound(id.to_string()))
    }

    /// List reports, newest first.
    pub fn list(&self, limit: usize) -> Result<Vec<StoredReport>, StorageError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, transcription, report_content, report_type, created_at,
                    duration_secs, word_count, patient_id, doctor_name, audio_url
             FROM reports ORDER BY created_at DESC LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit as i64], row_to_report)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Delete one report. Errors if it does not exist.
    pub fn delete(&self, id: &str) -> Result<(), StorageError> {
        let changed = self
            .conn
            .execute("DELETE FROM reports WHERE id = ?1", params![id])?;
        if changed == 0 {
            return Err(StorageError::NotFound(id.to_string()));
        }
        tracing::debug!("Deleted report {}", id);
        Ok(())
    }

    /// Case-insensitive substring search over transcripts and report bodies.
    pub fn search(&self, query: &str) -> Result<Vec<StoredReport>, StorageError> {
        let pattern = format!("%{}%", query);
        let mut stmt = self.conn.prepare(
            "SELECT id, transcription, report_content, report_type, created_at,
                    duration_secs, word_count, patient_id, doctor_name, audio_url
             FROM reports
             WHERE transcription LIKE ?1 OR report_content LIKE ?1
             ORDER BY created_at DESC",
        )?;
        let rows = stmt.query_map(params![pattern], row_to_report)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Read a persisted setting.
    pub fn get_setting(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self
            .conn
            .query_row(
                "SELECT value FROM settings WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?)
    }

    /// Write a persisted setting.
    pub fn set_setting(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.conn.execute(
            "INSERT OR REPLACE INTO settings (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }
}

fn row_to_report(row: &rusqlite::Row<'_>) -> rusqlite::Result<StoredReport> {
    let timestamp: i64 = row.get(4)?;
    let word_count: i64 = row.get(6)?;
    Ok(StoredReport {
        id: row.get(0)?,
        transcription: row.get(1)?,
        report_content: row.get(2)?,
        report_type: row.get(3)?,
        created_at: Utc
            .timestamp_opt(timestamp, 0)
            .single()
            .unwrap_or_else(Utc::now),
        duration_secs: row.get(5)?,
        word_count: word_count as usize,
        patient_id: row.get(7)?,
        doctor_name: row.get(8)?,
        audio_url: row.get(9)?,
    })
}
