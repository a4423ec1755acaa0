use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{Connection, params};

use super::{SyncError, SyncLogError, SyncReport};

/// Persisted audit trail of sync runs.
#[derive(Debug)]
pub struct SyncLog {
    connection: Connection,
    location: PathBuf,
}

impl SyncLog {
    /// Open (or create) the run log at the supplied path.
    pub fn initialise(path: &Path) -> Result<Self, SyncLogError> {
        let connection = Connection::open(path).map_err(|source| SyncLogError::Initialise {
            source,
            path: path.to_path_buf(),
        })?;
        connection
            .execute(
                "CREATE TABLE IF NOT EXISTS sync_runs (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    started_at TEXT NOT NULL,
                    finished_at TEXT NOT NULL,
                    status TEXT NOT NULL,
                    created INTEGER NOT NULL DEFAULT 0,
                    updated INTEGER NOT NULL DEFAULT 0,
                    deleted INTEGER NOT NULL DEFAULT 0,
                    unchanged INTEGER NOT NULL DEFAULT 0,
                    pages_fetched INTEGER NOT NULL DEFAULT 0,
                    listings_fetched INTEGER NOT NULL DEFAULT 0,
                    validation_failures INTEGER NOT NULL DEFAULT 0,
                    apply_failures INTEGER NOT NULL DEFAULT 0,
                    error TEXT
                )",
                [],
            )
            .map_err(|source| SyncLogError::Initialise {
                source,
                path: path.to_path_buf(),
            })?;
        Ok(Self {
            connection,
            location: path.to_path_buf(),
        })
    }

    /// Record a run that reached the end of its apply phase.
    pub fn record(&self, report: &SyncReport) -> Result<(), SyncLogError> {
        let status = if report.apply_failures.is_empty() {
            "completed"
        } else {
            "completed_with_failures"
        };
        self.connection
            .execute(
                "INSERT INTO sync_runs (
                    started_at,
                    finished_at,
                    status,
                    created,
                    updated,
                    deleted,
                    unchanged,
                    pages_fetched,
                    listings_fetched,
                    validation_failures,
                    apply_failures
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                params![
                    timestamp(report.started_at),
                    timestamp(report.finished_at),
                    status,
                    count("created", report.created)?,
                    count("updated", report.updated)?,
                    count("deleted", report.deleted)?,
                    count("unchanged", report.unchanged)?,
                    i64::from(report.pages_fetched),
                    count("listings_fetched", report.listings_fetched)?,
                    count("validation_failures", report.validation_failures.len())?,
                    count("apply_failures", report.apply_failures.len())?,
                ],
            )
            .map_err(|source| SyncLogError::Record { source })?;
        Ok(())
    }

    /// Record a run that aborted before touching the catalog.
    pub fn record_failure(
        &self,
        started_at: DateTime<Utc>,
        finished_at: DateTime<Utc>,
        error: &SyncError,
    ) -> Result<(), SyncLogError> {
        let status = match error {
            SyncError::Cancelled => "cancelled",
            _ => "failed",
        };
        self.connection
            .execute(
                "INSERT INTO sync_runs (started_at, finished_at, status, error)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    timestamp(started_at),
                    timestamp(finished_at),
                    status,
                    error.to_string()
                ],
            )
            .map_err(|source| SyncLogError::Record { source })?;
        Ok(())
    }

    /// Location of the underlying SQLite database.
    pub fn path(&self) -> &Path {
        &self.location
    }

    #[cfg(test)]
    pub(crate) fn connection(&self) -> &Connection {
        &self.connection
    }
}

fn timestamp(moment: DateTime<Utc>) -> String {
    moment.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn count(what: &'static str, value: usize) -> Result<i64, SyncLogError> {
    i64::try_from(value).map_err(|_| SyncLogError::ValueOutOfRange { what })
}
