//! Progress Database v0.4.0 - SQLite-backed progression stores
//!
//! One database holds every store the engine writes:
//! - learners: XP state per learner profile
//! - enrollments: one row per (learner, course), position pointer
//! - lesson_progress: per-lesson completion, UNIQUE(learner, lesson)
//! - module_progress: derived per-module cache, UNIQUE(learner, module)
//! - module_unlocks: explicit grants, UNIQUE(learner, module, enrollment)
//! - xp_ledger: append-only grant audit trail
//!
//! The unique constraints are the idempotency guards the concurrency
//! model relies on: duplicate completion requests and duplicate unlock
//! requests collapse onto one row.

use std::path::Path;

use rusqlite::Connection;
use tracing::info;
use uuid::Uuid;

use stride_common::Result;

/// Default database path.
pub const PROGRESS_DB_PATH: &str = "/var/lib/stride/progress.db";

/// SQLite-backed progression database.
pub struct ProgressDb {
    pub(crate) conn: Connection,
}

impl ProgressDb {
    /// Open or create the database at the default path.
    pub fn open() -> Result<Self> {
        Self::open_at(PROGRESS_DB_PATH)
    }

    /// Open at a specific path (for testing or embedding).
    pub fn open_at<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_ref = path.as_ref();
        if let Some(parent) = path_ref.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        let conn = Connection::open(path_ref)?;

        // WAL for concurrent short-lived callers
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        Self::create_schema(&conn)?;
        info!("progress db open at {}", path_ref.display());
        Ok(Self { conn })
    }

    /// Fully in-memory database for tests.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::create_schema(&conn)?;
        Ok(Self { conn })
    }

    fn create_schema(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS learners (
                id TEXT PRIMARY KEY,
                total_xp INTEGER NOT NULL DEFAULT 0,
                level INTEGER NOT NULL DEFAULT 1,
                xp_to_next_level INTEGER NOT NULL DEFAULT 100,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS enrollments (
                id TEXT PRIMARY KEY,
                learner_id TEXT NOT NULL,
                course_id TEXT NOT NULL,
                current_module_id TEXT,
                current_lesson_id TEXT,
                progress REAL NOT NULL DEFAULT 0,
                is_completed INTEGER NOT NULL DEFAULT 0,
                completed_at TEXT,
                enrolled_at TEXT NOT NULL,
                last_accessed_at TEXT NOT NULL,
                UNIQUE(learner_id, course_id)
            );

            CREATE TABLE IF NOT EXISTS lesson_progress (
                id TEXT PRIMARY KEY,
                learner_id TEXT NOT NULL,
                lesson_id TEXT NOT NULL,
                is_completed INTEGER NOT NULL DEFAULT 0,
                completed_at TEXT,
                score REAL,
                time_spent_secs INTEGER NOT NULL DEFAULT 0,
                attempts INTEGER NOT NULL DEFAULT 0,
                UNIQUE(learner_id, lesson_id)
            );

            CREATE INDEX IF NOT EXISTS idx_lesson_progress_learner
                ON lesson_progress(learner_id);

            CREATE TABLE IF NOT EXISTS module_progress (
                id TEXT PRIMARY KEY,
                learner_id TEXT NOT NULL,
                module_id TEXT NOT NULL,
                total_lessons INTEGER NOT NULL,
                lessons_completed INTEGER NOT NULL,
                progress REAL NOT NULL,
                is_completed INTEGER NOT NULL,
                UNIQUE(learner_id, module_id)
            );

            CREATE TABLE IF NOT EXISTS module_unlocks (
                id TEXT PRIMARY KEY,
                learner_id TEXT NOT NULL,
                module_id TEXT NOT NULL,
                enrollment_id TEXT NOT NULL,
                unlocked_at TEXT NOT NULL,
                UNIQUE(learner_id, module_id, enrollment_id)
            );

            CREATE INDEX IF NOT EXISTS idx_unlocks_enrollment
                ON module_unlocks(enrollment_id);

            CREATE TABLE IF NOT EXISTS xp_ledger (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                learner_id TEXT NOT NULL,
                amount INTEGER NOT NULL,
                source_kind TEXT NOT NULL,
                source_id TEXT NOT NULL,
                description TEXT NOT NULL,
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_ledger_learner
                ON xp_ledger(learner_id);
            "#,
        )?;
        Ok(())
    }
}

/// Decode a TEXT column into a Uuid inside a row-mapping closure.
pub(crate) fn uuid_column(idx: usize, value: String) -> rusqlite::Result<Uuid> {
    Uuid::parse_str(&value).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

/// Same for nullable TEXT columns.
pub(crate) fn opt_uuid_column(idx: usize, value: Option<String>) -> rusqlite::Result<Option<Uuid>> {
    value.map(|s| uuid_column(idx, s)).transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_open_at_creates_schema() {
        let tmp = NamedTempFile::new().unwrap();
        let db = ProgressDb::open_at(tmp.path()).unwrap();

        let count: i64 = db
            .conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name IN
                 ('learners','enrollments','lesson_progress','module_progress','module_unlocks','xp_ledger')",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(count, 6);
    }

    #[test]
    fn test_reopen_is_idempotent() {
        let tmp = NamedTempFile::new().unwrap();
        drop(ProgressDb::open_at(tmp.path()).unwrap());
        // Second open must not fail on existing tables
        let _ = ProgressDb::open_at(tmp.path()).unwrap();
    }

    #[test]
    fn test_uuid_column_rejects_garbage() {
        assert!(uuid_column(0, "not-a-uuid".to_string()).is_err());
        let id = Uuid::new_v4();
        assert_eq!(uuid_column(0, id.to_string()).unwrap(), id);
    }
}
