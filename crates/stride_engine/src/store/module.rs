//! Module progress cache and unlock grants.
//!
//! `module_progress` is a derived cache upserted after every completion;
//! reads may observe it slightly stale, which is fine because unlock
//! decisions recompute completeness from lesson progress instead.
//!
//! `module_unlocks` rows are additive facts. INSERT OR IGNORE against
//! UNIQUE(learner, module, enrollment) makes the grant idempotent:
//! "row already exists" is a non-error.

use chrono::{DateTime, Utc};
use rusqlite::{params, Row};
use std::collections::HashSet;
use uuid::Uuid;

use stride_common::{ModuleProgress, Result};

use crate::db::{uuid_column, ProgressDb};

fn map_module_progress(row: &Row<'_>) -> rusqlite::Result<ModuleProgress> {
    Ok(ModuleProgress {
        id: uuid_column(0, row.get(0)?)?,
        learner_id: uuid_column(1, row.get(1)?)?,
        module_id: uuid_column(2, row.get(2)?)?,
        total_lessons: row.get::<_, i64>(3)? as u32,
        lessons_completed: row.get::<_, i64>(4)? as u32,
        progress: row.get(5)?,
        is_completed: row.get(6)?,
    })
}

impl ProgressDb {
    /// Upsert the per-module aggregate from freshly computed counts.
    pub fn upsert_module_progress(
        &self,
        learner_id: Uuid,
        module_id: Uuid,
        total_lessons: u32,
        lessons_completed: u32,
    ) -> Result<ModuleProgress> {
        let progress = if total_lessons == 0 {
            0.0
        } else {
            lessons_completed as f64 / total_lessons as f64
        };
        let is_completed = total_lessons > 0 && lessons_completed == total_lessons;

        self.conn.execute(
            "INSERT INTO module_progress
                 (id, learner_id, module_id, total_lessons, lessons_completed, progress, is_completed)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(learner_id, module_id) DO UPDATE SET
                 total_lessons = excluded.total_lessons,
                 lessons_completed = excluded.lessons_completed,
                 progress = excluded.progress,
                 is_completed = excluded.is_completed",
            params![
                Uuid::new_v4().to_string(),
                learner_id.to_string(),
                module_id.to_string(),
                total_lessons as i64,
                lessons_completed as i64,
                progress,
                is_completed,
            ],
        )?;

        self.module_progress(learner_id, module_id)?.ok_or_else(|| {
            stride_common::ProgressionError::InternalInconsistency(
                "module progress missing after upsert".into(),
            )
        })
    }

    /// Read the cached aggregate.
    pub fn module_progress(&self, learner_id: Uuid, module_id: Uuid) -> Result<Option<ModuleProgress>> {
        let result = self.conn.query_row(
            "SELECT id, learner_id, module_id, total_lessons, lessons_completed,
                    progress, is_completed
             FROM module_progress WHERE learner_id = ?1 AND module_id = ?2",
            params![learner_id.to_string(), module_id.to_string()],
            map_module_progress,
        );
        match result {
            Ok(mp) => Ok(Some(mp)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Create an unlock grant. Returns true when the row is new,
    /// false when the module was already unlocked for this enrollment.
    pub fn grant_module_unlock(
        &self,
        learner_id: Uuid,
        module_id: Uuid,
        enrollment_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let inserted = self.conn.execute(
            "INSERT OR IGNORE INTO module_unlocks
                 (id, learner_id, module_id, enrollment_id, unlocked_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                Uuid::new_v4().to_string(),
                learner_id.to_string(),
                module_id.to_string(),
                enrollment_id.to_string(),
                now,
            ],
        )?;
        Ok(inserted > 0)
    }

    /// Module ids explicitly unlocked for an enrollment.
    pub fn unlocked_module_ids(&self, learner_id: Uuid, enrollment_id: Uuid) -> Result<HashSet<Uuid>> {
        let mut stmt = self.conn.prepare(
            "SELECT module_id FROM module_unlocks
             WHERE learner_id = ?1 AND enrollment_id = ?2",
        )?;
        let rows = stmt.query_map(
            params![learner_id.to_string(), enrollment_id.to_string()],
            |row| row.get::<_, String>(0),
        )?;

        let mut ids = HashSet::new();
        for row in rows {
            if let Ok(id) = Uuid::parse_str(&row?) {
                ids.insert(id);
            }
        }
        Ok(ids)
    }

    /// Delete the learner's cached aggregates for the given modules.
    pub fn delete_module_progress(&self, learner_id: Uuid, module_ids: &[Uuid]) -> Result<usize> {
        let mut stmt = self.conn.prepare(
            "DELETE FROM module_progress WHERE learner_id = ?1 AND module_id = ?2",
        )?;
        let mut deleted = 0;
        for module_id in module_ids {
            deleted += stmt.execute(params![learner_id.to_string(), module_id.to_string()])?;
        }
        Ok(deleted)
    }

    /// Delete every unlock grant attached to an enrollment.
    pub fn delete_module_unlocks(&self, enrollment_id: Uuid) -> Result<usize> {
        let deleted = self.conn.execute(
            "DELETE FROM module_unlocks WHERE enrollment_id = ?1",
            params![enrollment_id.to_string()],
        )?;
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upsert_module_progress() {
        let db = ProgressDb::open_in_memory().unwrap();
        let learner = Uuid::new_v4();
        let module = Uuid::new_v4();

        let mp = db.upsert_module_progress(learner, module, 4, 2).unwrap();
        assert_eq!(mp.total_lessons, 4);
        assert_eq!(mp.lessons_completed, 2);
        assert!((mp.progress - 0.5).abs() < f64::EPSILON);
        assert!(!mp.is_completed);

        // Second upsert overwrites, still one row
        let mp = db.upsert_module_progress(learner, module, 4, 4).unwrap();
        assert!(mp.is_completed);
        let count: i64 = db
            .conn
            .query_row("SELECT COUNT(*) FROM module_progress", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_empty_module_is_not_complete() {
        let db = ProgressDb::open_in_memory().unwrap();
        let mp = db
            .upsert_module_progress(Uuid::new_v4(), Uuid::new_v4(), 0, 0)
            .unwrap();
        assert!(!mp.is_completed);
        assert_eq!(mp.progress, 0.0);
    }

    #[test]
    fn test_unlock_grant_idempotent() {
        let db = ProgressDb::open_in_memory().unwrap();
        let learner = Uuid::new_v4();
        let module = Uuid::new_v4();
        let enrollment = Uuid::new_v4();

        assert!(db
            .grant_module_unlock(learner, module, enrollment, Utc::now())
            .unwrap());
        // Duplicate grant is a non-error and reports "not new"
        assert!(!db
            .grant_module_unlock(learner, module, enrollment, Utc::now())
            .unwrap());

        let count: i64 = db
            .conn
            .query_row("SELECT COUNT(*) FROM module_unlocks", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);

        let ids = db.unlocked_module_ids(learner, enrollment).unwrap();
        assert!(ids.contains(&module));
    }

    #[test]
    fn test_delete_unlocks_by_enrollment() {
        let db = ProgressDb::open_in_memory().unwrap();
        let learner = Uuid::new_v4();
        let enrollment = Uuid::new_v4();

        db.grant_module_unlock(learner, Uuid::new_v4(), enrollment, Utc::now())
            .unwrap();
        db.grant_module_unlock(learner, Uuid::new_v4(), enrollment, Utc::now())
            .unwrap();

        assert_eq!(db.delete_module_unlocks(enrollment).unwrap(), 2);
        assert!(db.unlocked_module_ids(learner, enrollment).unwrap().is_empty());
    }
}
