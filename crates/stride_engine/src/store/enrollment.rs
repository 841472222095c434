//! Enrollment store.
//!
//! One row per (learner, course); owns the learner's position pointer.
//! Enroll is idempotent: INSERT OR IGNORE against the unique pair, then
//! fetch whatever row exists.

use chrono::Utc;
use rusqlite::{params, Row};
use uuid::Uuid;

use stride_common::{Enrollment, ProgressionError, Result};

use crate::db::{opt_uuid_column, uuid_column, ProgressDb};

fn map_enrollment(row: &Row<'_>) -> rusqlite::Result<Enrollment> {
    Ok(Enrollment {
        id: uuid_column(0, row.get(0)?)?,
        learner_id: uuid_column(1, row.get(1)?)?,
        course_id: uuid_column(2, row.get(2)?)?,
        current_module_id: opt_uuid_column(3, row.get(3)?)?,
        current_lesson_id: opt_uuid_column(4, row.get(4)?)?,
        progress: row.get(5)?,
        is_completed: row.get(6)?,
        completed_at: row.get(7)?,
        enrolled_at: row.get(8)?,
        last_accessed_at: row.get(9)?,
    })
}

const ENROLLMENT_COLUMNS: &str = "id, learner_id, course_id, current_module_id, \
     current_lesson_id, progress, is_completed, completed_at, enrolled_at, last_accessed_at";

impl ProgressDb {
    /// Create the enrollment if it does not exist yet, then return it.
    pub fn enroll(&self, learner_id: Uuid, course_id: Uuid) -> Result<Enrollment> {
        let now = Utc::now();
        self.conn.execute(
            "INSERT OR IGNORE INTO enrollments
                 (id, learner_id, course_id, progress, is_completed, enrolled_at, last_accessed_at)
             VALUES (?1, ?2, ?3, 0, 0, ?4, ?4)",
            params![
                Uuid::new_v4().to_string(),
                learner_id.to_string(),
                course_id.to_string(),
                now
            ],
        )?;
        self.enrollment(learner_id, course_id)?.ok_or_else(|| {
            ProgressionError::InternalInconsistency("enrollment missing after insert".into())
        })
    }

    /// Fetch the enrollment for a (learner, course) pair.
    pub fn enrollment(&self, learner_id: Uuid, course_id: Uuid) -> Result<Option<Enrollment>> {
        let sql = format!(
            "SELECT {} FROM enrollments WHERE learner_id = ?1 AND course_id = ?2",
            ENROLLMENT_COLUMNS
        );
        let result = self.conn.query_row(
            &sql,
            params![learner_id.to_string(), course_id.to_string()],
            map_enrollment,
        );
        match result {
            Ok(e) => Ok(Some(e)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Persist every mutable enrollment field.
    pub fn update_enrollment(&self, enrollment: &Enrollment) -> Result<()> {
        self.conn.execute(
            "UPDATE enrollments SET
                 current_module_id = ?2,
                 current_lesson_id = ?3,
                 progress = ?4,
                 is_completed = ?5,
                 completed_at = ?6,
                 last_accessed_at = ?7
             WHERE id = ?1",
            params![
                enrollment.id.to_string(),
                enrollment.current_module_id.map(|m| m.to_string()),
                enrollment.current_lesson_id.map(|l| l.to_string()),
                enrollment.progress,
                enrollment.is_completed,
                enrollment.completed_at,
                enrollment.last_accessed_at,
            ],
        )?;
        Ok(())
    }

    /// Zero the enrollment back to course start.
    pub fn reset_enrollment(&self, enrollment_id: Uuid) -> Result<()> {
        self.conn.execute(
            "UPDATE enrollments SET
                 current_module_id = NULL,
                 current_lesson_id = NULL,
                 progress = 0,
                 is_completed = 0,
                 completed_at = NULL,
                 last_accessed_at = ?2
             WHERE id = ?1",
            params![enrollment_id.to_string(), Utc::now()],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enroll_is_idempotent() {
        let db = ProgressDb::open_in_memory().unwrap();
        let learner = Uuid::new_v4();
        let course = Uuid::new_v4();

        let first = db.enroll(learner, course).unwrap();
        let second = db.enroll(learner, course).unwrap();
        assert_eq!(first.id, second.id);

        let count: i64 = db
            .conn
            .query_row("SELECT COUNT(*) FROM enrollments", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_missing_enrollment_is_none() {
        let db = ProgressDb::open_in_memory().unwrap();
        assert!(db
            .enrollment(Uuid::new_v4(), Uuid::new_v4())
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_update_and_reset_round_trip() {
        let db = ProgressDb::open_in_memory().unwrap();
        let learner = Uuid::new_v4();
        let course = Uuid::new_v4();
        let module = Uuid::new_v4();
        let lesson = Uuid::new_v4();

        let mut e = db.enroll(learner, course).unwrap();
        e.current_module_id = Some(module);
        e.current_lesson_id = Some(lesson);
        e.progress = 0.5;
        db.update_enrollment(&e).unwrap();

        let loaded = db.enrollment(learner, course).unwrap().unwrap();
        assert_eq!(loaded.current_module_id, Some(module));
        assert_eq!(loaded.current_lesson_id, Some(lesson));
        assert!((loaded.progress - 0.5).abs() < f64::EPSILON);

        db.reset_enrollment(e.id).unwrap();
        let reset = db.enrollment(learner, course).unwrap().unwrap();
        assert_eq!(reset.current_module_id, None);
        assert_eq!(reset.current_lesson_id, None);
        assert_eq!(reset.progress, 0.0);
        assert!(!reset.is_completed);
    }
}
