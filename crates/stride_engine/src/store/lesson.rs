//! Lesson progress store.
//!
//! Rows are created lazily on first interaction and updated in place
//! afterwards; UNIQUE(learner_id, lesson_id) makes duplicate creation
//! impossible. The false-to-true completion transition reported by
//! `record_completion` is the idempotence boundary for XP grants.

use chrono::{DateTime, Utc};
use rusqlite::{params, Row};
use std::collections::HashSet;
use uuid::Uuid;

use stride_common::{LessonProgress, Result};

use crate::db::{uuid_column, ProgressDb};

fn map_lesson_progress(row: &Row<'_>) -> rusqlite::Result<LessonProgress> {
    Ok(LessonProgress {
        id: uuid_column(0, row.get(0)?)?,
        learner_id: uuid_column(1, row.get(1)?)?,
        lesson_id: uuid_column(2, row.get(2)?)?,
        is_completed: row.get(3)?,
        completed_at: row.get(4)?,
        score: row.get(5)?,
        time_spent_secs: row.get::<_, i64>(6)? as u64,
        attempts: row.get::<_, i64>(7)? as u32,
    })
}

impl ProgressDb {
    /// Fetch one learner-lesson record.
    pub fn lesson_progress(&self, learner_id: Uuid, lesson_id: Uuid) -> Result<Option<LessonProgress>> {
        let result = self.conn.query_row(
            "SELECT id, learner_id, lesson_id, is_completed, completed_at, score,
                    time_spent_secs, attempts
             FROM lesson_progress WHERE learner_id = ?1 AND lesson_id = ?2",
            params![learner_id.to_string(), lesson_id.to_string()],
            map_lesson_progress,
        );
        match result {
            Ok(lp) => Ok(Some(lp)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Upsert a completion.
    ///
    /// Returns the stored record and whether this call flipped the
    /// lesson from incomplete to complete. `attempts` increments only
    /// on that flip; `time_spent_secs` accumulates; `score` and
    /// `completed_at` overwrite on every call.
    pub fn record_completion(
        &self,
        learner_id: Uuid,
        lesson_id: Uuid,
        score: Option<f64>,
        time_spent_secs: u64,
        now: DateTime<Utc>,
    ) -> Result<(LessonProgress, bool)> {
        match self.lesson_progress(learner_id, lesson_id)? {
            Some(mut lp) => {
                let newly = !lp.is_completed;
                lp.is_completed = true;
                lp.completed_at = Some(now);
                if newly {
                    lp.attempts += 1;
                }
                if score.is_some() {
                    lp.score = score;
                }
                lp.time_spent_secs += time_spent_secs;

                self.conn.execute(
                    "UPDATE lesson_progress SET
                         is_completed = 1,
                         completed_at = ?2,
                         score = ?3,
                         time_spent_secs = ?4,
                         attempts = ?5
                     WHERE id = ?1",
                    params![
                        lp.id.to_string(),
                        lp.completed_at,
                        lp.score,
                        lp.time_spent_secs as i64,
                        lp.attempts as i64,
                    ],
                )?;
                Ok((lp, newly))
            }
            None => {
                let lp = LessonProgress {
                    id: Uuid::new_v4(),
                    learner_id,
                    lesson_id,
                    is_completed: true,
                    completed_at: Some(now),
                    score,
                    time_spent_secs,
                    attempts: 1,
                };
                self.conn.execute(
                    "INSERT INTO lesson_progress
                         (id, learner_id, lesson_id, is_completed, completed_at, score,
                          time_spent_secs, attempts)
                     VALUES (?1, ?2, ?3, 1, ?4, ?5, ?6, ?7)",
                    params![
                        lp.id.to_string(),
                        learner_id.to_string(),
                        lesson_id.to_string(),
                        lp.completed_at,
                        lp.score,
                        lp.time_spent_secs as i64,
                        lp.attempts as i64,
                    ],
                )?;
                Ok((lp, true))
            }
        }
    }

    /// All lesson ids this learner has completed, course-agnostic.
    /// Callers intersect with a course's total order.
    pub fn completed_lesson_ids(&self, learner_id: Uuid) -> Result<HashSet<Uuid>> {
        let mut stmt = self.conn.prepare(
            "SELECT lesson_id FROM lesson_progress
             WHERE learner_id = ?1 AND is_completed = 1",
        )?;
        let rows = stmt.query_map(params![learner_id.to_string()], |row| {
            row.get::<_, String>(0)
        })?;

        let mut ids = HashSet::new();
        for row in rows {
            if let Ok(id) = Uuid::parse_str(&row?) {
                ids.insert(id);
            }
        }
        Ok(ids)
    }

    /// Delete the learner's progress rows for the given lessons.
    pub fn delete_lesson_progress(&self, learner_id: Uuid, lesson_ids: &[Uuid]) -> Result<usize> {
        let mut stmt = self.conn.prepare(
            "DELETE FROM lesson_progress WHERE learner_id = ?1 AND lesson_id = ?2",
        )?;
        let mut deleted = 0;
        for lesson_id in lesson_ids {
            deleted += stmt.execute(params![learner_id.to_string(), lesson_id.to_string()])?;
        }
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_completion_creates_row() {
        let db = ProgressDb::open_in_memory().unwrap();
        let learner = Uuid::new_v4();
        let lesson = Uuid::new_v4();

        let (lp, newly) = db
            .record_completion(learner, lesson, Some(0.8), 120, Utc::now())
            .unwrap();
        assert!(newly);
        assert!(lp.is_completed);
        assert_eq!(lp.attempts, 1);
        assert_eq!(lp.time_spent_secs, 120);
        assert_eq!(lp.score, Some(0.8));
    }

    #[test]
    fn test_repeat_completion_is_not_new() {
        let db = ProgressDb::open_in_memory().unwrap();
        let learner = Uuid::new_v4();
        let lesson = Uuid::new_v4();

        let (_, first) = db
            .record_completion(learner, lesson, Some(0.5), 60, Utc::now())
            .unwrap();
        let (lp, second) = db
            .record_completion(learner, lesson, Some(0.9), 30, Utc::now())
            .unwrap();

        assert!(first);
        assert!(!second);
        // attempts did not increment again, time accumulated, score overwrote
        assert_eq!(lp.attempts, 1);
        assert_eq!(lp.time_spent_secs, 90);
        assert_eq!(lp.score, Some(0.9));
    }

    #[test]
    fn test_repeat_without_score_keeps_last() {
        let db = ProgressDb::open_in_memory().unwrap();
        let learner = Uuid::new_v4();
        let lesson = Uuid::new_v4();

        db.record_completion(learner, lesson, Some(0.7), 0, Utc::now())
            .unwrap();
        let (lp, _) = db
            .record_completion(learner, lesson, None, 0, Utc::now())
            .unwrap();
        assert_eq!(lp.score, Some(0.7));
    }

    #[test]
    fn test_completed_ids_and_delete() {
        let db = ProgressDb::open_in_memory().unwrap();
        let learner = Uuid::new_v4();
        let lessons: Vec<Uuid> = (0..3).map(|_| Uuid::new_v4()).collect();

        for l in &lessons {
            db.record_completion(learner, *l, None, 0, Utc::now()).unwrap();
        }
        let ids = db.completed_lesson_ids(learner).unwrap();
        assert_eq!(ids.len(), 3);

        let deleted = db.delete_lesson_progress(learner, &lessons[..2]).unwrap();
        assert_eq!(deleted, 2);
        assert_eq!(db.completed_lesson_ids(learner).unwrap().len(), 1);
    }
}
