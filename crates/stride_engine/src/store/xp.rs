//! Learner XP store and ledger.
//!
//! The learner row carries the authoritative total plus the derived
//! level fields; the ledger is the append-only audit trail of grants.
//! Derived fields always arrive here pre-recomputed from the total
//! (see `stride_common::leveling`), never incremented in SQL.

use chrono::{DateTime, Utc};
use rusqlite::{params, Row};
use uuid::Uuid;

use stride_common::{
    LearnerProfile, LearnerXp, ProgressionError, Result, XpLedgerEntry, XpSource,
};

use crate::db::{uuid_column, ProgressDb};

fn map_learner(row: &Row<'_>) -> rusqlite::Result<LearnerProfile> {
    Ok(LearnerProfile {
        id: uuid_column(0, row.get(0)?)?,
        total_xp: row.get::<_, i64>(1)? as u64,
        level: row.get::<_, i64>(2)? as u32,
        xp_to_next_level: row.get::<_, i64>(3)? as u64,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

impl ProgressDb {
    /// Get-or-create the XP state row for a learner.
    pub fn register_learner(&self, learner_id: Uuid) -> Result<LearnerProfile> {
        let now = Utc::now();
        let fresh = LearnerXp::new();
        self.conn.execute(
            "INSERT OR IGNORE INTO learners
                 (id, total_xp, level, xp_to_next_level, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
            params![
                learner_id.to_string(),
                fresh.total_xp as i64,
                fresh.level as i64,
                fresh.xp_to_next_level as i64,
                now,
            ],
        )?;
        self.learner(learner_id)?.ok_or_else(|| {
            ProgressionError::InternalInconsistency("learner missing after insert".into())
        })
    }

    /// Fetch a learner profile.
    pub fn learner(&self, learner_id: Uuid) -> Result<Option<LearnerProfile>> {
        let result = self.conn.query_row(
            "SELECT id, total_xp, level, xp_to_next_level, created_at, updated_at
             FROM learners WHERE id = ?1",
            params![learner_id.to_string()],
            map_learner,
        );
        match result {
            Ok(l) => Ok(Some(l)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Write back recomputed XP state.
    pub fn save_learner_xp(&self, learner_id: Uuid, xp: &LearnerXp, now: DateTime<Utc>) -> Result<()> {
        self.conn.execute(
            "UPDATE learners SET
                 total_xp = ?2, level = ?3, xp_to_next_level = ?4, updated_at = ?5
             WHERE id = ?1",
            params![
                learner_id.to_string(),
                xp.total_xp as i64,
                xp.level as i64,
                xp.xp_to_next_level as i64,
                now,
            ],
        )?;
        Ok(())
    }

    /// Append one grant to the ledger.
    pub fn append_ledger(
        &self,
        learner_id: Uuid,
        amount: u32,
        source_kind: XpSource,
        source_id: Uuid,
        description: &str,
        now: DateTime<Utc>,
    ) -> Result<()> {
        self.conn.execute(
            "INSERT INTO xp_ledger
                 (learner_id, amount, source_kind, source_id, description, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                learner_id.to_string(),
                amount as i64,
                source_kind.to_string(),
                source_id.to_string(),
                description,
                now,
            ],
        )?;
        Ok(())
    }

    /// Most recent grants first, up to `limit`.
    pub fn recent_ledger(&self, learner_id: Uuid, limit: usize) -> Result<Vec<XpLedgerEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, learner_id, amount, source_kind, source_id, description, created_at
             FROM xp_ledger WHERE learner_id = ?1
             ORDER BY id DESC LIMIT ?2",
        )?;
        let rows = stmt.query_map(
            params![learner_id.to_string(), limit as i64],
            |row| {
                Ok(XpLedgerEntry {
                    id: row.get(0)?,
                    learner_id: uuid_column(1, row.get(1)?)?,
                    amount: row.get::<_, i64>(2)? as u32,
                    source_kind: row
                        .get::<_, String>(3)?
                        .parse()
                        .unwrap_or(XpSource::LessonCompleted),
                    source_id: uuid_column(4, row.get(4)?)?,
                    description: row.get(5)?,
                    created_at: row.get(6)?,
                })
            },
        )?;

        let mut entries = Vec::new();
        for row in rows {
            entries.push(row?);
        }
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_is_get_or_create() {
        let db = ProgressDb::open_in_memory().unwrap();
        let learner = Uuid::new_v4();

        let first = db.register_learner(learner).unwrap();
        assert_eq!(first.total_xp, 0);
        assert_eq!(first.level, 1);
        assert_eq!(first.xp_to_next_level, 100);

        // Second call returns the same row even after XP was earned
        let mut xp = LearnerXp::from_xp(first.total_xp);
        xp.grant(50);
        db.save_learner_xp(learner, &xp, Utc::now()).unwrap();

        let again = db.register_learner(learner).unwrap();
        assert_eq!(again.total_xp, 50);
    }

    #[test]
    fn test_missing_learner_is_none() {
        let db = ProgressDb::open_in_memory().unwrap();
        assert!(db.learner(Uuid::new_v4()).unwrap().is_none());
    }

    #[test]
    fn test_ledger_append_and_read_recent() {
        let db = ProgressDb::open_in_memory().unwrap();
        let learner = Uuid::new_v4();

        for i in 0..5 {
            db.append_ledger(
                learner,
                10,
                XpSource::LessonCompleted,
                Uuid::new_v4(),
                &format!("Completed lesson {}", i),
                Utc::now(),
            )
            .unwrap();
        }

        let entries = db.recent_ledger(learner, 3).unwrap();
        assert_eq!(entries.len(), 3);
        // Most recent first
        assert!(entries[0].id > entries[1].id);
        assert!(entries[0].description.contains("lesson 4"));
        assert_eq!(entries[0].source_kind, XpSource::LessonCompleted);
    }
}
