//! Core progression records.
//!
//! One struct per stored row. `ModuleProgress` is a derived cache and is
//! always reconstructable from `LessonProgress` plus the content tree;
//! everything else is authoritative.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One enrollment per (learner, course) pair.
///
/// Owns the learner's position pointer. Invariant: `is_completed`
/// implies `progress == 1.0`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Enrollment {
    pub id: Uuid,
    pub learner_id: Uuid,
    pub course_id: Uuid,
    /// Module the learner is positioned in (None before first start)
    pub current_module_id: Option<Uuid>,
    /// Lesson the learner is positioned on (None before first start)
    pub current_lesson_id: Option<Uuid>,
    /// Course-wide completion fraction, 0.0 - 1.0
    pub progress: f64,
    pub is_completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
    pub enrolled_at: DateTime<Utc>,
    pub last_accessed_at: DateTime<Utc>,
}

/// Per-lesson completion record, unique per (learner, lesson).
///
/// Created lazily on first interaction, updated in place afterwards.
/// `attempts` increments only on a false-to-true completion transition;
/// `time_spent_secs` accumulates; `score` and `completed_at` overwrite.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LessonProgress {
    pub id: Uuid,
    pub learner_id: Uuid,
    pub lesson_id: Uuid,
    pub is_completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
    pub score: Option<f64>,
    pub time_spent_secs: u64,
    pub attempts: u32,
}

/// Per-module aggregate, unique per (learner, module).
///
/// Derived cache upserted after every lesson completion affecting the
/// module. Not authoritative; persisted for read efficiency only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleProgress {
    pub id: Uuid,
    pub learner_id: Uuid,
    pub module_id: Uuid,
    pub total_lessons: u32,
    pub lessons_completed: u32,
    /// Completion fraction within the module, 0.0 - 1.0
    pub progress: f64,
    pub is_completed: bool,
}

/// Explicit module-unlock grant, unique per (learner, module, enrollment).
///
/// Existence of a row means the module is reachable regardless of
/// sequential position. Rows are additive-only; deleted only on reset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleUnlock {
    pub id: Uuid,
    pub learner_id: Uuid,
    pub module_id: Uuid,
    pub enrollment_id: Uuid,
    pub unlocked_at: DateTime<Utc>,
}

/// Learner XP state as persisted on the profile.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearnerProfile {
    pub id: Uuid,
    pub total_xp: u64,
    pub level: u32,
    pub xp_to_next_level: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// What a ledger entry was granted for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum XpSource {
    LessonCompleted,
}

impl std::fmt::Display for XpSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::LessonCompleted => write!(f, "lesson_completed"),
        }
    }
}

impl std::str::FromStr for XpSource {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "lesson_completed" => Ok(Self::LessonCompleted),
            other => Err(format!("unknown xp source: {}", other)),
        }
    }
}

/// Append-only XP grant record. Audit trail, never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct XpLedgerEntry {
    /// Rowid assigned by the store
    pub id: i64,
    pub learner_id: Uuid,
    pub amount: u32,
    pub source_kind: XpSource,
    /// Id of the record that triggered the grant (the lesson)
    pub source_id: Uuid,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_xp_source_round_trip() {
        let s = XpSource::LessonCompleted.to_string();
        assert_eq!(s.parse::<XpSource>().unwrap(), XpSource::LessonCompleted);
        assert!("bogus".parse::<XpSource>().is_err());
    }

    #[test]
    fn test_enrollment_serializes() {
        let e = Enrollment {
            id: Uuid::new_v4(),
            learner_id: Uuid::new_v4(),
            course_id: Uuid::new_v4(),
            current_module_id: None,
            current_lesson_id: None,
            progress: 0.0,
            is_completed: false,
            completed_at: None,
            enrolled_at: Utc::now(),
            last_accessed_at: Utc::now(),
        };
        let json = serde_json::to_string(&e).unwrap();
        let back: Enrollment = serde_json::from_str(&json).unwrap();
        assert_eq!(back.id, e.id);
        assert!(!back.is_completed);
    }
}
