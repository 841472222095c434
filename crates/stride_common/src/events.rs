//! Progression events for downstream notification.
//!
//! Emitted fire-and-forget after a successful completion transaction.
//! Delivery lives elsewhere; a failed dispatch never fails the
//! transaction that produced the event.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Event emitted by the progression engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum ProgressionEvent {
    /// The learner crossed a level boundary.
    LevelUp {
        learner_id: Uuid,
        level: u32,
        total_xp: u64,
    },
    /// The learner completed every lesson in a course.
    CourseCompleted {
        learner_id: Uuid,
        course_id: Uuid,
    },
}

impl ProgressionEvent {
    pub fn level_up(learner_id: Uuid, level: u32, total_xp: u64) -> Self {
        Self::LevelUp {
            learner_id,
            level,
            total_xp,
        }
    }

    pub fn course_completed(learner_id: Uuid, course_id: Uuid) -> Self {
        Self::CourseCompleted {
            learner_id,
            course_id,
        }
    }

    /// Short form for log lines.
    pub fn format_debug(&self) -> String {
        match self {
            Self::LevelUp {
                learner_id, level, ..
            } => {
                format!("[stride] learner {} reached level {}", learner_id, level)
            }
            Self::CourseCompleted {
                learner_id,
                course_id,
            } => {
                format!("[stride] learner {} completed course {}", learner_id, course_id)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_format() {
        let learner = Uuid::new_v4();
        let event = ProgressionEvent::level_up(learner, 3, 250);
        assert!(event.format_debug().contains("level 3"));
    }

    #[test]
    fn test_event_serde_tagging() {
        let event = ProgressionEvent::course_completed(Uuid::new_v4(), Uuid::new_v4());
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"kind\":\"course_completed\""));
    }
}
