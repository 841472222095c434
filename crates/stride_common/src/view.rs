//! View DTOs v0.4.0
//!
//! Operation outcomes and the read-only roadmap projection shapes.
//! These carry no logic beyond small display helpers; the engine fills
//! them in and the caller layer serializes them onward.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Per-lesson reachability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LessonStatus {
    Completed,
    Unlocked,
    Locked,
}

impl std::fmt::Display for LessonStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Completed => write!(f, "completed"),
            Self::Unlocked => write!(f, "unlocked"),
            Self::Locked => write!(f, "locked"),
        }
    }
}

/// One lesson in the roadmap tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LessonView {
    pub lesson_id: Uuid,
    pub group_id: Uuid,
    pub status: LessonStatus,
    pub is_current: bool,
    /// Completed lessons are always revisitable.
    pub can_review: bool,
}

/// One module in the roadmap tree, lessons in total order within it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleView {
    pub module_id: Uuid,
    /// Position of the module within the course, 0-based
    pub index: usize,
    /// Completion fraction within the module, 0.0 - 1.0
    pub progress: f64,
    pub is_completed: bool,
    pub locked: bool,
    /// True when this is the next module and the current one is done.
    pub can_unlock: bool,
    pub lessons: Vec<LessonView>,
}

/// Course-level summary attached to the roadmap.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourseSummary {
    /// Course-wide completion fraction, 0.0 - 1.0
    pub progress: f64,
    pub current_module_index: usize,
    pub next_module_index: Option<usize>,
    pub total_modules: usize,
    pub is_last_lesson_of_current_module_completed: bool,
}

/// Full read-only projection for one (learner, course) pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourseRoadmap {
    pub course_id: Uuid,
    pub summary: CourseSummary,
    pub modules: Vec<ModuleView>,
}

/// Result of `complete_lesson`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionOutcome {
    /// Next lesson to work on, when one exists in the current module
    pub next_lesson_id: Option<Uuid>,
    /// The affected module is now 100% complete
    pub module_completed: bool,
    /// The course reached 100% with this completion
    pub course_completed: bool,
    /// Course-wide completion fraction after this completion
    pub course_progress: f64,
    /// XP granted by this call (0 on a repeat completion)
    pub xp_gained: u32,
    pub total_xp: u64,
    pub level: u32,
    pub xp_to_next_level: u64,
}

/// Result of `unlock_next_module`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleAdvance {
    pub current_module_id: Uuid,
    pub current_lesson_id: Uuid,
    /// Module following the newly current one, if any
    pub next_module_id: Option<Uuid>,
}

/// Result of `continue_to_next_module`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContinueOutcome {
    pub current_module_id: Uuid,
    pub current_lesson_id: Uuid,
    /// Module following the newly current one, if any
    pub next_module_id: Option<Uuid>,
    /// False when the module had been unlocked before and we resumed
    pub was_newly_unlocked: bool,
}

/// Result of `set_current_module`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentPosition {
    pub current_module_id: Uuid,
    pub current_lesson_id: Uuid,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lesson_status_serde() {
        let json = serde_json::to_string(&LessonStatus::Unlocked).unwrap();
        assert_eq!(json, "\"unlocked\"");
        assert_eq!(LessonStatus::Locked.to_string(), "locked");
    }

    #[test]
    fn test_roadmap_round_trip() {
        let roadmap = CourseRoadmap {
            course_id: Uuid::new_v4(),
            summary: CourseSummary {
                progress: 0.5,
                current_module_index: 1,
                next_module_index: Some(2),
                total_modules: 3,
                is_last_lesson_of_current_module_completed: false,
            },
            modules: vec![],
        };
        let json = serde_json::to_string(&roadmap).unwrap();
        let back: CourseRoadmap = serde_json::from_str(&json).unwrap();
        assert_eq!(back.summary.total_modules, 3);
        assert_eq!(back.summary.next_module_index, Some(2));
    }
}
