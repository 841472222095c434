//! Ordering & Unlock Resolution v0.4.0
//!
//! Pure resolution over a course's total lesson order. Two layers:
//!
//! - Lesson level: strictly sequential. Lesson 0 is always reachable;
//!   lesson i is unlocked iff lesson i-1 is completed. No prerequisite
//!   graph, and module boundaries do not matter at this layer.
//! - Module level: a coarser gate on top. Modules after the current one
//!   stay locked until an explicit unlock grant exists, no matter what
//!   the lesson sequencing would allow.
//!
//! Module completeness is always computed from lesson completion here,
//! never read from the persisted aggregate, so unlock decisions cannot
//! race a stale cache.

use std::collections::HashSet;

use uuid::Uuid;

use stride_common::LessonStatus;

use crate::content::OrderedLesson;

/// Status of the lesson at `index` in the total order.
pub fn lesson_status(
    order: &[OrderedLesson],
    completed: &HashSet<Uuid>,
    index: usize,
) -> LessonStatus {
    let lesson = &order[index];
    if completed.contains(&lesson.lesson_id) {
        return LessonStatus::Completed;
    }
    if index == 0 {
        return LessonStatus::Unlocked;
    }
    if completed.contains(&order[index - 1].lesson_id) {
        LessonStatus::Unlocked
    } else {
        LessonStatus::Locked
    }
}

/// Resolve the learner's current lesson.
///
/// A learner with no completed lessons always starts at the first
/// lesson, ignoring any stored pointer; this self-heals after a reset.
/// Otherwise the stored pointer wins if it still exists in the order
/// (content can be edited after enrollment), else fall back to first.
pub fn resolve_current_lesson(
    order: &[OrderedLesson],
    completed: &HashSet<Uuid>,
    stored: Option<Uuid>,
) -> Option<Uuid> {
    let first = order.first().map(|l| l.lesson_id)?;
    if completed.is_empty() {
        return Some(first);
    }
    match stored {
        Some(id) if order.iter().any(|l| l.lesson_id == id) => Some(id),
        _ => Some(first),
    }
}

/// Distinct module ids in course position order.
pub fn module_sequence(order: &[OrderedLesson]) -> Vec<Uuid> {
    let mut seen = HashSet::new();
    let mut modules = Vec::new();
    for lesson in order {
        if seen.insert(lesson.module_id) {
            modules.push(lesson.module_id);
        }
    }
    modules
}

/// Index of the learner's current module, falling back to the first
/// module when no pointer is stored or the pointed-at module no longer
/// exists in the course.
pub fn resolve_current_module_index(modules: &[Uuid], stored: Option<Uuid>) -> usize {
    stored
        .and_then(|id| modules.iter().position(|&m| m == id))
        .unwrap_or(0)
}

/// (total, completed) lesson counts for one module.
pub fn module_counts(
    order: &[OrderedLesson],
    completed: &HashSet<Uuid>,
    module_id: Uuid,
) -> (u32, u32) {
    let mut total = 0;
    let mut done = 0;
    for lesson in order.iter().filter(|l| l.module_id == module_id) {
        total += 1;
        if completed.contains(&lesson.lesson_id) {
            done += 1;
        }
    }
    (total, done)
}

/// Computed module completeness: every lesson done, and at least one
/// lesson exists.
pub fn module_complete(
    order: &[OrderedLesson],
    completed: &HashSet<Uuid>,
    module_id: Uuid,
) -> bool {
    let (total, done) = module_counts(order, completed, module_id);
    total > 0 && done == total
}

/// Module-level gate.
///
/// Reachable when: first module, or an explicit unlock grant exists,
/// or it is the current module, or it lies before the current module
/// and is itself 100% complete (review access).
pub fn module_reachable(
    order: &[OrderedLesson],
    completed: &HashSet<Uuid>,
    modules: &[Uuid],
    index: usize,
    current_index: usize,
    unlocked: &HashSet<Uuid>,
) -> bool {
    if index == 0 || index == current_index {
        return true;
    }
    if unlocked.contains(&modules[index]) {
        return true;
    }
    index < current_index && module_complete(order, completed, modules[index])
}

/// First incomplete lesson within a module, or the module's last lesson
/// when everything in it is already done.
pub fn resume_lesson_in_module(
    order: &[OrderedLesson],
    completed: &HashSet<Uuid>,
    module_id: Uuid,
) -> Option<Uuid> {
    let mut last = None;
    for lesson in order.iter().filter(|l| l.module_id == module_id) {
        if !completed.contains(&lesson.lesson_id) {
            return Some(lesson.lesson_id);
        }
        last = Some(lesson.lesson_id);
    }
    last
}

/// First lesson of a module in total order.
pub fn first_lesson_of_module(order: &[OrderedLesson], module_id: Uuid) -> Option<Uuid> {
    order
        .iter()
        .find(|l| l.module_id == module_id)
        .map(|l| l.lesson_id)
}
