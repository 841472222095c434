//! Roadmap projection.
//!
//! Read-only view of a course for one learner: the content tree
//! mirrored with per-lesson status and per-module gate state, plus a
//! course summary. No writes, no locking; a slightly stale module
//! cache is irrelevant because everything here recomputes from lesson
//! progress.
//!
//! Works without an enrollment (public preview): everything locked
//! except the first module's first lesson.

use std::collections::HashSet;

use uuid::Uuid;

use stride_common::{
    CourseRoadmap, CourseSummary, LessonStatus, LessonView, ModuleView, Result,
};

use crate::content::ContentTree;
use crate::engine::ProgressionEngine;
use crate::ordering;

impl<C: ContentTree> ProgressionEngine<C> {
    /// Build the roadmap for a course, optionally scoped to a learner.
    pub fn roadmap(&self, learner_id: Option<Uuid>, course_id: Uuid) -> Result<CourseRoadmap> {
        let order = self.content.ordered_lessons(course_id)?;
        let modules = ordering::module_sequence(&order);

        if modules.is_empty() {
            return Ok(CourseRoadmap {
                course_id,
                summary: CourseSummary {
                    progress: 0.0,
                    current_module_index: 0,
                    next_module_index: None,
                    total_modules: 0,
                    is_last_lesson_of_current_module_completed: false,
                },
                modules: Vec::new(),
            });
        }

        let enrollment = match learner_id {
            Some(l) => self.db.enrollment(l, course_id)?,
            None => None,
        };
        let (completed, unlocked) = match (learner_id, &enrollment) {
            (Some(l), Some(e)) => (
                self.db.completed_lesson_ids(l)?,
                self.db.unlocked_module_ids(l, e.id)?,
            ),
            _ => (HashSet::new(), HashSet::new()),
        };

        let ci = ordering::resolve_current_module_index(
            &modules,
            enrollment.as_ref().and_then(|e| e.current_module_id),
        );
        let current_lesson = ordering::resolve_current_lesson(
            &order,
            &completed,
            enrollment.as_ref().and_then(|e| e.current_lesson_id),
        );
        let current_module_done = ordering::module_complete(&order, &completed, modules[ci]);

        let mut module_views = Vec::with_capacity(modules.len());
        for (idx, &module_id) in modules.iter().enumerate() {
            let (total, done) = ordering::module_counts(&order, &completed, module_id);
            let progress = if total == 0 {
                0.0
            } else {
                done as f64 / total as f64
            };
            let is_completed = total > 0 && done == total;
            let locked =
                !ordering::module_reachable(&order, &completed, &modules, idx, ci, &unlocked);
            let can_unlock = locked && idx == ci + 1 && current_module_done;

            let lessons = order
                .iter()
                .enumerate()
                .filter(|(_, l)| l.module_id == module_id)
                .map(|(i, l)| {
                    let mut status = ordering::lesson_status(&order, &completed, i);
                    // The coarse module gate overrides per-lesson
                    // sequencing for not-yet-entered modules.
                    if locked && status == LessonStatus::Unlocked {
                        status = LessonStatus::Locked;
                    }
                    LessonView {
                        lesson_id: l.lesson_id,
                        group_id: l.group_id,
                        status,
                        is_current: !locked && current_lesson == Some(l.lesson_id),
                        can_review: status == LessonStatus::Completed,
                    }
                })
                .collect();

            module_views.push(ModuleView {
                module_id,
                index: idx,
                progress,
                is_completed,
                locked,
                can_unlock,
                lessons,
            });
        }

        let course_done = order
            .iter()
            .filter(|l| completed.contains(&l.lesson_id))
            .count();
        let progress = course_done as f64 / order.len() as f64;

        let last_of_current = order
            .iter()
            .filter(|l| l.module_id == modules[ci])
            .last()
            .map(|l| completed.contains(&l.lesson_id))
            .unwrap_or(false);

        Ok(CourseRoadmap {
            course_id,
            summary: CourseSummary {
                progress,
                current_module_index: ci,
                next_module_index: if ci + 1 < modules.len() {
                    Some(ci + 1)
                } else {
                    None
                },
                total_modules: modules.len(),
                is_last_lesson_of_current_module_completed: last_of_current,
            },
            modules: module_views,
        })
    }
}
