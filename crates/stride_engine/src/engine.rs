//! Progression Engine v0.4.2
//!
//! Orchestrates the stores into the five progression operations:
//! complete_lesson, unlock_next_module, continue_to_next_module,
//! set_current_module and reset_progress (the roadmap projection
//! lives in `roadmap.rs`).
//!
//! Completion is the only multi-store write path. Its effects (lesson
//! upsert, XP grant + ledger, module aggregate, enrollment pointer)
//! run inside one SQLite transaction so a crash cannot leave XP
//! granted without the completion recorded, or vice versa. Events go
//! out after commit, fire-and-forget.

use chrono::Utc;
use tracing::{debug, info};
use uuid::Uuid;

use stride_common::{
    CompletionOutcome, ContinueOutcome, CurrentPosition, Enrollment, LearnerXp, ModuleAdvance,
    ProgressionError, ProgressionEvent, Resource, Result, XpSource,
};

use crate::config::EngineConfig;
use crate::content::{ContentTree, OrderedLesson};
use crate::db::ProgressDb;
use crate::notify::{self, LogNotifier, Notifier};
use crate::ordering;

/// Input to `complete_lesson`.
#[derive(Debug, Clone)]
pub struct CompleteLesson {
    pub learner_id: Uuid,
    pub lesson_id: Uuid,
    /// Overwrites the stored score when present
    pub score: Option<f64>,
    /// Accumulates onto the stored total
    pub time_spent_secs: Option<u64>,
}

impl CompleteLesson {
    pub fn new(learner_id: Uuid, lesson_id: Uuid) -> Self {
        Self {
            learner_id,
            lesson_id,
            score: None,
            time_spent_secs: None,
        }
    }

    pub fn with_score(mut self, score: f64) -> Self {
        self.score = Some(score);
        self
    }

    pub fn with_time_spent(mut self, secs: u64) -> Self {
        self.time_spent_secs = Some(secs);
        self
    }
}

/// The progression engine. One instance per process is fine; every
/// operation is a short-lived transaction against the shared rows.
pub struct ProgressionEngine<C: ContentTree> {
    pub(crate) db: ProgressDb,
    pub(crate) content: C,
    notifier: Box<dyn Notifier>,
    config: EngineConfig,
}

impl<C: ContentTree> ProgressionEngine<C> {
    pub fn new(db: ProgressDb, content: C, notifier: Box<dyn Notifier>, config: EngineConfig) -> Self {
        Self {
            db,
            content,
            notifier,
            config,
        }
    }

    /// Engine with the logging notifier and default config.
    pub fn with_defaults(db: ProgressDb, content: C) -> Self {
        Self::new(db, content, Box::new(LogNotifier), EngineConfig::default())
    }

    /// Create the learner's XP profile if it does not exist yet.
    ///
    /// `complete_lesson` treats a missing profile as an internal
    /// inconsistency, so registration must happen at signup.
    pub fn register_learner(&self, learner_id: Uuid) -> Result<stride_common::LearnerProfile> {
        self.db.register_learner(learner_id)
    }

    /// Enroll a learner into a course (idempotent).
    pub fn enroll(&self, learner_id: Uuid, course_id: Uuid) -> Result<Enrollment> {
        let enrollment = self.db.enroll(learner_id, course_id)?;
        info!("learner {} enrolled in course {}", learner_id, course_id);
        Ok(enrollment)
    }

    /// XP ledger audit read, most recent first.
    pub fn recent_ledger(&self, learner_id: Uuid, limit: usize) -> Result<Vec<stride_common::XpLedgerEntry>> {
        self.db.recent_ledger(learner_id, limit)
    }

    /// Apply a lesson completion (spec'd six-step transaction).
    pub fn complete_lesson(&self, input: CompleteLesson) -> Result<CompletionOutcome> {
        let CompleteLesson {
            learner_id,
            lesson_id,
            score,
            time_spent_secs,
        } = input;

        let course_id = self
            .content
            .course_for_lesson(lesson_id)?
            .ok_or(ProgressionError::NotFound(Resource::Lesson))?;
        let order = self.content.ordered_lessons(course_id)?;
        let pos = order
            .iter()
            .position(|l| l.lesson_id == lesson_id)
            .ok_or(ProgressionError::NotFound(Resource::Lesson))?;
        let module_id = order[pos].module_id;

        let enrollment = self
            .db
            .enrollment(learner_id, course_id)?
            .ok_or(ProgressionError::NotEnrolled)?;
        let profile = self.db.learner(learner_id)?.ok_or_else(|| {
            ProgressionError::InternalInconsistency(format!(
                "learner profile {} missing after auth",
                learner_id
            ))
        })?;

        let now = Utc::now();
        let tx = self.db.conn.unchecked_transaction()?;

        // 1. Upsert the per-lesson record; `newly` is the idempotence
        //    boundary for everything XP-related.
        let (_, newly) = self.db.record_completion(
            learner_id,
            lesson_id,
            score,
            time_spent_secs.unwrap_or(0),
            now,
        )?;

        // 2. XP grant, only on a fresh completion.
        let mut xp = LearnerXp::from_xp(profile.total_xp);
        let mut xp_gained = 0;
        let mut leveled_up = false;
        if newly {
            xp_gained = self.config.xp_per_lesson;
            leveled_up = xp.grant(xp_gained);
            self.db.save_learner_xp(learner_id, &xp, now)?;
            self.db.append_ledger(
                learner_id,
                xp_gained,
                XpSource::LessonCompleted,
                lesson_id,
                &format!("Completed lesson {}", lesson_id),
                now,
            )?;
        }

        // 3. Recompute the affected module's aggregate.
        let completed = self.db.completed_lesson_ids(learner_id)?;
        let (module_total, module_done) = ordering::module_counts(&order, &completed, module_id);
        self.db
            .upsert_module_progress(learner_id, module_id, module_total, module_done)?;
        let module_completed = module_total > 0 && module_done == module_total;

        // 4. Course-wide fraction and the completion edge.
        let course_done = order
            .iter()
            .filter(|l| completed.contains(&l.lesson_id))
            .count();
        let course_progress = course_done as f64 / order.len() as f64;
        let course_completed = course_progress >= 1.0 && !enrollment.is_completed;

        // 5. Enrollment pointer. Replays never move the pointer; the
        //    learner may be reviewing a past lesson.
        let mut updated = enrollment.clone();
        let mut next_lesson_id = None;
        if newly {
            let next_incomplete = order[pos + 1..]
                .iter()
                .find(|l| !completed.contains(&l.lesson_id));
            match next_incomplete {
                Some(next) if next.module_id == module_id => {
                    updated.current_module_id = Some(module_id);
                    updated.current_lesson_id = Some(next.lesson_id);
                    next_lesson_id = Some(next.lesson_id);
                }
                Some(_) => {
                    // Module boundary: stay put until the learner
                    // explicitly advances the module.
                    updated.current_module_id = Some(module_id);
                    updated.current_lesson_id = Some(lesson_id);
                }
                None => {
                    if course_progress >= 1.0 {
                        updated.current_lesson_id = None;
                    } else {
                        updated.current_module_id = Some(module_id);
                        updated.current_lesson_id = Some(lesson_id);
                    }
                }
            }
        }
        updated.progress = course_progress;
        if course_progress >= 1.0 {
            if !updated.is_completed {
                updated.completed_at = Some(now);
            }
            updated.is_completed = true;
        }
        updated.last_accessed_at = now;

        // 6. Persist in the same transaction as steps 1-3.
        self.db.update_enrollment(&updated)?;
        tx.commit()?;

        debug!(
            "lesson {} completed by {} (new={}, course {:.0}%)",
            lesson_id,
            learner_id,
            newly,
            course_progress * 100.0
        );

        if leveled_up {
            notify::emit(
                self.notifier.as_ref(),
                ProgressionEvent::level_up(learner_id, xp.level, xp.total_xp),
            );
        }
        if course_completed {
            notify::emit(
                self.notifier.as_ref(),
                ProgressionEvent::course_completed(learner_id, course_id),
            );
        }

        Ok(CompletionOutcome {
            next_lesson_id,
            module_completed,
            course_completed,
            course_progress,
            xp_gained,
            total_xp: xp.total_xp,
            level: xp.level,
            xp_to_next_level: xp.xp_to_next_level,
        })
    }

    /// Shared preamble for the module-advancement operations.
    fn advancement_context(
        &self,
        learner_id: Uuid,
        course_id: Uuid,
    ) -> Result<(Vec<OrderedLesson>, Vec<Uuid>, Enrollment)> {
        let order = self.content.ordered_lessons(course_id)?;
        let modules = ordering::module_sequence(&order);
        if modules.is_empty() {
            return Err(ProgressionError::CourseHasNoModules);
        }
        let enrollment = self
            .db
            .enrollment(learner_id, course_id)?
            .ok_or(ProgressionError::NotEnrolled)?;
        Ok((order, modules, enrollment))
    }

    /// Unlock the module after the current one and move the learner to
    /// its first lesson. Requires the current module to be 100%
    /// complete, computed fresh from lesson progress.
    pub fn unlock_next_module(&self, learner_id: Uuid, course_id: Uuid) -> Result<ModuleAdvance> {
        let (order, modules, mut enrollment) = self.advancement_context(learner_id, course_id)?;
        let completed = self.db.completed_lesson_ids(learner_id)?;
        let ci = ordering::resolve_current_module_index(&modules, enrollment.current_module_id);

        if !ordering::module_complete(&order, &completed, modules[ci]) {
            return Err(ProgressionError::CurrentModuleIncomplete);
        }
        let ni = ci + 1;
        if ni >= modules.len() {
            return Err(ProgressionError::NoNextModule);
        }
        let next_module = modules[ni];
        let first_lesson = ordering::first_lesson_of_module(&order, next_module)
            .ok_or(ProgressionError::NotFound(Resource::Module))?;

        let now = Utc::now();
        let tx = self.db.conn.unchecked_transaction()?;
        self.db
            .grant_module_unlock(learner_id, next_module, enrollment.id, now)?;
        enrollment.current_module_id = Some(next_module);
        enrollment.current_lesson_id = Some(first_lesson);
        enrollment.last_accessed_at = now;
        self.db.update_enrollment(&enrollment)?;
        tx.commit()?;

        info!("learner {} unlocked module {}", learner_id, next_module);

        Ok(ModuleAdvance {
            current_module_id: next_module,
            current_lesson_id: first_lesson,
            next_module_id: modules.get(ni + 1).copied(),
        })
    }

    /// Move into the next module, resuming where the learner left off
    /// when the module was already unlocked earlier.
    pub fn continue_to_next_module(
        &self,
        learner_id: Uuid,
        course_id: Uuid,
    ) -> Result<ContinueOutcome> {
        let (order, modules, mut enrollment) = self.advancement_context(learner_id, course_id)?;
        let completed = self.db.completed_lesson_ids(learner_id)?;
        let ci = ordering::resolve_current_module_index(&modules, enrollment.current_module_id);

        if !ordering::module_complete(&order, &completed, modules[ci]) {
            return Err(ProgressionError::CurrentModuleIncomplete);
        }
        let ni = ci + 1;
        if ni >= modules.len() {
            return Err(ProgressionError::NoNextModule);
        }
        let next_module = modules[ni];

        let now = Utc::now();
        let tx = self.db.conn.unchecked_transaction()?;
        let was_newly_unlocked =
            self.db
                .grant_module_unlock(learner_id, next_module, enrollment.id, now)?;

        // Fresh unlock starts at lesson 1; a revisit resumes at the
        // first incomplete lesson (last lesson when all are done).
        let target_lesson = if was_newly_unlocked {
            ordering::first_lesson_of_module(&order, next_module)
        } else {
            ordering::resume_lesson_in_module(&order, &completed, next_module)
        }
        .ok_or(ProgressionError::NotFound(Resource::Module))?;

        enrollment.current_module_id = Some(next_module);
        enrollment.current_lesson_id = Some(target_lesson);
        enrollment.last_accessed_at = now;
        self.db.update_enrollment(&enrollment)?;
        tx.commit()?;

        Ok(ContinueOutcome {
            current_module_id: next_module,
            current_lesson_id: target_lesson,
            next_module_id: modules.get(ni + 1).copied(),
            was_newly_unlocked,
        })
    }

    /// Explicit navigation to an arbitrary module. Only unlocked or
    /// completed modules are valid targets; completion bookkeeping is
    /// untouched, this only moves where the learner is looking.
    pub fn set_current_module(
        &self,
        learner_id: Uuid,
        course_id: Uuid,
        module_id: Uuid,
    ) -> Result<CurrentPosition> {
        let (order, modules, mut enrollment) = self.advancement_context(learner_id, course_id)?;
        let idx = modules
            .iter()
            .position(|&m| m == module_id)
            .ok_or(ProgressionError::NotFound(Resource::Module))?;

        let completed = self.db.completed_lesson_ids(learner_id)?;
        let unlocked = self.db.unlocked_module_ids(learner_id, enrollment.id)?;
        let ci = ordering::resolve_current_module_index(&modules, enrollment.current_module_id);

        if !ordering::module_reachable(&order, &completed, &modules, idx, ci, &unlocked) {
            return Err(ProgressionError::ModuleLocked);
        }

        let target_lesson = ordering::resume_lesson_in_module(&order, &completed, module_id)
            .ok_or(ProgressionError::NotFound(Resource::Module))?;

        enrollment.current_module_id = Some(module_id);
        enrollment.current_lesson_id = Some(target_lesson);
        enrollment.last_accessed_at = Utc::now();
        self.db.update_enrollment(&enrollment)?;

        Ok(CurrentPosition {
            current_module_id: module_id,
            current_lesson_id: target_lesson,
        })
    }

    /// Wipe all progression state for this (learner, course) and put
    /// the enrollment back at course start. XP already granted stays;
    /// the ledger is append-only.
    pub fn reset_progress(&self, learner_id: Uuid, course_id: Uuid) -> Result<()> {
        let order = self.content.ordered_lessons(course_id)?;
        let modules = ordering::module_sequence(&order);
        let enrollment = self
            .db
            .enrollment(learner_id, course_id)?
            .ok_or(ProgressionError::NotEnrolled)?;

        let lesson_ids: Vec<Uuid> = order.iter().map(|l| l.lesson_id).collect();

        let tx = self.db.conn.unchecked_transaction()?;
        self.db.delete_lesson_progress(learner_id, &lesson_ids)?;
        self.db.delete_module_progress(learner_id, &modules)?;
        self.db.delete_module_unlocks(enrollment.id)?;
        self.db.reset_enrollment(enrollment.id)?;
        tx.commit()?;

        info!(
            "progress reset for learner {} in course {}",
            learner_id, course_id
        );
        Ok(())
    }
}
