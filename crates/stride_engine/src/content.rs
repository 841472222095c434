//! Content tree seam.
//!
//! The engine never owns course content; it consumes an ordered, flat
//! projection of the course tree from whatever service owns it. The
//! projection is recomputed on every call because content can be edited
//! between requests.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use stride_common::Result;

/// One lesson in a course's total order.
///
/// Total order is (module position, group position within module,
/// lesson order key within group); the reader returns lessons already
/// sorted that way, stable within a single call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderedLesson {
    pub lesson_id: Uuid,
    pub module_id: Uuid,
    pub group_id: Uuid,
    /// Stable integer order key within the group
    pub order_key: i64,
}

/// Read-only view onto the course content tree.
pub trait ContentTree {
    /// All lessons of a course in total order. Empty when the course
    /// is unknown or has no content.
    fn ordered_lessons(&self, course_id: Uuid) -> Result<Vec<OrderedLesson>>;

    /// Resolve a lesson back to its course.
    fn course_for_lesson(&self, lesson_id: Uuid) -> Result<Option<Uuid>>;
}

#[derive(Debug, Clone)]
struct LessonDef {
    lesson_id: Uuid,
    group_id: Uuid,
    order_key: i64,
}

#[derive(Debug, Clone)]
struct ModuleDef {
    module_id: Uuid,
    /// Group ids in position order
    groups: Vec<Uuid>,
    lessons: Vec<LessonDef>,
}

#[derive(Debug, Clone, Default)]
struct CourseDef {
    /// Modules in position order
    modules: Vec<ModuleDef>,
}

/// In-memory content tree for tests and embedders without a content
/// service. Module and group positions follow insertion order; lessons
/// sort by their order key within the group.
#[derive(Debug, Clone, Default)]
pub struct CourseCatalog {
    courses: HashMap<Uuid, CourseDef>,
    lesson_course: HashMap<Uuid, Uuid>,
}

impl CourseCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a lesson, creating the course/module/group lazily.
    pub fn add_lesson(
        &mut self,
        course_id: Uuid,
        module_id: Uuid,
        group_id: Uuid,
        lesson_id: Uuid,
        order_key: i64,
    ) {
        let course = self.courses.entry(course_id).or_default();
        let module = match course.modules.iter_mut().find(|m| m.module_id == module_id) {
            Some(m) => m,
            None => {
                course.modules.push(ModuleDef {
                    module_id,
                    groups: Vec::new(),
                    lessons: Vec::new(),
                });
                course.modules.last_mut().unwrap()
            }
        };
        if !module.groups.contains(&group_id) {
            module.groups.push(group_id);
        }
        module.lessons.push(LessonDef {
            lesson_id,
            group_id,
            order_key,
        });
        self.lesson_course.insert(lesson_id, course_id);
    }

    /// Register an empty course (no modules, no lessons).
    pub fn add_course(&mut self, course_id: Uuid) {
        self.courses.entry(course_id).or_default();
    }
}

impl ContentTree for CourseCatalog {
    fn ordered_lessons(&self, course_id: Uuid) -> Result<Vec<OrderedLesson>> {
        let Some(course) = self.courses.get(&course_id) else {
            return Ok(Vec::new());
        };

        let mut out = Vec::new();
        for module in &course.modules {
            for &group_id in &module.groups {
                let mut in_group: Vec<&LessonDef> = module
                    .lessons
                    .iter()
                    .filter(|l| l.group_id == group_id)
                    .collect();
                in_group.sort_by_key(|l| l.order_key);
                for lesson in in_group {
                    out.push(OrderedLesson {
                        lesson_id: lesson.lesson_id,
                        module_id: module.module_id,
                        group_id,
                        order_key: lesson.order_key,
                    });
                }
            }
        }
        Ok(out)
    }

    fn course_for_lesson(&self, lesson_id: Uuid) -> Result<Option<Uuid>> {
        Ok(self.lesson_course.get(&lesson_id).copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_total_order_sorts_within_group() {
        let course = Uuid::new_v4();
        let module = Uuid::new_v4();
        let group = Uuid::new_v4();
        let (l1, l2, l3) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());

        let mut catalog = CourseCatalog::new();
        // Inserted out of order; order keys decide
        catalog.add_lesson(course, module, group, l3, 30);
        catalog.add_lesson(course, module, group, l1, 10);
        catalog.add_lesson(course, module, group, l2, 20);

        let order = catalog.ordered_lessons(course).unwrap();
        let ids: Vec<Uuid> = order.iter().map(|l| l.lesson_id).collect();
        assert_eq!(ids, vec![l1, l2, l3]);
    }

    #[test]
    fn test_module_position_before_order_key() {
        let course = Uuid::new_v4();
        let (mod_a, mod_b) = (Uuid::new_v4(), Uuid::new_v4());
        let group = Uuid::new_v4();
        let (a1, b1) = (Uuid::new_v4(), Uuid::new_v4());

        let mut catalog = CourseCatalog::new();
        catalog.add_lesson(course, mod_a, group, a1, 99);
        catalog.add_lesson(course, mod_b, Uuid::new_v4(), b1, 1);

        // Module A comes first even though its lesson has a larger key
        let order = catalog.ordered_lessons(course).unwrap();
        assert_eq!(order[0].lesson_id, a1);
        assert_eq!(order[1].lesson_id, b1);
    }

    #[test]
    fn test_course_for_lesson() {
        let course = Uuid::new_v4();
        let lesson = Uuid::new_v4();
        let mut catalog = CourseCatalog::new();
        catalog.add_lesson(course, Uuid::new_v4(), Uuid::new_v4(), lesson, 1);

        assert_eq!(catalog.course_for_lesson(lesson).unwrap(), Some(course));
        assert_eq!(catalog.course_for_lesson(Uuid::new_v4()).unwrap(), None);
    }

    #[test]
    fn test_unknown_course_is_empty() {
        let catalog = CourseCatalog::new();
        assert!(catalog.ordered_lessons(Uuid::new_v4()).unwrap().is_empty());
    }
}
