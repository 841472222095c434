//! Error types for the progression engine.
//!
//! Everything here is recoverable at the caller boundary (mapped to 4xx
//! by the transport layer) except `InternalInconsistency` and `Storage`,
//! which are fatal and logged, never retried.

use thiserror::Error;

/// What kind of record failed to resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Course,
    Lesson,
    Module,
    Enrollment,
}

impl std::fmt::Display for Resource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Course => write!(f, "course"),
            Self::Lesson => write!(f, "lesson"),
            Self::Module => write!(f, "module"),
            Self::Enrollment => write!(f, "enrollment"),
        }
    }
}

#[derive(Error, Debug)]
pub enum ProgressionError {
    #[error("{0} not found")]
    NotFound(Resource),

    #[error("Learner is not enrolled in this course")]
    NotEnrolled,

    #[error("Module is locked")]
    ModuleLocked,

    #[error("Course has no modules")]
    CourseHasNoModules,

    #[error("No next module: course is fully completed")]
    NoNextModule,

    #[error("Current module is not yet complete")]
    CurrentModuleIncomplete,

    #[error("Internal inconsistency: {0}")]
    InternalInconsistency(String),

    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ProgressionError {
    /// Stable numeric code for RPC/HTTP mapping by the caller layer.
    pub fn code(&self) -> i32 {
        match self {
            ProgressionError::NotFound(_) => -32100,
            ProgressionError::NotEnrolled => -32101,
            ProgressionError::ModuleLocked => -32102,
            ProgressionError::CourseHasNoModules => -32103,
            ProgressionError::NoNextModule => -32104,
            ProgressionError::CurrentModuleIncomplete => -32105,
            ProgressionError::InternalInconsistency(_) => -32603,
            ProgressionError::Storage(_) => -32604,
            ProgressionError::Json(_) => -32700,
        }
    }

    /// Fatal errors are logged and surfaced, never retried.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ProgressionError::InternalInconsistency(_) | ProgressionError::Storage(_)
        )
    }
}

/// Engine-wide result alias.
pub type Result<T> = std::result::Result<T, ProgressionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recoverable_vs_fatal() {
        assert!(!ProgressionError::NotEnrolled.is_fatal());
        assert!(!ProgressionError::ModuleLocked.is_fatal());
        assert!(ProgressionError::InternalInconsistency("profile missing".into()).is_fatal());
    }

    #[test]
    fn test_not_found_display_names_resource() {
        let err = ProgressionError::NotFound(Resource::Lesson);
        assert_eq!(err.to_string(), "lesson not found");
        let err = ProgressionError::NotFound(Resource::Course);
        assert_eq!(err.to_string(), "course not found");
    }

    #[test]
    fn test_codes_are_distinct() {
        let codes = [
            ProgressionError::NotFound(Resource::Module).code(),
            ProgressionError::NotEnrolled.code(),
            ProgressionError::ModuleLocked.code(),
            ProgressionError::CourseHasNoModules.code(),
            ProgressionError::NoNextModule.code(),
            ProgressionError::CurrentModuleIncomplete.code(),
        ];
        let mut dedup = codes.to_vec();
        dedup.sort();
        dedup.dedup();
        assert_eq!(dedup.len(), codes.len());
    }
}
