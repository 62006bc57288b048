//! # Registrar - student and course enrollment records
//!
//! Registrar keeps students, courses, and the enrollments linking them in a
//! SQLite database.
//!
//! - Entity store with uniqueness and foreign-key constraints
//! - Enrollment manager for enroll/withdraw and cascading deletes
//! - HTTP front end (axum) and a command-line front end

pub mod student;
pub mod course;
pub mod enrollment;
pub mod storage;
pub mod server;
pub mod config;
pub mod ui;

// Re-exports for convenient access
pub use student::Student;
pub use course::Course;
pub use enrollment::{Enrollment, EnrollmentManager};
pub use storage::SqliteStore;

/// Result type alias for Registrar operations
pub type Result<T> = std::result::Result<T, Error>;

/// Kind of record an error refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Student,
    Course,
    Enrollment,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Student => "student",
            EntityKind::Course => "course",
            EntityKind::Enrollment => "enrollment",
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error types for Registrar operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Duplicate {field}: {entity} '{value}' already exists")]
    DuplicateKey {
        entity: EntityKind,
        field: &'static str,
        value: String,
    },

    #[error("{entity} not found: {key}")]
    NotFound { entity: EntityKind, key: String },

    #[error("Student {student_id} is already enrolled in course {course_id}")]
    AlreadyEnrolled { student_id: i64, course_id: i64 },

    #[error("{entity} {id} still has {count} enrollment(s); delete it with its enrollments instead")]
    HasEnrollments {
        entity: EntityKind,
        id: i64,
        count: usize,
    },

    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),
}

impl Error {
    pub(crate) fn not_found(entity: EntityKind, key: impl std::fmt::Display) -> Self {
        Error::NotFound {
            entity,
            key: key.to_string(),
        }
    }

    /// True for failures caused by caller input rather than the store itself
    pub fn is_client_error(&self) -> bool {
        !matches!(self, Error::Storage(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_storage_failures_are_server_side() {
        let refused = Error::HasEnrollments {
            entity: EntityKind::Course,
            id: 4,
            count: 2,
        };
        assert!(refused.is_client_error());
        assert_eq!(
            refused.to_string(),
            "course 4 still has 2 enrollment(s); delete it with its enrollments instead"
        );
        assert!(Error::not_found(EntityKind::Student, 9).is_client_error());
        assert!(!Error::Storage(rusqlite::Error::QueryReturnedNoRows).is_client_error());
    }
}
