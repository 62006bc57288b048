//! Enrollments - the join records between students and courses
//!
//! An enrollment has no life of its own: it is created by
//! [`EnrollmentManager::enroll`] and removed by `withdraw` or by cascading
//! the deletion of its student or course.

pub mod manager;

pub use manager::EnrollmentManager;

use serde::{Deserialize, Serialize};

/// A persisted (student, course) link
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Enrollment {
    pub enrollment_id: i64,
    pub student_id: i64,
    pub course_id: i64,
}
