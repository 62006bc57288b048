//! Course records

use serde::{Deserialize, Serialize};

/// A persisted course
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Course {
    pub course_id: i64,
    /// Unique across all courses
    pub course_code: String,
    pub course_name: String,
    pub course_description: Option<String>,
}

impl std::fmt::Display for Course {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} - {}", self.course_code, self.course_name)
    }
}
