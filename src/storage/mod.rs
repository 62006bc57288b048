//! Storage Layer - SQLite-backed persistence
//!
//! System of record is SQLite with tables:
//! - student(student_id, roll_number, first_name, last_name)
//! - course(course_id, course_code, course_name, course_description)
//! - enrollments(enrollment_id, estudent_id, ecourse_id)

pub mod schema;
pub mod sqlite;

pub use sqlite::{SqliteStore, StoreStats, DEFAULT_BUSY_TIMEOUT};
