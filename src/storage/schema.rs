//! Database schema definitions
//!
//! Table and column names match databases written by the earlier web
//! application, so an existing `database.sqlite3` can be opened directly.

/// Declared width of every text column
pub const MAX_FIELD_LEN: usize = 200;

/// Pragmas applied to every connection
pub const CONNECTION_PRAGMAS: &str = "PRAGMA foreign_keys = ON;";

/// SQL to create the student table
pub const CREATE_STUDENT_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS student (
    student_id INTEGER PRIMARY KEY AUTOINCREMENT,
    roll_number VARCHAR(200) NOT NULL UNIQUE,
    first_name VARCHAR(200) NOT NULL,
    last_name VARCHAR(200)
)
"#;

/// SQL to create the course table
pub const CREATE_COURSE_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS course (
    course_id INTEGER PRIMARY KEY AUTOINCREMENT,
    course_code VARCHAR(200) NOT NULL UNIQUE,
    course_name VARCHAR(200) NOT NULL,
    course_description VARCHAR(200)
)
"#;

/// SQL to create the enrollments join table
/// No UNIQUE(estudent_id, ecourse_id): duplicate pairs are rejected by the enrollment manager
pub const CREATE_ENROLLMENTS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS enrollments (
    enrollment_id INTEGER PRIMARY KEY AUTOINCREMENT,
    estudent_id INTEGER NOT NULL REFERENCES student(student_id),
    ecourse_id INTEGER NOT NULL REFERENCES course(course_id)
)
"#;

/// SQL to create indexes
pub const CREATE_INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_enrollments_student ON enrollments(estudent_id)",
    "CREATE INDEX IF NOT EXISTS idx_enrollments_course ON enrollments(ecourse_id)",
];

/// All schema creation statements
pub fn all_schema_statements() -> Vec<&'static str> {
    let mut stmts = vec![
        CREATE_STUDENT_TABLE,
        CREATE_COURSE_TABLE,
        CREATE_ENROLLMENTS_TABLE,
    ];
    stmts.extend(CREATE_INDEXES.iter().copied());
    stmts
}
