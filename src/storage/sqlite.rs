//! SQLite storage implementation

use std::path::Path;
use std::time::Duration;
use rusqlite::{Connection, OptionalExtension, Transaction, TransactionBehavior, params};
use serde::Serialize;
use crate::{EntityKind, Error, Result};
use crate::course::Course;
use crate::student::Student;
use super::schema;

/// Busy timeout used when none is configured
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_millis(5000);

const STUDENT_COLUMNS: &str = "student_id, roll_number, first_name, last_name";
const COURSE_COLUMNS: &str = "course_id, course_code, course_name, course_description";

/// SQLite-backed store for students, courses and enrollments
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open a database file (creates if doesn't exist)
    pub fn open(path: &Path) -> Result<Self> {
        Self::open_with_timeout(path, DEFAULT_BUSY_TIMEOUT)
    }

    /// Open a database file, waiting up to `busy_timeout` for other writers
    pub fn open_with_timeout(path: &Path, busy_timeout: Duration) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.busy_timeout(busy_timeout)?;
        let store = Self { conn };
        store.initialize_schema()?;
        Ok(store)
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self { conn };
        store.initialize_schema()?;
        Ok(store)
    }

    /// Initialize the database schema
    fn initialize_schema(&self) -> Result<()> {
        self.conn.execute_batch(schema::CONNECTION_PRAGMAS)?;
        for stmt in schema::all_schema_statements() {
            self.conn.execute(stmt, [])?;
        }
        Ok(())
    }

    /// Begin a write transaction. Rolls back on drop unless committed.
    ///
    /// IMMEDIATE takes the write lock up front, so concurrent writers queue
    /// on the busy timeout instead of failing halfway through.
    pub(crate) fn begin_write(&self) -> Result<Transaction<'_>> {
        Ok(Transaction::new_unchecked(&self.conn, TransactionBehavior::Immediate)?)
    }

    pub(crate) fn connection(&self) -> &Connection {
        &self.conn
    }

    // ========== Student Operations ==========

    /// Create a student. Fails with `DuplicateKey` if the roll number is taken.
    pub fn create_student(
        &self,
        roll_number: &str,
        first_name: &str,
        last_name: Option<&str>,
    ) -> Result<Student> {
        let roll_number = require("roll number", roll_number)?;
        let first_name = require("first name", first_name)?;
        let last_name = optional("last name", last_name)?;

        let tx = self.begin_write()?;
        let taken: bool = tx.query_row(
            "SELECT EXISTS(SELECT 1 FROM student WHERE roll_number = ?1)",
            [roll_number],
            |row| row.get(0),
        )?;
        if taken {
            return Err(duplicate_roll_number(roll_number));
        }

        tx.execute(
            "INSERT INTO student (roll_number, first_name, last_name) VALUES (?1, ?2, ?3)",
            params![roll_number, first_name, last_name],
        )
        .map_err(|e| unique_violation(e, || duplicate_roll_number(roll_number)))?;
        let student_id = tx.last_insert_rowid();
        tx.commit()?;

        tracing::debug!(student_id, roll_number, "created student");
        Ok(Student {
            student_id,
            roll_number: roll_number.to_string(),
            first_name: first_name.to_string(),
            last_name: last_name.map(str::to_string),
        })
    }

    /// Get a student by id
    pub fn get_student(&self, student_id: i64) -> Result<Student> {
        find_student(&self.conn, student_id)?
            .ok_or_else(|| Error::not_found(EntityKind::Student, student_id))
    }

    /// Replace a student's names. The roll number is immutable.
    pub fn update_student(
        &self,
        student_id: i64,
        first_name: &str,
        last_name: Option<&str>,
    ) -> Result<Student> {
        let tx = self.begin_write()?;
        update_student_names(&tx, student_id, first_name, last_name)?;
        let student = find_student(&tx, student_id)?
            .ok_or_else(|| Error::not_found(EntityKind::Student, student_id))?;
        tx.commit()?;
        Ok(student)
    }

    /// Delete the student row only. Enrollments are not touched: a student who
    /// is still enrolled somewhere is refused with `HasEnrollments` and
    /// nothing changes. Use `EnrollmentManager::delete_student_cascade` to
    /// remove the student together with their enrollments.
    pub fn delete_student(&self, student_id: i64) -> Result<()> {
        let tx = self.begin_write()?;
        delete_student_row(&tx, student_id)?;
        tx.commit()?;
        Ok(())
    }

    /// All students in insertion order
    pub fn list_students(&self) -> Result<Vec<Student>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM student ORDER BY student_id",
            STUDENT_COLUMNS
        ))?;

        let students = stmt
            .query_map([], row_to_student)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(students)
    }

    /// Count all students
    pub fn count_students(&self) -> Result<usize> {
        count_rows(&self.conn, "student")
    }

    // ========== Course Operations ==========

    /// Create a course. Fails with `DuplicateKey` if the course code is taken.
    pub fn create_course(
        &self,
        course_code: &str,
        course_name: &str,
        description: Option<&str>,
    ) -> Result<Course> {
        let course_code = require("course code", course_code)?;
        let course_name = require("course name", course_name)?;
        let description = optional("course description", description)?;

        let tx = self.begin_write()?;
        let taken: bool = tx.query_row(
            "SELECT EXISTS(SELECT 1 FROM course WHERE course_code = ?1)",
            [course_code],
            |row| row.get(0),
        )?;
        if taken {
            return Err(duplicate_course_code(course_code));
        }

        tx.execute(
            "INSERT INTO course (course_code, course_name, course_description) VALUES (?1, ?2, ?3)",
            params![course_code, course_name, description],
        )
        .map_err(|e| unique_violation(e, || duplicate_course_code(course_code)))?;
        let course_id = tx.last_insert_rowid();
        tx.commit()?;

        tracing::debug!(course_id, course_code, "created course");
        Ok(Course {
            course_id,
            course_code: course_code.to_string(),
            course_name: course_name.to_string(),
            course_description: description.map(str::to_string),
        })
    }

    /// Get a course by id
    pub fn get_course(&self, course_id: i64) -> Result<Course> {
        find_course(&self.conn, course_id)?
            .ok_or_else(|| Error::not_found(EntityKind::Course, course_id))
    }

    /// Replace a course's name and description. The course code is immutable.
    pub fn update_course(
        &self,
        course_id: i64,
        course_name: &str,
        description: Option<&str>,
    ) -> Result<Course> {
        let course_name = require("course name", course_name)?;
        let description = optional("course description", description)?;

        let tx = self.begin_write()?;
        let changed = tx.execute(
            "UPDATE course SET course_name = ?2, course_description = ?3 WHERE course_id = ?1",
            params![course_id, course_name, description],
        )?;
        if changed == 0 {
            return Err(Error::not_found(EntityKind::Course, course_id));
        }
        let course = find_course(&tx, course_id)?
            .ok_or_else(|| Error::not_found(EntityKind::Course, course_id))?;
        tx.commit()?;

        tracing::debug!(course_id, "updated course");
        Ok(course)
    }

    /// Delete the course row only. A course that still has enrollments is
    /// refused with `HasEnrollments`; see [`SqliteStore::delete_student`].
    pub fn delete_course(&self, course_id: i64) -> Result<()> {
        let tx = self.begin_write()?;
        delete_course_row(&tx, course_id)?;
        tx.commit()?;
        Ok(())
    }

    /// All courses in insertion order
    pub fn list_courses(&self) -> Result<Vec<Course>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM course ORDER BY course_id",
            COURSE_COLUMNS
        ))?;

        let courses = stmt
            .query_map([], row_to_course)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(courses)
    }

    /// Count all courses
    pub fn count_courses(&self) -> Result<usize> {
        count_rows(&self.conn, "course")
    }

    /// Count all enrollment rows
    pub fn count_enrollments(&self) -> Result<usize> {
        count_rows(&self.conn, "enrollments")
    }

    /// Get database statistics
    pub fn stats(&self) -> Result<StoreStats> {
        Ok(StoreStats {
            students: self.count_students()?,
            courses: self.count_courses()?,
            enrollments: self.count_enrollments()?,
        })
    }
}

// ========== Connection-level helpers ==========
//
// These take a plain `&Connection` so they compose inside a caller's
// transaction (a `Transaction` derefs to `Connection`).

pub(crate) fn find_student(conn: &Connection, student_id: i64) -> Result<Option<Student>> {
    conn.query_row(
        &format!("SELECT {} FROM student WHERE student_id = ?1", STUDENT_COLUMNS),
        [student_id],
        row_to_student,
    )
    .optional()
    .map_err(Into::into)
}

pub(crate) fn find_course(conn: &Connection, course_id: i64) -> Result<Option<Course>> {
    conn.query_row(
        &format!("SELECT {} FROM course WHERE course_id = ?1", COURSE_COLUMNS),
        [course_id],
        row_to_course,
    )
    .optional()
    .map_err(Into::into)
}

pub(crate) fn student_exists(conn: &Connection, student_id: i64) -> Result<bool> {
    let exists = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM student WHERE student_id = ?1)",
        [student_id],
        |row| row.get(0),
    )?;
    Ok(exists)
}

pub(crate) fn course_exists(conn: &Connection, course_id: i64) -> Result<bool> {
    let exists = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM course WHERE course_id = ?1)",
        [course_id],
        |row| row.get(0),
    )?;
    Ok(exists)
}

pub(crate) fn update_student_names(
    conn: &Connection,
    student_id: i64,
    first_name: &str,
    last_name: Option<&str>,
) -> Result<()> {
    let first_name = require("first name", first_name)?;
    let last_name = optional("last name", last_name)?;

    let changed = conn.execute(
        "UPDATE student SET first_name = ?2, last_name = ?3 WHERE student_id = ?1",
        params![student_id, first_name, last_name],
    )?;
    if changed == 0 {
        return Err(Error::not_found(EntityKind::Student, student_id));
    }

    tracing::debug!(student_id, "updated student");
    Ok(())
}

pub(crate) fn delete_student_row(conn: &Connection, student_id: i64) -> Result<()> {
    let count = count_matching(conn, "estudent_id", student_id)?;
    if count > 0 {
        return Err(Error::HasEnrollments {
            entity: EntityKind::Student,
            id: student_id,
            count,
        });
    }
    let changed = conn.execute("DELETE FROM student WHERE student_id = ?1", [student_id])?;
    if changed == 0 {
        return Err(Error::not_found(EntityKind::Student, student_id));
    }
    tracing::debug!(student_id, "deleted student");
    Ok(())
}

pub(crate) fn delete_course_row(conn: &Connection, course_id: i64) -> Result<()> {
    let count = count_matching(conn, "ecourse_id", course_id)?;
    if count > 0 {
        return Err(Error::HasEnrollments {
            entity: EntityKind::Course,
            id: course_id,
            count,
        });
    }
    let changed = conn.execute("DELETE FROM course WHERE course_id = ?1", [course_id])?;
    if changed == 0 {
        return Err(Error::not_found(EntityKind::Course, course_id));
    }
    tracing::debug!(course_id, "deleted course");
    Ok(())
}

/// Convert a row selected with `STUDENT_COLUMNS` to a Student
pub(crate) fn row_to_student(row: &rusqlite::Row) -> rusqlite::Result<Student> {
    Ok(Student {
        student_id: row.get(0)?,
        roll_number: row.get(1)?,
        first_name: row.get(2)?,
        // Older databases store a missing last name as ''
        last_name: row.get::<_, Option<String>>(3)?.filter(|s| !s.is_empty()),
    })
}

/// Convert a row selected with `COURSE_COLUMNS` to a Course
pub(crate) fn row_to_course(row: &rusqlite::Row) -> rusqlite::Result<Course> {
    Ok(Course {
        course_id: row.get(0)?,
        course_code: row.get(1)?,
        course_name: row.get(2)?,
        course_description: row.get::<_, Option<String>>(3)?.filter(|s| !s.is_empty()),
    })
}

/// Column list for student selects, qualified with the given table alias
pub(crate) fn student_columns(alias: &str) -> String {
    qualify(STUDENT_COLUMNS, alias)
}

/// Column list for course selects, qualified with the given table alias
pub(crate) fn course_columns(alias: &str) -> String {
    qualify(COURSE_COLUMNS, alias)
}

fn qualify(columns: &str, alias: &str) -> String {
    columns
        .split(", ")
        .map(|c| format!("{}.{}", alias, c))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Enrollments whose `column` (estudent_id or ecourse_id) equals `id`
fn count_matching(conn: &Connection, column: &str, id: i64) -> Result<usize> {
    let count: i64 = conn.query_row(
        &format!("SELECT COUNT(*) FROM enrollments WHERE {} = ?1", column),
        [id],
        |row| row.get(0),
    )?;
    Ok(count as usize)
}

fn count_rows(conn: &Connection, table: &str) -> Result<usize> {
    let count: i64 = conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| row.get(0))?;
    Ok(count as usize)
}

// ========== Validation ==========

/// Trim a required text field and check it is non-blank and within the column width
pub(crate) fn require<'a>(field: &str, value: &'a str) -> Result<&'a str> {
    let value = value.trim();
    if value.is_empty() {
        return Err(Error::Validation(format!("{} is required", field)));
    }
    check_len(field, value)?;
    Ok(value)
}

/// Trim an optional text field, mapping blank input to `None`
pub(crate) fn optional<'a>(field: &str, value: Option<&'a str>) -> Result<Option<&'a str>> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => {
            check_len(field, v)?;
            Ok(Some(v))
        }
        _ => Ok(None),
    }
}

fn check_len(field: &str, value: &str) -> Result<()> {
    if value.chars().count() > schema::MAX_FIELD_LEN {
        return Err(Error::Validation(format!(
            "{} must be at most {} characters",
            field,
            schema::MAX_FIELD_LEN
        )));
    }
    Ok(())
}

fn duplicate_roll_number(roll_number: &str) -> Error {
    Error::DuplicateKey {
        entity: EntityKind::Student,
        field: "roll number",
        value: roll_number.to_string(),
    }
}

fn duplicate_course_code(course_code: &str) -> Error {
    Error::DuplicateKey {
        entity: EntityKind::Course,
        field: "course code",
        value: course_code.to_string(),
    }
}

/// Report a UNIQUE constraint failure as a typed duplicate, anything else as storage
fn unique_violation(err: rusqlite::Error, duplicate: impl FnOnce() -> Error) -> Error {
    match &err {
        rusqlite::Error::SqliteFailure(e, _)
            if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE =>
        {
            duplicate()
        }
        _ => err.into(),
    }
}

/// Row counts per table
#[derive(Debug, Clone, Serialize)]
pub struct StoreStats {
    pub students: usize,
    pub courses: usize,
    pub enrollments: usize,
}

impl std::fmt::Display for StoreStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Database Statistics:")?;
        writeln!(f, "  Students: {}", self.students)?;
        writeln!(f, "  Courses: {}", self.courses)?;
        writeln!(f, "  Enrollments: {}", self.enrollments)
    }
}
