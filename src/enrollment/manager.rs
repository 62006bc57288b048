//! Enrollment manager: enroll/withdraw and cascading deletes
//!
//! Every public operation runs in a single write transaction on the store.
//! A failure anywhere drops the transaction, which rolls back every write the
//! operation made.

use rusqlite::{Connection, OptionalExtension, params};
use crate::{EntityKind, Error, Result};
use crate::course::Course;
use crate::student::Student;
use crate::storage::SqliteStore;
use crate::storage::sqlite::{
    course_columns, course_exists, delete_course_row, delete_student_row, find_student,
    row_to_course, row_to_student, student_columns, student_exists, update_student_names,
};
use super::Enrollment;

/// Enforces enrollment rules on top of a [`SqliteStore`]
pub struct EnrollmentManager<'a> {
    store: &'a SqliteStore,
}

impl<'a> EnrollmentManager<'a> {
    pub fn new(store: &'a SqliteStore) -> Self {
        Self { store }
    }

    /// Enroll a student in a course.
    ///
    /// Fails with `NotFound` if either side is missing and with
    /// `AlreadyEnrolled` if the pair is already linked.
    pub fn enroll(&self, student_id: i64, course_id: i64) -> Result<Enrollment> {
        let tx = self.store.begin_write()?;
        let enrollment = enroll_in(&tx, student_id, course_id)?;
        tx.commit()?;
        Ok(enrollment)
    }

    /// Remove the enrollment for this pair. Fails with `NotFound` if there is none.
    pub fn withdraw(&self, student_id: i64, course_id: i64) -> Result<()> {
        let tx = self.store.begin_write()?;
        let removed = tx.execute(
            "DELETE FROM enrollments WHERE estudent_id = ?1 AND ecourse_id = ?2",
            params![student_id, course_id],
        )?;
        if removed == 0 {
            return Err(Error::not_found(
                EntityKind::Enrollment,
                pair_key(student_id, course_id),
            ));
        }
        tx.commit()?;

        tracing::debug!(student_id, course_id, "withdrew enrollment");
        Ok(())
    }

    /// Delete a student and all of their enrollments.
    /// Returns the number of enrollments removed.
    pub fn delete_student_cascade(&self, student_id: i64) -> Result<usize> {
        let tx = self.store.begin_write()?;
        if !student_exists(&tx, student_id)? {
            return Err(Error::not_found(EntityKind::Student, student_id));
        }
        let removed = tx.execute("DELETE FROM enrollments WHERE estudent_id = ?1", [student_id])?;
        delete_student_row(&tx, student_id)?;
        tx.commit()?;

        tracing::debug!(student_id, enrollments = removed, "deleted student with enrollments");
        Ok(removed)
    }

    /// Delete a course and all of its enrollments.
    /// Returns the number of enrollments removed.
    pub fn delete_course_cascade(&self, course_id: i64) -> Result<usize> {
        let tx = self.store.begin_write()?;
        if !course_exists(&tx, course_id)? {
            return Err(Error::not_found(EntityKind::Course, course_id));
        }
        let removed = tx.execute("DELETE FROM enrollments WHERE ecourse_id = ?1", [course_id])?;
        delete_course_row(&tx, course_id)?;
        tx.commit()?;

        tracing::debug!(course_id, enrollments = removed, "deleted course with enrollments");
        Ok(removed)
    }

    /// Courses the student is enrolled in, in enrollment order
    pub fn list_enrollments_for_student(&self, student_id: i64) -> Result<Vec<Course>> {
        let tx = self.store.connection().unchecked_transaction()?;
        if !student_exists(&tx, student_id)? {
            return Err(Error::not_found(EntityKind::Student, student_id));
        }

        let courses = {
            let mut stmt = tx.prepare(&format!(
                "SELECT {} FROM enrollments e
                 JOIN course c ON c.course_id = e.ecourse_id
                 WHERE e.estudent_id = ?1
                 ORDER BY e.enrollment_id",
                course_columns("c")
            ))?;
            stmt.query_map([student_id], row_to_course)?
                .collect::<rusqlite::Result<Vec<_>>>()?
        };
        tx.finish()?;
        Ok(courses)
    }

    /// Students enrolled in the course, in enrollment order
    pub fn list_students_for_course(&self, course_id: i64) -> Result<Vec<Student>> {
        let tx = self.store.connection().unchecked_transaction()?;
        if !course_exists(&tx, course_id)? {
            return Err(Error::not_found(EntityKind::Course, course_id));
        }

        let students = {
            let mut stmt = tx.prepare(&format!(
                "SELECT {} FROM enrollments e
                 JOIN student s ON s.student_id = e.estudent_id
                 WHERE e.ecourse_id = ?1
                 ORDER BY e.enrollment_id",
                student_columns("s")
            ))?;
            stmt.query_map([course_id], row_to_student)?
                .collect::<rusqlite::Result<Vec<_>>>()?
        };
        tx.finish()?;
        Ok(students)
    }

    /// Whether the pair is currently enrolled
    pub fn enrollment_exists(&self, student_id: i64, course_id: i64) -> Result<bool> {
        Ok(find_enrollment(self.store.connection(), student_id, course_id)?.is_some())
    }

    /// Update a student's names and, if `course_id` is given, enroll them in
    /// that course. Both happen or neither does: a duplicate enrollment fails
    /// with `AlreadyEnrolled` and the name change is rolled back too.
    pub fn update_student_and_enroll(
        &self,
        student_id: i64,
        first_name: &str,
        last_name: Option<&str>,
        course_id: Option<i64>,
    ) -> Result<Student> {
        let tx = self.store.begin_write()?;
        update_student_names(&tx, student_id, first_name, last_name)?;
        if let Some(course_id) = course_id {
            enroll_in(&tx, student_id, course_id)?;
        }
        let student = find_student(&tx, student_id)?
            .ok_or_else(|| Error::not_found(EntityKind::Student, student_id))?;
        tx.commit()?;
        Ok(student)
    }
}

fn enroll_in(conn: &Connection, student_id: i64, course_id: i64) -> Result<Enrollment> {
    if !student_exists(conn, student_id)? {
        return Err(Error::not_found(EntityKind::Student, student_id));
    }
    if !course_exists(conn, course_id)? {
        return Err(Error::not_found(EntityKind::Course, course_id));
    }
    if find_enrollment(conn, student_id, course_id)?.is_some() {
        return Err(Error::AlreadyEnrolled { student_id, course_id });
    }

    conn.execute(
        "INSERT INTO enrollments (estudent_id, ecourse_id) VALUES (?1, ?2)",
        params![student_id, course_id],
    )?;
    let enrollment_id = conn.last_insert_rowid();

    tracing::debug!(enrollment_id, student_id, course_id, "enrolled student");
    Ok(Enrollment {
        enrollment_id,
        student_id,
        course_id,
    })
}

fn find_enrollment(conn: &Connection, student_id: i64, course_id: i64) -> Result<Option<Enrollment>> {
    conn.query_row(
        "SELECT enrollment_id, estudent_id, ecourse_id FROM enrollments
         WHERE estudent_id = ?1 AND ecourse_id = ?2
         LIMIT 1",
        params![student_id, course_id],
        |row| {
            Ok(Enrollment {
                enrollment_id: row.get(0)?,
                student_id: row.get(1)?,
                course_id: row.get(2)?,
            })
        },
    )
    .optional()
    .map_err(Into::into)
}

fn pair_key(student_id: i64, course_id: i64) -> String {
    format!("student {} in course {}", student_id, course_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded() -> (SqliteStore, Student, Course) {
        let store = SqliteStore::open_in_memory().unwrap();
        let student = store.create_student("R1", "Ann", None).unwrap();
        let course = store.create_course("C1", "Math", None).unwrap();
        (store, student, course)
    }

    #[test]
    fn test_enroll_twice_is_rejected() {
        let (store, student, course) = seeded();
        let manager = EnrollmentManager::new(&store);

        let enrollment = manager.enroll(student.student_id, course.course_id).unwrap();
        assert_eq!(enrollment.student_id, student.student_id);
        assert_eq!(enrollment.course_id, course.course_id);

        let err = manager.enroll(student.student_id, course.course_id).unwrap_err();
        assert!(matches!(err, Error::AlreadyEnrolled { .. }));
        assert_eq!(store.count_enrollments().unwrap(), 1);
    }

    #[test]
    fn test_enroll_unknown_ids() {
        let (store, student, course) = seeded();
        let manager = EnrollmentManager::new(&store);

        assert!(matches!(
            manager.enroll(999, course.course_id),
            Err(Error::NotFound { entity: EntityKind::Student, .. })
        ));
        assert!(matches!(
            manager.enroll(student.student_id, 999),
            Err(Error::NotFound { entity: EntityKind::Course, .. })
        ));
        assert_eq!(store.count_enrollments().unwrap(), 0);
    }

    #[test]
    fn test_withdraw() {
        let (store, student, course) = seeded();
        let manager = EnrollmentManager::new(&store);

        manager.enroll(student.student_id, course.course_id).unwrap();
        manager.withdraw(student.student_id, course.course_id).unwrap();
        assert!(!manager.enrollment_exists(student.student_id, course.course_id).unwrap());

        assert!(matches!(
            manager.withdraw(student.student_id, course.course_id),
            Err(Error::NotFound { entity: EntityKind::Enrollment, .. })
        ));
    }

    #[test]
    fn test_reenroll_after_withdraw() {
        let (store, student, course) = seeded();
        let manager = EnrollmentManager::new(&store);

        let first = manager.enroll(student.student_id, course.course_id).unwrap();
        manager.withdraw(student.student_id, course.course_id).unwrap();
        let second = manager.enroll(student.student_id, course.course_id).unwrap();
        assert_ne!(first.enrollment_id, second.enrollment_id);
    }

    #[test]
    fn test_delete_student_cascade() {
        let (store, student, math) = seeded();
        let physics = store.create_course("C2", "Physics", None).unwrap();
        let other = store.create_student("R2", "Bob", None).unwrap();
        let manager = EnrollmentManager::new(&store);

        manager.enroll(student.student_id, math.course_id).unwrap();
        manager.enroll(student.student_id, physics.course_id).unwrap();
        manager.enroll(other.student_id, math.course_id).unwrap();

        let removed = manager.delete_student_cascade(student.student_id).unwrap();
        assert_eq!(removed, 2);
        assert_eq!(store.count_enrollments().unwrap(), 1);
        assert!(matches!(store.get_student(student.student_id), Err(Error::NotFound { .. })));
        assert_eq!(manager.list_enrollments_for_student(other.student_id).unwrap(), vec![math]);
    }

    #[test]
    fn test_delete_course_cascade() {
        let (store, student, course) = seeded();
        let manager = EnrollmentManager::new(&store);
        manager.enroll(student.student_id, course.course_id).unwrap();

        assert_eq!(manager.delete_course_cascade(course.course_id).unwrap(), 1);
        assert!(manager.list_enrollments_for_student(student.student_id).unwrap().is_empty());
        assert_eq!(store.count_courses().unwrap(), 0);
    }

    #[test]
    fn test_cascade_on_missing_parent() {
        let (store, _, _) = seeded();
        let manager = EnrollmentManager::new(&store);

        assert!(matches!(manager.delete_student_cascade(999), Err(Error::NotFound { .. })));
        assert!(matches!(manager.delete_course_cascade(999), Err(Error::NotFound { .. })));
    }

    #[test]
    fn test_cascade_without_enrollments() {
        let (store, student, _) = seeded();
        let manager = EnrollmentManager::new(&store);
        assert_eq!(manager.delete_student_cascade(student.student_id).unwrap(), 0);
        assert_eq!(store.count_students().unwrap(), 0);
    }

    #[test]
    fn test_list_both_directions() {
        let (store, ann, math) = seeded();
        let bob = store.create_student("R2", "Bob", None).unwrap();
        let physics = store.create_course("C2", "Physics", None).unwrap();
        let manager = EnrollmentManager::new(&store);

        manager.enroll(ann.student_id, physics.course_id).unwrap();
        manager.enroll(ann.student_id, math.course_id).unwrap();
        manager.enroll(bob.student_id, math.course_id).unwrap();

        let courses = manager.list_enrollments_for_student(ann.student_id).unwrap();
        assert_eq!(courses, vec![physics, math.clone()]);

        let students = manager.list_students_for_course(math.course_id).unwrap();
        assert_eq!(students, vec![ann, bob]);

        assert!(matches!(manager.list_enrollments_for_student(999), Err(Error::NotFound { .. })));
        assert!(matches!(manager.list_students_for_course(999), Err(Error::NotFound { .. })));
    }

    #[test]
    fn test_update_and_enroll() {
        let (store, student, course) = seeded();
        let manager = EnrollmentManager::new(&store);

        let updated = manager
            .update_student_and_enroll(student.student_id, "Anne", Some("Lee"), Some(course.course_id))
            .unwrap();
        assert_eq!(updated.full_name(), "Anne Lee");
        assert!(manager.enrollment_exists(student.student_id, course.course_id).unwrap());

        let renamed = manager
            .update_student_and_enroll(student.student_id, "Annie", None, None)
            .unwrap();
        assert_eq!(renamed.first_name, "Annie");
    }

    #[test]
    fn test_update_and_enroll_rolls_back_on_duplicate() {
        let (store, student, course) = seeded();
        let manager = EnrollmentManager::new(&store);
        manager.enroll(student.student_id, course.course_id).unwrap();

        let err = manager
            .update_student_and_enroll(student.student_id, "Changed", None, Some(course.course_id))
            .unwrap_err();
        assert!(matches!(err, Error::AlreadyEnrolled { .. }));

        assert_eq!(store.get_student(student.student_id).unwrap().first_name, "Ann");
        assert_eq!(store.count_enrollments().unwrap(), 1);
    }

    #[test]
    fn test_update_and_enroll_rolls_back_on_missing_course() {
        let (store, student, _) = seeded();
        let manager = EnrollmentManager::new(&store);

        let err = manager
            .update_student_and_enroll(student.student_id, "Changed", None, Some(999))
            .unwrap_err();
        assert!(matches!(err, Error::NotFound { entity: EntityKind::Course, .. }));
        assert_eq!(store.get_student(student.student_id).unwrap().first_name, "Ann");
    }
}
