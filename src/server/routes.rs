use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Form,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use crate::server::AppState;
use crate::storage::StoreStats;
use crate::{Course, EnrollmentManager, Enrollment, Error, Student};

// Form field names match the legacy HTML form inputs (roll, f_name, ...).

#[derive(Debug, Default, Deserialize)]
pub struct StudentForm {
    #[serde(default)]
    pub roll: String,
    #[serde(default)]
    pub f_name: String,
    #[serde(default)]
    pub l_name: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct StudentUpdateForm {
    #[serde(default)]
    pub f_name: String,
    #[serde(default)]
    pub l_name: String,
    /// Optional course id to enroll in
    #[serde(default)]
    pub course: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct EnrollForm {
    #[serde(default)]
    pub course: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct CourseForm {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub c_name: String,
    #[serde(default)]
    pub desc: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct CourseUpdateForm {
    #[serde(default)]
    pub c_name: String,
    #[serde(default)]
    pub desc: String,
}

#[derive(Debug, Serialize)]
pub struct StudentDetail {
    pub student: Student,
    pub courses: Vec<Course>,
}

#[derive(Debug, Serialize)]
pub struct CourseDetail {
    pub course: Course,
    pub students: Vec<Student>,
}

#[derive(Debug, Serialize)]
pub struct Deleted {
    pub id: i64,
    pub enrollments_removed: usize,
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// A typed failure mapped onto an HTTP status
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        let status = match &err {
            Error::Validation(_) => StatusCode::BAD_REQUEST,
            Error::NotFound { .. } => StatusCode::NOT_FOUND,
            Error::DuplicateKey { .. }
            | Error::AlreadyEnrolled { .. }
            | Error::HasEnrollments { .. } => StatusCode::CONFLICT,
            Error::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if err.is_client_error() {
            tracing::warn!(status = status.as_u16(), "Rejected request: {}", err);
        } else {
            tracing::error!("Request failed: {}", err);
        }
        Self {
            status,
            message: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ErrorResponse { error: self.message })).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

/// Blank means "no course"; anything else must be an integer id
fn parse_course_field(raw: &str) -> crate::Result<Option<i64>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    raw.parse::<i64>()
        .map(Some)
        .map_err(|_| Error::Validation(format!("invalid course id '{}'", raw)))
}

// ========== Students ==========

pub async fn list_students(State(state): State<Arc<AppState>>) -> ApiResult<Json<Vec<Student>>> {
    let students = state.with_store(|store| store.list_students()).await?;
    Ok(Json(students))
}

pub async fn create_student(
    State(state): State<Arc<AppState>>,
    Form(form): Form<StudentForm>,
) -> ApiResult<(StatusCode, Json<Student>)> {
    let student = state
        .with_store(move |store| {
            store.create_student(form.roll.trim(), form.f_name.trim(), Some(form.l_name.trim()))
        })
        .await?;
    Ok((StatusCode::CREATED, Json(student)))
}

pub async fn student_detail(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> ApiResult<Json<StudentDetail>> {
    let detail = state
        .with_store(move |store| {
            let student = store.get_student(id)?;
            let courses = EnrollmentManager::new(store).list_enrollments_for_student(id)?;
            Ok(StudentDetail { student, courses })
        })
        .await?;
    Ok(Json(detail))
}

pub async fn update_student(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Form(form): Form<StudentUpdateForm>,
) -> ApiResult<Json<Student>> {
    let student = state
        .with_store(move |store| {
            let course_id = parse_course_field(&form.course)?;
            EnrollmentManager::new(store).update_student_and_enroll(
                id,
                form.f_name.trim(),
                Some(form.l_name.trim()),
                course_id,
            )
        })
        .await?;
    Ok(Json(student))
}

pub async fn delete_student(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Deleted>> {
    let enrollments_removed = state
        .with_store(move |store| EnrollmentManager::new(store).delete_student_cascade(id))
        .await?;
    Ok(Json(Deleted { id, enrollments_removed }))
}

pub async fn enroll(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Form(form): Form<EnrollForm>,
) -> ApiResult<(StatusCode, Json<Enrollment>)> {
    let enrollment = state
        .with_store(move |store| {
            let course_id = parse_course_field(&form.course)?
                .ok_or_else(|| Error::Validation("course is required".to_string()))?;
            EnrollmentManager::new(store).enroll(id, course_id)
        })
        .await?;
    Ok((StatusCode::CREATED, Json(enrollment)))
}

pub async fn withdraw(
    State(state): State<Arc<AppState>>,
    Path((student_id, course_id)): Path<(i64, i64)>,
) -> ApiResult<StatusCode> {
    state
        .with_store(move |store| EnrollmentManager::new(store).withdraw(student_id, course_id))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

// ========== Courses ==========

pub async fn list_courses(State(state): State<Arc<AppState>>) -> ApiResult<Json<Vec<Course>>> {
    let courses = state.with_store(|store| store.list_courses()).await?;
    Ok(Json(courses))
}

pub async fn create_course(
    State(state): State<Arc<AppState>>,
    Form(form): Form<CourseForm>,
) -> ApiResult<(StatusCode, Json<Course>)> {
    let course = state
        .with_store(move |store| {
            store.create_course(form.code.trim(), form.c_name.trim(), Some(form.desc.trim()))
        })
        .await?;
    Ok((StatusCode::CREATED, Json(course)))
}

pub async fn course_detail(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> ApiResult<Json<CourseDetail>> {
    let detail = state
        .with_store(move |store| {
            let course = store.get_course(id)?;
            let students = EnrollmentManager::new(store).list_students_for_course(id)?;
            Ok(CourseDetail { course, students })
        })
        .await?;
    Ok(Json(detail))
}

pub async fn update_course(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Form(form): Form<CourseUpdateForm>,
) -> ApiResult<Json<Course>> {
    let course = state
        .with_store(move |store| {
            store.update_course(id, form.c_name.trim(), Some(form.desc.trim()))
        })
        .await?;
    Ok(Json(course))
}

pub async fn delete_course(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Deleted>> {
    let enrollments_removed = state
        .with_store(move |store| EnrollmentManager::new(store).delete_course_cascade(id))
        .await?;
    Ok(Json(Deleted { id, enrollments_removed }))
}

pub async fn stats(State(state): State<Arc<AppState>>) -> ApiResult<Json<StoreStats>> {
    let stats = state.with_store(|store| store.stats()).await?;
    Ok(Json(stats))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::TempDir;

    fn test_state() -> (TempDir, Arc<AppState>) {
        let dir = tempfile::tempdir().unwrap();
        let state = AppState::new(dir.path().join("registrar.db"), Duration::from_millis(500));
        (dir, Arc::new(state))
    }

    fn student_form(roll: &str, first: &str) -> Form<StudentForm> {
        Form(StudentForm {
            roll: roll.to_string(),
            f_name: first.to_string(),
            l_name: String::new(),
        })
    }

    fn course_form(code: &str, name: &str) -> Form<CourseForm> {
        Form(CourseForm {
            code: code.to_string(),
            c_name: name.to_string(),
            desc: String::new(),
        })
    }

    fn enroll_form(course: &str) -> Form<EnrollForm> {
        Form(EnrollForm { course: course.to_string() })
    }

    #[tokio::test]
    async fn test_create_student_trims_fields() {
        let (_dir, state) = test_state();

        let (status, Json(student)) = create_student(State(state.clone()), student_form("  R1 ", " Ann "))
            .await
            .unwrap();
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(student.roll_number, "R1");
        assert_eq!(student.first_name, "Ann");
        assert_eq!(student.last_name, None);

        let Json(students) = list_students(State(state)).await.unwrap();
        assert_eq!(students, vec![student]);
    }

    #[tokio::test]
    async fn test_status_mapping() {
        let (_dir, state) = test_state();

        let err = create_student(State(state.clone()), student_form("R1", "  ")).await.unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);

        create_student(State(state.clone()), student_form("R1", "Ann")).await.unwrap();
        let err = create_student(State(state.clone()), student_form("R1", "Bob")).await.unwrap_err();
        assert_eq!(err.status, StatusCode::CONFLICT);

        let err = student_detail(State(state.clone()), Path(999)).await.unwrap_err();
        assert_eq!(err.status, StatusCode::NOT_FOUND);

        let err = enroll(State(state.clone()), Path(1), enroll_form("abc")).await.unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);

        let err = enroll(State(state), Path(1), enroll_form("")).await.unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_refused_plain_delete_is_conflict() {
        let store = crate::SqliteStore::open_in_memory().unwrap();
        let student = store.create_student("R1", "Ann", None).unwrap();
        let course = store.create_course("C1", "Math", None).unwrap();
        EnrollmentManager::new(&store).enroll(student.student_id, course.course_id).unwrap();

        let err = ApiError::from(store.delete_course(course.course_id).unwrap_err());
        assert_eq!(err.status, StatusCode::CONFLICT);
        assert!(err.message.contains("1 enrollment"));
    }

    #[tokio::test]
    async fn test_enrollment_flow() {
        let (_dir, state) = test_state();
        let (_, Json(student)) = create_student(State(state.clone()), student_form("R1", "Ann")).await.unwrap();
        let (_, Json(course)) = create_course(State(state.clone()), course_form("C1", "Math")).await.unwrap();
        let sid = student.student_id;
        let cid = course.course_id;

        let (status, _) = enroll(State(state.clone()), Path(sid), enroll_form(&cid.to_string()))
            .await
            .unwrap();
        assert_eq!(status, StatusCode::CREATED);

        let err = enroll(State(state.clone()), Path(sid), enroll_form(&cid.to_string()))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::CONFLICT);

        let Json(detail) = student_detail(State(state.clone()), Path(sid)).await.unwrap();
        assert_eq!(detail.courses, vec![course.clone()]);

        let Json(detail) = course_detail(State(state.clone()), Path(cid)).await.unwrap();
        assert_eq!(detail.students, vec![student]);

        let status = withdraw(State(state.clone()), Path((sid, cid))).await.unwrap();
        assert_eq!(status, StatusCode::NO_CONTENT);
        let err = withdraw(State(state), Path((sid, cid))).await.unwrap_err();
        assert_eq!(err.status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_update_student_with_enrollment() {
        let (_dir, state) = test_state();
        let (_, Json(student)) = create_student(State(state.clone()), student_form("R1", "Ann")).await.unwrap();
        let (_, Json(course)) = create_course(State(state.clone()), course_form("C1", "Math")).await.unwrap();

        let form = StudentUpdateForm {
            f_name: "Anne".to_string(),
            l_name: "Lee".to_string(),
            course: course.course_id.to_string(),
        };
        let Json(updated) = update_student(State(state.clone()), Path(student.student_id), Form(form))
            .await
            .unwrap();
        assert_eq!(updated.full_name(), "Anne Lee");

        let repeat = StudentUpdateForm {
            f_name: "Changed".to_string(),
            l_name: String::new(),
            course: course.course_id.to_string(),
        };
        let err = update_student(State(state.clone()), Path(student.student_id), Form(repeat))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::CONFLICT);

        let Json(detail) = student_detail(State(state), Path(student.student_id)).await.unwrap();
        assert_eq!(detail.student.first_name, "Anne");
    }

    #[tokio::test]
    async fn test_delete_cascades() {
        let (_dir, state) = test_state();
        let (_, Json(student)) = create_student(State(state.clone()), student_form("R1", "Ann")).await.unwrap();
        let (_, Json(course)) = create_course(State(state.clone()), course_form("C1", "Math")).await.unwrap();
        enroll(State(state.clone()), Path(student.student_id), enroll_form(&course.course_id.to_string()))
            .await
            .unwrap();

        let Json(deleted) = delete_course(State(state.clone()), Path(course.course_id)).await.unwrap();
        assert_eq!(deleted.enrollments_removed, 1);

        let Json(stats) = stats(State(state.clone())).await.unwrap();
        assert_eq!(stats.courses, 0);
        assert_eq!(stats.enrollments, 0);

        let Json(deleted) = delete_student(State(state.clone()), Path(student.student_id)).await.unwrap();
        assert_eq!(deleted.enrollments_removed, 0);
        let err = delete_student(State(state), Path(student.student_id)).await.unwrap_err();
        assert_eq!(err.status, StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_parse_course_field() {
        assert_eq!(parse_course_field(" ").unwrap(), None);
        assert_eq!(parse_course_field(" 12 ").unwrap(), Some(12));
        assert!(matches!(parse_course_field("x"), Err(Error::Validation(_))));
    }
}
