use axum::{
    routing::{delete, get, post},
    Router,
};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use crate::storage::SqliteStore;

pub mod routes;

use routes::ApiError;

/// Server state
///
/// Holds only where the database lives. Each request opens its own
/// connection, so concurrent requests are serialized by SQLite's write lock
/// rather than by anything in-process.
pub struct AppState {
    pub database_path: PathBuf,
    pub busy_timeout: Duration,
}

impl AppState {
    pub fn new(database_path: PathBuf, busy_timeout: Duration) -> Self {
        Self {
            database_path,
            busy_timeout,
        }
    }

    /// Open a store for this request and run `f` on the blocking pool
    pub async fn with_store<T, F>(&self, f: F) -> Result<T, ApiError>
    where
        F: FnOnce(&SqliteStore) -> crate::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let path = self.database_path.clone();
        let busy_timeout = self.busy_timeout;
        let result = tokio::task::spawn_blocking(move || {
            let store = SqliteStore::open_with_timeout(&path, busy_timeout)?;
            f(&store)
        })
        .await
        .map_err(|e| ApiError::internal(format!("store task failed: {}", e)))?;

        result.map_err(ApiError::from)
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(routes::list_students))
        .route("/students", get(routes::list_students).post(routes::create_student))
        .route(
            "/students/{id}",
            get(routes::student_detail)
                .post(routes::update_student)
                .delete(routes::delete_student),
        )
        .route("/students/{id}/enrollments", post(routes::enroll))
        .route("/students/{id}/enrollments/{course_id}", delete(routes::withdraw))
        .route("/courses", get(routes::list_courses).post(routes::create_course))
        .route(
            "/courses/{id}",
            get(routes::course_detail)
                .post(routes::update_course)
                .delete(routes::delete_course),
        )
        .route("/stats", get(routes::stats))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn start_server(port: u16, database_path: PathBuf, busy_timeout: Duration) -> anyhow::Result<()> {
    // Create the schema once up front so a bad path fails at start-up
    let stats = SqliteStore::open_with_timeout(&database_path, busy_timeout)?.stats()?;
    tracing::info!(
        students = stats.students,
        courses = stats.courses,
        enrollments = stats.enrollments,
        "Opened database {}",
        database_path.display()
    );

    let state = Arc::new(AppState::new(database_path, busy_timeout));
    let app = router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Starting server on {}", addr);
    println!("🌍 Server running at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
