//! Course endpoints.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, patch, put},
    Extension, Json, Router,
};
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

use super::auth::AuthUser;
use super::error::{field_error, internal, not_found, ApiError, REQUIRED};
use super::routes::AppState;
use super::types::CourseResponse;
use crate::store::StoreError;

/// Create course routes, nested under `/api/course`.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_courses).post(create_course))
        .route("/:id", get(get_course))
        .route("/:id", put(put_course))
        .route("/:id", patch(patch_course))
        .route("/:id", delete(delete_course))
}

#[derive(Debug, serde::Deserialize)]
pub struct CourseRequest {
    pub name: Option<String>,
}

fn validate_name(raw: &str) -> Result<String, ApiError> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(field_error("name", "El nombre no puede estar vacío."));
    }
    if name.chars().count() > 100 {
        return Err(field_error(
            "name",
            "El nombre no puede exceder 100 caracteres.",
        ));
    }
    Ok(name.to_string())
}

fn map_duplicate_name(err: StoreError) -> ApiError {
    match err {
        StoreError::DuplicateCourseName => {
            field_error("name", "Ya existe un curso con este nombre.")
        }
        other => internal(other),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────────────────────────

/// GET /api/course - List the caller's courses, name-ascending.
async fn list_courses(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Vec<CourseResponse>>, ApiError> {
    let courses = state.store.list_courses(user.id).await.map_err(internal)?;
    Ok(Json(courses.into_iter().map(Into::into).collect()))
}

/// POST /api/course - Create a course.
async fn create_course(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(req): Json<CourseRequest>,
) -> Result<(StatusCode, Json<CourseResponse>), ApiError> {
    let name = match req.name.as_deref() {
        Some(raw) => validate_name(raw)?,
        None => return Err(field_error("name", REQUIRED)),
    };

    let course = state
        .store
        .create_course(user.id, name)
        .await
        .map_err(map_duplicate_name)?;

    tracing::info!("Created course {} ({})", course.name, course.id);

    Ok((StatusCode::CREATED, Json(course.into())))
}

/// GET /api/course/:id
async fn get_course(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<CourseResponse>, ApiError> {
    state
        .store
        .course(user.id, id)
        .await
        .map_err(internal)?
        .map(|c| Json(c.into()))
        .ok_or_else(not_found)
}

/// PUT /api/course/:id - Full update; `name` is required.
async fn put_course(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(req): Json<CourseRequest>,
) -> Result<Json<CourseResponse>, ApiError> {
    let name = match req.name.as_deref() {
        Some(raw) => validate_name(raw)?,
        None => return Err(field_error("name", REQUIRED)),
    };
    rename(&state, user.id, id, name).await
}

/// PATCH /api/course/:id - Partial update; omitting `name` returns
/// the course unchanged.
async fn patch_course(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(req): Json<CourseRequest>,
) -> Result<Json<CourseResponse>, ApiError> {
    match req.name.as_deref() {
        Some(raw) => rename(&state, user.id, id, validate_name(raw)?).await,
        None => state
            .store
            .course(user.id, id)
            .await
            .map_err(internal)?
            .map(|c| Json(c.into()))
            .ok_or_else(not_found),
    }
}

async fn rename(
    state: &AppState,
    user_id: Uuid,
    id: Uuid,
    name: String,
) -> Result<Json<CourseResponse>, ApiError> {
    state
        .store
        .rename_course(user_id, id, name)
        .await
        .map_err(map_duplicate_name)?
        .map(|c| Json(c.into()))
        .ok_or_else(not_found)
}

/// DELETE /api/course/:id - Deletes and confirms. Activities that
/// referenced the course keep existing with no course.
async fn delete_course(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let deleted = state
        .store
        .delete_course(user.id, id)
        .await
        .map_err(internal)?;
    if !deleted {
        return Err(not_found());
    }

    tracing::info!("Deleted course {}", id);

    Ok(Json(json!({ "detail": "Curso eliminado correctamente." })))
}
