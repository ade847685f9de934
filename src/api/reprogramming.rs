//! Reprogramming log endpoints. Entries record a subtask's date
//! change and are immutable once written, so there is no update route.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get},
    Extension, Json, Router,
};
use chrono::NaiveDate;
use std::sync::Arc;
use uuid::Uuid;

use super::auth::AuthUser;
use super::error::{field_error, internal, invalid_pk_message, not_found, ApiError, REQUIRED};
use super::routes::AppState;
use super::types::ReprogrammingLogResponse;
use crate::store::reprogramming::NewLog;
use crate::store::StoreError;

/// Create reprogramming-log routes, nested under `/api/reprogramming_log`.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_logs).post(create_log))
        .route("/:id", get(get_log))
        .route("/:id", delete(delete_log))
}

#[derive(Debug, serde::Deserialize)]
struct LogRequest {
    subtask_id: Option<Uuid>,
    previous_date: Option<NaiveDate>,
    new_date: Option<NaiveDate>,
    reason: Option<String>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Validation
// ─────────────────────────────────────────────────────────────────────────────

fn parse_new_log(req: &LogRequest) -> Result<NewLog, ApiError> {
    let subtask_id = req
        .subtask_id
        .ok_or_else(|| field_error("subtask_id", REQUIRED))?;
    let previous_date = req
        .previous_date
        .ok_or_else(|| field_error("previous_date", REQUIRED))?;
    let new_date = req
        .new_date
        .ok_or_else(|| field_error("new_date", REQUIRED))?;
    let reason = match req.reason.as_deref() {
        None => return Err(field_error("reason", REQUIRED)),
        Some(raw) => {
            let reason = raw.trim();
            if reason.is_empty() {
                return Err(field_error(
                    "reason",
                    "Este campo no puede estar en blanco.",
                ));
            }
            reason.to_string()
        }
    };

    Ok(NewLog {
        subtask_id,
        previous_date,
        new_date,
        reason,
    })
}

fn map_subtask_not_owned(err: StoreError, subtask_id: Uuid) -> ApiError {
    match err {
        StoreError::SubtaskNotOwned => field_error("subtask_id", &invalid_pk_message(subtask_id)),
        other => internal(other),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────────────────────────

/// GET /api/reprogramming_log - List the caller's entries, newest
/// first.
async fn list_logs(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Vec<ReprogrammingLogResponse>>, ApiError> {
    let logs = state.store.list_logs(user.id).await.map_err(internal)?;
    Ok(Json(logs.into_iter().map(Into::into).collect()))
}

/// POST /api/reprogramming_log - Record a date change for an owned
/// subtask.
async fn create_log(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(req): Json<LogRequest>,
) -> Result<(StatusCode, Json<ReprogrammingLogResponse>), ApiError> {
    let new = parse_new_log(&req)?;
    let subtask_id = new.subtask_id;

    let detail = state
        .store
        .create_log(user.id, new)
        .await
        .map_err(|e| map_subtask_not_owned(e, subtask_id))?;

    tracing::info!(
        "Logged reprogramming of subtask {} to {}",
        subtask_id,
        detail.log.new_date
    );

    Ok((StatusCode::CREATED, Json(detail.into())))
}

/// GET /api/reprogramming_log/:id
async fn get_log(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<ReprogrammingLogResponse>, ApiError> {
    state
        .store
        .log(user.id, id)
        .await
        .map_err(internal)?
        .map(|d| Json(d.into()))
        .ok_or_else(not_found)
}

/// DELETE /api/reprogramming_log/:id
async fn delete_log(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let deleted = state
        .store
        .delete_log(user.id, id)
        .await
        .map_err(internal)?;
    if !deleted {
        return Err(not_found());
    }

    tracing::info!("Deleted reprogramming log {}", id);

    Ok(StatusCode::NO_CONTENT)
}
