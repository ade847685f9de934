//! Subtask endpoints. The `/today` view lives in `api::today`; it is
//! mounted here because it shares this resource's URL space.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, patch, put},
    Extension, Json, Router,
};
use chrono::NaiveDate;
use std::sync::Arc;
use uuid::Uuid;

use super::auth::AuthUser;
use super::error::{
    field_error, hours_message, internal, invalid_pk_message, not_found, ApiError, REQUIRED,
};
use super::routes::AppState;
use super::today;
use super::types::SubtaskResponse;
use crate::hours::{Hours, HoursInput};
use crate::model::SubtaskStatus;
use crate::store::subtasks::{NewSubtask, SubtaskPatch};
use crate::store::StoreError;

/// Create subtask routes, nested under `/api/subtask`.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_subtasks).post(create_subtask))
        .route("/today", get(today::today_view))
        .route("/:id", get(get_subtask))
        .route("/:id", put(update_subtask))
        .route("/:id", patch(update_subtask))
        .route("/:id", delete(delete_subtask))
}

#[derive(Debug, serde::Deserialize)]
pub struct SubtaskRequest {
    pub title: Option<String>,
    pub activity_id: Option<Uuid>,
    pub status: Option<String>,
    pub estimated_hours: Option<HoursInput>,
    pub target_date: Option<NaiveDate>,
    pub order: Option<i64>,
    pub is_conflicted: Option<bool>,
    pub execution_note: Option<String>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Validation
// ─────────────────────────────────────────────────────────────────────────────

fn validate_title(raw: Option<&str>) -> Result<String, ApiError> {
    let title = raw.unwrap_or("").trim();
    if title.is_empty() {
        return Err(field_error(
            "title",
            "El título de la subtarea no puede estar vacío.",
        ));
    }
    if title.chars().count() > 100 {
        return Err(field_error(
            "title",
            "El título no puede exceder 100 caracteres.",
        ));
    }
    Ok(title.to_string())
}

fn validate_status(raw: &str) -> Result<SubtaskStatus, ApiError> {
    SubtaskStatus::parse(raw).ok_or_else(|| {
        field_error("status", &format!("\"{}\" no es una elección válida.", raw))
    })
}

/// Estimated effort must be a strictly positive two-decimal amount.
fn validate_hours(input: &HoursInput) -> Result<Hours, ApiError> {
    let hours = input
        .parse()
        .map_err(|e| field_error("estimated_hours", hours_message(e)))?;
    if !hours.is_positive() {
        return Err(field_error(
            "estimated_hours",
            "Las horas estimadas deben ser mayores a 0.",
        ));
    }
    Ok(hours)
}

fn validate_order(order: i64) -> Result<i64, ApiError> {
    if order < 0 {
        return Err(field_error(
            "order",
            "Asegúrese de que este valor es mayor o igual a 0.",
        ));
    }
    Ok(order)
}

/// Build a `NewSubtask` from a request body, with `activity_id`
/// supplied by the caller (path param on the nested route, body field
/// on the flat route).
pub(super) fn parse_new_subtask(
    req: &SubtaskRequest,
    activity_id: Uuid,
) -> Result<NewSubtask, ApiError> {
    let title = validate_title(req.title.as_deref())?;
    let status = match req.status.as_deref() {
        Some(raw) => validate_status(raw)?,
        None => SubtaskStatus::Pending,
    };
    let estimated_hours = match &req.estimated_hours {
        Some(input) => validate_hours(input)?,
        None => return Err(field_error("estimated_hours", REQUIRED)),
    };
    let order = validate_order(req.order.unwrap_or(0))?;

    Ok(NewSubtask {
        activity_id,
        title,
        status,
        estimated_hours,
        target_date: req.target_date,
        order,
        is_conflicted: req.is_conflicted.unwrap_or(false),
        execution_note: req.execution_note.clone(),
    })
}

fn map_activity_not_owned(err: StoreError, activity_id: Option<Uuid>) -> ApiError {
    match (err, activity_id) {
        (StoreError::ActivityNotOwned, Some(id)) => {
            field_error("activity_id", &invalid_pk_message(id))
        }
        (other, _) => internal(other),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────────────────────────

/// GET /api/subtask - List all of the caller's subtasks.
async fn list_subtasks(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Vec<SubtaskResponse>>, ApiError> {
    let subtasks = state
        .store
        .list_subtasks(user.id, None)
        .await
        .map_err(internal)?;
    Ok(Json(subtasks.into_iter().map(Into::into).collect()))
}

/// POST /api/subtask - Create a subtask under an owned activity.
async fn create_subtask(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(req): Json<SubtaskRequest>,
) -> Result<(StatusCode, Json<SubtaskResponse>), ApiError> {
    let activity_id = match req.activity_id {
        Some(id) => id,
        None => return Err(field_error("activity_id", REQUIRED)),
    };
    let new = parse_new_subtask(&req, activity_id)?;

    let detail = state
        .store
        .create_subtask(user.id, new)
        .await
        .map_err(|e| map_activity_not_owned(e, Some(activity_id)))?;

    tracing::info!("Created subtask {} ({})", detail.subtask.title, detail.subtask.id);

    Ok((StatusCode::CREATED, Json(detail.into())))
}

/// GET /api/subtask/:id
async fn get_subtask(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<SubtaskResponse>, ApiError> {
    state
        .store
        .subtask(user.id, id)
        .await
        .map_err(internal)?
        .map(|d| Json(d.into()))
        .ok_or_else(not_found)
}

/// PUT|PATCH /api/subtask/:id - Partial update; omitted fields keep
/// their value. Moving to another activity requires owning it.
async fn update_subtask(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(req): Json<SubtaskRequest>,
) -> Result<Json<SubtaskResponse>, ApiError> {
    let mut patch = SubtaskPatch::default();
    if req.title.is_some() {
        patch.title = Some(validate_title(req.title.as_deref())?);
    }
    if let Some(raw) = req.status.as_deref() {
        patch.status = Some(validate_status(raw)?);
    }
    if let Some(input) = &req.estimated_hours {
        patch.estimated_hours = Some(validate_hours(input)?);
    }
    if let Some(order) = req.order {
        patch.order = Some(validate_order(order)?);
    }
    patch.activity_id = req.activity_id;
    patch.target_date = req.target_date;
    patch.is_conflicted = req.is_conflicted;
    patch.execution_note = req.execution_note;

    state
        .store
        .update_subtask(user.id, id, patch)
        .await
        .map_err(|e| map_activity_not_owned(e, req.activity_id))?
        .map(|d| Json(d.into()))
        .ok_or_else(not_found)
}

/// DELETE /api/subtask/:id - Deletes the subtask and, by cascade, its
/// reprogramming log entries.
async fn delete_subtask(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let deleted = state
        .store
        .delete_subtask(user.id, id)
        .await
        .map_err(internal)?;
    if !deleted {
        return Err(not_found());
    }

    tracing::info!("Deleted subtask {}", id);

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_request() -> SubtaskRequest {
        SubtaskRequest {
            title: None,
            activity_id: None,
            status: None,
            estimated_hours: None,
            target_date: None,
            order: None,
            is_conflicted: None,
            execution_note: None,
        }
    }

    #[test]
    fn test_blank_title_uses_subtask_message() {
        let (_, body) = validate_title(Some("   ")).unwrap_err();
        assert_eq!(
            body.0["title"][0],
            "El título de la subtarea no puede estar vacío."
        );
    }

    #[test]
    fn test_unknown_status_rejected() {
        assert_eq!(validate_status("WAITING").unwrap(), SubtaskStatus::Waiting);
        let (_, body) = validate_status("pending").unwrap_err();
        assert_eq!(body.0["status"][0], "\"pending\" no es una elección válida.");
    }

    #[test]
    fn test_hours_must_be_positive() {
        for bad in ["0", "0.00", "-1.5"] {
            let input = HoursInput::Text(bad.to_string());
            let (_, body) = validate_hours(&input).unwrap_err();
            assert_eq!(
                body.0["estimated_hours"][0],
                "Las horas estimadas deben ser mayores a 0.",
                "{:?} should be rejected",
                bad
            );
        }
        let ok = HoursInput::Text("0.01".to_string());
        assert_eq!(validate_hours(&ok).unwrap(), Hours::from_hundredths(1));
    }

    #[test]
    fn test_hours_precision_errors() {
        let input = HoursInput::Text("1.505".to_string());
        let (_, body) = validate_hours(&input).unwrap_err();
        assert_eq!(body.0["estimated_hours"][0], "No puede haber más de 2 decimales.");

        let input = HoursInput::Text("100".to_string());
        let (_, body) = validate_hours(&input).unwrap_err();
        assert_eq!(
            body.0["estimated_hours"][0],
            "No puede haber más de 4 dígitos en total."
        );
    }

    #[test]
    fn test_create_defaults() {
        let activity_id = Uuid::new_v4();
        let mut req = empty_request();
        req.title = Some("Leer capítulo 3".to_string());
        req.estimated_hours = Some(HoursInput::Text("1.5".to_string()));

        let new = parse_new_subtask(&req, activity_id).unwrap();
        assert_eq!(new.activity_id, activity_id);
        assert_eq!(new.status, SubtaskStatus::Pending);
        assert_eq!(new.order, 0);
        assert!(!new.is_conflicted);
        assert_eq!(new.target_date, None);
    }

    #[test]
    fn test_create_requires_estimated_hours() {
        let mut req = empty_request();
        req.title = Some("Sin horas".to_string());
        let (_, body) = parse_new_subtask(&req, Uuid::new_v4()).unwrap_err();
        assert_eq!(body.0["estimated_hours"][0], "Este campo es requerido.");
    }

    #[test]
    fn test_negative_order_rejected() {
        let (_, body) = validate_order(-1).unwrap_err();
        assert_eq!(
            body.0["order"][0],
            "Asegúrese de que este valor es mayor o igual a 0."
        );
        assert_eq!(validate_order(3).unwrap(), 3);
    }
}
