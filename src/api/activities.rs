//! Activity endpoints, including the nested per-activity subtask
//! routes.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, patch, put},
    Extension, Json, Router,
};
use chrono::{DateTime, NaiveDate, Utc};
use std::sync::Arc;
use uuid::Uuid;

use super::auth::AuthUser;
use super::error::{field_error, internal, invalid_pk_message, not_found, ApiError};
use super::routes::AppState;
use super::subtasks::{parse_new_subtask, SubtaskRequest};
use super::types::{ActivityResponse, SubtaskResponse};
use crate::model::ActivityType;
use crate::store::activities::{ActivityPatch, NewActivity};
use crate::store::StoreError;

/// Detail for the nested routes when the activity is missing or
/// belongs to someone else; the two cases are indistinguishable to
/// the caller.
const NESTED_404: &str = "Actividad no encontrada o no tienes permisos.";

/// Create activity routes, nested under `/api/activity`.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_activities).post(create_activity))
        .route("/:id", get(get_activity))
        .route("/:id", put(update_activity))
        .route("/:id", patch(update_activity))
        .route("/:id", delete(delete_activity))
        .route(
            "/:id/subtasks",
            get(list_activity_subtasks).post(create_activity_subtask),
        )
}

#[derive(Debug, serde::Deserialize)]
pub struct ActivityRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub course_id: Option<Uuid>,
    #[serde(rename = "type")]
    pub activity_type: Option<String>,
    pub event_datetime: Option<DateTime<Utc>>,
    pub deadline: Option<NaiveDate>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Validation
// ─────────────────────────────────────────────────────────────────────────────

fn validate_title(raw: Option<&str>) -> Result<String, ApiError> {
    let title = raw.unwrap_or("").trim();
    if title.is_empty() {
        return Err(field_error("title", "El título no puede estar vacío."));
    }
    if title.chars().count() > 100 {
        return Err(field_error(
            "title",
            "El título no puede exceder 100 caracteres.",
        ));
    }
    Ok(title.to_string())
}

fn validate_type(raw: &str) -> Result<ActivityType, ApiError> {
    ActivityType::parse(raw).ok_or_else(|| {
        field_error("type", &format!("\"{}\" no es una elección válida.", raw))
    })
}

/// Events cannot be scheduled in the past (checked at creation only,
/// so old activities stay editable).
fn validate_event_not_past(event: DateTime<Utc>) -> Result<(), ApiError> {
    if event < Utc::now() {
        return Err(field_error(
            "event_datetime",
            "La fecha de la actividad no puede ser anterior a la actual.",
        ));
    }
    Ok(())
}

/// The deadline (a date) may not fall before the event's calendar day.
fn validate_deadline(
    deadline: Option<NaiveDate>,
    event: Option<DateTime<Utc>>,
) -> Result<(), ApiError> {
    if let (Some(deadline), Some(event)) = (deadline, event) {
        if deadline < event.date_naive() {
            return Err(field_error(
                "deadline",
                "La fecha límite no puede ser anterior a la fecha del evento.",
            ));
        }
    }
    Ok(())
}

fn map_course_not_owned(err: StoreError, course_id: Option<Uuid>) -> ApiError {
    match (err, course_id) {
        (StoreError::CourseNotOwned, Some(id)) => {
            field_error("course_id", &invalid_pk_message(id))
        }
        (other, _) => internal(other),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────────────────────────

/// GET /api/activity - List the caller's activities, newest first.
async fn list_activities(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Vec<ActivityResponse>>, ApiError> {
    let activities = state
        .store
        .list_activities(user.id)
        .await
        .map_err(internal)?;
    Ok(Json(activities.into_iter().map(Into::into).collect()))
}

/// POST /api/activity - Create an activity.
async fn create_activity(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(req): Json<ActivityRequest>,
) -> Result<(StatusCode, Json<ActivityResponse>), ApiError> {
    let title = validate_title(req.title.as_deref())?;
    let activity_type = match req.activity_type.as_deref() {
        Some(raw) => validate_type(raw)?,
        None => ActivityType::default(),
    };
    if let Some(event) = req.event_datetime {
        validate_event_not_past(event)?;
    }
    validate_deadline(req.deadline, req.event_datetime)?;

    let detail = state
        .store
        .create_activity(
            user.id,
            NewActivity {
                title,
                description: req.description,
                course_id: req.course_id,
                activity_type,
                event_datetime: req.event_datetime,
                deadline: req.deadline,
            },
        )
        .await
        .map_err(|e| map_course_not_owned(e, req.course_id))?;

    tracing::info!("Created activity {} ({})", detail.activity.title, detail.activity.id);

    Ok((StatusCode::CREATED, Json(detail.into())))
}

/// GET /api/activity/:id
async fn get_activity(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<ActivityResponse>, ApiError> {
    state
        .store
        .activity(user.id, id)
        .await
        .map_err(internal)?
        .map(|d| Json(d.into()))
        .ok_or_else(not_found)
}

/// PUT|PATCH /api/activity/:id - Partial update. Omitted fields are
/// left unchanged; date coherence is re-checked against the merged
/// result.
async fn update_activity(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(req): Json<ActivityRequest>,
) -> Result<Json<ActivityResponse>, ApiError> {
    let current = state
        .store
        .activity(user.id, id)
        .await
        .map_err(internal)?
        .ok_or_else(not_found)?;

    let mut patch = ActivityPatch::default();
    if req.title.is_some() {
        patch.title = Some(validate_title(req.title.as_deref())?);
    }
    if let Some(raw) = req.activity_type.as_deref() {
        patch.activity_type = Some(validate_type(raw)?);
    }
    patch.description = req.description;
    patch.course_id = req.course_id;
    patch.event_datetime = req.event_datetime;
    patch.deadline = req.deadline;

    let event = req.event_datetime.or(current.activity.event_datetime);
    let deadline = req.deadline.or(current.activity.deadline);
    validate_deadline(deadline, event)?;

    state
        .store
        .update_activity(user.id, id, patch)
        .await
        .map_err(|e| map_course_not_owned(e, req.course_id))?
        .map(|d| Json(d.into()))
        .ok_or_else(not_found)
}

/// DELETE /api/activity/:id - Deletes the activity and, by cascade,
/// its subtasks.
async fn delete_activity(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let deleted = state
        .store
        .delete_activity(user.id, id)
        .await
        .map_err(internal)?;
    if !deleted {
        return Err(not_found());
    }

    tracing::info!("Deleted activity {}", id);

    Ok(StatusCode::NO_CONTENT)
}

// ─────────────────────────────────────────────────────────────────────────────
// Nested subtask routes
// ─────────────────────────────────────────────────────────────────────────────

/// GET /api/activity/:id/subtasks - Subtasks of one owned activity.
async fn list_activity_subtasks(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<SubtaskResponse>>, ApiError> {
    ensure_owned(&state, user.id, id).await?;
    let subtasks = state
        .store
        .list_subtasks(user.id, Some(id))
        .await
        .map_err(internal)?;
    Ok(Json(subtasks.into_iter().map(Into::into).collect()))
}

/// POST /api/activity/:id/subtasks - Create a subtask under one owned
/// activity. The activity comes from the path; any `activity_id` in
/// the body is ignored.
async fn create_activity_subtask(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(req): Json<SubtaskRequest>,
) -> Result<(StatusCode, Json<SubtaskResponse>), ApiError> {
    ensure_owned(&state, user.id, id).await?;
    let new = parse_new_subtask(&req, id)?;
    let detail = state
        .store
        .create_subtask(user.id, new)
        .await
        .map_err(internal)?;

    tracing::info!("Created subtask {} under activity {}", detail.subtask.id, id);

    Ok((StatusCode::CREATED, Json(detail.into())))
}

async fn ensure_owned(state: &AppState, user_id: Uuid, id: Uuid) -> Result<(), ApiError> {
    let owned = state
        .store
        .activity_exists(user_id, id)
        .await
        .map_err(internal)?;
    if !owned {
        return Err(super::error::not_found_detail(NESTED_404));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_title_trimmed_and_bounded() {
        assert_eq!(validate_title(Some("  Parcial 1  ")).unwrap(), "Parcial 1");
        let (_, body) = validate_title(Some("   ")).unwrap_err();
        assert_eq!(body.0["title"][0], "El título no puede estar vacío.");
        assert!(validate_title(None).is_err());
        assert!(validate_title(Some(&"x".repeat(101))).is_err());
    }

    #[test]
    fn test_type_choices() {
        assert_eq!(validate_type("EXAM").unwrap(), ActivityType::Exam);
        assert_eq!(validate_type("OTHER").unwrap(), ActivityType::Other);
        let (_, body) = validate_type("FIESTA").unwrap_err();
        assert_eq!(body.0["type"][0], "\"FIESTA\" no es una elección válida.");
    }

    #[test]
    fn test_past_event_rejected() {
        let past = Utc::now() - chrono::Duration::hours(1);
        let (_, body) = validate_event_not_past(past).unwrap_err();
        assert_eq!(
            body.0["event_datetime"][0],
            "La fecha de la actividad no puede ser anterior a la actual."
        );

        let future = Utc::now() + chrono::Duration::hours(1);
        assert!(validate_event_not_past(future).is_ok());
    }

    #[test]
    fn test_deadline_must_not_precede_event() {
        let event = Utc::now() + chrono::Duration::days(2);
        let before = Some(event.date_naive() - chrono::Duration::days(1));
        let (_, body) = validate_deadline(before, Some(event)).unwrap_err();
        assert_eq!(
            body.0["deadline"][0],
            "La fecha límite no puede ser anterior a la fecha del evento."
        );

        let same_day = Some(event.date_naive());
        assert!(validate_deadline(same_day, Some(event)).is_ok());
        assert!(validate_deadline(None, Some(event)).is_ok());
        assert!(validate_deadline(same_day, None).is_ok());
    }
}
