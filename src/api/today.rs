//! The today view: the caller's dated subtasks grouped into overdue /
//! due-today / upcoming buckets with a deterministic order.
//!
//! Pipeline per request: validate the query parameters, short-circuit
//! on an unknown course, fetch the pre-filtered rows, classify, sort,
//! assemble the fixed payload. The computation is pure and never
//! mutates stored records.

use axum::{
    extract::{Query, State},
    Extension, Json,
};
use chrono::{DateTime, Local, NaiveDate, Utc};
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use super::auth::AuthUser;
use super::error::{internal, query_error, ApiError};
use super::routes::AppState;
use super::types::CourseResponse;
use crate::hours::Hours;
use crate::model::{ActivityType, SubtaskDetail, SubtaskStatus};
use crate::today::{classify, sort_buckets, TodayBuckets, TodayFilters, TodayQuery};

/// Human-readable description of the bucket ordering, returned with
/// every payload so the frontend can label the lists.
pub const ORDERING_RULE: &str = "vencidas y proximas: fecha objetivo y horas estimadas ascendentes; para_hoy: horas estimadas ascendentes";

// ─────────────────────────────────────────────────────────────────────────────
// Response types
// ─────────────────────────────────────────────────────────────────────────────

/// The fixed payload shape. All fields are always present, empty
/// buckets included.
#[derive(Debug, Serialize)]
pub struct TodayResponse {
    pub vencidas: Vec<TodayItem>,
    pub para_hoy: Vec<TodayItem>,
    pub proximas: Vec<TodayItem>,
    pub regla_ordenamiento: &'static str,
    pub fecha_referencia: NaiveDate,
    pub total_vencidas: usize,
    pub total_para_hoy: usize,
    pub total_proximas: usize,
}

impl TodayResponse {
    fn new(buckets: TodayBuckets, reference: NaiveDate) -> Self {
        let vencidas: Vec<TodayItem> = buckets.overdue.into_iter().map(Into::into).collect();
        let para_hoy: Vec<TodayItem> = buckets.due_today.into_iter().map(Into::into).collect();
        let proximas: Vec<TodayItem> = buckets.upcoming.into_iter().map(Into::into).collect();
        Self {
            total_vencidas: vencidas.len(),
            total_para_hoy: para_hoy.len(),
            total_proximas: proximas.len(),
            vencidas,
            para_hoy,
            proximas,
            regla_ordenamiento: ORDERING_RULE,
            fecha_referencia: reference,
        }
    }

    fn empty(reference: NaiveDate) -> Self {
        Self::new(TodayBuckets::default(), reference)
    }
}

/// One subtask as listed in a bucket.
#[derive(Debug, Serialize)]
pub struct TodayItem {
    pub id: Uuid,
    pub title: String,
    pub status: SubtaskStatus,
    /// Two-decimal string
    pub estimated_hours: Hours,
    pub target_date: Option<NaiveDate>,
    pub is_conflicted: bool,
    pub execution_note: Option<String>,
    pub activity: TodayActivity,
}

/// Activity context carried by each listed subtask.
#[derive(Debug, Serialize)]
pub struct TodayActivity {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub course: Option<CourseResponse>,
    #[serde(rename = "type")]
    pub activity_type: ActivityType,
    pub created_at: DateTime<Utc>,
    pub event_datetime: Option<DateTime<Utc>>,
    pub deadline: Option<NaiveDate>,
}

impl From<SubtaskDetail> for TodayItem {
    fn from(detail: SubtaskDetail) -> Self {
        Self {
            id: detail.subtask.id,
            title: detail.subtask.title,
            status: detail.subtask.status,
            estimated_hours: detail.subtask.estimated_hours,
            target_date: detail.subtask.target_date,
            is_conflicted: detail.subtask.is_conflicted,
            execution_note: detail.subtask.execution_note,
            activity: TodayActivity {
                id: detail.activity.id,
                title: detail.activity.title,
                description: detail.activity.description,
                course: detail.course.map(Into::into),
                activity_type: detail.activity.activity_type,
                created_at: detail.activity.created_at,
                event_datetime: detail.activity.event_datetime,
                deadline: detail.activity.deadline,
            },
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Handler
// ─────────────────────────────────────────────────────────────────────────────

/// GET /api/subtask/today - Bucket the caller's dated subtasks by
/// urgency. A filter naming a course the caller does not own yields
/// three empty buckets, not an error.
pub async fn today_view(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<TodayQuery>,
) -> Result<Json<TodayResponse>, ApiError> {
    let filters =
        TodayFilters::from_query(&query).map_err(|e| query_error(&e.to_string()))?;
    let reference = Local::now().date_naive();

    if let Some(course_id) = filters.course {
        let known = state
            .store
            .course_exists(user.id, course_id)
            .await
            .map_err(internal)?;
        if !known {
            return Ok(Json(TodayResponse::empty(reference)));
        }
    }

    let rows = state
        .store
        .dated_subtasks(user.id, filters.status, filters.course)
        .await
        .map_err(internal)?;

    let mut buckets = classify(rows, reference, filters.days_ahead);
    sort_buckets(&mut buckets);

    Ok(Json(TodayResponse::new(buckets, reference)))
}
