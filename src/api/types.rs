//! API response types.
//!
//! Every resource is returned with its relations expanded the way the
//! frontend consumes them: activities carry their course, subtasks
//! carry their activity, logs carry the full subtask.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::hours::Hours;
use crate::model::{
    ActivityDetail, ActivityType, Course, ReprogrammingLogDetail, SubtaskDetail, SubtaskStatus,
    User,
};

/// Health check response.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub dev_mode: bool,
    pub auth_required: bool,
}

/// Token pair returned by login.
#[derive(Debug, Clone, Serialize)]
pub struct TokenPairResponse {
    pub access: String,
    pub refresh: String,
}

/// Fresh access token returned by the refresh endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct AccessTokenResponse {
    pub access: String,
}

/// Account fields returned to the owner. Never includes the password
/// hash.
#[derive(Debug, Clone, Serialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    /// Two-decimal string, e.g. `"6.00"`
    pub daily_hours_limit: Hours,
    pub is_active: bool,
    pub date_joined: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            name: user.name,
            daily_hours_limit: user.daily_hours_limit,
            is_active: user.is_active,
            date_joined: user.date_joined,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CourseResponse {
    pub id: Uuid,
    pub name: String,
}

impl From<Course> for CourseResponse {
    fn from(course: Course) -> Self {
        Self {
            id: course.id,
            name: course.name,
        }
    }
}

/// Activity with its course expanded.
#[derive(Debug, Clone, Serialize)]
pub struct ActivityResponse {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub course: Option<CourseResponse>,
    /// Owner id
    pub user: Uuid,
    pub created_at: DateTime<Utc>,
    pub event_datetime: Option<DateTime<Utc>>,
    pub deadline: Option<NaiveDate>,
    #[serde(rename = "type")]
    pub activity_type: ActivityType,
}

impl From<ActivityDetail> for ActivityResponse {
    fn from(detail: ActivityDetail) -> Self {
        Self {
            id: detail.activity.id,
            title: detail.activity.title,
            description: detail.activity.description,
            course: detail.course.map(Into::into),
            user: detail.activity.user_id,
            created_at: detail.activity.created_at,
            event_datetime: detail.activity.event_datetime,
            deadline: detail.activity.deadline,
            activity_type: detail.activity.activity_type,
        }
    }
}

/// Subtask with its activity (and that activity's course) expanded.
#[derive(Debug, Clone, Serialize)]
pub struct SubtaskResponse {
    pub id: Uuid,
    pub title: String,
    pub activity: ActivityResponse,
    /// Owner id
    pub user: Uuid,
    pub status: SubtaskStatus,
    /// Two-decimal string, e.g. `"1.50"`
    pub estimated_hours: Hours,
    pub target_date: Option<NaiveDate>,
    pub order: i64,
    pub is_conflicted: bool,
    pub execution_note: Option<String>,
}

impl From<SubtaskDetail> for SubtaskResponse {
    fn from(detail: SubtaskDetail) -> Self {
        let activity = ActivityResponse::from(ActivityDetail {
            activity: detail.activity,
            course: detail.course,
        });
        Self {
            id: detail.subtask.id,
            title: detail.subtask.title,
            activity,
            user: detail.subtask.user_id,
            status: detail.subtask.status,
            estimated_hours: detail.subtask.estimated_hours,
            target_date: detail.subtask.target_date,
            order: detail.subtask.order,
            is_conflicted: detail.subtask.is_conflicted,
            execution_note: detail.subtask.execution_note,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ReprogrammingLogResponse {
    pub id: Uuid,
    pub subtask: SubtaskResponse,
    pub previous_date: NaiveDate,
    pub new_date: NaiveDate,
    pub reason: String,
    pub created_at: DateTime<Utc>,
}

impl From<ReprogrammingLogDetail> for ReprogrammingLogResponse {
    fn from(detail: ReprogrammingLogDetail) -> Self {
        Self {
            id: detail.log.id,
            subtask: detail.subtask.into(),
            previous_date: detail.log.previous_date,
            new_date: detail.log.new_date,
            reason: detail.log.reason,
            created_at: detail.log.created_at,
        }
    }
}
