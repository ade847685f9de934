//! Domain entities shared by the store, the API handlers and the
//! today view.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::hours::Hours;

/// Lifecycle state of a subtask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubtaskStatus {
    Pending,
    Done,
    Waiting,
    Postponed,
}

impl SubtaskStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            SubtaskStatus::Pending => "PENDING",
            SubtaskStatus::Done => "DONE",
            SubtaskStatus::Waiting => "WAITING",
            SubtaskStatus::Postponed => "POSTPONED",
        }
    }

    pub fn parse(s: &str) -> Option<SubtaskStatus> {
        match s {
            "PENDING" => Some(SubtaskStatus::Pending),
            "DONE" => Some(SubtaskStatus::Done),
            "WAITING" => Some(SubtaskStatus::Waiting),
            "POSTPONED" => Some(SubtaskStatus::Postponed),
            _ => None,
        }
    }
}

/// Kind of academic activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActivityType {
    Exam,
    Quiz,
    Workshop,
    Project,
    Other,
}

impl ActivityType {
    pub fn as_str(self) -> &'static str {
        match self {
            ActivityType::Exam => "EXAM",
            ActivityType::Quiz => "QUIZ",
            ActivityType::Workshop => "WORKSHOP",
            ActivityType::Project => "PROJECT",
            ActivityType::Other => "OTHER",
        }
    }

    pub fn parse(s: &str) -> Option<ActivityType> {
        match s {
            "EXAM" => Some(ActivityType::Exam),
            "QUIZ" => Some(ActivityType::Quiz),
            "WORKSHOP" => Some(ActivityType::Workshop),
            "PROJECT" => Some(ActivityType::Project),
            "OTHER" => Some(ActivityType::Other),
            _ => None,
        }
    }
}

impl Default for ActivityType {
    fn default() -> Self {
        ActivityType::Other
    }
}

/// A registered account. `password_hash` never leaves the store/auth
/// layers; API responses are shaped separately.
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub password_hash: String,
    pub daily_hours_limit: Hours,
    pub is_active: bool,
    pub date_joined: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Course {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Activity {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub course_id: Option<Uuid>,
    pub activity_type: ActivityType,
    pub created_at: DateTime<Utc>,
    pub event_datetime: Option<DateTime<Utc>>,
    pub deadline: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Subtask {
    pub id: Uuid,
    pub user_id: Uuid,
    pub activity_id: Uuid,
    pub title: String,
    pub status: SubtaskStatus,
    pub estimated_hours: Hours,
    pub target_date: Option<NaiveDate>,
    pub order: i64,
    pub is_conflicted: bool,
    pub execution_note: Option<String>,
}

/// Audit entry for a subtask target-date change.
#[derive(Debug, Clone, PartialEq)]
pub struct ReprogrammingLog {
    pub id: Uuid,
    pub subtask_id: Uuid,
    pub previous_date: NaiveDate,
    pub new_date: NaiveDate,
    pub reason: String,
    pub created_at: DateTime<Utc>,
}

/// An activity with its course resolved, as every activity response
/// nests the course.
#[derive(Debug, Clone, PartialEq)]
pub struct ActivityDetail {
    pub activity: Activity,
    pub course: Option<Course>,
}

/// A subtask joined with its activity and that activity's course.
/// This is the row shape the today view works over.
#[derive(Debug, Clone, PartialEq)]
pub struct SubtaskDetail {
    pub subtask: Subtask,
    pub activity: Activity,
    pub course: Option<Course>,
}

/// A reprogramming-log entry with its subtask resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct ReprogrammingLogDetail {
    pub log: ReprogrammingLog,
    pub subtask: SubtaskDetail,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trip() {
        for status in [
            SubtaskStatus::Pending,
            SubtaskStatus::Done,
            SubtaskStatus::Waiting,
            SubtaskStatus::Postponed,
        ] {
            assert_eq!(SubtaskStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(SubtaskStatus::parse("pending"), None);
        assert_eq!(SubtaskStatus::parse(""), None);
    }

    #[test]
    fn test_activity_type_round_trip() {
        for kind in [
            ActivityType::Exam,
            ActivityType::Quiz,
            ActivityType::Workshop,
            ActivityType::Project,
            ActivityType::Other,
        ] {
            assert_eq!(ActivityType::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(ActivityType::parse("LAB"), None);
        assert_eq!(ActivityType::default(), ActivityType::Other);
    }

    #[test]
    fn test_status_serializes_as_wire_value() {
        let json = serde_json::to_string(&SubtaskStatus::Pending).unwrap();
        assert_eq!(json, "\"PENDING\"");
        let parsed: SubtaskStatus = serde_json::from_str("\"POSTPONED\"").unwrap();
        assert_eq!(parsed, SubtaskStatus::Postponed);
    }
}
