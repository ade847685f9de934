//! Activity rows, always fetched with their course resolved.

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, OptionalExtension};
use uuid::Uuid;

use super::{read_activity, read_opt_course, SqliteStore, StoreError};
use crate::model::{ActivityDetail, ActivityType};

/// Activity columns joined with the (nullable) course columns.
const DETAIL_COLS: &str = "a.id, a.user_id, a.title, a.description, a.course_id, a.activity_type, \
                           a.created_at, a.event_datetime, a.deadline, c.id, c.user_id, c.name";

fn read_detail(row: &rusqlite::Row<'_>) -> rusqlite::Result<ActivityDetail> {
    Ok(ActivityDetail {
        activity: read_activity(row, 0)?,
        course: read_opt_course(row, 9)?,
    })
}

#[derive(Debug, Clone)]
pub struct NewActivity {
    pub title: String,
    pub description: Option<String>,
    pub course_id: Option<Uuid>,
    pub activity_type: ActivityType,
    pub event_datetime: Option<DateTime<Utc>>,
    pub deadline: Option<NaiveDate>,
}

/// Partial update; `None` leaves the field unchanged.
#[derive(Debug, Clone, Default)]
pub struct ActivityPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub course_id: Option<Uuid>,
    pub activity_type: Option<ActivityType>,
    pub event_datetime: Option<DateTime<Utc>>,
    pub deadline: Option<NaiveDate>,
}

impl SqliteStore {
    pub async fn list_activities(&self, user_id: Uuid) -> Result<Vec<ActivityDetail>, StoreError> {
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM activities a
                 LEFT JOIN courses c ON c.id = a.course_id
                 WHERE a.user_id = ?1
                 ORDER BY a.created_at DESC, a.id ASC",
                DETAIL_COLS
            ))?;
            let activities = stmt
                .query_map(params![user_id.to_string()], read_detail)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(activities)
        })
        .await
    }

    /// Create an activity. A referenced course must belong to the
    /// same user.
    pub async fn create_activity(
        &self,
        user_id: Uuid,
        new: NewActivity,
    ) -> Result<ActivityDetail, StoreError> {
        self.with_conn(move |conn| {
            if let Some(course_id) = new.course_id {
                let owned = conn
                    .query_row(
                        "SELECT 1 FROM courses WHERE id = ?1 AND user_id = ?2",
                        params![course_id.to_string(), user_id.to_string()],
                        |row| row.get::<_, i64>(0),
                    )
                    .optional()?;
                if owned.is_none() {
                    return Err(StoreError::CourseNotOwned);
                }
            }

            let id = Uuid::new_v4();
            let created_at = Utc::now();
            conn.execute(
                "INSERT INTO activities (id, user_id, title, description, course_id, activity_type,
                                         created_at, event_datetime, deadline)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    id.to_string(),
                    user_id.to_string(),
                    new.title,
                    new.description,
                    new.course_id.map(|c| c.to_string()),
                    new.activity_type.as_str(),
                    created_at.to_rfc3339(),
                    new.event_datetime.map(|dt| dt.to_rfc3339()),
                    new.deadline.map(|d| d.to_string()),
                ],
            )?;

            let detail = conn.query_row(
                &format!(
                    "SELECT {} FROM activities a
                     LEFT JOIN courses c ON c.id = a.course_id
                     WHERE a.id = ?1",
                    DETAIL_COLS
                ),
                params![id.to_string()],
                read_detail,
            )?;
            Ok(detail)
        })
        .await
    }

    pub async fn activity(
        &self,
        user_id: Uuid,
        id: Uuid,
    ) -> Result<Option<ActivityDetail>, StoreError> {
        self.with_conn(move |conn| {
            let detail = conn
                .query_row(
                    &format!(
                        "SELECT {} FROM activities a
                         LEFT JOIN courses c ON c.id = a.course_id
                         WHERE a.id = ?1 AND a.user_id = ?2",
                        DETAIL_COLS
                    ),
                    params![id.to_string(), user_id.to_string()],
                    read_detail,
                )
                .optional()?;
            Ok(detail)
        })
        .await
    }

    pub async fn activity_exists(&self, user_id: Uuid, id: Uuid) -> Result<bool, StoreError> {
        self.with_conn(move |conn| {
            let found = conn
                .query_row(
                    "SELECT 1 FROM activities WHERE id = ?1 AND user_id = ?2",
                    params![id.to_string(), user_id.to_string()],
                    |row| row.get::<_, i64>(0),
                )
                .optional()?;
            Ok(found.is_some())
        })
        .await
    }

    /// Apply a patch. Returns `None` if the activity does not exist
    /// for this user; a new course reference must be owned too.
    pub async fn update_activity(
        &self,
        user_id: Uuid,
        id: Uuid,
        patch: ActivityPatch,
    ) -> Result<Option<ActivityDetail>, StoreError> {
        self.with_conn(move |conn| {
            let exists = conn
                .query_row(
                    "SELECT 1 FROM activities WHERE id = ?1 AND user_id = ?2",
                    params![id.to_string(), user_id.to_string()],
                    |row| row.get::<_, i64>(0),
                )
                .optional()?;
            if exists.is_none() {
                return Ok(None);
            }

            if let Some(course_id) = patch.course_id {
                let owned = conn
                    .query_row(
                        "SELECT 1 FROM courses WHERE id = ?1 AND user_id = ?2",
                        params![course_id.to_string(), user_id.to_string()],
                        |row| row.get::<_, i64>(0),
                    )
                    .optional()?;
                if owned.is_none() {
                    return Err(StoreError::CourseNotOwned);
                }
            }

            if let Some(title) = patch.title {
                conn.execute(
                    "UPDATE activities SET title = ?2 WHERE id = ?1",
                    params![id.to_string(), title],
                )?;
            }
            if let Some(description) = patch.description {
                conn.execute(
                    "UPDATE activities SET description = ?2 WHERE id = ?1",
                    params![id.to_string(), description],
                )?;
            }
            if let Some(course_id) = patch.course_id {
                conn.execute(
                    "UPDATE activities SET course_id = ?2 WHERE id = ?1",
                    params![id.to_string(), course_id.to_string()],
                )?;
            }
            if let Some(activity_type) = patch.activity_type {
                conn.execute(
                    "UPDATE activities SET activity_type = ?2 WHERE id = ?1",
                    params![id.to_string(), activity_type.as_str()],
                )?;
            }
            if let Some(event_datetime) = patch.event_datetime {
                conn.execute(
                    "UPDATE activities SET event_datetime = ?2 WHERE id = ?1",
                    params![id.to_string(), event_datetime.to_rfc3339()],
                )?;
            }
            if let Some(deadline) = patch.deadline {
                conn.execute(
                    "UPDATE activities SET deadline = ?2 WHERE id = ?1",
                    params![id.to_string(), deadline.to_string()],
                )?;
            }

            let detail = conn.query_row(
                &format!(
                    "SELECT {} FROM activities a
                     LEFT JOIN courses c ON c.id = a.course_id
                     WHERE a.id = ?1",
                    DETAIL_COLS
                ),
                params![id.to_string()],
                read_detail,
            )?;
            Ok(Some(detail))
        })
        .await
    }

    /// Delete an activity; its subtasks (and their logs) cascade.
    pub async fn delete_activity(&self, user_id: Uuid, id: Uuid) -> Result<bool, StoreError> {
        self.with_conn(move |conn| {
            let deleted = conn.execute(
                "DELETE FROM activities WHERE id = ?1 AND user_id = ?2",
                params![id.to_string(), user_id.to_string()],
            )?;
            Ok(deleted > 0)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::testutil::{open_store, seed_activity, seed_subtask, seed_user};

    #[tokio::test]
    async fn test_create_activity_with_course() {
        let (_dir, store) = open_store().await;
        let user = seed_user(&store, "ana@example.com").await;
        let course = store.create_course(user.id, "Física".to_string()).await.unwrap();

        let detail = store
            .create_activity(
                user.id,
                NewActivity {
                    title: "Parcial 1".to_string(),
                    description: Some("Temas 1-3".to_string()),
                    course_id: Some(course.id),
                    activity_type: ActivityType::Exam,
                    event_datetime: None,
                    deadline: None,
                },
            )
            .await
            .unwrap();

        assert_eq!(detail.activity.title, "Parcial 1");
        assert_eq!(detail.activity.activity_type, ActivityType::Exam);
        assert_eq!(detail.course.as_ref().map(|c| c.name.as_str()), Some("Física"));
    }

    #[tokio::test]
    async fn test_create_activity_rejects_foreign_course() {
        let (_dir, store) = open_store().await;
        let ana = seed_user(&store, "ana@example.com").await;
        let luis = seed_user(&store, "luis@example.com").await;
        let course = store.create_course(luis.id, "Física".to_string()).await.unwrap();

        let err = store
            .create_activity(
                ana.id,
                NewActivity {
                    title: "Parcial".to_string(),
                    description: None,
                    course_id: Some(course.id),
                    activity_type: ActivityType::Other,
                    event_datetime: None,
                    deadline: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::CourseNotOwned));
    }

    #[tokio::test]
    async fn test_deleting_course_nulls_activity_reference() {
        let (_dir, store) = open_store().await;
        let user = seed_user(&store, "ana@example.com").await;
        let course = store.create_course(user.id, "Física".to_string()).await.unwrap();

        let detail = store
            .create_activity(
                user.id,
                NewActivity {
                    title: "Parcial".to_string(),
                    description: None,
                    course_id: Some(course.id),
                    activity_type: ActivityType::Exam,
                    event_datetime: None,
                    deadline: None,
                },
            )
            .await
            .unwrap();

        assert!(store.delete_course(user.id, course.id).await.unwrap());

        let after = store
            .activity(user.id, detail.activity.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(after.activity.course_id, None);
        assert!(after.course.is_none());
    }

    #[tokio::test]
    async fn test_deleting_activity_cascades_subtasks() {
        let (_dir, store) = open_store().await;
        let user = seed_user(&store, "ana@example.com").await;
        let activity = seed_activity(&store, user.id, "Proyecto").await;
        let subtask =
            seed_subtask(&store, user.id, activity.id, "Fase 1", Some("2026-03-01"), "2.00").await;

        assert!(store.delete_activity(user.id, activity.id).await.unwrap());
        assert!(store.subtask(user.id, subtask.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_activity_partial() {
        let (_dir, store) = open_store().await;
        let user = seed_user(&store, "ana@example.com").await;
        let activity = seed_activity(&store, user.id, "Tarea").await;

        let updated = store
            .update_activity(
                user.id,
                activity.id,
                ActivityPatch {
                    title: Some("Tarea renombrada".to_string()),
                    activity_type: Some(ActivityType::Project),
                    ..ActivityPatch::default()
                },
            )
            .await
            .unwrap()
            .unwrap();

        assert_eq!(updated.activity.title, "Tarea renombrada");
        assert_eq!(updated.activity.activity_type, ActivityType::Project);
        assert_eq!(updated.activity.created_at, activity.created_at);
    }

    #[tokio::test]
    async fn test_activities_are_user_scoped() {
        let (_dir, store) = open_store().await;
        let ana = seed_user(&store, "ana@example.com").await;
        let luis = seed_user(&store, "luis@example.com").await;
        let activity = seed_activity(&store, ana.id, "Privada").await;

        assert!(store.activity(luis.id, activity.id).await.unwrap().is_none());
        assert!(!store.activity_exists(luis.id, activity.id).await.unwrap());
        assert!(store.list_activities(luis.id).await.unwrap().is_empty());
    }
}
