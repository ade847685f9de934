//! Subtask rows, always fetched with their activity and its course.
//!
//! `dated_subtasks` is the today-view fetch: the owner's subtasks
//! with a target date, optionally narrowed by status and course in
//! SQL so the classifier only ever sees relevant rows.

use chrono::NaiveDate;
use rusqlite::{params, OptionalExtension};
use uuid::Uuid;

use super::{read_activity, read_opt_course, read_subtask, SqliteStore, StoreError};
use crate::hours::Hours;
use crate::model::{SubtaskDetail, SubtaskStatus};

/// Subtask columns joined with activity and (nullable) course columns.
pub(super) const DETAIL_COLS: &str =
    "s.id, s.user_id, s.activity_id, s.title, s.status, s.estimated_centihours, s.target_date, \
     s.sort_order, s.is_conflicted, s.execution_note, \
     a.id, a.user_id, a.title, a.description, a.course_id, a.activity_type, a.created_at, \
     a.event_datetime, a.deadline, c.id, c.user_id, c.name";

pub(super) const DETAIL_JOINS: &str = "FROM subtasks s
     JOIN activities a ON a.id = s.activity_id
     LEFT JOIN courses c ON c.id = a.course_id";

pub(super) fn read_detail(row: &rusqlite::Row<'_>) -> rusqlite::Result<SubtaskDetail> {
    Ok(SubtaskDetail {
        subtask: read_subtask(row, 0)?,
        activity: read_activity(row, 10)?,
        course: read_opt_course(row, 19)?,
    })
}

#[derive(Debug, Clone)]
pub struct NewSubtask {
    pub activity_id: Uuid,
    pub title: String,
    pub status: SubtaskStatus,
    pub estimated_hours: Hours,
    pub target_date: Option<NaiveDate>,
    pub order: i64,
    pub is_conflicted: bool,
    pub execution_note: Option<String>,
}

/// Partial update; `None` leaves the field unchanged.
#[derive(Debug, Clone, Default)]
pub struct SubtaskPatch {
    pub activity_id: Option<Uuid>,
    pub title: Option<String>,
    pub status: Option<SubtaskStatus>,
    pub estimated_hours: Option<Hours>,
    pub target_date: Option<NaiveDate>,
    pub order: Option<i64>,
    pub is_conflicted: Option<bool>,
    pub execution_note: Option<String>,
}

impl SqliteStore {
    /// List the user's subtasks, optionally only those under one
    /// activity.
    pub async fn list_subtasks(
        &self,
        user_id: Uuid,
        activity_id: Option<Uuid>,
    ) -> Result<Vec<SubtaskDetail>, StoreError> {
        self.with_conn(move |conn| {
            let mut sql = format!(
                "SELECT {} {} WHERE s.user_id = ?1",
                DETAIL_COLS, DETAIL_JOINS
            );
            let mut values: Vec<String> = vec![user_id.to_string()];
            if let Some(activity_id) = activity_id {
                values.push(activity_id.to_string());
                sql.push_str(&format!(" AND s.activity_id = ?{}", values.len()));
            }
            sql.push_str(" ORDER BY s.sort_order ASC, s.id ASC");

            let mut stmt = conn.prepare(&sql)?;
            let subtasks = stmt
                .query_map(rusqlite::params_from_iter(values), read_detail)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(subtasks)
        })
        .await
    }

    /// Create a subtask. The activity must belong to the same user.
    pub async fn create_subtask(
        &self,
        user_id: Uuid,
        new: NewSubtask,
    ) -> Result<SubtaskDetail, StoreError> {
        self.with_conn(move |conn| {
            let owned = conn
                .query_row(
                    "SELECT 1 FROM activities WHERE id = ?1 AND user_id = ?2",
                    params![new.activity_id.to_string(), user_id.to_string()],
                    |row| row.get::<_, i64>(0),
                )
                .optional()?;
            if owned.is_none() {
                return Err(StoreError::ActivityNotOwned);
            }

            let id = Uuid::new_v4();
            conn.execute(
                "INSERT INTO subtasks (id, user_id, activity_id, title, status, estimated_centihours,
                                       target_date, sort_order, is_conflicted, execution_note)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    id.to_string(),
                    user_id.to_string(),
                    new.activity_id.to_string(),
                    new.title,
                    new.status.as_str(),
                    new.estimated_hours.hundredths(),
                    new.target_date.map(|d| d.to_string()),
                    new.order,
                    new.is_conflicted as i64,
                    new.execution_note,
                ],
            )?;

            let detail = conn.query_row(
                &format!("SELECT {} {} WHERE s.id = ?1", DETAIL_COLS, DETAIL_JOINS),
                params![id.to_string()],
                read_detail,
            )?;
            Ok(detail)
        })
        .await
    }

    pub async fn subtask(
        &self,
        user_id: Uuid,
        id: Uuid,
    ) -> Result<Option<SubtaskDetail>, StoreError> {
        self.with_conn(move |conn| {
            let detail = conn
                .query_row(
                    &format!(
                        "SELECT {} {} WHERE s.id = ?1 AND s.user_id = ?2",
                        DETAIL_COLS, DETAIL_JOINS
                    ),
                    params![id.to_string(), user_id.to_string()],
                    read_detail,
                )
                .optional()?;
            Ok(detail)
        })
        .await
    }

    /// Apply a patch. Returns `None` if the subtask does not exist
    /// for this user; moving to another activity requires owning it.
    pub async fn update_subtask(
        &self,
        user_id: Uuid,
        id: Uuid,
        patch: SubtaskPatch,
    ) -> Result<Option<SubtaskDetail>, StoreError> {
        self.with_conn(move |conn| {
            let exists = conn
                .query_row(
                    "SELECT 1 FROM subtasks WHERE id = ?1 AND user_id = ?2",
                    params![id.to_string(), user_id.to_string()],
                    |row| row.get::<_, i64>(0),
                )
                .optional()?;
            if exists.is_none() {
                return Ok(None);
            }

            if let Some(activity_id) = patch.activity_id {
                let owned = conn
                    .query_row(
                        "SELECT 1 FROM activities WHERE id = ?1 AND user_id = ?2",
                        params![activity_id.to_string(), user_id.to_string()],
                        |row| row.get::<_, i64>(0),
                    )
                    .optional()?;
                if owned.is_none() {
                    return Err(StoreError::ActivityNotOwned);
                }
                conn.execute(
                    "UPDATE subtasks SET activity_id = ?2 WHERE id = ?1",
                    params![id.to_string(), activity_id.to_string()],
                )?;
            }
            if let Some(title) = patch.title {
                conn.execute(
                    "UPDATE subtasks SET title = ?2 WHERE id = ?1",
                    params![id.to_string(), title],
                )?;
            }
            if let Some(status) = patch.status {
                conn.execute(
                    "UPDATE subtasks SET status = ?2 WHERE id = ?1",
                    params![id.to_string(), status.as_str()],
                )?;
            }
            if let Some(hours) = patch.estimated_hours {
                conn.execute(
                    "UPDATE subtasks SET estimated_centihours = ?2 WHERE id = ?1",
                    params![id.to_string(), hours.hundredths()],
                )?;
            }
            if let Some(target_date) = patch.target_date {
                conn.execute(
                    "UPDATE subtasks SET target_date = ?2 WHERE id = ?1",
                    params![id.to_string(), target_date.to_string()],
                )?;
            }
            if let Some(order) = patch.order {
                conn.execute(
                    "UPDATE subtasks SET sort_order = ?2 WHERE id = ?1",
                    params![id.to_string(), order],
                )?;
            }
            if let Some(is_conflicted) = patch.is_conflicted {
                conn.execute(
                    "UPDATE subtasks SET is_conflicted = ?2 WHERE id = ?1",
                    params![id.to_string(), is_conflicted as i64],
                )?;
            }
            if let Some(execution_note) = patch.execution_note {
                conn.execute(
                    "UPDATE subtasks SET execution_note = ?2 WHERE id = ?1",
                    params![id.to_string(), execution_note],
                )?;
            }

            let detail = conn.query_row(
                &format!("SELECT {} {} WHERE s.id = ?1", DETAIL_COLS, DETAIL_JOINS),
                params![id.to_string()],
                read_detail,
            )?;
            Ok(Some(detail))
        })
        .await
    }

    pub async fn delete_subtask(&self, user_id: Uuid, id: Uuid) -> Result<bool, StoreError> {
        self.with_conn(move |conn| {
            let deleted = conn.execute(
                "DELETE FROM subtasks WHERE id = ?1 AND user_id = ?2",
                params![id.to_string(), user_id.to_string()],
            )?;
            Ok(deleted > 0)
        })
        .await
    }

    /// Fetch the user's dated subtasks for the today view. Undated
    /// rows never leave the database; status and course narrow the
    /// set when present. Rows come back date-ascending so later
    /// stable sorts keep a deterministic base order.
    pub async fn dated_subtasks(
        &self,
        user_id: Uuid,
        status: Option<SubtaskStatus>,
        course: Option<Uuid>,
    ) -> Result<Vec<SubtaskDetail>, StoreError> {
        self.with_conn(move |conn| {
            let mut sql = format!(
                "SELECT {} {} WHERE s.user_id = ?1 AND s.target_date IS NOT NULL",
                DETAIL_COLS, DETAIL_JOINS
            );
            let mut values: Vec<String> = vec![user_id.to_string()];
            if let Some(status) = status {
                values.push(status.as_str().to_string());
                sql.push_str(&format!(" AND s.status = ?{}", values.len()));
            }
            if let Some(course_id) = course {
                values.push(course_id.to_string());
                sql.push_str(&format!(" AND a.course_id = ?{}", values.len()));
            }
            sql.push_str(" ORDER BY s.target_date ASC, s.sort_order ASC, s.id ASC");

            let mut stmt = conn.prepare(&sql)?;
            let subtasks = stmt
                .query_map(rusqlite::params_from_iter(values), read_detail)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(subtasks)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::testutil::{open_store, seed_activity, seed_subtask, seed_user};

    #[tokio::test]
    async fn test_create_subtask_requires_owned_activity() {
        let (_dir, store) = open_store().await;
        let ana = seed_user(&store, "ana@example.com").await;
        let luis = seed_user(&store, "luis@example.com").await;
        let activity = seed_activity(&store, luis.id, "Ajena").await;

        let err = store
            .create_subtask(
                ana.id,
                NewSubtask {
                    activity_id: activity.id,
                    title: "Intento".to_string(),
                    status: SubtaskStatus::Pending,
                    estimated_hours: Hours::from_hundredths(100),
                    target_date: None,
                    order: 0,
                    is_conflicted: false,
                    execution_note: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::ActivityNotOwned));
    }

    #[tokio::test]
    async fn test_subtask_round_trip_with_nested_activity() {
        let (_dir, store) = open_store().await;
        let user = seed_user(&store, "ana@example.com").await;
        let course = store.create_course(user.id, "Física".to_string()).await.unwrap();
        let activity = store
            .create_activity(
                user.id,
                crate::store::activities::NewActivity {
                    title: "Parcial".to_string(),
                    description: None,
                    course_id: Some(course.id),
                    activity_type: crate::model::ActivityType::Exam,
                    event_datetime: None,
                    deadline: None,
                },
            )
            .await
            .unwrap()
            .activity;

        let created =
            seed_subtask(&store, user.id, activity.id, "Repaso", Some("2026-03-01"), "1.50").await;

        let fetched = store.subtask(user.id, created.id).await.unwrap().unwrap();
        assert_eq!(fetched.subtask, created);
        assert_eq!(fetched.activity.id, activity.id);
        assert_eq!(fetched.course.as_ref().map(|c| c.name.as_str()), Some("Física"));
        assert_eq!(fetched.subtask.estimated_hours.to_string(), "1.50");
    }

    #[tokio::test]
    async fn test_list_subtasks_scoped_by_activity() {
        let (_dir, store) = open_store().await;
        let user = seed_user(&store, "ana@example.com").await;
        let a1 = seed_activity(&store, user.id, "Uno").await;
        let a2 = seed_activity(&store, user.id, "Dos").await;
        seed_subtask(&store, user.id, a1.id, "s1", None, "1.00").await;
        seed_subtask(&store, user.id, a1.id, "s2", None, "1.00").await;
        seed_subtask(&store, user.id, a2.id, "s3", None, "1.00").await;

        assert_eq!(store.list_subtasks(user.id, None).await.unwrap().len(), 3);
        assert_eq!(
            store.list_subtasks(user.id, Some(a1.id)).await.unwrap().len(),
            2
        );
        assert_eq!(
            store.list_subtasks(user.id, Some(a2.id)).await.unwrap().len(),
            1
        );
    }

    #[tokio::test]
    async fn test_update_subtask_partial() {
        let (_dir, store) = open_store().await;
        let user = seed_user(&store, "ana@example.com").await;
        let activity = seed_activity(&store, user.id, "Tarea").await;
        let subtask =
            seed_subtask(&store, user.id, activity.id, "Fase", Some("2026-03-01"), "2.00").await;

        let updated = store
            .update_subtask(
                user.id,
                subtask.id,
                SubtaskPatch {
                    status: Some(SubtaskStatus::Done),
                    execution_note: Some("Terminada antes de tiempo".to_string()),
                    ..SubtaskPatch::default()
                },
            )
            .await
            .unwrap()
            .unwrap();

        assert_eq!(updated.subtask.status, SubtaskStatus::Done);
        assert_eq!(
            updated.subtask.execution_note.as_deref(),
            Some("Terminada antes de tiempo")
        );
        assert_eq!(updated.subtask.title, "Fase");
        assert_eq!(updated.subtask.target_date, subtask.target_date);
    }

    #[tokio::test]
    async fn test_dated_subtasks_excludes_undated() {
        let (_dir, store) = open_store().await;
        let user = seed_user(&store, "ana@example.com").await;
        let activity = seed_activity(&store, user.id, "Tarea").await;
        seed_subtask(&store, user.id, activity.id, "dated", Some("2026-03-01"), "1.00").await;
        seed_subtask(&store, user.id, activity.id, "undated", None, "1.00").await;

        let rows = store.dated_subtasks(user.id, None, None).await.unwrap();
        let titles: Vec<&str> = rows.iter().map(|r| r.subtask.title.as_str()).collect();
        assert_eq!(titles, vec!["dated"]);
    }

    #[tokio::test]
    async fn test_dated_subtasks_status_and_course_pushdown() {
        let (_dir, store) = open_store().await;
        let user = seed_user(&store, "ana@example.com").await;
        let course = store.create_course(user.id, "Física".to_string()).await.unwrap();
        let with_course = store
            .create_activity(
                user.id,
                crate::store::activities::NewActivity {
                    title: "Con curso".to_string(),
                    description: None,
                    course_id: Some(course.id),
                    activity_type: crate::model::ActivityType::Other,
                    event_datetime: None,
                    deadline: None,
                },
            )
            .await
            .unwrap()
            .activity;
        let without_course = seed_activity(&store, user.id, "Sin curso").await;

        let pending =
            seed_subtask(&store, user.id, with_course.id, "p", Some("2026-03-01"), "1.00").await;
        seed_subtask(&store, user.id, without_course.id, "q", Some("2026-03-02"), "1.00").await;
        store
            .update_subtask(
                user.id,
                pending.id,
                SubtaskPatch {
                    status: Some(SubtaskStatus::Waiting),
                    ..SubtaskPatch::default()
                },
            )
            .await
            .unwrap();

        let waiting = store
            .dated_subtasks(user.id, Some(SubtaskStatus::Waiting), None)
            .await
            .unwrap();
        assert_eq!(waiting.len(), 1);
        assert_eq!(waiting[0].subtask.title, "p");

        let by_course = store
            .dated_subtasks(user.id, None, Some(course.id))
            .await
            .unwrap();
        assert_eq!(by_course.len(), 1);
        assert_eq!(by_course[0].subtask.title, "p");

        let both = store
            .dated_subtasks(user.id, Some(SubtaskStatus::Pending), Some(course.id))
            .await
            .unwrap();
        assert!(both.is_empty());
    }

    #[tokio::test]
    async fn test_dated_subtasks_ordered_by_date() {
        let (_dir, store) = open_store().await;
        let user = seed_user(&store, "ana@example.com").await;
        let activity = seed_activity(&store, user.id, "Tarea").await;
        seed_subtask(&store, user.id, activity.id, "later", Some("2026-03-05"), "1.00").await;
        seed_subtask(&store, user.id, activity.id, "sooner", Some("2026-03-01"), "1.00").await;

        let rows = store.dated_subtasks(user.id, None, None).await.unwrap();
        let titles: Vec<&str> = rows.iter().map(|r| r.subtask.title.as_str()).collect();
        assert_eq!(titles, vec!["sooner", "later"]);
    }
}
