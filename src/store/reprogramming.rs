//! Reprogramming log rows: an append-only record of target-date
//! changes, fetched with the full subtask detail they refer to.
//! Ownership is derived from the subtask; logs have no user column.

use chrono::{NaiveDate, Utc};
use rusqlite::{params, OptionalExtension};
use uuid::Uuid;

use super::{read_activity, read_log, read_opt_course, read_subtask, SqliteStore, StoreError};
use crate::model::{ReprogrammingLogDetail, SubtaskDetail};

const LOG_COLS: &str = "l.id, l.subtask_id, l.previous_date, l.new_date, l.reason, l.created_at";

const LOG_JOINS: &str = "FROM reprogramming_logs l
     JOIN subtasks s ON s.id = l.subtask_id
     JOIN activities a ON a.id = s.activity_id
     LEFT JOIN courses c ON c.id = a.course_id";

fn read_detail(row: &rusqlite::Row<'_>) -> rusqlite::Result<ReprogrammingLogDetail> {
    Ok(ReprogrammingLogDetail {
        log: read_log(row, 0)?,
        subtask: SubtaskDetail {
            subtask: read_subtask(row, 6)?,
            activity: read_activity(row, 16)?,
            course: read_opt_course(row, 25)?,
        },
    })
}

fn detail_query(tail: &str) -> String {
    format!(
        "SELECT {}, {} {} {}",
        LOG_COLS,
        super::subtasks::DETAIL_COLS,
        LOG_JOINS,
        tail
    )
}

#[derive(Debug, Clone)]
pub struct NewLog {
    pub subtask_id: Uuid,
    pub previous_date: NaiveDate,
    pub new_date: NaiveDate,
    pub reason: String,
}

impl SqliteStore {
    /// List the user's logs, newest first.
    pub async fn list_logs(&self, user_id: Uuid) -> Result<Vec<ReprogrammingLogDetail>, StoreError> {
        self.with_conn(move |conn| {
            let sql = detail_query("WHERE s.user_id = ?1 ORDER BY l.created_at DESC, l.id ASC");
            let mut stmt = conn.prepare(&sql)?;
            let logs = stmt
                .query_map(params![user_id.to_string()], read_detail)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(logs)
        })
        .await
    }

    /// Record a date change. The subtask must belong to the same user.
    pub async fn create_log(
        &self,
        user_id: Uuid,
        new: NewLog,
    ) -> Result<ReprogrammingLogDetail, StoreError> {
        self.with_conn(move |conn| {
            let owned = conn
                .query_row(
                    "SELECT 1 FROM subtasks WHERE id = ?1 AND user_id = ?2",
                    params![new.subtask_id.to_string(), user_id.to_string()],
                    |row| row.get::<_, i64>(0),
                )
                .optional()?;
            if owned.is_none() {
                return Err(StoreError::SubtaskNotOwned);
            }

            let id = Uuid::new_v4();
            conn.execute(
                "INSERT INTO reprogramming_logs (id, subtask_id, previous_date, new_date, reason, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    id.to_string(),
                    new.subtask_id.to_string(),
                    new.previous_date.to_string(),
                    new.new_date.to_string(),
                    new.reason,
                    Utc::now().to_rfc3339(),
                ],
            )?;

            let detail = conn.query_row(
                &detail_query("WHERE l.id = ?1"),
                params![id.to_string()],
                read_detail,
            )?;
            Ok(detail)
        })
        .await
    }

    pub async fn log(
        &self,
        user_id: Uuid,
        id: Uuid,
    ) -> Result<Option<ReprogrammingLogDetail>, StoreError> {
        self.with_conn(move |conn| {
            let detail = conn
                .query_row(
                    &detail_query("WHERE l.id = ?1 AND s.user_id = ?2"),
                    params![id.to_string(), user_id.to_string()],
                    read_detail,
                )
                .optional()?;
            Ok(detail)
        })
        .await
    }

    pub async fn delete_log(&self, user_id: Uuid, id: Uuid) -> Result<bool, StoreError> {
        self.with_conn(move |conn| {
            let deleted = conn.execute(
                "DELETE FROM reprogramming_logs
                 WHERE id = ?1
                   AND subtask_id IN (SELECT id FROM subtasks WHERE user_id = ?2)",
                params![id.to_string(), user_id.to_string()],
            )?;
            Ok(deleted > 0)
        })
        .await
    }
}
