//! SQLite persistence.
//!
//! A single connection behind an async mutex; every query runs on the
//! blocking pool and takes the lock there, so statements never block
//! the async executor and writes are serialized. The schema is
//! created on open and is idempotent.

pub mod activities;
pub mod courses;
pub mod reprogramming;
pub mod subtasks;
pub mod users;

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::types::Type;
use rusqlite::{Connection, Row};
use thiserror::Error;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::hours::Hours;
use crate::model::{Activity, ActivityType, Course, ReprogrammingLog, Subtask, SubtaskStatus, User};

const SCHEMA: &str = r#"
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS users (
    id TEXT PRIMARY KEY NOT NULL,
    email TEXT NOT NULL UNIQUE,
    name TEXT NOT NULL,
    password_hash TEXT NOT NULL,
    daily_hours_limit INTEGER NOT NULL DEFAULT 600,
    is_active INTEGER NOT NULL DEFAULT 1,
    date_joined TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS courses (
    id TEXT PRIMARY KEY NOT NULL,
    user_id TEXT NOT NULL,
    name TEXT NOT NULL,
    FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE,
    UNIQUE (user_id, name)
);

CREATE INDEX IF NOT EXISTS idx_courses_user ON courses(user_id);

CREATE TABLE IF NOT EXISTS activities (
    id TEXT PRIMARY KEY NOT NULL,
    user_id TEXT NOT NULL,
    title TEXT NOT NULL,
    description TEXT,
    course_id TEXT,
    activity_type TEXT NOT NULL DEFAULT 'OTHER',
    created_at TEXT NOT NULL,
    event_datetime TEXT,
    deadline TEXT,
    FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE,
    FOREIGN KEY (course_id) REFERENCES courses(id) ON DELETE SET NULL
);

CREATE INDEX IF NOT EXISTS idx_activities_user ON activities(user_id);
CREATE INDEX IF NOT EXISTS idx_activities_course ON activities(course_id);

CREATE TABLE IF NOT EXISTS subtasks (
    id TEXT PRIMARY KEY NOT NULL,
    user_id TEXT NOT NULL,
    activity_id TEXT NOT NULL,
    title TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'PENDING',
    estimated_centihours INTEGER NOT NULL,
    target_date TEXT,
    sort_order INTEGER NOT NULL DEFAULT 0,
    is_conflicted INTEGER NOT NULL DEFAULT 0,
    execution_note TEXT,
    FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE,
    FOREIGN KEY (activity_id) REFERENCES activities(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_subtasks_user ON subtasks(user_id);
CREATE INDEX IF NOT EXISTS idx_subtasks_activity ON subtasks(activity_id);
CREATE INDEX IF NOT EXISTS idx_subtasks_user_date ON subtasks(user_id, target_date);

CREATE TABLE IF NOT EXISTS reprogramming_logs (
    id TEXT PRIMARY KEY NOT NULL,
    subtask_id TEXT NOT NULL,
    previous_date TEXT NOT NULL,
    new_date TEXT NOT NULL,
    reason TEXT NOT NULL,
    created_at TEXT NOT NULL,
    FOREIGN KEY (subtask_id) REFERENCES subtasks(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_logs_subtask ON reprogramming_logs(subtask_id);
"#;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("blocking task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("email already registered")]
    DuplicateEmail,

    #[error("course name already used by this user")]
    DuplicateCourseName,

    #[error("course not found for this user")]
    CourseNotOwned,

    #[error("activity not found for this user")]
    ActivityNotOwned,

    #[error("subtask not found for this user")]
    SubtaskNotOwned,
}

/// Handle on the SQLite database. Cheap to clone; all clones share
/// the same connection.
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open (or create) the database at `db_path` and apply the schema.
    pub async fn open(db_path: PathBuf) -> Result<Self, StoreError> {
        if let Some(parent) = db_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let conn = tokio::task::spawn_blocking(move || -> Result<Connection, rusqlite::Error> {
            let conn = Connection::open(&db_path)?;
            conn.execute_batch(SCHEMA)?;
            Ok(conn)
        })
        .await??;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run a closure against the connection on the blocking pool.
    /// The lock is held for the whole closure, so multi-statement
    /// operations are atomic with respect to other tasks.
    pub(crate) async fn with_conn<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&Connection) -> Result<T, StoreError> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let conn = conn.blocking_lock();
            f(&conn)
        })
        .await?
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Column readers shared by the entity modules
// ─────────────────────────────────────────────────────────────────────────────

fn conversion_error(
    idx: usize,
    err: impl std::error::Error + Send + Sync + 'static,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err))
}

pub(crate) fn uuid_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<Uuid> {
    let text: String = row.get(idx)?;
    Uuid::parse_str(&text).map_err(|e| conversion_error(idx, e))
}

pub(crate) fn opt_uuid_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<Uuid>> {
    let text: Option<String> = row.get(idx)?;
    match text {
        Some(t) => Uuid::parse_str(&t)
            .map(Some)
            .map_err(|e| conversion_error(idx, e)),
        None => Ok(None),
    }
}

pub(crate) fn datetime_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let text: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&text)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| conversion_error(idx, e))
}

pub(crate) fn opt_datetime_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    let text: Option<String> = row.get(idx)?;
    match text {
        Some(t) => DateTime::parse_from_rfc3339(&t)
            .map(|dt| Some(dt.with_timezone(&Utc)))
            .map_err(|e| conversion_error(idx, e)),
        None => Ok(None),
    }
}

pub(crate) fn date_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<NaiveDate> {
    let text: String = row.get(idx)?;
    text.parse().map_err(|e| conversion_error(idx, e))
}

pub(crate) fn opt_date_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<NaiveDate>> {
    let text: Option<String> = row.get(idx)?;
    match text {
        Some(t) => t.parse().map(Some).map_err(|e| conversion_error(idx, e)),
        None => Ok(None),
    }
}

/// Read a user starting at column `base`:
/// id, email, name, password_hash, daily_hours_limit, is_active, date_joined.
pub(crate) fn read_user(row: &Row<'_>, base: usize) -> rusqlite::Result<User> {
    Ok(User {
        id: uuid_at(row, base)?,
        email: row.get(base + 1)?,
        name: row.get(base + 2)?,
        password_hash: row.get(base + 3)?,
        daily_hours_limit: Hours::from_hundredths(row.get(base + 4)?),
        is_active: row.get::<_, i64>(base + 5)? != 0,
        date_joined: datetime_at(row, base + 6)?,
    })
}

/// Read a course starting at column `base`: id, user_id, name.
pub(crate) fn read_course(row: &Row<'_>, base: usize) -> rusqlite::Result<Course> {
    Ok(Course {
        id: uuid_at(row, base)?,
        user_id: uuid_at(row, base + 1)?,
        name: row.get(base + 2)?,
    })
}

/// Read an optional course from a LEFT JOIN; a NULL id means no row.
pub(crate) fn read_opt_course(row: &Row<'_>, base: usize) -> rusqlite::Result<Option<Course>> {
    let id: Option<String> = row.get(base)?;
    if id.is_none() {
        return Ok(None);
    }
    read_course(row, base).map(Some)
}

/// Read an activity starting at column `base`: id, user_id, title,
/// description, course_id, activity_type, created_at, event_datetime,
/// deadline.
pub(crate) fn read_activity(row: &Row<'_>, base: usize) -> rusqlite::Result<Activity> {
    let type_text: String = row.get(base + 5)?;
    let activity_type = ActivityType::parse(&type_text).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            base + 5,
            Type::Text,
            format!("unknown activity type: {}", type_text).into(),
        )
    })?;

    Ok(Activity {
        id: uuid_at(row, base)?,
        user_id: uuid_at(row, base + 1)?,
        title: row.get(base + 2)?,
        description: row.get(base + 3)?,
        course_id: opt_uuid_at(row, base + 4)?,
        activity_type,
        created_at: datetime_at(row, base + 6)?,
        event_datetime: opt_datetime_at(row, base + 7)?,
        deadline: opt_date_at(row, base + 8)?,
    })
}

/// Read a subtask starting at column `base`: id, user_id, activity_id,
/// title, status, estimated_centihours, target_date, sort_order,
/// is_conflicted, execution_note.
pub(crate) fn read_subtask(row: &Row<'_>, base: usize) -> rusqlite::Result<Subtask> {
    let status_text: String = row.get(base + 4)?;
    let status = SubtaskStatus::parse(&status_text).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            base + 4,
            Type::Text,
            format!("unknown subtask status: {}", status_text).into(),
        )
    })?;

    Ok(Subtask {
        id: uuid_at(row, base)?,
        user_id: uuid_at(row, base + 1)?,
        activity_id: uuid_at(row, base + 2)?,
        title: row.get(base + 3)?,
        status,
        estimated_hours: Hours::from_hundredths(row.get(base + 5)?),
        target_date: opt_date_at(row, base + 6)?,
        order: row.get(base + 7)?,
        is_conflicted: row.get::<_, i64>(base + 8)? != 0,
        execution_note: row.get(base + 9)?,
    })
}

/// Read a reprogramming log starting at column `base`: id, subtask_id,
/// previous_date, new_date, reason, created_at.
pub(crate) fn read_log(row: &Row<'_>, base: usize) -> rusqlite::Result<ReprogrammingLog> {
    Ok(ReprogrammingLog {
        id: uuid_at(row, base)?,
        subtask_id: uuid_at(row, base + 1)?,
        previous_date: date_at(row, base + 2)?,
        new_date: date_at(row, base + 3)?,
        reason: row.get(base + 4)?,
        created_at: datetime_at(row, base + 5)?,
    })
}

#[cfg(test)]
pub(crate) mod testutil {
    use super::*;
    use crate::hours::Hours;
    use crate::model::{ActivityType, SubtaskStatus};
    use crate::store::activities::NewActivity;
    use crate::store::subtasks::NewSubtask;
    use crate::store::users::NewUser;
    use tempfile::TempDir;

    /// A store backed by a real database file in a temp dir. Keep the
    /// TempDir alive for the duration of the test.
    pub async fn open_store() -> (TempDir, SqliteStore) {
        let dir = TempDir::new().expect("create temp dir");
        let store = SqliteStore::open(dir.path().join("planeo.db"))
            .await
            .expect("open store");
        (dir, store)
    }

    pub async fn seed_user(store: &SqliteStore, email: &str) -> User {
        store
            .create_user(NewUser {
                email: email.to_string(),
                name: "Test User".to_string(),
                password_hash: "pbkdf2:1:00:00".to_string(),
                daily_hours_limit: Hours::from_hundredths(600),
            })
            .await
            .expect("seed user")
    }

    pub async fn seed_activity(store: &SqliteStore, user_id: Uuid, title: &str) -> Activity {
        store
            .create_activity(
                user_id,
                NewActivity {
                    title: title.to_string(),
                    description: None,
                    course_id: None,
                    activity_type: ActivityType::Other,
                    event_datetime: None,
                    deadline: None,
                },
            )
            .await
            .expect("seed activity")
            .activity
    }

    pub async fn seed_subtask(
        store: &SqliteStore,
        user_id: Uuid,
        activity_id: Uuid,
        title: &str,
        target_date: Option<&str>,
        hours: &str,
    ) -> Subtask {
        store
            .create_subtask(
                user_id,
                NewSubtask {
                    activity_id,
                    title: title.to_string(),
                    status: SubtaskStatus::Pending,
                    estimated_hours: Hours::parse(hours).expect("test hours"),
                    target_date: target_date.map(|d| d.parse().expect("test date")),
                    order: 0,
                    is_conflicted: false,
                    execution_note: None,
                },
            )
            .await
            .expect("seed subtask")
            .subtask
    }
}
