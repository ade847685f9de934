//! Course rows. Everything is scoped to the owning user.

use rusqlite::{params, OptionalExtension};
use uuid::Uuid;

use super::{read_course, SqliteStore, StoreError};
use crate::model::Course;

impl SqliteStore {
    pub async fn list_courses(&self, user_id: Uuid) -> Result<Vec<Course>, StoreError> {
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, user_id, name FROM courses WHERE user_id = ?1 ORDER BY name ASC",
            )?;
            let courses = stmt
                .query_map(params![user_id.to_string()], |row| read_course(row, 0))?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(courses)
        })
        .await
    }

    /// Create a course; the name is unique per user.
    pub async fn create_course(&self, user_id: Uuid, name: String) -> Result<Course, StoreError> {
        self.with_conn(move |conn| {
            let taken = conn
                .query_row(
                    "SELECT 1 FROM courses WHERE user_id = ?1 AND name = ?2",
                    params![user_id.to_string(), name],
                    |row| row.get::<_, i64>(0),
                )
                .optional()?;
            if taken.is_some() {
                return Err(StoreError::DuplicateCourseName);
            }

            let course = Course {
                id: Uuid::new_v4(),
                user_id,
                name,
            };
            conn.execute(
                "INSERT INTO courses (id, user_id, name) VALUES (?1, ?2, ?3)",
                params![course.id.to_string(), course.user_id.to_string(), course.name],
            )?;
            Ok(course)
        })
        .await
    }

    pub async fn course(&self, user_id: Uuid, id: Uuid) -> Result<Option<Course>, StoreError> {
        self.with_conn(move |conn| {
            let course = conn
                .query_row(
                    "SELECT id, user_id, name FROM courses WHERE id = ?1 AND user_id = ?2",
                    params![id.to_string(), user_id.to_string()],
                    |row| read_course(row, 0),
                )
                .optional()?;
            Ok(course)
        })
        .await
    }

    pub async fn course_exists(&self, user_id: Uuid, id: Uuid) -> Result<bool, StoreError> {
        self.with_conn(move |conn| {
            let found = conn
                .query_row(
                    "SELECT 1 FROM courses WHERE id = ?1 AND user_id = ?2",
                    params![id.to_string(), user_id.to_string()],
                    |row| row.get::<_, i64>(0),
                )
                .optional()?;
            Ok(found.is_some())
        })
        .await
    }

    pub async fn rename_course(
        &self,
        user_id: Uuid,
        id: Uuid,
        name: String,
    ) -> Result<Option<Course>, StoreError> {
        self.with_conn(move |conn| {
            let current = conn
                .query_row(
                    "SELECT id, user_id, name FROM courses WHERE id = ?1 AND user_id = ?2",
                    params![id.to_string(), user_id.to_string()],
                    |row| read_course(row, 0),
                )
                .optional()?;
            let Some(mut course) = current else {
                return Ok(None);
            };

            let taken = conn
                .query_row(
                    "SELECT 1 FROM courses WHERE user_id = ?1 AND name = ?2 AND id != ?3",
                    params![user_id.to_string(), name, id.to_string()],
                    |row| row.get::<_, i64>(0),
                )
                .optional()?;
            if taken.is_some() {
                return Err(StoreError::DuplicateCourseName);
            }

            conn.execute(
                "UPDATE courses SET name = ?2 WHERE id = ?1",
                params![course.id.to_string(), name],
            )?;
            course.name = name;
            Ok(Some(course))
        })
        .await
    }

    /// Delete a course. Activities that referenced it keep existing
    /// with a null course (FK ON DELETE SET NULL).
    pub async fn delete_course(&self, user_id: Uuid, id: Uuid) -> Result<bool, StoreError> {
        self.with_conn(move |conn| {
            let deleted = conn.execute(
                "DELETE FROM courses WHERE id = ?1 AND user_id = ?2",
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
    use crate::store::testutil::{open_store, seed_user};

    #[tokio::test]
    async fn test_course_round_trip_and_ordering() {
        let (_dir, store) = open_store().await;
        let user = seed_user(&store, "ana@example.com").await;

        store.create_course(user.id, "Química".to_string()).await.unwrap();
        store.create_course(user.id, "Cálculo".to_string()).await.unwrap();

        let names: Vec<String> = store
            .list_courses(user.id)
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, vec!["Cálculo", "Química"]);
    }

    #[tokio::test]
    async fn test_course_name_unique_per_user() {
        let (_dir, store) = open_store().await;
        let ana = seed_user(&store, "ana@example.com").await;
        let luis = seed_user(&store, "luis@example.com").await;

        store.create_course(ana.id, "Física".to_string()).await.unwrap();
        let err = store
            .create_course(ana.id, "Física".to_string())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::DuplicateCourseName));

        // A different user may reuse the name.
        assert!(store.create_course(luis.id, "Física".to_string()).await.is_ok());
    }

    #[tokio::test]
    async fn test_courses_are_user_scoped() {
        let (_dir, store) = open_store().await;
        let ana = seed_user(&store, "ana@example.com").await;
        let luis = seed_user(&store, "luis@example.com").await;

        let course = store.create_course(ana.id, "Física".to_string()).await.unwrap();

        assert!(store.course(luis.id, course.id).await.unwrap().is_none());
        assert!(!store.course_exists(luis.id, course.id).await.unwrap());
        assert!(!store.delete_course(luis.id, course.id).await.unwrap());
        assert!(store.course_exists(ana.id, course.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_rename_course_checks_collisions() {
        let (_dir, store) = open_store().await;
        let user = seed_user(&store, "ana@example.com").await;

        let a = store.create_course(user.id, "Física".to_string()).await.unwrap();
        store.create_course(user.id, "Química".to_string()).await.unwrap();

        let err = store
            .rename_course(user.id, a.id, "Química".to_string())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::DuplicateCourseName));

        // Renaming to its own name is a no-op, not a collision.
        let same = store
            .rename_course(user.id, a.id, "Física".to_string())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(same.name, "Física");
    }
}
