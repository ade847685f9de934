//! User rows.

use chrono::Utc;
use rusqlite::{params, OptionalExtension};
use uuid::Uuid;

use super::{read_user, SqliteStore, StoreError};
use crate::hours::Hours;
use crate::model::User;

const USER_COLS: &str = "id, email, name, password_hash, daily_hours_limit, is_active, date_joined";

#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub name: String,
    pub password_hash: String,
    pub daily_hours_limit: Hours,
}

/// Partial update; `None` leaves the field unchanged.
#[derive(Debug, Clone, Default)]
pub struct UserPatch {
    pub email: Option<String>,
    pub name: Option<String>,
    pub password_hash: Option<String>,
    pub daily_hours_limit: Option<Hours>,
}

impl SqliteStore {
    pub async fn create_user(&self, new: NewUser) -> Result<User, StoreError> {
        self.with_conn(move |conn| {
            let taken = conn
                .query_row(
                    "SELECT 1 FROM users WHERE email = ?1",
                    params![new.email],
                    |row| row.get::<_, i64>(0),
                )
                .optional()?;
            if taken.is_some() {
                return Err(StoreError::DuplicateEmail);
            }

            let user = User {
                id: Uuid::new_v4(),
                email: new.email,
                name: new.name,
                password_hash: new.password_hash,
                daily_hours_limit: new.daily_hours_limit,
                is_active: true,
                date_joined: Utc::now(),
            };
            conn.execute(
                "INSERT INTO users (id, email, name, password_hash, daily_hours_limit, is_active, date_joined)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    user.id.to_string(),
                    user.email,
                    user.name,
                    user.password_hash,
                    user.daily_hours_limit.hundredths(),
                    user.is_active as i64,
                    user.date_joined.to_rfc3339(),
                ],
            )?;
            Ok(user)
        })
        .await
    }

    pub async fn user_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        self.with_conn(move |conn| {
            let user = conn
                .query_row(
                    &format!("SELECT {} FROM users WHERE id = ?1", USER_COLS),
                    params![id.to_string()],
                    |row| read_user(row, 0),
                )
                .optional()?;
            Ok(user)
        })
        .await
    }

    pub async fn user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let email = email.to_string();
        self.with_conn(move |conn| {
            let user = conn
                .query_row(
                    &format!("SELECT {} FROM users WHERE email = ?1", USER_COLS),
                    params![email],
                    |row| read_user(row, 0),
                )
                .optional()?;
            Ok(user)
        })
        .await
    }

    /// Apply a patch to an existing user. Returns `None` if the user
    /// does not exist; changing the email to one already registered
    /// fails with `DuplicateEmail`.
    pub async fn update_user(&self, id: Uuid, patch: UserPatch) -> Result<Option<User>, StoreError> {
        self.with_conn(move |conn| {
            let current = conn
                .query_row(
                    &format!("SELECT {} FROM users WHERE id = ?1", USER_COLS),
                    params![id.to_string()],
                    |row| read_user(row, 0),
                )
                .optional()?;
            let Some(mut user) = current else {
                return Ok(None);
            };

            if let Some(email) = patch.email {
                let taken = conn
                    .query_row(
                        "SELECT 1 FROM users WHERE email = ?1 AND id != ?2",
                        params![email, id.to_string()],
                        |row| row.get::<_, i64>(0),
                    )
                    .optional()?;
                if taken.is_some() {
                    return Err(StoreError::DuplicateEmail);
                }
                user.email = email;
            }
            if let Some(name) = patch.name {
                user.name = name;
            }
            if let Some(password_hash) = patch.password_hash {
                user.password_hash = password_hash;
            }
            if let Some(limit) = patch.daily_hours_limit {
                user.daily_hours_limit = limit;
            }

            conn.execute(
                "UPDATE users SET email = ?2, name = ?3, password_hash = ?4, daily_hours_limit = ?5
                 WHERE id = ?1",
                params![
                    user.id.to_string(),
                    user.email,
                    user.name,
                    user.password_hash,
                    user.daily_hours_limit.hundredths(),
                ],
            )?;
            Ok(Some(user))
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::testutil::{open_store, seed_user};

    #[tokio::test]
    async fn test_create_and_fetch_user() {
        let (_dir, store) = open_store().await;
        let created = seed_user(&store, "ana@example.com").await;

        let by_id = store.user_by_id(created.id).await.unwrap().unwrap();
        assert_eq!(by_id, created);

        let by_email = store.user_by_email("ana@example.com").await.unwrap().unwrap();
        assert_eq!(by_email.id, created.id);
        assert!(by_email.is_active);

        assert!(store.user_by_email("nadie@example.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected() {
        let (_dir, store) = open_store().await;
        seed_user(&store, "ana@example.com").await;

        let err = store
            .create_user(NewUser {
                email: "ana@example.com".to_string(),
                name: "Otra Ana".to_string(),
                password_hash: "pbkdf2:1:00:00".to_string(),
                daily_hours_limit: Hours::from_hundredths(600),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::DuplicateEmail));
    }

    #[tokio::test]
    async fn test_update_user_patch_semantics() {
        let (_dir, store) = open_store().await;
        let user = seed_user(&store, "ana@example.com").await;

        let updated = store
            .update_user(
                user.id,
                UserPatch {
                    name: Some("Ana María".to_string()),
                    daily_hours_limit: Some(Hours::from_hundredths(450)),
                    ..UserPatch::default()
                },
            )
            .await
            .unwrap()
            .unwrap();

        assert_eq!(updated.name, "Ana María");
        assert_eq!(updated.daily_hours_limit.hundredths(), 450);
        // Untouched fields survive.
        assert_eq!(updated.email, "ana@example.com");
        assert_eq!(updated.password_hash, user.password_hash);
    }

    #[tokio::test]
    async fn test_update_user_email_collision() {
        let (_dir, store) = open_store().await;
        seed_user(&store, "ana@example.com").await;
        let other = seed_user(&store, "luis@example.com").await;

        let err = store
            .update_user(
                other.id,
                UserPatch {
                    email: Some("ana@example.com".to_string()),
                    ..UserPatch::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::DuplicateEmail));
    }

    #[tokio::test]
    async fn test_update_missing_user_is_none() {
        let (_dir, store) = open_store().await;
        let result = store
            .update_user(Uuid::new_v4(), UserPatch::default())
            .await
            .unwrap();
        assert!(result.is_none());
    }
}
