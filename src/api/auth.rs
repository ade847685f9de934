//! JWT auth: login, token refresh, and the bearer middleware.
//!
//! - `POST /api/auth/token` exchanges email+password for an access/refresh pair
//! - `POST /api/auth/token/refresh` exchanges a live refresh token for a new access token
//! - When `DEV_MODE=false`, all non-public endpoints require `Authorization: Bearer <access>`
//! - When `DEV_MODE=true`, requests without a valid token run as a local guest user
//!
//! Claims carry the user's email and name so the frontend can show
//! them without an extra request.

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};
use std::sync::Arc;
use uuid::Uuid;

use super::error::{field_error, internal, unauthorized, ApiError, REQUIRED};
use super::routes::AppState;
use super::types::{AccessTokenResponse, TokenPairResponse};
use crate::config::AuthConfig;
use crate::hours::Hours;
use crate::model::User;
use crate::password::{hash_password, verify_password};
use crate::store::users::NewUser;
use crate::store::{SqliteStore, StoreError};

/// Identity used for requests without a token when `DEV_MODE` is on.
pub const GUEST_EMAIL: &str = "dev@example.com";
pub const GUEST_NAME: &str = "Dev User";

const TOKEN_TYPE_ACCESS: &str = "access";
const TOKEN_TYPE_REFRESH: &str = "refresh";

const DETAIL_NO_CREDENTIALS: &str = "Las credenciales de autenticación no se proveyeron.";
const DETAIL_INVALID_TOKEN: &str = "El token es inválido o ha expirado.";
const DETAIL_BAD_LOGIN: &str =
    "No se encontró una cuenta activa con las credenciales proporcionadas.";

#[derive(Debug, serde::Serialize, serde::Deserialize)]
struct Claims {
    /// Subject: the user id
    sub: String,
    email: String,
    name: String,
    /// "access" or "refresh"
    token_type: String,
    /// Issued-at unix seconds
    iat: i64,
    /// Expiration unix seconds
    exp: i64,
}

/// The authenticated caller, inserted as a request extension by
/// `require_auth`.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: String,
    pub name: String,
}

impl From<&User> for AuthUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            name: user.name.clone(),
        }
    }
}

fn issue_token(
    user: &User,
    token_type: &str,
    ttl: Duration,
    secret: &str,
) -> anyhow::Result<String> {
    let now = Utc::now();
    let claims = Claims {
        sub: user.id.to_string(),
        email: user.email.clone(),
        name: user.name.clone(),
        token_type: token_type.to_string(),
        iat: now.timestamp(),
        exp: (now + ttl).timestamp(),
    };
    let token = jsonwebtoken::encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;
    Ok(token)
}

fn verify_token(token: &str, expected_type: &str, secret: &str) -> Option<Claims> {
    let data = jsonwebtoken::decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .ok()?;
    (data.claims.token_type == expected_type).then_some(data.claims)
}

/// Issue an access/refresh pair for a user.
fn issue_pair(user: &User, auth: &AuthConfig) -> anyhow::Result<(String, String)> {
    let access = issue_token(
        user,
        TOKEN_TYPE_ACCESS,
        Duration::minutes(auth.access_ttl_minutes.max(1)),
        &auth.jwt_secret,
    )?;
    let refresh = issue_token(
        user,
        TOKEN_TYPE_REFRESH,
        Duration::days(auth.refresh_ttl_days.max(1)),
        &auth.jwt_secret,
    )?;
    Ok((access, refresh))
}

/// Look up the guest user, creating it on first use.
pub async fn ensure_guest(store: &SqliteStore) -> Result<User, StoreError> {
    if let Some(user) = store.user_by_email(GUEST_EMAIL).await? {
        return Ok(user);
    }
    let created = store
        .create_user(NewUser {
            email: GUEST_EMAIL.to_string(),
            name: GUEST_NAME.to_string(),
            password_hash: hash_password("dev"),
            daily_hours_limit: Hours::from_hundredths(600),
        })
        .await;
    match created {
        Ok(user) => Ok(user),
        // Lost a create race; the row is there now.
        Err(StoreError::DuplicateEmail) => match store.user_by_email(GUEST_EMAIL).await? {
            Some(user) => Ok(user),
            None => Err(StoreError::DuplicateEmail),
        },
        Err(e) => Err(e),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, serde::Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, serde::Deserialize)]
pub struct RefreshRequest {
    pub refresh: Option<String>,
}

/// POST /api/auth/token - Exchange credentials for a token pair.
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<TokenPairResponse>, ApiError> {
    let email = match req.email.as_deref().map(str::trim) {
        Some(e) if !e.is_empty() => e.to_lowercase(),
        _ => return Err(field_error("email", REQUIRED)),
    };
    let password = match req.password.as_deref() {
        Some(p) if !p.is_empty() => p,
        _ => return Err(field_error("password", REQUIRED)),
    };

    let user = state
        .store
        .user_by_email(&email)
        .await
        .map_err(internal)?
        .filter(|u| u.is_active && verify_password(password, &u.password_hash))
        .ok_or_else(|| unauthorized(DETAIL_BAD_LOGIN))?;

    let (access, refresh) = issue_pair(&user, &state.config.auth).map_err(internal)?;

    tracing::info!("User {} logged in", user.email);

    Ok(Json(TokenPairResponse { access, refresh }))
}

/// POST /api/auth/token/refresh - Exchange a refresh token for a new
/// access token. The account must still exist and be active.
pub async fn refresh(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RefreshRequest>,
) -> Result<Json<AccessTokenResponse>, ApiError> {
    let token = match req.refresh.as_deref() {
        Some(t) if !t.is_empty() => t,
        _ => return Err(field_error("refresh", REQUIRED)),
    };

    let claims = verify_token(token, TOKEN_TYPE_REFRESH, &state.config.auth.jwt_secret)
        .ok_or_else(|| unauthorized(DETAIL_INVALID_TOKEN))?;
    let user_id =
        Uuid::parse_str(&claims.sub).map_err(|_| unauthorized(DETAIL_INVALID_TOKEN))?;

    let user = state
        .store
        .user_by_id(user_id)
        .await
        .map_err(internal)?
        .filter(|u| u.is_active)
        .ok_or_else(|| unauthorized(DETAIL_INVALID_TOKEN))?;

    let access = issue_token(
        &user,
        TOKEN_TYPE_ACCESS,
        Duration::minutes(state.config.auth.access_ttl_minutes.max(1)),
        &state.config.auth.jwt_secret,
    )
    .map_err(internal)?;

    Ok(Json(AccessTokenResponse { access }))
}

/// Middleware guarding the protected routes. On success the resolved
/// `AuthUser` is attached as a request extension.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let auth_header = req
        .headers()
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .unwrap_or("");

    let token = auth_header
        .strip_prefix("Bearer ")
        .or_else(|| auth_header.strip_prefix("bearer "))
        .unwrap_or("");

    let claims = verify_token(token, TOKEN_TYPE_ACCESS, &state.config.auth.jwt_secret);

    // Dev mode: a valid token still selects its user, anything else
    // falls back to the guest identity.
    if state.config.dev_mode && claims.is_none() {
        return match ensure_guest(&state.store).await {
            Ok(user) => {
                req.extensions_mut().insert(AuthUser::from(&user));
                next.run(req).await
            }
            Err(e) => internal(e).into_response(),
        };
    }

    if token.is_empty() {
        return unauthorized(DETAIL_NO_CREDENTIALS).into_response();
    }

    let Some(claims) = claims else {
        return unauthorized(DETAIL_INVALID_TOKEN).into_response();
    };
    let Ok(user_id) = Uuid::parse_str(&claims.sub) else {
        return unauthorized(DETAIL_INVALID_TOKEN).into_response();
    };

    match state.store.user_by_id(user_id).await {
        Ok(Some(user)) if user.is_active => {
            req.extensions_mut().insert(AuthUser::from(&user));
            next.run(req).await
        }
        Ok(Some(_)) => unauthorized("Usuario inactivo.").into_response(),
        Ok(None) => unauthorized("Usuario no encontrado.").into_response(),
        Err(e) => internal(e).into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::testutil::open_store;

    fn sample_user() -> User {
        User {
            id: Uuid::new_v4(),
            email: "ana@example.com".to_string(),
            name: "Ana".to_string(),
            password_hash: String::new(),
            daily_hours_limit: Hours::from_hundredths(600),
            is_active: true,
            date_joined: Utc::now(),
        }
    }

    #[test]
    fn test_issue_and_verify_pair() {
        let user = sample_user();
        let auth = AuthConfig::default();
        let (access, refresh) = issue_pair(&user, &auth).expect("issue pair");

        let claims = verify_token(&access, TOKEN_TYPE_ACCESS, &auth.jwt_secret).expect("access");
        assert_eq!(claims.sub, user.id.to_string());
        assert_eq!(claims.email, "ana@example.com");
        assert_eq!(claims.name, "Ana");

        let claims = verify_token(&refresh, TOKEN_TYPE_REFRESH, &auth.jwt_secret).expect("refresh");
        assert_eq!(claims.token_type, "refresh");
    }

    #[test]
    fn test_token_type_is_enforced() {
        let user = sample_user();
        let auth = AuthConfig::default();
        let (access, refresh) = issue_pair(&user, &auth).expect("issue pair");

        assert!(verify_token(&access, TOKEN_TYPE_REFRESH, &auth.jwt_secret).is_none());
        assert!(verify_token(&refresh, TOKEN_TYPE_ACCESS, &auth.jwt_secret).is_none());
    }

    #[test]
    fn test_wrong_secret_is_rejected() {
        let user = sample_user();
        let auth = AuthConfig::default();
        let (access, _) = issue_pair(&user, &auth).expect("issue pair");

        assert!(verify_token(&access, TOKEN_TYPE_ACCESS, "other-secret").is_none());
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let user = sample_user();
        let auth = AuthConfig::default();
        let token = issue_token(
            &user,
            TOKEN_TYPE_ACCESS,
            Duration::minutes(-120),
            &auth.jwt_secret,
        )
        .expect("issue token");

        assert!(verify_token(&token, TOKEN_TYPE_ACCESS, &auth.jwt_secret).is_none());
    }

    #[tokio::test]
    async fn test_ensure_guest_is_idempotent() {
        let (_dir, store) = open_store().await;
        let first = ensure_guest(&store).await.expect("create guest");
        let second = ensure_guest(&store).await.expect("reuse guest");
        assert_eq!(first.id, second.id);
        assert_eq!(first.email, GUEST_EMAIL);
        assert_eq!(first.name, GUEST_NAME);
    }
}
