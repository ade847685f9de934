//! Account endpoints: registration (public) and the current user.

use axum::{extract::State, http::StatusCode, Extension, Json};
use std::sync::Arc;

use super::auth::AuthUser;
use super::error::{field_error, hours_message, internal, not_found, ApiError};
use super::routes::AppState;
use super::types::UserResponse;
use crate::hours::{Hours, HoursInput};
use crate::password::hash_password;
use crate::store::users::{NewUser, UserPatch};
use crate::store::StoreError;

/// Default study limit for new accounts: six hours per day.
const DEFAULT_DAILY_LIMIT: Hours = Hours::from_hundredths(600);

const MIN_DAILY_LIMIT: Hours = Hours::from_hundredths(50);
const MAX_DAILY_LIMIT: Hours = Hours::from_hundredths(2400);

#[derive(Debug, serde::Deserialize)]
pub struct RegisterRequest {
    pub email: Option<String>,
    pub name: Option<String>,
    pub password: Option<String>,
    pub daily_hours_limit: Option<HoursInput>,
}

#[derive(Debug, serde::Deserialize)]
pub struct UpdateMeRequest {
    pub email: Option<String>,
    pub name: Option<String>,
    pub password: Option<String>,
    pub daily_hours_limit: Option<HoursInput>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Validation
// ─────────────────────────────────────────────────────────────────────────────

/// Normalize and validate an email: trimmed, lowercased, minimally
/// well-formed.
fn validate_email(raw: Option<&str>) -> Result<String, ApiError> {
    let email = raw.unwrap_or("").trim().to_lowercase();
    if email.is_empty() {
        return Err(field_error("email", "El correo electrónico es obligatorio."));
    }
    let well_formed = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && domain.contains('.') && !domain.starts_with('.')
        }
        None => false,
    };
    if !well_formed || email.contains(char::is_whitespace) {
        return Err(field_error(
            "email",
            "Introduzca una dirección de correo electrónico válida.",
        ));
    }
    Ok(email)
}

fn validate_name(raw: Option<&str>) -> Result<String, ApiError> {
    let name = raw.unwrap_or("").trim();
    if name.is_empty() {
        return Err(field_error("name", "El nombre es obligatorio."));
    }
    let length = name.chars().count();
    if length < 2 {
        return Err(field_error(
            "name",
            "El nombre debe tener al menos 2 caracteres.",
        ));
    }
    if length > 150 {
        return Err(field_error(
            "name",
            "El nombre no puede exceder 150 caracteres.",
        ));
    }
    Ok(name.to_string())
}

fn validate_password(raw: &str) -> Result<&str, ApiError> {
    if raw.chars().count() < 8 {
        return Err(field_error(
            "password",
            "La contraseña debe tener al menos 8 caracteres.",
        ));
    }
    Ok(raw)
}

fn validate_daily_limit(input: &HoursInput) -> Result<Hours, ApiError> {
    let hours = input
        .parse()
        .map_err(|e| field_error("daily_hours_limit", hours_message(e)))?;
    if hours < MIN_DAILY_LIMIT {
        return Err(field_error(
            "daily_hours_limit",
            "El límite de horas diarias no puede ser menor a 0.5 horas.",
        ));
    }
    if hours > MAX_DAILY_LIMIT {
        return Err(field_error(
            "daily_hours_limit",
            "El límite de horas diarias no puede ser mayor a 24.0 horas.",
        ));
    }
    Ok(hours)
}

fn map_duplicate_email(err: StoreError) -> ApiError {
    match err {
        StoreError::DuplicateEmail => field_error(
            "email",
            "Ya existe un usuario con este correo electrónico.",
        ),
        other => internal(other),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────────────────────────

/// POST /api/auth/users - Register a new account (public).
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    let email = validate_email(req.email.as_deref())?;
    let name = validate_name(req.name.as_deref())?;

    let password = match req.password.as_deref() {
        Some(p) if !p.is_empty() => validate_password(p)?,
        _ => {
            return Err(field_error(
                "password",
                "La contraseña es obligatoria al crear un usuario.",
            ))
        }
    };

    let daily_hours_limit = match &req.daily_hours_limit {
        Some(input) => validate_daily_limit(input)?,
        None => DEFAULT_DAILY_LIMIT,
    };

    let user = state
        .store
        .create_user(NewUser {
            email,
            name,
            password_hash: hash_password(password),
            daily_hours_limit,
        })
        .await
        .map_err(map_duplicate_email)?;

    tracing::info!("Registered user {}", user.email);

    Ok((StatusCode::CREATED, Json(user.into())))
}

/// GET /api/auth/users/me - The authenticated account.
pub async fn me(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<UserResponse>, ApiError> {
    state
        .store
        .user_by_id(user.id)
        .await
        .map_err(internal)?
        .map(|u| Json(u.into()))
        .ok_or_else(not_found)
}

/// PATCH /api/auth/users/me - Update the authenticated account.
/// Omitted fields are left unchanged; the password is re-hashed when
/// sent.
pub async fn update_me(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(req): Json<UpdateMeRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    let mut patch = UserPatch::default();

    if req.email.is_some() {
        patch.email = Some(validate_email(req.email.as_deref())?);
    }
    if req.name.is_some() {
        patch.name = Some(validate_name(req.name.as_deref())?);
    }
    if let Some(password) = req.password.as_deref() {
        if !password.is_empty() {
            patch.password_hash = Some(hash_password(validate_password(password)?));
        }
    }
    if let Some(input) = &req.daily_hours_limit {
        patch.daily_hours_limit = Some(validate_daily_limit(input)?);
    }

    state
        .store
        .update_user(user.id, patch)
        .await
        .map_err(map_duplicate_email)?
        .map(|u| Json(u.into()))
        .ok_or_else(not_found)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email_is_normalized() {
        assert_eq!(
            validate_email(Some("  Ana@Example.COM ")).unwrap(),
            "ana@example.com"
        );
    }

    #[test]
    fn test_email_required_and_well_formed() {
        let (status, _) = validate_email(None).unwrap_err();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(validate_email(Some("   ")).is_err());
        assert!(validate_email(Some("no-arroba")).is_err());
        assert!(validate_email(Some("a@b")).is_err());
        assert!(validate_email(Some("a b@example.com")).is_err());
        assert!(validate_email(Some("ana@example.com")).is_ok());
    }

    #[test]
    fn test_name_length_bounds() {
        assert!(validate_name(None).is_err());
        assert!(validate_name(Some("A")).is_err());
        assert_eq!(validate_name(Some("  Ana  ")).unwrap(), "Ana");
        let long = "x".repeat(151);
        assert!(validate_name(Some(&long)).is_err());
        let max = "x".repeat(150);
        assert!(validate_name(Some(&max)).is_ok());
    }

    #[test]
    fn test_password_minimum_length() {
        assert!(validate_password("corta").is_err());
        assert!(validate_password("suficiente").is_ok());
    }

    #[test]
    fn test_daily_limit_range() {
        let low = HoursInput::Text("0.49".to_string());
        let (_, body) = validate_daily_limit(&low).unwrap_err();
        assert_eq!(
            body.0["daily_hours_limit"][0],
            "El límite de horas diarias no puede ser menor a 0.5 horas."
        );

        let high = HoursInput::Text("24.01".to_string());
        let (_, body) = validate_daily_limit(&high).unwrap_err();
        assert_eq!(
            body.0["daily_hours_limit"][0],
            "El límite de horas diarias no puede ser mayor a 24.0 horas."
        );

        let ok = HoursInput::Text("6.00".to_string());
        assert_eq!(validate_daily_limit(&ok).unwrap(), Hours::from_hundredths(600));

        let number = HoursInput::Number(serde_json::Number::from_f64(8.5).unwrap());
        assert_eq!(validate_daily_limit(&number).unwrap(), Hours::from_hundredths(850));
    }

    #[test]
    fn test_daily_limit_rejects_extra_decimals() {
        let input = HoursInput::Text("6.125".to_string());
        let (_, body) = validate_daily_limit(&input).unwrap_err();
        assert_eq!(
            body.0["daily_hours_limit"][0],
            "No puede haber más de 2 decimales."
        );
    }
}
