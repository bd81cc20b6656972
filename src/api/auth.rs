use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use axum::extract::State;
use axum::http::{header, HeaderMap};
use axum::response::IntoResponse;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::extract::Json;
use super::{created, done, ok, AppState};
use crate::clinic::models::Patient;
use crate::clinic::{validation, Role};
use crate::database::patients::{self, NewPatient};
use crate::error::{ClinicError, ClinicResult};

const BAD_CREDENTIALS: &str = "Invalid email or password";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub phone: Option<String>,
    pub gender: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub address: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub token: Uuid,
    pub expires_at: DateTime<Utc>,
    pub patient: Patient,
}

pub fn hash_password(password: &str) -> ClinicResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| ClinicError::Internal(format!("password hashing failed: {e}")))
}

pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    PasswordHash::new(stored_hash)
        .map(|parsed| Argon2::default().verify_password(password.as_bytes(), &parsed).is_ok())
        .unwrap_or(false)
}

pub async fn register(state: &AppState, req: RegisterRequest) -> ClinicResult<Patient> {
    let name = validation::required("name", &req.name)?;
    let email = validation::email(&req.email)?;
    let password_hash = hash_password(validation::password(&req.password)?)?;

    let patient = patients::create_patient(
        &state.pool,
        NewPatient {
            name,
            email,
            phone: validation::optional(req.phone),
            gender: validation::optional(req.gender),
            date_of_birth: req.date_of_birth,
            address: validation::optional(req.address),
            password_hash,
            role: Role::Patient,
        },
    )
    .await?;

    tracing::info!(patient_id = %patient.id, code = %patient.patient_code, "patient registered");
    let notifier = state.notifier.clone();
    let welcomed = patient.clone();
    tokio::spawn(async move {
        notifier.send_welcome(&welcomed).await;
    });
    Ok(patient)
}

/// Verifies credentials and opens a session. `required_role` restricts the
/// login to one kind of account.
pub async fn login(state: &AppState, req: LoginRequest, required_role: Option<Role>) -> ClinicResult<LoginResponse> {
    let email = validation::email(&req.email)?;
    let patient = patients::find_patient_by_email(&state.pool, &email)
        .await?
        .filter(|p| verify_password(&req.password, &p.password_hash))
        .ok_or_else(|| {
            tracing::warn!(%email, "failed login attempt");
            ClinicError::Unauthorized(BAD_CREDENTIALS.to_string())
        })?;

    if let Some(role) = required_role {
        if patient.role != role {
            tracing::warn!(%email, "login rejected for role {}", patient.role);
            return Err(ClinicError::Unauthorized("Admin access required".to_string()));
        }
    }

    let session = patients::create_session(&state.pool, &patient, state.config.session_ttl_hours).await?;
    Ok(LoginResponse { token: session.token, expires_at: session.expires_at, patient })
}

/// Creates the configured admin account, or promotes and re-keys an existing
/// account with the same e-mail. No-op without `ADMIN_EMAIL`.
pub async fn ensure_admin(state: &AppState) -> ClinicResult<Option<Patient>> {
    let Some(admin) = state.config.admin.clone() else {
        return Ok(None);
    };
    let email = validation::email(&admin.email)?;
    let password_hash = hash_password(validation::password(&admin.password)?)?;

    let patient = match patients::find_patient_by_email(&state.pool, &email).await? {
        Some(existing) => patients::promote_to_admin(&state.pool, existing.id, &password_hash).await?,
        None => {
            patients::create_patient(
                &state.pool,
                NewPatient {
                    name: validation::required("ADMIN_NAME", &admin.name)?,
                    email,
                    phone: None,
                    gender: None,
                    date_of_birth: None,
                    address: None,
                    password_hash,
                    role: Role::Admin,
                },
            )
            .await?
        }
    };
    tracing::info!(patient_id = %patient.id, email = %patient.email, "admin account ready");
    Ok(Some(patient))
}

/// Patient behind the `Authorization: Bearer <token>` header.
pub async fn current_patient(state: &AppState, headers: &HeaderMap) -> ClinicResult<Patient> {
    let unauthorized = || ClinicError::Unauthorized("Missing or invalid session token".to_string());

    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .and_then(|v| Uuid::parse_str(v.trim()).ok())
        .ok_or_else(unauthorized)?;

    let session = patients::find_session(&state.pool, token)
        .await?
        .ok_or_else(unauthorized)?;
    patients::get_patient(&state.pool, session.patient_id).await
}

// --- axum handlers ---

pub async fn handle_register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> ClinicResult<impl IntoResponse> {
    let patient = register(&state, req).await?;
    Ok(created("Registration successful", patient))
}

pub async fn handle_login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ClinicResult<impl IntoResponse> {
    let session = login(&state, req, None).await?;
    Ok(done("Login successful", session))
}

pub async fn handle_admin_login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ClinicResult<impl IntoResponse> {
    let session = login(&state, req, Some(Role::Admin)).await?;
    Ok(done("Login successful", session))
}

pub async fn handle_me(State(state): State<AppState>, headers: HeaderMap) -> ClinicResult<impl IntoResponse> {
    let patient = current_patient(&state, &headers).await?;
    Ok(ok(patient))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hashes_verify_only_the_original_password() {
        let hash = hash_password("secret123").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("secret123", &hash));
        assert!(!verify_password("secret124", &hash));
    }

    #[test]
    fn garbage_hashes_never_verify() {
        assert!(!verify_password("anything", "not-a-phc-string"));
    }
}
