use chrono::{DateTime, Duration, NaiveDate, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::clinic::ids;
use crate::clinic::models::{Patient, Session};
use crate::clinic::Role;
use crate::error::{map_constraint, ClinicError, ClinicResult};

pub struct NewPatient {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub gender: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub address: Option<String>,
    pub password_hash: String,
    pub role: Role,
}

#[derive(Default)]
pub struct PatientUpdate {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub gender: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub address: Option<String>,
}

pub async fn create_patient(pool: &PgPool, new: NewPatient) -> ClinicResult<Patient> {
    let mut tx = pool.begin().await?;

    let seq = super::next_sequence(&mut *tx, "patient_code_seq").await?;
    let patient = sqlx::query_as::<_, Patient>(
        r#"
        INSERT INTO patients
            (id, patient_code, name, email, phone, gender, date_of_birth, address, password_hash, role)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(ids::patient_code(seq))
    .bind(&new.name)
    .bind(&new.email)
    .bind(&new.phone)
    .bind(&new.gender)
    .bind(new.date_of_birth)
    .bind(&new.address)
    .bind(&new.password_hash)
    .bind(new.role.as_str())
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| map_constraint(e, "Email is already registered", "Patient not found"))?;

    tx.commit().await?;
    Ok(patient)
}

pub async fn find_patient_by_email(pool: &PgPool, email: &str) -> ClinicResult<Option<Patient>> {
    let patient = sqlx::query_as::<_, Patient>("SELECT * FROM patients WHERE lower(email) = lower($1)")
        .bind(email)
        .fetch_optional(pool)
        .await?;
    Ok(patient)
}

pub async fn get_patient(pool: &PgPool, id: Uuid) -> ClinicResult<Patient> {
    sqlx::query_as::<_, Patient>("SELECT * FROM patients WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| ClinicError::not_found("Patient"))
}

pub async fn list_patients(pool: &PgPool) -> ClinicResult<Vec<Patient>> {
    let patients = sqlx::query_as::<_, Patient>("SELECT * FROM patients ORDER BY created_at DESC")
        .fetch_all(pool)
        .await?;
    Ok(patients)
}

/// Profile edit; absent fields keep their stored value.
pub async fn update_patient(pool: &PgPool, id: Uuid, update: PatientUpdate) -> ClinicResult<Patient> {
    sqlx::query_as::<_, Patient>(
        r#"
        UPDATE patients SET
            name          = COALESCE($2, name),
            phone         = COALESCE($3, phone),
            gender        = COALESCE($4, gender),
            date_of_birth = COALESCE($5, date_of_birth),
            address       = COALESCE($6, address),
            updated_at    = now()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(update.name)
    .bind(update.phone)
    .bind(update.gender)
    .bind(update.date_of_birth)
    .bind(update.address)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| ClinicError::not_found("Patient"))
}

/// Gives an existing account the admin role and `password_hash`.
pub async fn promote_to_admin(pool: &PgPool, id: Uuid, password_hash: &str) -> ClinicResult<Patient> {
    sqlx::query_as::<_, Patient>(
        "UPDATE patients SET role = $2, password_hash = $3, updated_at = now() WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(Role::Admin.as_str())
    .bind(password_hash)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| ClinicError::not_found("Patient"))
}

fn session_expiry(now: DateTime<Utc>, ttl_hours: i64) -> ClinicResult<DateTime<Utc>> {
    Duration::try_hours(ttl_hours)
        .filter(|ttl| *ttl > Duration::zero())
        .and_then(|ttl| now.checked_add_signed(ttl))
        .ok_or_else(|| ClinicError::Internal(format!("session lifetime of {ttl_hours}h is out of range")))
}

pub async fn create_session(pool: &PgPool, patient: &Patient, ttl_hours: i64) -> ClinicResult<Session> {
    let expires_at = session_expiry(Utc::now(), ttl_hours)?;
    let session = sqlx::query_as::<_, Session>(
        r#"
        INSERT INTO sessions (token, patient_id, role, expires_at)
        VALUES ($1, $2, $3, $4)
        RETURNING token, patient_id, role, expires_at
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(patient.id)
    .bind(patient.role.as_str())
    .bind(expires_at)
    .fetch_one(pool)
    .await?;
    Ok(session)
}

/// Live session for `token`; expired tokens are treated as unknown.
pub async fn find_session(pool: &PgPool, token: Uuid) -> ClinicResult<Option<Session>> {
    let session = sqlx::query_as::<_, Session>(
        "SELECT token, patient_id, role, expires_at FROM sessions WHERE token = $1 AND expires_at > now()",
    )
    .bind(token)
    .fetch_optional(pool)
    .await?;
    Ok(session)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_expiry_rejects_unrepresentable_lifetimes() {
        let now = Utc::now();
        assert_eq!(session_expiry(now, 24).unwrap(), now + Duration::hours(24));
        assert!(matches!(session_expiry(now, 0), Err(ClinicError::Internal(_))));
        assert!(matches!(session_expiry(now, i64::MAX), Err(ClinicError::Internal(_))));
        assert!(matches!(session_expiry(now, 24 * 365 * 300_000), Err(ClinicError::Internal(_))));
    }
}
