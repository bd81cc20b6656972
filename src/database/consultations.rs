use chrono::NaiveDate;
use sqlx::PgPool;
use uuid::Uuid;

use crate::clinic::models::Consultation;
use crate::error::{map_constraint, ClinicError, ClinicResult};

pub struct NewConsultation {
    pub doctor_id: Uuid,
    pub patient_id: Option<Uuid>,
    pub patient_name: String,
    pub date: NaiveDate,
    pub time: String,
    pub reason: String,
    pub notes: Option<String>,
    pub prescription: Option<String>,
}

pub async fn insert_consultation(pool: &PgPool, new: NewConsultation) -> ClinicResult<Consultation> {
    sqlx::query_as::<_, Consultation>(
        r#"
        INSERT INTO consultations
            (id, doctor_id, patient_id, patient_name, consultation_date, consultation_time,
             reason, notes, prescription)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(new.doctor_id)
    .bind(new.patient_id)
    .bind(&new.patient_name)
    .bind(new.date)
    .bind(&new.time)
    .bind(&new.reason)
    .bind(&new.notes)
    .bind(&new.prescription)
    .fetch_one(pool)
    .await
    .map_err(|e| map_constraint(e, "Consultation already exists", "Doctor or patient not found"))
}

pub async fn get_consultation(pool: &PgPool, id: Uuid) -> ClinicResult<Consultation> {
    sqlx::query_as::<_, Consultation>("SELECT * FROM consultations WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| ClinicError::not_found("Consultation"))
}

pub async fn list_consultations(
    pool: &PgPool,
    doctor_id: Option<Uuid>,
    patient_id: Option<Uuid>,
) -> ClinicResult<Vec<Consultation>> {
    let rows = sqlx::query_as::<_, Consultation>(
        r#"
        SELECT * FROM consultations
        WHERE ($1::uuid IS NULL OR doctor_id = $1)
          AND ($2::uuid IS NULL OR patient_id = $2)
        ORDER BY consultation_date DESC, consultation_time DESC
        "#,
    )
    .bind(doctor_id)
    .bind(patient_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}
