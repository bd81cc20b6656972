use chrono::NaiveDate;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::clinic::models::Appointment;
use crate::clinic::AppointmentStatus;
use crate::error::{map_constraint, ClinicError, ClinicResult};

pub struct NewAppointment {
    pub doctor_id: Uuid,
    pub patient_id: Option<Uuid>,
    pub patient_name: String,
    pub patient_email: Option<String>,
    pub date: NaiveDate,
    pub time: String,
    pub reason: Option<String>,
}

#[derive(Debug, Default)]
pub struct AppointmentFilter {
    pub patient_id: Option<Uuid>,
    pub patient_email: Option<String>,
    pub doctor_id: Option<Uuid>,
    pub status: Option<AppointmentStatus>,
    pub date: Option<NaiveDate>,
}

/// Insert-or-fail on the slot index: a live booking for the same doctor, date
/// and time turns into `Conflict`.
pub async fn insert_appointment(pool: &PgPool, new: NewAppointment) -> ClinicResult<Appointment> {
    sqlx::query_as::<_, Appointment>(
        r#"
        INSERT INTO appointments
            (id, doctor_id, patient_id, patient_name, patient_email,
             appointment_date, appointment_time, reason, status)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(new.doctor_id)
    .bind(new.patient_id)
    .bind(&new.patient_name)
    .bind(&new.patient_email)
    .bind(new.date)
    .bind(&new.time)
    .bind(&new.reason)
    .bind(AppointmentStatus::Pending.as_str())
    .fetch_one(pool)
    .await
    .map_err(|e| {
        map_constraint(
            e,
            "This time slot is already booked for the selected doctor",
            "Doctor or patient not found",
        )
    })
}

pub async fn get_appointment(pool: &PgPool, id: Uuid) -> ClinicResult<Appointment> {
    sqlx::query_as::<_, Appointment>("SELECT * FROM appointments WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| ClinicError::not_found("Appointment"))
}

pub async fn list_appointments(pool: &PgPool, filter: &AppointmentFilter) -> ClinicResult<Vec<Appointment>> {
    let mut qb: QueryBuilder<Postgres> = QueryBuilder::new("SELECT * FROM appointments WHERE TRUE");
    if let Some(id) = filter.patient_id {
        qb.push(" AND patient_id = ").push_bind(id);
    }
    if let Some(email) = &filter.patient_email {
        qb.push(" AND lower(patient_email) = lower(").push_bind(email.clone()).push(")");
    }
    if let Some(id) = filter.doctor_id {
        qb.push(" AND doctor_id = ").push_bind(id);
    }
    if let Some(status) = filter.status {
        qb.push(" AND status = ").push_bind(status.as_str());
    }
    if let Some(date) = filter.date {
        qb.push(" AND appointment_date = ").push_bind(date);
    }
    qb.push(" ORDER BY appointment_date, appointment_time");

    let rows = qb.build_query_as::<Appointment>().fetch_all(pool).await?;
    Ok(rows)
}

/// Conditional on the status the caller decided from; a concurrent change in
/// between yields `Conflict`.
pub async fn set_appointment_status(
    pool: &PgPool,
    id: Uuid,
    from: AppointmentStatus,
    to: AppointmentStatus,
) -> ClinicResult<Appointment> {
    sqlx::query_as::<_, Appointment>(
        r#"
        UPDATE appointments
        SET status = $3, updated_at = now()
        WHERE id = $1 AND status = $2
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(from.as_str())
    .bind(to.as_str())
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| {
        ClinicError::Conflict("Appointment was modified concurrently, reload and retry".to_string())
    })
}
