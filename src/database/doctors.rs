use std::collections::HashMap;

use sqlx::PgPool;
use uuid::Uuid;

use crate::clinic::models::{AvailabilityWindow, Doctor};
use crate::error::{map_in_use, ClinicError, ClinicResult};

pub struct NewDoctor {
    pub name: String,
    pub specialization: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub availability: Vec<AvailabilityWindow>,
}

/// Doctor and availability are written together.
pub async fn create_doctor(pool: &PgPool, new: NewDoctor) -> ClinicResult<Doctor> {
    let mut tx = pool.begin().await?;

    let mut doctor = sqlx::query_as::<_, Doctor>(
        r#"
        INSERT INTO doctors (id, name, specialization, email, phone)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(&new.name)
    .bind(&new.specialization)
    .bind(&new.email)
    .bind(&new.phone)
    .fetch_one(&mut *tx)
    .await?;

    for w in &new.availability {
        sqlx::query(
            "INSERT INTO doctor_availability (id, doctor_id, day, start_time, end_time) VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(Uuid::new_v4())
        .bind(doctor.id)
        .bind(&w.day)
        .bind(&w.start_time)
        .bind(&w.end_time)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    doctor.availability = new.availability;
    Ok(doctor)
}

/// Doctor with availability, or `None`.
pub async fn find_doctor(pool: &PgPool, id: Uuid) -> ClinicResult<Option<Doctor>> {
    let Some(mut doctor) = sqlx::query_as::<_, Doctor>("SELECT * FROM doctors WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?
    else {
        return Ok(None);
    };

    doctor.availability = sqlx::query_as::<_, AvailabilityWindow>(
        "SELECT day, start_time, end_time FROM doctor_availability WHERE doctor_id = $1 ORDER BY day, start_time",
    )
    .bind(id)
    .fetch_all(pool)
    .await?;
    Ok(Some(doctor))
}

pub async fn get_doctor(pool: &PgPool, id: Uuid) -> ClinicResult<Doctor> {
    find_doctor(pool, id)
        .await?
        .ok_or_else(|| ClinicError::not_found("Doctor"))
}

pub async fn list_doctors(pool: &PgPool, specialization: Option<&str>) -> ClinicResult<Vec<Doctor>> {
    let mut doctors = sqlx::query_as::<_, Doctor>(
        r#"
        SELECT * FROM doctors
        WHERE $1::text IS NULL OR lower(specialization) = lower($1)
        ORDER BY name
        "#,
    )
    .bind(specialization)
    .fetch_all(pool)
    .await?;

    let ids: Vec<Uuid> = doctors.iter().map(|d| d.id).collect();
    let rows = sqlx::query_as::<_, (Uuid, String, String, String)>(
        r#"
        SELECT doctor_id, day, start_time, end_time
        FROM doctor_availability
        WHERE doctor_id = ANY($1)
        ORDER BY day, start_time
        "#,
    )
    .bind(&ids)
    .fetch_all(pool)
    .await?;

    let mut by_doctor: HashMap<Uuid, Vec<AvailabilityWindow>> = HashMap::new();
    for (doctor_id, day, start_time, end_time) in rows {
        by_doctor
            .entry(doctor_id)
            .or_default()
            .push(AvailabilityWindow { day, start_time, end_time });
    }
    for d in &mut doctors {
        d.availability = by_doctor.remove(&d.id).unwrap_or_default();
    }
    Ok(doctors)
}

/// Fails with `Conflict` while appointments, consultations or payments still
/// point at the doctor.
pub async fn delete_doctor(pool: &PgPool, id: Uuid) -> ClinicResult<()> {
    let result = sqlx::query("DELETE FROM doctors WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await
        .map_err(|e| map_in_use(e, "Doctor still has appointments, consultations or payments"))?;

    if result.rows_affected() == 0 {
        return Err(ClinicError::not_found("Doctor"));
    }
    Ok(())
}
