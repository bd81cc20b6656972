use axum::extract::State;
use axum::response::IntoResponse;
use serde::Deserialize;
use uuid::Uuid;

use super::extract::{Json, Path, Query};
use super::{created, done, ok, AppState};
use crate::clinic::models::Appointment;
use crate::clinic::{check_availability, plan_transition, validation, AppointmentStatus, Transition};
use crate::database::appointments::{self, AppointmentFilter, NewAppointment};
use crate::database::{doctors, patients};
use crate::error::{ClinicError, ClinicResult};

const MISSING_PATIENT: &str = "patientName or patientId is required";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingRequest {
    pub doctor_id: Uuid,
    pub date: String,
    pub time: String,
    pub patient_id: Option<Uuid>,
    pub patient_name: Option<String>,
    pub patient_email: Option<String>,
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentQuery {
    pub patient_id: Option<Uuid>,
    pub patient_email: Option<String>,
    pub doctor_id: Option<Uuid>,
    pub status: Option<String>,
    pub date: Option<String>,
}

/// Validates the request, checks the doctor's weekly hours and inserts a
/// Pending appointment. The slot index turns a double booking into
/// `Conflict`.
pub async fn book_appointment(state: &AppState, req: BookingRequest) -> ClinicResult<Appointment> {
    let time = validation::slot_time("time", &req.time)?;
    let date = validation::date("date", &req.date)?;
    let name = validation::optional(req.patient_name);
    let email = match validation::optional(req.patient_email) {
        Some(e) => Some(validation::email(&e)?),
        None => None,
    };
    if req.patient_id.is_none() && name.is_none() {
        return Err(ClinicError::validation(MISSING_PATIENT));
    }

    let doctor = doctors::get_doctor(&state.pool, req.doctor_id).await?;
    if let Err(e) = check_availability(&doctor, date, &time) {
        tracing::warn!(doctor_id = %doctor.id, %date, %time, "booking rejected: {e}");
        return Err(e);
    }

    let (patient_name, patient_email) = match req.patient_id {
        Some(id) => {
            let patient = patients::get_patient(&state.pool, id).await?;
            (name.unwrap_or(patient.name), email.or(Some(patient.email)))
        }
        None => (name.ok_or_else(|| ClinicError::validation(MISSING_PATIENT))?, email),
    };

    let appointment = appointments::insert_appointment(
        &state.pool,
        NewAppointment {
            doctor_id: doctor.id,
            patient_id: req.patient_id,
            patient_name,
            patient_email,
            date,
            time,
            reason: validation::optional(req.reason),
        },
    )
    .await
    .inspect_err(|e| {
        if matches!(e, ClinicError::Conflict(_)) {
            tracing::warn!(doctor_id = %doctor.id, %date, time = %req.time, "slot already booked");
        }
    })?;

    tracing::info!(appointment_id = %appointment.id, doctor_id = %doctor.id, "appointment booked");

    if let Some(to) = appointment.patient_email.clone() {
        let notifier = state.notifier.clone();
        let booked = appointment.clone();
        tokio::spawn(async move {
            notifier.send_booking_confirmation(&to, &booked, &doctor).await;
        });
    }
    Ok(appointment)
}

/// Applies the lifecycle table; re-setting the current status changes nothing.
pub async fn update_status(state: &AppState, id: Uuid, next: AppointmentStatus) -> ClinicResult<Appointment> {
    let current = appointments::get_appointment(&state.pool, id).await?;
    match plan_transition(current.status, next)? {
        Transition::Unchanged => Ok(current),
        Transition::Move { from, to } => {
            let updated = appointments::set_appointment_status(&state.pool, id, from, to).await?;
            tracing::info!(appointment_id = %id, %from, %to, "appointment status changed");
            Ok(updated)
        }
    }
}

fn filter_from(q: AppointmentQuery) -> ClinicResult<AppointmentFilter> {
    Ok(AppointmentFilter {
        patient_id: q.patient_id,
        patient_email: validation::optional(q.patient_email),
        doctor_id: q.doctor_id,
        status: q.status.as_deref().map(validation::choice).transpose()?,
        date: q.date.as_deref().map(|d| validation::date("date", d)).transpose()?,
    })
}

// --- axum handlers ---

pub async fn handle_book_appointment(
    State(state): State<AppState>,
    Json(req): Json<BookingRequest>,
) -> ClinicResult<impl IntoResponse> {
    let appointment = book_appointment(&state, req).await?;
    Ok(created("Appointment booked successfully", appointment))
}

pub async fn handle_list(
    State(state): State<AppState>,
    Query(q): Query<AppointmentQuery>,
) -> ClinicResult<impl IntoResponse> {
    let filter = filter_from(q)?;
    Ok(ok(appointments::list_appointments(&state.pool, &filter).await?))
}

pub async fn handle_get(State(state): State<AppState>, Path(id): Path<Uuid>) -> ClinicResult<impl IntoResponse> {
    Ok(ok(appointments::get_appointment(&state.pool, id).await?))
}

pub async fn handle_update_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<StatusRequest>,
) -> ClinicResult<impl IntoResponse> {
    let next = validation::choice(&req.status)?;
    let appointment = update_status(&state, id, next).await?;
    Ok(done("Appointment updated", appointment))
}

/// DELETE cancels; the row stays for history and the slot frees up.
pub async fn handle_cancel(State(state): State<AppState>, Path(id): Path<Uuid>) -> ClinicResult<impl IntoResponse> {
    let appointment = update_status(&state, id, AppointmentStatus::Cancelled).await?;
    Ok(done("Appointment cancelled", appointment))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_filters_are_parsed() {
        let filter = filter_from(AppointmentQuery {
            status: Some("Approved".into()),
            date: Some("2026-10-19".into()),
            patient_email: Some("  ".into()),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(filter.status, Some(AppointmentStatus::Approved));
        assert!(filter.date.is_some());
        assert!(filter.patient_email.is_none());
    }

    #[test]
    fn unknown_status_filter_is_a_validation_error() {
        let err = filter_from(AppointmentQuery { status: Some("Done".into()), ..Default::default() })
            .unwrap_err();
        assert!(matches!(err, ClinicError::Validation(_)));
    }
}
