use axum::extract::State;
use axum::response::IntoResponse;
use serde::Deserialize;
use uuid::Uuid;

use super::extract::{Json, Path, Query};
use super::{created, ok, AppState};
use crate::clinic::models::Consultation;
use crate::clinic::validation;
use crate::database::consultations::{self, NewConsultation};
use crate::database::{doctors, patients};
use crate::error::{ClinicError, ClinicResult};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsultationRequest {
    pub doctor_id: Uuid,
    pub patient_id: Option<Uuid>,
    pub patient_name: Option<String>,
    pub date: String,
    pub time: String,
    pub reason: String,
    pub notes: Option<String>,
    pub prescription: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsultationQuery {
    pub doctor_id: Option<Uuid>,
    pub patient_id: Option<Uuid>,
}

pub async fn record_consultation(state: &AppState, req: ConsultationRequest) -> ClinicResult<Consultation> {
    let date = validation::date("date", &req.date)?;
    let time = validation::slot_time("time", &req.time)?;
    let reason = validation::required("reason", &req.reason)?;
    let name = validation::optional(req.patient_name);

    let doctor = doctors::get_doctor(&state.pool, req.doctor_id).await?;
    let patient_name = match (req.patient_id, name) {
        (_, Some(name)) => name,
        (Some(id), None) => patients::get_patient(&state.pool, id).await?.name,
        (None, None) => return Err(ClinicError::validation("patientName or patientId is required")),
    };

    let consultation = consultations::insert_consultation(
        &state.pool,
        NewConsultation {
            doctor_id: doctor.id,
            patient_id: req.patient_id,
            patient_name,
            date,
            time,
            reason,
            notes: validation::optional(req.notes),
            prescription: validation::optional(req.prescription),
        },
    )
    .await?;
    tracing::info!(consultation_id = %consultation.id, doctor_id = %doctor.id, "consultation recorded");
    Ok(consultation)
}

pub async fn handle_create(
    State(state): State<AppState>,
    Json(req): Json<ConsultationRequest>,
) -> ClinicResult<impl IntoResponse> {
    let consultation = record_consultation(&state, req).await?;
    Ok(created("Consultation recorded", consultation))
}

pub async fn handle_list(
    State(state): State<AppState>,
    Query(q): Query<ConsultationQuery>,
) -> ClinicResult<impl IntoResponse> {
    Ok(ok(consultations::list_consultations(&state.pool, q.doctor_id, q.patient_id).await?))
}

pub async fn handle_get(State(state): State<AppState>, Path(id): Path<Uuid>) -> ClinicResult<impl IntoResponse> {
    Ok(ok(consultations::get_consultation(&state.pool, id).await?))
}
