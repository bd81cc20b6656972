use axum::extract::State;
use axum::response::IntoResponse;
use serde::Deserialize;
use uuid::Uuid;

use super::extract::{Json, Path, Query};
use super::{created, done, ok, AppState};
use crate::clinic::models::{AvailabilityWindow, Doctor};
use crate::clinic::{validate_windows, validation};
use crate::database::doctors::{self, NewDoctor};
use crate::error::ClinicResult;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateDoctorRequest {
    pub name: String,
    pub specialization: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    #[serde(default)]
    pub availability: Vec<AvailabilityWindow>,
}

#[derive(Debug, Deserialize)]
pub struct DoctorQuery {
    pub specialization: Option<String>,
}

pub async fn create_doctor(state: &AppState, req: CreateDoctorRequest) -> ClinicResult<Doctor> {
    let email = match validation::optional(req.email) {
        Some(e) => Some(validation::email(&e)?),
        None => None,
    };
    let doctor = doctors::create_doctor(
        &state.pool,
        NewDoctor {
            name: validation::required("name", &req.name)?,
            specialization: validation::required("specialization", &req.specialization)?,
            email,
            phone: validation::optional(req.phone),
            availability: validate_windows(req.availability)?,
        },
    )
    .await?;
    tracing::info!(doctor_id = %doctor.id, windows = doctor.availability.len(), "doctor created");
    Ok(doctor)
}

pub async fn handle_create(
    State(state): State<AppState>,
    Json(req): Json<CreateDoctorRequest>,
) -> ClinicResult<impl IntoResponse> {
    let doctor = create_doctor(&state, req).await?;
    Ok(created("Doctor created", doctor))
}

pub async fn handle_list(
    State(state): State<AppState>,
    Query(q): Query<DoctorQuery>,
) -> ClinicResult<impl IntoResponse> {
    let specialization = validation::optional(q.specialization);
    Ok(ok(doctors::list_doctors(&state.pool, specialization.as_deref()).await?))
}

pub async fn handle_get(State(state): State<AppState>, Path(id): Path<Uuid>) -> ClinicResult<impl IntoResponse> {
    Ok(ok(doctors::get_doctor(&state.pool, id).await?))
}

pub async fn handle_delete(State(state): State<AppState>, Path(id): Path<Uuid>) -> ClinicResult<impl IntoResponse> {
    doctors::delete_doctor(&state.pool, id).await?;
    tracing::info!(doctor_id = %id, "doctor deleted");
    Ok(done("Doctor deleted", serde_json::Value::Null))
}
