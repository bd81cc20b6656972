use axum::extract::State;
use axum::response::IntoResponse;
use chrono::NaiveDate;
use serde::Deserialize;
use uuid::Uuid;

use super::extract::{Json, Path};
use super::{done, ok, AppState};
use crate::clinic::validation;
use crate::database::patients::{self, PatientUpdate};
use crate::error::ClinicResult;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePatientRequest {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub gender: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub address: Option<String>,
}

pub async fn handle_list(State(state): State<AppState>) -> ClinicResult<impl IntoResponse> {
    Ok(ok(patients::list_patients(&state.pool).await?))
}

pub async fn handle_get(State(state): State<AppState>, Path(id): Path<Uuid>) -> ClinicResult<impl IntoResponse> {
    Ok(ok(patients::get_patient(&state.pool, id).await?))
}

pub async fn handle_update(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdatePatientRequest>,
) -> ClinicResult<impl IntoResponse> {
    let name = match req.name {
        Some(name) => Some(validation::required("name", &name)?),
        None => None,
    };
    let update = PatientUpdate {
        name,
        phone: validation::optional(req.phone),
        gender: validation::optional(req.gender),
        date_of_birth: req.date_of_birth,
        address: validation::optional(req.address),
    };
    let patient = patients::update_patient(&state.pool, id, update).await?;
    Ok(done("Profile updated", patient))
}
