use axum::extract::State;
use axum::response::IntoResponse;
use serde::Deserialize;
use uuid::Uuid;

use super::extract::{Json, Path, Query};
use super::{created, done, ok, AppState};
use crate::clinic::models::Supplier;
use crate::clinic::{validation, SupplierStatus};
use crate::database::suppliers::{self, NewSupplier, SupplierUpdate};
use crate::error::{ClinicError, ClinicResult};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSupplierRequest {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub category: String,
    pub status: Option<String>,
    pub rating: Option<i16>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSupplierRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub category: Option<String>,
    pub status: Option<String>,
    pub rating: Option<i16>,
}

#[derive(Debug, Deserialize)]
pub struct SupplierQuery {
    pub category: Option<String>,
    pub status: Option<String>,
}

fn rating(value: i16) -> ClinicResult<i16> {
    if !(1..=5).contains(&value) {
        return Err(ClinicError::validation("rating must be between 1 and 5"));
    }
    Ok(value)
}

pub async fn create_supplier(state: &AppState, req: CreateSupplierRequest) -> ClinicResult<Supplier> {
    let new = NewSupplier {
        name: validation::required("name", &req.name)?,
        email: validation::email(&req.email)?,
        phone: validation::optional(req.phone),
        address: validation::optional(req.address),
        category: validation::choice(&req.category)?,
        status: match req.status.as_deref() {
            Some(s) => validation::choice(s)?,
            None => SupplierStatus::Active,
        },
        rating: rating(req.rating.unwrap_or(3))?,
    };

    let email = new.email.clone();
    let supplier = suppliers::insert_supplier(&state.pool, new).await.inspect_err(|e| {
        if matches!(e, ClinicError::Conflict(_)) {
            tracing::warn!(%email, "duplicate supplier email");
        }
    })?;
    tracing::info!(supplier_id = %supplier.id, "supplier created");
    Ok(supplier)
}

pub async fn update_supplier(state: &AppState, id: Uuid, req: UpdateSupplierRequest) -> ClinicResult<Supplier> {
    let update = SupplierUpdate {
        name: req.name.as_deref().map(|n| validation::required("name", n)).transpose()?,
        email: req.email.as_deref().map(validation::email).transpose()?,
        phone: validation::optional(req.phone),
        address: validation::optional(req.address),
        category: req.category.as_deref().map(validation::choice).transpose()?,
        status: req.status.as_deref().map(validation::choice).transpose()?,
        rating: req.rating.map(rating).transpose()?,
    };
    suppliers::update_supplier(&state.pool, id, update).await
}

// --- axum handlers ---

pub async fn handle_create(
    State(state): State<AppState>,
    Json(req): Json<CreateSupplierRequest>,
) -> ClinicResult<impl IntoResponse> {
    let supplier = create_supplier(&state, req).await?;
    Ok(created("Supplier created", supplier))
}

pub async fn handle_list(
    State(state): State<AppState>,
    Query(q): Query<SupplierQuery>,
) -> ClinicResult<impl IntoResponse> {
    let category = q.category.as_deref().map(validation::choice).transpose()?;
    let status = q.status.as_deref().map(validation::choice).transpose()?;
    Ok(ok(suppliers::list_suppliers(&state.pool, category, status).await?))
}

pub async fn handle_get(State(state): State<AppState>, Path(id): Path<Uuid>) -> ClinicResult<impl IntoResponse> {
    Ok(ok(suppliers::get_supplier(&state.pool, id).await?))
}

pub async fn handle_update(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateSupplierRequest>,
) -> ClinicResult<impl IntoResponse> {
    let supplier = update_supplier(&state, id, req).await?;
    Ok(done("Supplier updated", supplier))
}

pub async fn handle_delete(State(state): State<AppState>, Path(id): Path<Uuid>) -> ClinicResult<impl IntoResponse> {
    suppliers::delete_supplier(&state.pool, id).await?;
    tracing::info!(supplier_id = %id, "supplier deleted");
    Ok(done("Supplier deleted", serde_json::Value::Null))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rating_is_bounded() {
        assert_eq!(rating(1).unwrap(), 1);
        assert_eq!(rating(5).unwrap(), 5);
        assert!(rating(0).is_err());
        assert!(rating(6).is_err());
    }
}
