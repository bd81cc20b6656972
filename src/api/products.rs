use axum::extract::State;
use axum::response::IntoResponse;
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;

use super::extract::{Json, Path};
use super::{created, done, ok, AppState};
use crate::clinic::validation;
use crate::database::products::{self, NewProduct, ProductUpdate};
use crate::error::{ClinicError, ClinicResult};

#[derive(Debug, Deserialize)]
pub struct ProductRequest {
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    #[serde(default)]
    pub quantity: i32,
}

#[derive(Debug, Deserialize)]
pub struct ProductPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub quantity: Option<i32>,
}

fn check_quantity(quantity: Option<i32>) -> ClinicResult<()> {
    if quantity.is_some_and(|q| q < 0) {
        return Err(ClinicError::validation("quantity cannot be negative"));
    }
    Ok(())
}

fn price(value: Decimal) -> ClinicResult<Decimal> {
    validation::amount("price", value, validation::MAX_PRICE)
}

pub async fn handle_list(State(state): State<AppState>) -> ClinicResult<impl IntoResponse> {
    Ok(ok(products::list_products(&state.pool).await?))
}

pub async fn handle_create(
    State(state): State<AppState>,
    Json(req): Json<ProductRequest>,
) -> ClinicResult<impl IntoResponse> {
    check_quantity(Some(req.quantity))?;
    let product = products::create_product(
        &state.pool,
        NewProduct {
            name: validation::required("name", &req.name)?,
            description: validation::optional(req.description),
            price: price(req.price)?,
            quantity: req.quantity,
        },
    )
    .await?;
    Ok(created("Product created", product))
}

pub async fn handle_get(State(state): State<AppState>, Path(id): Path<Uuid>) -> ClinicResult<impl IntoResponse> {
    Ok(ok(products::get_product(&state.pool, id).await?))
}

pub async fn handle_update(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<ProductPatch>,
) -> ClinicResult<impl IntoResponse> {
    check_quantity(req.quantity)?;
    let update = ProductUpdate {
        name: req.name.as_deref().map(|n| validation::required("name", n)).transpose()?,
        description: validation::optional(req.description),
        price: req.price.map(price).transpose()?,
        quantity: req.quantity,
    };
    Ok(done("Product updated", products::update_product(&state.pool, id, update).await?))
}

pub async fn handle_delete(State(state): State<AppState>, Path(id): Path<Uuid>) -> ClinicResult<impl IntoResponse> {
    products::delete_product(&state.pool, id).await?;
    Ok(done("Product deleted", serde_json::Value::Null))
}
