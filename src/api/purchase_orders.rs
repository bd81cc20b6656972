use axum::extract::State;
use axum::response::IntoResponse;
use chrono::NaiveDate;
use serde::Deserialize;
use uuid::Uuid;

use super::extract::{Json, Path, Query};
use super::{created, done, ok, AppState};
use crate::clinic::billing::PurchaseLineInput;
use crate::clinic::models::PurchaseOrder;
use crate::clinic::{price_purchase_order, validation};
use crate::database::purchase_orders::{self, NewPurchaseOrder, PurchaseOrderUpdate};
use crate::database::suppliers;
use crate::error::ClinicResult;

/// Line items only: totals are always derived here.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePurchaseOrderRequest {
    pub order_number: Option<String>,
    pub supplier_id: Uuid,
    pub items: Vec<PurchaseLineInput>,
    pub expected_delivery: Option<NaiveDate>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePurchaseOrderRequest {
    pub status: Option<String>,
    pub items: Option<Vec<PurchaseLineInput>>,
    pub expected_delivery: Option<NaiveDate>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseOrderQuery {
    pub supplier_id: Option<Uuid>,
    pub status: Option<String>,
}

pub async fn create_purchase_order(state: &AppState, req: CreatePurchaseOrderRequest) -> ClinicResult<PurchaseOrder> {
    let (items, total_amount) = price_purchase_order(req.items)?;
    let supplier = suppliers::get_supplier(&state.pool, req.supplier_id).await?;

    let order = purchase_orders::create_purchase_order(
        &state.pool,
        NewPurchaseOrder {
            order_number: validation::optional(req.order_number),
            supplier_id: supplier.id,
            items,
            total_amount,
            expected_delivery: req.expected_delivery,
            notes: validation::optional(req.notes),
        },
    )
    .await?;
    tracing::info!(
        order_id = %order.id,
        order_number = %order.order_number,
        total = %order.total_amount,
        "purchase order created"
    );
    Ok(order)
}

pub async fn update_purchase_order(
    state: &AppState,
    id: Uuid,
    req: UpdatePurchaseOrderRequest,
) -> ClinicResult<PurchaseOrder> {
    let update = PurchaseOrderUpdate {
        status: req.status.as_deref().map(validation::choice).transpose()?,
        expected_delivery: req.expected_delivery,
        notes: validation::optional(req.notes),
        items: req.items.map(price_purchase_order).transpose()?,
    };
    let order = purchase_orders::update_purchase_order(&state.pool, id, update).await?;
    tracing::info!(order_id = %id, status = %order.status, "purchase order updated");
    Ok(order)
}

// --- axum handlers ---

pub async fn handle_create(
    State(state): State<AppState>,
    Json(req): Json<CreatePurchaseOrderRequest>,
) -> ClinicResult<impl IntoResponse> {
    let order = create_purchase_order(&state, req).await?;
    Ok(created("Purchase order created", order))
}

pub async fn handle_list(
    State(state): State<AppState>,
    Query(q): Query<PurchaseOrderQuery>,
) -> ClinicResult<impl IntoResponse> {
    let status = q.status.as_deref().map(validation::choice).transpose()?;
    Ok(ok(purchase_orders::list_purchase_orders(&state.pool, q.supplier_id, status).await?))
}

pub async fn handle_get(State(state): State<AppState>, Path(id): Path<Uuid>) -> ClinicResult<impl IntoResponse> {
    Ok(ok(purchase_orders::get_purchase_order(&state.pool, id).await?))
}

pub async fn handle_update(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdatePurchaseOrderRequest>,
) -> ClinicResult<impl IntoResponse> {
    let order = update_purchase_order(&state, id, req).await?;
    Ok(done("Purchase order updated", order))
}

pub async fn handle_delete(State(state): State<AppState>, Path(id): Path<Uuid>) -> ClinicResult<impl IntoResponse> {
    purchase_orders::delete_purchase_order(&state.pool, id).await?;
    Ok(done("Purchase order deleted", serde_json::Value::Null))
}
