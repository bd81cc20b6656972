use axum::extract::State;
use axum::response::IntoResponse;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use super::extract::{Json, Path, Query};
use super::{created, done, ok, AppState};
use crate::clinic::inventory::reorder_quantity;
use crate::clinic::models::{DisposalRecord, RestockOrder, SurgicalItem};
use crate::clinic::{validation, RestockAssessment, RestockStatus};
use crate::database::inventory::{self, DisposalRequest, NewSurgicalItem, SurgicalItemUpdate};
use crate::database::restock::{self, NewRestockOrder};
use crate::error::{ClinicError, ClinicResult};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateItemRequest {
    pub name: String,
    pub category: String,
    #[serde(default)]
    pub quantity: i32,
    #[serde(default)]
    pub min_stock_level: i32,
    pub price: Decimal,
    pub supplier_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateItemRequest {
    pub name: Option<String>,
    pub category: Option<String>,
    pub min_stock_level: Option<i32>,
    pub price: Option<Decimal>,
    /// Absent keeps the supplier, `null` unlinks it.
    #[serde(default, deserialize_with = "present")]
    pub supplier_id: Option<Option<Uuid>>,
}

/// Marks a field as sent, so an explicit `null` is distinguishable from a
/// missing key.
fn present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemQuery {
    pub category: Option<String>,
    #[serde(default)]
    pub low_stock: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisposeRequest {
    pub quantity_disposed: i32,
    pub reason: String,
    pub disposed_by: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisposalQuery {
    pub item_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestockOrderRequest {
    pub item_id: Uuid,
    pub reorder_quantity: Option<i32>,
    pub supplier_id: Option<Uuid>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RestockQuery {
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct Disposal {
    pub item: SurgicalItem,
    pub disposal: DisposalRecord,
}

#[derive(Debug, Serialize)]
pub struct ItemAssessment {
    pub item: SurgicalItem,
    pub assessment: RestockAssessment,
}

#[derive(Debug, Serialize)]
pub struct RestockProgress {
    pub order: RestockOrder,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item: Option<SurgicalItem>,
}

fn not_negative<T: PartialOrd + Default>(field: &str, value: T) -> ClinicResult<T> {
    if value < T::default() {
        return Err(ClinicError::validation(format!("{field} cannot be negative")));
    }
    Ok(value)
}

pub async fn create_item(state: &AppState, req: CreateItemRequest) -> ClinicResult<SurgicalItem> {
    let item = inventory::create_item(
        &state.pool,
        NewSurgicalItem {
            name: validation::required("name", &req.name)?,
            category: validation::required("category", &req.category)?,
            quantity: not_negative("quantity", req.quantity)?,
            min_stock_level: not_negative("minStockLevel", req.min_stock_level)?,
            price: validation::amount("price", req.price, validation::MAX_PRICE)?,
            supplier_id: req.supplier_id,
        },
    )
    .await?;
    tracing::info!(item_id = %item.id, quantity = item.quantity, "surgical item created");
    Ok(item)
}

pub async fn update_item(state: &AppState, id: Uuid, req: UpdateItemRequest) -> ClinicResult<SurgicalItem> {
    let update = SurgicalItemUpdate {
        name: req.name.as_deref().map(|n| validation::required("name", n)).transpose()?,
        category: req.category.as_deref().map(|c| validation::required("category", c)).transpose()?,
        min_stock_level: req.min_stock_level.map(|m| not_negative("minStockLevel", m)).transpose()?,
        price: req.price.map(|p| validation::amount("price", p, validation::MAX_PRICE)).transpose()?,
        supplier_id: req.supplier_id,
    };
    inventory::update_item(&state.pool, id, update).await
}

/// Removes stock and records why. Over-disposal fails without touching the
/// quantity.
pub async fn dispose(state: &AppState, id: Uuid, req: DisposeRequest) -> ClinicResult<Disposal> {
    let request = DisposalRequest {
        quantity: req.quantity_disposed,
        reason: validation::required("reason", &req.reason)?,
        disposed_by: validation::required("disposedBy", &req.disposed_by)?,
    };
    match inventory::dispose_item(&state.pool, id, request).await {
        Ok((item, disposal)) => {
            tracing::info!(
                item_id = %id,
                disposed = disposal.quantity_disposed,
                remaining = item.quantity,
                "stock disposed"
            );
            Ok(Disposal { item, disposal })
        }
        Err(e @ ClinicError::InsufficientStock { .. }) => {
            tracing::warn!(item_id = %id, "disposal rejected: {e}");
            Err(e)
        }
        Err(e) => Err(e),
    }
}

pub async fn create_restock_order(state: &AppState, req: RestockOrderRequest) -> ClinicResult<RestockOrder> {
    let item = inventory::get_item(&state.pool, req.item_id).await?;
    let assessment = item.restock_assessment();
    let quantity = reorder_quantity(req.reorder_quantity, &assessment)?;

    let order = restock::create_restock_order(
        &state.pool,
        &item,
        &assessment,
        NewRestockOrder {
            reorder_quantity: quantity,
            supplier_id: req.supplier_id.or(item.supplier_id),
            notes: validation::optional(req.notes),
        },
    )
    .await?;
    tracing::info!(order_id = %order.id, item_id = %item.id, urgency = %order.urgency, "restock order opened");
    Ok(order)
}

pub async fn update_restock_status(state: &AppState, id: Uuid, next: RestockStatus) -> ClinicResult<RestockProgress> {
    let (order, item) = restock::update_restock_status(&state.pool, id, next).await?;
    if let Some(item) = &item {
        tracing::info!(order_id = %id, item_id = %item.id, quantity = item.quantity, "restock delivered");
    }
    Ok(RestockProgress { order, item })
}

// --- axum handlers ---

pub async fn handle_create(
    State(state): State<AppState>,
    Json(req): Json<CreateItemRequest>,
) -> ClinicResult<impl IntoResponse> {
    let item = create_item(&state, req).await?;
    Ok(created("Item added to inventory", item))
}

pub async fn handle_list(
    State(state): State<AppState>,
    Query(q): Query<ItemQuery>,
) -> ClinicResult<impl IntoResponse> {
    let category = validation::optional(q.category);
    Ok(ok(inventory::list_items(&state.pool, category.as_deref(), q.low_stock).await?))
}

pub async fn handle_get(State(state): State<AppState>, Path(id): Path<Uuid>) -> ClinicResult<impl IntoResponse> {
    Ok(ok(inventory::get_item(&state.pool, id).await?))
}

pub async fn handle_update(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateItemRequest>,
) -> ClinicResult<impl IntoResponse> {
    let item = update_item(&state, id, req).await?;
    Ok(done("Item updated", item))
}

pub async fn handle_delete(State(state): State<AppState>, Path(id): Path<Uuid>) -> ClinicResult<impl IntoResponse> {
    inventory::delete_item(&state.pool, id).await?;
    Ok(done("Item deleted", serde_json::Value::Null))
}

pub async fn handle_dispose(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<DisposeRequest>,
) -> ClinicResult<impl IntoResponse> {
    let disposal = dispose(&state, id, req).await?;
    Ok(created("Item disposed", disposal))
}

pub async fn handle_restock_assessment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ClinicResult<impl IntoResponse> {
    let item = inventory::get_item(&state.pool, id).await?;
    let assessment = item.restock_assessment();
    Ok(ok(ItemAssessment { item, assessment }))
}

pub async fn handle_list_disposals(
    State(state): State<AppState>,
    Query(q): Query<DisposalQuery>,
) -> ClinicResult<impl IntoResponse> {
    Ok(ok(inventory::list_disposals(&state.pool, q.item_id).await?))
}

pub async fn handle_create_restock_order(
    State(state): State<AppState>,
    Json(req): Json<RestockOrderRequest>,
) -> ClinicResult<impl IntoResponse> {
    let order = create_restock_order(&state, req).await?;
    Ok(created("Restock order created", order))
}

pub async fn handle_list_restock_orders(
    State(state): State<AppState>,
    Query(q): Query<RestockQuery>,
) -> ClinicResult<impl IntoResponse> {
    let status = q.status.as_deref().map(validation::choice).transpose()?;
    Ok(ok(restock::list_restock_orders(&state.pool, status).await?))
}

pub async fn handle_update_restock_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<StatusRequest>,
) -> ClinicResult<impl IntoResponse> {
    let next = validation::choice(&req.status)?;
    let progress = update_restock_status(&state, id, next).await?;
    Ok(done("Restock order updated", progress))
}
