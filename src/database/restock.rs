use sqlx::PgPool;
use uuid::Uuid;

use crate::clinic::models::{RestockOrder, SurgicalItem};
use crate::clinic::{plan_transition, RestockAssessment, RestockStatus, Transition};
use crate::error::{map_constraint, ClinicError, ClinicResult};

pub struct NewRestockOrder {
    pub reorder_quantity: i32,
    pub supplier_id: Option<Uuid>,
    pub notes: Option<String>,
}

/// Opens a PENDING order with a snapshot of the item's stock. Stock itself is
/// untouched until delivery.
pub async fn create_restock_order(
    pool: &PgPool,
    item: &SurgicalItem,
    assessment: &RestockAssessment,
    new: NewRestockOrder,
) -> ClinicResult<RestockOrder> {
    sqlx::query_as::<_, RestockOrder>(
        r#"
        INSERT INTO restock_orders
            (id, item_id, item_name, current_stock, reorder_quantity, supplier_id, status, urgency, notes)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(item.id)
    .bind(&item.name)
    .bind(item.quantity)
    .bind(new.reorder_quantity)
    .bind(new.supplier_id)
    .bind(RestockStatus::Pending.as_str())
    .bind(assessment.urgency.as_str())
    .bind(&new.notes)
    .fetch_one(pool)
    .await
    .map_err(|e| map_constraint(e, "Restock order already exists", "Item or supplier not found"))
}

pub async fn get_restock_order(pool: &PgPool, id: Uuid) -> ClinicResult<RestockOrder> {
    sqlx::query_as::<_, RestockOrder>("SELECT * FROM restock_orders WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| ClinicError::not_found("Restock order"))
}

pub async fn list_restock_orders(
    pool: &PgPool,
    status: Option<RestockStatus>,
) -> ClinicResult<Vec<RestockOrder>> {
    let rows = sqlx::query_as::<_, RestockOrder>(
        r#"
        SELECT * FROM restock_orders
        WHERE $1::text IS NULL OR status = $1
        ORDER BY created_at DESC
        "#,
    )
    .bind(status.map(|s| s.as_str()))
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Orders not yet delivered, cancelled or failed.
pub async fn count_open_restock_orders(pool: &PgPool) -> ClinicResult<i64> {
    let open = [RestockStatus::Pending, RestockStatus::Approved, RestockStatus::Ordered];
    let statuses: Vec<&str> = open.iter().map(|s| s.as_str()).collect();
    let count = sqlx::query_scalar("SELECT count(*) FROM restock_orders WHERE status = ANY($1)")
        .bind(&statuses)
        .fetch_one(pool)
        .await?;
    Ok(count)
}

/// Moves an order through its lifecycle. Delivery adds the reordered quantity
/// to the item within the same transaction.
pub async fn update_restock_status(
    pool: &PgPool,
    id: Uuid,
    next: RestockStatus,
) -> ClinicResult<(RestockOrder, Option<SurgicalItem>)> {
    let mut tx = pool.begin().await?;

    let order = sqlx::query_as::<_, RestockOrder>("SELECT * FROM restock_orders WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| ClinicError::not_found("Restock order"))?;

    let Transition::Move { to, .. } = plan_transition(order.status, next)? else {
        return Ok((order, None));
    };

    let updated = sqlx::query_as::<_, RestockOrder>(
        "UPDATE restock_orders SET status = $2, updated_at = now() WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(to.as_str())
    .fetch_one(&mut *tx)
    .await?;

    let item = if to == RestockStatus::Delivered {
        let item = sqlx::query_as::<_, SurgicalItem>(
            r#"
            UPDATE surgical_items
            SET quantity = quantity + $2, updated_at = now()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(order.item_id)
        .bind(order.reorder_quantity)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| ClinicError::not_found("Surgical item"))?;
        Some(item)
    } else {
        None
    };

    tx.commit().await?;
    Ok((updated, item))
}
