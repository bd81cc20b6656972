use std::collections::HashMap;

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::clinic::ids::{self, PURCHASE_ORDER_PREFIX};
use crate::clinic::models::{PurchaseOrder, PurchaseOrderItem};
use crate::clinic::{plan_transition, PurchaseOrderStatus, Transition};
use crate::error::{map_constraint, ClinicError, ClinicResult};

/// Lines arrive already priced; `total_amount` is their sum.
pub struct NewPurchaseOrder {
    pub order_number: Option<String>,
    pub supplier_id: Uuid,
    pub items: Vec<PurchaseOrderItem>,
    pub total_amount: Decimal,
    pub expected_delivery: Option<NaiveDate>,
    pub notes: Option<String>,
}

#[derive(Default)]
pub struct PurchaseOrderUpdate {
    pub status: Option<PurchaseOrderStatus>,
    pub expected_delivery: Option<NaiveDate>,
    pub notes: Option<String>,
    /// Replacement lines and their total.
    pub items: Option<(Vec<PurchaseOrderItem>, Decimal)>,
}

async fn insert_items(
    tx: &mut Transaction<'_, Postgres>,
    order_id: Uuid,
    items: &[PurchaseOrderItem],
) -> Result<(), sqlx::Error> {
    for (position, item) in items.iter().enumerate() {
        sqlx::query(
            r#"
            INSERT INTO purchase_order_items
                (id, order_id, position, product, quantity, unit_price, total_price)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(order_id)
        .bind(position as i32)
        .bind(&item.product)
        .bind(item.quantity)
        .bind(item.unit_price)
        .bind(item.total_price)
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}

async fn load_items(pool: &PgPool, order_id: Uuid) -> Result<Vec<PurchaseOrderItem>, sqlx::Error> {
    sqlx::query_as::<_, PurchaseOrderItem>(
        r#"
        SELECT product, quantity, unit_price, total_price
        FROM purchase_order_items
        WHERE order_id = $1
        ORDER BY position
        "#,
    )
    .bind(order_id)
    .fetch_all(pool)
    .await
}

/// Order and lines in one transaction. Without an explicit number one is
/// drawn from `purchase_order_number_seq`.
pub async fn create_purchase_order(pool: &PgPool, new: NewPurchaseOrder) -> ClinicResult<PurchaseOrder> {
    let mut tx = pool.begin().await?;

    let order_number = match new.order_number {
        Some(number) => number,
        None => {
            let seq = super::next_sequence(&mut *tx, "purchase_order_number_seq").await?;
            ids::document_number(PURCHASE_ORDER_PREFIX, Utc::now().date_naive(), seq)
        }
    };

    let mut order = sqlx::query_as::<_, PurchaseOrder>(
        r#"
        INSERT INTO purchase_orders
            (id, order_number, supplier_id, total_amount, status, expected_delivery, notes)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(&order_number)
    .bind(new.supplier_id)
    .bind(new.total_amount)
    .bind(PurchaseOrderStatus::Pending.as_str())
    .bind(new.expected_delivery)
    .bind(&new.notes)
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| map_constraint(e, "Order number already exists", "Supplier not found"))?;

    insert_items(&mut tx, order.id, &new.items).await?;
    tx.commit().await?;

    order.items = new.items;
    Ok(order)
}

pub async fn get_purchase_order(pool: &PgPool, id: Uuid) -> ClinicResult<PurchaseOrder> {
    let mut order = sqlx::query_as::<_, PurchaseOrder>("SELECT * FROM purchase_orders WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| ClinicError::not_found("Purchase order"))?;
    order.items = load_items(pool, id).await?;
    Ok(order)
}

pub async fn list_purchase_orders(
    pool: &PgPool,
    supplier_id: Option<Uuid>,
    status: Option<PurchaseOrderStatus>,
) -> ClinicResult<Vec<PurchaseOrder>> {
    let mut orders = sqlx::query_as::<_, PurchaseOrder>(
        r#"
        SELECT * FROM purchase_orders
        WHERE ($1::uuid IS NULL OR supplier_id = $1)
          AND ($2::text IS NULL OR status = $2)
        ORDER BY created_at DESC
        "#,
    )
    .bind(supplier_id)
    .bind(status.map(|s| s.as_str()))
    .fetch_all(pool)
    .await?;

    let ids: Vec<Uuid> = orders.iter().map(|o| o.id).collect();
    let rows = sqlx::query_as::<_, (Uuid, String, i32, Decimal, Decimal)>(
        r#"
        SELECT order_id, product, quantity, unit_price, total_price
        FROM purchase_order_items
        WHERE order_id = ANY($1)
        ORDER BY position
        "#,
    )
    .bind(&ids)
    .fetch_all(pool)
    .await?;

    let mut by_order: HashMap<Uuid, Vec<PurchaseOrderItem>> = HashMap::new();
    for (order_id, product, quantity, unit_price, total_price) in rows {
        by_order.entry(order_id).or_default().push(PurchaseOrderItem {
            product,
            quantity,
            unit_price,
            total_price,
        });
    }
    for o in &mut orders {
        o.items = by_order.remove(&o.id).unwrap_or_default();
    }
    Ok(orders)
}

/// Applies an edit under a row lock. Lines can only be replaced while the
/// order is still pending, checked against the status before this edit.
pub async fn update_purchase_order(
    pool: &PgPool,
    id: Uuid,
    update: PurchaseOrderUpdate,
) -> ClinicResult<PurchaseOrder> {
    let mut tx = pool.begin().await?;

    let current = sqlx::query_as::<_, PurchaseOrder>("SELECT * FROM purchase_orders WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| ClinicError::not_found("Purchase order"))?;

    if update.items.is_some() && current.status != PurchaseOrderStatus::Pending {
        return Err(ClinicError::validation(format!(
            "Items can only be changed while the order is pending (currently {})",
            current.status
        )));
    }

    let status = match update.status {
        Some(next) => match plan_transition(current.status, next)? {
            Transition::Unchanged => current.status,
            Transition::Move { to, .. } => to,
        },
        None => current.status,
    };

    let total_amount = match &update.items {
        Some((items, total)) => {
            sqlx::query("DELETE FROM purchase_order_items WHERE order_id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await?;
            insert_items(&mut tx, id, items).await?;
            *total
        }
        None => current.total_amount,
    };

    sqlx::query(
        r#"
        UPDATE purchase_orders SET
            status            = $2,
            total_amount      = $3,
            expected_delivery = COALESCE($4, expected_delivery),
            notes             = COALESCE($5, notes),
            updated_at        = now()
        WHERE id = $1
        "#,
    )
    .bind(id)
    .bind(status.as_str())
    .bind(total_amount)
    .bind(update.expected_delivery)
    .bind(update.notes)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    get_purchase_order(pool, id).await
}

pub async fn delete_purchase_order(pool: &PgPool, id: Uuid) -> ClinicResult<()> {
    let result = sqlx::query("DELETE FROM purchase_orders WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(ClinicError::not_found("Purchase order"));
    }
    Ok(())
}
