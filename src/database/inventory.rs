use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::clinic::models::{DisposalRecord, SurgicalItem};
use crate::clinic::plan_disposal;
use crate::error::{map_constraint, map_in_use, ClinicError, ClinicResult};

pub struct NewSurgicalItem {
    pub name: String,
    pub category: String,
    pub quantity: i32,
    pub min_stock_level: i32,
    pub price: Decimal,
    pub supplier_id: Option<Uuid>,
}

/// Metadata edit. Quantity only moves through disposal and restock delivery.
#[derive(Default)]
pub struct SurgicalItemUpdate {
    pub name: Option<String>,
    pub category: Option<String>,
    pub min_stock_level: Option<i32>,
    pub price: Option<Decimal>,
    /// `Some(None)` unlinks the supplier; `None` keeps it.
    pub supplier_id: Option<Option<Uuid>>,
}

pub struct DisposalRequest {
    pub quantity: i32,
    pub reason: String,
    pub disposed_by: String,
}

pub async fn create_item(pool: &PgPool, new: NewSurgicalItem) -> ClinicResult<SurgicalItem> {
    sqlx::query_as::<_, SurgicalItem>(
        r#"
        INSERT INTO surgical_items (id, name, category, quantity, min_stock_level, price, supplier_id)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(&new.name)
    .bind(&new.category)
    .bind(new.quantity)
    .bind(new.min_stock_level)
    .bind(new.price)
    .bind(new.supplier_id)
    .fetch_one(pool)
    .await
    .map_err(|e| map_constraint(e, "Item already exists", "Supplier not found"))
}

pub async fn get_item(pool: &PgPool, id: Uuid) -> ClinicResult<SurgicalItem> {
    sqlx::query_as::<_, SurgicalItem>("SELECT * FROM surgical_items WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| ClinicError::not_found("Surgical item"))
}

/// `low_stock` keeps only items at or below their minimum level.
pub async fn list_items(
    pool: &PgPool,
    category: Option<&str>,
    low_stock: bool,
) -> ClinicResult<Vec<SurgicalItem>> {
    let rows = sqlx::query_as::<_, SurgicalItem>(
        r#"
        SELECT * FROM surgical_items
        WHERE ($1::text IS NULL OR category = $1)
          AND (NOT $2 OR quantity <= min_stock_level)
        ORDER BY name
        "#,
    )
    .bind(category)
    .bind(low_stock)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

pub async fn update_item(pool: &PgPool, id: Uuid, update: SurgicalItemUpdate) -> ClinicResult<SurgicalItem> {
    sqlx::query_as::<_, SurgicalItem>(
        r#"
        UPDATE surgical_items SET
            name            = COALESCE($2, name),
            category        = COALESCE($3, category),
            min_stock_level = COALESCE($4, min_stock_level),
            price           = COALESCE($5, price),
            supplier_id     = CASE WHEN $6 THEN $7 ELSE supplier_id END,
            updated_at      = now()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(update.name)
    .bind(update.category)
    .bind(update.min_stock_level)
    .bind(update.price)
    .bind(update.supplier_id.is_some())
    .bind(update.supplier_id.flatten())
    .fetch_optional(pool)
    .await
    .map_err(|e| map_constraint(e, "Item already exists", "Supplier not found"))?
    .ok_or_else(|| ClinicError::not_found("Surgical item"))
}

pub async fn delete_item(pool: &PgPool, id: Uuid) -> ClinicResult<()> {
    let result = sqlx::query("DELETE FROM surgical_items WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await
        .map_err(|e| map_in_use(e, "Surgical item is still referenced"))?;
    if result.rows_affected() == 0 {
        return Err(ClinicError::not_found("Surgical item"));
    }
    Ok(())
}

/// Decrements stock and writes the disposal record in one transaction.
///
/// The decrement only applies while enough stock remains, so concurrent
/// disposals can never drive the quantity below zero.
pub async fn dispose_item(
    pool: &PgPool,
    id: Uuid,
    request: DisposalRequest,
) -> ClinicResult<(SurgicalItem, DisposalRecord)> {
    if request.quantity < 1 {
        return Err(ClinicError::validation("quantityDisposed must be at least 1"));
    }

    let mut tx = pool.begin().await?;

    let updated = sqlx::query_as::<_, SurgicalItem>(
        r#"
        UPDATE surgical_items
        SET quantity = quantity - $2, updated_at = now()
        WHERE id = $1 AND quantity >= $2
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(request.quantity)
    .fetch_optional(&mut *tx)
    .await?;

    let Some(item) = updated else {
        let available: Option<i32> = sqlx::query_scalar("SELECT quantity FROM surgical_items WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        return Err(match available {
            None => ClinicError::not_found("Surgical item"),
            Some(available) => ClinicError::InsufficientStock { requested: request.quantity, available },
        });
    };

    let plan = plan_disposal(item.quantity + request.quantity, item.price, request.quantity)?;
    let record = sqlx::query_as::<_, DisposalRecord>(
        r#"
        INSERT INTO disposal_records
            (id, item_id, item_name, quantity_disposed, previous_quantity, remaining_quantity,
             reason, disposed_by, estimated_value)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(item.id)
    .bind(&item.name)
    .bind(plan.quantity_disposed)
    .bind(plan.previous_quantity)
    .bind(plan.remaining_quantity)
    .bind(&request.reason)
    .bind(&request.disposed_by)
    .bind(plan.estimated_value)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok((item, record))
}

pub async fn list_disposals(pool: &PgPool, item_id: Option<Uuid>) -> ClinicResult<Vec<DisposalRecord>> {
    let rows = sqlx::query_as::<_, DisposalRecord>(
        r#"
        SELECT * FROM disposal_records
        WHERE $1::uuid IS NULL OR item_id = $1
        ORDER BY disposed_date DESC
        "#,
    )
    .bind(item_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}
