use sqlx::PgPool;
use uuid::Uuid;

use crate::clinic::models::Supplier;
use crate::clinic::{SupplierCategory, SupplierStatus};
use crate::error::{map_constraint, map_in_use, ClinicError, ClinicResult};

const EMAIL_TAKEN: &str = "Supplier email already exists";

pub struct NewSupplier {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub category: SupplierCategory,
    pub status: SupplierStatus,
    pub rating: i16,
}

#[derive(Default)]
pub struct SupplierUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub category: Option<SupplierCategory>,
    pub status: Option<SupplierStatus>,
    pub rating: Option<i16>,
}

/// The case-insensitive unique index on email decides duplicates.
pub async fn insert_supplier(pool: &PgPool, new: NewSupplier) -> ClinicResult<Supplier> {
    sqlx::query_as::<_, Supplier>(
        r#"
        INSERT INTO suppliers (id, name, email, phone, address, category, status, rating)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(&new.name)
    .bind(&new.email)
    .bind(&new.phone)
    .bind(&new.address)
    .bind(new.category.as_str())
    .bind(new.status.as_str())
    .bind(new.rating)
    .fetch_one(pool)
    .await
    .map_err(|e| map_constraint(e, EMAIL_TAKEN, "Supplier not found"))
}

pub async fn get_supplier(pool: &PgPool, id: Uuid) -> ClinicResult<Supplier> {
    sqlx::query_as::<_, Supplier>("SELECT * FROM suppliers WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| ClinicError::not_found("Supplier"))
}

pub async fn list_suppliers(
    pool: &PgPool,
    category: Option<SupplierCategory>,
    status: Option<SupplierStatus>,
) -> ClinicResult<Vec<Supplier>> {
    let rows = sqlx::query_as::<_, Supplier>(
        r#"
        SELECT * FROM suppliers
        WHERE ($1::text IS NULL OR category = $1)
          AND ($2::text IS NULL OR status = $2)
        ORDER BY name
        "#,
    )
    .bind(category.map(|c| c.as_str()))
    .bind(status.map(|s| s.as_str()))
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

pub async fn update_supplier(pool: &PgPool, id: Uuid, update: SupplierUpdate) -> ClinicResult<Supplier> {
    sqlx::query_as::<_, Supplier>(
        r#"
        UPDATE suppliers SET
            name       = COALESCE($2, name),
            email      = COALESCE($3, email),
            phone      = COALESCE($4, phone),
            address    = COALESCE($5, address),
            category   = COALESCE($6, category),
            status     = COALESCE($7, status),
            rating     = COALESCE($8, rating),
            updated_at = now()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(update.name)
    .bind(update.email)
    .bind(update.phone)
    .bind(update.address)
    .bind(update.category.map(|c| c.as_str()))
    .bind(update.status.map(|s| s.as_str()))
    .bind(update.rating)
    .fetch_optional(pool)
    .await
    .map_err(|e| map_constraint(e, EMAIL_TAKEN, "Supplier not found"))?
    .ok_or_else(|| ClinicError::not_found("Supplier"))
}

/// Purchase orders keep their supplier; items and restock orders just lose
/// the link.
pub async fn delete_supplier(pool: &PgPool, id: Uuid) -> ClinicResult<()> {
    let result = sqlx::query("DELETE FROM suppliers WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await
        .map_err(|e| map_in_use(e, "Supplier still has purchase orders"))?;
    if result.rows_affected() == 0 {
        return Err(ClinicError::not_found("Supplier"));
    }
    Ok(())
}
