use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::clinic::models::Product;
use crate::error::{ClinicError, ClinicResult};

pub struct NewProduct {
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub quantity: i32,
}

#[derive(Default)]
pub struct ProductUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub quantity: Option<i32>,
}

pub async fn create_product(pool: &PgPool, new: NewProduct) -> ClinicResult<Product> {
    let product = sqlx::query_as::<_, Product>(
        r#"
        INSERT INTO products (id, name, description, price, quantity)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(&new.name)
    .bind(&new.description)
    .bind(new.price)
    .bind(new.quantity)
    .fetch_one(pool)
    .await?;
    Ok(product)
}

pub async fn list_products(pool: &PgPool) -> ClinicResult<Vec<Product>> {
    let products = sqlx::query_as::<_, Product>("SELECT * FROM products ORDER BY name")
        .fetch_all(pool)
        .await?;
    Ok(products)
}

pub async fn get_product(pool: &PgPool, id: Uuid) -> ClinicResult<Product> {
    sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| ClinicError::not_found("Product"))
}

pub async fn update_product(pool: &PgPool, id: Uuid, update: ProductUpdate) -> ClinicResult<Product> {
    sqlx::query_as::<_, Product>(
        r#"
        UPDATE products SET
            name        = COALESCE($2, name),
            description = COALESCE($3, description),
            price       = COALESCE($4, price),
            quantity    = COALESCE($5, quantity)
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(update.name)
    .bind(update.description)
    .bind(update.price)
    .bind(update.quantity)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| ClinicError::not_found("Product"))
}

pub async fn delete_product(pool: &PgPool, id: Uuid) -> ClinicResult<()> {
    let result = sqlx::query("DELETE FROM products WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(ClinicError::not_found("Product"));
    }
    Ok(())
}
