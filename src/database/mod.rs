// Postgres access. One module per table group; every function takes the pool
// (or a transaction) explicitly.
pub mod appointments;
pub mod consultations;
pub mod doctors;
pub mod inventory;
pub mod patients;
pub mod payments;
pub mod products;
pub mod purchase_orders;
pub mod restock;
pub mod suppliers;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use crate::config::Config;

pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

/// Opens the pool and brings the schema up to date.
pub async fn connect(config: &Config) -> Result<PgPool, sqlx::Error> {
    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .connect(&config.database_url)
        .await?;

    MIGRATOR.run(&pool).await?;
    Ok(pool)
}

/// Next value of a named sequence; used for human-facing document numbers.
pub(crate) async fn next_sequence<'e, E>(executor: E, sequence: &str) -> Result<i64, sqlx::Error>
where
    E: sqlx::PgExecutor<'e>,
{
    sqlx::query_scalar("SELECT nextval($1::regclass)")
        .bind(sequence)
        .fetch_one(executor)
        .await
}
