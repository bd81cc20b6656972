//! HTTP surface. Each submodule owns one resource; handlers follow the same
//! shape: a core function taking `&AppState` plus a thin `handle_*` wrapper
//! that does the axum extraction.

pub mod appointments;
pub mod auth;
pub mod consultations;
pub mod doctors;
pub mod extract;
pub mod inventory;
pub mod patients;
pub mod payments;
pub mod products;
pub mod purchase_orders;
pub mod reports;
pub mod suppliers;

use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde::Serialize;
use sqlx::PgPool;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::notify::Notifier;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub notifier: Notifier,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(pool: PgPool, config: Config) -> Result<Self, reqwest::Error> {
        let notifier = Notifier::new(config.mail.clone())?;
        if !notifier.is_enabled() {
            tracing::info!("MAIL_GATEWAY_URL not set, e-mail notifications disabled");
        }
        Ok(Self { pool, notifier, config: Arc::new(config) })
    }
}

/// `{success, message?, data}` wrapper around every successful response.
#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub data: T,
}

pub fn ok<T: Serialize>(data: T) -> Json<Envelope<T>> {
    Json(Envelope { success: true, message: None, data })
}

pub fn done<T: Serialize>(message: &str, data: T) -> Json<Envelope<T>> {
    Json(Envelope { success: true, message: Some(message.to_string()), data })
}

pub fn created<T: Serialize>(message: &str, data: T) -> (StatusCode, Json<Envelope<T>>) {
    (StatusCode::CREATED, done(message, data))
}

async fn health() -> impl IntoResponse {
    ok(serde_json::json!({ "status": "ok" }))
}

async fn fallback() -> impl IntoResponse {
    crate::error::ClinicError::NotFound("Route not found".to_string())
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/health", get(health))
        // sample catalogue
        .route("/api/Product", get(products::handle_list).post(products::handle_create))
        .route(
            "/api/Product/:id",
            get(products::handle_get)
                .put(products::handle_update)
                .delete(products::handle_delete),
        )
        // auth
        .route("/api/auth/register", post(auth::handle_register))
        .route("/api/auth/login", post(auth::handle_login))
        .route("/api/auth/admin-login", post(auth::handle_admin_login))
        .route("/api/auth/me", get(auth::handle_me))
        // patients and doctors
        .route("/api/patients", get(patients::handle_list))
        .route("/api/patients/:id", get(patients::handle_get).put(patients::handle_update))
        .route("/api/doctors", get(doctors::handle_list).post(doctors::handle_create))
        .route("/api/doctors/:id", get(doctors::handle_get).delete(doctors::handle_delete))
        // appointments
        .route(
            "/api/appointments",
            get(appointments::handle_list).post(appointments::handle_book_appointment),
        )
        .route(
            "/api/appointments/:id",
            get(appointments::handle_get)
                .put(appointments::handle_update_status)
                .delete(appointments::handle_cancel),
        )
        // consultations
        .route(
            "/api/prescription/consultations",
            get(consultations::handle_list).post(consultations::handle_create),
        )
        .route("/api/prescription/consultations/:id", get(consultations::handle_get))
        // procurement
        .route("/api/suppliers", get(suppliers::handle_list).post(suppliers::handle_create))
        .route(
            "/api/suppliers/:id",
            get(suppliers::handle_get)
                .put(suppliers::handle_update)
                .delete(suppliers::handle_delete),
        )
        .route(
            "/api/purchaseOrders",
            get(purchase_orders::handle_list).post(purchase_orders::handle_create),
        )
        .route(
            "/api/purchaseOrders/:id",
            get(purchase_orders::handle_get)
                .put(purchase_orders::handle_update)
                .delete(purchase_orders::handle_delete),
        )
        // billing
        .route(
            "/api/financialPay/payments",
            get(payments::handle_list).post(payments::handle_create),
        )
        .route(
            "/api/financialPay/payments/:id",
            get(payments::handle_get)
                .put(payments::handle_settle)
                .delete(payments::handle_delete),
        )
        // surgical inventory; static segments win over `:id`
        .route("/api/surgical", get(inventory::handle_list).post(inventory::handle_create))
        .route("/api/surgical/disposals", get(inventory::handle_list_disposals))
        .route(
            "/api/surgical/restock-orders",
            get(inventory::handle_list_restock_orders).post(inventory::handle_create_restock_order),
        )
        .route(
            "/api/surgical/restock-orders/:id/status",
            put(inventory::handle_update_restock_status),
        )
        .route(
            "/api/surgical/:id",
            get(inventory::handle_get)
                .put(inventory::handle_update)
                .delete(inventory::handle_delete),
        )
        .route("/api/surgical/:id/dispose", post(inventory::handle_dispose))
        .route("/api/surgical/:id/restock", get(inventory::handle_restock_assessment))
        .route("/api/report/surgical", get(reports::handle_surgical_report))
        .fallback(fallback)
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
