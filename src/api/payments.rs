use axum::extract::State;
use axum::response::IntoResponse;
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;

use super::extract::{Json, Path, Query};
use super::{created, done, ok, AppState};
use crate::clinic::billing::ServiceLineInput;
use crate::clinic::models::Payment;
use crate::clinic::{price_invoice, validation};
use crate::database::payments::{self, NewPayment, Settlement};
use crate::database::patients;
use crate::error::{ClinicError, ClinicResult};

/// Invoice request. Subtotal, total and balance are computed from the lines.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePaymentRequest {
    pub invoice_number: Option<String>,
    pub patient_id: Option<Uuid>,
    pub doctor_id: Option<Uuid>,
    pub patient_name: Option<String>,
    pub services: Vec<ServiceLineInput>,
    #[serde(default)]
    pub discount: Decimal,
    #[serde(default)]
    pub tax: Decimal,
    #[serde(default)]
    pub amount_paid: Decimal,
    pub payment_method: String,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettlementRequest {
    pub amount_paid: Option<Decimal>,
    pub payment_method: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentQuery {
    pub patient_id: Option<Uuid>,
    pub status: Option<String>,
}

pub async fn create_payment(state: &AppState, req: CreatePaymentRequest) -> ClinicResult<Payment> {
    let totals = price_invoice(req.services, req.discount, req.tax, req.amount_paid)?;
    let payment_method = validation::choice(&req.payment_method)?;

    let patient_name = match (validation::optional(req.patient_name), req.patient_id) {
        (Some(name), _) => name,
        (None, Some(id)) => patients::get_patient(&state.pool, id).await?.name,
        (None, None) => return Err(ClinicError::validation("patientName or patientId is required")),
    };

    let payment = payments::create_payment(
        &state.pool,
        NewPayment {
            invoice_number: validation::optional(req.invoice_number),
            patient_id: req.patient_id,
            doctor_id: req.doctor_id,
            patient_name,
            payment_method,
            notes: validation::optional(req.notes),
            totals,
        },
    )
    .await?;
    tracing::info!(
        payment_id = %payment.id,
        invoice = %payment.invoice_number,
        total = %payment.total_amount,
        status = %payment.status,
        "invoice issued"
    );
    Ok(payment)
}

pub async fn settle_payment(state: &AppState, id: Uuid, req: SettlementRequest) -> ClinicResult<Payment> {
    let settlement = Settlement {
        amount_paid: req.amount_paid,
        payment_method: req.payment_method.as_deref().map(validation::choice).transpose()?,
        notes: validation::optional(req.notes),
    };
    let payment = payments::settle_payment(&state.pool, id, settlement).await?;
    tracing::info!(payment_id = %id, paid = %payment.amount_paid, status = %payment.status, "payment recorded");
    Ok(payment)
}

// --- axum handlers ---

pub async fn handle_create(
    State(state): State<AppState>,
    Json(req): Json<CreatePaymentRequest>,
) -> ClinicResult<impl IntoResponse> {
    let payment = create_payment(&state, req).await?;
    Ok(created("Invoice created", payment))
}

pub async fn handle_list(
    State(state): State<AppState>,
    Query(q): Query<PaymentQuery>,
) -> ClinicResult<impl IntoResponse> {
    let status = q.status.as_deref().map(validation::choice).transpose()?;
    Ok(ok(payments::list_payments(&state.pool, q.patient_id, status).await?))
}

pub async fn handle_get(State(state): State<AppState>, Path(id): Path<Uuid>) -> ClinicResult<impl IntoResponse> {
    Ok(ok(payments::get_payment(&state.pool, id).await?))
}

pub async fn handle_settle(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<SettlementRequest>,
) -> ClinicResult<impl IntoResponse> {
    let payment = settle_payment(&state, id, req).await?;
    Ok(done("Payment updated", payment))
}

pub async fn handle_delete(State(state): State<AppState>, Path(id): Path<Uuid>) -> ClinicResult<impl IntoResponse> {
    payments::delete_payment(&state.pool, id).await?;
    Ok(done("Invoice deleted", serde_json::Value::Null))
}
