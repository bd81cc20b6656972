use chrono::Utc;
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::clinic::ids::{self, INVOICE_PREFIX};
use crate::clinic::models::{Payment, PaymentLine};
use crate::clinic::{settle, InvoiceTotals, PaymentMethod, PaymentStatus};
use crate::error::{map_constraint, ClinicError, ClinicResult};

pub struct NewPayment {
    pub invoice_number: Option<String>,
    pub patient_id: Option<Uuid>,
    pub doctor_id: Option<Uuid>,
    pub patient_name: String,
    pub payment_method: PaymentMethod,
    pub notes: Option<String>,
    pub totals: InvoiceTotals,
}

/// The only fields an issued invoice accepts.
#[derive(Default)]
pub struct Settlement {
    pub amount_paid: Option<Decimal>,
    pub payment_method: Option<PaymentMethod>,
    pub notes: Option<String>,
}

async fn load_lines(pool: &PgPool, payment_id: Uuid) -> Result<Vec<PaymentLine>, sqlx::Error> {
    sqlx::query_as::<_, PaymentLine>(
        "SELECT service, quantity, unit_price, subtotal FROM payment_lines WHERE payment_id = $1 ORDER BY position",
    )
    .bind(payment_id)
    .fetch_all(pool)
    .await
}

pub async fn create_payment(pool: &PgPool, new: NewPayment) -> ClinicResult<Payment> {
    let mut tx = pool.begin().await?;

    let invoice_number = match new.invoice_number {
        Some(number) => number,
        None => {
            let seq = super::next_sequence(&mut *tx, "invoice_number_seq").await?;
            ids::document_number(INVOICE_PREFIX, Utc::now().date_naive(), seq)
        }
    };

    let t = &new.totals;
    let mut payment = sqlx::query_as::<_, Payment>(
        r#"
        INSERT INTO payments
            (id, invoice_number, patient_id, doctor_id, patient_name, subtotal, discount, tax,
             total_amount, amount_paid, balance, payment_method, status, notes)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(&invoice_number)
    .bind(new.patient_id)
    .bind(new.doctor_id)
    .bind(&new.patient_name)
    .bind(t.subtotal)
    .bind(t.discount)
    .bind(t.tax)
    .bind(t.total_amount)
    .bind(t.amount_paid)
    .bind(t.balance)
    .bind(new.payment_method.as_str())
    .bind(t.status.as_str())
    .bind(&new.notes)
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| map_constraint(e, "Invoice number already exists", "Patient or doctor not found"))?;

    for (position, line) in t.lines.iter().enumerate() {
        sqlx::query(
            r#"
            INSERT INTO payment_lines (id, payment_id, position, service, quantity, unit_price, subtotal)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(payment.id)
        .bind(position as i32)
        .bind(&line.service)
        .bind(line.quantity)
        .bind(line.unit_price)
        .bind(line.subtotal)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    payment.lines = new.totals.lines;
    Ok(payment)
}

pub async fn get_payment(pool: &PgPool, id: Uuid) -> ClinicResult<Payment> {
    let mut payment = sqlx::query_as::<_, Payment>("SELECT * FROM payments WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| ClinicError::not_found("Payment"))?;
    payment.lines = load_lines(pool, id).await?;
    Ok(payment)
}

/// Invoice headers only; `lines` is filled by `get_payment`.
pub async fn list_payments(
    pool: &PgPool,
    patient_id: Option<Uuid>,
    status: Option<PaymentStatus>,
) -> ClinicResult<Vec<Payment>> {
    let rows = sqlx::query_as::<_, Payment>(
        r#"
        SELECT * FROM payments
        WHERE ($1::uuid IS NULL OR patient_id = $1)
          AND ($2::text IS NULL OR status = $2)
        ORDER BY issued_at DESC
        "#,
    )
    .bind(patient_id)
    .bind(status.map(|s| s.as_str()))
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Records a payment against the stored total; balance and status are
/// re-derived, lines and amounts stay as issued.
pub async fn settle_payment(pool: &PgPool, id: Uuid, settlement: Settlement) -> ClinicResult<Payment> {
    let mut tx = pool.begin().await?;

    let current = sqlx::query_as::<_, Payment>("SELECT * FROM payments WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| ClinicError::not_found("Payment"))?;

    let amount_paid = settlement.amount_paid.unwrap_or(current.amount_paid).round_dp(2);
    let (balance, status) = settle(current.total_amount, amount_paid)?;

    sqlx::query(
        r#"
        UPDATE payments SET
            amount_paid    = $2,
            balance        = $3,
            status         = $4,
            payment_method = COALESCE($5, payment_method),
            notes          = COALESCE($6, notes),
            updated_at     = now()
        WHERE id = $1
        "#,
    )
    .bind(id)
    .bind(amount_paid)
    .bind(balance)
    .bind(status.as_str())
    .bind(settlement.payment_method.map(|m| m.as_str()))
    .bind(settlement.notes)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    get_payment(pool, id).await
}

pub async fn delete_payment(pool: &PgPool, id: Uuid) -> ClinicResult<()> {
    let result = sqlx::query("DELETE FROM payments WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(ClinicError::not_found("Payment"));
    }
    Ok(())
}
