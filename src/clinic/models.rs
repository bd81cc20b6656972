use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::states::{
    AppointmentStatus, PaymentMethod, PaymentStatus, PurchaseOrderStatus, RestockStatus, Role,
    SupplierCategory, SupplierStatus, Urgency,
};

/// Registered patient (or staff account, by role).
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Patient {
    pub id: Uuid,
    pub patient_code: String,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub gender: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub address: Option<String>,
    #[serde(skip_serializing)]
    pub password_hash: String,
    #[sqlx(try_from = "String")]
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub token: Uuid,
    pub patient_id: Uuid,
    #[sqlx(try_from = "String")]
    pub role: Role,
    pub expires_at: DateTime<Utc>,
}

/// One weekly opening of a doctor, e.g. Monday 09:00-17:00.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityWindow {
    pub day: String,
    pub start_time: String,
    pub end_time: String,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Doctor {
    pub id: Uuid,
    pub name: String,
    pub specialization: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
    #[sqlx(skip)]
    pub availability: Vec<AvailabilityWindow>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    pub id: Uuid,
    pub doctor_id: Uuid,
    pub patient_id: Option<Uuid>,
    pub patient_name: String,
    pub patient_email: Option<String>,
    #[sqlx(rename = "appointment_date")]
    pub date: NaiveDate,
    #[sqlx(rename = "appointment_time")]
    pub time: String,
    pub reason: Option<String>,
    #[sqlx(try_from = "String")]
    pub status: AppointmentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Consultation {
    pub id: Uuid,
    pub doctor_id: Uuid,
    pub patient_id: Option<Uuid>,
    pub patient_name: String,
    #[sqlx(rename = "consultation_date")]
    pub date: NaiveDate,
    #[sqlx(rename = "consultation_time")]
    pub time: String,
    pub reason: String,
    pub notes: Option<String>,
    pub prescription: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct SurgicalItem {
    pub id: Uuid,
    pub name: String,
    pub category: String,
    pub quantity: i32,
    pub min_stock_level: i32,
    pub price: Decimal,
    pub supplier_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct DisposalRecord {
    pub id: Uuid,
    pub item_id: Uuid,
    pub item_name: String,
    pub quantity_disposed: i32,
    pub previous_quantity: i32,
    pub remaining_quantity: i32,
    pub reason: String,
    pub disposed_by: String,
    pub disposed_date: DateTime<Utc>,
    pub estimated_value: Decimal,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct RestockOrder {
    pub id: Uuid,
    pub item_id: Uuid,
    pub item_name: String,
    pub current_stock: i32,
    pub reorder_quantity: i32,
    pub supplier_id: Option<Uuid>,
    #[sqlx(try_from = "String")]
    pub status: RestockStatus,
    #[sqlx(try_from = "String")]
    pub urgency: Urgency,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Supplier {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    #[sqlx(try_from = "String")]
    pub category: SupplierCategory,
    #[sqlx(try_from = "String")]
    pub status: SupplierStatus,
    pub rating: i16,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseOrderItem {
    pub product: String,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub total_price: Decimal,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseOrder {
    pub id: Uuid,
    pub order_number: String,
    pub supplier_id: Uuid,
    pub total_amount: Decimal,
    #[sqlx(try_from = "String")]
    pub status: PurchaseOrderStatus,
    pub expected_delivery: Option<NaiveDate>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[sqlx(skip)]
    pub items: Vec<PurchaseOrderItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct PaymentLine {
    pub service: String,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub subtotal: Decimal,
}

/// Invoice together with what has been paid against it.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub id: Uuid,
    pub invoice_number: String,
    pub patient_id: Option<Uuid>,
    pub doctor_id: Option<Uuid>,
    pub patient_name: String,
    pub subtotal: Decimal,
    pub discount: Decimal,
    pub tax: Decimal,
    pub total_amount: Decimal,
    pub amount_paid: Decimal,
    pub balance: Decimal,
    #[sqlx(try_from = "String")]
    pub payment_method: PaymentMethod,
    #[sqlx(try_from = "String")]
    pub status: PaymentStatus,
    pub notes: Option<String>,
    pub issued_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[sqlx(skip)]
    pub lines: Vec<PaymentLine>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub quantity: i32,
    pub created_at: DateTime<Utc>,
}
