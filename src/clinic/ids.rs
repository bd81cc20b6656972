use chrono::NaiveDate;

/// `PAT-00042` from the patient sequence value.
pub fn patient_code(seq: i64) -> String {
    format!("PAT-{seq:05}")
}

/// `INV-20261019-00007` style numbers for invoices and purchase orders.
pub fn document_number(prefix: &str, date: NaiveDate, seq: i64) -> String {
    format!("{prefix}-{}-{seq:05}", date.format("%Y%m%d"))
}

pub const INVOICE_PREFIX: &str = "INV";
pub const PURCHASE_ORDER_PREFIX: &str = "PO";
