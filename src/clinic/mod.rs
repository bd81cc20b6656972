// Domain rules: entities, status lifecycles and the pure decisions the
// handlers apply before touching the database.
pub mod billing;
pub mod booking;
pub mod ids;
pub mod inventory;
pub mod models;
pub mod report;
pub mod states;
pub mod validation;

pub use billing::{price_invoice, price_purchase_order, settle, InvoiceTotals};
pub use booking::{check_availability, validate_windows, weekday_name};
pub use inventory::{evaluate_restock_need, plan_disposal, DisposalPlan, RestockAssessment};
pub use states::{
    plan_transition, AppointmentStatus, Lifecycle, PaymentMethod, PaymentStatus,
    PurchaseOrderStatus, RestockStatus, Role, SupplierCategory, SupplierStatus, Transition,
    Urgency,
};
