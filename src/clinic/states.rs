use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Raised when a stored or submitted text value is not a known variant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind}: {value}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

/// Enums persisted as TEXT columns and exchanged as JSON strings.
macro_rules! text_enum {
    (
        $(#[$meta:meta])*
        $name:ident ($kind:literal) {
            $($variant:ident => $text:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(
                #[serde(rename = $text)]
                $variant,
            )+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    _ => Err(UnknownVariant { kind: $kind, value: s.to_string() }),
                }
            }
        }

        impl TryFrom<String> for $name {
            type Error = UnknownVariant;

            fn try_from(value: String) -> Result<Self, UnknownVariant> {
                value.parse()
            }
        }
    };
}

text_enum! {
    AppointmentStatus("appointment status") {
        Pending => "Pending",
        Approved => "Approved",
        Completed => "Completed",
        Cancelled => "Cancelled",
    }
}

text_enum! {
    RestockStatus("restock status") {
        Pending => "PENDING",
        Approved => "APPROVED",
        Ordered => "ORDERED",
        Delivered => "DELIVERED",
        Cancelled => "CANCELLED",
        Error => "ERROR",
    }
}

text_enum! {
    /// Ordered from most to least pressing.
    Urgency("urgency") {
        Critical => "CRITICAL",
        High => "HIGH",
        Medium => "MEDIUM",
        Low => "LOW",
    }
}

text_enum! {
    PurchaseOrderStatus("purchase order status") {
        Pending => "pending",
        Approved => "approved",
        Ordered => "ordered",
        Received => "received",
        Cancelled => "cancelled",
    }
}

text_enum! {
    SupplierCategory("supplier category") {
        SurgicalInstruments => "surgical_instruments",
        MedicalEquipment => "medical_equipment",
        Pharmaceuticals => "pharmaceuticals",
        Consumables => "consumables",
        LaboratorySupplies => "laboratory_supplies",
        Other => "other",
    }
}

text_enum! {
    SupplierStatus("supplier status") {
        Active => "active",
        Inactive => "inactive",
        Suspended => "suspended",
    }
}

text_enum! {
    PaymentStatus("payment status") {
        Unpaid => "unpaid",
        Partial => "partial",
        Paid => "paid",
    }
}

text_enum! {
    PaymentMethod("payment method") {
        Cash => "cash",
        Card => "card",
        Insurance => "insurance",
        BankTransfer => "bank_transfer",
    }
}

text_enum! {
    Role("role") {
        Patient => "patient",
        Admin => "admin",
    }
}

/// A status enum whose changes are restricted to an explicit table.
pub trait Lifecycle: Copy + PartialEq + fmt::Display {
    fn can_become(self, next: Self) -> bool;

    fn is_terminal(self) -> bool;
}

impl Lifecycle for AppointmentStatus {
    fn can_become(self, next: Self) -> bool {
        use AppointmentStatus::*;
        matches!(
            (self, next),
            (Pending, Approved) | (Pending, Cancelled) | (Approved, Completed) | (Approved, Cancelled)
        )
    }

    fn is_terminal(self) -> bool {
        matches!(self, AppointmentStatus::Completed | AppointmentStatus::Cancelled)
    }
}

impl Lifecycle for RestockStatus {
    fn can_become(self, next: Self) -> bool {
        use RestockStatus::*;
        match (self, next) {
            (Pending, Approved) | (Approved, Ordered) | (Ordered, Delivered) => true,
            (from, Cancelled) | (from, Error) => !from.is_terminal(),
            _ => false,
        }
    }

    fn is_terminal(self) -> bool {
        matches!(
            self,
            RestockStatus::Delivered | RestockStatus::Cancelled | RestockStatus::Error
        )
    }
}

impl Lifecycle for PurchaseOrderStatus {
    fn can_become(self, next: Self) -> bool {
        use PurchaseOrderStatus::*;
        match (self, next) {
            (Pending, Approved) | (Approved, Ordered) | (Ordered, Received) => true,
            (from, Cancelled) => !from.is_terminal(),
            _ => false,
        }
    }

    fn is_terminal(self) -> bool {
        matches!(self, PurchaseOrderStatus::Received | PurchaseOrderStatus::Cancelled)
    }
}

/// Outcome of asking for a status change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition<S> {
    /// Requested status equals the current one; nothing to write.
    Unchanged,
    Move { from: S, to: S },
}

/// Checks `current -> next` against the lifecycle table.
pub fn plan_transition<S: Lifecycle>(
    current: S,
    next: S,
) -> Result<Transition<S>, crate::error::ClinicError> {
    if current == next {
        return Ok(Transition::Unchanged);
    }
    if current.can_become(next) {
        Ok(Transition::Move { from: current, to: next })
    } else {
        Err(crate::error::ClinicError::InvalidTransition {
            from: current.to_string(),
            to: next.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ClinicError;

    #[test]
    fn text_round_trip_uses_wire_names() {
        assert_eq!(AppointmentStatus::Pending.as_str(), "Pending");
        assert_eq!("DELIVERED".parse::<RestockStatus>().unwrap(), RestockStatus::Delivered);
        assert_eq!(
            serde_json::to_string(&SupplierCategory::SurgicalInstruments).unwrap(),
            "\"surgical_instruments\""
        );
        let err = "pending".parse::<AppointmentStatus>().unwrap_err();
        assert_eq!(err.kind, "appointment status");
    }

    #[test]
    fn restock_error_variant_converts_from_column_text() {
        assert_eq!(RestockStatus::try_from("ERROR".to_string()), Ok(RestockStatus::Error));
        assert_eq!(RestockStatus::try_from("CANCELLED".to_string()), Ok(RestockStatus::Cancelled));
        let err = RestockStatus::try_from("LOST".to_string()).unwrap_err();
        assert_eq!(err.value, "LOST");
    }

    #[test]
    fn appointment_lifecycle() {
        use AppointmentStatus::*;
        assert!(Pending.can_become(Approved));
        assert!(Pending.can_become(Cancelled));
        assert!(Approved.can_become(Completed));
        assert!(!Pending.can_become(Completed));
        assert!(!Cancelled.can_become(Pending));
        assert!(!Completed.can_become(Cancelled));
        for s in AppointmentStatus::ALL {
            if s.is_terminal() {
                assert!(AppointmentStatus::ALL.iter().all(|n| !s.can_become(*n)));
            }
        }
    }

    #[test]
    fn restock_lifecycle_allows_cancel_or_error_until_terminal() {
        use RestockStatus::*;
        assert!(Pending.can_become(Approved));
        assert!(Ordered.can_become(Delivered));
        assert!(!Pending.can_become(Delivered));
        assert!(Ordered.can_become(Error));
        assert!(Approved.can_become(Cancelled));
        assert!(!Delivered.can_become(Cancelled));
        assert!(!Error.can_become(Pending));
    }

    #[test]
    fn purchase_order_lifecycle() {
        use PurchaseOrderStatus::*;
        assert!(Pending.can_become(Approved));
        assert!(Ordered.can_become(Received));
        assert!(!Received.can_become(Cancelled));
        assert!(!Approved.can_become(Pending));
    }

    #[test]
    fn plan_transition_reports_both_ends() {
        assert_eq!(
            plan_transition(AppointmentStatus::Pending, AppointmentStatus::Pending).unwrap(),
            Transition::Unchanged
        );
        match plan_transition(AppointmentStatus::Cancelled, AppointmentStatus::Approved) {
            Err(ClinicError::InvalidTransition { from, to }) => {
                assert_eq!(from, "Cancelled");
                assert_eq!(to, "Approved");
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
