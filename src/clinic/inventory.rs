use rust_decimal::Decimal;
use serde::Serialize;

use super::models::SurgicalItem;
use super::states::Urgency;
use super::validation::MAX_AMOUNT;
use crate::error::{ClinicError, ClinicResult};

/// Whether an item should be reordered, and how badly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RestockAssessment {
    pub needed: bool,
    pub urgency: Urgency,
    pub shortfall: i32,
    pub suggested_reorder_quantity: i32,
}

/// Restock need from the current quantity and the minimum level.
///
/// CRITICAL when empty, HIGH at or below half the minimum, MEDIUM at or below
/// three quarters, LOW otherwise.
pub fn evaluate_restock_need(quantity: i32, min_stock_level: i32) -> RestockAssessment {
    let needed = quantity <= min_stock_level;
    let (q, min) = (i64::from(quantity), i64::from(min_stock_level));

    let urgency = if quantity <= 0 {
        Urgency::Critical
    } else if q * 2 <= min {
        Urgency::High
    } else if q * 4 <= min * 3 {
        Urgency::Medium
    } else {
        Urgency::Low
    };

    let shortfall = (min_stock_level - quantity).max(0);
    let suggested_reorder_quantity = if needed {
        (min_stock_level.saturating_mul(2) - quantity).max(1)
    } else {
        0
    };

    RestockAssessment { needed, urgency, shortfall, suggested_reorder_quantity }
}

impl SurgicalItem {
    pub fn restock_assessment(&self) -> RestockAssessment {
        evaluate_restock_need(self.quantity, self.min_stock_level)
    }

    /// `price × quantity`, saturating at `Decimal::MAX`.
    pub fn stock_value(&self) -> Decimal {
        self.price.saturating_mul(Decimal::from(self.quantity))
    }
}

/// Quantities a disposal will leave behind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisposalPlan {
    pub quantity_disposed: i32,
    pub previous_quantity: i32,
    pub remaining_quantity: i32,
    pub estimated_value: Decimal,
}

pub fn plan_disposal(
    available: i32,
    unit_price: Decimal,
    requested: i32,
) -> ClinicResult<DisposalPlan> {
    if requested < 1 {
        return Err(ClinicError::validation("quantityDisposed must be at least 1"));
    }
    if requested > available {
        return Err(ClinicError::InsufficientStock { requested, available });
    }
    let estimated_value = unit_price
        .checked_mul(Decimal::from(requested))
        .map(|v| v.round_dp(2))
        .filter(|v| *v <= MAX_AMOUNT)
        .ok_or_else(|| ClinicError::validation(format!("estimatedValue cannot exceed {MAX_AMOUNT}")))?;
    Ok(DisposalPlan {
        quantity_disposed: requested,
        previous_quantity: available,
        remaining_quantity: available - requested,
        estimated_value,
    })
}

/// Quantity for a new restock order: the caller's choice or the suggestion.
pub fn reorder_quantity(requested: Option<i32>, assessment: &RestockAssessment) -> ClinicResult<i32> {
    let quantity = requested.unwrap_or(assessment.suggested_reorder_quantity);
    if quantity < 1 {
        return Err(ClinicError::validation(
            "reorderQuantity must be at least 1 (item is above its minimum stock level)",
        ));
    }
    Ok(quantity)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn below_half_minimum_is_high() {
        let a = evaluate_restock_need(5, 10);
        assert!(a.needed);
        assert_eq!(a.urgency, Urgency::High);
        assert_eq!(a.shortfall, 5);
        assert_eq!(a.suggested_reorder_quantity, 15);
    }

    #[test]
    fn urgency_tiers() {
        assert_eq!(evaluate_restock_need(0, 10).urgency, Urgency::Critical);
        assert_eq!(evaluate_restock_need(0, 0).urgency, Urgency::Critical);
        assert_eq!(evaluate_restock_need(7, 10).urgency, Urgency::Medium);
        assert_eq!(evaluate_restock_need(8, 10).urgency, Urgency::Low);
        assert_eq!(evaluate_restock_need(50, 10).urgency, Urgency::Low);
    }

    #[test]
    fn at_minimum_still_needs_restock() {
        let a = evaluate_restock_need(10, 10);
        assert!(a.needed);
        assert_eq!(a.shortfall, 0);
        assert_eq!(a.suggested_reorder_quantity, 10);

        let healthy = evaluate_restock_need(11, 10);
        assert!(!healthy.needed);
        assert_eq!(healthy.suggested_reorder_quantity, 0);
    }

    #[test]
    fn disposal_within_stock() {
        let plan = plan_disposal(5, dec!(12.50), 3).unwrap();
        assert_eq!(plan.remaining_quantity, 2);
        assert_eq!(plan.previous_quantity, 5);
        assert_eq!(plan.estimated_value, dec!(37.50));

        let all = plan_disposal(5, dec!(1), 5).unwrap();
        assert_eq!(all.remaining_quantity, 0);
    }

    #[test]
    fn disposal_beyond_stock_is_insufficient() {
        match plan_disposal(5, dec!(1), 6) {
            Err(ClinicError::InsufficientStock { requested, available }) => {
                assert_eq!((requested, available), (6, 5));
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(plan_disposal(5, dec!(1), 0), Err(ClinicError::Validation(_))));
    }

    #[test]
    fn disposal_value_out_of_range_is_rejected() {
        let err = plan_disposal(i32::MAX, Decimal::MAX, 1000).unwrap_err();
        assert!(matches!(err, ClinicError::Validation(_)), "{err:?}");
        let err = plan_disposal(i32::MAX, dec!(9999999999.99), i32::MAX).unwrap_err();
        assert_eq!(err.to_string(), "estimatedValue cannot exceed 999999999999.99");
    }

    #[test]
    fn reorder_quantity_defaults_to_suggestion() {
        let a = evaluate_restock_need(2, 10);
        assert_eq!(reorder_quantity(None, &a).unwrap(), 18);
        assert_eq!(reorder_quantity(Some(4), &a).unwrap(), 4);
        assert!(reorder_quantity(Some(0), &a).is_err());
        assert!(reorder_quantity(None, &evaluate_restock_need(30, 10)).is_err());
    }
}
