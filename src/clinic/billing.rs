//! Server-side totals for purchase orders and invoices. Request payloads only
//! carry line items; every aggregate is derived here.

use rust_decimal::Decimal;
use serde::Deserialize;

use super::models::{PaymentLine, PurchaseOrderItem};
use super::states::PaymentStatus;
use super::validation::{self, MAX_AMOUNT, MAX_PRICE};
use crate::error::{ClinicError, ClinicResult};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseLineInput {
    pub product: String,
    pub quantity: i32,
    pub unit_price: Decimal,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceLineInput {
    pub service: String,
    #[serde(default = "one")]
    pub quantity: i32,
    pub unit_price: Decimal,
}

fn one() -> i32 {
    1
}

/// Rounded unit price and `quantity × unitPrice` for one line.
fn price_line(position: usize, quantity: i32, unit_price: Decimal) -> ClinicResult<(Decimal, Decimal)> {
    let line = position + 1;
    if quantity < 1 {
        return Err(ClinicError::validation(format!("Line {line}: quantity must be at least 1")));
    }
    let unit_price = validation::amount(&format!("Line {line}: unitPrice"), unit_price, MAX_PRICE)?;
    let total = unit_price
        .checked_mul(Decimal::from(quantity))
        .filter(|t| *t <= MAX_AMOUNT)
        .ok_or_else(|| ClinicError::validation(format!("Line {line}: line total cannot exceed {MAX_AMOUNT}")))?;
    Ok((unit_price, total))
}

/// Sum of already priced amounts, bounded like a total column.
fn add_up(field: &str, values: impl IntoIterator<Item = Decimal>) -> ClinicResult<Decimal> {
    values
        .into_iter()
        .try_fold(Decimal::ZERO, |acc, v| acc.checked_add(v).filter(|t| *t <= MAX_AMOUNT))
        .ok_or_else(|| ClinicError::validation(format!("{field} cannot exceed {MAX_AMOUNT}")))
}

/// Prices every line (`quantity × unitPrice`) and sums the order.
pub fn price_purchase_order(
    lines: Vec<PurchaseLineInput>,
) -> ClinicResult<(Vec<PurchaseOrderItem>, Decimal)> {
    if lines.is_empty() {
        return Err(ClinicError::validation("A purchase order needs at least one item"));
    }

    let mut items = Vec::with_capacity(lines.len());
    for (i, line) in lines.into_iter().enumerate() {
        let (unit_price, total_price) = price_line(i, line.quantity, line.unit_price)?;
        items.push(PurchaseOrderItem {
            product: validation::required("product", &line.product)?,
            quantity: line.quantity,
            unit_price,
            total_price,
        });
    }
    let total = purchase_order_total(&items)?;
    Ok((items, total))
}

/// Recomputes the order total from stored lines, ignoring any stored
/// per-line `totalPrice`.
pub fn purchase_order_total(items: &[PurchaseOrderItem]) -> ClinicResult<Decimal> {
    let lines = items
        .iter()
        .enumerate()
        .map(|(i, item)| price_line(i, item.quantity, item.unit_price).map(|(_, total)| total))
        .collect::<ClinicResult<Vec<_>>>()?;
    add_up("totalAmount", lines)
}

/// Every amount stored on an invoice.
#[derive(Debug, Clone, PartialEq)]
pub struct InvoiceTotals {
    pub lines: Vec<PaymentLine>,
    pub subtotal: Decimal,
    pub discount: Decimal,
    pub tax: Decimal,
    pub total_amount: Decimal,
    pub amount_paid: Decimal,
    pub balance: Decimal,
    pub status: PaymentStatus,
}

pub fn price_invoice(
    lines: Vec<ServiceLineInput>,
    discount: Decimal,
    tax: Decimal,
    amount_paid: Decimal,
) -> ClinicResult<InvoiceTotals> {
    if lines.is_empty() {
        return Err(ClinicError::validation("An invoice needs at least one service line"));
    }
    let discount = validation::amount("discount", discount, MAX_AMOUNT)?;
    let tax = validation::amount("tax", tax, MAX_AMOUNT)?;

    let mut priced = Vec::with_capacity(lines.len());
    for (i, line) in lines.into_iter().enumerate() {
        let (unit_price, subtotal) = price_line(i, line.quantity, line.unit_price)?;
        priced.push(PaymentLine {
            service: validation::required("service", &line.service)?,
            quantity: line.quantity,
            unit_price,
            subtotal,
        });
    }

    let subtotal = add_up("subtotal", priced.iter().map(|l| l.subtotal))?;
    let total_amount = subtotal - discount + tax;
    if total_amount < Decimal::ZERO {
        return Err(ClinicError::validation("discount cannot exceed subtotal plus tax"));
    }
    if total_amount > MAX_AMOUNT {
        return Err(ClinicError::validation(format!("totalAmount cannot exceed {MAX_AMOUNT}")));
    }

    let amount_paid = validation::amount("amountPaid", amount_paid, MAX_AMOUNT)?;
    let (balance, status) = settle(total_amount, amount_paid)?;
    Ok(InvoiceTotals {
        lines: priced,
        subtotal,
        discount,
        tax,
        total_amount,
        amount_paid,
        balance,
        status,
    })
}

/// Balance and status for `amount_paid` against `total_amount`.
pub fn settle(total_amount: Decimal, amount_paid: Decimal) -> ClinicResult<(Decimal, PaymentStatus)> {
    let amount_paid = validation::amount("amountPaid", amount_paid, MAX_AMOUNT)?;
    if amount_paid > total_amount {
        return Err(ClinicError::validation(format!(
            "amountPaid {amount_paid} exceeds totalAmount {total_amount}"
        )));
    }

    let balance = total_amount - amount_paid;
    let status = if balance.is_zero() {
        PaymentStatus::Paid
    } else if amount_paid.is_zero() {
        PaymentStatus::Unpaid
    } else {
        PaymentStatus::Partial
    };
    Ok((balance, status))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    fn po_line(product: &str, quantity: i32, unit_price: Decimal) -> PurchaseLineInput {
        PurchaseLineInput { product: product.into(), quantity, unit_price }
    }

    fn service(name: &str, quantity: i32, unit_price: Decimal) -> ServiceLineInput {
        ServiceLineInput { service: name.into(), quantity, unit_price }
    }

    #[test]
    fn purchase_order_lines_and_total() {
        let (items, total) = price_purchase_order(vec![
            po_line("Scalpel", 10, dec!(2.50)),
            po_line("Gauze", 3, dec!(1.10)),
        ])
        .unwrap();
        assert_eq!(items[0].total_price, dec!(25.00));
        assert_eq!(items[1].total_price, dec!(3.30));
        assert_eq!(total, dec!(28.30));
    }

    #[test]
    fn purchase_order_rejects_bad_lines() {
        assert!(price_purchase_order(vec![]).is_err());
        assert!(price_purchase_order(vec![po_line("Gauze", 0, dec!(1))]).is_err());
        assert!(price_purchase_order(vec![po_line("Gauze", 1, dec!(-1))]).is_err());
        assert!(price_purchase_order(vec![po_line("  ", 1, dec!(1))]).is_err());
    }

    #[test]
    fn sub_cent_prices_are_rounded_before_the_line_total() {
        let (items, total) = price_purchase_order(vec![
            po_line("Swab", 2, dec!(0.005)),
            po_line("Tape", 3, dec!(1.335)),
        ])
        .unwrap();
        assert_eq!(items[0].unit_price, dec!(0.00));
        assert_eq!(items[0].total_price, dec!(0.00));
        assert_eq!(items[1].unit_price, dec!(1.34));
        assert_eq!(items[1].total_price, dec!(4.02));
        for item in &items {
            assert_eq!(item.total_price, item.unit_price * Decimal::from(item.quantity));
        }
        assert_eq!(total, items.iter().map(|i| i.total_price).sum::<Decimal>());

        let t = price_invoice(vec![service("Swab", 3, dec!(0.125))], dec!(0), dec!(0), dec!(0)).unwrap();
        assert_eq!(t.lines[0].unit_price, dec!(0.12));
        assert_eq!(t.subtotal, dec!(0.36));
        assert_eq!(t.total_amount, t.lines[0].subtotal);
    }

    #[test]
    fn oversized_amounts_are_validation_errors() {
        let err = price_purchase_order(vec![po_line("Gauze", 1000, Decimal::MAX)]).unwrap_err();
        assert!(matches!(err, ClinicError::Validation(_)), "{err:?}");

        let err = price_purchase_order(vec![po_line("Gauze", i32::MAX, MAX_PRICE)]).unwrap_err();
        assert_eq!(err.to_string(), "Line 1: line total cannot exceed 999999999999.99");

        let lines = vec![po_line("A", 1, MAX_PRICE); 101];
        assert!(matches!(price_purchase_order(lines), Err(ClinicError::Validation(_))));

        let lines = || vec![service("Surgery", 1, dec!(100))];
        assert!(price_invoice(lines(), dec!(0), Decimal::MAX, dec!(0)).is_err());
        assert!(price_invoice(lines(), dec!(0), MAX_AMOUNT, dec!(0)).is_err());
        assert!(price_invoice(lines(), dec!(0), dec!(0), Decimal::MAX).is_err());
        assert!(settle(dec!(100), Decimal::MAX).is_err());
    }

    #[test]
    fn invoice_totals_and_balance() {
        let t = price_invoice(
            vec![service("Consultation", 1, dec!(80)), service("X-Ray", 2, dec!(35.5))],
            dec!(10),
            dec!(7.25),
            dec!(50),
        )
        .unwrap();
        assert_eq!(t.subtotal, dec!(151.00));
        assert_eq!(t.total_amount, dec!(148.25));
        assert_eq!(t.balance, dec!(98.25));
        assert_eq!(t.status, PaymentStatus::Partial);
    }

    #[test]
    fn invoice_status_follows_payment() {
        let lines = || vec![service("Dressing", 1, dec!(20))];
        assert_eq!(price_invoice(lines(), dec!(0), dec!(0), dec!(0)).unwrap().status, PaymentStatus::Unpaid);
        assert_eq!(price_invoice(lines(), dec!(0), dec!(0), dec!(20)).unwrap().status, PaymentStatus::Paid);
        assert!(price_invoice(lines(), dec!(0), dec!(0), dec!(20.01)).is_err());
        assert!(price_invoice(lines(), dec!(25), dec!(0), dec!(0)).is_err());
        assert!(price_invoice(lines(), dec!(-1), dec!(0), dec!(0)).is_err());
    }

    #[test]
    fn settle_on_fully_discounted_invoice() {
        let (balance, status) = settle(dec!(0), dec!(0)).unwrap();
        assert_eq!(balance, dec!(0));
        assert_eq!(status, PaymentStatus::Paid);
    }

    proptest! {
        #[test]
        fn order_total_is_sum_of_lines(
            raw in prop::collection::vec((1i32..500, 0i64..1_000_000), 1..20)
        ) {
            let lines: Vec<_> = raw
                .iter()
                .map(|(q, cents)| po_line("item", *q, Decimal::new(*cents, 2)))
                .collect();
            let expected: Decimal = raw
                .iter()
                .map(|(q, cents)| Decimal::new(*cents, 2) * Decimal::from(*q))
                .sum();

            let (items, total) = price_purchase_order(lines).unwrap();
            prop_assert_eq!(total, expected);

            let json = serde_json::to_string(&items).unwrap();
            let back: Vec<PurchaseOrderItem> = serde_json::from_str(&json).unwrap();
            prop_assert_eq!(purchase_order_total(&back).unwrap(), total);
        }

        #[test]
        fn invoice_balance_identity(
            cents in prop::collection::vec(1i64..100_000, 1..10),
            paid_share in 0u32..=100,
        ) {
            let lines: Vec<_> = cents.iter().map(|c| service("svc", 1, Decimal::new(*c, 2))).collect();
            let subtotal: Decimal = cents.iter().map(|c| Decimal::new(*c, 2)).sum();
            let paid = (subtotal * Decimal::from(paid_share) / Decimal::from(100)).round_dp(2);

            let t = price_invoice(lines, Decimal::ZERO, Decimal::ZERO, paid).unwrap();
            prop_assert_eq!(t.total_amount, subtotal);
            prop_assert_eq!(t.balance, t.total_amount - t.amount_paid);
        }
    }
}
