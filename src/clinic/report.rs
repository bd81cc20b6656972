use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use super::inventory::RestockAssessment;
use super::models::{DisposalRecord, SurgicalItem};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategorySummary {
    pub category: String,
    pub items: usize,
    pub units: i64,
    pub value: Decimal,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LowStockEntry {
    pub id: Uuid,
    pub name: String,
    pub category: String,
    pub quantity: i32,
    pub min_stock_level: i32,
    pub assessment: RestockAssessment,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DisposalSummary {
    pub records: usize,
    pub units: i64,
    pub value: Decimal,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SurgicalReport {
    pub generated_at: DateTime<Utc>,
    pub total_items: usize,
    pub total_units: i64,
    pub total_stock_value: Decimal,
    pub categories: Vec<CategorySummary>,
    pub low_stock: Vec<LowStockEntry>,
    pub disposals: DisposalSummary,
    pub open_restock_orders: i64,
}

/// Aggregates a point-in-time inventory snapshot.
pub fn build_surgical_report(
    items: &[SurgicalItem],
    disposals: &[DisposalRecord],
    open_restock_orders: i64,
    generated_at: DateTime<Utc>,
) -> SurgicalReport {
    let mut categories: BTreeMap<&str, CategorySummary> = BTreeMap::new();
    let mut low_stock = Vec::new();

    for item in items {
        let entry = categories.entry(item.category.as_str()).or_insert_with(|| CategorySummary {
            category: item.category.clone(),
            items: 0,
            units: 0,
            value: Decimal::ZERO,
        });
        entry.items += 1;
        entry.units += i64::from(item.quantity);
        entry.value = entry.value.saturating_add(item.stock_value());

        let assessment = item.restock_assessment();
        if assessment.needed {
            low_stock.push(LowStockEntry {
                id: item.id,
                name: item.name.clone(),
                category: item.category.clone(),
                quantity: item.quantity,
                min_stock_level: item.min_stock_level,
                assessment,
            });
        }
    }
    // Most urgent first (CRITICAL sorts before LOW).
    low_stock.sort_by_key(|e| (e.assessment.urgency as u8, e.quantity));

    let disposals = disposals.iter().fold(DisposalSummary::default(), |mut acc, d| {
        acc.records += 1;
        acc.units += i64::from(d.quantity_disposed);
        acc.value = acc.value.saturating_add(d.estimated_value);
        acc
    });

    let categories: Vec<CategorySummary> = categories.into_values().collect();
    SurgicalReport {
        generated_at,
        total_items: items.len(),
        total_units: categories.iter().map(|c| c.units).sum(),
        total_stock_value: categories.iter().fold(Decimal::ZERO, |acc, c| acc.saturating_add(c.value)),
        categories,
        low_stock,
        disposals,
        open_restock_orders,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clinic::states::Urgency;
    use rust_decimal_macros::dec;

    fn item(name: &str, category: &str, quantity: i32, min: i32, price: Decimal) -> SurgicalItem {
        SurgicalItem {
            id: Uuid::new_v4(),
            name: name.into(),
            category: category.into(),
            quantity,
            min_stock_level: min,
            price,
            supplier_id: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn report_totals_and_low_stock_order() {
        let items = vec![
            item("Scalpel", "instruments", 40, 10, dec!(3.00)),
            item("Forceps", "instruments", 5, 10, dec!(12.00)),
            item("Gauze", "consumables", 0, 100, dec!(0.20)),
        ];
        let report = build_surgical_report(&items, &[], 2, Utc::now());

        assert_eq!(report.total_items, 3);
        assert_eq!(report.total_units, 45);
        assert_eq!(report.total_stock_value, dec!(180.00));
        assert_eq!(report.categories.len(), 2);
        assert_eq!(report.categories[0].category, "consumables");
        assert_eq!(report.categories[1].value, dec!(180.00));

        let names: Vec<_> = report.low_stock.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["Gauze", "Forceps"]);
        assert_eq!(report.low_stock[0].assessment.urgency, Urgency::Critical);
        assert_eq!(report.open_restock_orders, 2);
        assert_eq!(report.disposals.records, 0);
    }

    #[test]
    fn stock_value_saturates_instead_of_overflowing() {
        let items = vec![
            item("Implant", "implants", i32::MAX, 1, Decimal::MAX),
            item("Screw", "implants", 10, 1, dec!(1.00)),
        ];
        let report = build_surgical_report(&items, &[], 0, Utc::now());
        assert_eq!(items[0].stock_value(), Decimal::MAX);
        assert_eq!(report.total_stock_value, Decimal::MAX);
    }
}
