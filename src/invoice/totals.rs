use rust_decimal::Decimal;
use serde::Serialize;

use super::amount::lenient;
use super::line_item::LineItem;

/// Derived invoice totals. Never stored, always recomputed from the items.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceTotals {
    #[serde(serialize_with = "lenient::serialize")]
    pub subtotal: Decimal,
    #[serde(serialize_with = "lenient::serialize")]
    pub tax_amount: Decimal,
    #[serde(serialize_with = "lenient::serialize")]
    pub total: Decimal,
}

/// Sum line item amounts and apply a percentage tax rate.
///
/// Sums saturate at the `Decimal` bounds.
pub fn aggregate(items: &[LineItem], tax_rate_percent: Decimal) -> InvoiceTotals {
    let subtotal = items
        .iter()
        .map(LineItem::amount)
        .fold(Decimal::ZERO, Decimal::saturating_add);
    let tax_amount = subtotal.saturating_mul(tax_rate_percent) / Decimal::ONE_HUNDRED;

    InvoiceTotals {
        subtotal,
        tax_amount,
        total: subtotal.saturating_add(tax_amount),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    #[test]
    fn empty_list_is_all_zero() {
        for rate in [dec!(0), dec!(10), dec!(99.5)] {
            assert_eq!(aggregate(&[], rate), InvoiceTotals::default());
        }
    }

    #[test]
    fn ten_percent_of_one_hundred() {
        let items = [LineItem::new("Work", dec!(1), dec!(100))];
        let totals = aggregate(&items, dec!(10));
        assert_eq!(totals.subtotal, dec!(100));
        assert_eq!(totals.tax_amount, dec!(10));
        assert_eq!(totals.total, dec!(110));
    }

    #[test]
    fn repeated_cents_do_not_drift() {
        let items = vec![LineItem::new("Third", dec!(1), dec!(33.33)); 3];
        let totals = aggregate(&items, dec!(0));
        assert_eq!(totals.subtotal, dec!(99.99));
        assert_eq!(totals.total, dec!(99.99));

        let many = vec![LineItem::new("Dime", dec!(1), dec!(0.1)); 1000];
        assert_eq!(aggregate(&many, dec!(0)).subtotal, dec!(100));
    }

    #[test]
    fn fractional_tax_is_not_rounded() {
        let items = [LineItem::new("Work", dec!(1), dec!(19.99))];
        let totals = aggregate(&items, dec!(8.25));
        assert_eq!(totals.tax_amount, dec!(1.6491750));
        assert_eq!(totals.total, totals.subtotal + totals.tax_amount);
    }

    #[test]
    fn serializes_camel_case() {
        let totals = aggregate(&[LineItem::new("Work", dec!(2), dec!(5))], dec!(10));
        let json = serde_json::to_value(totals).unwrap();
        assert_eq!(json["subtotal"], 10);
        assert_eq!(json["taxAmount"], 1);
        assert_eq!(json["total"], 11);
    }

    #[test]
    fn oversized_sums_saturate() {
        let big = LineItem::new("Big", Decimal::MAX, dec!(1));
        let totals = aggregate(&[big.clone(), big], dec!(10));
        assert_eq!(totals.subtotal, Decimal::MAX);
        assert_eq!(totals.total, Decimal::MAX);

        let owed = LineItem::new("Credit", Decimal::MAX, dec!(-1));
        assert_eq!(aggregate(&[owed.clone(), owed], dec!(0)).total, Decimal::MIN);
    }

    proptest! {
        #[test]
        fn subtotal_is_sum_of_amounts(
            rows in proptest::collection::vec((0i64..1_000, 0i64..1_000_000), 1..40),
            rate in 0i64..10_000,
        ) {
            let items: Vec<LineItem> = rows
                .iter()
                .map(|(q, cents)| LineItem::new("row", Decimal::from(*q), Decimal::new(*cents, 2)))
                .collect();
            let tax_rate = Decimal::new(rate, 2);
            let totals = aggregate(&items, tax_rate);

            let expected: Decimal = items.iter().map(|i| i.amount()).sum();
            prop_assert_eq!(totals.subtotal, expected);
            prop_assert_eq!(totals.total, totals.subtotal + totals.tax_amount);
        }
    }
}
