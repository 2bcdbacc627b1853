//! Price computation engine.
//!
//! Pure functions: no I/O, no state. Given priced cart lines, a shipping
//! fee, and an optional adjustment, produce an [`OrderSummary`].
//!
//! Rounding policy: intermediate arithmetic stays unrounded to avoid
//! compounding errors. The tax amount is the one exception - it is a
//! regulatory line item and is rounded to the currency exponent before
//! being added to the total. Everything else rounds only at the boundary
//! (display, persistence, gateway wire format).

use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;

use copperleaf_core::{CurrencyCode, VariantId};

/// Fixed tax rate applied to the adjusted subtotal (18%).
#[must_use]
pub fn tax_rate() -> Decimal {
    Decimal::new(18, 2)
}

/// A cart line with its resolved unit price.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PricedItem {
    pub variant_id: VariantId,
    pub quantity: u32,
    /// Unit price in the settlement currency. A variant with no price entry
    /// resolves to zero upstream (fail-soft).
    pub unit_price: Decimal,
}

impl PricedItem {
    /// Line total, unrounded.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

/// A pluggable subtotal adjustment, applied before tax computation.
///
/// Coupons are the expected implementor; the engine itself knows nothing
/// about coupon semantics.
pub trait Adjustment {
    /// Return the adjusted subtotal. Implementations must not return a
    /// negative amount; the engine clamps to zero regardless.
    fn apply(&self, subtotal: Decimal) -> Decimal;
}

/// Computed totals for an order.
///
/// Recomputed server-side from authoritative prices on every use; never
/// persisted independently of an order, and never accepted from a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderSummary {
    pub subtotal: Decimal,
    pub tax_rate: Decimal,
    pub tax: Decimal,
    pub shipping: Decimal,
    pub total: Decimal,
    pub currency_code: CurrencyCode,
}

/// Sum of line totals, unrounded.
#[must_use]
pub fn subtotal(items: &[PricedItem]) -> Decimal {
    items.iter().map(PricedItem::line_total).sum()
}

/// Compute the full order summary.
///
/// `shipping` is an opaque fee looked up externally per shipping method.
/// The adjustment (coupon), when present, applies to the subtotal before
/// tax is computed.
#[must_use]
pub fn summarize(
    items: &[PricedItem],
    shipping: Decimal,
    adjustment: Option<&dyn Adjustment>,
    currency_code: CurrencyCode,
) -> OrderSummary {
    let raw_subtotal = subtotal(items);
    let adjusted = adjustment
        .map_or(raw_subtotal, |a| a.apply(raw_subtotal))
        .max(Decimal::ZERO);

    let tax = round_to_currency(adjusted * tax_rate(), currency_code);
    let total = adjusted + tax + shipping;

    OrderSummary {
        subtotal: adjusted,
        tax_rate: tax_rate(),
        tax,
        shipping,
        total,
        currency_code,
    }
}

/// Round to the currency exponent, away from zero on midpoints.
fn round_to_currency(amount: Decimal, currency_code: CurrencyCode) -> Decimal {
    amount.round_dp_with_strategy(
        currency_code.decimal_places(),
        RoundingStrategy::MidpointAwayFromZero,
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn item(variant: i32, quantity: u32, unit_price: &str) -> PricedItem {
        PricedItem {
            variant_id: VariantId::new(variant),
            quantity,
            unit_price: unit_price.parse().unwrap(),
        }
    }

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn test_tax_on_round_subtotal() {
        // Subtotal 100.00 -> tax exactly 18.00
        let summary = summarize(
            &[item(1, 2, "50.00")],
            Decimal::ZERO,
            None,
            CurrencyCode::USD,
        );
        assert_eq!(summary.subtotal, dec("100.00"));
        assert_eq!(summary.tax, dec("18.00"));
        assert_eq!(summary.total, dec("118.00"));
    }

    #[test]
    fn test_checkout_scenario_with_shipping() {
        // One item, unit price 50.00, qty 2, shipping 10.00:
        // subtotal 100.00, tax 18.00, total 128.00
        let summary = summarize(
            &[item(1, 2, "50.00")],
            dec("10.00"),
            None,
            CurrencyCode::USD,
        );
        assert_eq!(summary.total, dec("128.00"));
    }

    #[test]
    fn test_tax_rounds_at_boundary_only() {
        // 33.33 * 0.18 = 5.9994 -> tax 6.00, total uses the rounded tax
        let summary = summarize(&[item(1, 1, "33.33")], Decimal::ZERO, None, CurrencyCode::USD);
        assert_eq!(summary.tax, dec("6.00"));
        assert_eq!(summary.total, dec("39.33"));
    }

    #[test]
    fn test_tax_midpoint_rounds_away_from_zero() {
        // 30.25 * 0.18 = 5.445 -> 5.45 under away-from-zero (banker's would give 5.44)
        let summary = summarize(&[item(1, 1, "30.25")], Decimal::ZERO, None, CurrencyCode::USD);
        assert_eq!(summary.tax, dec("5.45"));
    }

    #[test]
    fn test_subtotal_order_independent() {
        let a = subtotal(&[item(1, 2, "10.00"), item(2, 1, "5.50")]);
        let b = subtotal(&[item(2, 1, "5.50"), item(1, 2, "10.00")]);
        assert_eq!(a, b);
    }

    #[test]
    fn test_empty_cart_summary() {
        let summary = summarize(&[], dec("10.00"), None, CurrencyCode::USD);
        assert_eq!(summary.subtotal, Decimal::ZERO);
        assert_eq!(summary.tax, Decimal::ZERO);
        assert_eq!(summary.total, dec("10.00"));
    }

    struct FlatDiscount(Decimal);

    impl Adjustment for FlatDiscount {
        fn apply(&self, subtotal: Decimal) -> Decimal {
            subtotal - self.0
        }
    }

    #[test]
    fn test_adjustment_applies_before_tax() {
        // 100.00 - 50.00 discount -> tax on 50.00 = 9.00
        let discount = FlatDiscount(dec("50.00"));
        let summary = summarize(
            &[item(1, 2, "50.00")],
            Decimal::ZERO,
            Some(&discount),
            CurrencyCode::USD,
        );
        assert_eq!(summary.subtotal, dec("50.00"));
        assert_eq!(summary.tax, dec("9.00"));
    }

    #[test]
    fn test_adjustment_clamped_at_zero() {
        let discount = FlatDiscount(dec("500.00"));
        let summary = summarize(
            &[item(1, 1, "10.00")],
            Decimal::ZERO,
            Some(&discount),
            CurrencyCode::USD,
        );
        assert_eq!(summary.subtotal, Decimal::ZERO);
        assert_eq!(summary.total, Decimal::ZERO);
    }
}
