//! Cart state container.
//!
//! The cart holds the shopper's selected line items and nothing else.
//! Every mutation is persisted to the session under a fixed key
//! ([`session_keys::CART`]); the session store is Postgres-backed,
//! so the cart survives restarts. Only the item list is persisted - totals
//! are derived on demand from authoritative variant prices.

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tower_sessions::Session;

use copperleaf_core::{ProductId, VariantId};

use crate::models::session_keys;
use crate::pricing::PricedItem;

/// One selected line: a variant and how many of it.
///
/// Strictly typed so restored session state is validated on the way in;
/// a persisted blob that no longer matches this shape deserializes to an
/// empty cart instead of a corrupt one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CartItem {
    pub product_id: ProductId,
    pub variant_id: VariantId,
    pub quantity: u32,
}

/// Ordered collection of cart items (insertion order = display order).
///
/// At most one entry per variant id; adding an existing variant merges
/// quantities instead of duplicating the line.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    items: Vec<CartItem>,
}

impl Cart {
    /// Create an empty cart.
    #[must_use]
    pub const fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// The items in insertion order.
    #[must_use]
    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    /// Whether the cart holds no items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Add `quantity` of a variant.
    ///
    /// Merges into the existing line for the same variant id, otherwise
    /// appends. Quantity is clamped to a minimum of 1. No upper bound is
    /// enforced here; inventory checks belong to the catalog service.
    pub fn add_item(&mut self, product_id: ProductId, variant_id: VariantId, quantity: u32) {
        let quantity = quantity.max(1);
        if let Some(existing) = self
            .items
            .iter_mut()
            .find(|item| item.variant_id == variant_id)
        {
            existing.quantity = existing.quantity.saturating_add(quantity);
        } else {
            self.items.push(CartItem {
                product_id,
                variant_id,
                quantity,
            });
        }
    }

    /// Remove the line for a variant. No-op if absent.
    pub fn remove_item(&mut self, variant_id: VariantId) {
        self.items.retain(|item| item.variant_id != variant_id);
    }

    /// Set a line's quantity, clamped to a minimum of 1.
    ///
    /// Never removes the line; removal is explicit via [`Self::remove_item`].
    /// No-op if the variant is not in the cart.
    pub fn update_quantity(&mut self, variant_id: VariantId, quantity: u32) {
        if let Some(item) = self
            .items
            .iter_mut()
            .find(|item| item.variant_id == variant_id)
        {
            item.quantity = quantity.max(1);
        }
    }

    /// Empty the cart.
    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Sum of quantities across all lines.
    #[must_use]
    pub fn items_count(&self) -> u32 {
        self.items
            .iter()
            .fold(0, |acc, item| acc.saturating_add(item.quantity))
    }

    /// Resolve lines against a price map.
    ///
    /// A variant missing from the map prices at zero (fail-soft) and is
    /// logged at warn so catalog data errors stay visible.
    #[must_use]
    pub fn priced_items(&self, prices: &HashMap<VariantId, Decimal>) -> Vec<PricedItem> {
        self.items
            .iter()
            .map(|item| {
                let unit_price = prices.get(&item.variant_id).copied().unwrap_or_else(|| {
                    tracing::warn!(
                        variant_id = %item.variant_id,
                        "variant has no price entry, pricing line at zero"
                    );
                    Decimal::ZERO
                });
                PricedItem {
                    variant_id: item.variant_id,
                    quantity: item.quantity,
                    unit_price,
                }
            })
            .collect()
    }

    /// Sum of unit price x quantity over all lines.
    #[must_use]
    pub fn total(&self, prices: &HashMap<VariantId, Decimal>) -> Decimal {
        self.priced_items(prices)
            .iter()
            .map(PricedItem::line_total)
            .sum()
    }
}

// =============================================================================
// Session Persistence
// =============================================================================

/// Load the cart from the session, defaulting to empty.
///
/// # Errors
///
/// Returns the session store error if the read fails.
pub async fn load(session: &Session) -> Result<Cart, tower_sessions::session::Error> {
    Ok(session
        .get::<Cart>(session_keys::CART)
        .await?
        .unwrap_or_default())
}

/// Persist the cart item list to the session.
///
/// # Errors
///
/// Returns the session store error if the write fails.
pub async fn save(session: &Session, cart: &Cart) -> Result<(), tower_sessions::session::Error> {
    session.insert(session_keys::CART, cart).await
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn prices(pairs: &[(i32, &str)]) -> HashMap<VariantId, Decimal> {
        pairs
            .iter()
            .map(|(id, price)| (VariantId::new(*id), dec(price)))
            .collect()
    }

    #[test]
    fn test_add_same_variant_merges_quantities() {
        let mut cart = Cart::new();
        cart.add_item(ProductId::new(1), VariantId::new(10), 2);
        cart.add_item(ProductId::new(1), VariantId::new(10), 3);
        cart.add_item(ProductId::new(1), VariantId::new(10), 1);

        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.items()[0].quantity, 6);
    }

    #[test]
    fn test_add_preserves_insertion_order() {
        let mut cart = Cart::new();
        cart.add_item(ProductId::new(1), VariantId::new(10), 1);
        cart.add_item(ProductId::new(2), VariantId::new(20), 1);
        cart.add_item(ProductId::new(1), VariantId::new(10), 1);

        let ids: Vec<i32> = cart.items().iter().map(|i| i.variant_id.as_i32()).collect();
        assert_eq!(ids, vec![10, 20]);
    }

    #[test]
    fn test_add_zero_quantity_clamps_to_one() {
        let mut cart = Cart::new();
        cart.add_item(ProductId::new(1), VariantId::new(10), 0);
        assert_eq!(cart.items()[0].quantity, 1);
    }

    #[test]
    fn test_update_quantity_clamps_to_one() {
        let mut cart = Cart::new();
        cart.add_item(ProductId::new(1), VariantId::new(10), 5);
        cart.update_quantity(VariantId::new(10), 0);

        assert_eq!(cart.items()[0].quantity, 1);
        assert_eq!(cart.items().len(), 1);
    }

    #[test]
    fn test_update_quantity_missing_variant_is_noop() {
        let mut cart = Cart::new();
        cart.add_item(ProductId::new(1), VariantId::new(10), 2);
        cart.update_quantity(VariantId::new(99), 7);
        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.items()[0].quantity, 2);
    }

    #[test]
    fn test_remove_item() {
        let mut cart = Cart::new();
        cart.add_item(ProductId::new(1), VariantId::new(10), 1);
        cart.add_item(ProductId::new(2), VariantId::new(20), 1);
        cart.remove_item(VariantId::new(10));

        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.items()[0].variant_id, VariantId::new(20));

        // Removing an absent variant is a no-op
        cart.remove_item(VariantId::new(10));
        assert_eq!(cart.items().len(), 1);
    }

    #[test]
    fn test_clear() {
        let mut cart = Cart::new();
        cart.add_item(ProductId::new(1), VariantId::new(10), 3);
        cart.clear();
        assert!(cart.is_empty());
        assert_eq!(cart.items_count(), 0);
    }

    #[test]
    fn test_items_count_sums_quantities() {
        let mut cart = Cart::new();
        cart.add_item(ProductId::new(1), VariantId::new(10), 2);
        cart.add_item(ProductId::new(2), VariantId::new(20), 3);
        assert_eq!(cart.items_count(), 5);
    }

    #[test]
    fn test_total_invariant_under_reordering() {
        let prices = prices(&[(10, "10.00"), (20, "5.50")]);

        let mut a = Cart::new();
        a.add_item(ProductId::new(1), VariantId::new(10), 2);
        a.add_item(ProductId::new(2), VariantId::new(20), 1);

        let mut b = Cart::new();
        b.add_item(ProductId::new(2), VariantId::new(20), 1);
        b.add_item(ProductId::new(1), VariantId::new(10), 1);
        b.add_item(ProductId::new(1), VariantId::new(10), 1);

        assert_eq!(a.total(&prices), b.total(&prices));
        assert_eq!(a.total(&prices), dec("25.50"));
    }

    #[test]
    fn test_missing_price_counts_as_zero() {
        let prices = prices(&[(10, "10.00")]);

        let mut cart = Cart::new();
        cart.add_item(ProductId::new(1), VariantId::new(10), 1);
        cart.add_item(ProductId::new(2), VariantId::new(99), 4);

        assert_eq!(cart.total(&prices), dec("10.00"));
    }

    #[test]
    fn test_restored_state_rejects_schema_drift() {
        // A loosely-typed bag with extra fields must not deserialize
        let drifted = r#"{"items":[{"product_id":1,"variant_id":2,"quantity":1,"price":"9.99"}]}"#;
        assert!(serde_json::from_str::<Cart>(drifted).is_err());

        let valid = r#"{"items":[{"product_id":1,"variant_id":2,"quantity":1}]}"#;
        let cart: Cart = serde_json::from_str(valid).unwrap();
        assert_eq!(cart.items_count(), 1);
    }
}
