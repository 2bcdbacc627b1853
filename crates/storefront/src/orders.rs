//! Order submission.
//!
//! The single money moment of the checkout flow: turn a session cart plus
//! validated form data into a persisted order. Callers settle payment first
//! (or choose manual payment) and hand the outcome in; submission itself
//! never talks to the gateway.

use std::collections::HashMap;

use chrono::Utc;
use rand::Rng;
use rust_decimal::Decimal;

use copperleaf_core::{OrderStatus, PaymentMethod, UserId, VariantId};

use crate::cart::Cart;
use crate::checkout::CheckoutFormData;
use crate::db::OrderRepository;
use crate::error::{AppError, Result};
use crate::models::{AddressSnapshot, CustomerInfo, NewOrder, NewOrderItem, Order};
use crate::pricing::OrderSummary;
use crate::state::AppState;

const ORDER_NUMBER_SUFFIX_LEN: usize = 6;

/// How the order's payment was settled before submission.
#[derive(Debug, Clone)]
pub enum PaymentOutcome {
    /// A gateway charge succeeded; the order is paid.
    Charged { charge_id: String },
    /// Manual payment was chosen; the order awaits out-of-band settlement.
    Manual,
}

/// Generate a public order number: `CL-{date}-{random suffix}`.
///
/// Generated before any charge so it can ride along as the charge's
/// correlation id. Collisions are possible in principle; the insert's
/// unique constraint is the backstop.
#[must_use]
pub fn generate_order_number() -> String {
    let date = Utc::now().format("%Y%m%d");
    let suffix: String = rand::rng()
        .sample_iter(rand::distr::Alphanumeric)
        .take(ORDER_NUMBER_SUFFIX_LEN)
        .map(char::from)
        .collect::<String>()
        .to_uppercase();
    format!("CL-{date}-{suffix}")
}

/// Persist an order from the session cart and checkout form, then send the
/// confirmation email best-effort.
///
/// The summary must have been recomputed from authoritative prices by the
/// caller in the same request; client-supplied amounts never reach here.
///
/// # Errors
///
/// Returns `AppError::Validation` for an empty cart and database errors
/// from the insert. Email failure is logged, never returned.
#[allow(clippy::too_many_arguments)]
pub async fn submit(
    state: &AppState,
    order_number: String,
    cart: &Cart,
    prices: &HashMap<VariantId, Decimal>,
    form: &CheckoutFormData,
    summary: OrderSummary,
    user_id: Option<UserId>,
    outcome: PaymentOutcome,
) -> Result<Order> {
    if cart.is_empty() {
        return Err(AppError::Validation("cart is empty".to_string()));
    }

    let (payment_method, status, charge_id) = match outcome {
        PaymentOutcome::Charged { charge_id } => {
            (PaymentMethod::Card, OrderStatus::Paid, Some(charge_id))
        }
        PaymentOutcome::Manual => (PaymentMethod::Manual, OrderStatus::PendingPayment, None),
    };

    let items = cart
        .items()
        .iter()
        .map(|item| NewOrderItem {
            product_id: item.product_id,
            variant_id: item.variant_id,
            quantity: item.quantity,
            unit_price: prices.get(&item.variant_id).copied().unwrap_or(Decimal::ZERO),
        })
        .collect();

    let new_order = NewOrder {
        order_number,
        user_id,
        customer: CustomerInfo {
            email: form.email.clone(),
            first_name: form.first_name.clone(),
            last_name: form.last_name.clone(),
            phone: non_empty(&form.phone),
        },
        shipping_address: AddressSnapshot {
            line1: form.line1.clone(),
            line2: form.line2.clone(),
            city: form.city.clone(),
            province: form.province.clone(),
            postal_code: form.postal_code.clone(),
            country_code: form.country_code.clone(),
        },
        billing_address: billing_snapshot(form),
        payment_method,
        status,
        charge_id,
        summary,
        items,
    };

    let order = OrderRepository::new(state.pool()).create(new_order).await?;

    tracing::info!(
        order_number = %order.order_number,
        status = %order.status,
        total = %order.total,
        "order submitted"
    );

    if let Some(mailer) = state.mailer() {
        if let Err(e) = mailer.send_order_confirmation(&order).await {
            tracing::error!(
                order_number = %order.order_number,
                error = %e,
                "order confirmation email failed"
            );
        }
    }

    Ok(order)
}

/// Billing snapshot when it does not mirror shipping.
fn billing_snapshot(form: &CheckoutFormData) -> Option<AddressSnapshot> {
    if form.same_billing_address {
        return None;
    }
    form.billing.as_ref().map(|billing| AddressSnapshot {
        line1: billing.line1.clone(),
        line2: billing.line2.clone(),
        city: billing.city.clone(),
        province: billing.province.clone(),
        postal_code: billing.postal_code.clone(),
        country_code: billing.country_code.clone(),
    })
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::checkout::BillingFields;

    #[test]
    fn test_order_number_format() {
        let number = generate_order_number();
        let parts: Vec<&str> = number.split('-').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "CL");
        assert_eq!(parts[1].len(), 8);
        assert!(parts[1].chars().all(|c| c.is_ascii_digit()));
        assert_eq!(parts[2].len(), 6);
        assert!(parts[2].chars().all(|c| c.is_ascii_alphanumeric()));
        assert!(!parts[2].chars().any(|c| c.is_ascii_lowercase()));
    }

    #[test]
    fn test_order_numbers_vary() {
        assert_ne!(generate_order_number(), generate_order_number());
    }

    #[test]
    fn test_billing_snapshot_mirrors_shipping_as_none() {
        let form = CheckoutFormData {
            same_billing_address: true,
            billing: Some(BillingFields::default()),
            ..CheckoutFormData::default()
        };
        assert!(billing_snapshot(&form).is_none());
    }

    #[test]
    fn test_billing_snapshot_when_separate() {
        let form = CheckoutFormData {
            same_billing_address: false,
            billing: Some(BillingFields {
                line1: "1 Invoice St".to_string(),
                line2: None,
                city: "Lima".to_string(),
                province: "Lima".to_string(),
                postal_code: "15001".to_string(),
                country_code: "PE".to_string(),
            }),
            ..CheckoutFormData::default()
        };
        let snapshot = billing_snapshot(&form).unwrap();
        assert_eq!(snapshot.line1, "1 Invoice St");
    }

    #[test]
    fn test_non_empty_trims() {
        assert_eq!(non_empty("  "), None);
        assert_eq!(non_empty(" x "), Some("x".to_string()));
    }
}
