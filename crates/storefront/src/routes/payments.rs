//! Payment route handlers.
//!
//! The card path is two-phase: the hosted widget tokenizes card details in
//! the browser using the public key from `/payments/config`, and the charge
//! handler exchanges the resulting single-use token server-side. The attempt
//! id issued by `/payments/attempt` correlates the two halves; a charge
//! carrying a stale or foreign attempt id is refused before any network I/O.

use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;

use copperleaf_core::{AttemptId, Money, PaymentMethod};

use crate::cart;
use crate::checkout::{self, CheckoutStep};
use crate::error::{AppError, Result};
use crate::middleware::OptionalAuth;
use crate::models::{Order, session_keys};
use crate::orders::{self, PaymentOutcome};
use crate::services::ChargeRequest;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct PaymentConfigResponse {
    /// Public key the hosted widget is initialized with.
    pub public_key: String,
    pub currency_code: String,
    /// Server-computed order total in minor units; the widget displays it
    /// but the charge recomputes it regardless.
    pub amount_minor: i64,
}

#[derive(Debug, Serialize)]
pub struct AttemptResponse {
    pub attempt_id: AttemptId,
}

#[derive(Debug, Deserialize)]
pub struct ChargeSubmission {
    pub attempt_id: AttemptId,
    /// Single-use token from the widget's tokenization callback.
    pub token: String,
}

/// Success envelope of the charge exchange: `{success, data}` with the
/// submitted order as the payload.
#[derive(Debug, Serialize)]
pub struct ChargeResponse {
    pub success: bool,
    pub data: Order,
}

/// GET /payments/config - widget parameters for the current checkout.
pub async fn config(
    State(state): State<AppState>,
    session: Session,
) -> Result<Json<PaymentConfigResponse>> {
    let gateway_config = state
        .config()
        .gateway
        .as_ref()
        .ok_or_else(|| AppError::Configuration("payment gateway is not configured".to_string()))?;

    let cart = cart::load(&session).await?;
    let (_, summary) = super::checkout::summarize_cart(&state, &cart).await?;

    let amount_minor = Money::new(summary.total, summary.currency_code)
        .to_minor_units()
        .ok_or_else(|| AppError::Internal("order total out of range".to_string()))?;

    Ok(Json(PaymentConfigResponse {
        public_key: gateway_config.public_key.clone(),
        currency_code: summary.currency_code.code().to_string(),
        amount_minor,
    }))
}

/// POST /payments/attempt - issue a payment attempt id.
///
/// Any previous attempt held by this session is invalidated; only the
/// newest id can complete.
pub async fn attempt(
    State(state): State<AppState>,
    session: Session,
) -> Result<Json<AttemptResponse>> {
    if state.gateway().is_none() {
        return Err(AppError::Configuration(
            "payment gateway is not configured".to_string(),
        ));
    }

    let previous: Option<AttemptId> = session.get(session_keys::PAYMENT_ATTEMPT).await?;
    let attempt_id = state.attempts().begin(previous);
    session
        .insert(session_keys::PAYMENT_ATTEMPT, attempt_id)
        .await?;

    tracing::debug!(attempt_id = %attempt_id, "payment attempt issued");
    Ok(Json(AttemptResponse { attempt_id }))
}

/// POST /payments/charge - exchange the widget token for a charge and
/// submit the order.
///
/// Amounts are recomputed from authoritative prices in this handler; the
/// widget's displayed amount is never trusted. The order number is
/// generated before the charge so it rides along as the correlation id.
/// A failed charge persists nothing; the shopper starts a fresh attempt.
#[allow(clippy::too_many_lines)]
pub async fn charge(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    session: Session,
    Json(submission): Json<ChargeSubmission>,
) -> Result<Json<ChargeResponse>> {
    // Configuration check first: no attempt is consumed for a dead gateway
    let gateway = state
        .gateway()
        .ok_or_else(|| AppError::Configuration("payment gateway is not configured".to_string()))?;

    let mut checkout = checkout::load(&session).await?;
    if checkout.step == CheckoutStep::Confirmation {
        return Err(AppError::Validation(
            "checkout is already complete".to_string(),
        ));
    }
    checkout.form.validate_required()?;
    if checkout.form.payment_method != Some(PaymentMethod::Card) {
        return Err(AppError::Validation(
            "manual payment settles via /checkout/confirm".to_string(),
        ));
    }

    // The submitted attempt must be the one this session holds
    let held: Option<AttemptId> = session.get(session_keys::PAYMENT_ATTEMPT).await?;
    if held != Some(submission.attempt_id) {
        return Err(AppError::Validation(
            "payment attempt does not belong to this session".to_string(),
        ));
    }
    state
        .attempts()
        .consume(submission.attempt_id)
        .map_err(|e| AppError::Validation(e.to_string()))?;
    session
        .remove::<AttemptId>(session_keys::PAYMENT_ATTEMPT)
        .await?;

    let mut cart = cart::load(&session).await?;
    if cart.is_empty() {
        return Err(AppError::Validation("cart is empty".to_string()));
    }
    let (prices, summary) = super::checkout::summarize_cart(&state, &cart).await?;

    let amount_minor = Money::new(summary.total, summary.currency_code)
        .to_minor_units()
        .ok_or_else(|| AppError::Internal("order total out of range".to_string()))?;

    // Generated before the charge: the gateway sees it as the correlation id
    let order_number = orders::generate_order_number();

    let gateway_charge = gateway
        .charge(&ChargeRequest {
            token: submission.token,
            amount_minor,
            currency_code: summary.currency_code,
            description: format!("Copperleaf order {order_number}"),
            email: checkout.form.email.clone(),
            order_number: order_number.clone(),
        })
        .await?;

    let order = orders::submit(
        &state,
        order_number,
        &cart,
        &prices,
        &checkout.form,
        summary,
        user.map(|u| u.id),
        PaymentOutcome::Charged {
            charge_id: gateway_charge.id,
        },
    )
    .await?;

    checkout.complete(order.order_number.clone());
    checkout::save(&session, &checkout).await?;
    cart.clear();
    cart::save(&session, &cart).await?;

    Ok(Json(ChargeResponse {
        success: true,
        data: order,
    }))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::models::{AddressSnapshot, CustomerInfo};
    use chrono::Utc;
    use copperleaf_core::{CurrencyCode, OrderId, OrderStatus};
    use rust_decimal::Decimal;

    #[test]
    fn test_charge_response_envelope() {
        let order = Order {
            id: OrderId::new(1),
            order_number: "CL-20260827-AB12CD".to_string(),
            user_id: None,
            customer: CustomerInfo {
                email: "shopper@example.com".to_string(),
                first_name: "Ada".to_string(),
                last_name: "Lovelace".to_string(),
                phone: None,
            },
            shipping_address: AddressSnapshot {
                line1: "12 Analytical Way".to_string(),
                line2: None,
                city: "Lima".to_string(),
                province: "Lima".to_string(),
                postal_code: "15001".to_string(),
                country_code: "PE".to_string(),
            },
            billing_address: None,
            payment_method: PaymentMethod::Card,
            status: OrderStatus::Paid,
            charge_id: Some("chr_test_123".to_string()),
            currency_code: CurrencyCode::USD,
            subtotal: Decimal::new(10000, 2),
            tax: Decimal::new(1800, 2),
            shipping: Decimal::new(1000, 2),
            total: Decimal::new(12800, 2),
            items: vec![],
            created_at: Utc::now(),
        };

        let json = serde_json::to_value(ChargeResponse {
            success: true,
            data: order,
        })
        .unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["data"]["order_number"], "CL-20260827-AB12CD");
        assert_eq!(json["data"]["status"], "paid");
    }
}
