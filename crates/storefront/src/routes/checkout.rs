//! Checkout route handlers.
//!
//! The step machine lives in the session; these handlers apply transitions
//! and re-price the cart on every read. The manual-payment submission path
//! ends here; the card path lives in the payments routes.

use std::collections::HashMap;

use axum::{Json, extract::State, http::StatusCode};
use rust_decimal::Decimal;
use serde::Serialize;
use tower_sessions::Session;

use copperleaf_core::{PaymentMethod, VariantId};

use crate::cart::{self, Cart};
use crate::checkout::{self, CheckoutError, CheckoutFormData, CheckoutState, CheckoutStep};
use crate::db::OrderRepository;
use crate::error::{AppError, Result};
use crate::middleware::OptionalAuth;
use crate::models::{Order, session_keys};
use crate::orders::{self, PaymentOutcome};
use crate::pricing::{self, OrderSummary};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    pub step: CheckoutStep,
    pub step_number: u8,
    pub form: CheckoutFormData,
    pub order_number: Option<String>,
    pub summary: OrderSummary,
}

#[derive(Debug, Serialize)]
pub struct ConfirmResponse {
    pub order: Order,
    /// Where the shopper settles a manual payment.
    pub contact_channel: String,
}

impl From<CheckoutError> for AppError {
    fn from(err: CheckoutError) -> Self {
        Self::Validation(err.to_string())
    }
}

/// GET /checkout - current step, collected form data, and live summary.
pub async fn show(
    State(state): State<AppState>,
    session: Session,
) -> Result<Json<CheckoutResponse>> {
    let checkout = checkout::load(&session).await?;
    let cart = cart::load(&session).await?;
    let (_, summary) = summarize_cart(&state, &cart).await?;

    Ok(Json(response(checkout, summary)))
}

/// POST /checkout/next - advance one step.
///
/// Leaving the cart review step requires a non-empty cart. There is no
/// forward transition out of the details step; confirm or charge moves the
/// session to confirmation along with the submitted order.
pub async fn next(
    State(state): State<AppState>,
    session: Session,
) -> Result<Json<CheckoutResponse>> {
    let mut checkout = checkout::load(&session).await?;
    let cart = cart::load(&session).await?;

    if checkout.step == CheckoutStep::CartReview && cart.is_empty() {
        return Err(AppError::Validation("cart is empty".to_string()));
    }

    checkout.next_step()?;
    checkout::save(&session, &checkout).await?;

    let (_, summary) = summarize_cart(&state, &cart).await?;
    Ok(Json(response(checkout, summary)))
}

/// POST /checkout/prev - go back one step.
pub async fn prev(
    State(state): State<AppState>,
    session: Session,
) -> Result<Json<CheckoutResponse>> {
    let mut checkout = checkout::load(&session).await?;
    checkout.prev_step()?;
    checkout::save(&session, &checkout).await?;

    let cart = cart::load(&session).await?;
    let (_, summary) = summarize_cart(&state, &cart).await?;
    Ok(Json(response(checkout, summary)))
}

/// PUT /checkout/details - replace the collected form data.
pub async fn details(
    State(state): State<AppState>,
    session: Session,
    Json(form): Json<CheckoutFormData>,
) -> Result<Json<CheckoutResponse>> {
    let mut checkout = checkout::load(&session).await?;
    checkout.update_form(form)?;
    checkout::save(&session, &checkout).await?;

    let cart = cart::load(&session).await?;
    let (_, summary) = summarize_cart(&state, &cart).await?;
    Ok(Json(response(checkout, summary)))
}

/// POST /checkout/confirm - submit with manual payment.
///
/// No gateway is involved; the order is persisted as pending payment and
/// the shopper is pointed at the store's contact channel to settle.
pub async fn confirm(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    session: Session,
) -> Result<Json<ConfirmResponse>> {
    let mut checkout = checkout::load(&session).await?;
    if checkout.step == CheckoutStep::Confirmation {
        return Err(AppError::Validation(
            "checkout is already complete".to_string(),
        ));
    }
    checkout.form.validate_required()?;

    if checkout.form.payment_method != Some(PaymentMethod::Manual) {
        return Err(AppError::Validation(
            "card payment settles via the payments endpoints".to_string(),
        ));
    }

    let mut cart = cart::load(&session).await?;
    let (prices, summary) = summarize_cart(&state, &cart).await?;

    let order = orders::submit(
        &state,
        orders::generate_order_number(),
        &cart,
        &prices,
        &checkout.form,
        summary,
        user.map(|u| u.id),
        PaymentOutcome::Manual,
    )
    .await?;

    checkout.complete(order.order_number.clone());
    checkout::save(&session, &checkout).await?;
    cart.clear();
    cart::save(&session, &cart).await?;

    Ok(Json(ConfirmResponse {
        order,
        contact_channel: state.config().contact_channel.clone(),
    }))
}

/// POST /checkout/reset - discard the checkout state.
///
/// The cart is deliberately untouched; any in-flight payment attempt is
/// abandoned. Used after completion (start a fresh checkout) or when the
/// shopper explicitly bails out.
pub async fn reset(State(state): State<AppState>, session: Session) -> Result<StatusCode> {
    checkout::discard(&session).await?;

    if let Some(attempt_id) = session
        .remove::<copperleaf_core::AttemptId>(session_keys::PAYMENT_ATTEMPT)
        .await?
    {
        state.attempts().abandon(attempt_id);
    }

    Ok(StatusCode::NO_CONTENT)
}

/// GET /checkout/order - the order this checkout session submitted.
///
/// Backs the confirmation page after submission (and after a page reload,
/// when the response from confirm/charge is long gone).
pub async fn order(State(state): State<AppState>, session: Session) -> Result<Json<Order>> {
    let checkout = checkout::load(&session).await?;
    let Some(order_number) = checkout.order_number else {
        return Err(AppError::NotFound(
            "no order has been submitted in this session".to_string(),
        ));
    };

    let order = OrderRepository::new(state.pool())
        .get_by_number(&order_number)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("order {order_number}")))?;
    Ok(Json(order))
}

/// Re-price the cart and compute the order summary for this request.
pub(super) async fn summarize_cart(
    state: &AppState,
    cart: &Cart,
) -> Result<(HashMap<VariantId, Decimal>, OrderSummary)> {
    let variant_ids: Vec<VariantId> = cart.items().iter().map(|item| item.variant_id).collect();
    let prices = state.variant_prices(&variant_ids).await?;

    let priced = cart.priced_items(&prices);
    let summary = pricing::summarize(
        &priced,
        state.config().shipping_fee,
        None,
        state.config().currency,
    );
    Ok((prices, summary))
}

fn response(checkout: CheckoutState, summary: OrderSummary) -> CheckoutResponse {
    CheckoutResponse {
        step: checkout.step,
        step_number: checkout.step.number(),
        form: checkout.form,
        order_number: checkout.order_number,
        summary,
    }
}
