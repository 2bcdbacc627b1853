//! Cart route handlers.
//!
//! Every response re-prices the cart from authoritative variant prices;
//! clients never see or submit amounts that the server would trust.

use axum::{Json, extract::State};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tower_sessions::Session;

use copperleaf_core::{ProductId, VariantId};

use crate::cart;
use crate::error::Result;
use crate::pricing::PricedItem;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct AddRequest {
    pub product_id: ProductId,
    pub variant_id: VariantId,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
}

const fn default_quantity() -> u32 {
    1
}

#[derive(Debug, Deserialize)]
pub struct UpdateRequest {
    pub variant_id: VariantId,
    pub quantity: u32,
}

#[derive(Debug, Deserialize)]
pub struct RemoveRequest {
    pub variant_id: VariantId,
}

#[derive(Debug, Serialize)]
pub struct CartLine {
    pub product_id: ProductId,
    pub variant_id: VariantId,
    pub quantity: u32,
    pub unit_price: Decimal,
    pub line_total: Decimal,
}

#[derive(Debug, Serialize)]
pub struct CartResponse {
    pub items: Vec<CartLine>,
    pub items_count: u32,
    pub total: Decimal,
    pub currency_code: String,
}

#[derive(Debug, Serialize)]
pub struct CountResponse {
    pub items_count: u32,
}

/// GET /cart - the cart with server-priced lines.
pub async fn show(State(state): State<AppState>, session: Session) -> Result<Json<CartResponse>> {
    let cart = cart::load(&session).await?;
    price_response(&state, &cart).await.map(Json)
}

/// POST /cart/add - add a variant, merging with any existing line.
pub async fn add(
    State(state): State<AppState>,
    session: Session,
    Json(request): Json<AddRequest>,
) -> Result<Json<CartResponse>> {
    let mut cart = cart::load(&session).await?;
    cart.add_item(request.product_id, request.variant_id, request.quantity);
    cart::save(&session, &cart).await?;

    tracing::debug!(
        variant_id = %request.variant_id,
        quantity = request.quantity,
        "cart add"
    );
    price_response(&state, &cart).await.map(Json)
}

/// POST /cart/update - set a line's quantity (clamped to 1).
pub async fn update(
    State(state): State<AppState>,
    session: Session,
    Json(request): Json<UpdateRequest>,
) -> Result<Json<CartResponse>> {
    let mut cart = cart::load(&session).await?;
    cart.update_quantity(request.variant_id, request.quantity);
    cart::save(&session, &cart).await?;
    price_response(&state, &cart).await.map(Json)
}

/// POST /cart/remove - remove a line entirely.
pub async fn remove(
    State(state): State<AppState>,
    session: Session,
    Json(request): Json<RemoveRequest>,
) -> Result<Json<CartResponse>> {
    let mut cart = cart::load(&session).await?;
    cart.remove_item(request.variant_id);
    cart::save(&session, &cart).await?;
    price_response(&state, &cart).await.map(Json)
}

/// POST /cart/clear - empty the cart.
pub async fn clear(
    State(state): State<AppState>,
    session: Session,
) -> Result<Json<CartResponse>> {
    let mut cart = cart::load(&session).await?;
    cart.clear();
    cart::save(&session, &cart).await?;
    price_response(&state, &cart).await.map(Json)
}

/// GET /cart/count - sum of line quantities, for the header badge.
pub async fn count(session: Session) -> Result<Json<CountResponse>> {
    let cart = cart::load(&session).await?;
    Ok(Json(CountResponse {
        items_count: cart.items_count(),
    }))
}

/// Price the cart against current variant prices and build the response.
async fn price_response(state: &AppState, cart: &cart::Cart) -> Result<CartResponse> {
    let variant_ids: Vec<VariantId> = cart.items().iter().map(|item| item.variant_id).collect();
    let prices = state.variant_prices(&variant_ids).await?;

    let priced = cart.priced_items(&prices);
    let items = cart
        .items()
        .iter()
        .zip(&priced)
        .map(|(item, priced)| CartLine {
            product_id: item.product_id,
            variant_id: item.variant_id,
            quantity: item.quantity,
            unit_price: priced.unit_price,
            line_total: priced.line_total(),
        })
        .collect();

    Ok(CartResponse {
        items,
        items_count: cart.items_count(),
        total: priced.iter().map(PricedItem::line_total).sum(),
        currency_code: state.config().currency.code().to_string(),
    })
}
