//! HTTP route handlers for the checkout API.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                 - Liveness check
//! GET  /health/ready           - Readiness check (database)
//!
//! # Cart
//! GET  /cart                   - Cart with server-priced lines and totals
//! POST /cart/add               - Add a variant (merges with existing line)
//! POST /cart/update            - Set a line's quantity
//! POST /cart/remove            - Remove a line
//! POST /cart/clear             - Empty the cart
//! GET  /cart/count             - Sum of line quantities (badge)
//!
//! # Checkout
//! GET  /checkout               - Current step, form data, and summary
//! POST /checkout/next          - Advance one step
//! POST /checkout/prev          - Go back one step
//! PUT  /checkout/details       - Replace collected form data
//! POST /checkout/confirm       - Submit with manual payment (no gateway)
//! POST /checkout/reset         - Discard checkout state (cart untouched)
//! GET  /checkout/order         - The order this session submitted
//!
//! # Payments (CORS-scoped to the storefront origin)
//! GET  /payments/config        - Widget public key + server-computed amount
//! POST /payments/attempt       - Issue a payment attempt id
//! POST /payments/charge        - Exchange widget token for a charge, submit
//!
//! # Addresses (requires auth)
//! GET    /addresses              - List the caller's addresses
//! POST   /addresses              - Create an address
//! PATCH  /addresses/{id}         - Partial update
//! DELETE /addresses/{id}         - Delete
//! POST   /addresses/{id}/set-default - Make default for its type
//!
//! # Auth
//! GET  /auth/session           - Who the session belongs to, if anyone
//! ```

pub mod addresses;
pub mod auth;
pub mod cart;
pub mod checkout;
pub mod payments;

use axum::{
    Router,
    http::{HeaderValue, Method, header},
    routing::{delete, get, post, put},
};
use tower_http::cors::CorsLayer;

use crate::config::StorefrontConfig;
use crate::state::AppState;

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/add", post(cart::add))
        .route("/update", post(cart::update))
        .route("/remove", post(cart::remove))
        .route("/clear", post(cart::clear))
        .route("/count", get(cart::count))
}

/// Create the checkout routes router.
pub fn checkout_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(checkout::show))
        .route("/next", post(checkout::next))
        .route("/prev", post(checkout::prev))
        .route("/details", put(checkout::details))
        .route("/confirm", post(checkout::confirm))
        .route("/reset", post(checkout::reset))
        .route("/order", get(checkout::order))
}

/// Create the payments routes router.
///
/// The hosted widget calls these cross-origin, so they carry a CORS layer
/// scoped to the storefront's own origin; everything else stays same-origin.
pub fn payment_routes(config: &StorefrontConfig) -> Router<AppState> {
    Router::new()
        .route("/config", get(payments::config))
        .route("/attempt", post(payments::attempt))
        .route("/charge", post(payments::charge))
        .layer(payments_cors(config))
}

/// Create the address routes router.
pub fn address_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(addresses::list).post(addresses::create))
        .route(
            "/{id}",
            delete(addresses::remove).patch(addresses::update),
        )
        .route("/{id}/set-default", post(addresses::set_default))
}

/// Create all routes for the storefront API.
pub fn routes(config: &StorefrontConfig) -> Router<AppState> {
    Router::new()
        .nest("/cart", cart_routes())
        .nest("/checkout", checkout_routes())
        .nest("/payments", payment_routes(config))
        .nest("/addresses", address_routes())
        .route("/auth/session", get(auth::session))
}

/// CORS policy for the payments surface: the storefront origin only, with
/// credentials so the session cookie rides along.
fn payments_cors(config: &StorefrontConfig) -> CorsLayer {
    config.base_url.parse::<HeaderValue>().map_or_else(
        |_| CorsLayer::new(),
        |origin| {
            CorsLayer::new()
                .allow_origin(origin)
                .allow_methods([Method::GET, Method::POST])
                .allow_headers([header::CONTENT_TYPE])
                .allow_credentials(true)
        },
    )
}
