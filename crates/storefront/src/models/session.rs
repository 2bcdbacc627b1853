//! Session-related types.
//!
//! The session is the durable per-shopper store: the cart and checkout state
//! live here (Postgres-backed, so they survive restarts), and the external
//! auth system shares the same store to record the logged-in identity.

use serde::{Deserialize, Serialize};

use copperleaf_core::{Email, UserId};

/// Session-stored user identity.
///
/// Written by the authentication system; this crate only reads it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentUser {
    /// User's database ID.
    pub id: UserId,
    /// User's email address.
    pub email: Email,
}

/// Session keys for checkout state.
pub mod session_keys {
    /// Key for storing the current logged-in user.
    pub const CURRENT_USER: &str = "current_user";

    /// Key for the persisted cart item list (fixed namespace; only the item
    /// list is stored, totals are always recomputed).
    pub const CART: &str = "cart";

    /// Key for the checkout step machine and its form data.
    pub const CHECKOUT: &str = "checkout";

    /// Key for the payment attempt currently in flight for this session.
    pub const PAYMENT_ATTEMPT: &str = "payment_attempt";
}
