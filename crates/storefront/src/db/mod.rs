//! Database operations for storefront `PostgreSQL`.
//!
//! # Tables
//!
//! - `sessions` - Tower-sessions storage (cart + checkout state live here)
//! - `addresses` - Shopper shipping/billing addresses with the
//!   one-default-per-(owner, type) invariant
//! - `orders` / `order_items` - Orders and their immutable item snapshots
//! - `products` / `variants` / `variant_prices` - Catalog tables maintained
//!   by the catalog service; this crate only reads unit prices from them
//!
//! # Migrations
//!
//! Migrations are stored in `crates/storefront/migrations/` and run via:
//! ```bash
//! sqlx migrate run --source crates/storefront/migrations
//! ```

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub mod addresses;
pub mod orders;
pub mod variants;

pub use addresses::AddressRepository;
pub use orders::OrderRepository;
pub use variants::VariantRepository;

/// Errors from repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Underlying database failure.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The referenced row does not exist.
    #[error("row not found")]
    NotFound,

    /// A uniqueness constraint was violated.
    #[error("conflict: {0}")]
    Conflict(String),

    /// A stored value failed domain validation on the way out.
    #[error("data corruption: {0}")]
    DataCorruption(String),
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
