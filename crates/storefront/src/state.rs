//! Application state shared across request handlers.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use rust_decimal::Decimal;
use sqlx::PgPool;
use thiserror::Error;

use copperleaf_core::VariantId;

use crate::config::StorefrontConfig;
use crate::db::VariantRepository;
use crate::error::AppError;
use crate::payments::AttemptRegistry;
use crate::services::{ChargeError, EmailService, GatewayClient};

/// How long a variant's unit price stays cached before the catalog tables
/// are consulted again.
const PRICE_CACHE_TTL: Duration = Duration::from_secs(60);
const PRICE_CACHE_CAPACITY: u64 = 10_000;

/// Errors constructing application state.
#[derive(Debug, Error)]
pub enum StateError {
    #[error("failed to build gateway client: {0}")]
    Gateway(#[from] ChargeError),
    #[error("failed to build SMTP transport: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),
}

/// Shared application state.
///
/// Cheap to clone; all fields live behind a single `Arc`.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    pool: PgPool,
    gateway: Option<GatewayClient>,
    mailer: Option<EmailService>,
    attempts: AttemptRegistry,
    price_cache: Cache<VariantId, Option<Decimal>>,
}

impl AppState {
    /// Build state from loaded configuration and an established pool.
    ///
    /// The gateway client and mailer are built only when their configuration
    /// sections are present; card payment and notifications degrade to off.
    ///
    /// # Errors
    ///
    /// Returns `StateError` if a configured collaborator fails to construct.
    pub fn new(config: StorefrontConfig, pool: PgPool) -> Result<Self, StateError> {
        let gateway = config
            .gateway
            .as_ref()
            .map(GatewayClient::new)
            .transpose()?;
        let mailer = config.email.as_ref().map(EmailService::new).transpose()?;

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                gateway,
                mailer,
                attempts: AttemptRegistry::new(),
                price_cache: Cache::builder()
                    .max_capacity(PRICE_CACHE_CAPACITY)
                    .time_to_live(PRICE_CACHE_TTL)
                    .build(),
            }),
        })
    }

    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Gateway client, `None` when card payment is not configured.
    #[must_use]
    pub fn gateway(&self) -> Option<&GatewayClient> {
        self.inner.gateway.as_ref()
    }

    /// Email service, `None` when notifications are not configured.
    #[must_use]
    pub fn mailer(&self) -> Option<&EmailService> {
        self.inner.mailer.as_ref()
    }

    #[must_use]
    pub fn attempts(&self) -> &AttemptRegistry {
        &self.inner.attempts
    }

    /// Effective unit prices for a batch of variants, through the price
    /// cache.
    ///
    /// Cache misses are fetched from the catalog tables in a single query.
    /// A variant with no price rows caches as `None` (and is absent from the
    /// result) so repeated lookups of a broken catalog entry do not hammer
    /// the database.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Internal` if the underlying price query fails.
    pub async fn variant_prices(
        &self,
        variant_ids: &[VariantId],
    ) -> Result<HashMap<VariantId, Decimal>, AppError> {
        let mut prices = HashMap::with_capacity(variant_ids.len());
        let mut misses = Vec::new();

        for &variant_id in variant_ids {
            match self.inner.price_cache.get(&variant_id).await {
                Some(Some(price)) => {
                    prices.insert(variant_id, price);
                }
                Some(None) => {}
                None => misses.push(variant_id),
            }
        }

        if !misses.is_empty() {
            let fetched = VariantRepository::new(&self.inner.pool)
                .unit_prices(&misses)
                .await
                .map_err(|e| AppError::Internal(format!("price lookup: {e}")))?;
            for variant_id in misses {
                let price = fetched.get(&variant_id).copied();
                self.inner.price_cache.insert(variant_id, price).await;
                if let Some(price) = price {
                    prices.insert(variant_id, price);
                }
            }
        }

        Ok(prices)
    }
}
