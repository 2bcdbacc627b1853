//! Variant price lookups.
//!
//! The catalog service owns these tables; the storefront only reads the
//! effective unit price, which is the first price row by position.

use std::collections::HashMap;

use rust_decimal::Decimal;
use sqlx::PgPool;

use copperleaf_core::VariantId;

use super::RepositoryError;

/// Read-only repository for variant pricing.
pub struct VariantRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> VariantRepository<'a> {
    /// Create a new variant repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Effective unit prices for a batch of variants.
    ///
    /// Variants with no price rows are absent from the result.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn unit_prices(
        &self,
        variant_ids: &[VariantId],
    ) -> Result<HashMap<VariantId, Decimal>, RepositoryError> {
        if variant_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let ids: Vec<i32> = variant_ids.iter().map(|id| id.as_i32()).collect();
        let rows = sqlx::query_as::<_, (VariantId, Decimal)>(
            "SELECT DISTINCT ON (variant_id) variant_id, price FROM variant_prices \
             WHERE variant_id = ANY($1) ORDER BY variant_id, position ASC, id ASC",
        )
        .bind(&ids)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().collect())
    }
}
