//! Order repository.
//!
//! Orders are written once at submission and never mutated by the
//! storefront. Customer and address snapshots are denormalized into the
//! order row as JSON text so later address edits never rewrite history.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use copperleaf_core::{CurrencyCode, OrderId};

use super::RepositoryError;
use crate::models::{NewOrder, Order, OrderItem};

/// Repository for order database operations.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Persist an order and its line items in one transaction.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the order number is already
    /// taken. Returns `RepositoryError::Database` for other database errors.
    pub async fn create(&self, new: NewOrder) -> Result<Order, RepositoryError> {
        let customer_json = serde_json::to_string(&new.customer)
            .map_err(|e| RepositoryError::DataCorruption(e.to_string()))?;
        let shipping_json = serde_json::to_string(&new.shipping_address)
            .map_err(|e| RepositoryError::DataCorruption(e.to_string()))?;
        let billing_json = new
            .billing_address
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| RepositoryError::DataCorruption(e.to_string()))?;

        let mut tx = self.pool.begin().await?;

        let (id, created_at) = sqlx::query_as::<_, (OrderId, DateTime<Utc>)>(
            "INSERT INTO orders \
                 (order_number, user_id, customer_info, shipping_address, billing_address, \
                  payment_method, status, charge_id, currency_code, subtotal, tax, shipping, total) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13) \
             RETURNING id, created_at",
        )
        .bind(&new.order_number)
        .bind(new.user_id)
        .bind(&customer_json)
        .bind(&shipping_json)
        .bind(&billing_json)
        .bind(new.payment_method)
        .bind(new.status)
        .bind(&new.charge_id)
        .bind(new.summary.currency_code.code())
        .bind(new.summary.subtotal)
        .bind(new.summary.tax)
        .bind(new.summary.shipping)
        .bind(new.summary.total)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                RepositoryError::Conflict(format!("order number {} already exists", new.order_number))
            } else {
                RepositoryError::Database(e)
            }
        })?;

        let mut items = Vec::with_capacity(new.items.len());
        for item in &new.items {
            let quantity = i32::try_from(item.quantity).unwrap_or(i32::MAX);
            sqlx::query(
                "INSERT INTO order_items (order_id, product_id, variant_id, quantity, unit_price) \
                 VALUES ($1, $2, $3, $4, $5)",
            )
            .bind(id)
            .bind(item.product_id)
            .bind(item.variant_id)
            .bind(quantity)
            .bind(item.unit_price)
            .execute(&mut *tx)
            .await?;

            items.push(OrderItem {
                product_id: item.product_id,
                variant_id: item.variant_id,
                quantity: item.quantity,
                unit_price: item.unit_price,
            });
        }

        tx.commit().await?;

        Ok(Order {
            id,
            order_number: new.order_number,
            user_id: new.user_id,
            customer: new.customer,
            shipping_address: new.shipping_address,
            billing_address: new.billing_address,
            payment_method: new.payment_method,
            status: new.status,
            charge_id: new.charge_id,
            currency_code: new.summary.currency_code,
            subtotal: new.summary.subtotal,
            tax: new.summary.tax,
            shipping: new.summary.shipping,
            total: new.summary.total,
            items,
            created_at,
        })
    }

    /// Fetch an order by its public order number, with line items.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::DataCorruption` if a stored snapshot fails
    /// to parse. Returns `RepositoryError::Database` if a query fails.
    pub async fn get_by_number(&self, order_number: &str) -> Result<Option<Order>, RepositoryError> {
        let Some(row) = sqlx::query_as::<_, OrderRow>(
            "SELECT id, order_number, user_id, customer_info, shipping_address, billing_address, \
                    payment_method, status, charge_id, currency_code, subtotal, tax, shipping, \
                    total, created_at \
             FROM orders WHERE order_number = $1",
        )
        .bind(order_number)
        .fetch_optional(self.pool)
        .await?
        else {
            return Ok(None);
        };

        let items = sqlx::query_as::<_, ItemRow>(
            "SELECT product_id, variant_id, quantity, unit_price \
             FROM order_items WHERE order_id = $1 ORDER BY id ASC",
        )
        .bind(row.id)
        .fetch_all(self.pool)
        .await?;

        Ok(Some(row.into_order(items)?))
    }
}

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: OrderId,
    order_number: String,
    user_id: Option<copperleaf_core::UserId>,
    customer_info: String,
    shipping_address: String,
    billing_address: Option<String>,
    payment_method: copperleaf_core::PaymentMethod,
    status: copperleaf_core::OrderStatus,
    charge_id: Option<String>,
    currency_code: String,
    subtotal: Decimal,
    tax: Decimal,
    shipping: Decimal,
    total: Decimal,
    created_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct ItemRow {
    product_id: copperleaf_core::ProductId,
    variant_id: copperleaf_core::VariantId,
    quantity: i32,
    unit_price: Decimal,
}

impl OrderRow {
    fn into_order(self, items: Vec<ItemRow>) -> Result<Order, RepositoryError> {
        let customer = serde_json::from_str(&self.customer_info).map_err(|e| {
            RepositoryError::DataCorruption(format!("order {} customer snapshot: {e}", self.id))
        })?;
        let shipping_address = serde_json::from_str(&self.shipping_address).map_err(|e| {
            RepositoryError::DataCorruption(format!("order {} shipping snapshot: {e}", self.id))
        })?;
        let billing_address = self
            .billing_address
            .as_deref()
            .map(serde_json::from_str)
            .transpose()
            .map_err(|e| {
                RepositoryError::DataCorruption(format!("order {} billing snapshot: {e}", self.id))
            })?;
        let currency_code = self.currency_code.parse::<CurrencyCode>().map_err(|_| {
            RepositoryError::DataCorruption(format!(
                "order {} has unknown currency {}",
                self.id, self.currency_code
            ))
        })?;

        let items = items
            .into_iter()
            .map(|item| OrderItem {
                product_id: item.product_id,
                variant_id: item.variant_id,
                quantity: item.quantity.max(0).unsigned_abs(),
                unit_price: item.unit_price,
            })
            .collect();

        Ok(Order {
            id: self.id,
            order_number: self.order_number,
            user_id: self.user_id,
            customer,
            shipping_address,
            billing_address,
            payment_method: self.payment_method,
            status: self.status,
            charge_id: self.charge_id,
            currency_code,
            subtotal: self.subtotal,
            tax: self.tax,
            shipping: self.shipping,
            total: self.total,
            items,
            created_at: self.created_at,
        })
    }
}

/// Check if a sqlx error is a PostgreSQL unique constraint violation.
fn is_unique_violation(e: &sqlx::Error) -> bool {
    matches!(
        e,
        sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some("23505")
    )
}
