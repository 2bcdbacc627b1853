//! Order types.
//!
//! Orders are written once at checkout submission and never mutated by the
//! checkout flow afterwards; fulfillment owns the rest of the lifecycle.
//! Customer and address data are stored as immutable snapshots, not foreign
//! keys, so later address edits cannot rewrite order history.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use copperleaf_core::{CurrencyCode, OrderId, OrderStatus, PaymentMethod, ProductId, UserId, VariantId};

use crate::pricing::OrderSummary;

/// Snapshot of who placed the order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomerInfo {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
}

/// Snapshot of a shipping or billing address at submission time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddressSnapshot {
    pub line1: String,
    pub line2: Option<String>,
    pub city: String,
    pub province: String,
    pub postal_code: String,
    pub country_code: String,
}

/// One line of an order's item snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct OrderItem {
    pub product_id: ProductId,
    pub variant_id: VariantId,
    pub quantity: u32,
    /// Unit price at submission time, in the order's settlement currency.
    pub unit_price: Decimal,
}

/// A persisted order.
#[derive(Debug, Clone, Serialize)]
pub struct Order {
    pub id: OrderId,
    pub order_number: String,
    pub user_id: Option<UserId>,
    pub customer: CustomerInfo,
    pub shipping_address: AddressSnapshot,
    /// `None` means billing mirrors shipping.
    pub billing_address: Option<AddressSnapshot>,
    pub payment_method: PaymentMethod,
    pub status: OrderStatus,
    /// Gateway charge id for card payments.
    pub charge_id: Option<String>,
    pub currency_code: CurrencyCode,
    pub subtotal: Decimal,
    pub tax: Decimal,
    pub shipping: Decimal,
    pub total: Decimal,
    pub items: Vec<OrderItem>,
    pub created_at: DateTime<Utc>,
}

/// Everything needed to persist a new order.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub order_number: String,
    pub user_id: Option<UserId>,
    pub customer: CustomerInfo,
    pub shipping_address: AddressSnapshot,
    pub billing_address: Option<AddressSnapshot>,
    pub payment_method: PaymentMethod,
    pub status: OrderStatus,
    pub charge_id: Option<String>,
    pub summary: OrderSummary,
    pub items: Vec<NewOrderItem>,
}

/// One line of a new order's item snapshot.
#[derive(Debug, Clone)]
pub struct NewOrderItem {
    pub product_id: ProductId,
    pub variant_id: VariantId,
    pub quantity: u32,
    pub unit_price: Decimal,
}
