//! Status enums shared across the checkout flow.

use serde::{Deserialize, Serialize};

/// Order payment lifecycle status.
///
/// Checkout only ever creates orders in `PendingPayment` (manual/offline
/// payment) or `Paid` (successful gateway charge). Further lifecycle is
/// fulfillment's concern, not checkout's.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "order_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Awaiting an offline/manual payment.
    #[default]
    PendingPayment,
    /// The gateway charge succeeded.
    Paid,
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PendingPayment => write!(f, "pending_payment"),
            Self::Paid => write!(f, "paid"),
        }
    }
}

/// How the shopper chose to pay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "payment_method", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Card payment through the hosted gateway widget.
    Card,
    /// Offline coordination with the store (bank transfer, pickup, etc.).
    Manual,
}

impl std::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Card => write!(f, "card"),
            Self::Manual => write!(f, "manual"),
        }
    }
}

impl std::str::FromStr for PaymentMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "card" => Ok(Self::Card),
            "manual" => Ok(Self::Manual),
            _ => Err(format!("invalid payment method: {s}")),
        }
    }
}

/// Which role an address plays for its owner.
///
/// The one-default-per-(owner, type) invariant is keyed on this.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "address_type", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum AddressType {
    Shipping,
    Billing,
    Both,
}

impl std::fmt::Display for AddressType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Shipping => write!(f, "shipping"),
            Self::Billing => write!(f, "billing"),
            Self::Both => write!(f, "both"),
        }
    }
}

impl std::str::FromStr for AddressType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "shipping" => Ok(Self::Shipping),
            "billing" => Ok(Self::Billing),
            "both" => Ok(Self::Both),
            _ => Err(format!("invalid address type: {s}")),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_payment_method_roundtrip() {
        assert_eq!("card".parse::<PaymentMethod>().unwrap(), PaymentMethod::Card);
        assert_eq!(PaymentMethod::Manual.to_string(), "manual");
        assert!("bitcoin".parse::<PaymentMethod>().is_err());
    }

    #[test]
    fn test_address_type_serde() {
        let json = serde_json::to_string(&AddressType::Shipping).unwrap();
        assert_eq!(json, "\"shipping\"");
        let back: AddressType = serde_json::from_str("\"both\"").unwrap();
        assert_eq!(back, AddressType::Both);
    }

    #[test]
    fn test_default_order_status_is_pending() {
        assert_eq!(OrderStatus::default(), OrderStatus::PendingPayment);
    }
}
