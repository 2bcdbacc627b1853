//! Type-safe money representation using decimal arithmetic.
//!
//! Monetary amounts are `rust_decimal::Decimal` in the currency's standard
//! unit. Rounding to the currency's exponent happens only at boundaries
//! (display, persistence, the gateway wire format), never between
//! intermediate arithmetic steps.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// A monetary amount with currency information.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    /// Amount in the currency's standard unit (e.g., dollars, not cents).
    pub amount: Decimal,
    /// ISO 4217 currency code.
    pub currency_code: CurrencyCode,
}

impl Money {
    /// Create a new monetary amount.
    #[must_use]
    pub const fn new(amount: Decimal, currency_code: CurrencyCode) -> Self {
        Self {
            amount,
            currency_code,
        }
    }

    /// Round to the currency's exponent, away from zero on midpoints.
    ///
    /// Banker's rounding is wrong for settlement amounts; 0.005 must round
    /// up to 0.01.
    #[must_use]
    pub fn rounded(&self) -> Self {
        Self {
            amount: self.amount.round_dp_with_strategy(
                self.currency_code.decimal_places(),
                RoundingStrategy::MidpointAwayFromZero,
            ),
            currency_code: self.currency_code,
        }
    }

    /// Convert to integer minor units (e.g., cents) for the gateway wire
    /// format.
    ///
    /// Rounds to the currency exponent first, so `128.00` becomes `12800`.
    /// Returns `None` if the amount does not fit in an `i64`.
    #[must_use]
    pub fn to_minor_units(&self) -> Option<i64> {
        let scaled = self.rounded().amount
            * Decimal::from(10_i64.pow(self.currency_code.decimal_places()));
        scaled.try_into().ok()
    }

    /// Format for display (e.g., "$19.99").
    #[must_use]
    pub fn display(&self) -> String {
        format!(
            "{}{:.prec$}",
            self.currency_code.symbol(),
            self.rounded().amount,
            prec = self.currency_code.decimal_places() as usize
        )
    }
}

/// ISO 4217 currency codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CurrencyCode {
    #[default]
    USD,
    PEN,
    EUR,
    GBP,
}

impl CurrencyCode {
    /// The currency symbol used for display formatting.
    #[must_use]
    pub const fn symbol(&self) -> &'static str {
        match self {
            Self::USD => "$",
            Self::PEN => "S/",
            Self::EUR => "€",
            Self::GBP => "£",
        }
    }

    /// The ISO 4217 alphabetic code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::USD => "USD",
            Self::PEN => "PEN",
            Self::EUR => "EUR",
            Self::GBP => "GBP",
        }
    }

    /// Number of digits after the decimal point (the ISO 4217 exponent).
    #[must_use]
    pub const fn decimal_places(&self) -> u32 {
        match self {
            Self::USD | Self::PEN | Self::EUR | Self::GBP => 2,
        }
    }
}

impl std::fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl std::str::FromStr for CurrencyCode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "USD" => Ok(Self::USD),
            "PEN" => Ok(Self::PEN),
            "EUR" => Ok(Self::EUR),
            "GBP" => Ok(Self::GBP),
            _ => Err(format!("unsupported currency code: {s}")),
        }
    }
}
