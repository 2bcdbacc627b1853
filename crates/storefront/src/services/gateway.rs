//! Payment gateway charge client.
//!
//! The trusted half of the two-phase payment protocol: the hosted widget
//! tokenizes card details in the browser, and this client exchanges the
//! resulting single-use token for a charge, authenticated with the store's
//! secret key. Amounts travel as integer minor units; the order number rides
//! along as the correlation id.
//!
//! Charges are never retried here - a failed charge consumed its token, so
//! a retry must start over from tokenization.

use reqwest::header::{HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use copperleaf_core::CurrencyCode;

use crate::config::GatewayConfig;

/// Errors from the charge exchange.
#[derive(Debug, Error)]
pub enum ChargeError {
    /// The gateway rejected the charge with a merchant-facing reason.
    #[error("declined: {message}")]
    Declined { message: String },

    /// The gateway answered with a non-success status and no decline reason.
    #[error("gateway error {status}: {message}")]
    Gateway { status: u16, message: String },

    /// No response at all (connect failure, timeout).
    #[error("network error: {0}")]
    Network(String),

    /// The gateway answered 2xx with a body we could not parse.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// A charge to submit to the gateway.
#[derive(Debug, Clone)]
pub struct ChargeRequest {
    /// Single-use token from the client tokenization phase.
    pub token: String,
    /// Amount in integer minor units (e.g., cents).
    pub amount_minor: i64,
    pub currency_code: CurrencyCode,
    pub description: String,
    /// Buyer email, passed through as antifraud metadata.
    pub email: String,
    /// Correlation id: the order number this charge settles.
    pub order_number: String,
}

/// A successful charge.
#[derive(Debug, Clone)]
pub struct GatewayCharge {
    /// The gateway's charge id.
    pub id: String,
}

/// Wire format of the charge call.
#[derive(Debug, Serialize)]
struct ChargeBody<'a> {
    amount: i64,
    currency_code: &'a str,
    email: &'a str,
    source_id: &'a str,
    description: &'a str,
    metadata: ChargeMetadata<'a>,
}

#[derive(Debug, Serialize)]
struct ChargeMetadata<'a> {
    order_number: &'a str,
}

/// Successful charge response body.
#[derive(Debug, Deserialize)]
struct ChargeResponse {
    id: String,
}

/// Gateway error body; `merchant_message` carries the decline reason when
/// the gateway has one.
#[derive(Debug, Deserialize)]
struct GatewayErrorBody {
    #[serde(default)]
    merchant_message: Option<String>,
    #[serde(default)]
    user_message: Option<String>,
}

/// Client for the gateway's charge endpoint.
#[derive(Debug, Clone)]
pub struct GatewayClient {
    client: reqwest::Client,
    api_base: String,
}

impl GatewayClient {
    /// Create a new gateway client authenticated with the store's secret key.
    ///
    /// # Errors
    ///
    /// Returns an error if the secret key is not a valid header value or the
    /// HTTP client fails to build.
    pub fn new(config: &GatewayConfig) -> Result<Self, ChargeError> {
        let mut headers = HeaderMap::new();

        let auth_value = format!("Bearer {}", config.secret_key.expose_secret());
        let mut auth_header = HeaderValue::from_str(&auth_value)
            .map_err(|e| ChargeError::InvalidResponse(format!("invalid secret key: {e}")))?;
        auth_header.set_sensitive(true);
        headers.insert("Authorization", auth_header);
        headers.insert("Content-Type", HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| ChargeError::Network(e.to_string()))?;

        Ok(Self {
            client,
            api_base: config.api_base.clone(),
        })
    }

    /// Exchange a single-use token for a charge.
    ///
    /// # Errors
    ///
    /// - `Declined` when the gateway returns a merchant-facing reason
    /// - `Gateway` for other non-success responses
    /// - `Network` when no response arrives
    /// - `InvalidResponse` when a 2xx body does not parse
    #[tracing::instrument(
        skip(self, request),
        fields(order_number = %request.order_number, amount_minor = request.amount_minor)
    )]
    pub async fn charge(&self, request: &ChargeRequest) -> Result<GatewayCharge, ChargeError> {
        let url = format!("{}/charges", self.api_base);
        let body = ChargeBody {
            amount: request.amount_minor,
            currency_code: request.currency_code.code(),
            email: &request.email,
            source_id: &request.token,
            description: &request.description,
            metadata: ChargeMetadata {
                order_number: &request.order_number,
            },
        };

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| ChargeError::Network(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            let charge: ChargeResponse = response
                .json()
                .await
                .map_err(|e| ChargeError::InvalidResponse(e.to_string()))?;
            tracing::info!(
                charge_id = %charge.id,
                order_number = %request.order_number,
                "gateway charge succeeded"
            );
            return Ok(GatewayCharge { id: charge.id });
        }

        let text = response.text().await.unwrap_or_default();
        Err(classify_failure(status.as_u16(), &text))
    }
}

/// Map a non-success gateway response onto the error taxonomy.
///
/// A merchant-facing message means a decline (surfaced verbatim to the
/// shopper); anything else is a gateway fault.
fn classify_failure(status: u16, body: &str) -> ChargeError {
    if let Ok(parsed) = serde_json::from_str::<GatewayErrorBody>(body) {
        if let Some(message) = parsed.merchant_message.or(parsed.user_message) {
            return ChargeError::Declined { message };
        }
    }
    ChargeError::Gateway {
        status,
        message: body.to_string(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_decline_with_merchant_message() {
        let body = r#"{"object":"error","merchant_message":"Card reported stolen","user_message":"Your card was declined"}"#;
        let err = classify_failure(400, body);
        assert!(
            matches!(err, ChargeError::Declined { ref message } if message == "Card reported stolen")
        );
    }

    #[test]
    fn test_decline_falls_back_to_user_message() {
        let body = r#"{"user_message":"Insufficient funds"}"#;
        let err = classify_failure(402, body);
        assert!(
            matches!(err, ChargeError::Declined { ref message } if message == "Insufficient funds")
        );
    }

    #[test]
    fn test_non_json_failure_is_gateway_error() {
        let err = classify_failure(503, "upstream unavailable");
        assert!(matches!(err, ChargeError::Gateway { status: 503, .. }));
    }

    #[test]
    fn test_json_without_message_is_gateway_error() {
        let err = classify_failure(500, r#"{"object":"error"}"#);
        assert!(matches!(err, ChargeError::Gateway { status: 500, .. }));
    }

    #[test]
    fn test_charge_body_wire_format() {
        let body = ChargeBody {
            amount: 12800,
            currency_code: "USD",
            email: "shopper@example.com",
            source_id: "tkn_test_abc",
            description: "Copperleaf order CL-20260827-XYZ123",
            metadata: ChargeMetadata {
                order_number: "CL-20260827-XYZ123",
            },
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["amount"], 12800);
        assert_eq!(json["source_id"], "tkn_test_abc");
        assert_eq!(json["metadata"]["order_number"], "CL-20260827-XYZ123");
    }
}
