//! Email service for order notifications.
//!
//! Uses SMTP via lettre. Dispatch is best-effort: callers log failures and
//! never let them fail the primary operation.

use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::SinglePart,
    transport::smtp::{Error as SmtpError, authentication::Credentials},
};
use rust_decimal::Decimal;
use secrecy::ExposeSecret;
use thiserror::Error;

use copperleaf_core::Money;

use crate::config::EmailConfig;
use crate::models::Order;

/// Errors that can occur when sending email.
#[derive(Debug, Error)]
pub enum EmailError {
    /// SMTP transport error.
    #[error("SMTP error: {0}")]
    Smtp(#[from] SmtpError),

    /// Failed to build email message.
    #[error("Failed to build message: {0}")]
    MessageBuild(#[from] lettre::error::Error),

    /// Invalid email address.
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),
}

/// Email service for transactional checkout mail.
#[derive(Clone)]
pub struct EmailService {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from_address: String,
    order_bcc: Option<String>,
}

impl EmailService {
    /// Create a new email service from configuration.
    ///
    /// # Errors
    ///
    /// Returns error if the SMTP relay cannot be configured.
    pub fn new(config: &EmailConfig) -> Result<Self, SmtpError> {
        let credentials = Credentials::new(
            config.smtp_username.clone(),
            config.smtp_password.expose_secret().to_string(),
        );

        let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?
            .port(config.smtp_port)
            .credentials(credentials)
            .build();

        Ok(Self {
            mailer,
            from_address: config.from_address.clone(),
            order_bcc: config.order_bcc.clone(),
        })
    }

    /// Send an order confirmation to the shopper.
    ///
    /// # Errors
    ///
    /// Returns error if the message cannot be built or sent.
    #[tracing::instrument(skip(self, order), fields(order_number = %order.order_number))]
    pub async fn send_order_confirmation(&self, order: &Order) -> Result<(), EmailError> {
        let subject = format!("Your Copperleaf order {}", order.order_number);
        let body = order_confirmation_text(order);

        let mut builder = Message::builder()
            .from(
                self.from_address
                    .parse()
                    .map_err(|_| EmailError::InvalidAddress(self.from_address.clone()))?,
            )
            .to(order
                .customer
                .email
                .parse()
                .map_err(|_| EmailError::InvalidAddress(order.customer.email.clone()))?)
            .subject(subject);

        if let Some(bcc) = &self.order_bcc {
            builder = builder.bcc(
                bcc.parse()
                    .map_err(|_| EmailError::InvalidAddress(bcc.clone()))?,
            );
        }

        let message = builder.singlepart(SinglePart::plain(body))?;

        self.mailer.send(message).await?;
        Ok(())
    }
}

/// Plain-text confirmation body.
fn order_confirmation_text(order: &Order) -> String {
    use std::fmt::Write as _;

    let amount = |value: Decimal| Money::new(value, order.currency_code).display();

    let mut body = format!(
        "Hi {},\n\nThanks for your order {}.\n\n",
        order.customer.first_name, order.order_number
    );

    for item in &order.items {
        let _ = writeln!(
            body,
            "  {} x variant {} @ {}",
            item.quantity,
            item.variant_id,
            amount(item.unit_price)
        );
    }

    let _ = write!(
        body,
        "\nSubtotal: {}\nTax: {}\nShipping: {}\nTotal: {}\n\nStatus: {}\n",
        amount(order.subtotal),
        amount(order.tax),
        amount(order.shipping),
        amount(order.total),
        order.status,
    );

    body
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::models::{AddressSnapshot, CustomerInfo, OrderItem};
    use chrono::Utc;
    use copperleaf_core::{
        CurrencyCode, OrderId, OrderStatus, PaymentMethod, ProductId, VariantId,
    };
    use rust_decimal::Decimal;

    fn sample_order() -> Order {
        Order {
            id: OrderId::new(1),
            order_number: "CL-20260827-AB12CD".to_string(),
            user_id: None,
            customer: CustomerInfo {
                email: "shopper@example.com".to_string(),
                first_name: "Ada".to_string(),
                last_name: "Lovelace".to_string(),
                phone: Some("+51 999 999 999".to_string()),
            },
            shipping_address: AddressSnapshot {
                line1: "12 Analytical Way".to_string(),
                line2: None,
                city: "Lima".to_string(),
                province: "Lima".to_string(),
                postal_code: "15001".to_string(),
                country_code: "PE".to_string(),
            },
            billing_address: None,
            payment_method: PaymentMethod::Card,
            status: OrderStatus::Paid,
            charge_id: Some("chr_test_123".to_string()),
            currency_code: CurrencyCode::USD,
            subtotal: Decimal::new(10000, 2),
            tax: Decimal::new(1800, 2),
            shipping: Decimal::new(1000, 2),
            total: Decimal::new(12800, 2),
            items: vec![OrderItem {
                product_id: ProductId::new(1),
                variant_id: VariantId::new(10),
                quantity: 2,
                unit_price: Decimal::new(5000, 2),
            }],
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_confirmation_text_includes_totals() {
        let text = order_confirmation_text(&sample_order());
        assert!(text.contains("CL-20260827-AB12CD"));
        assert!(text.contains("Total: $128.00"));
        assert!(text.contains("2 x variant 10 @ $50.00"));
        assert!(text.contains("Status: paid"));
    }
}
