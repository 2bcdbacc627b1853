//! External collaborators of the checkout flow.
//!
//! # Services
//!
//! - `gateway` - Server-side charge exchange with the payment processor
//! - `email` - Order confirmation dispatch (best-effort)

pub mod email;
pub mod gateway;

pub use email::{EmailError, EmailService};
pub use gateway::{ChargeError, ChargeRequest, GatewayCharge, GatewayClient};
