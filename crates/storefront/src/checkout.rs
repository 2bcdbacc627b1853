//! Checkout step machine and transient form data.
//!
//! Three steps, strictly sequential: cart review, shipping & payment
//! details, confirmation. Transitions move exactly one step at a time,
//! the confirmation step is entered only through [`CheckoutState::complete`]
//! when an order is submitted, and it is terminal - a completed checkout can
//! only be followed by a fresh session.
//!
//! The machine validates requiredness only. Structural validation (email
//! shape, phone patterns, string lengths) is the schema layer's job.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tower_sessions::Session;

use copperleaf_core::PaymentMethod;

use crate::models::session_keys;

/// Errors from step transitions and form validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CheckoutError {
    /// `next_step` past confirmation or any action after completion.
    #[error("checkout is already complete")]
    AlreadyComplete,

    /// `next_step` out of step 2; only a submitted order reaches step 3.
    #[error("submit the order to reach confirmation")]
    SubmissionRequired,

    /// `prev_step` from the first step.
    #[error("already at the first checkout step")]
    AtFirstStep,

    /// Required fields are missing.
    #[error("missing required fields: {}", .0.join(", "))]
    MissingFields(Vec<String>),
}

/// The three checkout steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CheckoutStep {
    #[default]
    CartReview,
    ShippingPayment,
    Confirmation,
}

impl CheckoutStep {
    /// 1-based step number for display.
    #[must_use]
    pub const fn number(self) -> u8 {
        match self {
            Self::CartReview => 1,
            Self::ShippingPayment => 2,
            Self::Confirmation => 3,
        }
    }
}

/// Separate billing address fields, used when billing does not mirror
/// shipping.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillingFields {
    pub line1: String,
    #[serde(default)]
    pub line2: Option<String>,
    pub city: String,
    pub province: String,
    pub postal_code: String,
    pub country_code: String,
}

/// Form data collected through step 2.
///
/// Created empty at checkout start, mutated through step 2, read-only at
/// step 3, discarded when the checkout session ends.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutFormData {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub line1: String,
    #[serde(default)]
    pub line2: Option<String>,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub province: String,
    #[serde(default)]
    pub postal_code: String,
    #[serde(default)]
    pub country_code: String,
    #[serde(default)]
    pub phone: String,
    /// Whether billing mirrors shipping.
    #[serde(default = "default_true")]
    pub same_billing_address: bool,
    /// Billing fields, required only when `same_billing_address` is false.
    #[serde(default)]
    pub billing: Option<BillingFields>,
    #[serde(default)]
    pub payment_method: Option<PaymentMethod>,
}

const fn default_true() -> bool {
    true
}

impl CheckoutFormData {
    /// Check requiredness of every field step 2 collects.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::MissingFields` naming each empty required
    /// field.
    pub fn validate_required(&self) -> Result<(), CheckoutError> {
        let mut missing = Vec::new();

        let required = [
            ("email", &self.email),
            ("first_name", &self.first_name),
            ("last_name", &self.last_name),
            ("line1", &self.line1),
            ("city", &self.city),
            ("province", &self.province),
            ("postal_code", &self.postal_code),
            ("country_code", &self.country_code),
            ("phone", &self.phone),
        ];
        for (name, value) in required {
            if value.trim().is_empty() {
                missing.push(name.to_string());
            }
        }

        if self.payment_method.is_none() {
            missing.push("payment_method".to_string());
        }

        if !self.same_billing_address {
            match &self.billing {
                None => missing.push("billing".to_string()),
                Some(billing) => {
                    let billing_required = [
                        ("billing.line1", &billing.line1),
                        ("billing.city", &billing.city),
                        ("billing.province", &billing.province),
                        ("billing.postal_code", &billing.postal_code),
                        ("billing.country_code", &billing.country_code),
                    ];
                    for (name, value) in billing_required {
                        if value.trim().is_empty() {
                            missing.push(name.to_string());
                        }
                    }
                }
            }
        }

        if missing.is_empty() {
            Ok(())
        } else {
            Err(CheckoutError::MissingFields(missing))
        }
    }
}

/// The per-session checkout state: current step, form data, and (after
/// submission) the order number shown on the confirmation step.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutState {
    pub step: CheckoutStep,
    pub form: CheckoutFormData,
    pub order_number: Option<String>,
}

impl CheckoutState {
    /// Start a fresh checkout at step 1 with an empty form.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance exactly one step.
    ///
    /// Leaving step 1 is never blocked, even with an empty cart - the
    /// caller is responsible for only starting checkout when items exist.
    /// Step 2 has no forward transition: the confirmation step is reached
    /// only through [`Self::complete`] when an order is submitted, so the
    /// machine can never sit at step 3 without an order number. Step 3 is
    /// terminal.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError` when the transition is refused.
    pub fn next_step(&mut self) -> Result<CheckoutStep, CheckoutError> {
        let next = match self.step {
            CheckoutStep::CartReview => CheckoutStep::ShippingPayment,
            CheckoutStep::ShippingPayment => return Err(CheckoutError::SubmissionRequired),
            CheckoutStep::Confirmation => return Err(CheckoutError::AlreadyComplete),
        };
        self.step = next;
        Ok(next)
    }

    /// Go back exactly one step.
    ///
    /// Refused from step 1 (nothing before it) and from step 3 (a
    /// completed checkout cannot reopen its inputs).
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError` when the transition is refused.
    pub fn prev_step(&mut self) -> Result<CheckoutStep, CheckoutError> {
        let prev = match self.step {
            CheckoutStep::CartReview => return Err(CheckoutError::AtFirstStep),
            CheckoutStep::ShippingPayment => CheckoutStep::CartReview,
            CheckoutStep::Confirmation => return Err(CheckoutError::AlreadyComplete),
        };
        self.step = prev;
        Ok(prev)
    }

    /// Replace the collected form data.
    ///
    /// Only legal while the machine is at step 2; step 3 is read-only.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::AlreadyComplete` at step 3.
    pub fn update_form(&mut self, form: CheckoutFormData) -> Result<(), CheckoutError> {
        if self.step == CheckoutStep::Confirmation {
            return Err(CheckoutError::AlreadyComplete);
        }
        self.form = form;
        Ok(())
    }

    /// Record the submitted order and move to the confirmation step.
    pub fn complete(&mut self, order_number: String) {
        self.order_number = Some(order_number);
        self.step = CheckoutStep::Confirmation;
    }
}

// =============================================================================
// Session Persistence
// =============================================================================

/// Load the checkout state from the session, starting fresh if absent.
///
/// # Errors
///
/// Returns the session store error if the read fails.
pub async fn load(session: &Session) -> Result<CheckoutState, tower_sessions::session::Error> {
    Ok(session
        .get::<CheckoutState>(session_keys::CHECKOUT)
        .await?
        .unwrap_or_default())
}

/// Persist the checkout state to the session.
///
/// # Errors
///
/// Returns the session store error if the write fails.
pub async fn save(
    session: &Session,
    state: &CheckoutState,
) -> Result<(), tower_sessions::session::Error> {
    session.insert(session_keys::CHECKOUT, state).await
}

/// Discard the checkout state (success or abandonment).
///
/// The cart is deliberately left alone; navigating away mid-checkout keeps
/// the cart intact while the form data is dropped.
///
/// # Errors
///
/// Returns the session store error if the removal fails.
pub async fn discard(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session
        .remove::<CheckoutState>(session_keys::CHECKOUT)
        .await
        .map(|_| ())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn complete_form() -> CheckoutFormData {
        CheckoutFormData {
            email: "shopper@example.com".to_string(),
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            line1: "12 Analytical Way".to_string(),
            line2: None,
            city: "Lima".to_string(),
            province: "Lima".to_string(),
            postal_code: "15001".to_string(),
            country_code: "PE".to_string(),
            phone: "+51 999 999 999".to_string(),
            same_billing_address: true,
            billing: None,
            payment_method: Some(PaymentMethod::Card),
        }
    }

    #[test]
    fn test_initial_state_is_cart_review() {
        let state = CheckoutState::new();
        assert_eq!(state.step, CheckoutStep::CartReview);
        assert_eq!(state.step.number(), 1);
    }

    #[test]
    fn test_forward_one_step_at_a_time() {
        let mut state = CheckoutState::new();
        assert_eq!(state.next_step().unwrap(), CheckoutStep::ShippingPayment);
        assert_eq!(state.step, CheckoutStep::ShippingPayment);
    }

    #[test]
    fn test_submission_is_the_only_path_to_confirmation() {
        let mut state = CheckoutState::new();
        state.next_step().unwrap();
        state.update_form(complete_form()).unwrap();

        // Even with a valid form, stepping forward never reaches step 3;
        // a confirmation without an order number would strand the session.
        assert_eq!(state.next_step(), Err(CheckoutError::SubmissionRequired));
        assert_eq!(state.step, CheckoutStep::ShippingPayment);
        assert_eq!(state.order_number, None);

        state.complete("CL-20260827-ABC123".to_string());
        assert_eq!(state.step, CheckoutStep::Confirmation);
        assert_eq!(state.order_number.as_deref(), Some("CL-20260827-ABC123"));
    }

    #[test]
    fn test_backward_from_first_step_refused() {
        let mut state = CheckoutState::new();
        assert_eq!(state.prev_step(), Err(CheckoutError::AtFirstStep));
    }

    #[test]
    fn test_backward_then_forward() {
        let mut state = CheckoutState::new();
        state.next_step().unwrap();
        assert_eq!(state.prev_step().unwrap(), CheckoutStep::CartReview);
        assert_eq!(state.next_step().unwrap(), CheckoutStep::ShippingPayment);
    }

    #[test]
    fn test_confirmation_is_terminal() {
        let mut state = CheckoutState::new();
        state.complete("CL-20260827-ABC123".to_string());
        assert_eq!(state.step, CheckoutStep::Confirmation);
        assert_eq!(state.next_step(), Err(CheckoutError::AlreadyComplete));
        assert_eq!(state.prev_step(), Err(CheckoutError::AlreadyComplete));
        assert_eq!(
            state.update_form(complete_form()),
            Err(CheckoutError::AlreadyComplete)
        );
    }

    #[test]
    fn test_validate_required_names_missing_fields() {
        let mut form = complete_form();
        form.email = String::new();
        form.phone = "  ".to_string();

        let err = form.validate_required().unwrap_err();
        let CheckoutError::MissingFields(missing) = err else {
            panic!("expected MissingFields");
        };
        assert!(missing.contains(&"email".to_string()));
        assert!(missing.contains(&"phone".to_string()));
        assert_eq!(missing.len(), 2);
    }

    #[test]
    fn test_separate_billing_requires_billing_fields() {
        let mut form = complete_form();
        form.same_billing_address = false;
        form.billing = None;
        assert!(matches!(
            form.validate_required(),
            Err(CheckoutError::MissingFields(ref m)) if m.contains(&"billing".to_string())
        ));

        form.billing = Some(BillingFields {
            line1: "1 Invoice St".to_string(),
            line2: None,
            city: "Lima".to_string(),
            province: "Lima".to_string(),
            postal_code: "15001".to_string(),
            country_code: "PE".to_string(),
        });
        assert!(form.validate_required().is_ok());
    }

    #[test]
    fn test_missing_payment_method_blocks_step_two() {
        let mut form = complete_form();
        form.payment_method = None;
        assert!(matches!(
            form.validate_required(),
            Err(CheckoutError::MissingFields(ref m))
                if m.contains(&"payment_method".to_string())
        ));
    }
}
