//! Validated email address newtype.
//!
//! `Email` guarantees the wrapped string passed basic structural validation
//! at construction time. Deliverability is not checked; that is the mail
//! provider's job.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur when parsing an email address.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EmailError {
    /// The address is empty or whitespace.
    #[error("email address is empty")]
    Empty,
    /// The address is missing an `@` or has an empty local/domain part.
    #[error("email address is malformed: {0}")]
    Malformed(String),
    /// The address exceeds the maximum length (254 octets per RFC 5321).
    #[error("email address is too long ({0} > 254)")]
    TooLong(usize),
}

/// A validated email address.
///
/// Stored lowercased so lookups are case-insensitive.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Email(String);

impl Email {
    /// Parse and validate an email address.
    ///
    /// # Errors
    ///
    /// Returns `EmailError` if the address is empty, malformed, or too long.
    pub fn parse(input: &str) -> Result<Self, EmailError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(EmailError::Empty);
        }
        if trimmed.len() > 254 {
            return Err(EmailError::TooLong(trimmed.len()));
        }

        let Some((local, domain)) = trimmed.rsplit_once('@') else {
            return Err(EmailError::Malformed(trimmed.to_owned()));
        };
        if local.is_empty() || domain.is_empty() || !domain.contains('.') {
            return Err(EmailError::Malformed(trimmed.to_owned()));
        }
        if trimmed.chars().any(char::is_whitespace) {
            return Err(EmailError::Malformed(trimmed.to_owned()));
        }

        Ok(Self(trimmed.to_lowercase()))
    }

    /// Get the address as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Email {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for Email {
    type Error = EmailError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Email> for String {
    fn from(email: Email) -> Self {
        email.0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid() {
        let email = Email::parse("Shopper@Example.COM").unwrap();
        assert_eq!(email.as_str(), "shopper@example.com");
    }

    #[test]
    fn test_parse_rejects_empty() {
        assert_eq!(Email::parse("   "), Err(EmailError::Empty));
    }

    #[test]
    fn test_parse_rejects_missing_at() {
        assert!(matches!(
            Email::parse("shopper.example.com"),
            Err(EmailError::Malformed(_))
        ));
    }

    #[test]
    fn test_parse_rejects_bare_domain() {
        assert!(matches!(
            Email::parse("shopper@localhost"),
            Err(EmailError::Malformed(_))
        ));
    }

    #[test]
    fn test_serde_validates_on_deserialize() {
        let ok: Result<Email, _> = serde_json::from_str("\"a@b.co\"");
        assert!(ok.is_ok());
        let bad: Result<Email, _> = serde_json::from_str("\"not-an-email\"");
        assert!(bad.is_err());
    }
}
