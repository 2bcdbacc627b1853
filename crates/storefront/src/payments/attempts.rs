//! In-flight payment attempt registry.
//!
//! Replaces a single global widget-callback slot with a correlation table
//! keyed by a per-attempt id. Each session holds at most one live attempt:
//! starting a new one invalidates the previous, so a stale widget callback
//! from an abandoned attempt can never complete a later checkout. Attempts
//! expire after [`ATTEMPT_TTL`]; closing the widget without a callback
//! simply lets the entry age out, leaving no other server-side trace.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, Utc};
use thiserror::Error;

use copperleaf_core::AttemptId;

/// How long an issued attempt stays redeemable.
pub const ATTEMPT_TTL: Duration = Duration::from_secs(15 * 60);

/// Why an attempt id could not be consumed.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AttemptError {
    /// Never issued, already consumed, or superseded by a newer attempt.
    #[error("unknown payment attempt")]
    Unknown,

    /// Issued, but past its TTL.
    #[error("payment attempt expired")]
    Expired,
}

#[derive(Debug, Clone, Copy)]
struct Attempt {
    issued_at: DateTime<Utc>,
}

/// Correlation table of in-flight payment attempts.
///
/// Ids are single-use: consuming one removes it, so a retry must start a
/// fresh attempt (and therefore a fresh single-use token from the widget).
#[derive(Debug)]
pub struct AttemptRegistry {
    inner: Mutex<HashMap<AttemptId, Attempt>>,
    ttl: Duration,
}

impl Default for AttemptRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl AttemptRegistry {
    /// Create a registry with the standard TTL.
    #[must_use]
    pub fn new() -> Self {
        Self::with_ttl(ATTEMPT_TTL)
    }

    /// Create a registry with a custom TTL (tests).
    #[must_use]
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            inner: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    /// Issue a fresh attempt id, invalidating the session's previous one.
    ///
    /// `previous` is the attempt the session last held, if any; it is
    /// removed so only the newest attempt can ever complete.
    pub fn begin(&self, previous: Option<AttemptId>) -> AttemptId {
        let id = AttemptId::generate();
        let now = Utc::now();

        #[allow(clippy::unwrap_used)] // lock poisoning is unrecoverable
        let mut attempts = self.inner.lock().unwrap();
        if let Some(previous) = previous {
            attempts.remove(&previous);
        }
        attempts.retain(|_, attempt| !Self::is_expired(attempt, now, self.ttl));
        attempts.insert(id, Attempt { issued_at: now });
        id
    }

    /// Redeem an attempt id, removing it either way.
    ///
    /// # Errors
    ///
    /// Returns `AttemptError::Unknown` for ids never issued or already
    /// consumed, `AttemptError::Expired` for ids past their TTL.
    pub fn consume(&self, id: AttemptId) -> Result<(), AttemptError> {
        let now = Utc::now();

        #[allow(clippy::unwrap_used)] // lock poisoning is unrecoverable
        let mut attempts = self.inner.lock().unwrap();
        let attempt = attempts.remove(&id).ok_or(AttemptError::Unknown)?;

        if Self::is_expired(&attempt, now, self.ttl) {
            return Err(AttemptError::Expired);
        }
        Ok(())
    }

    /// Drop an attempt without consuming it (explicit abandonment).
    pub fn abandon(&self, id: AttemptId) {
        #[allow(clippy::unwrap_used)] // lock poisoning is unrecoverable
        let mut attempts = self.inner.lock().unwrap();
        attempts.remove(&id);
    }

    fn is_expired(attempt: &Attempt, now: DateTime<Utc>, ttl: Duration) -> bool {
        let age = now.signed_duration_since(attempt.issued_at);
        age.to_std().map_or(true, |age| age > ttl)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_consume_is_single_use() {
        let registry = AttemptRegistry::new();
        let id = registry.begin(None);

        assert!(registry.consume(id).is_ok());
        assert_eq!(registry.consume(id), Err(AttemptError::Unknown));
    }

    #[test]
    fn test_unknown_attempt_rejected() {
        let registry = AttemptRegistry::new();
        assert_eq!(
            registry.consume(AttemptId::generate()),
            Err(AttemptError::Unknown)
        );
    }

    #[test]
    fn test_new_attempt_invalidates_previous() {
        let registry = AttemptRegistry::new();
        let first = registry.begin(None);
        let second = registry.begin(Some(first));

        // The stale id from the abandoned attempt can no longer complete
        assert_eq!(registry.consume(first), Err(AttemptError::Unknown));
        assert!(registry.consume(second).is_ok());
    }

    #[test]
    fn test_expired_attempt_rejected() {
        let registry = AttemptRegistry::with_ttl(Duration::ZERO);
        let id = registry.begin(None);
        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(registry.consume(id), Err(AttemptError::Expired));
        // Expired entries are removed on the failed consume
        assert_eq!(registry.consume(id), Err(AttemptError::Unknown));
    }

    #[test]
    fn test_abandon_removes_attempt() {
        let registry = AttemptRegistry::new();
        let id = registry.begin(None);
        registry.abandon(id);
        assert_eq!(registry.consume(id), Err(AttemptError::Unknown));
    }
}
