//! Payment attempt correlation.
//!
//! The hosted tokenization widget reports its outcome out-of-band, so every
//! checkout attempt is issued a correlation id up front. The registry in
//! [`attempts`] is the single place those ids live; a charge carrying an
//! unknown, expired, or already-consumed id never reaches the gateway.

pub mod attempts;

pub use attempts::{AttemptError, AttemptRegistry};
