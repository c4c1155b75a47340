//! Validation errors for domain values.

use thiserror::Error;

/// A domain value failed validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A quota limit that must be positive was zero
    #[error("{field} must be greater than zero")]
    NonPositiveLimit {
        /// Name of the offending field
        field: &'static str,
    },

    /// Price below zero
    #[error("price must not be negative")]
    NegativePrice,

    /// Currency is not a 3-letter code
    #[error("invalid currency code: {0:?}")]
    InvalidCurrency(String),

    /// A required text field was blank
    #[error("{field} must not be empty")]
    EmptyField {
        /// Name of the offending field
        field: &'static str,
    },

    /// Unknown subscription status string
    #[error("unknown subscription status: {0:?}")]
    InvalidStatus(String),

    /// Manual transition into the expired state
    #[error("subscriptions can only be expired by the expiry sweep")]
    ManualExpiry,
}

/// A duration phrase such as `"1 year"` could not be parsed or applied.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidityError {
    /// Nothing to parse
    #[error("duration phrase is empty")]
    Empty,

    /// A number was not followed by a unit
    #[error("missing unit after {0:?}")]
    MissingUnit(String),

    /// Unit word not recognised
    #[error("unknown duration unit {0:?}")]
    UnknownUnit(String),

    /// Number could not be read or does not fit
    #[error("invalid number {0:?}")]
    InvalidNumber(String),

    /// Applying the period left the representable date range
    #[error("duration moves the date out of range")]
    OutOfRange,
}
