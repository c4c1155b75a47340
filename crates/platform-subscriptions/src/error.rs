//! Error types for subscription operations
//!
//! Every engine operation fails with a [`SubscriptionError`]. Storage and
//! validation errors from the lower crates are folded into it so the request
//! layer only has one type to map onto responses.

use platform_org::{ValidationError, ValidityError};
use platform_store::StoreError;
use thiserror::Error;

use crate::config::ConfigError;

/// Subscription engine error types.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubscriptionError {
    /// Organization, subscription or plan does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Malformed input (duration phrase, quota, currency, status)
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Operation would break a reference or a uniqueness rule
    #[error("Conflict: {0}")]
    Conflict(String),

    /// A plan limit has been reached
    #[error("Limit reached: {0}")]
    LimitReached(String),

    /// Backend failure; the transaction was rolled back
    #[error("Storage error: {0}")]
    Storage(StoreError),

    /// Invalid engine configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type for subscription operations.
pub type SubscriptionResult<T> = Result<T, SubscriptionError>;

impl SubscriptionError {
    /// Shorthand for a `NotFound` error.
    pub fn not_found(message: impl Into<String>) -> Self {
        SubscriptionError::NotFound(message.into())
    }

    /// Check if this error should be logged at error level.
    pub fn is_server_error(&self) -> bool {
        matches!(
            self,
            SubscriptionError::Storage(_) | SubscriptionError::Config(_)
        )
    }

    /// Get HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            SubscriptionError::NotFound(_) => 404,
            SubscriptionError::Validation(_) => 400,
            SubscriptionError::Conflict(_) => 409,
            SubscriptionError::LimitReached(_) => 403,
            SubscriptionError::Storage(_) | SubscriptionError::Config(_) => 500,
        }
    }

    /// Get error code for API responses.
    pub fn error_code(&self) -> &'static str {
        match self {
            SubscriptionError::NotFound(_) => "NOT_FOUND",
            SubscriptionError::Validation(_) => "VALIDATION_ERROR",
            SubscriptionError::Conflict(_) => "CONFLICT",
            SubscriptionError::LimitReached(_) => "LIMIT_REACHED",
            SubscriptionError::Storage(_) => "STORAGE_ERROR",
            SubscriptionError::Config(_) => "CONFIG_ERROR",
        }
    }
}

impl From<StoreError> for SubscriptionError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => SubscriptionError::NotFound("record does not exist".to_string()),
            StoreError::AlreadyExists => {
                SubscriptionError::Conflict("record already exists".to_string())
            }
            StoreError::Conflict(message) => SubscriptionError::Conflict(message),
            StoreError::Backend(_) => SubscriptionError::Storage(err),
        }
    }
}

impl From<ValidationError> for SubscriptionError {
    fn from(err: ValidationError) -> Self {
        SubscriptionError::Validation(err.to_string())
    }
}

impl From<ValidityError> for SubscriptionError {
    fn from(err: ValidityError) -> Self {
        SubscriptionError::Validation(format!("invalid duration: {}", err))
    }
}

impl From<ConfigError> for SubscriptionError {
    fn from(err: ConfigError) -> Self {
        SubscriptionError::Config(err.to_string())
    }
}
