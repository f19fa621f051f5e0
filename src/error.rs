//! Error types for the payment-request engine.

use std::sync::Arc;

use rust_decimal::Decimal;

use crate::models::{PaymentRequestId, PaymentStatus};

/// Convenience alias for results produced by this crate.
pub type Result<T> = core::result::Result<T, PaylinkError>;

/// Reasons a payment request (or a fetched record) fails validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// A required field was absent or blank.
    #[error("missing required field `{0}`")]
    MissingField(&'static str),

    /// The amount was zero or negative.
    #[error("amount must be greater than zero, got {0}")]
    NonPositiveAmount(Decimal),

    /// The expiry horizon was zero or negative.
    #[error("expiry horizon must be greater than zero")]
    NonPositiveHorizon,

    /// The expiry timestamp does not lie strictly after creation.
    #[error("expires_at must be later than created_at")]
    ExpiryNotAfterCreation,
}

/// All errors that can occur when operating on payment requests.
///
/// Every variant is cheap to clone so that callers coalesced onto a single
/// refresh all observe the same outcome.
#[derive(Debug, Clone, thiserror::Error)]
pub enum PaylinkError {
    /// Creation input (or a fetched record) failed validation.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// No payment request with the given id exists.
    #[error("payment request `{0}` not found")]
    NotFound(PaymentRequestId),

    /// A payment request with the given id is already stored.
    #[error("payment request `{0}` already exists")]
    AlreadyExists(PaymentRequestId),

    /// The requested status write is not a legal transition.
    #[error("illegal transition for payment request `{id}`: {from} -> {to}")]
    IllegalTransition {
        /// Request the transition was attempted on.
        id: PaymentRequestId,
        /// Persisted status at the time of the attempt.
        from: PaymentStatus,
        /// Requested target status.
        to: PaymentStatus,
    },

    /// The persistence collaborator failed to fetch or write.
    #[error("persistence error: {0}")]
    Persistence(Arc<dyn core::error::Error + Send + Sync>),

    /// JSON serialization or deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(Arc<serde_json::Error>),

    /// Configuration values are invalid.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl PaylinkError {
    /// Wraps an arbitrary collaborator failure as [`PaylinkError::Persistence`].
    #[inline]
    #[must_use]
    pub fn persistence<E>(err: E) -> Self
    where
        E: Into<Box<dyn core::error::Error + Send + Sync>>,
    {
        Self::Persistence(Arc::from(err.into()))
    }

    /// Returns `true` if retrying the same operation may succeed.
    ///
    /// Only collaborator failures are transient. Validation, lookup,
    /// duplicate-id, and transition errors fail again with the same input.
    #[inline]
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(*self, Self::Persistence(_))
    }
}

impl From<serde_json::Error> for PaylinkError {
    #[inline]
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(Arc::new(err))
    }
}
