//! # Storefront Error Types
//!
//! Typed error handling for the Tallow & Co. storefront.
//! All fallible operations return `Result<T, ShopError>`.

use crate::order::OrderStatus;
use thiserror::Error;
use uuid::Uuid;

/// Core error type for all storefront operations
#[derive(Debug, Error)]
pub enum ShopError {
    /// Configuration errors (missing keys, invalid config)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Bad user input (quantity out of range, malformed contact fields)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Product not found in catalog
    #[error("Product not found: {product_id}")]
    ProductNotFound { product_id: String },

    /// Persistent store unavailable or constraint violation
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Payment processor API error
    #[error("Processor error [{provider}]: {message}")]
    Processor { provider: String, message: String },

    /// Network/HTTP error communicating with the processor
    #[error("Network error: {0}")]
    Network(String),

    /// Webhook signature verification failed
    #[error("Webhook verification failed: {0}")]
    WebhookVerification(String),

    /// Webhook payload parsing error
    #[error("Webhook parse error: {0}")]
    WebhookParse(String),

    /// Processor-confirmed charge does not equal the stored order total.
    /// Security-relevant anomaly, distinct from an ordinary failure.
    #[error(
        "Amount mismatch for order {order_id}: processor reported {reported} but order total is {expected}"
    )]
    AmountMismatch {
        order_id: Uuid,
        expected: i64,
        reported: i64,
    },

    /// Order not found (bad confirmation token or unknown id)
    #[error("Order not found")]
    OrderNotFound,

    /// Requested status transition is not legal from the current status
    #[error("Order is {current}; cannot transition to {requested}")]
    IllegalTransition {
        current: OrderStatus,
        requested: OrderStatus,
    },

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Internal error (should not happen)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ShopError {
    /// Returns true if the caller should be told to retry
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ShopError::Network(_) | ShopError::Processor { .. } | ShopError::Persistence(_)
        )
    }

    /// Returns the HTTP status code appropriate for this error
    pub fn status_code(&self) -> u16 {
        match self {
            ShopError::Configuration(_) => 500,
            ShopError::Validation(_) => 400,
            ShopError::ProductNotFound { .. } => 404,
            ShopError::Persistence(_) => 503,
            ShopError::Processor { .. } => 502,
            ShopError::Network(_) => 503,
            ShopError::WebhookVerification(_) => 401,
            ShopError::WebhookParse(_) => 400,
            ShopError::AmountMismatch { .. } => 409,
            ShopError::OrderNotFound => 404,
            ShopError::IllegalTransition { .. } => 409,
            ShopError::Serialization(_) => 500,
            ShopError::Internal(_) => 500,
        }
    }
}

/// Result type alias for storefront operations
pub type ShopResult<T> = Result<T, ShopError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_errors() {
        assert!(ShopError::Network("timeout".into()).is_retryable());
        assert!(ShopError::Persistence("store unavailable".into()).is_retryable());
        assert!(!ShopError::Validation("quantity out of range".into()).is_retryable());
        assert!(!ShopError::AmountMismatch {
            order_id: Uuid::new_v4(),
            expected: 5897,
            reported: 100,
        }
        .is_retryable());
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(ShopError::Validation("test".into()).status_code(), 400);
        assert_eq!(ShopError::OrderNotFound.status_code(), 404);
        assert_eq!(
            ShopError::WebhookVerification("bad signature".into()).status_code(),
            401
        );
        assert_eq!(
            ShopError::AmountMismatch {
                order_id: Uuid::new_v4(),
                expected: 5897,
                reported: 1,
            }
            .status_code(),
            409
        );
        assert_eq!(
            ShopError::IllegalTransition {
                current: OrderStatus::Paid,
                requested: OrderStatus::Cancelled,
            }
            .status_code(),
            409
        );
    }
}
