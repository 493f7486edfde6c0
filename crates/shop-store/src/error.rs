//! Store error type and mapping into the application taxonomy.

use shop_core::ShopError;
use thiserror::Error;

/// Errors from the persistence layer
#[derive(Debug, Error)]
pub enum StoreError {
    /// Query or connection failure
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Migration failure at startup
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A stored value could not be decoded into its domain type
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// No order matched the given id or token
    #[error("order not found")]
    NotFound,
}

impl From<StoreError> for ShopError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => ShopError::OrderNotFound,
            other => ShopError::Persistence(other.to_string()),
        }
    }
}
