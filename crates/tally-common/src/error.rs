//! Error types for Tally
//!
//! This module defines the common error type used throughout the system.

use crate::types::CounterNameError;
use thiserror::Error;

/// Common result type for Tally operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error type for Tally
///
/// Record absence is not represented here: reads of possibly-missing
/// records return `Option` and every caller recovers locally with a
/// default or initial value.
#[derive(Debug, Error)]
pub enum Error {
    // Store errors
    #[error("transaction failed: {0}")]
    TransactionFailed(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(String),

    // Caller errors
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("invalid counter name: {0}")]
    InvalidCounterName(#[from] CounterNameError),
}

impl Error {
    /// Create a storage error
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    /// Create a transaction failure
    pub fn transaction_failed(msg: impl Into<String>) -> Self {
        Self::TransactionFailed(msg.into())
    }

    /// Create an invalid argument error
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    /// Create a serialization error
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization(msg.into())
    }

    /// Check if this is a retryable error
    ///
    /// A failed transaction left no state behind, so the caller may simply
    /// call the operation again; the retry re-reads current state.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::TransactionFailed(_) | Self::Storage(_))
    }
}
