//! Error types for escrow-core.

use thiserror::Error;

/// Errors produced while parsing or constructing core primitives.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// Invalid amount (overflow or malformed input).
    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    /// Invalid account identifier.
    #[error("invalid account: {0}")]
    InvalidAccount(String),
}
