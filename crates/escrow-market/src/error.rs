//! Error types for escrow-market.

use escrow_core::{AccountId, AssetRef, Timestamp};
use escrow_ledger::{CustodyError, LedgerError};
use thiserror::Error;

use crate::order::{OrderId, OrderStatus};

/// Result alias for marketplace operations.
pub type Result<T> = std::result::Result<T, MarketError>;

/// Broad class of a [`MarketError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The caller is not allowed to perform the transition.
    Authorization,
    /// The order is missing or in the wrong state.
    State,
    /// A collaborator (custody or ledger) refused the side effect.
    Dependency,
    /// The request itself is malformed.
    Validation,
}

/// Errors that can occur in marketplace operations.
///
/// Every rejection has its own variant. A returned error always means the
/// call changed nothing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MarketError {
    /// The caller does not hold the asset it tried to list.
    #[error("{caller} does not own {asset}")]
    NotOwner {
        /// The asset being listed.
        asset: AssetRef,
        /// The caller.
        caller: AccountId,
    },

    /// The asset holder never granted the escrow transfer rights.
    #[error("escrow is not approved to take custody of {asset}")]
    NotApproved {
        /// The asset being listed.
        asset: AssetRef,
    },

    /// Order parameters are out of range.
    #[error("invalid order parameters: {0}")]
    InvalidParameters(String),

    /// Order not found.
    #[error("order not found: {0}")]
    NotFound(OrderId),

    /// The order is no longer active.
    #[error("order {order_id} is not active ({status})")]
    NotActive {
        /// The order.
        order_id: OrderId,
        /// Its terminal status.
        status: OrderStatus,
    },

    /// The seller tried to cancel an order that was already bought.
    #[error("order was already fulfilled")]
    AlreadyFulfilled {
        /// The order.
        order_id: OrderId,
    },

    /// The fulfillment window has closed.
    #[error("order {order_id} expired at {expires_at} (now {now})")]
    Expired {
        /// The order.
        order_id: OrderId,
        /// End of the fulfillment window.
        expires_at: Timestamp,
        /// Time of the attempt.
        now: Timestamp,
    },

    /// The seller tried to buy its own order.
    #[error("cannot fulfill your own order")]
    SelfFulfillment {
        /// The order.
        order_id: OrderId,
    },

    /// The escrow account tried to buy an order it holds the asset for.
    #[error("the escrow account cannot fulfill order {order_id}")]
    EscrowBuyer {
        /// The order.
        order_id: OrderId,
    },

    /// Someone other than the seller tried to cancel.
    #[error("{caller} is not the seller of order {order_id}")]
    NotSeller {
        /// The order.
        order_id: OrderId,
        /// The caller.
        caller: AccountId,
    },

    /// The order is reserved for a different buyer.
    #[error("order {order_id} is reserved for another buyer")]
    NotReservedBuyer {
        /// The order.
        order_id: OrderId,
        /// The caller.
        caller: AccountId,
    },

    /// The payment ledger refused the transfer.
    #[error("payment failed: {0}")]
    PaymentFailed(#[from] LedgerError),

    /// The custody backend refused to move the asset.
    #[error("custody transfer failed: {0}")]
    CustodyFailed(#[from] CustodyError),

    /// An id or timestamp computation overflowed.
    #[error("arithmetic overflow: {0}")]
    Overflow(String),
}

impl MarketError {
    /// Classifies the error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::NotOwner { .. }
            | Self::NotApproved { .. }
            | Self::NotSeller { .. }
            | Self::SelfFulfillment { .. }
            | Self::EscrowBuyer { .. }
            | Self::NotReservedBuyer { .. } => ErrorKind::Authorization,
            Self::NotFound(_)
            | Self::NotActive { .. }
            | Self::AlreadyFulfilled { .. }
            | Self::Expired { .. } => ErrorKind::State,
            Self::PaymentFailed(_) | Self::CustodyFailed(_) => ErrorKind::Dependency,
            Self::InvalidParameters(_) | Self::Overflow(_) => ErrorKind::Validation,
        }
    }

    /// Returns true if repeating the same call might succeed once the
    /// collaborator's state changes (e.g. after a larger approval).
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self.kind(), ErrorKind::Dependency)
    }
}
