//! Orders and their lifecycle states.

use escrow_core::{AccountId, Amount, AssetRef, Currency, Timestamp};
use serde::{Deserialize, Serialize};

/// Order identifier. Assigned densely from 0 and never reused.
pub type OrderId = u64;

/// The lifecycle state of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderStatus {
    /// Asset is in escrow and the order can be bought or cancelled.
    Active,
    /// A buyer paid and received the asset.
    Fulfilled,
    /// The seller took the asset back.
    Cancelled,
}

impl OrderStatus {
    /// Checks if a transition to the target state is valid.
    #[must_use]
    pub const fn can_transition_to(&self, target: &Self) -> bool {
        matches!(
            (self, target),
            (Self::Active, Self::Fulfilled | Self::Cancelled)
        )
    }

    /// Returns true for `Fulfilled` and `Cancelled`.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        !matches!(self, Self::Active)
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Active => write!(f, "Active"),
            Self::Fulfilled => write!(f, "Fulfilled"),
            Self::Cancelled => write!(f, "Cancelled"),
        }
    }
}

/// A fixed-price offer to sell one escrowed asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    /// Stable handle.
    pub id: OrderId,
    /// Creator of the order and owner of the asset at creation time.
    pub seller: AccountId,
    /// The asset held in escrow.
    pub asset: AssetRef,
    /// Unix time the order was created.
    pub created_at: Timestamp,
    /// Length of the fulfillment window in seconds.
    pub duration: u64,
    /// Exact amount a buyer must pay.
    pub price: Amount,
    /// Medium of payment.
    pub currency: Currency,
    /// If set, the only account allowed to fulfill.
    pub reserved_buyer: Option<AccountId>,
    /// Set once, on fulfillment.
    pub buyer: Option<AccountId>,
    /// Lifecycle state.
    pub status: OrderStatus,
}

impl Order {
    /// Last second at which the order can still be fulfilled.
    ///
    /// Saturates instead of overflowing; creation rejects windows that
    /// would overflow, so this only matters for hand-built orders.
    #[must_use]
    pub const fn expires_at(&self) -> Timestamp {
        self.created_at.saturating_add(self.duration)
    }

    /// Returns true once `now` is past the fulfillment window.
    #[must_use]
    pub const fn is_expired(&self, now: Timestamp) -> bool {
        now > self.expires_at()
    }

    /// Returns true while the asset is in escrow.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        matches!(self.status, OrderStatus::Active)
    }
}
