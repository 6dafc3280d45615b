//! Marketplace events.
//!
//! Every committed transition appends exactly one [`MarketEvent`] to the
//! [`EventLog`]. The lifecycle engine appends while it still holds the
//! registry lock, so log order is commit order, and anyone who reads an
//! event and then looks up the order sees the committed state.

use escrow_core::{AccountId, Amount, AssetRef, Currency, Timestamp};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::order::OrderId;

/// Tracing target for appended events.
pub const EVENT_TARGET: &str = "escrow_market::events";

/// A state transition observed by the marketplace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarketEvent {
    /// An asset entered escrow under a new order.
    OrderCreated {
        /// The new order.
        order_id: OrderId,
        /// Seller.
        seller: AccountId,
        /// Escrowed asset.
        asset: AssetRef,
        /// Price.
        price: Amount,
        /// Payment currency.
        currency: Currency,
        /// Last second the order can be fulfilled.
        expires_at: Timestamp,
        /// Buyer the order is reserved for, if any.
        reserved_buyer: Option<AccountId>,
    },

    /// A buyer paid and received the asset.
    OrderFulfilled {
        /// The order.
        order_id: OrderId,
        /// Buyer.
        buyer: AccountId,
        /// Seller that received the payment.
        seller: AccountId,
        /// Amount paid.
        price: Amount,
        /// Payment currency.
        currency: Currency,
    },

    /// The seller took the asset back.
    OrderCancelled {
        /// The order.
        order_id: OrderId,
        /// Seller.
        seller: AccountId,
    },
}

impl MarketEvent {
    /// The order this event is about.
    #[must_use]
    pub const fn order_id(&self) -> OrderId {
        match self {
            Self::OrderCreated { order_id, .. }
            | Self::OrderFulfilled { order_id, .. }
            | Self::OrderCancelled { order_id, .. } => *order_id,
        }
    }

    /// Short type name.
    #[must_use]
    pub const fn event_type(&self) -> &'static str {
        match self {
            Self::OrderCreated { .. } => "order_created",
            Self::OrderFulfilled { .. } => "order_fulfilled",
            Self::OrderCancelled { .. } => "order_cancelled",
        }
    }

    /// Serializes the event to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// An event together with its position in the log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordedEvent {
    /// Position in the log, starting at 0.
    pub seq: u64,
    /// The event.
    pub event: MarketEvent,
}

/// Append-only, ordered event log.
#[derive(Debug, Default)]
pub struct EventLog {
    entries: RwLock<Vec<RecordedEvent>>,
}

impl EventLog {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an event and returns its sequence number.
    pub fn append(&self, event: MarketEvent) -> u64 {
        let mut entries = self.entries.write();
        let seq = entries.len() as u64;

        let json = event.to_json().unwrap_or_else(|_| "{}".to_string());
        tracing::info!(
            target: EVENT_TARGET,
            seq,
            order_id = event.order_id(),
            event_type = event.event_type(),
            event_json = %json,
            "{}",
            event.event_type()
        );

        entries.push(RecordedEvent { seq, event });
        seq
    }

    /// Every event, oldest first.
    pub fn all(&self) -> Vec<RecordedEvent> {
        self.entries.read().clone()
    }

    /// Events with a sequence number of at least `seq`.
    pub fn since(&self, seq: u64) -> Vec<RecordedEvent> {
        let entries = self.entries.read();
        let start = usize::try_from(seq).unwrap_or(usize::MAX).min(entries.len());
        entries[start..].to_vec()
    }

    /// Events about one order, oldest first.
    pub fn for_order(&self, order_id: OrderId) -> Vec<RecordedEvent> {
        self.entries
            .read()
            .iter()
            .filter(|recorded| recorded.event.order_id() == order_id)
            .cloned()
            .collect()
    }

    /// Number of events.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns true if nothing happened yet.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}
