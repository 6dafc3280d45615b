//! Authoritative order storage.
//!
//! The registry stores whole [`Order`] records and hands out ids; it knows
//! nothing about who may do what. Business rules live in the lifecycle
//! engine, which takes a [`RegistryGuard`] for the full duration of a
//! transition so that the status check, the side effects and the write form
//! one unit no other caller can interleave with.

use std::collections::BTreeMap;

use parking_lot::{RwLock, RwLockWriteGuard};

use crate::error::{MarketError, Result};
use crate::order::{Order, OrderId};

#[derive(Debug, Default)]
struct RegistryState {
    orders: BTreeMap<OrderId, Order>,
    next_id: OrderId,
}

impl RegistryState {
    fn get(&self, id: OrderId) -> Result<&Order> {
        self.orders.get(&id).ok_or(MarketError::NotFound(id))
    }

    fn insert(&mut self, mut order: Order) -> Result<OrderId> {
        let id = self.next_id;
        self.next_id = id
            .checked_add(1)
            .ok_or_else(|| MarketError::Overflow("order id space exhausted".into()))?;
        order.id = id;
        self.orders.insert(id, order);
        Ok(id)
    }

    fn replace(&mut self, id: OrderId, order: Order) -> Result<()> {
        let slot = self.orders.get_mut(&id).ok_or(MarketError::NotFound(id))?;
        *slot = Order { id, ..order };
        Ok(())
    }
}

/// Append-only store of orders keyed by a dense, increasing id.
#[derive(Debug, Default)]
pub struct OrderRegistry {
    state: RwLock<RegistryState>,
}

impl OrderRegistry {
    /// Creates an empty registry. The first order gets id 0.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Takes exclusive access for a multi-step transition.
    pub fn lock(&self) -> RegistryGuard<'_> {
        RegistryGuard {
            state: self.state.write(),
        }
    }

    /// Returns a snapshot of an order.
    pub fn get(&self, id: OrderId) -> Result<Order> {
        self.state.read().get(id).cloned()
    }

    /// Stores `order` under the next id and returns that id.
    ///
    /// The `id` field of the passed order is overwritten.
    pub fn insert(&self, order: Order) -> Result<OrderId> {
        self.state.write().insert(order)
    }

    /// Replaces the whole record of an existing order.
    pub fn replace(&self, id: OrderId, order: Order) -> Result<()> {
        self.state.write().replace(id, order)
    }

    /// The id the next insert will receive.
    pub fn next_id(&self) -> OrderId {
        self.state.read().next_id
    }

    /// Number of orders ever created.
    pub fn len(&self) -> usize {
        self.state.read().orders.len()
    }

    /// Returns true if no order was ever created.
    pub fn is_empty(&self) -> bool {
        self.state.read().orders.is_empty()
    }

    /// Snapshot of every order matching `predicate`, in id order.
    pub fn filter<P>(&self, mut predicate: P) -> Vec<Order>
    where
        P: FnMut(&Order) -> bool,
    {
        self.state
            .read()
            .orders
            .values()
            .filter(|order| predicate(order))
            .cloned()
            .collect()
    }

    /// Snapshot of every order, in id order.
    pub fn snapshot(&self) -> Vec<Order> {
        self.filter(|_| true)
    }
}

/// Exclusive access to the registry, held across one transition.
pub struct RegistryGuard<'a> {
    state: RwLockWriteGuard<'a, RegistryState>,
}

impl RegistryGuard<'_> {
    /// Returns the current record of an order.
    pub fn get(&self, id: OrderId) -> Result<&Order> {
        self.state.get(id)
    }

    /// The id the next insert will receive.
    pub fn next_id(&self) -> OrderId {
        self.state.next_id
    }

    /// Stores `order` under the next id and returns that id.
    pub fn insert(&mut self, order: Order) -> Result<OrderId> {
        self.state.insert(order)
    }

    /// Runs `f` against the current record and commits whatever it returns.
    ///
    /// If `f` fails, or returns a status the current one cannot move to, the
    /// stored record is untouched and [`MarketError::NotActive`] names the
    /// current status. Returns the committed record.
    pub fn transition<F>(&mut self, id: OrderId, f: F) -> Result<Order>
    where
        F: FnOnce(&Order) -> Result<Order>,
    {
        let current = self.state.get(id)?;
        let from = current.status;
        let next = f(current)?;
        if !from.can_transition_to(&next.status) {
            return Err(MarketError::NotActive {
                order_id: id,
                status: from,
            });
        }
        self.state.replace(id, next.clone())?;
        Ok(Order { id, ..next })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::OrderStatus;
    use escrow_core::{AccountId, Amount, AssetRef, Currency};
    use proptest::prelude::*;

    fn order(token_id: u128) -> Order {
        Order {
            id: 999,
            seller: AccountId::new("seller"),
            asset: AssetRef::new(AccountId::new("0xNFT"), token_id),
            created_at: 0,
            duration: 10,
            price: Amount::from_base_units(5),
            currency: Currency::Native,
            reserved_buyer: None,
            buyer: None,
            status: OrderStatus::Active,
        }
    }

    #[test]
    fn ids_start_at_zero_and_increase() {
        let registry = OrderRegistry::new();
        assert!(registry.is_empty());
        assert_eq!(registry.next_id(), 0);

        assert_eq!(registry.insert(order(1)).expect("insert"), 0);
        assert_eq!(registry.insert(order(2)).expect("insert"), 1);
        assert_eq!(registry.next_id(), 2);
        assert_eq!(registry.len(), 2);

        // The caller-supplied id is ignored.
        assert_eq!(registry.get(1).expect("get").id, 1);
    }

    #[test]
    fn get_missing_is_not_found() {
        let registry = OrderRegistry::new();
        assert_eq!(registry.get(0), Err(MarketError::NotFound(0)));
    }

    #[test]
    fn replace_swaps_whole_record() {
        let registry = OrderRegistry::new();
        let id = registry.insert(order(1)).expect("insert");

        let mut updated = registry.get(id).expect("get");
        updated.status = OrderStatus::Cancelled;
        registry.replace(id, updated).expect("replace");

        assert_eq!(registry.get(id).expect("get").status, OrderStatus::Cancelled);
        assert_eq!(registry.replace(7, order(1)), Err(MarketError::NotFound(7)));
    }

    #[test]
    fn failed_transition_leaves_record_untouched() {
        let registry = OrderRegistry::new();
        let id = registry.insert(order(1)).expect("insert");

        let result = registry
            .lock()
            .transition(id, |_| Err(MarketError::InvalidParameters("nope".into())));

        assert!(result.is_err());
        assert_eq!(registry.get(id).expect("get").status, OrderStatus::Active);
    }

    #[test]
    fn transition_commits_and_keeps_id() {
        let registry = OrderRegistry::new();
        let id = registry.insert(order(1)).expect("insert");

        let committed = registry
            .lock()
            .transition(id, |current| {
                Ok(Order {
                    id: 42,
                    status: OrderStatus::Fulfilled,
                    buyer: Some(AccountId::new("buyer")),
                    ..current.clone()
                })
            })
            .expect("transition");

        assert_eq!(committed.id, id);
        assert_eq!(registry.get(id).expect("get"), committed);
    }

    #[test]
    fn transition_out_of_terminal_state_is_rejected() {
        let registry = OrderRegistry::new();
        let id = registry.insert(order(1)).expect("insert");
        let mut cancelled = registry.get(id).expect("get");
        cancelled.status = OrderStatus::Cancelled;
        registry.replace(id, cancelled.clone()).expect("replace");

        let result = registry.lock().transition(id, |current| {
            Ok(Order {
                status: OrderStatus::Fulfilled,
                buyer: Some(AccountId::new("buyer")),
                ..current.clone()
            })
        });

        assert_eq!(
            result,
            Err(MarketError::NotActive {
                order_id: id,
                status: OrderStatus::Cancelled,
            })
        );
        assert_eq!(registry.get(id).expect("get"), cancelled);
    }

    #[test]
    fn transition_must_leave_active() {
        let registry = OrderRegistry::new();
        let id = registry.insert(order(1)).expect("insert");

        let result = registry.lock().transition(id, |current| {
            Ok(Order {
                price: Amount::from_base_units(1),
                ..current.clone()
            })
        });

        assert!(matches!(result, Err(MarketError::NotActive { .. })));
        assert_eq!(registry.get(id).expect("get").price, Amount::from_base_units(5));
    }

    #[test]
    fn filter_returns_id_order() {
        let registry = OrderRegistry::new();
        for token_id in 0..5 {
            registry.insert(order(token_id)).expect("insert");
        }
        let odd: Vec<OrderId> = registry
            .filter(|o| o.asset.token_id % 2 == 1)
            .into_iter()
            .map(|o| o.id)
            .collect();
        assert_eq!(odd, vec![1, 3]);
        assert_eq!(registry.snapshot().len(), 5);
    }

    proptest! {
        #[test]
        fn inserted_ids_are_dense(tokens in prop::collection::vec(any::<u128>(), 0..64)) {
            let registry = OrderRegistry::new();
            for (expected, token_id) in tokens.iter().enumerate() {
                let id = registry.insert(order(*token_id)).expect("insert");
                prop_assert_eq!(id, expected as OrderId);
            }
            prop_assert_eq!(registry.next_id(), tokens.len() as OrderId);
            prop_assert_eq!(registry.len(), tokens.len());

            let ids: Vec<OrderId> = registry.snapshot().iter().map(|o| o.id).collect();
            let expected: Vec<OrderId> = (0..tokens.len() as OrderId).collect();
            prop_assert_eq!(ids, expected);
        }
    }
}
