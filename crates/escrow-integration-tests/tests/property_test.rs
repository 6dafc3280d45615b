//! Property tests over random operation sequences.
//!
//! After every step the following must hold for every order:
//! - ids are dense from 0
//! - a terminal status never changes again
//! - the asset is in escrow exactly while the order is active
//! - a fulfilled order has a non-seller buyer, any other order has none
//! - the event log has one entry per successful call
//! - the escrow account can neither list nor buy

use std::collections::HashMap;

use escrow_core::AccountId;
use escrow_integration_tests::{order_price, Harness, ORDER_DURATION};
use escrow_market::{CreateOrder, MarketError, OrderId, OrderStatus};
use proptest::prelude::*;

const SELLERS: usize = 2;
const BUYERS: usize = 3;

#[derive(Debug, Clone)]
enum Op {
    Create { seller: usize },
    Fulfill { order: usize, buyer: usize },
    SelfFulfill { order: usize },
    EscrowRelist { order: usize },
    EscrowFulfill { order: usize },
    Cancel { order: usize, by_seller: bool },
    Advance { secs: u64 },
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => (0..SELLERS).prop_map(|seller| Op::Create { seller }),
        3 => (0..16usize, 0..BUYERS).prop_map(|(order, buyer)| Op::Fulfill { order, buyer }),
        1 => (0..16usize).prop_map(|order| Op::SelfFulfill { order }),
        1 => (0..16usize).prop_map(|order| Op::EscrowRelist { order }),
        1 => (0..16usize).prop_map(|order| Op::EscrowFulfill { order }),
        2 => (0..16usize, any::<bool>()).prop_map(|(order, by_seller)| Op::Cancel { order, by_seller }),
        1 => (0..ORDER_DURATION).prop_map(|secs| Op::Advance { secs }),
    ]
}

fn seller(i: usize) -> AccountId {
    AccountId::new(format!("0x5E{i}"))
}

fn buyer(i: usize) -> AccountId {
    AccountId::new(format!("0xB{i}"))
}

struct Model {
    h: Harness,
    next_token: u128,
    // Order id -> asset token id
    assets: HashMap<OrderId, u128>,
    terminal: HashMap<OrderId, OrderStatus>,
    successes: usize,
}

impl Model {
    fn new() -> Self {
        let h = Harness::new();
        for i in 0..BUYERS {
            h.fund(&buyer(i), order_price()).expect("fund");
            h.fund(&buyer(i), order_price()).expect("fund");
            h.fund(&buyer(i), order_price()).expect("fund");
        }
        Self {
            h,
            next_token: 0,
            assets: HashMap::new(),
            terminal: HashMap::new(),
            successes: 0,
        }
    }

    fn existing(&self, order: usize) -> OrderId {
        let created = self.h.market.next_order_id();
        if created == 0 { 0 } else { order as u64 % created }
    }

    fn apply(&mut self, op: &Op) -> Result<(), MarketError> {
        match *op {
            Op::Create { seller: s } => {
                let token = self.next_token;
                self.next_token += 1;
                let id = self.h.list(&seller(s), token)?;
                self.assets.insert(id, token);
                Ok(())
            }
            Op::Fulfill { order, buyer: b } => {
                let id = self.existing(order);
                self.h.approve_payment(&buyer(b), order_price());
                self.h.market.fulfill_order(&buyer(b), id)
            }
            Op::SelfFulfill { order } => {
                let id = self.existing(order);
                let seller = self.h.market.get_order(id)?.seller;
                let result = self.h.market.fulfill_order(&seller, id);
                assert!(matches!(result, Err(MarketError::SelfFulfillment { .. })));
                result
            }
            Op::EscrowRelist { order } => {
                let id = self.existing(order);
                let asset = self.h.market.get_order(id)?.asset;
                let escrow = self.h.escrow.clone();
                // Only succeeds while the escrow actually holds the asset.
                let _ = self.h.custody.approve_escrow(&asset, &escrow);
                let result = self.h.market.create_order(
                    &escrow,
                    CreateOrder::new(asset, ORDER_DURATION, order_price(), self.h.currency_a()),
                );
                assert!(matches!(result, Err(MarketError::NotOwner { .. })));
                result.map(|_| ())
            }
            Op::EscrowFulfill { order } => {
                let id = self.existing(order);
                let escrow = self.h.escrow.clone();
                self.h.fund(&escrow, order_price()).map_err(MarketError::from)?;
                self.h.approve_payment(&escrow, order_price());
                let result = self.h.market.fulfill_order(&escrow, id);
                assert!(matches!(
                    result,
                    Err(MarketError::EscrowBuyer { .. } | MarketError::NotFound(_))
                ));
                result
            }
            Op::Cancel { order, by_seller } => {
                let id = self.existing(order);
                let caller = if by_seller {
                    self.h.market.get_order(id)?.seller
                } else {
                    buyer(0)
                };
                self.h.market.cancel_order(&caller, id)
            }
            Op::Advance { secs } => {
                self.h.clock.advance(secs);
                Ok(())
            }
        }
    }

    fn check(&mut self) -> Result<(), TestCaseError> {
        let orders = self.h.market.active_orders();
        let all: Vec<_> = (0..self.h.market.next_order_id())
            .map(|id| self.h.market.get_order(id))
            .collect::<Result<_, _>>()
            .map_err(|e| TestCaseError::fail(e.to_string()))?;

        for (expected_id, order) in all.iter().enumerate() {
            prop_assert_eq!(order.id, expected_id as u64);

            if let Some(previous) = self.terminal.get(&order.id) {
                prop_assert_eq!(order.status, *previous);
            }
            if order.status.is_terminal() {
                self.terminal.insert(order.id, order.status);
            }

            let token = self.assets[&order.id];
            let holder = self.h.holder(token).map_err(|e| TestCaseError::fail(e.to_string()))?;
            prop_assert_eq!(holder == self.h.escrow, order.is_active());

            match order.status {
                OrderStatus::Fulfilled => {
                    let buyer = order.buyer.as_ref();
                    prop_assert!(buyer.is_some_and(|b| *b != order.seller));
                    prop_assert_eq!(Some(&holder), buyer);
                }
                OrderStatus::Active => prop_assert!(order.buyer.is_none()),
                OrderStatus::Cancelled => {
                    prop_assert!(order.buyer.is_none());
                    prop_assert_eq!(&holder, &order.seller);
                }
            }
        }

        let active_ids: Vec<OrderId> = orders.iter().map(|o| o.id).collect();
        let expected_active: Vec<OrderId> = all.iter().filter(|o| o.is_active()).map(|o| o.id).collect();
        prop_assert_eq!(active_ids, expected_active);
        prop_assert_eq!(self.h.market.events().len(), self.successes);
        Ok(())
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn lifecycle_invariants_hold(ops in prop::collection::vec(op_strategy(), 1..40)) {
        let mut model = Model::new();
        for op in &ops {
            if model.apply(op).is_ok() && !matches!(op, Op::Advance { .. }) {
                model.successes += 1;
            }
            model.check()?;
        }
    }

    #[test]
    fn expiry_gates_fulfillment_only(elapsed in 0..ORDER_DURATION * 2) {
        let h = Harness::new();
        let id = h.list(&seller(0), 0).expect("create order");
        h.fund(&buyer(0), order_price()).expect("fund");
        h.approve_payment(&buyer(0), order_price());
        h.clock.advance(elapsed);

        let result = h.market.fulfill_order(&buyer(0), id);
        if elapsed <= ORDER_DURATION {
            prop_assert!(result.is_ok());
        } else {
            let expired = matches!(result, Err(MarketError::Expired { .. }));
            prop_assert!(expired);
            prop_assert!(h.market.cancel_order(&seller(0), id).is_ok());
        }
    }
}
