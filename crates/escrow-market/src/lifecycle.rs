//! Order lifecycle engine.
//!
//! [`Marketplace`] implements the three transitions of an order:
//!
//! - `create_order` moves the asset into escrow and records an `Active` order
//! - `fulfill_order` moves the payment to the seller, then the asset to the buyer
//! - `cancel_order` returns the asset to the seller
//!
//! Each transition runs while holding the registry lock: read, validate,
//! side effects, write, event. A racing call on the same order therefore
//! sees the committed result of the first one and fails without touching
//! the asset or the ledger.

use escrow_core::{AccountId, Amount, AssetRef, Clock, Currency, SystemClock};
use escrow_ledger::{AssetCustody, CustodyError, PaymentLedger};
use tracing::{debug, error, info};

use crate::config::{ConfigError, MarketConfig};
use crate::error::{MarketError, Result};
use crate::events::{EventLog, MarketEvent};
use crate::order::{Order, OrderId, OrderStatus};
use crate::registry::OrderRegistry;

/// Parameters of a new order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateOrder {
    /// The asset to escrow.
    pub asset: AssetRef,
    /// Fulfillment window in seconds.
    pub duration: u64,
    /// Exact price.
    pub price: Amount,
    /// Payment currency.
    pub currency: Currency,
    /// Restricts fulfillment to one account.
    pub reserved_buyer: Option<AccountId>,
}

impl CreateOrder {
    /// An order open to any buyer.
    #[must_use]
    pub const fn new(asset: AssetRef, duration: u64, price: Amount, currency: Currency) -> Self {
        Self {
            asset,
            duration,
            price,
            currency,
            reserved_buyer: None,
        }
    }

    /// Restricts the order to `buyer`.
    #[must_use]
    pub fn reserved_for(mut self, buyer: AccountId) -> Self {
        self.reserved_buyer = Some(buyer);
        self
    }
}

/// Escrow marketplace over an asset registry `C`, a payment ledger `L` and
/// a clock `K`.
#[derive(Debug)]
pub struct Marketplace<C, L, K = SystemClock> {
    config: MarketConfig,
    custody: C,
    ledger: L,
    clock: K,
    registry: OrderRegistry,
    events: EventLog,
}

impl<C, L, K> Marketplace<C, L, K>
where
    C: AssetCustody,
    L: PaymentLedger,
    K: Clock,
{
    /// Creates a marketplace.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if the config is invalid or names a
    /// different escrow account than the custody backend.
    pub fn new(
        config: MarketConfig,
        custody: C,
        ledger: L,
        clock: K,
    ) -> std::result::Result<Self, ConfigError> {
        config.validate()?;
        if config.escrow_account != *custody.escrow_account() {
            return Err(ConfigError::Invalid(format!(
                "escrow_account {} does not match custody escrow {}",
                config.escrow_account,
                custody.escrow_account()
            )));
        }
        info!(
            escrow = %config.escrow_account,
            min_price = %config.min_price,
            "marketplace started"
        );
        Ok(Self {
            config,
            custody,
            ledger,
            clock,
            registry: OrderRegistry::new(),
            events: EventLog::new(),
        })
    }

    /// Creates a marketplace with permissive defaults around the custody
    /// backend's escrow account.
    pub fn with_defaults(custody: C, ledger: L, clock: K) -> Self {
        Self {
            config: MarketConfig::new(custody.escrow_account().clone()),
            custody,
            ledger,
            clock,
            registry: OrderRegistry::new(),
            events: EventLog::new(),
        }
    }

    /// Lists an asset. The asset moves into escrow and the new order id is
    /// returned.
    ///
    /// # Errors
    ///
    /// - [`MarketError::InvalidParameters`] for a zero or too long duration, a
    ///   zero or too low price, a currency the config does not accept, or a
    ///   reservation for the seller itself
    /// - [`MarketError::NotOwner`] if `caller` does not hold the asset or is
    ///   the escrow account
    /// - [`MarketError::NotApproved`] if the escrow may not move the asset
    pub fn create_order(&self, caller: &AccountId, request: CreateOrder) -> Result<OrderId> {
        self.create_order_inner(caller, request)
            .inspect_err(|e| debug!(seller = %caller, error = %e, "create_order rejected"))
    }

    fn create_order_inner(&self, caller: &AccountId, request: CreateOrder) -> Result<OrderId> {
        self.validate_request(caller, &request)?;
        let CreateOrder {
            asset,
            duration,
            price,
            currency,
            reserved_buyer,
        } = request;

        // The escrow holds every listed asset; letting it sell would list one
        // asset twice.
        if caller == self.custody.escrow_account() {
            return Err(MarketError::NotOwner {
                asset,
                caller: caller.clone(),
            });
        }

        let mut registry = self.registry.lock();

        let owner = match self.custody.owner_of(&asset) {
            Ok(owner) => owner,
            Err(CustodyError::UnknownAsset { .. }) => {
                return Err(MarketError::NotOwner {
                    asset,
                    caller: caller.clone(),
                });
            }
            Err(e) => return Err(e.into()),
        };
        if owner != *caller {
            return Err(MarketError::NotOwner {
                asset,
                caller: caller.clone(),
            });
        }
        if !self.custody.is_approved_for_escrow(&asset, caller) {
            return Err(MarketError::NotApproved { asset });
        }

        let created_at = self.clock.now();
        let expires_at = created_at
            .checked_add(duration)
            .ok_or_else(|| MarketError::Overflow("order expiry past the end of time".into()))?;
        if registry.next_id() == OrderId::MAX {
            return Err(MarketError::Overflow("order id space exhausted".into()));
        }

        // Custody may have changed since the checks above.
        match self.custody.transfer_to_escrow(&asset, caller) {
            Ok(()) => {}
            Err(CustodyError::NotHolder { .. } | CustodyError::UnknownAsset { .. }) => {
                return Err(MarketError::NotOwner {
                    asset,
                    caller: caller.clone(),
                });
            }
            Err(CustodyError::NotApproved { .. }) => {
                return Err(MarketError::NotApproved { asset });
            }
            Err(e) => return Err(e.into()),
        }

        let order = Order {
            id: registry.next_id(),
            seller: caller.clone(),
            asset,
            created_at,
            duration,
            price,
            currency,
            reserved_buyer,
            buyer: None,
            status: OrderStatus::Active,
        };
        let id = registry.insert(order.clone())?;

        info!(
            order_id = id,
            seller = %order.seller,
            asset = %order.asset,
            price = %order.price,
            currency = %order.currency,
            expires_at,
            "order created"
        );
        self.events.append(MarketEvent::OrderCreated {
            order_id: id,
            seller: order.seller,
            asset: order.asset,
            price: order.price,
            currency: order.currency,
            expires_at,
            reserved_buyer: order.reserved_buyer,
        });
        Ok(id)
    }

    fn validate_request(&self, caller: &AccountId, request: &CreateOrder) -> Result<()> {
        if request.duration == 0 {
            return Err(MarketError::InvalidParameters(
                "duration must be greater than 0".into(),
            ));
        }
        if let Some(max) = self.config.max_duration_secs {
            if request.duration > max {
                return Err(MarketError::InvalidParameters(format!(
                    "duration {} exceeds maximum {max}",
                    request.duration
                )));
            }
        }
        if request.price.is_zero() {
            return Err(MarketError::InvalidParameters(
                "price must be greater than 0".into(),
            ));
        }
        if request.price < self.config.min_price {
            return Err(MarketError::InvalidParameters(format!(
                "price {} is below minimum {}",
                request.price, self.config.min_price
            )));
        }
        if !self.config.accepts(&request.currency) {
            return Err(MarketError::InvalidParameters(format!(
                "currency {} is not accepted",
                request.currency
            )));
        }
        if request.reserved_buyer.as_ref() == Some(caller) {
            return Err(MarketError::InvalidParameters(
                "an order cannot be reserved for its seller".into(),
            ));
        }
        Ok(())
    }

    /// Buys an active order: `price` moves from `caller` to the seller, then
    /// the asset moves from escrow to `caller`.
    ///
    /// # Errors
    ///
    /// - [`MarketError::NotFound`] if no such order exists
    /// - [`MarketError::SelfFulfillment`] if `caller` is the seller, whatever
    ///   the order's state
    /// - [`MarketError::EscrowBuyer`] if `caller` is the escrow account
    /// - [`MarketError::NotActive`] if the order is fulfilled or cancelled
    /// - [`MarketError::Expired`] once the fulfillment window has passed
    /// - [`MarketError::NotReservedBuyer`] if the order is reserved for
    ///   someone else
    /// - [`MarketError::PaymentFailed`] if the ledger refuses the payment
    pub fn fulfill_order(&self, caller: &AccountId, id: OrderId) -> Result<()> {
        let mut registry = self.registry.lock();
        let result = registry.transition(id, |order| self.settle(caller, order));

        match result {
            Ok(order) => {
                info!(
                    order_id = id,
                    buyer = %caller,
                    seller = %order.seller,
                    price = %order.price,
                    currency = %order.currency,
                    "order fulfilled"
                );
                self.events.append(MarketEvent::OrderFulfilled {
                    order_id: id,
                    buyer: caller.clone(),
                    seller: order.seller,
                    price: order.price,
                    currency: order.currency,
                });
                Ok(())
            }
            Err(e) => {
                debug!(order_id = id, buyer = %caller, error = %e, "fulfill_order rejected");
                Err(e)
            }
        }
    }

    fn settle(&self, caller: &AccountId, order: &Order) -> Result<Order> {
        if order.seller == *caller {
            return Err(MarketError::SelfFulfillment { order_id: order.id });
        }
        if caller == self.custody.escrow_account() {
            return Err(MarketError::EscrowBuyer { order_id: order.id });
        }
        if !order.is_active() {
            return Err(MarketError::NotActive {
                order_id: order.id,
                status: order.status,
            });
        }
        let now = self.clock.now();
        if order.is_expired(now) {
            return Err(MarketError::Expired {
                order_id: order.id,
                expires_at: order.expires_at(),
                now,
            });
        }
        if let Some(reserved) = &order.reserved_buyer {
            if reserved != caller {
                return Err(MarketError::NotReservedBuyer {
                    order_id: order.id,
                    caller: caller.clone(),
                });
            }
        }
        self.ensure_in_escrow(&order.asset)?;

        self.ledger
            .transfer(caller, &order.seller, &order.currency, order.price)?;

        if let Err(e) = self.custody.transfer_from_escrow(&order.asset, caller) {
            error!(
                order_id = order.id,
                buyer = %caller,
                seller = %order.seller,
                asset = %order.asset,
                error = %e,
                "payment settled but asset release failed"
            );
            return Err(e.into());
        }

        Ok(Order {
            status: OrderStatus::Fulfilled,
            buyer: Some(caller.clone()),
            ..order.clone()
        })
    }

    // Release must not fail once the payment moved, so check custody first.
    fn ensure_in_escrow(&self, asset: &AssetRef) -> Result<()> {
        let escrow = self.custody.escrow_account();
        let holder = self.custody.owner_of(asset)?;
        if holder == *escrow {
            Ok(())
        } else {
            Err(CustodyError::NotHolder {
                asset: asset.clone(),
                account: escrow.clone(),
                holder,
            }
            .into())
        }
    }

    /// Withdraws an active order and returns the asset to the seller.
    ///
    /// Expired orders can still be cancelled.
    ///
    /// # Errors
    ///
    /// - [`MarketError::NotFound`] if no such order exists
    /// - [`MarketError::NotSeller`] if `caller` is not the seller
    /// - [`MarketError::AlreadyFulfilled`] if a buyer already took the order
    /// - [`MarketError::NotActive`] if the order was already cancelled
    pub fn cancel_order(&self, caller: &AccountId, id: OrderId) -> Result<()> {
        let mut registry = self.registry.lock();
        let result = registry.transition(id, |order| {
            if order.seller != *caller {
                return Err(MarketError::NotSeller {
                    order_id: id,
                    caller: caller.clone(),
                });
            }
            match order.status {
                OrderStatus::Active => {}
                OrderStatus::Fulfilled => {
                    return Err(MarketError::AlreadyFulfilled { order_id: id });
                }
                OrderStatus::Cancelled => {
                    return Err(MarketError::NotActive {
                        order_id: id,
                        status: order.status,
                    });
                }
            }

            self.custody.transfer_from_escrow(&order.asset, &order.seller)?;

            Ok(Order {
                status: OrderStatus::Cancelled,
                ..order.clone()
            })
        });

        match result {
            Ok(order) => {
                info!(order_id = id, seller = %order.seller, asset = %order.asset, "order cancelled");
                self.events.append(MarketEvent::OrderCancelled {
                    order_id: id,
                    seller: order.seller,
                });
                Ok(())
            }
            Err(e) => {
                debug!(order_id = id, caller = %caller, error = %e, "cancel_order rejected");
                Err(e)
            }
        }
    }

    /// Returns a snapshot of an order.
    ///
    /// # Errors
    ///
    /// Returns [`MarketError::NotFound`] if no such order exists.
    pub fn get_order(&self, id: OrderId) -> Result<Order> {
        self.registry.get(id)
    }

    /// The id the next created order will receive.
    pub fn next_order_id(&self) -> OrderId {
        self.registry.next_id()
    }

    /// Every order `seller` ever created, in id order.
    pub fn orders_by_seller(&self, seller: &AccountId) -> Vec<Order> {
        self.registry.filter(|order| order.seller == *seller)
    }

    /// Every order that can still be bought or cancelled, in id order.
    ///
    /// Includes expired orders, which only their seller can act on.
    pub fn active_orders(&self) -> Vec<Order> {
        self.registry.filter(Order::is_active)
    }

    /// The event log.
    pub const fn events(&self) -> &EventLog {
        &self.events
    }

    /// The active configuration.
    pub const fn config(&self) -> &MarketConfig {
        &self.config
    }

    /// The custody backend.
    pub const fn custody(&self) -> &C {
        &self.custody
    }

    /// The payment ledger.
    pub const fn ledger(&self) -> &L {
        &self.ledger
    }
}
