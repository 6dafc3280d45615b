//! # escrow-market
//!
//! Escrow marketplace for unique assets sold at a fixed price.
//!
//! This crate provides:
//!
//! - [`Order`] and its [`OrderStatus`] state machine (`Active → Fulfilled | Cancelled`)
//! - [`OrderRegistry`] for authoritative, append-only order storage
//! - [`Marketplace`], the lifecycle engine that settles orders atomically
//! - [`EventLog`] of committed transitions
//! - [`MarketConfig`] listing rules
//!
//! ```
//! use std::sync::Arc;
//!
//! use escrow_core::{AccountId, Amount, AssetRef, Currency, ManualClock};
//! use escrow_ledger::{SimulatedAssetRegistry, SimulatedLedger};
//! use escrow_market::{CreateOrder, Marketplace, OrderStatus};
//!
//! let escrow = AccountId::new("escrow");
//! let seller = AccountId::new("seller");
//! let buyer = AccountId::new("buyer");
//! let asset = AssetRef::new(AccountId::new("0xNFT"), 1);
//!
//! let custody = SimulatedAssetRegistry::new(escrow);
//! custody.mint(asset.clone(), seller.clone())?;
//! custody.approve_escrow(&asset, &seller)?;
//! let ledger = SimulatedLedger::new();
//! ledger.mint(&buyer, &Currency::Native, Amount::from_base_units(100))?;
//!
//! let market = Marketplace::with_defaults(custody, ledger, Arc::new(ManualClock::new(0)));
//! let id = market.create_order(
//!     &seller,
//!     CreateOrder::new(asset, 3_600, Amount::from_base_units(100), Currency::Native),
//! )?;
//! market.fulfill_order(&buyer, id)?;
//! assert_eq!(market.get_order(id)?.status, OrderStatus::Fulfilled);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod events;
pub mod lifecycle;
pub mod order;
pub mod registry;

pub use config::{ConfigError, MarketConfig};
pub use error::{ErrorKind, MarketError, Result};
pub use events::{EventLog, MarketEvent, RecordedEvent, EVENT_TARGET};
pub use lifecycle::{CreateOrder, Marketplace};
pub use order::{Order, OrderId, OrderStatus};
pub use registry::{OrderRegistry, RegistryGuard};
