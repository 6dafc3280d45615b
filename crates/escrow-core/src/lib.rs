//! # escrow-core
//!
//! Primitives shared by the escrow marketplace crates.
//!
//! This crate provides:
//!
//! - [`AccountId`]: Opaque account identifier (sellers, buyers, token contracts)
//! - [`AssetRef`]: The `(contract, token id)` pair naming one unique asset
//! - [`Currency`]: Native currency or a token contract
//! - [`Amount`]: Unsigned base-unit amount, no implicit decimal scaling
//! - [`Clock`]: Time source, with [`SystemClock`] and [`ManualClock`]

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod account;
pub mod amount;
pub mod asset;
pub mod clock;
pub mod error;

pub use account::AccountId;
pub use amount::Amount;
pub use asset::{AssetRef, Currency, TokenId};
pub use clock::{Clock, ManualClock, SystemClock, Timestamp};
pub use error::CoreError;
