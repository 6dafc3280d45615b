//! # escrow-ledger
//!
//! The two external collaborators the escrow marketplace depends on, stated
//! as traits so the order lifecycle never touches a host-specific primitive:
//!
//! - [`AssetCustody`]: proves and moves ownership of a unique asset
//! - [`PaymentLedger`]: moves fungible value between accounts
//!
//! Both come with simulated in-memory backends ([`SimulatedAssetRegistry`],
//! [`SimulatedLedger`]) for development and tests. Every simulated operation
//! validates fully before mutating, so a failed call changes nothing.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod custody;
pub mod error;
pub mod payment;

pub use custody::{AssetCustody, SimulatedAssetRegistry};
pub use error::{CustodyError, LedgerError};
pub use payment::{PaymentLedger, SimulatedLedger};
