//! Asset and currency identifiers.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::account::AccountId;

/// Identifier of a unique asset within its contract.
pub type TokenId = u128;

/// A unique, non-duplicable asset: the contract that issued it and its id
/// within that contract.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AssetRef {
    /// The contract (collection) that issued the asset.
    pub contract: AccountId,
    /// The asset id within the contract.
    pub token_id: TokenId,
}

impl AssetRef {
    /// Creates a new asset reference.
    #[must_use]
    pub const fn new(contract: AccountId, token_id: TokenId) -> Self {
        Self { contract, token_id }
    }
}

impl fmt::Display for AssetRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.contract, self.token_id)
    }
}

/// Medium of payment for an order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "contract", rename_all = "snake_case")]
pub enum Currency {
    /// The ambient native currency of the execution environment.
    Native,
    /// A token currency identified by its contract.
    Token(AccountId),
}

impl Currency {
    /// Returns true for the native currency sentinel.
    #[must_use]
    pub const fn is_native(&self) -> bool {
        matches!(self, Self::Native)
    }

    /// Returns the token contract, if this is a token currency.
    #[must_use]
    pub const fn token_contract(&self) -> Option<&AccountId> {
        match self {
            Self::Native => None,
            Self::Token(contract) => Some(contract),
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Native => write!(f, "native"),
            Self::Token(contract) => write!(f, "token:{contract}"),
        }
    }
}
