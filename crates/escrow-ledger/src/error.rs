//! Error types for custody and payment operations.

use escrow_core::{AccountId, Amount, AssetRef, Currency};
use thiserror::Error;

/// Errors returned by an [`AssetCustody`](crate::AssetCustody) backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CustodyError {
    /// The asset does not exist in the registry.
    #[error("unknown asset: {asset}")]
    UnknownAsset {
        /// The asset that was looked up.
        asset: AssetRef,
    },

    /// The asset already exists.
    #[error("asset already exists: {asset}")]
    AlreadyExists {
        /// The asset that was minted twice.
        asset: AssetRef,
    },

    /// The source account does not hold the asset.
    #[error("{account} does not hold {asset} (held by {holder})")]
    NotHolder {
        /// The asset being moved.
        asset: AssetRef,
        /// The account that tried to move it.
        account: AccountId,
        /// The actual holder.
        holder: AccountId,
    },

    /// The holder never granted the escrow transfer rights for the asset.
    #[error("escrow is not approved to move {asset}")]
    NotApproved {
        /// The asset being moved.
        asset: AssetRef,
    },
}

/// Errors returned by a [`PaymentLedger`](crate::PaymentLedger) backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    /// The payer's balance is below the transfer amount.
    #[error("insufficient {currency} balance: have {available}, need {required}")]
    InsufficientBalance {
        /// Currency of the transfer.
        currency: Currency,
        /// Current balance.
        available: Amount,
        /// Amount requested.
        required: Amount,
    },

    /// The payer approved less than the transfer amount for the escrow.
    #[error("insufficient {currency} allowance: approved {approved}, need {required}")]
    InsufficientAllowance {
        /// Currency of the transfer.
        currency: Currency,
        /// Amount currently approved.
        approved: Amount,
        /// Amount requested.
        required: Amount,
    },

    /// Crediting the recipient would overflow its balance.
    #[error("balance overflow crediting {account}")]
    Overflow {
        /// The recipient.
        account: AccountId,
    },

    /// Payer and recipient are the same account.
    #[error("cannot transfer from {0} to itself")]
    SameAccount(AccountId),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_holder_display_names_everyone() {
        let err = CustodyError::NotHolder {
            asset: AssetRef::new(AccountId::new("0xNFT"), 3),
            account: AccountId::new("mallory"),
            holder: AccountId::new("alice"),
        };
        let msg = err.to_string();
        assert!(msg.contains("mallory"));
        assert!(msg.contains("alice"));
        assert!(msg.contains("0xNFT#3"));
    }

    #[test]
    fn insufficient_allowance_display() {
        let err = LedgerError::InsufficientAllowance {
            currency: Currency::Token(AccountId::new("0xT")),
            approved: Amount::from_base_units(5),
            required: Amount::from_base_units(10),
        };
        assert_eq!(
            err.to_string(),
            "insufficient token:0xT allowance: approved 5, need 10"
        );
    }
}
