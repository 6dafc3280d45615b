//! Fungible payments.
//!
//! [`PaymentLedger`] moves value of one currency between two accounts. The
//! marketplace calls it once per fulfillment, always before releasing the
//! asset, and relies on a failed transfer leaving every balance untouched.

use std::collections::HashMap;
use std::sync::Arc;

use escrow_core::{AccountId, Amount, Currency};
use parking_lot::RwLock;
use tracing::debug;

use crate::error::LedgerError;

/// Moves fungible value between accounts.
pub trait PaymentLedger: Send + Sync {
    /// Transfers `amount` of `currency` from `from` to `to`.
    ///
    /// Atomic: on error no balance or allowance changed.
    fn transfer(
        &self,
        from: &AccountId,
        to: &AccountId,
        currency: &Currency,
        amount: Amount,
    ) -> Result<(), LedgerError>;

    /// Returns the balance of `account` in `currency`.
    fn balance_of(&self, account: &AccountId, currency: &Currency) -> Amount;
}

impl<L: PaymentLedger + ?Sized> PaymentLedger for Arc<L> {
    fn transfer(
        &self,
        from: &AccountId,
        to: &AccountId,
        currency: &Currency,
        amount: Amount,
    ) -> Result<(), LedgerError> {
        (**self).transfer(from, to, currency, amount)
    }

    fn balance_of(&self, account: &AccountId, currency: &Currency) -> Amount {
        (**self).balance_of(account, currency)
    }
}

#[derive(Debug, Default)]
struct LedgerState {
    balances: HashMap<(Currency, AccountId), Amount>,
    // (token contract, owner) -> amount the escrow operator may pull.
    allowances: HashMap<(AccountId, AccountId), Amount>,
}

impl LedgerState {
    fn balance(&self, account: &AccountId, currency: &Currency) -> Amount {
        self.balances
            .get(&(currency.clone(), account.clone()))
            .copied()
            .unwrap_or(Amount::ZERO)
    }

    fn allowance(&self, token: &AccountId, owner: &AccountId) -> Amount {
        self.allowances
            .get(&(token.clone(), owner.clone()))
            .copied()
            .unwrap_or(Amount::ZERO)
    }
}

/// In-memory multi-currency ledger.
///
/// Token transfers are pulled by the escrow operator and therefore consume
/// an allowance the payer granted with [`SimulatedLedger::approve`]. Native
/// transfers are paid by the caller directly and only need a balance.
#[derive(Debug, Default)]
pub struct SimulatedLedger {
    state: RwLock<LedgerState>,
}

impl SimulatedLedger {
    /// Creates an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Credits `amount` of `currency` to `account` out of thin air.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Overflow`] if the balance would overflow.
    pub fn mint(
        &self,
        account: &AccountId,
        currency: &Currency,
        amount: Amount,
    ) -> Result<(), LedgerError> {
        let mut state = self.state.write();
        let credited = state
            .balance(account, currency)
            .checked_add(amount)
            .ok_or_else(|| LedgerError::Overflow {
                account: account.clone(),
            })?;
        state
            .balances
            .insert((currency.clone(), account.clone()), credited);
        debug!(account = %account, currency = %currency, amount = %amount, "minted");
        Ok(())
    }

    /// Sets the amount of `token` the escrow operator may pull from `owner`.
    ///
    /// Like a token approval, this replaces any previous allowance.
    pub fn approve(&self, owner: &AccountId, token: &AccountId, amount: Amount) {
        self.state
            .write()
            .allowances
            .insert((token.clone(), owner.clone()), amount);
        debug!(owner = %owner, token = %token, amount = %amount, "allowance set");
    }

    /// Returns the amount of `token` the escrow operator may still pull from `owner`.
    #[must_use]
    pub fn allowance(&self, owner: &AccountId, token: &AccountId) -> Amount {
        self.state.read().allowance(token, owner)
    }
}

impl PaymentLedger for SimulatedLedger {
    fn transfer(
        &self,
        from: &AccountId,
        to: &AccountId,
        currency: &Currency,
        amount: Amount,
    ) -> Result<(), LedgerError> {
        if from == to {
            return Err(LedgerError::SameAccount(from.clone()));
        }

        let mut state = self.state.write();

        // Validate everything before the first write.
        let remaining_allowance = match currency {
            Currency::Native => None,
            Currency::Token(token) => {
                let approved = state.allowance(token, from);
                let remaining = approved.checked_sub(amount).ok_or_else(|| {
                    LedgerError::InsufficientAllowance {
                        currency: currency.clone(),
                        approved,
                        required: amount,
                    }
                })?;
                Some((token.clone(), remaining))
            }
        };

        let available = state.balance(from, currency);
        let debited = available
            .checked_sub(amount)
            .ok_or_else(|| LedgerError::InsufficientBalance {
                currency: currency.clone(),
                available,
                required: amount,
            })?;
        let credited = state
            .balance(to, currency)
            .checked_add(amount)
            .ok_or_else(|| LedgerError::Overflow { account: to.clone() })?;

        if let Some((token, remaining)) = remaining_allowance {
            state.allowances.insert((token, from.clone()), remaining);
        }
        state
            .balances
            .insert((currency.clone(), from.clone()), debited);
        state.balances.insert((currency.clone(), to.clone()), credited);

        debug!(
            from = %from,
            to = %to,
            currency = %currency,
            amount = %amount,
            "transfer settled"
        );
        Ok(())
    }

    fn balance_of(&self, account: &AccountId, currency: &Currency) -> Amount {
        self.state.read().balance(account, currency)
    }
}
