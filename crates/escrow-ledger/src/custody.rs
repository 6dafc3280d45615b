//! Custody of unique assets.
//!
//! [`AssetCustody`] is the boundary to whatever registry records who owns a
//! non-fungible asset. The marketplace only needs to ask who holds an asset,
//! whether the holder let the escrow move it, and to move it into and out of
//! the escrow account.

use std::collections::HashMap;
use std::sync::Arc;

use escrow_core::{AccountId, AssetRef};
use parking_lot::RwLock;
use tracing::debug;

use crate::error::CustodyError;

/// Proves and moves ownership of unique assets.
///
/// Both transfer operations must be atomic: on error nothing moved.
pub trait AssetCustody: Send + Sync {
    /// The account that holds assets while they are in escrow.
    fn escrow_account(&self) -> &AccountId;

    /// Returns the current holder of `asset`.
    fn owner_of(&self, asset: &AssetRef) -> Result<AccountId, CustodyError>;

    /// Returns true if `owner` granted the escrow the right to move `asset`.
    fn is_approved_for_escrow(&self, asset: &AssetRef, owner: &AccountId) -> bool;

    /// Moves `asset` from `from` into the escrow account.
    fn transfer_to_escrow(&self, asset: &AssetRef, from: &AccountId) -> Result<(), CustodyError>;

    /// Moves `asset` out of the escrow account to `to`.
    fn transfer_from_escrow(&self, asset: &AssetRef, to: &AccountId) -> Result<(), CustodyError>;
}

impl<C: AssetCustody + ?Sized> AssetCustody for Arc<C> {
    fn escrow_account(&self) -> &AccountId {
        (**self).escrow_account()
    }

    fn owner_of(&self, asset: &AssetRef) -> Result<AccountId, CustodyError> {
        (**self).owner_of(asset)
    }

    fn is_approved_for_escrow(&self, asset: &AssetRef, owner: &AccountId) -> bool {
        (**self).is_approved_for_escrow(asset, owner)
    }

    fn transfer_to_escrow(&self, asset: &AssetRef, from: &AccountId) -> Result<(), CustodyError> {
        (**self).transfer_to_escrow(asset, from)
    }

    fn transfer_from_escrow(&self, asset: &AssetRef, to: &AccountId) -> Result<(), CustodyError> {
        (**self).transfer_from_escrow(asset, to)
    }
}

#[derive(Debug, Clone)]
struct AssetRecord {
    owner: AccountId,
    // Single-asset approval; any transfer clears it.
    escrow_approved: bool,
}

/// In-memory asset registry.
///
/// Covers every asset contract at once: each asset has one owner and at
/// most one escrow approval, which is cleared whenever the asset moves.
#[derive(Debug)]
pub struct SimulatedAssetRegistry {
    escrow: AccountId,
    assets: RwLock<HashMap<AssetRef, AssetRecord>>,
}

impl SimulatedAssetRegistry {
    /// Creates an empty registry whose escrow holder is `escrow`.
    #[must_use]
    pub fn new(escrow: AccountId) -> Self {
        Self {
            escrow,
            assets: RwLock::new(HashMap::new()),
        }
    }

    /// Creates a new asset owned by `owner`.
    ///
    /// # Errors
    ///
    /// Returns [`CustodyError::AlreadyExists`] if the asset was minted before.
    pub fn mint(&self, asset: AssetRef, owner: AccountId) -> Result<(), CustodyError> {
        let mut assets = self.assets.write();
        if assets.contains_key(&asset) {
            return Err(CustodyError::AlreadyExists { asset });
        }
        debug!(asset = %asset, owner = %owner, "asset minted");
        assets.insert(
            asset,
            AssetRecord {
                owner,
                escrow_approved: false,
            },
        );
        Ok(())
    }

    /// Grants the escrow the right to move `asset`. Only the holder may do so.
    ///
    /// # Errors
    ///
    /// Returns an error if the asset is unknown or `owner` does not hold it.
    pub fn approve_escrow(&self, asset: &AssetRef, owner: &AccountId) -> Result<(), CustodyError> {
        let mut assets = self.assets.write();
        let record = assets
            .get_mut(asset)
            .ok_or_else(|| CustodyError::UnknownAsset { asset: asset.clone() })?;
        ensure_holder(asset, record, owner)?;
        record.escrow_approved = true;
        Ok(())
    }

    /// Withdraws a previously granted escrow approval.
    ///
    /// # Errors
    ///
    /// Returns an error if the asset is unknown or `owner` does not hold it.
    pub fn revoke_escrow(&self, asset: &AssetRef, owner: &AccountId) -> Result<(), CustodyError> {
        let mut assets = self.assets.write();
        let record = assets
            .get_mut(asset)
            .ok_or_else(|| CustodyError::UnknownAsset { asset: asset.clone() })?;
        ensure_holder(asset, record, owner)?;
        record.escrow_approved = false;
        Ok(())
    }

    /// Moves `asset` between two ordinary accounts, outside the escrow.
    ///
    /// # Errors
    ///
    /// Returns an error if the asset is unknown or `from` does not hold it.
    pub fn transfer(
        &self,
        asset: &AssetRef,
        from: &AccountId,
        to: &AccountId,
    ) -> Result<(), CustodyError> {
        let mut assets = self.assets.write();
        let record = assets
            .get_mut(asset)
            .ok_or_else(|| CustodyError::UnknownAsset { asset: asset.clone() })?;
        ensure_holder(asset, record, from)?;
        record.owner = to.clone();
        record.escrow_approved = false;
        Ok(())
    }
}

fn ensure_holder(
    asset: &AssetRef,
    record: &AssetRecord,
    account: &AccountId,
) -> Result<(), CustodyError> {
    if record.owner == *account {
        Ok(())
    } else {
        Err(CustodyError::NotHolder {
            asset: asset.clone(),
            account: account.clone(),
            holder: record.owner.clone(),
        })
    }
}

impl AssetCustody for SimulatedAssetRegistry {
    fn escrow_account(&self) -> &AccountId {
        &self.escrow
    }

    fn owner_of(&self, asset: &AssetRef) -> Result<AccountId, CustodyError> {
        self.assets
            .read()
            .get(asset)
            .map(|record| record.owner.clone())
            .ok_or_else(|| CustodyError::UnknownAsset { asset: asset.clone() })
    }

    fn is_approved_for_escrow(&self, asset: &AssetRef, owner: &AccountId) -> bool {
        self.assets
            .read()
            .get(asset)
            .is_some_and(|record| record.owner == *owner && record.escrow_approved)
    }

    fn transfer_to_escrow(&self, asset: &AssetRef, from: &AccountId) -> Result<(), CustodyError> {
        let mut assets = self.assets.write();
        let record = assets
            .get_mut(asset)
            .ok_or_else(|| CustodyError::UnknownAsset { asset: asset.clone() })?;
        ensure_holder(asset, record, from)?;
        if !record.escrow_approved {
            return Err(CustodyError::NotApproved { asset: asset.clone() });
        }
        record.owner = self.escrow.clone();
        record.escrow_approved = false;
        debug!(asset = %asset, from = %from, "asset moved into escrow");
        Ok(())
    }

    fn transfer_from_escrow(&self, asset: &AssetRef, to: &AccountId) -> Result<(), CustodyError> {
        let mut assets = self.assets.write();
        let record = assets
            .get_mut(asset)
            .ok_or_else(|| CustodyError::UnknownAsset { asset: asset.clone() })?;
        ensure_holder(asset, record, &self.escrow)?;
        record.owner = to.clone();
        record.escrow_approved = false;
        debug!(asset = %asset, to = %to, "asset released from escrow");
        Ok(())
    }
}
