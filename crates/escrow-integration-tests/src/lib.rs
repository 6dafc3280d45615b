//! Integration test crate for the escrow marketplace.
//!
//! The tests under `tests/` drive a [`Marketplace`] wired to the simulated
//! custody and ledger backends. This library only holds the shared
//! [`Harness`] they are built on.

#![forbid(unsafe_code)]

use std::sync::Arc;

use escrow_core::{AccountId, Amount, AssetRef, Currency, ManualClock, TokenId};
use escrow_ledger::{
    AssetCustody, CustodyError, LedgerError, PaymentLedger, SimulatedAssetRegistry,
    SimulatedLedger,
};
use escrow_market::{ConfigError, CreateOrder, MarketConfig, Marketplace, OrderId};

/// Marketplace type used by every integration test.
pub type Market = Marketplace<Arc<SimulatedAssetRegistry>, Arc<SimulatedLedger>, Arc<ManualClock>>;

/// Listing window used by the scenarios: 25 hours.
pub const ORDER_DURATION: u64 = 60 * 60 * 25;

/// Clock value at harness creation.
pub const GENESIS: u64 = 1_700_000_000;

/// Standard order price: 1000 whole tokens at 18 decimals.
#[must_use]
pub const fn order_price() -> Amount {
    match Amount::from_whole(1000, 18) {
        Some(amount) => amount,
        None => Amount::MAX,
    }
}

/// Installs a test-writer subscriber honoring `RUST_LOG`. Safe to call repeatedly.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

fn backends() -> (Arc<SimulatedAssetRegistry>, Arc<SimulatedLedger>, Arc<ManualClock>) {
    init_tracing();
    (
        Arc::new(SimulatedAssetRegistry::new(AccountId::new("0xE5C20"))),
        Arc::new(SimulatedLedger::new()),
        Arc::new(ManualClock::new(GENESIS)),
    )
}

/// A marketplace plus handles on its backends.
pub struct Harness {
    /// The marketplace under test.
    pub market: Market,
    /// Shared asset registry.
    pub custody: Arc<SimulatedAssetRegistry>,
    /// Shared payment ledger.
    pub ledger: Arc<SimulatedLedger>,
    /// Shared clock.
    pub clock: Arc<ManualClock>,
    /// The escrow holder.
    pub escrow: AccountId,
    /// Contract of every minted asset.
    pub collection: AccountId,
    /// Payment token used by [`Harness::list`].
    pub token_a: AccountId,
}

impl Harness {
    /// A marketplace with default rules.
    #[must_use]
    pub fn new() -> Self {
        let (custody, ledger, clock) = backends();
        let market = Marketplace::with_defaults(
            Arc::clone(&custody),
            Arc::clone(&ledger),
            Arc::clone(&clock),
        );
        Self::assemble(market, custody, ledger, clock)
    }

    /// A marketplace whose default config is adjusted by `tweak` first.
    pub fn with_config(tweak: impl FnOnce(&mut MarketConfig)) -> Result<Self, ConfigError> {
        let (custody, ledger, clock) = backends();
        let mut config = MarketConfig::new(custody.escrow_account().clone());
        tweak(&mut config);
        let market = Marketplace::new(
            config,
            Arc::clone(&custody),
            Arc::clone(&ledger),
            Arc::clone(&clock),
        )?;
        Ok(Self::assemble(market, custody, ledger, clock))
    }

    fn assemble(
        market: Market,
        custody: Arc<SimulatedAssetRegistry>,
        ledger: Arc<SimulatedLedger>,
        clock: Arc<ManualClock>,
    ) -> Self {
        Self {
            market,
            escrow: custody.escrow_account().clone(),
            custody,
            ledger,
            clock,
            collection: AccountId::new("0xC011EC7"),
            token_a: AccountId::new("0xA"),
        }
    }

    /// The asset with `token_id` in the harness collection.
    #[must_use]
    pub fn asset(&self, token_id: TokenId) -> AssetRef {
        AssetRef::new(self.collection.clone(), token_id)
    }

    /// Token A as a currency.
    #[must_use]
    pub fn currency_a(&self) -> Currency {
        Currency::Token(self.token_a.clone())
    }

    /// Mints an asset to `owner` and approves the escrow to move it.
    pub fn mint_approved(&self, owner: &AccountId, token_id: TokenId) -> Result<AssetRef, CustodyError> {
        let asset = self.asset(token_id);
        self.custody.mint(asset.clone(), owner.clone())?;
        self.custody.approve_escrow(&asset, owner)?;
        Ok(asset)
    }

    /// Credits `amount` of token A to `account`.
    pub fn fund(&self, account: &AccountId, amount: Amount) -> Result<(), LedgerError> {
        self.ledger.mint(account, &self.currency_a(), amount)
    }

    /// Lets the escrow pull `amount` of token A from `account`.
    pub fn approve_payment(&self, account: &AccountId, amount: Amount) {
        self.ledger.approve(account, &self.token_a, amount);
    }

    /// Mints an asset to `seller` and lists it for [`order_price`] of token A.
    pub fn list(&self, seller: &AccountId, token_id: TokenId) -> escrow_market::Result<OrderId> {
        let asset = self.mint_approved(seller, token_id)?;
        self.market.create_order(
            seller,
            CreateOrder::new(asset, ORDER_DURATION, order_price(), self.currency_a()),
        )
    }

    /// Current holder of an asset.
    pub fn holder(&self, token_id: TokenId) -> Result<AccountId, CustodyError> {
        self.custody.owner_of(&self.asset(token_id))
    }

    /// Token A balance of `account`.
    #[must_use]
    pub fn balance_a(&self, account: &AccountId) -> Amount {
        self.ledger.balance_of(account, &self.currency_a())
    }
}

impl Default for Harness {
    fn default() -> Self {
        Self::new()
    }
}
