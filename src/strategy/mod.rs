use alloy::primitives::{Address, U256};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    error::CustodyError,
    primitives::{ensure_role, CallContext, Role},
    system::Call,
    upgrade::{ComponentKind, StorageVersions, Upgradeable},
};

/// The yield venue family and the capability set they share.
pub mod venue;
pub use venue::{VenueEvent, YieldVenue};

/// Plain custody venue.
pub mod passive;
pub use passive::PassiveHold;

/// Native staking venue with a withdrawal queue.
pub mod eth;
pub use eth::{EthYield, WithdrawalClaim};

/// Stablecoin lending venue.
pub mod stable;
pub use stable::StableYield;

/// Deployed strategies, keyed by proxy address.
mod book;
pub use book::StrategyBook;

/// Failures reported by an external venue.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StrategyError {
    /// The venue refused the deposit (cap reached, paused, insolvent).
    #[error("deposit rejected: {0}")]
    DepositRejected(String),
    /// The venue enforces a cooldown; retry later.
    #[error("withdrawal pending until {ready_at:?}")]
    WithdrawalPending {
        /// When queued capital matures, if any is queued.
        ready_at: Option<u64>,
    },
    /// The venue permanently refused the withdrawal.
    #[error("withdrawal rejected: {0}")]
    WithdrawalRejected(String),
    /// The venue holds less than requested.
    #[error("insufficient assets: requested {requested}, available {available}")]
    InsufficientAssets {
        /// Requested amount.
        requested: U256,
        /// Held amount.
        available: U256,
    },
    /// The event does not apply to this venue.
    #[error("unsupported venue event {0}")]
    UnsupportedEvent(&'static str),
}

/// The closed set of strategy kinds.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum StrategyKind {
    /// Plain custody.
    PassiveHold,
    /// Native staking / liquid restaking.
    EthYield,
    /// Stablecoin lending.
    StableYield,
}

/// A venue, dispatched by its stored kind tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Venue {
    /// Plain custody.
    PassiveHold(PassiveHold),
    /// Native staking / liquid restaking.
    EthYield(EthYield),
    /// Stablecoin lending.
    StableYield(StableYield),
}

impl Venue {
    /// The kind tag of this venue.
    pub fn kind(&self) -> StrategyKind {
        match self {
            Self::PassiveHold(_) => StrategyKind::PassiveHold,
            Self::EthYield(_) => StrategyKind::EthYield,
            Self::StableYield(_) => StrategyKind::StableYield,
        }
    }

    fn inner(&self) -> &dyn YieldVenue {
        match self {
            Self::PassiveHold(v) => v,
            Self::EthYield(v) => v,
            Self::StableYield(v) => v,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn YieldVenue {
        match self {
            Self::PassiveHold(v) => v,
            Self::EthYield(v) => v,
            Self::StableYield(v) => v,
        }
    }
}

impl YieldVenue for Venue {
    fn deposit(&mut self, amount: U256, now: u64) -> Result<(), StrategyError> {
        self.inner_mut().deposit(amount, now)
    }

    fn withdraw(&mut self, amount: U256, now: u64) -> Result<(), StrategyError> {
        self.inner_mut().withdraw(amount, now)
    }

    fn total_assets(&self, now: u64) -> U256 {
        self.inner().total_assets(now)
    }

    fn withdrawable(&self, now: u64) -> U256 {
        self.inner().withdrawable(now)
    }

    fn request_withdrawal(&mut self, amount: U256, now: u64) -> Result<Option<u64>, StrategyError> {
        self.inner_mut().request_withdrawal(amount, now)
    }

    fn set_cap(&mut self, cap: Option<U256>) {
        self.inner_mut().set_cap(cap)
    }

    fn apply(&mut self, event: &VenueEvent, now: u64) -> Result<(), StrategyError> {
        self.inner_mut().apply(event, now)
    }
}

/// Arguments of `initialize(owner, stakingManager)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StrategyInit {
    /// The owner principal.
    pub owner: Address,
    /// The only caller allowed to move capital in and out.
    pub staking_manager: Address,
}

/// Owner-only strategy configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method", content = "params", rename_all = "camelCase")]
pub enum StrategyAdmin {
    /// Hands ownership to another principal.
    TransferOwnership(Address),
    /// Replaces the venue deposit cap.
    SetDepositCap(Option<U256>),
}

/// Strategy storage: one underlying asset deployed into one venue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Strategy {
    owner: Address,
    staking_manager: Address,
    underlying: Address,
    venue: Venue,
    callback: Option<Box<Call>>,
    versions: StorageVersions,
}

impl Strategy {
    /// Uninitialized storage wrapping `underlying` in `venue`.
    pub fn new(underlying: Address, venue: Venue) -> Self {
        Self {
            owner: Address::ZERO,
            staking_manager: Address::ZERO,
            underlying,
            venue,
            callback: None,
            versions: StorageVersions::default(),
        }
    }

    /// The venue kind.
    pub fn kind(&self) -> StrategyKind {
        self.venue.kind()
    }

    /// The wrapped asset.
    pub fn underlying_asset(&self) -> Address {
        self.underlying
    }

    /// The staking manager allowed to move capital.
    pub fn staking_manager(&self) -> Address {
        self.staking_manager
    }

    /// The venue state.
    pub fn venue(&self) -> &Venue {
        &self.venue
    }

    /// Custodied value including accrued yield.
    pub fn total_assets(&self, now: u64) -> U256 {
        self.venue.total_assets(now)
    }

    /// What could be withdrawn synchronously right now.
    pub fn withdrawable(&self, now: u64) -> U256 {
        self.venue.withdrawable(now)
    }

    /// Moves capital into the venue. Returns the call the venue makes back into the system when it
    /// receives funds, if it makes one.
    pub(crate) fn deposit(
        &mut self,
        ctx: &CallContext,
        amount: U256,
    ) -> Result<Option<Call>, StrategyCallError> {
        ensure_role(Role::StakingManager, self.staking_manager, ctx.caller)?;
        self.venue.deposit(amount, ctx.timestamp)?;
        Ok(self.callback.as_deref().cloned())
    }

    pub(crate) fn withdraw(
        &mut self,
        ctx: &CallContext,
        amount: U256,
    ) -> Result<(), StrategyCallError> {
        ensure_role(Role::StakingManager, self.staking_manager, ctx.caller)?;
        self.venue.withdraw(amount, ctx.timestamp)?;
        Ok(())
    }

    pub(crate) fn request_withdrawal(
        &mut self,
        ctx: &CallContext,
        amount: U256,
    ) -> Result<Option<u64>, StrategyCallError> {
        ensure_role(Role::StakingManager, self.staking_manager, ctx.caller)?;
        Ok(self.venue.request_withdrawal(amount, ctx.timestamp)?)
    }

    /// Owner-only configuration.
    pub(crate) fn admin(&mut self, ctx: &CallContext, call: StrategyAdmin) -> Result<(), CustodyError> {
        ensure_role(Role::Owner, self.owner, ctx.caller)?;

        match call {
            StrategyAdmin::TransferOwnership(owner) => self.owner = owner,
            StrategyAdmin::SetDepositCap(cap) => self.venue.set_cap(cap),
        }
        Ok(())
    }

    pub(crate) fn apply_event(&mut self, event: &VenueEvent, now: u64) -> Result<(), StrategyError> {
        self.venue.apply(event, now)
    }

    pub(crate) fn set_callback(&mut self, call: Option<Call>) {
        self.callback = call.map(Box::new);
    }
}

/// Either an authorization failure or a venue failure, before it is attributed to a strategy.
#[derive(Debug, derive_more::From)]
pub(crate) enum StrategyCallError {
    Custody(CustodyError),
    Venue(StrategyError),
}

impl Upgradeable for Strategy {
    type Init = StrategyInit;

    const NAME: &'static str = "Strategy";

    fn accepts(&self, kind: ComponentKind) -> bool {
        kind == ComponentKind::Strategy(self.kind())
    }

    fn owner(&self) -> Address {
        self.owner
    }

    fn versions(&self) -> &StorageVersions {
        &self.versions
    }

    fn versions_mut(&mut self) -> &mut StorageVersions {
        &mut self.versions
    }

    fn initialize(
        &mut self,
        _ctx: &CallContext,
        _this: Address,
        init: StrategyInit,
    ) -> Result<(), CustodyError> {
        self.owner = init.owner;
        self.staking_manager = init.staking_manager;
        Ok(())
    }
}
