use alloy::primitives::{Address, U256};
use serde::{Deserialize, Serialize};

use crate::{
    deposit::{DepositAdmin, DepositInit},
    primitives::Component,
    staking::{StakingAdmin, StakingInit},
    strategy::{StrategyAdmin, StrategyInit},
    upgrade::UpgradeError,
};

/// Every mutating entry point of the custody system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method", content = "params", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Call {
    /// `DepositManager.deposit(asset, amount)`. The only payable call.
    Deposit {
        /// The asset, or the native sentinel.
        asset: Address,
        /// Amount to deposit.
        amount: U256,
    },
    /// `DepositManager.withdraw(asset, amount)`
    Withdraw {
        /// The asset.
        asset: Address,
        /// Receipts to burn.
        amount: U256,
    },
    /// `DepositManager.setAutoStake(enabled)`
    SetAutoStake {
        /// Whether deposits flow into staking.
        enabled: bool,
    },
    /// `DepositManager.setAutoBridge(asset, enabled)`
    SetAutoBridge {
        /// The asset.
        asset: Address,
        /// Whether deposits of `asset` are bridged to L2.
        enabled: bool,
    },
    /// `DepositManager.setL1StandardBridge(bridge)`
    SetL1StandardBridge {
        /// The bridge. Zero unsets it.
        bridge: Address,
    },
    /// `DepositManager.forwardToStaking(asset, amount)`
    ForwardToStaking {
        /// The asset.
        asset: Address,
        /// Idle capital to hand over.
        amount: U256,
    },
    /// `DepositManager.harvestYield(asset, to)`
    HarvestYield {
        /// The asset.
        asset: Address,
        /// Receiver of the minted yield.
        to: Address,
    },
    /// Other deposit manager configuration.
    DepositAdmin(DepositAdmin),
    /// `StakingManager.addStrategy(asset, strategy)`
    AddStrategy {
        /// The asset.
        asset: Address,
        /// The strategy proxy.
        strategy: Address,
    },
    /// `StakingManager.removeStrategy(asset, index)`
    RemoveStrategy {
        /// The asset.
        asset: Address,
        /// Slot to remove.
        index: usize,
    },
    /// `StakingManager.setActiveStrategy(asset, index)`
    SetActiveStrategy {
        /// The asset.
        asset: Address,
        /// Slot receiving new stake.
        index: usize,
    },
    /// `StakingManager.stake(asset, amount)`
    Stake {
        /// The asset.
        asset: Address,
        /// Idle capital to stake.
        amount: U256,
    },
    /// `StakingManager.unstake(asset, amount)`
    Unstake {
        /// The asset.
        asset: Address,
        /// Capital to return to idle custody.
        amount: U256,
    },
    /// `StakingManager.unstakeFrom(asset, index, amount)`
    UnstakeFrom {
        /// The asset.
        asset: Address,
        /// Slot to unstake from.
        index: usize,
        /// Capital to return to idle custody.
        amount: U256,
    },
    /// `StakingManager.requestUnstake(asset, index, amount)`
    RequestUnstake {
        /// The asset.
        asset: Address,
        /// Slot to queue the withdrawal in.
        index: usize,
        /// Capital to queue.
        amount: U256,
    },
    /// `StakingManager.migrate(asset, from, to, amount)`
    Migrate {
        /// The asset.
        asset: Address,
        /// Source slot.
        from: usize,
        /// Target slot.
        to: usize,
        /// Capital to move.
        amount: U256,
    },
    /// Staking manager principal management.
    StakingAdmin(StakingAdmin),
    /// Strategy configuration.
    StrategyAdmin {
        /// The strategy proxy.
        strategy: Address,
        /// The configuration call.
        call: StrategyAdmin,
    },
    /// `upgradeToAndCall(implementation, init)` on any component.
    Upgrade {
        /// The proxy to upgrade.
        target: Component,
        /// The new implementation.
        implementation: Address,
        /// Initializer to run against the new implementation, if any.
        init: Option<InitPayload>,
    },
}

impl Call {
    /// Returns the call name, for logs and metrics.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Deposit { .. } => "deposit",
            Self::Withdraw { .. } => "withdraw",
            Self::SetAutoStake { .. } => "setAutoStake",
            Self::SetAutoBridge { .. } => "setAutoBridge",
            Self::SetL1StandardBridge { .. } => "setL1StandardBridge",
            Self::ForwardToStaking { .. } => "forwardToStaking",
            Self::HarvestYield { .. } => "harvestYield",
            Self::DepositAdmin(_) => "depositAdmin",
            Self::AddStrategy { .. } => "addStrategy",
            Self::RemoveStrategy { .. } => "removeStrategy",
            Self::SetActiveStrategy { .. } => "setActiveStrategy",
            Self::Stake { .. } => "stake",
            Self::Unstake { .. } => "unstake",
            Self::UnstakeFrom { .. } => "unstakeFrom",
            Self::RequestUnstake { .. } => "requestUnstake",
            Self::Migrate { .. } => "migrate",
            Self::StakingAdmin(_) => "stakingAdmin",
            Self::StrategyAdmin { .. } => "strategyAdmin",
            Self::Upgrade { .. } => "upgradeToAndCall",
        }
    }

    /// The component the call enters.
    pub fn target(&self) -> Component {
        match self {
            Self::Deposit { .. }
            | Self::Withdraw { .. }
            | Self::SetAutoStake { .. }
            | Self::SetAutoBridge { .. }
            | Self::SetL1StandardBridge { .. }
            | Self::ForwardToStaking { .. }
            | Self::HarvestYield { .. }
            | Self::DepositAdmin(_) => Component::DepositManager,
            Self::AddStrategy { .. }
            | Self::RemoveStrategy { .. }
            | Self::SetActiveStrategy { .. }
            | Self::Stake { .. }
            | Self::Unstake { .. }
            | Self::UnstakeFrom { .. }
            | Self::RequestUnstake { .. }
            | Self::Migrate { .. }
            | Self::StakingAdmin(_) => Component::StakingManager,
            Self::StrategyAdmin { strategy, .. } => Component::Strategy(*strategy),
            Self::Upgrade { target, .. } => *target,
        }
    }

    /// Whether the call accepts native value.
    pub fn is_payable(&self) -> bool {
        matches!(self, Self::Deposit { .. })
    }
}

/// Initializer payload passed along with an upgrade.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "component", content = "args", rename_all = "camelCase")]
pub enum InitPayload {
    /// `DepositManager.initialize(...)`
    DepositManager(DepositInit),
    /// `StakingManager.initialize(...)`
    StakingManager(StakingInit),
    /// `Strategy.initialize(...)`
    Strategy(StrategyInit),
}

/// The result of a successful call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum CallOutput {
    /// Nothing to return.
    None,
    /// An amount minted, released or harvested.
    Amount(U256),
    /// A strategy slot index.
    Slot(usize),
    /// When a queued withdrawal matures.
    ReadyAt(Option<u64>),
    /// The implementation swap that happened.
    Upgraded {
        /// Previous implementation.
        from: Address,
        /// New implementation.
        to: Address,
    },
}

/// A call a venue makes back into the system while it is handling one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VenueCallback {
    /// The calling strategy.
    pub strategy: Address,
    /// The attempted call.
    pub call: Call,
}

impl InitPayload {
    /// The deposit manager initializer, or [UpgradeError::PayloadMismatch].
    pub fn into_deposit(self) -> Result<DepositInit, UpgradeError> {
        match self {
            Self::DepositManager(init) => Ok(init),
            _ => Err(UpgradeError::PayloadMismatch("DepositManager")),
        }
    }

    /// The staking manager initializer, or [UpgradeError::PayloadMismatch].
    pub fn into_staking(self) -> Result<StakingInit, UpgradeError> {
        match self {
            Self::StakingManager(init) => Ok(init),
            _ => Err(UpgradeError::PayloadMismatch("StakingManager")),
        }
    }

    /// The strategy initializer, or [UpgradeError::PayloadMismatch].
    pub fn into_strategy(self) -> Result<StrategyInit, UpgradeError> {
        match self {
            Self::Strategy(init) => Ok(init),
            _ => Err(UpgradeError::PayloadMismatch("Strategy")),
        }
    }
}
