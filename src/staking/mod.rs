use std::collections::BTreeMap;

use alloy::primitives::{Address, U256};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{
    error::CustodyError,
    primitives::{ensure_role, CallContext, Role},
    strategy::StrategyBook,
    system::VenueCallback,
    upgrade::{ComponentKind, StorageVersions, Upgradeable},
};

/// Per-asset registry of strategy slots and the active slot.
pub mod registry;
pub use registry::{AssetStrategies, StrategyRegistry, StrategySlot};

/// Arguments of `initialize(owner)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StakingInit {
    /// The owner principal.
    pub owner: Address,
}

/// Owner-only principal management.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method", content = "params", rename_all = "camelCase")]
pub enum StakingAdmin {
    /// Sets the staker principal.
    SetStaker(Address),
    /// Sets the depositor principal.
    SetDepositor(Address),
    /// Hands ownership to another principal.
    TransferOwnership(Address),
}

/// Everything outside its own storage the staking manager touches during a call.
#[derive(Debug)]
pub struct StakingEnv<'a> {
    /// The staking manager proxy address.
    pub this: Address,
    /// Deployed strategies.
    pub strategies: &'a mut StrategyBook,
    /// Calls venues make back into the system.
    pub callbacks: &'a mut Vec<VenueCallback>,
}

/// Idle custody plus the strategy registry. Only operators (the staker and the depositor) move
/// capital; only the owner changes the registry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StakingManager {
    owner: Address,
    staker: Address,
    depositor: Address,
    idle: BTreeMap<Address, U256>,
    registry: StrategyRegistry,
    versions: StorageVersions,
}

impl StakingManager {
    /// The staker principal.
    pub fn staker(&self) -> Address {
        self.staker
    }

    /// The depositor principal.
    pub fn depositor(&self) -> Address {
        self.depositor
    }

    /// Whether `address` may move capital.
    pub fn is_operator(&self, address: Address) -> bool {
        !address.is_zero() && (address == self.staker || address == self.depositor)
    }

    fn ensure_operator(&self, caller: Address) -> Result<(), CustodyError> {
        if self.is_operator(caller) {
            Ok(())
        } else {
            Err(CustodyError::Unauthorized { caller, role: Role::Staker })
        }
    }

    /// The strategy registry.
    pub fn registry(&self) -> &StrategyRegistry {
        &self.registry
    }

    /// Capital of `asset` held idle by the staking manager.
    pub fn idle(&self, asset: Address) -> U256 {
        self.idle.get(&asset).copied().unwrap_or_default()
    }

    /// Idle capital plus everything held by live slots for `asset`.
    pub fn total_assets(&self, strategies: &StrategyBook, asset: Address, now: u64) -> U256 {
        self.registry.withdrawal_order(asset).into_iter().fold(self.idle(asset), |total, (_, s)| {
            total.saturating_add(strategies.total_assets(s, now).unwrap_or_default())
        })
    }

    /// Owner-only principal management.
    pub fn admin(&mut self, ctx: &CallContext, call: StakingAdmin) -> Result<(), CustodyError> {
        ensure_role(Role::Owner, self.owner, ctx.caller)?;

        match call {
            StakingAdmin::SetStaker(staker) => self.staker = staker,
            StakingAdmin::SetDepositor(depositor) => self.depositor = depositor,
            StakingAdmin::TransferOwnership(owner) => self.owner = owner,
        }
        Ok(())
    }

    /// Registers `strategy` for `asset`. Returns the new slot index.
    pub fn add_strategy(
        &mut self,
        ctx: &CallContext,
        strategies: &StrategyBook,
        asset: Address,
        strategy: Address,
    ) -> Result<usize, CustodyError> {
        ensure_role(Role::Owner, self.owner, ctx.caller)?;

        let underlying = strategies.strategy(strategy)?.underlying_asset();
        if underlying != asset {
            return Err(CustodyError::StrategyAssetMismatch { strategy, asset, underlying });
        }

        let index = self.registry.add(asset, strategy)?;
        info!(%asset, %strategy, index, "Strategy registered");
        Ok(index)
    }

    /// Removes an inactive, empty slot.
    pub fn remove_strategy(
        &mut self,
        ctx: &CallContext,
        strategies: &StrategyBook,
        asset: Address,
        index: usize,
    ) -> Result<(), CustodyError> {
        ensure_role(Role::Owner, self.owner, ctx.caller)?;

        let strategy = self.registry.slot(asset, index)?.strategy;
        let balance = strategies.total_assets(strategy, ctx.timestamp)?;
        if !balance.is_zero() {
            return Err(CustodyError::SlotNotEmpty { asset, index, balance });
        }

        self.registry.remove(asset, index)?;
        info!(%asset, %strategy, index, "Strategy removed");
        Ok(())
    }

    /// Routes new stake for `asset` to slot `index`. Staked capital stays where it is.
    pub fn set_active_strategy(
        &mut self,
        ctx: &CallContext,
        asset: Address,
        index: usize,
    ) -> Result<(), CustodyError> {
        ensure_role(Role::Owner, self.owner, ctx.caller)?;

        let previous = self.registry.set_active(asset, index)?;
        info!(%asset, index, ?previous, "Active strategy set");
        Ok(())
    }

    /// Takes custody of capital handed over by an operator.
    pub fn receive_capital(
        &mut self,
        ctx: &CallContext,
        asset: Address,
        amount: U256,
    ) -> Result<(), CustodyError> {
        self.ensure_operator(ctx.caller)?;

        let idle = self.idle.entry(asset).or_default();
        *idle = idle.checked_add(amount).ok_or(CustodyError::Overflow)?;
        Ok(())
    }

    /// Moves idle capital into the active strategy. Returns the slot it went to.
    pub fn stake(
        &mut self,
        ctx: &CallContext,
        env: &mut StakingEnv<'_>,
        asset: Address,
        amount: U256,
    ) -> Result<usize, CustodyError> {
        self.ensure_operator(ctx.caller)?;
        if amount.is_zero() {
            return Err(CustodyError::ZeroAmount);
        }

        let (index, strategy) = self
            .registry
            .active(asset)
            .map(|(index, slot)| (index, slot.strategy))
            .ok_or(CustodyError::NoActiveStrategy(asset))?;

        self.take_idle(asset, amount)?;
        env.strategies.deposit(&ctx.nested(env.this), strategy, amount, env.callbacks)?;
        self.registry.record_stake(asset, index, amount);

        debug!(%asset, %strategy, index, %amount, "Staked");
        Ok(index)
    }

    /// Returns `amount` to idle custody from the first slot, active one first, able to supply it
    /// synchronously.
    pub fn unstake(
        &mut self,
        ctx: &CallContext,
        env: &mut StakingEnv<'_>,
        asset: Address,
        amount: U256,
    ) -> Result<usize, CustodyError> {
        self.ensure_operator(ctx.caller)?;
        if amount.is_zero() {
            return Err(CustodyError::ZeroAmount);
        }

        let mut best = U256::ZERO;
        for (index, strategy) in self.registry.withdrawal_order(asset) {
            let withdrawable = env.strategies.withdrawable(strategy, ctx.timestamp)?;
            if withdrawable >= amount {
                self.pull(ctx, env, asset, index, strategy, amount)?;
                return Ok(index);
            }
            best = best.max(withdrawable);
        }

        Err(CustodyError::InsufficientStrategyBalance { asset, requested: amount, available: best })
    }

    /// Returns `amount` to idle custody from slot `index`, surfacing venue failures as-is.
    pub fn unstake_from(
        &mut self,
        ctx: &CallContext,
        env: &mut StakingEnv<'_>,
        asset: Address,
        index: usize,
        amount: U256,
    ) -> Result<(), CustodyError> {
        self.ensure_operator(ctx.caller)?;
        if amount.is_zero() {
            return Err(CustodyError::ZeroAmount);
        }

        let strategy = self.registry.slot(asset, index)?.strategy;
        self.pull(ctx, env, asset, index, strategy, amount)
    }

    /// Queues a withdrawal in venues with a cooldown. Returns when it matures.
    pub fn request_unstake(
        &mut self,
        ctx: &CallContext,
        env: &mut StakingEnv<'_>,
        asset: Address,
        index: usize,
        amount: U256,
    ) -> Result<Option<u64>, CustodyError> {
        self.ensure_operator(ctx.caller)?;

        let strategy = self.registry.slot(asset, index)?.strategy;
        let ready_at = env.strategies.request_withdrawal(&ctx.nested(env.this), strategy, amount)?;

        debug!(%asset, %strategy, index, %amount, ?ready_at, "Unstake requested");
        Ok(ready_at)
    }

    /// Moves `amount` from slot `from` to slot `to`.
    pub fn migrate(
        &mut self,
        ctx: &CallContext,
        env: &mut StakingEnv<'_>,
        asset: Address,
        from: usize,
        to: usize,
        amount: U256,
    ) -> Result<(), CustodyError> {
        self.ensure_operator(ctx.caller)?;
        if amount.is_zero() {
            return Err(CustodyError::ZeroAmount);
        }

        let source = self.registry.slot(asset, from)?.strategy;
        let target = self.registry.slot(asset, to)?.strategy;

        self.pull(ctx, env, asset, from, source, amount)?;
        self.take_idle(asset, amount)?;
        env.strategies.deposit(&ctx.nested(env.this), target, amount, env.callbacks)?;
        self.registry.record_stake(asset, to, amount);

        info!(%asset, from, to, %amount, "Capital migrated");
        Ok(())
    }

    /// Hands `amount` of `asset` back to the calling operator, drawing on idle custody first and
    /// then on slots in withdrawal order. Either the full amount is returned or nothing is.
    pub fn withdraw_capital(
        &mut self,
        ctx: &CallContext,
        env: &mut StakingEnv<'_>,
        asset: Address,
        amount: U256,
    ) -> Result<(), CustodyError> {
        self.ensure_operator(ctx.caller)?;

        let mut shortfall = amount.saturating_sub(self.idle(asset));
        for (index, strategy) in self.registry.withdrawal_order(asset) {
            if shortfall.is_zero() {
                break;
            }

            let portion = env.strategies.withdrawable(strategy, ctx.timestamp)?.min(shortfall);
            if !portion.is_zero() {
                self.pull(ctx, env, asset, index, strategy, portion)?;
                shortfall -= portion;
            }
        }

        if !shortfall.is_zero() {
            return Err(CustodyError::InsufficientStrategyBalance {
                asset,
                requested: amount,
                available: amount - shortfall,
            });
        }

        self.take_idle(asset, amount)
    }

    fn pull(
        &mut self,
        ctx: &CallContext,
        env: &mut StakingEnv<'_>,
        asset: Address,
        index: usize,
        strategy: Address,
        amount: U256,
    ) -> Result<(), CustodyError> {
        env.strategies.withdraw(&ctx.nested(env.this), strategy, amount)?;
        self.registry.record_unstake(asset, index, amount);
        *self.idle.entry(asset).or_default() += amount;

        debug!(%asset, %strategy, index, %amount, "Unstaked");
        Ok(())
    }

    fn take_idle(&mut self, asset: Address, amount: U256) -> Result<(), CustodyError> {
        let available = self.idle(asset);
        if available < amount {
            return Err(CustodyError::InsufficientBalance { requested: amount, available });
        }

        if available == amount {
            self.idle.remove(&asset);
        } else {
            self.idle.insert(asset, available - amount);
        }
        Ok(())
    }
}

impl Upgradeable for StakingManager {
    type Init = StakingInit;

    const NAME: &'static str = "StakingManager";

    fn accepts(&self, kind: ComponentKind) -> bool {
        kind == ComponentKind::StakingManager
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
        init: StakingInit,
    ) -> Result<(), CustodyError> {
        self.owner = init.owner;
        Ok(())
    }
}
