use std::collections::BTreeMap;

use alloy::primitives::{Address, U256};
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::{
    deposit::{DepositEnv, DepositInit, DepositManager, StandardBridge},
    error::CustodyError,
    primitives::{Asset, CallContext, Component},
    staking::{StakingEnv, StakingInit, StakingManager},
    strategy::{Strategy, StrategyBook, StrategyInit, StrategyKind, Venue, VenueEvent},
    telemetry::CustodyMetrics,
    upgrade::{ComponentKind, Implementation, ImplementationRegistry, Proxy},
};

/// Calls into the system and their results.
mod call;
pub use call::{Call, CallOutput, InitPayload, VenueCallback};

/// Balances held outside the system.
mod ledger;
pub use ledger::ExternalLedger;

/// Version of the implementations deployed at genesis.
const GENESIS_VERSION: u8 = 1;

/// Storage layout of the implementations deployed at genesis.
const GENESIS_LAYOUT: u16 = 1;

/// Everything the custody system and its environment hold.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct World {
    implementations: ImplementationRegistry,
    deposit: Proxy<DepositManager>,
    staking: Proxy<StakingManager>,
    strategies: StrategyBook,
    bridges: BTreeMap<Address, StandardBridge>,
    ledger: ExternalLedger,
    deployer: Address,
    nonce: u64,
}

impl World {
    fn deposit_call<'a>(
        &'a mut self,
        callbacks: &'a mut Vec<VenueCallback>,
    ) -> (&'a mut DepositManager, DepositEnv<'a>) {
        let env = DepositEnv {
            this: self.deposit.address(),
            ledger: &mut self.ledger,
            staking: &mut self.staking,
            strategies: &mut self.strategies,
            bridges: &mut self.bridges,
            callbacks,
        };
        (self.deposit.storage_mut(), env)
    }

    fn staking_call<'a>(
        &'a mut self,
        callbacks: &'a mut Vec<VenueCallback>,
    ) -> (&'a mut StakingManager, StakingEnv<'a>) {
        let env = StakingEnv {
            this: self.staking.address(),
            strategies: &mut self.strategies,
            callbacks,
        };
        (self.staking.storage_mut(), env)
    }

    /// Receipt supply and underlying held across custody and strategies for `asset`.
    pub fn backing(&self, asset: Address, now: u64) -> Result<(U256, U256), CustodyError> {
        let supply = self.deposit.wrapped_token(asset)?.total_supply();
        let underlying = self
            .deposit
            .idle(asset)
            .saturating_add(self.staking.total_assets(&self.strategies, asset, now));
        Ok((supply, underlying))
    }
}

/// Solvency of one asset at a point in time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetReport {
    /// The asset.
    pub asset: Address,
    /// Its receipt symbol.
    pub symbol: String,
    /// Receipts in circulation.
    pub supply: U256,
    /// Idle in the deposit manager.
    pub deposit_idle: U256,
    /// Idle in the staking manager.
    pub staking_idle: U256,
    /// Held across all custody and strategies.
    pub underlying: U256,
}

/// A strategy slot as seen from outside.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotView {
    /// Registration index.
    pub index: usize,
    /// Strategy proxy.
    pub strategy: Address,
    /// Venue kind.
    pub kind: StrategyKind,
    /// Whether new stake goes here.
    pub active: bool,
    /// Whether the slot was removed.
    pub removed: bool,
    /// Principal staked through the slot.
    pub principal: U256,
    /// Current value held by the strategy.
    pub total_assets: U256,
}

/// The transactional executor. Every call runs to completion against a snapshot of the world and
/// either commits entirely or restores the snapshot.
#[derive(Debug, Clone)]
pub struct CustodySystem {
    world: World,
    entered: Option<Component>,
    callbacks: Vec<VenueCallback>,
}

impl CustodySystem {
    /// Deploys both manager implementations and their proxies from `ctx.caller`, initialized with
    /// the latest initializer schemas.
    pub fn deploy(
        ctx: &CallContext,
        owner: Address,
        staker: Address,
        usd_asset: Option<Asset>,
    ) -> Result<Self, CustodyError> {
        let deployer = ctx.caller;
        let mut implementations = ImplementationRegistry::default();

        let staking_impl = Implementation {
            address: deployer.create(0),
            kind: ComponentKind::StakingManager,
            version: GENESIS_VERSION,
            layout: GENESIS_LAYOUT,
        };
        let deposit_impl = Implementation {
            address: deployer.create(1),
            kind: ComponentKind::DepositManager,
            ..staking_impl
        };
        implementations.register(staking_impl);
        implementations.register(deposit_impl);

        let staking = Proxy::deploy(
            ctx,
            deployer.create(2),
            &staking_impl,
            StakingManager::default(),
            StakingInit { owner },
        )?;
        let deposit = Proxy::deploy(
            ctx,
            deployer.create(3),
            &deposit_impl,
            DepositManager::default(),
            DepositInit { owner, staker, staking_manager: staking.address(), usd_asset },
        )?;

        info!(
            deposit_manager = %deposit.address(),
            staking_manager = %staking.address(),
            %owner,
            "Custody system deployed"
        );

        Ok(Self {
            world: World {
                implementations,
                deposit,
                staking,
                strategies: StrategyBook::default(),
                bridges: BTreeMap::new(),
                ledger: ExternalLedger::default(),
                deployer,
                nonce: 4,
            },
            entered: None,
            callbacks: Vec::new(),
        })
    }

    /// Executes `call` atomically.
    ///
    /// Rejects re-entrant calls, including calls venues make back into the system while handling
    /// capital, with [CustodyError::ReentrancyDetected]. After the call, receipts must not have
    /// outgrown their backing any further and auto-stake must still be operable; otherwise the call
    /// reverts.
    #[instrument(skip_all, name = "execute", fields(method = call.name(), caller = %ctx.caller))]
    pub fn execute(&mut self, ctx: &CallContext, call: Call) -> Result<CallOutput, CustodyError> {
        let method = call.name();
        let target = call.target();

        if self.entered.is_some() {
            CustodyMetrics::increment_reentrancy_rejections();
            return Err(CustodyError::ReentrancyDetected(target));
        }

        CustodyMetrics::increment_calls(method);

        if !call.is_payable() && !ctx.value.is_zero() {
            let err = CustodyError::ValueMismatch { sent: ctx.value, expected: U256::ZERO };
            CustodyMetrics::increment_reverts(method, err.to_tag_str());
            return Err(err);
        }

        let flow = match &call {
            Call::Deposit { asset, .. } => Some((true, *asset)),
            Call::Withdraw { asset, .. } => Some((false, *asset)),
            _ => None,
        };

        let snapshot = self.world.clone();
        self.entered = Some(target);

        let result = self.dispatch(ctx, call).and_then(|output| {
            self.drain_callbacks(ctx)?;
            self.check_invariants(&snapshot, ctx.timestamp)?;
            Ok(output)
        });

        self.entered = None;
        self.callbacks.clear();

        match result {
            Ok(output) => {
                match flow {
                    Some((true, asset)) => CustodyMetrics::increment_deposits(asset.to_string()),
                    Some((false, asset)) => CustodyMetrics::increment_withdrawals(asset.to_string()),
                    None => {}
                }
                if let CallOutput::Upgraded { .. } = output {
                    CustodyMetrics::increment_upgrades(target);
                }
                debug!(?output, "Call committed");
                Ok(output)
            }
            Err(err) => {
                self.world = snapshot;
                CustodyMetrics::increment_reverts(method, err.to_tag_str());
                warn!(%err, "Call reverted");
                Err(err)
            }
        }
    }

    fn dispatch(&mut self, ctx: &CallContext, call: Call) -> Result<CallOutput, CustodyError> {
        let world = &mut self.world;
        let callbacks = &mut self.callbacks;

        match call {
            Call::Deposit { asset, amount } => {
                let (deposit, mut env) = world.deposit_call(callbacks);
                deposit.deposit(ctx, &mut env, asset, amount).map(CallOutput::Amount)
            }
            Call::Withdraw { asset, amount } => {
                let (deposit, mut env) = world.deposit_call(callbacks);
                deposit.withdraw(ctx, &mut env, asset, amount).map(CallOutput::Amount)
            }
            Call::SetAutoStake { enabled } => {
                let this = world.deposit.address();
                let World { deposit, staking, .. } = world;
                deposit.storage_mut().set_auto_stake(ctx, this, staking.storage(), enabled)?;
                Ok(CallOutput::None)
            }
            Call::SetAutoBridge { asset, enabled } => {
                world.deposit.storage_mut().set_auto_bridge(ctx, asset, enabled)?;
                Ok(CallOutput::None)
            }
            Call::SetL1StandardBridge { bridge } => {
                world.deposit.storage_mut().set_l1_standard_bridge(ctx, bridge)?;
                Ok(CallOutput::None)
            }
            Call::ForwardToStaking { asset, amount } => {
                let (deposit, mut env) = world.deposit_call(callbacks);
                deposit.forward_to_staking(ctx, &mut env, asset, amount)?;
                Ok(CallOutput::None)
            }
            Call::HarvestYield { asset, to } => {
                let (deposit, mut env) = world.deposit_call(callbacks);
                deposit.harvest_yield(ctx, &mut env, asset, to).map(CallOutput::Amount)
            }
            Call::DepositAdmin(admin) => {
                let this = world.deposit.address();
                world.deposit.storage_mut().admin(ctx, this, admin)?;
                Ok(CallOutput::None)
            }
            Call::AddStrategy { asset, strategy } => {
                let World { staking, strategies, .. } = world;
                staking
                    .storage_mut()
                    .add_strategy(ctx, strategies, asset, strategy)
                    .map(CallOutput::Slot)
            }
            Call::RemoveStrategy { asset, index } => {
                let World { staking, strategies, .. } = world;
                staking.storage_mut().remove_strategy(ctx, strategies, asset, index)?;
                Ok(CallOutput::None)
            }
            Call::SetActiveStrategy { asset, index } => {
                world.staking.storage_mut().set_active_strategy(ctx, asset, index)?;
                Ok(CallOutput::None)
            }
            Call::Stake { asset, amount } => {
                let (staking, mut env) = world.staking_call(callbacks);
                staking.stake(ctx, &mut env, asset, amount).map(CallOutput::Slot)
            }
            Call::Unstake { asset, amount } => {
                let (staking, mut env) = world.staking_call(callbacks);
                staking.unstake(ctx, &mut env, asset, amount).map(CallOutput::Slot)
            }
            Call::UnstakeFrom { asset, index, amount } => {
                let (staking, mut env) = world.staking_call(callbacks);
                staking.unstake_from(ctx, &mut env, asset, index, amount)?;
                Ok(CallOutput::None)
            }
            Call::RequestUnstake { asset, index, amount } => {
                let (staking, mut env) = world.staking_call(callbacks);
                staking.request_unstake(ctx, &mut env, asset, index, amount).map(CallOutput::ReadyAt)
            }
            Call::Migrate { asset, from, to, amount } => {
                let (staking, mut env) = world.staking_call(callbacks);
                staking.migrate(ctx, &mut env, asset, from, to, amount)?;
                Ok(CallOutput::None)
            }
            Call::StakingAdmin(admin) => {
                world.staking.storage_mut().admin(ctx, admin)?;
                Ok(CallOutput::None)
            }
            Call::StrategyAdmin { strategy, call } => {
                world.strategies.strategy_mut(strategy)?.storage_mut().admin(ctx, call)?;
                Ok(CallOutput::None)
            }
            Call::Upgrade { target, implementation, init } => {
                let World { implementations, deposit, staking, strategies, .. } = world;

                let (from, to) = match target {
                    Component::DepositManager => {
                        let init = init.map(InitPayload::into_deposit).transpose()?;
                        let record =
                            deposit.upgrade_to_and_call(ctx, implementations, implementation, init)?;
                        (record.from, record.to)
                    }
                    Component::StakingManager => {
                        let init = init.map(InitPayload::into_staking).transpose()?;
                        let record =
                            staking.upgrade_to_and_call(ctx, implementations, implementation, init)?;
                        (record.from, record.to)
                    }
                    Component::Strategy(address) => {
                        let init = init.map(InitPayload::into_strategy).transpose()?;
                        let record = strategies.strategy_mut(address)?.upgrade_to_and_call(
                            ctx,
                            implementations,
                            implementation,
                            init,
                        )?;
                        (record.from, record.to)
                    }
                };

                info!(component = %target, %from, %to, "Implementation upgraded");
                Ok(CallOutput::Upgraded { from, to })
            }
        }
    }

    fn drain_callbacks(&mut self, ctx: &CallContext) -> Result<(), CustodyError> {
        for VenueCallback { strategy, call } in std::mem::take(&mut self.callbacks) {
            warn!(%strategy, method = call.name(), "Venue called back into the system");
            self.execute(&ctx.nested(strategy), call)?;
        }
        Ok(())
    }

    fn check_invariants(&self, before: &World, now: u64) -> Result<(), CustodyError> {
        for config in self.world.deposit.assets() {
            let asset = config.asset.id;
            let (supply, underlying) = self.world.backing(asset, now)?;
            let (supply_before, underlying_before) = before.backing(asset, now).unwrap_or_default();

            let deficit = supply.saturating_sub(underlying);
            if deficit > supply_before.saturating_sub(underlying_before) {
                return Err(CustodyError::ConservationViolated { asset, supply, underlying });
            }
        }

        let deposit = &self.world.deposit;
        if deposit.auto_stake() && !self.world.staking.is_operator(deposit.address()) {
            return Err(CustodyError::StakerUnset);
        }

        Ok(())
    }

    fn next_address(&mut self) -> Address {
        let address = self.world.deployer.create(self.world.nonce);
        self.world.nonce += 1;
        address
    }

    /// Deploys a new implementation of `kind`. Proxies can then be upgraded to it.
    pub fn deploy_implementation(
        &mut self,
        kind: ComponentKind,
        version: u8,
        layout: u16,
    ) -> Implementation {
        let implementation = Implementation { address: self.next_address(), kind, version, layout };
        self.world.implementations.register(implementation);

        debug!(address = %implementation.address, ?kind, version, layout, "Implementation deployed");
        implementation
    }

    /// Deploys a strategy proxy for `underlying` behind the newest implementation of the venue's
    /// kind, initialized with `owner` and this system's staking manager.
    pub fn deploy_strategy(
        &mut self,
        ctx: &CallContext,
        owner: Address,
        underlying: Address,
        venue: Venue,
    ) -> Result<Address, CustodyError> {
        let kind = ComponentKind::Strategy(venue.kind());
        let implementation = match self.world.implementations.latest(kind) {
            Some(implementation) => *implementation,
            None => self.deploy_implementation(kind, GENESIS_VERSION, GENESIS_LAYOUT),
        };

        let address = self.next_address();
        let proxy = Proxy::deploy(
            ctx,
            address,
            &implementation,
            Strategy::new(underlying, venue),
            StrategyInit { owner, staking_manager: self.world.staking.address() },
        )?;
        self.world.strategies.insert(proxy);

        info!(%address, ?kind, %underlying, "Strategy deployed");
        Ok(address)
    }

    /// Deploys an L1 standard bridge at `address`, if none is there yet.
    pub fn register_bridge(&mut self, address: Address) {
        self.world.bridges.entry(address).or_insert_with(|| StandardBridge::new(address));
    }

    /// Credits an external balance.
    pub fn fund(&mut self, asset: Address, holder: Address, amount: U256) -> Result<(), CustodyError> {
        self.world.ledger.credit(asset, holder, amount)
    }

    /// Applies an external event to a strategy's venue.
    pub fn apply_venue_event(
        &mut self,
        strategy: Address,
        event: &VenueEvent,
        now: u64,
    ) -> Result<(), CustodyError> {
        let proxy = self.world.strategies.strategy_mut(strategy)?;
        let asset = proxy.underlying_asset();

        proxy
            .storage_mut()
            .apply_event(event, now)
            .map_err(|err| CustodyError::from_strategy(strategy, asset, err))?;

        info!(%strategy, event = event.name(), "Venue event applied");
        Ok(())
    }

    /// Makes a strategy's venue call back into the system whenever it receives capital.
    pub fn attach_venue_callback(
        &mut self,
        strategy: Address,
        call: Option<Call>,
    ) -> Result<(), CustodyError> {
        self.world.strategies.strategy_mut(strategy)?.storage_mut().set_callback(call);
        Ok(())
    }

    /// The whole world, for inspection.
    pub fn world(&self) -> &World {
        &self.world
    }

    /// The deposit manager proxy.
    pub fn deposit_manager(&self) -> &Proxy<DepositManager> {
        &self.world.deposit
    }

    /// The staking manager proxy.
    pub fn staking_manager(&self) -> &Proxy<StakingManager> {
        &self.world.staking
    }

    /// Deployed strategies.
    pub fn strategies(&self) -> &StrategyBook {
        &self.world.strategies
    }

    /// Deployed implementations.
    pub fn implementations(&self) -> &ImplementationRegistry {
        &self.world.implementations
    }

    /// Balances held outside the system.
    pub fn ledger(&self) -> &ExternalLedger {
        &self.world.ledger
    }

    /// A deployed bridge.
    pub fn bridge(&self, address: Address) -> Option<&StandardBridge> {
        self.world.bridges.get(&address)
    }

    /// Underlying held across custody and strategies for `asset`.
    pub fn total_underlying(&self, asset: Address, now: u64) -> Result<U256, CustodyError> {
        self.world.backing(asset, now).map(|(_, underlying)| underlying)
    }

    /// Solvency of every accepted asset.
    pub fn solvency_report(&self, now: u64) -> Vec<AssetReport> {
        let deposit = &self.world.deposit;

        deposit
            .assets()
            .filter_map(|config| {
                let asset = config.asset.id;
                let (supply, underlying) = self.world.backing(asset, now).ok()?;
                Some(AssetReport {
                    asset,
                    symbol: deposit.wrapped_token(asset).ok()?.symbol.clone(),
                    supply,
                    deposit_idle: deposit.idle(asset),
                    staking_idle: self.world.staking.idle(asset),
                    underlying,
                })
            })
            .collect()
    }

    /// Strategy slots registered for `asset`.
    pub fn strategy_slots(&self, asset: Address, now: u64) -> Vec<SlotView> {
        let Some(entry) = self.world.staking.registry().strategies(asset) else {
            return Vec::new();
        };

        entry
            .slots()
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| {
                let strategy = self.world.strategies.strategy(slot.strategy).ok()?;
                Some(SlotView {
                    index,
                    strategy: slot.strategy,
                    kind: strategy.kind(),
                    active: entry.active() == Some(index),
                    removed: slot.removed,
                    principal: slot.principal,
                    total_assets: strategy.total_assets(now),
                })
            })
            .collect()
    }
}
