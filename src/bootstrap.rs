use alloy::primitives::Address;
use tracing::{info, warn};

use crate::{
    config::Genesis,
    deposit::DepositAdmin,
    error::CustodyError,
    primitives::{Asset, CallContext, ETH_ADDRESS},
    staking::StakingAdmin,
    strategy::Venue,
    system::{Call, CallOutput},
    CustodySystem,
};

/// A strategy deployed, registered and activated for one asset at bring-up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrategyPlan {
    /// The asset the strategy wraps.
    pub asset: Address,
    /// Its venue, with its initial parameters.
    pub venue: Venue,
}

/// Inputs of the bring-up sequence.
#[derive(Debug, Clone)]
pub struct DeploymentParams {
    /// Deploys implementations, proxies and strategies.
    pub deployer: Address,
    /// Owner of every component. Runs every administrative step.
    pub owner: Address,
    /// The staker EOA, made depositor of the staking manager.
    pub staker: Address,
    /// The USD stablecoin accepted next to ETH.
    pub usd_asset: Option<Asset>,
    /// The L1 standard bridge.
    pub l1_standard_bridge: Option<Address>,
    /// L2 counterpart of the wrapped ETH receipt.
    pub l2_eth: Option<Address>,
    /// L2 counterpart of the wrapped USD receipt.
    pub l2_usd: Option<Address>,
    /// Enable auto-bridge on every asset with an L2 counterpart.
    pub auto_bridge: bool,
    /// Enable auto-stake.
    pub auto_stake: bool,
    /// Strategies to deploy. The first plan of each asset becomes its active strategy.
    pub strategies: Vec<StrategyPlan>,
    /// External balances to seed.
    pub genesis: Genesis,
}

/// Deploys and configures a complete custody system at `now`.
///
/// Steps run in a fixed order: implementations and initialized proxies, the deposit manager as
/// staking operator, strategies and their activation, bridge configuration, auto-stake and finally
/// the genesis balances. Every administrative step goes through the executor as the owner.
pub fn bring_up(params: &DeploymentParams, now: u64) -> Result<CustodySystem, CustodyError> {
    let deployer = CallContext::new(params.deployer).at(now);
    let owner = CallContext::new(params.owner).at(now);

    let mut system = CustodySystem::deploy(&deployer, params.owner, params.staker, params.usd_asset)?;
    let deposit_manager = system.deposit_manager().address();
    info!(%deposit_manager, staking_manager = %system.staking_manager().address(), "Managers deployed");

    system.execute(&owner, Call::StakingAdmin(StakingAdmin::SetStaker(deposit_manager)))?;
    system.execute(&owner, Call::StakingAdmin(StakingAdmin::SetDepositor(params.staker)))?;
    info!(staker = %deposit_manager, depositor = %params.staker, "Staking operators set");

    for plan in &params.strategies {
        let strategy =
            system.deploy_strategy(&deployer, params.owner, plan.asset, plan.venue.clone())?;
        let output = system.execute(&owner, Call::AddStrategy { asset: plan.asset, strategy })?;

        let CallOutput::Slot(index) = output else {
            continue;
        };
        if system.staking_manager().registry().active(plan.asset).is_none() {
            system.execute(&owner, Call::SetActiveStrategy { asset: plan.asset, index })?;
            info!(asset = %plan.asset, %strategy, index, "Strategy activated");
        }
    }

    configure_bridge(&mut system, &owner, params)?;

    if params.auto_stake {
        system.execute(&owner, Call::SetAutoStake { enabled: true })?;
        info!("Auto-stake enabled");
    }

    for allocation in &params.genesis.allocations {
        system.fund(allocation.asset, allocation.holder, allocation.amount)?;
    }
    if !params.genesis.allocations.is_empty() {
        info!(count = params.genesis.allocations.len(), "Genesis balances seeded");
    }

    Ok(system)
}

fn configure_bridge(
    system: &mut CustodySystem,
    owner: &CallContext,
    params: &DeploymentParams,
) -> Result<(), CustodyError> {
    let Some(bridge) = params.l1_standard_bridge else {
        if params.auto_bridge {
            return Err(CustodyError::BridgeNotConfigured(ETH_ADDRESS));
        }
        return Ok(());
    };

    system.register_bridge(bridge);
    system.execute(owner, Call::SetL1StandardBridge { bridge })?;

    let l2_tokens = [
        (Some(ETH_ADDRESS), params.l2_eth),
        (params.usd_asset.map(|asset| asset.id), params.l2_usd),
    ];
    for (asset, l2_token) in l2_tokens {
        let Some(asset) = asset else { continue };
        let Some(l2_token) = l2_token else {
            if params.auto_bridge {
                warn!(%asset, "No L2 token configured, asset is not bridged");
            }
            continue;
        };

        system.execute(owner, Call::DepositAdmin(DepositAdmin::SetL2Token { asset, l2_token }))?;
        if params.auto_bridge {
            system.execute(owner, Call::SetAutoBridge { asset, enabled: true })?;
        }
    }

    info!(%bridge, auto_bridge = params.auto_bridge, "Bridge configured");
    Ok(())
}

#[cfg(test)]
mod tests {
    use alloy::primitives::U256;

    use crate::{
        config::Allocation,
        test_util::{
            eth, eth_yield, stable_yield, usd, ALICE, BRIDGE, DEPLOYER, L2_ETH, NOW, OWNER,
            STAKER, USDC,
        },
        upgrade::Upgradeable,
    };

    use super::*;

    fn params() -> DeploymentParams {
        DeploymentParams {
            deployer: DEPLOYER,
            owner: OWNER,
            staker: STAKER,
            usd_asset: Some(Asset::token(USDC, 6)),
            l1_standard_bridge: None,
            l2_eth: None,
            l2_usd: None,
            auto_bridge: false,
            auto_stake: true,
            strategies: vec![
                StrategyPlan { asset: ETH_ADDRESS, venue: eth_yield() },
                StrategyPlan { asset: USDC, venue: stable_yield() },
            ],
            genesis: Genesis {
                allocations: vec![
                    Allocation { asset: ETH_ADDRESS, holder: ALICE, amount: eth(10) },
                    Allocation { asset: USDC, holder: ALICE, amount: usd(1_000) },
                ],
            },
        }
    }

    #[test]
    fn test_bring_up() {
        let system = bring_up(&params(), NOW).unwrap();

        let deposit = system.deposit_manager();
        let staking = system.staking_manager();
        assert_eq!(deposit.owner(), OWNER);
        assert!(deposit.auto_stake());
        assert_eq!(staking.staker(), deposit.address());
        assert_eq!(staking.depositor(), STAKER);

        for asset in [ETH_ADDRESS, USDC] {
            assert_eq!(staking.registry().active(asset).map(|(index, _)| index), Some(0));
            assert_eq!(system.strategy_slots(asset, NOW).len(), 1);
        }

        assert_eq!(system.ledger().balance_of(ETH_ADDRESS, ALICE), eth(10));
        assert_eq!(system.ledger().balance_of(USDC, ALICE), usd(1_000));
    }

    #[test]
    fn test_bring_up_with_auto_bridge() {
        let mut params = params();
        params.l1_standard_bridge = Some(BRIDGE);
        params.l2_eth = Some(L2_ETH);
        params.auto_bridge = true;
        params.auto_stake = false;

        let system = bring_up(&params, NOW).unwrap();
        let deposit = system.deposit_manager();

        assert_eq!(deposit.l1_standard_bridge(), Some(BRIDGE));
        assert!(system.bridge(BRIDGE).is_some());

        let eth_config = deposit.asset(ETH_ADDRESS).unwrap();
        assert!(eth_config.auto_bridge);
        assert_eq!(eth_config.l2_token, Some(L2_ETH));
        assert!(!deposit.asset(USDC).unwrap().auto_bridge);
    }

    #[test]
    fn test_auto_bridge_without_bridge() {
        let mut params = params();
        params.auto_bridge = true;

        let err = bring_up(&params, NOW).unwrap_err();
        assert_eq!(err, CustodyError::BridgeNotConfigured(ETH_ADDRESS));
    }

    #[test]
    fn test_first_plan_per_asset_is_active() {
        let mut params = params();
        params.strategies.push(StrategyPlan { asset: ETH_ADDRESS, venue: eth_yield() });
        params.genesis = Genesis::default();

        let system = bring_up(&params, NOW).unwrap();
        let slots = system.strategy_slots(ETH_ADDRESS, NOW);

        assert_eq!(slots.len(), 2);
        assert!(slots[0].active);
        assert!(!slots[1].active);
        assert_eq!(slots[1].total_assets, U256::ZERO);
    }
}
