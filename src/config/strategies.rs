use alloy::primitives::{Address, U256};
use clap::Parser;
use serde::Deserialize;

use crate::{
    bootstrap::StrategyPlan,
    primitives::ETH_ADDRESS,
    strategy::{EthYield, PassiveHold, StableYield, StrategyKind, Venue},
};

/// Default APR of the ETH strategy, in basis points.
pub const DEFAULT_ETH_APR_BPS: u64 = 350;

/// Default share of ETH deposits kept liquid, in basis points.
pub const DEFAULT_ETH_LIQUID_BPS: u64 = 1_000;

/// Default withdrawal cooldown of the ETH strategy: 7 days.
pub const DEFAULT_ETH_COOLDOWN: u64 = 7 * 24 * 60 * 60;

/// Default APR of the USD strategy, in basis points.
pub const DEFAULT_USD_APR_BPS: u64 = 500;

/// The strategies deployed and activated at bring-up, one per accepted asset.
#[derive(Debug, Clone, Parser, Deserialize)]
pub struct StrategyOpts {
    /// Strategy kind deployed for ETH
    #[clap(
        long,
        env = "CUSTODY_ETH_STRATEGY",
        value_enum,
        default_value_t = StrategyOpts::default().eth_strategy
    )]
    pub eth_strategy: StrategyKind,
    /// APR of the ETH strategy, in basis points
    #[clap(
        long,
        env = "CUSTODY_ETH_APR_BPS",
        default_value_t = StrategyOpts::default().eth_apr_bps
    )]
    pub eth_apr_bps: u64,
    /// Share of ETH deposits the strategy keeps liquid, in basis points
    #[clap(
        long,
        env = "CUSTODY_ETH_LIQUID_BPS",
        default_value_t = StrategyOpts::default().eth_liquid_bps
    )]
    pub eth_liquid_bps: u64,
    /// Seconds between an ETH withdrawal request and its maturity
    #[clap(
        long,
        env = "CUSTODY_ETH_COOLDOWN",
        default_value_t = StrategyOpts::default().eth_cooldown
    )]
    pub eth_cooldown: u64,
    /// Strategy kind deployed for the USD stablecoin
    #[clap(
        long,
        env = "CUSTODY_USD_STRATEGY",
        value_enum,
        default_value_t = StrategyOpts::default().usd_strategy
    )]
    pub usd_strategy: StrategyKind,
    /// APR of the USD strategy, in basis points
    #[clap(
        long,
        env = "CUSTODY_USD_APR_BPS",
        default_value_t = StrategyOpts::default().usd_apr_bps
    )]
    pub usd_apr_bps: u64,
    /// Optional cap on the capital each strategy accepts, in the asset's smallest unit
    #[clap(long, env = "CUSTODY_STRATEGY_DEPOSIT_CAP")]
    pub deposit_cap: Option<U256>,
}

impl Default for StrategyOpts {
    fn default() -> Self {
        Self {
            eth_strategy: StrategyKind::EthYield,
            eth_apr_bps: DEFAULT_ETH_APR_BPS,
            eth_liquid_bps: DEFAULT_ETH_LIQUID_BPS,
            eth_cooldown: DEFAULT_ETH_COOLDOWN,
            usd_strategy: StrategyKind::StableYield,
            usd_apr_bps: DEFAULT_USD_APR_BPS,
            deposit_cap: None,
        }
    }
}

impl StrategyOpts {
    /// One plan for ETH and, if a USD stablecoin is accepted, one for it.
    pub fn plans(&self, usd_asset: Option<Address>) -> Vec<StrategyPlan> {
        let mut plans = vec![StrategyPlan {
            asset: ETH_ADDRESS,
            venue: self.venue(self.eth_strategy, self.eth_apr_bps),
        }];

        if let Some(asset) = usd_asset {
            plans.push(StrategyPlan { asset, venue: self.venue(self.usd_strategy, self.usd_apr_bps) });
        }
        plans
    }

    fn venue(&self, kind: StrategyKind, apr_bps: u64) -> Venue {
        let cap = self.deposit_cap;
        match kind {
            StrategyKind::PassiveHold => Venue::PassiveHold(PassiveHold { cap, ..Default::default() }),
            StrategyKind::EthYield => Venue::EthYield(EthYield {
                cap,
                ..EthYield::new(apr_bps, self.eth_liquid_bps, self.eth_cooldown)
            }),
            StrategyKind::StableYield => {
                Venue::StableYield(StableYield { cap, ..StableYield::new(apr_bps) })
            }
        }
    }
}
