use std::{env, path::PathBuf};

use alloy::primitives::Address;
use clap::Parser;
use serde::Deserialize;
use tracing::debug;

use crate::{bootstrap::DeploymentParams, primitives::Asset};

/// Telemetry and metrics related options.
pub mod telemetry;
use telemetry::TelemetryOpts;

/// Strategies deployed at bring-up.
pub mod strategies;
use strategies::StrategyOpts;

/// External balances seeded at bring-up.
pub mod genesis;
pub use genesis::{Allocation, Genesis};

/// Default port for the JSON-RPC server exposed by the custody service.
pub const DEFAULT_RPC_PORT: u16 = 8018;

/// Default decimals of the USD stablecoin.
pub const DEFAULT_USD_DECIMALS: u8 = 6;

/// Default interval between two solvency reports, in seconds.
pub const DEFAULT_REPORT_INTERVAL: u64 = 12;

/// Command-line options for the custody service
#[derive(Debug, Parser, Deserialize)]
pub struct Opts {
    /// Port to listen on for incoming JSON-RPC requests.
    #[clap(long, env = "CUSTODY_PORT", default_value_t = DEFAULT_RPC_PORT)]
    pub port: u16,
    /// Account deploying the implementations and proxies. Defaults to the owner.
    #[clap(long, env = "CUSTODY_DEPLOYER")]
    pub deployer: Option<Address>,
    /// Owner principal of every component
    #[clap(long, env = "CUSTODY_OWNER")]
    pub owner: Address,
    /// Staker principal. Set as the staking manager's depositor, while the deposit manager becomes
    /// its staker.
    #[clap(long, env = "CUSTODY_STAKER")]
    pub staker: Address,
    /// Address of the L1 standard bridge
    #[clap(long, env = "CUSTODY_L1_STANDARD_BRIDGE")]
    pub l1_standard_bridge: Option<Address>,
    /// L2 counterpart of the wrapped ETH receipt
    #[clap(long, env = "CUSTODY_L2_ETH")]
    pub l2_eth: Option<Address>,
    /// L2 counterpart of the wrapped USD receipt
    #[clap(long, env = "CUSTODY_L2_USD")]
    pub l2_usd: Option<Address>,
    /// USD stablecoin accepted next to ETH
    #[clap(long, env = "CUSTODY_USD_ASSET")]
    pub usd_asset: Option<Address>,
    /// Decimals of the USD stablecoin
    #[clap(long, env = "CUSTODY_USD_DECIMALS", default_value_t = DEFAULT_USD_DECIMALS)]
    pub usd_decimals: u8,
    /// Bridge every accepted asset to L2 on deposit
    #[clap(long, env = "CUSTODY_AUTO_BRIDGE", default_value_t = false)]
    pub auto_bridge: bool,
    /// Forward deposits to the staking manager
    #[clap(long, env = "CUSTODY_AUTO_STAKE", default_value_t = false)]
    pub auto_stake: bool,
    /// Path to a JSON file of external balances to seed
    #[clap(long, env = "CUSTODY_GENESIS")]
    pub genesis: Option<PathBuf>,
    /// Seconds between two solvency reports
    #[clap(long, env = "CUSTODY_REPORT_INTERVAL", default_value_t = DEFAULT_REPORT_INTERVAL)]
    pub report_interval: u64,
    /// Strategies deployed at bring-up
    #[clap(flatten)]
    #[serde(default)]
    pub strategies: StrategyOpts,
    /// Telemetry options
    #[clap(flatten)]
    #[serde(default)]
    pub telemetry: TelemetryOpts,

    /// Additional unrecognized arguments. Useful for CI and testing
    /// to avoid issues on potential extra flags provided (e.g. "--exact" from cargo nextest).
    #[cfg(test)]
    #[clap(allow_hyphen_values = true, trailing_var_arg = true)]
    #[serde(default)]
    pub extra_args: Vec<String>,
}

impl Opts {
    /// Everything the bring-up sequence needs, loading the genesis file if one is configured.
    pub fn deployment_params(&self) -> eyre::Result<DeploymentParams> {
        let genesis = match &self.genesis {
            Some(path) => Genesis::from_file(path)?,
            None => Genesis::default(),
        };

        Ok(DeploymentParams {
            deployer: self.deployer.unwrap_or(self.owner),
            owner: self.owner,
            staker: self.staker,
            usd_asset: self.usd_asset.map(|id| Asset::token(id, self.usd_decimals)),
            l1_standard_bridge: self.l1_standard_bridge,
            l2_eth: self.l2_eth,
            l2_usd: self.l2_usd,
            auto_bridge: self.auto_bridge,
            auto_stake: self.auto_stake,
            strategies: self.strategies.plans(self.usd_asset),
            genesis,
        })
    }
}

/// It removes environment variables that are set as empty strings, i.e. like `MY_VAR=`. This is
/// useful to avoid unexpected edge cases and because we don't have options that make sense with an
/// empty string value.
pub fn remove_empty_envs() -> eyre::Result<()> {
    for (key, val) in env::vars() {
        if val.trim().is_empty() {
            debug!("removing empty env var: {}", key);
            env::remove_var(key)
        }
    }

    Ok(())
}
