use std::collections::BTreeMap;

use alloy::primitives::{Address, U256};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{
    error::CustodyError,
    primitives::{ensure_role, Asset, CallContext, Role, ETH_ADDRESS},
    staking::{StakingEnv, StakingManager},
    strategy::StrategyBook,
    system::VenueCallback,
    upgrade::{ComponentKind, Implementation, Proxy, StorageVersions, Upgradeable},
};

/// Wrapped receipt tokens.
pub mod token;
pub use token::WrappedToken;

/// The L1 standard bridge model.
pub mod bridge;
pub use bridge::{BridgeDeposit, StandardBridge};

/// Name of the native asset receipt.
pub const WRAPPED_ETH_NAME: &str = "Edgeless Wrapped ETH";
/// Symbol of the native asset receipt.
pub const WRAPPED_ETH_SYMBOL: &str = "ewETH";
/// Name of the USD stablecoin receipt.
pub const WRAPPED_USD_NAME: &str = "Edgeless Wrapped USD";
/// Symbol of the USD stablecoin receipt.
pub const WRAPPED_USD_SYMBOL: &str = "ewUSD";

/// First storage layout recording the USD stablecoin explicitly.
pub const USD_ASSET_LAYOUT: u16 = 2;

/// Configuration of one accepted asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetConfig {
    /// The asset.
    pub asset: Asset,
    /// Its wrapped receipt token.
    pub wrapped: Address,
    /// Whether deposits are bridged to L2.
    pub auto_bridge: bool,
    /// The receipt's L2 counterpart.
    pub l2_token: Option<Address>,
}

/// Arguments of `initialize(owner, staker, stakingManager, usdAsset)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepositInit {
    /// The owner principal.
    pub owner: Address,
    /// The staker principal.
    pub staker: Address,
    /// The staking manager proxy.
    pub staking_manager: Address,
    /// The USD stablecoin accepted next to the native asset, if any.
    pub usd_asset: Option<Asset>,
}

/// Owner-only deposit manager configuration beyond the toggles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method", content = "params", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum DepositAdmin {
    /// Sets the staker principal.
    SetStaker(Address),
    /// Sets the L2 counterpart of an asset's receipt.
    SetL2Token {
        /// The asset.
        asset: Address,
        /// The L2 token.
        l2_token: Address,
    },
    /// Registers a further asset and creates its receipt.
    AddAsset {
        /// The asset.
        asset: Asset,
        /// Receipt name.
        name: String,
        /// Receipt symbol.
        symbol: String,
    },
    /// Hands ownership to another principal.
    TransferOwnership(Address),
}

/// Everything outside its own storage the deposit manager touches during a call.
#[derive(Debug)]
pub struct DepositEnv<'a> {
    /// The deposit manager proxy address.
    pub this: Address,
    /// Balances held outside the system.
    pub ledger: &'a mut crate::system::ExternalLedger,
    /// The staking manager proxy.
    pub staking: &'a mut Proxy<StakingManager>,
    /// Deployed strategies.
    pub strategies: &'a mut StrategyBook,
    /// Deployed bridges.
    pub bridges: &'a mut BTreeMap<Address, StandardBridge>,
    /// Calls venues make back into the system.
    pub callbacks: &'a mut Vec<VenueCallback>,
}

impl DepositEnv<'_> {
    fn staking(&mut self) -> (&mut StakingManager, StakingEnv<'_>) {
        let this = self.staking.address();
        let env = StakingEnv {
            this,
            strategies: &mut *self.strategies,
            callbacks: &mut *self.callbacks,
        };
        (self.staking.storage_mut(), env)
    }
}

/// The user-facing entry point. Holds deposited capital that is not staked and owns the mint
/// authority of every wrapped receipt.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositManager {
    owner: Address,
    staker: Address,
    staking_manager: Address,
    l1_standard_bridge: Option<Address>,
    auto_stake: bool,
    assets: BTreeMap<Address, AssetConfig>,
    tokens: BTreeMap<Address, WrappedToken>,
    idle: BTreeMap<Address, U256>,
    created: u64,
    versions: StorageVersions,
    #[serde(default)]
    usd_asset: Option<Address>,
}

impl DepositManager {
    /// The staker principal.
    pub fn staker(&self) -> Address {
        self.staker
    }

    /// The staking manager proxy.
    pub fn staking_manager(&self) -> Address {
        self.staking_manager
    }

    /// The configured L1 standard bridge.
    pub fn l1_standard_bridge(&self) -> Option<Address> {
        self.l1_standard_bridge
    }

    /// Whether deposits flow into staking.
    pub fn auto_stake(&self) -> bool {
        self.auto_stake
    }

    /// Configuration of `asset`.
    pub fn asset(&self, asset: Address) -> Result<&AssetConfig, CustodyError> {
        self.assets.get(&asset).ok_or(CustodyError::UnsupportedAsset(asset))
    }

    /// Every accepted asset.
    pub fn assets(&self) -> impl Iterator<Item = &AssetConfig> {
        self.assets.values()
    }

    /// The receipt token of `asset`.
    pub fn wrapped_token(&self, asset: Address) -> Result<&WrappedToken, CustodyError> {
        let wrapped = self.asset(asset)?.wrapped;
        self.tokens.get(&wrapped).ok_or(CustodyError::UnsupportedAsset(asset))
    }

    /// The native asset receipt.
    pub fn wrapped_eth(&self) -> Option<Address> {
        self.assets.get(&ETH_ADDRESS).map(|c| c.wrapped)
    }

    /// The USD stablecoin accepted at initialization.
    pub fn usd_asset(&self) -> Option<Address> {
        self.usd_asset
    }

    /// The USD stablecoin receipt.
    pub fn wrapped_usd(&self) -> Option<Address> {
        self.usd_asset.and_then(|usd| self.assets.get(&usd)).map(|c| c.wrapped)
    }

    /// Receipts of `asset` held by `holder`.
    pub fn balance_of(&self, asset: Address, holder: Address) -> Result<U256, CustodyError> {
        Ok(self.wrapped_token(asset)?.balance_of(holder))
    }

    /// Capital of `asset` held idle by the deposit manager.
    pub fn idle(&self, asset: Address) -> U256 {
        self.idle.get(&asset).copied().unwrap_or_default()
    }

    fn token_mut(&mut self, asset: Address) -> Result<&mut WrappedToken, CustodyError> {
        let wrapped = self.asset(asset)?.wrapped;
        self.tokens.get_mut(&wrapped).ok_or(CustodyError::UnsupportedAsset(asset))
    }

    fn register_asset(&mut self, this: Address, asset: Asset, name: &str, symbol: &str) -> Address {
        let wrapped = this.create(self.created);
        self.created += 1;

        self.tokens
            .insert(wrapped, WrappedToken::new(wrapped, name, symbol, asset.decimals, asset.id, this));
        self.assets
            .insert(asset.id, AssetConfig { asset, wrapped, auto_bridge: false, l2_token: None });

        info!(asset = %asset.id, %wrapped, symbol, "Asset registered");
        wrapped
    }

    /// Accepts `amount` of `asset` and mints the same amount of receipts to the caller, or to the
    /// L2 when auto-bridge is on for the asset.
    pub fn deposit(
        &mut self,
        ctx: &CallContext,
        env: &mut DepositEnv<'_>,
        asset: Address,
        amount: U256,
    ) -> Result<U256, CustodyError> {
        if amount.is_zero() {
            return Err(CustodyError::ZeroAmount);
        }

        let config = self.asset(asset)?.clone();
        let expected = if config.asset.is_native() { amount } else { U256::ZERO };
        if ctx.value != expected {
            return Err(CustodyError::ValueMismatch { sent: ctx.value, expected });
        }

        env.ledger.debit(asset, ctx.caller, amount)?;
        self.add_idle(asset, amount)?;

        if config.auto_bridge {
            let bridge_address =
                self.l1_standard_bridge.ok_or(CustodyError::BridgeNotConfigured(asset))?;
            let l2_token = config.l2_token.ok_or(CustodyError::BridgeNotConfigured(asset))?;
            let bridge = env
                .bridges
                .get_mut(&bridge_address)
                .ok_or(CustodyError::BridgeNotConfigured(asset))?;

            self.token_mut(asset)?.mint(env.this, bridge_address, amount)?;
            let message =
                bridge.deposit_erc20_to(config.wrapped, l2_token, env.this, ctx.caller, amount);
            debug!(%asset, %amount, nonce = message.nonce, "Deposit bridged");
        } else {
            self.token_mut(asset)?.mint(env.this, ctx.caller, amount)?;
        }

        if self.auto_stake {
            self.forward(ctx, env, asset, amount)?;

            let this = env.this;
            let (staking, mut staking_env) = env.staking();
            if staking.registry().active(asset).is_some() {
                staking.stake(&ctx.nested(this), &mut staking_env, asset, amount)?;
            }
        }

        debug!(%asset, %amount, depositor = %ctx.caller, "Deposit accepted");
        Ok(amount)
    }

    /// Burns `amount` of the caller's receipts and releases the underlying, pulling it back from
    /// staking when idle custody is short. No partial withdrawals.
    pub fn withdraw(
        &mut self,
        ctx: &CallContext,
        env: &mut DepositEnv<'_>,
        asset: Address,
        amount: U256,
    ) -> Result<U256, CustodyError> {
        if amount.is_zero() {
            return Err(CustodyError::ZeroAmount);
        }

        let available = self.balance_of(asset, ctx.caller)?;
        if available < amount {
            return Err(CustodyError::InsufficientBalance { requested: amount, available });
        }
        self.token_mut(asset)?.burn(env.this, ctx.caller, amount)?;

        let shortfall = amount.saturating_sub(self.idle(asset));
        if !shortfall.is_zero() {
            let this = env.this;
            let (staking, mut staking_env) = env.staking();
            staking
                .withdraw_capital(&ctx.nested(this), &mut staking_env, asset, shortfall)
                .map_err(|err| CustodyError::WithdrawalUnavailable {
                    asset,
                    requested: amount,
                    reason: Box::new(err),
                })?;
            self.add_idle(asset, shortfall)?;
        }

        self.take_idle(asset, amount)?;
        env.ledger.credit(asset, ctx.caller, amount)?;

        debug!(%asset, %amount, holder = %ctx.caller, "Withdrawal released");
        Ok(amount)
    }

    /// Owner-only. Enabling requires the staking manager to accept this contract as an operator.
    pub fn set_auto_stake(
        &mut self,
        ctx: &CallContext,
        this: Address,
        staking: &StakingManager,
        enabled: bool,
    ) -> Result<(), CustodyError> {
        ensure_role(Role::Owner, self.owner, ctx.caller)?;

        if enabled && !staking.is_operator(this) {
            return Err(CustodyError::StakerUnset);
        }

        self.auto_stake = enabled;
        info!(enabled, "Auto-stake set");
        Ok(())
    }

    /// Owner-only.
    pub fn set_auto_bridge(
        &mut self,
        ctx: &CallContext,
        asset: Address,
        enabled: bool,
    ) -> Result<(), CustodyError> {
        ensure_role(Role::Owner, self.owner, ctx.caller)?;

        let config = self.assets.get_mut(&asset).ok_or(CustodyError::UnsupportedAsset(asset))?;
        config.auto_bridge = enabled;

        info!(%asset, enabled, "Auto-bridge set");
        Ok(())
    }

    /// Owner-only. The zero address unsets the bridge.
    pub fn set_l1_standard_bridge(
        &mut self,
        ctx: &CallContext,
        bridge: Address,
    ) -> Result<(), CustodyError> {
        ensure_role(Role::Owner, self.owner, ctx.caller)?;

        self.l1_standard_bridge = (!bridge.is_zero()).then_some(bridge);
        info!(%bridge, "L1 standard bridge set");
        Ok(())
    }

    /// Owner-only configuration.
    pub fn admin(
        &mut self,
        ctx: &CallContext,
        this: Address,
        call: DepositAdmin,
    ) -> Result<(), CustodyError> {
        ensure_role(Role::Owner, self.owner, ctx.caller)?;

        match call {
            DepositAdmin::SetStaker(staker) => self.staker = staker,
            DepositAdmin::SetL2Token { asset, l2_token } => {
                let config =
                    self.assets.get_mut(&asset).ok_or(CustodyError::UnsupportedAsset(asset))?;
                config.l2_token = Some(l2_token);
            }
            DepositAdmin::AddAsset { asset, name, symbol } => {
                if self.assets.contains_key(&asset.id) {
                    return Err(CustodyError::AssetAlreadyRegistered(asset.id));
                }
                self.register_asset(this, asset, &name, &symbol);
            }
            DepositAdmin::TransferOwnership(owner) => self.owner = owner,
        }
        Ok(())
    }

    /// Hands idle capital to the staking manager. Owner or staker only.
    pub fn forward_to_staking(
        &mut self,
        ctx: &CallContext,
        env: &mut DepositEnv<'_>,
        asset: Address,
        amount: U256,
    ) -> Result<(), CustodyError> {
        if ensure_role(Role::Staker, self.staker, ctx.caller).is_err() {
            ensure_role(Role::Owner, self.owner, ctx.caller)?;
        }
        self.asset(asset)?;

        self.forward(ctx, env, asset, amount)
    }

    /// Mints receipts for yield accrued beyond the receipt supply. Owner-only.
    pub fn harvest_yield(
        &mut self,
        ctx: &CallContext,
        env: &mut DepositEnv<'_>,
        asset: Address,
        to: Address,
    ) -> Result<U256, CustodyError> {
        ensure_role(Role::Owner, self.owner, ctx.caller)?;

        let underlying = self.idle(asset).saturating_add(env.staking.total_assets(
            env.strategies,
            asset,
            ctx.timestamp,
        ));
        let surplus = underlying.saturating_sub(self.wrapped_token(asset)?.total_supply());

        if !surplus.is_zero() {
            self.token_mut(asset)?.mint(env.this, to, surplus)?;
            info!(%asset, %surplus, %to, "Yield harvested");
        }
        Ok(surplus)
    }

    fn forward(
        &mut self,
        ctx: &CallContext,
        env: &mut DepositEnv<'_>,
        asset: Address,
        amount: U256,
    ) -> Result<(), CustodyError> {
        self.take_idle(asset, amount)?;

        let this = env.this;
        let (staking, _) = env.staking();
        staking.receive_capital(&ctx.nested(this), asset, amount)
    }

    fn add_idle(&mut self, asset: Address, amount: U256) -> Result<(), CustodyError> {
        let idle = self.idle.entry(asset).or_default();
        *idle = idle.checked_add(amount).ok_or(CustodyError::Overflow)?;
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

impl Upgradeable for DepositManager {
    type Init = DepositInit;

    const NAME: &'static str = "DepositManager";

    fn accepts(&self, kind: ComponentKind) -> bool {
        kind == ComponentKind::DepositManager
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

    /// Sets the principals and creates the receipts that do not exist yet. Re-running it from a
    /// later implementation keeps existing receipts and balances.
    fn initialize(
        &mut self,
        _ctx: &CallContext,
        this: Address,
        init: DepositInit,
    ) -> Result<(), CustodyError> {
        self.owner = init.owner;
        self.staker = init.staker;
        self.staking_manager = init.staking_manager;

        if !self.assets.contains_key(&ETH_ADDRESS) {
            self.register_asset(this, Asset::native(), WRAPPED_ETH_NAME, WRAPPED_ETH_SYMBOL);
        }
        if let Some(usd) = init.usd_asset {
            if usd.is_native() {
                return Err(CustodyError::AssetAlreadyRegistered(usd.id));
            }
            if !self.assets.contains_key(&usd.id) {
                self.register_asset(this, usd, WRAPPED_USD_NAME, WRAPPED_USD_SYMBOL);
            }
            self.usd_asset = Some(usd.id);
        }
        Ok(())
    }

    /// Moving onto [USD_ASSET_LAYOUT] backfills the USD stablecoin of older storage: the first
    /// receipt created with the USD symbol, which is the one the initializer registered.
    fn migrate(&mut self, from: &Implementation, to: &Implementation) {
        let crosses = from.layout < USD_ASSET_LAYOUT && to.layout >= USD_ASSET_LAYOUT;
        if !crosses || self.usd_asset.is_some() {
            return;
        }

        let Some(this) = self.tokens.values().next().map(|token| token.minter()) else {
            return;
        };

        self.usd_asset = (0..self.created)
            .filter_map(|nonce| self.tokens.get(&this.create(nonce)))
            .find(|token| token.symbol == WRAPPED_USD_SYMBOL && token.underlying != ETH_ADDRESS)
            .map(|token| token.underlying);

        if let Some(usd) = self.usd_asset {
            info!(%usd, layout = to.layout, "USD asset backfilled");
        }
    }
}
