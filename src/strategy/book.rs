use std::collections::BTreeMap;

use alloy::primitives::{Address, U256};
use derive_more::Deref;
use serde::Serialize;
use tracing::trace;

use crate::{
    error::CustodyError,
    primitives::CallContext,
    system::VenueCallback,
    upgrade::Proxy,
};

use super::{Strategy, StrategyCallError};

/// Every deployed strategy proxy, keyed by address.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deref)]
pub struct StrategyBook(BTreeMap<Address, Proxy<Strategy>>);

impl StrategyBook {
    pub(crate) fn insert(&mut self, proxy: Proxy<Strategy>) {
        self.0.insert(proxy.address(), proxy);
    }

    /// Look up a strategy proxy.
    pub fn strategy(&self, address: Address) -> Result<&Proxy<Strategy>, CustodyError> {
        self.0.get(&address).ok_or(CustodyError::UnknownStrategy(address))
    }

    pub(crate) fn strategy_mut(
        &mut self,
        address: Address,
    ) -> Result<&mut Proxy<Strategy>, CustodyError> {
        self.0.get_mut(&address).ok_or(CustodyError::UnknownStrategy(address))
    }

    /// Custodied value of a strategy, including accrued yield.
    pub fn total_assets(&self, address: Address, now: u64) -> Result<U256, CustodyError> {
        Ok(self.strategy(address)?.total_assets(now))
    }

    /// What a strategy could return synchronously.
    pub fn withdrawable(&self, address: Address, now: u64) -> Result<U256, CustodyError> {
        Ok(self.strategy(address)?.withdrawable(now))
    }

    /// Deposits into `address`, recording the venue's call back into the system, if any.
    pub(crate) fn deposit(
        &mut self,
        ctx: &CallContext,
        address: Address,
        amount: U256,
        callbacks: &mut Vec<VenueCallback>,
    ) -> Result<(), CustodyError> {
        let strategy = self.strategy_mut(address)?;
        let asset = strategy.underlying_asset();

        let callback = strategy
            .storage_mut()
            .deposit(ctx, amount)
            .map_err(|err| attribute(address, asset, err))?;

        trace!(strategy = %address, %amount, "Strategy deposit");

        if let Some(call) = callback {
            callbacks.push(VenueCallback { strategy: address, call });
        }
        Ok(())
    }

    pub(crate) fn withdraw(
        &mut self,
        ctx: &CallContext,
        address: Address,
        amount: U256,
    ) -> Result<(), CustodyError> {
        let strategy = self.strategy_mut(address)?;
        let asset = strategy.underlying_asset();

        strategy.storage_mut().withdraw(ctx, amount).map_err(|err| attribute(address, asset, err))?;

        trace!(strategy = %address, %amount, "Strategy withdrawal");
        Ok(())
    }

    pub(crate) fn request_withdrawal(
        &mut self,
        ctx: &CallContext,
        address: Address,
        amount: U256,
    ) -> Result<Option<u64>, CustodyError> {
        let strategy = self.strategy_mut(address)?;
        let asset = strategy.underlying_asset();

        strategy
            .storage_mut()
            .request_withdrawal(ctx, amount)
            .map_err(|err| attribute(address, asset, err))
    }
}

fn attribute(strategy: Address, asset: Address, err: StrategyCallError) -> CustodyError {
    match err {
        StrategyCallError::Custody(err) => err,
        StrategyCallError::Venue(err) => CustodyError::from_strategy(strategy, asset, err),
    }
}
