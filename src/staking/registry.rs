use std::collections::BTreeMap;

use alloy::primitives::{Address, U256};
use serde::{Deserialize, Serialize};

use crate::error::CustodyError;

/// One registered strategy for one asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategySlot {
    /// Strategy proxy address.
    pub strategy: Address,
    /// Removed slots keep their index and are never reused.
    pub removed: bool,
    /// Principal staked through this slot and not yet unstaked.
    pub principal: U256,
}

/// Slots registered for one asset, in registration order, and the active one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetStrategies {
    slots: Vec<StrategySlot>,
    active: Option<usize>,
}

impl AssetStrategies {
    /// All slots, removed ones included.
    pub fn slots(&self) -> &[StrategySlot] {
        &self.slots
    }

    /// Index of the active slot.
    pub fn active(&self) -> Option<usize> {
        self.active
    }

    fn live(&self) -> impl Iterator<Item = (usize, &StrategySlot)> {
        self.slots.iter().enumerate().filter(|(_, slot)| !slot.removed)
    }
}

/// Per-asset strategy slots, each asset with at most one active slot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategyRegistry {
    assets: BTreeMap<Address, AssetStrategies>,
}

impl StrategyRegistry {
    /// Registers `strategy` for `asset` at the next index. The slot starts empty and inactive.
    pub fn add(&mut self, asset: Address, strategy: Address) -> Result<usize, CustodyError> {
        let entry = self.assets.entry(asset).or_default();

        if entry.live().any(|(_, slot)| slot.strategy == strategy) {
            return Err(CustodyError::DuplicateStrategy { asset, strategy });
        }

        entry.slots.push(StrategySlot { strategy, removed: false, principal: U256::ZERO });
        Ok(entry.slots.len() - 1)
    }

    /// Removes an inactive slot, leaving a gap at its index.
    pub fn remove(&mut self, asset: Address, index: usize) -> Result<StrategySlot, CustodyError> {
        self.slot(asset, index)?;

        let entry = self.assets.get_mut(&asset).ok_or(CustodyError::UnknownSlot { asset, index })?;
        if entry.active == Some(index) {
            return Err(CustodyError::ActiveSlot { asset, index });
        }

        let slot = &mut entry.slots[index];
        slot.removed = true;
        Ok(slot.clone())
    }

    /// Routes new stake for `asset` to slot `index`. Returns the previously active slot.
    pub fn set_active(&mut self, asset: Address, index: usize) -> Result<Option<usize>, CustodyError> {
        self.slot(asset, index)?;

        let entry = self.assets.get_mut(&asset).ok_or(CustodyError::UnknownSlot { asset, index })?;
        Ok(entry.active.replace(index))
    }

    /// The live slot at `index`.
    pub fn slot(&self, asset: Address, index: usize) -> Result<&StrategySlot, CustodyError> {
        self.assets
            .get(&asset)
            .and_then(|entry| entry.slots.get(index))
            .filter(|slot| !slot.removed)
            .ok_or(CustodyError::UnknownSlot { asset, index })
    }

    /// The active slot for `asset`, with its index.
    pub fn active(&self, asset: Address) -> Option<(usize, &StrategySlot)> {
        let entry = self.assets.get(&asset)?;
        let index = entry.active?;
        entry.slots.get(index).map(|slot| (index, slot))
    }

    /// Slots registered for `asset`, if any.
    pub fn strategies(&self, asset: Address) -> Option<&AssetStrategies> {
        self.assets.get(&asset)
    }

    /// Number of live slots for `asset`.
    pub fn slot_count(&self, asset: Address) -> usize {
        self.assets.get(&asset).map(|entry| entry.live().count()).unwrap_or_default()
    }

    /// Live slots for `asset`: the active one first, then the rest in registration order.
    pub fn withdrawal_order(&self, asset: Address) -> Vec<(usize, Address)> {
        let Some(entry) = self.assets.get(&asset) else {
            return Vec::new();
        };

        let mut order: Vec<_> = entry.live().map(|(index, slot)| (index, slot.strategy)).collect();
        if let Some(active) = entry.active {
            order.sort_by_key(|(index, _)| *index != active);
        }
        order
    }

    /// Assets with at least one registered slot.
    pub fn assets(&self) -> impl Iterator<Item = &Address> {
        self.assets.keys()
    }

    pub(crate) fn record_stake(&mut self, asset: Address, index: usize, amount: U256) {
        if let Some(slot) = self.assets.get_mut(&asset).and_then(|e| e.slots.get_mut(index)) {
            slot.principal = slot.principal.saturating_add(amount);
        }
    }

    pub(crate) fn record_unstake(&mut self, asset: Address, index: usize, amount: U256) {
        if let Some(slot) = self.assets.get_mut(&asset).and_then(|e| e.slots.get_mut(index)) {
            slot.principal = slot.principal.saturating_sub(amount);
        }
    }
}
