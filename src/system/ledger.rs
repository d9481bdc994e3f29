use std::collections::BTreeMap;

use alloy::primitives::{Address, U256};
use serde::Serialize;

use crate::error::CustodyError;

/// Balances of assets held outside the custody system, per asset and holder.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExternalLedger {
    balances: BTreeMap<Address, BTreeMap<Address, U256>>,
}

impl ExternalLedger {
    /// The balance `holder` has of `asset`.
    pub fn balance_of(&self, asset: Address, holder: Address) -> U256 {
        self.balances.get(&asset).and_then(|b| b.get(&holder)).copied().unwrap_or_default()
    }

    /// Credits `amount` of `asset` to `holder`.
    pub fn credit(&mut self, asset: Address, holder: Address, amount: U256) -> Result<(), CustodyError> {
        let balance = self.balances.entry(asset).or_default().entry(holder).or_default();
        *balance = balance.checked_add(amount).ok_or(CustodyError::Overflow)?;
        Ok(())
    }

    /// Debits `amount` of `asset` from `holder`.
    pub fn debit(&mut self, asset: Address, holder: Address, amount: U256) -> Result<(), CustodyError> {
        let available = self.balance_of(asset, holder);
        if available < amount {
            return Err(CustodyError::InsufficientBalance { requested: amount, available });
        }

        if let Some(balances) = self.balances.get_mut(&asset) {
            if available == amount {
                balances.remove(&holder);
            } else {
                balances.insert(holder, available - amount);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credit_debit() {
        let asset = Address::repeat_byte(0xee);
        let alice = Address::repeat_byte(0xa1);
        let mut ledger = ExternalLedger::default();

        ledger.credit(asset, alice, U256::from(10)).unwrap();
        assert_eq!(
            ledger.debit(asset, alice, U256::from(11)),
            Err(CustodyError::InsufficientBalance {
                requested: U256::from(11),
                available: U256::from(10)
            })
        );
        ledger.debit(asset, alice, U256::from(10)).unwrap();
        assert_eq!(ledger.balance_of(asset, alice), U256::ZERO);
        assert_eq!(ledger, {
            let mut empty = ExternalLedger::default();
            empty.balances.insert(asset, BTreeMap::new());
            empty
        });
    }
}
