use std::collections::BTreeMap;

use alloy::primitives::{Address, U256};
use serde::{Deserialize, Serialize};

use crate::{
    error::CustodyError,
    primitives::{ensure_role, Role},
};

/// A 1:1 receipt for one underlying asset. Only the minter can create or destroy supply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WrappedToken {
    /// Token address.
    pub address: Address,
    /// Token name.
    pub name: String,
    /// Token symbol.
    pub symbol: String,
    /// Decimals, equal to the underlying's.
    pub decimals: u8,
    /// The asset this token is a receipt for.
    pub underlying: Address,
    minter: Address,
    total_supply: U256,
    balances: BTreeMap<Address, U256>,
}

impl WrappedToken {
    /// A token with zero supply, minted by `minter`.
    pub fn new(
        address: Address,
        name: impl Into<String>,
        symbol: impl Into<String>,
        decimals: u8,
        underlying: Address,
        minter: Address,
    ) -> Self {
        Self {
            address,
            name: name.into(),
            symbol: symbol.into(),
            decimals,
            underlying,
            minter,
            total_supply: U256::ZERO,
            balances: BTreeMap::new(),
        }
    }

    /// The mint authority.
    pub fn minter(&self) -> Address {
        self.minter
    }

    /// Total receipts in circulation.
    pub fn total_supply(&self) -> U256 {
        self.total_supply
    }

    /// Receipts held by `holder`.
    pub fn balance_of(&self, holder: Address) -> U256 {
        self.balances.get(&holder).copied().unwrap_or_default()
    }

    /// Holders with a non-zero balance.
    pub fn holders(&self) -> impl Iterator<Item = (&Address, &U256)> {
        self.balances.iter()
    }

    /// Mints `amount` to `to`.
    pub fn mint(&mut self, caller: Address, to: Address, amount: U256) -> Result<(), CustodyError> {
        ensure_role(Role::Minter, self.minter, caller)?;

        let supply = self.total_supply.checked_add(amount).ok_or(CustodyError::Overflow)?;
        if !amount.is_zero() {
            *self.balances.entry(to).or_default() += amount;
        }
        self.total_supply = supply;
        Ok(())
    }

    /// Burns `amount` from `from`.
    pub fn burn(&mut self, caller: Address, from: Address, amount: U256) -> Result<(), CustodyError> {
        ensure_role(Role::Minter, self.minter, caller)?;

        let available = self.balance_of(from);
        if available < amount {
            return Err(CustodyError::InsufficientBalance { requested: amount, available });
        }

        if available == amount {
            self.balances.remove(&from);
        } else {
            self.balances.insert(from, available - amount);
        }
        self.total_supply -= amount;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token() -> (WrappedToken, Address) {
        let minter = Address::repeat_byte(0xd0);
        let token = WrappedToken::new(
            Address::repeat_byte(0x7e),
            "Edgeless Wrapped ETH",
            "ewETH",
            18,
            Address::ZERO,
            minter,
        );
        (token, minter)
    }

    #[test]
    fn test_only_minter_mints() {
        let (mut token, minter) = token();
        let alice = Address::repeat_byte(0xa1);

        let err = token.mint(alice, alice, U256::from(1)).unwrap_err();
        assert_eq!(err, CustodyError::Unauthorized { caller: alice, role: Role::Minter });
        assert!(token.burn(alice, alice, U256::ZERO).is_err());

        token.mint(minter, alice, U256::from(5)).unwrap();
        assert_eq!(token.total_supply(), U256::from(5));
        assert_eq!(token.balance_of(alice), U256::from(5));
    }

    #[test]
    fn test_burn_clears_empty_balances() {
        let (mut token, minter) = token();
        let alice = Address::repeat_byte(0xa1);
        token.mint(minter, alice, U256::from(5)).unwrap();

        assert_eq!(
            token.burn(minter, alice, U256::from(6)),
            Err(CustodyError::InsufficientBalance {
                requested: U256::from(6),
                available: U256::from(5)
            })
        );
        token.burn(minter, alice, U256::from(5)).unwrap();
        assert_eq!(token.holders().count(), 0);
        assert_eq!(token.total_supply(), U256::ZERO);
    }
}
