use std::collections::BTreeMap;

use alloy::primitives::{Address, U256};
use serde::{Deserialize, Serialize};

/// A deposit handed to the L1 standard bridge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BridgeDeposit {
    /// Bridge message nonce.
    pub nonce: u64,
    /// Token locked on L1.
    pub l1_token: Address,
    /// Token released on L2.
    pub l2_token: Address,
    /// Who sent the tokens.
    pub from: Address,
    /// L2 recipient.
    pub to: Address,
    /// Amount bridged.
    pub amount: U256,
}

/// The L1 side of a standard bridge: locks tokens and emits numbered deposit messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StandardBridge {
    address: Address,
    deposits: Vec<BridgeDeposit>,
    escrowed: BTreeMap<Address, U256>,
}

impl StandardBridge {
    /// A bridge deployed at `address`.
    pub fn new(address: Address) -> Self {
        Self { address, deposits: Vec::new(), escrowed: BTreeMap::new() }
    }

    /// The bridge address.
    pub fn address(&self) -> Address {
        self.address
    }

    /// Locks `amount` of `l1_token` sent by `from` and queues its release to `to` on L2.
    pub fn deposit_erc20_to(
        &mut self,
        l1_token: Address,
        l2_token: Address,
        from: Address,
        to: Address,
        amount: U256,
    ) -> &BridgeDeposit {
        *self.escrowed.entry(l1_token).or_default() += amount;

        let nonce = self.deposits.len() as u64;
        self.deposits.push(BridgeDeposit { nonce, l1_token, l2_token, from, to, amount });
        &self.deposits[self.deposits.len() - 1]
    }

    /// Every deposit message, in order.
    pub fn deposits(&self) -> &[BridgeDeposit] {
        &self.deposits
    }

    /// Amount of `l1_token` locked in the bridge.
    pub fn escrowed(&self, l1_token: Address) -> U256 {
        self.escrowed.get(&l1_token).copied().unwrap_or_default()
    }
}
