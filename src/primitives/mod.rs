use std::fmt;

use alloy::primitives::{Address, U256};
use serde::{Deserialize, Serialize};

use crate::common::time::current_timestamp;

/// Assets and the native-asset sentinel.
pub mod asset;
pub use asset::{Asset, ETH_ADDRESS};

/// Access-control roles.
pub mod role;
pub use role::{ensure_role, Role};

/// JSON-RPC helper types and functions.
pub mod jsonrpc;

/// The execution context of a single call: who is calling, how much native value is attached
/// and the block timestamp the call executes at.
///
/// Nested calls between components reuse the timestamp and carry the calling component's address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallContext {
    /// The immediate caller.
    pub caller: Address,
    /// Native value attached to the call.
    pub value: U256,
    /// Execution timestamp, in seconds.
    pub timestamp: u64,
}

impl CallContext {
    /// A non-payable call from `caller` executing now.
    pub fn new(caller: Address) -> Self {
        Self { caller, value: U256::ZERO, timestamp: current_timestamp() }
    }

    /// Attach native value to the call.
    pub fn with_value(mut self, value: U256) -> Self {
        self.value = value;
        self
    }

    /// Execute the call at the given timestamp.
    pub fn at(mut self, timestamp: u64) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// The context of a call made by `caller` while executing this one.
    pub fn nested(&self, caller: Address) -> Self {
        Self { caller, value: U256::ZERO, timestamp: self.timestamp }
    }
}

/// A component of the custody system that can be the target of a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Component {
    /// The user-facing deposit manager.
    DepositManager,
    /// The staking manager.
    StakingManager,
    /// A strategy, by proxy address.
    Strategy(Address),
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DepositManager => write!(f, "DepositManager"),
            Self::StakingManager => write!(f, "StakingManager"),
            Self::Strategy(address) => write!(f, "Strategy({address})"),
        }
    }
}
