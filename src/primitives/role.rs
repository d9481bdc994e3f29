use alloy::primitives::Address;
use serde::{Deserialize, Serialize};

use crate::error::CustodyError;

/// The access-control roles held by principals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, derive_more::Display)]
pub enum Role {
    /// Configures and upgrades a component.
    Owner,
    /// Moves capital between idle custody and strategies.
    Staker,
    /// Hands capital to the staking manager on behalf of users.
    Depositor,
    /// Mints and burns wrapped receipts.
    Minter,
    /// The staking manager a strategy accepts capital from.
    StakingManager,
}

/// Fails with [CustodyError::Unauthorized] unless `caller` is the principal holding `role`.
///
/// An unset (zero) principal authorizes nobody.
pub fn ensure_role(role: Role, holder: Address, caller: Address) -> Result<(), CustodyError> {
    if holder.is_zero() || holder != caller {
        return Err(CustodyError::Unauthorized { caller, role });
    }

    Ok(())
}
