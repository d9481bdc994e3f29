use alloy::primitives::{address, Address};
use serde::{Deserialize, Serialize};

/// Sentinel identifying the native asset wherever assets are keyed by address.
pub const ETH_ADDRESS: Address = address!("EeeeeEeeeEeEeeEeEeEeeEEEeeeeEeeeeeeeEEeE");

/// Decimals of the native asset.
pub const NATIVE_DECIMALS: u8 = 18;

/// A fungible underlying asset accepted by the deposit manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    /// The token address, or [ETH_ADDRESS] for the native asset.
    pub id: Address,
    /// Decimals of the asset.
    pub decimals: u8,
}

impl Asset {
    /// The native asset.
    pub const fn native() -> Self {
        Self { id: ETH_ADDRESS, decimals: NATIVE_DECIMALS }
    }

    /// A token asset.
    pub const fn token(id: Address, decimals: u8) -> Self {
        Self { id, decimals }
    }

    /// Native transfers carry value with the call, tokens are pulled from the caller.
    pub fn is_native(&self) -> bool {
        self.id == ETH_ADDRESS
    }
}
