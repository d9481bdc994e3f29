use std::{fs, path::Path};

use alloy::primitives::{Address, U256};
use eyre::WrapErr;
use serde::{Deserialize, Serialize};

/// External balances seeded at bring-up.
///
/// ```json
/// { "allocations": [{ "asset": "0xEeee...EEeE", "holder": "0x...", "amount": "0xde0b6b3a7640000" }] }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Genesis {
    /// Balances to credit, in order.
    #[serde(default)]
    pub allocations: Vec<Allocation>,
}

/// One external balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Allocation {
    /// The asset, or the native sentinel.
    pub asset: Address,
    /// Who holds it.
    pub holder: Address,
    /// Amount, in the asset's smallest unit.
    pub amount: U256,
}

impl Genesis {
    /// Reads a genesis file.
    pub fn from_file(path: impl AsRef<Path>) -> eyre::Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)
            .wrap_err_with(|| format!("failed to read genesis file {}", path.display()))?;

        serde_json::from_str(&raw)
            .wrap_err_with(|| format!("invalid genesis file {}", path.display()))
    }
}
