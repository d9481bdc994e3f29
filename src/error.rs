use alloy::primitives::{Address, U256};
use thiserror::Error;

use crate::{
    primitives::{Component, Role},
    strategy::StrategyError,
    upgrade::UpgradeError,
};

/// Every way a call into the custody system can fail.
///
/// Any of these aborts the whole call: the executor restores the state it had before the call
/// started, so a failed call never leaves partial effects behind.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CustodyError {
    /// The caller does not hold the role required by the operation.
    #[error("{caller} is not authorized as {role}")]
    Unauthorized {
        /// The rejected caller.
        caller: Address,
        /// The role the operation requires.
        role: Role,
    },
    /// The asset is not registered with the deposit manager.
    #[error("unsupported asset {0}")]
    UnsupportedAsset(Address),
    /// Assets are immutable once registered.
    #[error("asset {0} is already registered")]
    AssetAlreadyRegistered(Address),
    /// No live strategy slot at this index.
    #[error("no strategy slot {index} for asset {asset}")]
    UnknownSlot {
        /// The asset.
        asset: Address,
        /// The requested slot index.
        index: usize,
    },
    /// The (asset, strategy) pair is already registered.
    #[error("strategy {strategy} is already registered for asset {asset}")]
    DuplicateStrategy {
        /// The asset.
        asset: Address,
        /// The strategy address.
        strategy: Address,
    },
    /// No strategy is deployed at this address.
    #[error("unknown strategy {0}")]
    UnknownStrategy(Address),
    /// The strategy wraps a different underlying asset.
    #[error("strategy {strategy} wraps {underlying}, not {asset}")]
    StrategyAssetMismatch {
        /// The strategy address.
        strategy: Address,
        /// The asset it was registered for.
        asset: Address,
        /// The asset it actually wraps.
        underlying: Address,
    },
    /// The caller's balance cannot cover the amount.
    #[error("insufficient balance: requested {requested}, available {available}")]
    InsufficientBalance {
        /// Requested amount.
        requested: U256,
        /// Available amount.
        available: U256,
    },
    /// No strategy holding the asset can supply the amount synchronously.
    #[error("insufficient strategy balance for {asset}: requested {requested}, available {available}")]
    InsufficientStrategyBalance {
        /// The asset.
        asset: Address,
        /// Requested amount.
        requested: U256,
        /// The most any single strategy could supply.
        available: U256,
    },
    /// Staking requires an active strategy for the asset.
    #[error("no active strategy for asset {0}")]
    NoActiveStrategy(Address),
    /// The active slot cannot be removed.
    #[error("slot {index} is the active strategy for asset {asset}")]
    ActiveSlot {
        /// The asset.
        asset: Address,
        /// The slot index.
        index: usize,
    },
    /// Only empty slots can be removed.
    #[error("slot {index} for asset {asset} still holds {balance}")]
    SlotNotEmpty {
        /// The asset.
        asset: Address,
        /// The slot index.
        index: usize,
        /// Remaining balance in the strategy.
        balance: U256,
    },
    /// The venue refused the deposit. Funds stay with the caller.
    #[error("strategy {strategy} rejected deposit: {reason}")]
    DepositRejected {
        /// The strategy.
        strategy: Address,
        /// Venue-provided reason.
        reason: String,
    },
    /// The venue enforces a cooldown. Retry later.
    #[error("withdrawal from strategy {strategy} is pending (ready at {ready_at:?})")]
    WithdrawalPending {
        /// The strategy.
        strategy: Address,
        /// When the queued withdrawal matures, if one is queued.
        ready_at: Option<u64>,
    },
    /// The venue permanently refused the withdrawal.
    #[error("strategy {strategy} rejected withdrawal: {reason}")]
    WithdrawalRejected {
        /// The strategy.
        strategy: Address,
        /// Venue-provided reason.
        reason: String,
    },
    /// The venue does not support the event applied to it.
    #[error("strategy {strategy} does not support venue event {event}")]
    UnsupportedVenueEvent {
        /// The strategy.
        strategy: Address,
        /// Name of the event.
        event: &'static str,
    },
    /// A withdrawal needed capital back from staking and could not get it.
    #[error("withdrawal of {requested} {asset} unavailable: {reason}")]
    WithdrawalUnavailable {
        /// The asset.
        asset: Address,
        /// The amount the user asked for.
        requested: U256,
        /// Why the staking manager could not return the capital.
        reason: Box<CustodyError>,
    },
    /// A component was called back while a call was already in progress.
    #[error("re-entrant call into {0}")]
    ReentrancyDetected(Component),
    /// Attached native value does not match the call.
    #[error("value mismatch: sent {sent}, expected {expected}")]
    ValueMismatch {
        /// Value attached to the call.
        sent: U256,
        /// Value the call expects.
        expected: U256,
    },
    /// Zero amounts are rejected.
    #[error("amount must be non-zero")]
    ZeroAmount,
    /// Auto-stake requires the deposit manager to be a staking operator.
    #[error("auto-stake requires the deposit manager to be a staking manager operator")]
    StakerUnset,
    /// Auto-bridge requires a bridge and an L2 token.
    #[error("bridge not configured for asset {0}")]
    BridgeNotConfigured(Address),
    /// Receipts would outgrow the underlying backing them.
    #[error("conservation violated for {asset}: supply {supply}, underlying {underlying}")]
    ConservationViolated {
        /// The asset.
        asset: Address,
        /// Wrapped receipt supply.
        supply: U256,
        /// Underlying held across custody and strategies.
        underlying: U256,
    },
    /// Upgrade failure.
    #[error(transparent)]
    Upgrade(#[from] UpgradeError),
    /// Arithmetic overflow.
    #[error("arithmetic overflow")]
    Overflow,
    /// A signed request does not carry the signer's next nonce.
    #[error("nonce mismatch for {signer}: expected {expected}, got {received}")]
    NonceMismatch {
        /// The authenticated signer.
        signer: Address,
        /// The next nonce of the signer.
        expected: u64,
        /// The nonce the request was signed with.
        received: u64,
    },
}

impl CustodyError {
    /// Maps a venue failure of `strategy` into the shared taxonomy.
    pub fn from_strategy(strategy: Address, asset: Address, err: StrategyError) -> Self {
        match err {
            StrategyError::DepositRejected(reason) => Self::DepositRejected { strategy, reason },
            StrategyError::WithdrawalPending { ready_at } => {
                Self::WithdrawalPending { strategy, ready_at }
            }
            StrategyError::WithdrawalRejected(reason) => {
                Self::WithdrawalRejected { strategy, reason }
            }
            StrategyError::InsufficientAssets { requested, available } => {
                Self::InsufficientStrategyBalance { asset, requested, available }
            }
            StrategyError::UnsupportedEvent(event) => Self::UnsupportedVenueEvent { strategy, event },
        }
    }

    /// Transient failures the caller may retry later.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::WithdrawalPending { .. } => true,
            Self::WithdrawalUnavailable { reason, .. } => reason.is_retryable(),
            _ => false,
        }
    }

    /// Returns the error as a label for metrics.
    pub fn to_tag_str(&self) -> &'static str {
        match self {
            Self::Unauthorized { .. } => "unauthorized",
            Self::UnsupportedAsset(_) => "unsupported_asset",
            Self::AssetAlreadyRegistered(_) => "asset_already_registered",
            Self::UnknownSlot { .. } => "unknown_slot",
            Self::DuplicateStrategy { .. } => "duplicate_strategy",
            Self::UnknownStrategy(_) => "unknown_strategy",
            Self::StrategyAssetMismatch { .. } => "strategy_asset_mismatch",
            Self::InsufficientBalance { .. } => "insufficient_balance",
            Self::InsufficientStrategyBalance { .. } => "insufficient_strategy_balance",
            Self::NoActiveStrategy(_) => "no_active_strategy",
            Self::ActiveSlot { .. } => "active_slot",
            Self::SlotNotEmpty { .. } => "slot_not_empty",
            Self::DepositRejected { .. } => "deposit_rejected",
            Self::WithdrawalPending { .. } => "withdrawal_pending",
            Self::WithdrawalRejected { .. } => "withdrawal_rejected",
            Self::UnsupportedVenueEvent { .. } => "unsupported_venue_event",
            Self::WithdrawalUnavailable { .. } => "withdrawal_unavailable",
            Self::ReentrancyDetected(_) => "reentrancy_detected",
            Self::ValueMismatch { .. } => "value_mismatch",
            Self::ZeroAmount => "zero_amount",
            Self::StakerUnset => "staker_unset",
            Self::BridgeNotConfigured(_) => "bridge_not_configured",
            Self::ConservationViolated { .. } => "conservation_violated",
            Self::Upgrade(_) => "upgrade",
            Self::Overflow => "overflow",
            Self::NonceMismatch { .. } => "nonce_mismatch",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pending_is_retryable_through_withdrawal_unavailable() {
        let strategy = Address::repeat_byte(0x51);
        let pending = CustodyError::from_strategy(
            strategy,
            Address::ZERO,
            StrategyError::WithdrawalPending { ready_at: Some(10) },
        );
        assert!(pending.is_retryable());

        let wrapped = CustodyError::WithdrawalUnavailable {
            asset: Address::ZERO,
            requested: U256::from(1),
            reason: Box::new(pending),
        };
        assert!(wrapped.is_retryable());
        assert_eq!(wrapped.to_tag_str(), "withdrawal_unavailable");

        let rejected = CustodyError::from_strategy(
            strategy,
            Address::ZERO,
            StrategyError::WithdrawalRejected("insolvent".to_string()),
        );
        assert!(!rejected.is_retryable());
    }

    #[test]
    fn test_insufficient_assets_maps_to_strategy_balance() {
        let asset = Address::repeat_byte(0xee);
        let err = CustodyError::from_strategy(
            Address::repeat_byte(0x51),
            asset,
            StrategyError::InsufficientAssets { requested: U256::from(5), available: U256::from(2) },
        );
        assert_eq!(
            err,
            CustodyError::InsufficientStrategyBalance {
                asset,
                requested: U256::from(5),
                available: U256::from(2)
            }
        );
    }
}
