use alloy::primitives::U256;
use serde::{Deserialize, Serialize};

use super::StrategyError;

/// Basis points in one unit.
pub const BPS: u64 = 10_000;

/// Seconds in a (365 day) year, used for APR accrual.
pub const SECONDS_PER_YEAR: u64 = 365 * 24 * 60 * 60;

/// Simple interest accrued on `principal` at `apr_bps` over `elapsed` seconds.
pub fn accrued(principal: U256, apr_bps: u64, elapsed: u64) -> U256 {
    if principal.is_zero() || apr_bps == 0 || elapsed == 0 {
        return U256::ZERO;
    }

    principal.saturating_mul(U256::from(apr_bps)).saturating_mul(U256::from(elapsed))
        / U256::from(BPS)
        / U256::from(SECONDS_PER_YEAR)
}

/// External events a yield venue can go through. Applied by the environment, not by principals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "amount", rename_all = "camelCase")]
pub enum VenueEvent {
    /// The venue lost value (slashing, bad debt).
    Loss(U256),
    /// The venue stops accepting deposits and serving withdrawals.
    Halt,
    /// The venue resumes normal operation.
    Resume,
    /// Amount currently lent out of a lending venue.
    Utilization(U256),
    /// The venue is permanently insolvent.
    Insolvency,
}

impl VenueEvent {
    /// Returns the event name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Loss(_) => "loss",
            Self::Halt => "halt",
            Self::Resume => "resume",
            Self::Utilization(_) => "utilization",
            Self::Insolvency => "insolvency",
        }
    }
}

/// The capability set every venue offers.
pub trait YieldVenue {
    /// Moves `amount` into the venue.
    fn deposit(&mut self, amount: U256, now: u64) -> Result<(), StrategyError>;

    /// Moves `amount` out of the venue, synchronously.
    fn withdraw(&mut self, amount: U256, now: u64) -> Result<(), StrategyError>;

    /// Custodied value including accrued yield.
    fn total_assets(&self, now: u64) -> U256;

    /// What [YieldVenue::withdraw] could return right now.
    fn withdrawable(&self, now: u64) -> U256;

    /// Queues capital for a later withdrawal. Returns when it becomes withdrawable, or `None` if
    /// it already is.
    fn request_withdrawal(&mut self, amount: U256, now: u64) -> Result<Option<u64>, StrategyError> {
        let available = self.total_assets(now);
        if amount > available {
            return Err(StrategyError::InsufficientAssets { requested: amount, available });
        }
        Ok(None)
    }

    /// Replaces the deposit cap.
    fn set_cap(&mut self, cap: Option<U256>);

    /// Applies an external event.
    fn apply(&mut self, event: &VenueEvent, now: u64) -> Result<(), StrategyError>;
}

/// Rejects deposits that would push `total` past `cap`.
pub(super) fn check_cap(cap: Option<U256>, total: U256, amount: U256) -> Result<(), StrategyError> {
    match cap {
        Some(cap) if total.saturating_add(amount) > cap => {
            Err(StrategyError::DepositRejected(format!("deposit cap of {cap} reached")))
        }
        _ => Ok(()),
    }
}
