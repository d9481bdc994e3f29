use alloy::primitives::U256;
use serde::{Deserialize, Serialize};

use super::{
    venue::{accrued, check_cap, VenueEvent, YieldVenue},
    StrategyError,
};

/// Stablecoin lending. Capital lent out to borrowers cannot be withdrawn until it is repaid.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StableYield {
    /// Supplied capital, including settled interest.
    pub supplied: U256,
    /// Portion of the supply currently lent out.
    pub borrowed: U256,
    /// Supply APR, in basis points.
    pub apr_bps: u64,
    /// Optional deposit cap.
    pub cap: Option<U256>,
    /// Interest is settled up to this timestamp.
    pub accrued_at: u64,
    /// Whether the venue is halted.
    pub halted: bool,
    /// Whether the venue is insolvent. Permanent.
    pub insolvent: bool,
}

impl StableYield {
    /// A lending venue paying `apr_bps` on supplied capital.
    pub fn new(apr_bps: u64) -> Self {
        Self { apr_bps, ..Default::default() }
    }

    fn pending_interest(&self, now: u64) -> U256 {
        accrued(self.supplied, self.apr_bps, now.saturating_sub(self.accrued_at))
    }

    fn settle(&mut self, now: u64) {
        self.supplied += self.pending_interest(now);
        self.accrued_at = self.accrued_at.max(now);
    }
}

impl YieldVenue for StableYield {
    fn deposit(&mut self, amount: U256, now: u64) -> Result<(), StrategyError> {
        if self.insolvent {
            return Err(StrategyError::DepositRejected("lending market insolvent".to_string()));
        }
        if self.halted {
            return Err(StrategyError::DepositRejected("lending market paused".to_string()));
        }
        check_cap(self.cap, self.total_assets(now), amount)?;

        self.settle(now);
        self.supplied += amount;
        Ok(())
    }

    fn withdraw(&mut self, amount: U256, now: u64) -> Result<(), StrategyError> {
        if self.insolvent {
            return Err(StrategyError::WithdrawalRejected("lending market insolvent".to_string()));
        }

        let total = self.total_assets(now);
        if amount > total {
            return Err(StrategyError::InsufficientAssets { requested: amount, available: total });
        }
        if amount > self.withdrawable(now) {
            return Err(StrategyError::WithdrawalPending { ready_at: None });
        }

        self.settle(now);
        self.supplied -= amount;
        Ok(())
    }

    fn total_assets(&self, now: u64) -> U256 {
        self.supplied + self.pending_interest(now)
    }

    fn withdrawable(&self, now: u64) -> U256 {
        if self.halted || self.insolvent {
            return U256::ZERO;
        }
        self.total_assets(now).saturating_sub(self.borrowed)
    }

    fn set_cap(&mut self, cap: Option<U256>) {
        self.cap = cap;
    }

    fn apply(&mut self, event: &VenueEvent, now: u64) -> Result<(), StrategyError> {
        self.settle(now);
        match event {
            VenueEvent::Loss(amount) => {
                self.supplied = self.supplied.saturating_sub(*amount);
                self.borrowed = self.borrowed.min(self.supplied);
            }
            VenueEvent::Halt => self.halted = true,
            VenueEvent::Resume => self.halted = false,
            VenueEvent::Utilization(borrowed) => self.borrowed = (*borrowed).min(self.supplied),
            VenueEvent::Insolvency => self.insolvent = true,
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::strategy::venue::SECONDS_PER_YEAR;

    use super::*;

    #[test]
    fn test_interest_and_utilization() {
        let mut venue = StableYield::new(500);
        venue.deposit(U256::from(1_000_000), 0).unwrap();
        assert_eq!(venue.total_assets(SECONDS_PER_YEAR), U256::from(1_050_000));

        venue.apply(&VenueEvent::Utilization(U256::from(900_000)), 0).unwrap();
        assert_eq!(venue.withdrawable(0), U256::from(100_000));
        assert_eq!(
            venue.withdraw(U256::from(200_000), 0),
            Err(StrategyError::WithdrawalPending { ready_at: None })
        );
        venue.withdraw(U256::from(100_000), 0).unwrap();
        assert_eq!(venue.total_assets(0), U256::from(900_000));
    }

    #[test]
    fn test_insolvency_is_permanent_failure() {
        let mut venue = StableYield::new(500);
        venue.deposit(U256::from(1_000), 0).unwrap();
        venue.apply(&VenueEvent::Insolvency, 10).unwrap();

        assert!(matches!(venue.withdraw(U256::from(1), 10), Err(StrategyError::WithdrawalRejected(_))));
        assert!(matches!(venue.deposit(U256::from(1), 10), Err(StrategyError::DepositRejected(_))));

        venue.apply(&VenueEvent::Resume, 20).unwrap();
        assert!(matches!(venue.withdraw(U256::from(1), 20), Err(StrategyError::WithdrawalRejected(_))));
    }

    #[test]
    fn test_cap_rejects_without_moving_funds() {
        let mut venue = StableYield::new(0);
        venue.set_cap(Some(U256::from(100)));
        venue.deposit(U256::from(60), 0).unwrap();

        let before = venue.clone();
        assert!(matches!(venue.deposit(U256::from(50), 0), Err(StrategyError::DepositRejected(_))));
        assert_eq!(venue, before);
    }
}
