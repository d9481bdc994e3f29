use alloy::primitives::U256;
use serde::{Deserialize, Serialize};

use super::{
    venue::{check_cap, VenueEvent, YieldVenue},
    StrategyError,
};

/// Plain custody: no yield, instant withdrawals.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassiveHold {
    /// Held balance.
    pub balance: U256,
    /// Optional deposit cap.
    pub cap: Option<U256>,
    /// Whether the venue is halted.
    pub halted: bool,
}

impl YieldVenue for PassiveHold {
    fn deposit(&mut self, amount: U256, _now: u64) -> Result<(), StrategyError> {
        if self.halted {
            return Err(StrategyError::DepositRejected("venue halted".to_string()));
        }
        check_cap(self.cap, self.balance, amount)?;

        self.balance += amount;
        Ok(())
    }

    fn withdraw(&mut self, amount: U256, _now: u64) -> Result<(), StrategyError> {
        if amount > self.balance {
            return Err(StrategyError::InsufficientAssets {
                requested: amount,
                available: self.balance,
            });
        }
        if self.halted {
            return Err(StrategyError::WithdrawalPending { ready_at: None });
        }

        self.balance -= amount;
        Ok(())
    }

    fn total_assets(&self, _now: u64) -> U256 {
        self.balance
    }

    fn withdrawable(&self, _now: u64) -> U256 {
        if self.halted {
            U256::ZERO
        } else {
            self.balance
        }
    }

    fn set_cap(&mut self, cap: Option<U256>) {
        self.cap = cap;
    }

    fn apply(&mut self, event: &VenueEvent, _now: u64) -> Result<(), StrategyError> {
        match event {
            VenueEvent::Loss(amount) => self.balance = self.balance.saturating_sub(*amount),
            VenueEvent::Halt => self.halted = true,
            VenueEvent::Resume => self.halted = false,
            VenueEvent::Utilization(_) | VenueEvent::Insolvency => {
                return Err(StrategyError::UnsupportedEvent(event.name()))
            }
        }
        Ok(())
    }
}
