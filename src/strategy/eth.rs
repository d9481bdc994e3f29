use alloy::primitives::U256;
use serde::{Deserialize, Serialize};

use super::{
    venue::{accrued, check_cap, VenueEvent, YieldVenue, BPS},
    StrategyError,
};

/// A queued withdrawal of staked capital.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawalClaim {
    /// Amount leaving the stake.
    pub amount: U256,
    /// When the claim matures.
    pub ready_at: u64,
}

/// Native staking with a liquid buffer. Staked capital only leaves through the withdrawal queue.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EthYield {
    /// Instantly withdrawable capital.
    pub liquid: U256,
    /// Staked capital, including settled rewards.
    pub staked: U256,
    /// Pending withdrawals, oldest first.
    pub queue: Vec<WithdrawalClaim>,
    /// Staking APR, in basis points.
    pub apr_bps: u64,
    /// Share of each deposit kept liquid, in basis points.
    pub liquid_bps: u64,
    /// Seconds between a withdrawal request and its maturity.
    pub cooldown: u64,
    /// Optional deposit cap.
    pub cap: Option<U256>,
    /// Rewards are settled up to this timestamp.
    pub accrued_at: u64,
    /// Whether the venue is halted.
    pub halted: bool,
}

impl EthYield {
    /// A venue staking at `apr_bps`, keeping `liquid_bps` of deposits liquid.
    pub fn new(apr_bps: u64, liquid_bps: u64, cooldown: u64) -> Self {
        Self { apr_bps, liquid_bps: liquid_bps.min(BPS), cooldown, ..Default::default() }
    }

    fn pending_rewards(&self, now: u64) -> U256 {
        accrued(self.staked, self.apr_bps, now.saturating_sub(self.accrued_at))
    }

    fn matured(&self, now: u64) -> U256 {
        self.queue.iter().filter(|c| c.ready_at <= now).fold(U256::ZERO, |acc, c| acc + c.amount)
    }

    fn queued(&self) -> U256 {
        self.queue.iter().fold(U256::ZERO, |acc, c| acc + c.amount)
    }

    /// Settles rewards and moves matured claims into the liquid buffer.
    fn settle(&mut self, now: u64) {
        self.staked += self.pending_rewards(now);
        self.accrued_at = self.accrued_at.max(now);

        let (matured, pending): (Vec<_>, Vec<_>) =
            std::mem::take(&mut self.queue).into_iter().partition(|c| c.ready_at <= now);
        self.liquid += matured.iter().fold(U256::ZERO, |acc, c| acc + c.amount);
        self.queue = pending;
    }

    /// When enough queued claims mature to cover `shortfall`, if ever.
    fn ready_at_for(&self, shortfall: U256) -> Option<u64> {
        if shortfall.is_zero() {
            return None;
        }

        let mut covered = U256::ZERO;
        let mut claims = self.queue.clone();
        claims.sort_by_key(|c| c.ready_at);

        for claim in claims {
            covered += claim.amount;
            if covered >= shortfall {
                return Some(claim.ready_at);
            }
        }
        None
    }
}

impl YieldVenue for EthYield {
    fn deposit(&mut self, amount: U256, now: u64) -> Result<(), StrategyError> {
        if self.halted {
            return Err(StrategyError::DepositRejected("staking paused".to_string()));
        }
        check_cap(self.cap, self.total_assets(now), amount)?;

        self.settle(now);
        let liquid = amount * U256::from(self.liquid_bps) / U256::from(BPS);
        self.liquid += liquid;
        self.staked += amount - liquid;
        Ok(())
    }

    fn withdraw(&mut self, amount: U256, now: u64) -> Result<(), StrategyError> {
        let total = self.total_assets(now);
        if amount > total {
            return Err(StrategyError::InsufficientAssets { requested: amount, available: total });
        }
        if self.halted {
            return Err(StrategyError::WithdrawalPending { ready_at: None });
        }

        let available = self.liquid + self.matured(now);
        if amount > available {
            let shortfall = amount - available;
            let ready_at = self.ready_at_for(shortfall + self.matured(now));
            return Err(StrategyError::WithdrawalPending { ready_at });
        }

        self.settle(now);
        self.liquid -= amount;
        Ok(())
    }

    fn total_assets(&self, now: u64) -> U256 {
        self.liquid + self.staked + self.pending_rewards(now) + self.queued()
    }

    fn withdrawable(&self, now: u64) -> U256 {
        if self.halted {
            return U256::ZERO;
        }
        self.liquid + self.matured(now)
    }

    fn request_withdrawal(&mut self, amount: U256, now: u64) -> Result<Option<u64>, StrategyError> {
        let total = self.total_assets(now);
        if amount > total {
            return Err(StrategyError::InsufficientAssets { requested: amount, available: total });
        }

        self.settle(now);
        let covered = self.liquid + self.queued();
        if amount <= covered {
            return Ok(self.ready_at_for(amount.saturating_sub(self.liquid)));
        }

        let ready_at = now + self.cooldown;
        let claim = amount - covered;
        self.staked -= claim;
        self.queue.push(WithdrawalClaim { amount: claim, ready_at });
        Ok(Some(ready_at))
    }

    fn set_cap(&mut self, cap: Option<U256>) {
        self.cap = cap;
    }

    fn apply(&mut self, event: &VenueEvent, now: u64) -> Result<(), StrategyError> {
        match event {
            VenueEvent::Loss(amount) => {
                self.settle(now);
                let from_stake = (*amount).min(self.staked);
                self.staked -= from_stake;
                self.liquid = self.liquid.saturating_sub(*amount - from_stake);
            }
            VenueEvent::Halt => self.halted = true,
            VenueEvent::Resume => self.halted = false,
            VenueEvent::Utilization(_) | VenueEvent::Insolvency => {
                return Err(StrategyError::UnsupportedEvent(event.name()))
            }
        }
        Ok(())
    }
}
