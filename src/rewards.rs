// 10.0: trading rewards. period-based, fee-weighted: while a period is open every
// exchange records its USD fee value against the trading account; when the period
// is closed with a reward budget, each account can claim its fee-proportional
// share. the proportional accounting is the additive sibling of the debt ledger's
// multiplicative chain.

use crate::decimal::{divide_round, multiply_round, MathError};
use crate::types::AccountId;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RewardsError {
    #[error("period {0} does not exist")]
    UnknownPeriod(usize),

    #[error("period {0} is not finalized yet")]
    PeriodNotFinalized(usize),

    #[error("{0} has nothing to claim in period {1}")]
    NothingToClaim(AccountId, usize),

    #[error(transparent)]
    Math(#[from] MathError),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Period {
    pub is_finalized: bool,
    pub recorded_fees: Decimal,
    pub total_rewards: Decimal,
    pub available_rewards: Decimal,
    // per-account fees not yet converted into a claim
    unaccounted_fees: HashMap<AccountId, Decimal>,
}

impl Period {
    pub fn unaccounted_fees_for(&self, account: AccountId) -> Decimal {
        self.unaccounted_fees
            .get(&account)
            .copied()
            .unwrap_or(Decimal::ZERO)
    }
}

/// Append-only period sequence; only the newest (unfinalized) period records fees.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradingRewards {
    periods: Vec<Period>,
}

impl Default for TradingRewards {
    fn default() -> Self {
        Self::new()
    }
}

impl TradingRewards {
    pub fn new() -> Self {
        Self {
            periods: vec![Period::default()],
        }
    }

    pub fn current_period_index(&self) -> usize {
        self.periods.len() - 1
    }

    pub fn period(&self, index: usize) -> Option<&Period> {
        self.periods.get(index)
    }

    pub fn record_fee(&mut self, account: AccountId, usd_fee: Decimal) {
        if usd_fee <= Decimal::ZERO {
            return;
        }
        let current = self
            .periods
            .last_mut()
            .expect("rewards ledger always holds an open period");
        current.recorded_fees += usd_fee;
        *current
            .unaccounted_fees
            .entry(account)
            .or_insert(Decimal::ZERO) += usd_fee;
    }

    /// Finalizes the open period with a reward budget and opens the next one.
    /// Returns the index of the period just closed.
    pub fn close_current_period(&mut self, total_rewards: Decimal) -> usize {
        let index = self.current_period_index();
        let current = self.periods.last_mut().expect("open period");
        current.is_finalized = true;
        current.total_rewards = total_rewards;
        current.available_rewards = total_rewards;
        self.periods.push(Period::default());
        index
    }

    pub fn claimable(&self, account: AccountId, period_index: usize) -> Result<Decimal, RewardsError> {
        let period = self
            .periods
            .get(period_index)
            .ok_or(RewardsError::UnknownPeriod(period_index))?;
        if !period.is_finalized {
            return Err(RewardsError::PeriodNotFinalized(period_index));
        }
        let fees = period.unaccounted_fees_for(account);
        if fees.is_zero() || period.recorded_fees.is_zero() {
            return Ok(Decimal::ZERO);
        }
        let share = divide_round(fees, period.recorded_fees)?;
        Ok(multiply_round(share, period.total_rewards)?)
    }

    // 10.1: claiming debits both the account's fee record and the period's
    // available pool, keeping the finalized period immutable otherwise.
    pub fn claim(&mut self, account: AccountId, period_index: usize) -> Result<Decimal, RewardsError> {
        let amount = self.claimable(account, period_index)?;
        if amount.is_zero() {
            return Err(RewardsError::NothingToClaim(account, period_index));
        }
        let period = self
            .periods
            .get_mut(period_index)
            .ok_or(RewardsError::UnknownPeriod(period_index))?;
        period.unaccounted_fees.remove(&account);
        period.available_rewards -= amount;
        Ok(amount)
    }

    pub fn num_periods(&self) -> usize {
        self.periods.len()
    }
}
