// 3.0: price rounds. every rate update for a currency opens a new round and the
// full history is kept, because the dynamic fee walks recent rounds and atomic
// exchanges price off a time-weighted average instead of spot.
// sUSD is the common unit: never stale, rate pinned at 1.0.

use crate::decimal::{divide_round, multiply_round, MathError, UNIT};
use crate::types::{CurrencyKey, RoundId, Timestamp, USD};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RateRound {
    pub round_id: RoundId,
    pub rate: Decimal,
    pub timestamp: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RateError {
    #[error("no rate published for {0}")]
    NoRate(CurrencyKey),

    #[error("rate for {0} is stale")]
    StaleRate(CurrencyKey),

    #[error("invalid rate {rate} for {currency}")]
    InvalidRate { currency: CurrencyKey, rate: Decimal },

    #[error(transparent)]
    Math(#[from] MathError),
}

/// Append-only per-currency rate history with staleness tracking.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RateStore {
    rounds: HashMap<CurrencyKey, Vec<RateRound>>,
    // seconds after which a published rate no longer backs any operation
    stale_period_secs: i64,
}

impl RateStore {
    pub fn new(stale_period_secs: i64) -> Self {
        Self {
            rounds: HashMap::new(),
            stale_period_secs,
        }
    }

    // 3.1: publish a new rate, opening the next round for that currency.
    pub fn update_rate(
        &mut self,
        currency: CurrencyKey,
        rate: Decimal,
        now: Timestamp,
    ) -> Result<RoundId, RateError> {
        if rate <= Decimal::ZERO {
            return Err(RateError::InvalidRate { currency, rate });
        }
        let history = self.rounds.entry(currency).or_default();
        let round_id = match history.last() {
            Some(last) => last.round_id.next(),
            None => RoundId(0),
        };
        history.push(RateRound {
            round_id,
            rate,
            timestamp: now,
        });
        Ok(round_id)
    }

    pub fn current_round_id(&self, currency: CurrencyKey) -> Option<RoundId> {
        if currency == USD {
            return Some(RoundId(0));
        }
        self.rounds
            .get(&currency)
            .and_then(|h| h.last())
            .map(|r| r.round_id)
    }

    pub fn rate_for_round(&self, currency: CurrencyKey, round_id: RoundId) -> Option<Decimal> {
        if currency == USD {
            return Some(UNIT);
        }
        let history = self.rounds.get(&currency)?;
        // rounds are dense from 0, so the round id doubles as an index
        history.get(round_id.0 as usize).map(|r| r.rate)
    }

    pub fn is_stale(&self, currency: CurrencyKey, now: Timestamp) -> bool {
        if currency == USD {
            return false;
        }
        match self.rounds.get(&currency).and_then(|h| h.last()) {
            Some(last) => last.timestamp.elapsed_secs(&now) > self.stale_period_secs,
            None => true,
        }
    }

    /// Raw oracle read: the latest published rate plus its staleness flag.
    pub fn rate_and_stale(
        &self,
        currency: CurrencyKey,
        now: Timestamp,
    ) -> Result<(Decimal, bool), RateError> {
        if currency == USD {
            return Ok((UNIT, false));
        }
        let last = self
            .rounds
            .get(&currency)
            .and_then(|h| h.last())
            .ok_or(RateError::NoRate(currency))?;
        let stale = last.timestamp.elapsed_secs(&now) > self.stale_period_secs;
        Ok((last.rate, stale))
    }

    // 3.2: the hard-validation read. any operation valuing this currency goes
    // through here, so a stale feed aborts the whole enclosing call.
    pub fn rate(&self, currency: CurrencyKey, now: Timestamp) -> Result<Decimal, RateError> {
        let (rate, stale) = self.rate_and_stale(currency, now)?;
        if stale {
            return Err(RateError::StaleRate(currency));
        }
        Ok(rate)
    }

    /// Converts `amount` of `from` into `to` at current rates.
    pub fn effective_value(
        &self,
        from: CurrencyKey,
        amount: Decimal,
        to: CurrencyKey,
        now: Timestamp,
    ) -> Result<Decimal, RateError> {
        if from == to {
            return Ok(amount);
        }
        let from_rate = self.rate(from, now)?;
        let to_rate = self.rate(to, now)?;
        let usd_value = multiply_round(amount, from_rate)?;
        Ok(divide_round(usd_value, to_rate)?)
    }

    // 3.3: time-weighted average over a trailing window. atomic exchanges price
    // off this instead of spot so a single-round spike cannot move the whole trade.
    pub fn twap(
        &self,
        currency: CurrencyKey,
        window_secs: i64,
        now: Timestamp,
    ) -> Result<Decimal, RateError> {
        if currency == USD {
            return Ok(UNIT);
        }
        if self.is_stale(currency, now) {
            return Err(RateError::StaleRate(currency));
        }
        let history = self
            .rounds
            .get(&currency)
            .ok_or(RateError::NoRate(currency))?;

        let window_start = Timestamp::from_millis(now.as_millis() - window_secs * 1000);
        let mut weighted_sum = Decimal::ZERO;
        let mut total_secs = Decimal::ZERO;

        // each round's rate holds from its timestamp until the next round (or now),
        // clipped to the window
        for (i, round) in history.iter().enumerate() {
            let start = round.timestamp.max(window_start);
            let end = history
                .get(i + 1)
                .map(|next| next.timestamp)
                .unwrap_or(now)
                .min(now);
            if end <= start {
                continue;
            }
            let secs = Decimal::from(start.elapsed_secs(&end));
            weighted_sum += round.rate * secs;
            total_secs += secs;
        }

        if total_secs.is_zero() {
            // window shorter than the latest round: fall back to the spot rate
            return self.rate(currency, now);
        }
        Ok(divide_round(weighted_sum, total_secs)?)
    }

    pub fn known_currencies(&self) -> impl Iterator<Item = &CurrencyKey> {
        self.rounds.keys()
    }
}
