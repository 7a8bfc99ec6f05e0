// 7.0: exchange fee math. the dynamic component prices recent volatility into the
// fee: per currency, walk the last N price rounds, take each round-over-round
// deviation above the threshold, and sum them with geometrically decaying weights
// (older rounds contribute exponentially less). past the cap the exchange is not
// worth protecting with a fee at all and the whole call reverts instead.

use crate::decimal::{decimal_powi, divide_round, MathError};
use crate::rates::RateStore;
use crate::types::{CurrencyKey, USD};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DynamicFeeParams {
    // how many recent rounds feed the deviation sum
    pub rounds: u64,
    // per-round-older weight multiplier, in (0, 1]
    pub weight_decay: Decimal,
    // deviation below this is normal market noise and contributes nothing
    pub threshold: Decimal,
    // above this the exchange reverts RateTooVolatile
    pub max_fee: Decimal,
}

impl Default for DynamicFeeParams {
    fn default() -> Self {
        Self {
            rounds: 10,
            weight_decay: dec!(0.95),
            threshold: dec!(0.004),
            max_fee: dec!(0.05),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FeeError {
    #[error("rate for {currency} too volatile: dynamic fee {fee} exceeds cap {cap}")]
    RateTooVolatile {
        currency: CurrencyKey,
        fee: Decimal,
        cap: Decimal,
    },

    #[error(transparent)]
    Math(#[from] MathError),
}

// 7.1: decayed deviation sum for one currency. returns the dynamic fee fraction,
// or RateTooVolatile when the sum blows through the cap.
pub fn dynamic_fee_for_currency(
    rates: &RateStore,
    currency: CurrencyKey,
    params: &DynamicFeeParams,
) -> Result<Decimal, FeeError> {
    if currency == USD {
        return Ok(Decimal::ZERO);
    }
    let Some(head) = rates.current_round_id(currency) else {
        return Ok(Decimal::ZERO);
    };

    let mut fee = Decimal::ZERO;
    let mut round = head;
    for age in 0..params.rounds {
        let Some(prev) = round.prev() else {
            break; // chain shorter than the lookback
        };
        let current_rate = rates.rate_for_round(currency, round).unwrap_or(Decimal::ZERO);
        let prev_rate = rates.rate_for_round(currency, prev).unwrap_or(Decimal::ZERO);
        if prev_rate > Decimal::ZERO {
            let deviation = divide_round((current_rate - prev_rate).abs(), prev_rate)?;
            let over = (deviation - params.threshold).max(Decimal::ZERO);
            if over > Decimal::ZERO {
                let weight = decimal_powi(params.weight_decay, age)?;
                fee += over * weight;
            }
        }
        round = prev;
    }

    if fee > params.max_fee {
        return Err(FeeError::RateTooVolatile {
            currency,
            fee,
            cap: params.max_fee,
        });
    }
    Ok(fee)
}

/// Total fee rate for one exchange: base fee of both legs plus both dynamic parts.
pub fn exchange_fee_rate(
    rates: &RateStore,
    src: CurrencyKey,
    dest: CurrencyKey,
    base_src: Decimal,
    base_dest: Decimal,
    params: &DynamicFeeParams,
) -> Result<Decimal, FeeError> {
    let dyn_src = dynamic_fee_for_currency(rates, src, params)?;
    let dyn_dest = dynamic_fee_for_currency(rates, dest, params)?;
    Ok(base_src + base_dest + dyn_src + dyn_dest)
}

/// Deviation of the latest round against the one before it. Used by callers that
/// want a cheap pre-check before running the full lookback.
pub fn latest_round_deviation(rates: &RateStore, currency: CurrencyKey) -> Option<Decimal> {
    let head = rates.current_round_id(currency)?;
    let prev = head.prev()?;
    let current = rates.rate_for_round(currency, head)?;
    let previous = rates.rate_for_round(currency, prev)?;
    if previous.is_zero() {
        return None;
    }
    divide_round((current - previous).abs(), previous).ok()
}
