// 2.0: fixed-point helpers. 18 decimal places, two rounding flavors.
// ledger ratios truncate (floor toward zero) so the ratio chain never rounds
// debt into existence; user-facing amounts round half-up. every op is checked
// and overflow surfaces as a typed error instead of a panic.

use rust_decimal::{Decimal, MathematicalOps, RoundingStrategy};

/// Decimal places carried by ledger ratios and rates.
pub const DECIMALS: u32 = 18;

pub const UNIT: Decimal = Decimal::ONE;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum MathError {
    #[error("arithmetic overflow")]
    Overflow,

    #[error("division by zero")]
    DivisionByZero,
}

// 2.1: ledger-ratio path. truncation keeps the cumulative chain conservative:
// an account can never be owed more debt than the pool holds.
pub fn multiply_round_floor(a: Decimal, b: Decimal) -> Result<Decimal, MathError> {
    let product = a.checked_mul(b).ok_or(MathError::Overflow)?;
    Ok(product.round_dp_with_strategy(DECIMALS, RoundingStrategy::ToZero))
}

pub fn divide_round_floor(a: Decimal, b: Decimal) -> Result<Decimal, MathError> {
    if b.is_zero() {
        return Err(MathError::DivisionByZero);
    }
    let quotient = a.checked_div(b).ok_or(MathError::Overflow)?;
    Ok(quotient.round_dp_with_strategy(DECIMALS, RoundingStrategy::ToZero))
}

// 2.2: user-amount path. half-up, the conventional rounding for balances and fees.
pub fn multiply_round(a: Decimal, b: Decimal) -> Result<Decimal, MathError> {
    let product = a.checked_mul(b).ok_or(MathError::Overflow)?;
    Ok(product.round_dp_with_strategy(DECIMALS, RoundingStrategy::MidpointAwayFromZero))
}

pub fn divide_round(a: Decimal, b: Decimal) -> Result<Decimal, MathError> {
    if b.is_zero() {
        return Err(MathError::DivisionByZero);
    }
    let quotient = a.checked_div(b).ok_or(MathError::Overflow)?;
    Ok(quotient.round_dp_with_strategy(DECIMALS, RoundingStrategy::MidpointAwayFromZero))
}

// 2.3: integer power for the dynamic-fee decay weights. decay^age with age
// bounded by the configured round count, so this never runs away.
pub fn decimal_powi(base: Decimal, exp: u64) -> Result<Decimal, MathError> {
    base.checked_powu(exp).ok_or(MathError::Overflow)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn floor_multiply_truncates() {
        // 1/3 * 3 under truncation stays just below 1
        let third = divide_round_floor(dec!(1), dec!(3)).unwrap();
        let back = multiply_round_floor(third, dec!(3)).unwrap();
        assert!(back < UNIT);
        assert!(back > dec!(0.999999999999999998));
    }

    #[test]
    fn half_up_rounds_midpoint_away() {
        let v = divide_round(dec!(1), dec!(3)).unwrap();
        assert_eq!(v, dec!(0.333333333333333333));
    }

    #[test]
    fn divide_by_zero_is_error() {
        assert_eq!(divide_round(dec!(1), dec!(0)), Err(MathError::DivisionByZero));
        assert_eq!(divide_round_floor(dec!(1), dec!(0)), Err(MathError::DivisionByZero));
    }

    #[test]
    fn overflow_is_error() {
        let result = multiply_round(Decimal::MAX, dec!(2));
        assert_eq!(result, Err(MathError::Overflow));
    }

    #[test]
    fn powi_decay_weights() {
        let decay = dec!(0.5);
        assert_eq!(decimal_powi(decay, 0).unwrap(), dec!(1));
        assert_eq!(decimal_powi(decay, 1).unwrap(), dec!(0.5));
        assert_eq!(decimal_powi(decay, 3).unwrap(), dec!(0.125));
    }
}
