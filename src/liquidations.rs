//! Liquidation state machine and redemption math.
//!
//! An account whose issuance ratio (debt / collateral value) climbs past the
//! liquidation threshold can be flagged. After the delay any caller may force
//! a partial liquidation; the account may also self-liquidate at a smaller
//! penalty without waiting. The redemption amount is the closed-form solution
//! that lands the post-liquidation ratio exactly on the target.
//!
//! Ordering is load-bearing here: eligibility is always decided before any
//! amount is computed, because the formula divides by `1 - (1+P)·r` and only
//! eligibility guarantees that quantity is meaningful.

use crate::decimal::{divide_round, MathError, UNIT};
use crate::types::{AccountId, Timestamp};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiquidationParams {
    // issuance ratio at or above which an account may be flagged
    pub liquidation_ratio: Decimal,
    // ratio a liquidation restores the account to
    pub target_issuance_ratio: Decimal,
    // seconds between flagging and forced liquidation opening
    pub delay_secs: i64,
    // collateral bonus paid to a forced liquidator
    pub penalty: Decimal,
    // smaller bonus burned when the account liquidates itself
    pub self_penalty: Decimal,
    // flat USD rewards for the flagger and the liquidator, paid from seized collateral
    pub flag_reward: Decimal,
    pub liquidate_reward: Decimal,
}

impl Default for LiquidationParams {
    fn default() -> Self {
        Self {
            liquidation_ratio: dec!(0.625), // 160% collateralization
            target_issuance_ratio: dec!(0.5), // 200% collateralization
            delay_secs: 8 * 3600,
            penalty: dec!(0.3),
            self_penalty: dec!(0.2),
            flag_reward: dec!(10),
            liquidate_reward: dec!(20),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LiquidationError {
    #[error("{0} is already flagged for liquidation")]
    AlreadyFlagged(AccountId),

    #[error("{0} is not eligible for liquidation")]
    NotEligible(AccountId),

    #[error("{0} has insufficient collateral to cover liquidation rewards")]
    InsufficientCollateral(AccountId),

    #[error(transparent)]
    Math(#[from] MathError),
}

// deadline None = unflagged. caller survives a clear so the flag reward stays payable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiquidationEntry {
    pub deadline: Option<Timestamp>,
    pub caller: AccountId,
}

/// Flag registry. At most one active (deadline-set) entry per account.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LiquidationBook {
    entries: HashMap<AccountId, LiquidationEntry>,
}

impl LiquidationBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entry(&self, account: AccountId) -> Option<&LiquidationEntry> {
        self.entries.get(&account)
    }

    pub fn is_flagged(&self, account: AccountId) -> bool {
        self.entries
            .get(&account)
            .map(|e| e.deadline.is_some())
            .unwrap_or(false)
    }

    pub fn deadline_passed(&self, account: AccountId, now: Timestamp) -> bool {
        match self.entries.get(&account).and_then(|e| e.deadline) {
            Some(deadline) => now >= deadline,
            None => false,
        }
    }

    pub fn flag(
        &mut self,
        account: AccountId,
        caller: AccountId,
        deadline: Timestamp,
    ) -> Result<(), LiquidationError> {
        if self.is_flagged(account) {
            return Err(LiquidationError::AlreadyFlagged(account));
        }
        self.entries.insert(
            account,
            LiquidationEntry {
                deadline: Some(deadline),
                caller,
            },
        );
        Ok(())
    }

    /// Resets the deadline but keeps the caller for reward bookkeeping.
    /// No-op when the account was never flagged.
    pub fn clear(&mut self, account: AccountId) {
        if let Some(entry) = self.entries.get_mut(&account) {
            entry.deadline = None;
        }
    }
}

// amounts a liquidation moves, all in USD value
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LiquidationAmounts {
    pub total_redeemed: Decimal,
    pub debt_to_remove: Decimal,
    pub initial_debt_balance: Decimal,
}

// the closed-form redemption: S = (D - V*r) / (1 - (1+P)*r).
// derived by requiring (D - S) / (V - S*(1+P)) == r exactly.
// caller must have established eligibility; with r < 1/(1+P) the denominator
// is strictly positive and with D > V*r the numerator is too.
pub fn amount_to_fix_ratio(
    debt_balance: Decimal,
    collateral_value: Decimal,
    target_ratio: Decimal,
    penalty: Decimal,
) -> Result<Decimal, MathError> {
    let unit_plus_penalty = UNIT + penalty;
    let numerator = debt_balance - collateral_value * target_ratio;
    let denominator = UNIT - unit_plus_penalty * target_ratio;
    divide_round(numerator, denominator)
}

/// Full redemption computation with the collateral cap: when the account cannot
/// cover `S·(1+P)`, everything it has is seized and the debt burned is scaled down.
pub fn liquidation_amounts(
    debt_balance: Decimal,
    collateral_value: Decimal,
    params: &LiquidationParams,
    is_self: bool,
) -> Result<LiquidationAmounts, MathError> {
    let penalty = if is_self { params.self_penalty } else { params.penalty };
    let mut debt_to_remove =
        amount_to_fix_ratio(debt_balance, collateral_value, params.target_issuance_ratio, penalty)?;
    let mut total_redeemed = debt_to_remove * (UNIT + penalty);

    if total_redeemed > collateral_value {
        total_redeemed = collateral_value;
        debt_to_remove = divide_round(collateral_value, UNIT + penalty)?;
    }
    // never burn more than the account owes
    if debt_to_remove > debt_balance {
        debt_to_remove = debt_balance;
    }

    Ok(LiquidationAmounts {
        total_redeemed,
        debt_to_remove,
        initial_debt_balance: debt_balance,
    })
}

/// Ratio above which a partial liquidation at `penalty` can no longer restore
/// the target: seizing `S·(1+P)` collateral per `S` debt makes the ratio worse
/// once `D/V >= 1/(1+P)`. Self-liquidation closes there (only the forced,
/// collateral-capped path remains); forced liquidation falls back to seizing
/// everything.
pub fn max_restorable_ratio(penalty: Decimal) -> Result<Decimal, MathError> {
    divide_round(UNIT, UNIT + penalty)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn closed_form_matches_worked_example() {
        // D=1000, V=2000, r=0.33, P=0.6 -> S = 340 / 0.472
        let s = amount_to_fix_ratio(dec!(1000), dec!(2000), dec!(0.33), dec!(0.6)).unwrap();
        let expected = dec!(340) / dec!(0.472);
        assert!((s - expected).abs() < dec!(0.000001));
        assert!((s - dec!(720.34)).abs() < dec!(0.01));
    }

    #[test]
    fn post_liquidation_ratio_hits_target() {
        let d = dec!(1000);
        let v = dec!(2000);
        let r = dec!(0.33);
        let p = dec!(0.6);
        let s = amount_to_fix_ratio(d, v, r, p).unwrap();

        let new_debt = d - s;
        let new_collateral = v - s * (dec!(1) + p);
        let new_ratio = new_debt / new_collateral;
        assert!((new_ratio - r).abs() < dec!(0.0000001));
    }

    #[test]
    fn amounts_capped_at_collateral() {
        let params = LiquidationParams::default();
        // deeply underwater: debt exceeds collateral entirely
        let amounts = liquidation_amounts(dec!(3000), dec!(1000), &params, false).unwrap();
        assert_eq!(amounts.total_redeemed, dec!(1000));
        // debt burned scales down to collateral / (1 + penalty)
        assert!((amounts.debt_to_remove - dec!(1000) / dec!(1.3)).abs() < dec!(0.000001));
        assert_eq!(amounts.initial_debt_balance, dec!(3000));
    }

    #[test]
    fn debt_burn_never_exceeds_balance() {
        let params = LiquidationParams {
            target_issuance_ratio: dec!(0.1),
            penalty: dec!(0.05),
            ..LiquidationParams::default()
        };
        let amounts = liquidation_amounts(dec!(100), dec!(120), &params, false).unwrap();
        assert!(amounts.debt_to_remove <= dec!(100));
    }

    #[test]
    fn flag_lifecycle() {
        let mut book = LiquidationBook::new();
        let alice = AccountId(1);
        let flagger = AccountId(9);
        let deadline = Timestamp::from_millis(1000);

        assert!(!book.is_flagged(alice));
        book.flag(alice, flagger, deadline).unwrap();
        assert!(book.is_flagged(alice));

        // double flag rejected
        let again = book.flag(alice, AccountId(10), deadline);
        assert!(matches!(again, Err(LiquidationError::AlreadyFlagged(_))));

        assert!(!book.deadline_passed(alice, Timestamp::from_millis(999)));
        assert!(book.deadline_passed(alice, Timestamp::from_millis(1000)));

        // clearing keeps the caller
        book.clear(alice);
        assert!(!book.is_flagged(alice));
        assert_eq!(book.entry(alice).unwrap().caller, flagger);

        // clearing an unflagged account is a no-op
        book.clear(AccountId(42));
        assert!(book.entry(AccountId(42)).is_none());
    }

    #[test]
    fn reflag_after_clear_allowed() {
        let mut book = LiquidationBook::new();
        let alice = AccountId(1);
        book.flag(alice, AccountId(9), Timestamp::from_millis(1000)).unwrap();
        book.clear(alice);
        book.flag(alice, AccountId(11), Timestamp::from_millis(2000)).unwrap();
        assert_eq!(book.entry(alice).unwrap().caller, AccountId(11));
    }
}
