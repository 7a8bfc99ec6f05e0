// 14.3 engine/liquidating.rs: the flag -> delay -> redeem lifecycle. eligibility
// is always decided before any amount is computed; the closed-form redemption in
// liquidations.rs is only ever evaluated for an account that passed the gate.
//
// funding model: a forced liquidator burns their own USD synths to retire the
// target's debt and takes the seized collateral plus a flat reward; the original
// flagger is paid their flat reward from the same account. self-liquidation burns
// the account's own USD synths and forfeits only the penalty share of collateral,
// the price of deleveraging without a flag or delay.

use super::core::Engine;
use super::results::{EngineError, LiquidationResult};
use crate::decimal::{divide_round, multiply_round};
use crate::events::{EventPayload, FlaggedEvent, LiquidatedEvent, UnflaggedEvent};
use crate::liquidations::{self, LiquidationAmounts, LiquidationEntry, LiquidationError};
use crate::types::{AccountId, Timestamp, COLLATERAL, USD};
use rust_decimal::Decimal;

impl Engine {
    // 14.3.1: open the liquidation window. requires the ratio at or past the
    // flag threshold and enough collateral to cover both flat rewards.
    pub fn flag_account_for_liquidation(
        &mut self,
        flagger: AccountId,
        account: AccountId,
    ) -> Result<Timestamp, EngineError> {
        self.status.require_system_active()?;
        if self.liquidations.is_flagged(account) {
            return Err(LiquidationError::AlreadyFlagged(account).into());
        }
        let ratio = self.issuance_ratio_of(account)?;
        if ratio < self.settings.liquidation.liquidation_ratio {
            return Err(LiquidationError::NotEligible(account).into());
        }
        let collateral_value = self.collateral_value(account)?;
        let rewards = self.settings.liquidation.flag_reward + self.settings.liquidation.liquidate_reward;
        if collateral_value < rewards {
            return Err(LiquidationError::InsufficientCollateral(account).into());
        }

        let deadline = self.current_time.plus_secs(self.settings.liquidation.delay_secs);
        self.liquidations.flag(account, flagger, deadline)?;
        self.emit_event(EventPayload::AccountFlaggedForLiquidation(FlaggedEvent {
            account,
            flagger,
            deadline,
        }));
        Ok(deadline)
    }

    // 14.3.2: the eligibility gate. forced liquidation needs an expired flag;
    // self-liquidation needs no flag but closes once the ratio passes the point
    // where a partial redemption at the self penalty can still restore the target.
    pub fn is_liquidation_open(&self, account: AccountId, is_self: bool) -> Result<bool, EngineError> {
        let liq = &self.settings.liquidation;
        let ratio = self.issuance_ratio_of(account)?;
        if ratio <= liq.target_issuance_ratio {
            return Ok(false);
        }
        if is_self {
            let ceiling = liquidations::max_restorable_ratio(liq.self_penalty)?;
            Ok(ratio < ceiling)
        } else {
            Ok(self.liquidations.is_flagged(account)
                && self.liquidations.deadline_passed(account, self.current_time))
        }
    }

    /// Redemption amounts for an eligible account. Rejects instead of computing
    /// when the gate fails: the closed form is meaningless outside it.
    pub fn liquidation_amounts(
        &self,
        account: AccountId,
        is_self: bool,
    ) -> Result<LiquidationAmounts, EngineError> {
        if !self.is_liquidation_open(account, is_self)? {
            return Err(LiquidationError::NotEligible(account).into());
        }
        let debt = self.debt_balance_of(account, USD)?;
        let collateral_value = self.collateral_value(account)?;
        Ok(liquidations::liquidation_amounts(
            debt,
            collateral_value,
            &self.settings.liquidation,
            is_self,
        )?)
    }

    // 14.3.3: forced liquidation. the liquidator's own USD synths fund the debt
    // burn; the first fallible mutation is that burn, so an underfunded caller
    // aborts with nothing applied.
    pub fn liquidate_account(
        &mut self,
        liquidator: AccountId,
        account: AccountId,
    ) -> Result<LiquidationResult, EngineError> {
        self.status.require_system_active()?;
        if liquidator == account {
            return Err(EngineError::InvalidInput(
                "an account cannot force-liquidate itself".to_string(),
            ));
        }
        let amounts = self.liquidation_amounts(account, false)?;
        let total_debt = self.total_issued_synths(USD)?;
        let rate = self.rates.rate(COLLATERAL, self.current_time)?;
        let liq = self.settings.liquidation.clone();

        self.synths.burn(USD, liquidator, amounts.debt_to_remove)?;
        self.remove_from_debt_register(
            account,
            amounts.debt_to_remove,
            amounts.initial_debt_balance,
            total_debt,
        )?;

        // seized principal (penalty included) moves to the liquidator
        let seized_units = divide_round(amounts.total_redeemed, rate)?;
        let seized = self.take_collateral(account, seized_units);
        self.credit_collateral(liquidator, seized);

        // flat rewards come out of whatever collateral remains
        let flagger = self
            .liquidations
            .entry(account)
            .map(|e| e.caller)
            .unwrap_or(liquidator);
        let flag_units = self.take_collateral(account, divide_round(liq.flag_reward, rate)?);
        self.credit_collateral(flagger, flag_units);
        let reward_units = self.take_collateral(account, divide_round(liq.liquidate_reward, rate)?);
        self.credit_collateral(liquidator, reward_units);

        // unflag once the account is back out of flaggable territory; a
        // collateral-capped liquidation of a deeply underwater account leaves
        // the flag in place for a follow-up round
        let post_ratio = self.issuance_ratio_of(account)?;
        if post_ratio < liq.liquidation_ratio {
            self.liquidations.clear(account);
            self.emit_event(EventPayload::AccountRemovedFromLiquidation(UnflaggedEvent {
                account,
            }));
        }

        self.emit_event(EventPayload::AccountLiquidated(LiquidatedEvent {
            account,
            liquidator,
            debt_removed: amounts.debt_to_remove,
            collateral_redeemed: amounts.total_redeemed,
            is_self: false,
        }));

        Ok(LiquidationResult {
            account,
            liquidator,
            debt_removed: amounts.debt_to_remove,
            collateral_redeemed: amounts.total_redeemed,
            flag_reward_paid: multiply_round(flag_units, rate)?,
            liquidate_reward_paid: multiply_round(reward_units, rate)?,
        })
    }

    // 14.3.4: self-liquidation. same closed form at the smaller penalty, no flag
    // or delay required. the account burns its own USD synths; only the penalty
    // share of collateral is forfeited.
    pub fn self_liquidate(&mut self, account: AccountId) -> Result<LiquidationResult, EngineError> {
        self.status.require_system_active()?;
        let amounts = self.liquidation_amounts(account, true)?;
        let total_debt = self.total_issued_synths(USD)?;
        let rate = self.rates.rate(COLLATERAL, self.current_time)?;

        self.synths.burn(USD, account, amounts.debt_to_remove)?;
        self.remove_from_debt_register(
            account,
            amounts.debt_to_remove,
            amounts.initial_debt_balance,
            total_debt,
        )?;

        let penalty_value = (amounts.total_redeemed - amounts.debt_to_remove).max(Decimal::ZERO);
        let forfeited_units = self.take_collateral(account, divide_round(penalty_value, rate)?);

        if self.liquidations.is_flagged(account) {
            let post_ratio = self.issuance_ratio_of(account)?;
            if post_ratio < self.settings.liquidation.liquidation_ratio {
                self.liquidations.clear(account);
                self.emit_event(EventPayload::AccountRemovedFromLiquidation(UnflaggedEvent {
                    account,
                }));
            }
        }

        let forfeited_value = multiply_round(forfeited_units, rate)?;
        self.emit_event(EventPayload::AccountLiquidated(LiquidatedEvent {
            account,
            liquidator: account,
            debt_removed: amounts.debt_to_remove,
            collateral_redeemed: forfeited_value,
            is_self: true,
        }));

        Ok(LiquidationResult {
            account,
            liquidator: account,
            debt_removed: amounts.debt_to_remove,
            collateral_redeemed: forfeited_value,
            flag_reward_paid: Decimal::ZERO,
            liquidate_reward_paid: Decimal::ZERO,
        })
    }

    // 14.3.5: the public resolution path. anyone may clear the flag of an
    // account that restored its ratio to the target on its own (by burning or
    // adding collateral). no-op for unflagged accounts.
    pub fn check_and_remove_account_in_liquidation(
        &mut self,
        account: AccountId,
    ) -> Result<bool, EngineError> {
        if !self.liquidations.is_flagged(account) {
            return Ok(false);
        }
        let ratio = self.issuance_ratio_of(account)?;
        if ratio > self.settings.liquidation.target_issuance_ratio {
            return Ok(false);
        }
        self.liquidations.clear(account);
        self.emit_event(EventPayload::AccountRemovedFromLiquidation(UnflaggedEvent {
            account,
        }));
        Ok(true)
    }

    pub fn is_flagged_for_liquidation(&self, account: AccountId) -> bool {
        self.liquidations.is_flagged(account)
    }

    pub fn liquidation_entry(&self, account: AccountId) -> Option<&LiquidationEntry> {
        self.liquidations.entry(account)
    }

    // collateral plumbing, capped at what the account holds

    fn take_collateral(&mut self, account: AccountId, units: Decimal) -> Decimal {
        let balance = self.collateral.entry(account).or_insert(Decimal::ZERO);
        let taken = units.min(*balance).max(Decimal::ZERO);
        *balance -= taken;
        taken
    }

    fn credit_collateral(&mut self, account: AccountId, units: Decimal) {
        if units > Decimal::ZERO {
            *self.collateral.entry(account).or_insert(Decimal::ZERO) += units;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SystemSettings;
    use rust_decimal_macros::dec;

    // alice stakes 2000 COLL at $2, mints 1350 sUSD, then the price halves:
    // V = $2000, D = $1350, ratio 0.675 against the 0.625 flag threshold
    fn underwater_engine() -> (Engine, AccountId) {
        let mut engine = Engine::new(SystemSettings::default()).unwrap();
        let alice = AccountId(1);
        engine.update_rate(COLLATERAL, dec!(2)).unwrap();
        engine.deposit_collateral(alice, dec!(2000)).unwrap();
        engine.issue_synths(alice, dec!(1350)).unwrap();
        engine.update_rate(COLLATERAL, dec!(1)).unwrap();
        (engine, alice)
    }

    #[test]
    fn healthy_account_cannot_be_flagged() {
        let mut engine = Engine::new(SystemSettings::default()).unwrap();
        let alice = AccountId(1);
        engine.update_rate(COLLATERAL, dec!(2)).unwrap();
        engine.deposit_collateral(alice, dec!(2000)).unwrap();
        engine.issue_synths(alice, dec!(1350)).unwrap();

        // ratio 0.3375, well under the threshold
        let result = engine.flag_account_for_liquidation(AccountId(9), alice);
        assert!(matches!(
            result,
            Err(EngineError::Liquidation(LiquidationError::NotEligible(_)))
        ));
    }

    #[test]
    fn double_flag_rejected() {
        let (mut engine, alice) = underwater_engine();
        let bob = AccountId(2);
        engine.flag_account_for_liquidation(bob, alice).unwrap();
        let again = engine.flag_account_for_liquidation(AccountId(3), alice);
        assert!(matches!(
            again,
            Err(EngineError::Liquidation(LiquidationError::AlreadyFlagged(_)))
        ));
    }

    #[test]
    fn flag_needs_collateral_for_rewards() {
        let mut engine = Engine::new(SystemSettings::default()).unwrap();
        let tiny = AccountId(1);
        engine.update_rate(COLLATERAL, dec!(1)).unwrap();
        engine.deposit_collateral(tiny, dec!(20)).unwrap();
        engine.issue_synths(tiny, dec!(10)).unwrap();
        engine.update_rate(COLLATERAL, dec!(0.5)).unwrap();

        // ratio 1.0, eligible, but $10 of collateral cannot cover $30 of rewards
        let result = engine.flag_account_for_liquidation(AccountId(9), tiny);
        assert!(matches!(
            result,
            Err(EngineError::Liquidation(LiquidationError::InsufficientCollateral(_)))
        ));
    }

    #[test]
    fn forced_liquidation_closed_before_deadline() {
        let (mut engine, alice) = underwater_engine();
        let bob = AccountId(2);
        engine.deposit_collateral(bob, dec!(4000)).unwrap();
        engine.issue_synths(bob, dec!(1000)).unwrap();
        engine.flag_account_for_liquidation(bob, alice).unwrap();

        assert!(!engine.is_liquidation_open(alice, false).unwrap());
        let result = engine.liquidate_account(bob, alice);
        assert!(matches!(
            result,
            Err(EngineError::Liquidation(LiquidationError::NotEligible(_)))
        ));
    }

    #[test]
    fn forced_liquidation_restores_and_unflags() {
        let (mut engine, alice) = underwater_engine();
        let bob = AccountId(2);
        engine.deposit_collateral(bob, dec!(4000)).unwrap();
        engine.issue_synths(bob, dec!(1000)).unwrap();
        engine.flag_account_for_liquidation(bob, alice).unwrap();

        engine.advance_time((8 * 3600 + 1) * 1000);
        engine.update_rate(COLLATERAL, dec!(1)).unwrap();
        assert!(engine.is_liquidation_open(alice, false).unwrap());

        let result = engine.liquidate_account(bob, alice).unwrap();

        // S = (1350 - 2000*0.5) / (1 - 1.3*0.5) = 350/0.35 = 1000
        assert!((result.debt_removed - dec!(1000)).abs() < dec!(0.01));
        assert!((result.collateral_redeemed - dec!(1300)).abs() < dec!(0.01));
        assert_eq!(result.flag_reward_paid, dec!(10));
        assert_eq!(result.liquidate_reward_paid, dec!(20));

        // bob funded the burn and holds the seized collateral plus both rewards
        assert!(engine.synth_balance(bob, USD) < dec!(0.01));
        assert!((engine.collateral_balance(bob) - dec!(5330)).abs() < dec!(0.01));

        // alice is restored near the target and no longer flagged
        let alice_debt = engine.debt_balance_of(alice, USD).unwrap();
        assert!((alice_debt - dec!(350)).abs() < dec!(0.01));
        assert!(!engine.is_flagged_for_liquidation(alice));
        // flagger bookkeeping survives the clear
        assert_eq!(engine.liquidation_entry(alice).unwrap().caller, bob);
    }

    #[test]
    fn self_liquidation_needs_no_flag() {
        let (mut engine, alice) = underwater_engine();
        assert!(engine.is_liquidation_open(alice, true).unwrap());

        let result = engine.self_liquidate(alice).unwrap();

        // same closed form at the 0.2 self penalty: S = 350 / (1 - 1.2*0.5) = 875
        assert!((result.debt_removed - dec!(875)).abs() < dec!(0.01));
        // only the penalty share leaves the account: 875 * 0.2 = 175
        assert!((result.collateral_redeemed - dec!(175)).abs() < dec!(0.01));
        assert!((engine.collateral_balance(alice) - dec!(1825)).abs() < dec!(0.01));
        assert!((engine.synth_balance(alice, USD) - dec!(475)).abs() < dec!(0.01));

        // comfortably past the target afterwards
        let ratio = engine.issuance_ratio_of(alice).unwrap();
        assert!(ratio < dec!(0.5));
    }

    #[test]
    fn self_liquidation_closes_when_too_deep() {
        let (mut engine, alice) = underwater_engine();
        // halve the price again: ratio 1.35, past 1/(1+0.2) = 0.8333
        engine.update_rate(COLLATERAL, dec!(0.5)).unwrap();

        assert!(!engine.is_liquidation_open(alice, true).unwrap());
        let result = engine.self_liquidate(alice);
        assert!(matches!(
            result,
            Err(EngineError::Liquidation(LiquidationError::NotEligible(_)))
        ));
    }

    #[test]
    fn deep_underwater_forced_liquidation_caps_at_collateral() {
        let (mut engine, alice) = underwater_engine();
        let bob = AccountId(2);
        engine.deposit_collateral(bob, dec!(8000)).unwrap();
        engine.issue_synths(bob, dec!(2000)).unwrap();
        engine.flag_account_for_liquidation(bob, alice).unwrap();

        engine.advance_time((8 * 3600 + 1) * 1000);
        // collateral collapses: V = $400 against D = $1350
        engine.update_rate(COLLATERAL, dec!(0.2)).unwrap();

        let result = engine.liquidate_account(bob, alice).unwrap();
        // everything alice has is seized; debt burned scales to V / 1.3
        assert!((result.collateral_redeemed - dec!(400)).abs() < dec!(0.01));
        assert!((result.debt_removed - dec!(400) / dec!(1.3)).abs() < dec!(0.01));
        assert_eq!(engine.collateral_balance(alice), dec!(0));
        // no collateral left for the flat rewards
        assert_eq!(result.flag_reward_paid, dec!(0));
        assert_eq!(result.liquidate_reward_paid, dec!(0));
        // still owing and still flagged
        assert!(engine.debt_balance_of(alice, USD).unwrap() > dec!(0));
        assert!(engine.is_flagged_for_liquidation(alice));
    }

    #[test]
    fn check_and_remove_after_voluntary_repair() {
        let (mut engine, alice) = underwater_engine();
        let bob = AccountId(2);
        engine.flag_account_for_liquidation(bob, alice).unwrap();

        // still broken: nothing to remove
        assert!(!engine.check_and_remove_account_in_liquidation(alice).unwrap());

        // alice burns her way back under the target
        engine.burn_synths(alice, dec!(450)).unwrap();
        assert!(engine.check_and_remove_account_in_liquidation(alice).unwrap());
        assert!(!engine.is_flagged_for_liquidation(alice));
        assert_eq!(engine.liquidation_entry(alice).unwrap().caller, bob);
    }

    #[test]
    fn check_and_remove_unflagged_is_noop() {
        let (mut engine, alice) = underwater_engine();
        assert!(!engine.check_and_remove_account_in_liquidation(alice).unwrap());
        assert!(engine.liquidation_entry(alice).is_none());
    }
}
