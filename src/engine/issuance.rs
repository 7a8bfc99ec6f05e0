// 14.1 engine/issuance.rs: debt-share accounting. minting and burning recompute a
// single ownership fraction per account against the debt ledger's ratio chain;
// no other account's record is touched by any global debt event.
//
// every mutating path here validates and reads rates before the first state
// write, so a failure leaves nothing half-applied.

use super::core::Engine;
use super::results::EngineError;
use crate::decimal::{divide_round_floor, multiply_round_floor, UNIT};
use crate::events::{BurnedEvent, EventPayload, MintedEvent};
use crate::types::{AccountId, CurrencyKey, USD};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// The issuer's entire per-account record: a debt-pool ownership fraction and
/// the ledger index at which it was last written.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AccountIssuanceData {
    pub initial_debt_ownership: Decimal,
    pub debt_entry_index: usize,
}

impl Engine {
    /// Total outstanding synth debt valued in `currency`: every circulating
    /// supply converted through current rates. Fails StaleRate rather than
    /// valuing the pool on a dead feed.
    pub fn total_issued_synths(&self, currency: CurrencyKey) -> Result<Decimal, EngineError> {
        let mut total_usd = Decimal::ZERO;
        for (key, supply) in self.synths.currencies_in_circulation() {
            let rate = self.rates.rate(*key, self.current_time)?;
            total_usd += multiply_round_floor(*supply, rate)?;
        }
        if currency == USD {
            return Ok(total_usd);
        }
        let dest_rate = self.rates.rate(currency, self.current_time)?;
        Ok(divide_round_floor(total_usd, dest_rate)?)
    }

    /// The account's current absolute debt in `currency`, projected from its
    /// stored ownership fraction through the ratio chain.
    pub fn debt_balance_of(&self, account: AccountId, currency: CurrencyKey) -> Result<Decimal, EngineError> {
        let Some(data) = self.issuance.get(&account) else {
            return Ok(Decimal::ZERO);
        };
        if data.initial_debt_ownership.is_zero() {
            return Ok(Decimal::ZERO);
        }
        let total_debt = self.total_issued_synths(currency)?;
        if total_debt.is_zero() {
            return Ok(Decimal::ZERO);
        }
        let growth = self.debt_ledger.ratio_since(data.debt_entry_index)?;
        let current_ownership = multiply_round_floor(data.initial_debt_ownership, growth)?;
        Ok(multiply_round_floor(current_ownership, total_debt)?)
    }

    pub fn max_issuable(&self, account: AccountId) -> Result<Decimal, EngineError> {
        let collateral_value = self.collateral_value(account)?;
        Ok(multiply_round_floor(collateral_value, self.settings.issuance_ratio)?)
    }

    pub fn remaining_issuable(&self, account: AccountId) -> Result<Decimal, EngineError> {
        let max = self.max_issuable(account)?;
        let debt = self.debt_balance_of(account, USD)?;
        Ok((max - debt).max(Decimal::ZERO))
    }

    /// Issuance ratio of the account: debt value over collateral value.
    /// Decimal::MAX when debt exists against zero collateral.
    pub fn issuance_ratio_of(&self, account: AccountId) -> Result<Decimal, EngineError> {
        let debt = self.debt_balance_of(account, USD)?;
        if debt.is_zero() {
            return Ok(Decimal::ZERO);
        }
        let collateral_value = self.collateral_value(account)?;
        if collateral_value.is_zero() {
            return Ok(Decimal::MAX);
        }
        Ok(crate::decimal::divide_round(debt, collateral_value)?)
    }

    // 14.1.1: mint USD synths against collateral.
    pub fn issue_synths(&mut self, account: AccountId, amount: Decimal) -> Result<(), EngineError> {
        self.status.require_synth_active(USD)?;
        if amount <= Decimal::ZERO {
            return Err(EngineError::InvalidInput(format!(
                "issue amount must be positive, got {amount}"
            )));
        }
        let issuable = self.remaining_issuable(account)?;
        if amount > issuable {
            return Err(EngineError::InsufficientCollateral {
                requested: amount,
                issuable,
            });
        }

        let existing_debt = self.debt_balance_of(account, USD)?;
        let total_debt = self.total_issued_synths(USD)?;
        self.add_to_debt_register(account, amount, existing_debt, total_debt)?;
        self.synths.mint(USD, account, amount)?;

        let ownership = self.issuance[&account].initial_debt_ownership;
        self.emit_event(EventPayload::Minted(MintedEvent {
            account,
            amount,
            new_debt_ownership: ownership,
        }));
        Ok(())
    }

    // 14.1.2: burn USD synths, shrinking the account's debt share. settles any
    // pending USD exchange entries first so reclaimable value is not spent.
    pub fn burn_synths(&mut self, account: AccountId, amount: Decimal) -> Result<(), EngineError> {
        self.status.require_synth_active(USD)?;
        if amount <= Decimal::ZERO {
            return Err(EngineError::InvalidInput(format!(
                "burn amount must be positive, got {amount}"
            )));
        }
        self.settle(account, USD)?;

        let existing_debt = self.debt_balance_of(account, USD)?;
        if existing_debt.is_zero() {
            return Err(EngineError::NoDebt(account));
        }
        // burning above the debt just clears it
        let amount_to_burn = amount.min(existing_debt);

        // token burn first: it carries the InsufficientBalance check, and the
        // debt register update below cannot fail after rates were already read
        let total_debt = self.total_issued_synths(USD)?;
        self.synths.burn(USD, account, amount_to_burn)?;
        self.remove_from_debt_register(account, amount_to_burn, existing_debt, total_debt)?;

        let remaining = existing_debt - amount_to_burn;
        self.emit_event(EventPayload::Burned(BurnedEvent {
            account,
            amount: amount_to_burn,
            remaining_debt: remaining,
        }));
        Ok(())
    }

    // 14.1.3: the ratio-chain append for a mint. the pool grew by `amount`, so
    // every other account's share shrank by the factor (1 - amount/newTotal);
    // this account's fraction is rewritten against the new chain head.
    pub(super) fn add_to_debt_register(
        &mut self,
        account: AccountId,
        amount: Decimal,
        existing_debt: Decimal,
        total_debt: Decimal,
    ) -> Result<(), EngineError> {
        let new_total = total_debt + amount;
        let debt_percentage = divide_round_floor(amount, new_total)?;
        let delta = UNIT - debt_percentage;

        let ownership = if existing_debt.is_zero() {
            debt_percentage
        } else {
            divide_round_floor(existing_debt + amount, new_total)?
        };

        let index = self.debt_ledger.len();
        if self.debt_ledger.is_empty() || self.debt_ledger.last_entry().is_zero() {
            // first event ever, or the chain was zeroed by a full system burn:
            // restart from UNIT
            self.debt_ledger.append_raw(UNIT);
        } else {
            self.debt_ledger.append(delta)?;
        }
        self.issuance.insert(
            account,
            AccountIssuanceData {
                initial_debt_ownership: ownership,
                debt_entry_index: index,
            },
        );
        Ok(())
    }

    // 14.1.4: inverse chain append for a burn. remaining accounts' shares grow
    // by (1 + amount/newTotal); a full system burn zeroes the chain.
    pub(super) fn remove_from_debt_register(
        &mut self,
        account: AccountId,
        amount: Decimal,
        existing_debt: Decimal,
        total_debt: Decimal,
    ) -> Result<(), EngineError> {
        let new_total = (total_debt - amount).max(Decimal::ZERO);

        let index = self.debt_ledger.len();
        if new_total.is_zero() {
            self.debt_ledger.append_raw(Decimal::ZERO);
        } else {
            let debt_percentage = divide_round_floor(amount, new_total)?;
            self.debt_ledger.append(UNIT + debt_percentage)?;
        }

        let ownership = if amount >= existing_debt || new_total.is_zero() {
            Decimal::ZERO
        } else {
            divide_round_floor(existing_debt - amount, new_total)?
        };
        self.issuance.insert(
            account,
            AccountIssuanceData {
                initial_debt_ownership: ownership,
                debt_entry_index: index,
            },
        );
        Ok(())
    }

    pub fn issuance_data(&self, account: AccountId) -> Option<&AccountIssuanceData> {
        self.issuance.get(&account)
    }

    pub fn debt_ledger_len(&self) -> usize {
        self.debt_ledger.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SystemSettings;
    use crate::types::COLLATERAL;
    use rust_decimal_macros::dec;

    fn engine_with_staker(account: AccountId, collateral: Decimal) -> Engine {
        let mut engine = Engine::new(SystemSettings::default()).unwrap();
        engine.update_rate(COLLATERAL, dec!(2)).unwrap();
        engine.deposit_collateral(account, collateral).unwrap();
        engine
    }

    #[test]
    fn first_mint_owns_whole_pool() {
        let alice = AccountId(1);
        let mut engine = engine_with_staker(alice, dec!(1000)); // $2000 collateral

        engine.issue_synths(alice, dec!(500)).unwrap();

        let data = engine.issuance_data(alice).unwrap();
        assert_eq!(data.initial_debt_ownership, dec!(1));
        assert_eq!(data.debt_entry_index, 0);
        assert_eq!(engine.debt_balance_of(alice, USD).unwrap(), dec!(500));
        assert_eq!(engine.synth_balance(alice, USD), dec!(500));
    }

    #[test]
    fn mint_beyond_issuance_ratio_rejected() {
        let alice = AccountId(1);
        let mut engine = engine_with_staker(alice, dec!(1000)); // $2000, max issuable $1000

        let result = engine.issue_synths(alice, dec!(1001));
        assert!(matches!(result, Err(EngineError::InsufficientCollateral { .. })));
        // nothing happened
        assert_eq!(engine.synth_balance(alice, USD), dec!(0));
        assert_eq!(engine.debt_ledger_len(), 0);
    }

    #[test]
    fn second_minter_dilutes_first() {
        let alice = AccountId(1);
        let bob = AccountId(2);
        let mut engine = engine_with_staker(alice, dec!(1000));
        engine.deposit_collateral(bob, dec!(1000)).unwrap();

        engine.issue_synths(alice, dec!(300)).unwrap();
        engine.issue_synths(bob, dec!(700)).unwrap();

        // shares settle at 30/70 of a 1000 pool
        let alice_debt = engine.debt_balance_of(alice, USD).unwrap();
        let bob_debt = engine.debt_balance_of(bob, USD).unwrap();
        assert!((alice_debt - dec!(300)).abs() < dec!(0.000001));
        assert!((bob_debt - dec!(700)).abs() < dec!(0.000001));
    }

    #[test]
    fn full_burn_clears_ownership() {
        let alice = AccountId(1);
        let mut engine = engine_with_staker(alice, dec!(1000));
        engine.issue_synths(alice, dec!(400)).unwrap();

        engine.burn_synths(alice, dec!(400)).unwrap();

        assert_eq!(engine.debt_balance_of(alice, USD).unwrap(), dec!(0));
        assert_eq!(engine.issuance_data(alice).unwrap().initial_debt_ownership, dec!(0));
        assert_eq!(engine.synth_balance(alice, USD), dec!(0));
    }

    #[test]
    fn burn_above_debt_burns_only_debt() {
        let alice = AccountId(1);
        let mut engine = engine_with_staker(alice, dec!(1000));
        engine.issue_synths(alice, dec!(400)).unwrap();

        // burning 9999 only takes the 400 owed
        engine.burn_synths(alice, dec!(9999)).unwrap();
        assert_eq!(engine.debt_balance_of(alice, USD).unwrap(), dec!(0));
    }

    #[test]
    fn burn_without_debt_fails() {
        let alice = AccountId(1);
        let mut engine = engine_with_staker(alice, dec!(1000));
        let result = engine.burn_synths(alice, dec!(10));
        assert!(matches!(result, Err(EngineError::NoDebt(_))));
    }

    #[test]
    fn remint_after_total_burn() {
        let alice = AccountId(1);
        let mut engine = engine_with_staker(alice, dec!(1000));
        engine.issue_synths(alice, dec!(400)).unwrap();
        engine.burn_synths(alice, dec!(400)).unwrap();

        // chain was zeroed; a fresh mint restarts it
        engine.issue_synths(alice, dec!(100)).unwrap();
        assert_eq!(engine.debt_balance_of(alice, USD).unwrap(), dec!(100));
        assert_eq!(engine.issuance_data(alice).unwrap().initial_debt_ownership, dec!(1));
    }

    #[test]
    fn debt_entry_index_always_within_ledger() {
        let alice = AccountId(1);
        let bob = AccountId(2);
        let mut engine = engine_with_staker(alice, dec!(10000));
        engine.deposit_collateral(bob, dec!(10000)).unwrap();

        for i in 1..=10u32 {
            engine.issue_synths(alice, Decimal::from(i * 10)).unwrap();
            engine.issue_synths(bob, Decimal::from(i * 5)).unwrap();
        }
        for (_, data) in engine.issuance.iter() {
            assert!(data.debt_entry_index < engine.debt_ledger.len());
        }
    }

    #[test]
    fn stale_collateral_rate_blocks_mint() {
        let alice = AccountId(1);
        let mut engine = engine_with_staker(alice, dec!(1000));
        engine.advance_time(4000 * 1000); // past the 3600s stale period

        let result = engine.issue_synths(alice, dec!(100));
        assert!(matches!(result, Err(EngineError::Rate(_))));
    }

    #[test]
    fn debt_tracks_price_moves_of_other_synths() {
        let alice = AccountId(1);
        let bob = AccountId(2);
        let btc = crate::types::CurrencyKey::new("sBTC");
        let mut engine = engine_with_staker(alice, dec!(100000));
        engine.deposit_collateral(bob, dec!(100000)).unwrap();
        engine.update_rate(btc, dec!(100)).unwrap();

        engine.issue_synths(alice, dec!(1000)).unwrap();
        engine.issue_synths(bob, dec!(1000)).unwrap();

        // bob swaps his sUSD into sBTC, then the price doubles: total debt rises,
        // and both accounts carry half of it
        engine.exchange(bob, USD, dec!(1000), btc, bob).unwrap();
        engine.update_rate(btc, dec!(200)).unwrap();

        let total = engine.total_issued_synths(USD).unwrap();
        let alice_debt = engine.debt_balance_of(alice, USD).unwrap();
        let bob_debt = engine.debt_balance_of(bob, USD).unwrap();
        assert!(total > dec!(2000));
        assert!((alice_debt - total / dec!(2)).abs() < dec!(0.01));
        assert!((bob_debt - total / dec!(2)).abs() < dec!(0.01));
    }
}
