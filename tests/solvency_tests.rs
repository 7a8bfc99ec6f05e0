//! Debt-pool solvency invariant tests.
//!
//! The proportional ledger must account for exactly the synths in circulation:
//! the sum of per-account debt balances tracks the pool total under any
//! sequence of mints, burns, exchanges, and price moves.

use proptest::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use synth_core::*;

fn total_account_debt(engine: &Engine, accounts: &[AccountId]) -> Decimal {
    accounts
        .iter()
        .map(|a| engine.debt_balance_of(*a, USD).unwrap())
        .sum()
}

proptest! {
    /// Sum of account debts equals the issued total after any mint/burn sequence.
    #[test]
    fn debt_conservation_under_mints_and_burns(
        ops in proptest::collection::vec((0..3usize, 1i64..5_000_000i64, any::<bool>()), 1..40),
    ) {
        let mut engine = Engine::new(SystemSettings::default()).unwrap();
        engine.update_rate(COLLATERAL, dec!(1)).unwrap();
        let accounts = [AccountId(1), AccountId(2), AccountId(3)];
        for a in accounts {
            engine.deposit_collateral(a, dec!(1_000_000)).unwrap();
        }

        for (who, raw, is_mint) in ops {
            let account = accounts[who];
            let amount = Decimal::new(raw, 2);
            if is_mint {
                if amount <= engine.remaining_issuable(account).unwrap() {
                    engine.issue_synths(account, amount).unwrap();
                }
            } else {
                let debt = engine.debt_balance_of(account, USD).unwrap();
                let balance = engine.synth_balance(account, USD);
                let burnable = amount.min(debt).min(balance);
                if burnable > dec!(0.01) {
                    engine.burn_synths(account, burnable).unwrap();
                }
            }
        }

        let total = engine.total_issued_synths(USD).unwrap();
        let sum = total_account_debt(&engine, &accounts);
        prop_assert!((total - sum).abs() < dec!(0.01), "pool {} vs shares {}", total, sum);
    }

    /// Conservation survives exchanges and price moves: fee value leaving the
    /// pool shrinks every share proportionally, never selectively.
    #[test]
    fn debt_conservation_under_exchanges(
        trades in proptest::collection::vec((1i64..50_000i64, any::<bool>()), 1..15),
        final_price in 50i64..200i64,
    ) {
        let mut engine = Engine::new(SystemSettings::default()).unwrap();
        engine.update_rate(COLLATERAL, dec!(1)).unwrap();
        let btc = CurrencyKey::new("sBTC");
        engine.update_rate(btc, dec!(100)).unwrap();

        let alice = AccountId(1);
        let bob = AccountId(2);
        for a in [alice, bob] {
            engine.deposit_collateral(a, dec!(1_000_000)).unwrap();
            engine.issue_synths(a, dec!(100_000)).unwrap();
        }

        for (raw, use_bob) in trades {
            let account = if use_bob { bob } else { alice };
            let amount = Decimal::new(raw, 1);
            if engine.synth_balance(account, USD) >= amount {
                engine.exchange(account, USD, amount, btc, account).unwrap();
            }
        }
        engine.update_rate(btc, Decimal::from(final_price)).unwrap();

        let total = engine.total_issued_synths(USD).unwrap();
        let sum = total_account_debt(&engine, &[alice, bob]);
        prop_assert!((total - sum).abs() < dec!(0.01), "pool {} vs shares {}", total, sum);
    }

    /// An account that fully burns is gone from the pool: the survivors carry
    /// exactly the remaining total.
    #[test]
    fn full_exit_leaves_survivors_whole(
        alice_mint in 100_00i64..1_000_000_00i64,
        bob_mint in 100_00i64..1_000_000_00i64,
    ) {
        let mut engine = Engine::new(SystemSettings::default()).unwrap();
        engine.update_rate(COLLATERAL, dec!(1)).unwrap();
        let alice = AccountId(1);
        let bob = AccountId(2);
        for a in [alice, bob] {
            engine.deposit_collateral(a, dec!(10_000_000)).unwrap();
        }

        let alice_amount = Decimal::new(alice_mint, 2);
        let bob_amount = Decimal::new(bob_mint, 2);
        engine.issue_synths(alice, alice_amount).unwrap();
        engine.issue_synths(bob, bob_amount).unwrap();

        // bob exits completely
        let bob_debt = engine.debt_balance_of(bob, USD).unwrap();
        engine.burn_synths(bob, bob_debt.min(engine.synth_balance(bob, USD))).unwrap();

        let bob_after = engine.debt_balance_of(bob, USD).unwrap();
        let alice_after = engine.debt_balance_of(alice, USD).unwrap();
        let total = engine.total_issued_synths(USD).unwrap();

        prop_assert!(bob_after < dec!(0.01), "bob still owes {}", bob_after);
        prop_assert!((alice_after - total).abs() < dec!(0.01), "alice {} vs pool {}", alice_after, total);
    }
}

/// Withdrawal can never free collateral that still backs debt.
#[test]
fn withdrawal_blocked_below_backing() {
    let mut engine = Engine::new(SystemSettings::default()).unwrap();
    engine.update_rate(COLLATERAL, dec!(1)).unwrap();
    let alice = AccountId(1);
    engine.deposit_collateral(alice, dec!(10_000)).unwrap();
    engine.issue_synths(alice, dec!(4_000)).unwrap();

    // $8,000 is locked behind the 0.5 issuance ratio
    assert_eq!(engine.transferable_collateral(alice).unwrap(), dec!(2_000));
    assert!(engine.withdraw_collateral(alice, dec!(2_000)).is_ok());
    assert!(matches!(
        engine.withdraw_collateral(alice, dec!(1)),
        Err(EngineError::InsufficientCollateral { .. })
    ));

    // burning frees the rest
    engine.burn_synths(alice, dec!(4_000)).unwrap();
    assert!(engine.withdraw_collateral(alice, dec!(8_000)).is_ok());
    assert_eq!(engine.collateral_balance(alice), dec!(0));
}
