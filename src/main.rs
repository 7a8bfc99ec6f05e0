//! Synthetic Asset Protocol Simulation.
//!
//! Demonstrates the full engine lifecycle including collateral staking, debt
//! issuance, synth exchanges with waiting-period settlement, dynamic fees under
//! volatility, atomic swaps, liquidations, and trading rewards.

use rust_decimal_macros::dec;
use synth_core::*;

fn main() {
    println!("Synthetic Asset Protocol Engine Simulation");
    println!("Shared Debt Pool, Proportional Ledger, Full Lifecycle\n");

    scenario_1_staking_lifecycle();
    scenario_2_exchange_and_settlement();
    scenario_3_dynamic_fees();
    scenario_4_atomic_exchange();
    scenario_5_liquidation();
    scenario_6_trading_rewards();

    println!("\nAll simulations completed successfully.");
}

/// Collateral in, synths out, debt tracked, synths burned back.
fn scenario_1_staking_lifecycle() {
    println!("Scenario 1: Staking Lifecycle\n");

    let mut engine = Engine::new(SystemSettings::default()).unwrap();
    let alice = AccountId(1);

    engine.update_rate(COLLATERAL, dec!(2)).unwrap();
    engine.deposit_collateral(alice, dec!(10000)).unwrap();

    println!("  Alice stakes 10,000 COLL at $2 = $20,000");
    println!("  Max issuable at 200% collateralization: ${}", engine.max_issuable(alice).unwrap());

    engine.issue_synths(alice, dec!(8000)).unwrap();
    println!("  Minted 8,000 sUSD, debt: ${}", engine.debt_balance_of(alice, USD).unwrap());
    println!("  Issuance ratio: {}", engine.issuance_ratio_of(alice).unwrap());

    engine.burn_synths(alice, dec!(3000)).unwrap();
    println!("  Burned 3,000 sUSD, debt: ${}", engine.debt_balance_of(alice, USD).unwrap());
    println!("  Transferable collateral: {} COLL\n", engine.transferable_collateral(alice).unwrap());
}

/// Exchange into sBTC, wait out the period, settle against the moved price.
fn scenario_2_exchange_and_settlement() {
    println!("Scenario 2: Exchange and Settlement\n");

    let mut engine = Engine::new(SystemSettings::default()).unwrap();
    let alice = AccountId(1);
    let btc = CurrencyKey::new("sBTC");

    engine.update_rate(COLLATERAL, dec!(1)).unwrap();
    engine.update_rate(btc, dec!(50000)).unwrap();
    engine.deposit_collateral(alice, dec!(100000)).unwrap();
    engine.issue_synths(alice, dec!(40000)).unwrap();

    let result = engine.exchange(alice, USD, dec!(20000), btc, alice).unwrap();
    println!("  Exchanged 20,000 sUSD -> {} sBTC (fee rate {})", result.amount_received, result.fee_rate);
    println!("  Waiting period: {}s remaining", engine.max_secs_left_in_waiting_period(alice, btc));
    println!("  Transferable sBTC while waiting: {}", engine.transferable_balance(alice, btc));

    engine.advance_time(361 * 1000);
    engine.update_rate(btc, dec!(51000)).unwrap();

    let settled = engine.settle(alice, btc).unwrap();
    println!("  Price moved $50,000 -> $51,000, settled {} entries", settled.num_entries_settled);
    println!("  Reclaimed: {} sBTC, rebated: {} sBTC", settled.reclaimed, settled.rebated);
    println!("  Final sBTC balance: {}\n", engine.synth_balance(alice, btc));
}

/// The dynamic fee prices recent volatility in, and caps out at rejection.
fn scenario_3_dynamic_fees() {
    println!("Scenario 3: Dynamic Fees Under Volatility\n");

    let mut engine = Engine::new(SystemSettings::default()).unwrap();
    let alice = AccountId(1);
    let btc = CurrencyKey::new("sBTC");

    engine.update_rate(COLLATERAL, dec!(1)).unwrap();
    engine.update_rate(btc, dec!(50000)).unwrap();
    engine.deposit_collateral(alice, dec!(100000)).unwrap();
    engine.issue_synths(alice, dec!(40000)).unwrap();

    let calm = engine.exchange(alice, USD, dec!(1000), btc, alice).unwrap();
    println!("  Calm market fee rate: {}", calm.fee_rate);

    // +0.8% jump: over the 0.4% threshold, fee rises
    engine.update_rate(btc, dec!(50400)).unwrap();
    let deviation = fees::latest_round_deviation(engine.rates(), btc).unwrap();
    let choppy = engine.exchange(alice, USD, dec!(1000), btc, alice).unwrap();
    println!("  After a {deviation} jump: {}", choppy.fee_rate);

    // +11% jump: past the dynamic cap, exchange refused
    engine.update_rate(btc, dec!(56000)).unwrap();
    match engine.exchange(alice, USD, dec!(1000), btc, alice) {
        Err(err) => println!("  After an 11% jump: rejected ({err})\n"),
        Ok(_) => println!("  Unexpected acceptance\n"),
    }
}

/// Atomic swaps: TWAP priced, instantly transferable, volume capped per block.
fn scenario_4_atomic_exchange() {
    println!("Scenario 4: Atomic Exchange\n");

    let mut engine = Engine::new(SystemSettings::default()).unwrap();
    engine.settings_mut().atomic_max_volume_per_block = dec!(50000);
    let alice = AccountId(1);
    let btc = CurrencyKey::new("sBTC");

    engine.update_rate(COLLATERAL, dec!(1)).unwrap();
    engine.update_rate(btc, dec!(50000)).unwrap();
    engine.deposit_collateral(alice, dec!(200000)).unwrap();
    engine.issue_synths(alice, dec!(80000)).unwrap();
    engine.advance_time(600 * 1000);

    let result = engine.exchange_atomically(alice, USD, dec!(30000), btc, alice, dec!(0)).unwrap();
    println!("  Swapped 30,000 sUSD -> {} sBTC at the TWAP", result.amount_received);
    println!("  No waiting period: {} sBTC transferable now", engine.transferable_balance(alice, btc));

    match engine.exchange_atomically(alice, USD, dec!(30000), btc, alice, dec!(0)) {
        Err(err) => println!("  Second swap in the same block: rejected ({err})"),
        Ok(_) => println!("  Unexpected acceptance"),
    }

    engine.advance_block();
    let retry = engine.exchange_atomically(alice, USD, dec!(30000), btc, alice, dec!(0)).unwrap();
    println!("  Next block: swap passes, received {} sBTC\n", retry.amount_received);
}

/// Flag, wait out the delay, force-liquidate back to the target ratio.
fn scenario_5_liquidation() {
    println!("Scenario 5: Liquidation\n");

    let mut engine = Engine::new(SystemSettings::default()).unwrap();
    let alice = AccountId(1);
    let bob = AccountId(2);

    engine.update_rate(COLLATERAL, dec!(2)).unwrap();
    engine.deposit_collateral(alice, dec!(2000)).unwrap();
    engine.issue_synths(alice, dec!(1350)).unwrap();

    engine.update_rate(COLLATERAL, dec!(1)).unwrap();
    println!("  COLL halves to $1, Alice's ratio: {}", engine.issuance_ratio_of(alice).unwrap());

    engine.deposit_collateral(bob, dec!(4000)).unwrap();
    engine.issue_synths(bob, dec!(1000)).unwrap();

    let deadline = engine.flag_account_for_liquidation(bob, alice).unwrap();
    println!("  Bob flags Alice, liquidation opens at t={}s", deadline.as_millis() / 1000);

    engine.advance_time((8 * 3600 + 1) * 1000);
    engine.update_rate(COLLATERAL, dec!(1)).unwrap();

    let result = engine.liquidate_account(bob, alice).unwrap();
    println!("  Bob burns ${} sUSD, redeems ${} of collateral", result.debt_removed, result.collateral_redeemed);
    println!("  Rewards: ${} flag + ${} liquidate", result.flag_reward_paid, result.liquidate_reward_paid);
    println!("  Alice's ratio after: {}", engine.issuance_ratio_of(alice).unwrap());
    println!("  Still flagged: {}\n", engine.is_flagged_for_liquidation(alice));
}

/// Exchange fees accumulate into a rewards period, claimed pro rata.
fn scenario_6_trading_rewards() {
    println!("Scenario 6: Trading Rewards\n");

    let mut engine = Engine::new(SystemSettings::default()).unwrap();
    let alice = AccountId(1);
    let btc = CurrencyKey::new("sBTC");

    engine.update_rate(COLLATERAL, dec!(1)).unwrap();
    engine.update_rate(btc, dec!(50000)).unwrap();
    engine.deposit_collateral(alice, dec!(100000)).unwrap();
    engine.issue_synths(alice, dec!(40000)).unwrap();

    engine.exchange(alice, USD, dec!(5000), btc, alice).unwrap();
    engine.exchange(alice, USD, dec!(5000), btc, alice).unwrap();

    let period = engine.close_rewards_period(dec!(500));
    println!("  Recorded $60 of fees, period {} closed with a $500 budget", period);

    let claimable = engine.claimable_rewards(alice, period).unwrap();
    let paid = engine.claim_rewards(alice, period).unwrap();
    println!("  Alice claimable: ${}, claimed: ${}", claimable, paid);
    println!("  Events generated: {}", engine.events().len());
}
