// 14.2 engine/exchanging.rs: synth-to-synth conversion. per call:
// validate -> settle pending -> fee compute -> execute -> record.
// the atomic variant prices off a TWAP, caps per-block volume, and skips the
// settlement queue entirely.

use super::core::Engine;
use super::results::{EngineError, ExchangeResult, SettlementResult};
use crate::decimal::{divide_round, multiply_round};
use crate::events::{EventPayload, FeeRecordedEvent, SettlementEvent, SynthExchangedEvent};
use crate::exchange_state::ExchangeEntry;
use crate::fees;
use crate::types::{AccountId, CurrencyKey, RoundId};
use rust_decimal::Decimal;

impl Engine {
    // 14.2.1: the standard exchange. proceeds enter the settlement queue and stay
    // reclaimable until the waiting period elapses.
    pub fn exchange(
        &mut self,
        account: AccountId,
        src: CurrencyKey,
        amount: Decimal,
        dest: CurrencyKey,
        destination_holder: AccountId,
    ) -> Result<ExchangeResult, EngineError> {
        self.status.require_synth_active(src)?;
        self.status.require_synth_active(dest)?;
        if amount <= Decimal::ZERO {
            return Err(EngineError::InvalidInput(format!(
                "exchange amount must be positive, got {amount}"
            )));
        }
        // self-exchange is a no-op with zero fee
        if src == dest {
            return Ok(ExchangeResult {
                amount_received: amount,
                fee: Decimal::ZERO,
                fee_rate: Decimal::ZERO,
                entries_settled: 0,
            });
        }

        // settle whatever already elapsed, before the new exchange consumes balance
        let settled = self.settle(account, src)?;

        let fee_rate = fees::exchange_fee_rate(
            &self.rates,
            src,
            dest,
            self.settings.exchange_fee_rate_for(src),
            self.settings.exchange_fee_rate_for(dest),
            &self.settings.dynamic_fee,
        )?;

        let now = self.current_time;
        let src_rate = self.rates.rate(src, now)?;
        let dest_rate = self.rates.rate(dest, now)?;
        let usd_value = multiply_round(amount, src_rate)?;
        let dest_before_fee = divide_round(usd_value, dest_rate)?;
        let fee = multiply_round(dest_before_fee, fee_rate)?;
        let amount_received = dest_before_fee - fee;
        if amount_received <= Decimal::ZERO {
            return Err(EngineError::InvalidInput(format!(
                "exchange of {amount} {src} yields nothing after fees"
            )));
        }

        // execute: all validation and rate reads are behind us
        self.synths.burn(src, account, amount)?;
        self.synths
            .mint(dest, destination_holder, amount_received)?;

        let fee_usd = multiply_round(fee, dest_rate)?;
        self.record_exchange_fee(account, fee_usd);

        // record: queue the proceeds for the waiting period
        if self.settings.waiting_period_secs > 0 {
            let entry = ExchangeEntry {
                src,
                amount,
                dest,
                amount_received,
                exchange_fee_rate: fee_rate,
                timestamp: now,
                round_id_for_src: self.rates.current_round_id(src).unwrap_or(RoundId(0)),
                round_id_for_dest: self.rates.current_round_id(dest).unwrap_or(RoundId(0)),
            };
            self.exchange_state.append(destination_holder, entry);
        }

        self.emit_event(EventPayload::SynthExchanged(SynthExchangedEvent {
            account,
            src,
            amount,
            dest,
            amount_received,
            fee_rate,
            destination_holder,
        }));

        Ok(ExchangeResult {
            amount_received,
            fee,
            fee_rate,
            entries_settled: settled.num_entries_settled,
        })
    }

    // 14.2.2: settlement. every entry past the waiting period is re-priced at
    // current rates with its recorded fee: a drop in value is reclaimed from the
    // holder, a rise is rebated. the plan is computed in full before any state
    // moves, so a stale rate aborts with nothing applied.
    pub fn settle(
        &mut self,
        account: AccountId,
        currency: CurrencyKey,
    ) -> Result<SettlementResult, EngineError> {
        let waiting = self.settings.waiting_period_secs;
        let now = self.current_time;

        struct Planned {
            slot: usize,
            reclaim: Decimal,
            rebate: Decimal,
        }
        let mut plan: Vec<Planned> = Vec::new();

        for (slot, entry) in self.exchange_state.entries(account, currency) {
            if !entry.waiting_period_elapsed(waiting, now) {
                continue;
            }
            let src_rate = self.rates.rate(entry.src, now)?;
            let dest_rate = self.rates.rate(entry.dest, now)?;
            let usd_value = multiply_round(entry.amount, src_rate)?;
            let dest_now = divide_round(usd_value, dest_rate)?;
            let fee_now = multiply_round(dest_now, entry.exchange_fee_rate)?;
            let should_have_received = dest_now - fee_now;

            let (reclaim, rebate) = if should_have_received < entry.amount_received {
                (entry.amount_received - should_have_received, Decimal::ZERO)
            } else {
                (Decimal::ZERO, should_have_received - entry.amount_received)
            };
            plan.push(Planned { slot, reclaim, rebate });
        }

        let mut result = SettlementResult::empty();
        for item in plan {
            self.exchange_state.remove(account, currency, item.slot);
            if item.reclaim > Decimal::ZERO {
                // capped at balance: a reclaim takes what is there
                let taken = self.synths.burn_up_to(currency, account, item.reclaim);
                result.reclaimed += taken;
                self.emit_event(EventPayload::ExchangeReclaim(SettlementEvent {
                    account,
                    currency,
                    amount: taken,
                }));
            } else if item.rebate > Decimal::ZERO {
                self.synths.mint(currency, account, item.rebate)?;
                result.rebated += item.rebate;
                self.emit_event(EventPayload::ExchangeRebate(SettlementEvent {
                    account,
                    currency,
                    amount: item.rebate,
                }));
            }
            result.num_entries_settled += 1;
        }
        Ok(result)
    }

    // 14.2.3: atomic exchange. TWAP pricing resists single-round manipulation,
    // the flat fee replaces the dynamic one, and a per-block USD volume cap
    // bounds how much can bypass the waiting period at once.
    pub fn exchange_atomically(
        &mut self,
        account: AccountId,
        src: CurrencyKey,
        amount: Decimal,
        dest: CurrencyKey,
        destination_holder: AccountId,
        min_amount: Decimal,
    ) -> Result<ExchangeResult, EngineError> {
        self.status.require_synth_active(src)?;
        self.status.require_synth_active(dest)?;
        if amount <= Decimal::ZERO {
            return Err(EngineError::InvalidInput(format!(
                "exchange amount must be positive, got {amount}"
            )));
        }
        if src == dest {
            return Ok(ExchangeResult {
                amount_received: amount,
                fee: Decimal::ZERO,
                fee_rate: Decimal::ZERO,
                entries_settled: 0,
            });
        }

        let settled = self.settle(account, src)?;

        let now = self.current_time;
        let window = self.settings.atomic_twap_window_secs;
        let src_rate = self.rates.twap(src, window, now)?;
        let dest_rate = self.rates.twap(dest, window, now)?;

        let usd_value = multiply_round(amount, src_rate)?;
        let cap = self.settings.atomic_max_volume_per_block;
        if self.atomic_volume_this_block + usd_value > cap {
            return Err(EngineError::AtomicVolumeExceeded {
                block_volume: self.atomic_volume_this_block,
                requested: usd_value,
                cap,
            });
        }

        let fee_rate = self.settings.atomic_exchange_fee_rate;
        let dest_before_fee = divide_round(usd_value, dest_rate)?;
        let fee = multiply_round(dest_before_fee, fee_rate)?;
        let amount_received = dest_before_fee - fee;
        if amount_received < min_amount {
            return Err(EngineError::SlippageExceeded {
                received: amount_received,
                min_amount,
            });
        }
        if amount_received <= Decimal::ZERO {
            return Err(EngineError::InvalidInput(format!(
                "exchange of {amount} {src} yields nothing after fees"
            )));
        }

        self.synths.burn(src, account, amount)?;
        self.synths
            .mint(dest, destination_holder, amount_received)?;
        self.atomic_volume_this_block += usd_value;

        let dest_spot = self.rates.rate(dest, now).unwrap_or(dest_rate);
        let fee_usd = multiply_round(fee, dest_spot)?;
        self.record_exchange_fee(account, fee_usd);

        self.emit_event(EventPayload::AtomicSynthExchanged(SynthExchangedEvent {
            account,
            src,
            amount,
            dest,
            amount_received,
            fee_rate,
            destination_holder,
        }));

        Ok(ExchangeResult {
            amount_received,
            fee,
            fee_rate,
            entries_settled: settled.num_entries_settled,
        })
    }

    // transfer guards

    pub fn max_secs_left_in_waiting_period(&self, account: AccountId, currency: CurrencyKey) -> i64 {
        self.exchange_state.max_secs_left_in_waiting_period(
            account,
            currency,
            self.settings.waiting_period_secs,
            self.current_time,
        )
    }

    pub fn has_waiting_period_or_settlement_owing(&self, account: AccountId, currency: CurrencyKey) -> bool {
        self.exchange_state.has_entries(account, currency)
    }

    /// Balance minus everything still exposed to reclaim: the full received
    /// amount of every live queue entry stays locked until settled.
    pub fn transferable_balance(&self, account: AccountId, currency: CurrencyKey) -> Decimal {
        let balance = self.synths.balance_of(currency, account);
        let locked: Decimal = self
            .exchange_state
            .entries(account, currency)
            .iter()
            .map(|(_, e)| e.amount_received)
            .sum();
        (balance - locked).max(Decimal::ZERO)
    }

    /// Plain transfer, guarded: only the transferable portion may move.
    pub fn transfer_synths(
        &mut self,
        from: AccountId,
        to: AccountId,
        currency: CurrencyKey,
        amount: Decimal,
    ) -> Result<(), EngineError> {
        self.status.require_synth_active(currency)?;
        let transferable = self.transferable_balance(from, currency);
        if amount > transferable {
            return Err(EngineError::Token(crate::synths::TokenError::InsufficientBalance {
                currency,
                requested: amount,
                available: transferable,
            }));
        }
        self.synths.transfer(currency, from, to, amount)?;
        Ok(())
    }

    // 14.2.4: settle-then-transfer. both variants compare the post-settlement
    // balance with >=, so transferring exactly the remaining balance succeeds.
    pub fn transfer_and_settle(
        &mut self,
        from: AccountId,
        to: AccountId,
        currency: CurrencyKey,
        amount: Decimal,
    ) -> Result<SettlementResult, EngineError> {
        self.status.require_synth_active(currency)?;
        let settled = self.settle(from, currency)?;
        let balance = self.synths.balance_of(currency, from);
        if balance >= amount {
            self.synths.transfer(currency, from, to, amount)?;
            Ok(settled)
        } else {
            Err(EngineError::Token(crate::synths::TokenError::InsufficientBalance {
                currency,
                requested: amount,
                available: balance,
            }))
        }
    }

    /// Operator-initiated variant. Allowance bookkeeping lives outside this
    /// core; the settlement and balance semantics are identical to
    /// `transfer_and_settle`, including the `>=` comparison.
    pub fn transfer_from_and_settle(
        &mut self,
        _operator: AccountId,
        from: AccountId,
        to: AccountId,
        currency: CurrencyKey,
        amount: Decimal,
    ) -> Result<SettlementResult, EngineError> {
        self.transfer_and_settle(from, to, currency, amount)
    }

    fn record_exchange_fee(&mut self, account: AccountId, fee_usd: Decimal) {
        if fee_usd <= Decimal::ZERO {
            return;
        }
        let period_index = self.rewards.current_period_index();
        self.rewards.record_fee(account, fee_usd);
        self.emit_event(EventPayload::FeeRecorded(FeeRecordedEvent {
            account,
            usd_fee: fee_usd,
            period_index,
        }));
    }

    // trading rewards surface

    pub fn close_rewards_period(&mut self, total_rewards: Decimal) -> usize {
        let index = self.rewards.close_current_period(total_rewards);
        let recorded_fees = self
            .rewards
            .period(index)
            .map(|p| p.recorded_fees)
            .unwrap_or(Decimal::ZERO);
        self.emit_event(EventPayload::PeriodFinalized(crate::events::PeriodFinalizedEvent {
            period_index: index,
            recorded_fees,
            total_rewards,
        }));
        index
    }

    /// Pays a finalized period's fee-proportional reward out as USD synths.
    pub fn claim_rewards(&mut self, account: AccountId, period_index: usize) -> Result<Decimal, EngineError> {
        self.status.require_synth_active(crate::types::USD)?;
        let amount = self.rewards.claim(account, period_index)?;
        self.synths.mint(crate::types::USD, account, amount)?;
        self.emit_event(EventPayload::RewardsClaimed(crate::events::RewardsClaimedEvent {
            account,
            period_index,
            amount,
        }));
        Ok(amount)
    }

    pub fn claimable_rewards(&self, account: AccountId, period_index: usize) -> Result<Decimal, EngineError> {
        Ok(self.rewards.claimable(account, period_index)?)
    }
}
