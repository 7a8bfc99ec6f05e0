// 14.0 engine/core.rs: the protocol engine. owns every ledger and collaborator;
// all state mutation flows through &mut self, so calls are globally serialized by
// construction. no locks, no reentrancy.

use super::results::EngineError;
use crate::config::SystemSettings;
use crate::debt_ledger::DebtLedger;
use crate::events::{CollateralEvent, Event, EventId, EventPayload};
use crate::exchange_state::ExchangeState;
use crate::liquidations::LiquidationBook;
use crate::rates::RateStore;
use crate::rewards::TradingRewards;
use crate::status::SystemStatus;
use crate::synths::SynthLedger;
use crate::types::{AccountId, CurrencyKey, RoundId, Timestamp, COLLATERAL};
use rust_decimal::Decimal;
use std::collections::HashMap;

use super::issuance::AccountIssuanceData;

#[derive(Debug)]
pub struct Engine {
    pub(super) settings: SystemSettings,
    pub(super) status: SystemStatus,
    pub(super) rates: RateStore,
    pub(super) synths: SynthLedger,
    pub(super) debt_ledger: DebtLedger,
    pub(super) issuance: HashMap<AccountId, AccountIssuanceData>,
    pub(super) exchange_state: ExchangeState,
    pub(super) liquidations: LiquidationBook,
    pub(super) rewards: TradingRewards,
    // collateral token units staked per account
    pub(super) collateral: HashMap<AccountId, Decimal>,
    pub(super) events: Vec<Event>,
    pub(super) next_event_id: u64,
    pub(super) current_time: Timestamp,
    pub(super) current_block: u64,
    pub(super) atomic_volume_this_block: Decimal,
}

impl Engine {
    pub fn new(settings: SystemSettings) -> Result<Self, EngineError> {
        settings.validate()?;
        let rates = RateStore::new(settings.rate_stale_period_secs);
        Ok(Self {
            settings,
            status: SystemStatus::new(),
            rates,
            synths: SynthLedger::new(),
            debt_ledger: DebtLedger::new(),
            issuance: HashMap::new(),
            exchange_state: ExchangeState::new(),
            liquidations: LiquidationBook::new(),
            rewards: TradingRewards::new(),
            collateral: HashMap::new(),
            events: Vec::new(),
            next_event_id: 1,
            current_time: Timestamp::from_millis(0),
            current_block: 0,
            atomic_volume_this_block: Decimal::ZERO,
        })
    }

    // logical clock

    pub fn set_time(&mut self, timestamp: Timestamp) {
        self.current_time = timestamp;
    }

    pub fn time(&self) -> Timestamp {
        self.current_time
    }

    pub fn advance_time(&mut self, millis: i64) {
        self.current_time = Timestamp::from_millis(self.current_time.as_millis() + millis);
    }

    // block counter; the atomic volume cap is per block
    pub fn advance_block(&mut self) {
        self.current_block += 1;
        self.atomic_volume_this_block = Decimal::ZERO;
    }

    pub fn current_block(&self) -> u64 {
        self.current_block
    }

    // rates and status passthroughs

    pub fn update_rate(&mut self, currency: CurrencyKey, rate: Decimal) -> Result<RoundId, EngineError> {
        Ok(self.rates.update_rate(currency, rate, self.current_time)?)
    }

    pub fn rates(&self) -> &RateStore {
        &self.rates
    }

    pub fn status_mut(&mut self) -> &mut SystemStatus {
        &mut self.status
    }

    pub fn settings(&self) -> &SystemSettings {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut SystemSettings {
        &mut self.settings
    }

    // collateral staking

    pub fn deposit_collateral(&mut self, account: AccountId, amount: Decimal) -> Result<(), EngineError> {
        self.status.require_system_active()?;
        if amount <= Decimal::ZERO {
            return Err(EngineError::InvalidInput(format!(
                "collateral deposit must be positive, got {amount}"
            )));
        }
        let balance = self.collateral.entry(account).or_insert(Decimal::ZERO);
        *balance += amount;
        let new_balance = *balance;
        self.emit_event(EventPayload::CollateralDeposited(CollateralEvent {
            account,
            amount,
            new_balance,
        }));
        Ok(())
    }

    /// Withdrawal is limited to collateral not backing debt at the issuance ratio.
    pub fn withdraw_collateral(&mut self, account: AccountId, amount: Decimal) -> Result<(), EngineError> {
        self.status.require_system_active()?;
        if amount <= Decimal::ZERO {
            return Err(EngineError::InvalidInput(format!(
                "collateral withdrawal must be positive, got {amount}"
            )));
        }
        let free = self.transferable_collateral(account)?;
        if amount > free {
            return Err(EngineError::InsufficientCollateral {
                requested: amount,
                issuable: free,
            });
        }
        let balance = self.collateral.entry(account).or_insert(Decimal::ZERO);
        *balance -= amount;
        let new_balance = *balance;
        self.emit_event(EventPayload::CollateralWithdrawn(CollateralEvent {
            account,
            amount,
            new_balance,
        }));
        Ok(())
    }

    pub fn collateral_balance(&self, account: AccountId) -> Decimal {
        self.collateral.get(&account).copied().unwrap_or(Decimal::ZERO)
    }

    /// Collateral valued in USD at the current rate.
    pub fn collateral_value(&self, account: AccountId) -> Result<Decimal, EngineError> {
        let units = self.collateral_balance(account);
        if units.is_zero() {
            return Ok(Decimal::ZERO);
        }
        Ok(self
            .rates
            .effective_value(COLLATERAL, units, crate::types::USD, self.current_time)?)
    }

    /// Collateral units not locked behind outstanding debt.
    pub fn transferable_collateral(&self, account: AccountId) -> Result<Decimal, EngineError> {
        let balance = self.collateral_balance(account);
        let debt = self.debt_balance_of(account, crate::types::USD)?;
        if debt.is_zero() {
            return Ok(balance);
        }
        let rate = self.rates.rate(COLLATERAL, self.current_time)?;
        // units needed so that debt / (units * rate) == issuance_ratio
        let locked_value = crate::decimal::divide_round(debt, self.settings.issuance_ratio)?;
        let locked_units = crate::decimal::divide_round(locked_value, rate)?;
        Ok((balance - locked_units).max(Decimal::ZERO))
    }

    // synth views

    pub fn synth_balance(&self, account: AccountId, currency: CurrencyKey) -> Decimal {
        self.synths.balance_of(currency, account)
    }

    pub fn synth_total_supply(&self, currency: CurrencyKey) -> Decimal {
        self.synths.total_supply(currency)
    }

    // audit log

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn recent_events(&self, count: usize) -> &[Event] {
        let start = self.events.len().saturating_sub(count);
        &self.events[start..]
    }

    pub(super) fn emit_event(&mut self, payload: EventPayload) {
        let event = Event::new(EventId(self.next_event_id), self.current_time, payload);
        self.next_event_id += 1;
        self.events.push(event);

        if self.events.len() > self.settings.max_events {
            let drain_count = self.events.len() - self.settings.max_events;
            self.events.drain(0..drain_count);
        }
    }
}
