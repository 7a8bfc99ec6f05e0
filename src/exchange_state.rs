// 6.0: the settlement queue. one FIFO per (account, destination currency) holding
// exchange entries that are still inside the waiting period or not yet settled.
// storage is an arena with a [start, end) live window: settled entries are
// tombstoned in place (slot cleared) and `start` advances lazily past leading
// tombstones, so settlement never shifts the tail.

use crate::types::{AccountId, CurrencyKey, RoundId, Timestamp};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExchangeEntry {
    pub src: CurrencyKey,
    pub amount: Decimal,
    pub dest: CurrencyKey,
    pub amount_received: Decimal,
    pub exchange_fee_rate: Decimal,
    pub timestamp: Timestamp,
    pub round_id_for_src: RoundId,
    pub round_id_for_dest: RoundId,
}

impl ExchangeEntry {
    pub fn secs_left_in_waiting_period(&self, waiting_period_secs: i64, now: Timestamp) -> i64 {
        let elapsed = self.timestamp.elapsed_secs(&now);
        (waiting_period_secs - elapsed).max(0)
    }

    pub fn waiting_period_elapsed(&self, waiting_period_secs: i64, now: Timestamp) -> bool {
        self.secs_left_in_waiting_period(waiting_period_secs, now) == 0
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct EntryQueue {
    slots: Vec<Option<ExchangeEntry>>,
    start: usize,
    live: usize,
}

impl EntryQueue {
    fn push(&mut self, entry: ExchangeEntry) {
        self.slots.push(Some(entry));
        self.live += 1;
    }

    fn clear_slot(&mut self, index: usize) -> Option<ExchangeEntry> {
        let taken = self.slots.get_mut(index)?.take();
        if taken.is_some() {
            self.live -= 1;
            // advance past leading tombstones; amortized O(1) per removal
            while self.start < self.slots.len() && self.slots[self.start].is_none() {
                self.start += 1;
            }
            if self.live == 0 {
                self.slots.clear();
                self.start = 0;
            }
        }
        taken
    }

    fn live_entries(&self) -> impl Iterator<Item = (usize, &ExchangeEntry)> {
        let start = self.start;
        self.slots[start..]
            .iter()
            .enumerate()
            .filter_map(move |(offset, slot)| slot.as_ref().map(|e| (start + offset, e)))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExchangeState {
    queues: HashMap<(AccountId, CurrencyKey), EntryQueue>,
}

impl ExchangeState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, account: AccountId, entry: ExchangeEntry) {
        self.queues
            .entry((account, entry.dest))
            .or_default()
            .push(entry);
    }

    /// Live entries for (account, currency) in insertion order, with their slot index.
    pub fn entries(&self, account: AccountId, currency: CurrencyKey) -> Vec<(usize, &ExchangeEntry)> {
        self.queues
            .get(&(account, currency))
            .map(|q| q.live_entries().collect())
            .unwrap_or_default()
    }

    pub fn num_entries(&self, account: AccountId, currency: CurrencyKey) -> usize {
        self.queues
            .get(&(account, currency))
            .map(|q| q.live)
            .unwrap_or(0)
    }

    pub fn remove(
        &mut self,
        account: AccountId,
        currency: CurrencyKey,
        slot_index: usize,
    ) -> Option<ExchangeEntry> {
        self.queues
            .get_mut(&(account, currency))
            .and_then(|q| q.clear_slot(slot_index))
    }

    // 6.1: the transfer guard. while any entry is still waiting, value that might
    // be reclaimed must not leave the account.
    pub fn max_secs_left_in_waiting_period(
        &self,
        account: AccountId,
        currency: CurrencyKey,
        waiting_period_secs: i64,
        now: Timestamp,
    ) -> i64 {
        self.entries(account, currency)
            .iter()
            .map(|(_, e)| e.secs_left_in_waiting_period(waiting_period_secs, now))
            .max()
            .unwrap_or(0)
    }

    pub fn has_entries(&self, account: AccountId, currency: CurrencyKey) -> bool {
        self.num_entries(account, currency) > 0
    }
}
