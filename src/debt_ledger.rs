// 5.0: the debt ledger. an append-only chain of cumulative multiplicative factors,
// one per system-wide debt event. an account stores a single ownership fraction plus
// the chain index at which it was written; its current share of the pool is
// ownership * (last / entry_at(index)). O(1) append, O(1) lookup, and no per-account
// rewrite on any global event. this chain is the core of the whole protocol.

use crate::decimal::{multiply_round_floor, MathError, UNIT};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DebtLedger {
    // cumulative factors, 18dp, floor-rounded. never mutated, never truncated.
    entries: Vec<Decimal>,
}

impl DebtLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Cumulative factor of the most recent entry, UNIT when the chain is empty.
    pub fn last_entry(&self) -> Decimal {
        self.entries.last().copied().unwrap_or(UNIT)
    }

    pub fn entry_at(&self, index: usize) -> Option<Decimal> {
        self.entries.get(index).copied()
    }

    // 5.1: append the next cumulative factor: last * delta, truncated at 18dp.
    // truncation biases the chain downward, so projection can only under-count
    // an account's share, never invent debt.
    pub fn append(&mut self, delta: Decimal) -> Result<(), MathError> {
        let next = multiply_round_floor(self.last_entry(), delta)?;
        self.entries.push(next);
        Ok(())
    }

    /// Seeds the chain with an explicit value; used only for the first-ever
    /// issuance event when there is no previous entry to multiply against.
    pub fn append_raw(&mut self, value: Decimal) {
        self.entries.push(value);
    }

    /// Growth factor of the pool between a stored index and the chain head.
    pub fn ratio_since(&self, index: usize) -> Result<Decimal, MathError> {
        let at_index = self.entry_at(index).unwrap_or(UNIT);
        crate::decimal::divide_round_floor(self.last_entry(), at_index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn empty_chain_reads_unit() {
        let ledger = DebtLedger::new();
        assert_eq!(ledger.last_entry(), dec!(1));
        assert_eq!(ledger.len(), 0);
    }

    #[test]
    fn append_composes_multiplicatively() {
        let mut ledger = DebtLedger::new();
        ledger.append_raw(dec!(1));
        ledger.append(dec!(0.5)).unwrap();
        ledger.append(dec!(2)).unwrap();

        assert_eq!(ledger.len(), 3);
        assert_eq!(ledger.entry_at(0).unwrap(), dec!(1));
        assert_eq!(ledger.entry_at(1).unwrap(), dec!(0.5));
        assert_eq!(ledger.last_entry(), dec!(1));
    }

    #[test]
    fn ratio_since_tracks_dilution() {
        let mut ledger = DebtLedger::new();
        ledger.append_raw(dec!(1));
        ledger.append(dec!(0.8)).unwrap();
        ledger.append(dec!(0.5)).unwrap();

        // pool diluted to 0.4 of what it was at entry 0
        assert_eq!(ledger.ratio_since(0).unwrap(), dec!(0.4));
        // and to 0.5 of entry 1
        assert_eq!(ledger.ratio_since(1).unwrap(), dec!(0.5));
    }

    #[test]
    fn length_only_grows() {
        let mut ledger = DebtLedger::new();
        for _ in 0..100 {
            let before = ledger.len();
            ledger.append(dec!(0.99)).unwrap();
            assert_eq!(ledger.len(), before + 1);
        }
    }

    #[test]
    fn overflow_rejected_without_append() {
        let mut ledger = DebtLedger::new();
        ledger.append_raw(Decimal::MAX);
        let before = ledger.len();
        assert!(ledger.append(dec!(2)).is_err());
        assert_eq!(ledger.len(), before);
    }
}
