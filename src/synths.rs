// 4.0: the fungible synth ledger. balances per (currency, account) plus a running
// total supply per currency. the engine is the only mutator; single ops are atomic
// and never partially applied.

use crate::types::{AccountId, CurrencyKey};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("insufficient {currency} balance: requested {requested}, available {available}")]
    InsufficientBalance {
        currency: CurrencyKey,
        requested: Decimal,
        available: Decimal,
    },

    #[error("amount must be positive, got {0}")]
    NonPositiveAmount(Decimal),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SynthLedger {
    balances: HashMap<CurrencyKey, HashMap<AccountId, Decimal>>,
    total_supply: HashMap<CurrencyKey, Decimal>,
}

impl SynthLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn balance_of(&self, currency: CurrencyKey, account: AccountId) -> Decimal {
        self.balances
            .get(&currency)
            .and_then(|b| b.get(&account))
            .copied()
            .unwrap_or(Decimal::ZERO)
    }

    pub fn total_supply(&self, currency: CurrencyKey) -> Decimal {
        self.total_supply
            .get(&currency)
            .copied()
            .unwrap_or(Decimal::ZERO)
    }

    pub fn mint(
        &mut self,
        currency: CurrencyKey,
        account: AccountId,
        amount: Decimal,
    ) -> Result<(), TokenError> {
        if amount <= Decimal::ZERO {
            return Err(TokenError::NonPositiveAmount(amount));
        }
        *self
            .balances
            .entry(currency)
            .or_default()
            .entry(account)
            .or_insert(Decimal::ZERO) += amount;
        *self.total_supply.entry(currency).or_insert(Decimal::ZERO) += amount;
        Ok(())
    }

    pub fn burn(
        &mut self,
        currency: CurrencyKey,
        account: AccountId,
        amount: Decimal,
    ) -> Result<(), TokenError> {
        if amount <= Decimal::ZERO {
            return Err(TokenError::NonPositiveAmount(amount));
        }
        let available = self.balance_of(currency, account);
        if available < amount {
            return Err(TokenError::InsufficientBalance {
                currency,
                requested: amount,
                available,
            });
        }
        if let Some(balance) = self
            .balances
            .get_mut(&currency)
            .and_then(|b| b.get_mut(&account))
        {
            *balance -= amount;
        }
        if let Some(supply) = self.total_supply.get_mut(&currency) {
            *supply -= amount;
        }
        Ok(())
    }

    /// Burns up to `amount`, returning how much was actually burned. settlement
    /// reclaim uses this: a reclaim never fails for lack of balance, it just
    /// takes what is there.
    pub fn burn_up_to(&mut self, currency: CurrencyKey, account: AccountId, amount: Decimal) -> Decimal {
        let available = self.balance_of(currency, account);
        let burned = amount.min(available);
        if burned > Decimal::ZERO {
            // bounded by balance above, cannot fail
            let _ = self.burn(currency, account, burned);
        }
        burned
    }

    pub fn transfer(
        &mut self,
        currency: CurrencyKey,
        from: AccountId,
        to: AccountId,
        amount: Decimal,
    ) -> Result<(), TokenError> {
        if amount <= Decimal::ZERO {
            return Err(TokenError::NonPositiveAmount(amount));
        }
        let available = self.balance_of(currency, from);
        if available < amount {
            return Err(TokenError::InsufficientBalance {
                currency,
                requested: amount,
                available,
            });
        }
        let book = self.balances.entry(currency).or_default();
        *book.entry(from).or_insert(Decimal::ZERO) -= amount;
        *book.entry(to).or_insert(Decimal::ZERO) += amount;
        Ok(())
    }

    pub fn currencies_in_circulation(&self) -> impl Iterator<Item = (&CurrencyKey, &Decimal)> {
        self.total_supply.iter().filter(|(_, supply)| !supply.is_zero())
    }
}
