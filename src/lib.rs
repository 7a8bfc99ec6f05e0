// synth-core: synthetic asset issuance and exchange engine.
// debt-first architecture: the shared debt pool and its proportional ledger
// take priority. all computation is deterministic with no external I/O.
//
// file map (search X.0 for structs, X.1+ for logic):
//   1.x  types.rs: primitives: CurrencyKey, AccountId, RoundId, Timestamp
//   2.x  decimal.rs: 18-dp fixed-point helpers, floor and midpoint rounding
//   3.x  rates.rs: price rounds, staleness, TWAP
//   4.x  synths.rs: fungible synth balances and supplies
//   5.x  debt_ledger.rs: append-only multiplicative debt-share chain
//   6.x  exchange_state.rs: settlement queue (arena + tombstone slots)
//   7.x  fees.rs: base + volatility-priced dynamic exchange fees
//   8.x  liquidations.rs: flag registry and closed-form redemption math
//   10.x rewards.rs: period-based, fee-weighted trading rewards
//   11.x status.rs: system and per-synth suspension switches
//   12.x config.rs: settings, presets, validation
//   13.x events.rs: state transition events for audit
//   14.x engine/: core engine: issuance, exchange, settlement, liquidation

// core ledgers
pub mod debt_ledger;
pub mod decimal;
pub mod rates;
pub mod synths;
pub mod types;

// exchange and settlement
pub mod exchange_state;
pub mod fees;

// risk and rewards
pub mod liquidations;
pub mod rewards;
pub mod status;

// integration
pub mod config;
pub mod engine;
pub mod events;

// re exports for convenience
pub use config::{SettingsError, SystemSettings};
pub use debt_ledger::DebtLedger;
pub use decimal::{MathError, DECIMALS, UNIT};
pub use engine::{
    AccountIssuanceData, Engine, EngineError, ExchangeResult, LiquidationResult, SettlementResult,
};
pub use events::{Event, EventId, EventPayload};
pub use exchange_state::{ExchangeEntry, ExchangeState};
pub use fees::{DynamicFeeParams, FeeError};
pub use liquidations::{
    LiquidationAmounts, LiquidationBook, LiquidationEntry, LiquidationError, LiquidationParams,
};
pub use rates::{RateError, RateRound, RateStore};
pub use rewards::{RewardsError, TradingRewards};
pub use status::{StatusError, SystemStatus};
pub use synths::{SynthLedger, TokenError};
pub use types::{AccountId, CurrencyKey, RoundId, Timestamp, COLLATERAL, USD};
