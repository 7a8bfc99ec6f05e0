// 14.0: core protocol engine. coordinates issuance, exchange, settlement, and
// liquidation over the shared ledgers. deterministic and event-driven with no
// external I/O.

mod core;
mod exchanging;
mod issuance;
mod liquidating;
mod results;

pub use core::Engine;
pub use issuance::AccountIssuanceData;
pub use results::{EngineError, ExchangeResult, LiquidationResult, SettlementResult};
