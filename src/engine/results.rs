// 14.0.2: result types and errors for engine operations.

use crate::config::SettingsError;
use crate::decimal::MathError;
use crate::fees::FeeError;
use crate::liquidations::LiquidationError;
use crate::rates::RateError;
use crate::rewards::RewardsError;
use crate::status::StatusError;
use crate::synths::TokenError;
use crate::types::AccountId;
use rust_decimal::Decimal;

#[derive(Debug, Clone)]
pub struct ExchangeResult {
    pub amount_received: Decimal,
    pub fee: Decimal,
    pub fee_rate: Decimal,
    pub entries_settled: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SettlementResult {
    pub reclaimed: Decimal,
    pub rebated: Decimal,
    pub num_entries_settled: usize,
}

impl SettlementResult {
    pub fn empty() -> Self {
        Self {
            reclaimed: Decimal::ZERO,
            rebated: Decimal::ZERO,
            num_entries_settled: 0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LiquidationResult {
    pub account: AccountId,
    pub liquidator: AccountId,
    pub debt_removed: Decimal,
    pub collateral_redeemed: Decimal,
    pub flag_reward_paid: Decimal,
    pub liquidate_reward_paid: Decimal,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum EngineError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("insufficient collateral: requested {requested}, issuable {issuable}")]
    InsufficientCollateral { requested: Decimal, issuable: Decimal },

    #[error("slippage exceeded: received {received} below minimum {min_amount}")]
    SlippageExceeded { received: Decimal, min_amount: Decimal },

    #[error("atomic volume cap exceeded: block volume {block_volume} + {requested} over cap {cap}")]
    AtomicVolumeExceeded {
        block_volume: Decimal,
        requested: Decimal,
        cap: Decimal,
    },

    #[error("account {0} has no debt to burn")]
    NoDebt(AccountId),

    #[error(transparent)]
    Status(#[from] StatusError),

    #[error(transparent)]
    Rate(#[from] RateError),

    #[error(transparent)]
    Token(#[from] TokenError),

    #[error(transparent)]
    Fee(#[from] FeeError),

    #[error(transparent)]
    Liquidation(#[from] LiquidationError),

    #[error(transparent)]
    Rewards(#[from] RewardsError),

    #[error(transparent)]
    Settings(#[from] SettingsError),

    #[error(transparent)]
    Math(#[from] MathError),
}
