// 13.0: every state change produces an event. used for audit trails, state
// reconstruction, and notifying external systems. the EventPayload enum lists all
// event types.

use crate::types::{AccountId, CurrencyKey, Timestamp};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EventId(pub u64);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub timestamp: Timestamp,
    pub payload: EventPayload,
}

impl Event {
    pub fn new(id: EventId, timestamp: Timestamp, payload: EventPayload) -> Self {
        Self {
            id,
            timestamp,
            payload,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum EventPayload {
    // issuance events
    Minted(MintedEvent),
    Burned(BurnedEvent),
    CollateralDeposited(CollateralEvent),
    CollateralWithdrawn(CollateralEvent),

    // exchange events
    SynthExchanged(SynthExchangedEvent),
    AtomicSynthExchanged(SynthExchangedEvent),
    ExchangeReclaim(SettlementEvent),
    ExchangeRebate(SettlementEvent),

    // liquidation events
    AccountFlaggedForLiquidation(FlaggedEvent),
    AccountRemovedFromLiquidation(UnflaggedEvent),
    AccountLiquidated(LiquidatedEvent),

    // rewards events
    FeeRecorded(FeeRecordedEvent),
    PeriodFinalized(PeriodFinalizedEvent),
    RewardsClaimed(RewardsClaimedEvent),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MintedEvent {
    pub account: AccountId,
    pub amount: Decimal,
    pub new_debt_ownership: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BurnedEvent {
    pub account: AccountId,
    pub amount: Decimal,
    pub remaining_debt: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollateralEvent {
    pub account: AccountId,
    pub amount: Decimal,
    pub new_balance: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynthExchangedEvent {
    pub account: AccountId,
    pub src: CurrencyKey,
    pub amount: Decimal,
    pub dest: CurrencyKey,
    pub amount_received: Decimal,
    pub fee_rate: Decimal,
    pub destination_holder: AccountId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettlementEvent {
    pub account: AccountId,
    pub currency: CurrencyKey,
    pub amount: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlaggedEvent {
    pub account: AccountId,
    pub flagger: AccountId,
    pub deadline: Timestamp,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnflaggedEvent {
    pub account: AccountId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiquidatedEvent {
    pub account: AccountId,
    pub liquidator: AccountId,
    pub debt_removed: Decimal,
    pub collateral_redeemed: Decimal,
    pub is_self: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeeRecordedEvent {
    pub account: AccountId,
    pub usd_fee: Decimal,
    pub period_index: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeriodFinalizedEvent {
    pub period_index: usize,
    pub recorded_fees: Decimal,
    pub total_rewards: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RewardsClaimedEvent {
    pub account: AccountId,
    pub period_index: usize,
    pub amount: Decimal,
}
