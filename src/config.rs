// 12.0 config.rs: all settings in one place. issuance ratio, fee rates, waiting
// periods, liquidation thresholds, dynamic fee and atomic exchange params.

use crate::fees::DynamicFeeParams;
use crate::liquidations::LiquidationParams;
use crate::types::CurrencyKey;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemSettings {
    // max debt issuable per unit of collateral value (0.5 = 200% collateralization)
    pub issuance_ratio: Decimal,
    // seconds after an exchange before its proceeds settle and become transferable
    pub waiting_period_secs: i64,
    // seconds after which a published rate is unusable
    pub rate_stale_period_secs: i64,
    // base exchange fee per currency, falling back to the default
    pub exchange_fee_rates: HashMap<CurrencyKey, Decimal>,
    pub default_exchange_fee_rate: Decimal,
    pub dynamic_fee: DynamicFeeParams,
    pub liquidation: LiquidationParams,
    // atomic exchange: flat fee, TWAP window, per-block USD volume cap
    pub atomic_exchange_fee_rate: Decimal,
    pub atomic_twap_window_secs: i64,
    pub atomic_max_volume_per_block: Decimal,
    // audit log cap
    pub max_events: usize,
}

impl Default for SystemSettings {
    fn default() -> Self {
        Self {
            issuance_ratio: dec!(0.5),
            waiting_period_secs: 360,
            rate_stale_period_secs: 3600,
            exchange_fee_rates: HashMap::new(),
            default_exchange_fee_rate: dec!(0.003),
            dynamic_fee: DynamicFeeParams::default(),
            liquidation: LiquidationParams::default(),
            atomic_exchange_fee_rate: dec!(0.003),
            atomic_twap_window_secs: 1800,
            atomic_max_volume_per_block: dec!(1_000_000),
            max_events: 10_000,
        }
    }
}

impl SystemSettings {
    /// Tighter thresholds, longer delays. The setup a risk-averse deployment runs.
    pub fn conservative() -> Self {
        let mut settings = Self::default();
        settings.issuance_ratio = dec!(0.25); // 400% collateralization
        settings.waiting_period_secs = 600;
        settings.rate_stale_period_secs = 900;
        settings.dynamic_fee.max_fee = dec!(0.025);
        settings.liquidation.delay_secs = 12 * 3600;
        settings.atomic_max_volume_per_block = dec!(200_000);
        settings
    }

    pub fn exchange_fee_rate_for(&self, currency: CurrencyKey) -> Decimal {
        self.exchange_fee_rates
            .get(&currency)
            .copied()
            .unwrap_or(self.default_exchange_fee_rate)
    }

    pub fn set_exchange_fee_rate(&mut self, currency: CurrencyKey, rate: Decimal) {
        self.exchange_fee_rates.insert(currency, rate);
    }

    // 12.1: range checks. the dynamic fee params are required inputs with hard
    // ranges: decay in (0, 1], rounds >= 1.
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.issuance_ratio <= Decimal::ZERO || self.issuance_ratio >= Decimal::ONE {
            return Err(SettingsError::InvalidIssuance {
                reason: "issuance ratio must be in (0, 1)".to_string(),
            });
        }

        if self.dynamic_fee.rounds < 1 {
            return Err(SettingsError::InvalidDynamicFee {
                reason: "dynamic fee rounds must be >= 1".to_string(),
            });
        }
        if self.dynamic_fee.weight_decay <= Decimal::ZERO || self.dynamic_fee.weight_decay > Decimal::ONE {
            return Err(SettingsError::InvalidDynamicFee {
                reason: "weight decay must be in (0, 1]".to_string(),
            });
        }
        if self.dynamic_fee.threshold < Decimal::ZERO {
            return Err(SettingsError::InvalidDynamicFee {
                reason: "deviation threshold must be non-negative".to_string(),
            });
        }
        if self.dynamic_fee.max_fee <= Decimal::ZERO {
            return Err(SettingsError::InvalidDynamicFee {
                reason: "max dynamic fee must be positive".to_string(),
            });
        }

        let liq = &self.liquidation;
        if liq.target_issuance_ratio < self.issuance_ratio {
            return Err(SettingsError::InvalidLiquidation {
                reason: "target ratio must be at or above the issuance ratio".to_string(),
            });
        }
        if liq.liquidation_ratio <= liq.target_issuance_ratio {
            return Err(SettingsError::InvalidLiquidation {
                reason: "flag threshold must sit above the restore target".to_string(),
            });
        }
        if liq.penalty < Decimal::ZERO || liq.self_penalty < Decimal::ZERO {
            return Err(SettingsError::InvalidLiquidation {
                reason: "penalties must be non-negative".to_string(),
            });
        }
        // the closed-form redemption needs 1 - (1+P)*r > 0 for both penalties
        for penalty in [liq.penalty, liq.self_penalty] {
            if (Decimal::ONE + penalty) * liq.target_issuance_ratio >= Decimal::ONE {
                return Err(SettingsError::InvalidLiquidation {
                    reason: "(1 + penalty) * target ratio must stay below 1".to_string(),
                });
            }
        }

        if self.waiting_period_secs < 0 || self.rate_stale_period_secs <= 0 {
            return Err(SettingsError::InvalidPeriods {
                reason: "waiting period must be >= 0 and stale period > 0".to_string(),
            });
        }

        if self.atomic_max_volume_per_block <= Decimal::ZERO {
            return Err(SettingsError::InvalidAtomic {
                reason: "per-block atomic volume cap must be positive".to_string(),
            });
        }
        if self.atomic_exchange_fee_rate < Decimal::ZERO || self.atomic_exchange_fee_rate >= Decimal::ONE {
            return Err(SettingsError::InvalidAtomic {
                reason: "atomic fee must be in [0, 1)".to_string(),
            });
        }

        Ok(())
    }

    /// Worst-case fee rate a single exchange can carry: both base legs plus the
    /// dynamic cap on each. Round-trip cost bounds derive from this.
    pub fn max_exchange_fee_rate(&self) -> Decimal {
        let max_base = self
            .exchange_fee_rates
            .values()
            .copied()
            .fold(self.default_exchange_fee_rate, Decimal::max);
        max_base * dec!(2) + self.dynamic_fee.max_fee * dec!(2)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SettingsError {
    #[error("invalid issuance settings: {reason}")]
    InvalidIssuance { reason: String },

    #[error("invalid dynamic fee settings: {reason}")]
    InvalidDynamicFee { reason: String },

    #[error("invalid liquidation settings: {reason}")]
    InvalidLiquidation { reason: String },

    #[error("invalid period settings: {reason}")]
    InvalidPeriods { reason: String },

    #[error("invalid atomic exchange settings: {reason}")]
    InvalidAtomic { reason: String },
}
