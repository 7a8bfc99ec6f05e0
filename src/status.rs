// 11.0: suspension flags. a system-wide switch plus per-synth switches, checked at
// the top of every mutating operation. hard stops: a suspended scope rejects the
// call outright, never queues or retries it.

use crate::types::CurrencyKey;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StatusError {
    #[error("system is suspended")]
    SystemSuspended,

    #[error("synth {0} is suspended")]
    SynthSuspended(CurrencyKey),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemStatus {
    system_active: bool,
    suspended_synths: HashSet<CurrencyKey>,
}

impl Default for SystemStatus {
    fn default() -> Self {
        Self {
            system_active: true,
            suspended_synths: HashSet::new(),
        }
    }
}

impl SystemStatus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn suspend_system(&mut self) {
        self.system_active = false;
    }

    pub fn resume_system(&mut self) {
        self.system_active = true;
    }

    pub fn suspend_synth(&mut self, currency: CurrencyKey) {
        self.suspended_synths.insert(currency);
    }

    pub fn resume_synth(&mut self, currency: CurrencyKey) {
        self.suspended_synths.remove(&currency);
    }

    pub fn is_system_active(&self) -> bool {
        self.system_active
    }

    pub fn is_synth_active(&self, currency: CurrencyKey) -> bool {
        self.system_active && !self.suspended_synths.contains(&currency)
    }

    pub fn require_system_active(&self) -> Result<(), StatusError> {
        if !self.system_active {
            return Err(StatusError::SystemSuspended);
        }
        Ok(())
    }

    pub fn require_synth_active(&self, currency: CurrencyKey) -> Result<(), StatusError> {
        self.require_system_active()?;
        if self.suspended_synths.contains(&currency) {
            return Err(StatusError::SynthSuspended(currency));
        }
        Ok(())
    }
}
