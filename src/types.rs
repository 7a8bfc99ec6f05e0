// 1.0: all the primitives live here. nothing in the engine works without these types.
// currency keys, account ids, price rounds, timestamps. each is a newtype so the
// compiler catches type mixups.

use serde::{Deserialize, Serialize};
use std::fmt;

// 1.1: a synth currency key. short ascii tag padded with zeroes, like "sUSD" or "sBTC".
// Copy so it can flow through the engine without borrow gymnastics. serialized as a
// plain string so it can key JSON maps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CurrencyKey(pub [u8; 8]);

impl Serialize for CurrencyKey {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for CurrencyKey {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        if s.len() > 8 {
            return Err(serde::de::Error::custom("currency key too long"));
        }
        Ok(CurrencyKey::new(&s))
    }
}

impl CurrencyKey {
    pub const fn from_bytes(bytes: [u8; 8]) -> Self {
        Self(bytes)
    }

    // panics on keys longer than 8 bytes; keys are compile-time constants in practice
    pub fn new(key: &str) -> Self {
        assert!(key.len() <= 8, "currency key too long");
        let mut bytes = [0u8; 8];
        bytes[..key.len()].copy_from_slice(key.as_bytes());
        Self(bytes)
    }

    pub fn as_str(&self) -> &str {
        let end = self.0.iter().position(|&b| b == 0).unwrap_or(8);
        std::str::from_utf8(&self.0[..end]).unwrap_or("????")
    }
}

impl fmt::Display for CurrencyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// the common unit everything is valued in. never stale, rate pinned at 1.0.
pub const USD: CurrencyKey = CurrencyKey(*b"sUSD\0\0\0\0");

// the native collateral token synths are minted against. priced like any other
// currency through the rate store, but it is not itself a synth.
pub const COLLATERAL: CurrencyKey = CurrencyKey(*b"COLL\0\0\0\0");

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AccountId(pub u64);

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "account#{}", self.0)
    }
}

// 1.2: price round id. each rate update for a currency opens a new round.
// the dynamic fee walks rounds backwards; settlement records the round it executed at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RoundId(pub u64);

impl RoundId {
    pub fn next(&self) -> Self {
        Self(self.0 + 1)
    }

    pub fn prev(&self) -> Option<Self> {
        self.0.checked_sub(1).map(Self)
    }
}

// 1.3: millisecond timestamp. the engine owns a logical clock, so deadlines and
// waiting periods are testable without wall time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp(pub i64);

impl Timestamp {
    pub fn now() -> Self {
        Self(chrono::Utc::now().timestamp_millis())
    }

    pub fn from_millis(ms: i64) -> Self {
        Self(ms)
    }

    pub fn as_millis(&self) -> i64 {
        self.0
    }

    pub fn plus_secs(&self, secs: i64) -> Self {
        Self(self.0 + secs * 1000)
    }

    pub fn elapsed_secs(&self, later: &Timestamp) -> i64 {
        (later.0 - self.0) / 1000
    }
}
