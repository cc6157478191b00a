//! Validated coin amounts.
//!
//! An [`Amount`] is always a strictly positive whole number of coins. Every
//! ledger mutation takes one, so an invalid amount is rejected before the
//! balance store is ever touched.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Why a raw value could not become an [`Amount`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AmountError {
    #[error("amount must be greater than zero, got {0}")]
    NotPositive(i64),

    #[error("amount must be a whole number, got {0}")]
    NotInteger(String),
}

/// A strictly positive number of coins, at most `i64::MAX`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Amount(u64);

impl Amount {
    pub fn new(value: i64) -> Result<Self, AmountError> {
        if value <= 0 {
            return Err(AmountError::NotPositive(value));
        }
        Ok(Self(value as u64))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl TryFrom<i64> for Amount {
    type Error = AmountError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Amount::new(value)
    }
}

impl FromStr for Amount {
    type Err = AmountError;

    /// Parses a decimal integer, surrounding whitespace allowed.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value: i64 = s
            .trim()
            .parse()
            .map_err(|_| AmountError::NotInteger(s.to_string()))?;
        Amount::new(value)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Wire input
// ---------------------------------------------------------------------------

/// An amount as external callers send it: chat commands send numbers,
/// forge integrations send strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawAmount {
    Integer(i64),
    Float(f64),
    Text(String),
}

impl TryFrom<RawAmount> for Amount {
    type Error = AmountError;

    fn try_from(raw: RawAmount) -> Result<Self, Self::Error> {
        match raw {
            RawAmount::Integer(v) => Amount::new(v),
            RawAmount::Float(v) => Err(AmountError::NotInteger(v.to_string())),
            RawAmount::Text(s) => s.parse(),
        }
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = RawAmount::deserialize(deserializer)?;
        Amount::try_from(raw).map_err(serde::de::Error::custom)
    }
}
