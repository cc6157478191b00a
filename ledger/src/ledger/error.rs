//! Error types for the ledger core.
//!
//! Every failed credit or debit returns a [`LedgerError`]. The four kinds
//! are exhaustive; callers branch on them rather than on messages.

use thiserror::Error;

use crate::amount::AmountError;
use crate::identity::Identity;
use crate::store::StoreError;

/// Errors surfaced by [`Ledger`](super::Ledger) operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// The amount was zero, negative, fractional, or could not be applied.
    /// Nothing was written.
    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    /// The debit exceeds the current balance. Nothing was written.
    #[error("insufficient funds: available {available}, requested {requested}")]
    InsufficientFunds {
        /// Balance at the moment of the check.
        available: u64,
        /// Amount the caller tried to debit.
        requested: u64,
    },

    /// The debit targets an identity with no wallet. Nothing was written.
    #[error("unknown identity: {0}")]
    UnknownIdentity(Identity),

    /// The store failed while running the atomic operation. The mutation may
    /// or may not have been applied; re-query before retrying.
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),
}

impl LedgerError {
    /// Stable snake_case tag for wire formats and metrics labels.
    pub fn kind(&self) -> &'static str {
        match self {
            LedgerError::InvalidAmount(_) => "invalid_amount",
            LedgerError::InsufficientFunds { .. } => "insufficient_funds",
            LedgerError::UnknownIdentity(_) => "unknown_identity",
            LedgerError::StoreUnavailable(_) => "store_unavailable",
        }
    }

    /// `true` only for [`LedgerError::StoreUnavailable`], the single kind a
    /// caller may retry after re-reading the wallet.
    pub fn is_retryable(&self) -> bool {
        matches!(self, LedgerError::StoreUnavailable(_))
    }
}

impl From<AmountError> for LedgerError {
    fn from(err: AmountError) -> Self {
        LedgerError::InvalidAmount(err.to_string())
    }
}

impl From<StoreError> for LedgerError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Overflow => {
                LedgerError::InvalidAmount("credit would overflow the balance".to_string())
            }
            StoreError::Unavailable(reason) | StoreError::Corrupt(reason) => {
                LedgerError::StoreUnavailable(reason)
            }
        }
    }
}

pub type LedgerResult<T> = Result<T, LedgerError>;
