//! # Balance Store
//!
//! Durable, atomic storage of [`Wallet`] records. The store is the only
//! shared mutable state in the system: every concurrency guarantee the
//! ledger makes rests on the primitives defined here.
//!
//! ```text
//! mod.rs         BalanceStore trait, tagged outcomes, StoreError
//! sled_store.rs  sled-backed implementation (transactions per mutation)
//! ```
//!
//! ## Contract
//!
//! 1. **No split read-modify-write.** `upsert_credit` and
//!    `decrement_balance` each read and write the record in one atomic
//!    unit. Two racing debits can never both pass a stale balance check.
//! 2. **Rejections are no-ops.** `InsufficientFunds`, `NotFound` and
//!    `Overflow` leave the stored record byte-for-byte unchanged.
//! 3. **Failures are labeled.** A failure of the atomic call itself is
//!    `StoreError::Unavailable`; the caller cannot assume the mutation did
//!    or did not land.
//!
//! Amount positivity is the ledger's job; the store trusts its [`Amount`].

pub mod sled_store;

pub use sled_store::SledBalanceStore;

use thiserror::Error;

use crate::amount::Amount;
use crate::identity::{Identity, Provenance};
use crate::profile::ProfileSnapshot;
use crate::wallet::Wallet;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Failures of the storage layer itself.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The storage engine could not complete the operation.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// A stored record could not be decoded or encoded.
    #[error("corrupt record: {0}")]
    Corrupt(String),

    /// The credit would push the balance past `u64::MAX`.
    #[error("balance overflow")]
    Overflow,
}

pub type StoreResult<T> = Result<T, StoreError>;

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

/// Result of [`BalanceStore::upsert_credit`], tagged by whether the wallet
/// was created by this call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// First credit for the identity: a new wallet with `balance = amount`.
    Created(Wallet),
    /// Existing wallet incremented and its profile overwritten.
    Updated(Wallet),
}

impl UpsertOutcome {
    pub fn wallet(&self) -> &Wallet {
        match self {
            UpsertOutcome::Created(w) | UpsertOutcome::Updated(w) => w,
        }
    }

    pub fn into_wallet(self) -> Wallet {
        match self {
            UpsertOutcome::Created(w) | UpsertOutcome::Updated(w) => w,
        }
    }

    /// `true` when this credit opened the wallet.
    pub fn is_new(&self) -> bool {
        matches!(self, UpsertOutcome::Created(_))
    }
}

/// Result of [`BalanceStore::decrement_balance`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecrementOutcome {
    /// The balance covered the amount and was decremented.
    Debited(Wallet),
    /// The balance did not cover the amount. Nothing was written.
    InsufficientFunds { available: u64, requested: u64 },
    /// No wallet exists for the identity. Nothing was written.
    NotFound,
}

// ---------------------------------------------------------------------------
// BalanceStore
// ---------------------------------------------------------------------------

/// Atomic storage primitives the ledger is built on.
pub trait BalanceStore: Send + Sync {
    /// Point lookup. Side-effect free.
    fn find_by_identity(&self, identity: &Identity) -> StoreResult<Option<Wallet>>;

    /// First wallet in key order whose stored email equals `email` exactly.
    fn find_by_email(&self, email: &str) -> StoreResult<Option<Wallet>>;

    /// Creates the wallet with `balance = amount` if absent, otherwise
    /// atomically increments it and overwrites the profile.
    fn upsert_credit(
        &self,
        identity: &Identity,
        amount: Amount,
        profile: &ProfileSnapshot,
    ) -> StoreResult<UpsertOutcome>;

    /// Atomically checks `balance >= amount` and decrements in the same step.
    fn decrement_balance(&self, identity: &Identity, amount: Amount)
        -> StoreResult<DecrementOutcome>;

    /// All wallets, optionally restricted to one provenance, in key order.
    fn list_wallets(&self, provenance: Option<Provenance>) -> StoreResult<Vec<Wallet>>;
}

impl<S: BalanceStore + ?Sized> BalanceStore for std::sync::Arc<S> {
    fn find_by_identity(&self, identity: &Identity) -> StoreResult<Option<Wallet>> {
        (**self).find_by_identity(identity)
    }

    fn find_by_email(&self, email: &str) -> StoreResult<Option<Wallet>> {
        (**self).find_by_email(email)
    }

    fn upsert_credit(
        &self,
        identity: &Identity,
        amount: Amount,
        profile: &ProfileSnapshot,
    ) -> StoreResult<UpsertOutcome> {
        (**self).upsert_credit(identity, amount, profile)
    }

    fn decrement_balance(
        &self,
        identity: &Identity,
        amount: Amount,
    ) -> StoreResult<DecrementOutcome> {
        (**self).decrement_balance(identity, amount)
    }

    fn list_wallets(&self, provenance: Option<Provenance>) -> StoreResult<Vec<Wallet>> {
        (**self).list_wallets(provenance)
    }
}
