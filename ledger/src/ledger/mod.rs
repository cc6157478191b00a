//! # Ledger Core
//!
//! `credit` and `debit` are the only ways a balance changes. Both validate
//! the amount first, then make exactly one atomic call into the
//! [`BalanceStore`]; there is no partial application and no retry.
//!
//! ## Mutation lifecycle
//!
//! ```text
//! Received → Validating ─┬─→ Applying ─┬─→ Applied
//!                        │             └─→ Rejected
//!                        └─────────────────→ Rejected
//! ```
//!
//! `Applying` is the store call. `Applied` and `Rejected` are terminal. The
//! phase is recorded on every trace event so a stuck request shows where it
//! stopped.
//!
//! ## Transfers
//!
//! The ledger has no transfer primitive. A caller moving coins from A to B
//! debits A and credits B **only if the debit succeeded**. Crediting B after
//! a failed debit mints coins out of thin air.

pub mod error;

pub use error::{LedgerError, LedgerResult};

use std::fmt;
use std::time::Instant;

use crate::amount::Amount;
use crate::identity::{Identity, Provenance};
use crate::profile::ProfileSnapshot;
use crate::store::{BalanceStore, DecrementOutcome, UpsertOutcome};
use crate::wallet::Wallet;

/// What a successful credit reports: whether the wallet was just opened.
pub type CreditOutcome = UpsertOutcome;

// ---------------------------------------------------------------------------
// Mutation phases
// ---------------------------------------------------------------------------

/// Where a mutation request is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationPhase {
    Received,
    Validating,
    Applying,
    Applied,
    Rejected,
}

impl MutationPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            MutationPhase::Received => "received",
            MutationPhase::Validating => "validating",
            MutationPhase::Applying => "applying",
            MutationPhase::Applied => "applied",
            MutationPhase::Rejected => "rejected",
        }
    }

    /// `Applied` and `Rejected` end a request.
    pub fn is_terminal(&self) -> bool {
        matches!(self, MutationPhase::Applied | MutationPhase::Rejected)
    }
}

impl fmt::Display for MutationPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn trace_phase(op: &'static str, identity: &Identity, phase: MutationPhase) {
    tracing::trace!(op, identity = %identity, phase = %phase, "mutation phase");
}

// ---------------------------------------------------------------------------
// Ledger
// ---------------------------------------------------------------------------

/// Credit and debit operations over a [`BalanceStore`].
///
/// Holds no state of its own; share it freely behind an `Arc`.
#[derive(Debug, Clone)]
pub struct Ledger<S> {
    store: S,
}

impl<S: BalanceStore> Ledger<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// The underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Looks up the wallet for an identity.
    pub fn lookup(&self, identity: &Identity) -> LedgerResult<Option<Wallet>> {
        self.store.find_by_identity(identity).map_err(|e| {
            tracing::warn!(identity = %identity, error = %e, "wallet lookup failed");
            LedgerError::from(e)
        })
    }

    /// Wallet registered under `email`. Only forge profiles carry one.
    pub fn find_by_email(&self, email: &str) -> LedgerResult<Option<Wallet>> {
        self.store.find_by_email(email).map_err(|e| {
            tracing::warn!(email, error = %e, "wallet lookup by email failed");
            LedgerError::from(e)
        })
    }

    /// All wallets, optionally of one provenance.
    pub fn wallets(&self, provenance: Option<Provenance>) -> LedgerResult<Vec<Wallet>> {
        Ok(self.store.list_wallets(provenance)?)
    }

    /// Credits a raw caller-supplied amount. Non-positive amounts are
    /// rejected before the store is touched.
    pub fn credit_raw(
        &self,
        identity: &Identity,
        amount: i64,
        profile: &ProfileSnapshot,
    ) -> LedgerResult<CreditOutcome> {
        trace_phase("credit", identity, MutationPhase::Received);
        trace_phase("credit", identity, MutationPhase::Validating);
        let amount = Amount::new(amount).map_err(|e| {
            trace_phase("credit", identity, MutationPhase::Rejected);
            LedgerError::from(e)
        })?;
        self.apply_credit(identity, amount, profile)
    }

    /// Credits `amount`, opening the wallet if this is the first credit.
    ///
    /// The returned balance is the prior balance (0 for a new wallet) plus
    /// `amount`, and the stored profile is replaced by `profile`.
    pub fn credit(
        &self,
        identity: &Identity,
        amount: Amount,
        profile: &ProfileSnapshot,
    ) -> LedgerResult<CreditOutcome> {
        trace_phase("credit", identity, MutationPhase::Received);
        trace_phase("credit", identity, MutationPhase::Validating);
        self.apply_credit(identity, amount, profile)
    }

    fn apply_credit(
        &self,
        identity: &Identity,
        amount: Amount,
        profile: &ProfileSnapshot,
    ) -> LedgerResult<CreditOutcome> {
        trace_phase("credit", identity, MutationPhase::Applying);
        let started = Instant::now();

        match self.store.upsert_credit(identity, amount, profile) {
            Ok(outcome) => {
                trace_phase("credit", identity, MutationPhase::Applied);
                let wallet = outcome.wallet();
                if outcome.is_new() {
                    tracing::info!(
                        identity = %identity,
                        wallet_id = %wallet.id,
                        balance = wallet.balance,
                        "wallet opened"
                    );
                } else {
                    tracing::debug!(
                        identity = %identity,
                        amount = amount.get(),
                        balance = wallet.balance,
                        elapsed_us = started.elapsed().as_micros() as u64,
                        "credit applied"
                    );
                }
                Ok(outcome)
            }
            Err(e) => {
                trace_phase("credit", identity, MutationPhase::Rejected);
                tracing::warn!(identity = %identity, amount = amount.get(), error = %e, "credit failed");
                Err(e.into())
            }
        }
    }

    /// Debits a raw caller-supplied amount. Non-positive amounts are
    /// rejected before the store is touched.
    pub fn debit_raw(&self, identity: &Identity, amount: i64) -> LedgerResult<Wallet> {
        trace_phase("debit", identity, MutationPhase::Received);
        trace_phase("debit", identity, MutationPhase::Validating);
        let amount = Amount::new(amount).map_err(|e| {
            trace_phase("debit", identity, MutationPhase::Rejected);
            LedgerError::from(e)
        })?;
        self.apply_debit(identity, amount)
    }

    /// Debits `amount` if the wallet exists and its balance covers it.
    ///
    /// On success the returned balance is the prior balance minus `amount`.
    /// On any rejection nothing is written.
    pub fn debit(&self, identity: &Identity, amount: Amount) -> LedgerResult<Wallet> {
        trace_phase("debit", identity, MutationPhase::Received);
        trace_phase("debit", identity, MutationPhase::Validating);
        self.apply_debit(identity, amount)
    }

    fn apply_debit(&self, identity: &Identity, amount: Amount) -> LedgerResult<Wallet> {
        trace_phase("debit", identity, MutationPhase::Applying);

        let outcome = self.store.decrement_balance(identity, amount).map_err(|e| {
            trace_phase("debit", identity, MutationPhase::Rejected);
            tracing::warn!(identity = %identity, amount = amount.get(), error = %e, "debit failed");
            LedgerError::from(e)
        })?;

        match outcome {
            DecrementOutcome::Debited(wallet) => {
                trace_phase("debit", identity, MutationPhase::Applied);
                tracing::debug!(
                    identity = %identity,
                    amount = amount.get(),
                    balance = wallet.balance,
                    "debit applied"
                );
                Ok(wallet)
            }
            DecrementOutcome::InsufficientFunds {
                available,
                requested,
            } => {
                trace_phase("debit", identity, MutationPhase::Rejected);
                tracing::debug!(identity = %identity, available, requested, "debit rejected: insufficient funds");
                Err(LedgerError::InsufficientFunds {
                    available,
                    requested,
                })
            }
            DecrementOutcome::NotFound => {
                trace_phase("debit", identity, MutationPhase::Rejected);
                tracing::debug!(identity = %identity, "debit rejected: no wallet");
                Err(LedgerError::UnknownIdentity(identity.clone()))
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
