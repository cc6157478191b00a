//! # Persistent Wallet Storage
//!
//! The [`BalanceStore`] implementation shipped with the ledger, built on
//! sled's embedded key-value store.
//!
//! ## Tree Layout
//!
//! | Tree      | Key                          | Value            |
//! |-----------|------------------------------|------------------|
//! | `wallets` | `<provenance>:<external_id>` | `bincode(Wallet)` |
//!
//! Keys share a provenance prefix, so listing one provenance is a prefix
//! scan and a full listing comes back grouped by provenance.
//!
//! ## Atomicity
//!
//! Each mutation runs inside a sled transaction on the `wallets` tree. The
//! read, the balance check and the write commit together or not at all;
//! conflicting transactions are retried by sled until they serialize. A
//! rejected debit commits a transaction with no writes.

use sled::transaction::{abort, ConflictableTransactionError, TransactionError};
use sled::{Db, IVec, Tree};
use std::path::Path;

use super::{BalanceStore, DecrementOutcome, StoreError, StoreResult, UpsertOutcome};
use crate::amount::Amount;
use crate::config::WALLETS_TREE;
use crate::identity::{Identity, Provenance};
use crate::profile::ProfileSnapshot;
use crate::wallet::Wallet;

impl From<sled::Error> for StoreError {
    fn from(err: sled::Error) -> Self {
        StoreError::Unavailable(err.to_string())
    }
}

impl From<TransactionError<StoreError>> for StoreError {
    fn from(err: TransactionError<StoreError>) -> Self {
        match err {
            TransactionError::Abort(e) => e,
            TransactionError::Storage(e) => e.into(),
        }
    }
}

fn encode(wallet: &Wallet) -> StoreResult<Vec<u8>> {
    bincode::serialize(wallet).map_err(|e| StoreError::Corrupt(e.to_string()))
}

fn decode(bytes: &IVec) -> StoreResult<Wallet> {
    bincode::deserialize(bytes).map_err(|e| StoreError::Corrupt(e.to_string()))
}

// ---------------------------------------------------------------------------
// SledBalanceStore
// ---------------------------------------------------------------------------

/// sled-backed wallet storage.
///
/// Cheap to clone: sled handles are reference counted, and all clones see
/// the same data.
#[derive(Debug, Clone)]
pub struct SledBalanceStore {
    db: Db,
    wallets: Tree,
}

impl SledBalanceStore {
    /// Open or create a store at the given directory.
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let db = sled::open(path)?;
        Self::from_db(db)
    }

    /// A store that lives in memory and disappears on drop. For tests.
    pub fn open_temporary() -> StoreResult<Self> {
        let db = sled::Config::new().temporary(true).open()?;
        Self::from_db(db)
    }

    fn from_db(db: Db) -> StoreResult<Self> {
        let wallets = db.open_tree(WALLETS_TREE)?;
        Ok(Self { db, wallets })
    }

    /// Number of wallets stored.
    pub fn wallet_count(&self) -> usize {
        self.wallets.len()
    }

    /// Block until all writes are durable.
    pub fn flush(&self) -> StoreResult<()> {
        self.db.flush()?;
        Ok(())
    }
}

impl BalanceStore for SledBalanceStore {
    fn find_by_identity(&self, identity: &Identity) -> StoreResult<Option<Wallet>> {
        match self.wallets.get(identity.storage_key())? {
            Some(bytes) => Ok(Some(decode(&bytes)?)),
            None => Ok(None),
        }
    }

    fn find_by_email(&self, email: &str) -> StoreResult<Option<Wallet>> {
        for entry in self.wallets.iter() {
            let (_key, value) = entry?;
            let wallet = decode(&value)?;
            if wallet.email.as_deref() == Some(email) {
                return Ok(Some(wallet));
            }
        }
        Ok(None)
    }

    fn upsert_credit(
        &self,
        identity: &Identity,
        amount: Amount,
        profile: &ProfileSnapshot,
    ) -> StoreResult<UpsertOutcome> {
        let key = identity.storage_key();

        let outcome = self.wallets.transaction(|tx| {
            let outcome = match tx.get(&key)? {
                None => UpsertOutcome::Created(Wallet::open(identity, amount, profile)),
                Some(bytes) => {
                    let mut wallet = decode(&bytes).map_err(ConflictableTransactionError::Abort)?;
                    if wallet.checked_credit(amount).is_none() {
                        return abort(StoreError::Overflow);
                    }
                    wallet.apply_profile(profile);
                    UpsertOutcome::Updated(wallet)
                }
            };
            let bytes = encode(outcome.wallet()).map_err(ConflictableTransactionError::Abort)?;
            tx.insert(key.as_slice(), bytes)?;
            Ok(outcome)
        })?;

        self.db.flush()?;
        Ok(outcome)
    }

    fn decrement_balance(
        &self,
        identity: &Identity,
        amount: Amount,
    ) -> StoreResult<DecrementOutcome> {
        let key = identity.storage_key();

        let outcome = self.wallets.transaction(|tx| {
            let Some(bytes) = tx.get(&key)? else {
                return Ok(DecrementOutcome::NotFound);
            };
            let mut wallet = decode(&bytes).map_err(ConflictableTransactionError::Abort)?;
            let available = wallet.balance;
            if wallet.checked_debit(amount).is_none() {
                return Ok(DecrementOutcome::InsufficientFunds {
                    available,
                    requested: amount.get(),
                });
            }
            let bytes = encode(&wallet).map_err(ConflictableTransactionError::Abort)?;
            tx.insert(key.as_slice(), bytes)?;
            Ok(DecrementOutcome::Debited(wallet))
        })?;

        if matches!(outcome, DecrementOutcome::Debited(_)) {
            self.db.flush()?;
        }
        Ok(outcome)
    }

    fn list_wallets(&self, provenance: Option<Provenance>) -> StoreResult<Vec<Wallet>> {
        let iter = match provenance {
            Some(p) => self.wallets.scan_prefix(p.key_prefix()),
            None => self.wallets.iter(),
        };

        let mut wallets = Vec::new();
        for entry in iter {
            let (_key, value) = entry?;
            wallets.push(decode(&value)?);
        }
        Ok(wallets)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
