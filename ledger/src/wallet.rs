//! # Wallet Records
//!
//! A [`Wallet`] is the balance record for one external identity, together
//! with the last profile snapshot credited to it. Wallets come into being on
//! the first credit and are never deleted by the ledger.
//!
//! ## Persistence
//!
//! The struct derives `Serialize`/`Deserialize` and is stored by the balance
//! store as a single bincode value keyed by [`Identity::storage_key`]. Keep
//! the field list free of `skip_serializing_if` and internally tagged enums:
//! bincode is not self-describing and cannot decode either.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::amount::Amount;
use crate::identity::{Identity, IdentityError, Provenance};
use crate::profile::ProfileSnapshot;

/// The balance record for one external identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wallet {
    /// Internal row id, assigned on creation.
    pub id: Uuid,
    /// Issuing system of `external_id`.
    pub provenance: Provenance,
    /// Account id within the issuing system. Immutable.
    pub external_id: String,
    pub display_name: Option<String>,
    pub avatar_reference: Option<String>,
    pub handle: Option<String>,
    pub discriminator: Option<String>,
    pub email: Option<String>,
    /// Coin count. Unsigned, so it can never go below zero.
    pub balance: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Wallet {
    /// Builds the record for a first credit: `balance = amount`.
    pub fn open(identity: &Identity, amount: Amount, profile: &ProfileSnapshot) -> Self {
        let now = Utc::now();
        let mut wallet = Self {
            id: Uuid::new_v4(),
            provenance: identity.provenance(),
            external_id: identity.external_id().to_string(),
            display_name: None,
            avatar_reference: None,
            handle: None,
            discriminator: None,
            email: None,
            balance: amount.get(),
            created_at: now,
            updated_at: now,
        };
        wallet.apply_profile(profile);
        wallet
    }

    /// The identity this wallet is addressed by.
    pub fn identity(&self) -> Result<Identity, IdentityError> {
        Identity::new(self.provenance, self.external_id.clone())
    }

    /// Overwrites every profile field with the snapshot.
    pub fn apply_profile(&mut self, profile: &ProfileSnapshot) {
        self.display_name = profile.display_name.clone();
        self.avatar_reference = profile.avatar_reference.clone();
        self.handle = profile.handle.clone();
        self.discriminator = profile.discriminator.clone();
        self.email = profile.email.clone();
    }

    /// The profile fields currently stored.
    pub fn profile(&self) -> ProfileSnapshot {
        ProfileSnapshot {
            display_name: self.display_name.clone(),
            avatar_reference: self.avatar_reference.clone(),
            handle: self.handle.clone(),
            discriminator: self.discriminator.clone(),
            email: self.email.clone(),
        }
    }

    /// Adds `amount`, returning `None` on overflow without touching the record.
    pub fn checked_credit(&mut self, amount: Amount) -> Option<u64> {
        let balance = self.balance.checked_add(amount.get())?;
        self.balance = balance;
        self.updated_at = Utc::now();
        Some(balance)
    }

    /// Subtracts `amount` if the balance covers it, returning the new balance.
    /// Leaves the record untouched and returns `None` otherwise.
    pub fn checked_debit(&mut self, amount: Amount) -> Option<u64> {
        let balance = self.balance.checked_sub(amount.get())?;
        self.balance = balance;
        self.updated_at = Utc::now();
        Some(balance)
    }
}
