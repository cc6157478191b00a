// Copyright (c) 2026 Indie Wallet Contributors. MIT License.
// See LICENSE for details.

//! # Indie Ledger
//!
//! Custodial balances of "Indie Tokens", keyed by identities issued by
//! outside systems: a chat platform account or a code-forge account.
//! A wallet appears on the first credit and only ever changes through the
//! two operations here.
//!
//! ## Architecture
//!
//! - **identity**: [`Provenance`] + external id, and the storage key format.
//! - **amount**: positive integer coin amounts and caller input decoding.
//! - **profile**: per-platform profile payloads and the avatar URL rule.
//! - **wallet**: the persisted [`Wallet`] record.
//! - **store**: the [`BalanceStore`] trait and its sled implementation.
//! - **ledger**: [`Ledger`] credit/debit with the error taxonomy.
//! - **config**: constants shared with the node.
//!
//! ## Guarantees
//!
//! 1. Balances never go negative and a rejected mutation writes nothing.
//! 2. Concurrent debits never overdraw; concurrent credits never lose an
//!    increment.
//! 3. At most one wallet exists per identity.

pub mod amount;
pub mod config;
pub mod identity;
pub mod ledger;
pub mod profile;
pub mod store;
pub mod wallet;

pub use amount::{Amount, AmountError, RawAmount};
pub use identity::{Identity, IdentityError, Provenance};
pub use ledger::{CreditOutcome, Ledger, LedgerError, LedgerResult, MutationPhase};
pub use profile::{ChatProfile, ForgeProfile, Profile, ProfileSnapshot};
pub use store::{BalanceStore, DecrementOutcome, SledBalanceStore, StoreError, UpsertOutcome};
pub use wallet::Wallet;
