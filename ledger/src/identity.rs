//! # Identities & Provenance
//!
//! A wallet is addressed by an [`Identity`]: the raw account id handed to us
//! by an external system, qualified by the [`Provenance`] of that system.
//! The same raw string issued by two different systems names two different
//! people, so the provenance is part of the key everywhere: in memory, on
//! the wire, and on disk.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::config::KEY_SEPARATOR;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors raised while building or parsing an identity.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentityError {
    /// The provenance name is not one we know about.
    #[error("unknown provenance: {0}")]
    UnknownProvenance(String),

    /// External ids must carry at least one character.
    #[error("external id must not be empty")]
    EmptyExternalId,

    /// A storage key could not be split back into provenance and id.
    #[error("malformed storage key")]
    MalformedKey,
}

// ---------------------------------------------------------------------------
// Provenance
// ---------------------------------------------------------------------------

/// The external system that issued an identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Provenance {
    /// Chat platform account (bot commands).
    #[serde(rename = "chat")]
    ChatPlatform,
    /// Code-forge account (repository integrations).
    #[serde(rename = "forge")]
    CodeForge,
}

impl Provenance {
    /// All known provenances, in storage-key order.
    pub const ALL: [Provenance; 2] = [Provenance::ChatPlatform, Provenance::CodeForge];

    /// Wire and storage name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Provenance::ChatPlatform => "chat",
            Provenance::CodeForge => "forge",
        }
    }

    /// Storage key prefix, separator included.
    pub fn key_prefix(&self) -> Vec<u8> {
        let mut prefix = self.as_str().as_bytes().to_vec();
        prefix.push(KEY_SEPARATOR);
        prefix
    }
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provenance {
    type Err = IdentityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "chat" => Ok(Provenance::ChatPlatform),
            "forge" => Ok(Provenance::CodeForge),
            _ => Err(IdentityError::UnknownProvenance(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// A `(provenance, external_id)` pair addressing exactly one wallet.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identity {
    provenance: Provenance,
    external_id: String,
}

impl Identity {
    /// Builds an identity, rejecting an empty external id.
    pub fn new(provenance: Provenance, external_id: impl Into<String>) -> Result<Self, IdentityError> {
        let external_id = external_id.into();
        if external_id.is_empty() {
            return Err(IdentityError::EmptyExternalId);
        }
        Ok(Self {
            provenance,
            external_id,
        })
    }

    /// Shorthand for a chat-platform identity.
    pub fn chat(external_id: impl Into<String>) -> Result<Self, IdentityError> {
        Self::new(Provenance::ChatPlatform, external_id)
    }

    /// Shorthand for a code-forge identity.
    pub fn forge(external_id: impl Into<String>) -> Result<Self, IdentityError> {
        Self::new(Provenance::CodeForge, external_id)
    }

    pub fn provenance(&self) -> Provenance {
        self.provenance
    }

    pub fn external_id(&self) -> &str {
        &self.external_id
    }

    /// Encodes the identity as `<provenance>:<external_id>`.
    pub fn storage_key(&self) -> Vec<u8> {
        let mut key = self.provenance.key_prefix();
        key.extend_from_slice(self.external_id.as_bytes());
        key
    }

    /// Inverse of [`Identity::storage_key`].
    pub fn from_storage_key(key: &[u8]) -> Result<Self, IdentityError> {
        let split = key
            .iter()
            .position(|b| *b == KEY_SEPARATOR)
            .ok_or(IdentityError::MalformedKey)?;
        let prefix = std::str::from_utf8(&key[..split]).map_err(|_| IdentityError::MalformedKey)?;
        let external_id =
            std::str::from_utf8(&key[split + 1..]).map_err(|_| IdentityError::MalformedKey)?;
        Self::new(prefix.parse()?, external_id)
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.provenance, self.external_id)
    }
}
