//! # Ledger Configuration & Constants
//!
//! Every fixed value the ledger depends on lives here: the avatar
//! resolution convention, storage layout names, and the defaults the node
//! binary falls back to when no flag or environment variable is given.
//!
//! The avatar constants are a compatibility contract with profile data that
//! already exists in the wild. Changing any of them changes the avatar URL
//! stored for every wallet credited afterwards.

use std::time::Duration;

// ---------------------------------------------------------------------------
// Avatar Resolution
// ---------------------------------------------------------------------------

/// Base URL of the chat platform's CDN.
pub const CHAT_CDN_BASE: &str = "https://cdn.discordapp.com";

/// Number of built-in default avatars the chat platform serves.
pub const DEFAULT_AVATAR_COUNT: u64 = 5;

/// Avatar tokens starting with this prefix refer to animated images.
pub const ANIMATED_AVATAR_PREFIX: &str = "a_";

/// File extension for animated avatars.
pub const ANIMATED_AVATAR_FORMAT: &str = "gif";

/// File extension for static avatars and the built-in defaults.
pub const STATIC_AVATAR_FORMAT: &str = "png";

// ---------------------------------------------------------------------------
// Storage
// ---------------------------------------------------------------------------

/// Name of the sled tree holding wallet records.
pub const WALLETS_TREE: &str = "wallets";

/// Separator between the provenance prefix and the external id in a
/// storage key. Prefixes never contain it, so keys of different
/// provenance cannot collide.
pub const KEY_SEPARATOR: u8 = b':';

// ---------------------------------------------------------------------------
// Node Defaults
// ---------------------------------------------------------------------------

/// Default port for the HTTP API.
pub const DEFAULT_HTTP_PORT: u16 = 8470;

/// Default port for the Prometheus metrics endpoint.
pub const DEFAULT_METRICS_PORT: u16 = 8471;

/// Upper bound on a single request, store call included.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// [`DEFAULT_REQUEST_TIMEOUT`] in whole seconds, for CLI defaults.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

/// Ledger version reported by the node.
pub const LEDGER_VERSION: &str = env!("CARGO_PKG_VERSION");
