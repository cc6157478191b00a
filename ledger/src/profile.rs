//! # Profile Snapshots & Avatar Resolution
//!
//! Every credit carries a denormalized snapshot of the recipient's profile
//! so that leaderboards and receipts can render a wallet without calling
//! back into the issuing platform. The snapshot is overwritten wholesale on
//! each credit; debits never touch it.
//!
//! ## Avatar convention
//!
//! Chat accounts come with an optional avatar *token*, not a URL. The URL
//! is derived as follows:
//!
//! | Token            | URL                                                    |
//! |------------------|--------------------------------------------------------|
//! | absent           | `{cdn}/embed/avatars/{discriminator mod 5}.png`        |
//! | `a_…` (animated) | `{cdn}/avatars/{id}/{token}.gif`                       |
//! | anything else    | `{cdn}/avatars/{id}/{token}.png`                       |
//!
//! Existing stored profiles were written with exactly this rule, so it must
//! not drift. Forge accounts already carry a full avatar URL, used verbatim.

use serde::{Deserialize, Serialize};

use crate::config::{
    ANIMATED_AVATAR_FORMAT, ANIMATED_AVATAR_PREFIX, CHAT_CDN_BASE, DEFAULT_AVATAR_COUNT,
    STATIC_AVATAR_FORMAT,
};
use crate::identity::{Identity, IdentityError};

// ---------------------------------------------------------------------------
// ProfileSnapshot
// ---------------------------------------------------------------------------

/// The profile fields stored alongside a balance.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileSnapshot {
    /// Name shown next to the balance.
    pub display_name: Option<String>,
    /// Resolved avatar URL.
    pub avatar_reference: Option<String>,
    /// Platform handle (chat username, forge login).
    pub handle: Option<String>,
    /// Chat discriminator, kept for default-avatar recomputation.
    pub discriminator: Option<String>,
    /// Forge account e-mail.
    pub email: Option<String>,
}

// ---------------------------------------------------------------------------
// Chat profiles
// ---------------------------------------------------------------------------

/// A chat-platform user as the bot sees it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatProfile {
    pub id: String,
    pub username: String,
    pub discriminator: String,
    #[serde(default)]
    pub avatar: Option<String>,
}

impl ChatProfile {
    pub fn identity(&self) -> Result<Identity, IdentityError> {
        Identity::chat(self.id.clone())
    }

    pub fn snapshot(&self) -> ProfileSnapshot {
        ProfileSnapshot {
            display_name: Some(self.username.clone()),
            avatar_reference: Some(chat_avatar_url(
                &self.id,
                self.avatar.as_deref(),
                &self.discriminator,
            )),
            handle: Some(self.username.clone()),
            discriminator: Some(self.discriminator.clone()),
            email: None,
        }
    }
}

/// Resolves a chat avatar token into a CDN URL.
pub fn chat_avatar_url(user_id: &str, avatar: Option<&str>, discriminator: &str) -> String {
    match avatar {
        None => format!(
            "{CHAT_CDN_BASE}/embed/avatars/{}.{STATIC_AVATAR_FORMAT}",
            default_avatar_index(discriminator)
        ),
        Some(token) => {
            let format = if token.starts_with(ANIMATED_AVATAR_PREFIX) {
                ANIMATED_AVATAR_FORMAT
            } else {
                STATIC_AVATAR_FORMAT
            };
            format!("{CHAT_CDN_BASE}/avatars/{user_id}/{token}.{format}")
        }
    }
}

/// Picks one of the built-in avatars from the discriminator.
///
/// Only the leading ASCII digits count, so `"0042"` and `"42x"` both map to
/// `42 mod 5`. One leading `+` is accepted. A discriminator without leading
/// digits maps to avatar 0, and so does a negative one, since no built-in
/// avatar has a negative index.
pub fn default_avatar_index(discriminator: &str) -> u64 {
    let trimmed = discriminator.trim_start();
    trimmed
        .strip_prefix('+')
        .unwrap_or(trimmed)
        .bytes()
        .take_while(u8::is_ascii_digit)
        .fold(0u64, |acc, d| {
            // Reduce as we go so arbitrarily long inputs cannot overflow.
            (acc * 10 + u64::from(d - b'0')) % DEFAULT_AVATAR_COUNT
        })
}

// ---------------------------------------------------------------------------
// Forge profiles
// ---------------------------------------------------------------------------

/// A code-forge account as repository integrations report it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForgeProfile {
    pub id: String,
    pub login: String,
    pub name: String,
    pub email: String,
    pub avatar_url: String,
}

impl ForgeProfile {
    pub fn identity(&self) -> Result<Identity, IdentityError> {
        Identity::forge(self.id.clone())
    }

    pub fn snapshot(&self) -> ProfileSnapshot {
        ProfileSnapshot {
            display_name: Some(self.name.clone()),
            avatar_reference: Some(self.avatar_url.clone()),
            handle: Some(self.login.clone()),
            discriminator: None,
            email: Some(self.email.clone()),
        }
    }
}

// ---------------------------------------------------------------------------
// Tagged profile
// ---------------------------------------------------------------------------

/// Either kind of profile, tagged by provenance on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "provenance")]
pub enum Profile {
    #[serde(rename = "chat")]
    Chat(ChatProfile),
    #[serde(rename = "forge")]
    Forge(ForgeProfile),
}

impl Profile {
    pub fn identity(&self) -> Result<Identity, IdentityError> {
        match self {
            Profile::Chat(p) => p.identity(),
            Profile::Forge(p) => p.identity(),
        }
    }

    pub fn snapshot(&self) -> ProfileSnapshot {
        match self {
            Profile::Chat(p) => p.snapshot(),
            Profile::Forge(p) => p.snapshot(),
        }
    }
}
