use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Rejected session key input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("session key must not be empty")]
pub struct InvalidSessionKey;

/// Opaque identifier of an anonymous cart.
///
/// Always non-empty and free of surrounding whitespace. The content is
/// otherwise unconstrained: keys typed by a user or handed out by another
/// device are accepted as-is.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SessionKey(String);

impl SessionKey {
    pub fn parse(raw: &str) -> Result<Self, InvalidSessionKey> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(InvalidSessionKey);
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True when `raw` names this key exactly (no trimming or case folding).
    pub fn matches(&self, raw: &str) -> bool {
        self.0 == raw
    }
}

impl TryFrom<String> for SessionKey {
    type Error = InvalidSessionKey;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<SessionKey> for String {
    fn from(key: SessionKey) -> Self {
        key.0
    }
}

impl AsRef<str> for SessionKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
