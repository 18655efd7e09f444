//! Caller identity

use serde::{Deserialize, Serialize};

/// Bearer token forwarded to every collaborator call
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AuthToken(String);

impl AuthToken {
    /// Wrap a raw token
    #[inline]
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Raw token for outbound calls
    #[inline]
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AuthToken(***)")
    }
}

/// Acting user, resolved from a token for audit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    /// Identity provider user id
    pub uid: String,
    /// Email address
    pub email: String,
    /// Display name
    #[serde(default)]
    pub name: Option<String>,
    /// Granted roles
    #[serde(default)]
    pub roles: Vec<String>,
}

impl UserProfile {
    /// Create new profile
    #[inline]
    #[must_use]
    pub fn new(uid: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            email: email.into(),
            name: None,
            roles: Vec::new(),
        }
    }
}
