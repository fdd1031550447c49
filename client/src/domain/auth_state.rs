//! Signed-in identity as reported by the identity provider.

use serde::Serialize;

use super::UserId;

/// Identity attached to a signed-in session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthIdentity {
    /// Backend-issued user identifier.
    pub user_id: UserId,
    /// Email reported by the provider, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// Authentication state transitions delivered to observers.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum AuthState {
    /// No user is signed in.
    #[default]
    SignedOut,
    /// A user is signed in.
    SignedIn(AuthIdentity),
}

impl AuthState {
    /// Identity of the signed-in user, if any.
    #[must_use]
    pub fn identity(&self) -> Option<&AuthIdentity> {
        match self {
            Self::SignedOut => None,
            Self::SignedIn(identity) => Some(identity),
        }
    }

    /// Whether a user is signed in.
    #[must_use]
    pub fn is_signed_in(&self) -> bool {
        matches!(self, Self::SignedIn(_))
    }
}
