//! In-process identity provider.

use std::sync::Mutex;

use async_trait::async_trait;

use crate::domain::ports::{AuthStateStream, IdentityProvider, IdentityProviderError};
use crate::domain::{AuthIdentity, AuthState};
use crate::outbound::auth_watch::AuthBroadcast;

/// Identity provider whose sessions are started and ended in process.
pub struct InMemoryIdentityProvider {
    broadcast: AuthBroadcast,
    pending_failure: Mutex<Option<IdentityProviderError>>,
}

impl Default for InMemoryIdentityProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryIdentityProvider {
    /// Create a provider with nobody signed in.
    #[must_use]
    pub fn new() -> Self {
        Self {
            broadcast: AuthBroadcast::new(),
            pending_failure: Mutex::new(None),
        }
    }

    /// Start a session for `identity` and notify observers.
    pub fn sign_in(&self, identity: AuthIdentity) {
        self.broadcast.publish(AuthState::SignedIn(identity));
    }

    /// Make the next sign-out fail with `error`, leaving the session intact.
    pub fn fail_next_sign_out(&self, error: IdentityProviderError) {
        match self.pending_failure.lock() {
            Ok(mut pending) => *pending = Some(error),
            Err(poisoned) => *poisoned.into_inner() = Some(error),
        }
    }

    fn take_failure(&self) -> Option<IdentityProviderError> {
        match self.pending_failure.lock() {
            Ok(mut pending) => pending.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        }
    }
}

#[async_trait]
impl IdentityProvider for InMemoryIdentityProvider {
    async fn sign_out(&self) -> Result<(), IdentityProviderError> {
        if let Some(error) = self.take_failure() {
            return Err(error);
        }
        self.broadcast.publish(AuthState::SignedOut);
        Ok(())
    }

    fn auth_state(&self) -> AuthState {
        self.broadcast.current()
    }

    fn subscribe(&self) -> AuthStateStream {
        self.broadcast.subscribe()
    }
}
