//! Port for the hosted identity provider.
//!
//! The domain never signs users in; it only ends sessions and watches the
//! signed-in identity change. Adapters own tokens and provider protocols.

use async_trait::async_trait;
use futures_util::stream::{self, BoxStream, StreamExt};

use crate::domain::AuthState;

use super::define_port_error;

define_port_error! {
    /// Errors raised by identity provider adapters.
    pub enum IdentityProviderError {
        /// The provider could not be reached.
        Unavailable { message: String } => "identity provider unavailable: {message}",
        /// The provider refused the request.
        Rejected { message: String } => "identity provider rejected the request: {message}",
    }
}

/// Stream of auth state transitions. Dropping it ends the subscription.
pub type AuthStateStream = BoxStream<'static, AuthState>;

/// Port exposing session control and auth state observation.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// End the current session.
    async fn sign_out(&self) -> Result<(), IdentityProviderError>;

    /// Latest known auth state.
    fn auth_state(&self) -> AuthState;

    /// Subscribe to auth state transitions.
    ///
    /// The stream yields the current state first, then every transition.
    fn subscribe(&self) -> AuthStateStream;
}

/// Fixture provider that is permanently signed out.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureIdentityProvider;

#[async_trait]
impl IdentityProvider for FixtureIdentityProvider {
    async fn sign_out(&self) -> Result<(), IdentityProviderError> {
        Ok(())
    }

    fn auth_state(&self) -> AuthState {
        AuthState::SignedOut
    }

    fn subscribe(&self) -> AuthStateStream {
        stream::once(async { AuthState::SignedOut })
            .chain(stream::pending())
            .boxed()
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;

    #[tokio::test]
    async fn fixture_reports_signed_out_first() {
        let provider = FixtureIdentityProvider;
        let mut states = provider.subscribe();

        assert_eq!(states.next().await, Some(AuthState::SignedOut));
        provider.sign_out().await.expect("fixture sign-out succeeds");
        assert_eq!(provider.auth_state(), AuthState::SignedOut);
    }

    #[test]
    fn rejected_error_formats_message() {
        let err = IdentityProviderError::rejected("TOKEN_EXPIRED");
        assert_eq!(
            err.to_string(),
            "identity provider rejected the request: TOKEN_EXPIRED"
        );
    }
}
