//! Identity Toolkit adapter.
//!
//! Password sign-in goes through `accounts:signInWithPassword`; the returned
//! ID token is kept in memory and lent to the document store. Expired ID
//! tokens are exchanged through the secure token API, and a refresh token the
//! backend refuses ends the session. Signing out is local to this process,
//! matching how web clients drop their session.

use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use tracing::{debug, warn};

use super::dto::{
    ErrorEnvelopeDto, RefreshRequestDto, RefreshResponseDto, SignInRequestDto, SignInResponseDto,
};
use super::{TokenSource, body_preview};
use crate::domain::ports::{AuthStateStream, IdentityProvider, IdentityProviderError};
use crate::domain::{AuthIdentity, AuthState, Email, UserId};
use crate::outbound::auth_watch::AuthBroadcast;

/// Public Identity Toolkit REST endpoint.
pub const DEFAULT_IDENTITY_ENDPOINT: &str = "https://identitytoolkit.googleapis.com";

/// Public secure token REST endpoint.
pub const DEFAULT_SECURE_TOKEN_ENDPOINT: &str = "https://securetoken.googleapis.com";

struct Session {
    id_token: String,
    refresh_token: Option<String>,
}

/// Identity provider backed by the Identity Toolkit REST API.
pub struct IdentityToolkitProvider {
    client: Client,
    endpoint: Url,
    secure_token_endpoint: Url,
    api_key: String,
    session: Mutex<Option<Session>>,
    broadcast: AuthBroadcast,
}

impl IdentityToolkitProvider {
    /// Build a provider with nobody signed in.
    ///
    /// Sign-in requests go to `endpoint`; token refreshes go to
    /// `secure_token_endpoint`.
    pub fn new(
        client: Client,
        endpoint: Url,
        secure_token_endpoint: Url,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            client,
            endpoint,
            secure_token_endpoint,
            api_key: api_key.into(),
            session: Mutex::new(None),
            broadcast: AuthBroadcast::new(),
        }
    }

    /// Exchange an email and password for a session.
    ///
    /// On success the new identity is published to auth state observers.
    pub async fn sign_in_with_password(
        &self,
        email: &Email,
        password: &str,
    ) -> Result<AuthIdentity, IdentityProviderError> {
        let url = self.url(&self.endpoint, &["v1", "accounts:signInWithPassword"])?;
        let response = self
            .client
            .post(url)
            .json(&SignInRequestDto {
                email: email.as_ref(),
                password,
                return_secure_token: true,
            })
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        let body = response.bytes().await.map_err(map_transport_error)?;
        if !status.is_success() {
            return Err(map_status_error(status, body.as_ref()));
        }

        let signed_in: SignInResponseDto = serde_json::from_slice(body.as_ref()).map_err(|error| {
            IdentityProviderError::unavailable(format!("invalid sign-in response: {error}"))
        })?;
        let user_id = UserId::new(signed_in.local_id).map_err(|error| {
            IdentityProviderError::unavailable(format!("invalid user id in sign-in response: {error}"))
        })?;
        let identity = AuthIdentity {
            user_id,
            email: signed_in.email,
        };

        *self.lock_session() = Some(Session {
            id_token: signed_in.id_token,
            refresh_token: signed_in.refresh_token,
        });
        self.broadcast.publish(AuthState::SignedIn(identity.clone()));
        debug!(user_id = %identity.user_id, "signed in with password");
        Ok(identity)
    }

    async fn exchange_refresh_token(
        &self,
        refresh_token: &str,
    ) -> Result<RefreshResponseDto, IdentityProviderError> {
        let url = self.url(&self.secure_token_endpoint, &["v1", "token"])?;
        let response = self
            .client
            .post(url)
            .form(&RefreshRequestDto {
                grant_type: "refresh_token",
                refresh_token,
            })
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        let body = response.bytes().await.map_err(map_transport_error)?;
        if !status.is_success() {
            return Err(map_status_error(status, body.as_ref()));
        }
        serde_json::from_slice(body.as_ref()).map_err(|error| {
            IdentityProviderError::unavailable(format!("invalid token refresh response: {error}"))
        })
    }

    /// Drop the session if it still holds `refresh_token`.
    fn end_stale_session(&self, refresh_token: &str) {
        let mut session = self.lock_session();
        if session
            .as_ref()
            .is_some_and(|current| current.refresh_token.as_deref() == Some(refresh_token))
        {
            session.take();
            drop(session);
            self.broadcast.publish(AuthState::SignedOut);
        }
    }

    fn url(&self, base: &Url, segments: &[&str]) -> Result<Url, IdentityProviderError> {
        let mut url = base.clone();
        url.path_segments_mut()
            .map_err(|()| {
                IdentityProviderError::unavailable(format!("endpoint {base} cannot carry a path"))
            })?
            .pop_if_empty()
            .extend(segments);
        url.query_pairs_mut().append_pair("key", &self.api_key);
        Ok(url)
    }

    fn lock_session(&self) -> MutexGuard<'_, Option<Session>> {
        match self.session.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

#[async_trait]
impl TokenSource for IdentityToolkitProvider {
    fn id_token(&self) -> Option<String> {
        self.lock_session()
            .as_ref()
            .map(|session| session.id_token.clone())
    }

    async fn refresh_id_token(&self) -> Option<String> {
        let refresh_token = self.lock_session().as_ref()?.refresh_token.clone()?;
        match self.exchange_refresh_token(&refresh_token).await {
            Ok(refreshed) => {
                let mut session = self.lock_session();
                let current = session.as_mut().filter(|current| {
                    current.refresh_token.as_deref() == Some(refresh_token.as_str())
                })?;
                current.id_token = refreshed.id_token.clone();
                current.refresh_token = Some(refreshed.refresh_token);
                debug!("refreshed ID token");
                Some(refreshed.id_token)
            }
            Err(IdentityProviderError::Rejected { message }) => {
                warn!(%message, "refresh token rejected; ending session");
                self.end_stale_session(&refresh_token);
                None
            }
            Err(error) => {
                warn!(error = %error, "token refresh failed");
                None
            }
        }
    }
}

#[async_trait]
impl IdentityProvider for IdentityToolkitProvider {
    async fn sign_out(&self) -> Result<(), IdentityProviderError> {
        self.lock_session().take();
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

fn map_transport_error(error: reqwest::Error) -> IdentityProviderError {
    IdentityProviderError::unavailable(error.to_string())
}

fn map_status_error(status: StatusCode, body: &[u8]) -> IdentityProviderError {
    let reason = ErrorEnvelopeDto::reason(body).unwrap_or_else(|| body_preview(body));
    let message = if reason.is_empty() {
        format!("status {}", status.as_u16())
    } else {
        format!("status {}: {reason}", status.as_u16())
    };

    if status.is_client_error() && status != StatusCode::TOO_MANY_REQUESTS {
        IdentityProviderError::rejected(message)
    } else {
        IdentityProviderError::unavailable(message)
    }
}
