//! Profile and session service.
//!
//! A stateless facade over the backend handles: it shapes profile writes and
//! reads around the `users` lookup collection and the role partitions, ends
//! sessions, and relays auth state transitions. Every operation returns a
//! `Result` and logs its own failures; nothing is retried or cached.

use std::sync::Arc;

use futures_util::StreamExt;
use serde_json::Value;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::context::BackendContext;
use crate::domain::ports::{
    AuthStateStream, ClientStorage, ClientStorageError, DocumentPath, DocumentStoreError,
    DocumentWrite, IdentityProviderError, REMEMBER_ME_KEY,
};
use crate::domain::{
    AuthState, CREATED_AT_FIELD, Collection, EMAIL_FIELD, Email, Error, ProfileData,
    ProfileDocument, Role, UserId, UserRecord,
};

fn map_document_error(error: DocumentStoreError) -> Error {
    match error {
        DocumentStoreError::Connection { message } => Error::service_unavailable(message),
        DocumentStoreError::PermissionDenied { message } => Error::unauthorized(message),
        DocumentStoreError::Query { message } => Error::internal(message),
        DocumentStoreError::Decode { message } => {
            Error::internal(format!("invalid document payload: {message}"))
        }
    }
}

fn map_identity_error(error: IdentityProviderError) -> Error {
    match error {
        IdentityProviderError::Unavailable { message } => Error::service_unavailable(message),
        IdentityProviderError::Rejected { message } => Error::unauthorized(message),
    }
}

fn map_storage_error(error: ClientStorageError) -> Error {
    Error::internal(error.to_string())
}

fn logged<T>(operation: &'static str, result: Result<T, Error>) -> Result<T, Error> {
    if let Err(err) = &result {
        error!(operation, code = ?err.code(), error = %err, "profile operation failed");
    }
    result
}

/// Profile, session, and auth-state operations over injected backend handles.
#[derive(Clone)]
pub struct ProfileService {
    context: BackendContext,
    session_storage: Arc<dyn ClientStorage>,
    durable_storage: Arc<dyn ClientStorage>,
}

impl ProfileService {
    /// Create a service over `context` and the two client stores.
    pub fn new(
        context: BackendContext,
        session_storage: Arc<dyn ClientStorage>,
        durable_storage: Arc<dyn ClientStorage>,
    ) -> Self {
        Self {
            context,
            session_storage,
            durable_storage,
        }
    }

    /// Write the identity lookup record and the role-specific profile.
    ///
    /// The profile must carry an `email` string; it is copied into the lookup
    /// record. Both documents are committed as one batch, so a failure leaves
    /// neither behind. `createdAt` is stamped by the backend.
    pub async fn save_user_profile(
        &self,
        id: &UserId,
        profile: ProfileData,
        role: Role,
    ) -> Result<(), Error> {
        logged("save_user_profile", self.try_save(id, profile, role).await)
    }

    /// Resolve the lookup record for `id`, then read its role partition.
    pub async fn get_user_profile(&self, id: &UserId) -> Result<ProfileDocument, Error> {
        logged("get_user_profile", self.try_get(id).await)
    }

    /// End the session, then wipe session storage and the remember-me flag.
    ///
    /// Local storage is only touched once the provider confirms sign-out.
    pub async fn sign_out(&self) -> Result<(), Error> {
        logged("sign_out", self.try_sign_out().await)
    }

    /// Latest auth state known to the identity provider.
    pub fn current_auth_state(&self) -> Result<AuthState, Error> {
        logged(
            "current_auth_state",
            self.context.identity().map(|identity| identity.auth_state()),
        )
    }

    /// Auth state transitions as a stream, current state first.
    ///
    /// Dropping the stream ends the subscription.
    pub fn auth_state_changes(&self) -> Result<AuthStateStream, Error> {
        logged(
            "auth_state_changes",
            self.context.identity().map(|identity| identity.subscribe()),
        )
    }

    /// Invoke `callback` for every auth state transition, current state first.
    ///
    /// Delivery runs on a Tokio task until the returned observer is
    /// unsubscribed or dropped.
    pub fn on_auth_state_change<F>(&self, mut callback: F) -> Result<AuthObserver, Error>
    where
        F: FnMut(AuthState) + Send + 'static,
    {
        let result = Handle::try_current()
            .map_err(|err| Error::internal(format!("no async runtime for auth observer: {err}")))
            .and_then(|runtime| {
                let mut states = self.context.identity()?.subscribe();
                let task = runtime.spawn(async move {
                    while let Some(state) = states.next().await {
                        callback(state);
                    }
                });
                Ok(AuthObserver { task })
            });
        logged("on_auth_state_change", result)
    }

    async fn try_save(&self, id: &UserId, profile: ProfileData, role: Role) -> Result<(), Error> {
        let documents = self.context.documents()?;
        let email = profile
            .get(EMAIL_FIELD)
            .and_then(Value::as_str)
            .ok_or_else(|| Error::invalid_request("profile must include an email"))?;
        let email = Email::new(email).map_err(|err| Error::invalid_request(err.to_string()))?;

        let lookup = DocumentWrite::set(
            DocumentPath::new(Collection::Users, id.clone()),
            UserRecord::registration_fields(&email, role),
        )
        .with_server_timestamp(CREATED_AT_FIELD);
        let partition = DocumentWrite::set(
            DocumentPath::new(role.partition(), id.clone()),
            ProfileDocument::registration_fields(id, role, profile),
        )
        .with_server_timestamp(CREATED_AT_FIELD);

        documents
            .commit(vec![lookup, partition])
            .await
            .map_err(map_document_error)?;
        debug!(user_id = %id, %role, "user profile saved");
        Ok(())
    }

    async fn try_get(&self, id: &UserId) -> Result<ProfileDocument, Error> {
        let documents = self.context.documents()?;
        let lookup = documents
            .get(&DocumentPath::new(Collection::Users, id.clone()))
            .await
            .map_err(map_document_error)?
            .ok_or_else(|| Error::not_found("User not found"))?;
        let record = UserRecord::from_fields(id.clone(), &lookup.fields);

        let profile = documents
            .get(&DocumentPath::new(record.role.partition(), id.clone()))
            .await
            .map_err(map_document_error)?
            .ok_or_else(|| Error::not_found("User data not found"))?;
        Ok(ProfileDocument::new(id.clone(), record.role, profile.fields))
    }

    async fn try_sign_out(&self) -> Result<(), Error> {
        let identity = self.context.identity()?;
        identity.sign_out().await.map_err(map_identity_error)?;

        self.session_storage.clear().map_err(map_storage_error)?;
        self.durable_storage
            .remove(REMEMBER_ME_KEY)
            .map_err(map_storage_error)?;
        info!("signed out and cleared client storage");
        Ok(())
    }
}

/// Handle for a callback registered with
/// [`ProfileService::on_auth_state_change`].
///
/// Dropping the handle stops delivery.
#[derive(Debug)]
pub struct AuthObserver {
    task: JoinHandle<()>,
}

impl AuthObserver {
    /// Stop delivering auth state transitions.
    pub fn unsubscribe(self) {
        drop(self);
    }

    /// Whether the delivery task is still running.
    #[must_use]
    pub fn is_active(&self) -> bool {
        !self.task.is_finished()
    }
}

impl Drop for AuthObserver {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[cfg(test)]
#[path = "profile_service_tests.rs"]
mod tests;
