//! Auth gateway: login, registration, logout and profile sync.
//!
//! SYSTEM CONTEXT
//! ==============
//! View shells call the gateway; the gateway calls the server through an
//! [`AuthBackend`] and writes results into the shared [`SessionStore`].
//!
//! ERROR HANDLING
//! ==============
//! Every operation returns an [`AuthResult`]. Nothing is retried and nothing
//! panics; a failed call leaves the session exactly as it was.
//!
//! CONCURRENCY
//! ===========
//! The gateway imposes no mutual exclusion. Callers disable their triggers
//! while a call is in flight. Profile results are applied only if the token
//! they were fetched with is still the active one.

#[cfg(test)]
#[path = "auth_test.rs"]
mod auth_test;

use super::session::SessionStore;
use crate::net::backend::AuthBackend;
use crate::net::error::ApiError;
use crate::net::types::{AuthResponse, Identity, ProfileUpdate};

const EMPTY_TOKEN: &str = "server returned an empty access token";

/// Outcome of a gateway operation: `Ok` on success, a reasoned failure otherwise.
pub type AuthResult<T = ()> = Result<T, ApiError>;

/// Authentication operations bound to one backend and one session store.
pub struct AuthGateway<B> {
    backend: B,
    session: SessionStore,
}

impl<B: AuthBackend> AuthGateway<B> {
    pub fn new(backend: B, session: SessionStore) -> Self {
        Self { backend, session }
    }

    /// The session store this gateway writes to.
    #[must_use]
    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    #[must_use]
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Log in and store the returned identity and token.
    ///
    /// # Errors
    ///
    /// Returns the server's reason on a non-2xx response, or a transport error.
    pub async fn login(&self, email: &str, password: &str) -> AuthResult {
        let response = self.backend.login(email, password).await.inspect_err(|e| {
            tracing::warn!(error = %e, "login failed");
        })?;
        self.store(response)
    }

    /// Create an account and log straight into it.
    ///
    /// Input is expected to be validated already (see [`crate::forms`]).
    ///
    /// # Errors
    ///
    /// Returns the server's reason on a non-2xx response, or a transport error.
    pub async fn register(&self, email: &str, password: &str, display_name: Option<&str>) -> AuthResult {
        let display_name = display_name.map(str::trim).filter(|n| !n.is_empty());
        let response = self.backend.register(email, password, display_name).await.inspect_err(|e| {
            tracing::warn!(error = %e, "registration failed");
        })?;
        self.store(response)
    }

    /// Forget the session. Always succeeds.
    pub fn logout(&self) {
        let was_logged_in = self.session.current().is_authenticated();
        self.session.clear();
        if was_logged_in {
            tracing::info!("logged out");
        }
    }

    /// Send new profile values and adopt the server's version of the identity.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Unauthorized`] without calling the server when no
    /// token is held, and whenever the server rejects the token.
    pub async fn update_profile(&self, display_name: Option<&str>, email: &str) -> AuthResult<Identity> {
        let token = self.require_token()?;
        let update = ProfileUpdate {
            full_name: display_name.map(str::trim).filter(|n| !n.is_empty()).map(ToOwned::to_owned),
            email: email.trim().to_owned(),
        };
        let identity = self.backend.update_me(&token, &update).await.inspect_err(|e| {
            tracing::warn!(error = %e, reauth = e.requires_reauth(), "profile update failed");
        })?;
        self.adopt(identity, &token, "profile updated")
    }

    /// Re-fetch the identity with the current token.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Unauthorized`] without calling the server when no
    /// token is held, and whenever the server rejects the token.
    pub async fn refresh_profile(&self) -> AuthResult<Identity> {
        let token = self.require_token()?;
        let identity = self.backend.fetch_me(&token).await.inspect_err(|e| {
            tracing::warn!(error = %e, reauth = e.requires_reauth(), "profile refresh failed");
        })?;
        self.adopt(identity, &token, "profile refreshed")
    }

    fn require_token(&self) -> Result<String, ApiError> {
        self.session.current().token().map(ToOwned::to_owned).ok_or_else(ApiError::not_logged_in)
    }

    fn store(&self, response: AuthResponse) -> AuthResult {
        let AuthResponse { access_token, user } = response;
        if access_token.trim().is_empty() {
            tracing::warn!(user_id = %user.id, "server accepted credentials but sent no token");
            return Err(ApiError::Unknown { status: None, message: EMPTY_TOKEN.to_owned() });
        }
        let (user_id, role) = (user.id.clone(), user.role);
        self.session
            .set(user, access_token)
            .map_err(|e| ApiError::Storage(e.to_string()))?;
        tracing::info!(%user_id, %role, "logged in");
        Ok(())
    }

    fn adopt(&self, identity: Identity, token: &str, event: &'static str) -> AuthResult<Identity> {
        let applied = self
            .session
            .replace_identity(identity.clone(), token)
            .map_err(|e| ApiError::Storage(e.to_string()))?;
        if !applied {
            tracing::debug!(user_id = %identity.id, "session changed during request; result not applied");
            return Err(ApiError::Unauthorized("session ended before the response arrived".to_owned()));
        }
        tracing::info!(user_id = %identity.id, "{event}");
        Ok(identity)
    }
}
