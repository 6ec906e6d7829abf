//! Authentication endpoints as an async trait.
//!
//! SYSTEM CONTEXT
//! ==============
//! [`crate::state::auth::AuthGateway`] talks to the server only through this
//! trait, so tests can drive it with scripted responses while production uses
//! [`crate::net::api::ApiClient`].

use super::error::ApiError;
use super::types::{AuthResponse, Identity, ProfileUpdate};

/// Remote operations behind login, registration and profile management.
#[async_trait::async_trait]
pub trait AuthBackend: Send + Sync {
    /// `POST /api/auth/login`.
    ///
    /// # Errors
    ///
    /// Returns an [`ApiError`] for transport failures and non-2xx responses.
    async fn login(&self, email: &str, password: &str) -> Result<AuthResponse, ApiError>;

    /// `POST /api/auth/register`.
    ///
    /// # Errors
    ///
    /// Returns an [`ApiError`] for transport failures and non-2xx responses.
    async fn register(&self, email: &str, password: &str, full_name: Option<&str>) -> Result<AuthResponse, ApiError>;

    /// `GET /api/users/me`.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Unauthorized`] when the token is rejected.
    async fn fetch_me(&self, token: &str) -> Result<Identity, ApiError>;

    /// `PUT /api/users/me`.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Unauthorized`] when the token is rejected and
    /// [`ApiError::Validation`] when the server refuses the new values.
    async fn update_me(&self, token: &str, update: &ProfileUpdate) -> Result<Identity, ApiError>;
}
