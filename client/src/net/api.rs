//! REST client for the pedidos API.
//!
//! Thin `reqwest` wrapper: builds URLs, attaches the bearer token, and turns
//! every response into either a typed body or an [`ApiError`]. Order and user
//! endpoints extend [`ApiClient`] from `net::orders` and `net::users`.
//!
//! ERROR HANDLING
//! ==============
//! Nothing here retries or panics. Transport failures, non-2xx statuses and
//! unreadable bodies all come back as `Err` values with a readable reason.

#[cfg(test)]
#[path = "api_test.rs"]
mod api_test;

use reqwest::RequestBuilder;
use serde::de::DeserializeOwned;

use super::backend::AuthBackend;
use super::error::ApiError;
use super::types::{AuthResponse, Identity, LoginRequest, ProfileUpdate, RegisterRequest};
use crate::config::ClientConfig;

pub(crate) const LOGIN_PATH: &str = "/api/auth/login";
pub(crate) const REGISTER_PATH: &str = "/api/auth/register";
pub(crate) const ME_PATH: &str = "/api/users/me";

pub(crate) const LOGIN_FAILED: &str = "login failed";
pub(crate) const REGISTER_FAILED: &str = "registration failed";
pub(crate) const PROFILE_FETCH_FAILED: &str = "profile fetch failed";
pub(crate) const PROFILE_UPDATE_FAILED: &str = "profile update failed";

// =============================================================================
// CLIENT
// =============================================================================

/// HTTP client bound to one API base URL.
#[derive(Clone, Debug)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    /// Build a client from typed config.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Transport`] if the HTTP client cannot be built.
    pub fn new(config: &ClientConfig) -> Result<Self, ApiError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder
            .build()
            .map_err(|e| ApiError::Transport(format!("HTTP client build failed: {e}")))?;
        Ok(Self { http, base_url: config.api_url.clone() })
    }

    /// API base URL without a trailing slash.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub(crate) fn url(&self, path: &str) -> String {
        join_url(&self.base_url, path)
    }

    pub(crate) fn get(&self, path: &str, token: &str) -> RequestBuilder {
        self.http.get(self.url(path)).bearer_auth(token)
    }

    pub(crate) fn put(&self, path: &str, token: &str) -> RequestBuilder {
        self.http.put(self.url(path)).bearer_auth(token)
    }

    pub(crate) fn post(&self, path: &str, token: &str) -> RequestBuilder {
        self.http.post(self.url(path)).bearer_auth(token)
    }

    pub(crate) fn patch(&self, path: &str, token: &str) -> RequestBuilder {
        self.http.patch(self.url(path)).bearer_auth(token)
    }

    /// Send `request` and decode a JSON body on success.
    pub(crate) async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder, fallback: &str) -> Result<T, ApiError> {
        let (status, text) = self.send_raw(request, fallback).await?;
        parse_body(status, &text)
    }

    /// Send `request` and discard the success body.
    pub(crate) async fn send_unit(&self, request: RequestBuilder, fallback: &str) -> Result<(), ApiError> {
        self.send_raw(request, fallback).await.map(|_| ())
    }

    async fn send_raw(&self, request: RequestBuilder, fallback: &str) -> Result<(u16, String), ApiError> {
        let response = request.send().await.map_err(|e| {
            tracing::warn!(error = %e, "request failed before a response arrived");
            ApiError::Transport(e.to_string())
        })?;
        let status = response.status().as_u16();
        let url = response.url().path().to_owned();
        let text = response.text().await.map_err(|e| ApiError::Transport(e.to_string()))?;
        tracing::debug!(%status, path = %url, "api response");

        if !(200..300).contains(&status) {
            return Err(ApiError::from_response(status, &text, fallback));
        }
        Ok((status, text))
    }
}

#[async_trait::async_trait]
impl AuthBackend for ApiClient {
    async fn login(&self, email: &str, password: &str) -> Result<AuthResponse, ApiError> {
        let request = self.http.post(self.url(LOGIN_PATH)).json(&LoginRequest { email, password });
        self.send_json(request, LOGIN_FAILED).await
    }

    async fn register(&self, email: &str, password: &str, full_name: Option<&str>) -> Result<AuthResponse, ApiError> {
        let body = RegisterRequest { email, password, full_name };
        let request = self.http.post(self.url(REGISTER_PATH)).json(&body);
        self.send_json(request, REGISTER_FAILED).await
    }

    async fn fetch_me(&self, token: &str) -> Result<Identity, ApiError> {
        self.send_json(self.get(ME_PATH, token), PROFILE_FETCH_FAILED).await
    }

    async fn update_me(&self, token: &str, update: &ProfileUpdate) -> Result<Identity, ApiError> {
        self.send_json(self.put(ME_PATH, token).json(update), PROFILE_UPDATE_FAILED).await
    }
}

// =============================================================================
// HELPERS
// =============================================================================

fn join_url(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}

fn parse_body<T: DeserializeOwned>(status: u16, text: &str) -> Result<T, ApiError> {
    serde_json::from_str(text).map_err(|e| ApiError::Unknown {
        status: Some(status),
        message: format!("unexpected response body: {e}"),
    })
}
