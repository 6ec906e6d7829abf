//! Error taxonomy for every remote call.
//!
//! ERROR HANDLING
//! ==============
//! Failures are returned as data. HTTP statuses are classified once here so
//! callers can branch on the variant (re-login, show a permission notice,
//! show a form error) and print `reason()` verbatim.

#[cfg(test)]
#[path = "error_test.rs"]
mod error_test;

use super::types::ErrorBody;

/// Errors produced by API and session operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    /// Missing, expired or invalid credential token.
    #[error("{0}")]
    Unauthorized(String),

    /// The server refused the action for the current role.
    #[error("{0}")]
    Forbidden(String),

    /// The server rejected the input.
    #[error("{0}")]
    Validation(String),

    /// The request never produced an HTTP response.
    #[error("network error: {0}")]
    Transport(String),

    /// Unclassified status or an unreadable response body.
    #[error("{message}")]
    Unknown { status: Option<u16>, message: String },

    /// The session could not be persisted locally.
    #[error("session storage failed: {0}")]
    Storage(String),
}

impl ApiError {
    /// Error returned when an operation needs a token and none is held.
    #[must_use]
    pub fn not_logged_in() -> Self {
        Self::Unauthorized("not logged in".to_owned())
    }

    /// Classify a non-success response.
    ///
    /// `fallback` is used whenever the body carries no usable `detail`.
    #[must_use]
    pub fn from_response(status: u16, body: &str, fallback: &str) -> Self {
        let message = detail_message(body).unwrap_or_else(|| fallback.to_owned());
        match status {
            401 => Self::Unauthorized(message),
            403 => Self::Forbidden(message),
            400 | 404 | 409 | 422 => Self::Validation(message),
            _ => Self::Unknown { status: Some(status), message },
        }
    }

    /// Human-readable reason, without any prefix.
    #[must_use]
    pub fn reason(&self) -> &str {
        match self {
            Self::Unauthorized(m) | Self::Forbidden(m) | Self::Validation(m) | Self::Transport(m) | Self::Storage(m) => m,
            Self::Unknown { message, .. } => message,
        }
    }

    /// Whether the caller has to log in again before retrying.
    #[must_use]
    pub fn requires_reauth(&self) -> bool {
        matches!(self, Self::Unauthorized(_))
    }
}

/// Extract the server's message from an error body.
///
/// Accepts `{"detail": "text"}` and validation lists of the form
/// `{"detail": [{"msg": "text", ...}, ...]}`.
pub(crate) fn detail_message(body: &str) -> Option<String> {
    let parsed: ErrorBody = serde_json::from_str(body).ok()?;
    match parsed.detail {
        serde_json::Value::String(text) => Some(text).filter(|t| !t.trim().is_empty()),
        serde_json::Value::Array(items) => {
            let messages: Vec<&str> = items
                .iter()
                .filter_map(|item| item.get("msg").and_then(serde_json::Value::as_str))
                .collect();
            if messages.is_empty() { None } else { Some(messages.join("; ")) }
        }
        _ => None,
    }
}
