//! User administration endpoints and list helpers (admin views).

#[cfg(test)]
#[path = "users_test.rs"]
mod users_test;

use super::api::ApiClient;
use super::error::ApiError;
use super::types::{Identity, Role, UserUpdate};

const USERS_PATH: &str = "/api/users/";

const LIST_FAILED: &str = "failed to load users";
const FETCH_FAILED: &str = "failed to load user";
const UPDATE_FAILED: &str = "failed to update user";
const PASSWORD_FAILED: &str = "failed to change password";

fn user_endpoint(id: &str) -> String {
    format!("{USERS_PATH}{id}")
}

fn user_password_endpoint(id: &str) -> String {
    format!("{USERS_PATH}{id}/password")
}

/// Active/inactive totals over a user list.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct UserCounts {
    pub total: usize,
    pub active: usize,
    pub inactive: usize,
}

impl UserCounts {
    #[must_use]
    pub fn of<'a>(users: impl IntoIterator<Item = &'a Identity>) -> Self {
        users.into_iter().fold(Self::default(), |mut counts, user| {
            counts.total += 1;
            if user.active {
                counts.active += 1;
            } else {
                counts.inactive += 1;
            }
            counts
        })
    }
}

/// Users whose email or display name contains `search` (case-insensitive),
/// optionally restricted to one role.
#[must_use]
pub fn filter_users<'a>(users: &'a [Identity], search: &str, role: Option<Role>) -> Vec<&'a Identity> {
    let needle = search.trim().to_lowercase();
    users
        .iter()
        .filter(|user| {
            needle.is_empty()
                || user.email.to_lowercase().contains(&needle)
                || user.display_name.as_deref().is_some_and(|name| name.to_lowercase().contains(&needle))
        })
        .filter(|user| role.is_none_or(|role| user.role == role))
        .collect()
}

/// Admins may toggle anyone's active flag except their own.
#[must_use]
pub fn can_toggle_active(target: &Identity, current: &Identity) -> bool {
    current.role == Role::Admin && target.id != current.id
}

impl ApiClient {
    /// `GET /api/users/`. A body that is not a list yields an empty list.
    ///
    /// # Errors
    ///
    /// Returns an [`ApiError`] for transport failures and non-2xx responses.
    pub async fn list_users(&self, token: &str) -> Result<Vec<Identity>, ApiError> {
        let value: serde_json::Value = self.send_json(self.get(USERS_PATH, token), LIST_FAILED).await?;
        if !value.is_array() {
            tracing::warn!("user list response was not an array");
            return Ok(Vec::new());
        }
        serde_json::from_value(value).map_err(|e| ApiError::Unknown {
            status: None,
            message: format!("unexpected user list: {e}"),
        })
    }

    /// `GET /api/users/{id}`.
    ///
    /// # Errors
    ///
    /// Returns an [`ApiError`] for transport failures and non-2xx responses.
    pub async fn get_user(&self, token: &str, id: &str) -> Result<Identity, ApiError> {
        self.send_json(self.get(&user_endpoint(id), token), FETCH_FAILED).await
    }

    /// `PUT /api/users/{id}` with the full editable record.
    ///
    /// # Errors
    ///
    /// Returns an [`ApiError`] for transport failures and non-2xx responses.
    pub async fn update_user(&self, token: &str, id: &str, update: &UserUpdate) -> Result<(), ApiError> {
        self.send_unit(self.put(&user_endpoint(id), token).json(update), UPDATE_FAILED).await?;
        tracing::info!(user_id = id, role = %update.role, active = update.is_active, "user updated");
        Ok(())
    }

    /// `PATCH /api/users/{id}` toggling only `is_active`.
    ///
    /// # Errors
    ///
    /// Returns an [`ApiError`] for transport failures and non-2xx responses.
    pub async fn set_user_active(&self, token: &str, id: &str, active: bool) -> Result<(), ApiError> {
        let body = serde_json::json!({ "is_active": active });
        self.send_unit(self.patch(&user_endpoint(id), token).json(&body), UPDATE_FAILED).await?;
        tracing::info!(user_id = id, active, "user active flag changed");
        Ok(())
    }

    /// `PUT /api/users/{id}/password`. The caller validates the new password.
    ///
    /// # Errors
    ///
    /// Returns an [`ApiError`] for transport failures and non-2xx responses.
    pub async fn change_user_password(&self, token: &str, id: &str, new_password: &str) -> Result<(), ApiError> {
        let body = serde_json::json!({ "new_password": new_password });
        self.send_unit(self.put(&user_password_endpoint(id), token).json(&body), PASSWORD_FAILED).await?;
        tracing::info!(user_id = id, "user password changed");
        Ok(())
    }
}
