//! Session state for the current user.
//!
//! SYSTEM CONTEXT
//! ==============
//! One [`SessionStore`] is created at startup and its handle is passed to the
//! auth gateway, the route guard and any view that needs the identity. The
//! store is the only writer of the persisted `token`/`user` entries.
//!
//! INVARIANTS
//! ==========
//! - A token is held iff an identity is held.
//! - `set` and `clear` persist and swap under one lock, so no reader ever
//!   observes a half-applied change.

#[cfg(test)]
#[path = "session_test.rs"]
mod session_test;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::storage::{Change, KeyValueStore, StorageError, json_change, load_json};
use crate::net::types::{Identity, Role};

pub(crate) const TOKEN_KEY: &str = "token";
pub(crate) const USER_KEY: &str = "user";

// =============================================================================
// SESSION
// =============================================================================

/// Immutable snapshot of the authentication state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Session {
    auth: Option<(Identity, String)>,
    restoring: bool,
}

impl Session {
    /// Logged out, restore finished.
    #[must_use]
    pub fn empty() -> Self {
        Self { auth: None, restoring: false }
    }

    /// Logged out, persisted state not loaded yet.
    #[must_use]
    pub fn restoring() -> Self {
        Self { auth: None, restoring: true }
    }

    #[must_use]
    pub fn authenticated(identity: Identity, token: impl Into<String>) -> Self {
        Self { auth: Some((identity, token.into())), restoring: false }
    }

    #[must_use]
    pub fn identity(&self) -> Option<&Identity> {
        self.auth.as_ref().map(|(identity, _)| identity)
    }

    #[must_use]
    pub fn token(&self) -> Option<&str> {
        self.auth.as_ref().map(|(_, token)| token.as_str())
    }

    #[must_use]
    pub fn role(&self) -> Option<Role> {
        self.identity().map(|identity| identity.role)
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.auth.is_some()
    }

    #[must_use]
    pub fn is_restoring(&self) -> bool {
        self.restoring
    }
}

// =============================================================================
// STORE
// =============================================================================

/// Shared handle to the session. Clones refer to the same state.
#[derive(Clone)]
pub struct SessionStore {
    session: Arc<Mutex<Session>>,
    storage: Arc<dyn KeyValueStore>,
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore").field("session", &*self.lock()).finish_non_exhaustive()
    }
}

impl SessionStore {
    /// A store in the `restoring` state; call [`SessionStore::restore`] next.
    #[must_use]
    pub fn new(storage: Arc<dyn KeyValueStore>) -> Self {
        Self { session: Arc::new(Mutex::new(Session::restoring())), storage }
    }

    /// Load the persisted session.
    ///
    /// Missing, half-present or corrupt entries restore as an empty session;
    /// leftovers are removed so the next start is clean.
    pub fn restore(&self) -> Session {
        let mut session = self.lock();
        let token = match self.storage.get(TOKEN_KEY) {
            Ok(token) => token.filter(|t| !t.is_empty()),
            Err(e) => {
                tracing::warn!(error = %e, "session storage unreadable; starting logged out");
                None
            }
        };
        let identity = load_json::<Identity>(self.storage.as_ref(), USER_KEY);

        *session = match (identity, token) {
            (Some(identity), Some(token)) => {
                tracing::info!(user_id = %identity.id, role = %identity.role, "session restored");
                Session::authenticated(identity, token)
            }
            (identity, token) => {
                if identity.is_some() || token.is_some() || self.has_leftovers() {
                    tracing::warn!("discarding incomplete or corrupt persisted session");
                    self.remove_entries();
                }
                Session::empty()
            }
        };
        session.clone()
    }

    /// Replace identity and token together and persist them.
    ///
    /// # Errors
    ///
    /// Returns the storage error if persisting fails; the in-memory session
    /// is left unchanged in that case.
    pub fn set(&self, identity: Identity, token: String) -> Result<(), StorageError> {
        let mut session = self.lock();
        let changes = [Change::Set(TOKEN_KEY, token.clone()), json_change(USER_KEY, &identity)?];
        self.storage.apply(&changes)?;
        *session = Session::authenticated(identity, token);
        Ok(())
    }

    /// Swap the identity, keeping the token, if `expected_token` is still
    /// the active one. Returns `false` when the session moved on (logout or
    /// another login happened while the caller was waiting).
    ///
    /// # Errors
    ///
    /// Returns the storage error if persisting fails.
    pub fn replace_identity(&self, identity: Identity, expected_token: &str) -> Result<bool, StorageError> {
        let mut session = self.lock();
        if session.token() != Some(expected_token) {
            return Ok(false);
        }
        self.storage.apply(&[json_change(USER_KEY, &identity)?])?;
        *session = Session::authenticated(identity, expected_token);
        Ok(true)
    }

    /// Forget identity and token, in memory and in storage.
    ///
    /// A no-op only when nothing is held and nothing is persisted. A store
    /// that has not been restored yet, or whose last removal failed, still
    /// clears its entries.
    pub fn clear(&self) {
        let mut session = self.lock();
        if !session.is_authenticated() && !session.is_restoring() && !self.has_leftovers() {
            return;
        }
        self.remove_entries();
        *session = Session::empty();
    }

    /// Snapshot of the current state.
    #[must_use]
    pub fn current(&self) -> Session {
        self.lock().clone()
    }

    fn has_leftovers(&self) -> bool {
        [TOKEN_KEY, USER_KEY]
            .into_iter()
            .any(|key| !matches!(self.storage.get(key), Ok(None)))
    }

    fn remove_entries(&self) {
        if let Err(e) = self.storage.apply(&[Change::Remove(TOKEN_KEY), Change::Remove(USER_KEY)]) {
            tracing::warn!(error = %e, "failed to remove persisted session");
        }
    }

    fn lock(&self) -> MutexGuard<'_, Session> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
