//! Route guard: admit or redirect each navigation.
//!
//! SYSTEM CONTEXT
//! ==============
//! View shells ask [`RouteTable::decide`] before showing a view. The decision
//! depends only on the requested path, the session snapshot and the route's
//! access rule; nothing is cached between calls.
//!
//! RULES
//! =====
//! 1. While the session is restoring, only the loading placeholder and public
//!    routes are admitted; everything else waits on the placeholder.
//! 2. Unknown paths go to login.
//! 3. Protected routes without an identity go to login.
//! 4. Role-gated routes the identity's role is not in go to the landing path.

#[cfg(test)]
#[path = "router_test.rs"]
mod router_test;

use std::collections::BTreeSet;

use crate::net::types::Role;
use crate::state::session::Session;

pub const LOGIN_PATH: &str = "/login";
pub const REGISTER_PATH: &str = "/register";
pub const DASHBOARD_PATH: &str = "/dashboard";
pub const PROFILE_PATH: &str = "/profile";
pub const PEDIDOS_PATH: &str = "/pedidos";
pub const ESTADISTICAS_PATH: &str = "/estadisticas";
pub const USERS_PATH: &str = "/users";
pub const USER_EDIT_PATH: &str = "/users/:id/edit";
pub const LOADING_PATH: &str = "/loading";

/// Who may open a route.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Access {
    Public,
    Authenticated,
    /// Authenticated and holding one of these roles.
    Roles(BTreeSet<Role>),
}

impl Access {
    #[must_use]
    pub fn roles(roles: &[Role]) -> Self {
        Self::Roles(roles.iter().copied().collect())
    }
}

/// Outcome of a navigation check.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Decision {
    Allow,
    RedirectTo(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum Segment {
    Static(String),
    Param,
}

#[derive(Clone, Debug)]
struct RouteRule {
    pattern: String,
    segments: Vec<Segment>,
    access: Access,
}

impl RouteRule {
    fn matches(&self, path_segments: &[&str]) -> bool {
        self.segments.len() == path_segments.len()
            && self.segments.iter().zip(path_segments).all(|(segment, part)| match segment {
                Segment::Static(s) => s == part,
                Segment::Param => !part.is_empty(),
            })
    }
}

/// Route patterns with their access rules plus the redirect targets.
#[derive(Clone, Debug)]
pub struct RouteTable {
    rules: Vec<RouteRule>,
    login_path: String,
    landing_path: String,
    loading_path: String,
}

impl Default for RouteTable {
    fn default() -> Self {
        Self::new(LOGIN_PATH, DASHBOARD_PATH, LOADING_PATH)
            .route(LOGIN_PATH, Access::Public)
            .route(REGISTER_PATH, Access::Public)
            .route(DASHBOARD_PATH, Access::Authenticated)
            .route(PROFILE_PATH, Access::Authenticated)
            .route(PEDIDOS_PATH, Access::roles(&[Role::Admin, Role::Staff]))
            .route(ESTADISTICAS_PATH, Access::roles(&[Role::Admin, Role::Staff]))
            .route(USERS_PATH, Access::roles(&[Role::Admin]))
            .route(USER_EDIT_PATH, Access::roles(&[Role::Admin]))
    }
}

impl RouteTable {
    /// An empty table. The landing path should be reachable by every
    /// authenticated role, or role redirects will loop.
    #[must_use]
    pub fn new(login_path: &str, landing_path: &str, loading_path: &str) -> Self {
        Self {
            rules: Vec::new(),
            login_path: normalize_path(login_path),
            landing_path: normalize_path(landing_path),
            loading_path: normalize_path(loading_path),
        }
    }

    /// Register `pattern` (`:name` segments match any one segment).
    #[must_use]
    pub fn route(mut self, pattern: &str, access: Access) -> Self {
        let pattern = normalize_path(pattern);
        let segments = split(&pattern)
            .into_iter()
            .map(|s| if s.starts_with(':') { Segment::Param } else { Segment::Static(s.to_owned()) })
            .collect();
        self.rules.push(RouteRule { pattern, segments, access });
        self
    }

    #[must_use]
    pub fn login_path(&self) -> &str {
        &self.login_path
    }

    #[must_use]
    pub fn landing_path(&self) -> &str {
        &self.landing_path
    }

    #[must_use]
    pub fn loading_path(&self) -> &str {
        &self.loading_path
    }

    /// Access rule of the first pattern matching `path`.
    #[must_use]
    pub fn access_for(&self, path: &str) -> Option<&Access> {
        let path = normalize_path(path);
        let parts = split(&path);
        self.rules.iter().find(|rule| rule.matches(&parts)).map(|rule| &rule.access)
    }

    /// Admit or redirect a navigation to `path`.
    #[must_use]
    pub fn decide(&self, path: &str, session: &Session) -> Decision {
        let path = normalize_path(path);
        let access = self.access_for(&path);

        if session.is_restoring() {
            return if path == self.loading_path || access == Some(&Access::Public) {
                Decision::Allow
            } else {
                self.redirect(&self.loading_path)
            };
        }

        if path == self.loading_path {
            let target = if session.is_authenticated() { &self.landing_path } else { &self.login_path };
            return self.redirect(target);
        }

        match access {
            None => self.redirect(&self.login_path),
            Some(Access::Public) => Decision::Allow,
            Some(Access::Authenticated) if session.is_authenticated() => Decision::Allow,
            Some(Access::Authenticated) => self.redirect(&self.login_path),
            Some(Access::Roles(allowed)) => match session.role() {
                None => self.redirect(&self.login_path),
                Some(role) if allowed.contains(&role) => Decision::Allow,
                Some(_) => self.redirect(&self.landing_path),
            },
        }
    }

    /// Parameter-free patterns `session` may open, in registration order.
    #[must_use]
    pub fn permitted_routes(&self, session: &Session) -> Vec<&str> {
        self.rules
            .iter()
            .filter(|rule| !rule.segments.contains(&Segment::Param))
            .filter(|rule| rule.access != Access::Public)
            .filter(|rule| self.decide(&rule.pattern, session) == Decision::Allow)
            .map(|rule| rule.pattern.as_str())
            .collect()
    }

    fn redirect(&self, target: &str) -> Decision {
        Decision::RedirectTo(target.to_owned())
    }
}

/// Drop query and fragment, force a leading slash, drop trailing slashes.
#[must_use]
pub fn normalize_path(path: &str) -> String {
    let path = path.split(['?', '#']).next().unwrap_or_default().trim();
    let trimmed = path.trim_matches('/');
    format!("/{trimmed}")
}

fn split(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}
