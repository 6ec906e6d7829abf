//! Client-side state: durable storage, the session, and the auth gateway.
//!
//! SYSTEM CONTEXT
//! ==============
//! `storage` persists raw entries, `session` owns the identity/token pair on
//! top of it, and `auth` is the only component that talks to the server to
//! change that pair.

pub mod auth;
pub mod session;
pub mod storage;
