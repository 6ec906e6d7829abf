//! Client library for the pedidos order-management API.
//!
//! SYSTEM CONTEXT
//! ==============
//! View shells (the `pedidos` CLI, or any other front end) trigger
//! [`state::auth::AuthGateway`] operations, the gateway mutates the
//! [`state::session::SessionStore`], and [`router::RouteTable`] reads the
//! store to admit or redirect each navigation. Order and user administration
//! calls live on [`net::api::ApiClient`].

pub mod config;
pub mod forms;
pub mod net;
pub mod router;
pub mod state;

pub use config::ClientConfig;
pub use net::api::ApiClient;
pub use net::error::ApiError;
pub use net::types::{Identity, Role};
pub use router::{Decision, RouteTable};
pub use state::auth::{AuthGateway, AuthResult};
pub use state::session::{Session, SessionStore};
