//! Networking modules for the pedidos REST API.
//!
//! SYSTEM CONTEXT
//! ==============
//! `api` owns the HTTP client, `backend` is the auth seam the gateway depends
//! on, `orders` and `users` add the management endpoints, `error` classifies
//! failures and `types` defines the wire schema.

pub mod api;
pub mod backend;
pub mod error;
pub mod orders;
pub mod types;
pub mod users;
