//! Core library for the carrent peer-to-peer car rental marketplace client.
//!
//! - [`api`]: HTTP client for the marketplace API, with request/response
//!   interceptors that attach the session's bearer token.
//! - [`auth`]: session store, wallet challenge-response login, route guard.
//! - [`models`]: cars, rentals, GPS fixes and notifications.
//! - [`poll`]: cancellable background refreshes (GPS, notifications).
//! - [`config`]: on-disk configuration with environment overrides.

pub mod api;
pub mod auth;
pub mod config;
pub mod models;
pub mod poll;
pub mod utils;

pub use api::{ApiClient, ApiError};
pub use auth::{AuthError, LoginFlow, RouteGuard, SessionStore, WalletSigner};
pub use config::Config;
