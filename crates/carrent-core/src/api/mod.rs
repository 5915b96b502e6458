//! REST API client module for the car rental marketplace.
//!
//! This module provides the `ApiClient` for communicating with the
//! marketplace API to list cars, manage rentals, read GPS fixes and
//! notifications, and run the wallet login handshake.
//!
//! Requests are authorized by an [`Interceptor`] that attaches the
//! session's bearer token and tears the session down on a 401.

pub mod client;
pub mod error;

pub use client::{ApiClient, AuthInterceptor, Interceptor, InterceptorHandle};
pub use error::ApiError;
