//! Authenticated HTTP pipeline.
//!
//! This module provides the `ApiClient` that carries the session's bearer
//! token on outgoing requests and transparently renews it when the server
//! rejects a credential, plus the error taxonomy for request failures.

pub mod client;
pub mod error;

pub use client::ApiClient;
pub use error::ApiError;
