//! Client-side authentication session core.
//!
//! This crate owns the credential pair for a client application talking to a
//! token-based REST API: it validates token freshness, persists the session
//! across restarts, coordinates renewal so that concurrent failing requests
//! trigger at most one refresh, and injects/retries credentials on the
//! request pipeline.
//!
//! UI concerns - what to render, where to navigate - stay in the embedding
//! application, which reads the derived session state (`SessionStore`,
//! `AccessGuard`) and calls the operations exposed here (`ApiClient::login`,
//! `logout`, `fetch_profile`).

pub mod api;
pub mod auth;
pub mod config;

pub use api::{ApiClient, ApiError};
pub use auth::{
    AccessGuard, GuardDecision, RefreshCoordinator, RouteRules, Session, SessionStore, UserProfile,
};
pub use config::Config;
