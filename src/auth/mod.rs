//! Session and credential management.
//!
//! This module provides:
//! - `token`: structural and temporal token validation
//! - `session`: the owned, persisted session value and its derived state
//! - `extract`: tolerant extraction of credentials from server responses
//! - `refresh`: single-flight renewal of the credential pair
//! - `guard`: navigation policy decisions
//!
//! Sessions are persisted to disk on every mutation and reloaded at startup.

pub mod extract;
pub mod guard;
pub mod refresh;
pub mod session;
pub mod token;

pub use guard::{AccessGuard, GuardDecision, RouteRules};
pub use refresh::RefreshCoordinator;
pub use session::{Session, SessionStore, UserProfile};
