//! Client configuration.
//!
//! Holds the API base URL and the directory where the session is persisted.
//! The authentication endpoint paths are fixed; the base URL comes from the
//! embedding application or from the environment.

use std::path::PathBuf;

use anyhow::Result;
use tracing::warn;

/// Application name used for the default storage directory path
const APP_NAME: &str = "authflow";

/// Environment variable naming the API base URL
const API_URL_VAR: &str = "AUTHFLOW_API_URL";

/// Fallback base URL when the environment does not provide one
const DEFAULT_API_URL: &str = "http://localhost:8000";

/// Login endpoint path. Never triggers a refresh-and-retry cycle on 401.
pub const LOGIN_PATH: &str = "/auth/login";

/// Token renewal endpoint path. Never triggers a refresh-and-retry cycle on 401.
pub const REFRESH_PATH: &str = "/auth/refresh";

/// Logout endpoint path
pub const LOGOUT_PATH: &str = "/auth/logout";

/// Current-user profile endpoint path
pub const PROFILE_PATH: &str = "/auth/me";

#[derive(Debug, Clone)]
pub struct Config {
    pub base_url: String,
    pub storage_dir: PathBuf,
}

impl Config {
    /// Create a config for the given base URL, storing the session under the
    /// platform cache directory.
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;

        Ok(Self {
            base_url: base_url.into(),
            storage_dir: cache_dir.join(APP_NAME),
        })
    }

    /// Build a config from the environment, loading `.env` if present.
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (silently ignore if not found)
        let _ = dotenvy::dotenv();

        let base_url = match std::env::var(API_URL_VAR) {
            Ok(url) if !url.is_empty() => url,
            _ => {
                warn!("Missing {}. Requests will use {}.", API_URL_VAR, DEFAULT_API_URL);
                DEFAULT_API_URL.to_string()
            }
        };

        Self::new(base_url)
    }

    pub fn with_storage_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.storage_dir = dir.into();
        self
    }

    /// Absolute URL for an endpoint path.
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    /// Whether a URL path targets an authentication endpoint that must never
    /// trigger a refresh-and-retry cycle on 401.
    pub fn is_auth_endpoint(&self, path: &str) -> bool {
        path.ends_with(LOGIN_PATH) || path.ends_with(REFRESH_PATH)
    }
}
