//! Session state and persistence.
//!
//! `SessionStore` owns the canonical credential record: the access token,
//! the refresh token, and the signed-in user's profile. Every mutation
//! replaces the whole value and synchronously persists it, so a restart
//! never observes a half-written session. All other components hold a clone
//! of the store and go through its operations; nothing mutates session
//! fields in place.

use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use super::token;

/// Session file name in the storage directory
const SESSION_FILE: &str = "session.json";

/// Legacy storage file holding the raw access token alone.
/// Migrated into `session.json` on first load, then deleted.
const LEGACY_TOKEN_FILE: &str = "auth_token";

/// Profile of the signed-in user as supplied by the server.
///
/// Every field is optional on the wire; unknown keys are kept so the profile
/// round-trips through persistence unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// The authoritative credential record.
///
/// Tokens are empty strings when absent, never null, so the persisted shape
/// stays stable across round-trips.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Session {
    #[serde(default)]
    pub token: String,
    #[serde(default, rename = "refreshToken")]
    pub refresh_token: String,
    #[serde(default)]
    pub user: Option<UserProfile>,
}

/// Parse a persisted session payload.
///
/// Anything that is not a JSON object at the top level is corrupt and yields
/// `None`; an individual field of the wrong type degrades to its empty
/// default while the rest of the object is kept.
fn parse_stored_session(raw: &str) -> Option<Session> {
    let value: Value = serde_json::from_str(raw).ok()?;
    let map = value.as_object()?;

    let token = map
        .get("token")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let refresh_token = map
        .get("refreshToken")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let user = map
        .get("user")
        .filter(|v| v.is_object())
        .and_then(|v| serde_json::from_value(v.clone()).ok());

    Some(Session {
        token,
        refresh_token,
        user,
    })
}

struct StoreInner {
    storage_dir: PathBuf,
    session: RwLock<Session>,
}

/// Single owner of the session value.
///
/// Clone is cheap - state is shared behind an Arc, so the request pipeline,
/// the refresh coordinator, and route guards all observe the same session.
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<StoreInner>,
}

impl SessionStore {
    /// Load the persisted session from `storage_dir`, or start empty.
    ///
    /// A file that fails structural parsing is purged and replaced by the
    /// empty session; corruption is never surfaced to callers.
    pub fn load(storage_dir: impl Into<PathBuf>) -> Self {
        let storage_dir = storage_dir.into();
        let session = read_stored_session(&storage_dir);
        Self {
            inner: Arc::new(StoreInner {
                storage_dir,
                session: RwLock::new(session),
            }),
        }
    }

    // ===== Reads =====

    /// Latest session value, always fully populated.
    pub fn current(&self) -> Session {
        self.inner
            .session
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn token(&self) -> String {
        self.current().token
    }

    pub fn refresh_token(&self) -> String {
        self.current().refresh_token
    }

    pub fn user(&self) -> Option<UserProfile> {
        self.current().user
    }

    // ===== Derived validity (computed fresh on every read) =====

    pub fn is_token_valid(&self) -> bool {
        token::is_token_valid(&self.token())
    }

    /// A renewal is possible while a refresh token is held.
    pub fn can_refresh(&self) -> bool {
        !self.refresh_token().is_empty()
    }

    /// A session is still usable when renewal is possible, even if the
    /// access token itself has expired.
    pub fn is_authenticated(&self) -> bool {
        self.is_token_valid() || self.can_refresh()
    }

    /// Role used by route guards: the profile field wins over the token claim.
    pub fn role(&self) -> Option<String> {
        let session = self.current();
        if let Some(role) = session.user.as_ref().and_then(|u| u.role.clone()) {
            return Some(role);
        }
        token::decode_claims(&session.token).and_then(|claims| claims.role)
    }

    // ===== Mutations (full-value replace, persisted before returning) =====

    /// Overwrite the whole session. Nothing is inherited from the prior value.
    pub fn replace(&self, session: Session) {
        self.store(session);
    }

    /// Replace the access token, preserving all other fields.
    pub fn set_token(&self, token: impl Into<String>) {
        let mut session = self.current();
        session.token = token.into();
        self.store(session);
    }

    /// Replace the refresh token, preserving all other fields.
    pub fn set_refresh_token(&self, refresh_token: impl Into<String>) {
        let mut session = self.current();
        session.refresh_token = refresh_token.into();
        self.store(session);
    }

    /// Replace the user profile, preserving all other fields.
    pub fn set_user(&self, user: Option<UserProfile>) {
        let mut session = self.current();
        session.user = user;
        self.store(session);
    }

    /// Reset to the empty session and drop the persisted file.
    pub fn clear(&self) {
        let mut guard = self
            .inner
            .session
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let path = self.inner.storage_dir.join(SESSION_FILE);
        if path.exists() {
            let _ = std::fs::remove_file(&path);
        }
        *guard = Session::default();
    }

    fn store(&self, session: Session) {
        // Hold the write lock across persist so the in-memory and on-disk
        // values change together.
        let mut guard = self
            .inner
            .session
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        persist(&self.inner.storage_dir, &session);
        *guard = session;
    }
}

fn read_stored_session(dir: &Path) -> Session {
    let path = dir.join(SESSION_FILE);
    if let Ok(raw) = std::fs::read_to_string(&path) {
        if let Some(session) = parse_stored_session(&raw) {
            return session;
        }
        warn!(path = %path.display(), "Purging corrupt session file");
        let _ = std::fs::remove_file(&path);
        return Session::default();
    }

    // One-time migration from the legacy single-token layout.
    match migrate_legacy(dir) {
        Some(session) => {
            persist(dir, &session);
            session
        }
        None => Session::default(),
    }
}

/// Read and delete the legacy `auth_token` file, synthesizing a session from
/// it. The file is deleted regardless of content so migration never runs
/// twice.
fn migrate_legacy(dir: &Path) -> Option<Session> {
    let path = dir.join(LEGACY_TOKEN_FILE);
    let raw = std::fs::read_to_string(&path).ok()?;
    let _ = std::fs::remove_file(&path);

    let token = raw.trim().to_string();
    if token.is_empty() {
        return None;
    }

    debug!("Migrated legacy auth token");
    Some(Session {
        token,
        refresh_token: String::new(),
        user: None,
    })
}

fn persist(dir: &Path, session: &Session) {
    if let Err(e) = try_persist(dir, session) {
        warn!(error = %e, "Failed to persist session");
    }
}

fn try_persist(dir: &Path, session: &Session) -> anyhow::Result<()> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(SESSION_FILE);
    let tmp = dir.join(format!("{}.tmp", SESSION_FILE));
    let contents = serde_json::to_string_pretty(session)?;
    std::fs::write(&tmp, contents)?;
    // Rename is atomic on the same filesystem.
    std::fs::rename(&tmp, &path)?;
    Ok(())
}
