//! Single-flight token renewal.
//!
//! Concurrent callers that observe a rejected credential all attach to the
//! same in-flight renewal and share its outcome. The in-flight slot is
//! cleared only once the outcome settles, so a second renewal can start
//! strictly after the first finishes.

use std::sync::{Arc, Mutex, PoisonError};

use futures::future::{BoxFuture, FutureExt, Shared};
use reqwest::Client;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::config::{Config, REFRESH_PATH};

use super::extract::{extract_refresh_token, extract_token, extract_user};
use super::session::{Session, SessionStore};

/// Outcome future shared by every caller of an in-flight renewal.
type PendingRefresh = Shared<BoxFuture<'static, Option<String>>>;

struct CoordinatorInner {
    http: Client,
    refresh_url: String,
    store: SessionStore,
    in_flight: Mutex<Option<PendingRefresh>>,
}

/// De-duplicates concurrent renewals of the credential pair.
///
/// Clone is cheap - state is shared behind an Arc.
#[derive(Clone)]
pub struct RefreshCoordinator {
    inner: Arc<CoordinatorInner>,
}

impl RefreshCoordinator {
    /// `http` should be the pipeline's client so the connection pool is
    /// shared.
    pub fn new(http: Client, config: &Config, store: SessionStore) -> Self {
        Self {
            inner: Arc::new(CoordinatorInner {
                http,
                refresh_url: config.url(REFRESH_PATH),
                store,
                in_flight: Mutex::new(None),
            }),
        }
    }

    /// Renew the credential pair, returning the new access token.
    ///
    /// `None` means the renewal failed and the session has been cleared;
    /// absence of a token is the failure signal - this never errors. If a
    /// renewal is already in progress the caller receives its outcome
    /// instead of starting another.
    pub async fn refresh(&self) -> Option<String> {
        let pending = {
            let mut slot = self
                .inner
                .in_flight
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            if let Some(pending) = slot.as_ref() {
                debug!("Joining in-flight token renewal");
                pending.clone()
            } else {
                let inner = Arc::clone(&self.inner);
                let pending: PendingRefresh = async move {
                    let outcome = renew(&inner).await;
                    // Settled: allow the next renewal to start.
                    inner
                        .in_flight
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .take();
                    outcome
                }
                .boxed()
                .shared();
                *slot = Some(pending.clone());
                pending
            }
        };

        pending.await
    }
}

/// Issue the single renewal call and apply its outcome to the session.
async fn renew(inner: &CoordinatorInner) -> Option<String> {
    let current = inner.store.current();
    if current.refresh_token.is_empty() {
        // Nothing to renew with; fail without a network call.
        inner.store.clear();
        return None;
    }

    let response = inner
        .http
        .post(&inner.refresh_url)
        .json(&json!({ "refresh_token": current.refresh_token }))
        .send()
        .await;

    let body: Value = match response {
        Ok(response) if response.status().is_success() => match response.json().await {
            Ok(body) => body,
            Err(e) => {
                warn!(error = %e, "Token renewal returned an unreadable body");
                inner.store.clear();
                return None;
            }
        },
        Ok(response) => {
            warn!(status = %response.status(), "Token renewal rejected");
            inner.store.clear();
            return None;
        }
        Err(e) => {
            warn!(error = %e, "Token renewal request failed");
            inner.store.clear();
            return None;
        }
    };

    let token = extract_token(&body);
    if token.is_empty() {
        warn!("Token renewal response carried no access token");
        inner.store.clear();
        return None;
    }

    // Preserve the previous refresh token and profile when the response
    // omits them.
    let new_refresh = extract_refresh_token(&body);
    let refresh_token = if new_refresh.is_empty() {
        current.refresh_token
    } else {
        new_refresh
    };
    let user = extract_user(&body).or(current.user);

    inner.store.replace(Session {
        token: token.clone(),
        refresh_token,
        user,
    });
    debug!("Token renewal succeeded");
    Some(token)
}
