//! Authenticated request pipeline.
//!
//! `ApiClient` wraps a `reqwest::Client` with two hooks: outgoing requests
//! get the session's bearer token attached when none is set, and a 401
//! response from a non-auth endpoint triggers a single token renewal
//! followed by one retry of the original request.
//!
//! The client is constructed once per process with its collaborators passed
//! in explicitly; nothing here is resolved from ambient state.

use std::time::Duration;

use reqwest::{header, Client, Method, Request, RequestBuilder, Response, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::auth::extract::{extract_refresh_token, extract_token, extract_user};
use crate::auth::refresh::RefreshCoordinator;
use crate::auth::session::{Session, SessionStore, UserProfile};
use crate::config::{Config, LOGIN_PATH, LOGOUT_PATH, PROFILE_PATH};

use super::ApiError;

/// HTTP request timeout in seconds.
/// 30s allows for slow API responses while failing fast enough for good UX.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Request pipeline with credential injection and refresh-and-retry.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ApiClient {
    http: Client,
    config: Config,
    store: SessionStore,
    refresher: RefreshCoordinator,
}

impl ApiClient {
    /// Construct the pipeline and its refresh coordinator around one shared
    /// connection pool.
    pub fn new(config: Config, store: SessionStore) -> Result<Self, ApiError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;
        let refresher = RefreshCoordinator::new(http.clone(), &config, store.clone());
        Ok(Self::with_parts(http, config, store, refresher))
    }

    /// Construct from explicit parts, e.g. to share the coordinator with
    /// other components.
    pub fn with_parts(
        http: Client,
        config: Config,
        store: SessionStore,
        refresher: RefreshCoordinator,
    ) -> Self {
        Self {
            http,
            config,
            store,
            refresher,
        }
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    pub fn refresher(&self) -> &RefreshCoordinator {
        &self.refresher
    }

    /// Start a request against an endpoint path. The result goes through
    /// [`execute`](Self::execute) for credential handling.
    pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http.request(method, self.config.url(path))
    }

    /// Execute a request through the credential pipeline.
    ///
    /// The session's bearer token is attached unless the caller set an
    /// explicit `Authorization` header. A 401 from a non-auth endpoint
    /// triggers a single renewal and one retry of the original request;
    /// every other failure maps straight to [`ApiError`]. When the renewal
    /// fails, the original 401 is what the caller sees.
    pub async fn execute(&self, mut request: Request) -> Result<Response, ApiError> {
        if !request.headers().contains_key(header::AUTHORIZATION) {
            let token = self.store.token();
            if !token.is_empty() {
                request
                    .headers_mut()
                    .insert(header::AUTHORIZATION, bearer_header(&token)?);
            }
        }

        // Snapshot up front; a streaming body cannot be replayed.
        let retry = request.try_clone();
        let path_is_auth = self.config.is_auth_endpoint(request.url().path());

        let response = self.http.execute(request).await?;
        if response.status() != StatusCode::UNAUTHORIZED || path_is_auth {
            return Self::check_response(response).await;
        }

        let Some(mut retry) = retry else {
            return Self::check_response(response).await;
        };

        match self.refresher.refresh().await {
            Some(token) => {
                debug!("Retrying request with renewed credential");
                retry
                    .headers_mut()
                    .insert(header::AUTHORIZATION, bearer_header(&token)?);
                let retried = self.http.execute(retry).await?;
                Self::check_response(retried).await
            }
            // Renewal failed: surface the original 401, not a new error.
            None => Self::check_response(response).await,
        }
    }

    /// Check if response is successful, returning an error with body if not.
    async fn check_response(response: Response) -> Result<Response, ApiError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body))
        }
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let request = self.request(Method::GET, path).build()?;
        let response = self.execute(request).await?;
        response
            .json()
            .await
            .map_err(|e| ApiError::InvalidResponse(e.to_string()))
    }

    pub async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let request = self.request(Method::POST, path).json(body).build()?;
        let response = self.execute(request).await?;
        response
            .json()
            .await
            .map_err(|e| ApiError::InvalidResponse(e.to_string()))
    }

    // ===== Session operations =====

    /// Authenticate with the server and establish a session.
    ///
    /// A rejected login surfaces the richest server-provided message and
    /// never triggers a refresh-and-retry cycle.
    pub async fn login(&self, email: &str, password: &str) -> Result<Session, ApiError> {
        let response = self
            .http
            .post(self.config.url(LOGIN_PATH))
            .json(&serde_json::json!({ "email": email, "password": password }))
            .send()
            .await?;

        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::login_failed(&body));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| ApiError::InvalidResponse(e.to_string()))?;

        let token = extract_token(&body);
        if token.is_empty() {
            return Err(ApiError::InvalidResponse(
                "login response carried no access token".to_string(),
            ));
        }

        let session = Session {
            token,
            refresh_token: extract_refresh_token(&body),
            user: extract_user(&body),
        };
        self.store.replace(session.clone());
        debug!("Login succeeded");
        Ok(session)
    }

    /// End the session. The server call is best-effort; the local session is
    /// always cleared.
    pub async fn logout(&self) {
        let result = match self.request(Method::POST, LOGOUT_PATH).build() {
            Ok(request) => self.execute(request).await.map(|_| ()),
            Err(e) => Err(e.into()),
        };
        if let Err(e) = result {
            debug!(error = %e, "Logout request failed");
        }
        self.store.clear();
    }

    /// Fetch the signed-in user's profile and store it on the session.
    pub async fn fetch_profile(&self) -> Result<UserProfile, ApiError> {
        let body: Value = self.get(PROFILE_PATH).await?;
        let user = extract_user(&body)
            .or_else(|| serde_json::from_value(body.clone()).ok())
            .ok_or_else(|| {
                ApiError::InvalidResponse("profile response carried no user object".to_string())
            })?;
        self.store.set_user(Some(user.clone()));
        Ok(user)
    }
}

fn bearer_header(token: &str) -> Result<header::HeaderValue, ApiError> {
    header::HeaderValue::from_str(&format!("Bearer {}", token))
        .map_err(|_| ApiError::InvalidResponse("access token is not a valid header value".to_string()))
}
