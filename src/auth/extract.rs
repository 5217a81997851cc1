//! Extraction of credentials from loosely-shaped server responses.
//!
//! Different backends spell the same fields differently (`token` vs
//! `access_token`, top level vs nested under `data`). Each extractor tries a
//! fixed priority list of field paths and falls back to an empty value.

use serde_json::Value;

use super::session::UserProfile;

/// Field paths tried for the access token, in priority order.
const TOKEN_PATHS: [&[&str]; 4] = [
    &["access_token"],
    &["token"],
    &["data", "access_token"],
    &["data", "token"],
];

/// Field paths tried for the refresh token, in priority order.
const REFRESH_TOKEN_PATHS: [&[&str]; 4] = [
    &["refresh_token"],
    &["refreshToken"],
    &["data", "refresh_token"],
    &["data", "refreshToken"],
];

/// Field paths tried for the user object, in priority order.
const USER_PATHS: [&[&str]; 2] = [&["user"], &["data", "user"]];

/// Message shown when the server supplies no structured error detail.
pub const GENERIC_LOGIN_ERROR: &str = "Login failed. Please try again.";

fn lookup<'a>(value: &'a Value, path: &[&str]) -> Option<&'a Value> {
    path.iter().try_fold(value, |v, key| v.get(key))
}

fn first_string(value: &Value, paths: &[&[&str]]) -> String {
    paths
        .iter()
        .find_map(|path| lookup(value, path).and_then(Value::as_str))
        .unwrap_or_default()
        .to_string()
}

/// Access token from a login or renewal response, or empty.
pub fn extract_token(value: &Value) -> String {
    first_string(value, &TOKEN_PATHS)
}

/// Refresh token from a login or renewal response, or empty.
pub fn extract_refresh_token(value: &Value) -> String {
    first_string(value, &REFRESH_TOKEN_PATHS)
}

/// User object from a response. Only JSON objects are accepted; arrays and
/// scalars yield `None`.
pub fn extract_user(value: &Value) -> Option<UserProfile> {
    USER_PATHS
        .iter()
        .filter_map(|path| lookup(value, path))
        .find(|v| v.is_object())
        .and_then(|v| serde_json::from_value(v.clone()).ok())
}

/// Pick the richest human-readable message from an error response body.
///
/// Priority: first entry of the `errors` field map, then `message`, then
/// `error`, then the generic fallback.
pub fn server_error_message(body: &str) -> String {
    let value: Value = match serde_json::from_str(body) {
        Ok(value) => value,
        Err(_) => return GENERIC_LOGIN_ERROR.to_string(),
    };

    let field_error = value
        .get("errors")
        .and_then(Value::as_object)
        .and_then(|errors| errors.values().next())
        .and_then(|messages| messages.get(0))
        .and_then(Value::as_str);

    field_error
        .or_else(|| value.get("message").and_then(Value::as_str))
        .or_else(|| value.get("error").and_then(Value::as_str))
        .unwrap_or(GENERIC_LOGIN_ERROR)
        .to_string()
}
