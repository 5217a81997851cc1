//! Token decoding and validation.
//!
//! Tokens are JWT-shaped (`header.payload.signature`). Only the payload
//! segment is inspected here; signature verification is the server's job.
//! Decoding is a pure, total function from string to claims - a malformed
//! token yields `None`, never an error.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde_json::Value;

/// Claims carried in a token payload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Claims {
    /// Expiry as seconds since the Unix epoch. Tokens without a numeric
    /// `exp` never expire.
    pub exp: Option<i64>,
    /// Role claim consumed by route guards.
    pub role: Option<String>,
}

/// Decode the payload segment of a token.
///
/// Returns `None` unless the token has exactly three dot-separated segments,
/// the middle segment is base64url, and the decoded bytes are a JSON object.
pub fn decode_claims(token: &str) -> Option<Claims> {
    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 3 {
        return None;
    }

    // Issuers are inconsistent about padding; strip it before decoding.
    let segment = parts[1].trim_end_matches('=');
    let bytes = URL_SAFE_NO_PAD.decode(segment).ok()?;
    let payload: Value = serde_json::from_slice(&bytes).ok()?;
    let payload = payload.as_object()?;

    Some(Claims {
        // A non-numeric exp counts as absent, not as malformed.
        exp: payload.get("exp").and_then(Value::as_i64),
        role: payload
            .get("role")
            .and_then(Value::as_str)
            .map(str::to_string),
    })
}

/// Validate token structure and expiry against the given wall-clock time
/// (seconds since the Unix epoch).
pub fn is_token_valid_at(token: &str, now_secs: i64) -> bool {
    if token.is_empty() {
        return false;
    }

    match decode_claims(token) {
        None => false,
        Some(claims) => match claims.exp {
            // No expiry claim: the token does not expire.
            None => true,
            // Strict inequality: a token expiring exactly now is expired.
            Some(exp) => exp > now_secs,
        },
    }
}

/// Validate token structure and expiry against the current time.
pub fn is_token_valid(token: &str) -> bool {
    is_token_valid_at(token, chrono::Utc::now().timestamp())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::testing::make_token;

    #[test]
    fn test_decode_requires_three_segments() {
        assert_eq!(decode_claims(""), None);
        assert_eq!(decode_claims("abc"), None);
        assert_eq!(decode_claims("a.b"), None);
        assert_eq!(decode_claims("a.b.c.d"), None);
    }

    #[test]
    fn test_decode_rejects_bad_base64() {
        assert_eq!(decode_claims("header.$$$$.sig"), None);
    }

    #[test]
    fn test_decode_rejects_non_json_payload() {
        let payload = URL_SAFE_NO_PAD.encode("not json");
        assert_eq!(decode_claims(&format!("h.{}.s", payload)), None);
    }

    #[test]
    fn test_decode_rejects_non_object_payload() {
        let array = URL_SAFE_NO_PAD.encode("[1,2,3]");
        assert_eq!(decode_claims(&format!("h.{}.s", array)), None);

        let number = URL_SAFE_NO_PAD.encode("42");
        assert_eq!(decode_claims(&format!("h.{}.s", number)), None);
    }

    #[test]
    fn test_decode_reads_exp_and_role() {
        let token = make_token(r#"{"exp":1754560000,"role":"admin"}"#);
        let claims = decode_claims(&token).expect("claims");
        assert_eq!(claims.exp, Some(1754560000));
        assert_eq!(claims.role.as_deref(), Some("admin"));
    }

    #[test]
    fn test_decode_tolerates_padded_segment() {
        use base64::engine::general_purpose::URL_SAFE;

        // Same payload, but with '=' padding on the segment.
        let padded = URL_SAFE.encode(r#"{"exp":99}"#);
        assert!(padded.ends_with('='));
        let claims = decode_claims(&format!("h.{}.s", padded)).expect("claims");
        assert_eq!(claims.exp, Some(99));
    }

    #[test]
    fn test_expired_token_is_invalid() {
        let now = 1_700_000_000;
        let token = make_token(&format!(r#"{{"exp":{}}}"#, now - 1));
        assert!(!is_token_valid_at(&token, now));
    }

    #[test]
    fn test_future_token_is_valid() {
        let now = 1_700_000_000;
        let token = make_token(&format!(r#"{{"exp":{}}}"#, now + 1));
        assert!(is_token_valid_at(&token, now));
    }

    #[test]
    fn test_token_expiring_exactly_now_is_expired() {
        let now = 1_700_000_000;
        let token = make_token(&format!(r#"{{"exp":{}}}"#, now));
        assert!(!is_token_valid_at(&token, now));
    }

    #[test]
    fn test_token_without_exp_never_expires() {
        let token = make_token(r#"{"sub":"user-1"}"#);
        assert!(is_token_valid_at(&token, i64::MAX - 1));
    }

    #[test]
    fn test_non_numeric_exp_counts_as_absent() {
        let token = make_token(r#"{"exp":"soon"}"#);
        assert!(is_token_valid_at(&token, 1_700_000_000));
    }

    #[test]
    fn test_empty_and_malformed_tokens_are_invalid() {
        assert!(!is_token_valid_at("", 0));
        assert!(!is_token_valid_at("not-a-token", 0));
    }
}
