use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use gatehouse_core::UserId;

/// Tolerated clock skew for `iat` checks between issuing and validating nodes.
pub const ISSUED_AT_LEEWAY_SECS: i64 = 30;

/// Discriminates access tokens from refresh tokens.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

impl core::fmt::Display for TokenKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            TokenKind::Access => f.write_str("access"),
            TokenKind::Refresh => f.write_str("refresh"),
        }
    }
}

/// Signed token payload.
///
/// Never mutated after issuance and never stored server-side: validity is
/// decided entirely by the signature and the time window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    pub user_id: UserId,
    pub email: String,

    #[serde(rename = "type")]
    pub kind: TokenKind,

    /// Issued-at, Unix seconds on the wire.
    #[serde(rename = "iat", with = "chrono::serde::ts_seconds")]
    pub issued_at: DateTime<Utc>,

    /// Expiry, Unix seconds on the wire.
    #[serde(rename = "exp", with = "chrono::serde::ts_seconds")]
    pub expires_at: DateTime<Utc>,

    /// Subject: the user id in string form.
    pub sub: String,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ClaimsError {
    #[error("token has expired")]
    Expired,

    #[error("token not yet valid (issued_at is in the future)")]
    NotYetValid,

    #[error("invalid token time window (expires_at <= issued_at)")]
    InvalidTimeWindow,

    #[error("subject does not match user id")]
    SubjectMismatch,
}

/// Deterministically validate decoded claims against `now`.
///
/// Signature verification happens before this, in the token manager.
pub fn validate_claims(claims: &TokenClaims, now: DateTime<Utc>) -> Result<(), ClaimsError> {
    if claims.expires_at <= claims.issued_at {
        return Err(ClaimsError::InvalidTimeWindow);
    }
    if claims.sub != claims.user_id.to_string() {
        return Err(ClaimsError::SubjectMismatch);
    }
    if now + Duration::seconds(ISSUED_AT_LEEWAY_SECS) < claims.issued_at {
        return Err(ClaimsError::NotYetValid);
    }
    if now > claims.expires_at {
        return Err(ClaimsError::Expired);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims_at(issued_at: DateTime<Utc>, ttl: Duration) -> TokenClaims {
        let user_id = UserId::new();
        TokenClaims {
            user_id,
            email: "ada@example.com".into(),
            kind: TokenKind::Access,
            issued_at,
            expires_at: issued_at + ttl,
            sub: user_id.to_string(),
        }
    }

    #[test]
    fn fresh_claims_are_valid() {
        let now = Utc::now();
        assert_eq!(validate_claims(&claims_at(now, Duration::minutes(15)), now), Ok(()));
    }

    #[test]
    fn expiry_is_exclusive_of_the_deadline_itself() {
        let now = Utc::now();
        let claims = claims_at(now, Duration::minutes(15));
        assert_eq!(validate_claims(&claims, claims.expires_at), Ok(()));
        assert_eq!(
            validate_claims(&claims, claims.expires_at + Duration::seconds(1)),
            Err(ClaimsError::Expired)
        );
    }

    #[test]
    fn future_issued_at_beyond_leeway_is_rejected() {
        let now = Utc::now();
        let claims = claims_at(now + Duration::minutes(5), Duration::minutes(15));
        assert_eq!(validate_claims(&claims, now), Err(ClaimsError::NotYetValid));

        let skewed = claims_at(now + Duration::seconds(5), Duration::minutes(15));
        assert_eq!(validate_claims(&skewed, now), Ok(()));
    }

    #[test]
    fn inverted_window_is_rejected() {
        let now = Utc::now();
        let claims = claims_at(now, Duration::seconds(0));
        assert_eq!(validate_claims(&claims, now), Err(ClaimsError::InvalidTimeWindow));
    }

    #[test]
    fn subject_must_match_user_id() {
        let now = Utc::now();
        let mut claims = claims_at(now, Duration::minutes(15));
        claims.sub = UserId::new().to_string();
        assert_eq!(validate_claims(&claims, now), Err(ClaimsError::SubjectMismatch));
    }

    #[test]
    fn wire_format_uses_jwt_names() {
        let now = Utc::now();
        let claims = claims_at(now, Duration::minutes(15));
        let json = serde_json::to_value(&claims).unwrap();
        assert_eq!(json["type"], "access");
        assert_eq!(json["iat"], now.timestamp());
        assert!(json["exp"].is_number());
        assert_eq!(json["sub"], claims.user_id.to_string());
    }
}
