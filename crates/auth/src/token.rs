//! Token manager: issues and validates HS256-signed access/refresh pairs.

use std::collections::HashSet;
use std::time::Duration;

use chrono::{DateTime, SubsecRound, TimeDelta, Utc};
use jsonwebtoken::errors::ErrorKind as JwtErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::Serialize;
use thiserror::Error;

use gatehouse_core::{AppError, UserId};

use crate::claims::{ClaimsError, TokenClaims, TokenKind, validate_claims};

/// The only accepted signing algorithm.
pub const SIGNING_ALGORITHM: Algorithm = Algorithm::HS256;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    /// Bad signature, unexpected algorithm, malformed structure or claims.
    #[error("invalid token: {0}")]
    Invalid(String),

    #[error("token has expired")]
    Expired,

    #[error("failed to sign token: {0}")]
    Signing(String),

    #[error("invalid token configuration: {0}")]
    Config(String),
}

impl From<TokenError> for AppError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Invalid(_) => AppError::unauthorized("invalid token"),
            TokenError::Expired => AppError::unauthorized("token has expired"),
            TokenError::Signing(_) | TokenError::Config(_) => AppError::internal(err.to_string()),
        }
    }
}

/// Signing secret and lifetimes.
#[derive(Clone)]
pub struct TokenConfig {
    pub secret: String,
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
}

impl TokenConfig {
    pub fn new(secret: impl Into<String>, access_ttl: Duration, refresh_ttl: Duration) -> Self {
        Self {
            secret: secret.into(),
            access_ttl,
            refresh_ttl,
        }
    }

    /// Build from human-readable durations such as `"15m"` or `"7d"`.
    pub fn from_human(secret: impl Into<String>, access_ttl: &str, refresh_ttl: &str) -> Result<Self, TokenError> {
        let access_ttl = parse_ttl(access_ttl, "access token TTL")?;
        let refresh_ttl = parse_ttl(refresh_ttl, "refresh token TTL")?;
        Ok(Self::new(secret, access_ttl, refresh_ttl))
    }
}

fn parse_ttl(value: &str, what: &str) -> Result<Duration, TokenError> {
    humantime::parse_duration(value.trim())
        .map_err(|e| TokenError::Config(format!("invalid {what} '{value}': {e}")))
}

impl core::fmt::Debug for TokenConfig {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TokenConfig")
            .field("secret", &"<redacted>")
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .finish()
    }
}

/// A freshly issued access/refresh pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Issues and validates signed tokens.
///
/// Immutable after construction; cheap to share behind an `Arc`.
pub struct TokenManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    access_ttl: TimeDelta,
    refresh_ttl: TimeDelta,
}

impl TokenManager {
    pub fn new(config: TokenConfig) -> Result<Self, TokenError> {
        if config.secret.is_empty() {
            return Err(TokenError::Config("signing secret is empty".to_string()));
        }
        if config.secret.len() < 32 {
            tracing::warn!("token signing secret is shorter than 32 bytes");
        }

        let access_ttl = positive_ttl(config.access_ttl, "access")?;
        let refresh_ttl = positive_ttl(config.refresh_ttl, "refresh")?;

        // Expiry and issued-at are checked by `validate_claims` against an
        // injectable clock, so the library only verifies signature and shape.
        let mut validation = Validation::new(SIGNING_ALGORITHM);
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.validate_aud = false;
        validation.leeway = 0;
        validation.required_spec_claims = HashSet::from(["exp".to_string(), "sub".to_string()]);

        Ok(Self {
            encoding_key: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.secret.as_bytes()),
            validation,
            access_ttl,
            refresh_ttl,
        })
    }

    pub fn issue_pair(&self, user_id: UserId, email: &str) -> Result<TokenPair, TokenError> {
        self.issue_pair_at(user_id, email, Utc::now())
    }

    /// Issue both tokens as of `now`. They differ only in kind and lifetime.
    pub fn issue_pair_at(
        &self,
        user_id: UserId,
        email: &str,
        now: DateTime<Utc>,
    ) -> Result<TokenPair, TokenError> {
        Ok(TokenPair {
            access_token: self.issue_at(user_id, email, TokenKind::Access, now)?,
            refresh_token: self.issue_at(user_id, email, TokenKind::Refresh, now)?,
        })
    }

    pub fn issue_at(
        &self,
        user_id: UserId,
        email: &str,
        kind: TokenKind,
        now: DateTime<Utc>,
    ) -> Result<String, TokenError> {
        // The wire format has second precision.
        let issued_at = now.trunc_subsecs(0);
        let ttl = match kind {
            TokenKind::Access => self.access_ttl,
            TokenKind::Refresh => self.refresh_ttl,
        };

        let expires_at = issued_at
            .checked_add_signed(ttl)
            .ok_or_else(|| TokenError::Config(format!("{kind} token expiry is out of range")))?;

        let claims = TokenClaims {
            user_id,
            email: email.to_string(),
            kind,
            issued_at,
            expires_at,
            sub: user_id.to_string(),
        };

        encode(&Header::new(SIGNING_ALGORITHM), &claims, &self.encoding_key)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }

    pub fn validate(&self, token: &str) -> Result<TokenClaims, TokenError> {
        self.validate_at(token, Utc::now())
    }

    /// Verify signature and algorithm, decode, then check the time window.
    ///
    /// Stateless: no replay cache and no revocation list are consulted.
    pub fn validate_at(&self, token: &str, now: DateTime<Utc>) -> Result<TokenClaims, TokenError> {
        let data = decode::<TokenClaims>(token, &self.decoding_key, &self.validation).map_err(|e| {
            let reason = match e.kind() {
                JwtErrorKind::InvalidSignature => "signature mismatch".to_string(),
                JwtErrorKind::InvalidAlgorithm => "unexpected signing algorithm".to_string(),
                JwtErrorKind::InvalidToken => "malformed token".to_string(),
                JwtErrorKind::MissingRequiredClaim(claim) => format!("missing claim '{claim}'"),
                other => format!("{other:?}"),
            };
            TokenError::Invalid(reason)
        })?;

        let claims = data.claims;
        validate_claims(&claims, now).map_err(|e| match e {
            ClaimsError::Expired => TokenError::Expired,
            other => TokenError::Invalid(other.to_string()),
        })?;

        Ok(claims)
    }
}

fn positive_ttl(ttl: Duration, which: &str) -> Result<TimeDelta, TokenError> {
    if ttl.is_zero() {
        return Err(TokenError::Config(format!("{which} token TTL must be greater than zero")));
    }
    let out_of_range = || TokenError::Config(format!("{which} token TTL is out of range"));
    let ttl = TimeDelta::from_std(ttl).map_err(|_| out_of_range())?;
    // Must be addable to the current time, or every issue would fail.
    Utc::now().checked_add_signed(ttl).ok_or_else(out_of_range)?;
    Ok(ttl)
}

impl core::fmt::Debug for TokenManager {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TokenManager")
            .field("algorithm", &SIGNING_ALGORITHM)
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================
