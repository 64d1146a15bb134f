//! User accounts as seen by the auth engine.
//!
//! A [`User`] is a fully hydrated snapshot handed over by the directory: it
//! carries its roles, and each role carries its permissions. The engine never
//! mutates or caches these snapshots.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use gatehouse_core::{AppError, AppResult, Entity, UserId};

use crate::Role;

/// Minimum accepted password length, in characters.
pub const MIN_PASSWORD_LEN: usize = 6;

// ─────────────────────────────────────────────────────────────────────────────
// User Status
// ─────────────────────────────────────────────────────────────────────────────

/// User account status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum UserStatus {
    /// User can authenticate and be authorized.
    #[default]
    Active,
    /// User fails every authentication and authorization check.
    Deactivated,
}

impl core::fmt::Display for UserStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            UserStatus::Active => write!(f, "active"),
            UserStatus::Deactivated => write!(f, "deactivated"),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// User
// ─────────────────────────────────────────────────────────────────────────────

/// User snapshot.
///
/// # Invariants
/// - `email` is unique across the directory and stored normalized (see [`normalize_email`]).
/// - `password_hash` is a PHC string and never leaves the service.
#[derive(Clone, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub status: UserStatus,
    pub roles: Vec<Role>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn is_active(&self) -> bool {
        self.status == UserStatus::Active
    }

    pub fn has_role(&self, name: &str) -> bool {
        self.roles.iter().any(|r| r.name == name)
    }
}

impl Entity for User {
    type Id = UserId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

// Hand-written so the hash never ends up in logs.
impl core::fmt::Debug for User {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("email", &self.email)
            .field("password_hash", &"<redacted>")
            .field("first_name", &self.first_name)
            .field("last_name", &self.last_name)
            .field("status", &self.status)
            .field("roles", &self.roles.iter().map(|r| r.name.as_str()).collect::<Vec<_>>())
            .finish()
    }
}

/// Data needed to create a user record (already validated and hashed).
#[derive(Clone)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
}

// ─────────────────────────────────────────────────────────────────────────────
// Input validation
// ─────────────────────────────────────────────────────────────────────────────

/// Canonical form of an email address: trimmed and lowercased.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Normalize and validate an email address.
pub fn validated_email(email: &str) -> AppResult<String> {
    let email = normalize_email(email);
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && !domain.is_empty() && !domain.contains('@') && !email.contains(char::is_whitespace)
        }
        None => false,
    };
    if !valid {
        return Err(AppError::validation("invalid email format"));
    }
    Ok(email)
}

pub fn validate_password(password: &str) -> AppResult<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::validation(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

/// Trim a required name field, rejecting blanks.
pub fn required_name(value: &str, field: &str) -> AppResult<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AppError::validation(format!("{field} cannot be empty")));
    }
    Ok(value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_is_trimmed_and_lowercased() {
        assert_eq!(validated_email("  Alice@Example.COM ").unwrap(), "alice@example.com");
    }

    #[test]
    fn email_without_at_is_rejected() {
        assert!(validated_email("alice.example.com").is_err());
        assert!(validated_email("@example.com").is_err());
        assert!(validated_email("alice@").is_err());
        assert!(validated_email("a b@example.com").is_err());
    }

    #[test]
    fn short_password_is_rejected() {
        assert!(validate_password("12345").is_err());
        assert!(validate_password("secret1").is_ok());
    }

    #[test]
    fn blank_names_are_rejected() {
        assert!(required_name("   ", "first name").is_err());
        assert_eq!(required_name(" Ada ", "first name").unwrap(), "Ada");
    }

    #[test]
    fn debug_output_redacts_password_hash() {
        let now = Utc::now();
        let user = User {
            id: UserId::new(),
            email: "ada@example.com".into(),
            password_hash: "$argon2id$v=19$m=19456,t=2,p=1$c2FsdA$aGFzaA".into(),
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            status: UserStatus::Active,
            roles: vec![Role::new("user")],
            created_at: now,
            updated_at: now,
        };
        let rendered = format!("{user:?}");
        assert!(!rendered.contains("argon2id"));
        assert!(rendered.contains("<redacted>"));
    }
}
