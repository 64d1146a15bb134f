//! Authentication flows: register, login, refresh, logout.
//!
//! Every flow is synchronous and touches only the directory, the credential
//! verifier and the token manager. Transport concerns stay in `gatehouse-api`.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Deserialize;

use gatehouse_core::{AppError, AppResult, UserId};

use crate::directory::StoreContext;
use crate::user::{normalize_email, required_name, validate_password, validated_email};
use crate::{CredentialVerifier, NewUser, StoreError, TokenKind, TokenManager, TokenPair, User, UserDirectory};

/// Name of the role granted on registration when none is configured.
pub const DEFAULT_ROLE: &str = "user";

/// Self-service registration input.
#[derive(Debug, Clone, Deserialize)]
pub struct Registration {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
}

/// Result of a successful register, login or refresh.
#[derive(Debug, Clone)]
pub struct AuthOutcome {
    pub tokens: TokenPair,
    pub user: User,
}

pub struct AuthService<D> {
    directory: D,
    tokens: Arc<TokenManager>,
    credentials: Arc<CredentialVerifier>,
    default_role: String,
}

impl<D: UserDirectory> AuthService<D> {
    pub fn new(directory: D, tokens: Arc<TokenManager>, credentials: Arc<CredentialVerifier>) -> Self {
        Self {
            directory,
            tokens,
            credentials,
            default_role: DEFAULT_ROLE.to_string(),
        }
    }

    pub fn with_default_role(mut self, role: impl Into<String>) -> Self {
        self.default_role = role.into();
        self
    }

    pub fn directory(&self) -> &D {
        &self.directory
    }

    pub fn tokens(&self) -> &TokenManager {
        &self.tokens
    }

    /// Create an account, grant the default role and issue a token pair.
    pub fn register(&self, input: Registration) -> AppResult<AuthOutcome> {
        let email = validated_email(&input.email)?;
        validate_password(&input.password)?;
        let first_name = required_name(&input.first_name, "first name")?;
        let last_name = required_name(&input.last_name, "last name")?;

        if self
            .directory
            .find_user_by_email(&email)
            .context("register: failed to look up user")?
            .is_some()
        {
            return Err(AppError::validation("email already exists"));
        }

        let password_hash = self.credentials.hash(&input.password)?;
        let mut user = self
            .directory
            .insert_user(NewUser {
                email,
                password_hash,
                first_name,
                last_name,
            })
            .map_err(|e| match e {
                // Lost a race with a concurrent registration.
                StoreError::Conflict(_) => AppError::validation("email already exists"),
                other => AppError::from(other).context("register: failed to create user"),
            })?;

        // The account exists at this point; a failed grant only leaves it without a role.
        match self.grant_default_role(user.id) {
            Ok(Some(role)) => user.roles.push(role),
            Ok(None) => {
                tracing::warn!(role = %self.default_role, "default role is not defined; user created without roles");
            }
            Err(e) => {
                tracing::warn!(user_id = %user.id, error = %e, "failed to grant default role");
            }
        }

        let tokens = self.tokens.issue_pair(user.id, &user.email)?;
        tracing::info!(user_id = %user.id, "user registered");
        Ok(AuthOutcome { tokens, user })
    }

    fn grant_default_role(&self, user_id: UserId) -> Result<Option<crate::Role>, StoreError> {
        let Some(role) = self.directory.find_role_by_name(&self.default_role)? else {
            return Ok(None);
        };
        self.directory.grant_role(user_id, role.id)?;
        Ok(Some(role))
    }

    /// Exchange credentials for a token pair.
    ///
    /// Unknown email and wrong password are indistinguishable to the caller.
    pub fn login(&self, email: &str, password: &str) -> AppResult<AuthOutcome> {
        let email = normalize_email(email);

        let Some(user) = self
            .directory
            .find_user_by_email(&email)
            .context("login: failed to look up user")?
        else {
            tracing::info!("login failed");
            return Err(self.credentials.reject_unknown(password).into());
        };

        if !user.is_active() {
            tracing::info!(user_id = %user.id, "login refused for deactivated account");
            return Err(AppError::validation("account is deactivated"));
        }

        if self.credentials.verify(&user.password_hash, password).is_err() {
            tracing::info!(user_id = %user.id, "login failed");
            return Err(AppError::InvalidCredentials);
        }

        if self.credentials.needs_rehash(&user.password_hash) {
            self.upgrade_hash(user.id, password);
        }

        let tokens = self.tokens.issue_pair(user.id, &user.email)?;
        tracing::info!(user_id = %user.id, "user logged in");
        Ok(AuthOutcome { tokens, user })
    }

    fn upgrade_hash(&self, user_id: UserId, password: &str) {
        let result = self
            .credentials
            .hash(password)
            .map_err(AppError::from)
            .and_then(|hash| Ok(self.directory.set_password_hash(user_id, &hash)?));
        match result {
            Ok(()) => tracing::debug!(%user_id, "password hash upgraded"),
            Err(e) => tracing::warn!(%user_id, error = %e, "failed to upgrade password hash"),
        }
    }

    pub fn refresh(&self, refresh_token: &str) -> AppResult<AuthOutcome> {
        self.refresh_at(refresh_token, Utc::now())
    }

    /// Trade a refresh token for a new pair. The old token is not revoked.
    pub fn refresh_at(&self, refresh_token: &str, now: DateTime<Utc>) -> AppResult<AuthOutcome> {
        let claims = self
            .tokens
            .validate_at(refresh_token, now)
            .map_err(|_| AppError::validation("invalid refresh token"))?;

        if claims.kind != TokenKind::Refresh {
            return Err(AppError::validation("invalid token type"));
        }

        let user = self
            .directory
            .find_user_by_id(claims.user_id)
            .context("refresh: failed to look up user")?
            .ok_or_else(|| AppError::unauthorized("user not found"))?;

        if !user.is_active() {
            return Err(AppError::validation("account is deactivated"));
        }

        let tokens = self.tokens.issue_pair_at(user.id, &user.email, now)?;
        tracing::debug!(user_id = %user.id, "tokens refreshed");
        Ok(AuthOutcome { tokens, user })
    }

    /// Nothing is revoked: outstanding tokens stay valid until they expire.
    pub fn logout(&self, user_id: UserId) {
        tracing::info!(%user_id, "user logged out");
    }
}
