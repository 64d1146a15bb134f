//! Error taxonomy shared by every Gatehouse crate.
//!
//! Each variant carries a message and maps to exactly one transport status at
//! the HTTP boundary. Component errors (tokens, credentials, storage) convert
//! into this type while keeping their kind.

use thiserror::Error;

/// Result type used by flows and gates.
pub type AppResult<T> = Result<T, AppError>;

/// Tagged application error.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AppError {
    /// Bad input or business-rule violation (duplicate email, deactivated account, wrong token type).
    #[error("{0}")]
    Validation(String),

    /// Login failed. Deliberately says nothing about which half of the credentials was wrong.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Referenced entity does not exist.
    #[error("{0}")]
    NotFound(String),

    /// Missing, invalid or expired token.
    #[error("{0}")]
    Unauthorized(String),

    /// Authenticated but lacking permission.
    #[error("{0}")]
    Forbidden(String),

    /// Collaborator or infrastructure failure. The message is for logs only.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Discriminant of [`AppError`], used by the boundary's status mapping table.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Validation,
    InvalidCredentials,
    NotFound,
    Unauthorized,
    Forbidden,
    Internal,
}

impl ErrorKind {
    /// Stable machine-readable code for response bodies.
    pub fn code(self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation_error",
            ErrorKind::InvalidCredentials => "validation_error",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Unauthorized => "unauthorized",
            ErrorKind::Forbidden => "forbidden",
            ErrorKind::Internal => "internal_error",
        }
    }
}

impl AppError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::Unauthorized(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::Validation(_) => ErrorKind::Validation,
            AppError::InvalidCredentials => ErrorKind::InvalidCredentials,
            AppError::NotFound(_) => ErrorKind::NotFound,
            AppError::Unauthorized(_) => ErrorKind::Unauthorized,
            AppError::Forbidden(_) => ErrorKind::Forbidden,
            AppError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Message safe to return to a caller.
    ///
    /// Internal errors collapse to a generic string; their detail stays in the logs.
    pub fn public_message(&self) -> String {
        match self {
            AppError::Internal(_) => "internal server error".to_string(),
            other => other.to_string(),
        }
    }

    /// Prefix the message with caller context without changing the kind.
    pub fn context(self, ctx: &str) -> Self {
        match self {
            AppError::Validation(m) => AppError::Validation(m),
            AppError::InvalidCredentials => AppError::InvalidCredentials,
            AppError::NotFound(m) => AppError::NotFound(m),
            AppError::Unauthorized(m) => AppError::Unauthorized(m),
            AppError::Forbidden(m) => AppError::Forbidden(m),
            AppError::Internal(m) => AppError::Internal(format!("{ctx}: {m}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn internal_detail_is_not_public() {
        let err = AppError::internal("connection refused on 10.0.0.3");
        assert_eq!(err.public_message(), "internal server error");
        assert!(err.to_string().contains("10.0.0.3"));
    }

    #[test]
    fn invalid_credentials_reads_like_validation() {
        assert_eq!(ErrorKind::InvalidCredentials.code(), ErrorKind::Validation.code());
        assert_eq!(AppError::InvalidCredentials.public_message(), "invalid credentials");
    }

    #[test]
    fn context_only_decorates_internal_errors() {
        let err = AppError::internal("disk full").context("failed to create user");
        assert_eq!(err, AppError::Internal("failed to create user: disk full".into()));

        let err = AppError::validation("email already exists").context("register");
        assert_eq!(err, AppError::Validation("email already exists".into()));
    }
}
