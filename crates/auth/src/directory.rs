//! User directory: the storage seam the auth engine reads and writes through.
//!
//! The engine owns no persistence. Implementations live in `gatehouse-infra`.

use std::sync::Arc;

use thiserror::Error;

use gatehouse_core::{AppError, AppResult, RoleId, UserId};

use crate::{NewUser, Role, User};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),

    /// Uniqueness violation (email, role name, user-role pair).
    #[error("conflict: {0}")]
    Conflict(String),

    #[error("directory unavailable: {0}")]
    Unavailable(String),
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(msg) => AppError::not_found(msg),
            StoreError::Conflict(msg) => AppError::validation(msg),
            StoreError::Unavailable(_) => AppError::internal(err.to_string()),
        }
    }
}

/// Names the flow that hit a directory failure.
///
/// Only internal failures carry the prefix; other kinds keep their public message.
pub(crate) trait StoreContext<T> {
    fn context(self, ctx: &str) -> AppResult<T>;
}

impl<T> StoreContext<T> for Result<T, StoreError> {
    fn context(self, ctx: &str) -> AppResult<T> {
        self.map_err(|e| AppError::from(e).context(ctx))
    }
}

/// Users, roles and their links.
///
/// Lookups return fully hydrated snapshots: a [`User`] carries its roles and
/// each [`Role`] its permissions. Calls are synchronous; async callers run them
/// on a blocking thread.
pub trait UserDirectory: Send + Sync {
    /// `email` is expected in normalized form.
    fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    fn find_user_by_id(&self, id: UserId) -> Result<Option<User>, StoreError>;

    fn find_role_by_name(&self, name: &str) -> Result<Option<Role>, StoreError>;

    fn find_role_by_id(&self, id: RoleId) -> Result<Option<Role>, StoreError>;

    fn list_roles(&self) -> Result<Vec<Role>, StoreError>;

    /// Fails with [`StoreError::Conflict`] when the email is taken.
    fn insert_user(&self, user: NewUser) -> Result<User, StoreError>;

    fn update_profile(&self, id: UserId, first_name: &str, last_name: &str) -> Result<User, StoreError>;

    fn set_password_hash(&self, id: UserId, password_hash: &str) -> Result<(), StoreError>;

    fn set_active(&self, id: UserId, active: bool) -> Result<User, StoreError>;

    /// Returns `false` when the user already had the role.
    fn grant_role(&self, user: UserId, role: RoleId) -> Result<bool, StoreError>;

    /// Returns `false` when the user did not have the role.
    fn revoke_role(&self, user: UserId, role: RoleId) -> Result<bool, StoreError>;
}

impl<D: UserDirectory + ?Sized> UserDirectory for Arc<D> {
    fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        (**self).find_user_by_email(email)
    }

    fn find_user_by_id(&self, id: UserId) -> Result<Option<User>, StoreError> {
        (**self).find_user_by_id(id)
    }

    fn find_role_by_name(&self, name: &str) -> Result<Option<Role>, StoreError> {
        (**self).find_role_by_name(name)
    }

    fn find_role_by_id(&self, id: RoleId) -> Result<Option<Role>, StoreError> {
        (**self).find_role_by_id(id)
    }

    fn list_roles(&self) -> Result<Vec<Role>, StoreError> {
        (**self).list_roles()
    }

    fn insert_user(&self, user: NewUser) -> Result<User, StoreError> {
        (**self).insert_user(user)
    }

    fn update_profile(&self, id: UserId, first_name: &str, last_name: &str) -> Result<User, StoreError> {
        (**self).update_profile(id, first_name, last_name)
    }

    fn set_password_hash(&self, id: UserId, password_hash: &str) -> Result<(), StoreError> {
        (**self).set_password_hash(id, password_hash)
    }

    fn set_active(&self, id: UserId, active: bool) -> Result<User, StoreError> {
        (**self).set_active(id, active)
    }

    fn grant_role(&self, user: UserId, role: RoleId) -> Result<bool, StoreError> {
        (**self).grant_role(user, role)
    }

    fn revoke_role(&self, user: UserId, role: RoleId) -> Result<bool, StoreError> {
        (**self).revoke_role(user, role)
    }
}

/// Type-erased directory handle shared across services.
pub type SharedDirectory = Arc<dyn UserDirectory>;
