//! Permission resolver: loads the user and answers `(resource, action)` checks.
//!
//! Resolution happens on every call. Role or permission changes in the
//! directory are visible on the very next request.

use thiserror::Error;

use gatehouse_core::{AppError, UserId};

use crate::authorize::{self, Explanation, PermissionSet};
use crate::{PermissionKey, StoreError, UserDirectory};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ResolutionError {
    /// The directory could not be read. Never treated as a denial.
    #[error("permission resolution failed: {0}")]
    Failed(String),
}

impl From<StoreError> for ResolutionError {
    fn from(err: StoreError) -> Self {
        ResolutionError::Failed(err.to_string())
    }
}

impl From<ResolutionError> for AppError {
    fn from(err: ResolutionError) -> Self {
        AppError::internal(err.to_string())
    }
}

pub struct PermissionResolver<D> {
    directory: D,
}

impl<D: UserDirectory> PermissionResolver<D> {
    pub fn new(directory: D) -> Self {
        Self { directory }
    }

    /// Does `user_id` hold `(resource, action)` through any of its roles?
    ///
    /// An unknown or deactivated user holds nothing.
    pub fn check(&self, user_id: UserId, resource: &str, action: &str) -> Result<bool, ResolutionError> {
        let Some(user) = self.directory.find_user_by_id(user_id)? else {
            tracing::debug!(%user_id, "permission check for unknown user");
            return Ok(false);
        };

        let granted = authorize::check(&user, resource, action);
        tracing::debug!(%user_id, resource, action, granted, "permission check");
        Ok(granted)
    }

    pub fn check_key(&self, user_id: UserId, key: &PermissionKey) -> Result<bool, ResolutionError> {
        self.check(user_id, &key.resource, &key.action)
    }

    /// Effective permission set, empty for unknown or deactivated users.
    pub fn permissions_of_user(&self, user_id: UserId) -> Result<PermissionSet, ResolutionError> {
        Ok(self
            .directory
            .find_user_by_id(user_id)?
            .map(|user| authorize::permissions_of(&user))
            .unwrap_or_default())
    }

    /// `None` when the user does not exist.
    pub fn explain(&self, user_id: UserId, key: &PermissionKey) -> Result<Option<Explanation>, ResolutionError> {
        Ok(self
            .directory
            .find_user_by_id(user_id)?
            .map(|user| authorize::explain(&user, key)))
    }
}
