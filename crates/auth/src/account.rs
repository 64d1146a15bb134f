//! Account management: profile, password change, role assignment, activation.

use std::sync::Arc;

use gatehouse_core::{AppError, AppResult, RoleId, UserId};

use crate::directory::StoreContext;
use crate::user::{required_name, validate_password};
use crate::{CredentialVerifier, Role, User, UserDirectory};

pub struct AccountService<D> {
    directory: D,
    credentials: Arc<CredentialVerifier>,
}

impl<D: UserDirectory> AccountService<D> {
    pub fn new(directory: D, credentials: Arc<CredentialVerifier>) -> Self {
        Self { directory, credentials }
    }

    fn existing_user(&self, id: UserId) -> AppResult<User> {
        self.directory
            .find_user_by_id(id)
            .context("failed to look up user")?
            .ok_or_else(|| AppError::not_found("user not found"))
    }

    /// The caller's own account. Deactivated accounts are treated as signed out.
    fn own_account(&self, id: UserId) -> AppResult<User> {
        let user = self.existing_user(id)?;
        if !user.is_active() {
            return Err(AppError::unauthorized("account is deactivated"));
        }
        Ok(user)
    }

    pub fn get_profile(&self, id: UserId) -> AppResult<User> {
        self.own_account(id)
    }

    pub fn update_profile(&self, id: UserId, first_name: &str, last_name: &str) -> AppResult<User> {
        let first_name = required_name(first_name, "first name")?;
        let last_name = required_name(last_name, "last name")?;
        self.own_account(id)?;

        let user = self
            .directory
            .update_profile(id, &first_name, &last_name)
            .context("failed to update profile")?;
        tracing::info!(user_id = %id, "profile updated");
        Ok(user)
    }

    pub fn change_password(&self, id: UserId, current: &str, new_password: &str) -> AppResult<()> {
        validate_password(new_password)?;
        let user = self.own_account(id)?;

        self.credentials
            .verify(&user.password_hash, current)
            .map_err(|_| AppError::validation("current password is incorrect"))?;

        let hash = self.credentials.hash(new_password)?;
        self.directory
            .set_password_hash(id, &hash)
            .context("failed to store password hash")?;
        tracing::info!(user_id = %id, "password changed");
        Ok(())
    }

    pub fn assign_role(&self, user_id: UserId, role_id: RoleId) -> AppResult<User> {
        self.existing_user(user_id)?;
        let role = self
            .directory
            .find_role_by_id(role_id)
            .context("failed to look up role")?
            .ok_or_else(|| AppError::not_found("role not found"))?;

        if !self.directory.grant_role(user_id, role_id).context("failed to assign role")? {
            return Err(AppError::validation("user already has this role"));
        }
        tracing::info!(%user_id, role = %role.name, "role assigned");
        self.existing_user(user_id)
    }

    pub fn remove_role(&self, user_id: UserId, role_id: RoleId) -> AppResult<User> {
        self.existing_user(user_id)?;

        if !self.directory.revoke_role(user_id, role_id).context("failed to remove role")? {
            return Err(AppError::validation("user does not have this role"));
        }
        tracing::info!(%user_id, %role_id, "role removed");
        self.existing_user(user_id)
    }

    /// Deactivated users keep their tokens, but fail refresh, login and every gated check.
    pub fn set_active(&self, user_id: UserId, active: bool) -> AppResult<User> {
        self.existing_user(user_id)?;
        let user = self
            .directory
            .set_active(user_id, active)
            .context("failed to change account status")?;
        tracing::info!(%user_id, active, "account status changed");
        Ok(user)
    }

    pub fn list_roles(&self) -> AppResult<Vec<Role>> {
        let mut roles = self.directory.list_roles().context("failed to list roles")?;
        roles.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(roles)
    }
}
