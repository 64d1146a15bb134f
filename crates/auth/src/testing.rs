//! Test doubles for the directory seam.

use std::sync::Mutex;

use chrono::Utc;

use gatehouse_core::{RoleId, UserId};

use crate::{NewUser, Permission, Role, StoreError, User, UserDirectory, UserStatus};

/// Snapshot-based directory: users hold cloned roles.
#[derive(Default)]
pub struct MemoryDirectory {
    users: Mutex<Vec<User>>,
    roles: Mutex<Vec<Role>>,
}

impl MemoryDirectory {
    /// Seeded with `admin` (users:read, users:write) and `user` (users:read).
    pub fn seeded() -> Self {
        let read = Permission::new("users.read", "users", "read");
        let write = Permission::new("users.write", "users", "write");
        let dir = Self::default();
        dir.add_role(Role::new("admin").with_permission(read.clone()).with_permission(write));
        dir.add_role(Role::new("user").with_permission(read));
        dir
    }

    pub fn add_role(&self, role: Role) {
        self.roles.lock().unwrap().push(role);
    }

    pub fn role(&self, name: &str) -> Role {
        self.find_role_by_name(name).unwrap().unwrap()
    }
}

impl UserDirectory for MemoryDirectory {
    fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(self.users.lock().unwrap().iter().find(|u| u.email == email).cloned())
    }

    fn find_user_by_id(&self, id: UserId) -> Result<Option<User>, StoreError> {
        Ok(self.users.lock().unwrap().iter().find(|u| u.id == id).cloned())
    }

    fn find_role_by_name(&self, name: &str) -> Result<Option<Role>, StoreError> {
        Ok(self.roles.lock().unwrap().iter().find(|r| r.name == name).cloned())
    }

    fn find_role_by_id(&self, id: RoleId) -> Result<Option<Role>, StoreError> {
        Ok(self.roles.lock().unwrap().iter().find(|r| r.id == id).cloned())
    }

    fn list_roles(&self) -> Result<Vec<Role>, StoreError> {
        Ok(self.roles.lock().unwrap().clone())
    }

    fn insert_user(&self, user: NewUser) -> Result<User, StoreError> {
        let mut users = self.users.lock().unwrap();
        if users.iter().any(|u| u.email == user.email) {
            return Err(StoreError::Conflict("email already exists".into()));
        }
        let now = Utc::now();
        let user = User {
            id: UserId::new(),
            email: user.email,
            password_hash: user.password_hash,
            first_name: user.first_name,
            last_name: user.last_name,
            status: UserStatus::Active,
            roles: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        users.push(user.clone());
        Ok(user)
    }

    fn update_profile(&self, id: UserId, first_name: &str, last_name: &str) -> Result<User, StoreError> {
        let mut users = self.users.lock().unwrap();
        let user = users
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or_else(|| StoreError::NotFound("user not found".into()))?;
        user.first_name = first_name.to_string();
        user.last_name = last_name.to_string();
        Ok(user.clone())
    }

    fn set_password_hash(&self, id: UserId, password_hash: &str) -> Result<(), StoreError> {
        let mut users = self.users.lock().unwrap();
        let user = users
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or_else(|| StoreError::NotFound("user not found".into()))?;
        user.password_hash = password_hash.to_string();
        Ok(())
    }

    fn set_active(&self, id: UserId, active: bool) -> Result<User, StoreError> {
        let mut users = self.users.lock().unwrap();
        let user = users
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or_else(|| StoreError::NotFound("user not found".into()))?;
        user.status = if active { UserStatus::Active } else { UserStatus::Deactivated };
        Ok(user.clone())
    }

    fn grant_role(&self, user: UserId, role: RoleId) -> Result<bool, StoreError> {
        let role = self
            .find_role_by_id(role)?
            .ok_or_else(|| StoreError::NotFound("role not found".into()))?;
        let mut users = self.users.lock().unwrap();
        let user = users
            .iter_mut()
            .find(|u| u.id == user)
            .ok_or_else(|| StoreError::NotFound("user not found".into()))?;
        if user.roles.iter().any(|r| r.id == role.id) {
            return Ok(false);
        }
        user.roles.push(role);
        Ok(true)
    }

    fn revoke_role(&self, user: UserId, role: RoleId) -> Result<bool, StoreError> {
        let mut users = self.users.lock().unwrap();
        let user = users
            .iter_mut()
            .find(|u| u.id == user)
            .ok_or_else(|| StoreError::NotFound("user not found".into()))?;
        let before = user.roles.len();
        user.roles.retain(|r| r.id != role);
        Ok(user.roles.len() != before)
    }
}

/// Every call fails as if the backing store were down.
pub struct UnavailableDirectory;

impl UserDirectory for UnavailableDirectory {
    fn find_user_by_email(&self, _: &str) -> Result<Option<User>, StoreError> {
        Err(down())
    }

    fn find_user_by_id(&self, _: UserId) -> Result<Option<User>, StoreError> {
        Err(down())
    }

    fn find_role_by_name(&self, _: &str) -> Result<Option<Role>, StoreError> {
        Err(down())
    }

    fn find_role_by_id(&self, _: RoleId) -> Result<Option<Role>, StoreError> {
        Err(down())
    }

    fn list_roles(&self) -> Result<Vec<Role>, StoreError> {
        Err(down())
    }

    fn insert_user(&self, _: NewUser) -> Result<User, StoreError> {
        Err(down())
    }

    fn update_profile(&self, _: UserId, _: &str, _: &str) -> Result<User, StoreError> {
        Err(down())
    }

    fn set_password_hash(&self, _: UserId, _: &str) -> Result<(), StoreError> {
        Err(down())
    }

    fn set_active(&self, _: UserId, _: bool) -> Result<User, StoreError> {
        Err(down())
    }

    fn grant_role(&self, _: UserId, _: RoleId) -> Result<bool, StoreError> {
        Err(down())
    }

    fn revoke_role(&self, _: UserId, _: RoleId) -> Result<bool, StoreError> {
        Err(down())
    }
}

fn down() -> StoreError {
    StoreError::Unavailable("connection refused".into())
}
