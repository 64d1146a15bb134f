use std::collections::{BTreeSet, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};

use gatehouse_auth::user::normalize_email;
use gatehouse_auth::{NewUser, Permission, Role, StoreError, User, UserDirectory, UserStatus};
use gatehouse_core::{Entity, PermissionId, RoleId, UserId};

/// Stored user row. Roles live in the link table, not here.
#[derive(Debug, Clone)]
struct UserRecord {
    id: UserId,
    email: String,
    password_hash: String,
    first_name: String,
    last_name: String,
    status: UserStatus,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Entity for UserRecord {
    type Id = UserId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

#[derive(Debug, Clone)]
struct RoleRecord {
    id: RoleId,
    name: String,
    description: Option<String>,
}

impl Entity for RoleRecord {
    type Id = RoleId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Rows keyed by entity id.
#[derive(Debug)]
struct Table<E: Entity> {
    rows: HashMap<E::Id, E>,
}

impl<E: Entity> Default for Table<E> {
    fn default() -> Self {
        Self { rows: HashMap::new() }
    }
}

impl<E: Entity> Table<E> {
    fn get(&self, id: &E::Id) -> Option<&E> {
        self.rows.get(id)
    }

    fn get_mut(&mut self, id: &E::Id) -> Option<&mut E> {
        self.rows.get_mut(id)
    }

    fn insert(&mut self, row: E) {
        self.rows.insert(*row.id(), row);
    }

    fn values(&self) -> impl Iterator<Item = &E> {
        self.rows.values()
    }
}

#[derive(Debug, Default)]
struct Tables {
    users: Table<UserRecord>,
    roles: Table<RoleRecord>,
    permissions: Table<Permission>,
    /// Normalized email -> user.
    emails: HashMap<String, UserId>,
    user_roles: BTreeSet<(UserId, RoleId)>,
    role_permissions: BTreeSet<(RoleId, PermissionId)>,
}

impl Tables {
    fn hydrate_role(&self, record: &RoleRecord) -> Role {
        let mut permissions: Vec<Permission> = self
            .role_permissions
            .range((record.id, PermissionId::nil())..)
            .take_while(|(role, _)| *role == record.id)
            .filter_map(|(_, perm)| self.permissions.get(perm).cloned())
            .collect();
        permissions.sort_by(|a, b| a.name.cmp(&b.name));

        Role {
            id: record.id,
            name: record.name.clone(),
            description: record.description.clone(),
            permissions,
        }
    }

    fn hydrate_user(&self, record: &UserRecord) -> User {
        let mut roles: Vec<Role> = self
            .user_roles
            .range((record.id, RoleId::nil())..)
            .take_while(|(user, _)| *user == record.id)
            .filter_map(|(_, role)| self.roles.get(role))
            .map(|role| self.hydrate_role(role))
            .collect();
        roles.sort_by(|a, b| a.name.cmp(&b.name));

        User {
            id: record.id,
            email: record.email.clone(),
            password_hash: record.password_hash.clone(),
            first_name: record.first_name.clone(),
            last_name: record.last_name.clone(),
            status: record.status,
            roles,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }

    fn role_by_name(&self, name: &str) -> Option<&RoleRecord> {
        self.roles.values().find(|r| r.name == name)
    }

    fn user_mut(&mut self, id: UserId) -> Result<&mut UserRecord, StoreError> {
        self.users
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound("user not found".to_string()))
    }
}

/// In-memory user directory for tests/dev.
///
/// Normalized like a relational store: users, roles and permissions are rows,
/// and grants are link rows. Reads hydrate full snapshots.
#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    tables: RwLock<Tables>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Tables>, StoreError> {
        self.tables
            .read()
            .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Tables>, StoreError> {
        self.tables
            .write()
            .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))
    }

    /// Insert a permission, or return the existing one with the same name.
    pub fn upsert_permission(&self, permission: Permission) -> Result<Permission, StoreError> {
        let mut tables = self.write()?;
        if let Some(existing) = tables.permissions.values().find(|p| p.name == permission.name) {
            return Ok(existing.clone());
        }
        tables.permissions.insert(permission.clone());
        Ok(permission)
    }

    /// Insert a role by name, or return the existing one unchanged.
    pub fn upsert_role(&self, name: &str, description: Option<&str>) -> Result<Role, StoreError> {
        let mut tables = self.write()?;
        let record = match tables.role_by_name(name) {
            Some(existing) => existing.clone(),
            None => {
                let record = RoleRecord {
                    id: RoleId::new(),
                    name: name.to_string(),
                    description: description.map(str::to_string),
                };
                tables.roles.insert(record.clone());
                record
            }
        };
        Ok(tables.hydrate_role(&record))
    }

    /// Link a permission to a role. Returns `false` if already linked.
    pub fn attach_permission(&self, role: RoleId, permission: PermissionId) -> Result<bool, StoreError> {
        let mut tables = self.write()?;
        if tables.roles.get(&role).is_none() {
            return Err(StoreError::NotFound("role not found".to_string()));
        }
        if tables.permissions.get(&permission).is_none() {
            return Err(StoreError::NotFound("permission not found".to_string()));
        }
        Ok(tables.role_permissions.insert((role, permission)))
    }

    /// Unlink a permission from a role. Returns `false` if it was not linked.
    pub fn detach_permission(&self, role: RoleId, permission: PermissionId) -> Result<bool, StoreError> {
        Ok(self.write()?.role_permissions.remove(&(role, permission)))
    }

    pub fn user_count(&self) -> Result<usize, StoreError> {
        Ok(self.read()?.users.rows.len())
    }
}

impl UserDirectory for InMemoryDirectory {
    fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let tables = self.read()?;
        let email = normalize_email(email);
        Ok(tables
            .emails
            .get(&email)
            .and_then(|id| tables.users.get(id))
            .map(|record| tables.hydrate_user(record)))
    }

    fn find_user_by_id(&self, id: UserId) -> Result<Option<User>, StoreError> {
        let tables = self.read()?;
        Ok(tables.users.get(&id).map(|record| tables.hydrate_user(record)))
    }

    fn find_role_by_name(&self, name: &str) -> Result<Option<Role>, StoreError> {
        let tables = self.read()?;
        Ok(tables.role_by_name(name).map(|record| tables.hydrate_role(record)))
    }

    fn find_role_by_id(&self, id: RoleId) -> Result<Option<Role>, StoreError> {
        let tables = self.read()?;
        Ok(tables.roles.get(&id).map(|record| tables.hydrate_role(record)))
    }

    fn list_roles(&self) -> Result<Vec<Role>, StoreError> {
        let tables = self.read()?;
        let mut roles: Vec<Role> = tables.roles.values().map(|r| tables.hydrate_role(r)).collect();
        roles.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(roles)
    }

    fn insert_user(&self, user: NewUser) -> Result<User, StoreError> {
        let mut tables = self.write()?;
        let email = normalize_email(&user.email);
        if tables.emails.contains_key(&email) {
            return Err(StoreError::Conflict("email already exists".to_string()));
        }

        let now = Utc::now();
        let record = UserRecord {
            id: UserId::new(),
            email: email.clone(),
            password_hash: user.password_hash,
            first_name: user.first_name,
            last_name: user.last_name,
            status: UserStatus::Active,
            created_at: now,
            updated_at: now,
        };
        tables.emails.insert(email, record.id);
        let user = tables.hydrate_user(&record);
        tables.users.insert(record);

        tracing::debug!(user_id = %user.id, "user row inserted");
        Ok(user)
    }

    fn update_profile(&self, id: UserId, first_name: &str, last_name: &str) -> Result<User, StoreError> {
        let mut tables = self.write()?;
        let record = tables.user_mut(id)?;
        record.first_name = first_name.to_string();
        record.last_name = last_name.to_string();
        record.updated_at = Utc::now();
        let record = record.clone();
        Ok(tables.hydrate_user(&record))
    }

    fn set_password_hash(&self, id: UserId, password_hash: &str) -> Result<(), StoreError> {
        let mut tables = self.write()?;
        let record = tables.user_mut(id)?;
        record.password_hash = password_hash.to_string();
        record.updated_at = Utc::now();
        Ok(())
    }

    fn set_active(&self, id: UserId, active: bool) -> Result<User, StoreError> {
        let mut tables = self.write()?;
        let record = tables.user_mut(id)?;
        record.status = if active {
            UserStatus::Active
        } else {
            UserStatus::Deactivated
        };
        record.updated_at = Utc::now();
        let record = record.clone();
        Ok(tables.hydrate_user(&record))
    }

    fn grant_role(&self, user: UserId, role: RoleId) -> Result<bool, StoreError> {
        let mut tables = self.write()?;
        if tables.users.get(&user).is_none() {
            return Err(StoreError::NotFound("user not found".to_string()));
        }
        if tables.roles.get(&role).is_none() {
            return Err(StoreError::NotFound("role not found".to_string()));
        }
        Ok(tables.user_roles.insert((user, role)))
    }

    fn revoke_role(&self, user: UserId, role: RoleId) -> Result<bool, StoreError> {
        let mut tables = self.write()?;
        if tables.users.get(&user).is_none() {
            return Err(StoreError::NotFound("user not found".to_string()));
        }
        Ok(tables.user_roles.remove(&(user, role)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(email: &str) -> NewUser {
        NewUser {
            email: email.to_string(),
            password_hash: "$argon2id$stub".to_string(),
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
        }
    }

    #[test]
    fn email_lookup_is_case_insensitive_and_unique() {
        let dir = InMemoryDirectory::new();
        let user = dir.insert_user(new_user("Ada@Example.com")).unwrap();
        assert_eq!(user.email, "ada@example.com");

        let found = dir.find_user_by_email("ADA@example.COM").unwrap().unwrap();
        assert_eq!(found.id, user.id);

        let err = dir.insert_user(new_user("ada@example.com")).unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
        assert_eq!(dir.user_count().unwrap(), 1);
    }

    #[test]
    fn users_are_hydrated_with_roles_and_permissions() {
        let dir = InMemoryDirectory::new();
        let read = dir.upsert_permission(Permission::new("users.read", "users", "read")).unwrap();
        let role = dir.upsert_role("user", None).unwrap();
        dir.attach_permission(role.id, read.id).unwrap();

        let user = dir.insert_user(new_user("ada@example.com")).unwrap();
        assert!(user.roles.is_empty());

        assert!(dir.grant_role(user.id, role.id).unwrap());
        assert!(!dir.grant_role(user.id, role.id).unwrap());

        let user = dir.find_user_by_id(user.id).unwrap().unwrap();
        assert_eq!(user.roles.len(), 1);
        assert_eq!(user.roles[0].permissions, vec![read]);
    }

    #[test]
    fn permission_changes_show_up_on_next_read() {
        let dir = InMemoryDirectory::new();
        let write = dir.upsert_permission(Permission::new("users.write", "users", "write")).unwrap();
        let role = dir.upsert_role("editor", None).unwrap();
        let user = dir.insert_user(new_user("ada@example.com")).unwrap();
        dir.grant_role(user.id, role.id).unwrap();

        dir.attach_permission(role.id, write.id).unwrap();
        let hydrated = dir.find_user_by_id(user.id).unwrap().unwrap();
        assert!(hydrated.roles[0].permissions.iter().any(|p| p.grants("users", "write")));

        dir.detach_permission(role.id, write.id).unwrap();
        let hydrated = dir.find_user_by_id(user.id).unwrap().unwrap();
        assert!(hydrated.roles[0].permissions.is_empty());
    }

    #[test]
    fn revoke_only_touches_the_named_role() {
        let dir = InMemoryDirectory::new();
        let a = dir.upsert_role("a", None).unwrap();
        let b = dir.upsert_role("b", None).unwrap();
        let user = dir.insert_user(new_user("ada@example.com")).unwrap();
        dir.grant_role(user.id, a.id).unwrap();
        dir.grant_role(user.id, b.id).unwrap();

        assert!(dir.revoke_role(user.id, a.id).unwrap());
        assert!(!dir.revoke_role(user.id, a.id).unwrap());

        let user = dir.find_user_by_id(user.id).unwrap().unwrap();
        assert!(!user.has_role("a"));
        assert!(user.has_role("b"));
    }

    #[test]
    fn upserts_are_idempotent() {
        let dir = InMemoryDirectory::new();
        let first = dir.upsert_role("admin", Some("Administrators")).unwrap();
        let second = dir.upsert_role("admin", None).unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(second.description.as_deref(), Some("Administrators"));

        let p1 = dir.upsert_permission(Permission::new("users.read", "users", "read")).unwrap();
        let p2 = dir.upsert_permission(Permission::new("users.read", "users", "read")).unwrap();
        assert_eq!(p1.id, p2.id);
        assert_eq!(dir.list_roles().unwrap().len(), 1);
    }

    #[test]
    fn deactivation_and_profile_updates_persist() {
        let dir = InMemoryDirectory::new();
        let user = dir.insert_user(new_user("ada@example.com")).unwrap();

        let updated = dir.update_profile(user.id, "Augusta", "King").unwrap();
        assert_eq!(updated.first_name, "Augusta");

        let deactivated = dir.set_active(user.id, false).unwrap();
        assert!(!deactivated.is_active());
        assert!(!dir.find_user_by_id(user.id).unwrap().unwrap().is_active());
    }

    #[test]
    fn missing_rows_are_not_found() {
        let dir = InMemoryDirectory::new();
        assert!(dir.find_user_by_id(UserId::new()).unwrap().is_none());
        assert!(matches!(
            dir.set_active(UserId::new(), false),
            Err(StoreError::NotFound(_))
        ));
        let user = dir.insert_user(new_user("ada@example.com")).unwrap();
        assert!(matches!(
            dir.grant_role(user.id, RoleId::new()),
            Err(StoreError::NotFound(_))
        ));
    }
}
