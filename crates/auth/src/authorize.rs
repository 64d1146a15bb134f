//! Pure authorization: effective permissions of a hydrated user snapshot.
//!
//! - No IO
//! - No caching
//! - No wildcard: matching is exact on `(resource, action)`

use std::collections::BTreeMap;

use serde::Serialize;

use crate::{Permission, PermissionKey, User};

/// Union of the permissions granted by a user's roles, keyed by `(resource, action)`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PermissionSet {
    entries: BTreeMap<PermissionKey, Permission>,
}

impl PermissionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a permission. Duplicates by key collapse to the first one seen.
    pub fn insert(&mut self, permission: &Permission) {
        self.entries
            .entry(permission.key())
            .or_insert_with(|| permission.clone());
    }

    pub fn contains(&self, resource: &str, action: &str) -> bool {
        self.entries.contains_key(&PermissionKey::new(resource, action))
    }

    pub fn contains_key(&self, key: &PermissionKey) -> bool {
        self.entries.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &PermissionKey> {
        self.entries.keys()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<'a> FromIterator<&'a Permission> for PermissionSet {
    fn from_iter<I: IntoIterator<Item = &'a Permission>>(iter: I) -> Self {
        let mut set = PermissionSet::new();
        for permission in iter {
            set.insert(permission);
        }
        set
    }
}

/// Effective permissions of `user`: the union across all roles.
///
/// A deactivated user has none.
pub fn permissions_of(user: &User) -> PermissionSet {
    if !user.is_active() {
        return PermissionSet::new();
    }
    user.roles.iter().flat_map(|role| role.permissions.iter()).collect()
}

/// Does any of `user`'s roles grant `(resource, action)`?
pub fn check(user: &User, resource: &str, action: &str) -> bool {
    user.is_active()
        && user
            .roles
            .iter()
            .flat_map(|role| role.permissions.iter())
            .any(|p| p.grants(resource, action))
}

// ─────────────────────────────────────────────────────────────────────────────
// Authorization Explanation
// ─────────────────────────────────────────────────────────────────────────────

/// Why a check was granted or denied, for logs and admin tooling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Explanation {
    pub required: String,
    pub granted: bool,
    pub active: bool,
    /// Roles that grant the required key.
    pub granting_roles: Vec<String>,
    pub effective_permissions: Vec<String>,
}

pub fn explain(user: &User, required: &PermissionKey) -> Explanation {
    let granting_roles = user
        .roles
        .iter()
        .filter(|role| {
            role.permissions
                .iter()
                .any(|p| p.grants(&required.resource, &required.action))
        })
        .map(|role| role.name.clone())
        .collect::<Vec<_>>();

    let effective: PermissionSet = user.roles.iter().flat_map(|r| r.permissions.iter()).collect();

    Explanation {
        required: required.to_string(),
        granted: user.is_active() && !granting_roles.is_empty(),
        active: user.is_active(),
        granting_roles,
        effective_permissions: effective.keys().map(|k| k.to_string()).collect(),
    }
}


#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::test_support::user_with_roles;
    use super::*;
    use crate::{Role, UserStatus};

    fn editor() -> Role {
        Role::new("editor")
            .with_permission(Permission::new("users.read", "users", "read"))
            .with_permission(Permission::new("users.write", "users", "write"))
    }

    fn auditor() -> Role {
        Role::new("auditor")
            .with_permission(Permission::new("users.read", "users", "read"))
            .with_permission(Permission::new("roles.read", "roles", "read"))
    }

    #[test]
    fn user_without_roles_has_no_permissions() {
        let user = user_with_roles(vec![]);
        assert!(permissions_of(&user).is_empty());
        assert!(!check(&user, "users", "read"));
    }

    #[test]
    fn permissions_are_the_union_across_roles() {
        let user = user_with_roles(vec![editor(), auditor()]);
        let set = permissions_of(&user);

        // users:read is granted twice but counted once.
        assert_eq!(set.len(), 3);
        assert!(set.contains("users", "read"));
        assert!(set.contains("users", "write"));
        assert!(set.contains("roles", "read"));
        assert!(!set.contains("roles", "write"));
    }

    #[test]
    fn matching_is_exact_and_case_sensitive() {
        let user = user_with_roles(vec![editor()]);
        assert!(check(&user, "users", "read"));
        assert!(!check(&user, "Users", "read"));
        assert!(!check(&user, "users", "*"));
        assert!(!check(&user, "*", "read"));
    }

    #[test]
    fn deactivated_user_is_denied_everything() {
        let mut user = user_with_roles(vec![editor()]);
        user.status = UserStatus::Deactivated;
        assert!(!check(&user, "users", "read"));
        assert!(permissions_of(&user).is_empty());
    }

    #[test]
    fn explain_lists_granting_roles() {
        let user = user_with_roles(vec![editor(), auditor()]);

        let read = explain(&user, &PermissionKey::new("users", "read"));
        assert!(read.granted);
        assert_eq!(read.granting_roles, vec!["editor".to_string(), "auditor".to_string()]);
        assert_eq!(
            read.effective_permissions,
            vec!["roles:read", "users:read", "users:write"]
        );

        let delete = explain(&user, &PermissionKey::new("users", "delete"));
        assert!(!delete.granted);
        assert!(delete.granting_roles.is_empty());
    }

    fn arb_permission() -> impl Strategy<Value = Permission> {
        (
            prop::sample::select(vec!["users", "roles", "reports"]),
            prop::sample::select(vec!["read", "write", "delete"]),
        )
            .prop_map(|(r, a)| Permission::new(format!("{r}.{a}"), r, a))
    }

    fn arb_role() -> impl Strategy<Value = Role> {
        prop::collection::vec(arb_permission(), 0..5).prop_map(|perms| {
            perms
                .into_iter()
                .fold(Role::new("generated"), |role, p| role.with_permission(p))
        })
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// `check` agrees with membership in the union of all role permissions.
        #[test]
        fn check_matches_union_of_role_permissions(
            roles in prop::collection::vec(arb_role(), 0..4),
            resource in prop::sample::select(vec!["users", "roles", "reports"]),
            action in prop::sample::select(vec!["read", "write", "delete"]),
        ) {
            let expected = roles
                .iter()
                .any(|role| role.permissions.iter().any(|p| p.resource == resource && p.action == action));
            let user = user_with_roles(roles);

            prop_assert_eq!(check(&user, resource, action), expected);
            prop_assert_eq!(permissions_of(&user).contains(resource, action), expected);
        }

        /// Adding a role never removes a permission.
        #[test]
        fn adding_a_role_is_monotonic(
            roles in prop::collection::vec(arb_role(), 0..4),
            extra in arb_role(),
        ) {
            let before = permissions_of(&user_with_roles(roles.clone()));
            let mut more = roles;
            more.push(extra);
            let after = permissions_of(&user_with_roles(more));

            for key in before.keys() {
                prop_assert!(after.contains_key(key));
            }
        }
    }
}
