//! Default roles and permissions.

use gatehouse_auth::{Permission, StoreError};

use crate::InMemoryDirectory;

/// `(name, resource, action, description)`
const PERMISSIONS: &[(&str, &str, &str, &str)] = &[
    ("users.read", "users", "read", "Read user information"),
    ("users.write", "users", "write", "Create and update users"),
    ("users.delete", "users", "delete", "Delete users"),
    ("roles.read", "roles", "read", "Read role information"),
    ("roles.write", "roles", "write", "Create and update roles"),
    ("roles.delete", "roles", "delete", "Delete roles"),
];

/// `(role, description, permission names)`
const ROLES: &[(&str, &str, &[&str])] = &[
    (
        "admin",
        "Administrator with full access",
        &["users.read", "users.write", "users.delete", "roles.read", "roles.write", "roles.delete"],
    ),
    ("user", "Regular user", &["users.read"]),
];

/// What a seeding pass changed.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SeedReport {
    pub links_added: usize,
}

/// Insert the default permissions and roles. Safe to run on every startup.
pub fn seed_defaults(directory: &InMemoryDirectory) -> Result<SeedReport, StoreError> {
    let mut report = SeedReport::default();

    let mut permissions = Vec::with_capacity(PERMISSIONS.len());
    for (name, resource, action, description) in PERMISSIONS {
        let permission = directory
            .upsert_permission(Permission::new(*name, *resource, *action).with_description(*description))?;
        permissions.push(permission);
    }

    for (name, description, granted) in ROLES {
        let role = directory.upsert_role(name, Some(*description))?;
        for permission in permissions.iter().filter(|p| granted.contains(&p.name.as_str())) {
            if directory.attach_permission(role.id, permission.id)? {
                report.links_added += 1;
            }
        }
    }

    tracing::info!(links_added = report.links_added, "default roles seeded");
    Ok(report)
}
