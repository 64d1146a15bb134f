//! Permission gate, composed after the strict auth gate.
//!
//! Every gated request is resolved from the directory again; nothing is cached.

use std::sync::Arc;

use axum::{
    extract::State,
    middleware::Next,
    response::{IntoResponse, Response},
};

use gatehouse_auth::{PermissionKey, PermissionResolver, SharedDirectory};
use gatehouse_core::{AppError, AppResult, UserId};

use crate::app::errors::ApiError;
use crate::app::services::blocking;
use crate::context::IdentityContext;

pub type SharedResolver = Arc<PermissionResolver<SharedDirectory>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Requirement {
    /// The single permission must be held.
    All(PermissionKey),
    /// At least one of these must be held. Checked in order.
    Any(Vec<PermissionKey>),
}

#[derive(Clone)]
pub struct PermissionGate {
    resolver: SharedResolver,
    requirement: Arc<Requirement>,
}

impl PermissionGate {
    pub fn require(resolver: SharedResolver, resource: &str, action: &str) -> Self {
        Self {
            resolver,
            requirement: Arc::new(Requirement::All(PermissionKey::new(resource, action))),
        }
    }

    pub fn require_any(resolver: SharedResolver, pairs: &[(&str, &str)]) -> Self {
        let keys = pairs.iter().map(|(r, a)| PermissionKey::new(*r, *a)).collect();
        Self {
            resolver,
            requirement: Arc::new(Requirement::Any(keys)),
        }
    }

    /// `Forbidden` when not satisfied, `Internal` when resolution fails.
    ///
    /// `Any` stops at the first granted key, and also at the first resolver
    /// error: the remaining keys are not tried.
    pub fn evaluate(&self, user_id: UserId) -> AppResult<()> {
        let granted = match self.requirement.as_ref() {
            Requirement::All(key) => self.resolver.check_key(user_id, key)?,
            Requirement::Any(keys) => {
                let mut granted = false;
                for key in keys {
                    if self.resolver.check_key(user_id, key)? {
                        granted = true;
                        break;
                    }
                }
                granted
            }
        };

        if granted {
            Ok(())
        } else {
            tracing::info!(%user_id, requirement = ?self.requirement, "permission denied");
            Err(AppError::forbidden("insufficient permissions"))
        }
    }
}

pub async fn require_permissions(
    State(gate): State<PermissionGate>,
    req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Response {
    let Some(identity) = req.extensions().get::<IdentityContext>().cloned() else {
        // Wiring error: the auth gate must run first.
        return ApiError::from(AppError::internal("permission gate reached without identity")).into_response();
    };

    let user_id = identity.user_id();
    match blocking(move || gate.evaluate(user_id)).await {
        Ok(()) => next.run(req).await,
        Err(e) => ApiError::from(e).into_response(),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use chrono::Utc;

    use gatehouse_auth::{NewUser, Permission, Role, StoreError, User, UserDirectory, UserStatus};
    use gatehouse_core::RoleId;

    use super::*;

    /// Serves one user; every lookup from call `fail_from` onward fails.
    struct ScriptedDirectory {
        user: User,
        fail_from: usize,
        calls: AtomicUsize,
    }

    impl ScriptedDirectory {
        fn new(fail_from: usize) -> Self {
            let now = Utc::now();
            let role = Role::new("reader").with_permission(Permission::new("users.read", "users", "read"));
            Self {
                user: User {
                    id: UserId::new(),
                    email: "ada@example.com".into(),
                    password_hash: String::new(),
                    first_name: "Ada".into(),
                    last_name: "Lovelace".into(),
                    status: UserStatus::Active,
                    roles: vec![role],
                    created_at: now,
                    updated_at: now,
                },
                fail_from,
                calls: AtomicUsize::new(0),
            }
        }
    }

    fn unused<T>() -> Result<T, StoreError> {
        Err(StoreError::Unavailable("not scripted".into()))
    }

    impl UserDirectory for ScriptedDirectory {
        fn find_user_by_id(&self, id: UserId) -> Result<Option<User>, StoreError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call >= self.fail_from {
                return Err(StoreError::Unavailable("connection reset".into()));
            }
            Ok((id == self.user.id).then(|| self.user.clone()))
        }

        fn find_user_by_email(&self, _: &str) -> Result<Option<User>, StoreError> {
            unused()
        }

        fn find_role_by_name(&self, _: &str) -> Result<Option<Role>, StoreError> {
            unused()
        }

        fn find_role_by_id(&self, _: RoleId) -> Result<Option<Role>, StoreError> {
            unused()
        }

        fn list_roles(&self) -> Result<Vec<Role>, StoreError> {
            unused()
        }

        fn insert_user(&self, _: NewUser) -> Result<User, StoreError> {
            unused()
        }

        fn update_profile(&self, _: UserId, _: &str, _: &str) -> Result<User, StoreError> {
            unused()
        }

        fn set_password_hash(&self, _: UserId, _: &str) -> Result<(), StoreError> {
            unused()
        }

        fn set_active(&self, _: UserId, _: bool) -> Result<User, StoreError> {
            unused()
        }

        fn grant_role(&self, _: UserId, _: RoleId) -> Result<bool, StoreError> {
            unused()
        }

        fn revoke_role(&self, _: UserId, _: RoleId) -> Result<bool, StoreError> {
            unused()
        }
    }

    fn gate_over(dir: Arc<ScriptedDirectory>, build: impl FnOnce(SharedResolver) -> PermissionGate) -> PermissionGate {
        let shared: SharedDirectory = dir;
        build(Arc::new(PermissionResolver::new(shared)))
    }

    #[test]
    fn single_permission_is_granted_or_forbidden() {
        let dir = Arc::new(ScriptedDirectory::new(usize::MAX));
        let user = dir.user.id;

        let read = gate_over(dir.clone(), |r| PermissionGate::require(r, "users", "read"));
        assert_eq!(read.evaluate(user), Ok(()));

        let write = gate_over(dir, |r| PermissionGate::require(r, "users", "write"));
        assert_eq!(write.evaluate(user), Err(AppError::forbidden("insufficient permissions")));
    }

    #[test]
    fn unknown_user_is_forbidden() {
        let dir = Arc::new(ScriptedDirectory::new(usize::MAX));
        let gate = gate_over(dir, |r| PermissionGate::require(r, "users", "read"));
        assert!(matches!(gate.evaluate(UserId::new()), Err(AppError::Forbidden(_))));
    }

    #[test]
    fn resolution_failure_is_internal_not_forbidden() {
        let dir = Arc::new(ScriptedDirectory::new(0));
        let user = dir.user.id;
        let gate = gate_over(dir, |r| PermissionGate::require(r, "users", "read"));
        assert!(matches!(gate.evaluate(user), Err(AppError::Internal(_))));
    }

    #[test]
    fn any_short_circuits_on_first_grant() {
        // The second lookup would fail, but it is never made.
        let dir = Arc::new(ScriptedDirectory::new(1));
        let user = dir.user.id;
        let gate = gate_over(dir.clone(), |r| {
            PermissionGate::require_any(r, &[("users", "read"), ("users", "delete")])
        });

        assert_eq!(gate.evaluate(user), Ok(()));
        assert_eq!(dir.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn any_stops_at_first_error() {
        let dir = Arc::new(ScriptedDirectory::new(0));
        let user = dir.user.id;
        let gate = gate_over(dir.clone(), |r| {
            PermissionGate::require_any(r, &[("users", "write"), ("users", "read")])
        });

        assert!(matches!(gate.evaluate(user), Err(AppError::Internal(_))));
        assert_eq!(dir.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn any_is_forbidden_when_nothing_matches() {
        let dir = Arc::new(ScriptedDirectory::new(usize::MAX));
        let user = dir.user.id;
        let gate = gate_over(dir.clone(), |r| {
            PermissionGate::require_any(r, &[("users", "write"), ("users", "delete")])
        });

        assert!(matches!(gate.evaluate(user), Err(AppError::Forbidden(_))));
        assert_eq!(dir.calls.load(Ordering::SeqCst), 2);
    }
}
