use gatehouse_auth::{Identity, TokenClaims};
use gatehouse_core::UserId;

/// Authenticated caller for a request.
///
/// Inserted by the strict auth gate; immutable for the rest of the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityContext {
    identity: Identity,
}

impl IdentityContext {
    pub fn new(identity: Identity) -> Self {
        Self { identity }
    }

    pub fn user_id(&self) -> UserId {
        self.identity.user_id
    }

    pub fn email(&self) -> &str {
        &self.identity.email
    }
}

impl From<&TokenClaims> for IdentityContext {
    fn from(claims: &TokenClaims) -> Self {
        Self::new(Identity::from(claims))
    }
}

/// Caller identity on permissive routes: `None` when unauthenticated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MaybeIdentity(pub Option<IdentityContext>);
