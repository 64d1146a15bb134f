use serde::{Deserialize, Serialize};

use gatehouse_core::UserId;

use crate::TokenClaims;

/// Verified identity of the caller, derived from a validated access token.
///
/// This is what the auth gate attaches to a request. It carries no roles or
/// permissions: those are resolved from the directory on every gated request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub user_id: UserId,
    pub email: String,
}

impl Identity {
    pub fn new(user_id: UserId, email: impl Into<String>) -> Self {
        Self {
            user_id,
            email: email.into(),
        }
    }
}

impl From<&TokenClaims> for Identity {
    fn from(claims: &TokenClaims) -> Self {
        Self {
            user_id: claims.user_id,
            email: claims.email.clone(),
        }
    }
}
