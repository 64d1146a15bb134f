//! `gatehouse-auth`: credential verification, tokens, and permission resolution.
//!
//! This crate is intentionally decoupled from HTTP and storage: persistence is
//! reached only through [`UserDirectory`].

pub mod account;
pub mod authorize;
pub mod claims;
pub mod directory;
pub mod password;
pub mod permissions;
pub mod principal;
pub mod resolver;
pub mod roles;
pub mod session;
pub mod token;
pub mod user;

#[cfg(test)]
pub(crate) mod testing;

pub use account::AccountService;
pub use authorize::{Explanation, PermissionSet};
pub use claims::{ClaimsError, TokenClaims, TokenKind, validate_claims};
pub use directory::{SharedDirectory, StoreError, UserDirectory};
pub use password::{CredentialError, CredentialVerifier, HashParams};
pub use permissions::{Permission, PermissionKey};
pub use principal::Identity;
pub use resolver::{PermissionResolver, ResolutionError};
pub use roles::Role;
pub use session::{AuthOutcome, AuthService, DEFAULT_ROLE, Registration};
pub use token::{TokenConfig, TokenError, TokenManager, TokenPair};
pub use user::{NewUser, User, UserStatus};
