//! Credential verification: Argon2id password hashing.
//!
//! Hashes are stored as PHC strings (`$argon2id$v=19$m=..,t=..,p=..$salt$hash`).
//! Because the string carries its own algorithm, version and cost parameters,
//! changing [`HashParams`] never invalidates hashes written with older ones:
//! verification always recomputes with the parameters embedded in the stored
//! hash. [`CredentialVerifier::needs_rehash`] tells callers when a stored hash
//! should be upgraded.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use gatehouse_core::AppError;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CredentialError {
    /// Mismatch or unusable stored hash. Deliberately carries no detail.
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("password cannot be empty")]
    EmptyPassword,

    #[error("invalid hash parameters: {0}")]
    InvalidParams(String),

    #[error("password hashing failed: {0}")]
    Hashing(String),
}

impl From<CredentialError> for AppError {
    fn from(err: CredentialError) -> Self {
        match err {
            CredentialError::InvalidCredentials => AppError::InvalidCredentials,
            CredentialError::EmptyPassword => AppError::validation(err.to_string()),
            CredentialError::InvalidParams(_) | CredentialError::Hashing(_) => {
                AppError::internal(err.to_string())
            }
        }
    }
}

/// Argon2id cost parameters used for new hashes.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HashParams {
    /// Memory cost in KiB.
    pub memory_kib: u32,
    /// Number of passes.
    pub iterations: u32,
    /// Degree of parallelism.
    pub parallelism: u32,
}

impl Default for HashParams {
    fn default() -> Self {
        Self {
            memory_kib: Params::DEFAULT_M_COST,
            iterations: Params::DEFAULT_T_COST,
            parallelism: Params::DEFAULT_P_COST,
        }
    }
}

impl HashParams {
    fn to_argon2(self) -> Result<Params, CredentialError> {
        Params::new(self.memory_kib, self.iterations, self.parallelism, None)
            .map_err(|e| CredentialError::InvalidParams(e.to_string()))
    }
}

/// Hashes and verifies passwords.
///
/// Holds only immutable configuration; share it behind an `Arc`.
#[derive(Clone)]
pub struct CredentialVerifier {
    params: Params,
    /// Hash of a throwaway password, verified against when the account does not
    /// exist so that unknown-user and wrong-password logins cost the same.
    decoy_hash: String,
}

impl CredentialVerifier {
    pub fn new(params: HashParams) -> Result<Self, CredentialError> {
        let params = params.to_argon2()?;
        let mut verifier = Self {
            params,
            decoy_hash: String::new(),
        };
        verifier.decoy_hash = verifier.hash("gatehouse-decoy-password")?;
        Ok(verifier)
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }

    /// Hash a plaintext password with a fresh random salt.
    pub fn hash(&self, plaintext: &str) -> Result<String, CredentialError> {
        if plaintext.is_empty() {
            return Err(CredentialError::EmptyPassword);
        }

        let salt = SaltString::generate(&mut OsRng);
        self.argon2()
            .hash_password(plaintext.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| CredentialError::Hashing(e.to_string()))
    }

    /// Verify `plaintext` against a stored PHC hash.
    ///
    /// Any failure (mismatch, malformed hash, unsupported algorithm) yields the
    /// same [`CredentialError::InvalidCredentials`].
    pub fn verify(&self, stored_hash: &str, plaintext: &str) -> Result<(), CredentialError> {
        let parsed = PasswordHash::new(stored_hash).map_err(|e| {
            tracing::warn!(error = %e, "stored password hash is not a valid PHC string");
            CredentialError::InvalidCredentials
        })?;

        self.argon2()
            .verify_password(plaintext.as_bytes(), &parsed)
            .map_err(|_| CredentialError::InvalidCredentials)
    }

    /// Burn the same work as a real verification, then fail.
    pub fn reject_unknown(&self, plaintext: &str) -> CredentialError {
        let _ = self.verify(&self.decoy_hash, plaintext);
        CredentialError::InvalidCredentials
    }

    /// True when `stored_hash` was produced with different parameters (or a
    /// different algorithm) than the ones configured now.
    pub fn needs_rehash(&self, stored_hash: &str) -> bool {
        let Ok(parsed) = PasswordHash::new(stored_hash) else {
            return true;
        };
        if parsed.algorithm != Algorithm::Argon2id.ident() {
            return true;
        }
        match Params::try_from(&parsed) {
            Ok(params) => {
                params.m_cost() != self.params.m_cost()
                    || params.t_cost() != self.params.t_cost()
                    || params.p_cost() != self.params.p_cost()
            }
            Err(_) => true,
        }
    }
}

impl core::fmt::Debug for CredentialVerifier {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CredentialVerifier")
            .field("m_cost", &self.params.m_cost())
            .field("t_cost", &self.params.t_cost())
            .field("p_cost", &self.params.p_cost())
            .finish()
    }
}

#[cfg(test)]
pub(crate) fn fast_params() -> HashParams {
    HashParams {
        memory_kib: 256,
        iterations: 1,
        parallelism: 1,
    }
}
