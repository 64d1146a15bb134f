use std::sync::Arc;

use thiserror::Error;

use gatehouse_auth::{
    AccountService, AuthService, CredentialError, CredentialVerifier, PermissionResolver, SharedDirectory,
    TokenError, TokenManager,
};
use gatehouse_core::{AppError, AppResult};
use gatehouse_infra::{ConfigError, GatehouseConfig};

use crate::authz::SharedResolver;

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Token(#[from] TokenError),

    #[error(transparent)]
    Credentials(#[from] CredentialError),
}

/// Everything the handlers and gates need, built once at startup.
pub struct AppServices {
    pub auth: AuthService<SharedDirectory>,
    pub accounts: AccountService<SharedDirectory>,
    pub resolver: SharedResolver,
    pub tokens: Arc<TokenManager>,
}

impl AppServices {
    pub fn new(
        directory: SharedDirectory,
        tokens: TokenManager,
        credentials: CredentialVerifier,
        default_role: &str,
    ) -> Self {
        let tokens = Arc::new(tokens);
        let credentials = Arc::new(credentials);

        Self {
            auth: AuthService::new(directory.clone(), tokens.clone(), credentials.clone())
                .with_default_role(default_role),
            accounts: AccountService::new(directory.clone(), credentials),
            resolver: Arc::new(PermissionResolver::new(directory)),
            tokens,
        }
    }

    pub fn from_config(config: &GatehouseConfig, directory: SharedDirectory) -> Result<Self, BootstrapError> {
        let tokens = TokenManager::new(config.jwt.token_config()?)?;
        let credentials = CredentialVerifier::new(config.password)?;
        Ok(Self::new(directory, tokens, credentials, &config.default_role))
    }
}

/// Run a synchronous flow on the blocking pool.
///
/// Argon2 hashing and directory calls must not stall the async workers.
pub async fn blocking<T, F>(f: F) -> AppResult<T>
where
    F: FnOnce() -> AppResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| AppError::internal(format!("blocking task failed: {e}")))?
}
