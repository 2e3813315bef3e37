//! Application state

use std::sync::Arc;

use crate::{
    accounts::AccountService,
    auth::{AuthState, JwtManager, PasswordService},
    config::{Config, ConfigError},
    store::Store,
};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn Store>,
    pub jwt_manager: JwtManager,
    pub accounts: AccountService,
}

impl AppState {
    pub fn new(config: Config, store: Arc<dyn Store>) -> Result<Self, ConfigError> {
        let jwt_manager = JwtManager::new(&config.jwt_secret, config.jwt_expiry_hours);
        tracing::info!(
            expiry_hours = config.jwt_expiry_hours,
            "JWT manager initialized"
        );

        let passwords = PasswordService::new(
            config.hash_memory_kib,
            config.hash_iterations,
            config.hash_parallelism,
        )
        .map_err(|e| ConfigError::Hashing(e.to_string()))?;

        let accounts = AccountService::new(store.clone(), jwt_manager.clone(), passwords)
            .map_err(|e| ConfigError::Hashing(e.to_string()))?;

        Ok(Self {
            config,
            store,
            jwt_manager,
            accounts,
        })
    }

    /// Get auth state for middleware
    pub fn auth_state(&self) -> AuthState {
        AuthState {
            jwt_manager: self.jwt_manager.clone(),
            playground_path: self.config.playground_path.clone(),
            max_body_bytes: self.config.max_body_bytes,
        }
    }
}
