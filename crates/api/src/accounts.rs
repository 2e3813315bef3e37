//! Account registration, login and user record management
//!
//! Orchestrates the password hasher, the JWT issuer and the store. Hashing is
//! CPU-bound and deliberately slow, so it runs on the blocking pool.

use std::sync::Arc;

use crate::auth::{JwtError, JwtManager, PasswordError, PasswordService};
use crate::models::{NewUser, User, UserChanges, UserPatch};
use crate::store::{Store, StoreError};

/// Verified against when a login names an unknown email, so both failure
/// paths pay for one Argon2 verification.
const DUMMY_PASSWORD: &str = "authgate-dummy-password";

/// Token plus the account it was issued for
///
/// `user` still carries the password hash; project it through
/// [`crate::models::UserView`] before it leaves the process.
#[derive(Debug, Clone)]
pub struct AuthResult {
    pub token: String,
    pub user: User,
}

#[derive(Debug, thiserror::Error)]
pub enum RegisterError {
    #[error("Email already exists")]
    EmailTaken,
    #[error("store failure: {0}")]
    Store(StoreError),
    #[error(transparent)]
    Hashing(#[from] PasswordError),
    #[error(transparent)]
    Token(#[from] JwtError),
}

#[derive(Debug, thiserror::Error)]
pub enum LoginError {
    /// Unknown email or wrong password; deliberately indistinguishable
    #[error("Invalid email or password")]
    InvalidCredentials,
    #[error("store failure: {0}")]
    Store(StoreError),
    #[error(transparent)]
    Hashing(#[from] PasswordError),
    #[error(transparent)]
    Token(#[from] JwtError),
}

/// Failures of the user management operations
#[derive(Debug, thiserror::Error)]
pub enum AccountError {
    #[error("User not found")]
    NotFound,
    #[error("Email already exists")]
    EmailTaken,
    #[error("store failure: {0}")]
    Store(StoreError),
    #[error(transparent)]
    Hashing(#[from] PasswordError),
}

impl From<StoreError> for AccountError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => AccountError::NotFound,
            StoreError::Conflict(_) => AccountError::EmailTaken,
            other => AccountError::Store(other),
        }
    }
}

impl From<AccountError> for RegisterError {
    fn from(err: AccountError) -> Self {
        match err {
            AccountError::EmailTaken => RegisterError::EmailTaken,
            AccountError::NotFound => RegisterError::Store(StoreError::NotFound),
            AccountError::Store(e) => RegisterError::Store(e),
            AccountError::Hashing(e) => RegisterError::Hashing(e),
        }
    }
}

#[derive(Clone)]
pub struct AccountService {
    store: Arc<dyn Store>,
    jwt_manager: JwtManager,
    passwords: PasswordService,
    dummy_hash: Arc<str>,
}

impl AccountService {
    /// Fails only if the hasher cannot produce a hash, which means the
    /// configured cost parameters are unusable.
    pub fn new(
        store: Arc<dyn Store>,
        jwt_manager: JwtManager,
        passwords: PasswordService,
    ) -> Result<Self, PasswordError> {
        let dummy_hash = passwords.hash(DUMMY_PASSWORD)?;
        Ok(Self {
            store,
            jwt_manager,
            passwords,
            dummy_hash: dummy_hash.into(),
        })
    }

    /// Create an account and issue its first token
    pub async fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<AuthResult, RegisterError> {
        let user = self.create_account(name, email, password).await?;
        let token = self.jwt_manager.issue(&user.id)?;

        tracing::info!(user_id = %user.id, "Account registered");
        Ok(AuthResult { token, user })
    }

    /// Exchange email and password for a fresh token
    pub async fn login(&self, email: &str, password: &str) -> Result<AuthResult, LoginError> {
        let (user, hash) = match self.store.find_user_by_email(email).await {
            Ok(user) => {
                let hash = user.password_hash.clone();
                (Some(user), hash)
            }
            Err(StoreError::NotFound) => (None, self.dummy_hash.to_string()),
            Err(e) => return Err(LoginError::Store(e)),
        };

        let password_ok = self.verify_password(password, hash).await?;

        let user = match user {
            Some(user) if password_ok => user,
            _ => {
                tracing::debug!("Login rejected");
                return Err(LoginError::InvalidCredentials);
            }
        };

        let token = self.jwt_manager.issue(&user.id)?;
        tracing::info!(user_id = %user.id, "Login succeeded");
        Ok(AuthResult { token, user })
    }

    pub async fn get_user(&self, id: &str) -> Result<User, AccountError> {
        Ok(self.store.find_user_by_id(id).await?)
    }

    pub async fn list_users(&self) -> Result<Vec<User>, AccountError> {
        Ok(self.store.list_users().await?)
    }

    /// Create an account without issuing a token
    pub async fn create_user(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<User, AccountError> {
        self.create_account(name, email, password).await
    }

    /// Apply only the supplied fields; a new password is rehashed
    pub async fn update_user(&self, id: &str, patch: UserPatch) -> Result<User, AccountError> {
        let password_hash = match patch.password {
            Some(password) => Some(self.hash_password(password).await?),
            None => None,
        };

        let changes = UserChanges {
            name: patch.name,
            email: patch.email,
            password_hash,
        };
        let user = self.store.update_user(id, changes).await?;

        tracing::info!(user_id = %user.id, "User updated");
        Ok(user)
    }

    pub async fn delete_user(&self, id: &str) -> Result<(), AccountError> {
        self.store.delete_user(id).await?;
        tracing::info!(user_id = %id, "User deleted");
        Ok(())
    }

    /// Check-then-insert. Two concurrent registrations for one email can
    /// both pass the lookup; the store's uniqueness constraint then rejects
    /// the second insert, which is reported as `EmailTaken` as well.
    async fn create_account(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<User, AccountError> {
        match self.store.find_user_by_email(email).await {
            Ok(_) => return Err(AccountError::EmailTaken),
            Err(StoreError::NotFound) => {}
            Err(e) => return Err(AccountError::Store(e)),
        }

        let password_hash = self.hash_password(password.to_string()).await?;

        let new_user = NewUser {
            name: name.to_string(),
            email: email.to_string(),
            password_hash,
        };
        let id = match self.store.insert_user(new_user.clone()).await {
            Ok(id) => id,
            Err(StoreError::Conflict(_)) => return Err(AccountError::EmailTaken),
            Err(e) => return Err(AccountError::Store(e)),
        };

        Ok(User {
            id,
            name: new_user.name,
            email: new_user.email,
            password_hash: new_user.password_hash,
        })
    }

    async fn hash_password(&self, password: String) -> Result<String, PasswordError> {
        let passwords = self.passwords.clone();
        tokio::task::spawn_blocking(move || passwords.hash(&password))
            .await
            .map_err(|e| PasswordError::HashFailed(e.to_string()))?
    }

    async fn verify_password(&self, password: &str, hash: String) -> Result<bool, PasswordError> {
        let passwords = self.passwords.clone();
        let password = password.to_string();
        tokio::task::spawn_blocking(move || passwords.verify(&password, &hash))
            .await
            .map_err(|e| PasswordError::HashFailed(e.to_string()))
    }
}
