//! Record storage for users and products
//!
//! The [`Store`] trait is the only way the service touches persistence.
//! Every accessor returns a `Result`; callers decide whether
//! [`StoreError::NotFound`] is a client 404, a login failure, or a signal to
//! continue (the email lookup during registration).

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use async_trait::async_trait;

use crate::models::{NewProduct, NewUser, Product, ProductPatch, User, UserChanges};

/// Storage failures
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// Record not found
    #[error("Record not found")]
    NotFound,

    /// Uniqueness constraint violated
    #[error("Constraint violation: {0}")]
    Conflict(String),

    /// Backend unreachable, timed out, or failed
    #[error("Store backend error: {0}")]
    Backend(String),
}

/// Persistence operations needed by the service
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Store: Send + Sync {
    // =========================================================================
    // User operations
    // =========================================================================

    /// Look up a user by email (exact match)
    async fn find_user_by_email(&self, email: &str) -> Result<User, StoreError>;

    /// Look up a user by id
    async fn find_user_by_id(&self, id: &str) -> Result<User, StoreError>;

    /// List all users
    async fn list_users(&self) -> Result<Vec<User>, StoreError>;

    /// Insert a user and return the id assigned by the store
    async fn insert_user(&self, user: NewUser) -> Result<String, StoreError>;

    /// Apply the supplied fields and return the updated record
    async fn update_user(&self, id: &str, changes: UserChanges) -> Result<User, StoreError>;

    /// Delete a user by id
    async fn delete_user(&self, id: &str) -> Result<(), StoreError>;

    // =========================================================================
    // Product operations
    // =========================================================================

    async fn find_product_by_id(&self, id: &str) -> Result<Product, StoreError>;

    async fn list_products(&self) -> Result<Vec<Product>, StoreError>;

    async fn insert_product(&self, product: NewProduct) -> Result<Product, StoreError>;

    async fn update_product(&self, id: &str, patch: ProductPatch) -> Result<Product, StoreError>;

    async fn delete_product(&self, id: &str) -> Result<(), StoreError>;
}
