//! In-process store used when no database is configured and in tests

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{Store, StoreError};
use crate::models::{NewProduct, NewUser, Product, ProductPatch, User, UserChanges};

#[derive(Default)]
struct Records {
    users: Vec<User>,
    products: Vec<Product>,
}

/// Store backed by vectors behind an async `RwLock`
///
/// Email uniqueness is enforced under the write lock, matching the unique
/// index on the PostgreSQL schema.
#[derive(Default)]
pub struct MemoryStore {
    records: RwLock<Records>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn email_conflict(email: &str) -> StoreError {
    StoreError::Conflict(format!("email {} already exists", email))
}

#[async_trait]
impl Store for MemoryStore {
    async fn find_user_by_email(&self, email: &str) -> Result<User, StoreError> {
        let records = self.records.read().await;
        records
            .users
            .iter()
            .find(|u| u.email == email)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn find_user_by_id(&self, id: &str) -> Result<User, StoreError> {
        let records = self.records.read().await;
        records
            .users
            .iter()
            .find(|u| u.id == id)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn list_users(&self) -> Result<Vec<User>, StoreError> {
        Ok(self.records.read().await.users.clone())
    }

    async fn insert_user(&self, user: NewUser) -> Result<String, StoreError> {
        let mut records = self.records.write().await;
        if records.users.iter().any(|u| u.email == user.email) {
            return Err(email_conflict(&user.email));
        }

        let id = Uuid::new_v4().to_string();
        records.users.push(User {
            id: id.clone(),
            name: user.name,
            email: user.email,
            password_hash: user.password_hash,
        });
        Ok(id)
    }

    async fn update_user(&self, id: &str, changes: UserChanges) -> Result<User, StoreError> {
        let mut records = self.records.write().await;

        if let Some(email) = &changes.email {
            if records.users.iter().any(|u| u.id != id && &u.email == email) {
                return Err(email_conflict(email));
            }
        }

        let user = records
            .users
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or(StoreError::NotFound)?;

        if let Some(name) = changes.name {
            user.name = name;
        }
        if let Some(email) = changes.email {
            user.email = email;
        }
        if let Some(password_hash) = changes.password_hash {
            user.password_hash = password_hash;
        }
        Ok(user.clone())
    }

    async fn delete_user(&self, id: &str) -> Result<(), StoreError> {
        let mut records = self.records.write().await;
        let before = records.users.len();
        records.users.retain(|u| u.id != id);
        if records.users.len() == before {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn find_product_by_id(&self, id: &str) -> Result<Product, StoreError> {
        let records = self.records.read().await;
        records
            .products
            .iter()
            .find(|p| p.id == id)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn list_products(&self) -> Result<Vec<Product>, StoreError> {
        Ok(self.records.read().await.products.clone())
    }

    async fn insert_product(&self, product: NewProduct) -> Result<Product, StoreError> {
        let product = Product {
            id: Uuid::new_v4().to_string(),
            name: product.name,
            price: product.price,
            stock: product.stock,
        };
        self.records.write().await.products.push(product.clone());
        Ok(product)
    }

    async fn update_product(&self, id: &str, patch: ProductPatch) -> Result<Product, StoreError> {
        let mut records = self.records.write().await;
        let product = records
            .products
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or(StoreError::NotFound)?;

        if let Some(name) = patch.name {
            product.name = name;
        }
        if let Some(price) = patch.price {
            product.price = price;
        }
        if let Some(stock) = patch.stock {
            product.stock = stock;
        }
        Ok(product.clone())
    }

    async fn delete_product(&self, id: &str) -> Result<(), StoreError> {
        let mut records = self.records.write().await;
        let before = records.products.len();
        records.products.retain(|p| p.id != id);
        if records.products.len() == before {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}
