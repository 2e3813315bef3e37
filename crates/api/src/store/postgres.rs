//! PostgreSQL-backed store

use async_trait::async_trait;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use super::{Store, StoreError};
use crate::models::{NewProduct, NewUser, Product, ProductPatch, User, UserChanges};

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => StoreError::NotFound,
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                StoreError::Conflict(db.message().to_string())
            }
            sqlx::Error::PoolTimedOut => {
                StoreError::Backend("timed out waiting for a database connection".to_string())
            }
            other => StoreError::Backend(other.to_string()),
        }
    }
}

/// Database row type for user lookup
#[derive(Debug, FromRow)]
struct UserRow {
    id: Uuid,
    name: String,
    email: String,
    password_hash: String,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id.to_string(),
            name: row.name,
            email: row.email,
            password_hash: row.password_hash,
        }
    }
}

/// Database row type for product lookup
#[derive(Debug, FromRow)]
struct ProductRow {
    id: Uuid,
    name: String,
    price: f64,
    stock: i32,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Self {
            id: row.id.to_string(),
            name: row.name,
            price: row.price,
            stock: row.stock,
        }
    }
}

/// Ids arrive as client strings; anything that is not a UUID cannot exist
fn parse_id(id: &str) -> Result<Uuid, StoreError> {
    Uuid::parse_str(id).map_err(|_| StoreError::NotFound)
}

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Store for PgStore {
    async fn find_user_by_email(&self, email: &str) -> Result<User, StoreError> {
        let row: UserRow = sqlx::query_as(
            "SELECT id, name, email, password_hash FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.into())
    }

    async fn find_user_by_id(&self, id: &str) -> Result<User, StoreError> {
        let row: UserRow =
            sqlx::query_as("SELECT id, name, email, password_hash FROM users WHERE id = $1")
                .bind(parse_id(id)?)
                .fetch_one(&self.pool)
                .await?;
        Ok(row.into())
    }

    async fn list_users(&self) -> Result<Vec<User>, StoreError> {
        let rows: Vec<UserRow> = sqlx::query_as(
            "SELECT id, name, email, password_hash FROM users ORDER BY created_at ASC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(User::from).collect())
    }

    async fn insert_user(&self, user: NewUser) -> Result<String, StoreError> {
        let id: Uuid = sqlx::query_scalar(
            r#"
            INSERT INTO users (name, email, password_hash)
            VALUES ($1, $2, $3)
            RETURNING id
            "#,
        )
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .fetch_one(&self.pool)
        .await?;
        Ok(id.to_string())
    }

    async fn update_user(&self, id: &str, changes: UserChanges) -> Result<User, StoreError> {
        let row: UserRow = sqlx::query_as(
            r#"
            UPDATE users
            SET name = COALESCE($2, name),
                email = COALESCE($3, email),
                password_hash = COALESCE($4, password_hash),
                updated_at = NOW()
            WHERE id = $1
            RETURNING id, name, email, password_hash
            "#,
        )
        .bind(parse_id(id)?)
        .bind(changes.name)
        .bind(changes.email)
        .bind(changes.password_hash)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.into())
    }

    async fn delete_user(&self, id: &str) -> Result<(), StoreError> {
        let rows_affected = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(parse_id(id)?)
            .execute(&self.pool)
            .await?
            .rows_affected();

        if rows_affected == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn find_product_by_id(&self, id: &str) -> Result<Product, StoreError> {
        let row: ProductRow =
            sqlx::query_as("SELECT id, name, price, stock FROM products WHERE id = $1")
                .bind(parse_id(id)?)
                .fetch_one(&self.pool)
                .await?;
        Ok(row.into())
    }

    async fn list_products(&self) -> Result<Vec<Product>, StoreError> {
        let rows: Vec<ProductRow> =
            sqlx::query_as("SELECT id, name, price, stock FROM products ORDER BY created_at ASC")
                .fetch_all(&self.pool)
                .await?;
        Ok(rows.into_iter().map(Product::from).collect())
    }

    async fn insert_product(&self, product: NewProduct) -> Result<Product, StoreError> {
        let row: ProductRow = sqlx::query_as(
            r#"
            INSERT INTO products (name, price, stock)
            VALUES ($1, $2, $3)
            RETURNING id, name, price, stock
            "#,
        )
        .bind(&product.name)
        .bind(product.price)
        .bind(product.stock)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.into())
    }

    async fn update_product(&self, id: &str, patch: ProductPatch) -> Result<Product, StoreError> {
        let row: ProductRow = sqlx::query_as(
            r#"
            UPDATE products
            SET name = COALESCE($2, name),
                price = COALESCE($3, price),
                stock = COALESCE($4, stock),
                updated_at = NOW()
            WHERE id = $1
            RETURNING id, name, price, stock
            "#,
        )
        .bind(parse_id(id)?)
        .bind(patch.name)
        .bind(patch.price)
        .bind(patch.stock)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.into())
    }

    async fn delete_product(&self, id: &str) -> Result<(), StoreError> {
        let rows_affected = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(parse_id(id)?)
            .execute(&self.pool)
            .await?
            .rows_affected();

        if rows_affected == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}
