//! authgate shared infrastructure
//!
//! Database pool construction and schema migrations used by the API binary.

pub mod db;

pub use db::{create_pool, run_migrations, PoolSettings};
