//! Database operations for storefront `PostgreSQL`.
//!
//! # Schema: `storefront`
//!
//! ## Tables
//!
//! - `category` - Product categories (unique slug)
//! - `product` - Products with price, stock and an optional category
//! - `user` - Site accounts with argon2 password hashes
//!
//! Sessions live in `tower_sessions.session`, created by the session store.
//!
//! # Migrations
//!
//! Migrations are stored in `crates/storefront/migrations/` and run via:
//! ```bash
//! cargo run -p tshop-cli -- migrate
//! ```
//!
//! Handlers reach the database through the [`CatalogStore`] and [`UserStore`]
//! traits so tests can swap in the in-memory stores from [`memory`].

pub mod catalog;
#[cfg(any(test, feature = "test-support"))]
pub mod memory;
pub mod users;

use std::time::Duration;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use tshop_core::{ProductId, Username};

use crate::listing::ProductFilter;
use crate::models::{Category, Product, User};

pub use catalog::PgCatalog;
pub use users::PgUserStore;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique username).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// Read access to categories and products.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// All categories, ordered by name.
    async fn list_categories(&self) -> Result<Vec<Category>, RepositoryError>;

    /// Number of products matching the filter.
    async fn count_products(&self, filter: &ProductFilter) -> Result<u64, RepositoryError>;

    /// One window of matching products in ascending id order.
    async fn list_products(
        &self,
        filter: &ProductFilter,
        offset: u64,
        limit: u32,
    ) -> Result<Vec<Product>, RepositoryError>;

    /// A single product with its category.
    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, RepositoryError>;

    /// Every product among `ids` that still exists, in ascending id order.
    async fn get_products(&self, ids: &[ProductId]) -> Result<Vec<Product>, RepositoryError>;

    /// Cheap connectivity check for readiness probes.
    async fn ping(&self) -> Result<(), RepositoryError>;
}

/// Storage for accounts and their password hashes.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Create a user with an already-hashed password.
    ///
    /// Returns `RepositoryError::Conflict` if the username is taken.
    async fn create_with_password(
        &self,
        username: &Username,
        password_hash: &str,
    ) -> Result<User, RepositoryError>;

    /// Look up a user together with their password hash.
    async fn get_password_hash(
        &self,
        username: &Username,
    ) -> Result<Option<(User, String)>, RepositoryError>;
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Map a unique-constraint violation to `RepositoryError::Conflict`.
pub(crate) fn conflict_on_unique(e: sqlx::Error, what: &str) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = e
        && db_err.is_unique_violation()
    {
        return RepositoryError::Conflict(format!("{what} already exists"));
    }
    RepositoryError::Database(e)
}
