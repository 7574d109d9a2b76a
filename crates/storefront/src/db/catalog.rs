//! Catalog repository for database operations.
//!
//! Categories change rarely and are read on every listing page, so they are
//! cached for one minute with `moka`. Products are always read through.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use moka::future::Cache;
use rust_decimal::Decimal;
use sqlx::PgPool;
use tracing::debug;

use tshop_core::{CategoryId, Price, ProductId, Slug};

use super::{CatalogStore, RepositoryError, conflict_on_unique};
use crate::listing::ProductFilter;
use crate::models::{Category, Product};

const PRODUCT_COLUMNS: &str = r"
    SELECT p.id, p.name, p.description, p.price, p.stock,
           c.id AS category_id, c.name AS category_name, c.slug AS category_slug
    FROM storefront.product p
    LEFT JOIN storefront.category c ON c.id = p.category_id";

const FILTER_CLAUSE: &str = r"
    WHERE ($1::int4 IS NULL OR p.category_id = $1)
      AND ($2::text IS NULL OR p.name ILIKE $2 OR p.description ILIKE $2)";

#[derive(sqlx::FromRow)]
struct CategoryRow {
    id: i32,
    name: String,
    slug: String,
}

impl TryFrom<CategoryRow> for Category {
    type Error = RepositoryError;

    fn try_from(row: CategoryRow) -> Result<Self, Self::Error> {
        let slug = Slug::parse(&row.slug).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid slug in database: {e}"))
        })?;

        Ok(Self {
            id: CategoryId::new(row.id),
            name: row.name,
            slug,
        })
    }
}

#[derive(sqlx::FromRow)]
struct ProductRow {
    id: i32,
    name: String,
    description: String,
    price: Decimal,
    stock: i32,
    category_id: Option<i32>,
    category_name: Option<String>,
    category_slug: Option<String>,
}

impl TryFrom<ProductRow> for Product {
    type Error = RepositoryError;

    fn try_from(row: ProductRow) -> Result<Self, Self::Error> {
        let price = Price::new(row.price).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid price for product {}: {e}", row.id))
        })?;
        let stock = u32::try_from(row.stock).map_err(|_| {
            RepositoryError::DataCorruption(format!("negative stock for product {}", row.id))
        })?;

        let category = match (row.category_id, row.category_name, row.category_slug) {
            (Some(id), Some(name), Some(slug)) => {
                Some(Category::try_from(CategoryRow { id, name, slug })?)
            }
            _ => None,
        };

        Ok(Self {
            id: ProductId::new(row.id),
            name: row.name,
            description: row.description,
            price,
            stock,
            category,
        })
    }
}

/// Fields for inserting a product.
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub name: String,
    pub description: String,
    pub price: Price,
    pub stock: u32,
    pub category: Option<CategoryId>,
}

/// `PostgreSQL` catalog store.
#[derive(Clone)]
pub struct PgCatalog {
    pool: PgPool,
    categories: Cache<(), Arc<Vec<Category>>>,
}

impl PgCatalog {
    /// Create a new catalog store.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        let categories = Cache::builder()
            .max_capacity(1)
            .time_to_live(Duration::from_secs(60))
            .build();

        Self { pool, categories }
    }

    /// Find a category by slug.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn category_by_slug(&self, slug: &Slug) -> Result<Option<Category>, RepositoryError> {
        let row: Option<CategoryRow> = sqlx::query_as(
            "SELECT id, name, slug FROM storefront.category WHERE slug = $1",
        )
        .bind(slug.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Category::try_from).transpose()
    }

    /// Create a category.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the slug is taken.
    pub async fn create_category(
        &self,
        name: &str,
        slug: &Slug,
    ) -> Result<Category, RepositoryError> {
        let row: CategoryRow = sqlx::query_as(
            r"
            INSERT INTO storefront.category (name, slug)
            VALUES ($1, $2)
            RETURNING id, name, slug
            ",
        )
        .bind(name)
        .bind(slug.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "category slug"))?;

        self.categories.invalidate_all();
        Category::try_from(row)
    }

    /// Create a category, or rename the existing one with the same slug.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn upsert_category(
        &self,
        name: &str,
        slug: &Slug,
    ) -> Result<Category, RepositoryError> {
        let row: CategoryRow = sqlx::query_as(
            r"
            INSERT INTO storefront.category (name, slug)
            VALUES ($1, $2)
            ON CONFLICT (slug) DO UPDATE SET name = EXCLUDED.name
            RETURNING id, name, slug
            ",
        )
        .bind(name)
        .bind(slug.as_str())
        .fetch_one(&self.pool)
        .await?;

        self.categories.invalidate_all();
        Category::try_from(row)
    }

    /// Insert a product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails (for example an
    /// unknown category id).
    pub async fn create_product(&self, product: &NewProduct) -> Result<Product, RepositoryError> {
        let stock = i32::try_from(product.stock)
            .map_err(|_| RepositoryError::Conflict("stock out of range".to_owned()))?;

        let id: i32 = sqlx::query_scalar(
            r"
            INSERT INTO storefront.product (name, description, price, stock, category_id)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            ",
        )
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price.amount())
        .bind(stock)
        .bind(product.category.map(|c| c.as_i32()))
        .fetch_one(&self.pool)
        .await?;

        self.get_product(ProductId::new(id))
            .await?
            .ok_or(RepositoryError::NotFound)
    }

    /// Delete every product and category.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if either delete fails.
    pub async fn clear(&self) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM storefront.product")
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM storefront.category")
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        self.categories.invalidate_all();
        Ok(())
    }
}

#[async_trait]
impl CatalogStore for PgCatalog {
    async fn list_categories(&self) -> Result<Vec<Category>, RepositoryError> {
        if let Some(cached) = self.categories.get(&()).await {
            debug!("Cache hit for categories");
            return Ok(cached.as_ref().clone());
        }

        let rows: Vec<CategoryRow> =
            sqlx::query_as("SELECT id, name, slug FROM storefront.category ORDER BY name, id")
                .fetch_all(&self.pool)
                .await?;

        let categories = rows
            .into_iter()
            .map(Category::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        self.categories
            .insert((), Arc::new(categories.clone()))
            .await;
        Ok(categories)
    }

    async fn count_products(&self, filter: &ProductFilter) -> Result<u64, RepositoryError> {
        let sql = format!("SELECT COUNT(*) FROM storefront.product p {FILTER_CLAUSE}");
        let count: i64 = sqlx::query_scalar(&sql)
            .bind(filter.category.map(|c| c.as_i32()))
            .bind(filter.like_pattern())
            .fetch_one(&self.pool)
            .await?;

        u64::try_from(count)
            .map_err(|_| RepositoryError::DataCorruption("negative product count".to_owned()))
    }

    async fn list_products(
        &self,
        filter: &ProductFilter,
        offset: u64,
        limit: u32,
    ) -> Result<Vec<Product>, RepositoryError> {
        let sql = format!("{PRODUCT_COLUMNS} {FILTER_CLAUSE} ORDER BY p.id LIMIT $3 OFFSET $4");
        let offset = i64::try_from(offset)
            .map_err(|_| RepositoryError::DataCorruption("offset out of range".to_owned()))?;

        let rows: Vec<ProductRow> = sqlx::query_as(&sql)
            .bind(filter.category.map(|c| c.as_i32()))
            .bind(filter.like_pattern())
            .bind(i64::from(limit))
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(Product::try_from).collect()
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let sql = format!("{PRODUCT_COLUMNS} WHERE p.id = $1");
        let row: Option<ProductRow> = sqlx::query_as(&sql)
            .bind(id.as_i32())
            .fetch_optional(&self.pool)
            .await?;

        row.map(Product::try_from).transpose()
    }

    async fn get_products(&self, ids: &[ProductId]) -> Result<Vec<Product>, RepositoryError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let sql = format!("{PRODUCT_COLUMNS} WHERE p.id = ANY($1) ORDER BY p.id");
        let ids: Vec<i32> = ids.iter().map(ProductId::as_i32).collect();
        let rows: Vec<ProductRow> = sqlx::query_as(&sql)
            .bind(ids)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(Product::try_from).collect()
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
