//! In-memory stores for tests.
//!
//! Behave like the `PostgreSQL` stores for everything the storefront reads,
//! including id ordering and unique usernames.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use tshop_core::{CategoryId, Price, ProductId, Slug, UserId, Username};

use super::{CatalogStore, RepositoryError, UserStore};
use crate::listing::ProductFilter;
use crate::models::{Category, Product, User};

/// Catalog kept in ordered maps.
#[derive(Default)]
pub struct MemoryCatalog {
    categories: RwLock<BTreeMap<CategoryId, Category>>,
    products: RwLock<BTreeMap<ProductId, Product>>,
}

impl MemoryCatalog {
    /// Add a category, deriving its slug from the name.
    ///
    /// # Panics
    ///
    /// Panics if the name has no ASCII letters or digits to build a slug from.
    pub async fn add_category(&self, name: &str) -> Category {
        let mut categories = self.categories.write().await;
        let id = next_id(categories.keys().map(CategoryId::as_i32));
        #[allow(clippy::expect_used)]
        let slug = Slug::from_name(name).expect("category name must produce a slug");

        let category = Category {
            id: CategoryId::new(id),
            name: name.to_string(),
            slug,
        };
        categories.insert(category.id, category.clone());
        category
    }

    /// Add a product with stock 10.
    ///
    /// # Panics
    ///
    /// Panics if `price` is not a valid price or the category is unknown.
    pub async fn add_product(
        &self,
        name: &str,
        price: &str,
        category: Option<CategoryId>,
    ) -> Product {
        #[allow(clippy::expect_used)]
        let price: Price = price.parse().expect("test price must parse");
        let category = match category {
            #[allow(clippy::expect_used)]
            Some(id) => Some(
                self.categories
                    .read()
                    .await
                    .get(&id)
                    .cloned()
                    .expect("category must exist"),
            ),
            None => None,
        };

        let mut products = self.products.write().await;
        let id = next_id(products.keys().map(ProductId::as_i32));
        let product = Product {
            id: ProductId::new(id),
            name: name.to_string(),
            description: format!("{name} for wood and metal"),
            price,
            stock: 10,
            category,
        };
        products.insert(product.id, product.clone());
        product
    }

    /// Delete a product, leaving any carts that reference it stale.
    pub async fn remove_product(&self, id: ProductId) {
        self.products.write().await.remove(&id);
    }

    async fn matching(&self, filter: &ProductFilter) -> Vec<Product> {
        self.products
            .read()
            .await
            .values()
            .filter(|p| filter.matches(p))
            .cloned()
            .collect()
    }
}

#[async_trait]
impl CatalogStore for MemoryCatalog {
    async fn list_categories(&self) -> Result<Vec<Category>, RepositoryError> {
        let mut categories: Vec<Category> =
            self.categories.read().await.values().cloned().collect();
        categories.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(categories)
    }

    async fn count_products(&self, filter: &ProductFilter) -> Result<u64, RepositoryError> {
        Ok(self.matching(filter).await.len() as u64)
    }

    async fn list_products(
        &self,
        filter: &ProductFilter,
        offset: u64,
        limit: u32,
    ) -> Result<Vec<Product>, RepositoryError> {
        let offset = usize::try_from(offset).unwrap_or(usize::MAX);
        let limit = usize::try_from(limit).unwrap_or(usize::MAX);
        Ok(self
            .matching(filter)
            .await
            .into_iter()
            .skip(offset)
            .take(limit)
            .collect())
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        Ok(self.products.read().await.get(&id).cloned())
    }

    async fn get_products(&self, ids: &[ProductId]) -> Result<Vec<Product>, RepositoryError> {
        let products = self.products.read().await;
        let mut found: Vec<Product> = ids.iter().filter_map(|id| products.get(id).cloned()).collect();
        found.sort_by_key(|p| p.id);
        found.dedup_by_key(|p| p.id);
        Ok(found)
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        Ok(())
    }
}

/// Accounts keyed by username.
#[derive(Default)]
pub struct MemoryUsers {
    users: RwLock<BTreeMap<String, (User, String)>>,
}

impl MemoryUsers {
    /// Number of registered users.
    pub async fn len(&self) -> usize {
        self.users.read().await.len()
    }

    /// Whether no users are registered.
    pub async fn is_empty(&self) -> bool {
        self.users.read().await.is_empty()
    }
}

#[async_trait]
impl UserStore for MemoryUsers {
    async fn create_with_password(
        &self,
        username: &Username,
        password_hash: &str,
    ) -> Result<User, RepositoryError> {
        let mut users = self.users.write().await;
        if users.contains_key(username.as_str()) {
            return Err(RepositoryError::Conflict(
                "username already exists".to_owned(),
            ));
        }

        let id = next_id(users.values().map(|(u, _)| u.id.as_i32()));
        let user = User {
            id: UserId::new(id),
            username: username.clone(),
            created_at: Utc::now(),
        };
        users.insert(
            username.as_str().to_owned(),
            (user.clone(), password_hash.to_owned()),
        );
        Ok(user)
    }

    async fn get_password_hash(
        &self,
        username: &Username,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        Ok(self.users.read().await.get(username.as_str()).cloned())
    }
}

fn next_id(existing: impl Iterator<Item = i32>) -> i32 {
    existing.max().unwrap_or(0) + 1
}
