//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::StorefrontConfig;
use crate::db::{CatalogStore, PgCatalog, PgUserStore, UserStore};

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like the catalog, the user store and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    catalog: Arc<dyn CatalogStore>,
    users: Arc<dyn UserStore>,
}

impl AppState {
    /// Create a new application state from explicit stores.
    #[must_use]
    pub fn new(
        config: StorefrontConfig,
        catalog: Arc<dyn CatalogStore>,
        users: Arc<dyn UserStore>,
    ) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                config,
                catalog,
                users,
            }),
        }
    }

    /// Create application state backed by `PostgreSQL`.
    #[must_use]
    pub fn postgres(config: StorefrontConfig, pool: &PgPool) -> Self {
        Self::new(
            config,
            Arc::new(PgCatalog::new(pool.clone())),
            Arc::new(PgUserStore::new(pool.clone())),
        )
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get the catalog store.
    #[must_use]
    pub fn catalog(&self) -> &dyn CatalogStore {
        self.inner.catalog.as_ref()
    }

    /// Get the user store.
    #[must_use]
    pub fn users(&self) -> &dyn UserStore {
        self.inner.users.as_ref()
    }
}
