//! Catalog domain types.

use serde::Serialize;

use tshop_core::{CategoryId, Price, ProductId, Slug};

/// A product category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Category {
    /// Unique category ID.
    pub id: CategoryId,
    /// Display name.
    pub name: String,
    /// URL-safe unique identifier.
    pub slug: Slug,
}

/// A product for sale.
///
/// Read-only from the storefront's perspective; created through the CLI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Product {
    /// Unique product ID.
    pub id: ProductId,
    /// Display name.
    pub name: String,
    /// Free-form description.
    pub description: String,
    /// Unit price.
    pub price: Price,
    /// Units on hand.
    pub stock: u32,
    /// Category, if the product has one.
    pub category: Option<Category>,
}

impl Product {
    /// Whether any units are on hand.
    #[must_use]
    pub const fn in_stock(&self) -> bool {
        self.stock > 0
    }
}
