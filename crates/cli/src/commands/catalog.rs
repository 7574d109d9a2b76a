//! Category and product commands.

use tshop_core::{Price, Slug};
use tshop_storefront::db::PgCatalog;
use tshop_storefront::db::catalog::NewProduct;

use super::{CommandError, connect};

/// Create a category. The slug is derived from the name when not given.
///
/// # Errors
///
/// Returns an error if the slug is invalid or already taken.
pub async fn add_category(name: &str, slug: Option<&str>) -> Result<(), CommandError> {
    let slug = match slug {
        Some(s) => Slug::parse(s)?,
        None => Slug::from_name(name)?,
    };

    let catalog = PgCatalog::new(connect().await?);
    let category = catalog.create_category(name, &slug).await?;

    tracing::info!(id = %category.id, slug = %category.slug, "Category created");
    Ok(())
}

/// Create a product, optionally in the category with the given slug.
///
/// # Errors
///
/// Returns an error if the price is invalid, the category does not exist, or
/// the insert fails.
pub async fn add_product(
    name: &str,
    price: &str,
    description: &str,
    stock: u32,
    category: Option<&str>,
) -> Result<(), CommandError> {
    let price: Price = price.parse()?;

    let catalog = PgCatalog::new(connect().await?);

    let category = match category {
        Some(s) => {
            let slug = Slug::parse(s)?;
            let found = catalog
                .category_by_slug(&slug)
                .await?
                .ok_or_else(|| CommandError::UnknownCategory(s.to_owned()))?;
            Some(found.id)
        }
        None => None,
    };

    let product = catalog
        .create_product(&NewProduct {
            name: name.to_owned(),
            description: description.to_owned(),
            price,
            stock,
            category,
        })
        .await?;

    tracing::info!(id = %product.id, price = %product.price, "Product created");
    Ok(())
}
