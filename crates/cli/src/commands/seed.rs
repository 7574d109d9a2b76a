//! Seed the catalog from a YAML file.
//!
//! The whole file is parsed and validated before the database is touched.
//! Categories are upserted by slug, so re-running a seed renames rather than
//! duplicates them; products are always inserted.
//!
//! ```yaml
//! categories:
//!   - name: Wood Lacquers
//!     slug: wood-lacquers        # optional
//!     products:
//!       - name: Clear Satin
//!         price: "14.50"
//!         stock: 12              # optional, default 0
//!         description: Water based  # optional
//! ```

use std::collections::HashSet;
use std::path::Path;

use serde::Deserialize;
use tracing::{error, info};

use tshop_core::{CategoryId, Price, Slug};
use tshop_storefront::db::PgCatalog;
use tshop_storefront::db::catalog::NewProduct;

use super::{CommandError, connect};

/// Top-level seed file.
#[derive(Debug, Deserialize)]
pub struct SeedFile {
    #[serde(default)]
    pub categories: Vec<SeedCategory>,
    /// Products without a category.
    #[serde(default)]
    pub products: Vec<SeedProduct>,
}

#[derive(Debug, Deserialize)]
pub struct SeedCategory {
    pub name: String,
    pub slug: Option<String>,
    #[serde(default)]
    pub products: Vec<SeedProduct>,
}

#[derive(Debug, Deserialize)]
pub struct SeedProduct {
    pub name: String,
    pub price: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub stock: u32,
}

impl SeedCategory {
    fn slug(&self) -> Result<Slug, CommandError> {
        Ok(match &self.slug {
            Some(s) => Slug::parse(s)?,
            None => Slug::from_name(&self.name)?,
        })
    }
}

impl SeedProduct {
    fn to_new_product(&self, category: Option<CategoryId>) -> Result<NewProduct, CommandError> {
        Ok(NewProduct {
            name: self.name.clone(),
            description: self.description.clone(),
            price: self.price.parse::<Price>()?,
            stock: self.stock,
            category,
        })
    }
}

/// Counts from a seeding run.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct SeedResult {
    pub categories: usize,
    pub products: usize,
}

fn check_product(product: &SeedProduct, errors: &mut Vec<String>) {
    if product.name.trim().is_empty() {
        errors.push("product with an empty name".to_owned());
    }
    if let Err(e) = product.price.parse::<Price>() {
        errors.push(format!("product {:?}: {e}", product.name));
    }
}

/// Check a seed file, returning one message per problem.
#[must_use]
pub fn validate(seed: &SeedFile) -> Vec<String> {
    let mut errors = Vec::new();
    let mut slugs = HashSet::new();

    for category in &seed.categories {
        if category.name.trim().is_empty() {
            errors.push("category with an empty name".to_owned());
        }
        match category.slug() {
            Ok(slug) => {
                if !slugs.insert(slug.clone()) {
                    errors.push(format!("duplicate category slug {slug:?}"));
                }
            }
            Err(e) => errors.push(format!("category {:?}: {e}", category.name)),
        }
        for product in &category.products {
            check_product(product, &mut errors);
        }
    }

    for product in &seed.products {
        check_product(product, &mut errors);
    }

    errors
}

/// Insert a validated seed file.
///
/// # Errors
///
/// Returns an error on the first failed insert.
pub async fn apply(catalog: &PgCatalog, seed: &SeedFile) -> Result<SeedResult, CommandError> {
    let mut result = SeedResult::default();

    for entry in &seed.categories {
        let category = catalog.upsert_category(&entry.name, &entry.slug()?).await?;
        result.categories += 1;

        for product in &entry.products {
            catalog
                .create_product(&product.to_new_product(Some(category.id))?)
                .await?;
            result.products += 1;
        }
    }

    for product in &seed.products {
        catalog.create_product(&product.to_new_product(None)?).await?;
        result.products += 1;
    }

    Ok(result)
}

/// Seed the catalog from a YAML file.
///
/// # Arguments
///
/// * `file_path` - Path to the YAML catalog file
/// * `clear_existing` - If true, delete all products and categories first
///
/// # Errors
///
/// Returns an error if the file cannot be read or fails validation, or a
/// database operation fails.
pub async fn run(file_path: &str, clear_existing: bool) -> Result<(), CommandError> {
    let path = Path::new(file_path);
    info!(path = %file_path, "Loading catalog from file");

    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| CommandError::Io {
            path: file_path.to_owned(),
            source,
        })?;
    let seed: SeedFile = serde_yaml::from_str(&content)?;

    let errors = validate(&seed);
    if !errors.is_empty() {
        error!("Seed file validation failed:");
        for err in &errors {
            error!("  - {err}");
        }
        return Err(CommandError::Validation(errors));
    }

    let catalog = PgCatalog::new(connect().await?);

    if clear_existing {
        info!("Clearing existing catalog");
        catalog.clear().await?;
    }

    let result = apply(&catalog, &seed).await?;

    info!("Seeding complete!");
    info!("  Categories: {}", result.categories);
    info!("  Products: {}", result.products);

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
categories:
  - name: Wood Lacquers
    products:
      - name: Clear Satin
        price: "14.50"
        stock: 12
  - name: Metal Paints
    slug: metal
    products:
      - name: Hammered Black
        price: "9.99"
products:
  - name: Brush Cleaner
    price: "3.00"
"#;

    #[test]
    fn test_parse_sample() {
        let seed: SeedFile = serde_yaml::from_str(SAMPLE).unwrap();
        assert_eq!(seed.categories.len(), 2);
        assert_eq!(seed.categories[0].slug().unwrap().as_str(), "wood-lacquers");
        assert_eq!(seed.categories[1].slug().unwrap().as_str(), "metal");
        assert_eq!(seed.categories[0].products[0].stock, 12);
        assert_eq!(seed.categories[1].products[0].stock, 0);
        assert_eq!(seed.products.len(), 1);
        assert!(validate(&seed).is_empty());
    }

    #[test]
    fn test_validate_reports_every_problem() {
        let seed: SeedFile = serde_yaml::from_str(
            r#"
categories:
  - name: Primers
    products:
      - name: Grey
        price: "-1"
  - name: primers
products:
  - name: ""
    price: "abc"
"#,
        )
        .unwrap();

        let errors = validate(&seed);
        assert_eq!(errors.len(), 4, "{errors:?}");
        assert!(errors.iter().any(|e| e.contains("duplicate category slug")));
    }

    #[test]
    fn test_product_conversion() {
        let product = SeedProduct {
            name: "Clear Satin".into(),
            price: "14.5".into(),
            description: String::new(),
            stock: 3,
        };
        let new = product.to_new_product(None).unwrap();
        assert_eq!(new.price.to_string(), "14.50");
        assert!(new.category.is_none());
    }
}
