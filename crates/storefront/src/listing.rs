//! Product listing: parameter parsing, filtering and pagination.
//!
//! Every parser here is total. Untrusted query parameters are coerced to a
//! safe default instead of producing an error, so the listing page always
//! renders.

use tshop_core::CategoryId;

use crate::db::{CatalogStore, RepositoryError};
use crate::models::{Category, Product};

/// Longest free-text query accepted, in characters.
pub const MAX_QUERY_LENGTH: usize = 200;

/// Products per page when not configured.
pub const DEFAULT_PAGE_SIZE: u32 = 8;

/// Upper bound for the page size.
pub const MAX_PAGE_SIZE: u32 = 100;

// =============================================================================
// Parameter Parsing
// =============================================================================

/// Raw listing parameters as they arrive in the query string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListingParams {
    pub q: Option<String>,
    pub category: Option<String>,
    pub page: Option<String>,
}

impl ListingParams {
    /// Collect the known keys from decoded query pairs.
    ///
    /// When a key repeats, the last value wins. Unknown keys are ignored.
    #[must_use]
    pub fn from_pairs(pairs: &[(String, String)]) -> Self {
        let mut params = Self::default();
        for (key, value) in pairs {
            let slot = match key.as_str() {
                "q" => &mut params.q,
                "category" => &mut params.category,
                "page" => &mut params.page,
                _ => continue,
            };
            *slot = Some(value.clone());
        }
        params
    }
}

/// Drop control characters, trim, and cap at [`MAX_QUERY_LENGTH`] characters.
///
/// Postgres text can't hold NUL, so control characters never reach the store.
/// Returns an empty string when there is nothing to search for.
#[must_use]
pub fn sanitize_query(raw: Option<&str>) -> String {
    let printable: String = raw
        .unwrap_or_default()
        .chars()
        .filter(|c| !c.is_control())
        .collect();

    printable.trim().chars().take(MAX_QUERY_LENGTH).collect()
}

/// Parse a category id.
///
/// Unparseable values (including ids outside the `i32` range) and `0` mean
/// "all". Negative ids are kept and simply match nothing.
#[must_use]
pub fn parse_category(raw: Option<&str>) -> Option<CategoryId> {
    raw?.trim()
        .parse::<i32>()
        .ok()
        .filter(|id| *id != 0)
        .map(CategoryId::new)
}

/// Parse a 1-based page number.
///
/// Non-numeric and non-positive values mean page 1. A positive number too
/// large for `u64` saturates, so it resolves to the last page.
#[must_use]
pub fn parse_page(raw: Option<&str>) -> u64 {
    let Some(raw) = raw.map(str::trim) else {
        return 1;
    };
    let digits = raw.strip_prefix('+').unwrap_or(raw);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return 1;
    }

    digits.parse::<u64>().unwrap_or(u64::MAX).max(1)
}

/// Clamp a configured page size into `1..=MAX_PAGE_SIZE`.
#[must_use]
pub fn clamp_page_size(requested: i64) -> u32 {
    let clamped = requested.clamp(1, i64::from(MAX_PAGE_SIZE));
    u32::try_from(clamped).unwrap_or(DEFAULT_PAGE_SIZE)
}

// =============================================================================
// Filtering
// =============================================================================

/// Conjunction of an optional category match and an optional text match.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductFilter {
    /// Exact category match.
    pub category: Option<CategoryId>,
    /// Case-insensitive substring of the name or description.
    pub text: Option<String>,
}

impl ProductFilter {
    /// Build a filter; an empty text means no text filter.
    #[must_use]
    pub fn new(category: Option<CategoryId>, text: &str) -> Self {
        Self {
            category,
            text: (!text.is_empty()).then(|| text.to_string()),
        }
    }

    /// Whether a product passes the filter.
    #[must_use]
    pub fn matches(&self, product: &Product) -> bool {
        let category_ok = self
            .category
            .is_none_or(|id| product.category.as_ref().is_some_and(|c| c.id == id));

        let text_ok = self.text.as_deref().is_none_or(|text| {
            let needle = text.to_lowercase();
            product.name.to_lowercase().contains(&needle)
                || product.description.to_lowercase().contains(&needle)
        });

        category_ok && text_ok
    }

    /// The text filter as an `ILIKE` pattern with wildcards escaped.
    #[must_use]
    pub fn like_pattern(&self) -> Option<String> {
        self.text.as_deref().map(|text| {
            let mut pattern = String::with_capacity(text.len() + 2);
            pattern.push('%');
            for c in text.chars() {
                if matches!(c, '%' | '_' | '\\') {
                    pattern.push('\\');
                }
                pattern.push(c);
            }
            pattern.push('%');
            pattern
        })
    }
}

// =============================================================================
// Pagination
// =============================================================================

/// A fully parsed listing request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingQuery {
    pub filter: ProductFilter,
    /// Sanitized free text, echoed back into the search form.
    pub query: String,
    /// Requested page before clamping to the last page.
    pub page: u64,
    pub per_page: u32,
}

impl ListingQuery {
    /// Parse raw parameters with the configured page size.
    #[must_use]
    pub fn from_params(params: &ListingParams, per_page: u32) -> Self {
        let query = sanitize_query(params.q.as_deref());
        let category = parse_category(params.category.as_deref());

        Self {
            filter: ProductFilter::new(category, &query),
            query,
            page: parse_page(params.page.as_deref()),
            per_page: clamp_page_size(i64::from(per_page)),
        }
    }
}

/// Pagination metadata for one resolved page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageInfo {
    /// Current 1-based page number.
    pub number: u64,
    /// Total number of pages, at least 1.
    pub total_pages: u64,
    /// Number of matching products.
    pub total_count: u64,
    pub per_page: u32,
}

impl PageInfo {
    /// Resolve a requested page against the result count.
    ///
    /// Pages past the end clamp to the last page; an empty result still has
    /// one empty page.
    #[must_use]
    pub fn resolve(requested: u64, total_count: u64, per_page: u32) -> Self {
        let per_page = per_page.max(1);
        let total_pages = total_count.div_ceil(u64::from(per_page)).max(1);

        Self {
            number: requested.clamp(1, total_pages),
            total_pages,
            total_count,
            per_page,
        }
    }

    /// Number of products before this page.
    #[must_use]
    pub fn offset(&self) -> u64 {
        (self.number - 1) * u64::from(self.per_page)
    }

    #[must_use]
    pub const fn has_previous(&self) -> bool {
        self.number > 1
    }

    #[must_use]
    pub const fn has_next(&self) -> bool {
        self.number < self.total_pages
    }
}

/// One rendered page of the product listing.
#[derive(Debug, Clone)]
pub struct Listing {
    pub products: Vec<Product>,
    pub page: PageInfo,
    /// All categories, for the filter dropdown.
    pub categories: Vec<Category>,
    pub selected_category: Option<CategoryId>,
    pub query: String,
}

/// Run a listing query against the catalog.
///
/// # Errors
///
/// Returns `RepositoryError` if the catalog cannot be read.
pub async fn run(catalog: &dyn CatalogStore, query: ListingQuery) -> Result<Listing, RepositoryError> {
    let total_count = catalog.count_products(&query.filter).await?;
    let page = PageInfo::resolve(query.page, total_count, query.per_page);

    let products = catalog
        .list_products(&query.filter, page.offset(), page.per_page)
        .await?;
    let categories = catalog.list_categories().await?;

    Ok(Listing {
        products,
        page,
        categories,
        selected_category: query.filter.category,
        query: query.query,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use tshop_core::{Price, ProductId, Slug};

    use super::*;
    use crate::db::memory::MemoryCatalog;

    fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
        items
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn test_params_last_value_wins() {
        let params = ListingParams::from_pairs(&pairs(&[
            ("page", "2"),
            ("utm_source", "mail"),
            ("page", "3"),
        ]));
        assert_eq!(params.page.as_deref(), Some("3"));
        assert!(params.q.is_none());
    }

    #[test]
    fn test_sanitize_query() {
        assert_eq!(sanitize_query(None), "");
        assert_eq!(sanitize_query(Some("   ")), "");
        assert_eq!(sanitize_query(Some("  gloss  ")), "gloss");

        let long = "ж".repeat(500);
        assert_eq!(sanitize_query(Some(&long)).chars().count(), MAX_QUERY_LENGTH);
    }

    #[test]
    fn test_sanitize_query_strips_control_characters() {
        assert_eq!(sanitize_query(Some("\0")), "");
        assert_eq!(sanitize_query(Some("gl\0oss\t\n")), "gloss");
        assert_eq!(sanitize_query(Some("\u{1b} matte \u{7f}")), "matte");
        assert_eq!(ProductFilter::new(None, &sanitize_query(Some("\0"))).like_pattern(), None);
    }

    #[test]
    fn test_parse_category() {
        assert_eq!(parse_category(Some("3")), Some(CategoryId::new(3)));
        assert_eq!(parse_category(Some(" 3 ")), Some(CategoryId::new(3)));
        assert_eq!(parse_category(Some("0")), None);
        assert_eq!(parse_category(Some("-4")), Some(CategoryId::new(-4)));
        assert_eq!(parse_category(Some("4294967296")), None);
        assert_eq!(parse_category(Some("paint")), None);
        assert_eq!(parse_category(Some("")), None);
        assert_eq!(parse_category(None), None);
    }

    #[test]
    fn test_parse_page() {
        assert_eq!(parse_page(Some("4")), 4);
        assert_eq!(parse_page(Some("0")), 1);
        assert_eq!(parse_page(Some("-2")), 1);
        assert_eq!(parse_page(Some("abc")), 1);
        assert_eq!(parse_page(Some("+3")), 3);
        assert_eq!(parse_page(Some("1.5")), 1);
        assert_eq!(parse_page(Some("99999999999999999999999")), u64::MAX);
        assert_eq!(
            PageInfo::resolve(parse_page(Some("99999999999999999999999")), 10, 8).number,
            2
        );
        assert_eq!(parse_page(None), 1);
    }

    #[test]
    fn test_clamp_page_size() {
        assert_eq!(clamp_page_size(0), 1);
        assert_eq!(clamp_page_size(-10), 1);
        assert_eq!(clamp_page_size(8), 8);
        assert_eq!(clamp_page_size(101), 100);
        assert_eq!(clamp_page_size(i64::MAX), 100);
    }

    #[test]
    fn test_page_resolution() {
        let page = PageInfo::resolve(1, 0, 8);
        assert_eq!(page.total_pages, 1);
        assert_eq!(page.number, 1);
        assert!(!page.has_previous());
        assert!(!page.has_next());

        let page = PageInfo::resolve(50, 17, 8);
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.number, 3);
        assert_eq!(page.offset(), 16);
        assert!(page.has_previous());
        assert!(!page.has_next());

        let page = PageInfo::resolve(2, 16, 8);
        assert_eq!(page.total_pages, 2);
        assert_eq!(page.offset(), 8);
    }

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        let filter = ProductFilter::new(None, r"50%_off\");
        assert_eq!(filter.like_pattern().as_deref(), Some(r"%50\%\_off\\%"));
        assert_eq!(ProductFilter::new(None, "").like_pattern(), None);
    }

    fn product(id: i32, name: &str, description: &str, category: Option<&Category>) -> Product {
        Product {
            id: ProductId::new(id),
            name: name.to_string(),
            description: description.to_string(),
            price: "1.00".parse::<Price>().unwrap(),
            stock: 1,
            category: category.cloned(),
        }
    }

    #[test]
    fn test_filter_matches() {
        let lacquers = Category {
            id: CategoryId::new(1),
            name: "Lacquers".to_string(),
            slug: Slug::parse("lacquers").unwrap(),
        };
        let gloss = product(1, "Gloss Lacquer", "High shine", Some(&lacquers));
        let primer = product(2, "Primer", "Matte base for GLOSS coats", None);

        let text = ProductFilter::new(None, "gloss");
        assert!(text.matches(&gloss));
        assert!(text.matches(&primer));

        let both = ProductFilter::new(Some(lacquers.id), "gloss");
        assert!(both.matches(&gloss));
        assert!(!both.matches(&primer));

        assert!(ProductFilter::default().matches(&primer));
    }

    #[tokio::test]
    async fn test_run_clamps_and_filters() {
        let catalog = MemoryCatalog::default();
        let paints = catalog.add_category("Paints").await;
        for i in 0..10 {
            catalog
                .add_product(&format!("Paint {i}"), "10.00", Some(paints.id))
                .await;
        }
        catalog.add_product("Thinner", "3.00", None).await;

        let params = ListingParams {
            category: Some(paints.id.to_string()),
            page: Some("9".to_string()),
            ..ListingParams::default()
        };
        let listing = run(&catalog, ListingQuery::from_params(&params, 8))
            .await
            .unwrap();

        assert_eq!(listing.page.total_count, 10);
        assert_eq!(listing.page.number, 2);
        assert_eq!(listing.products.len(), 2);
        assert_eq!(listing.selected_category, Some(paints.id));
        assert_eq!(listing.categories.len(), 1);

        let params = ListingParams {
            q: Some("  thin ".to_string()),
            category: Some("garbage".to_string()),
            ..ListingParams::default()
        };
        let listing = run(&catalog, ListingQuery::from_params(&params, 8))
            .await
            .unwrap();
        assert_eq!(listing.query, "thin");
        assert_eq!(listing.products.len(), 1);
        assert_eq!(listing.selected_category, None);
    }

    #[tokio::test]
    async fn test_negative_category_matches_nothing() {
        let catalog = MemoryCatalog::default();
        catalog.add_product("Thinner", "3.00", None).await;

        let params = ListingParams {
            category: Some("-4".to_string()),
            ..ListingParams::default()
        };
        let listing = run(&catalog, ListingQuery::from_params(&params, 8))
            .await
            .unwrap();
        assert_eq!(listing.page.total_count, 0);
        assert!(listing.products.is_empty());
        assert_eq!(listing.page.number, 1);
    }
}
