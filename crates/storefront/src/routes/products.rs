//! Product route handlers.

use std::fmt::Write;

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
};
use tracing::instrument;

use tshop_core::{CategoryId, ProductId};

use super::{PageContext, format_price};
use crate::error::{AppError, Result};
use crate::filters;
use crate::listing::{self, Listing, ListingParams, ListingQuery, PageInfo};
use crate::middleware::OptionalAuth;
use crate::models::{Category, Product};
use crate::state::AppState;

/// Product display data for templates.
#[derive(Clone)]
pub struct ProductView {
    pub id: i32,
    pub url: String,
    pub name: String,
    pub description: String,
    pub price: String,
    pub stock: u32,
    pub in_stock: bool,
    pub category_name: Option<String>,
}

impl From<&Product> for ProductView {
    fn from(product: &Product) -> Self {
        Self {
            id: product.id.as_i32(),
            url: format!("/product/{}/", product.id),
            name: product.name.clone(),
            description: product.description.clone(),
            price: format_price(product.price),
            stock: product.stock,
            in_stock: product.in_stock(),
            category_name: product.category.as_ref().map(|c| c.name.clone()),
        }
    }
}

/// Category filter option.
#[derive(Clone)]
pub struct CategoryOption {
    pub id: i32,
    pub name: String,
    pub selected: bool,
}

impl CategoryOption {
    fn from_category(category: &Category, selected: Option<CategoryId>) -> Self {
        Self {
            id: category.id.as_i32(),
            name: category.name.clone(),
            selected: selected == Some(category.id),
        }
    }
}

/// Pagination links for the listing page.
#[derive(Clone)]
pub struct PaginationView {
    pub number: u64,
    pub total_pages: u64,
    pub total_count: u64,
    pub prev_url: Option<String>,
    pub next_url: Option<String>,
}

impl PaginationView {
    fn new(page: &PageInfo, query: &str, category: Option<CategoryId>) -> Self {
        let url = |number: u64| page_url(query, category, number);
        Self {
            number: page.number,
            total_pages: page.total_pages,
            total_count: page.total_count,
            prev_url: page.has_previous().then(|| url(page.number - 1)),
            next_url: page.has_next().then(|| url(page.number + 1)),
        }
    }
}

/// Listing URL that keeps the current filters.
fn page_url(query: &str, category: Option<CategoryId>, page: u64) -> String {
    let mut url = format!("/?page={page}");
    if !query.is_empty() {
        url.push_str("&q=");
        url.push_str(&urlencoding::encode(query));
    }
    if let Some(category) = category {
        let _ = write!(url, "&category={category}");
    }
    url
}

/// Product listing page template.
#[derive(Template, WebTemplate)]
#[template(path = "products/index.html")]
pub struct ProductsIndexTemplate {
    pub page: PageContext,
    pub products: Vec<ProductView>,
    pub categories: Vec<CategoryOption>,
    pub query: String,
    pub pagination: PaginationView,
}

impl ProductsIndexTemplate {
    fn new(page: PageContext, listing: &Listing) -> Self {
        Self {
            page,
            products: listing.products.iter().map(ProductView::from).collect(),
            categories: listing
                .categories
                .iter()
                .map(|c| CategoryOption::from_category(c, listing.selected_category))
                .collect(),
            query: listing.query.clone(),
            pagination: PaginationView::new(
                &listing.page,
                &listing.query,
                listing.selected_category,
            ),
        }
    }
}

/// Product detail page template.
#[derive(Template, WebTemplate)]
#[template(path = "products/show.html")]
pub struct ProductShowTemplate {
    pub page: PageContext,
    pub product: ProductView,
}

/// Display product listing page.
///
/// Query parameters are read as raw pairs so malformed values never reject
/// the request.
#[instrument(skip(state, user))]
pub async fn index(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<impl IntoResponse> {
    let params = ListingParams::from_pairs(&pairs);
    let query = ListingQuery::from_params(&params, state.config().page_size);

    let listing = listing::run(state.catalog(), query).await?;
    tracing::debug!(
        count = listing.page.total_count,
        page = listing.page.number,
        "Product listing"
    );

    Ok(ProductsIndexTemplate::new(
        PageContext::new(&state, user.as_ref()),
        &listing,
    ))
}

/// Display product detail page.
#[instrument(skip(state, user))]
pub async fn show(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    Path(id): Path<String>,
) -> Result<impl IntoResponse> {
    let not_found = || AppError::NotFound(format!("product {id}"));

    let product_id: ProductId = id.parse().map_err(|_| not_found())?;
    let product = state
        .catalog()
        .get_product(product_id)
        .await?
        .ok_or_else(not_found)?;

    Ok(ProductShowTemplate {
        page: PageContext::new(&state, user.as_ref()),
        product: ProductView::from(&product),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_url_keeps_filters() {
        assert_eq!(page_url("", None, 2), "/?page=2");
        assert_eq!(
            page_url("clear coat", Some(CategoryId::new(4)), 3),
            "/?page=3&q=clear%20coat&category=4"
        );
    }

    #[test]
    fn test_pagination_links() {
        let page = PageInfo::resolve(2, 20, 8);
        let view = PaginationView::new(&page, "", None);
        assert_eq!(view.prev_url.as_deref(), Some("/?page=1"));
        assert_eq!(view.next_url.as_deref(), Some("/?page=3"));

        let page = PageInfo::resolve(1, 3, 8);
        let view = PaginationView::new(&page, "", None);
        assert!(view.prev_url.is_none());
        assert!(view.next_url.is_none());
    }
}
