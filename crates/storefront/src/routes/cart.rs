//! Cart route handlers.
//!
//! The cart lives in the session. Every mutation requires a logged-in user,
//! writes the whole cart back, and redirects to the cart page.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, State},
    response::{IntoResponse, Redirect},
};
use tower_sessions::Session;
use tracing::instrument;

use tshop_core::ProductId;

use super::products::ProductView;
use super::{PageContext, format_price};
use crate::cart::{self, CartAction, CartSummary, LineItem};
use crate::error::{AppError, Result, add_breadcrumb};
use crate::filters;
use crate::middleware::RequireAuth;
use crate::state::AppState;

/// Where every cart mutation lands.
const CART_PATH: &str = "/cart/";

/// Cart line display data for templates.
#[derive(Clone)]
pub struct CartLineView {
    pub product: ProductView,
    pub quantity: u32,
    pub line_total: String,
}

impl From<&LineItem> for CartLineView {
    fn from(item: &LineItem) -> Self {
        Self {
            product: ProductView::from(&item.product),
            quantity: item.quantity,
            line_total: format_price(item.line_total),
        }
    }
}

/// Cart display data for templates.
#[derive(Clone)]
pub struct CartView {
    pub items: Vec<CartLineView>,
    pub total: String,
    pub unit_count: u64,
}

impl From<&CartSummary> for CartView {
    fn from(summary: &CartSummary) -> Self {
        Self {
            items: summary.items.iter().map(CartLineView::from).collect(),
            total: format_price(summary.total),
            unit_count: summary.unit_count,
        }
    }
}

/// Cart page template.
#[derive(Template, WebTemplate)]
#[template(path = "cart/show.html")]
pub struct CartShowTemplate {
    pub page: PageContext,
    pub cart: CartView,
}

/// Display the cart page.
#[instrument(skip(state, user, session))]
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    session: Session,
) -> Result<impl IntoResponse> {
    let cart = cart::load(&session).await;
    let summary = cart::summarize(&cart, state.catalog()).await?;

    Ok(CartShowTemplate {
        page: PageContext::new(&state, Some(&user)),
        cart: CartView::from(&summary),
    })
}

/// Add one unit of a product to the cart.
#[instrument(skip(state, _user, session))]
pub async fn add(
    State(state): State<AppState>,
    RequireAuth(_user): RequireAuth,
    session: Session,
    Path(product_id): Path<String>,
) -> Result<Redirect> {
    let not_found = || AppError::NotFound(format!("product {product_id}"));

    let id: ProductId = product_id.parse().map_err(|_| not_found())?;
    let product = state
        .catalog()
        .get_product(id)
        .await?
        .ok_or_else(not_found)?;

    let mut cart = cart::load(&session).await;
    cart.add_one(product.id);
    cart::save(&session, &cart).await?;

    let id = product.id.to_string();
    add_breadcrumb("cart", "Added product to cart", Some(&[("product_id", id.as_str())]));
    tracing::debug!(product_id = %product.id, quantity = cart.quantity(product.id), "Cart add");

    Ok(Redirect::to(CART_PATH))
}

/// Bulk update the cart.
///
/// `action=update` replaces the cart with the posted `quantity_<id>` fields;
/// `action=remove_<id>` drops one line. Anything else leaves the cart alone.
#[instrument(skip(_user, session, fields))]
pub async fn update(
    RequireAuth(_user): RequireAuth,
    session: Session,
    Form(fields): Form<Vec<(String, String)>>,
) -> Result<Redirect> {
    let action = CartAction::parse(&fields);

    let mut cart = cart::load(&session).await;
    cart.apply(action);
    cart::save(&session, &cart).await?;

    add_breadcrumb("cart", "Updated cart", None);
    tracing::debug!(lines = cart.len(), "Cart update");

    Ok(Redirect::to(CART_PATH))
}
