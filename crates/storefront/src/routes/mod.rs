//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! # Catalog
//! GET  /                         - Product listing (q, category, page)
//! GET  /product/{id}/            - Product detail
//!
//! # Cart (requires auth)
//! GET  /cart/                    - Cart page
//! POST /cart/add/{product_id}/   - Add one unit
//! POST /cart/update/             - Bulk update or remove a line
//!
//! # Auth
//! GET  /login/                   - Login page
//! POST /login/                   - Login action
//! GET  /signup/                  - Signup page
//! POST /signup/                  - Signup action
//! GET  /logout/                  - Logout
//! POST /logout/                  - Logout
//! ```

pub mod auth;
pub mod cart;
pub mod products;

use axum::{
    Router,
    routing::{get, post},
};
use tshop_core::Price;

use crate::models::CurrentUser;
use crate::state::AppState;

/// Layout data every page needs.
#[derive(Clone)]
pub struct PageContext {
    pub site_name: String,
    /// Logged-in username, if any.
    pub username: Option<String>,
}

impl PageContext {
    #[must_use]
    pub fn new(state: &AppState, user: Option<&CurrentUser>) -> Self {
        Self {
            site_name: state.config().site_name.clone(),
            username: user.map(|u| u.username.to_string()),
        }
    }
}

/// Format a price for display.
fn format_price(price: Price) -> String {
    format!("${price}")
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/cart/", get(cart::show))
        .route("/cart/add/{product_id}/", post(cart::add))
        .route("/cart/update/", post(cart::update))
}

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login/", get(auth::login_page).post(auth::login))
        .route("/signup/", get(auth::signup_page).post(auth::signup))
        .route("/logout/", get(auth::logout).post(auth::logout))
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(products::index))
        .route("/product/{id}/", get(products::show))
        .merge(cart_routes())
        .merge(auth_routes())
}
