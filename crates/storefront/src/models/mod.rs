//! Domain models for storefront.
//!
//! These types represent validated domain objects separate from database row types.

pub mod catalog;
pub mod session;
pub mod user;

pub use catalog::{Category, Product};
pub use session::{CurrentUser, keys as session_keys};
pub use user::User;
