//! Business logic services for storefront.
//!
//! # Services
//!
//! - `auth` - User registration and password login

pub mod auth;
