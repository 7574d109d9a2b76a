//! User domain types.

use chrono::{DateTime, Utc};

use tshop_core::{UserId, Username};

/// A storefront user (domain type).
#[derive(Debug, Clone)]
pub struct User {
    /// Unique user ID.
    pub id: UserId,
    /// Login name.
    pub username: Username,
    /// When the user was created.
    pub created_at: DateTime<Utc>,
}
