//! Session-backed shopping cart.
//!
//! The cart is a map from product id to a positive quantity, stored in the
//! session under [`session_keys::CART`] as a JSON object such as
//! `{"1": 2, "7": 1}`. Pricing never fails on stale entries: products that
//! no longer exist are skipped.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};
use tower_sessions::Session;

use tshop_core::{Price, ProductId};

use crate::db::{CatalogStore, RepositoryError};
use crate::models::{Product, session_keys};

const QUANTITY_PREFIX: &str = "quantity_";
const REMOVE_PREFIX: &str = "remove_";

/// Product quantities in ascending product id order.
///
/// Every stored quantity is at least 1.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Cart(BTreeMap<ProductId, u32>);

impl Cart {
    /// An empty cart.
    #[must_use]
    pub const fn new() -> Self {
        Self(BTreeMap::new())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of distinct products.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Quantity of one product, 0 when absent.
    #[must_use]
    pub fn quantity(&self, id: ProductId) -> u32 {
        self.0.get(&id).copied().unwrap_or(0)
    }

    /// Add one unit, inserting the product if needed.
    pub fn add_one(&mut self, id: ProductId) {
        let quantity = self.0.entry(id).or_insert(0);
        *quantity = quantity.saturating_add(1);
    }

    /// Drop a product. Returns whether it was present.
    pub fn remove(&mut self, id: ProductId) -> bool {
        self.0.remove(&id).is_some()
    }

    /// Product ids in ascending order.
    #[must_use]
    pub fn ids(&self) -> Vec<ProductId> {
        self.0.keys().copied().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ProductId, u32)> + '_ {
        self.0.iter().map(|(id, quantity)| (*id, *quantity))
    }

    /// Apply a bulk action.
    pub fn apply(&mut self, action: CartAction) {
        match action {
            CartAction::Replace(cart) => *self = cart,
            CartAction::Remove(id) => {
                self.remove(id);
            }
            CartAction::Unchanged => {}
        }
    }
}

impl FromIterator<(ProductId, u32)> for Cart {
    fn from_iter<I: IntoIterator<Item = (ProductId, u32)>>(iter: I) -> Self {
        Self(iter.into_iter().filter(|(_, quantity)| *quantity > 0).collect())
    }
}

impl<'de> Deserialize<'de> for Cart {
    /// Lenient decoding: entries with a non-integer id or a quantity that
    /// isn't a positive integer are dropped instead of failing the cart.
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = BTreeMap::<String, serde_json::Value>::deserialize(deserializer)?;

        Ok(raw
            .into_iter()
            .filter_map(|(id, quantity)| {
                let id = id.trim().parse::<ProductId>().ok()?;
                let quantity = u32::try_from(quantity.as_u64()?).ok()?;
                Some((id, quantity))
            })
            .collect())
    }
}

// =============================================================================
// Bulk Update
// =============================================================================

/// Outcome of parsing a bulk update form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CartAction {
    /// Replace the whole cart.
    Replace(Cart),
    /// Remove one product.
    Remove(ProductId),
    /// Leave the cart alone.
    Unchanged,
}

impl CartAction {
    /// Parse the decoded form fields of a bulk update.
    ///
    /// With `action=update`, the cart is rebuilt from every
    /// `quantity_<id>` field holding a positive integer; other entries are
    /// dropped. With `action=remove_<id>`, that one product is removed. Any
    /// other action, or an unparsable id, changes nothing. Repeated keys keep
    /// their last value.
    #[must_use]
    pub fn parse(fields: &[(String, String)]) -> Self {
        let Some(action) = last_value(fields, "action") else {
            return Self::Unchanged;
        };

        if action == "update" {
            let mut latest: BTreeMap<&str, &str> = BTreeMap::new();
            for (key, value) in fields {
                if key.starts_with(QUANTITY_PREFIX) {
                    latest.insert(key, value);
                }
            }

            let cart = latest
                .into_iter()
                .filter_map(|(key, value)| {
                    let id = id_segment(key, QUANTITY_PREFIX)?;
                    Some((id, parse_quantity(value)?))
                })
                .collect();
            return Self::Replace(cart);
        }

        if action.starts_with(REMOVE_PREFIX) {
            return id_segment(action, REMOVE_PREFIX).map_or(Self::Unchanged, Self::Remove);
        }

        Self::Unchanged
    }
}

fn last_value<'a>(fields: &'a [(String, String)], key: &str) -> Option<&'a str> {
    fields
        .iter()
        .rev()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}

/// The id between `prefix` and the next underscore, e.g. `quantity_12` -> 12.
fn id_segment(key: &str, prefix: &str) -> Option<ProductId> {
    key.strip_prefix(prefix)?
        .split('_')
        .next()?
        .trim()
        .parse()
        .ok()
}

/// A positive integer quantity. Oversized values saturate like [`Cart::add_one`].
fn parse_quantity(value: &str) -> Option<u32> {
    let value = value.trim();
    let digits = value.strip_prefix('+').unwrap_or(value);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let quantity = digits
        .parse::<u64>()
        .map_or(u32::MAX, |q| u32::try_from(q).unwrap_or(u32::MAX));
    (quantity > 0).then_some(quantity)
}

// =============================================================================
// Pricing
// =============================================================================

/// One priced cart row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineItem {
    pub product: Product,
    pub quantity: u32,
    pub line_total: Price,
}

/// Priced contents of a cart.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CartSummary {
    /// Line items in ascending product id order.
    pub items: Vec<LineItem>,
    /// Sum of all line totals.
    pub total: Price,
    /// Sum of quantities over priced lines.
    pub unit_count: u64,
}

impl CartSummary {
    /// Price a cart against the products that still exist.
    #[must_use]
    pub fn price(cart: &Cart, products: &[Product]) -> Self {
        let by_id: BTreeMap<ProductId, &Product> = products.iter().map(|p| (p.id, p)).collect();

        let items: Vec<LineItem> = cart
            .iter()
            .filter_map(|(id, quantity)| {
                let product = by_id.get(&id)?;
                Some(LineItem {
                    product: (*product).clone(),
                    quantity,
                    line_total: product.price.times(quantity),
                })
            })
            .collect();

        Self {
            total: items.iter().map(|item| item.line_total).sum(),
            unit_count: items.iter().map(|item| u64::from(item.quantity)).sum(),
            items,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Look up every product in the cart with one catalog query and price it.
///
/// # Errors
///
/// Returns `RepositoryError` if the catalog cannot be read.
pub async fn summarize(
    cart: &Cart,
    catalog: &dyn CatalogStore,
) -> Result<CartSummary, RepositoryError> {
    if cart.is_empty() {
        return Ok(CartSummary::default());
    }

    let products = catalog.get_products(&cart.ids()).await?;
    Ok(CartSummary::price(cart, &products))
}

// =============================================================================
// Session Storage
// =============================================================================

/// Read the cart from the session.
///
/// A session read failure degrades to an empty cart.
pub async fn load(session: &Session) -> Cart {
    match session.get::<Cart>(session_keys::CART).await {
        Ok(cart) => cart.unwrap_or_default(),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to read cart from session");
            Cart::new()
        }
    }
}

/// Write the cart back to the session, replacing what was there.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn save(session: &Session, cart: &Cart) -> Result<(), tower_sessions::session::Error> {
    session.insert(session_keys::CART, cart).await
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::db::memory::MemoryCatalog;

    fn fields(items: &[(&str, &str)]) -> Vec<(String, String)> {
        items
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    fn cart(items: &[(i32, u32)]) -> Cart {
        items
            .iter()
            .map(|(id, q)| (ProductId::new(*id), *q))
            .collect()
    }

    #[test]
    fn test_add_one() {
        let mut c = Cart::new();
        c.add_one(ProductId::new(3));
        c.add_one(ProductId::new(3));
        c.add_one(ProductId::new(1));

        assert_eq!(c.quantity(ProductId::new(3)), 2);
        assert_eq!(c.quantity(ProductId::new(1)), 1);
        assert_eq!(c.ids(), vec![ProductId::new(1), ProductId::new(3)]);
    }

    #[test]
    fn test_session_json_shape() {
        let c = cart(&[(1, 2), (7, 1)]);
        let json = serde_json::to_value(&c).unwrap();
        assert_eq!(json, serde_json::json!({"1": 2, "7": 1}));

        let back: Cart = serde_json::from_value(json).unwrap();
        assert_eq!(back, c);
    }

    #[test]
    fn test_lenient_decoding_drops_bad_entries() {
        let json = serde_json::json!({"1": 2, "x": 4, "3": 0, "4": -1, "5": "2", "6": 1});
        let c: Cart = serde_json::from_value(json).unwrap();
        assert_eq!(c, cart(&[(1, 2), (6, 1)]));
    }

    #[test]
    fn test_update_rebuilds_from_positive_quantities() {
        let action = CartAction::parse(&fields(&[
            ("action", "update"),
            ("quantity_1", "3"),
            ("quantity_2", "-1"),
            ("quantity_3", "abc"),
        ]));

        let mut c = cart(&[(2, 5), (9, 1)]);
        c.apply(action);
        assert_eq!(c, cart(&[(1, 3)]));
    }

    #[test]
    fn test_update_drops_bad_ids_and_keeps_last_value() {
        let action = CartAction::parse(&fields(&[
            ("action", "update"),
            ("quantity_", "2"),
            ("quantity_abc", "2"),
            ("quantity_4", "1"),
            ("quantity_4", "6"),
            ("quantity_5", " 2 "),
            ("quantity_6", "0"),
            ("csrf", "ignored"),
        ]));
        assert_eq!(action, CartAction::Replace(cart(&[(4, 6), (5, 2)])));
    }

    #[test]
    fn test_update_saturates_oversized_quantities() {
        let action = CartAction::parse(&fields(&[
            ("action", "update"),
            ("quantity_1", "4294967296"),
            ("quantity_2", "99999999999999999999999"),
            ("quantity_3", "+2"),
            ("quantity_4", "1.5"),
        ]));
        assert_eq!(
            action,
            CartAction::Replace(cart(&[(1, u32::MAX), (2, u32::MAX), (3, 2)]))
        );
    }

    #[test]
    fn test_remove_action() {
        let mut c = cart(&[(1, 1), (2, 1)]);
        c.apply(CartAction::parse(&fields(&[("action", "remove_2")])));
        assert_eq!(c, cart(&[(1, 1)]));

        c.apply(CartAction::parse(&fields(&[("action", "remove_99")])));
        assert_eq!(c, cart(&[(1, 1)]));
    }

    #[test]
    fn test_unrecognised_actions_change_nothing() {
        assert_eq!(CartAction::parse(&[]), CartAction::Unchanged);
        assert_eq!(
            CartAction::parse(&fields(&[("action", "remove_abc")])),
            CartAction::Unchanged
        );
        assert_eq!(
            CartAction::parse(&fields(&[("action", "checkout"), ("quantity_1", "2")])),
            CartAction::Unchanged
        );
    }

    #[tokio::test]
    async fn test_summary_skips_missing_products() {
        let catalog = MemoryCatalog::default();
        let one = catalog.add_product("Lacquer", "10.00", None).await;
        let two = catalog.add_product("Brush", "5.00", None).await;

        let c = cart(&[(one.id.as_i32(), 2), (two.id.as_i32(), 1), (99, 9)]);
        let summary = summarize(&c, &catalog).await.unwrap();

        let rows: Vec<(ProductId, u32, String)> = summary
            .items
            .iter()
            .map(|i| (i.product.id, i.quantity, i.line_total.to_string()))
            .collect();
        assert_eq!(
            rows,
            vec![
                (one.id, 2, "20.00".to_string()),
                (two.id, 1, "5.00".to_string()),
            ]
        );
        assert_eq!(summary.total.to_string(), "25.00");
        assert_eq!(summary.unit_count, 3);
    }

    #[tokio::test]
    async fn test_empty_cart_totals_zero() {
        let catalog = MemoryCatalog::default();
        let summary = summarize(&Cart::new(), &catalog).await.unwrap();
        assert!(summary.is_empty());
        assert_eq!(summary.total, Price::ZERO);
    }

    #[test]
    fn test_price_is_pure() {
        let summary = CartSummary::price(&cart(&[(1, 4)]), &[]);
        assert!(summary.items.is_empty());
        assert_eq!(summary.unit_count, 0);
    }
}
