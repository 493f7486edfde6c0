//! # Session Cart
//!
//! The shopping cart held in a user's session. Lines are keyed by product
//! name; prices are frozen into the line when it is added, so a later
//! catalog price change never alters what the customer saw.

use crate::error::{ShopError, ShopResult};
use crate::money::{compute_totals, Cents, OrderTotals, PricingConfig};
use serde::{Deserialize, Serialize};

/// Maximum quantity per cart line
pub const MAX_LINE_QUANTITY: u32 = 10;

/// A line item in the cart
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    /// Product name (identity key within the cart)
    pub product_name: String,

    /// Unit price in cents, frozen at add time
    pub unit_price_cents: Cents,

    /// Size variant (e.g., "4 oz")
    pub size: String,

    /// Quantity, 1..=10
    pub quantity: u32,
}

impl CartLine {
    /// Create a cart line, validating the quantity range.
    pub fn new(
        product_name: impl Into<String>,
        unit_price_cents: Cents,
        size: impl Into<String>,
        quantity: u32,
    ) -> ShopResult<Self> {
        validate_quantity(quantity)?;
        Ok(Self {
            product_name: product_name.into(),
            unit_price_cents,
            size: size.into(),
            quantity,
        })
    }

    /// Line subtotal: unit price x quantity
    pub fn line_subtotal(&self) -> Cents {
        self.unit_price_cents * Cents::from(self.quantity)
    }
}

fn validate_quantity(quantity: u32) -> ShopResult<()> {
    if quantity == 0 || quantity > MAX_LINE_QUANTITY {
        return Err(ShopError::Validation(format!(
            "quantity must be between 1 and {MAX_LINE_QUANTITY}, got {quantity}"
        )));
    }
    Ok(())
}

/// A session-scoped shopping cart.
///
/// Owned exclusively by one session; no cross-session sharing. Serialized
/// into the session store between requests.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Cart {
    lines: Vec<CartLine>,
}

impl Cart {
    /// Create an empty cart
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an item to the cart.
    ///
    /// If a line with the same product name exists, quantities merge with
    /// a cap: the new quantity is `min(existing + quantity, 10)`. Otherwise
    /// a new line is appended.
    pub fn add_item(
        &mut self,
        product_name: impl Into<String>,
        unit_price_cents: Cents,
        size: impl Into<String>,
        quantity: u32,
    ) -> ShopResult<()> {
        validate_quantity(quantity)?;
        let product_name = product_name.into();

        if let Some(line) = self
            .lines
            .iter_mut()
            .find(|l| l.product_name == product_name)
        {
            line.quantity = (line.quantity + quantity).min(MAX_LINE_QUANTITY);
            return Ok(());
        }

        self.lines
            .push(CartLine::new(product_name, unit_price_cents, size, quantity)?);
        Ok(())
    }

    /// Set the quantity of an existing line.
    ///
    /// An unknown product name is silently ignored; the contract does not
    /// require a not-found signal here.
    pub fn update_quantity(&mut self, product_name: &str, quantity: u32) -> ShopResult<()> {
        validate_quantity(quantity)?;

        if let Some(line) = self
            .lines
            .iter_mut()
            .find(|l| l.product_name == product_name)
        {
            line.quantity = quantity;
        }
        Ok(())
    }

    /// Remove all lines matching the product name. Idempotent: removing an
    /// absent item is not an error.
    pub fn remove_item(&mut self, product_name: &str) {
        self.lines.retain(|l| l.product_name != product_name);
    }

    /// Empty the cart. Called once, after the payment session for the
    /// order has been successfully created.
    pub fn clear(&mut self) {
        self.lines.clear();
    }

    /// Sum of line quantities, for display. Zero on an empty cart.
    pub fn item_count(&self) -> u32 {
        self.lines.iter().map(|l| l.quantity).sum()
    }

    /// Check if the cart has no lines
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// The cart's lines, in insertion order
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    /// Totals for the current cart contents
    pub fn totals(&self, pricing: &PricingConfig) -> OrderTotals {
        compute_totals(&self.lines, pricing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TALLOW: &str = "Pure Beef Tallow Moisturizer";

    fn cart_with(qty: u32) -> Cart {
        let mut cart = Cart::new();
        cart.add_item(TALLOW, 2499, "4 oz", qty).unwrap();
        cart
    }

    #[test]
    fn test_add_rejects_out_of_range_quantity() {
        let mut cart = Cart::new();
        assert!(cart.add_item(TALLOW, 2499, "4 oz", 0).is_err());
        assert!(cart.add_item(TALLOW, 2499, "4 oz", 11).is_err());
        assert!(cart.is_empty());
    }

    #[test]
    fn test_add_merges_with_cap() {
        // Adding 5 to an existing 8 yields 10, not 13 and not an error.
        let mut cart = cart_with(8);
        cart.add_item(TALLOW, 2499, "4 oz", 5).unwrap();

        assert_eq!(cart.lines().len(), 1);
        assert_eq!(cart.lines()[0].quantity, 10);
    }

    #[test]
    fn test_merge_never_below_max_of_inputs() {
        for q1 in 1..=10u32 {
            for q2 in 1..=10u32 {
                let mut cart = cart_with(q1);
                cart.add_item(TALLOW, 2499, "4 oz", q2).unwrap();
                let merged = cart.lines()[0].quantity;
                assert_eq!(merged, (q1 + q2).min(10));
                assert!(merged >= q1.max(q2));
            }
        }
    }

    #[test]
    fn test_update_quantity() {
        let mut cart = cart_with(2);
        cart.update_quantity(TALLOW, 7).unwrap();
        assert_eq!(cart.lines()[0].quantity, 7);

        assert!(cart.update_quantity(TALLOW, 0).is_err());
        assert!(cart.update_quantity(TALLOW, 11).is_err());
        assert_eq!(cart.lines()[0].quantity, 7);
    }

    #[test]
    fn test_update_unknown_name_is_noop() {
        let mut cart = cart_with(2);
        cart.update_quantity("Lip Balm", 5).unwrap();
        assert_eq!(cart.lines().len(), 1);
        assert_eq!(cart.lines()[0].quantity, 2);
    }

    #[test]
    fn test_remove_is_idempotent() {
        let mut cart = cart_with(2);
        cart.remove_item("Lip Balm"); // absent: no-op
        assert_eq!(cart.lines().len(), 1);

        cart.remove_item(TALLOW);
        assert!(cart.is_empty());
        cart.remove_item(TALLOW); // again: still no error
        assert!(cart.is_empty());
    }

    #[test]
    fn test_removing_only_line_zeroes_totals() {
        let mut cart = cart_with(2);
        cart.remove_item(TALLOW);

        let totals = cart.totals(&PricingConfig::default());
        assert_eq!(totals.subtotal, 0);
        assert_eq!(totals.tax, 0);
        assert_eq!(totals.shipping, 0);
        assert_eq!(totals.total, 0);
    }

    #[test]
    fn test_item_count() {
        assert_eq!(Cart::new().item_count(), 0);

        let mut cart = cart_with(3);
        cart.add_item("Lip Balm", 899, "0.5 oz", 2).unwrap();
        assert_eq!(cart.item_count(), 5);
    }

    #[test]
    fn test_clear() {
        let mut cart = cart_with(3);
        cart.clear();
        assert!(cart.is_empty());
        assert_eq!(cart.item_count(), 0);
    }

    #[test]
    fn test_line_price_frozen_at_add() {
        let mut cart = Cart::new();
        cart.add_item(TALLOW, 2499, "4 oz", 1).unwrap();
        // A later add of the same product merges quantity but keeps the
        // original unit price.
        cart.add_item(TALLOW, 9999, "4 oz", 1).unwrap();
        assert_eq!(cart.lines()[0].unit_price_cents, 2499);
        assert_eq!(cart.lines()[0].quantity, 2);
    }
}
