//! # Product Catalog
//!
//! Static product data for the storefront, loaded from
//! `config/products.toml`. A single-product store today, but the catalog
//! keeps lookup by id so the cart never trusts client-supplied prices.

use crate::money::Cents;
use serde::{Deserialize, Serialize};

/// A product in the catalog
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    /// Unique product identifier (e.g., "tallow-moisturizer")
    pub id: String,

    /// Display name
    pub name: String,

    /// Short description
    #[serde(default)]
    pub description: String,

    /// Size variant (e.g., "4 oz")
    pub size: String,

    /// Unit price in cents
    pub price_cents: Cents,

    /// Whether this product is available for purchase
    #[serde(default = "default_true")]
    pub active: bool,
}

fn default_true() -> bool {
    true
}

/// Product catalog (loaded from config)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProductCatalog {
    pub products: Vec<Product>,
}

impl ProductCatalog {
    /// Create an empty catalog
    pub fn new() -> Self {
        Self {
            products: Vec::new(),
        }
    }

    /// Add a product to the catalog
    pub fn add(&mut self, product: Product) {
        self.products.push(product);
    }

    /// Find a product by ID
    pub fn get(&self, id: &str) -> Option<&Product> {
        self.products.iter().find(|p| p.id == id)
    }

    /// Get all active products
    pub fn active_products(&self) -> impl Iterator<Item = &Product> {
        self.products.iter().filter(|p| p.active)
    }

    /// Load catalog from a TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(toml_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_lookup() {
        let mut catalog = ProductCatalog::new();
        catalog.add(Product {
            id: "tallow-moisturizer".into(),
            name: "Pure Beef Tallow Moisturizer".into(),
            description: "Handcrafted, whipped, 100% grass-fed".into(),
            size: "4 oz".into(),
            price_cents: 2499,
            active: true,
        });

        let product = catalog.get("tallow-moisturizer").unwrap();
        assert_eq!(product.price_cents, 2499);
        assert!(catalog.get("unknown").is_none());
        assert_eq!(catalog.active_products().count(), 1);
    }

    #[test]
    fn test_from_toml() {
        let toml_str = r#"
            [[products]]
            id = "tallow-moisturizer"
            name = "Pure Beef Tallow Moisturizer"
            size = "4 oz"
            price_cents = 2499
        "#;
        let catalog = ProductCatalog::from_toml(toml_str).unwrap();
        assert_eq!(catalog.products.len(), 1);
        assert!(catalog.products[0].active);
        assert_eq!(catalog.products[0].size, "4 oz");
    }
}
