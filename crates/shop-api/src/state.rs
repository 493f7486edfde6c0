//! # Application State
//!
//! Shared state for the Axum application: the order store, the payment
//! gateway, the product catalog, pricing rules, and configuration.

use shop_core::{BoxedPaymentGateway, CheckoutUrls, PricingConfig, Product, ProductCatalog};
use shop_store::OrderStore;
use shop_stripe::StripeGateway;
use std::sync::Arc;

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Base URL for redirect callbacks
    pub base_url: String,
    /// Environment (development, staging, production)
    pub environment: String,
    /// Database URL for the order store
    pub database_url: String,
}

impl AppConfig {
    /// Load from environment variables
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        Self {
            host: std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),
            base_url: std::env::var("BASE_URL")
                .unwrap_or_else(|_| "http://localhost:8080".to_string()),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
            database_url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite://tallow.db".to_string()),
        }
    }

    /// Get the socket address to bind to
    pub fn socket_addr(&self) -> anyhow::Result<std::net::SocketAddr> {
        Ok(format!("{}:{}", self.host, self.port).parse()?)
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Order persistence
    pub store: OrderStore,
    /// Payment gateway
    pub gateway: BoxedPaymentGateway,
    /// Product catalog
    pub catalog: ProductCatalog,
    /// Checkout redirect URLs
    pub urls: CheckoutUrls,
    /// Pricing rules (tax rate, shipping thresholds)
    pub pricing: PricingConfig,
    /// Application config
    pub config: AppConfig,
}

impl AppState {
    /// Create the AppState from the environment: open the order store,
    /// load the catalog, and initialize the Stripe gateway.
    pub async fn new() -> anyhow::Result<Self> {
        let config = AppConfig::from_env();
        let urls = CheckoutUrls::new(&config.base_url);

        let store = OrderStore::connect(&config.database_url)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to open order store: {e}"))?;

        let catalog = load_product_catalog()?;

        let gateway = StripeGateway::from_env()
            .map_err(|e| anyhow::anyhow!("Failed to initialize Stripe: {e}"))?;

        Ok(Self {
            store,
            gateway: Arc::new(gateway) as BoxedPaymentGateway,
            catalog,
            urls,
            pricing: PricingConfig::default(),
            config,
        })
    }

    /// Success URL with the session ID placeholder Stripe substitutes
    pub fn success_url(&self) -> String {
        format!(
            "{}?session_id={{CHECKOUT_SESSION_ID}}",
            self.urls.success_url()
        )
    }

    /// Cancel URL
    pub fn cancel_url(&self) -> String {
        self.urls.cancel_url()
    }
}

/// Load the product catalog from config file, falling back to the
/// built-in single-product catalog.
fn load_product_catalog() -> anyhow::Result<ProductCatalog> {
    let config_paths = [
        "config/products.toml",
        "../config/products.toml",
        "../../config/products.toml",
    ];

    for path in config_paths {
        if let Ok(content) = std::fs::read_to_string(path) {
            let catalog = ProductCatalog::from_toml(&content)
                .map_err(|e| anyhow::anyhow!("Failed to parse {path}: {e}"))?;
            tracing::info!("Loaded {} products from {}", catalog.products.len(), path);
            return Ok(catalog);
        }
    }

    tracing::warn!("No product catalog found, using built-in default");
    Ok(default_catalog())
}

/// The built-in catalog: the one product this store sells.
pub(crate) fn default_catalog() -> ProductCatalog {
    let mut catalog = ProductCatalog::new();
    catalog.add(Product {
        id: "tallow-moisturizer".to_string(),
        name: "Pure Beef Tallow Moisturizer".to_string(),
        description: "Handcrafted beef tallow moisturizer made from 100% grass-fed beef tallow, \
                      whipped to perfection for a luxurious, deeply nourishing skincare experience."
            .to_string(),
        size: "4 oz".to_string(),
        price_cents: 2499,
        active: true,
    });
    catalog
}
