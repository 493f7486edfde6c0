//! # shop-core
//!
//! Core types and traits for the Tallow & Co. storefront.
//!
//! This crate provides:
//! - `Cart` and `CartLine` for the session-held shopping cart
//! - `compute_totals` and `PricingConfig` for integer-cent order totals
//! - `Order`, `OrderItem`, and the `OrderStatus` state machine
//! - `CheckoutDetails` form validation
//! - `PaymentGateway` trait for payment processor integrations
//! - `ShopError` for typed error handling
//!
//! ## Example
//!
//! ```rust
//! use shop_core::{Cart, PricingConfig};
//!
//! let mut cart = Cart::new();
//! cart.add_item("Pure Beef Tallow Moisturizer", 2499, "4 oz", 2).unwrap();
//!
//! let totals = cart.totals(&PricingConfig::default());
//! assert_eq!(totals.total, 5897);
//! ```

pub mod cart;
pub mod checkout;
pub mod error;
pub mod gateway;
pub mod money;
pub mod order;
pub mod product;

// Re-exports for convenience
pub use cart::{Cart, CartLine, MAX_LINE_QUANTITY};
pub use checkout::{CheckoutDetails, FieldError, RawCheckoutForm};
pub use error::{ShopError, ShopResult};
pub use gateway::{
    BoxedPaymentGateway, CheckoutUrls, HostedSession, PaymentGateway, SessionState, WebhookEvent,
    WebhookEventType,
};
pub use money::{compute_totals, dollars_to_cents, format_usd, Cents, OrderTotals, PricingConfig};
pub use order::{check_transition, generate_confirmation_token, Order, OrderItem, OrderStatus};
pub use product::{Product, ProductCatalog};
