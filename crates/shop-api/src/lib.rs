//! # shop-api
//!
//! HTTP API layer for the Tallow & Co. storefront.
//!
//! This crate provides:
//! - Axum-based HTTP server with session-held carts
//! - Checkout: validated form -> pending order -> hosted payment session
//! - Payment reconciliation via success redirect and Stripe webhook,
//!   funneled into one compare-and-transition path
//! - Token-keyed order confirmation lookup and cancellation
//!
//! ## Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | GET | `/health` | Health check |
//! | GET | `/api/v1/product` | Product page data |
//! | GET | `/api/v1/cart` | Cart with totals |
//! | POST | `/api/v1/cart/items` | Add to cart |
//! | PUT | `/api/v1/cart/items` | Update quantity |
//! | DELETE | `/api/v1/cart/items/{product_name}` | Remove from cart |
//! | POST | `/api/v1/checkout` | Submit checkout |
//! | GET | `/checkout/success` | Redirect confirmation |
//! | GET | `/checkout/cancel` | Cancel page |
//! | POST | `/webhook/stripe` | Stripe webhook |
//! | GET | `/api/v1/orders/confirmation/{token}` | Order by token |
//! | POST | `/api/v1/orders/{token}/cancel` | Cancel pending order |

pub mod handlers;
pub mod routes;
pub mod state;

pub use routes::create_router;
pub use state::{AppConfig, AppState};
