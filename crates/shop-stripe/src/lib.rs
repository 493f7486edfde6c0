//! # shop-stripe
//!
//! Stripe payment gateway for the Tallow & Co. storefront.
//!
//! This crate implements `shop_core::PaymentGateway` against Stripe's
//! Checkout Sessions API:
//!
//! - **Session creation** — one charge line per order item plus tax and
//!   (when nonzero) shipping lines, with the order id embedded in session
//!   metadata.
//! - **Canonical retrieval** — confirmation handlers re-fetch session
//!   state (`payment_status`, `amount_total`) from Stripe instead of
//!   trusting anything a client reports.
//! - **Webhook verification** — HMAC-SHA256 signature checking with
//!   timestamp tolerance; unsigned events are only accepted when no
//!   signing secret is configured, and loudly logged as insecure.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use shop_stripe::StripeGateway;
//!
//! let gateway = StripeGateway::from_env()?;
//! let session = gateway
//!     .create_session(&order, &items, success_url, cancel_url)
//!     .await?;
//! // Redirect the customer to session.redirect_url
//! ```

pub mod checkout;
pub mod config;
pub mod webhook;

// Re-exports
pub use checkout::StripeGateway;
pub use config::StripeConfig;
pub use webhook::{parse_event, sign_payload, verify_signature};
