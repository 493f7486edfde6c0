//! # shop-store
//!
//! SQLite persistence for the Tallow & Co. storefront.
//!
//! This crate provides:
//! - `OrderStore` — repository for `Order` + `OrderItem` with embedded
//!   migrations
//! - `TransitionOutcome` — the result of the compare-and-transition
//!   status updates (`mark_paid`, `cancel_by_token`)
//!
//! The store is the single source of truth for order status. Both
//! payment-confirmation paths (redirect and webhook) funnel into
//! `mark_paid`, whose conditional UPDATE guarantees the
//! `pending -> paid` transition is applied at most once.

pub mod error;
pub mod orders;

pub use error::StoreError;
pub use orders::{OrderStore, TransitionOutcome};
