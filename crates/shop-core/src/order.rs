//! # Order Types
//!
//! Persisted order entities and the order status state machine.
//!
//! An order is created at checkout submission (status `pending`) before
//! the external payment session exists, and is mutated only through the
//! reconciliation transitions. Orders are never deleted; cancellation is
//! a status, not a deletion.

use crate::cart::CartLine;
use crate::checkout::CheckoutDetails;
use crate::error::{ShopError, ShopResult};
use crate::money::{Cents, OrderTotals};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, Utc};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Order lifecycle status.
///
/// `pending -> paid` and `pending -> cancelled` are driven by payment
/// reconciliation; the tail beyond `paid` is administrative and has no
/// automatic driver in this system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Paid,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Paid => "paid",
            OrderStatus::Processing => "processing",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    /// Whether the transition `self -> next` is legal
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, next),
            (Pending, Paid)
                | (Pending, Cancelled)
                | (Paid, Processing)
                | (Processing, Shipped)
                | (Shipped, Delivered)
        )
    }

    /// Terminal as far as payment reconciliation is concerned: no further
    /// `pending -> *` transition may be applied.
    pub fn is_settled(&self) -> bool {
        !matches!(self, OrderStatus::Pending)
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = ShopError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(OrderStatus::Pending),
            "paid" => Ok(OrderStatus::Paid),
            "processing" => Ok(OrderStatus::Processing),
            "shipped" => Ok(OrderStatus::Shipped),
            "delivered" => Ok(OrderStatus::Delivered),
            "cancelled" => Ok(OrderStatus::Cancelled),
            other => Err(ShopError::Serialization(format!(
                "unknown order status: {other}"
            ))),
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Generate an unguessable confirmation token: 32 random bytes,
/// URL-safe base64 without padding.
///
/// The token is the only credential that grants unauthenticated lookup
/// of one order, so sequential ids are never exposed.
pub fn generate_confirmation_token() -> String {
    let mut bytes = [0u8; 32];
    rand::rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// A placed order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    /// Unique order ID (generated, never exposed to unauthenticated callers)
    pub id: Uuid,

    // Customer contact
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: String,

    // Shipping address
    pub shipping_street: String,
    pub shipping_city: String,
    pub shipping_state: String,
    pub shipping_zip: String,

    // Totals in cents, frozen at creation. total == subtotal + tax + shipping_cost.
    pub subtotal: Cents,
    pub tax: Cents,
    pub shipping_cost: Cents,
    pub total: Cents,

    pub status: OrderStatus,

    /// Processor payment reference, set when the order is marked paid
    pub payment_reference: Option<String>,

    /// Unguessable token granting confirmation lookup for this order
    pub confirmation_token: String,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Build a pending order from validated checkout details and computed
    /// totals. The totals invariant holds by construction.
    pub fn new(details: &CheckoutDetails, totals: &OrderTotals) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            customer_name: details.customer_name.clone(),
            customer_email: details.customer_email.clone(),
            customer_phone: details.customer_phone.clone(),
            shipping_street: details.shipping_street.clone(),
            shipping_city: details.shipping_city.clone(),
            shipping_state: details.shipping_state.clone(),
            shipping_zip: details.shipping_zip.clone(),
            subtotal: totals.subtotal,
            tax: totals.tax,
            shipping_cost: totals.shipping,
            total: totals.total,
            status: OrderStatus::Pending,
            payment_reference: None,
            confirmation_token: generate_confirmation_token(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// A snapshot line item belonging to an order.
///
/// Product details are copied out of the cart line rather than referenced,
/// so a later catalog price change never alters a placed order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItem {
    pub order_id: Uuid,
    pub product_name: String,
    pub unit_price_cents: Cents,
    pub size: String,
    pub quantity: u32,
    /// unit_price_cents x quantity, captured at creation
    pub line_subtotal: Cents,
}

impl OrderItem {
    /// Snapshot a cart line into an order item
    pub fn from_cart_line(order_id: Uuid, line: &CartLine) -> Self {
        Self {
            order_id,
            product_name: line.product_name.clone(),
            unit_price_cents: line.unit_price_cents,
            size: line.size.clone(),
            quantity: line.quantity,
            line_subtotal: line.line_subtotal(),
        }
    }
}

/// Check that the requested transition is legal, returning the typed
/// rejection otherwise.
pub fn check_transition(current: OrderStatus, requested: OrderStatus) -> ShopResult<()> {
    if current.can_transition_to(requested) {
        Ok(())
    } else {
        Err(ShopError::IllegalTransition { current, requested })
    }
}
