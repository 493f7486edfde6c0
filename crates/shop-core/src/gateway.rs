//! # Payment Gateway Trait
//!
//! Boundary to the external payment processor. The gateway creates hosted
//! payment sessions for pending orders and is the only component allowed
//! to answer "did this session actually get paid, and for how much" —
//! confirmation handlers re-fetch canonical session state through it and
//! never trust a client-supplied success flag.

use crate::error::ShopResult;
use crate::money::Cents;
use crate::order::{Order, OrderItem};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// A hosted payment session created by the processor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostedSession {
    /// Processor's opaque session identifier
    pub session_id: String,

    /// URL to redirect the customer to for payment
    pub redirect_url: String,
}

/// Canonical state of a payment session, as re-fetched from the processor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionState {
    pub session_id: String,

    /// Processor-reported payment status (e.g., "paid", "unpaid")
    pub payment_status: String,

    /// Processor-reported charged amount in cents
    pub amount_total: Cents,

    /// Our order id, recovered from the session metadata set at creation.
    /// Absent if the session was not created by this system.
    pub order_id: Option<Uuid>,

    /// Processor payment reference (e.g., payment intent id)
    pub payment_reference: Option<String>,
}

impl SessionState {
    /// Whether the processor reports the session as fully paid
    pub fn is_paid(&self) -> bool {
        self.payment_status == "paid"
    }
}

/// Webhook event types the storefront acts on
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WebhookEventType {
    /// Hosted checkout session completed
    CheckoutCompleted,
    /// Hosted checkout session expired without payment
    CheckoutExpired,
    /// Anything else (logged and acknowledged)
    Unknown(String),
}

/// A verified, parsed webhook event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookEvent {
    /// Event ID from the processor
    pub event_id: String,

    pub event_type: WebhookEventType,

    /// Related session ID, when the event carries one
    pub session_id: Option<String>,

    pub timestamp: DateTime<Utc>,
}

/// Core trait for payment processor integrations.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Create a hosted payment session for a pending order.
    ///
    /// The charge description carries one entry per order item, plus a tax
    /// line, plus a shipping line when nonzero. The order id is embedded
    /// in session metadata so later confirmation can locate the order
    /// without trusting client-supplied order ids.
    async fn create_session(
        &self,
        order: &Order,
        items: &[OrderItem],
        success_url: &str,
        cancel_url: &str,
    ) -> ShopResult<HostedSession>;

    /// Re-fetch the canonical state of a session from the processor.
    async fn retrieve_session(&self, session_id: &str) -> ShopResult<SessionState>;

    /// Verify a webhook payload and parse the event.
    ///
    /// With a signing secret configured, authenticity is verified
    /// cryptographically and a missing or bad signature is an error. With
    /// no secret configured the event is accepted unverified — an insecure
    /// development-only mode that implementations must log loudly.
    async fn verify_webhook(
        &self,
        payload: &[u8],
        signature: Option<&str>,
    ) -> ShopResult<WebhookEvent>;

    /// Processor name (for logging and routing)
    fn provider_name(&self) -> &'static str;
}

/// Type alias for a shared gateway (dynamic dispatch)
pub type BoxedPaymentGateway = Arc<dyn PaymentGateway>;

/// Configuration for URLs used in checkout redirects
#[derive(Debug, Clone)]
pub struct CheckoutUrls {
    /// Base URL of the application (e.g., "https://tallowandco.io")
    pub base_url: String,
    /// Success page path
    pub success_path: String,
    /// Cancel page path
    pub cancel_path: String,
}

impl CheckoutUrls {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            success_path: "/checkout/success".to_string(),
            cancel_path: "/checkout/cancel".to_string(),
        }
    }

    pub fn success_url(&self) -> String {
        format!("{}{}", self.base_url, self.success_path)
    }

    pub fn cancel_url(&self) -> String {
        format!("{}{}", self.base_url, self.cancel_path)
    }
}

impl Default for CheckoutUrls {
    fn default() -> Self {
        Self::new("http://localhost:8080")
    }
}
