//! # Stripe Checkout Sessions
//!
//! Implementation of Stripe's Checkout Sessions API: creating a hosted
//! payment session for a pending order, and re-fetching canonical session
//! state during confirmation.

use crate::config::StripeConfig;
use crate::webhook;
use async_trait::async_trait;
use serde::Deserialize;
use shop_core::{
    HostedSession, Order, OrderItem, PaymentGateway, SessionState, ShopError, ShopResult,
    WebhookEvent,
};
use std::collections::HashMap;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

/// Stripe payment gateway
///
/// Uses Stripe's hosted checkout page; card details never touch this
/// system's trust boundary.
pub struct StripeGateway {
    config: StripeConfig,
    client: reqwest::Client,
}

impl StripeGateway {
    /// Create a new Stripe gateway
    pub fn new(config: StripeConfig) -> ShopResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| ShopError::Configuration(format!("Failed to create HTTP client: {e}")))?;

        if config.webhook_secret.is_none() {
            warn!("No STRIPE_WEBHOOK_SECRET configured: webhook events will be accepted UNVERIFIED (insecure, development only)");
        }

        Ok(Self { config, client })
    }

    /// Create from environment variables
    pub fn from_env() -> ShopResult<Self> {
        let config = StripeConfig::from_env()?;
        Self::new(config)
    }

    /// Build the form-encoded line items for the session: one entry per
    /// order item, then a tax line, then a shipping line when nonzero.
    fn build_line_item_params(order: &Order, items: &[OrderItem]) -> Vec<(String, String)> {
        let mut params = Vec::new();
        let mut index = 0;

        let mut push_line = |params: &mut Vec<(String, String)>, name: String, amount: i64, quantity: u32| {
            params.push((
                format!("line_items[{index}][price_data][currency]"),
                "usd".to_string(),
            ));
            params.push((
                format!("line_items[{index}][price_data][unit_amount]"),
                amount.to_string(),
            ));
            params.push((
                format!("line_items[{index}][price_data][product_data][name]"),
                name,
            ));
            params.push((format!("line_items[{index}][quantity]"), quantity.to_string()));
            index += 1;
        };

        for item in items {
            push_line(
                &mut params,
                format!("{} ({})", item.product_name, item.size),
                item.unit_price_cents,
                item.quantity,
            );
        }

        push_line(&mut params, "Sales Tax".to_string(), order.tax, 1);

        if order.shipping_cost > 0 {
            push_line(&mut params, "Shipping".to_string(), order.shipping_cost, 1);
        }

        params
    }
}

#[async_trait]
impl PaymentGateway for StripeGateway {
    #[instrument(skip(self, order, items), fields(order_id = %order.id))]
    async fn create_session(
        &self,
        order: &Order,
        items: &[OrderItem],
        success_url: &str,
        cancel_url: &str,
    ) -> ShopResult<HostedSession> {
        if items.is_empty() {
            return Err(ShopError::Validation("Order has no items".to_string()));
        }

        let mut form_params: Vec<(String, String)> = vec![
            ("mode".to_string(), "payment".to_string()),
            ("success_url".to_string(), success_url.to_string()),
            ("cancel_url".to_string(), cancel_url.to_string()),
            ("customer_email".to_string(), order.customer_email.clone()),
            // The session carries our order id so confirmation can locate
            // the order without trusting client-supplied ids.
            ("metadata[order_id]".to_string(), order.id.to_string()),
        ];
        form_params.extend(Self::build_line_item_params(order, items));

        debug!("Creating Stripe checkout session for order {}", order.id);

        let url = format!("{}/v1/checkout/sessions", self.config.api_base_url);
        let response = self
            .client
            .post(&url)
            .header("Authorization", self.config.auth_header())
            .header("Stripe-Version", &self.config.api_version)
            .header("Idempotency-Key", order.id.to_string())
            .form(&form_params)
            .send()
            .await
            .map_err(|e| ShopError::Network(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ShopError::Network(e.to_string()))?;

        if !status.is_success() {
            error!("Stripe API error: status={}, body={}", status, body);

            if let Ok(error_response) = serde_json::from_str::<StripeErrorResponse>(&body) {
                return Err(ShopError::Processor {
                    provider: "stripe".to_string(),
                    message: error_response.error.message,
                });
            }

            return Err(ShopError::Processor {
                provider: "stripe".to_string(),
                message: format!("HTTP {status}: {body}"),
            });
        }

        let session: StripeSessionResponse = serde_json::from_str(&body)
            .map_err(|e| ShopError::Serialization(format!("Failed to parse Stripe response: {e}")))?;

        let redirect_url = session.url.ok_or_else(|| {
            ShopError::Serialization("Stripe session response missing url".to_string())
        })?;

        info!("Created Stripe checkout session: id={}", session.id);

        Ok(HostedSession {
            session_id: session.id,
            redirect_url,
        })
    }

    #[instrument(skip(self))]
    async fn retrieve_session(&self, session_id: &str) -> ShopResult<SessionState> {
        let url = format!(
            "{}/v1/checkout/sessions/{}",
            self.config.api_base_url, session_id
        );

        let response = self
            .client
            .get(&url)
            .header("Authorization", self.config.auth_header())
            .header("Stripe-Version", &self.config.api_version)
            .send()
            .await
            .map_err(|e| ShopError::Network(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ShopError::Network(e.to_string()))?;

        if !status.is_success() {
            error!("Stripe session retrieval failed: status={}, body={}", status, body);
            return Err(ShopError::Processor {
                provider: "stripe".to_string(),
                message: format!("HTTP {status}: session {session_id} not retrievable"),
            });
        }

        let session: StripeSessionResponse = serde_json::from_str(&body)
            .map_err(|e| ShopError::Serialization(format!("Failed to parse Stripe response: {e}")))?;

        let order_id = session
            .metadata
            .as_ref()
            .and_then(|m| m.get("order_id"))
            .and_then(|s| Uuid::parse_str(s).ok());

        Ok(SessionState {
            session_id: session.id,
            payment_status: session.payment_status.unwrap_or_else(|| "unknown".to_string()),
            amount_total: session.amount_total.unwrap_or(0),
            order_id,
            payment_reference: session.payment_intent,
        })
    }

    #[instrument(skip(self, payload, signature))]
    async fn verify_webhook(
        &self,
        payload: &[u8],
        signature: Option<&str>,
    ) -> ShopResult<WebhookEvent> {
        match self.config.webhook_secret.as_deref() {
            Some(secret) => {
                let header = signature.ok_or_else(|| {
                    ShopError::WebhookVerification("Missing Stripe-Signature header".to_string())
                })?;
                webhook::verify_signature(secret, payload, header)?;
            }
            None => {
                warn!("Accepting UNVERIFIED webhook event: no signing secret configured (insecure mode)");
            }
        }

        webhook::parse_event(payload)
    }

    fn provider_name(&self) -> &'static str {
        "stripe"
    }
}

// =============================================================================
// Stripe API Types
// =============================================================================

#[derive(Debug, Deserialize)]
struct StripeSessionResponse {
    id: String,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    payment_status: Option<String>,
    #[serde(default)]
    amount_total: Option<i64>,
    #[serde(default)]
    payment_intent: Option<String>,
    #[serde(default)]
    metadata: Option<HashMap<String, String>>,
}

#[derive(Debug, Deserialize)]
struct StripeErrorResponse {
    error: StripeError,
}

#[derive(Debug, Deserialize)]
struct StripeError {
    message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use shop_core::{Cart, CheckoutDetails, PricingConfig, RawCheckoutForm, WebhookEventType};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn pending_order() -> (Order, Vec<OrderItem>) {
        let details = CheckoutDetails::parse(&RawCheckoutForm {
            customer_name: "John Smith".into(),
            customer_email: "john.smith@example.com".into(),
            customer_phone: "555-123-4567".into(),
            shipping_street: "123 Main St, Apt 4B".into(),
            shipping_city: "Los Angeles".into(),
            shipping_state: "CA".into(),
            shipping_zip: "90210".into(),
        })
        .unwrap();

        let mut cart = Cart::new();
        cart.add_item("Pure Beef Tallow Moisturizer", 2499, "4 oz", 2)
            .unwrap();
        let totals = cart.totals(&PricingConfig::default());
        let order = Order::new(&details, &totals);
        let items = cart
            .lines()
            .iter()
            .map(|l| OrderItem::from_cart_line(order.id, l))
            .collect();
        (order, items)
    }

    fn gateway_for(server: &MockServer) -> StripeGateway {
        let config = StripeConfig::new("sk_test_abc", None).with_api_base_url(server.uri());
        StripeGateway::new(config).unwrap()
    }

    #[tokio::test]
    async fn test_create_session_charge_description() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/checkout/sessions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "cs_test_123",
                "url": "https://checkout.stripe.com/c/pay/cs_test_123"
            })))
            .mount(&server)
            .await;

        let gateway = gateway_for(&server);
        let (order, items) = pending_order();

        let session = gateway
            .create_session(
                &order,
                &items,
                "http://localhost:8080/checkout/success?session_id={CHECKOUT_SESSION_ID}",
                "http://localhost:8080/checkout/cancel",
            )
            .await
            .unwrap();

        assert_eq!(session.session_id, "cs_test_123");
        assert!(session.redirect_url.contains("checkout.stripe.com"));

        let requests = server.received_requests().await.unwrap();
        let body = String::from_utf8_lossy(&requests[0].body).to_string();

        // Order id embedded in session metadata
        assert!(body.contains(&format!(
            "metadata%5Border_id%5D={}",
            order.id
        )));
        // One charge line for the product, then tax, then shipping
        // ($49.98 subtotal is under the free-shipping threshold).
        assert!(body.contains("unit_amount%5D=2499"));
        assert!(body.contains("Sales+Tax"));
        assert!(body.contains(&format!("unit_amount%5D={}", order.tax)));
        assert!(body.contains("Shipping"));
        assert!(body.contains(&format!("unit_amount%5D={}", order.shipping_cost)));
    }

    #[tokio::test]
    async fn test_create_session_omits_zero_shipping_line() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/checkout/sessions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "cs_test_456",
                "url": "https://checkout.stripe.com/c/pay/cs_test_456"
            })))
            .mount(&server)
            .await;

        let gateway = gateway_for(&server);

        // Three units push the subtotal past $50: free shipping.
        let details = CheckoutDetails::parse(&RawCheckoutForm {
            customer_name: "John Smith".into(),
            customer_email: "john.smith@example.com".into(),
            customer_phone: "555-123-4567".into(),
            shipping_street: "123 Main St, Apt 4B".into(),
            shipping_city: "Los Angeles".into(),
            shipping_state: "CA".into(),
            shipping_zip: "90210".into(),
        })
        .unwrap();
        let mut cart = Cart::new();
        cart.add_item("Pure Beef Tallow Moisturizer", 2499, "4 oz", 3)
            .unwrap();
        let totals = cart.totals(&PricingConfig::default());
        assert_eq!(totals.shipping, 0);
        let order = Order::new(&details, &totals);
        let items: Vec<OrderItem> = cart
            .lines()
            .iter()
            .map(|l| OrderItem::from_cart_line(order.id, l))
            .collect();

        gateway
            .create_session(&order, &items, "http://x/success", "http://x/cancel")
            .await
            .unwrap();

        let requests = server.received_requests().await.unwrap();
        let body = String::from_utf8_lossy(&requests[0].body).to_string();
        assert!(!body.contains("Shipping"));
        assert!(body.contains("Sales+Tax"));
    }

    #[tokio::test]
    async fn test_create_session_processor_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/checkout/sessions"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": { "message": "Invalid currency" }
            })))
            .mount(&server)
            .await;

        let gateway = gateway_for(&server);
        let (order, items) = pending_order();

        let err = gateway
            .create_session(&order, &items, "http://x/success", "http://x/cancel")
            .await
            .unwrap_err();

        assert!(matches!(err, ShopError::Processor { .. }));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_create_session_rejects_empty_order() {
        let server = MockServer::start().await;
        let gateway = gateway_for(&server);
        let (order, _) = pending_order();

        let err = gateway
            .create_session(&order, &[], "http://x/success", "http://x/cancel")
            .await
            .unwrap_err();
        assert!(matches!(err, ShopError::Validation(_)));
    }

    #[tokio::test]
    async fn test_retrieve_session() {
        let server = MockServer::start().await;
        let order_id = Uuid::new_v4();
        Mock::given(method("GET"))
            .and(path("/v1/checkout/sessions/cs_test_123"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "cs_test_123",
                "payment_status": "paid",
                "amount_total": 5897,
                "payment_intent": "pi_test_1",
                "metadata": { "order_id": order_id.to_string() }
            })))
            .mount(&server)
            .await;

        let gateway = gateway_for(&server);
        let state = gateway.retrieve_session("cs_test_123").await.unwrap();

        assert!(state.is_paid());
        assert_eq!(state.amount_total, 5897);
        assert_eq!(state.order_id, Some(order_id));
        assert_eq!(state.payment_reference.as_deref(), Some("pi_test_1"));
    }

    #[tokio::test]
    async fn test_retrieve_unknown_session() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/checkout/sessions/cs_missing"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "error": { "message": "No such checkout session" }
            })))
            .mount(&server)
            .await;

        let gateway = gateway_for(&server);
        let err = gateway.retrieve_session("cs_missing").await.unwrap_err();
        assert!(matches!(err, ShopError::Processor { .. }));
    }

    #[tokio::test]
    async fn test_verify_webhook_requires_signature_when_secret_set() {
        let config = StripeConfig::new("sk_test_abc", Some("whsec_test".into()));
        let gateway = StripeGateway::new(config).unwrap();

        let payload = json!({
            "id": "evt_1",
            "type": "checkout.session.completed",
            "created": chrono::Utc::now().timestamp(),
            "data": { "object": { "id": "cs_test_123" } }
        })
        .to_string();

        // Missing header rejected
        let err = gateway
            .verify_webhook(payload.as_bytes(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, ShopError::WebhookVerification(_)));

        // Properly signed header accepted
        let header = crate::webhook::sign_payload(
            "whsec_test",
            payload.as_bytes(),
            chrono::Utc::now().timestamp(),
        );
        let event = gateway
            .verify_webhook(payload.as_bytes(), Some(&header))
            .await
            .unwrap();
        assert_eq!(event.event_type, WebhookEventType::CheckoutCompleted);
        assert_eq!(event.session_id.as_deref(), Some("cs_test_123"));
    }

    #[tokio::test]
    async fn test_verify_webhook_insecure_mode() {
        let config = StripeConfig::new("sk_test_abc", None);
        let gateway = StripeGateway::new(config).unwrap();

        let payload = json!({
            "id": "evt_2",
            "type": "checkout.session.completed",
            "created": chrono::Utc::now().timestamp(),
            "data": { "object": { "id": "cs_test_456" } }
        })
        .to_string();

        // No secret configured: event accepted without a signature.
        let event = gateway
            .verify_webhook(payload.as_bytes(), None)
            .await
            .unwrap();
        assert_eq!(event.session_id.as_deref(), Some("cs_test_456"));
    }
}
