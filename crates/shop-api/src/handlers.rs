//! # Request Handlers
//!
//! Axum request handlers for the storefront: session cart operations,
//! checkout, the two payment confirmation paths (success redirect and
//! Stripe webhook), and token-keyed order lookup.

use crate::state::AppState;
use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{Html, IntoResponse},
    Json,
};
use shop_core::{
    format_usd, Cart, CheckoutDetails, FieldError, Order, OrderItem, OrderStatus, PaymentGateway,
    PricingConfig, RawCheckoutForm, ShopError, ShopResult, WebhookEventType,
};
use shop_store::TransitionOutcome;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tower_sessions::Session;
use tracing::{debug, error, info, instrument, warn};

// =============================================================================
// Request/Response Types
// =============================================================================

/// Add-to-cart request
#[derive(Debug, Deserialize)]
pub struct AddItemRequest {
    /// Product ID from the catalog (price and size are resolved
    /// server-side; clients never supply prices)
    pub product_id: String,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
}

fn default_quantity() -> u32 {
    1
}

/// Update-cart-line request
#[derive(Debug, Deserialize)]
pub struct UpdateItemRequest {
    pub product_name: String,
    pub quantity: u32,
}

/// Cart line display data (dollars, for the presentation layer)
#[derive(Debug, Serialize)]
pub struct CartLineView {
    pub product_name: String,
    pub size: String,
    pub quantity: u32,
    pub unit_price: String,
    pub line_subtotal: String,
}

/// Cart display data
#[derive(Debug, Serialize)]
pub struct CartView {
    pub items: Vec<CartLineView>,
    pub item_count: u32,
    pub subtotal: String,
    pub tax: String,
    pub shipping: String,
    pub total: String,
}

impl CartView {
    fn from_cart(cart: &Cart, pricing: &PricingConfig) -> Self {
        let totals = cart.totals(pricing);
        Self {
            items: cart
                .lines()
                .iter()
                .map(|l| CartLineView {
                    product_name: l.product_name.clone(),
                    size: l.size.clone(),
                    quantity: l.quantity,
                    unit_price: format_usd(l.unit_price_cents),
                    line_subtotal: format_usd(l.line_subtotal()),
                })
                .collect(),
            item_count: cart.item_count(),
            subtotal: format_usd(totals.subtotal),
            tax: format_usd(totals.tax),
            shipping: format_usd(totals.shipping),
            total: format_usd(totals.total),
        }
    }
}

/// Checkout response: where to send the customer to pay
#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    pub session_id: String,
    pub redirect_url: String,
    /// The customer's credential for the confirmation page
    pub confirmation_token: String,
}

/// Order line display data
#[derive(Debug, Serialize)]
pub struct OrderItemView {
    pub product_name: String,
    pub size: String,
    pub quantity: u32,
    pub unit_price: String,
    pub line_subtotal: String,
}

/// Order display data, keyed by confirmation token (the internal order
/// id is never exposed to unauthenticated callers)
#[derive(Debug, Serialize)]
pub struct OrderView {
    pub confirmation_token: String,
    pub status: OrderStatus,
    pub customer_name: String,
    pub items: Vec<OrderItemView>,
    pub subtotal: String,
    pub tax: String,
    pub shipping: String,
    pub total: String,
    pub created_at: String,
}

impl OrderView {
    fn new(order: &Order, items: &[OrderItem]) -> Self {
        Self {
            confirmation_token: order.confirmation_token.clone(),
            status: order.status,
            customer_name: order.customer_name.clone(),
            items: items
                .iter()
                .map(|i| OrderItemView {
                    product_name: i.product_name.clone(),
                    size: i.size.clone(),
                    quantity: i.quantity,
                    unit_price: format_usd(i.unit_price_cents),
                    line_subtotal: format_usd(i.line_subtotal),
                })
                .collect(),
            subtotal: format_usd(order.subtotal),
            tax: format_usd(order.tax),
            shipping: format_usd(order.shipping_cost),
            total: format_usd(order.total),
            created_at: order.created_at.to_rfc3339(),
        }
    }
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retryable: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<Vec<FieldError>>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, code: u16) -> Self {
        Self {
            error: error.into(),
            code,
            retryable: None,
            fields: None,
        }
    }

    pub fn with_fields(mut self, fields: Vec<FieldError>) -> Self {
        self.fields = Some(fields);
        self
    }
}

type HandlerError = (StatusCode, Json<ErrorResponse>);

fn shop_error_to_response(err: ShopError) -> HandlerError {
    let code = err.status_code();
    let mut response = ErrorResponse::new(err.to_string(), code);
    if err.is_retryable() {
        response.retryable = Some(true);
    }
    (
        StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
        Json(response),
    )
}

// =============================================================================
// Session Helpers
// =============================================================================

/// Session key for the cart
const CART_KEY: &str = "cart";

async fn load_cart(session: &Session) -> ShopResult<Cart> {
    Ok(session
        .get::<Cart>(CART_KEY)
        .await
        .map_err(|e| ShopError::Internal(format!("session read failed: {e}")))?
        .unwrap_or_default())
}

async fn save_cart(session: &Session, cart: &Cart) -> ShopResult<()> {
    session
        .insert(CART_KEY, cart)
        .await
        .map_err(|e| ShopError::Internal(format!("session write failed: {e}")))
}

// =============================================================================
// Handlers
// =============================================================================

/// Health check endpoint
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "tallow-shop",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// The product page data
pub async fn get_product(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, HandlerError> {
    let product = state.catalog.active_products().next().ok_or_else(|| {
        shop_error_to_response(ShopError::ProductNotFound {
            product_id: "(catalog empty)".to_string(),
        })
    })?;

    Ok(Json(serde_json::json!({
        "id": product.id,
        "name": product.name,
        "description": product.description,
        "size": product.size,
        "price": format_usd(product.price_cents),
        "price_cents": product.price_cents,
    })))
}

/// Current cart contents with totals
pub async fn get_cart(
    State(state): State<AppState>,
    session: Session,
) -> Result<Json<CartView>, HandlerError> {
    let cart = load_cart(&session).await.map_err(shop_error_to_response)?;
    Ok(Json(CartView::from_cart(&cart, &state.pricing)))
}

/// Add a catalog product to the cart
#[instrument(skip(state, session, request), fields(product_id = %request.product_id))]
pub async fn add_cart_item(
    State(state): State<AppState>,
    session: Session,
    Json(request): Json<AddItemRequest>,
) -> Result<Json<CartView>, HandlerError> {
    let product = state.catalog.get(&request.product_id).ok_or_else(|| {
        shop_error_to_response(ShopError::ProductNotFound {
            product_id: request.product_id.clone(),
        })
    })?;

    if !product.active {
        return Err(shop_error_to_response(ShopError::Validation(format!(
            "Product is not available: {}",
            request.product_id
        ))));
    }

    let mut cart = load_cart(&session).await.map_err(shop_error_to_response)?;
    cart.add_item(
        &product.name,
        product.price_cents,
        &product.size,
        request.quantity,
    )
    .map_err(shop_error_to_response)?;
    save_cart(&session, &cart)
        .await
        .map_err(shop_error_to_response)?;

    Ok(Json(CartView::from_cart(&cart, &state.pricing)))
}

/// Set the quantity of a cart line
pub async fn update_cart_item(
    State(state): State<AppState>,
    session: Session,
    Json(request): Json<UpdateItemRequest>,
) -> Result<Json<CartView>, HandlerError> {
    let mut cart = load_cart(&session).await.map_err(shop_error_to_response)?;
    cart.update_quantity(&request.product_name, request.quantity)
        .map_err(shop_error_to_response)?;
    save_cart(&session, &cart)
        .await
        .map_err(shop_error_to_response)?;

    Ok(Json(CartView::from_cart(&cart, &state.pricing)))
}

/// Remove a line from the cart (idempotent)
pub async fn remove_cart_item(
    State(state): State<AppState>,
    session: Session,
    Path(product_name): Path<String>,
) -> Result<Json<CartView>, HandlerError> {
    let mut cart = load_cart(&session).await.map_err(shop_error_to_response)?;
    cart.remove_item(&product_name);
    save_cart(&session, &cart)
        .await
        .map_err(shop_error_to_response)?;

    Ok(Json(CartView::from_cart(&cart, &state.pricing)))
}

/// Submit the checkout form: validate, persist the pending order, create
/// the hosted payment session, then (and only then) clear the cart.
///
/// If the processor rejects the session, the order stays pending, the
/// cart is untouched, and the caller is told to retry.
#[instrument(skip(state, session, form))]
pub async fn create_checkout(
    State(state): State<AppState>,
    session: Session,
    Json(form): Json<RawCheckoutForm>,
) -> Result<Json<CheckoutResponse>, HandlerError> {
    let details = CheckoutDetails::parse(&form).map_err(|fields| {
        (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::new("Validation failed", 400).with_fields(fields)),
        )
    })?;

    let cart = load_cart(&session).await.map_err(shop_error_to_response)?;
    if cart.is_empty() {
        return Err(shop_error_to_response(ShopError::Validation(
            "Cart is empty".to_string(),
        )));
    }

    let totals = cart.totals(&state.pricing);
    let order = Order::new(&details, &totals);
    let items: Vec<OrderItem> = cart
        .lines()
        .iter()
        .map(|l| OrderItem::from_cart_line(order.id, l))
        .collect();

    state
        .store
        .create_order(&order, &items)
        .await
        .map_err(|e| shop_error_to_response(e.into()))?;

    info!(
        order_id = %order.id,
        total = order.total,
        "Order created; requesting payment session"
    );

    let hosted = state
        .gateway
        .create_session(&order, &items, &state.success_url(), &state.cancel_url())
        .await
        .map_err(|e| {
            error!(order_id = %order.id, "Failed to create payment session: {e}");
            shop_error_to_response(e)
        })?;

    // Cart is cleared only now that the customer has a valid payment
    // link; a processor failure above leaves it intact for retry.
    let mut cart = cart;
    cart.clear();
    save_cart(&session, &cart)
        .await
        .map_err(shop_error_to_response)?;

    Ok(Json(CheckoutResponse {
        session_id: hosted.session_id,
        redirect_url: hosted.redirect_url,
        confirmation_token: order.confirmation_token,
    }))
}

/// Reconcile a payment session against its order.
///
/// Both confirmation paths funnel through here: re-fetch the canonical
/// session from the processor, resolve the order via session metadata,
/// verify the charged amount equals the stored total exactly, then apply
/// `pending -> paid` through the store's compare-and-transition. A
/// duplicate trigger observing an already-paid order is a safe no-op.
async fn reconcile(state: &AppState, session_id: &str) -> ShopResult<Order> {
    let session = state.gateway.retrieve_session(session_id).await?;

    let order_id = session.order_id.ok_or_else(|| {
        ShopError::WebhookParse(format!("session {session_id} carries no order id"))
    })?;

    let order = state
        .store
        .find_by_id(order_id)
        .await
        .map_err(ShopError::from)?
        .ok_or(ShopError::OrderNotFound)?;

    if !session.is_paid() {
        return Err(ShopError::Processor {
            provider: state.gateway.provider_name().to_string(),
            message: format!(
                "session {session_id} is not paid (status: {})",
                session.payment_status
            ),
        });
    }

    if session.amount_total != order.total {
        error!(
            order_id = %order.id,
            expected = order.total,
            reported = session.amount_total,
            "AMOUNT MISMATCH: processor-confirmed charge does not equal stored order total; order left unpaid"
        );
        return Err(ShopError::AmountMismatch {
            order_id: order.id,
            expected: order.total,
            reported: session.amount_total,
        });
    }

    match state
        .store
        .mark_paid(order.id, session.payment_reference.as_deref())
        .await
        .map_err(ShopError::from)?
    {
        TransitionOutcome::Applied => {
            info!(order_id = %order.id, "Payment confirmed; order marked paid");
        }
        TransitionOutcome::AlreadyApplied => {
            debug!(order_id = %order.id, "Duplicate payment confirmation; no-op");
        }
        TransitionOutcome::Rejected(current) => {
            return Err(ShopError::IllegalTransition {
                current,
                requested: OrderStatus::Paid,
            });
        }
    }

    state
        .store
        .find_by_id(order.id)
        .await
        .map_err(ShopError::from)?
        .ok_or(ShopError::OrderNotFound)
}

/// Success redirect from the hosted payment page.
///
/// The redirect carries only the opaque session id; the order is resolved
/// through the session's metadata, never from a client-supplied order id.
#[instrument(skip(state, params))]
pub async fn checkout_success(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Html<String>, HandlerError> {
    let session_id = params.get("session_id").ok_or_else(|| {
        shop_error_to_response(ShopError::Validation("Missing session_id".to_string()))
    })?;

    let order = reconcile(&state, session_id)
        .await
        .map_err(shop_error_to_response)?;

    Ok(Html(format!(
        r#"
<!DOCTYPE html>
<html>
<head><title>Order Confirmed</title></head>
<body style="font-family: system-ui; display: flex; justify-content: center; align-items: center; height: 100vh; margin: 0; background: #f5f1e8;">
    <div style="background: white; padding: 60px; border-radius: 16px; text-align: center;">
        <h1>Thank you, {}!</h1>
        <p>Your payment of <strong>{}</strong> was received.</p>
        <p>Order reference: <code>{}</code></p>
        <p style="color: #666;">A confirmation email is on its way.</p>
    </div>
</body>
</html>
"#,
        order.customer_name,
        format_usd(order.total),
        order.confirmation_token
    )))
}

/// Cancel page for the hosted payment flow. Informational only: the
/// order stays pending and the cart was already cleared at checkout.
pub async fn checkout_cancel() -> impl IntoResponse {
    Html(
        r#"
<!DOCTYPE html>
<html>
<head><title>Payment Cancelled</title></head>
<body style="font-family: system-ui; display: flex; justify-content: center; align-items: center; height: 100vh; margin: 0; background: #f5f1e8;">
    <div style="background: white; padding: 60px; border-radius: 16px; text-align: center;">
        <h1>Payment Cancelled</h1>
        <p style="color: #666;">No charges were made.</p>
    </div>
</body>
</html>
"#,
    )
}

/// Stripe webhook: the asynchronous confirmation path.
#[instrument(skip(state, headers, body))]
pub async fn stripe_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode, HandlerError> {
    let signature = headers
        .get("stripe-signature")
        .and_then(|v| v.to_str().ok());

    let event = state
        .gateway
        .verify_webhook(&body, signature)
        .await
        .map_err(|e| {
            error!("Webhook verification failed: {e}");
            shop_error_to_response(e)
        })?;

    info!(
        event_id = %event.event_id,
        "Received webhook: type={:?}",
        event.event_type
    );

    match event.event_type {
        WebhookEventType::CheckoutCompleted => {
            let session_id = event.session_id.as_deref().ok_or_else(|| {
                shop_error_to_response(ShopError::WebhookParse(
                    "completed event carries no session id".to_string(),
                ))
            })?;

            reconcile(&state, session_id).await.map_err(|e| {
                error!(event_id = %event.event_id, "Webhook reconciliation failed: {e}");
                shop_error_to_response(e)
            })?;

            Ok(StatusCode::OK)
        }
        WebhookEventType::CheckoutExpired => {
            // The order stays pending; the customer can be sent a new
            // payment session from the same order if they return.
            warn!(event_id = %event.event_id, "Checkout session expired");
            Ok(StatusCode::OK)
        }
        WebhookEventType::Unknown(ref kind) => {
            debug!("Unhandled webhook event: {kind}");
            Ok(StatusCode::OK)
        }
    }
}

/// Order lookup for the confirmation page, keyed by confirmation token.
/// A wrong or absent token is a 404, never another customer's order.
pub async fn get_order_confirmation(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<Json<OrderView>, HandlerError> {
    let order = state
        .store
        .find_by_confirmation_token(&token)
        .await
        .map_err(|e| shop_error_to_response(e.into()))?
        .ok_or_else(|| shop_error_to_response(ShopError::OrderNotFound))?;

    let items = state
        .store
        .items_for_order(order.id)
        .await
        .map_err(|e| shop_error_to_response(e.into()))?;

    Ok(Json(OrderView::new(&order, &items)))
}

/// Cancel a pending order, keyed by the same unguessable token as the
/// confirmation lookup. Cancelling a paid order is rejected.
#[instrument(skip(state, token))]
pub async fn cancel_order(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<Json<serde_json::Value>, HandlerError> {
    let outcome = state
        .store
        .cancel_by_token(&token)
        .await
        .map_err(|e| shop_error_to_response(e.into()))?;

    match outcome {
        TransitionOutcome::Applied | TransitionOutcome::AlreadyApplied => {
            Ok(Json(serde_json::json!({ "status": "cancelled" })))
        }
        TransitionOutcome::Rejected(current) => Err(shop_error_to_response(
            ShopError::IllegalTransition {
                current,
                requested: OrderStatus::Cancelled,
            },
        )),
    }
}
