//! # Routes
//!
//! Axum router configuration for the storefront.

use crate::handlers;
use crate::state::AppState;
use axum::{
    routing::{delete, get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tower_sessions::{cookie::SameSite, Expiry, MemoryStore, SessionManagerLayer};

/// Session cookie name
pub const SESSION_COOKIE_NAME: &str = "tallow_session";

/// Session expiry on inactivity (7 days)
const SESSION_EXPIRY_SECONDS: i64 = 7 * 24 * 60 * 60;

/// Create the main application router
///
/// Routes:
/// - API:
///   - GET    /api/v1/product - Product page data
///   - GET    /api/v1/cart - Cart contents with totals
///   - POST   /api/v1/cart/items - Add a catalog product to the cart
///   - PUT    /api/v1/cart/items - Update a cart line's quantity
///   - DELETE /api/v1/cart/items/{product_name} - Remove a cart line
///   - POST   /api/v1/checkout - Submit checkout, create payment session
///   - GET    /api/v1/orders/confirmation/{token} - Order by token
///   - POST   /api/v1/orders/{token}/cancel - Cancel a pending order
///
/// - Payment redirects:
///   - GET /checkout/success - Redirect confirmation path
///   - GET /checkout/cancel - Informational cancel page
///
/// - Webhooks:
///   - POST /webhook/stripe - Asynchronous confirmation path
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Session-held cart; the store lives in memory, matching the
    // single-process deployment.
    let is_secure = state.config.base_url.starts_with("https://");
    let session_layer = SessionManagerLayer::new(MemoryStore::default())
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(
            tower_sessions::cookie::time::Duration::seconds(SESSION_EXPIRY_SECONDS),
        ))
        .with_secure(is_secure)
        .with_same_site(SameSite::Lax)
        .with_http_only(true);

    let api_routes = Router::new()
        .route("/product", get(handlers::get_product))
        .route("/cart", get(handlers::get_cart))
        .route(
            "/cart/items",
            post(handlers::add_cart_item).put(handlers::update_cart_item),
        )
        .route(
            "/cart/items/{product_name}",
            delete(handlers::remove_cart_item),
        )
        .route("/checkout", post(handlers::create_checkout))
        .route(
            "/orders/confirmation/{token}",
            get(handlers::get_order_confirmation),
        )
        .route("/orders/{token}/cancel", post(handlers::cancel_order));

    let checkout_routes = Router::new()
        .route("/success", get(handlers::checkout_success))
        .route("/cancel", get(handlers::checkout_cancel));

    // Webhook routes must accept the raw body for signature verification
    let webhook_routes = Router::new().route("/stripe", post(handlers::stripe_webhook));

    Router::new()
        .route("/health", get(handlers::health))
        .route("/", get(handlers::health))
        .nest("/checkout", checkout_routes)
        .nest("/api/v1", api_routes)
        .nest("/webhook", webhook_routes)
        .layer(session_layer)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
