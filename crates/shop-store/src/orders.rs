//! # Order Store
//!
//! SQLite-backed repository for orders and their snapshot line items.
//!
//! The database is the sole arbiter of order status: `mark_paid` and
//! `cancel_by_token` are single conditional UPDATEs
//! (`... WHERE status = 'pending'`), so two racing confirmation handlers
//! can never both observe `pending` and both apply a transition.

use crate::error::StoreError;
use chrono::{DateTime, Utc};
use shop_core::{Order, OrderItem, OrderStatus};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use std::str::FromStr;
use tracing::{debug, info};
use uuid::Uuid;

/// Result of requesting a status transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionOutcome {
    /// The transition was applied by this call
    Applied,
    /// The order was already in the requested state; safe no-op
    AlreadyApplied,
    /// The order is in a state from which the transition is illegal
    Rejected(OrderStatus),
}

/// Repository for order persistence
#[derive(Clone)]
pub struct OrderStore {
    pool: SqlitePool,
}

impl OrderStore {
    /// Open (creating if missing) the database at `url` and run migrations.
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.run_migrations().await?;
        info!("Order store ready at {url}");
        Ok(store)
    }

    /// In-memory store for tests and local experiments. A single
    /// connection keeps every caller on the same in-memory database.
    pub async fn in_memory() -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.run_migrations().await?;
        Ok(store)
    }

    async fn run_migrations(&self) -> Result<(), StoreError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    /// Persist an order together with its line items in one transaction.
    ///
    /// Either everything commits or nothing does; a failure mid-way rolls
    /// back and leaves no partial order behind.
    pub async fn create_order(&self, order: &Order, items: &[OrderItem]) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO orders (
                id, customer_name, customer_email, customer_phone,
                shipping_street, shipping_city, shipping_state, shipping_zip,
                subtotal, tax, shipping_cost, total,
                status, payment_reference, confirmation_token,
                created_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(order.id.to_string())
        .bind(&order.customer_name)
        .bind(&order.customer_email)
        .bind(&order.customer_phone)
        .bind(&order.shipping_street)
        .bind(&order.shipping_city)
        .bind(&order.shipping_state)
        .bind(&order.shipping_zip)
        .bind(order.subtotal)
        .bind(order.tax)
        .bind(order.shipping_cost)
        .bind(order.total)
        .bind(order.status.as_str())
        .bind(order.payment_reference.as_deref())
        .bind(&order.confirmation_token)
        .bind(order.created_at)
        .bind(order.updated_at)
        .execute(&mut *tx)
        .await?;

        for item in items {
            sqlx::query(
                r#"
                INSERT INTO order_items (
                    order_id, product_name, unit_price_cents, size, quantity, line_subtotal
                )
                VALUES (?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(item.order_id.to_string())
            .bind(&item.product_name)
            .bind(item.unit_price_cents)
            .bind(&item.size)
            .bind(i64::from(item.quantity))
            .bind(item.line_subtotal)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        debug!(order_id = %order.id, "Order persisted");
        Ok(())
    }

    /// Fetch an order by its internal id
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Order>, StoreError> {
        let row = sqlx::query("SELECT * FROM orders WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        row.map(|r| order_from_row(&r)).transpose()
    }

    /// Fetch an order by its confirmation token — the only lookup exposed
    /// to unauthenticated callers.
    pub async fn find_by_confirmation_token(
        &self,
        token: &str,
    ) -> Result<Option<Order>, StoreError> {
        let row = sqlx::query("SELECT * FROM orders WHERE confirmation_token = ?")
            .bind(token)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|r| order_from_row(&r)).transpose()
    }

    /// Fetch the snapshot line items for an order
    pub async fn items_for_order(&self, order_id: Uuid) -> Result<Vec<OrderItem>, StoreError> {
        let rows = sqlx::query("SELECT * FROM order_items WHERE order_id = ? ORDER BY id")
            .bind(order_id.to_string())
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(item_from_row).collect()
    }

    /// Apply `pending -> paid` as a compare-and-transition.
    ///
    /// The conditional UPDATE is the atomic read-modify-write: of any
    /// number of concurrent callers, exactly one observes `pending` and
    /// applies the transition; the rest see `AlreadyApplied` (idempotent
    /// no-op) or a rejection if the order was cancelled first.
    pub async fn mark_paid(
        &self,
        order_id: Uuid,
        payment_reference: Option<&str>,
    ) -> Result<TransitionOutcome, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE orders
            SET status = 'paid', payment_reference = ?, updated_at = ?
            WHERE id = ? AND status = 'pending'
            "#,
        )
        .bind(payment_reference)
        .bind(Utc::now())
        .bind(order_id.to_string())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 1 {
            info!(order_id = %order_id, "Order marked paid");
            return Ok(TransitionOutcome::Applied);
        }

        // Nothing matched: the order is gone or already settled. Statuses
        // never move back to pending, so this classification is stable.
        match self.find_by_id(order_id).await? {
            None => Err(StoreError::NotFound),
            Some(order) if order.status == OrderStatus::Paid => {
                debug!(order_id = %order_id, "Order already paid; no-op");
                Ok(TransitionOutcome::AlreadyApplied)
            }
            Some(order) => Ok(TransitionOutcome::Rejected(order.status)),
        }
    }

    /// Apply `pending -> cancelled`, keyed by confirmation token.
    ///
    /// Cancellation is only legal while the order is still pending;
    /// cancelling a paid order is rejected with the status unchanged.
    pub async fn cancel_by_token(&self, token: &str) -> Result<TransitionOutcome, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE orders
            SET status = 'cancelled', updated_at = ?
            WHERE confirmation_token = ? AND status = 'pending'
            "#,
        )
        .bind(Utc::now())
        .bind(token)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 1 {
            info!("Order cancelled");
            return Ok(TransitionOutcome::Applied);
        }

        match self.find_by_confirmation_token(token).await? {
            None => Err(StoreError::NotFound),
            Some(order) if order.status == OrderStatus::Cancelled => {
                Ok(TransitionOutcome::AlreadyApplied)
            }
            Some(order) => Ok(TransitionOutcome::Rejected(order.status)),
        }
    }
}

fn order_from_row(row: &SqliteRow) -> Result<Order, StoreError> {
    let id: String = row.try_get("id")?;
    let id = Uuid::parse_str(&id)
        .map_err(|e| StoreError::DataCorruption(format!("invalid order id: {e}")))?;

    let status: String = row.try_get("status")?;
    let status = status
        .parse::<OrderStatus>()
        .map_err(|e| StoreError::DataCorruption(e.to_string()))?;

    let created_at: DateTime<Utc> = row.try_get("created_at")?;
    let updated_at: DateTime<Utc> = row.try_get("updated_at")?;

    Ok(Order {
        id,
        customer_name: row.try_get("customer_name")?,
        customer_email: row.try_get("customer_email")?,
        customer_phone: row.try_get("customer_phone")?,
        shipping_street: row.try_get("shipping_street")?,
        shipping_city: row.try_get("shipping_city")?,
        shipping_state: row.try_get("shipping_state")?,
        shipping_zip: row.try_get("shipping_zip")?,
        subtotal: row.try_get("subtotal")?,
        tax: row.try_get("tax")?,
        shipping_cost: row.try_get("shipping_cost")?,
        total: row.try_get("total")?,
        status,
        payment_reference: row.try_get("payment_reference")?,
        confirmation_token: row.try_get("confirmation_token")?,
        created_at,
        updated_at,
    })
}

fn item_from_row(row: &SqliteRow) -> Result<OrderItem, StoreError> {
    let order_id: String = row.try_get("order_id")?;
    let order_id = Uuid::parse_str(&order_id)
        .map_err(|e| StoreError::DataCorruption(format!("invalid order id: {e}")))?;

    let quantity: i64 = row.try_get("quantity")?;
    let quantity = u32::try_from(quantity)
        .map_err(|_| StoreError::DataCorruption(format!("invalid quantity: {quantity}")))?;

    Ok(OrderItem {
        order_id,
        product_name: row.try_get("product_name")?,
        unit_price_cents: row.try_get("unit_price_cents")?,
        size: row.try_get("size")?,
        quantity,
        line_subtotal: row.try_get("line_subtotal")?,
    })
}
