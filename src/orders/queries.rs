//! Database queries for orders.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::types::Json;
use sqlx::{FromRow, PgConnection, PgExecutor};
use uuid::Uuid;

use super::code::open_codes;
use super::models::{OrderItem, OrderRow, OrderStatus, TERMINAL_STATUSES};

const ORDER_COLUMNS: &str = r#"
    id, producer_id, point_id, code, status, items,
    customer_name, customer_phone, pickup_time, total, created_at
"#;

#[derive(Debug, FromRow)]
struct CodeRow {
    code: String,
    #[sqlx(try_from = "String")]
    status: OrderStatus,
}

/// Codes held by open orders of any producer.
///
/// Lookup by code is not producer-scoped, so the collision set spans every
/// producer.
pub async fn open_order_codes<'e, E: PgExecutor<'e>>(
    executor: E,
) -> Result<HashSet<String>, sqlx::Error> {
    let terminal: Vec<&str> = TERMINAL_STATUSES.iter().map(|s| s.as_str()).collect();
    let rows: Vec<CodeRow> = sqlx::query_as(
        r#"
        SELECT code, status
        FROM orders
        WHERE status <> ALL($1)
        "#,
    )
    .bind(terminal)
    .fetch_all(executor)
    .await?;

    Ok(open_codes(rows.into_iter().map(|r| (r.code, r.status))))
}

/// Find the order a pickup code refers to.
///
/// Open orders are preferred over terminal ones sharing a reused code, newest first.
pub async fn find_by_code<'e, E: PgExecutor<'e>>(
    executor: E,
    code: &str,
    producer_id: Option<Uuid>,
) -> Result<Option<OrderRow>, sqlx::Error> {
    let sql = format!(
        r#"
        SELECT {ORDER_COLUMNS}
        FROM orders
        WHERE code = $1
          AND ($2::uuid IS NULL OR producer_id = $2)
        ORDER BY (status IN ('completed', 'cancelled')), created_at DESC
        LIMIT 1
        "#
    );

    sqlx::query_as::<_, OrderRow>(&sql)
        .bind(code)
        .bind(producer_id)
        .fetch_optional(executor)
        .await
}

/// Find an order by id
pub async fn find_order<'e, E: PgExecutor<'e>>(
    executor: E,
    order_id: Uuid,
) -> Result<Option<OrderRow>, sqlx::Error> {
    let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1");
    sqlx::query_as::<_, OrderRow>(&sql)
        .bind(order_id)
        .fetch_optional(executor)
        .await
}

/// Lock an order row for a status change
pub async fn lock_order(
    conn: &mut PgConnection,
    order_id: Uuid,
) -> Result<Option<OrderRow>, sqlx::Error> {
    let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1 FOR UPDATE");
    sqlx::query_as::<_, OrderRow>(&sql)
        .bind(order_id)
        .fetch_optional(&mut *conn)
        .await
}

/// Order row to insert
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub id: Uuid,
    pub producer_id: Uuid,
    pub point_id: Uuid,
    pub items: Vec<OrderItem>,
    pub customer_name: String,
    pub customer_phone: String,
    pub pickup_time: Option<DateTime<Utc>>,
    pub total: Decimal,
}

/// Insert a pending order, returning its creation time.
///
/// `None` when an order with the same id already exists.
pub async fn insert_order(
    conn: &mut PgConnection,
    order: &NewOrder,
    code: &str,
) -> Result<Option<DateTime<Utc>>, sqlx::Error> {
    sqlx::query_scalar(
        r#"
        INSERT INTO orders (
            id, producer_id, point_id, code, status, items,
            customer_name, customer_phone, pickup_time, total
        )
        VALUES ($1, $2, $3, $4, 'pending', $5, $6, $7, $8, $9)
        ON CONFLICT (id) DO NOTHING
        RETURNING created_at
        "#,
    )
    .bind(order.id)
    .bind(order.producer_id)
    .bind(order.point_id)
    .bind(code)
    .bind(Json(&order.items))
    .bind(&order.customer_name)
    .bind(&order.customer_phone)
    .bind(order.pickup_time)
    .bind(order.total)
    .fetch_optional(&mut *conn)
    .await
}

/// Set a new status
pub async fn set_status(
    conn: &mut PgConnection,
    order_id: Uuid,
    status: OrderStatus,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE orders
        SET status = $2, updated_at = NOW()
        WHERE id = $1
        "#,
    )
    .bind(order_id)
    .bind(status.as_str())
    .execute(&mut *conn)
    .await?;

    Ok(())
}
