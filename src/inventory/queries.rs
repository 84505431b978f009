//! Database queries for point inventory.
//!
//! Reads accept any executor so they can run on the pool or inside an order
//! transaction. Every mutation of a stock count is a guarded single-statement
//! compare-and-decrement; there is no read-then-write from the caller.

use sqlx::{PgConnection, PgExecutor, PgPool};
use uuid::Uuid;

use super::models::{
    DeductionLine, LedgerRow, PointProductRow, ProductRow, StockChange, StockSource,
};
use super::resolver::resolve_stock;
use super::DeductionError;

/// Find the point-product join row
pub async fn find_point_product<'e, E: PgExecutor<'e>>(
    executor: E,
    point_id: Uuid,
    product_id: Uuid,
) -> Result<Option<PointProductRow>, sqlx::Error> {
    sqlx::query_as::<_, PointProductRow>(
        r#"
        SELECT point_id, product_id, quantity_available, is_available,
               price_override, discount_price_override
        FROM point_products
        WHERE point_id = $1 AND product_id = $2
        "#,
    )
    .bind(point_id)
    .bind(product_id)
    .fetch_optional(executor)
    .await
}

/// Find the legacy ledger row
pub async fn find_ledger_row<'e, E: PgExecutor<'e>>(
    executor: E,
    point_id: Uuid,
    product_id: Uuid,
) -> Result<Option<LedgerRow>, sqlx::Error> {
    sqlx::query_as::<_, LedgerRow>(
        r#"
        SELECT point_id, product_id, stock, bulk_qty, is_listed
        FROM point_inventory
        WHERE point_id = $1 AND product_id = $2
        "#,
    )
    .bind(point_id)
    .bind(product_id)
    .fetch_optional(executor)
    .await
}

/// Find a catalog product
pub async fn find_product<'e, E: PgExecutor<'e>>(
    executor: E,
    product_id: Uuid,
) -> Result<Option<ProductRow>, sqlx::Error> {
    sqlx::query_as::<_, ProductRow>(
        r#"
        SELECT id, producer_id, name, price, discount_price, quantity, in_stock,
               unit, discount_start, discount_end
        FROM products
        WHERE id = $1 AND deleted_at IS NULL
        "#,
    )
    .bind(product_id)
    .fetch_optional(executor)
    .await
}

/// Deduct one order line from whichever shape is authoritative.
///
/// Must run inside a transaction: point-scoped rows are locked, resolved with
/// the same precedence as the reader, and then decremented with a `>=` guard.
/// The deduction is recorded in `inventory_deductions` keyed by
/// `(order_id, product_id)` so it can be restored on cancellation.
pub async fn deduct_line(
    conn: &mut PgConnection,
    order_id: Uuid,
    point_id: Uuid,
    line: DeductionLine,
) -> Result<StockChange, DeductionError> {
    let insufficient = DeductionError::InsufficientStock {
        product_id: line.product_id,
    };
    let Ok(quantity) = i32::try_from(line.quantity) else {
        return Err(insufficient);
    };

    let join = sqlx::query_as::<_, PointProductRow>(
        r#"
        SELECT point_id, product_id, quantity_available, is_available,
               price_override, discount_price_override
        FROM point_products
        WHERE point_id = $1 AND product_id = $2
        FOR UPDATE
        "#,
    )
    .bind(point_id)
    .bind(line.product_id)
    .fetch_optional(&mut *conn)
    .await?;

    let ledger = sqlx::query_as::<_, LedgerRow>(
        r#"
        SELECT point_id, product_id, stock, bulk_qty, is_listed
        FROM point_inventory
        WHERE point_id = $1 AND product_id = $2
        FOR UPDATE
        "#,
    )
    .bind(point_id)
    .bind(line.product_id)
    .fetch_optional(&mut *conn)
    .await?;

    let product = find_product(&mut *conn, line.product_id).await?;

    let level = resolve_stock(join.as_ref(), ledger.as_ref(), product.as_ref());
    if !level.can_fulfill(line.quantity) {
        return Err(insufficient);
    }

    let remaining: Option<i32> = match level.source {
        StockSource::PointProduct => {
            sqlx::query_scalar(
                r#"
                UPDATE point_products
                SET quantity_available = quantity_available - $3, updated_at = NOW()
                WHERE point_id = $1 AND product_id = $2
                  AND is_available
                  AND quantity_available >= $3
                RETURNING quantity_available
                "#,
            )
            .bind(point_id)
            .bind(line.product_id)
            .bind(quantity)
            .fetch_optional(&mut *conn)
            .await?
        }
        StockSource::Ledger => {
            sqlx::query_scalar(
                r#"
                UPDATE point_inventory
                SET stock = stock - $3, updated_at = NOW()
                WHERE point_id = $1 AND product_id = $2
                  AND is_listed
                  AND stock >= $3
                RETURNING stock
                "#,
            )
            .bind(point_id)
            .bind(line.product_id)
            .bind(quantity)
            .fetch_optional(&mut *conn)
            .await?
        }
        StockSource::ProductDefault => {
            // First sale at this point: materialize the point-scoped row from the catalog
            let inserted: Option<i32> = sqlx::query_scalar(
                r#"
                INSERT INTO point_products (point_id, product_id, quantity_available, is_available)
                SELECT $1, p.id, p.quantity - $3, TRUE
                FROM products p
                WHERE p.id = $2 AND p.in_stock AND p.quantity >= $3
                ON CONFLICT (point_id, product_id) DO NOTHING
                RETURNING quantity_available
                "#,
            )
            .bind(point_id)
            .bind(line.product_id)
            .bind(quantity)
            .fetch_optional(&mut *conn)
            .await?;

            if inserted.is_none() {
                // Another checkout created the row first
                return Err(DeductionError::Contended {
                    product_id: line.product_id,
                });
            }
            inserted
        }
        StockSource::Unknown => None,
    };

    let Some(remaining) = remaining else {
        return Err(insufficient);
    };

    sqlx::query(
        r#"
        INSERT INTO inventory_deductions (order_id, point_id, product_id, quantity, source_table)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(order_id)
    .bind(point_id)
    .bind(line.product_id)
    .bind(quantity)
    .bind(level.source.table().unwrap_or("point_products"))
    .execute(&mut *conn)
    .await?;

    Ok(StockChange {
        point_id,
        product_id: line.product_id,
        quantity: u32::try_from(remaining).unwrap_or(0),
    })
}

/// Recorded deduction of a single order line
#[derive(Debug, Clone, sqlx::FromRow)]
struct DeductionRecord {
    point_id: Uuid,
    product_id: Uuid,
    quantity: i32,
    source_table: String,
}

/// Return an order's recorded deductions to stock.
///
/// Records are consumed, so restoring twice is a no-op.
pub async fn restore_order_deductions(
    conn: &mut PgConnection,
    order_id: Uuid,
) -> Result<Vec<StockChange>, sqlx::Error> {
    let records = sqlx::query_as::<_, DeductionRecord>(
        r#"
        DELETE FROM inventory_deductions
        WHERE order_id = $1
        RETURNING point_id, product_id, quantity, source_table
        "#,
    )
    .bind(order_id)
    .fetch_all(&mut *conn)
    .await?;

    let mut changes = Vec::with_capacity(records.len());
    for record in records {
        let restored: Option<i32> = if record.source_table == "point_inventory" {
            sqlx::query_scalar(
                r#"
                UPDATE point_inventory
                SET stock = stock + $3, updated_at = NOW()
                WHERE point_id = $1 AND product_id = $2
                RETURNING stock
                "#,
            )
            .bind(record.point_id)
            .bind(record.product_id)
            .bind(record.quantity)
            .fetch_optional(&mut *conn)
            .await?
        } else {
            sqlx::query_scalar(
                r#"
                UPDATE point_products
                SET quantity_available = quantity_available + $3, updated_at = NOW()
                WHERE point_id = $1 AND product_id = $2
                RETURNING quantity_available
                "#,
            )
            .bind(record.point_id)
            .bind(record.product_id)
            .bind(record.quantity)
            .fetch_optional(&mut *conn)
            .await?
        };

        if let Some(quantity) = restored {
            changes.push(StockChange {
                point_id: record.point_id,
                product_id: record.product_id,
                quantity: u32::try_from(quantity).unwrap_or(0),
            });
        }
    }

    Ok(changes)
}

/// Copy a producer's catalog quantities into point-scoped rows
pub async fn sync_point_from_catalog(
    pool: &PgPool,
    point_id: Uuid,
    producer_id: Uuid,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        r#"
        INSERT INTO point_products (point_id, product_id, quantity_available, is_available)
        SELECT $1, p.id, p.quantity, p.in_stock
        FROM products p
        WHERE p.producer_id = $2 AND p.deleted_at IS NULL
        ON CONFLICT (point_id, product_id) DO UPDATE
        SET quantity_available = EXCLUDED.quantity_available,
            is_available = EXCLUDED.is_available,
            updated_at = NOW()
        "#,
    )
    .bind(point_id)
    .bind(producer_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

/// Set a point-scoped quantity from a producer inventory edit
pub async fn upsert_point_stock(
    pool: &PgPool,
    point_id: Uuid,
    product_id: Uuid,
    quantity: i32,
    is_available: bool,
) -> Result<i32, sqlx::Error> {
    sqlx::query_scalar(
        r#"
        INSERT INTO point_products (point_id, product_id, quantity_available, is_available)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (point_id, product_id) DO UPDATE
        SET quantity_available = EXCLUDED.quantity_available,
            is_available = EXCLUDED.is_available,
            updated_at = NOW()
        RETURNING quantity_available
        "#,
    )
    .bind(point_id)
    .bind(product_id)
    .bind(quantity.max(0))
    .bind(is_available)
    .fetch_one(pool)
    .await
}

/// Fold legacy ledger rows into the join table where no join row exists
pub async fn migrate_ledger_rows(pool: &PgPool) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        r#"
        INSERT INTO point_products (point_id, product_id, quantity_available, is_available)
        SELECT l.point_id, l.product_id, GREATEST(l.stock, 0), l.is_listed
        FROM point_inventory l
        ON CONFLICT (point_id, product_id) DO NOTHING
        "#,
    )
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}
