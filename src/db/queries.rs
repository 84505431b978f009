//! Database queries for pickup points

use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::models::{Coordinates, PickupPoint};
use crate::schedule::WeeklySchedule;

/// Get an active pickup point by id
pub async fn get_point(pool: &PgPool, point_id: Uuid) -> Result<PickupPoint> {
    let point = sqlx::query_as::<_, PickupPoint>(
        r#"
        SELECT
            id,
            producer_id,
            name,
            address,
            work_hours,
            discount_start,
            discount_end,
            is_active,
            latitude,
            longitude
        FROM pickup_points
        WHERE id = $1
          AND is_active = true
        "#,
    )
    .bind(point_id)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::NotFound)?;

    Ok(point)
}

/// Get all active pickup points (for cache warming)
pub async fn get_active_points(pool: &PgPool) -> Result<Vec<PickupPoint>> {
    let points = sqlx::query_as::<_, PickupPoint>(
        r#"
        SELECT
            id,
            producer_id,
            name,
            address,
            work_hours,
            discount_start,
            discount_end,
            is_active,
            latitude,
            longitude
        FROM pickup_points
        WHERE is_active = true
        ORDER BY name
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(points)
}

/// Store a validated schedule
pub async fn update_point_schedule(
    pool: &PgPool,
    point_id: Uuid,
    schedule: &WeeklySchedule,
) -> Result<()> {
    let result = sqlx::query(
        r#"
        UPDATE pickup_points
        SET work_hours = $2, updated_at = NOW()
        WHERE id = $1
        "#,
    )
    .bind(point_id)
    .bind(schedule.to_json())
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound);
    }
    Ok(())
}

/// Store geocoded coordinates
pub async fn update_point_coordinates(
    pool: &PgPool,
    point_id: Uuid,
    coords: Coordinates,
) -> Result<()> {
    let result = sqlx::query(
        r#"
        UPDATE pickup_points
        SET latitude = $2, longitude = $3, updated_at = NOW()
        WHERE id = $1
        "#,
    )
    .bind(point_id)
    .bind(coords.lat)
    .bind(coords.lng)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound);
    }
    Ok(())
}
