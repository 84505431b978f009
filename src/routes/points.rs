//! Pickup point route handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db;
use crate::error::Result;
use crate::schedule::{validate_schedule, OpenState, PointStatus, WeeklySchedule};
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct StatusQuery {
    /// Evaluate at this instant instead of now
    #[serde(default)]
    pub as_of: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub point_id: Uuid,
    pub name: String,
    pub state: OpenState,
    pub is_open: bool,
    pub message: String,
    #[serde(with = "optional_hhmm")]
    pub until: Option<NaiveTime>,
    #[serde(with = "optional_hhmm")]
    pub from: Option<NaiveTime>,
}

mod optional_hhmm {
    use chrono::NaiveTime;
    use serde::Serializer;

    pub fn serialize<S: Serializer>(time: &Option<NaiveTime>, s: S) -> Result<S::Ok, S::Error> {
        match time {
            Some(time) => s.serialize_str(&time.format("%H:%M").to_string()),
            None => s.serialize_none(),
        }
    }
}

/// Current open/closed status of a pickup point
pub async fn status(
    State(state): State<AppState>,
    Path(point_id): Path<Uuid>,
    Query(query): Query<StatusQuery>,
) -> Result<Json<StatusResponse>> {
    let point = state.cache.point(&state.db, point_id).await?;
    let now = query.as_of.unwrap_or_else(Utc::now);

    let status = match point.schedule() {
        Ok(schedule) => state.schedule.status(&schedule, now),
        Err(e) => {
            tracing::warn!("Unreadable work hours for point {}: {}", point_id, e);
            PointStatus::closed_today()
        }
    };

    Ok(Json(StatusResponse {
        point_id,
        name: point.name.clone(),
        state: status.state,
        is_open: status.state.is_open(),
        message: status.message(),
        until: status.until,
        from: status.from,
    }))
}

/// Check a schedule without storing it
pub async fn validate(Json(schedule): Json<WeeklySchedule>) -> Result<StatusCode> {
    validate_schedule(&schedule)?;
    Ok(StatusCode::NO_CONTENT)
}

/// Validate and store a point's work hours
pub async fn update_schedule(
    State(state): State<AppState>,
    Path(point_id): Path<Uuid>,
    Json(schedule): Json<WeeklySchedule>,
) -> Result<Json<WeeklySchedule>> {
    let schedule = validate_schedule(&schedule)?;
    db::update_point_schedule(&state.db, point_id, &schedule).await?;
    state.cache.invalidate_point(point_id).await;
    tracing::info!("Work hours updated for point {}", point_id);
    Ok(Json(schedule))
}
