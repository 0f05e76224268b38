use crate::{error::Result, models::*, state::AppState};
use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::Utc;
use tracing::debug;

/// 单个设备的测量统计
pub async fn get_device_stats(
    State(state): State<AppState>,
    Path(device_id): Path<String>,
    Query(params): Query<StatsParams>,
) -> Result<Json<DeviceStatsResponse>> {
    let from = params.from.unwrap_or(0);
    let to = params.to.unwrap_or(i64::MAX);
    let stats = state.manager.measurement_stats(&device_id, from, to).await?;

    Ok(Json(DeviceStatsResponse {
        success: true,
        device_id,
        from,
        to,
        stats,
    }))
}

/// 全局统计
pub async fn get_overview(State(state): State<AppState>) -> Result<Json<OverviewResponse>> {
    debug!("Building overview statistics");

    let stats = state.manager.overview().await?;
    Ok(Json(OverviewResponse {
        success: true,
        generated_at: Utc::now(),
        stats,
    }))
}
