use crate::{
    error::{ApiError, Result},
    models::*,
    state::AppState,
};
use axum::{
    extract::{Path, Query, State},
    Json,
};
use tracing::{debug, info};
use upsmon_device::{DeviceMetadata, DeviceType, ErrorQuery, HistoryQuery, WarningQuery};

/// 设备类型列表
pub async fn list_device_types(State(state): State<AppState>) -> Json<DeviceTypesResponse> {
    let device_types = state
        .manager
        .registry()
        .list()
        .into_iter()
        .cloned()
        .collect();

    Json(DeviceTypesResponse {
        success: true,
        device_types,
    })
}

/// 列出设备（附带最新测量）
pub async fn list_devices(
    State(state): State<AppState>,
    Query(query): Query<ListDevicesQuery>,
) -> Result<Json<DevicesResponse>> {
    debug!(device_type = ?query.device_type, "Listing devices");

    let device_type = query
        .device_type
        .filter(|t| !t.is_empty())
        .map(|t| DeviceType::from_tag(&t));
    let devices = state.manager.list_devices(device_type.as_ref()).await?;

    let mut result = Vec::with_capacity(devices.len());
    for device in devices {
        let current_state = state.manager.current_state(&device.device_id).await?;
        result.push(DeviceWithState {
            device,
            current_state,
        });
    }

    Ok(Json(DevicesResponse {
        success: true,
        count: result.len(),
        devices: result,
    }))
}

/// 获取设备
pub async fn get_device(
    State(state): State<AppState>,
    Path(device_id): Path<String>,
) -> Result<Json<DeviceResponse>> {
    debug!(device_id = %device_id, "Getting device");

    let device = state
        .manager
        .get_device(&device_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Device not found".to_string()))?;

    Ok(Json(DeviceResponse {
        success: true,
        device,
    }))
}

/// 更新设备元数据
pub async fn update_device(
    State(state): State<AppState>,
    Path(device_id): Path<String>,
    Json(req): Json<UpdateDeviceRequest>,
) -> Result<Json<DeviceResponse>> {
    info!(device_id = %device_id, "Updating device");

    let metadata = DeviceMetadata::from(req);
    let device = state
        .manager
        .update_device_metadata(&device_id, &metadata)
        .await?;

    Ok(Json(DeviceResponse {
        success: true,
        device,
    }))
}

/// 设备当前状态
pub async fn get_current_state(
    State(state): State<AppState>,
    Path(device_id): Path<String>,
) -> Result<Json<CurrentStateResponse>> {
    let data = state
        .manager
        .current_state(&device_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("No data available for this device".to_string()))?;

    Ok(Json(CurrentStateResponse {
        success: true,
        data,
    }))
}

/// 历史测量
pub async fn get_history(
    State(state): State<AppState>,
    Path(device_id): Path<String>,
    Query(params): Query<HistoryParams>,
) -> Result<Json<HistoryResponse>> {
    let query: HistoryQuery = params.into();
    let data = state.manager.history(&device_id, &query).await?;
    debug!(device_id = %device_id, count = data.len(), "History fetched");

    Ok(Json(HistoryResponse {
        success: true,
        count: data.len(),
        data,
    }))
}

/// 错误记录
pub async fn get_errors(
    State(state): State<AppState>,
    Path(device_id): Path<String>,
    Query(params): Query<ErrorParams>,
) -> Result<Json<ErrorsResponse>> {
    let query: ErrorQuery = params.into();
    let errors = state.manager.errors(&device_id, &query).await?;

    Ok(Json(ErrorsResponse {
        success: true,
        count: errors.len(),
        errors,
    }))
}

/// 告警记录
pub async fn get_warnings(
    State(state): State<AppState>,
    Path(device_id): Path<String>,
    Query(params): Query<WarningParams>,
) -> Result<Json<WarningsResponse>> {
    let query: WarningQuery = params.into();
    let warnings = state.manager.warnings(&device_id, &query).await?;

    Ok(Json(WarningsResponse {
        success: true,
        count: warnings.len(),
        warnings,
    }))
}
