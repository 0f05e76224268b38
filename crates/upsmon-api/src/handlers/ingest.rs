use crate::{
    error::{ApiError, Result},
    metrics::{record_ingested, record_rejected},
    models::IngestResponse,
    state::AppState,
};
use axum::{extract::rejection::JsonRejection, extract::State, Json};
use serde_json::Value;
use tracing::{debug, warn};
use upsmon_device::RawPayload;

/// 接收设备上报（测量数据或错误上报）
pub async fn ingest(
    State(state): State<AppState>,
    body: std::result::Result<Json<Value>, JsonRejection>,
) -> Result<Json<IngestResponse>> {
    let Json(value) = body.map_err(|rejection| {
        warn!(error = %rejection, "Malformed ingest body");
        record_rejected("malformed");
        ApiError::BadRequest(rejection.body_text())
    })?;

    let payload = RawPayload::from_value(value).map_err(|e| {
        record_rejected("malformed");
        ApiError::from(e)
    })?;

    let receipt = state.manager.ingest(&payload).await.map_err(|e| {
        if e.is_client_error() {
            record_rejected("validation");
        } else {
            record_rejected("storage");
        }
        ApiError::from(e)
    })?;

    record_ingested(receipt.kind);
    debug!(device_id = %receipt.device_id, kind = receipt.kind, "Ingest accepted");

    let message = if receipt.is_error_report() {
        "Error data received"
    } else {
        "Data received"
    };

    Ok(Json(IngestResponse {
        success: true,
        message: message.to_string(),
        device_id: receipt.device_id,
    }))
}
