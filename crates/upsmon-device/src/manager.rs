use crate::device_types::DeviceTypeRegistry;
use crate::model::{
    Device, DeviceMetadata, DeviceType, ErrorQuery, ErrorRecord, HistoryQuery, Measurement,
    WarningQuery, WarningRecord,
};
use crate::payload::RawPayload;
use crate::pipeline::{Pipeline, Processed};
use crate::store::{ErrorStats, MeasurementStats, Overview, TelemetryStore};
use crate::Result;
use sea_orm::DatabaseConnection;
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

/// 一次上报的处理回执
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IngestReceipt {
    pub device_id: String,
    pub device_type: DeviceType,
    /// `measurement` 或 `error`
    pub kind: &'static str,
    pub record_id: i64,
    pub warnings: usize,
}

impl IngestReceipt {
    pub fn is_error_report(&self) -> bool {
        self.kind == "error"
    }
}

/// 遥测管理器
///
/// 统一入口：分发管线负责校验与规范化，存储层负责事务写入与查询。
pub struct TelemetryManager {
    pipeline: Arc<Pipeline>,
    store: Arc<TelemetryStore>,
}

impl TelemetryManager {
    pub fn new(pipeline: Arc<Pipeline>, store: Arc<TelemetryStore>) -> Self {
        info!(
            device_types = pipeline.registry().list().len(),
            "Telemetry manager created"
        );
        Self { pipeline, store }
    }

    /// 使用内置处理器和给定注册表创建
    pub fn with_registry(db: Arc<DatabaseConnection>, registry: DeviceTypeRegistry) -> Self {
        let pipeline = Pipeline::with_builtin_handlers(Arc::new(registry));
        Self::new(Arc::new(pipeline), Arc::new(TelemetryStore::new(db)))
    }

    /// 处理并保存一条上报
    ///
    /// 校验失败时不写入任何数据。
    pub async fn ingest(&self, payload: &RawPayload) -> Result<IngestReceipt> {
        let processed = self.pipeline.process(payload).map_err(|e| {
            warn!(
                device_id = payload.device_id().unwrap_or("-"),
                error = %e,
                "Payload rejected"
            );
            e
        })?;

        let metadata = DeviceMetadata::from_payload(payload);
        let warnings = match &processed {
            Processed::Measurement { .. } => payload.warnings(),
            Processed::Error { .. } => Vec::new(),
        };

        let persisted = self.store.persist(&processed, &metadata, &warnings).await?;

        info!(
            device_id = %persisted.device.device_id,
            device_type = %processed.device_type(),
            kind = processed.kind(),
            "Telemetry ingested"
        );

        Ok(IngestReceipt {
            device_id: persisted.device.device_id,
            device_type: processed.device_type().clone(),
            kind: processed.kind(),
            record_id: persisted.record_id,
            warnings: persisted.warnings,
        })
    }

    // ========== 查询 ==========

    pub async fn get_device(&self, device_id: &str) -> Result<Option<Device>> {
        self.store.get_device(device_id).await
    }

    pub async fn list_devices(&self, device_type: Option<&DeviceType>) -> Result<Vec<Device>> {
        self.store.list_devices(device_type).await
    }

    pub async fn update_device_metadata(
        &self,
        device_id: &str,
        metadata: &DeviceMetadata,
    ) -> Result<Device> {
        self.store.update_device_metadata(device_id, metadata).await
    }

    pub async fn current_state(&self, device_id: &str) -> Result<Option<Measurement>> {
        self.store.current_state(device_id).await
    }

    pub async fn history(&self, device_id: &str, query: &HistoryQuery) -> Result<Vec<Measurement>> {
        self.store.history(device_id, query).await
    }

    pub async fn errors(&self, device_id: &str, query: &ErrorQuery) -> Result<Vec<ErrorRecord>> {
        self.store.errors(device_id, query).await
    }

    pub async fn warnings(
        &self,
        device_id: &str,
        query: &WarningQuery,
    ) -> Result<Vec<WarningRecord>> {
        self.store.warnings(device_id, query).await
    }

    pub async fn measurement_stats(
        &self,
        device_id: &str,
        from: i64,
        to: i64,
    ) -> Result<MeasurementStats> {
        self.store.measurement_stats(device_id, from, to).await
    }

    pub async fn error_stats(&self, device_id: Option<&str>) -> Result<ErrorStats> {
        self.store.error_stats(device_id).await
    }

    pub async fn overview(&self) -> Result<Overview> {
        self.store.overview().await
    }

    // ========== 辅助方法 ==========

    pub fn pipeline(&self) -> &Arc<Pipeline> {
        &self.pipeline
    }

    pub fn registry(&self) -> &DeviceTypeRegistry {
        self.pipeline.registry()
    }

    pub fn store(&self) -> &Arc<TelemetryStore> {
        &self.store
    }
}
