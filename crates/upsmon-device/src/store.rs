use crate::db::{device, error_report, measurement, new_warning, warning};
use crate::model::{
    Device, DeviceMetadata, DeviceType, ErrorQuery, ErrorRecord, HistoryQuery, Measurement,
    NormalizedError, NormalizedMeasurement, Severity, WarningQuery, WarningRecord,
};
use crate::pipeline::Processed;
use crate::{DeviceError, Result};
use chrono::{DateTime, Duration, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, TransactionTrait,
};
use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tracing::{debug, info};

/// 写入或更新设备记录
///
/// 新设备直接插入；已有设备更新类型与 `last_seen`，元数据只覆盖提供的字段。
pub async fn upsert_device<C: ConnectionTrait>(
    conn: &C,
    device_id: &str,
    device_type: &DeviceType,
    metadata: &DeviceMetadata,
) -> Result<Device> {
    let now = Utc::now();
    let existing = device::Entity::find_by_id(device_id.to_string())
        .one(conn)
        .await?;

    match existing {
        Some(model) => {
            let mut device = Device::from(model);
            device.device_type = device_type.clone();
            device.last_seen = now;
            metadata.apply_to(&mut device);

            let active: device::ActiveModel = device.clone().into();
            active.update(conn).await?;
            debug!(device_id = %device_id, device_type = %device_type, "Device refreshed");
            Ok(device)
        }
        None => {
            let mut device = Device {
                device_id: device_id.to_string(),
                device_type: device_type.clone(),
                name: None,
                location: None,
                model: None,
                firmware_version: None,
                config: None,
                last_seen: now,
                created_at: now,
            };
            metadata.apply_to(&mut device);

            let active: device::ActiveModel = device.clone().into();
            device::Entity::insert(active)
                .exec_without_returning(conn)
                .await?;
            info!(device_id = %device_id, device_type = %device_type, "New device registered");
            Ok(device)
        }
    }
}

/// 追加测量记录
pub async fn append_measurement<C: ConnectionTrait>(
    conn: &C,
    record: &NormalizedMeasurement,
) -> Result<Measurement> {
    let active: measurement::ActiveModel = record.clone().into();
    let model = active.insert(conn).await?;
    Ok(model.into())
}

/// 追加错误上报
pub async fn append_error<C: ConnectionTrait>(
    conn: &C,
    record: &NormalizedError,
) -> Result<ErrorRecord> {
    let active: error_report::ActiveModel = record.clone().into();
    let model = active.insert(conn).await?;
    Ok(model.into())
}

/// 追加告警，返回写入条数
pub async fn append_warnings<C: ConnectionTrait>(
    conn: &C,
    device_id: &str,
    timestamp: i64,
    messages: &[String],
) -> Result<usize> {
    if messages.is_empty() {
        return Ok(0);
    }

    let models = messages
        .iter()
        .map(|m| new_warning(device_id, timestamp, m.clone()));
    warning::Entity::insert_many(models)
        .exec_without_returning(conn)
        .await?;
    Ok(messages.len())
}

/// 一次上报的持久化结果
#[derive(Debug, Clone, Serialize)]
pub struct Persisted {
    pub device: Device,
    /// 新记录（测量或错误）的 ID
    pub record_id: i64,
    pub warnings: usize,
}

/// 错误统计
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ErrorStats {
    pub total: u64,
    pub critical: u64,
    pub error: u64,
    pub warning: u64,
    pub info: u64,
}

impl ErrorStats {
    fn add(&mut self, severity: &str, count: u64) {
        self.total += count;
        match severity.parse::<Severity>() {
            Ok(Severity::Critical) => self.critical += count,
            Ok(Severity::Error) => self.error += count,
            Ok(Severity::Warning) => self.warning += count,
            Ok(Severity::Info) => self.info += count,
            Err(_) => {}
        }
    }
}

/// 测量统计（区间内的平均值）
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MeasurementStats {
    pub count: u64,
    pub avg_battery_voltage: Option<f64>,
    pub avg_temperature: Option<f64>,
    pub avg_efficiency: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DeviceTotals {
    pub total_devices: u64,
    pub device_types: u64,
    /// 最近一小时内有上报的设备
    pub active_devices: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MeasurementTotals {
    pub total_measurements: u64,
    pub devices_with_data: u64,
    pub first_measurement: Option<i64>,
    pub last_measurement: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusCount {
    pub status: String,
    pub count: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeviceSummary {
    pub device_id: String,
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub device_type: DeviceType,
    pub last_seen: DateTime<Utc>,
    pub current_status: String,
    pub error_count: u64,
}

/// 全局概览
#[derive(Debug, Clone, Serialize)]
pub struct Overview {
    pub devices: DeviceTotals,
    pub measurements: MeasurementTotals,
    pub errors: ErrorStats,
    pub statuses: Vec<StatusCount>,
    pub devices_detail: Vec<DeviceSummary>,
}

/// 遥测数据存储
///
/// 负责设备、测量、错误和告警的写入与查询。
/// 写入单次上报时所有表在同一事务内完成。
pub struct TelemetryStore {
    db: Arc<DatabaseConnection>,
}

impl TelemetryStore {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    pub fn connection(&self) -> &DatabaseConnection {
        &self.db
    }

    /// 在一个事务内保存处理结果
    ///
    /// 任何一步失败都会回滚，不会留下部分写入的数据。
    pub async fn persist(
        &self,
        processed: &Processed,
        metadata: &DeviceMetadata,
        warnings: &[String],
    ) -> Result<Persisted> {
        let txn = self.db.begin().await?;

        let device = upsert_device(
            &txn,
            processed.device_id(),
            processed.device_type(),
            metadata,
        )
        .await?;

        let (record_id, warning_count) = match processed {
            Processed::Measurement { record, .. } => {
                let stored = append_measurement(&txn, record).await?;
                let count =
                    append_warnings(&txn, &record.device_id, record.timestamp, warnings).await?;
                (stored.id, count)
            }
            Processed::Error { record, .. } => {
                let stored = append_error(&txn, record).await?;
                (stored.id, 0)
            }
        };

        txn.commit().await?;

        debug!(
            device_id = %device.device_id,
            kind = processed.kind(),
            record_id,
            warnings = warning_count,
            "Telemetry persisted"
        );

        Ok(Persisted {
            device,
            record_id,
            warnings: warning_count,
        })
    }

    // ========== 设备 ==========

    pub async fn get_device(&self, device_id: &str) -> Result<Option<Device>> {
        let model = device::Entity::find_by_id(device_id.to_string())
            .one(&*self.db)
            .await?;
        Ok(model.map(Device::from))
    }

    /// 列出设备，按最后上报时间倒序
    pub async fn list_devices(&self, device_type: Option<&DeviceType>) -> Result<Vec<Device>> {
        let mut query = device::Entity::find();
        if let Some(device_type) = device_type {
            query = query.filter(device::Column::DeviceType.eq(device_type.as_str()));
        }

        let models = query
            .order_by_desc(device::Column::LastSeen)
            .all(&*self.db)
            .await?;
        Ok(models.into_iter().map(Device::from).collect())
    }

    /// 更新设备元数据（不影响 `last_seen`）
    pub async fn update_device_metadata(
        &self,
        device_id: &str,
        metadata: &DeviceMetadata,
    ) -> Result<Device> {
        let mut device = self
            .get_device(device_id)
            .await?
            .ok_or_else(|| DeviceError::NotFound(device_id.to_string()))?;

        metadata.apply_to(&mut device);
        let active: device::ActiveModel = device.clone().into();
        active.update(&*self.db).await?;

        info!(device_id = %device_id, "Device metadata updated");
        Ok(device)
    }

    // ========== 测量 ==========

    /// 设备的最新测量（按设备端时间戳）
    pub async fn current_state(&self, device_id: &str) -> Result<Option<Measurement>> {
        let model = measurement::Entity::find()
            .filter(measurement::Column::DeviceId.eq(device_id))
            .order_by_desc(measurement::Column::Timestamp)
            .order_by_desc(measurement::Column::Id)
            .one(&*self.db)
            .await?;
        Ok(model.map(Measurement::from))
    }

    /// 历史测量，最新的在前
    pub async fn history(&self, device_id: &str, query: &HistoryQuery) -> Result<Vec<Measurement>> {
        let mut select =
            measurement::Entity::find().filter(measurement::Column::DeviceId.eq(device_id));
        if let Some(from) = query.from {
            select = select.filter(measurement::Column::Timestamp.gte(from));
        }
        if let Some(to) = query.to {
            select = select.filter(measurement::Column::Timestamp.lte(to));
        }

        let models = select
            .order_by_desc(measurement::Column::Timestamp)
            .order_by_desc(measurement::Column::Id)
            .limit(query.limit)
            .all(&*self.db)
            .await?;
        Ok(models.into_iter().map(Measurement::from).collect())
    }

    /// 区间内的测量统计
    ///
    /// 只对数值字段求平均，缺失或非数值的记录不参与。
    pub async fn measurement_stats(
        &self,
        device_id: &str,
        from: i64,
        to: i64,
    ) -> Result<MeasurementStats> {
        let models = measurement::Entity::find()
            .filter(measurement::Column::DeviceId.eq(device_id))
            .filter(measurement::Column::Timestamp.gte(from))
            .filter(measurement::Column::Timestamp.lte(to))
            .all(&*self.db)
            .await?;

        let average = |path: &[&str]| {
            let values: Vec<f64> = models
                .iter()
                .filter_map(|m| {
                    path.iter()
                        .try_fold(&m.data, |v, key| v.get(key))
                        .and_then(Value::as_f64)
                })
                .collect();
            if values.is_empty() {
                None
            } else {
                Some(values.iter().sum::<f64>() / values.len() as f64)
            }
        };

        Ok(MeasurementStats {
            count: models.len() as u64,
            avg_battery_voltage: average(&["battery", "voltage"]),
            avg_temperature: average(&["temperature"]),
            avg_efficiency: average(&["efficiency"]),
        })
    }

    // ========== 错误与告警 ==========

    /// 错误记录，最新的在前
    pub async fn errors(&self, device_id: &str, query: &ErrorQuery) -> Result<Vec<ErrorRecord>> {
        let mut select =
            error_report::Entity::find().filter(error_report::Column::DeviceId.eq(device_id));
        if let Some(severity) = query.severity {
            select = select.filter(error_report::Column::Severity.eq(severity.as_str()));
        }

        let models = select
            .order_by_desc(error_report::Column::Timestamp)
            .order_by_desc(error_report::Column::Id)
            .limit(query.limit)
            .all(&*self.db)
            .await?;
        Ok(models.into_iter().map(ErrorRecord::from).collect())
    }

    /// 告警记录，最新的在前
    pub async fn warnings(
        &self,
        device_id: &str,
        query: &WarningQuery,
    ) -> Result<Vec<WarningRecord>> {
        let mut select = warning::Entity::find().filter(warning::Column::DeviceId.eq(device_id));
        if let Some(resolved) = query.resolved {
            select = select.filter(warning::Column::Resolved.eq(resolved));
        }

        let models = select
            .order_by_desc(warning::Column::Timestamp)
            .order_by_desc(warning::Column::Id)
            .limit(query.limit)
            .all(&*self.db)
            .await?;
        Ok(models.into_iter().map(WarningRecord::from).collect())
    }

    /// 按严重级别统计错误，`device_id` 为空时统计全部设备
    pub async fn error_stats(&self, device_id: Option<&str>) -> Result<ErrorStats> {
        let mut select = error_report::Entity::find()
            .select_only()
            .column(error_report::Column::Severity)
            .column_as(Expr::col(error_report::Column::Id).count(), "count")
            .group_by(error_report::Column::Severity);
        if let Some(device_id) = device_id {
            select = select.filter(error_report::Column::DeviceId.eq(device_id));
        }

        let rows: Vec<(String, i64)> = select.into_tuple().all(&*self.db).await?;

        let mut stats = ErrorStats::default();
        for (severity, count) in rows {
            stats.add(&severity, count.max(0) as u64);
        }
        Ok(stats)
    }

    // ========== 概览 ==========

    /// 汇总所有设备的统计信息
    pub async fn overview(&self) -> Result<Overview> {
        let devices = self.list_devices(None).await?;

        let active_since = Utc::now() - Duration::hours(1);
        let device_types: BTreeSet<&str> =
            devices.iter().map(|d| d.device_type.as_str()).collect();
        let device_totals = DeviceTotals {
            total_devices: devices.len() as u64,
            device_types: device_types.len() as u64,
            active_devices: devices.iter().filter(|d| d.last_seen > active_since).count() as u64,
        };

        // 每个设备的测量数量与时间范围
        let per_device: Vec<(String, i64, i64, i64)> = measurement::Entity::find()
            .select_only()
            .column(measurement::Column::DeviceId)
            .column_as(Expr::col(measurement::Column::Id).count(), "count")
            .column_as(Expr::col(measurement::Column::Timestamp).min(), "first")
            .column_as(Expr::col(measurement::Column::Timestamp).max(), "last")
            .group_by(measurement::Column::DeviceId)
            .into_tuple()
            .all(&*self.db)
            .await?;

        let measurement_totals = MeasurementTotals {
            total_measurements: per_device.iter().map(|(_, c, _, _)| (*c).max(0) as u64).sum(),
            devices_with_data: per_device.len() as u64,
            first_measurement: per_device.iter().map(|(_, _, first, _)| *first).min(),
            last_measurement: per_device.iter().map(|(_, _, _, last)| *last).max(),
        };

        let status_rows: Vec<(String, i64)> = measurement::Entity::find()
            .select_only()
            .column(measurement::Column::Status)
            .column_as(Expr::col(measurement::Column::Id).count(), "count")
            .group_by(measurement::Column::Status)
            .order_by_asc(measurement::Column::Status)
            .into_tuple()
            .all(&*self.db)
            .await?;
        let statuses = status_rows
            .into_iter()
            .map(|(status, count)| StatusCount {
                status,
                count: count.max(0) as u64,
            })
            .collect();

        let error_rows: Vec<(String, i64)> = error_report::Entity::find()
            .select_only()
            .column(error_report::Column::DeviceId)
            .column_as(Expr::col(error_report::Column::Id).count(), "count")
            .group_by(error_report::Column::DeviceId)
            .into_tuple()
            .all(&*self.db)
            .await?;
        let error_counts: HashMap<String, u64> = error_rows
            .into_iter()
            .map(|(id, count)| (id, count.max(0) as u64))
            .collect();

        let mut devices_detail = Vec::with_capacity(devices.len());
        for device in devices {
            let current_status = self
                .current_state(&device.device_id)
                .await?
                .map(|m| m.status.to_string())
                .unwrap_or_else(|| "unknown".to_string());
            devices_detail.push(DeviceSummary {
                error_count: error_counts.get(&device.device_id).copied().unwrap_or(0),
                device_id: device.device_id,
                name: device.name,
                device_type: device.device_type,
                last_seen: device.last_seen,
                current_status,
            });
        }

        Ok(Overview {
            devices: device_totals,
            measurements: measurement_totals,
            errors: self.error_stats(None).await?,
            statuses,
            devices_detail,
        })
    }

    /// 统计设备总数
    pub async fn count_devices(&self) -> Result<u64> {
        Ok(device::Entity::find().count(&*self.db).await?)
    }
}
