pub mod db;
pub mod device_types;
pub mod error;
pub mod handler;
pub mod manager;
pub mod model;
pub mod payload;
pub mod pipeline;
pub mod store;

pub use db::{device, error_report, measurement, setup_schema, warning};
pub use device_types::{DeviceTypeDescriptor, DeviceTypeRegistry};
pub use error::{DeviceError, Result};
pub use handler::{DeviceHandler, ErrorReporter, FallbackHandler, UpsHandler};
pub use manager::{IngestReceipt, TelemetryManager};
pub use model::{
    Device, DeviceMetadata, DeviceType, ErrorQuery, ErrorRecord, HistoryQuery, Measurement,
    MeasurementStatus, NormalizedError, NormalizedMeasurement, Severity, WarningQuery,
    WarningRecord,
};
pub use payload::RawPayload;
pub use pipeline::{Pipeline, Processed};
pub use store::{ErrorStats, MeasurementStats, Overview, Persisted, TelemetryStore};
