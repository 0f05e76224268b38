use metrics::{counter, describe_counter};

/// 注册指标说明，exporter 安装后调用一次
pub fn describe_metrics() {
    describe_counter!(
        "upsmon_ingest_total",
        "Accepted telemetry payloads, labelled by kind (measurement or error)"
    );
    describe_counter!(
        "upsmon_ingest_rejected_total",
        "Rejected telemetry payloads, labelled by reason"
    );
    describe_counter!(
        "upsmon_rate_limited_total",
        "Requests refused by the ingest rate limiter"
    );
}

pub fn record_ingested(kind: &'static str) {
    counter!("upsmon_ingest_total", 1, "kind" => kind);
}

pub fn record_rejected(reason: &'static str) {
    counter!("upsmon_ingest_rejected_total", 1, "reason" => reason);
}
