//! 日志初始化与操作日志
//!
//! 操作日志记录每次业务操作的类型、详情、耗时和执行状态，
//! 以结构化 tracing 事件输出，级别由状态决定。

use std::fmt;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use crate::config::LoggingConfig;

/// 安装全局订阅器，`RUST_LOG` 优先于配置级别；重复调用返回 false
pub fn init_logging(config: &LoggingConfig) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(config.ansi)
        .with_target(false)
        .compact()
        .try_init()
        .is_ok()
}

/// 操作执行状态
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum OperationStatus {
    #[serde(rename = "成功")]
    Success,
    #[serde(rename = "失败")]
    Failure,
    #[serde(rename = "警告")]
    Warning,
}

impl OperationStatus {
    pub fn label(&self) -> &'static str {
        match self {
            OperationStatus::Success => "成功",
            OperationStatus::Failure => "失败",
            OperationStatus::Warning => "警告",
        }
    }
}

impl fmt::Display for OperationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// 操作日志记录
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationRecord {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    /// 操作类型，如 chat / risk_assessment
    pub operation_type: String,
    pub details: serde_json::Value,
    pub patient_id: Option<String>,
    pub execution_ms: u64,
    pub status: OperationStatus,
}

impl OperationRecord {
    pub fn new(operation_type: impl Into<String>, details: serde_json::Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            operation_type: operation_type.into(),
            details,
            patient_id: None,
            execution_ms: 0,
            status: OperationStatus::Success,
        }
    }

    pub fn with_patient(mut self, patient_id: Option<&str>) -> Self {
        self.patient_id = patient_id.map(str::to_string);
        self
    }

    pub fn with_status(mut self, status: OperationStatus) -> Self {
        self.status = status;
        self
    }

    /// 以起始时刻计算耗时
    pub fn finished(mut self, started: Instant) -> Self {
        self.execution_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        self
    }
}

/// 输出操作日志
pub fn log_operation(record: &OperationRecord) {
    let details = record.details.to_string();
    let patient_id = record.patient_id.as_deref().unwrap_or("-");

    match record.status {
        OperationStatus::Success => info!(
            id = %record.id,
            operation = %record.operation_type,
            patient_id = %patient_id,
            execution_ms = record.execution_ms,
            details = %details,
            "Operation completed"
        ),
        OperationStatus::Warning => warn!(
            id = %record.id,
            operation = %record.operation_type,
            patient_id = %patient_id,
            execution_ms = record.execution_ms,
            details = %details,
            "Operation completed with warnings"
        ),
        OperationStatus::Failure => error!(
            id = %record.id,
            operation = %record.operation_type,
            patient_id = %patient_id,
            execution_ms = record.execution_ms,
            details = %details,
            "Operation failed"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_record_builder() {
        let started = Instant::now();
        let record = OperationRecord::new("risk_assessment", json!({"overall": "很高危"}))
            .with_patient(Some("P001"))
            .with_status(OperationStatus::Warning)
            .finished(started);

        assert_eq!(record.patient_id.as_deref(), Some("P001"));
        assert_eq!(record.status.label(), "警告");
        assert!(record.execution_ms < 60_000);

        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["status"], "警告");
        assert_eq!(value["details"]["overall"], "很高危");
        log_operation(&record);
    }

    #[test]
    fn test_init_logging_is_idempotent() {
        let config = LoggingConfig::default();
        let first = init_logging(&config);
        // 第二次安装必然失败，但不会 panic
        assert!(!init_logging(&config) || !first);
    }
}
