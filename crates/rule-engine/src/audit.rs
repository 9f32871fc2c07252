//! 执行日志
//!
//! 每次触发器派发（无论成功失败）产生一条执行日志记录，包含事实与结果
//! 快照，便于审计和回放。引擎只定义记录结构，持久化由外部 sink 负责。

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use tracing::info;
use uuid::Uuid;

use crate::error::Result;
use crate::traits::ExecutionLogSink;

/// 执行状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Matched,
    NotMatched,
    Failed,
}

impl ExecutionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Matched => "matched",
            Self::NotMatched => "not_matched",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 执行日志记录
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionLogRecord {
    pub correlation_id: Uuid,
    pub trigger_key: String,
    pub module: Option<String>,
    pub requested_by: Option<String>,
    #[serde(default)]
    pub request_metadata: BTreeMap<String, String>,
    /// 事实快照
    pub facts: Value,
    /// 评估结果快照，失败时为空
    pub outcome: Option<Value>,
    pub status: ExecutionStatus,
    pub matched_rule_id: Option<String>,
    pub matched_rule_name: Option<String>,
    pub evaluated_rule_ids: Vec<String>,
    pub executed_at: DateTime<Utc>,
    pub elapsed_ms: i64,
    pub error_message: Option<String>,
}

/// 通过 tracing 输出执行日志
///
/// 每条记录输出一条结构化 info 事件，由日志管道负责采集落盘。
#[derive(Debug, Clone, Default)]
pub struct TracingLogSink;

impl TracingLogSink {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ExecutionLogSink for TracingLogSink {
    async fn emit(&self, record: ExecutionLogRecord) -> Result<()> {
        let payload = serde_json::to_string(&record)?;

        info!(
            target: "rule_engine::execution_log",
            correlation_id = %record.correlation_id,
            trigger_key = %record.trigger_key,
            status = %record.status,
            matched_rule_id = record.matched_rule_id.as_deref().unwrap_or(""),
            elapsed_ms = record.elapsed_ms,
            record = %payload,
            "规则执行日志"
        );

        Ok(())
    }
}

/// 内存执行日志 sink，用于测试与本地回放
#[derive(Debug, Default)]
pub struct MemoryLogSink {
    records: Mutex<Vec<ExecutionLogRecord>>,
}

impl MemoryLogSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// 已记录的日志（按写入顺序）
    pub fn records(&self) -> Vec<ExecutionLogRecord> {
        self.records.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }

    /// 按关联 ID 查找
    pub fn find(&self, correlation_id: Uuid) -> Option<ExecutionLogRecord> {
        self.records
            .lock()
            .iter()
            .find(|r| r.correlation_id == correlation_id)
            .cloned()
    }
}

#[async_trait]
impl ExecutionLogSink for MemoryLogSink {
    async fn emit(&self, record: ExecutionLogRecord) -> Result<()> {
        self.records.lock().push(record);
        Ok(())
    }
}
