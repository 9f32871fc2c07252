//! 外部依赖 Trait 定义
//!
//! 规则、触发器、决策表的持久化与执行日志的存储都不属于引擎，
//! 由宿主系统通过这些接口提供，便于测试时注入 mock 实现。

use async_trait::async_trait;

use crate::audit::ExecutionLogRecord;
use crate::error::Result;
use crate::models::TriggerBindings;

/// 触发器绑定来源
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BindingSource: Send + Sync {
    /// 加载触发器的有效绑定及触发器所属模块
    ///
    /// 绑定已过滤掉停用/删除的规则、触发器和绑定，并按 sequence 升序排列。
    async fn load_active_bindings(&self, trigger_key: &str) -> Result<TriggerBindings>;
}

/// 决策表来源
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DecisionTableSource: Send + Sync {
    /// 按 ID 加载决策表 JSON，`None` 表示不存在（不是错误）
    async fn load_decision_table_json(&self, id: &str) -> Result<Option<String>>;
}

/// 执行日志 sink
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ExecutionLogSink: Send + Sync {
    /// 写出一条执行日志，失败由调用方记录后忽略
    async fn emit(&self, record: ExecutionLogRecord) -> Result<()>;
}
