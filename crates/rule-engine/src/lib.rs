//! 医疗规则引擎
//!
//! 根据触发器和事实文档评估规则，支持：
//! - 可执行规则文档（FIRST 命中策略）
//! - 设计器决策表（行列网格）
//! - 决策表指针解析与单次派发内缓存
//! - stop-on-match 的顺序派发与执行日志

pub mod audit;
pub mod cli;
pub mod comparator;
pub mod dispatcher;
pub mod document;
pub mod error;
pub mod evaluator;
pub mod executor;
pub mod facts;
pub mod models;
pub mod operators;
pub mod resolver;
pub mod store;
pub mod traits;

pub use audit::{ExecutionLogRecord, ExecutionStatus, MemoryLogSink, TracingLogSink};
pub use comparator::ValueComparator;
pub use dispatcher::TriggerDispatcher;
pub use document::RulePayload;
pub use error::{Result, RuleError};
pub use evaluator::ConditionEvaluator;
pub use executor::DecisionTableExecutor;
pub use facts::FactDocument;
pub use models::{
    CALLER_MODULE_KEY, Condition, DispatchRequest, DispatchResult, EvaluationOutcome, MatchedRule,
    Outputs, RuleBinding, TriggerBindings,
};
pub use operators::Operator;
pub use resolver::{DecisionTableCache, RuleDocumentResolver};
pub use store::{CatalogBinding, InMemoryRuleStore, RuleCatalog, RuleStoreStats, TriggerDefinition};
pub use traits::{BindingSource, DecisionTableSource, ExecutionLogSink};
