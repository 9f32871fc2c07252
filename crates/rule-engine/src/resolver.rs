//! 规则文档解析器
//!
//! 把一条规则的存储内容解析为可评估的形式：可执行文档直接评估；
//! 决策表指针先查本次派发的缓存，未命中再调用外部来源加载，
//! 加载结果（包括“不存在”）都会写入缓存。

use crate::document::RulePayload;
use crate::error::Result;
use crate::executor::DecisionTableExecutor;
use crate::facts::FactDocument;
use crate::models::EvaluationOutcome;
use crate::traits::DecisionTableSource;
use serde_json::Value;
use std::collections::HashMap;
use tracing::{debug, warn};

/// 决策表解析缓存
///
/// 作用域是一次派发调用，不在并发派发之间共享，因此不需要同步。
#[derive(Debug, Default)]
pub struct DecisionTableCache {
    entries: HashMap<String, Option<Value>>,
    hits: u64,
    misses: u64,
}

impl DecisionTableCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    /// 已解析的决策表，`None` 表示未缓存或缓存的是“不存在”
    pub fn get(&self, id: &str) -> Option<&Value> {
        self.entries.get(id).and_then(Option::as_ref)
    }

    pub fn insert(&mut self, id: impl Into<String>, table: Option<Value>) {
        self.entries.insert(id.into(), table);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn misses(&self) -> u64 {
        self.misses
    }
}

/// 规则文档解析器
pub struct RuleDocumentResolver {
    executor: DecisionTableExecutor,
}

impl RuleDocumentResolver {
    pub fn new(executor: DecisionTableExecutor) -> Self {
        Self { executor }
    }

    pub fn executor(&self) -> &DecisionTableExecutor {
        &self.executor
    }

    /// 解析并评估一条规则
    ///
    /// 只有外部来源加载失败会返回错误；结构不合法、指针无法解析都降级为未命中。
    pub async fn resolve(
        &self,
        rule_json: &Value,
        facts: &FactDocument,
        source: &dyn DecisionTableSource,
        cache: &mut DecisionTableCache,
    ) -> Result<EvaluationOutcome> {
        let payload = RulePayload::classify(rule_json);

        let table_id = match payload {
            RulePayload::Executable(rules) => return Ok(self.executor.execute_rules(rules, facts)),
            RulePayload::Pointer(_) => payload.table_id(),
            RulePayload::DesignerGrid(_) | RulePayload::Unrecognized => None,
        };

        let Some(table_id) = table_id else {
            debug!(kind = payload.kind(), "规则文档无法直接评估，视为未命中");
            return Ok(EvaluationOutcome::not_matched());
        };

        if cache.contains(&table_id) {
            cache.hits += 1;
            metrics::counter!("decision_table_lookups_total", "result" => "hit").increment(1);
        } else {
            cache.misses += 1;
            metrics::counter!("decision_table_lookups_total", "result" => "miss").increment(1);

            let raw = source.load_decision_table_json(&table_id).await?;
            let table = raw.as_deref().and_then(|json| parse_table(&table_id, json));
            cache.insert(table_id.clone(), table);
        }

        let Some(table) = cache.get(&table_id) else {
            debug!(table_id = %table_id, "决策表不存在，视为未命中");
            return Ok(EvaluationOutcome::not_matched());
        };

        Ok(self.evaluate_table(&table_id, table, facts))
    }

    /// 评估已加载的决策表
    fn evaluate_table(&self, table_id: &str, table: &Value, facts: &FactDocument) -> EvaluationOutcome {
        match RulePayload::classify(table) {
            RulePayload::Executable(rules) => self.executor.execute_rules(rules, facts),
            RulePayload::DesignerGrid(grid) => self.executor.execute_grid(grid, facts),
            other => {
                // 决策表不能再指向另一个决策表
                debug!(table_id, kind = other.kind(), "决策表结构无法识别，视为未命中");
                EvaluationOutcome::not_matched()
            }
        }
    }
}

impl Default for RuleDocumentResolver {
    fn default() -> Self {
        Self::new(DecisionTableExecutor::new())
    }
}

/// 解析决策表 JSON，空内容或 null 视为不存在
fn parse_table(table_id: &str, json: &str) -> Option<Value> {
    if json.trim().is_empty() {
        return None;
    }

    match serde_json::from_str::<Value>(json) {
        Ok(Value::Null) => None,
        Ok(value) => Some(value),
        Err(e) => {
            warn!(table_id, error = %e, "决策表 JSON 解析失败，视为未命中");
            None
        }
    }
}
