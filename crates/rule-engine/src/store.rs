//! 内存规则目录
//!
//! 使用 DashMap 保存触发器与决策表，实现 `BindingSource` 和 `DecisionTableSource`。
//! 真实部署中这部分由外部存储负责，这里承担同样的过滤职责：
//! 停用的触发器不返回绑定，停用或已删除的绑定被丢弃，结果按 sequence 升序。

use crate::error::{Result, RuleError};
use crate::models::{RuleBinding, TriggerBindings};
use crate::traits::{BindingSource, DecisionTableSource};
use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

fn default_true() -> bool {
    true
}

/// 规则目录文件
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RuleCatalog {
    pub triggers: Vec<TriggerDefinition>,
    /// 决策表 ID → 决策表内容（JSON 对象或 JSON 文本）
    pub decision_tables: BTreeMap<String, Value>,
}

/// 触发器定义
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerDefinition {
    pub trigger_key: String,
    #[serde(default)]
    pub module: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub bindings: Vec<CatalogBinding>,
}

impl TriggerDefinition {
    pub fn new(trigger_key: impl Into<String>) -> Self {
        Self {
            trigger_key: trigger_key.into(),
            module: None,
            is_active: true,
            bindings: Vec::new(),
        }
    }

    pub fn with_module(mut self, module: impl Into<String>) -> Self {
        self.module = Some(module.into());
        self
    }

    pub fn with_binding(mut self, binding: CatalogBinding) -> Self {
        self.bindings.push(binding);
        self
    }

    pub fn inactive(mut self) -> Self {
        self.is_active = false;
        self
    }

    /// 参与评估的绑定，已按 sequence 排序
    fn active_bindings(&self) -> Vec<RuleBinding> {
        if !self.is_active {
            return Vec::new();
        }

        let mut bindings: Vec<RuleBinding> = self
            .bindings
            .iter()
            .filter(|b| b.is_active && !b.is_deleted)
            .map(CatalogBinding::to_rule_binding)
            .collect();
        bindings.sort_by_key(|b| b.sequence);
        bindings
    }
}

/// 目录中的触发器→规则绑定
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogBinding {
    pub rule_id: String,
    #[serde(default)]
    pub rule_name: Option<String>,
    #[serde(default)]
    pub rule_type: Option<String>,
    #[serde(default)]
    pub sequence: i32,
    #[serde(default)]
    pub stop_on_match: bool,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub is_deleted: bool,
    #[serde(default)]
    pub rule: Value,
}

impl CatalogBinding {
    pub fn new(rule_id: impl Into<String>, sequence: i32, rule: Value) -> Self {
        Self {
            rule_id: rule_id.into(),
            rule_name: None,
            rule_type: None,
            sequence,
            stop_on_match: false,
            is_active: true,
            is_deleted: false,
            rule,
        }
    }

    pub fn stop_on_match(mut self) -> Self {
        self.stop_on_match = true;
        self
    }

    fn to_rule_binding(&self) -> RuleBinding {
        RuleBinding {
            rule_id: self.rule_id.clone(),
            rule_name: self.rule_name.clone(),
            rule_type: self.rule_type.clone(),
            sequence: self.sequence,
            stop_on_match: self.stop_on_match,
            rule_json: self.rule.clone(),
        }
    }
}

/// 内存规则存储
#[derive(Clone, Default)]
pub struct InMemoryRuleStore {
    triggers: Arc<DashMap<String, TriggerDefinition>>,
    decision_tables: Arc<DashMap<String, Value>>,
}

impl InMemoryRuleStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 触发器数量
    pub fn len(&self) -> usize {
        self.triggers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triggers.is_empty()
    }

    /// 从文件加载目录，返回加载的触发器数量
    #[instrument(skip(self, path), fields(path = %path.as_ref().display()))]
    pub fn load_catalog(&self, path: impl AsRef<Path>) -> Result<usize> {
        let content = std::fs::read_to_string(path.as_ref())?;
        self.load_catalog_json(&content)
    }

    /// 从 JSON 文本加载目录
    ///
    /// 同名触发器覆盖已有定义；目录整体校验通过后才写入存储。
    #[instrument(skip(self, json))]
    pub fn load_catalog_json(&self, json: &str) -> Result<usize> {
        let catalog: RuleCatalog =
            serde_json::from_str(json).map_err(|e| RuleError::ParseError(e.to_string()))?;
        validate(&catalog)?;

        let count = catalog.triggers.len();
        for trigger in catalog.triggers {
            self.triggers.insert(trigger.trigger_key.clone(), trigger);
        }
        let tables = catalog.decision_tables.len();
        for (id, table) in catalog.decision_tables {
            self.decision_tables.insert(id, table);
        }

        info!("规则目录已加载: {} 个触发器, {} 张决策表", count, tables);
        Ok(count)
    }

    /// 新增或替换触发器
    #[instrument(skip(self, trigger), fields(trigger_key = %trigger.trigger_key))]
    pub fn upsert_trigger(&self, trigger: TriggerDefinition) -> Result<()> {
        if trigger.trigger_key.trim().is_empty() {
            return Err(RuleError::InvalidCatalog("triggerKey 不能为空".to_string()));
        }
        self.triggers.insert(trigger.trigger_key.clone(), trigger);
        Ok(())
    }

    /// 删除触发器
    #[instrument(skip(self))]
    pub fn remove_trigger(&self, trigger_key: &str) -> Result<()> {
        if self.triggers.remove(trigger_key).is_some() {
            info!("触发器已删除: {}", trigger_key);
            Ok(())
        } else {
            warn!("删除不存在的触发器: {}", trigger_key);
            Err(RuleError::TriggerNotFound(trigger_key.to_string()))
        }
    }

    pub fn put_decision_table(&self, id: impl Into<String>, table: Value) {
        self.decision_tables.insert(id.into(), table);
    }

    /// 删除决策表，返回是否存在
    pub fn remove_decision_table(&self, id: &str) -> bool {
        self.decision_tables.remove(id).is_some()
    }

    /// 所有触发器键（已排序）
    pub fn trigger_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.triggers.iter().map(|t| t.key().clone()).collect();
        keys.sort();
        keys
    }

    pub fn stats(&self) -> RuleStoreStats {
        let mut stats = RuleStoreStats {
            triggers_count: self.triggers.len(),
            decision_tables_count: self.decision_tables.len(),
            ..Default::default()
        };

        for trigger in self.triggers.iter() {
            if trigger.is_active {
                stats.active_triggers += 1;
            }
            stats.bindings_count += trigger.bindings.len();
            stats.active_bindings += trigger.active_bindings().len();
        }

        stats
    }
}

fn validate(catalog: &RuleCatalog) -> Result<()> {
    let mut seen = HashSet::new();
    for trigger in &catalog.triggers {
        if trigger.trigger_key.trim().is_empty() {
            return Err(RuleError::InvalidCatalog("triggerKey 不能为空".to_string()));
        }
        if !seen.insert(trigger.trigger_key.as_str()) {
            return Err(RuleError::InvalidCatalog(format!(
                "重复的 triggerKey: {}",
                trigger.trigger_key
            )));
        }
        if let Some(binding) = trigger.bindings.iter().find(|b| b.rule_id.trim().is_empty()) {
            return Err(RuleError::InvalidCatalog(format!(
                "触发器 {} 存在空 ruleId 的绑定 (sequence {})",
                trigger.trigger_key, binding.sequence
            )));
        }
    }
    Ok(())
}

#[async_trait]
impl BindingSource for InMemoryRuleStore {
    async fn load_active_bindings(&self, trigger_key: &str) -> Result<TriggerBindings> {
        let loaded = self
            .triggers
            .get(trigger_key)
            .map(|t| TriggerBindings::new(t.module.clone(), t.active_bindings()))
            .unwrap_or_default();

        debug!(trigger_key, count = loaded.bindings.len(), "加载有效绑定");
        Ok(loaded)
    }
}

#[async_trait]
impl DecisionTableSource for InMemoryRuleStore {
    async fn load_decision_table_json(&self, id: &str) -> Result<Option<String>> {
        Ok(self.decision_tables.get(id).map(|table| match table.value() {
            Value::String(text) => text.clone(),
            other => other.to_string(),
        }))
    }
}

/// 存储统计信息
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleStoreStats {
    pub triggers_count: usize,
    pub active_triggers: usize,
    pub bindings_count: usize,
    /// 参与评估的绑定数
    pub active_bindings: usize,
    pub decision_tables_count: usize,
}
