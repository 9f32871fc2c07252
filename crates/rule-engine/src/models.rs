//! 规则引擎领域模型
//!
//! 规则文档以 JSON 形式存储，结构由外部规则管理后台决定。
//! 这里的类型只描述引擎实际读取的字段，其余字段原样忽略。

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

fn default_enabled() -> bool {
    true
}

/// 条件：字段路径 + 操作符 + 期望值
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    pub field_path: String,
    pub operator: String,
    #[serde(default)]
    pub value: Value,
    /// 类型提示（string / number / date），比较器不强制使用
    #[serde(default)]
    pub data_type: Option<String>,
}

impl Condition {
    pub fn new(field_path: impl Into<String>, operator: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            field_path: field_path.into(),
            operator: operator.into(),
            value: value.into(),
            data_type: None,
        }
    }

    pub fn with_data_type(mut self, data_type: impl Into<String>) -> Self {
        self.data_type = Some(data_type.into());
        self
    }
}

/// 可执行规则文档中的子规则（编译形式决策表的一行）
///
/// 字段逐个从原始 JSON 读取，类型不符时按缺省处理：
/// `enabled` 不是布尔值视为启用，`priority` 不是整数视为缺省，
/// `then` 不是对象视为无输出。只有条件容器缺失或不合法会让子规则被跳过。
#[derive(Debug, Clone)]
pub struct SubRule {
    pub name: Option<String>,
    pub enabled: bool,
    /// 数值越小优先级越高，缺省排在最后
    pub priority: Option<i64>,
    /// 条件容器，`None` 表示缺失或不合法
    pub conditions: Option<Vec<Condition>>,
    pub then: Option<Map<String, Value>>,
}

impl SubRule {
    /// 从原始 JSON 读取子规则，非对象返回 `None`
    pub fn from_value(raw: &Value) -> Option<Self> {
        let object = raw.as_object()?;

        Some(Self {
            name: object.get("name").and_then(Value::as_str).map(str::to_string),
            enabled: object.get("enabled").and_then(Value::as_bool).unwrap_or(true),
            priority: object.get("priority").and_then(Value::as_i64),
            conditions: condition_container(raw),
            then: object.get("then").and_then(Value::as_object).cloned(),
        })
    }

    /// 条件容器，`all` 优先，`when.all` 作为别名
    pub fn conditions(&self) -> Option<&[Condition]> {
        self.conditions.as_deref()
    }

    /// 用于追踪输出的标识
    pub fn label(&self, index: usize) -> String {
        match &self.name {
            Some(name) => format!("rules[{}]({})", index, name),
            None => format!("rules[{}]", index),
        }
    }
}

/// 读取条件容器，任一条件无法解析时整个容器视为不合法
fn condition_container(raw: &Value) -> Option<Vec<Condition>> {
    let container = raw
        .get("all")
        .and_then(Value::as_array)
        .or_else(|| raw.pointer("/when/all").and_then(Value::as_array))?;

    container
        .iter()
        .map(|c| serde_json::from_value(c.clone()).ok())
        .collect()
}

/// 设计器表格列类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    Condition,
    Result,
    #[serde(other)]
    Other,
}

/// 设计器表格列
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GridColumn {
    pub id: String,
    pub kind: ColumnKind,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub mapped_field_path: Option<String>,
    /// 结果列的输出键
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default = "default_enabled")]
    pub is_enabled: bool,
}

/// 设计器表格行
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridRow {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// 列 ID -> 单元格值
    #[serde(default)]
    pub cells: Map<String, Value>,
}

impl GridRow {
    /// 单元格是否为空（空白单元格在条件列上是通配符）
    pub fn is_blank(&self, column_id: &str) -> bool {
        match self.cells.get(column_id) {
            None | Some(Value::Null) => true,
            Some(Value::String(s)) => s.trim().is_empty(),
            Some(_) => false,
        }
    }
}

/// 输出映射：输出键 -> 值（null 显式保留）
pub type Outputs = BTreeMap<String, Option<String>>;

/// 评估结果
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationOutcome {
    pub matched: bool,
    pub outputs: Outputs,
    pub matched_rule_id: Option<String>,
    pub evaluated_rule_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub trace: Vec<String>,
}

impl EvaluationOutcome {
    /// 未命中
    pub fn not_matched() -> Self {
        Self::default()
    }

    /// 命中并携带输出
    pub fn matched(outputs: Outputs) -> Self {
        Self {
            matched: true,
            outputs,
            ..Default::default()
        }
    }

    /// 附加追踪信息
    pub fn with_trace(mut self, trace: Vec<String>) -> Self {
        self.trace = trace;
        self
    }
}

/// 触发器与规则的绑定（外部存储已过滤为有效绑定）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleBinding {
    pub rule_id: String,
    #[serde(default)]
    pub rule_name: Option<String>,
    /// realtime / batch，仅作说明，引擎不据此区分行为
    #[serde(default)]
    pub rule_type: Option<String>,
    pub sequence: i32,
    #[serde(default)]
    pub stop_on_match: bool,
    pub rule_json: Value,
}

impl RuleBinding {
    pub fn new(rule_id: impl Into<String>, sequence: i32, rule_json: Value) -> Self {
        Self {
            rule_id: rule_id.into(),
            rule_name: None,
            rule_type: None,
            sequence,
            stop_on_match: false,
            rule_json,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.rule_name = Some(name.into());
        self
    }

    pub fn stop_on_match(mut self) -> Self {
        self.stop_on_match = true;
        self
    }
}

/// 一个触发器的有效绑定及其所属模块
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerBindings {
    /// 触发器所属模块，未知触发器为 `None`
    pub module: Option<String>,
    pub bindings: Vec<RuleBinding>,
}

impl TriggerBindings {
    pub fn new(module: Option<String>, bindings: Vec<RuleBinding>) -> Self {
        Self { module, bindings }
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

impl From<Vec<RuleBinding>> for TriggerBindings {
    fn from(bindings: Vec<RuleBinding>) -> Self {
        Self::new(None, bindings)
    }
}

/// 命中的规则
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchedRule {
    pub rule_id: String,
    pub rule_name: Option<String>,
}

/// 请求元数据中调用方模块的键
pub const CALLER_MODULE_KEY: &str = "callerModule";

/// 触发器派发请求
#[derive(Debug, Clone)]
pub struct DispatchRequest {
    pub trigger_key: String,
    pub facts: Value,
    pub requested_by: Option<String>,
    pub request_metadata: BTreeMap<String, String>,
    pub correlation_id: Option<uuid::Uuid>,
}

impl DispatchRequest {
    pub fn new(trigger_key: impl Into<String>, facts: Value) -> Self {
        Self {
            trigger_key: trigger_key.into(),
            facts,
            requested_by: None,
            request_metadata: BTreeMap::new(),
            correlation_id: None,
        }
    }

    /// 调用方所属模块，记入请求元数据；日志记录的 module 取自触发器
    pub fn with_caller_module(self, module: impl Into<String>) -> Self {
        self.with_metadata(CALLER_MODULE_KEY, module)
    }

    pub fn with_requested_by(mut self, requested_by: impl Into<String>) -> Self {
        self.requested_by = Some(requested_by.into());
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.request_metadata.insert(key.into(), value.into());
        self
    }

    pub fn with_correlation_id(mut self, correlation_id: uuid::Uuid) -> Self {
        self.correlation_id = Some(correlation_id);
        self
    }
}

/// 触发器派发结果
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchResult {
    pub correlation_id: uuid::Uuid,
    pub outcome: EvaluationOutcome,
    pub matched_rule: Option<MatchedRule>,
}

impl DispatchResult {
    /// 实际评估过的规则 ID（按评估顺序）
    pub fn evaluated_rule_ids(&self) -> &[String] {
        &self.outcome.evaluated_rule_ids
    }
}
