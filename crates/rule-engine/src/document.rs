//! 规则文档分类
//!
//! 规则文档没有显式的类型字段，只能按结构探测。探测顺序固定为
//! 可执行文档 -> 决策表指针 -> 设计器表格，因为不规范的文档可能同时
//! 像多种结构。

use serde_json::Value;

/// 规则文档结构
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RulePayload<'a> {
    /// 自包含条件的可执行文档（`engine.rules[]`），编译形式决策表同构
    Executable(&'a [Value]),
    /// 指向外部决策表（`ui.decisionTable.id`）
    Pointer(&'a Value),
    /// 设计器表格（顶层同时有 `columns[]` 与 `rows[]`）
    DesignerGrid(&'a Value),
    /// 无法识别
    Unrecognized,
}

impl<'a> RulePayload<'a> {
    /// 探测文档结构
    pub fn classify(json: &'a Value) -> Self {
        if let Some(rules) = json.pointer("/engine/rules").and_then(Value::as_array) {
            return Self::Executable(rules.as_slice());
        }

        if let Some(id) = json.pointer("/ui/decisionTable/id") {
            if pointer_id(id).is_some() {
                return Self::Pointer(id);
            }
        }

        let has_columns = json.get("columns").is_some_and(Value::is_array);
        let has_rows = json.get("rows").is_some_and(Value::is_array);
        if has_columns && has_rows {
            return Self::DesignerGrid(json);
        }

        Self::Unrecognized
    }

    /// 指针目标的决策表 ID
    pub fn table_id(&self) -> Option<String> {
        match self {
            Self::Pointer(id) => pointer_id(id),
            _ => None,
        }
    }

    /// 结构名称，用于日志
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Executable(_) => "executable",
            Self::Pointer(_) => "pointer",
            Self::DesignerGrid(_) => "designer_grid",
            Self::Unrecognized => "unrecognized",
        }
    }
}

/// 决策表 ID 允许字符串或整数，空字符串视为缺失
fn pointer_id(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
