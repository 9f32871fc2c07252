//! 决策表执行器
//!
//! 两种决策表形式都使用 FIRST 命中策略：按优先级/行顺序找到第一条命中的
//! 规则即返回，后续命中的规则不会贡献任何输出。

use crate::evaluator::ConditionEvaluator;
use crate::facts::{FactDocument, stringify};
use crate::models::{ColumnKind, EvaluationOutcome, GridColumn, GridRow, Outputs, SubRule};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

/// 决策表执行器
pub struct DecisionTableExecutor {
    /// 是否记录详细评估追踪
    trace_enabled: bool,
}

impl DecisionTableExecutor {
    pub fn new() -> Self {
        Self {
            trace_enabled: false,
        }
    }

    /// 启用评估追踪
    pub fn with_trace(mut self) -> Self {
        self.trace_enabled = true;
        self
    }

    pub fn trace_enabled(&self) -> bool {
        self.trace_enabled
    }

    /// 执行可执行规则文档 / 编译形式决策表
    ///
    /// 过滤掉禁用的子规则后按 priority 升序（缺省排最后，其余保持原顺序）依次评估；
    /// 缺少条件容器的子规则跳过，不中断整体评估。
    pub fn execute_rules(&self, rules: &[Value], facts: &FactDocument) -> EvaluationOutcome {
        let mut trace = Vec::new();

        let mut candidates: Vec<(usize, SubRule)> = Vec::with_capacity(rules.len());
        for (index, raw) in rules.iter().enumerate() {
            match SubRule::from_value(raw) {
                Some(rule) if rule.enabled => candidates.push((index, rule)),
                Some(rule) => self.note(&mut trace, || format!("{}: 已禁用，跳过", rule.label(index))),
                None => {
                    debug!(index, "子规则不是对象，跳过");
                    self.note(&mut trace, || format!("rules[{}]: 结构不合法，跳过", index));
                }
            }
        }

        // sort_by_key 是稳定排序
        candidates.sort_by_key(|(_, rule)| (rule.priority.is_none(), rule.priority));

        for (index, rule) in &candidates {
            let Some(conditions) = rule.conditions() else {
                self.note(&mut trace, || format!("{}: 缺少条件容器，跳过", rule.label(*index)));
                continue;
            };

            if !ConditionEvaluator::all_match(conditions, facts) {
                self.note(&mut trace, || format!("{}: NOT_MATCHED", rule.label(*index)));
                continue;
            }

            self.note(&mut trace, || format!("{}: MATCHED", rule.label(*index)));

            let outputs: Outputs = rule
                .then
                .iter()
                .flatten()
                .map(|(key, value)| (key.clone(), output_value(value)))
                .collect();

            return EvaluationOutcome::matched(outputs).with_trace(trace);
        }

        self.note(&mut trace, || "无命中子规则".to_string());
        EvaluationOutcome::not_matched().with_trace(trace)
    }

    /// 执行设计器表格形式决策表
    ///
    /// 条件列只做字符串精确相等比较，空白单元格是通配符；
    /// 禁用的列视为不存在，禁用的行跳过。
    pub fn execute_grid(&self, grid: &Value, facts: &FactDocument) -> EvaluationOutcome {
        let (Some(raw_columns), Some(raw_rows)) = (
            grid.get("columns").and_then(Value::as_array),
            grid.get("rows").and_then(Value::as_array),
        ) else {
            debug!("设计器表格缺少 columns/rows 数组");
            return EvaluationOutcome::not_matched();
        };

        let mut trace = Vec::new();

        // 单个列或行无法解析只跳过该项
        let columns: Vec<GridColumn> = raw_columns
            .iter()
            .enumerate()
            .filter_map(|(index, raw)| self.parse_part(raw, "columns", index, &mut trace))
            .collect();

        let enabled: Vec<&GridColumn> = columns.iter().filter(|c| c.is_enabled).collect();
        let condition_columns: Vec<&GridColumn> = enabled
            .iter()
            .copied()
            .filter(|c| c.kind == ColumnKind::Condition)
            .collect();
        let result_columns: Vec<&GridColumn> = enabled
            .iter()
            .copied()
            .filter(|c| c.kind == ColumnKind::Result)
            .collect();

        for (index, raw) in raw_rows.iter().enumerate() {
            let Some(row) = self.parse_part::<GridRow>(raw, "rows", index, &mut trace) else {
                continue;
            };
            if !row.enabled {
                self.note(&mut trace, || format!("rows[{}]: 已禁用，跳过", index));
                continue;
            }

            let failed = condition_columns.iter().find(|column| {
                if row.is_blank(&column.id) {
                    return false;
                }
                let cell = stringify(row.cells.get(&column.id));
                let actual = facts
                    .resolve_column(column.mapped_field_path.as_deref(), column.label.as_deref())
                    .unwrap_or_default();
                actual != cell
            });

            if let Some(column) = failed {
                self.note(&mut trace, || {
                    format!("rows[{}]: 列 {} 不匹配", index, column.id)
                });
                continue;
            }

            self.note(&mut trace, || format!("rows[{}]: MATCHED", index));

            let outputs: Outputs = result_columns
                .iter()
                .filter_map(|column| {
                    let key = column.key.as_ref()?;
                    Some((key.clone(), row.cells.get(&column.id).and_then(output_value)))
                })
                .collect();

            return EvaluationOutcome::matched(outputs).with_trace(trace);
        }

        self.note(&mut trace, || "无命中行".to_string());
        EvaluationOutcome::not_matched().with_trace(trace)
    }

    fn parse_part<T: DeserializeOwned>(
        &self,
        raw: &Value,
        section: &str,
        index: usize,
        trace: &mut Vec<String>,
    ) -> Option<T> {
        match serde_json::from_value(raw.clone()) {
            Ok(part) => Some(part),
            Err(e) => {
                debug!(section, index, error = %e, "设计器表格项结构不合法，跳过");
                self.note(trace, || format!("{}[{}]: 结构不合法，跳过", section, index));
                None
            }
        }
    }

    fn note(&self, trace: &mut Vec<String>, message: impl FnOnce() -> String) {
        if self.trace_enabled {
            trace.push(message());
        }
    }
}

impl Default for DecisionTableExecutor {
    fn default() -> Self {
        Self::new()
    }
}

/// 输出值：null 保留为 None，其余标量转为字符串
fn output_value(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        other => Some(stringify(Some(other))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn facts(value: Value) -> FactDocument {
        FactDocument::new(value)
    }

    fn outputs(pairs: &[(&str, Option<&str>)]) -> Outputs {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.map(str::to_string)))
            .collect()
    }

    #[test]
    fn test_single_rule_scenario() {
        let rules = json!([{
            "priority": 1,
            "all": [{"fieldPath": "authClass", "operator": "EQ", "value": "3"}],
            "then": {"decision": "approve"}
        }]);

        let result = DecisionTableExecutor::new()
            .execute_rules(rules.as_array().unwrap(), &facts(json!({"authClass": "3"})));

        assert!(result.matched);
        assert_eq!(result.outputs, outputs(&[("decision", Some("approve"))]));
    }

    #[test]
    fn test_first_hit_by_priority() {
        // 两条都命中，只返回 priority 更小的那条
        let rules = json!([
            {
                "priority": 5,
                "all": [{"fieldPath": "authClass", "operator": "EQ", "value": "3"}],
                "then": {"decision": "pend", "queue": "clinical"}
            },
            {
                "priority": 1,
                "all": [{"fieldPath": "authClass", "operator": "=", "value": "3"}],
                "then": {"decision": "approve"}
            }
        ]);

        let result = DecisionTableExecutor::new()
            .execute_rules(rules.as_array().unwrap(), &facts(json!({"authClass": "3"})));

        assert!(result.matched);
        assert_eq!(result.outputs, outputs(&[("decision", Some("approve"))]));
    }

    #[test]
    fn test_missing_priority_sorts_last_and_stable() {
        let rules = json!([
            {"all": [], "then": {"pick": "no-priority"}},
            {"priority": 3, "all": [], "then": {"pick": "first-3"}},
            {"priority": 3, "all": [], "then": {"pick": "second-3"}}
        ]);

        let result = DecisionTableExecutor::new().execute_rules(rules.as_array().unwrap(), &facts(json!({})));
        assert_eq!(result.outputs, outputs(&[("pick", Some("first-3"))]));
    }

    #[test]
    fn test_disabled_rule_falls_through() {
        let rules = json!([
            {
                "enabled": false,
                "priority": 1,
                "all": [{"fieldPath": "authClass", "operator": "EQ", "value": "3"}],
                "then": {"decision": "approve"}
            },
            {
                "priority": 2,
                "all": [{"fieldPath": "authClass", "operator": "EQ", "value": "3"}],
                "then": {"decision": "review"}
            }
        ]);

        let result = DecisionTableExecutor::new()
            .execute_rules(rules.as_array().unwrap(), &facts(json!({"authClass": "3"})));
        assert_eq!(result.outputs, outputs(&[("decision", Some("review"))]));

        let only_disabled = json!([rules[0].clone()]);
        let result = DecisionTableExecutor::new()
            .execute_rules(only_disabled.as_array().unwrap(), &facts(json!({"authClass": "3"})));
        assert!(!result.matched);
        assert!(result.outputs.is_empty());
    }

    #[test]
    fn test_malformed_rules_are_skipped() {
        let rules = json!([
            {"priority": 1, "then": {"decision": "no-conditions"}},
            {"priority": 2, "all": "not-an-array", "then": {"decision": "bad-container"}},
            "garbage",
            {"priority": 3, "all": [], "then": {"decision": "fallback"}}
        ]);

        let result = DecisionTableExecutor::new().execute_rules(rules.as_array().unwrap(), &facts(json!({})));
        assert!(result.matched);
        assert_eq!(result.outputs, outputs(&[("decision", Some("fallback"))]));
    }

    #[test]
    fn test_null_outputs_preserved_and_scalars_stringified() {
        let rules = json!([{
            "all": [],
            "then": {"decision": "approve", "reason": null, "units": 10, "urgent": true}
        }]);

        let result = DecisionTableExecutor::new().execute_rules(rules.as_array().unwrap(), &facts(json!({})));
        assert_eq!(
            result.outputs,
            outputs(&[
                ("decision", Some("approve")),
                ("reason", None),
                ("units", Some("10")),
                ("urgent", Some("true"))
            ])
        );
    }

    #[test]
    fn test_match_without_then() {
        let rules = json!([{"all": []}]);
        let result = DecisionTableExecutor::new().execute_rules(rules.as_array().unwrap(), &facts(json!({})));
        assert!(result.matched);
        assert!(result.outputs.is_empty());
    }

    #[test]
    fn test_mistyped_then_matches_with_empty_outputs() {
        let rules = json!([{
            "all": [{"fieldPath": "authClass", "operator": "EQ", "value": "3"}],
            "then": "approve"
        }]);

        let result = DecisionTableExecutor::new()
            .execute_rules(rules.as_array().unwrap(), &facts(json!({"authClass": "3"})));
        assert!(result.matched);
        assert!(result.outputs.is_empty());
    }

    #[test]
    fn test_mistyped_priority_sorts_as_missing() {
        let rules = json!([
            {"priority": "1", "all": [], "then": {"pick": "string-priority"}},
            {"priority": 9, "all": [], "then": {"pick": "nine"}}
        ]);

        let result = DecisionTableExecutor::new().execute_rules(rules.as_array().unwrap(), &facts(json!({})));
        assert_eq!(result.outputs, outputs(&[("pick", Some("nine"))]));

        let only_string = json!([rules[0].clone()]);
        let result = DecisionTableExecutor::new()
            .execute_rules(only_string.as_array().unwrap(), &facts(json!({})));
        assert_eq!(result.outputs, outputs(&[("pick", Some("string-priority"))]));
    }

    #[test]
    fn test_non_bool_enabled_counts_as_enabled() {
        for enabled in [json!(null), json!("no"), json!(0)] {
            let rules = json!([{
                "enabled": enabled,
                "all": [{"fieldPath": "authClass", "operator": "EQ", "value": "3"}],
                "then": {"decision": "approve"}
            }]);

            let result = DecisionTableExecutor::new()
                .execute_rules(rules.as_array().unwrap(), &facts(json!({"authClass": "3"})));
            assert!(result.matched, "enabled={} 应视为启用", enabled);
        }
    }

    #[test]
    fn test_no_match() {
        let rules = json!([{
            "all": [{"fieldPath": "authClass", "operator": "EQ", "value": "3"}],
            "then": {"decision": "approve"}
        }]);
        let result = DecisionTableExecutor::new()
            .execute_rules(rules.as_array().unwrap(), &facts(json!({"authClass": "4"})));
        assert_eq!(result, EvaluationOutcome::not_matched());
    }

    fn sample_grid() -> Value {
        json!({
            "columns": [
                {"id": "c1", "kind": "condition", "label": "Auth Class"},
                {"id": "r1", "kind": "result", "key": "decision"}
            ],
            "rows": [{"enabled": true, "cells": {"c1": "3", "r1": "deny"}}]
        })
    }

    #[test]
    fn test_grid_scenario() {
        let executor = DecisionTableExecutor::new();

        let result = executor.execute_grid(&sample_grid(), &facts(json!({"authClass": "3"})));
        assert!(result.matched);
        assert_eq!(result.outputs, outputs(&[("decision", Some("deny"))]));

        let result = executor.execute_grid(&sample_grid(), &facts(json!({"authClass": "4"})));
        assert!(!result.matched);
        assert!(result.outputs.is_empty());
    }

    #[test]
    fn test_grid_wildcard_matches_absent_fact() {
        let grid = json!({
            "columns": [
                {"id": "c1", "kind": "condition", "label": "Auth Class"},
                {"id": "c2", "kind": "condition", "label": "Plan", "mappedFieldPath": "member"},
                {"id": "r1", "kind": "result", "key": "decision"}
            ],
            "rows": [{"cells": {"c1": "3", "c2": "", "r1": "approve"}}]
        });

        let result = DecisionTableExecutor::new().execute_grid(&grid, &facts(json!({"authClass": "3"})));
        assert!(result.matched);
        assert_eq!(result.outputs, outputs(&[("decision", Some("approve"))]));
    }

    #[test]
    fn test_grid_first_enabled_row_wins() {
        let grid = json!({
            "columns": [
                {"id": "c1", "kind": "condition", "label": "Auth Class"},
                {"id": "r1", "kind": "result", "key": "decision"}
            ],
            "rows": [
                {"enabled": false, "cells": {"c1": "3", "r1": "disabled"}},
                {"enabled": true, "cells": {"c1": "3", "r1": "first"}},
                {"enabled": true, "cells": {"c1": "", "r1": "catch-all"}}
            ]
        });

        let executor = DecisionTableExecutor::new();
        let result = executor.execute_grid(&grid, &facts(json!({"authClass": "3"})));
        assert_eq!(result.outputs, outputs(&[("decision", Some("first"))]));

        let result = executor.execute_grid(&grid, &facts(json!({"authClass": "9"})));
        assert_eq!(result.outputs, outputs(&[("decision", Some("catch-all"))]));
    }

    #[test]
    fn test_grid_disabled_column_is_ignored() {
        let grid = json!({
            "columns": [
                {"id": "c1", "kind": "condition", "label": "Auth Class", "isEnabled": false},
                {"id": "r1", "kind": "result", "key": "decision"},
                {"id": "r2", "kind": "result", "key": "note", "isEnabled": false}
            ],
            "rows": [{"cells": {"c1": "3", "r1": "approve", "r2": "hidden"}}]
        });

        // 条件列被禁用后任何事实都命中，禁用的结果列不输出
        let result = DecisionTableExecutor::new().execute_grid(&grid, &facts(json!({"authClass": "7"})));
        assert!(result.matched);
        assert_eq!(result.outputs, outputs(&[("decision", Some("approve"))]));
    }

    #[test]
    fn test_grid_result_column_without_key_skipped() {
        let grid = json!({
            "columns": [
                {"id": "r1", "kind": "result", "key": "decision"},
                {"id": "r2", "kind": "result", "label": "No Key"},
                {"id": "r3", "kind": "result", "key": "reason"}
            ],
            "rows": [{"cells": {"r1": "approve", "r2": "ignored"}}]
        });

        let result = DecisionTableExecutor::new().execute_grid(&grid, &facts(json!({})));
        assert_eq!(
            result.outputs,
            outputs(&[("decision", Some("approve")), ("reason", None)])
        );
    }

    #[test]
    fn test_grid_equality_only() {
        let grid = json!({
            "columns": [
                {"id": "c1", "kind": "condition", "label": "Units"},
                {"id": "r1", "kind": "result", "key": "decision"}
            ],
            "rows": [{"cells": {"c1": "10", "r1": "approve"}}]
        });

        let executor = DecisionTableExecutor::new();
        assert!(executor.execute_grid(&grid, &facts(json!({"units": 10}))).matched);
        assert!(!executor.execute_grid(&grid, &facts(json!({"units": "10.0"}))).matched);
    }

    #[test]
    fn test_grid_skips_malformed_column() {
        let grid = json!({
            "columns": [
                {"id": "c1", "kind": "condition", "label": "Auth Class"},
                {"id": "r1", "kind": "result", "key": "decision"},
                {"label": "Notes"}
            ],
            "rows": [{"enabled": true, "cells": {"c1": "3", "r1": "deny"}}]
        });

        let result = DecisionTableExecutor::new()
            .with_trace()
            .execute_grid(&grid, &facts(json!({"authClass": "3"})));
        assert!(result.matched);
        assert_eq!(result.outputs, outputs(&[("decision", Some("deny"))]));
        assert!(result.trace.iter().any(|t| t == "columns[2]: 结构不合法，跳过"));
    }

    #[test]
    fn test_grid_skips_malformed_row() {
        let grid = json!({
            "columns": [
                {"id": "c1", "kind": "condition", "label": "Auth Class"},
                {"id": "r1", "kind": "result", "key": "decision"}
            ],
            "rows": [
                {"cells": "c1=3"},
                "garbage",
                {"cells": {"c1": "3", "r1": "deny"}}
            ]
        });

        let result = DecisionTableExecutor::new()
            .with_trace()
            .execute_grid(&grid, &facts(json!({"authClass": "3"})));
        assert!(result.matched);
        assert_eq!(result.outputs, outputs(&[("decision", Some("deny"))]));
        assert!(result.trace.iter().any(|t| t == "rows[0]: 结构不合法，跳过"));
        assert!(result.trace.iter().any(|t| t == "rows[2]: MATCHED"));
    }

    #[test]
    fn test_grid_malformed() {
        let executor = DecisionTableExecutor::new();
        assert!(!executor.execute_grid(&json!({"columns": [], "rows": {}}), &facts(json!({}))).matched);
        assert!(!executor.execute_grid(&json!({"rows": []}), &facts(json!({}))).matched);
    }

    #[test]
    fn test_trace_output() {
        let rules = json!([
            {"enabled": false, "all": []},
            {"name": "class-3", "priority": 1, "all": [], "then": {"decision": "approve"}}
        ]);

        let result = DecisionTableExecutor::new()
            .with_trace()
            .execute_rules(rules.as_array().unwrap(), &facts(json!({})));

        assert!(result.trace.iter().any(|t| t.contains("已禁用")));
        assert!(result.trace.iter().any(|t| t == "rules[1](class-3): MATCHED"));

        let quiet = DecisionTableExecutor::new().execute_rules(rules.as_array().unwrap(), &facts(json!({})));
        assert!(quiet.trace.is_empty());
    }
}
