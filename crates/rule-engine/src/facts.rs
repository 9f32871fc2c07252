//! 事实文档访问
//!
//! 事实文档是调用方传入的任意嵌套 JSON，评估期间只读。
//! 字段路径使用点号分隔（如 "authorization.member.plan"）。

use serde_json::Value;

/// 事实文档 - 提供给规则引擎的业务上下文
#[derive(Debug, Clone, Default)]
pub struct FactDocument {
    data: Value,
}

impl FactDocument {
    pub fn new(data: Value) -> Self {
        Self { data }
    }

    /// 从 JSON 字符串创建
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let data: Value = serde_json::from_str(json)?;
        Ok(Self { data })
    }

    /// 获取字段值
    ///
    /// 任一段不存在，或当前节点不是对象时返回 `None`。
    pub fn get_field(&self, path: &str) -> Option<&Value> {
        let mut current = &self.data;

        for part in path.split('.') {
            match current {
                Value::Object(map) => {
                    current = map.get(part)?;
                }
                _ => return None,
            }
        }

        Some(current)
    }

    /// 获取字段的字符串形式，字段不存在时为空字符串
    pub fn get_text(&self, path: &str) -> String {
        stringify(self.get_field(path))
    }

    /// 解析设计器表格列对应的事实值
    ///
    /// 设计器表格按显示名引用事实，这里是尽力而为的回退链：
    /// 依次尝试 `映射路径.标签驼峰`、`映射路径`、`标签驼峰`，取第一个存在的值。
    /// 值为对象时优先取与标签同名的属性，其次取唯一属性，否则整体序列化为 JSON 字符串。
    pub fn resolve_column(&self, mapped_field_path: Option<&str>, label: Option<&str>) -> Option<String> {
        let leaf = label.map(camel_case).filter(|l| !l.is_empty());

        for path in candidate_paths(mapped_field_path, leaf.as_deref()) {
            let Some(value) = self.get_field(&path) else {
                continue;
            };
            if value.is_null() {
                continue;
            }

            if let Value::Object(map) = value {
                if let Some(inner) = leaf.as_deref().and_then(|l| map.get(l)) {
                    return Some(stringify(Some(inner)));
                }
                if map.len() == 1 {
                    return Some(stringify(map.values().next()));
                }
                // 多属性对象无法判断取哪个，整体输出
                return Some(value.to_string());
            }

            return Some(stringify(Some(value)));
        }

        None
    }
}

/// 把 JSON 值转换为比较用的字符串
///
/// 缺失与 null 都视为空字符串，字符串原样返回，其余标量取字面量，容器输出紧凑 JSON。
pub fn stringify(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Bool(b)) => b.to_string(),
        Some(Value::Number(n)) => n.to_string(),
        Some(other) => other.to_string(),
    }
}

/// 把显示名转换为驼峰字段名，如 "Auth Class" -> "authClass"
///
/// 已是驼峰形式的名称保持不变。
pub fn camel_case(label: &str) -> String {
    let mut out = String::with_capacity(label.len());

    for (i, word) in label
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .enumerate()
    {
        let mut chars = word.chars();
        if let Some(first) = chars.next() {
            if i == 0 {
                out.extend(first.to_lowercase());
            } else {
                out.extend(first.to_uppercase());
            }
            out.push_str(chars.as_str());
        }
    }

    out
}

/// 构造候选路径列表（按尝试顺序）
pub fn candidate_paths(mapped_field_path: Option<&str>, leaf: Option<&str>) -> Vec<String> {
    let base = mapped_field_path.map(str::trim).filter(|b| !b.is_empty());
    let leaf = leaf.filter(|l| !l.is_empty());

    match (base, leaf) {
        (Some(base), Some(leaf)) => {
            let mut paths = vec![format!("{}.{}", base, leaf), base.to_string()];
            if leaf != base {
                paths.push(leaf.to_string());
            }
            paths
        }
        (Some(base), None) => vec![base.to_string()],
        (None, Some(leaf)) => vec![leaf.to_string()],
        (None, None) => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_facts() -> FactDocument {
        FactDocument::new(json!({
            "authClass": "3",
            "authorization": {
                "status": "PENDING",
                "units": 12,
                "urgent": true,
                "reviewer": null,
                "member": {
                    "planCode": "HMO-1",
                    "age": 67
                },
                "lines": [{"code": "99213"}]
            },
            "program": {"programName": "Behavioral"},
            "diagnosis": {"primaryCode": "F32.9", "secondaryCode": "Z00"}
        }))
    }

    #[test]
    fn test_get_field() {
        let facts = sample_facts();

        assert_eq!(facts.get_field("authClass"), Some(&json!("3")));
        assert_eq!(facts.get_field("authorization.member.planCode"), Some(&json!("HMO-1")));
        assert_eq!(facts.get_field("authorization.units"), Some(&json!(12)));
        assert_eq!(facts.get_field("nonexistent"), None);
        assert_eq!(facts.get_field("authClass.more"), None);
    }

    #[test]
    fn test_arrays_are_not_traversable() {
        let facts = sample_facts();
        assert_eq!(facts.get_field("authorization.lines.0.code"), None);
    }

    #[test]
    fn test_get_text() {
        let facts = sample_facts();
        assert_eq!(facts.get_text("authorization.units"), "12");
        assert_eq!(facts.get_text("authorization.urgent"), "true");
        assert_eq!(facts.get_text("authorization.reviewer"), "");
        assert_eq!(facts.get_text("missing.path"), "");
    }

    #[test]
    fn test_camel_case() {
        assert_eq!(camel_case("Auth Class"), "authClass");
        assert_eq!(camel_case("plan code"), "planCode");
        assert_eq!(camel_case("member_age"), "memberAge");
        assert_eq!(camel_case("authClass"), "authClass");
        assert_eq!(camel_case("  "), "");
    }

    #[test]
    fn test_candidate_paths_order() {
        assert_eq!(
            candidate_paths(Some("authorization.member"), Some("planCode")),
            vec!["authorization.member.planCode", "authorization.member", "planCode"]
        );
        assert_eq!(candidate_paths(None, Some("authClass")), vec!["authClass"]);
        assert_eq!(candidate_paths(Some(" "), None), Vec::<String>::new());
    }

    #[test]
    fn test_resolve_column_by_label() {
        let facts = sample_facts();
        assert_eq!(facts.resolve_column(None, Some("Auth Class")), Some("3".to_string()));
    }

    #[test]
    fn test_resolve_column_base_plus_leaf() {
        let facts = sample_facts();
        assert_eq!(
            facts.resolve_column(Some("authorization.member"), Some("Plan Code")),
            Some("HMO-1".to_string())
        );
    }

    #[test]
    fn test_resolve_column_single_field_container() {
        let facts = sample_facts();
        // "program" 只有一个属性，直接取值
        assert_eq!(
            facts.resolve_column(Some("program"), Some("Program")),
            Some("Behavioral".to_string())
        );
    }

    #[test]
    fn test_resolve_column_ambiguous_container_dumps_json() {
        let facts = sample_facts();
        let resolved = facts.resolve_column(Some("diagnosis"), Some("Diagnosis")).unwrap();
        let parsed: Value = serde_json::from_str(&resolved).unwrap();
        assert_eq!(parsed, json!({"primaryCode": "F32.9", "secondaryCode": "Z00"}));
    }

    #[test]
    fn test_resolve_column_missing() {
        let facts = sample_facts();
        assert_eq!(facts.resolve_column(Some("nowhere"), Some("Nothing")), None);
        assert_eq!(facts.resolve_column(None, None), None);
        assert_eq!(facts.resolve_column(Some("authorization.reviewer"), None), None);
    }
}
