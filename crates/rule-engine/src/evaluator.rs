//! 条件评估器
//!
//! 条件集合是逻辑与：全部条件满足才算命中，遇到第一个不满足的条件立即返回。

use crate::comparator::ValueComparator;
use crate::facts::{FactDocument, stringify};
use crate::models::Condition;

/// 条件评估器
pub struct ConditionEvaluator;

impl ConditionEvaluator {
    /// 评估条件集合，空集合视为满足
    pub fn all_match(conditions: &[Condition], facts: &FactDocument) -> bool {
        conditions.iter().all(|cond| Self::evaluate(cond, facts))
    }

    /// 评估单个条件
    ///
    /// 缺失的事实按空字符串参与比较。
    pub fn evaluate(cond: &Condition, facts: &FactDocument) -> bool {
        let actual = facts.get_text(&cond.field_path);
        let expected = stringify(Some(&cond.value));

        ValueComparator::compare(&actual, &expected, &cond.operator, cond.data_type.as_deref())
    }
}
