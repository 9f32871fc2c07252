//! 值比较器
//!
//! 规则文档中的事实值与期望值都以字符串形式比较。相等/不等总是按字符串
//! 精确比较（编码、ID 类字段要求逐字节一致），排序类操作符依次尝试
//! 日期、数值、字符串三种解释。

use crate::operators::Operator;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use tracing::trace;

/// 带时区的日期时间格式
const ZONED_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f%z", "%Y-%m-%d %H:%M:%S%.f%z"];

/// 不带时区的日期时间格式，按 UTC 处理
const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%m/%d/%Y %I:%M:%S %p",
    "%m/%d/%Y %I:%M %p",
];

/// 纯日期格式，按 UTC 零点处理
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y", "%Y/%m/%d", "%m-%d-%Y"];

/// 值比较器
pub struct ValueComparator;

impl ValueComparator {
    /// 比较实际值与期望值
    ///
    /// # Arguments
    /// * `actual` - 从事实文档中解析出的值（字符串化后）
    /// * `expected` - 规则中定义的期望值
    /// * `operator` - 原始操作符文本
    /// * `data_type` - 规则附带的类型提示，只用于诊断，不改变比较顺序
    pub fn compare(actual: &str, expected: &str, operator: &str, data_type: Option<&str>) -> bool {
        let Some(op) = Operator::parse(operator) else {
            trace!(operator, "无法识别的操作符，视为不匹配");
            return false;
        };

        Self::compare_with(actual, expected, op, data_type)
    }

    /// 使用已归一化的操作符比较
    pub fn compare_with(actual: &str, expected: &str, op: Operator, data_type: Option<&str>) -> bool {
        match op {
            Operator::Eq => return actual == expected,
            Operator::Neq => return actual != expected,
            _ => {}
        }

        if let (Some(a), Some(b)) = (parse_datetime(actual), parse_datetime(expected)) {
            return op.accepts(a.cmp(&b));
        }

        if let (Some(a), Some(b)) = (parse_number(actual), parse_number(expected)) {
            // 两边都是有限值，partial_cmp 不会返回 None
            return a.partial_cmp(&b).is_some_and(|ord| op.accepts(ord));
        }

        if let Some(hint) = data_type {
            trace!(
                data_type = hint,
                actual,
                expected,
                "类型转换失败，回退为字符串比较"
            );
        }

        op.accepts(actual.cmp(expected))
    }
}

/// 解析日期时间，纯日期视为 UTC 零点
pub fn parse_datetime(value: &str) -> Option<DateTime<Utc>> {
    let s = value.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }

    for fmt in ZONED_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(s, fmt) {
            return Some(dt.with_timezone(&Utc));
        }
    }

    for fmt in NAIVE_DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.and_utc());
        }
    }

    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            return date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc());
        }
    }

    None
}

/// 解析十进制数值，拒绝 NaN 与无穷大
pub fn parse_number(value: &str) -> Option<f64> {
    let s = value.trim();
    if s.is_empty() {
        return None;
    }
    s.parse::<f64>().ok().filter(|n| n.is_finite())
}
