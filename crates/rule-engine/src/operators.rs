//! 规则操作符定义

use std::cmp::Ordering;
use std::fmt;

/// 条件操作符
///
/// 规则文档里的操作符是自由文本，`parse` 负责把各种写法归一化；
/// 无法识别的写法返回 `None`，由比较器视为“不匹配”。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Eq,
    Neq,
    Gt,
    Gte,
    Lt,
    Lte,
}

impl Operator {
    /// 归一化操作符（大小写不敏感）
    pub fn parse(token: &str) -> Option<Self> {
        let op = match token.trim().to_ascii_uppercase().as_str() {
            "EQ" | "=" | "==" => Self::Eq,
            "NEQ" | "!=" | "<>" => Self::Neq,
            "GT" | ">" => Self::Gt,
            "GTE" | ">=" => Self::Gte,
            "LT" | "<" => Self::Lt,
            "LTE" | "<=" => Self::Lte,
            _ => return None,
        };
        Some(op)
    }

    /// 是否为排序类操作符（需要类型转换后比较）
    pub fn is_ordering(&self) -> bool {
        !matches!(self, Self::Eq | Self::Neq)
    }

    /// 判断比较结果是否满足操作符
    pub fn accepts(&self, ordering: Ordering) -> bool {
        match self {
            Self::Eq => ordering == Ordering::Equal,
            Self::Neq => ordering != Ordering::Equal,
            Self::Gt => ordering == Ordering::Greater,
            Self::Gte => ordering != Ordering::Less,
            Self::Lt => ordering == Ordering::Less,
            Self::Lte => ordering != Ordering::Greater,
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Eq => "EQ",
            Self::Neq => "NEQ",
            Self::Gt => "GT",
            Self::Gte => "GTE",
            Self::Lt => "LT",
            Self::Lte => "LTE",
        };
        write!(f, "{}", s)
    }
}
