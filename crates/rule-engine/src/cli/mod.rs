//! CLI 模块
//!
//! - `evaluate` - 单独评估一条规则文档
//! - `dispatch` - 按触发器派发，输出派发结果
//!
//! ```bash
//! rule-engine evaluate --rule rule.json --facts facts.json --catalog catalog.json
//! rule-engine --trace dispatch --trigger auth.submitted --facts facts.json --catalog catalog.json
//! ```

pub mod commands;
pub mod runner;

pub use commands::{Cli, Commands};
pub use runner::CommandRunner;
