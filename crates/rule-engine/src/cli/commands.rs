//! CLI 命令定义

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// 规则引擎命令行工具
#[derive(Parser, Debug)]
#[command(name = "rule-engine")]
#[command(version, about = "医疗规则 / 决策表评估工具")]
#[command(propagate_version = true)]
pub struct Cli {
    /// 日志级别 (trace, debug, info, warn, error)，覆盖配置文件
    #[arg(short, long, global = true)]
    pub log_level: Option<String>,

    /// 在结果中输出评估追踪
    #[arg(long, global = true)]
    pub trace: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// 评估单条规则文档
    ///
    /// 规则可以是可执行文档或决策表指针；指针需要 `--catalog` 提供决策表。
    Evaluate {
        /// 规则文档 JSON 文件
        #[arg(short, long)]
        rule: PathBuf,

        /// 事实文档 JSON 文件
        #[arg(short, long)]
        facts: PathBuf,

        /// 规则目录 JSON 文件
        #[arg(short, long)]
        catalog: Option<PathBuf>,
    },

    /// 按触发器派发
    Dispatch {
        /// 触发器键
        #[arg(short, long)]
        trigger: String,

        /// 事实文档 JSON 文件
        #[arg(short, long)]
        facts: PathBuf,

        /// 规则目录 JSON 文件（未指定时使用配置中的 engine.catalog_path）
        #[arg(short, long)]
        catalog: Option<PathBuf>,

        /// 调用方所属模块（记入请求元数据 callerModule）
        #[arg(short, long)]
        module: Option<String>,

        /// 请求人
        #[arg(long)]
        requested_by: Option<String>,
    },
}
