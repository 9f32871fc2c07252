//! 规则引擎命令行入口
//!
//! 结果以 JSON 输出到 stdout，日志写入 stderr。

use anyhow::Result;
use care_shared::config::AppConfig;
use care_shared::observability;
use clap::Parser;
use rule_engine::cli::{Cli, CommandRunner, Commands};
use serde::Serialize;
use tracing::debug;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 统一加载配置：default → {CARE_ENV} → rule-engine → CARE_* 环境变量
    let mut config = AppConfig::load("rule-engine").unwrap_or_else(|e| {
        eprintln!("Failed to load config, using defaults: {}", e);
        AppConfig::default()
    });

    let mut obs_config = config.observability.clone().with_service_name(&config.service_name);
    if let Some(level) = &cli.log_level {
        obs_config = obs_config.with_log_level(level);
    }
    let _guard = observability::init(&obs_config)?;

    if cli.trace {
        config.engine.trace_enabled = true;
    }
    debug!(environment = %config.environment, engine = ?config.engine, "配置已加载");

    let runner = CommandRunner::new(config.engine);

    match cli.command {
        Commands::Evaluate { rule, facts, catalog } => {
            let outcome = runner.run_evaluate(&rule, &facts, catalog).await?;
            print_json(&outcome)?;
        }
        Commands::Dispatch {
            trigger,
            facts,
            catalog,
            module,
            requested_by,
        } => {
            let result = runner
                .run_dispatch(&trigger, &facts, catalog, module, requested_by)
                .await?;
            print_json(&result)?;
        }
    }

    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
