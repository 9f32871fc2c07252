//! 日志初始化模块
//!
//! 基于 tracing-subscriber 构建日志层，支持人类可读与 JSON 两种输出格式。

use anyhow::Result;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

use super::ObservabilityConfig;

/// Tracing 资源守卫
pub struct TracingGuard {
    service_name: String,
}

impl TracingGuard {
    pub fn service_name(&self) -> &str {
        &self.service_name
    }
}

/// 初始化 tracing（日志）
///
/// RUST_LOG 优先，其次使用配置中的日志级别，都无效时回退到 info。
pub fn init(config: &ObservabilityConfig) -> Result<TracingGuard> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    // 日志写到 stderr，stdout 留给 CLI 的 JSON 输出
    let fmt_layer = if config.json_logs {
        fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_span_events(FmtSpan::CLOSE)
            .with_target(true)
            .with_thread_ids(true)
            .boxed()
    } else {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_thread_ids(false)
            .with_ansi(true)
            .boxed()
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()?;

    Ok(TracingGuard {
        service_name: config.service_name.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_fails_gracefully() {
        let config = ObservabilityConfig::default().with_service_name("rule-engine-test");
        // 第一次可能因其他测试已初始化而失败，第二次一定失败，但都不应 panic
        if let Ok(guard) = init(&config) {
            assert_eq!(guard.service_name(), "rule-engine-test");
        }
        assert!(init(&config).is_err());
    }
}
