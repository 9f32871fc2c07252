//! 命令执行器
//!
//! 把命令行参数转为目录加载和派发调用。

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use care_shared::config::EngineConfig;
use serde_json::Value;
use tracing::info;

use crate::audit::TracingLogSink;
use crate::dispatcher::TriggerDispatcher;
use crate::facts::FactDocument;
use crate::models::{DispatchRequest, DispatchResult, EvaluationOutcome};
use crate::store::InMemoryRuleStore;

/// 命令执行器
pub struct CommandRunner {
    engine: EngineConfig,
}

impl CommandRunner {
    pub fn new(engine: EngineConfig) -> Self {
        Self { engine }
    }

    /// 执行 evaluate 命令
    pub async fn run_evaluate(
        &self,
        rule: &Path,
        facts: &Path,
        catalog: Option<PathBuf>,
    ) -> Result<EvaluationOutcome> {
        let rule = read_json(rule)?;
        let facts = FactDocument::from_json(&read_text(facts)?)
            .with_context(|| format!("JSON 解析失败: {}", facts.display()))?;

        let store = InMemoryRuleStore::new();
        if let Some(path) = self.catalog_path(catalog) {
            store
                .load_catalog(&path)
                .with_context(|| format!("加载规则目录失败: {}", path.display()))?;
        }

        let outcome = self.dispatcher(store).evaluate_rule_document(&rule, &facts).await?;
        info!(matched = outcome.matched, "规则评估完成");
        Ok(outcome)
    }

    /// 执行 dispatch 命令
    pub async fn run_dispatch(
        &self,
        trigger: &str,
        facts: &Path,
        catalog: Option<PathBuf>,
        module: Option<String>,
        requested_by: Option<String>,
    ) -> Result<DispatchResult> {
        let Some(path) = self.catalog_path(catalog) else {
            bail!("dispatch 需要规则目录：使用 --catalog 或配置 engine.catalog_path");
        };

        let store = InMemoryRuleStore::new();
        store
            .load_catalog(&path)
            .with_context(|| format!("加载规则目录失败: {}", path.display()))?;

        let mut request = DispatchRequest::new(trigger, read_json(facts)?);
        if let Some(module) = module {
            request = request.with_caller_module(module);
        }
        if let Some(requested_by) = requested_by {
            request = request.with_requested_by(requested_by);
        }

        Ok(self.dispatcher(store).dispatch(request).await?)
    }

    fn catalog_path(&self, explicit: Option<PathBuf>) -> Option<PathBuf> {
        explicit.or_else(|| self.engine.catalog_path.as_ref().map(PathBuf::from))
    }

    fn dispatcher(&self, store: InMemoryRuleStore) -> TriggerDispatcher {
        let store = Arc::new(store);
        let mut dispatcher = TriggerDispatcher::new(store.clone(), store)
            .with_log_sink(Arc::new(TracingLogSink::new()))
            .with_execution_logs(self.engine.emit_execution_logs);
        if self.engine.trace_enabled {
            dispatcher = dispatcher.with_trace();
        }
        dispatcher
    }
}

fn read_text(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("读取文件失败: {}", path.display()))
}

fn read_json(path: &Path) -> Result<Value> {
    serde_json::from_str(&read_text(path)?).with_context(|| format!("JSON 解析失败: {}", path.display()))
}
