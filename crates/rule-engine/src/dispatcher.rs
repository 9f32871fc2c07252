//! 触发器派发器
//!
//! 加载触发器的有效绑定，按 sequence 顺序逐条评估规则：
//! - 每条尝试过的规则都记入 `evaluated_rule_ids`
//! - 第一条命中的规则作为派发结果
//! - 命中且绑定设置了 stop_on_match 时停止后续评估；未命中时该标记不起作用
//!
//! 派发结束（成功或失败）后生成一条执行日志交给 sink，sink 失败只记录告警，
//! 不影响派发结果。

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::audit::{ExecutionLogRecord, ExecutionStatus};
use crate::error::Result;
use crate::executor::DecisionTableExecutor;
use crate::facts::FactDocument;
use crate::models::{DispatchRequest, DispatchResult, EvaluationOutcome, MatchedRule};
use crate::resolver::{DecisionTableCache, RuleDocumentResolver};
use crate::traits::{BindingSource, DecisionTableSource, ExecutionLogSink};

/// 指标中代替未加载到绑定的触发器键
const UNKNOWN_TRIGGER_LABEL: &str = "unknown";

/// 单次派发的累积状态
#[derive(Debug, Default)]
struct DispatchState {
    /// 触发器所属模块（来自绑定来源）
    module: Option<String>,
    /// 是否加载到至少一条绑定
    has_bindings: bool,
    outcome: EvaluationOutcome,
    evaluated_rule_ids: Vec<String>,
    matched_rule: Option<MatchedRule>,
    trace: Vec<String>,
}

/// 触发器派发器
pub struct TriggerDispatcher {
    bindings: Arc<dyn BindingSource>,
    tables: Arc<dyn DecisionTableSource>,
    log_sink: Option<Arc<dyn ExecutionLogSink>>,
    resolver: RuleDocumentResolver,
    emit_logs: bool,
}

impl TriggerDispatcher {
    pub fn new(bindings: Arc<dyn BindingSource>, tables: Arc<dyn DecisionTableSource>) -> Self {
        Self {
            bindings,
            tables,
            log_sink: None,
            resolver: RuleDocumentResolver::default(),
            emit_logs: true,
        }
    }

    /// 设置执行日志 sink
    pub fn with_log_sink(mut self, sink: Arc<dyn ExecutionLogSink>) -> Self {
        self.log_sink = Some(sink);
        self
    }

    /// 关闭后派发不再调用日志 sink
    pub fn with_execution_logs(mut self, enabled: bool) -> Self {
        self.emit_logs = enabled;
        self
    }

    /// 启用评估追踪
    pub fn with_trace(mut self) -> Self {
        self.resolver = RuleDocumentResolver::new(DecisionTableExecutor::new().with_trace());
        self
    }

    fn trace_enabled(&self) -> bool {
        self.resolver.executor().trace_enabled()
    }

    /// 单条规则评估（不经过触发器），用于调试一条规则或决策表
    #[instrument(skip(self, rule_json, facts))]
    pub async fn evaluate_rule_document(
        &self,
        rule_json: &Value,
        facts: &FactDocument,
    ) -> Result<EvaluationOutcome> {
        let mut cache = DecisionTableCache::new();
        self.resolver
            .resolve(rule_json, facts, self.tables.as_ref(), &mut cache)
            .await
    }

    /// 以 JSON 文本形式评估单条规则，文本无法解析时视为未命中
    pub async fn evaluate_rule_json(&self, rule_json: &str, facts: &FactDocument) -> Result<EvaluationOutcome> {
        match serde_json::from_str::<Value>(rule_json) {
            Ok(rule) => self.evaluate_rule_document(&rule, facts).await,
            Err(e) => {
                warn!(error = %e, "规则 JSON 无法解析，视为未命中");
                Ok(EvaluationOutcome::not_matched())
            }
        }
    }

    /// 按触发器键派发（使用默认请求元数据）
    pub async fn dispatch_trigger(&self, trigger_key: &str, facts: Value) -> Result<DispatchResult> {
        self.dispatch(DispatchRequest::new(trigger_key, facts)).await
    }

    /// 执行完整的派发流程
    #[instrument(
        skip(self, request),
        fields(trigger_key = %request.trigger_key, correlation_id = tracing::field::Empty)
    )]
    pub async fn dispatch(&self, request: DispatchRequest) -> Result<DispatchResult> {
        let start = Instant::now();
        let correlation_id = request.correlation_id.unwrap_or_else(Uuid::now_v7);
        tracing::Span::current().record("correlation_id", tracing::field::display(correlation_id));

        let facts = FactDocument::new(request.facts.clone());
        let mut state = DispatchState::default();

        let run = self.run(&request.trigger_key, &facts, &mut state).await;
        let elapsed = start.elapsed();

        let mut outcome = state.outcome;
        outcome.evaluated_rule_ids = state.evaluated_rule_ids;
        outcome.matched_rule_id = state.matched_rule.as_ref().map(|m| m.rule_id.clone());
        if self.trace_enabled() {
            outcome.trace = state.trace;
        }

        let status = match &run {
            Err(_) => ExecutionStatus::Failed,
            Ok(()) if outcome.matched => ExecutionStatus::Matched,
            Ok(()) => ExecutionStatus::NotMatched,
        };

        record_metrics(metric_trigger_label(&request.trigger_key, state.has_bindings), status, elapsed);

        let record = ExecutionLogRecord {
            correlation_id,
            trigger_key: request.trigger_key.clone(),
            module: state.module.clone(),
            requested_by: request.requested_by.clone(),
            request_metadata: request.request_metadata.clone(),
            facts: request.facts,
            outcome: match &run {
                Ok(()) => serde_json::to_value(&outcome).ok(),
                Err(_) => None,
            },
            status,
            matched_rule_id: state.matched_rule.as_ref().map(|m| m.rule_id.clone()),
            matched_rule_name: state.matched_rule.as_ref().and_then(|m| m.rule_name.clone()),
            evaluated_rule_ids: outcome.evaluated_rule_ids.clone(),
            executed_at: Utc::now(),
            elapsed_ms: elapsed.as_millis() as i64,
            error_message: run.as_ref().err().map(|e| e.to_string()),
        };
        self.emit(record).await;

        match run {
            Ok(()) => {
                info!(
                    status = %status,
                    matched_rule_id = outcome.matched_rule_id.as_deref().unwrap_or(""),
                    evaluated = outcome.evaluated_rule_ids.len(),
                    elapsed_ms = elapsed.as_millis() as u64,
                    "触发器派发完成"
                );
                Ok(DispatchResult {
                    correlation_id,
                    outcome,
                    matched_rule: state.matched_rule,
                })
            }
            Err(e) => {
                warn!(error = %e, code = e.code(), "触发器派发失败");
                Err(e)
            }
        }
    }

    /// 依次评估绑定的规则
    async fn run(&self, trigger_key: &str, facts: &FactDocument, state: &mut DispatchState) -> Result<()> {
        let loaded = self.bindings.load_active_bindings(trigger_key).await?;
        state.module = loaded.module;
        state.has_bindings = !loaded.bindings.is_empty();

        let mut bindings = loaded.bindings;
        // 来源已排序，这里保证稳定的 sequence 顺序
        bindings.sort_by_key(|b| b.sequence);

        if bindings.is_empty() {
            debug!("触发器没有有效绑定");
        }

        let mut cache = DecisionTableCache::new();

        for binding in &bindings {
            state.evaluated_rule_ids.push(binding.rule_id.clone());

            let outcome = self
                .resolver
                .resolve(&binding.rule_json, facts, self.tables.as_ref(), &mut cache)
                .await?;

            if self.trace_enabled() {
                state.trace.push(format!(
                    "binding[{}] rule={}: {}",
                    binding.sequence,
                    binding.rule_id,
                    if outcome.matched { "MATCHED" } else { "NOT_MATCHED" }
                ));
                state
                    .trace
                    .extend(outcome.trace.iter().map(|t| format!("  {}", t)));
            }

            if !outcome.matched {
                continue;
            }

            debug!(rule_id = %binding.rule_id, sequence = binding.sequence, "规则命中");

            if state.matched_rule.is_none() {
                state.matched_rule = Some(MatchedRule {
                    rule_id: binding.rule_id.clone(),
                    rule_name: binding.rule_name.clone(),
                });
                state.outcome = EvaluationOutcome::matched(outcome.outputs);
            }

            if binding.stop_on_match {
                debug!(rule_id = %binding.rule_id, "stop_on_match 生效，停止后续评估");
                break;
            }
        }

        debug!(
            lookups = cache.misses(),
            cache_hits = cache.hits(),
            "决策表解析统计"
        );

        Ok(())
    }

    /// 写出执行日志，失败只告警
    async fn emit(&self, record: ExecutionLogRecord) {
        let Some(sink) = self.log_sink.as_ref().filter(|_| self.emit_logs) else {
            return;
        };

        let correlation_id = record.correlation_id;
        if let Err(e) = sink.emit(record).await {
            warn!(%correlation_id, error = %e, "执行日志写出失败");
        }
    }
}

/// 指标的 trigger 标签：只有加载到绑定的触发器使用自身键，避免调用方传入任意键扩大序列数
fn metric_trigger_label(trigger_key: &str, has_bindings: bool) -> &str {
    if has_bindings {
        trigger_key
    } else {
        UNKNOWN_TRIGGER_LABEL
    }
}

fn record_metrics(trigger_key: &str, status: ExecutionStatus, elapsed: Duration) {
    metrics::counter!(
        "rule_dispatch_total",
        "trigger" => trigger_key.to_string(),
        "status" => status.as_str()
    )
    .increment(1);
    metrics::histogram!("rule_dispatch_duration_seconds", "trigger" => trigger_key.to_string())
        .record(elapsed.as_secs_f64());
}
