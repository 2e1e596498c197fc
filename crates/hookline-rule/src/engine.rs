use crate::definition::build_rule;
use crate::dispatcher::HookDispatcher;
use crate::hook::HookInvoker;
use crate::matcher;
use crate::model::{Rule, RulePatch};
use crate::registry::RuleRegistry;
use crate::scheduler;
use crate::stats::{MetricsCollector, TriggerMetrics};
use crate::telemetry;
use crate::throttle::ThrottleGate;
use hookline_config::{EngineConfig, RuleDefinition};
use hookline_core::EventBus;
use hookline_script::ScriptEngine;
use hookline_types::{events, Diagnostic, Event};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// 引擎内部状态：规则、节流、统计共用一把锁
#[derive(Debug, Default)]
struct EngineState {
    registry: RuleRegistry,
    throttle: ThrottleGate,
    metrics: MetricsCollector,
}

/// 规则引擎
///
/// `trigger_event` calls are serialized: each one runs its matched rules to
/// completion before the next begins. Hooks must therefore not await
/// `trigger_event` on the same engine.
pub struct RuleEngine {
    state: RwLock<EngineState>,

    /// 是否处理事件
    enabled: AtomicBool,

    /// 已关闭（不可恢复）
    shut_down: AtomicBool,

    dispatch_lock: Mutex<()>,

    dispatcher: HookDispatcher,

    /// EventBus 监听任务
    subscriptions: std::sync::Mutex<Vec<JoinHandle<()>>>,
}

impl RuleEngine {
    pub fn new(invoker: Arc<dyn HookInvoker>) -> Self {
        Self::with_config(invoker, &EngineConfig::default())
    }

    pub fn with_config(invoker: Arc<dyn HookInvoker>, config: &EngineConfig) -> Self {
        telemetry::describe_metrics();

        Self {
            state: RwLock::new(EngineState::default()),
            enabled: AtomicBool::new(config.enabled),
            shut_down: AtomicBool::new(false),
            dispatch_lock: Mutex::new(()),
            dispatcher: HookDispatcher::new(invoker),
            subscriptions: std::sync::Mutex::new(Vec::new()),
        }
    }

    /// 添加规则（同名覆盖）
    ///
    /// `name` is written into the stored rule.
    pub async fn add_rule(&self, name: impl Into<String>, mut rule: Rule) {
        rule.name = name.into();

        if self.is_shut_down() {
            warn!(rule = %rule.name, "Engine is shut down, rule not added");
            return;
        }

        let mut state = self.state.write().await;
        let replaced = state.registry.insert(rule.clone());
        telemetry::set_active_rules(state.registry.len());
        drop(state);

        if replaced {
            info!(rule = %rule.name, event = %rule.event_name, "Rule replaced");
        } else {
            info!(rule = %rule.name, event = %rule.event_name, priority = rule.priority, "Rule added");
        }
    }

    /// 删除规则，同时清理节流和统计
    pub async fn remove_rule(&self, name: &str) -> bool {
        let mut state = self.state.write().await;
        let removed = state.registry.remove(name).is_some();
        if removed {
            state.throttle.remove(name);
            state.metrics.remove(name);
            telemetry::set_active_rules(state.registry.len());
            info!(rule = %name, "Rule removed");
        } else {
            debug!(rule = %name, "Rule not found, nothing removed");
        }
        removed
    }

    /// 局部更新规则
    pub async fn update_rule(&self, name: &str, patch: RulePatch) -> bool {
        let updated = self.state.write().await.registry.update(name, patch);
        if updated {
            info!(rule = %name, "Rule updated");
        } else {
            debug!(rule = %name, "Rule not found, update ignored");
        }
        updated
    }

    /// 所有规则的副本
    pub async fn get_rules(&self) -> HashMap<String, Rule> {
        self.state.read().await.registry.snapshot()
    }

    pub async fn get_rule(&self, name: &str) -> Option<Rule> {
        self.state.read().await.registry.get(name).cloned()
    }

    pub async fn rule_count(&self) -> usize {
        self.state.read().await.registry.len()
    }

    /// 所有规则统计的副本
    pub async fn get_metrics(&self) -> HashMap<String, TriggerMetrics> {
        self.state.read().await.metrics.snapshot()
    }

    pub async fn get_rule_metrics(&self, name: &str) -> Option<TriggerMetrics> {
        self.state.read().await.metrics.get(name).cloned()
    }

    /// Compile and register declarative rules.
    ///
    /// Every definition is compiled before any is registered, so a script
    /// error leaves the engine untouched.
    pub async fn load_rules(
        &self,
        definitions: &[RuleDefinition],
        scripts: &Arc<ScriptEngine>,
    ) -> hookline_core::Result<usize> {
        let rules = definitions
            .iter()
            .map(|definition| build_rule(definition, scripts))
            .collect::<hookline_core::Result<Vec<_>>>()?;

        let count = rules.len();
        for rule in rules {
            let name = rule.name.clone();
            self.add_rule(name, rule).await;
        }

        info!("Loaded {} rules", count);
        Ok(count)
    }

    pub fn enable(&self) {
        if self.is_shut_down() {
            warn!("Engine is shut down, enable ignored");
            return;
        }
        self.enabled.store(true, Ordering::SeqCst);
        info!("Rule engine enabled");
    }

    pub fn disable(&self) {
        self.enabled.store(false, Ordering::SeqCst);
        info!("Rule engine disabled");
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst) && !self.is_shut_down()
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::SeqCst)
    }

    /// 关闭引擎：停止监听、清空所有状态，不可恢复
    pub async fn shutdown(&self) {
        if self.shut_down.swap(true, Ordering::SeqCst) {
            debug!("Rule engine already shut down");
            return;
        }
        self.enabled.store(false, Ordering::SeqCst);

        let handles: Vec<_> = self
            .subscriptions
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .drain(..)
            .collect();
        for handle in &handles {
            handle.abort();
        }

        let mut state = self.state.write().await;
        state.registry.clear();
        state.throttle.clear();
        state.metrics.clear();
        drop(state);
        telemetry::set_active_rules(0);

        info!(subscriptions = handles.len(), "Rule engine shut down");
    }

    /// Feed every event published on `bus` into this engine.
    ///
    /// The listener holds only a weak reference, so dropping the last
    /// `Arc<RuleEngine>` also ends it.
    pub fn attach(self: &Arc<Self>, bus: &EventBus) {
        if self.is_shut_down() {
            warn!("Engine is shut down, bus not attached");
            return;
        }

        let mut rx = bus.subscribe();
        let engine = Arc::downgrade(self);

        let handle = tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(event) => {
                        let Some(engine) = engine.upgrade() else {
                            break;
                        };
                        engine.trigger(&event).await;
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Rule engine lagged behind event bus");
                    }
                    Err(RecvError::Closed) => {
                        debug!("Event bus closed, listener stopped");
                        break;
                    }
                }
            }
        });

        self.subscriptions
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(handle);
        info!("Rule engine attached to event bus");
    }

    pub async fn trigger(&self, event: &Event) {
        debug!(event = %event.name, id = %event.id, "Event received");
        self.trigger_event(&event.name, event.payload.clone()).await;
    }

    /// 处理一个事件
    ///
    /// Never fails: condition and hook errors are logged and reflected in the
    /// rule's `success_rate`.
    pub async fn trigger_event(&self, event_name: &str, payload: Value) {
        if !self.is_enabled() {
            debug!(event = %event_name, "Rule engine disabled, event ignored");
            return;
        }

        let _guard = self.dispatch_lock.lock().await;
        if !self.is_enabled() {
            debug!(event = %event_name, "Rule engine disabled, event ignored");
            return;
        }

        telemetry::record_event_received(event_name);

        let matched = {
            let mut state = self.state.write().await;
            let EngineState {
                registry, throttle, ..
            } = &mut *state;
            matcher::match_event(registry, throttle, event_name, &payload)
        };

        if matched.is_empty() {
            debug!(event = %event_name, "No rules matched");
            return;
        }

        for rule in scheduler::schedule(matched) {
            if self.is_shut_down() {
                debug!(event = %event_name, "Engine shut down mid-dispatch, stopping");
                break;
            }

            let report = self.dispatcher.dispatch(&rule, &payload).await;
            let success_ratio = report.success_ratio();

            let mut state = self.state.write().await;
            if !state.registry.contains(&rule.name) {
                debug!(rule = %rule.name, "Rule removed during dispatch, metrics discarded");
                continue;
            }
            let metrics = state
                .metrics
                .record(&rule.name, report.duration, success_ratio)
                .clone();
            drop(state);

            telemetry::record_rule_executed(&rule.name, report.duration, report.failed());
            info!(
                rule = %rule.name,
                event = %event_name,
                succeeded = report.succeeded(),
                failed = report.failed(),
                duration_ms = report.duration.as_millis() as u64,
                total_triggered = metrics.total_triggered,
                "Rule executed"
            );
        }
    }

    pub async fn trigger_diagnostics(&self, file: &str, diagnostics: &[Diagnostic]) {
        self.trigger(&events::diagnostics_received(file, diagnostics))
            .await;
    }

    pub async fn trigger_hover(
        &self,
        file: &str,
        symbol: &str,
        result_count: usize,
        has_documentation: bool,
    ) {
        self.trigger(&events::hover_received(
            file,
            symbol,
            result_count,
            has_documentation,
        ))
        .await;
    }

    pub async fn trigger_server_started(&self, server_id: &str) {
        self.trigger(&events::server_started(server_id)).await;
    }

    pub async fn trigger_server_stopped(&self, server_id: &str) {
        self.trigger(&events::server_stopped(server_id)).await;
    }

    pub async fn trigger_error(&self, message: &str, context: Value) {
        self.trigger(&events::error_occurred(message, context)).await;
    }

    pub async fn trigger_performance(&self, operation: &str, duration_ms: u64) {
        self.trigger(&events::analysis_performance(operation, duration_ms))
            .await;
    }
}

impl Drop for RuleEngine {
    fn drop(&mut self) {
        let handles = self
            .subscriptions
            .get_mut()
            .unwrap_or_else(|e| e.into_inner());
        for handle in handles.drain(..) {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex as StdMutex;

    #[derive(Default)]
    struct RecordingInvoker {
        calls: StdMutex<Vec<String>>,
    }

    #[async_trait]
    impl HookInvoker for RecordingInvoker {
        async fn invoke_hook(&self, hook_name: &str, _payload: &Value) -> anyhow::Result<()> {
            self.calls.lock().unwrap().push(hook_name.to_string());
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_add_rule_uses_given_name() {
        let engine = RuleEngine::new(Arc::new(RecordingInvoker::default()));
        engine
            .add_rule("server_up", Rule::new("server_started").with_hooks(["status"]))
            .await;

        let rule = engine.get_rule("server_up").await.unwrap();
        assert_eq!(rule.name, "server_up");
        assert_eq!(engine.rule_count().await, 1);
    }

    #[tokio::test]
    async fn test_config_can_start_disabled() {
        let config = EngineConfig {
            enabled: false,
            ..Default::default()
        };
        let invoker = Arc::new(RecordingInvoker::default());
        let engine = RuleEngine::with_config(invoker.clone(), &config);
        engine
            .add_rule("up", Rule::new("server_started").with_hooks(["status"]))
            .await;

        assert!(!engine.is_enabled());
        engine.trigger_server_started("rust-analyzer").await;
        assert!(invoker.calls.lock().unwrap().is_empty());
        assert!(engine.get_metrics().await.is_empty());
    }

    #[tokio::test]
    async fn test_update_rule_patches_fields() {
        let engine = RuleEngine::new(Arc::new(RecordingInvoker::default()));
        engine
            .add_rule("r", Rule::new("e").with_priority(3).with_hooks(["a"]))
            .await;

        assert!(
            engine
                .update_rule("r", RulePatch::new().priority(-1))
                .await
        );
        assert!(!engine.update_rule("missing", RulePatch::new().priority(0)).await);

        let rule = engine.get_rule("r").await.unwrap();
        assert_eq!(rule.priority, -1);
        assert_eq!(rule.hooks, vec!["a"]);
    }

    #[tokio::test]
    async fn test_shutdown_is_terminal() {
        let invoker = Arc::new(RecordingInvoker::default());
        let engine = RuleEngine::new(invoker.clone());
        engine
            .add_rule("r", Rule::new("e").with_hooks(["a"]))
            .await;
        engine.trigger_event("e", json!({})).await;
        assert_eq!(engine.get_metrics().await.len(), 1);

        engine.shutdown().await;
        assert!(engine.is_shut_down());
        assert!(!engine.is_enabled());
        assert_eq!(engine.rule_count().await, 0);
        assert!(engine.get_metrics().await.is_empty());

        engine.enable();
        assert!(!engine.is_enabled());

        engine
            .add_rule("r", Rule::new("e").with_hooks(["a"]))
            .await;
        assert_eq!(engine.rule_count().await, 0);

        engine.trigger_event("e", json!({})).await;
        assert_eq!(invoker.calls.lock().unwrap().len(), 1);

        // Idempotent.
        engine.shutdown().await;
    }
}
