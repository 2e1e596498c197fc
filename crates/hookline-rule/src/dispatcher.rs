use crate::error::{panic_message, DispatchError};
use crate::hook::HookInvoker;
use crate::model::Rule;
use chrono::Utc;
use futures::future::join_all;
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, error};

/// Result of one hook invocation.
#[derive(Debug, Clone)]
pub struct HookOutcome {
    pub hook: String,
    pub result: Result<(), DispatchError>,
}

impl HookOutcome {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// 单条规则一次执行的结果
#[derive(Debug, Clone)]
pub struct DispatchReport {
    pub rule: String,
    /// One entry per hook, in the rule's hook order.
    pub outcomes: Vec<HookOutcome>,
    pub duration: Duration,
}

impl DispatchReport {
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_ok()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }

    /// Fraction of hooks that succeeded. A rule without hooks counts as a
    /// full success.
    pub fn success_ratio(&self) -> f64 {
        if self.outcomes.is_empty() {
            return 1.0;
        }
        self.succeeded() as f64 / self.outcomes.len() as f64
    }
}

/// Copy the event payload and stamp it with the triggering rule.
///
/// Non-object payloads are wrapped as `{"payload": ...}` first.
pub fn enrich_payload(payload: &Value, rule: &Rule) -> Value {
    let mut map = match payload {
        Value::Object(map) => map.clone(),
        other => {
            let mut map = Map::new();
            map.insert("payload".to_string(), other.clone());
            map
        }
    };

    map.insert("triggerRule".to_string(), Value::from(rule.name.clone()));
    map.insert("triggerPriority".to_string(), Value::from(rule.priority));
    map.insert("timestamp".to_string(), Value::from(Utc::now().to_rfc3339()));
    map.insert("sourceMarker".to_string(), Value::Bool(true));
    Value::Object(map)
}

/// 并发调用规则的全部 hook
pub struct HookDispatcher {
    invoker: Arc<dyn HookInvoker>,
}

impl HookDispatcher {
    pub fn new(invoker: Arc<dyn HookInvoker>) -> Self {
        Self { invoker }
    }

    /// Run every hook of `rule` on its own task and wait for all of them.
    ///
    /// A failing or panicking hook is recorded in its own outcome and never
    /// cancels its siblings.
    pub async fn dispatch(&self, rule: &Rule, payload: &Value) -> DispatchReport {
        let started = Instant::now();
        let enriched = Arc::new(enrich_payload(payload, rule));

        debug!(rule = %rule.name, hooks = ?rule.hooks, "Dispatching hooks");

        let handles: Vec<_> = rule
            .hooks
            .iter()
            .map(|hook| {
                let invoker = Arc::clone(&self.invoker);
                let payload = Arc::clone(&enriched);
                let hook = hook.clone();
                tokio::spawn(async move { invoker.invoke_hook(&hook, &payload).await })
            })
            .collect();

        let settled = join_all(handles).await;

        let outcomes = rule
            .hooks
            .iter()
            .zip(settled)
            .map(|(hook, joined)| {
                let message = match joined {
                    Ok(Ok(())) => None,
                    Ok(Err(e)) => Some(format!("{:#}", e)),
                    Err(join_err) if join_err.is_panic() => {
                        Some(panic_message(join_err.into_panic().as_ref()))
                    }
                    Err(join_err) => Some(join_err.to_string()),
                };

                let result = match message {
                    None => Ok(()),
                    Some(message) => {
                        let err = DispatchError::HookExecution {
                            rule: rule.name.clone(),
                            hook: hook.clone(),
                            message,
                        };
                        error!(rule = %rule.name, hook = %hook, error = %err, "Hook execution failed");
                        Err(err)
                    }
                };

                HookOutcome {
                    hook: hook.clone(),
                    result,
                }
            })
            .collect();

        DispatchReport {
            rule: rule.name.clone(),
            outcomes,
            duration: started.elapsed(),
        }
    }
}
