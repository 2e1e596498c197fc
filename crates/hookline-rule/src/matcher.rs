use crate::error::{panic_message, DispatchError};
use crate::model::Rule;
use crate::registry::RuleRegistry;
use crate::telemetry;
use crate::throttle::ThrottleGate;
use serde_json::Value;
use std::panic::{catch_unwind, AssertUnwindSafe};
use tokio::time::Instant;
use tracing::{debug, warn};

/// Evaluate a rule's condition, turning both `Err` and panics into
/// [`DispatchError::ConditionEvaluation`].
pub fn evaluate_condition(rule: &Rule, payload: &Value) -> Result<bool, DispatchError> {
    match catch_unwind(AssertUnwindSafe(|| rule.condition.evaluate(payload))) {
        Ok(Ok(matched)) => Ok(matched),
        Ok(Err(e)) => Err(DispatchError::ConditionEvaluation {
            rule: rule.name.clone(),
            message: e.to_string(),
        }),
        Err(panic) => Err(DispatchError::ConditionEvaluation {
            rule: rule.name.clone(),
            message: panic_message(panic.as_ref()),
        }),
    }
}

/// Select the rules that fire for one event.
///
/// Candidates are evaluated in registration order. A rule that matches and
/// is not throttled has its trigger time reserved immediately, before any of
/// its hooks run, so a burst of identical events cannot fire it twice.
pub fn match_event(
    registry: &RuleRegistry,
    throttle: &mut ThrottleGate,
    event_name: &str,
    payload: &Value,
) -> Vec<Rule> {
    let mut matched = Vec::new();

    for rule in registry.candidates(event_name) {
        match evaluate_condition(rule, payload) {
            Ok(true) => {}
            Ok(false) => {
                debug!(rule = %rule.name, event = %event_name, "Condition not met");
                continue;
            }
            Err(e) => {
                warn!(rule = %rule.name, event = %event_name, error = %e, "Condition evaluation failed, rule skipped");
                telemetry::record_condition_error(&rule.name);
                continue;
            }
        }

        let now = Instant::now();
        if throttle.is_throttled_at(&rule.name, rule.throttle, now) {
            debug!(rule = %rule.name, event = %event_name, throttle = ?rule.throttle, "Rule throttled");
            telemetry::record_rule_throttled(&rule.name);
            continue;
        }

        throttle.record(&rule.name, now);
        matched.push(rule.clone());
    }

    matched
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Condition;
    use serde_json::json;
    use std::time::Duration;

    fn registry_with(rules: Vec<Rule>) -> RuleRegistry {
        let mut registry = RuleRegistry::new();
        for rule in rules {
            registry.insert(rule);
        }
        registry
    }

    fn rule(name: &str, event: &str) -> Rule {
        Rule {
            name: name.to_string(),
            ..Rule::new(event)
        }
    }

    #[test]
    fn test_condition_error_is_caught() {
        let r = rule("broken", "e").with_condition(Condition::new(|_| anyhow::bail!("missing field")));
        let err = evaluate_condition(&r, &json!({})).unwrap_err();
        assert_eq!(
            err,
            DispatchError::ConditionEvaluation {
                rule: "broken".to_string(),
                message: "missing field".to_string(),
            }
        );
    }

    #[test]
    fn test_condition_panic_is_caught() {
        let r = rule("panics", "e").with_condition(Condition::predicate(|p| {
            p["list"].as_array().expect("list required").is_empty()
        }));
        assert!(evaluate_condition(&r, &json!({})).is_err());
    }

    #[test]
    fn test_filters_by_event_and_condition() {
        let registry = registry_with(vec![
            rule("errors", "diagnostics_received")
                .with_condition(Condition::predicate(|p| p["error_count"].as_u64() > Some(0))),
            rule("any_diag", "diagnostics_received"),
            rule("hover", "hover_received"),
        ]);
        let mut gate = ThrottleGate::new();

        let matched = match_event(&registry, &mut gate, "diagnostics_received", &json!({"error_count": 0}));
        let names: Vec<_> = matched.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["any_diag"]);
    }

    #[test]
    fn test_broken_condition_does_not_block_siblings() {
        let registry = registry_with(vec![
            rule("broken", "e").with_condition(Condition::new(|_| anyhow::bail!("boom"))),
            rule("valid", "e"),
        ]);
        let mut gate = ThrottleGate::new();

        let matched = match_event(&registry, &mut gate, "e", &json!({}));
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].name, "valid");
        assert!(gate.last_trigger("broken").is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_reservation_before_dispatch() {
        let registry = registry_with(vec![rule("r", "e").with_throttle_ms(1000)]);
        let mut gate = ThrottleGate::new();

        assert_eq!(match_event(&registry, &mut gate, "e", &json!({})).len(), 1);
        assert!(gate.last_trigger("r").is_some());
        // Second event arrives before any hook could have finished.
        assert!(match_event(&registry, &mut gate, "e", &json!({})).is_empty());

        tokio::time::advance(Duration::from_millis(1000)).await;
        assert_eq!(match_event(&registry, &mut gate, "e", &json!({})).len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_throttled_match_does_not_refresh_timestamp() {
        let registry = registry_with(vec![rule("r", "e").with_throttle_ms(1000)]);
        let mut gate = ThrottleGate::new();

        match_event(&registry, &mut gate, "e", &json!({}));
        let first = gate.last_trigger("r").unwrap();

        tokio::time::advance(Duration::from_millis(600)).await;
        assert!(match_event(&registry, &mut gate, "e", &json!({})).is_empty());
        assert_eq!(gate.last_trigger("r"), Some(first));
    }
}
