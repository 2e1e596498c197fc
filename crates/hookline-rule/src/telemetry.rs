//! Process-wide counters reported through the `metrics` facade.
//!
//! Nothing is exported unless the host installs a recorder (for example a
//! Prometheus exporter); without one every call here is a no-op.

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use std::sync::Once;
use std::time::Duration;

static DESCRIBE: Once = Once::new();

/// 描述所有指标
pub fn describe_metrics() {
    DESCRIBE.call_once(|| {
        describe_counter!(
            "hookline_events_received_total",
            "Total number of events processed by the engine"
        );
        describe_counter!(
            "hookline_rules_triggered_total",
            "Total number of rule executions"
        );
        describe_counter!(
            "hookline_rules_throttled_total",
            "Total number of matches suppressed by throttling"
        );
        describe_counter!(
            "hookline_condition_errors_total",
            "Total number of rule conditions that failed to evaluate"
        );
        describe_counter!(
            "hookline_hooks_failed_total",
            "Total number of failed hook invocations"
        );
        describe_histogram!(
            "hookline_rule_duration_seconds",
            "Hook batch duration per rule execution in seconds"
        );
        describe_gauge!("hookline_rules_active", "Number of registered rules");
    });
}

/// 记录事件接收
pub fn record_event_received(event_name: &str) {
    counter!("hookline_events_received_total", 1, "event" => event_name.to_string());
}

/// 记录规则执行
pub fn record_rule_executed(rule_name: &str, duration: Duration, failed_hooks: usize) {
    counter!("hookline_rules_triggered_total", 1, "rule" => rule_name.to_string());
    histogram!(
        "hookline_rule_duration_seconds",
        duration.as_secs_f64(),
        "rule" => rule_name.to_string()
    );
    if failed_hooks > 0 {
        counter!(
            "hookline_hooks_failed_total",
            failed_hooks as u64,
            "rule" => rule_name.to_string()
        );
    }
}

/// 记录节流
pub fn record_rule_throttled(rule_name: &str) {
    counter!("hookline_rules_throttled_total", 1, "rule" => rule_name.to_string());
}

/// 记录条件求值失败
pub fn record_condition_error(rule_name: &str) {
    counter!("hookline_condition_errors_total", 1, "rule" => rule_name.to_string());
}

/// 设置活跃规则数量
pub fn set_active_rules(count: usize) {
    gauge!("hookline_rules_active", count as f64);
}
