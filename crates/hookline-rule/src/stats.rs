use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// 规则触发统计（滚动平均）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerMetrics {
    /// 执行次数
    pub total_triggered: u64,

    /// 最后执行时间
    pub last_triggered: Option<DateTime<Utc>>,

    /// 平均响应时间（毫秒）
    pub average_response_time_ms: f64,

    /// hook 成功率 [0, 1]
    pub success_rate: f64,
}

impl TriggerMetrics {
    /// Fold one execution into the running means.
    pub fn record(&mut self, duration_ms: f64, success_ratio: f64) {
        self.total_triggered += 1;
        let n = self.total_triggered as f64;

        self.average_response_time_ms =
            (self.average_response_time_ms * (n - 1.0) + duration_ms) / n;
        self.success_rate = (self.success_rate * (n - 1.0) + success_ratio) / n;
        self.last_triggered = Some(Utc::now());
    }
}

/// Per-rule rolling statistics.
#[derive(Debug, Default)]
pub struct MetricsCollector {
    metrics: HashMap<String, TriggerMetrics>,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an execution, creating the entry with zeroed defaults on first
    /// use.
    pub fn record(&mut self, rule_name: &str, duration: Duration, success_ratio: f64) -> &TriggerMetrics {
        let entry = self.metrics.entry(rule_name.to_string()).or_default();
        entry.record(duration.as_secs_f64() * 1000.0, success_ratio);
        entry
    }

    pub fn get(&self, rule_name: &str) -> Option<&TriggerMetrics> {
        self.metrics.get(rule_name)
    }

    pub fn snapshot(&self) -> HashMap<String, TriggerMetrics> {
        self.metrics.clone()
    }

    pub fn remove(&mut self, rule_name: &str) -> bool {
        self.metrics.remove(rule_name).is_some()
    }

    pub fn len(&self) -> usize {
        self.metrics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }

    pub fn clear(&mut self) {
        self.metrics.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_record_creates_entry() {
        let mut collector = MetricsCollector::new();
        assert!(collector.get("a").is_none());

        let metrics = collector.record("a", Duration::from_millis(40), 1.0).clone();
        assert_eq!(metrics.total_triggered, 1);
        assert!((metrics.average_response_time_ms - 40.0).abs() < 1e-9);
        assert!((metrics.success_rate - 1.0).abs() < 1e-9);
        assert!(metrics.last_triggered.is_some());
    }

    #[test]
    fn test_incremental_means() {
        let mut metrics = TriggerMetrics::default();
        metrics.record(100.0, 1.0);
        metrics.record(300.0, 0.5);
        metrics.record(200.0, 0.0);

        assert_eq!(metrics.total_triggered, 3);
        assert!((metrics.average_response_time_ms - 200.0).abs() < 1e-9);
        assert!((metrics.success_rate - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_remove_and_clear() {
        let mut collector = MetricsCollector::new();
        collector.record("a", Duration::ZERO, 1.0);
        collector.record("b", Duration::ZERO, 1.0);

        assert!(collector.remove("a"));
        assert!(!collector.remove("a"));
        assert_eq!(collector.len(), 1);

        collector.clear();
        assert!(collector.is_empty());
    }

    #[test]
    fn test_serializes_iso8601() {
        let mut metrics = TriggerMetrics::default();
        metrics.record(10.0, 1.0);

        let json = serde_json::to_value(&metrics).unwrap();
        assert_eq!(json["totalTriggered"], 1);
        let stamp = json["lastTriggered"].as_str().unwrap();
        assert!(DateTime::parse_from_rfc3339(stamp).is_ok());
    }
}
