use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;

/// 节流门：记录每条规则最近一次触发时间
///
/// Keyed by rule name only. Two events about different files still share one
/// window per rule.
#[derive(Debug, Default)]
pub struct ThrottleGate {
    last_trigger: HashMap<String, Instant>,
}

impl ThrottleGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_throttled(&self, rule_name: &str, throttle: Option<Duration>) -> bool {
        self.is_throttled_at(rule_name, throttle, Instant::now())
    }

    pub fn is_throttled_at(&self, rule_name: &str, throttle: Option<Duration>, now: Instant) -> bool {
        let Some(window) = throttle else {
            return false;
        };

        match self.last_trigger.get(rule_name) {
            Some(last) => now.saturating_duration_since(*last) < window,
            None => false,
        }
    }

    pub fn record(&mut self, rule_name: &str, now: Instant) {
        self.last_trigger.insert(rule_name.to_string(), now);
    }

    pub fn last_trigger(&self, rule_name: &str) -> Option<Instant> {
        self.last_trigger.get(rule_name).copied()
    }

    pub fn remove(&mut self, rule_name: &str) -> bool {
        self.last_trigger.remove(rule_name).is_some()
    }

    pub fn len(&self) -> usize {
        self.last_trigger.len()
    }

    pub fn is_empty(&self) -> bool {
        self.last_trigger.is_empty()
    }

    pub fn clear(&mut self) {
        self.last_trigger.clear();
    }
}
