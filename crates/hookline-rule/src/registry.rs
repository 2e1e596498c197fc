use crate::model::{Rule, RulePatch};
use std::collections::HashMap;

/// 规则注册表（内存实现）
///
/// Keeps rules in registration order; candidate rules for an event are
/// yielded in that order, which is what the scheduler's stable sort relies on
/// for equal priorities. Overwriting a rule keeps its original position.
#[derive(Debug, Default)]
pub struct RuleRegistry {
    rules: Vec<Rule>,
}

impl RuleRegistry {
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.rules.iter().position(|r| r.name == name)
    }

    /// Insert or overwrite. Returns `true` when an existing rule was replaced.
    pub fn insert(&mut self, mut rule: Rule) -> bool {
        rule.normalize_hooks();
        match self.position(&rule.name) {
            Some(index) => {
                self.rules[index] = rule;
                true
            }
            None => {
                self.rules.push(rule);
                false
            }
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<Rule> {
        self.position(name).map(|index| self.rules.remove(index))
    }

    /// Apply a patch in place. Returns `false` if `name` is unknown.
    pub fn update(&mut self, name: &str, patch: RulePatch) -> bool {
        match self.rules.iter_mut().find(|r| r.name == name) {
            Some(rule) => {
                patch.apply(rule);
                true
            }
            None => false,
        }
    }

    pub fn get(&self, name: &str) -> Option<&Rule> {
        self.rules.iter().find(|r| r.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    /// Rules listening for `event_name`, in registration order.
    pub fn candidates<'a>(&'a self, event_name: &'a str) -> impl Iterator<Item = &'a Rule> + 'a {
        self.rules.iter().filter(move |r| r.event_name == event_name)
    }

    /// Owned copy of every rule keyed by name.
    pub fn snapshot(&self) -> HashMap<String, Rule> {
        self.rules
            .iter()
            .map(|r| (r.name.clone(), r.clone()))
            .collect()
    }

    pub fn names(&self) -> Vec<String> {
        self.rules.iter().map(|r| r.name.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn clear(&mut self) {
        self.rules.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn named(name: &str, event: &str) -> Rule {
        Rule {
            name: name.to_string(),
            ..Rule::new(event)
        }
    }

    #[test]
    fn test_insert_and_overwrite_keeps_position() {
        let mut registry = RuleRegistry::new();
        assert!(!registry.insert(named("a", "diagnostics_received")));
        assert!(!registry.insert(named("b", "diagnostics_received")));
        assert!(registry.insert(named("a", "hover_received")));

        assert_eq!(registry.names(), vec!["a", "b"]);
        assert_eq!(registry.get("a").unwrap().event_name, "hover_received");
    }

    #[test]
    fn test_candidates_filter_by_event() {
        let mut registry = RuleRegistry::new();
        registry.insert(named("a", "diagnostics_received"));
        registry.insert(named("b", "hover_received"));
        registry.insert(named("c", "diagnostics_received"));

        let names: Vec<_> = registry
            .candidates("diagnostics_received")
            .map(|r| r.name.as_str())
            .collect();
        assert_eq!(names, vec!["a", "c"]);
    }

    #[test]
    fn test_remove_and_update_miss() {
        let mut registry = RuleRegistry::new();
        registry.insert(named("a", "e"));

        assert!(!registry.update("missing", RulePatch::new().priority(1)));
        assert!(registry.remove("missing").is_none());
        assert!(registry.remove("a").is_some());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_snapshot_is_isolated() {
        let mut registry = RuleRegistry::new();
        registry.insert(named("a", "e").with_priority(5));

        let mut copy = registry.snapshot();
        copy.get_mut("a").unwrap().priority = 99;
        copy.remove("a");

        assert_eq!(registry.get("a").unwrap().priority, 5);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_insert_dedups_hooks() {
        let mut registry = RuleRegistry::new();
        registry.insert(named("a", "e").with_hooks(["audio", "audio", "status"]));
        assert_eq!(registry.get("a").unwrap().hooks, vec!["audio", "status"]);
    }
}
