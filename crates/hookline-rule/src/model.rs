use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

type ConditionFn = dyn Fn(&Value) -> anyhow::Result<bool> + Send + Sync;

/// 规则条件（对事件 payload 求值）
///
/// Returning `Err` (or panicking) marks the rule as not matched for that
/// event; the matcher logs it and carries on with the remaining rules.
#[derive(Clone)]
pub struct Condition(Arc<ConditionFn>);

impl Condition {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&Value) -> anyhow::Result<bool> + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    /// Infallible predicate.
    pub fn predicate<F>(f: F) -> Self
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        Self::new(move |payload| Ok(f(payload)))
    }

    pub fn always() -> Self {
        Self::predicate(|_| true)
    }

    pub fn evaluate(&self, payload: &Value) -> anyhow::Result<bool> {
        (self.0)(payload)
    }
}

impl Default for Condition {
    fn default() -> Self {
        Self::always()
    }
}

impl fmt::Debug for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Condition(..)")
    }
}

/// 规则定义
#[derive(Debug, Clone, Default)]
pub struct Rule {
    /// 规则名称（唯一键）
    ///
    /// Builders leave this empty; `RuleEngine::add_rule` writes its `name`
    /// argument here.
    pub name: String,

    /// 匹配的事件名称
    pub event_name: String,

    /// 触发条件
    pub condition: Condition,

    /// 节流窗口，None 表示不节流
    pub throttle: Option<Duration>,

    /// 优先级（数字越小越先执行）
    pub priority: i32,

    /// 按顺序调用的 hook 名称
    pub hooks: Vec<String>,
}

impl Rule {
    /// A rule listening for `event_name`. The name is supplied when the rule
    /// is registered.
    pub fn new(event_name: impl Into<String>) -> Self {
        Self {
            event_name: event_name.into(),
            ..Default::default()
        }
    }

    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.condition = condition;
        self
    }

    pub fn with_throttle(mut self, throttle: Duration) -> Self {
        self.throttle = Some(throttle);
        self
    }

    pub fn with_throttle_ms(self, throttle_ms: u64) -> Self {
        self.with_throttle(Duration::from_millis(throttle_ms))
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_hooks<I, S>(mut self, hooks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.hooks = hooks.into_iter().map(Into::into).collect();
        self
    }

    /// Drop repeated hook names, keeping the first occurrence.
    pub(crate) fn normalize_hooks(&mut self) {
        let mut seen = std::collections::HashSet::new();
        self.hooks.retain(|hook| seen.insert(hook.clone()));
    }
}

/// 规则局部更新
///
/// Each `Some` field replaces the stored value; `None` leaves it untouched.
/// The rule name is the registry key and cannot be patched. `throttle` is
/// doubly optional so a patch can clear a window with `Some(None)`.
#[derive(Debug, Clone, Default)]
pub struct RulePatch {
    pub event_name: Option<String>,
    pub condition: Option<Condition>,
    pub throttle: Option<Option<Duration>>,
    pub priority: Option<i32>,
    pub hooks: Option<Vec<String>>,
}

impl RulePatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn event_name(mut self, event_name: impl Into<String>) -> Self {
        self.event_name = Some(event_name.into());
        self
    }

    pub fn condition(mut self, condition: Condition) -> Self {
        self.condition = Some(condition);
        self
    }

    pub fn throttle(mut self, throttle: Option<Duration>) -> Self {
        self.throttle = Some(throttle);
        self
    }

    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn hooks<I, S>(mut self, hooks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.hooks = Some(hooks.into_iter().map(Into::into).collect());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.event_name.is_none()
            && self.condition.is_none()
            && self.throttle.is_none()
            && self.priority.is_none()
            && self.hooks.is_none()
    }

    pub fn apply(self, rule: &mut Rule) {
        if let Some(event_name) = self.event_name {
            rule.event_name = event_name;
        }
        if let Some(condition) = self.condition {
            rule.condition = condition;
        }
        if let Some(throttle) = self.throttle {
            rule.throttle = throttle;
        }
        if let Some(priority) = self.priority {
            rule.priority = priority;
        }
        if let Some(hooks) = self.hooks {
            rule.hooks = hooks;
            rule.normalize_hooks();
        }
    }
}
