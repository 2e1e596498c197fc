//! Event-driven rule dispatch for code-intelligence events.
//!
//! An event (`diagnostics_received`, `hover_received`, ...) is matched against
//! registered [`Rule`]s. Matching rules are throttled per rule name, ordered by
//! ascending priority, and each one fans out to its hooks concurrently. All
//! hooks of a rule settle before the next rule starts, and the outcome feeds
//! the rule's rolling [`TriggerMetrics`].
//!
//! Condition and hook failures never leave [`RuleEngine::trigger_event`]; they
//! are logged and show up in `success_rate`.

pub mod definition;
pub mod dispatcher;
pub mod engine;
pub mod error;
pub mod hook;
pub mod matcher;
pub mod model;
pub mod registry;
pub mod scheduler;
pub mod stats;
pub mod telemetry;
pub mod throttle;

pub use definition::{build_rule, script_condition};
pub use dispatcher::{DispatchReport, HookDispatcher, HookOutcome};
pub use engine::RuleEngine;
pub use error::DispatchError;
pub use hook::{FnHook, Hook, HookInvoker, HookRegistry};
pub use model::{Condition, Rule, RulePatch};
pub use registry::RuleRegistry;
pub use stats::{MetricsCollector, TriggerMetrics};
pub use throttle::ThrottleGate;
