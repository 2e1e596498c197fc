use thiserror::Error;

/// 分发过程中的可恢复错误
///
/// None of these escape `RuleEngine::trigger_event`; they are logged and
/// counted. An unknown rule name on update/remove is not an error at all and
/// is reported as `false`.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DispatchError {
    #[error("condition of rule {rule} failed: {message}")]
    ConditionEvaluation { rule: String, message: String },

    #[error("hook {hook} of rule {rule} failed: {message}")]
    HookExecution {
        rule: String,
        hook: String,
        message: String,
    },
}

/// Best-effort text for a caught panic payload.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic".to_string()
    }
}
