use crate::model::{Condition, Rule};
use hookline_config::RuleDefinition;
use hookline_core::Result;
use hookline_script::{ScriptEngine, AST};
use std::sync::Arc;

/// Wrap a compiled script as a [`Condition`].
///
/// The condition owns its `AST`; dropping the rule frees the script.
pub fn script_condition(scripts: &Arc<ScriptEngine>, ast: Arc<AST>) -> Condition {
    let scripts = Arc::clone(scripts);
    Condition::new(move |payload| Ok(scripts.eval_condition(&ast, payload)?))
}

/// Compile a declarative rule into a [`Rule`].
///
/// Compiling has no side effects on `scripts`, so a definition that fails
/// to build leaves every existing rule as it was.
pub fn build_rule(definition: &RuleDefinition, scripts: &Arc<ScriptEngine>) -> Result<Rule> {
    let condition = match &definition.condition {
        Some(source) => {
            let ast = scripts.compile_condition(&definition.name, source)?;
            script_condition(scripts, Arc::new(ast))
        }
        None => Condition::always(),
    };

    Ok(Rule {
        name: definition.name.clone(),
        event_name: definition.event.clone(),
        condition,
        throttle: definition.throttle(),
        priority: definition.priority,
        hooks: definition.hooks.clone(),
    })
}
