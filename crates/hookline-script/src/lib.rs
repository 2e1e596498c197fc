use hookline_core::{HooklineError, Result};
use rhai::{Dynamic, Engine, Scope};

pub use rhai::AST;

/// Upper bound on operations per evaluation, so a runaway condition cannot
/// stall event dispatch.
const MAX_OPERATIONS: u64 = 100_000;

/// Rhai engine for rule conditions.
///
/// Compiled conditions are returned to the caller rather than cached here;
/// whoever owns the `AST` decides its lifetime.
pub struct ScriptEngine {
    engine: Engine,
}

impl Default for ScriptEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptEngine {
    pub fn new() -> Self {
        let mut engine = Engine::new();
        engine.set_max_operations(MAX_OPERATIONS);

        engine.register_fn("now_ms", || chrono::Utc::now().timestamp_millis());

        // Redirect print() to tracing::info!
        engine.on_print(|x| {
            tracing::info!("SCRIPT: {}", x);
        });

        Self { engine }
    }

    /// Compile a condition. `label` only appears in the error message.
    pub fn compile_condition(&self, label: &str, source: &str) -> Result<AST> {
        self.engine
            .compile(source)
            .map_err(|e| HooklineError::Script(format!("{}: {}", label, e)))
    }

    /// Evaluate a compiled condition against an event payload.
    ///
    /// The payload is visible to the script as `payload`. The script must
    /// produce a `bool`; anything else is an error.
    pub fn eval_condition(&self, ast: &AST, payload: &serde_json::Value) -> Result<bool> {
        let payload = rhai::serde::to_dynamic(payload)
            .map_err(|e| HooklineError::Script(e.to_string()))?;
        let mut scope = Scope::new();
        scope.push("payload", payload);

        let result: Dynamic = self
            .engine
            .eval_ast_with_scope(&mut scope, ast)
            .map_err(|e| HooklineError::Script(e.to_string()))?;

        result.as_bool().map_err(|type_name| {
            HooklineError::Script(format!("condition returned {}, expected bool", type_name))
        })
    }
}
