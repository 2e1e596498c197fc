pub mod global;
pub mod loader;
pub mod rules;

pub use global::{EngineConfig, HooklineConfig, LogFormat, LoggingConfig};
pub use loader::ConfigLoader;
pub use rules::RuleDefinition;
