use thiserror::Error;

/// hookline 统一错误类型
#[derive(Error, Debug)]
pub enum HooklineError {
    #[error("EventBus error: {0}")]
    EventBus(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Script error: {0}")]
    Script(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result 类型别名
pub type Result<T> = std::result::Result<T, HooklineError>;

impl From<anyhow::Error> for HooklineError {
    fn from(err: anyhow::Error) -> Self {
        HooklineError::Internal(err.to_string())
    }
}

impl<T> From<tokio::sync::broadcast::error::SendError<T>> for HooklineError {
    fn from(err: tokio::sync::broadcast::error::SendError<T>) -> Self {
        HooklineError::EventBus(err.to_string())
    }
}
