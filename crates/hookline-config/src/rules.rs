use serde::{Deserialize, Serialize};
use std::time::Duration;

/// 声明式规则定义（来自配置文件）
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct RuleDefinition {
    pub name: String,

    /// 匹配的事件名称
    pub event: String,

    /// Rhai 条件表达式，缺省表示总是匹配
    #[serde(default)]
    pub condition: Option<String>,

    /// 节流窗口（毫秒）
    #[serde(default)]
    pub throttle_ms: Option<u64>,

    /// 优先级，数字越小越先执行
    #[serde(default)]
    pub priority: i32,

    #[serde(default)]
    pub hooks: Vec<String>,
}

impl RuleDefinition {
    pub fn throttle(&self) -> Option<Duration> {
        self.throttle_ms.map(Duration::from_millis)
    }
}
