//! Canonical code-intelligence events.
//!
//! The event source decodes language-server traffic and hands the engine one
//! of these shapes. Builders only arrange fields; they never interpret the
//! protocol themselves.

use crate::event::Event;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;

/// 事件类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    DiagnosticsReceived,
    HoverReceived,
    ServerStarted,
    ServerStopped,
    ErrorOccurred,
    AnalysisPerformance,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::DiagnosticsReceived => "diagnostics_received",
            EventKind::HoverReceived => "hover_received",
            EventKind::ServerStarted => "server_started",
            EventKind::ServerStopped => "server_stopped",
            EventKind::ErrorOccurred => "error_occurred",
            EventKind::AnalysisPerformance => "analysis_performance",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 诊断条目（LSP severity: 1=error 2=warning 3=info 4=hint）
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Diagnostic {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<u8>,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl Diagnostic {
    pub fn new(severity: u8, message: impl Into<String>) -> Self {
        Self {
            severity: Some(severity),
            message: message.into(),
            source: None,
        }
    }
}

fn count_severity(diagnostics: &[Diagnostic], severity: u8) -> usize {
    diagnostics
        .iter()
        .filter(|d| d.severity == Some(severity))
        .count()
}

/// 诊断结果事件
pub fn diagnostics_received(file: &str, diagnostics: &[Diagnostic]) -> Event {
    Event::new(
        EventKind::DiagnosticsReceived.as_str(),
        json!({
            "file": file,
            "diagnostics": diagnostics,
            "error_count": count_severity(diagnostics, 1),
            "warning_count": count_severity(diagnostics, 2),
            "info_count": count_severity(diagnostics, 3),
            "hint_count": count_severity(diagnostics, 4),
            "total_count": diagnostics.len(),
        }),
    )
}

/// 悬停结果事件
pub fn hover_received(file: &str, symbol: &str, result_count: usize, has_documentation: bool) -> Event {
    Event::new(
        EventKind::HoverReceived.as_str(),
        json!({
            "file": file,
            "symbol": symbol,
            "result_count": result_count,
            "has_documentation": has_documentation,
        }),
    )
}

pub fn server_started(server_id: &str) -> Event {
    Event::new(
        EventKind::ServerStarted.as_str(),
        json!({ "server_id": server_id }),
    )
}

pub fn server_stopped(server_id: &str) -> Event {
    Event::new(
        EventKind::ServerStopped.as_str(),
        json!({ "server_id": server_id }),
    )
}

/// 错误事件，`context` 原样附带
pub fn error_occurred(message: &str, context: Value) -> Event {
    Event::new(
        EventKind::ErrorOccurred.as_str(),
        json!({
            "error_message": message,
            "context": context,
        }),
    )
}

/// 性能观测事件
pub fn analysis_performance(operation: &str, duration_ms: u64) -> Event {
    Event::new(
        EventKind::AnalysisPerformance.as_str(),
        json!({
            "operation": operation,
            "duration_ms": duration_ms,
        }),
    )
}
