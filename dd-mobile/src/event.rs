// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Immutable telemetry event records.
//!
//! One record is handed to the sink per terminal API call (log
//! emission, span finish, view stop, resource stop). Records are
//! snapshots; closing a span or resource produces a new record rather
//! than mutating anything previously emitted.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use crate::attribute::AttributeValue;

/// Nanoseconds since the UNIX epoch.
pub fn unix_nanos_now() -> u64 {
    std::time::UNIX_EPOCH
        .elapsed()
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[non_exhaustive]
pub enum LogLevel {
    Debug,
    Info,
    Notice,
    Warn,
    Error,
    Critical,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let level = match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Notice => "notice",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
            LogLevel::Critical => "critical",
        };
        write!(f, "{level}")
    }
}

/// A host-side error attached to a log, span or RUM error event.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct ErrorInfo {
    pub kind: Option<String>,
    pub message: String,
    pub stack: Option<String>,
}

impl ErrorInfo {
    pub fn new(message: impl Into<String>) -> Self {
        ErrorInfo {
            kind: None,
            message: message.into(),
            stack: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[non_exhaustive]
pub enum ActionType {
    Tap,
    Scroll,
    Swipe,
    Click,
    Back,
    Custom,
}

/// Where a RUM error originated, in the host application's terms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[non_exhaustive]
pub enum ErrorSource {
    Source,
    Network,
    Webview,
    Console,
    Custom,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ViewPhase {
    Start,
    Stop,
}

/// Terminal state of a tracked network resource.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ResourceOutcome {
    Success { status_code: u16, size_bytes: u64 },
    Error { message: String, source: ErrorSource },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogEvent {
    pub logger_name: String,
    pub level: LogLevel,
    pub message: String,
    pub error: Option<ErrorInfo>,
    pub attributes: HashMap<String, AttributeValue>,
    pub tags: Vec<String>,
    pub timestamp_ns: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpanEvent {
    pub trace_id: u128,
    pub span_id: u64,
    pub parent_id: u64,
    pub operation: String,
    pub start_ns: u64,
    pub duration_ns: u64,
    pub tags: HashMap<String, AttributeValue>,
    pub error: Option<ErrorInfo>,
    pub sampling_priority: Option<i8>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RumActionEvent {
    pub action_type: ActionType,
    pub name: String,
    pub attributes: HashMap<String, AttributeValue>,
    pub session_id: Option<String>,
    pub timestamp_ns: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RumResourceEvent {
    pub key: String,
    pub method: String,
    pub url: String,
    pub outcome: ResourceOutcome,
    pub start_ns: u64,
    pub duration_ns: u64,
    pub attributes: HashMap<String, AttributeValue>,
    pub session_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RumErrorEvent {
    pub message: String,
    pub source: ErrorSource,
    pub error: Option<ErrorInfo>,
    pub attributes: HashMap<String, AttributeValue>,
    pub session_id: Option<String>,
    pub timestamp_ns: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RumViewEvent {
    pub key: String,
    pub name: String,
    pub phase: ViewPhase,
    /// Set on the `Stop` record only.
    pub duration_ns: Option<u64>,
    /// Custom timings recorded against the view, in nanoseconds since
    /// the view started. Set on the `Stop` record only.
    pub timings: BTreeMap<String, u64>,
    pub attributes: HashMap<String, AttributeValue>,
    pub session_id: Option<String>,
    pub timestamp_ns: u64,
}

/// One emitted telemetry unit, handed to the sink exactly once.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[non_exhaustive]
pub enum EventRecord {
    Log(LogEvent),
    Span(SpanEvent),
    RumAction(RumActionEvent),
    RumResource(RumResourceEvent),
    RumError(RumErrorEvent),
    RumView(RumViewEvent),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unix_nanos_now_is_monotonic_enough() {
        let a = unix_nanos_now();
        let b = unix_nanos_now();
        assert!(a > 0);
        assert!(b >= a);
    }

    #[test]
    fn test_log_level_ordering() {
        assert!(LogLevel::Debug < LogLevel::Info);
        assert!(LogLevel::Error < LogLevel::Critical);
        assert_eq!(LogLevel::Notice.to_string(), "notice");
    }
}
