//! Opt-in error telemetry
//!
//! Reports are forwarded to the `telemetry` tracing target, where a host
//! can attach its own exporter. Nothing is emitted unless the user enabled
//! error logging in their preferences.

use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{error, warn};

pub const TELEMETRY_TARGET: &str = "telemetry";

/// User preferences relevant to the pipeline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    /// Off unless the user opts in
    pub error_logging_enabled: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportLevel {
    Error,
    Warning,
}

/// Fire-and-forget sink for unexpected failures.
pub trait ErrorReporter: Send + Sync {
    fn report(&self, level: ReportLevel, message: &str, context: Value);

    fn report_error(&self, message: &str, error: &dyn std::error::Error, context: Value) {
        let context = merge_context(
            context,
            [
                ("originalMessage", Value::from(message)),
                ("errorMessage", Value::from(error.to_string())),
            ],
        );
        self.report(ReportLevel::Error, message, context);
    }

    fn report_warning(&self, message: &str, context: Value) {
        self.report(ReportLevel::Warning, message, context);
    }
}

fn merge_context<const N: usize>(context: Value, extra: [(&str, Value); N]) -> Value {
    let mut map = match context {
        Value::Object(map) => map,
        Value::Null => serde_json::Map::new(),
        other => {
            let mut map = serde_json::Map::new();
            map.insert("context".to_string(), other);
            map
        }
    };
    for (key, value) in extra {
        map.insert(key.to_string(), value);
    }
    Value::Object(map)
}

/// Reporter that forwards to `tracing` when error logging is enabled.
#[derive(Debug, Default)]
pub struct TracingErrorReporter {
    enabled: AtomicBool,
}

impl TracingErrorReporter {
    pub fn new(preferences: Preferences) -> Self {
        Self {
            enabled: AtomicBool::new(preferences.error_logging_enabled),
        }
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Relaxed);
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }
}

impl ErrorReporter for TracingErrorReporter {
    fn report(&self, level: ReportLevel, message: &str, context: Value) {
        if !self.is_enabled() {
            return;
        }
        match level {
            ReportLevel::Error => {
                error!(target: TELEMETRY_TARGET, context = %context, "{}", message);
            }
            ReportLevel::Warning => {
                warn!(target: TELEMETRY_TARGET, context = %context, "{}", message);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn preferences_default_to_disabled() {
        assert!(!Preferences::default().error_logging_enabled);
        assert!(!TracingErrorReporter::new(Preferences::default()).is_enabled());
    }

    #[test]
    fn preferences_toggle_at_runtime() {
        let reporter = TracingErrorReporter::default();
        reporter.set_enabled(true);
        assert!(reporter.is_enabled());
        reporter.report_warning("Invalid analysis result", json!({ "productId": "B0TEST" }));
    }

    #[test]
    fn error_context_carries_original_message() {
        let error = std::io::Error::other("socket closed");
        let merged = merge_context(
            json!({ "productId": "B0TEST" }),
            [
                ("originalMessage", Value::from("Scoring failed")),
                ("errorMessage", Value::from(error.to_string())),
            ],
        );

        assert_eq!(merged["productId"], "B0TEST");
        assert_eq!(merged["originalMessage"], "Scoring failed");
        assert_eq!(merged["errorMessage"], "socket closed");
    }

    #[test]
    fn non_object_context_is_wrapped() {
        let merged = merge_context(json!("raw"), [("k", Value::from(1))]);
        assert_eq!(merged, json!({ "context": "raw", "k": 1 }));
    }
}
