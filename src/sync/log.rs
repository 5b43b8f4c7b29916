//! Per-screen activity log.
//!
//! Every non-fatal failure in the pipeline lands here instead of aborting
//! the run. Entries are bucketed by screen name, kept in arrival order
//! within a bucket, and the buckets are sorted by screen name only when
//! the log is serialized at the end of the run.

use std::collections::HashMap;

use serde::Serialize;
use serde_json::Value;

/// Bucket used when a failure has no screen context.
pub const UNKNOWN_SCREEN: &str = "unknown";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_detail: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ScreenBucket<'a> {
    screen: &'a str,
    entries: &'a [LogEntry],
}

#[derive(Debug, Default)]
pub struct ActivityLog {
    buckets: HashMap<String, Vec<LogEntry>>,
}

impl ActivityLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an error. `screen` of `None` lands in the `unknown` bucket.
    pub fn error(&mut self, screen: Option<&str>, description: impl Into<String>) {
        let description = description.into();
        tracing::error!(screen = screen.unwrap_or(UNKNOWN_SCREEN), "{}", description);
        self.push(screen, description, None);
    }

    /// Record an error carrying extra detail (a failing URL, a parser message).
    pub fn error_with_detail(
        &mut self,
        screen: Option<&str>,
        description: impl Into<String>,
        detail: impl Into<String>,
    ) {
        let description = description.into();
        let detail = detail.into();
        tracing::error!(
            screen = screen.unwrap_or(UNKNOWN_SCREEN),
            detail = %detail,
            "{}",
            description
        );
        self.push(screen, description, Some(detail));
    }

    /// Record a warning. Warnings share the bucket with errors and are only
    /// distinguished by their description text.
    pub fn warning(&mut self, screen: Option<&str>, description: impl Into<String>) {
        let description = description.into();
        tracing::warn!(screen = screen.unwrap_or(UNKNOWN_SCREEN), "{}", description);
        self.push(screen, description, None);
    }

    fn push(&mut self, screen: Option<&str>, description: String, error_detail: Option<String>) {
        self.buckets
            .entry(screen.unwrap_or(UNKNOWN_SCREEN).to_string())
            .or_default()
            .push(LogEntry {
                description,
                error_detail,
            });
    }

    /// Entries recorded for one screen, in arrival order.
    pub fn bucket(&self, screen: &str) -> &[LogEntry] {
        self.buckets.get(screen).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn total_entries(&self) -> usize {
        self.buckets.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Serialize as a list of screen buckets, sorted by screen name.
    pub fn to_json(&self) -> Value {
        let mut names: Vec<&String> = self.buckets.keys().collect();
        names.sort();
        let buckets: Vec<ScreenBucket<'_>> = names
            .into_iter()
            .map(|name| ScreenBucket {
                screen: name,
                entries: &self.buckets[name],
            })
            .collect();
        serde_json::to_value(buckets).unwrap_or(Value::Null)
    }
}
