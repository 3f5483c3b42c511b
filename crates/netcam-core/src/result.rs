//! Check results and their audit logs
//!
//! A [`CheckResult`] is produced once per (device, check) per run by the
//! reconciliation functions in [`crate::measure`] and [`crate::exclusive`],
//! and is not modified afterwards. Its `check_id` is always derived from
//! the originating check.

use crate::check::Check;
use crate::status::CheckStatus;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::cmp::Ordering;

/// One `(status, field, detail)` audit entry; persisted as a 3-element array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry(pub CheckStatus, pub String, pub Value);

impl LogEntry {
    pub fn status(&self) -> CheckStatus {
        self.0
    }

    pub fn field(&self) -> &str {
        &self.1
    }

    pub fn detail(&self) -> &Value {
        &self.2
    }
}

/// Ordered record of every comparison performed for a result.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResultLogs(Vec<LogEntry>);

impl ResultLogs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn log(&mut self, status: CheckStatus, field: impl Into<String>, detail: impl Into<Value>) {
        self.0.push(LogEntry(status, field.into(), detail.into()));
    }

    pub fn pass(&mut self, field: impl Into<String>, detail: impl Into<Value>) {
        self.log(CheckStatus::Pass, field, detail);
    }

    pub fn info(&mut self, field: impl Into<String>, detail: impl Into<Value>) {
        self.log(CheckStatus::Info, field, detail);
    }

    pub fn warn(&mut self, field: impl Into<String>, detail: impl Into<Value>) {
        self.log(CheckStatus::Warn, field, detail);
    }

    pub fn fail(&mut self, field: impl Into<String>, detail: impl Into<Value>) {
        self.log(CheckStatus::Fail, field, detail);
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.0
    }

    pub fn iter(&self) -> std::slice::Iter<'_, LogEntry> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// First entry logged for `field`.
    pub fn find(&self, field: &str) -> Option<&LogEntry> {
        self.0.iter().find(|e| e.field() == field)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "ResultRecord", from = "ResultRecord")]
pub struct CheckResult {
    status: CheckStatus,
    device: String,
    check: Check,
    field: Option<String>,
    measurement: Value,
    logs: ResultLogs,
}

impl CheckResult {
    pub(crate) fn from_parts(
        status: CheckStatus,
        device: String,
        check: Check,
        field: Option<String>,
        measurement: Value,
        logs: ResultLogs,
    ) -> Self {
        Self {
            status,
            device,
            check,
            field,
            measurement,
            logs,
        }
    }

    /// Synthetic result that records a check as not executed.
    pub fn skip(device: impl Into<String>, check: Check, message: impl Into<String>) -> Self {
        Self::synthetic(CheckStatus::Skip, device, check, message)
    }

    /// Synthetic failure not tied to a measurement (unreachable device, timeout).
    pub fn failure(device: impl Into<String>, check: Check, message: impl Into<String>) -> Self {
        Self::synthetic(CheckStatus::Fail, device, check, message)
    }

    /// Informational result carrying an observation with no expectation.
    pub fn info(device: impl Into<String>, check: Check, measurement: Value) -> Self {
        let mut logs = ResultLogs::new();
        logs.info("measurement", measurement.clone());
        Self::from_parts(CheckStatus::Info, device.into(), check, None, measurement, logs)
    }

    /// Fail a result whose entity is not listed by an exclusive collection.
    pub(crate) fn unexpected(mut self) -> Self {
        self.logs.fail("extra", self.check.check_id());
        self.status = CheckStatus::Fail;
        self.field = Some("extra".to_string());
        self
    }

    fn synthetic(
        status: CheckStatus,
        device: impl Into<String>,
        check: Check,
        message: impl Into<String>,
    ) -> Self {
        let message = message.into();
        let mut logs = ResultLogs::new();
        logs.log(status, "message", message);
        Self::from_parts(status, device.into(), check, None, Value::Null, logs)
    }

    pub fn status(&self) -> CheckStatus {
        self.status
    }

    pub fn device(&self) -> &str {
        &self.device
    }

    pub fn check(&self) -> &Check {
        &self.check
    }

    pub fn check_id(&self) -> String {
        self.check.check_id()
    }

    pub fn check_type(&self) -> &str {
        &self.check.check_type
    }

    /// Worst mismatched field, or a comma-joined list when several mismatched.
    pub fn field(&self) -> Option<&str> {
        self.field.as_deref()
    }

    pub fn measurement(&self) -> &Value {
        &self.measurement
    }

    pub fn logs(&self) -> &ResultLogs {
        &self.logs
    }

    /// Payload persisted to files and upserted into the result store.
    pub fn to_payload(&self) -> Value {
        serde_json::to_value(self).unwrap_or_else(|e| json!({ "error": e.to_string() }))
    }
}

/// Persisted form of a result, carrying the derived `check_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ResultRecord {
    status: CheckStatus,
    device: String,
    check: Check,
    #[serde(default)]
    check_id: String,
    #[serde(default)]
    field: Option<String>,
    #[serde(default)]
    measurement: Value,
    #[serde(default)]
    logs: ResultLogs,
}

impl From<CheckResult> for ResultRecord {
    fn from(result: CheckResult) -> Self {
        Self {
            check_id: result.check.check_id(),
            status: result.status,
            device: result.device,
            check: result.check,
            field: result.field,
            measurement: result.measurement,
            logs: result.logs,
        }
    }
}

impl From<ResultRecord> for CheckResult {
    fn from(record: ResultRecord) -> Self {
        // check_id is re-derived from the check, never trusted from disk
        Self::from_parts(
            record.status,
            record.device,
            record.check,
            record.field,
            record.measurement,
            record.logs,
        )
    }
}

/// Worst status first, then by check id.
pub fn sort_results(results: &mut [CheckResult]) {
    results.sort_by(|a, b| match b.status.cmp(&a.status) {
        Ordering::Equal => a.check_id().cmp(&b.check_id()),
        other => other,
    });
}

/// Results at or above `threshold` severity.
pub fn filter_at_least(results: &[CheckResult], threshold: CheckStatus) -> Vec<&CheckResult> {
    results.iter().filter(|r| r.status >= threshold).collect()
}
