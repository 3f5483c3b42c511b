//! Field-wise reconciliation of a measurement against a check
//!
//! Every check type shares this one comparison: each field the measurement
//! schema declares is compared against the same-named expected value, every
//! comparison is logged, and mismatches are folded into the result status.

use crate::check::Check;
use crate::measurement::Measurement;
use crate::result::{CheckResult, ResultLogs};
use crate::status::{CheckStatus, StatusSet};
use serde_json::{json, Value};
use std::fmt;
use std::sync::Arc;

/// Decides the status of an unequal field: `(field, expected, measured)`.
pub type MismatchPolicy = Arc<dyn Fn(&str, &Value, &Value) -> CheckStatus + Send + Sync>;

#[derive(Clone, Default)]
pub struct MeasureOptions {
    pub mismatch_policy: Option<MismatchPolicy>,
    /// The driver flagged this result as informational only.
    pub info_only: bool,
}

impl MeasureOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy<F>(mut self, policy: F) -> Self
    where
        F: Fn(&str, &Value, &Value) -> CheckStatus + Send + Sync + 'static,
    {
        self.mismatch_policy = Some(Arc::new(policy));
        self
    }

    pub fn info_only(mut self) -> Self {
        self.info_only = true;
        self
    }
}

impl fmt::Debug for MeasureOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MeasureOptions")
            .field("mismatch_policy", &self.mismatch_policy.is_some())
            .field("info_only", &self.info_only)
            .finish()
    }
}

/// Reconcile `measurement` against `check`, producing a finished result.
pub fn measure(
    device: impl Into<String>,
    check: Check,
    measurement: Option<Measurement>,
    options: &MeasureOptions,
) -> CheckResult {
    let device = device.into();

    if options.info_only {
        let observed = measurement.map(|m| m.to_value()).unwrap_or(Value::Null);
        return CheckResult::info(device, check, observed);
    }

    let measurement = match measurement {
        Some(m) if !m.is_empty() => m,
        _ => {
            let mut logs = ResultLogs::new();
            logs.fail(
                "missing",
                json!({
                    "params": check.check_params,
                    "expected": check.expected_results,
                }),
            );
            return CheckResult::from_parts(
                CheckStatus::Fail,
                device,
                check,
                None,
                Value::Null,
                logs,
            );
        }
    };

    let mut logs = ResultLogs::new();
    let mut seen = StatusSet::new();
    let mut mismatched: Vec<&str> = Vec::new();

    for (field, measured) in measurement.fields() {
        let measured = measured.unwrap_or(&Value::Null);

        let Some(expected) = check.expected(field) else {
            logs.info(field, measured.clone());
            continue;
        };

        let status = if same_value(expected, measured) {
            CheckStatus::Pass
        } else {
            let status = match &options.mismatch_policy {
                Some(policy) => policy(field, expected, measured),
                None => CheckStatus::Fail,
            };
            seen.insert(status);
            if status != CheckStatus::Skip {
                mismatched.push(field);
            }
            status
        };

        logs.log(
            status,
            field,
            json!({ "expected": expected, "measured": measured }),
        );
    }

    let field = if mismatched.is_empty() {
        None
    } else {
        Some(mismatched.join(","))
    };

    let status = if seen.contains(CheckStatus::Fail) {
        CheckStatus::Fail
    } else {
        CheckStatus::Pass
    };

    let observed = measurement.to_value();
    CheckResult::from_parts(status, device, check, field, observed, logs)
}

/// JSON equality that treats `1000` and `1000.0` as the same number.
pub fn same_value(expected: &Value, measured: &Value) -> bool {
    match (expected, measured) {
        (Value::Number(a), Value::Number(b)) => match (a.as_f64(), b.as_f64()) {
            (Some(x), Some(y)) => x == y,
            _ => a == b,
        },
        _ => expected == measured,
    }
}
