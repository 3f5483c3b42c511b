//! Exclusive-set reconciliation
//!
//! For checks whose expectation is the complete set of some entity on the
//! device (interface names, VLAN ids). Missing and extra members are both
//! evaluated and reported; neither short-circuits the other.

use crate::check::Check;
use crate::result::{CheckResult, ResultLogs};
use crate::status::CheckStatus;
use serde_json::Value;
use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

pub type SortOrder = Arc<dyn Fn(&Value, &Value) -> Ordering + Send + Sync>;

#[derive(Clone, Default)]
pub struct ExclusiveOptions {
    /// Ordering used for the logged missing/extra lists; natural order when unset.
    pub sort: Option<SortOrder>,
    /// Status for extra members; FAIL when unset.
    pub on_extra: Option<CheckStatus>,
}

impl ExclusiveOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sort_by<F>(mut self, order: F) -> Self
    where
        F: Fn(&Value, &Value) -> Ordering + Send + Sync + 'static,
    {
        self.sort = Some(Arc::new(order));
        self
    }

    pub fn on_extra(mut self, status: CheckStatus) -> Self {
        self.on_extra = Some(status);
        self
    }
}

impl fmt::Debug for ExclusiveOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExclusiveOptions")
            .field("sort", &self.sort.is_some())
            .field("on_extra", &self.on_extra)
            .finish()
    }
}

/// Compare the expected member list of `check` against the measured members.
pub fn measure_exclusive(
    device: impl Into<String>,
    check: Check,
    measured: Vec<Value>,
    options: &ExclusiveOptions,
) -> CheckResult {
    let expected: Vec<Value> = match &check.expected_results {
        Value::Array(items) => items.clone(),
        Value::Null => Vec::new(),
        other => vec![other.clone()],
    };

    let order = |a: &Value, b: &Value| match &options.sort {
        Some(sort) => sort(a, b),
        None => natural_order(a, b),
    };

    let mut status = CheckStatus::Pass;
    let mut logs = ResultLogs::new();

    let mut missing = difference(&expected, &measured);
    if !missing.is_empty() {
        missing.sort_by(|a, b| order(a, b));
        logs.fail("missing", Value::Array(missing));
        status = CheckStatus::Fail;
    }

    let mut extra = difference(&measured, &expected);
    if !extra.is_empty() {
        extra.sort_by(|a, b| order(a, b));
        let extra_status = options.on_extra.unwrap_or(CheckStatus::Fail);
        logs.log(extra_status, "extra", Value::Array(extra));
        // missing members stay FAIL whatever the extra policy says
        status = status.max(extra_status);
    }

    CheckResult::from_parts(
        status,
        device.into(),
        check,
        None,
        Value::Array(measured),
        logs,
    )
}

/// Members of `left` not present in `right`, deduplicated.
fn difference(left: &[Value], right: &[Value]) -> Vec<Value> {
    let mut out: Vec<Value> = Vec::new();
    for item in left {
        if !right.contains(item) && !out.contains(item) {
            out.push(item.clone());
        }
    }
    out
}

/// Natural ordering: numbers numerically, strings with embedded digit runs
/// compared by value (`Ethernet2 < Ethernet10`), numbers before strings.
pub fn natural_order(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => {
            let (x, y) = (x.as_f64().unwrap_or(0.0), y.as_f64().unwrap_or(0.0));
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Value::String(x), Value::String(y)) => natural_str_cmp(x, y),
        (Value::Number(_), _) => Ordering::Less,
        (_, Value::Number(_)) => Ordering::Greater,
        _ => a.to_string().cmp(&b.to_string()),
    }
}

pub fn natural_str_cmp(a: &str, b: &str) -> Ordering {
    let (mut left, mut right) = (chunks(a), chunks(b));
    loop {
        match (left.next(), right.next()) {
            (None, None) => return a.cmp(b),
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) => {
                let ord = match (x.parse::<u64>(), y.parse::<u64>()) {
                    (Ok(n), Ok(m)) => n.cmp(&m),
                    _ => x.cmp(y),
                };
                if ord != Ordering::Equal {
                    return ord;
                }
            }
        }
    }
}

/// Split into alternating runs of digits and non-digits.
fn chunks(s: &str) -> impl Iterator<Item = &str> {
    let mut rest = s;
    std::iter::from_fn(move || {
        let first = rest.chars().next()?;
        let digit = first.is_ascii_digit();
        let end = rest
            .find(|c: char| c.is_ascii_digit() != digit)
            .unwrap_or(rest.len());
        let (head, tail) = rest.split_at(end);
        rest = tail;
        Some(head)
    })
}
