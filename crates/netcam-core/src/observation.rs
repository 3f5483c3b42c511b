//! What a driver hands back for one check
//!
//! Drivers only observe; reconciliation into a [`CheckResult`] happens in
//! [`Observation::reconcile`], so every check type goes through the same
//! comparison code.

use crate::check::{Check, CheckCollection};
use crate::exclusive::{measure_exclusive, ExclusiveOptions};
use crate::measure::{measure, MeasureOptions};
use crate::measurement::Measurement;
use crate::result::CheckResult;
use crate::status::StatusCounts;
use serde_json::Value;

#[derive(Debug, Clone)]
pub enum Observation {
    /// Field-wise comparison against the check's expected record.
    Fields {
        check: Check,
        measurement: Option<Measurement>,
        options: MeasureOptions,
    },
    /// Exhaustive-set comparison against the check's expected list.
    Exclusive {
        check: Check,
        measured: Vec<Value>,
        options: ExclusiveOptions,
    },
    /// Already decided by the driver.
    Decided(CheckResult),
}

impl Observation {
    pub fn fields(check: Check, measurement: Measurement) -> Self {
        Observation::Fields {
            check,
            measurement: Some(measurement),
            options: MeasureOptions::default(),
        }
    }

    /// The entity the check names does not exist on the device.
    pub fn missing(check: Check) -> Self {
        Observation::Fields {
            check,
            measurement: None,
            options: MeasureOptions::default(),
        }
    }

    pub fn info(check: Check, measurement: Measurement) -> Self {
        Observation::Fields {
            check,
            measurement: Some(measurement),
            options: MeasureOptions::new().info_only(),
        }
    }

    pub fn exclusive(check: Check, measured: Vec<Value>) -> Self {
        Observation::Exclusive {
            check,
            measured,
            options: ExclusiveOptions::default(),
        }
    }

    pub fn with_measure_options(mut self, new_options: MeasureOptions) -> Self {
        if let Observation::Fields { options, .. } = &mut self {
            *options = new_options;
        }
        self
    }

    pub fn with_exclusive_options(mut self, new_options: ExclusiveOptions) -> Self {
        if let Observation::Exclusive { options, .. } = &mut self {
            *options = new_options;
        }
        self
    }

    pub fn check(&self) -> &Check {
        match self {
            Observation::Fields { check, .. } | Observation::Exclusive { check, .. } => check,
            Observation::Decided(result) => result.check(),
        }
    }

    pub fn reconcile(self, device: &str) -> CheckResult {
        match self {
            Observation::Fields {
                check,
                measurement,
                options,
            } => measure(device, check, measurement, &options),
            Observation::Exclusive {
                check,
                measured,
                options,
            } => measure_exclusive(device, check, measured, &options),
            Observation::Decided(result) => result,
        }
    }
}

/// Reconcile a collection's observations, in collection order.
///
/// Checks the driver did not answer for are reconciled as missing; any
/// additional observations the driver reported follow, in driver order.
/// In an exclusive collection those additional entities are FAIL.
pub fn reconcile_collection(
    device: &str,
    collection: &CheckCollection,
    observations: Vec<Observation>,
) -> Vec<CheckResult> {
    let mut pending: Vec<Option<Observation>> = observations.into_iter().map(Some).collect();
    let mut results = Vec::with_capacity(collection.checks.len().max(pending.len()));

    for check in &collection.checks {
        let id = check.check_id();
        let slot = pending.iter_mut().find(|slot| {
            slot.as_ref().is_some_and(|o| {
                o.check().check_type == check.check_type && o.check().check_id() == id
            })
        });

        let result = match slot.and_then(Option::take) {
            Some(observation) => observation.reconcile(device),
            None => Observation::missing(check.clone()).reconcile(device),
        };
        results.push(result);
    }

    let extras = pending.into_iter().flatten().map(|o| o.reconcile(device));
    if collection.exclusive {
        results.extend(extras.map(CheckResult::unexpected));
    } else {
        results.extend(extras);
    }
    results
}

/// Per-status counts over a set of results.
pub fn tally(results: &[CheckResult]) -> StatusCounts {
    let mut counts = StatusCounts::new();
    for result in results {
        counts.add(result.status());
    }
    counts
}
