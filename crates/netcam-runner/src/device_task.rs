//! Device Task: one device's walk through setup, collections and teardown
//!
//! ```text
//! Idle -> Setup -> Running -> Teardown -> Done
//!           \
//!            -> SetupFailed
//! ```
//!
//! Every collection is isolated: a driver error while executing one
//! collection is logged and the task moves on to the next.

use crate::driver::{error_chain, DeviceUnderTest};
use crate::store::{ResultKey, ResultStore};
use chrono::{DateTime, Utc};
use netcam_core::layout::{decode_collection, encode_results, DEVICE_TASK_RESULTS};
use netcam_core::{
    reconcile_collection, tally, Check, CheckCollection, CheckResult, DesignLayout, NetcamError,
    StatusCounts, VerifyContext,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Causes reported for a failing collection.
pub const MAX_ERROR_CAUSES: usize = 8;

/// Check type, and results file name, of synthetic results not tied to a
/// collection.
pub const DEVICE_TASK_CHECK: &str = DEVICE_TASK_RESULTS;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceState {
    Idle,
    Setup,
    Running,
    Teardown,
    Done,
    SetupFailed,
}

impl DeviceState {
    pub fn can_transition(self, next: DeviceState) -> bool {
        use DeviceState::*;
        matches!(
            (self, next),
            (Idle, Setup) | (Setup, Running) | (Setup, SetupFailed) | (Running, Teardown) | (Teardown, Done)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, DeviceState::Done | DeviceState::SetupFailed)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CollectionOutcome {
    Completed,
    /// No spec on disk, or an empty one. Nothing was sent to the driver.
    NoChecks,
    /// The driver has no handler for this collection type.
    Unsupported,
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionReport {
    pub service: String,
    pub collection: String,
    pub counts: StatusCounts,
    #[serde(flatten)]
    pub outcome: CollectionOutcome,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceReport {
    pub device: String,
    pub run_id: String,
    pub engine_version: String,
    pub state: DeviceState,
    pub counts: StatusCounts,
    pub collections: Vec<CollectionReport>,
    /// Setup failure, or the reason the running phase was cut short.
    pub error: Option<String>,
    pub timed_out: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl DeviceReport {
    fn new(device: &str, ctx: &VerifyContext) -> Self {
        Self {
            device: device.to_string(),
            run_id: ctx.run_id.clone(),
            engine_version: netcam_core::NETCAM_VERSION.to_string(),
            state: DeviceState::Idle,
            counts: StatusCounts::new(),
            collections: Vec::new(),
            error: None,
            timed_out: false,
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    pub fn collection(&self, name: &str) -> Option<&CollectionReport> {
        self.collections.iter().find(|c| c.collection == name)
    }
}

pub struct DeviceTask {
    ctx: Arc<VerifyContext>,
    device: String,
    collections: Vec<(String, String)>,
    driver: Box<dyn DeviceUnderTest>,
    store: Option<Arc<dyn ResultStore>>,
    report: DeviceReport,
}

impl DeviceTask {
    pub fn new(
        ctx: Arc<VerifyContext>,
        device: impl Into<String>,
        collections: Vec<(String, String)>,
        driver: Box<dyn DeviceUnderTest>,
    ) -> Self {
        let device = device.into();
        let report = DeviceReport::new(&device, &ctx);
        Self {
            ctx,
            device,
            collections,
            driver,
            store: None,
            report,
        }
    }

    pub fn with_store(mut self, store: Arc<dyn ResultStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub async fn run(mut self) -> DeviceReport {
        clear_results(&self.ctx.layout, &self.device, &self.collections).await;
        self.transition(DeviceState::Setup);

        if let Err(e) = self.driver.setup().await {
            let reason = error_chain(&e, MAX_ERROR_CAUSES);
            error!(device = %self.device, error = %reason, "device setup failed");
            self.record_device_failure("setup", &reason).await;
            self.report.error = Some(reason);
            self.transition(DeviceState::SetupFailed);
            return self.finish().await;
        }

        self.transition(DeviceState::Running);
        match self.ctx.config.running_timeout() {
            Some(limit) => {
                if tokio::time::timeout(limit, self.run_collections()).await.is_err() {
                    let reason = format!("running phase exceeded {}s", limit.as_secs());
                    error!(device = %self.device, error = %reason, "device timed out");
                    self.record_device_failure("running", &reason).await;
                    self.report.error = Some(reason);
                    self.report.timed_out = true;
                }
            }
            None => self.run_collections().await,
        }

        self.transition(DeviceState::Teardown);
        if let Err(e) = self.driver.teardown().await {
            warn!(device = %self.device, error = %error_chain(&e, MAX_ERROR_CAUSES), "teardown failed");
        }
        self.transition(DeviceState::Done);
        self.finish().await
    }

    async fn run_collections(&mut self) {
        let collections = self.collections.clone();
        for (service, name) in collections {
            let report = self.run_collection(&service, &name).await;
            self.report.counts.merge(&report.counts);
            self.report.collections.push(report);
        }
    }

    async fn run_collection(&mut self, service: &str, name: &str) -> CollectionReport {
        let mut report = CollectionReport {
            service: service.to_string(),
            collection: name.to_string(),
            counts: StatusCounts::new(),
            outcome: CollectionOutcome::Completed,
        };

        let spec = match self.load_spec(name).await {
            Ok(Some(spec)) if !spec.is_empty() => spec,
            Ok(_) => {
                debug!(device = %self.device, collection = %name, "no checks, skipping");
                report.outcome = CollectionOutcome::NoChecks;
                return report;
            }
            Err(e) => {
                error!(device = %self.device, collection = %name, error = %e, "unreadable check spec");
                report.outcome = CollectionOutcome::Failed { error: e.to_string() };
                return report;
            }
        };

        let results = match self.driver.execute_checks(&spec).await {
            Ok(Some(observations)) => reconcile_collection(&self.device, &spec, observations),
            Ok(None) => {
                report.outcome = CollectionOutcome::Unsupported;
                vec![self.unsupported(&spec)]
            }
            Err(e) => {
                let reason = error_chain(&e, MAX_ERROR_CAUSES);
                error!(device = %self.device, collection = %name, error = %reason, "collection failed");
                report.outcome = CollectionOutcome::Failed { error: reason };
                return report;
            }
        };

        report.counts = tally(&results);
        self.persist(name, &results).await;
        info!(
            device = %self.device,
            collection = %name,
            summary = %report.counts.summary(),
            "collection verified"
        );
        report
    }

    async fn load_spec(&self, name: &str) -> Result<Option<CheckCollection>, NetcamError> {
        let path = self.ctx.layout.spec_path(&self.device, name);
        match tokio::fs::read(&path).await {
            Ok(bytes) => decode_collection(&bytes, &path).map(Some),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(NetcamError::Io { path, source: e }),
        }
    }

    fn unsupported(&self, spec: &CheckCollection) -> CheckResult {
        let check_type = spec
            .checks
            .first()
            .map(|c| c.check_type.clone())
            .unwrap_or_else(|| spec.name.clone());
        let check = Check::new(check_type.clone(), json!({"collection": spec.name}), json!(null));
        CheckResult::skip(
            &self.device,
            check,
            format!("Missing: device {} support for Checks type: {}", self.device, check_type),
        )
    }

    async fn record_device_failure(&mut self, phase: &str, reason: &str) {
        let check = Check::new(
            DEVICE_TASK_CHECK,
            json!({"device": self.device, "phase": phase}),
            json!(null),
        );
        let result = CheckResult::failure(&self.device, check, reason);
        self.report.counts.add(result.status());
        self.persist(DEVICE_TASK_CHECK, std::slice::from_ref(&result)).await;
    }

    async fn persist(&self, collection: &str, results: &[CheckResult]) {
        if let Err(e) = write_results(&self.ctx.layout, &self.device, collection, results).await {
            error!(device = %self.device, collection = %collection, error = %e, "results not written");
        }
        self.upsert(collection, results).await;
    }

    async fn upsert(&self, feature: &str, results: &[CheckResult]) {
        if !self.ctx.config.store {
            return;
        }
        let Some(store) = &self.store else {
            return;
        };
        for result in results {
            let key = ResultKey::for_result(feature, result);
            if let Err(e) = store.upsert(key, &result.to_payload()).await {
                error!(device = %self.device, feature = %feature, error = %e, "result upsert failed");
            }
        }
    }

    async fn finish(mut self) -> DeviceReport {
        self.report.finished_at = Some(Utc::now());
        info!(
            device = %self.device,
            state = ?self.report.state,
            summary = %self.report.counts.summary(),
            "device finished"
        );

        let path = self.ctx.layout.summary_path(&self.device);
        let written = match serde_json::to_vec_pretty(&self.report) {
            Ok(bytes) => write_file(&path, &bytes).await,
            Err(e) => Err(NetcamError::from(e)),
        };
        if let Err(e) = written {
            warn!(device = %self.device, error = %e, "device summary not written");
        }
        self.report
    }

    fn transition(&mut self, next: DeviceState) {
        debug_assert!(
            self.report.state.can_transition(next),
            "illegal transition {:?} -> {:?}",
            self.report.state,
            next
        );
        debug!(device = %self.device, from = ?self.report.state, to = ?next, "state change");
        self.report.state = next;
    }
}

/// Remove result files of an earlier run, so a device that never gets to a
/// collection this run leaves no results behind for it.
pub(crate) async fn clear_results(layout: &DesignLayout, device: &str, collections: &[(String, String)]) {
    let names = collections.iter().map(|(_, c)| c.as_str()).chain([DEVICE_TASK_CHECK]);
    for name in names {
        let path = layout.results_path(device, name);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => debug!(device = %device, path = %path.display(), "previous results removed"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(device = %device, path = %path.display(), error = %e, "previous results not removed"),
        }
    }
}

pub(crate) async fn write_results(
    layout: &DesignLayout,
    device: &str,
    collection: &str,
    results: &[CheckResult],
) -> Result<(), NetcamError> {
    let bytes = encode_results(results)?;
    write_file(&layout.results_path(device, collection), &bytes).await
}

async fn write_file(path: &Path, bytes: &[u8]) -> Result<(), NetcamError> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| NetcamError::Io { path: parent.to_path_buf(), source: e })?;
    }
    tokio::fs::write(path, bytes)
        .await
        .map_err(|e| NetcamError::Io { path: path.to_path_buf(), source: e })
}
