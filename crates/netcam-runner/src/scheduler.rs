//! Scheduler: concurrent fan-out of device tasks
//!
//! Every device in scope gets its own task. The scheduler waits for all of
//! them and records each outcome on its own, so one device crashing never
//! cancels or hides the others.

use crate::device_task::{
    clear_results, write_results, DeviceReport, DeviceState, DeviceTask, DEVICE_TASK_CHECK, MAX_ERROR_CAUSES,
};
use crate::driver::{error_chain, DriverRegistry};
use crate::store::{ResultKey, ResultStore};
use chrono::{DateTime, Utc};
use netcam_core::{Check, CheckResult, Design, Device, StatusCounts, VerifyContext};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{error, info};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DeviceOutcome {
    Finished(DeviceReport),
    /// The device task panicked or was cancelled.
    Crashed { device: String, error: String },
}

impl DeviceOutcome {
    pub fn device(&self) -> &str {
        match self {
            DeviceOutcome::Finished(report) => &report.device,
            DeviceOutcome::Crashed { device, .. } => device,
        }
    }

    pub fn report(&self) -> Option<&DeviceReport> {
        match self {
            DeviceOutcome::Finished(report) => Some(report),
            DeviceOutcome::Crashed { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_id: String,
    pub design: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub devices: Vec<DeviceOutcome>,
}

impl RunSummary {
    pub fn device(&self, name: &str) -> Option<&DeviceOutcome> {
        self.devices.iter().find(|d| d.device() == name)
    }

    /// Counts across every finished device.
    pub fn counts(&self) -> StatusCounts {
        let mut counts = StatusCounts::new();
        for report in self.devices.iter().filter_map(DeviceOutcome::report) {
            counts.merge(&report.counts);
        }
        counts
    }

    /// Devices that crashed, failed setup or timed out.
    pub fn failed_devices(&self) -> Vec<&str> {
        self.devices
            .iter()
            .filter(|d| match d {
                DeviceOutcome::Finished(r) => r.state == DeviceState::SetupFailed || r.timed_out,
                DeviceOutcome::Crashed { .. } => true,
            })
            .map(DeviceOutcome::device)
            .collect()
    }
}

enum Pending {
    Spawned(JoinHandle<DeviceReport>),
    Ready(DeviceOutcome),
}

pub struct Scheduler {
    ctx: Arc<VerifyContext>,
    design: Arc<Design>,
    drivers: DriverRegistry,
    store: Option<Arc<dyn ResultStore>>,
}

impl Scheduler {
    pub fn new(ctx: VerifyContext, design: Design, drivers: DriverRegistry) -> Self {
        Self {
            ctx: Arc::new(ctx),
            design: Arc::new(design),
            drivers,
            store: None,
        }
    }

    pub fn with_store(mut self, store: Arc<dyn ResultStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn context(&self) -> &VerifyContext {
        &self.ctx
    }

    /// Verify every device in the design.
    pub async fn run(&self) -> RunSummary {
        let devices: Vec<&Device> = self.design.devices.iter().collect();
        self.run_devices(devices).await
    }

    /// Verify only the named devices. Unknown names are ignored.
    pub async fn run_selected(&self, names: &[&str]) -> RunSummary {
        let devices: Vec<&Device> = self
            .design
            .devices
            .iter()
            .filter(|d| names.contains(&d.name.as_str()))
            .collect();
        self.run_devices(devices).await
    }

    async fn run_devices(&self, devices: Vec<&Device>) -> RunSummary {
        let started_at = Utc::now();
        info!(run_id = %self.ctx.run_id, design = %self.design.name, devices = devices.len(), "verification started");

        let mut pending: Vec<(String, Pending)> = Vec::with_capacity(devices.len());
        for device in devices {
            let slot = match self.drivers.create(device, &self.ctx) {
                Ok(driver) => {
                    let collections = self.design.device_collections(device);
                    let mut task = DeviceTask::new(self.ctx.clone(), &device.name, collections, driver);
                    if let Some(store) = &self.store {
                        task = task.with_store(store.clone());
                    }
                    Pending::Spawned(tokio::spawn(task.run()))
                }
                Err(e) => {
                    let reason = error_chain(&e, MAX_ERROR_CAUSES);
                    error!(device = %device.name, error = %reason, "no driver for device");
                    Pending::Ready(DeviceOutcome::Finished(self.unattached(device, reason).await))
                }
            };
            pending.push((device.name.clone(), slot));
        }

        let mut outcomes = Vec::with_capacity(pending.len());
        for (device, slot) in pending {
            let outcome = match slot {
                Pending::Ready(outcome) => outcome,
                Pending::Spawned(handle) => match handle.await {
                    Ok(report) => DeviceOutcome::Finished(report),
                    Err(e) => {
                        error!(device = %device, error = %e, "device task crashed");
                        DeviceOutcome::Crashed {
                            device,
                            error: e.to_string(),
                        }
                    }
                },
            };
            outcomes.push(outcome);
        }

        let summary = RunSummary {
            run_id: self.ctx.run_id.clone(),
            design: self.design.name.clone(),
            started_at,
            finished_at: Utc::now(),
            devices: outcomes,
        };
        info!(
            run_id = %summary.run_id,
            summary = %summary.counts().summary(),
            failed = summary.failed_devices().len(),
            "verification finished"
        );
        summary
    }

    /// Report for a device whose driver could not even be built.
    async fn unattached(&self, device: &Device, reason: String) -> DeviceReport {
        let collections = self.design.device_collections(device);
        let device = device.name.as_str();
        clear_results(&self.ctx.layout, device, &collections).await;

        let check = Check::new(DEVICE_TASK_CHECK, json!({"device": device, "phase": "setup"}), json!(null));
        let result = CheckResult::failure(device, check, &reason);
        if let Err(e) = write_results(&self.ctx.layout, device, DEVICE_TASK_CHECK, std::slice::from_ref(&result)).await {
            error!(device = %device, error = %e, "results not written");
        }

        if let (true, Some(store)) = (self.ctx.config.store, &self.store) {
            let key = ResultKey::for_result(DEVICE_TASK_CHECK, &result);
            if let Err(e) = store.upsert(key, &result.to_payload()).await {
                error!(device = %device, error = %e, "result upsert failed");
            }
        }

        let mut counts = StatusCounts::new();
        counts.add(result.status());
        let now = Utc::now();
        DeviceReport {
            device: device.to_string(),
            run_id: self.ctx.run_id.clone(),
            engine_version: netcam_core::NETCAM_VERSION.to_string(),
            state: DeviceState::SetupFailed,
            counts,
            collections: Vec::new(),
            error: Some(reason),
            timed_out: false,
            started_at: now,
            finished_at: Some(now),
        }
    }
}
