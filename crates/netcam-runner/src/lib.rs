//! Netcam Runner: concurrent per-device verification
//!
//! The [`Scheduler`] fans out one [`DeviceTask`] per device. Each task sets
//! up its [`DeviceUnderTest`] driver, executes the device's check
//! collections in order, persists the reconciled results and tears down.
//! Failures stay local to the collection or device where they happen.

pub mod device_task;
pub mod driver;
pub mod scheduler;
pub mod store;

pub use device_task::{CollectionOutcome, CollectionReport, DeviceReport, DeviceState, DeviceTask};
pub use driver::{DeviceUnderTest, DriverError, DriverFactory, DriverRegistry};
pub use scheduler::{DeviceOutcome, RunSummary, Scheduler};
pub use store::{MemoryResultStore, ResultKey, ResultStore, StoreError, StoredResult, UpsertOutcome};
