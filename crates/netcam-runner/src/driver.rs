//! Device driver abstraction
//!
//! A [`DeviceUnderTest`] knows how to reach one device and observe the
//! entities named by a check collection. Drivers are selected per device by
//! `os_name` through an explicit [`DriverRegistry`] built at startup.

use async_trait::async_trait;
use netcam_core::{CheckCollection, Device, Observation, VerifyContext};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    /// Device unreachable or refused authentication. Fatal for that device only.
    #[error("SETUP/{device}: {reason}")]
    Setup { device: String, reason: String },

    #[error("EXEC/{collection}: {reason}")]
    Execution { collection: String, reason: String },

    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

impl DriverError {
    pub fn setup(device: impl Into<String>, reason: impl Into<String>) -> Self {
        DriverError::Setup {
            device: device.into(),
            reason: reason.into(),
        }
    }

    pub fn execution(collection: impl Into<String>, reason: impl Into<String>) -> Self {
        DriverError::Execution {
            collection: collection.into(),
            reason: reason.into(),
        }
    }
}

#[async_trait]
pub trait DeviceUnderTest: Send + Sync {
    /// Establish the device session.
    async fn setup(&mut self) -> Result<(), DriverError> {
        Ok(())
    }

    /// Observe the entities named by `collection`.
    ///
    /// `Ok(None)` means this driver has no handler for the collection type.
    async fn execute_checks(
        &mut self,
        collection: &CheckCollection,
    ) -> Result<Option<Vec<Observation>>, DriverError>;

    /// Release the device session. Best effort.
    async fn teardown(&mut self) -> Result<(), DriverError> {
        Ok(())
    }
}

pub type DriverFactory =
    Arc<dyn Fn(&Device, &VerifyContext) -> Result<Box<dyn DeviceUnderTest>, DriverError> + Send + Sync>;

/// Maps a device `os_name` to the factory that builds its driver.
#[derive(Clone, Default)]
pub struct DriverRegistry {
    factories: HashMap<String, DriverFactory>,
}

impl DriverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(mut self, os_name: impl Into<String>, factory: F) -> Self
    where
        F: Fn(&Device, &VerifyContext) -> Result<Box<dyn DeviceUnderTest>, DriverError>
            + Send
            + Sync
            + 'static,
    {
        self.factories.insert(os_name.into(), Arc::new(factory));
        self
    }

    pub fn supports(&self, os_name: &str) -> bool {
        self.factories.contains_key(os_name)
    }

    /// Build the driver for `device`; a device with no registered driver
    /// cannot be set up.
    pub fn create(
        &self,
        device: &Device,
        ctx: &VerifyContext,
    ) -> Result<Box<dyn DeviceUnderTest>, DriverError> {
        match self.factories.get(&device.os_name) {
            Some(factory) => factory(device, ctx),
            None => Err(DriverError::setup(
                &device.name,
                format!("no driver registered for os '{}'", device.os_name),
            )),
        }
    }
}

impl fmt::Debug for DriverRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.factories.keys().collect();
        names.sort();
        f.debug_struct("DriverRegistry").field("os_names", &names).finish()
    }
}

/// Error plus its causes, at most `limit` levels deep.
pub fn error_chain(err: &(dyn std::error::Error + 'static), limit: usize) -> String {
    let mut parts = vec![err.to_string()];
    let mut source = err.source();
    while let Some(cause) = source {
        if parts.len() >= limit {
            parts.push("...".to_string());
            break;
        }
        parts.push(cause.to_string());
        source = cause.source();
    }
    parts.join(": ")
}
