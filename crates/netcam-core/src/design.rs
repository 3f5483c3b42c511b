//! Design model consumed by the engine
//!
//! Designs are authored elsewhere; the engine only needs which devices exist,
//! which services each device takes part in, and which check-collections
//! each service owns.

use crate::error::{NetcamError, Result};
use crate::status::CheckStatus;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Device {
    pub name: String,
    /// Selects the driver for this device.
    pub os_name: String,
    /// Services in declared order.
    #[serde(default)]
    pub services: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DesignService {
    pub name: String,
    /// Selects how the service is laid out in the results graph.
    #[serde(default = "default_kind")]
    pub kind: String,
    #[serde(default)]
    pub check_collections: Vec<String>,
    /// Devices taking part; empty means every device naming this service.
    #[serde(default)]
    pub devices: Vec<String>,
    /// Services whose health rolls up into this one.
    #[serde(default)]
    pub depends_on: Vec<String>,
    /// Services shown alongside this one but excluded from its roll-up.
    #[serde(default)]
    pub references: Vec<String>,
    #[serde(default)]
    pub status: CheckStatus,
}

fn default_kind() -> String {
    "default".to_string()
}

impl DesignService {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: default_kind(),
            check_collections: Vec::new(),
            devices: Vec::new(),
            depends_on: Vec::new(),
            references: Vec::new(),
            status: CheckStatus::Pass,
        }
    }

    pub fn with_collections<I, S>(mut self, collections: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.check_collections.extend(collections.into_iter().map(Into::into));
        self
    }

    pub fn depends_on(mut self, service: impl Into<String>) -> Self {
        self.depends_on.push(service.into());
        self
    }

    pub fn references(mut self, service: impl Into<String>) -> Self {
        self.references.push(service.into());
        self
    }

    pub fn kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = kind.into();
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Design {
    pub name: String,
    #[serde(default)]
    pub devices: Vec<Device>,
    #[serde(default)]
    pub services: Vec<DesignService>,
}

impl Design {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            devices: Vec::new(),
            services: Vec::new(),
        }
    }

    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(|e| NetcamError::Config(e.to_string()))
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn device(&self, name: &str) -> Option<&Device> {
        self.devices.iter().find(|d| d.name == name)
    }

    pub fn service(&self, name: &str) -> Option<&DesignService> {
        self.services.iter().find(|s| s.name == name)
    }

    pub fn service_mut(&mut self, name: &str) -> Option<&mut DesignService> {
        self.services.iter_mut().find(|s| s.name == name)
    }

    /// Devices taking part in `service`, in design order.
    pub fn service_devices<'a>(&'a self, service: &'a DesignService) -> impl Iterator<Item = &'a Device> + 'a {
        self.devices.iter().filter(move |d| {
            if service.devices.is_empty() {
                d.services.iter().any(|s| s == &service.name)
            } else {
                service.devices.iter().any(|n| n == &d.name)
            }
        })
    }

    /// `(service, collection)` pairs a device owns, in declared order.
    pub fn device_collections(&self, device: &Device) -> Vec<(String, String)> {
        let mut out = Vec::new();
        for service_name in &device.services {
            let Some(service) = self.service(service_name) else {
                continue;
            };
            if !service.devices.is_empty() && !service.devices.iter().any(|n| n == &device.name) {
                continue;
            }
            for collection in &service.check_collections {
                out.push((service.name.clone(), collection.clone()));
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DESIGN: &str = r#"
name: dc1
devices:
  - name: sw1
    os_name: eos
    services: [topology, vlans]
  - name: sw2
    os_name: nxos
    services: [topology]
services:
  - name: topology
    check_collections: [device, interfaces]
  - name: vlans
    check_collections: [vlans]
    devices: [sw1]
    depends_on: [topology]
"#;

    #[test]
    fn test_design_from_yaml() {
        let design = Design::from_yaml(DESIGN).unwrap();
        assert_eq!(design.devices.len(), 2);
        assert_eq!(design.service("vlans").unwrap().depends_on, vec!["topology"]);
        assert_eq!(design.service("topology").unwrap().kind, "default");
    }

    #[test]
    fn test_device_collections_in_declared_order() {
        let design = Design::from_yaml(DESIGN).unwrap();
        let sw1 = design.device("sw1").unwrap();
        assert_eq!(
            design.device_collections(sw1),
            vec![
                ("topology".to_string(), "device".to_string()),
                ("topology".to_string(), "interfaces".to_string()),
                ("vlans".to_string(), "vlans".to_string()),
            ]
        );
    }

    #[test]
    fn test_service_devices() {
        let design = Design::from_yaml(DESIGN).unwrap();
        let topology = design.service("topology").unwrap();
        let names: Vec<_> = design.service_devices(topology).map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["sw1", "sw2"]);

        let vlans = design.service("vlans").unwrap();
        assert_eq!(design.service_devices(vlans).count(), 1);
    }

    #[test]
    fn test_bad_yaml_is_config_error() {
        let err = Design::from_yaml("name: [").unwrap_err();
        assert!(err.to_string().starts_with("CONFIG/"));
    }
}
