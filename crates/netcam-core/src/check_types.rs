//! Built-in check types
//!
//! Typed parameter, expectation and measurement records for the check types
//! every driver is expected to understand. Measurement records declare all
//! fields optional and keep vendor extras in a flattened map.

use crate::check::Check;
use crate::measurement::MeasurementSchema;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

pub const DEVICE: &str = "device";
pub const INTERFACE: &str = "interface";
pub const INTERFACES_LIST: &str = "interfaces-list";
pub const VLAN: &str = "vlan";
pub const VLANS_LIST: &str = "vlans-list";
pub const BGP_NEIGHBOR: &str = "bgp-neighbor";

// ── device ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceExpected {
    pub product_model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub os_version: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeviceMeasurement {
    pub product_model: Option<String>,
    pub os_version: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl MeasurementSchema for DeviceMeasurement {
    const FIELDS: &'static [&'static str] = &["product_model", "os_version"];
}

pub fn device_check(name: &str, expected: &DeviceExpected) -> Check {
    Check::new(DEVICE, json!({ "name": name }), json!(expected))
}

// ── interfaces ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterfaceExpected {
    pub used: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub desc: Option<String>,
    pub oper_up: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speed: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InterfaceMeasurement {
    pub used: Option<bool>,
    pub desc: Option<String>,
    pub oper_up: Option<bool>,
    pub speed: Option<u64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl MeasurementSchema for InterfaceMeasurement {
    const FIELDS: &'static [&'static str] = &["used", "desc", "oper_up", "speed"];
}

pub fn interface_check(name: &str, expected: &InterfaceExpected) -> Check {
    Check::new(INTERFACE, json!({ "name": name }), json!(expected))
}

/// Exhaustive list of interface names on a device.
pub fn interfaces_list_check<S: AsRef<str>>(names: &[S]) -> Check {
    let names: Vec<&str> = names.iter().map(|n| n.as_ref()).collect();
    Check::new(INTERFACES_LIST, Value::Null, json!(names))
}

// ── vlans ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VlanExpected {
    pub name: String,
    #[serde(default)]
    pub interfaces: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VlanMeasurement {
    pub name: Option<String>,
    pub interfaces: Option<Vec<String>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl MeasurementSchema for VlanMeasurement {
    const FIELDS: &'static [&'static str] = &["name", "interfaces"];
}

pub fn vlan_check(vlan_id: u16, expected: &VlanExpected) -> Check {
    Check::new(VLAN, json!({ "vlan_id": vlan_id }), json!(expected))
}

pub fn vlans_list_check(vlan_ids: &[u16]) -> Check {
    Check::new(VLANS_LIST, Value::Null, json!(vlan_ids))
}

// ── bgp ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BgpNeighborExpected {
    pub remote_asn: u32,
    pub state: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BgpNeighborMeasurement {
    pub remote_asn: Option<u32>,
    pub state: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl MeasurementSchema for BgpNeighborMeasurement {
    const FIELDS: &'static [&'static str] = &["remote_asn", "state"];
}

pub fn bgp_neighbor_check(nei_ip: &str, vrf: &str, expected: &BgpNeighborExpected) -> Check {
    Check::new(
        BGP_NEIGHBOR,
        json!({ "nei_ip": nei_ip, "vrf": vrf }),
        json!(expected),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::measure::{measure, MeasureOptions};
    use crate::status::CheckStatus;

    #[test]
    fn test_interface_speed_mismatch() {
        let check = interface_check(
            "Ethernet2",
            &InterfaceExpected {
                used: true,
                desc: Some("to-sw2".into()),
                oper_up: true,
                speed: Some(1000),
            },
        );
        let measurement = InterfaceMeasurement {
            used: Some(true),
            desc: Some("to-sw2".into()),
            oper_up: Some(true),
            speed: Some(100),
            extra: Map::new(),
        }
        .to_measurement()
        .unwrap();

        let result = measure("sw1", check, Some(measurement), &MeasureOptions::new());
        assert_eq!(result.status(), CheckStatus::Fail);
        assert_eq!(result.field(), Some("speed"));
    }

    #[test]
    fn test_vendor_extras_are_informational() {
        let check = device_check(
            "sw1",
            &DeviceExpected {
                product_model: "DCS-7050SX3".into(),
                os_version: None,
            },
        );
        let mut extra = Map::new();
        extra.insert("serial".into(), json!("JPE123"));
        let measurement = DeviceMeasurement {
            product_model: Some("DCS-7050SX3".into()),
            os_version: Some("4.28.3M".into()),
            extra,
        }
        .to_measurement()
        .unwrap();

        let result = measure("sw1", check, Some(measurement), &MeasureOptions::new());
        assert_eq!(result.status(), CheckStatus::Pass);
        assert_eq!(result.logs().find("os_version").unwrap().status(), CheckStatus::Info);
        assert_eq!(result.measurement()["serial"], "JPE123");
    }

    #[test]
    fn test_check_ids() {
        let bgp = bgp_neighbor_check(
            "10.1.1.1",
            "default",
            &BgpNeighborExpected {
                remote_asn: 65001,
                state: "Established".into(),
            },
        );
        assert_eq!(bgp.check_id(), "10.1.1.1:default");
        assert_eq!(vlans_list_check(&[10, 20]).check_id(), VLANS_LIST);
        assert_eq!(interfaces_list_check(&["Ethernet1"]).expected_results, json!(["Ethernet1"]));
    }
}
