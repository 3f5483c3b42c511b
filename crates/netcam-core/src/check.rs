//! Check specifications and their per-device collections
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One testable fact about a device.
///
/// `check_params` identifies *what* is checked (an interface name, a VLAN id),
/// `expected_results` holds the values the design expects to observe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Check {
    pub check_type: String,
    #[serde(default)]
    pub check_params: Value,
    #[serde(default)]
    pub expected_results: Value,
}

impl Check {
    pub fn new(check_type: impl Into<String>, check_params: Value, expected_results: Value) -> Self {
        Self {
            check_type: check_type.into(),
            check_params,
            expected_results,
        }
    }

    /// Stable identifier of this check within its collection.
    ///
    /// The parameter values in key order joined with `:`; a check without
    /// parameters is identified by its type alone.
    pub fn check_id(&self) -> String {
        match &self.check_params {
            Value::Object(params) if !params.is_empty() => params
                .values()
                .map(param_text)
                .collect::<Vec<_>>()
                .join(":"),
            Value::Null => self.check_type.clone(),
            Value::Object(_) => self.check_type.clone(),
            other => param_text(other),
        }
    }

    /// Expected value for a named field, when the expectation is a record.
    pub fn expected(&self, field: &str) -> Option<&Value> {
        self.expected_results.as_object().and_then(|e| e.get(field))
    }
}

fn param_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Ordered, named group of checks for exactly one device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckCollection {
    pub name: String,
    pub device: String,
    /// The collection describes every relevant entity on the device.
    #[serde(default)]
    pub exclusive: bool,
    #[serde(default)]
    pub checks: Vec<Check>,
}

impl CheckCollection {
    pub fn new(name: impl Into<String>, device: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            device: device.into(),
            exclusive: false,
            checks: Vec::new(),
        }
    }

    pub fn exclusive(mut self) -> Self {
        self.exclusive = true;
        self
    }

    pub fn with_check(mut self, check: Check) -> Self {
        self.checks.push(check);
        self
    }

    pub fn push(&mut self, check: Check) {
        self.checks.push(check);
    }

    pub fn len(&self) -> usize {
        self.checks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.checks.is_empty()
    }

    pub fn find(&self, check_id: &str) -> Option<&Check> {
        self.checks.iter().find(|c| c.check_id() == check_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_check_id_from_params() {
        let check = Check::new("interface", json!({"name": "Ethernet1"}), json!({"speed": 1000}));
        assert_eq!(check.check_id(), "Ethernet1");

        let bgp = Check::new("bgp-neighbor", json!({"nei_ip": "10.0.0.1", "vrf": "default"}), json!({}));
        assert_eq!(bgp.check_id(), "10.0.0.1:default");

        let vlan = Check::new("vlan", json!({"vlan_id": 10}), json!({}));
        assert_eq!(vlan.check_id(), "10");
    }

    #[test]
    fn test_check_id_without_params() {
        let check = Check::new("interfaces-list", Value::Null, json!(["Ethernet1"]));
        assert_eq!(check.check_id(), "interfaces-list");

        let check = Check::new("interfaces-list", json!({}), json!([]));
        assert_eq!(check.check_id(), "interfaces-list");
    }

    #[test]
    fn test_collection_lookup() {
        let collection = CheckCollection::new("interfaces", "sw1")
            .exclusive()
            .with_check(Check::new("interface", json!({"name": "Ethernet1"}), json!({})))
            .with_check(Check::new("interface", json!({"name": "Ethernet2"}), json!({})));

        assert!(collection.exclusive);
        assert_eq!(collection.len(), 2);
        assert!(collection.find("Ethernet2").is_some());
        assert!(collection.find("Ethernet3").is_none());
    }
}
