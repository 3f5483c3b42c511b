//! Where the analyzer reads persisted results from
use netcam_core::{CheckResult, DesignLayout};
use std::collections::HashMap;

pub trait ResultSource {
    /// Results of one collection on one device; `None` when there is no
    /// usable data.
    fn load(&self, device: &str, collection: &str) -> Option<Vec<CheckResult>>;
}

impl ResultSource for DesignLayout {
    fn load(&self, device: &str, collection: &str) -> Option<Vec<CheckResult>> {
        self.load_results(device, collection)
    }
}

/// Results held in memory, keyed by `(device, collection)`.
#[derive(Debug, Clone, Default)]
pub struct MemoryResults {
    results: HashMap<(String, String), Vec<CheckResult>>,
}

impl MemoryResults {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, device: &str, collection: &str, results: Vec<CheckResult>) {
        self.results
            .insert((device.to_string(), collection.to_string()), results);
    }

    pub fn with(mut self, device: &str, collection: &str, results: Vec<CheckResult>) -> Self {
        self.insert(device, collection, results);
        self
    }
}

impl ResultSource for MemoryResults {
    fn load(&self, device: &str, collection: &str) -> Option<Vec<CheckResult>> {
        self.results
            .get(&(device.to_string(), collection.to_string()))
            .cloned()
    }
}
