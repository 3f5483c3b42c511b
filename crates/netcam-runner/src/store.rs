//! Result store: keyed, idempotent persistence of check results
//!
//! Each result is upserted under `(device, feature, check_type, check_id,
//! status)`. Re-running a verification with unchanged outcomes rewrites the
//! same rows; a changed status lands in a new row.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use netcam_core::{CheckResult, CheckStatus};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use tokio::sync::Mutex;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("STORE/{0}")]
    Backend(String),

    #[error("STORE/serialize: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResultKey {
    pub device: String,
    /// The check collection (feature) the result belongs to.
    pub feature: String,
    pub check_type: String,
    pub check_id: String,
    pub status: CheckStatus,
}

impl ResultKey {
    pub fn for_result(feature: impl Into<String>, result: &CheckResult) -> Self {
        Self {
            device: result.device().to_string(),
            feature: feature.into(),
            check_type: result.check_type().to_string(),
            check_id: result.check_id(),
            status: result.status(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpsertOutcome {
    Inserted,
    Updated,
    Unchanged,
}

#[async_trait]
pub trait ResultStore: Send + Sync {
    async fn upsert(&self, key: ResultKey, payload: &Value) -> Result<UpsertOutcome, StoreError>;

    async fn get(&self, key: &ResultKey) -> Result<Option<StoredResult>, StoreError>;

    async fn count(&self) -> Result<usize, StoreError>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredResult {
    pub payload: Value,
    pub digest: String,
    pub updated_at: DateTime<Utc>,
}

/// In-process store backed by a map. Suitable for tests and single runs.
#[derive(Debug, Default)]
pub struct MemoryResultStore {
    rows: Mutex<HashMap<ResultKey, StoredResult>>,
}

impl MemoryResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rows for one device, ordered by key.
    pub async fn device_rows(&self, device: &str) -> Vec<(ResultKey, StoredResult)> {
        let rows = self.rows.lock().await;
        let mut out: Vec<_> = rows
            .iter()
            .filter(|(k, _)| k.device == device)
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        out.sort_by(|a, b| a.0.cmp(&b.0));
        out
    }
}

#[async_trait]
impl ResultStore for MemoryResultStore {
    async fn upsert(&self, key: ResultKey, payload: &Value) -> Result<UpsertOutcome, StoreError> {
        let digest = payload_digest(payload)?;
        let mut rows = self.rows.lock().await;

        let outcome = match rows.get(&key) {
            None => UpsertOutcome::Inserted,
            Some(existing) if existing.digest == digest => return Ok(UpsertOutcome::Unchanged),
            Some(_) => UpsertOutcome::Updated,
        };

        rows.insert(
            key,
            StoredResult {
                payload: payload.clone(),
                digest,
                updated_at: Utc::now(),
            },
        );
        Ok(outcome)
    }

    async fn get(&self, key: &ResultKey) -> Result<Option<StoredResult>, StoreError> {
        Ok(self.rows.lock().await.get(key).cloned())
    }

    async fn count(&self) -> Result<usize, StoreError> {
        Ok(self.rows.lock().await.len())
    }
}

fn payload_digest(payload: &Value) -> Result<String, StoreError> {
    let bytes = serde_json::to_vec(payload)?;
    Ok(format!("blake3:{}", blake3::hash(&bytes)))
}
