// Flat subscription store keyed by push endpoint URL: an in-memory map
// behind a RwLock with JSON-file persistence on every mutation.
//
// Both the HTTP routes and the cron scanner mutate it; last-write-wins is
// acceptable between an unsubscribe and a scanner update in flight.

use std::fs;
use std::path::PathBuf;

use log::{error, info};
use tokio::sync::RwLock;

use crate::models::SubscriptionRecord;
use crate::types::SubscriptionMap;

pub const DEFAULT_SUBSCRIPTIONS_PATH: &str = "data/subscriptions.json";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("failed to persist subscriptions: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to encode subscriptions: {0}")]
    Encode(#[from] serde_json::Error),
}

pub struct SubscriptionStore {
    path: PathBuf,
    records: RwLock<SubscriptionMap>,
}

impl SubscriptionStore {
    /// Load from `path`; an absent or corrupt file starts the store empty.
    pub fn load(path: impl Into<PathBuf>) -> SubscriptionStore {
        let path = path.into();
        let records = match fs::read_to_string(&path) {
            Ok(raw) => match serde_json::from_str::<SubscriptionMap>(&raw) {
                Ok(records) => {
                    info!("Loaded {} subscription(s) from {:?}", records.len(), path);
                    records
                }
                Err(e) => {
                    error!("Corrupt subscription store at {:?}, starting empty: {}", path, e);
                    SubscriptionMap::new()
                }
            },
            Err(_) => SubscriptionMap::new(),
        };
        SubscriptionStore { path, records: RwLock::new(records) }
    }

    pub async fn upsert(&self, record: SubscriptionRecord) -> Result<(), StoreError> {
        let mut records = self.records.write().await;
        records.insert(record.subscription.endpoint.clone(), record);
        self.persist(&records)
    }

    /// Returns true when a record existed and was removed.
    pub async fn remove(&self, endpoint: &str) -> Result<bool, StoreError> {
        let mut records = self.records.write().await;
        let removed = records.remove(endpoint).is_some();
        if removed {
            self.persist(&records)?;
        }
        Ok(removed)
    }

    pub async fn list(&self) -> Vec<SubscriptionRecord> {
        self.records.read().await.values().cloned().collect()
    }

    pub async fn get(&self, endpoint: &str) -> Option<SubscriptionRecord> {
        self.records.read().await.get(endpoint).cloned()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    fn persist(&self, records: &SubscriptionMap) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(&self.path, serde_json::to_vec_pretty(records)?)?;
        Ok(())
    }
}
