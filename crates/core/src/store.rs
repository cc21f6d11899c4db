//! Key-value persistence for session state.
//!
//! Readers tolerate missing or malformed values by falling back to defaults;
//! writers are fire-and-forget at the call sites that own recovery (quota
//! ledger, star seed minting). [`StoreError`] never crosses the session
//! boundary for those paths.
use chrono::NaiveDate;
use serde_json::Value;
use std::{
    collections::HashMap,
    fs,
    path::PathBuf,
    sync::Mutex,
};
use thiserror::Error;

use crate::quota::QuotaState;

pub const KEY_STAR_SEED_ID: &str = "stardust:starSeedId";
pub const KEY_ORACLE_DAILY_STATE: &str = "stardust:oracleDailyState";
pub const KEY_GOLD_MEMBERSHIP: &str = "stardust:goldMembership";

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("File system error: {0}")]
    IO(#[from] std::io::Error),
    #[error("State serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
    fn remove(&self, key: &str) -> Result<(), StoreError>;
}

/// In-memory store for tests and ephemeral runs.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.lock().unwrap().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.entries.lock().unwrap().remove(key);
        Ok(())
    }
}

/// Single JSON file store, loaded once at open and written through on every
/// mutation. A missing or malformed file yields an empty map.
pub struct FileStore {
    path: PathBuf,
    entries: Mutex<HashMap<String, String>>,
}

impl FileStore {
    pub fn open(path: PathBuf) -> Result<Self, StoreError> {
        let entries = match fs::read_to_string(&path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_default(),
            Err(_) => HashMap::new(),
        };
        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    fn flush(&self, entries: &HashMap<String, String>) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(entries)?;
        fs::write(&self.path, content)?;
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.lock().unwrap().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().unwrap();
        entries.insert(key.to_string(), value.to_string());
        self.flush(&entries)
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().unwrap();
        entries.remove(key);
        self.flush(&entries)
    }
}

/// Load the star seed id, minting and persisting one on first use. The mint
/// write is fire-and-forget.
pub fn load_star_seed_id(store: &dyn KeyValueStore) -> String {
    match store.get(KEY_STAR_SEED_ID) {
        Ok(Some(id)) if !id.is_empty() => id,
        Ok(_) => {
            let id = format!("star-{:016x}", rand::random::<u64>());
            if let Err(e) = store.set(KEY_STAR_SEED_ID, &id) {
                tracing::warn!("Failed to persist star seed id: {e}");
            }
            id
        }
        Err(e) => {
            tracing::warn!("Failed to read star seed id: {e}");
            format!("star-{:016x}", rand::random::<u64>())
        }
    }
}

/// Load the daily quota state with per-field fallback: a missing or
/// malformed field takes its default (`limit` / `today`) without discarding
/// the other field.
pub fn load_quota_state(store: &dyn KeyValueStore, limit: u32, today: NaiveDate) -> QuotaState {
    let raw = match store.get(KEY_ORACLE_DAILY_STATE) {
        Ok(Some(raw)) => raw,
        Ok(None) => return QuotaState::fresh(limit, today),
        Err(e) => {
            tracing::warn!("Failed to read quota state: {e}");
            return QuotaState::fresh(limit, today);
        }
    };

    let parsed: Value = serde_json::from_str(&raw).unwrap_or(Value::Null);
    let remaining_questions = parsed
        .get("remainingQuestions")
        .and_then(Value::as_u64)
        .map(|n| n as u32)
        .unwrap_or(limit);
    let last_question_day = parsed
        .get("lastQuestionDay")
        .and_then(Value::as_str)
        .and_then(|s| s.parse().ok())
        .unwrap_or(today);

    QuotaState {
        remaining_questions,
        last_question_day,
    }
}

/// Persist the quota state. Write failures are swallowed with a warning.
pub fn save_quota_state(store: &dyn KeyValueStore, state: &QuotaState) {
    let encoded = match serde_json::to_string(state) {
        Ok(encoded) => encoded,
        Err(e) => {
            tracing::warn!("Failed to encode quota state: {e}");
            return;
        }
    };
    if let Err(e) = store.set(KEY_ORACLE_DAILY_STATE, &encoded) {
        tracing::warn!("Failed to persist quota state: {e}");
    }
}
