use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::Context as _;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::RwLock;

use crate::writer::{read_json, write_json_atomic};

/// Whole-value key-value store. `put` replaces the previous value.
#[async_trait]
pub trait KvStore: Send + Sync {
    async fn get(&self, key: &str) -> anyhow::Result<Option<Value>>;
    async fn put(&self, key: &str, value: Value) -> anyhow::Result<()>;
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredValue {
    updated_at: DateTime<Utc>,
    value: Value,
}

#[derive(Debug, Clone)]
pub struct LocalFsKvStore {
    base_dir: PathBuf,
}

impl LocalFsKvStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    fn key_path(&self, key: &str) -> anyhow::Result<PathBuf> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            anyhow::bail!("invalid store key: {key:?}");
        }
        Ok(self.base_dir.join("kv").join(format!("{key}.json")))
    }
}

#[async_trait]
impl KvStore for LocalFsKvStore {
    async fn get(&self, key: &str) -> anyhow::Result<Option<Value>> {
        let path = self.key_path(key)?;
        let stored: Option<StoredValue> = read_json(&path)
            .await
            .with_context(|| format!("read: {}", path.display()))?;
        Ok(stored.map(|s| s.value))
    }

    async fn put(&self, key: &str, value: Value) -> anyhow::Result<()> {
        let path = self.key_path(key)?;
        let stored = StoredValue {
            updated_at: Utc::now(),
            value,
        };
        write_json_atomic(&path, &stored)
            .await
            .with_context(|| format!("write store key: {key}"))
    }
}

/// Process-local store; contents are lost on restart.
#[derive(Debug, Default)]
pub struct MemoryKvStore {
    entries: RwLock<HashMap<String, Value>>,
}

impl MemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KvStore for MemoryKvStore {
    async fn get(&self, key: &str) -> anyhow::Result<Option<Value>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn put(&self, key: &str, value: Value) -> anyhow::Result<()> {
        self.entries.write().await.insert(key.to_owned(), value);
        Ok(())
    }
}
