//! Cross-device sync records: learned lesson ids, synced preferences and
//! recently visited lessons. Each record is one store key, replaced wholesale.

use std::collections::HashSet;
use std::sync::Arc;

use anyhow::Context as _;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::app::kv::KvStore;
use crate::formats::JsonMap;

pub const LEARNED_KEY: &str = "learned";
pub const PREFERENCES_KEY: &str = "preferences";
pub const RECENTS_KEY: &str = "recents";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncedPreferences {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub show_audio_player: Option<bool>,
    #[serde(flatten)]
    pub extra: JsonMap,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentEntry {
    pub id: String,
    /// Milliseconds since the Unix epoch.
    pub visited_at: i64,
}

#[derive(Clone)]
pub struct SyncService {
    store: Arc<dyn KvStore>,
}

impl SyncService {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self { store }
    }

    pub async fn learned(&self) -> anyhow::Result<Vec<String>> {
        self.get_or_default(LEARNED_KEY).await
    }

    pub async fn set_learned(&self, ids: &[String]) -> anyhow::Result<()> {
        self.put(LEARNED_KEY, ids).await
    }

    pub async fn preferences(&self) -> anyhow::Result<SyncedPreferences> {
        self.get_or_default(PREFERENCES_KEY).await
    }

    pub async fn set_preferences(&self, prefs: &SyncedPreferences) -> anyhow::Result<()> {
        self.put(PREFERENCES_KEY, prefs).await
    }

    pub async fn recents(&self) -> anyhow::Result<Vec<RecentEntry>> {
        self.get_or_default(RECENTS_KEY).await
    }

    pub async fn set_recents(&self, entries: &[RecentEntry]) -> anyhow::Result<()> {
        self.put(RECENTS_KEY, entries).await
    }

    async fn get_or_default<T: DeserializeOwned + Default>(&self, key: &str) -> anyhow::Result<T> {
        match self.store.get(key).await? {
            Some(value) => {
                serde_json::from_value(value).with_context(|| format!("decode stored {key}"))
            }
            None => Ok(T::default()),
        }
    }

    async fn put<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> anyhow::Result<()> {
        let value = serde_json::to_value(value).with_context(|| format!("encode {key}"))?;
        self.store.put(key, value).await
    }
}

/// Set union of two learned-id lists: local ids keep their order, then remote
/// ids not already present, in remote order.
pub fn merge_learned(local: &[String], remote: &[String]) -> Vec<String> {
    let mut seen = HashSet::with_capacity(local.len() + remote.len());
    local
        .iter()
        .chain(remote)
        .filter(|id| seen.insert(id.as_str()))
        .cloned()
        .collect()
}
