//! Key-Value Settings Storage
//!
//! The engine keeps a handful of scalars across restarts (accumulated
//! playtime, the sleep-timer deadline, the track range filter). Hosts back
//! this with whatever they have: `localStorage`, UserDefaults,
//! SharedPreferences, or a settings file.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;

use crate::error::{BridgeError, Result};

/// Settings storage trait
///
/// # Example
///
/// ```ignore
/// use bridge_traits::storage::SettingsStore;
///
/// async fn save_playtime(store: &dyn SettingsStore, secs: i64) -> Result<()> {
///     store.set_i64("playtime.total_secs", secs).await
/// }
/// ```
#[async_trait]
pub trait SettingsStore: Send + Sync {
    async fn set_string(&self, key: &str, value: &str) -> Result<()>;

    async fn get_string(&self, key: &str) -> Result<Option<String>>;

    async fn set_bool(&self, key: &str, value: bool) -> Result<()> {
        self.set_string(key, if value { "true" } else { "false" })
            .await
    }

    async fn get_bool(&self, key: &str) -> Result<Option<bool>> {
        match self.get_string(key).await? {
            None => Ok(None),
            Some(raw) => raw
                .parse::<bool>()
                .map(Some)
                .map_err(|e| invalid(key, e.to_string())),
        }
    }

    async fn set_i64(&self, key: &str, value: i64) -> Result<()> {
        self.set_string(key, &value.to_string()).await
    }

    async fn get_i64(&self, key: &str) -> Result<Option<i64>> {
        match self.get_string(key).await? {
            None => Ok(None),
            Some(raw) => raw
                .trim()
                .parse::<i64>()
                .map(Some)
                .map_err(|e| invalid(key, e.to_string())),
        }
    }

    async fn set_f64(&self, key: &str, value: f64) -> Result<()> {
        self.set_string(key, &value.to_string()).await
    }

    async fn get_f64(&self, key: &str) -> Result<Option<f64>> {
        match self.get_string(key).await? {
            None => Ok(None),
            Some(raw) => raw
                .trim()
                .parse::<f64>()
                .map(Some)
                .map_err(|e| invalid(key, e.to_string())),
        }
    }

    /// Store any serde value as JSON text.
    async fn set_json(&self, key: &str, value: &serde_json::Value) -> Result<()> {
        self.set_string(key, &serde_json::to_string(value)?).await
    }

    async fn get_json(&self, key: &str) -> Result<Option<serde_json::Value>> {
        match self.get_string(key).await? {
            None => Ok(None),
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
        }
    }

    async fn delete(&self, key: &str) -> Result<()>;

    async fn has_key(&self, key: &str) -> Result<bool> {
        Ok(self.get_string(key).await?.is_some())
    }
}

fn invalid(key: &str, message: String) -> BridgeError {
    BridgeError::InvalidValue {
        key: key.to_string(),
        message,
    }
}

/// In-process store. Used by tests and by hosts without persistence.
#[derive(Debug, Default)]
pub struct MemorySettingsStore {
    values: RwLock<HashMap<String, String>>,
}

impl MemorySettingsStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.values.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.read().is_empty()
    }

    /// Raw stored text for a key.
    pub fn raw(&self, key: &str) -> Option<String> {
        self.values.read().get(key).cloned()
    }
}

#[async_trait]
impl SettingsStore for MemorySettingsStore {
    async fn set_string(&self, key: &str, value: &str) -> Result<()> {
        self.values
            .write()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn get_string(&self, key: &str) -> Result<Option<String>> {
        Ok(self.values.read().get(key).cloned())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.values.write().remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn scalars_round_through_text() {
        let store = MemorySettingsStore::new();
        store.set_i64("playtime", 420).await.unwrap();
        store.set_bool("flag", true).await.unwrap();
        store.set_f64("volume", 0.5).await.unwrap();

        assert_eq!(store.get_i64("playtime").await.unwrap(), Some(420));
        assert_eq!(store.get_bool("flag").await.unwrap(), Some(true));
        assert_eq!(store.get_f64("volume").await.unwrap(), Some(0.5));
        assert_eq!(store.get_i64("missing").await.unwrap(), None);
        assert_eq!(store.len(), 3);
    }

    #[tokio::test]
    async fn malformed_value_is_reported_with_key() {
        let store = MemorySettingsStore::new();
        store.set_string("playtime", "abc").await.unwrap();

        let err = store.get_i64("playtime").await.unwrap_err();
        assert!(matches!(err, BridgeError::InvalidValue { ref key, .. } if key == "playtime"));
    }

    #[tokio::test]
    async fn json_values_and_delete() {
        let store = MemorySettingsStore::new();
        let value = serde_json::json!({"start": 3, "end": 9});
        store.set_json("range", &value).await.unwrap();
        assert_eq!(store.get_json("range").await.unwrap(), Some(value));

        store.delete("range").await.unwrap();
        assert!(!store.has_key("range").await.unwrap());
        assert!(store.is_empty());
    }
}
