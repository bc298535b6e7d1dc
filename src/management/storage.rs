use std::{io::ErrorKind, path::PathBuf};

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::Mutex;

use crate::{config, error::StorageError};

/// Durable key-value storage shared by the token manager.
///
/// Mirrors the browser's `storage.local` contract: reads return only the keys
/// that exist, writes merge, removals of absent keys are no-ops.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, keys: &[&str]) -> Result<Map<String, Value>, StorageError>;
    async fn set(&self, items: Map<String, Value>) -> Result<(), StorageError>;
    async fn remove(&self, keys: &[&str]) -> Result<(), StorageError>;
}

/// A JSON object on disk holding every key.
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<data_dir>/storage.json`
    pub fn default_path() -> PathBuf {
        config::data_dir().join("storage.json")
    }

    async fn read_all(&self) -> Result<Map<String, Value>, StorageError> {
        match async_fs::read_to_string(&self.path).await {
            Ok(content) if content.trim().is_empty() => Ok(Map::new()),
            Ok(content) => Ok(serde_json::from_str(&content)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Map::new()),
            Err(e) => Err(e.into()),
        }
    }

    async fn write_all(&self, items: &Map<String, Value>) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            async_fs::create_dir_all(parent).await?;
        }

        let json = serde_json::to_string_pretty(items)?;
        async_fs::write(&self.path, json).await?;
        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for FileStore {
    async fn get(&self, keys: &[&str]) -> Result<Map<String, Value>, StorageError> {
        let all = self.read_all().await?;
        Ok(select(&all, keys))
    }

    async fn set(&self, items: Map<String, Value>) -> Result<(), StorageError> {
        let mut all = self.read_all().await?;
        all.extend(items);
        self.write_all(&all).await
    }

    async fn remove(&self, keys: &[&str]) -> Result<(), StorageError> {
        let mut all = self.read_all().await?;
        let before = all.len();
        for key in keys {
            all.remove(*key);
        }
        if all.len() == before {
            return Ok(());
        }
        self.write_all(&all).await
    }
}

/// Process-local storage, used in tests and for one-shot runs.
#[derive(Default)]
pub struct MemoryStore {
    items: Mutex<Map<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns every stored key, sorted.
    pub async fn keys(&self) -> Vec<String> {
        let items = self.items.lock().await;
        let mut keys: Vec<String> = items.keys().cloned().collect();
        keys.sort();
        keys
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, keys: &[&str]) -> Result<Map<String, Value>, StorageError> {
        let items = self.items.lock().await;
        Ok(select(&items, keys))
    }

    async fn set(&self, new_items: Map<String, Value>) -> Result<(), StorageError> {
        self.items.lock().await.extend(new_items);
        Ok(())
    }

    async fn remove(&self, keys: &[&str]) -> Result<(), StorageError> {
        let mut items = self.items.lock().await;
        for key in keys {
            items.remove(*key);
        }
        Ok(())
    }
}

fn select(all: &Map<String, Value>, keys: &[&str]) -> Map<String, Value> {
    keys.iter()
        .filter_map(|key| all.get(*key).map(|v| (key.to_string(), v.clone())))
        .collect()
}
