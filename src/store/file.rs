use async_trait::async_trait;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use super::KeyValueHost;
use crate::error::{Result, WatchfulError};

// Keeps every key in one JSON object on disk, rewritten whole on each
// change via a temp file and rename.
#[derive(Debug, Clone)]
pub struct FileHost {
    path: PathBuf,
}

impl FileHost {
    pub fn new(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();

        // Ensure the storage directory exists
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn failure(&self, action: &str, e: impl std::fmt::Display) -> WatchfulError {
        WatchfulError::storage_error(format!("{} {}: {}", action, self.path.display(), e))
    }

    async fn read_entries(&self) -> Result<Map<String, Value>> {
        let exists = tokio::fs::try_exists(&self.path)
            .await
            .map_err(|e| self.failure("checking", e))?;
        if !exists {
            return Ok(Map::new());
        }

        let content = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| self.failure("reading", e))?;
        match serde_json::from_str::<Value>(&content) {
            Ok(Value::Object(entries)) => Ok(entries),
            Ok(_) | Err(_) => {
                warn!("Storage file {} is unreadable, treating as empty", self.path.display());
                Ok(Map::new())
            }
        }
    }

    async fn write_entries(&self, entries: Map<String, Value>) -> Result<()> {
        let json = serde_json::to_vec_pretty(&Value::Object(entries))
            .map_err(|e| self.failure("encoding", e))?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json)
            .await
            .map_err(|e| self.failure("writing", e))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| self.failure("replacing", e))?;
        debug!("Storage file {} written", self.path.display());
        Ok(())
    }
}

#[async_trait]
impl KeyValueHost for FileHost {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.read_entries().await?.remove(key))
    }

    async fn set(&self, key: &str, value: Value) -> Result<()> {
        let mut entries = self.read_entries().await?;
        entries.insert(key.to_string(), value);
        self.write_entries(entries).await
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let mut entries = self.read_entries().await?;
        if entries.remove(key).is_some() {
            self.write_entries(entries).await?;
        }
        Ok(())
    }
}
