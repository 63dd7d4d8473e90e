use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::KeyValueHost;
use crate::error::Result;

#[derive(Debug, Clone, Default)]
pub struct MemoryHost {
    entries: Arc<RwLock<HashMap<String, Value>>>,
}

impl MemoryHost {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueHost for MemoryHost {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> Result<()> {
        self.entries.write().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.entries.write().await.remove(key);
        Ok(())
    }
}
