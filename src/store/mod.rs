pub mod aggregate;
pub mod file;
#[cfg(test)]
pub mod memory;

pub use aggregate::AggregateStore;
pub use file::FileHost;
#[cfg(test)]
pub use memory::MemoryHost;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::warn;

use crate::error::{Result, WatchfulError};
use crate::game::NormalizedResult;

pub const STORAGE_KEY: &str = "casinoResults";

pub const DEFAULT_HISTORY_CAP: usize = 1000;

#[async_trait]
pub trait KeyValueHost: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Value>>;
    async fn set(&self, key: &str, value: Value) -> Result<()>;
    async fn remove(&self, key: &str) -> Result<()>;
}

// Liveness of the host execution context. Once invalidated it never
// becomes valid again; clones share the same flag.
#[derive(Debug, Clone)]
pub struct HostContext {
    valid: Arc<AtomicBool>,
}

impl Default for HostContext {
    fn default() -> Self {
        Self::new()
    }
}

impl HostContext {
    pub fn new() -> Self {
        Self {
            valid: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.valid.load(Ordering::SeqCst)
    }

    pub fn invalidate(&self) {
        if self.valid.swap(false, Ordering::SeqCst) {
            warn!("Extension context has been invalidated");
        }
    }

    pub fn check(&self, during: &str) -> Result<()> {
        if self.is_valid() {
            Ok(())
        } else {
            Err(WatchfulError::context_invalidated(format!("context invalid {}", during)))
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AggregateSnapshot {
    pub results: Vec<NormalizedResult>,
    pub total_games: u64,
    pub wins: u64,
    pub losses: u64,
    pub win_rate: f64,
}

impl AggregateSnapshot {
    pub fn from_results(results: Vec<NormalizedResult>) -> Self {
        let mut snapshot = Self {
            results,
            ..Self::default()
        };
        snapshot.recompute();
        snapshot
    }

    pub fn from_stored(value: Option<Value>) -> Self {
        match value {
            None => Self::default(),
            Some(value) => match serde_json::from_value::<Self>(value) {
                Ok(stored) => Self::from_results(stored.results),
                Err(e) => {
                    warn!("Stored snapshot is malformed, starting from empty: {}", e);
                    Self::default()
                }
            },
        }
    }

    pub fn recompute(&mut self) {
        self.total_games = self.results.len() as u64;
        self.wins = self.results.iter().filter(|r| r.is_win()).count() as u64;
        self.losses = self.total_games - self.wins;
        self.win_rate = win_rate(self.wins, self.total_games);
    }

    /// Drops the oldest entries beyond `cap`. Returns how many were evicted.
    pub fn enforce_cap(&mut self, cap: usize) -> usize {
        let excess = self.results.len().saturating_sub(cap);
        if excess > 0 {
            self.results.drain(..excess);
            self.recompute();
        }
        excess
    }

    pub fn latest(&self) -> Option<&NormalizedResult> {
        self.results.last()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

pub fn win_rate(wins: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        wins as f64 / total as f64 * 100.0
    }
}
