use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info};

use super::{AggregateSnapshot, HostContext, KeyValueHost, DEFAULT_HISTORY_CAP, STORAGE_KEY};
use crate::error::{Result, WatchfulError};
use crate::game::NormalizedResult;

const CHANGE_CHANNEL_CAPACITY: usize = 64;

// Every mutation runs as one read-modify-write under `write_lock`, so
// concurrent appends queue up instead of overwriting each other.
pub struct AggregateStore<H: KeyValueHost> {
    host: H,
    context: HostContext,
    cap: usize,
    write_lock: Mutex<()>,
    closed: AtomicBool,
    changes: broadcast::Sender<AggregateSnapshot>,
}

impl<H: KeyValueHost> AggregateStore<H> {
    pub async fn open(host: H, context: HostContext) -> Result<Self> {
        Self::open_with_cap(host, context, DEFAULT_HISTORY_CAP).await
    }

    pub async fn open_with_cap(host: H, context: HostContext, cap: usize) -> Result<Self> {
        if cap == 0 {
            return Err(WatchfulError::config_error("history cap must be at least 1"));
        }
        context.check("while opening store")?;

        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        let store = Self {
            host,
            context,
            cap,
            write_lock: Mutex::new(()),
            closed: AtomicBool::new(false),
            changes,
        };

        let existing = store.load().await?;
        info!(
            "Aggregate store opened with {} stored results ({:.2}% win rate)",
            existing.total_games, existing.win_rate
        );
        Ok(store)
    }

    pub fn cap(&self) -> usize {
        self.cap
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AggregateSnapshot> {
        self.changes.subscribe()
    }

    pub async fn read_snapshot(&self) -> Result<AggregateSnapshot> {
        self.ensure_usable("before read")?;
        self.load().await
    }

    pub async fn append(&self, result: NormalizedResult) -> Result<AggregateSnapshot> {
        self.ensure_usable("before append")?;
        result.validate()?;

        let _guard = self.write_lock.lock().await;

        let mut snapshot = self.load().await?;
        self.ensure_usable("during storage operation")?;

        snapshot.results.push(result);
        snapshot.recompute();
        let evicted = snapshot.enforce_cap(self.cap);
        if evicted > 0 {
            debug!("Evicted {} oldest results to stay within {}", evicted, self.cap);
        }

        self.host.set(STORAGE_KEY, serde_json::to_value(&snapshot)?).await?;
        self.ensure_usable("during storage save")?;

        self.publish(&snapshot);
        Ok(snapshot)
    }

    pub async fn clear(&self) -> Result<()> {
        self.ensure_usable("before clear")?;
        let _guard = self.write_lock.lock().await;

        self.host.remove(STORAGE_KEY).await?;
        self.ensure_usable("during clear")?;

        info!("Stored results cleared");
        self.publish(&AggregateSnapshot::default());
        Ok(())
    }

    // Waits for in-flight writes, then refuses all further operations.
    pub async fn close(&self) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        if !self.closed.swap(true, Ordering::SeqCst) {
            info!("Aggregate store closed");
        }
        Ok(())
    }

    async fn load(&self) -> Result<AggregateSnapshot> {
        let stored: Option<Value> = self.host.get(STORAGE_KEY).await?;
        Ok(AggregateSnapshot::from_stored(stored))
    }

    fn ensure_usable(&self, during: &str) -> Result<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(WatchfulError::context_invalidated(format!("store closed {}", during)));
        }
        self.context.check(during)
    }

    fn publish(&self, snapshot: &AggregateSnapshot) {
        if self.changes.send(snapshot.clone()).is_err() {
            debug!("No storage change subscribers");
        }
    }
}
