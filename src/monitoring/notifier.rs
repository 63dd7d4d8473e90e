use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::error::{Result, WatchfulError};
use crate::game::NormalizedResult;
use crate::store::AggregateSnapshot;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotSummary {
    pub total_games: u64,
    pub wins: u64,
    pub losses: u64,
    pub win_rate: f64,
    pub latest: Option<NormalizedResult>,
}

impl From<&AggregateSnapshot> for SnapshotSummary {
    fn from(snapshot: &AggregateSnapshot) -> Self {
        Self {
            total_games: snapshot.total_games,
            wins: snapshot.wins,
            losses: snapshot.losses,
            win_rate: snapshot.win_rate,
            latest: snapshot.latest().cloned(),
        }
    }
}

pub struct SnapshotNotifier {
    webhook_url: Option<String>,
    client: Client,
}

impl SnapshotNotifier {
    pub fn new(webhook_url: Option<String>) -> Self {
        Self {
            webhook_url,
            client: Client::new(),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.webhook_url.is_some()
    }

    pub async fn notify_snapshot(&self, snapshot: &AggregateSnapshot) -> Result<()> {
        let Some(url) = &self.webhook_url else {
            return Ok(());
        };

        let summary = SnapshotSummary::from(snapshot);
        let response = self
            .client
            .post(url)
            .json(&summary)
            .send()
            .await
            .map_err(|e| WatchfulError::notify_error(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(WatchfulError::notify_error(format!(
                "webhook returned {}: {}",
                status, error_text
            )));
        }

        Ok(())
    }

    pub fn watch(self, mut changes: broadcast::Receiver<AggregateSnapshot>) -> JoinHandle<()> {
        tokio::spawn(async move {
            if !self.is_configured() {
                info!("Snapshot notifications skipped: webhook URL not configured");
                return;
            }
            loop {
                match changes.recv().await {
                    Ok(snapshot) => {
                        if let Err(e) = self.notify_snapshot(&snapshot).await {
                            error!("Failed to send snapshot notification: {}", e);
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!("Notifier fell behind, skipped {} snapshots", skipped);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }
}
