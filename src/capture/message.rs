use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::store::AggregateSnapshot;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureEvent {
    pub url: String,
    #[serde(default = "default_method")]
    pub method: String,
    #[serde(default)]
    pub status: Option<u16>,
    /// The response body, untrusted.
    #[serde(default, alias = "payload")]
    pub data: Value,
    #[serde(default)]
    pub timestamp: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
}

fn default_method() -> String {
    "GET".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InboundMessage {
    CasinoResponse {
        data: CaptureEvent,
    },
    RequestUrlStatus,
    GetWinChance,
    ClearData,
    TabUpdated {
        url: String,
        #[serde(default)]
        status: Option<String>,
    },
    WinChanceInput {
        value: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OutboundMessage {
    UrlStatus {
        #[serde(rename = "isTargetSite")]
        is_target_site: bool,
        url: String,
    },
    WinChanceUpdate {
        #[serde(rename = "winChance")]
        win_chance: f64,
    },
    StorageChanged {
        snapshot: AggregateSnapshot,
    },
}
