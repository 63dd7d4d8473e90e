use thiserror::Error;
use std::io;

#[derive(Error, Debug)]
pub enum WatchfulError {
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    #[error("Extension context invalidated: {0}")]
    ContextInvalidated(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Notification error: {0}")]
    Notify(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl WatchfulError {
    pub fn malformed_payload(msg: impl Into<String>) -> Self {
        Self::MalformedPayload(msg.into())
    }

    pub fn context_invalidated(msg: impl Into<String>) -> Self {
        Self::ContextInvalidated(msg.into())
    }

    pub fn storage_error(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    pub fn validation_error(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn notify_error(msg: impl Into<String>) -> Self {
        Self::Notify(msg.into())
    }

    pub fn is_context_invalidated(&self) -> bool {
        matches!(self, Self::ContextInvalidated(_))
    }
}

pub type Result<T> = std::result::Result<T, WatchfulError>;
