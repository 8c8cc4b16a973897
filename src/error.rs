// Error types for the non-core surfaces of zapboard.
// The store's core mutations never fail; these cover config loading,
// bulk campaigns, webhook tests and value parsing.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ZapError {
    #[error("failed to read config file {path}: {source}")]
    ConfigIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("could not determine config directory")]
    NoConfigDir,

    #[error("invalid bulk campaign: {0}")]
    InvalidCampaign(String),

    #[error("bulk send task failed: {0}")]
    BulkTask(#[from] tokio::task::JoinError),

    #[error("webhook {0} not found")]
    WebhookNotFound(String),

    #[error("unknown {kind} '{value}'")]
    UnknownVariant { kind: &'static str, value: String },
}

pub type Result<T> = std::result::Result<T, ZapError>;
