//! Error types for the guard library

use std::path::PathBuf;
use thiserror::Error;

/// Errors that abort a run
#[derive(Debug, Error)]
pub enum GuardError {
    #[error("cannot read input file {path}: {source}")]
    Input {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("failed to write report: {0}")]
    Output(#[from] std::io::Error),
}

/// Configuration loading and validation errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required configuration value {0}")]
    Missing(&'static str),

    #[error("invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },

    #[error("cannot read env file {path}: {source}")]
    EnvFile {
        path: PathBuf,
        #[source]
        source: dotenv::Error,
    },

    #[error("failed to assemble configuration: {0}")]
    Source(#[from] config::ConfigError),
}

/// Errors talking to the Proxmox API
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("API error ({status}): {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("unexpected response body: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("API rejected the change: {body}")]
    Rejected { body: String },

    #[error("invalid request URL: {0}")]
    Url(#[from] url::ParseError),
}
