//! Error types for the API client and the session store.

use std::path::PathBuf;
use thiserror::Error;

/// Errors returned by [`crate::api::ChatApi`] implementations
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request never produced an HTTP response (DNS, connect, timeout)
    #[error("Request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The server answered with a non-2xx status
    #[error("{detail}")]
    Rejected { status: u16, detail: String },

    /// The response body did not match the expected shape
    #[error("Invalid response from {url}: {detail}")]
    Decode { url: String, detail: String },
}

impl ApiError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Rejected { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Text suitable for an alert or banner.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Rejected { detail, .. } => detail.clone(),
            other => other.to_string(),
        }
    }
}

/// Errors from reading or writing the persisted session token
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("Session file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Session file {path} is corrupt: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}
