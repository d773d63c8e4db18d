use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{what} timed out after {after:?}")]
    Timeout { what: String, after: Duration },

    #[error("command `{command}` failed: {status}")]
    CommandFailed { command: String, status: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected HTTP status {status} from {url}")]
    Status {
        status: reqwest::StatusCode,
        url: String,
    },

    #[error("malformed response body: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("unsupported on this platform: {0}")]
    Unsupported(&'static str),
}
