//! Request error types.

use reqwest::StatusCode;

/// Management API errors.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The request could not be sent or its body could not be read.
    #[error(transparent)]
    Http(#[from] reqwest::Error),

    /// The server answered with an unexpected status.
    #[error("{status}{}", detail(.body))]
    Status { status: StatusCode, body: String },

    /// JSON (de)serialization failed.
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// I/O operation failed.
    #[error(transparent)]
    IO(#[from] std::io::Error),

    /// TOML manifest deserialization failed.
    #[error(transparent)]
    Toml(#[from] toml::de::Error),

    /// The watch stream could not be decoded.
    #[error(transparent)]
    Results(#[from] dq_results::error::Error),

    /// The manifest kind has no API route.
    #[error("Unknown resource kind {0:?}")]
    UnknownKind(String),
}

fn detail(body: &str) -> String {
    let body = body.trim();
    if body.is_empty() {
        String::new()
    } else {
        format!(": {body}")
    }
}
