//! HTTP adapter error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum HttpError {
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Response has no status at '{pointer}'")]
    MissingStatus { pointer: String },

    #[error("Response has nothing at envelope '{pointer}'")]
    MissingEnvelope { pointer: String },

    #[error("Invalid path template '{template}': {reason}")]
    InvalidTemplate { template: String, reason: String },
}

impl HttpError {
    /// HTTP status code, when the server answered
    pub fn status_code(&self) -> Option<u16> {
        match self {
            HttpError::Status { status, .. } => Some(*status),
            HttpError::Request(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, HttpError>;
