//! Error classification
//!
//! Matching rules differ per resource type, but every classifier answers with
//! the same three-way [`ErrorKind`], so the poller logic is shared.

use serde::{Deserialize, Serialize};
use std::fmt;

/// How the poller should treat a failed probe or mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The error encodes absence of the resource
    NotFound,
    /// Throttling, network hiccups, eventual-consistency propagation errors
    Transient,
    /// Permission errors, malformed requests, anything documented as non-retryable
    Fatal,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::NotFound => write!(f, "not-found"),
            ErrorKind::Transient => write!(f, "transient"),
            ErrorKind::Fatal => write!(f, "fatal"),
        }
    }
}

/// Maps a raw error into an [`ErrorKind`]
pub trait ErrorClassifier<E: ?Sized>: Send + Sync {
    fn classify(&self, error: &E) -> ErrorKind;
}

impl<E: ?Sized, F> ErrorClassifier<E> for F
where
    F: Fn(&E) -> ErrorKind + Send + Sync,
{
    fn classify(&self, error: &E) -> ErrorKind {
        self(error)
    }
}

/// Rule table matching substrings of an error's message
///
/// Rules are checked case-insensitively, not-found rules first. Anything that
/// matches no rule is fatal.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MessageRules {
    #[serde(default)]
    pub not_found: Vec<String>,

    #[serde(default)]
    pub transient: Vec<String>,
}

impl MessageRules {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rules covering markers most HTTP-ish control planes share
    pub fn common() -> Self {
        Self::new()
            .not_found_when("not found")
            .not_found_when("does not exist")
            .not_found_when("no such")
            .transient_when("throttl")
            .transient_when("rate exceeded")
            .transient_when("too many requests")
            .transient_when("timed out")
            .transient_when("connection reset")
            .transient_when("connection refused")
            .transient_when("service unavailable")
            .transient_when("try again")
    }

    pub fn not_found_when(mut self, marker: impl Into<String>) -> Self {
        self.not_found.push(marker.into().to_lowercase());
        self
    }

    pub fn transient_when(mut self, marker: impl Into<String>) -> Self {
        self.transient.push(marker.into().to_lowercase());
        self
    }

    /// Classify a message directly
    pub fn classify_message(&self, message: &str) -> ErrorKind {
        let message = message.to_lowercase();
        let matches = |markers: &[String]| {
            markers
                .iter()
                .any(|m| message.contains(m.to_lowercase().as_str()))
        };

        if matches(&self.not_found) {
            ErrorKind::NotFound
        } else if matches(&self.transient) {
            ErrorKind::Transient
        } else {
            ErrorKind::Fatal
        }
    }
}

impl<E: fmt::Display + ?Sized> ErrorClassifier<E> for MessageRules {
    fn classify(&self, error: &E) -> ErrorKind {
        self.classify_message(&error.to_string())
    }
}
