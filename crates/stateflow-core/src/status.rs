//! Observed resource status
//!
//! Status labels are plain strings rather than an enum: every control plane
//! names its lifecycle stages differently ("ACTIVE", "up", "Provisioning"...).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Status label given to the synthetic snapshot of a resource that is gone
pub const ABSENT_STATUS: &str = "absent";

/// Last fetched representation of a resource plus its derived status label
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    /// Status label derived from the resource's fields
    pub status: String,

    /// Raw resource attributes as returned by the finder
    pub attributes: serde_json::Value,

    /// When the probe observed this state
    pub observed_at: DateTime<Utc>,

    /// Whether this is the synthetic result for a resource that no longer exists
    pub absent: bool,
}

impl StatusSnapshot {
    pub fn new(status: impl Into<String>, attributes: serde_json::Value) -> Self {
        Self {
            status: status.into(),
            attributes,
            observed_at: Utc::now(),
            absent: false,
        }
    }

    /// Snapshot with no attributes
    pub fn with_status(status: impl Into<String>) -> Self {
        Self::new(status, serde_json::Value::Null)
    }

    /// Synthetic snapshot for a resource that was not found
    pub fn absent() -> Self {
        Self {
            status: ABSENT_STATUS.to_string(),
            attributes: serde_json::Value::Null,
            observed_at: Utc::now(),
            absent: true,
        }
    }

    /// Get an attribute as a specific type
    pub fn get_attribute<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.attributes
            .get(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }
}

/// Outcome of a single probe call
#[derive(Debug)]
pub enum PollResult<E> {
    /// The resource exists and reported a status
    Found(StatusSnapshot),
    /// The resource does not exist (or is not visible yet)
    NotFound,
    /// The query failed; the error is classified by the poller
    Error(E),
}

impl<E> PollResult<E> {
    /// Build from the usual `Result<Option<_>>` finder shape
    pub fn from_lookup(result: Result<Option<StatusSnapshot>, E>) -> Self {
        match result {
            Ok(Some(snapshot)) => PollResult::Found(snapshot),
            Ok(None) => PollResult::NotFound,
            Err(e) => PollResult::Error(e),
        }
    }

    pub fn status(&self) -> Option<&str> {
        match self {
            PollResult::Found(snapshot) => Some(&snapshot.status),
            _ => None,
        }
    }
}
