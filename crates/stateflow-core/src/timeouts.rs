//! Per-operation timeouts

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Lifecycle operation a wait belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Create,
    Read,
    Update,
    Delete,
}

impl Operation {
    /// Parse from a string
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "create" => Some(Self::Create),
            "read" => Some(Self::Read),
            "update" => Some(Self::Update),
            "delete" => Some(Self::Delete),
            _ => None,
        }
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Operation::Create => write!(f, "create"),
            Operation::Read => write!(f, "read"),
            Operation::Update => write!(f, "update"),
            Operation::Delete => write!(f, "delete"),
        }
    }
}

/// Timeout per lifecycle operation, in seconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timeouts {
    #[serde(default = "default_create")]
    pub create_secs: u64,

    #[serde(default = "default_read")]
    pub read_secs: u64,

    #[serde(default = "default_update")]
    pub update_secs: u64,

    #[serde(default = "default_delete")]
    pub delete_secs: u64,
}

fn default_create() -> u64 {
    600
}
fn default_read() -> u64 {
    300
}
fn default_update() -> u64 {
    600
}
fn default_delete() -> u64 {
    1200
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            create_secs: default_create(),
            read_secs: default_read(),
            update_secs: default_update(),
            delete_secs: default_delete(),
        }
    }
}

impl Timeouts {
    pub fn get(&self, operation: Operation) -> Duration {
        let secs = match operation {
            Operation::Create => self.create_secs,
            Operation::Read => self.read_secs,
            Operation::Update => self.update_secs,
            Operation::Delete => self.delete_secs,
        };
        Duration::from_secs(secs)
    }
}
