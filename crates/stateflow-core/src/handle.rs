//! Resource handles
//!
//! A handle names exactly one remote resource. Some control planes address a
//! resource with a single id, others need a composite key such as
//! `parent-id + child-name`, so the key is kept as an ordered list of parts.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of one remote resource
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceHandle {
    /// Resource type (e.g., "server", "dns-record")
    resource_type: String,

    /// Key parts, outermost first
    parts: Vec<String>,
}

impl ResourceHandle {
    /// Handle addressed by a single id
    pub fn new(resource_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            parts: vec![id.into()],
        }
    }

    /// Handle addressed by a composite key
    pub fn composite<I, S>(resource_type: impl Into<String>, parts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            resource_type: resource_type.into(),
            parts: parts.into_iter().map(Into::into).collect(),
        }
    }

    pub fn resource_type(&self) -> &str {
        &self.resource_type
    }

    pub fn parts(&self) -> &[String] {
        &self.parts
    }

    /// Innermost key part, which is the resource's own id for composite keys
    pub fn id(&self) -> &str {
        self.parts.last().map(String::as_str).unwrap_or_default()
    }

    /// Key part by position
    pub fn part(&self, index: usize) -> Option<&str> {
        self.parts.get(index).map(String::as_str)
    }

    /// Full resource key (type:part/part)
    pub fn key(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for ResourceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.resource_type, self.parts.join("/"))
    }
}
