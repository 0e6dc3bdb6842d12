//! Resource lookup by GET

use crate::client::HttpClient;
use crate::error::{HttpError, Result};
use crate::template::render_path;
use async_trait::async_trait;
use serde_json::Value;
use stateflow_core::{Finder, ResourceHandle};

/// Looks up a resource with `GET <path>` and reads its status from a JSON pointer
#[derive(Debug, Clone)]
pub struct HttpFinder {
    client: HttpClient,
    path: String,
    status_pointer: String,
    envelope: Option<String>,
}

impl HttpFinder {
    /// `path` is a template (`/servers/{0}`); the status defaults to `/status`
    pub fn new(client: HttpClient, path: impl Into<String>) -> Self {
        Self {
            client,
            path: path.into(),
            status_pointer: "/status".to_string(),
            envelope: None,
        }
    }

    /// JSON pointer to the status field within the resource
    pub fn with_status_pointer(mut self, pointer: impl Into<String>) -> Self {
        self.status_pointer = pointer.into();
        self
    }

    /// JSON pointer to the resource within the response (`/server` for `{"server": {...}}`)
    ///
    /// A null value at this pointer means the resource is absent; a response
    /// without the pointer at all is an error.
    pub fn with_envelope(mut self, pointer: impl Into<String>) -> Self {
        self.envelope = Some(pointer.into());
        self
    }

    pub fn status_pointer(&self) -> &str {
        &self.status_pointer
    }

    fn unwrap_envelope(&self, body: Value) -> Result<Option<Value>> {
        let Some(pointer) = &self.envelope else {
            return Ok(Some(body));
        };
        match body.pointer(pointer) {
            Some(Value::Null) => Ok(None),
            Some(resource) => Ok(Some(resource.clone())),
            None => Err(HttpError::MissingEnvelope {
                pointer: pointer.clone(),
            }),
        }
    }

    fn read_status(&self, resource: &Value) -> Option<String> {
        match resource.pointer(&self.status_pointer)? {
            Value::String(s) => Some(s.clone()),
            Value::Null => None,
            other => Some(other.to_string()),
        }
    }
}

#[async_trait]
impl Finder for HttpFinder {
    type Resource = Value;
    type Error = HttpError;

    async fn lookup(&self, handle: &ResourceHandle) -> Result<Option<Value>> {
        let path = render_path(&self.path, handle)?;
        let Some(body) = self.client.get_json(&path).await? else {
            return Ok(None);
        };
        let Some(resource) = self.unwrap_envelope(body)? else {
            return Ok(None);
        };

        if self.read_status(&resource).is_none() {
            return Err(HttpError::MissingStatus {
                pointer: self.status_pointer.clone(),
            });
        }
        Ok(Some(resource))
    }

    fn status_of(&self, resource: &Value) -> String {
        self.read_status(resource).unwrap_or_default()
    }
}
