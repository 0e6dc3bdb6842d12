use crate::client::HttpClient;
use crate::error::HttpError;
use crate::template::render_path;
use async_trait::async_trait;
use reqwest::Method;
use serde_json::Value;
use stateflow_core::{Mutation, ResourceHandle};

/// Side effect issued as one HTTP request (`DELETE /servers/{0}`, `PUT /lbs/{0}/disable`...)
#[derive(Debug, Clone)]
pub struct HttpMutation {
    client: HttpClient,
    method: Method,
    path: String,
    body: Option<Value>,
}

impl HttpMutation {
    pub fn new(client: HttpClient, method: Method, path: impl Into<String>) -> Self {
        Self {
            client,
            method,
            path: path.into(),
            body: None,
        }
    }

    pub fn delete(client: HttpClient, path: impl Into<String>) -> Self {
        Self::new(client, Method::DELETE, path)
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }
}

#[async_trait]
impl Mutation for HttpMutation {
    type Error = HttpError;

    async fn apply(&self, handle: &ResourceHandle) -> Result<(), HttpError> {
        let path = render_path(&self.path, handle)?;
        self.client
            .send(self.method.clone(), &path, self.body.as_ref())
            .await
    }
}
