//! Thin JSON client over reqwest

use crate::error::{HttpError, Result};
use reqwest::{Method, StatusCode};
use serde_json::Value;
use std::time::Duration;

/// Base URL plus credentials shared by finders and mutations
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
    request_timeout: Option<Duration>,
}

impl HttpClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: None,
            request_timeout: None,
        }
    }

    /// Send `Authorization: Bearer <token>` with every request
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Per-request timeout; a request exceeding it fails as a transient error
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let mut request = self.client.request(method, self.url(path));
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        if let Some(timeout) = self.request_timeout {
            request = request.timeout(timeout);
        }
        request
    }

    /// GET `path` as JSON; `Ok(None)` on 404 or 410
    pub async fn get_json(&self, path: &str) -> Result<Option<Value>> {
        tracing::debug!("GET {}", self.url(path));
        let response = self.request(Method::GET, path).send().await?;

        if matches!(response.status(), StatusCode::NOT_FOUND | StatusCode::GONE) {
            return Ok(None);
        }
        let response = check_status(response).await?;
        let body = response.text().await?;
        Ok(Some(serde_json::from_str(&body)?))
    }

    /// Send `method` to `path` with an optional JSON body, ignoring the response body
    pub async fn send(&self, method: Method, path: &str, body: Option<&Value>) -> Result<()> {
        tracing::debug!("{} {}", method, self.url(path));
        let mut request = self.request(method, path);
        if let Some(body) = body {
            request = request.json(body);
        }
        check_status(request.send().await?).await?;
        Ok(())
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(HttpError::Status {
        status: status.as_u16(),
        body,
    })
}
