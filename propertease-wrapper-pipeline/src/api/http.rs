use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client as ReqwestClient;
use serde_json::Value;
use tracing::debug;

use crate::api::{ApiResponse, BookingApi};
use crate::errors::AdapterError;

/// Default bound on every outward request.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// `BookingApi` over HTTP with a bounded per-request timeout.
pub struct HttpBookingApi {
    client: ReqwestClient,
    base_url: String,
}

impl HttpBookingApi {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, AdapterError> {
        let client = ReqwestClient::builder().timeout(timeout).build()?;
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn into_api_response(response: reqwest::Response) -> Result<ApiResponse, AdapterError> {
        let status = response.status().as_u16();
        let bytes = response.bytes().await?;
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };
        Ok(ApiResponse::new(status, body))
    }
}

#[async_trait]
impl BookingApi for HttpBookingApi {
    async fn get(&self, path: &str, query: &[(&str, &str)]) -> Result<ApiResponse, AdapterError> {
        let url = self.url(path);
        debug!(url = %url, "GET");
        let response = self.client.get(&url).query(query).send().await?;
        Self::into_api_response(response).await
    }

    async fn post(&self, path: &str, body: &Value) -> Result<ApiResponse, AdapterError> {
        let url = self.url(path);
        debug!(url = %url, "POST");
        let response = self.client.post(&url).json(body).send().await?;
        Self::into_api_response(response).await
    }

    async fn put(&self, path: &str, body: &Value) -> Result<ApiResponse, AdapterError> {
        let url = self.url(path);
        debug!(url = %url, "PUT");
        let response = self.client.put(&url).json(body).send().await?;
        Self::into_api_response(response).await
    }

    async fn delete(&self, path: &str) -> Result<ApiResponse, AdapterError> {
        let url = self.url(path);
        debug!(url = %url, "DELETE");
        let response = self.client.delete(&url).send().await?;
        Self::into_api_response(response).await
    }
}
