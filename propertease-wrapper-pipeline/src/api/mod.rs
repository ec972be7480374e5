//! Transport to the external booking APIs.
//!
//! The adapter only sees [`BookingApi`]: relative paths in, status and JSON body out.
mod http;
mod mock;

pub use http::HttpBookingApi;
pub use mock::{ApiCall, MockBookingApi};

use async_trait::async_trait;
use serde_json::Value;

use crate::errors::AdapterError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

/// Status and decoded body of a booking API response.
///
/// An empty body decodes to `Value::Null`; a body that is not JSON is kept as a string.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Value,
}

impl ApiResponse {
    pub fn new(status: u16, body: Value) -> Self {
        Self { status, body }
    }

    pub fn ok(body: Value) -> Self {
        Self::new(200, body)
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Minimal HTTP surface of a booking service.
///
/// Paths are relative to the service's base address. Every call either yields a
/// response, whatever its status, or fails with [`AdapterError::Transport`].
#[async_trait]
pub trait BookingApi: Send + Sync {
    async fn get(&self, path: &str, query: &[(&str, &str)]) -> Result<ApiResponse, AdapterError>;

    async fn post(&self, path: &str, body: &Value) -> Result<ApiResponse, AdapterError>;

    async fn put(&self, path: &str, body: &Value) -> Result<ApiResponse, AdapterError>;

    async fn delete(&self, path: &str) -> Result<ApiResponse, AdapterError>;
}
