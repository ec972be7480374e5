//! Scripted in-memory booking API.
use std::collections::{HashMap, VecDeque};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Mutex;

use crate::api::{ApiResponse, BookingApi, Method};
use crate::errors::AdapterError;

/// A request received by [`MockBookingApi`].
#[derive(Debug, Clone, PartialEq)]
pub struct ApiCall {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

enum Scripted {
    Respond(ApiResponse),
    Unreachable,
}

#[derive(Default)]
struct State {
    scripts: HashMap<(Method, String), VecDeque<Scripted>>,
    calls: Vec<ApiCall>,
}

/// `BookingApi` answering from per-route scripts and recording every call.
///
/// Scripted responses for a route are consumed in order; the last one keeps answering.
/// Routes without a script answer `404`.
#[derive(Default)]
pub struct MockBookingApi {
    state: Mutex<State>,
}

impl MockBookingApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a response for `method` on `path`.
    pub async fn respond(&self, method: Method, path: &str, response: ApiResponse) {
        self.script(method, path, Scripted::Respond(response)).await;
    }

    /// Make `method` on `path` fail as if the service could not be reached.
    pub async fn unreachable(&self, method: Method, path: &str) {
        self.script(method, path, Scripted::Unreachable).await;
    }

    pub async fn calls(&self) -> Vec<ApiCall> {
        self.state.lock().await.calls.clone()
    }

    async fn script(&self, method: Method, path: &str, scripted: Scripted) {
        let mut state = self.state.lock().await;
        state
            .scripts
            .entry((method, path.to_string()))
            .or_default()
            .push_back(scripted);
    }

    async fn call(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
        body: Option<&Value>,
    ) -> Result<ApiResponse, AdapterError> {
        let mut state = self.state.lock().await;
        state.calls.push(ApiCall {
            method,
            path: path.to_string(),
            query: query
                .iter()
                .map(|(key, value)| (key.to_string(), value.to_string()))
                .collect(),
            body: body.cloned(),
        });

        let Some(queue) = state.scripts.get_mut(&(method, path.to_string())) else {
            return Ok(ApiResponse::new(404, Value::Null));
        };
        let scripted = if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().map(|scripted| match scripted {
                Scripted::Respond(response) => Scripted::Respond(response.clone()),
                Scripted::Unreachable => Scripted::Unreachable,
            })
        };

        match scripted {
            Some(Scripted::Respond(response)) => Ok(response),
            Some(Scripted::Unreachable) => Err(AdapterError::transport(format!(
                "{method:?} {path}: connection refused"
            ))),
            None => Ok(ApiResponse::new(404, Value::Null)),
        }
    }
}

#[async_trait]
impl BookingApi for MockBookingApi {
    async fn get(&self, path: &str, query: &[(&str, &str)]) -> Result<ApiResponse, AdapterError> {
        self.call(Method::Get, path, query, None).await
    }

    async fn post(&self, path: &str, body: &Value) -> Result<ApiResponse, AdapterError> {
        self.call(Method::Post, path, &[], Some(body)).await
    }

    async fn put(&self, path: &str, body: &Value) -> Result<ApiResponse, AdapterError> {
        self.call(Method::Put, path, &[], Some(body)).await
    }

    async fn delete(&self, path: &str) -> Result<ApiResponse, AdapterError> {
        self.call(Method::Delete, path, &[], None).await
    }
}
