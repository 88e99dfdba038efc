//! Pipedrive API v2 access.
//!
//! Everything above this module talks to the CRM through [`CrmTransport`], so
//! the reconciler and orchestrator can run against the real HTTP client or an
//! in-memory fake.

pub mod client;
pub mod records;
pub mod search;

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Method;
use serde_json::Value;

use crate::errors::TransportFailure;

pub use client::PipedriveClient;

pub const DEALS_PATH: &str = "/deals";
pub const PERSONS_PATH: &str = "/persons";
pub const ORGANIZATIONS_PATH: &str = "/organizations";
pub const PERSONS_SEARCH_PATH: &str = "/persons/search";
pub const ORGANIZATIONS_SEARCH_PATH: &str = "/organizations/search";

#[derive(Clone, Debug, PartialEq)]
pub struct RemoteRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl RemoteRequest {
    pub fn get(path: impl Into<String>) -> Self {
        Self { method: Method::GET, path: path.into(), query: Vec::new(), body: None }
    }

    pub fn post(path: impl Into<String>, body: Value) -> Self {
        Self { method: Method::POST, path: path.into(), query: Vec::new(), body: Some(body) }
    }

    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query.iter().find(|(name, _)| name == key).map(|(_, value)| value.as_str())
    }
}

/// A 2xx response. The body is JSON when it parsed, otherwise the raw text.
#[derive(Clone, Debug, PartialEq)]
pub struct RemoteResponse {
    pub status: u16,
    pub body: Value,
}

impl RemoteResponse {
    /// Whether the `{success, data}` envelope reports success.
    pub fn envelope_success(&self) -> bool {
        self.body.get("success").and_then(Value::as_bool).unwrap_or(false)
    }

    pub fn data(&self) -> Option<&Value> {
        self.body.get("data")
    }

    pub fn data_id(&self) -> Option<i64> {
        self.data().and_then(|data| data.get("id")).and_then(Value::as_i64)
    }

    pub fn envelope_error(&self) -> Option<&str> {
        self.body.get("error").and_then(Value::as_str)
    }
}

#[async_trait]
pub trait CrmTransport: Send + Sync {
    async fn request(&self, request: RemoteRequest) -> Result<RemoteResponse, TransportFailure>;
}

#[async_trait]
impl<T> CrmTransport for &T
where
    T: CrmTransport + ?Sized,
{
    async fn request(&self, request: RemoteRequest) -> Result<RemoteResponse, TransportFailure> {
        (**self).request(request).await
    }
}

#[async_trait]
impl<T> CrmTransport for Arc<T>
where
    T: CrmTransport + ?Sized,
{
    async fn request(&self, request: RemoteRequest) -> Result<RemoteResponse, TransportFailure> {
        (**self).request(request).await
    }
}
