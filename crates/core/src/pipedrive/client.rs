use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use tracing::{debug, warn};

use super::{CrmTransport, RemoteRequest, RemoteResponse};
use crate::config::PipedriveConfig;
use crate::errors::TransportFailure;

pub const API_TOKEN_HEADER: &str = "x-api-token";

/// `reqwest`-backed transport for the Pipedrive REST API.
#[derive(Clone)]
pub struct PipedriveClient {
    http: Client,
    base_url: String,
    api_token: SecretString,
}

impl std::fmt::Debug for PipedriveClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipedriveClient").field("base_url", &self.base_url).finish_non_exhaustive()
    }
}

impl PipedriveClient {
    pub fn new(config: &PipedriveConfig) -> Result<Self, reqwest::Error> {
        let http = Client::builder().timeout(Duration::from_secs(config.timeout_secs)).build()?;

        Ok(Self {
            http,
            base_url: config.base_url.trim().trim_end_matches('/').to_string(),
            api_token: config.api_token.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

#[async_trait]
impl CrmTransport for PipedriveClient {
    async fn request(&self, request: RemoteRequest) -> Result<RemoteResponse, TransportFailure> {
        let method = request.method.as_str().to_string();
        let url = self.url(&request.path);

        let mut builder = self
            .http
            .request(request.method.clone(), &url)
            .header(API_TOKEN_HEADER, self.api_token.expose_secret())
            .header(ACCEPT, "application/json");
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(|error| {
            warn!(
                event_name = "pipedrive.request.network_error",
                method = %method,
                path = %request.path,
                error = %error,
                "pipedrive request failed before a response was received"
            );
            TransportFailure::network(&method, &request.path, error)
        })?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|error| TransportFailure::network(&method, &request.path, error))?;

        if !status.is_success() {
            warn!(
                event_name = "pipedrive.request.status_error",
                method = %method,
                path = %request.path,
                status = status.as_u16(),
                "pipedrive returned a non-success status"
            );
            return Err(TransportFailure::status(
                &method,
                &request.path,
                status.as_u16(),
                status.canonical_reason().unwrap_or_default(),
                text,
            ));
        }

        debug!(
            event_name = "pipedrive.request.completed",
            method = %method,
            path = %request.path,
            status = status.as_u16(),
            "pipedrive request completed"
        );

        let body = serde_json::from_str::<Value>(&text).unwrap_or(Value::String(text));
        Ok(RemoteResponse { status: status.as_u16(), body })
    }
}
