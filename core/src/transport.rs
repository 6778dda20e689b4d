//! Executes `HttpRequest` values against the network.
//!
//! # Design
//! `StackClient` never talks to the network itself; it hands fully built
//! requests to a `Transport`. A transport reports only failures that left it
//! without a response. Any received response, whatever its status, is
//! returned as data so the client can interpret it in one place.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Method;
use thiserror::Error;
use tracing::warn;

use crate::config::ClientConfig;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};

/// The request never produced a response.
#[derive(Debug, Error)]
#[error("transport failure: {0}")]
pub struct TransportError(pub String);

/// Performs the HTTP round-trip for a `StackClient`.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

/// Default transport backed by `reqwest`.
#[derive(Debug, Clone, Default)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(config: &ClientConfig) -> Self {
        let mut builder = reqwest::Client::builder();
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder.build().unwrap_or_else(|e| {
            warn!(error = %e, "falling back to default HTTP client settings");
            reqwest::Client::default()
        });
        Self { client }
    }
}

impl From<HttpMethod> for Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get => Method::GET,
            HttpMethod::Post => Method::POST,
            HttpMethod::Put => Method::PUT,
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let mut builder = self.client.request(request.method.into(), &request.path);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await.map_err(|e| TransportError(e.to_string()))?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value.to_str().ok().map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = response.text().await.map_err(|e| TransportError(e.to_string()))?;

        Ok(HttpResponse { status, headers, body })
    }
}
