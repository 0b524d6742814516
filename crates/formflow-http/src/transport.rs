//! reqwest-backed [`Transport`]

use crate::config::HttpConfig;
use crate::error::HttpError;
use async_trait::async_trait;
use formflow_core::{Transport, TransportError, TransportResponse};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, RequestBuilder};
use serde_json::Value;
use std::str::FromStr;
use tracing::{debug, warn};

/// HTTP transport to the banking backend
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    config: HttpConfig,
}

impl HttpTransport {
    /// Build a client from `config`
    pub fn new(config: HttpConfig) -> Result<Self, HttpError> {
        let mut headers = HeaderMap::new();
        for (name, value) in &config.default_headers {
            let name = HeaderName::from_str(name)
                .map_err(|_| HttpError::InvalidHeader(name.clone()))?;
            let value = HeaderValue::from_str(value)
                .map_err(|_| HttpError::InvalidHeader(name.as_str().to_string()))?;
            headers.insert(name, value);
        }

        let client = Client::builder()
            .timeout(config.request_timeout())
            .connect_timeout(config.connect_timeout())
            .default_headers(headers)
            .build()?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &HttpConfig {
        &self.config
    }

    async fn send(&self, request: RequestBuilder) -> Result<TransportResponse, TransportError> {
        let response = request.send().await.map_err(|e| self.map_error(e))?;
        let status = response.status().as_u16();
        let text = response.text().await.map_err(|e| self.map_error(e))?;

        let body = if text.trim().is_empty() {
            Value::Null
        } else {
            match serde_json::from_str(&text) {
                Ok(body) => body,
                // Error pages are often HTML; keep them for the status error
                Err(_) if !(200..300).contains(&status) => Value::String(text),
                Err(e) => return Err(TransportError::Decode(e.to_string())),
            }
        };

        debug!(status, "Backend responded");
        Ok(TransportResponse::new(status, body))
    }

    fn map_error(&self, error: reqwest::Error) -> TransportError {
        if error.is_timeout() {
            warn!("Request timed out: {}", error);
            TransportError::Timeout(self.config.request_timeout())
        } else if error.is_decode() || error.is_body() {
            TransportError::Decode(error.to_string())
        } else {
            warn!("Request failed: {}", error);
            TransportError::Connection(error.to_string())
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn post(&self, path: &str, body: Value) -> Result<TransportResponse, TransportError> {
        let url = self.config.url_for(path);
        debug!("POST {}", url);
        self.send(self.client.post(url).json(&body)).await
    }

    async fn get(&self, path: &str) -> Result<TransportResponse, TransportError> {
        let url = self.config.url_for(path);
        debug!("GET {}", url);
        self.send(self.client.get(url)).await
    }
}
