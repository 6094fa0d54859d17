//! Common utilities for HTTP sinks
//!
//! Every HTTP sink posts one JSON document per notification to a fixed URL.

use crate::error::SinkError;
use reqwest::{Certificate, Client};
use serde::Serialize;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP client bound to a single receiver URL
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    url: String,
    bearer: Option<String>,
}

impl HttpClient {
    /// Create a client posting to `url`
    ///
    /// # Errors
    ///
    /// Returns `SinkError::InvalidConfig` if `url` is empty.
    pub fn new(url: &str) -> Result<Self, SinkError> {
        Self::with_tls(url, None, false)
    }

    /// Create a client with an extra trusted CA certificate (PEM file) or
    /// with certificate verification disabled.
    ///
    /// # Errors
    ///
    /// Returns `SinkError::InvalidConfig` if `url` is empty or the certificate
    /// cannot be read or parsed.
    pub fn with_tls(url: &str, ca_cert: Option<&Path>, tls_skip: bool) -> Result<Self, SinkError> {
        if url.is_empty() {
            return Err(SinkError::InvalidConfig("missing receiver url".to_string()));
        }

        let mut builder = Client::builder().timeout(REQUEST_TIMEOUT);
        if tls_skip {
            builder = builder.danger_accept_invalid_certs(true);
        } else if let Some(path) = ca_cert {
            let pem = std::fs::read(path).map_err(|e| {
                SinkError::InvalidConfig(format!("cannot read CA certificate {}: {e}", path.display()))
            })?;
            let cert = Certificate::from_pem(&pem)
                .map_err(|e| SinkError::InvalidConfig(format!("invalid CA certificate {}: {e}", path.display())))?;
            builder = builder.add_root_certificate(cert);
        }

        Ok(Self {
            client: builder.build()?,
            url: url.to_string(),
            bearer: None,
        })
    }

    /// Send `token` as a bearer token with every request
    #[must_use]
    pub fn with_bearer(mut self, token: &str) -> Self {
        self.bearer = Some(token.to_string());
        self
    }

    /// POST `body` as JSON
    pub async fn post_json<T: Serialize + ?Sized>(&self, body: &T) -> Result<(), SinkError> {
        self.post_with_content_type(body, "application/json").await
    }

    /// POST `body` serialized as JSON with an explicit content type
    pub async fn post_with_content_type<T: Serialize + ?Sized>(
        &self,
        body: &T,
        content_type: &str,
    ) -> Result<(), SinkError> {
        let payload = serde_json::to_vec(body)?;
        debug!("Posting {} bytes to {}", payload.len(), self.url);

        let mut request = self
            .client
            .post(&self.url)
            .header("Content-Type", content_type)
            .body(payload);
        if let Some(token) = &self.bearer {
            request = request.bearer_auth(token);
        }
        let response = request.send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SinkError::Api(format!("{} returned {} - {}", self.url, status, body)));
        }

        info!("Message successfully sent to {}", self.url);
        Ok(())
    }
}
