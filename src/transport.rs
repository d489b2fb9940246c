//! HTTP transport
//!
//! The [`Transport`] trait is the seam between the request executor and the
//! network. [`ReqwestTransport`] wraps one pooled `reqwest::Client`; build it
//! once and hand the same `Arc` to every [`crate::Client`] that should share its
//! connection pool. Tests substitute an in-memory implementation.

use crate::config::TransportConfig;
use crate::error::ApiError;
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fully resolved request. Kept as plain data so it can be resent verbatim
/// after reauthentication.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl HttpRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::Get, url)
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Set a header, replacing any previous value with the same name.
    pub fn set_header(&mut self, name: &str, value: impl Into<String>) {
        self.headers.retain(|(n, _)| !n.eq_ignore_ascii_case(name));
        self.headers.push((name.to_string(), value.into()));
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Sends one request and returns whatever status the server answered with.
/// Only transport-level failures are errors here.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError>;
}

/// Pooled HTTP transport backed by `reqwest`.
#[derive(Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl fmt::Debug for ReqwestTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReqwestTransport").finish_non_exhaustive()
    }
}

impl ReqwestTransport {
    /// Build the transport. Certificates are validated unless the configuration
    /// explicitly opts out.
    pub fn new(config: &TransportConfig) -> Result<Self, ApiError> {
        let mut builder = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout())
            .timeout(config.request_timeout())
            .user_agent(config.user_agent.clone());

        if let Some(path) = &config.ca_certificate {
            let pem = std::fs::read(path).map_err(|e| {
                ApiError::ConfigError(format!(
                    "Failed to read CA certificate {}: {}",
                    path.display(),
                    e
                ))
            })?;
            let certificate = reqwest::Certificate::from_pem(&pem).map_err(|e| {
                ApiError::ConfigError(format!("Invalid CA certificate {}: {}", path.display(), e))
            })?;
            builder = builder.add_root_certificate(certificate);
        }

        if config.accept_invalid_certs {
            warn!("TLS certificate validation is disabled for this transport");
            builder = builder.danger_accept_invalid_certs(true);
        }

        let client = builder
            .build()
            .map_err(|e| ApiError::Transport(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client })
    }

    /// Build the transport and wrap it for sharing between clients.
    pub fn shared(config: &TransportConfig) -> Result<Arc<dyn Transport>, ApiError> {
        Ok(Arc::new(Self::new(config)?))
    }
}

fn map_http_error(error: reqwest::Error) -> ApiError {
    if error.is_timeout() {
        ApiError::Transport(format!("Request timeout: {}", error))
    } else if error.is_connect() {
        ApiError::Transport(format!("Connection error: {}", error))
    } else {
        ApiError::Transport(format!("HTTP error: {}", error))
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError> {
        let method = match request.method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Delete => reqwest::Method::DELETE,
        };

        let mut builder = self.client.request(method, &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let response = builder.send().await.map_err(map_http_error)?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(map_http_error)?;
        debug!(method = %request.method, url = %request.url, status, "HTTP exchange");

        Ok(HttpResponse { status, body })
    }
}
