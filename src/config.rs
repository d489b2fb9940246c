//! Configuration System
//!
//! Layered configuration for the lifecycle client: built-in defaults, a global
//! file, per-project files and `EBX_` environment variables, merged with the
//! `config` crate and validated before a client is built from it.

use crate::error::ApiError;
use crate::logging::LoggingConfig;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

mod facade;
mod merge;
mod sources;

pub use facade::ConfigLoader;
pub use sources::global_file::global_config_path;

/// Maximum number of instance ids sent in one `ids=` query.
pub const DEFAULT_BATCH_SIZE: usize = 800;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EbxConfig {
    #[serde(default)]
    pub connection: ConnectionConfig,

    #[serde(default)]
    pub transport: TransportConfig,

    #[serde(default)]
    pub monitor: MonitorConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Where the control plane lives and how to authenticate against it.
#[derive(Clone, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Base URL, e.g. `https://elasticbox.example.com`
    #[serde(default)]
    pub url: String,

    #[serde(default)]
    pub email: String,

    #[serde(default, skip_serializing)]
    pub password: String,

    /// Ids per batched instance lookup, bounded by URL length limits
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            email: String::new(),
            password: String::new(),
            batch_size: default_batch_size(),
        }
    }
}

impl fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("url", &self.url)
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .field("batch_size", &self.batch_size)
            .finish()
    }
}

/// HTTP transport settings shared by every client built on one transport.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportConfig {
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Skip certificate validation. Only for self-signed lab appliances.
    #[serde(default)]
    pub accept_invalid_certs: bool,

    /// Extra PEM root certificate to trust
    #[serde(default)]
    pub ca_certificate: Option<PathBuf>,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_request_timeout_secs() -> u64 {
    60
}

fn default_user_agent() -> String {
    format!("ebx/{}", env!("CARGO_PKG_VERSION"))
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: default_connect_timeout_secs(),
            request_timeout_secs: default_request_timeout_secs(),
            accept_invalid_certs: false,
            ca_certificate: None,
            user_agent: default_user_agent(),
        }
    }
}

impl TransportConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Progress monitor polling settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Default wait budget for CLI waits; 0 waits indefinitely
    #[serde(default)]
    pub timeout_minutes: u64,
}

fn default_poll_interval_ms() -> u64 {
    1000
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            timeout_minutes: 0,
        }
    }
}

impl MonitorConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Configuration validation errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    Connection(String),
    Transport(String),
    Monitor(String),
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::Connection(msg) => write!(f, "Connection: {}", msg),
            ValidationError::Transport(msg) => write!(f, "Transport: {}", msg),
            ValidationError::Monitor(msg) => write!(f, "Monitor: {}", msg),
        }
    }
}

impl std::error::Error for ValidationError {}

impl EbxConfig {
    /// Validate the entire configuration, collecting every problem.
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        let url = self.connection.url.trim();
        if url.is_empty() {
            errors.push(ValidationError::Connection("url cannot be blank".to_string()));
        } else if !url.starts_with("https://") && !url.starts_with("http://") {
            errors.push(ValidationError::Connection(format!(
                "url must start with http:// or https://: {}",
                url
            )));
        }
        if self.connection.email.trim().is_empty() {
            errors.push(ValidationError::Connection("email cannot be blank".to_string()));
        }
        if self.connection.batch_size == 0 {
            errors.push(ValidationError::Connection(
                "batch_size must be greater than zero".to_string(),
            ));
        }

        if let Some(ca) = &self.transport.ca_certificate {
            if !ca.exists() {
                errors.push(ValidationError::Transport(format!(
                    "ca_certificate not found: {}",
                    ca.display()
                )));
            }
        }
        if self.transport.request_timeout_secs == 0 {
            errors.push(ValidationError::Transport(
                "request_timeout_secs must be greater than zero".to_string(),
            ));
        }

        if self.monitor.poll_interval_ms == 0 {
            errors.push(ValidationError::Monitor(
                "poll_interval_ms must be greater than zero".to_string(),
            ));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Validate and fold every problem into one [`ApiError::ConfigError`].
    pub fn ensure_valid(&self) -> Result<(), ApiError> {
        self.validate().map_err(|errors| {
            let error_msgs: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            ApiError::ConfigError(format!(
                "Configuration validation failed:\n{}",
                error_msgs.join("\n")
            ))
        })
    }
}
